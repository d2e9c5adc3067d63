use chrono::{DateTime, Datelike, FixedOffset};
use percent_encoding::percent_decode_str;
use scraper::ElementRef;

use super::{ExtractContext, PageExtractor, Platform};
use crate::content::{ContentRewriter, PageContent};
use crate::dates::{self, ISO_NUMERIC_OFFSET};
use crate::dom::{self, Edits};
use crate::post::IndieWebFields;
use crate::urls::{decoded_path, repair_url};
use crate::webmention::{Author, Mention, MentionContent, LIKE_OF, REPOST_OF};

pub struct MicroblogPage<'a> {
    root: ElementRef<'a>,
    ctx: &'a ExtractContext,
}

impl<'a> MicroblogPage<'a> {
    pub fn new(root: ElementRef<'a>, ctx: &'a ExtractContext) -> Self {
        Self { root, ctx }
    }

    /// Absolute permalink as published, percent-decoded.
    pub fn permalink(&self) -> String {
        let href = dom::attr_of(self.root, ".permalink .u-url", "href").unwrap_or_default();
        percent_decode_str(&href).decode_utf8_lossy().into_owned()
    }

    /// Site-relative permalink, e.g. `/2020/some-post`.
    pub fn relative_permalink(&self) -> String {
        let link = self.permalink();
        decoded_path(&link)
            .or_else(|| repair_url(&self.ctx.site_url, &link).and_then(|fixed| decoded_path(&fixed)))
            .unwrap_or_default()
    }

    /// Raw `datetime` attribute of the publication marker.
    pub fn published(&self) -> String {
        dom::attr_of(self.root, ".dt-published", "datetime").unwrap_or_default()
    }

    /// Last `og:image` of the page; on the home page this is the site default.
    pub fn featured_image(&self) -> String {
        dom::select_all(self.root, "meta")
            .into_iter()
            .filter(|meta| meta.value().attr("property") == Some("og:image"))
            .filter_map(|meta| meta.value().attr("content"))
            .last()
            .unwrap_or_default()
            .to_string()
    }

    fn hrefs(&self, css: &str) -> Vec<String> {
        dom::select_all(self.root, css)
            .into_iter()
            .map(|el| el.value().attr("href").unwrap_or_default().to_string())
            .collect()
    }

    /// Bookmarked likes sometimes keep an empty `href` and carry the target in
    /// the link preview instead.
    fn like_of(&self) -> String {
        let Some(like) = dom::select_first(self.root, ".u-like-of") else {
            return String::new();
        };
        match like.value().attr("href") {
            Some("") => dom::attr_of(self.root, ".unfurl", "data-url").unwrap_or_default(),
            Some(href) => href.to_string(),
            None => String::new(),
        }
    }
}

impl PageExtractor for MicroblogPage<'_> {
    fn platform(&self) -> Platform {
        Platform::Microblog
    }

    /// Permalinks look like `/<year>/<slug>`; the slug is returned.
    fn canonical_url(&self) -> String {
        let path = self.relative_permalink();
        let path = path.trim_start_matches('/');
        match self.date() {
            Some(date) => {
                let year = format!("{}/", date.year());
                path.strip_prefix(&year).unwrap_or(path).to_string()
            }
            None => path.to_string(),
        }
    }

    fn title(&self) -> String {
        dom::text_of(self.root, ".idno-body .p-name a")
    }

    fn date(&self) -> Option<DateTime<FixedOffset>> {
        dates::parse_with_offset(&self.published(), ISO_NUMERIC_OFFSET)
    }

    fn content(&self) -> PageContent {
        let Some(body) = dom::select_first(self.root, ".e-content") else {
            return PageContent::default();
        };
        let mut edits = Edits::new();
        for cruft in dom::select_all(body, ".annotations, .p-category") {
            edits.remove(cruft);
        }
        PageContent::from_element(body, &edits)
    }

    fn tags(&self) -> Option<Vec<String>> {
        let tags = dom::select_all(self.root, ".p-category")
            .into_iter()
            .map(|el| {
                let text = dom::element_text(el);
                text.strip_prefix('#').unwrap_or(&text).to_string()
            })
            .collect();
        Some(tags)
    }

    fn mentions(&self) -> Vec<Mention> {
        dom::select_all(self.root, ".annotations .idno-annotation")
            .into_iter()
            .map(|el| Annotation { el }.mention())
            .collect()
    }

    fn indieweb(&self) -> Option<IndieWebFields> {
        let alias = self.relative_permalink();
        Some(IndieWebFields {
            aliases: if alias.is_empty() { Vec::new() } else { vec![alias] },
            featured_image: self.featured_image(),
            reply_to: self.hrefs(".u-in-reply-to"),
            syndication: self.hrefs(".u-syndication"),
            like_of: self.like_of(),
        })
    }

    fn rewriter(&self) -> ContentRewriter {
        ContentRewriter::for_site(&self.ctx.site_url)
    }
}

/// One reply, like or reshare listed under a microblog post.
struct Annotation<'a> {
    el: ElementRef<'a>,
}

impl Annotation<'_> {
    fn mention(&self) -> Mention {
        let (url, received) = self.source();
        Mention {
            property: self.property().unwrap_or_default(),
            url,
            received,
            content: self.content(),
            ..Mention::new(self.author())
        }
    }

    fn author(&self) -> Author {
        if dom::select_first(self.el, ".h-card").is_some() {
            return Author::card(
                dom::text_of(self.el, ".h-card .p-name"),
                dom::attr_of(self.el, ".h-card .p-name", "href").unwrap_or_default(),
                dom::attr_of(self.el, ".h-card .u-photo", "href").unwrap_or_default(),
            );
        }
        let photo = dom::attr_of(self.el, ".idno-annotation-image img", "src").unwrap_or_default();
        match dom::nth(self.el, ".idno-annotation-content a", 0) {
            Some(link) => Author::card(
                dom::element_text(link),
                link.value().attr("href").unwrap_or_default(),
                photo,
            ),
            None => Author::card("", "", photo),
        }
    }

    fn content(&self) -> MentionContent {
        match dom::select_first(self.el, ".e-content") {
            Some(body) => MentionContent {
                text: dom::text_of(self.el, ".e-content"),
                html: body.inner_html(),
            },
            None => MentionContent::default(),
        }
    }

    /// Classify the interaction from its summary line.
    ///
    /// `None` for real replies, whose first paragraph is the reply body: they
    /// stay untagged rather than being filed under a summary phrase.
    /// Unrecognised summaries are returned verbatim.
    fn property(&self) -> Option<String> {
        let Some(summary) = dom::nth(self.el, ".idno-annotation-content p", 0) else {
            return Some(String::new());
        };
        if dom::parent_element(summary).is_some_and(|parent| dom::has_class(parent, "e-content")) {
            return None;
        }
        let action = dom::nth(summary, "a", 1)
            .map(dom::element_text)
            .unwrap_or_default();
        if action.starts_with("reshared") {
            return Some(REPOST_OF.to_string());
        }
        let text = dom::element_text(summary);
        if text.trim().ends_with("liked this post") {
            return Some(LIKE_OF.to_string());
        }
        Some(text)
    }

    /// The second-to-last link is the dated permalink of the interaction.
    fn source(&self) -> (String, String) {
        match dom::nth(self.el, ".idno-annotation-content a", -2) {
            Some(link) => (
                link.value().attr("href").unwrap_or_default().to_string(),
                dates::normalize_annotation_date(&dom::element_text(link)),
            ),
            None => (String::new(), String::new()),
        }
    }
}
