use chrono::{DateTime, FixedOffset};
use scraper::ElementRef;

use super::{PageExtractor, Platform};
use crate::content::PageContent;
use crate::dates::{self, ISO_NUMERIC_OFFSET};
use crate::dom::{self, Edits};
use crate::urls::last_segment;
use crate::webmention::{Author, CommentSource, Mention, MentionContent, LIKE_OF, REPOST_OF};

const DATE_CREATED: &str = r#"span[itemprop="dateCreated"]"#;

pub struct SocialPage<'a> {
    root: ElementRef<'a>,
}

impl<'a> SocialPage<'a> {
    pub fn new(root: ElementRef<'a>) -> Self {
        Self { root }
    }

    fn reactions(&self, container: &str, property: &str) -> Vec<Mention> {
        dom::select_all(self.root, container)
            .into_iter()
            .flat_map(|el| el.children().filter_map(ElementRef::wrap))
            .map(|person| {
                let url = person.value().attr("href").unwrap_or_default();
                Mention::reaction(property, Author::card(dom::element_text(person), url, ""))
            })
            .collect()
    }
}

/// Last `dateCreated` marker under `scope` that is not part of a comment thread.
fn post_date_marker(scope: ElementRef<'_>) -> Option<ElementRef<'_>> {
    dom::select_all(scope, DATE_CREATED)
        .into_iter()
        .rev()
        .find(|span| !dom::has_ancestor_with_class(*span, "comments", scope))
}

fn marker_date(scope: ElementRef<'_>) -> Option<DateTime<FixedOffset>> {
    let marker = post_date_marker(scope)?;
    dates::parse_with_offset(&dom::element_text(marker), ISO_NUMERIC_OFFSET)
}

impl PageExtractor for SocialPage<'_> {
    fn platform(&self) -> Platform {
        Platform::SocialExport
    }

    /// The post's date is wrapped in its permalink; the id is its last segment.
    fn canonical_url(&self) -> String {
        post_date_marker(self.root)
            .and_then(dom::parent_element)
            .and_then(|link| link.value().attr("href"))
            .map(|href| last_segment(href).to_string())
            .unwrap_or_default()
    }

    fn title(&self) -> String {
        String::new()
    }

    fn date(&self) -> Option<DateTime<FixedOffset>> {
        marker_date(self.root)
    }

    fn content(&self) -> PageContent {
        let mut edits = Edits::new();
        edits.replace_line_breaks();
        dom::select_first(self.root, ".main-content")
            .map(|main| PageContent::from_element(main, &edits))
            .unwrap_or_default()
    }

    /// Reshares, then +1s, then comments in document order.
    fn mentions(&self) -> Vec<Mention> {
        let mut mentions = self.reactions(".resharers", REPOST_OF);
        mentions.extend(self.reactions(".plus-oners", LIKE_OF));
        mentions.extend(
            dom::select_all(self.root, ".comments .comment")
                .into_iter()
                .map(|el| Mention::reply(&SocialComment { el })),
        );
        mentions
    }
}

struct SocialComment<'a> {
    el: ElementRef<'a>,
}

impl CommentSource for SocialComment<'_> {
    fn author(&self) -> Author {
        let name = dom::text_of(self.el, ".author");
        let url = dom::attr_of(self.el, ".author", "href").unwrap_or_default();
        Author::card(name, url, "")
    }

    fn content(&self) -> MentionContent {
        match dom::select_first(self.el, ".comment-content") {
            Some(body) => MentionContent {
                text: dom::element_text(body),
                html: body.inner_html(),
            },
            None => MentionContent::default(),
        }
    }

    fn url(&self) -> String {
        String::new()
    }

    fn date(&self) -> String {
        match marker_date(self.el) {
            Some(date) => dates::format_received(&date),
            None => post_date_marker(self.el)
                .map(|marker| dom::element_text(marker).trim().to_string())
                .unwrap_or_default(),
        }
    }
}
