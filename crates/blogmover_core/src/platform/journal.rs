use chrono::{DateTime, FixedOffset};
use scraper::ElementRef;

use super::{ExtractContext, PageExtractor, Platform};
use crate::content::PageContent;
use crate::dates::{self, JOURNAL_COMMENT, JOURNAL_POST};
use crate::dom::{self, Edits};
use crate::urls::relative_path;
use crate::webmention::{Author, CommentSource, Mention, MentionContent};

/// Placeholder the backup tool puts in front of friends-only entries.
const PROTECTED_ICON: &str = "../../../img/icon_protected.gif";

pub struct JournalPage<'a> {
    root: ElementRef<'a>,
    ctx: &'a ExtractContext,
}

impl<'a> JournalPage<'a> {
    pub fn new(root: ElementRef<'a>, ctx: &'a ExtractContext) -> Self {
        Self { root, ctx }
    }

    /// The entry body is the second paragraph of the page; the first holds
    /// navigation.
    fn entry(&self) -> Option<ElementRef<'a>> {
        dom::nth(self.root, "body p", 1)
    }
}

impl PageExtractor for JournalPage<'_> {
    fn platform(&self) -> Platform {
        Platform::JournalBackup
    }

    fn canonical_url(&self) -> String {
        let href = dom::attr_of(self.root, ".lesstop a", "href").unwrap_or_default();
        relative_path(&href).unwrap_or_default()
    }

    /// The backup writes `<title>user: subject</title>` and repeats the subject
    /// in a caption. Anything that does not line up exactly is an
    /// auto-generated title and is dropped.
    fn title(&self) -> String {
        let page_title = dom::text_of(self.root, "title");
        let caption = self
            .entry()
            .map(|entry| dom::text_of(entry, "font"))
            .unwrap_or_default();
        let user = dom::nth(self.root, ".ljuser", 0)
            .map(dom::element_text)
            .unwrap_or_default();
        if page_title == format!("{user}: {caption}") {
            caption
        } else {
            String::new()
        }
    }

    fn date(&self) -> Option<DateTime<FixedOffset>> {
        let cell = dom::nth(self.root, "td", 1)?;
        let text = dom::text_of(cell, "font");
        let text = text.strip_prefix("@ ").unwrap_or(&text);
        dates::parse_local(text, JOURNAL_POST, self.ctx.utc_offset)
    }

    fn content(&self) -> PageContent {
        let Some(entry) = self.entry() else {
            return PageContent::default();
        };
        let mut edits = Edits::new();
        edits.replace_line_breaks();
        if let Some(caption) = dom::select_first(entry, "font") {
            if dom::element_text(caption) == self.title() {
                edits.remove(caption);
            }
        }
        for icon in dom::select_all(entry, "img") {
            if icon.value().attr("src") == Some(PROTECTED_ICON) {
                edits.remove(icon);
            }
        }
        PageContent::from_element(entry, &edits)
    }

    fn tags(&self) -> Option<Vec<String>> {
        let tags = dom::nth(self.root, "td", 3)
            .map(|cell| {
                dom::select_all(cell, "a")
                    .into_iter()
                    .map(dom::element_text)
                    .collect()
            })
            .unwrap_or_default();
        Some(tags)
    }

    fn mentions(&self) -> Vec<Mention> {
        dom::select_all(self.root, ".talk-comment")
            .into_iter()
            .map(|el| Mention::reply(&JournalComment { el, ctx: self.ctx }))
            .collect()
    }
}

struct JournalComment<'a> {
    el: ElementRef<'a>,
    ctx: &'a ExtractContext,
}

impl JournalComment<'_> {
    /// Second cell: `<font>` with subject, date and permalink.
    fn header_font(&self, index: isize) -> Option<ElementRef<'_>> {
        let header = dom::nth(self.el, "td", 1)?;
        dom::nth(header, "font", index)
    }
}

impl CommentSource for JournalComment<'_> {
    fn author(&self) -> Author {
        match dom::nth(self.el, ".ljuser a", 1) {
            Some(link) => Author::card(
                dom::element_text(link),
                link.value().attr("href").unwrap_or_default(),
                "",
            ),
            None => Author::card("", "", ""),
        }
    }

    /// The last cell holds the comment; header lines are wrapped in `<font>`.
    fn content(&self) -> MentionContent {
        let Some(body) = dom::nth(self.el, "td", -1) else {
            return MentionContent::default();
        };
        let mut edits = Edits::new();
        for font in dom::select_all(body, "font") {
            if let Some(parent) = dom::parent_element(font) {
                if parent.id() != body.id() {
                    edits.remove(parent);
                }
            }
        }
        MentionContent {
            text: dom::text_with(body, &edits),
            html: dom::inner_html(body, &edits),
        }
    }

    fn url(&self) -> String {
        self.header_font(2)
            .and_then(|font| dom::attr_of(font, "a", "href"))
            .unwrap_or_default()
    }

    fn date(&self) -> String {
        let raw = self
            .header_font(1)
            .map(dom::element_text)
            .unwrap_or_default();
        let raw = raw.strip_suffix(" (local)").unwrap_or(&raw);
        match dates::parse_local(raw, JOURNAL_COMMENT, self.ctx.utc_offset) {
            Some(date) => dates::format_received(&date),
            None => raw.trim().to_string(),
        }
    }
}
