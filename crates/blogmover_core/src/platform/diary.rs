use chrono::{DateTime, FixedOffset};
use scraper::ElementRef;

use super::{ExtractContext, PageExtractor, Platform};
use crate::content::PageContent;
use crate::dates::{self, DIARY_COMMENT, DIARY_POST};
use crate::dom::{self, Edits};
use crate::urls::relative_path;
use crate::webmention::{Author, CommentSource, Mention, MentionContent};

pub struct DiaryPage<'a> {
    root: ElementRef<'a>,
    ctx: &'a ExtractContext,
}

impl<'a> DiaryPage<'a> {
    pub fn new(root: ElementRef<'a>, ctx: &'a ExtractContext) -> Self {
        Self { root, ctx }
    }
}

impl PageExtractor for DiaryPage<'_> {
    fn platform(&self) -> Platform {
        Platform::Diary
    }

    fn canonical_url(&self) -> String {
        let href = dom::attr_of(self.root, ".singlePost .urlLink a", "href").unwrap_or_default();
        relative_path(&href).unwrap_or_default()
    }

    fn title(&self) -> String {
        dom::text_of(self.root, ".postTitle h1")
    }

    /// The date line reads `<weekday>, <day> <month> <year>`; the time sits in
    /// the title. A date line that is malformed or does not parse yields
    /// extraction time.
    fn date(&self) -> Option<DateTime<FixedOffset>> {
        let line = dom::text_of(self.root, ".singlePost .postDate");
        let parts: Vec<&str> = line.split(", ").collect();
        let [_, day] = parts.as_slice() else {
            return Some(self.ctx.now);
        };
        let time = dom::text_of(self.root, ".singlePost .postTitle span");
        let stamp = format!("{} {}", dates::translate_russian_months(day), time);
        dates::parse_local(&stamp, DIARY_POST, self.ctx.utc_offset).or(Some(self.ctx.now))
    }

    fn content(&self) -> PageContent {
        dom::select_first(self.root, ".singlePost .postInner")
            .map(|inner| PageContent::from_element(inner, &Edits::new()))
            .unwrap_or_default()
    }

    fn mentions(&self) -> Vec<Mention> {
        dom::select_all(self.root, ".singleComment")
            .into_iter()
            .map(|el| Mention::reply(&DiaryComment { el, ctx: self.ctx }))
            .collect()
    }
}

struct DiaryComment<'a> {
    el: ElementRef<'a>,
    ctx: &'a ExtractContext,
}

impl CommentSource for DiaryComment<'_> {
    /// Diary profiles are not linkable, only name and avatar are exposed.
    fn author(&self) -> Author {
        let name = dom::text_of(self.el, ".authorName");
        let photo = dom::attr_of(self.el, ".commentAuthor img", "src").unwrap_or_default();
        Author::card(name, "", photo)
    }

    fn content(&self) -> MentionContent {
        match dom::select_first(self.el, ".postInner") {
            Some(inner) => MentionContent {
                text: dom::element_text(inner).trim().to_string(),
                html: inner.inner_html().trim().to_string(),
            },
            None => MentionContent::default(),
        }
    }

    fn url(&self) -> String {
        String::new()
    }

    fn date(&self) -> String {
        let raw = dom::text_of(self.el, ".postTitle span");
        match dates::parse_local(&raw, DIARY_COMMENT, self.ctx.utc_offset) {
            Some(date) => dates::format_received(&date),
            None => raw.trim().to_string(),
        }
    }
}
