use chrono::{DateTime, Datelike, FixedOffset};

use crate::content::PageContent;
use crate::platform::PageExtractor;

/// Directory name used for posts whose date could not be read.
pub const UNDATED_YEAR: &str = "undated";

/// Normalized post extracted from one source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub title: String,
    pub date: Option<DateTime<FixedOffset>>,
    /// Empty means the document is not a standalone post.
    pub canonical_slug: String,
    /// `None` for platforms without tags.
    pub tags: Option<Vec<String>>,
    pub body: PageContent,
    pub draft: bool,
    pub indieweb: Option<IndieWebFields>,
}

/// Extra metadata only the microblog engine exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndieWebFields {
    pub aliases: Vec<String>,
    pub featured_image: String,
    pub reply_to: Vec<String>,
    pub syndication: Vec<String>,
    pub like_of: String,
}

impl Post {
    pub fn extract(page: &dyn PageExtractor, draft: bool) -> Self {
        Self {
            title: page.title(),
            date: page.date(),
            canonical_slug: page.canonical_url(),
            tags: page.tags(),
            body: page.content(),
            draft,
            indieweb: page.indieweb(),
        }
    }

    /// Year directory the post is written under.
    pub fn year(&self) -> String {
        match &self.date {
            Some(date) => format!("{:04}", date.year()),
            None => UNDATED_YEAR.to_string(),
        }
    }
}
