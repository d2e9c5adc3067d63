//! One extractor per source platform behind a common contract.

mod diary;
mod journal;
mod microblog;
mod social;

use std::fmt;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use scraper::Html;

use crate::content::{ContentRewriter, PageContent};
use crate::post::IndieWebFields;
use crate::webmention::Mention;

pub use diary::DiaryPage;
pub use journal::JournalPage;
pub use microblog::MicroblogPage;
pub use social::SocialPage;

/// Source platform, selecting which extractor reads a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Diary service pages saved locally (windows-1251 era markup).
    Diary,
    /// Social network takeout export.
    SocialExport,
    /// Journal backup tool output.
    JournalBackup,
    /// Self-hosted microblog engine, read from its live index.
    Microblog,
}

impl Platform {
    pub fn extractor<'a>(
        self,
        document: &'a Html,
        ctx: &'a ExtractContext,
    ) -> Box<dyn PageExtractor + 'a> {
        let root = document.root_element();
        match self {
            Platform::Diary => Box::new(DiaryPage::new(root, ctx)),
            Platform::SocialExport => Box::new(SocialPage::new(root)),
            Platform::JournalBackup => Box::new(JournalPage::new(root, ctx)),
            Platform::Microblog => Box::new(MicroblogPage::new(root, ctx)),
        }
    }

    /// Name of the comment feed written next to `index.md`.
    pub fn feed_file_name(self) -> &'static str {
        match self {
            Platform::Microblog => "webmentions.json",
            _ => "comments.json",
        }
    }

    /// Whether a document read from `file_name` is a standalone post.
    ///
    /// The canonical URL must name the file itself. Microblog documents come
    /// from the live index and have no file to compare against.
    pub fn accepts(self, canonical_url: &str, file_name: &str) -> bool {
        if self == Platform::Microblog {
            return true;
        }
        if canonical_url.is_empty() {
            return false;
        }
        if canonical_url == file_name {
            return true;
        }
        // Export permalinks carry no extension.
        self == Platform::SocialExport
            && Path::new(file_name)
                .file_stem()
                .is_some_and(|stem| stem.to_string_lossy() == canonical_url)
    }

    /// Output directory name for an accepted local document.
    pub fn slug(self, canonical_url: &str, file_name: &str) -> String {
        match Path::new(file_name).extension() {
            Some(ext) => {
                let suffix = format!(".{}", ext.to_string_lossy());
                canonical_url
                    .strip_suffix(&suffix)
                    .unwrap_or(canonical_url)
                    .to_string()
            }
            None => canonical_url.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Diary => "diary",
            Platform::SocialExport => "social",
            Platform::JournalBackup => "journal",
            Platform::Microblog => "microblog",
        };
        f.write_str(name)
    }
}

/// Values the extractors need from the run instead of global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractContext {
    /// Base URL of the microblog site, without trailing slash.
    pub site_url: String,
    /// Offset applied to layouts that carry no zone.
    pub utc_offset: FixedOffset,
    /// Extraction time, used where a platform falls back to "now".
    pub now: DateTime<FixedOffset>,
}

impl ExtractContext {
    pub fn new(utc_offset: FixedOffset) -> Self {
        Self {
            site_url: String::new(),
            utc_offset,
            now: Utc::now().with_timezone(&utc_offset),
        }
    }

    pub fn with_site(mut self, site_url: &str) -> Self {
        self.site_url = site_url.trim_end_matches('/').to_string();
        self
    }

    pub fn at(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now = now;
        self
    }
}

impl Default for ExtractContext {
    fn default() -> Self {
        Self::new(Local::now().offset().fix())
    }
}

/// Normalization contract every platform implements.
///
/// Missing markup never fails: text lookups return empty strings and list
/// lookups return empty vectors.
pub trait PageExtractor {
    fn platform(&self) -> Platform;

    /// Self-declared permalink, reduced to what the platform compares
    /// against file names. Empty when the page is not a standalone post.
    fn canonical_url(&self) -> String;

    fn title(&self) -> String;

    fn date(&self) -> Option<DateTime<FixedOffset>>;

    /// Body container with platform cruft removed.
    fn content(&self) -> PageContent;

    /// `None` when the platform has no tagging feature.
    fn tags(&self) -> Option<Vec<String>> {
        None
    }

    /// Reactions and comments, in feed order.
    fn mentions(&self) -> Vec<Mention>;

    fn indieweb(&self) -> Option<IndieWebFields> {
        None
    }

    fn rewriter(&self) -> ContentRewriter {
        ContentRewriter::images_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_platforms_require_matching_file_name() {
        assert!(Platform::Diary.accepts("p1_x.htm", "p1_x.htm"));
        assert!(!Platform::Diary.accepts("p1_x.htm", "index.htm"));
        assert!(!Platform::Diary.accepts("", ""));
        assert!(!Platform::Diary.accepts("p1_x", "p1_x.htm"));
        assert!(Platform::JournalBackup.accepts("170041.html", "170041.html"));
    }

    #[test]
    fn social_export_matches_file_stem() {
        assert!(Platform::SocialExport.accepts("Ab12Cd", "Ab12Cd.html"));
        assert!(!Platform::SocialExport.accepts("Ab12Cd", "Other.html"));
    }

    #[test]
    fn microblog_is_always_accepted() {
        assert!(Platform::Microblog.accepts("", "whatever"));
    }

    #[test]
    fn slug_drops_the_file_extension() {
        assert_eq!(
            Platform::Diary.slug("p706232_soundcheck.htm", "p706232_soundcheck.htm"),
            "p706232_soundcheck"
        );
        assert_eq!(Platform::SocialExport.slug("Ab12Cd", "Ab12Cd.html"), "Ab12Cd");
    }
}
