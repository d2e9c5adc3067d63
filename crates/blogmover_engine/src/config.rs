use std::path::PathBuf;

use blogmover_core::ExtractContext;
use chrono::{FixedOffset, Local, Offset};

use crate::fetch::FetchSettings;

pub const DEFAULT_CONCURRENCY: usize = 15;
pub const DEFAULT_WEBSITE: &str = "example.site";
pub const DEFAULT_SECTION: &str = "/content/posts";
pub const DEFAULT_OUTPUT_DIR: &str = "./migrated";

/// Everything one migration run needs, built once by the caller.
#[derive(Debug, Clone)]
pub struct MigrateConfig {
    pub output_dir: PathBuf,
    pub draft: bool,
    /// Upper bound on pages processed at the same time (remote mode).
    pub concurrency: usize,
    /// Microblog base URL, always carrying a scheme.
    pub website: String,
    /// Path of the paginated post index below `website`.
    pub section: String,
    /// Offset for source dates that carry no zone.
    pub utc_offset: FixedOffset,
    pub fetch: FetchSettings,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            draft: false,
            concurrency: DEFAULT_CONCURRENCY,
            website: normalize_website(DEFAULT_WEBSITE),
            section: DEFAULT_SECTION.to_string(),
            utc_offset: Local::now().offset().fix(),
            fetch: FetchSettings::default(),
        }
    }
}

impl MigrateConfig {
    /// First page of the post index.
    pub fn index_url(&self) -> String {
        format!("{}{}", self.website.trim_end_matches('/'), self.section)
    }

    pub fn extract_context(&self) -> ExtractContext {
        ExtractContext::new(self.utc_offset).with_site(&self.website)
    }
}

/// Prepend `http://` to a site given without scheme.
pub fn normalize_website(website: &str) -> String {
    if website.starts_with("http://") || website.starts_with("https://") {
        website.to_string()
    } else {
        format!("http://{website}")
    }
}
