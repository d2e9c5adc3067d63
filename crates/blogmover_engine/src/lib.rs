//! Blogmover engine: reading archives, fetching sites and writing posts.
mod config;
mod decode;
mod error;
mod fetch;
mod index;
mod persist;
mod pipeline;
mod pool;
mod types;
mod walk;

pub use config::{
    normalize_website, MigrateConfig, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR, DEFAULT_SECTION,
    DEFAULT_WEBSITE,
};
pub use decode::{decode_html, decode_local, DecodedHtml};
pub use error::{PageError, RunError, RunReport};
pub use fetch::{FetchSettings, Fetcher, LogProgressSink, ProgressSink, ReqwestFetcher};
pub use index::{collect_post_links, parse_index_page, site_default_image, IndexPage};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{prepare_local, prepare_remote, write_post, PreparedPost, INDEX_FILE};
pub use pool::{migrate_site, PageResult};
pub use types::{
    EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, JobId, JobProgress,
    PageOutcome, Stage,
};
pub use walk::migrate_archive;
