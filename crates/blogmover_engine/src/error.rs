use std::io;
use std::path::PathBuf;

use blogmover_core::RenderError;

use crate::persist::PersistError;
use crate::types::{FetchError, PageOutcome};

/// Why a single document produced no post. Never stops the run.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not process {url} - {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("could not render {source_ref}: {source}")]
    Render {
        source_ref: String,
        #[source]
        source: RenderError,
    },
    #[error("could not write {source_ref}: {source}")]
    Write {
        source_ref: String,
        #[source]
        source: PersistError,
    },
    #[error("page task for {url} ended without a result: {message}")]
    Task { url: String, message: String },
}

/// Errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("output directory {path} is unusable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: PersistError,
    },
    #[error("input directory {path} is unreadable: {source}")]
    InputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    /// Promote a failed post directory creation to a fatal error; any other
    /// persistence failure is handed back.
    pub(crate) fn from_post_dir(source: PersistError) -> Result<Self, PersistError> {
        let PersistError::CreateDir { path, .. } = &source else {
            return Err(source);
        };
        let path = path.clone();
        Ok(RunError::OutputDir { path, source })
    }
}

/// Aggregated result of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub written: Vec<PageOutcome>,
    /// Documents that are not standalone posts (index pages, tag pages, ...).
    pub skipped: Vec<String>,
    pub failures: Vec<PageError>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn assets_failed(&self) -> usize {
        self.written.iter().map(|page| page.assets_failed).sum()
    }
}
