//! Local archive mode: one sequential pass over a directory of saved pages.

use std::fs;
use std::path::Path;

use blogmover_core::{Platform, RenderOptions};
use blogmover_logging::{migrate_debug, migrate_info, migrate_warn};
use walkdir::WalkDir;

use crate::config::MigrateConfig;
use crate::decode::decode_local;
use crate::error::{PageError, RunError, RunReport};
use crate::fetch::{Fetcher, ProgressSink};
use crate::persist::ensure_output_dir;
use crate::pipeline::{prepare_local, write_post};
use crate::types::{EngineEvent, JobId};

/// Convert every standalone post under `input`.
///
/// Entries are visited in file-name order. Unreadable files and documents
/// that fail to render are recorded in the report. An unusable input
/// directory, or an output or post directory that cannot be created, aborts
/// the run.
pub async fn migrate_archive(
    platform: Platform,
    input: &Path,
    config: &MigrateConfig,
    fetcher: &dyn Fetcher,
    sink: &dyn ProgressSink,
) -> Result<RunReport, RunError> {
    fs::metadata(input).map_err(|source| RunError::InputDir {
        path: input.to_path_buf(),
        source,
    })?;
    ensure_output_dir(&config.output_dir).map_err(|source| RunError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;

    let ctx = config.extract_context();
    let options = RenderOptions {
        draft: config.draft,
        default_image: None,
    };
    let mut report = RunReport::default();
    let mut job_id: JobId = 0;

    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                migrate_warn!("Skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let source = path.display().to_string();
        let file_name = entry.file_name().to_string_lossy().into_owned();

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(source_err) => {
                migrate_warn!("{source}: {source_err}");
                report.failures.push(PageError::Read {
                    path: path.to_path_buf(),
                    source: source_err,
                });
                continue;
            }
        };
        let decoded = decode_local(&bytes);
        migrate_debug!("{source} decoded as {}", decoded.encoding_label);

        let prepared = match prepare_local(platform, &decoded.html, &file_name, &ctx, &options) {
            Ok(Some(prepared)) => prepared,
            Ok(None) => {
                migrate_debug!("{source} is not a standalone {platform} post, skipping");
                report.skipped.push(source);
                continue;
            }
            Err(err) => {
                migrate_warn!("{source}: {err}");
                report.failures.push(PageError::Render {
                    source_ref: source,
                    source: err,
                });
                continue;
            }
        };

        job_id += 1;
        migrate_info!("processing {source}");
        match write_post(job_id, &source, prepared, &config.output_dir, fetcher, sink).await {
            Ok(outcome) => {
                sink.emit(EngineEvent::PageCompleted {
                    job_id,
                    result: Ok(outcome.clone()),
                });
                report.written.push(outcome);
            }
            Err(err) => {
                let err = match RunError::from_post_dir(err) {
                    Ok(fatal) => return Err(fatal),
                    Err(err) => err,
                };
                migrate_warn!("{source}: {err}");
                sink.emit(EngineEvent::PageCompleted {
                    job_id,
                    result: Err(err.to_string()),
                });
                report.failures.push(PageError::Write {
                    source_ref: source,
                    source: err,
                });
            }
        }
    }

    Ok(report)
}
