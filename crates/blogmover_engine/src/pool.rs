//! Remote mode: bounded parallel processing of the microblog's posts.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use blogmover_core::{ExtractContext, RenderOptions};
use blogmover_logging::{migrate_error, migrate_info, migrate_warn};
use tokio::sync::{mpsc, Semaphore};

use crate::config::MigrateConfig;
use crate::decode::decode_html;
use crate::error::{PageError, RunError, RunReport};
use crate::fetch::{Fetcher, ProgressSink};
use crate::index::{collect_post_links, site_default_image};
use crate::persist::ensure_output_dir;
use crate::pipeline::{prepare_remote, write_post};
use crate::types::{EngineEvent, JobId, JobProgress, PageOutcome, Stage};

/// Outcome of one submitted page. Every task that runs to completion sends
/// exactly one.
#[derive(Debug)]
pub struct PageResult {
    pub job_id: JobId,
    pub url: String,
    pub result: Result<Option<PageOutcome>, PageError>,
}

/// State shared read-only by all page tasks.
struct SiteJob {
    ctx: ExtractContext,
    output_dir: PathBuf,
    draft: bool,
    default_image: String,
}

/// Enumerate the site's posts and migrate them.
pub async fn migrate_site(
    config: &MigrateConfig,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ProgressSink>,
) -> Result<RunReport, RunError> {
    ensure_output_dir(&config.output_dir).map_err(|source| RunError::OutputDir {
        path: config.output_dir.clone(),
        source,
    })?;
    let ctx = config.extract_context();
    let pages = collect_post_links(fetcher.as_ref(), &config.index_url(), &ctx, sink.as_ref()).await;
    migrate_info!("Found {} posts", pages.len());
    let default_image = site_default_image(fetcher.as_ref(), &config.website, &ctx, sink.as_ref()).await;

    let job = SiteJob {
        ctx,
        output_dir: config.output_dir.clone(),
        draft: config.draft,
        default_image,
    };
    process_pages(pages, job, config.concurrency, fetcher, sink).await
}

/// Fan pages out to at most `concurrency` tasks and drain one result per page.
///
/// A task that dies without reporting is recorded as a failure of its page.
/// A post directory that cannot be created stops the remaining pages; the
/// run fails once every task has finished.
async fn process_pages(
    pages: Vec<String>,
    job: SiteJob,
    concurrency: usize,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ProgressSink>,
) -> Result<RunReport, RunError> {
    let job = Arc::new(job);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let (tx, mut rx) = mpsc::unbounded_channel::<PageResult>();

    let mut tasks = Vec::with_capacity(pages.len());
    for (index, url) in pages.into_iter().enumerate() {
        let job_id = index as JobId + 1;
        let job = Arc::clone(&job);
        let semaphore = Arc::clone(&semaphore);
        let fetcher = Arc::clone(&fetcher);
        let sink = Arc::clone(&sink);
        let tx = tx.clone();
        sink.emit(EngineEvent::Progress(JobProgress {
            job_id,
            stage: Stage::Queued,
            bytes: None,
        }));
        let task_url = url.clone();
        let handle = tokio::spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => process_page(job_id, &url, &job, fetcher.as_ref(), sink.as_ref()).await,
                Err(_) => Err(PageError::Task {
                    url: url.clone(),
                    message: "run aborted".to_string(),
                }),
            };
            let _ = tx.send(PageResult {
                job_id,
                url,
                result,
            });
        });
        tasks.push((job_id, task_url, handle));
    }
    drop(tx);

    let mut report = RunReport::default();
    let mut fatal = None;
    let mut reported = HashSet::new();
    while let Some(page) = rx.recv().await {
        reported.insert(page.job_id);
        match page.result {
            Ok(Some(outcome)) => {
                sink.emit(EngineEvent::PageCompleted {
                    job_id: page.job_id,
                    result: Ok(outcome.clone()),
                });
                report.written.push(outcome);
            }
            Ok(None) => {
                migrate_info!("{} has no permalink, skipping", page.url);
                report.skipped.push(page.url);
            }
            Err(PageError::Write { source_ref, source }) => {
                match RunError::from_post_dir(source) {
                    Ok(err) => {
                        migrate_error!("{err}");
                        semaphore.close();
                        fatal.get_or_insert(err);
                    }
                    Err(source) => {
                        let err = PageError::Write { source_ref, source };
                        record_failure(&mut report, sink.as_ref(), page.job_id, err);
                    }
                }
            }
            Err(err) => record_failure(&mut report, sink.as_ref(), page.job_id, err),
        }
    }

    for (job_id, url, handle) in tasks {
        if reported.contains(&job_id) {
            continue;
        }
        let message = match handle.await {
            Err(err) => err.to_string(),
            Ok(()) => "no result was sent".to_string(),
        };
        migrate_error!("Task for {url} failed: {message}");
        record_failure(&mut report, sink.as_ref(), job_id, PageError::Task { url, message });
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(report),
    }
}

fn record_failure(report: &mut RunReport, sink: &dyn ProgressSink, job_id: JobId, err: PageError) {
    migrate_warn!("{err}");
    sink.emit(EngineEvent::PageCompleted {
        job_id,
        result: Err(err.to_string()),
    });
    report.failures.push(err);
}

async fn process_page(
    job_id: JobId,
    url: &str,
    job: &SiteJob,
    fetcher: &dyn Fetcher,
    sink: &dyn ProgressSink,
) -> Result<Option<PageOutcome>, PageError> {
    migrate_info!("processing {url}");
    let output = fetcher
        .fetch(job_id, url, sink)
        .await
        .map_err(|source| PageError::Fetch {
            url: url.to_string(),
            source,
        })?;
    let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());

    sink.emit(EngineEvent::Progress(JobProgress {
        job_id,
        stage: Stage::Rendering,
        bytes: Some(output.metadata.byte_len),
    }));
    let options = RenderOptions {
        draft: job.draft,
        default_image: Some(job.default_image.as_str()).filter(|image| !image.is_empty()),
    };
    let prepared = prepare_remote(&decoded.html, url, &job.ctx, &options).map_err(|source| {
        PageError::Render {
            source_ref: url.to_string(),
            source,
        }
    })?;
    let Some(prepared) = prepared else {
        return Ok(None);
    };

    let outcome = write_post(job_id, url, prepared, &job.output_dir, fetcher, sink)
        .await
        .map_err(|source| PageError::Write {
            source_ref: url.to_string(),
            source,
        })?;
    sink.emit(EngineEvent::Progress(JobProgress {
        job_id,
        stage: Stage::Done,
        bytes: None,
    }));
    Ok(Some(outcome))
}
