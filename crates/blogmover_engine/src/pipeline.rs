//! One source document in, one post directory out.
//!
//! Parsing and rendering are synchronous and finish before any await point:
//! a parsed document is not `Send` and must not live across downloads.

use std::path::Path;

use blogmover_core::{
    decoded_path, render, repair_url, ExtractContext, Html2MdConverter, Platform, RenderError,
    RenderOptions, RenderedPost,
};
use blogmover_logging::{migrate_info, migrate_warn};
use scraper::Html;

use crate::fetch::{Fetcher, ProgressSink};
use crate::persist::{AtomicFileWriter, PersistError};
use crate::types::{EngineEvent, JobId, JobProgress, PageOutcome, Stage};

pub const INDEX_FILE: &str = "index.md";

/// A rendered post with the directory name it is written under.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPost {
    pub platform: Platform,
    pub slug: String,
    pub rendered: RenderedPost,
}

/// Render an archived file, or `None` when it is not a standalone post.
pub fn prepare_local(
    platform: Platform,
    html: &str,
    file_name: &str,
    ctx: &ExtractContext,
    options: &RenderOptions<'_>,
) -> Result<Option<PreparedPost>, RenderError> {
    let document = Html::parse_document(html);
    let page = platform.extractor(&document, ctx);
    let canonical = page.canonical_url();
    if !platform.accepts(&canonical, file_name) {
        return Ok(None);
    }
    let rendered = render(page.as_ref(), options, &Html2MdConverter)?;
    Ok(Some(PreparedPost {
        platform,
        slug: platform.slug(&canonical, file_name),
        rendered,
    }))
}

/// Render a microblog page fetched from `url`.
///
/// The slug is the permalink without its year; pages missing a permalink fall
/// back to the path they were fetched from. `None` when neither yields a slug.
pub fn prepare_remote(
    html: &str,
    url: &str,
    ctx: &ExtractContext,
    options: &RenderOptions<'_>,
) -> Result<Option<PreparedPost>, RenderError> {
    let document = Html::parse_document(html);
    let page = Platform::Microblog.extractor(&document, ctx);
    let rendered = render(page.as_ref(), options, &Html2MdConverter)?;

    let slug = if rendered.post.canonical_slug.is_empty() {
        slug_from_url(&ctx.site_url, url, &rendered.post.year())
    } else {
        rendered.post.canonical_slug.clone()
    };
    if slug.is_empty() {
        return Ok(None);
    }
    Ok(Some(PreparedPost {
        platform: Platform::Microblog,
        slug,
        rendered,
    }))
}

fn slug_from_url(website: &str, url: &str, year: &str) -> String {
    let path = decoded_path(url)
        .or_else(|| repair_url(website, url).and_then(|fixed| decoded_path(&fixed)))
        .unwrap_or_default();
    let year_prefix = format!("/{year}/");
    path.strip_prefix(&year_prefix)
        .unwrap_or(&path)
        .trim_matches('/')
        .to_string()
}

/// Write the feed, download assets, then write `index.md`.
///
/// A failed asset download is logged and counted; the post is still written.
pub async fn write_post(
    job_id: JobId,
    source: &str,
    prepared: PreparedPost,
    output_dir: &Path,
    fetcher: &dyn Fetcher,
    sink: &dyn ProgressSink,
) -> Result<PageOutcome, PersistError> {
    let PreparedPost {
        platform,
        slug,
        rendered,
    } = prepared;
    let writer = AtomicFileWriter::for_post(output_dir, &rendered.post.year(), &slug)?;

    let feed_written = match rendered.feed.as_deref() {
        Some(feed) => {
            writer.write(platform.feed_file_name(), feed)?;
            true
        }
        None => false,
    };

    sink.emit(EngineEvent::Progress(JobProgress {
        job_id,
        stage: Stage::FetchingAssets,
        bytes: None,
    }));
    let mut assets_written = 0;
    let mut assets_failed = 0;
    for asset in &rendered.assets {
        match fetcher.download(&asset.source_url).await {
            Ok(bytes) => {
                writer.write(&asset.local_name, &bytes)?;
                assets_written += 1;
            }
            Err(err) => {
                migrate_warn!("failed to fetch asset: {} - {err}", asset.source_url);
                assets_failed += 1;
            }
        }
    }

    sink.emit(EngineEvent::Progress(JobProgress {
        job_id,
        stage: Stage::Writing,
        bytes: Some(rendered.document.len() as u64),
    }));
    writer.write(INDEX_FILE, rendered.document.as_bytes())?;
    migrate_info!("Wrote {} from {source}", writer.dir().display());

    Ok(PageOutcome {
        source: source.to_string(),
        post_dir: writer.dir().to_path_buf(),
        feed_written,
        assets_written,
        assets_failed,
    })
}
