//! Enumerating posts from the microblog's paginated index.

use std::collections::HashSet;

use blogmover_core::{dom, ExtractContext, MicroblogPage};
use blogmover_logging::{migrate_info, migrate_warn};
use scraper::Html;
use url::Url;

use crate::decode::decode_html;
use crate::fetch::{Fetcher, ProgressSink};

/// Permalinks of one index page and the link to the next (older) page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    pub permalinks: Vec<String>,
    pub older: Option<String>,
}

pub fn parse_index_page(html: &str, page_url: &str, ctx: &ExtractContext) -> IndexPage {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let permalinks = dom::select_all(root, ".idno-entry")
        .into_iter()
        .map(|entry| MicroblogPage::new(entry, ctx).permalink())
        .filter(|link| !link.is_empty())
        .collect();
    let older = dom::attr_of(root, ".older a", "href")
        .filter(|href| !href.is_empty())
        .map(|href| resolve(page_url, &href));
    IndexPage { permalinks, older }
}

fn resolve(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// Follow the "older" links from `start` and collect every post permalink.
///
/// Pagination ends at the first page that fails to load, has no older link,
/// or links back to a page already seen.
pub async fn collect_post_links(
    fetcher: &dyn Fetcher,
    start: &str,
    ctx: &ExtractContext,
    sink: &dyn ProgressSink,
) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(start.to_string());

    while let Some(url) = next.take() {
        if !seen.insert(url.clone()) {
            break;
        }
        migrate_info!("Processing {url}");
        let output = match fetcher.fetch(0, &url, sink).await {
            Ok(output) => output,
            Err(err) => {
                migrate_warn!("Index page {url} failed: {err}");
                break;
            }
        };
        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
        let page = parse_index_page(&decoded.html, &output.metadata.final_url, ctx);
        links.extend(page.permalinks);
        next = page.older;
    }
    links
}

/// The site-wide `og:image`, empty when the home page cannot be loaded.
pub async fn site_default_image(
    fetcher: &dyn Fetcher,
    website: &str,
    ctx: &ExtractContext,
    sink: &dyn ProgressSink,
) -> String {
    match fetcher.fetch(0, website, sink).await {
        Ok(output) => {
            let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
            let document = Html::parse_document(&decoded.html);
            MicroblogPage::new(document.root_element(), ctx).featured_image()
        }
        Err(err) => {
            migrate_warn!("Could not read default image from {website}: {err}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const INDEX: &str = r#"<html><body>
        <div class="idno-entry"><div class="permalink"><a class="u-url" href="http://blog.example/2020/first%20post">x</a></div></div>
        <div class="idno-entry"><div class="permalink"><a class="u-url" href="http://blog.example/2019/second">x</a></div></div>
        <div class="pager"><span class="older"><a href="/content/posts?offset=10">Older</a></span></div>
    </body></html>"#;

    #[test]
    fn index_page_lists_permalinks_and_older_link() {
        let ctx = ExtractContext::default().with_site("http://blog.example");
        let page = parse_index_page(INDEX, "http://blog.example/content/posts", &ctx);
        assert_eq!(
            page.permalinks,
            vec![
                "http://blog.example/2020/first post".to_string(),
                "http://blog.example/2019/second".to_string(),
            ]
        );
        assert_eq!(
            page.older.as_deref(),
            Some("http://blog.example/content/posts?offset=10")
        );
    }

    #[test]
    fn last_index_page_has_no_older_link() {
        let ctx = ExtractContext::default();
        let page = parse_index_page("<html><body></body></html>", "http://x/", &ctx);
        assert!(page.permalinks.is_empty());
        assert_eq!(page.older, None);
    }
}
