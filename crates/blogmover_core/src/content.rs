use scraper::{ElementRef, Html};

use crate::dom::{self, Edits};
use crate::urls::last_segment;

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        html2md::parse_html(html)
    }
}

/// Body of a post as an owned HTML fragment, after platform cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    html: String,
}

impl PageContent {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Serialize the body container with the platform's cleanup applied.
    pub fn from_element(element: ElementRef<'_>, edits: &Edits) -> Self {
        Self::new(dom::outer_html(element, edits))
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }

    pub fn to_markdown(&self, converter: &dyn Converter) -> String {
        converter.to_markdown(&self.html)
    }
}

/// One file the rewritten body refers to by a local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub local_name: String,
    /// URL to download the file from.
    pub source_url: String,
    /// Reference as it appeared in the document before rewriting.
    pub original_ref: String,
}

/// Local file name → source URL, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetMap {
    assets: Vec<Asset>,
}

impl AssetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, asset: Asset) {
        self.assets.push(asset);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    /// Source URL stored under a local name.
    pub fn get(&self, local_name: &str) -> Option<&str> {
        self.assets
            .iter()
            .find(|asset| asset.local_name == local_name)
            .map(|asset| asset.source_url.as_str())
    }

    /// Local name that replaced a reference, e.g. to localize a featured image.
    pub fn local_name_for(&self, original_ref: &str) -> Option<&str> {
        self.assets
            .iter()
            .find(|asset| asset.original_ref == original_ref)
            .map(|asset| asset.local_name.as_str())
    }
}

impl<'a> IntoIterator for &'a AssetMap {
    type Item = &'a Asset;
    type IntoIter = std::slice::Iter<'a, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.iter()
    }
}

/// Rewrites media references in a body to local, positionally named files.
///
/// Images always become `image0`, `image1`, ... in document order, and every
/// link pointing at the original image URL follows the image. A rewriter built
/// with [`ContentRewriter::for_site`] additionally localizes `<site>/file/`
/// attachments and turns links to the own site into relative links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRewriter {
    site_prefix: Option<String>,
    thumbnail_suffix: Option<String>,
}

impl ContentRewriter {
    pub fn images_only() -> Self {
        Self::default()
    }

    pub fn for_site(site_url: &str) -> Self {
        Self {
            site_prefix: Some(site_url.trim_end_matches('/').to_string()),
            thumbnail_suffix: Some("/thumb.jpg".to_string()),
        }
    }

    /// Rewrite `content` in place and return the files it now refers to.
    pub fn rewrite(&self, content: &mut PageContent) -> AssetMap {
        let fragment = Html::parse_fragment(&content.html);
        let root = fragment.root_element();
        let anchors = dom::select_all(root, "a");
        let mut edits = Edits::new();
        let mut assets = AssetMap::new();

        for (index, image) in dom::select_all(root, "img").into_iter().enumerate() {
            let Some(link) = image.value().attr("src").map(str::to_string) else {
                continue;
            };
            if link.is_empty() {
                continue;
            }
            let local_name = format!("image{index}");
            retarget_links(&anchors, &mut edits, &link, &local_name);
            edits.set_attr(image, "src", &local_name);
            assets.push(Asset {
                source_url: self.download_url(&link),
                local_name,
                original_ref: link,
            });
        }

        if let Some(prefix) = self.site_prefix.as_deref() {
            let file_prefix = format!("{prefix}/file/");
            for (index, anchor) in anchors.iter().enumerate() {
                let Some(link) = edits.attr(*anchor, "href") else {
                    continue;
                };
                if !link.starts_with(&file_prefix) {
                    continue;
                }
                let local_name = format!("{index}{}", last_segment(&link));
                retarget_links(&anchors, &mut edits, &link, &local_name);
                assets.push(Asset {
                    source_url: link.clone(),
                    local_name,
                    original_ref: link,
                });
            }

            for anchor in &anchors {
                if let Some(link) = edits.attr(*anchor, "href") {
                    if let Some(relative) = link.strip_prefix(prefix) {
                        edits.set_attr(*anchor, "href", relative);
                    }
                }
            }
        }

        content.html = dom::inner_html(root, &edits);
        assets
    }

    fn download_url(&self, link: &str) -> String {
        match self.thumbnail_suffix.as_deref() {
            Some(suffix) => link.strip_suffix(suffix).unwrap_or(link).to_string(),
            None => link.to_string(),
        }
    }
}

fn retarget_links(anchors: &[ElementRef<'_>], edits: &mut Edits, link: &str, local_name: &str) {
    for anchor in anchors {
        if edits.attr(*anchor, "href").as_deref() == Some(link) {
            edits.set_attr(*anchor, "href", local_name);
        }
    }
}
