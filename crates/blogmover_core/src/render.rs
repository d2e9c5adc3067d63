use crate::content::{AssetMap, Converter};
use crate::frontmatter::{build_document, FrontMatterError};
use crate::platform::PageExtractor;
use crate::post::Post;
use crate::webmention::MentionFeed;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
    #[error("failed to encode webmentions: {0}")]
    Feed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions<'a> {
    pub draft: bool,
    /// Site-wide `og:image`, blanked out of the front matter when repeated.
    pub default_image: Option<&'a str>,
}

/// Everything written for one post, still in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPost {
    /// The post, with its body already pointing at local assets.
    pub post: Post,
    /// `index.md` contents.
    pub document: String,
    pub assets: AssetMap,
    /// Comment feed, `None` when the page has no comments or reactions.
    pub feed: Option<Vec<u8>>,
}

pub fn render(
    page: &dyn PageExtractor,
    options: &RenderOptions<'_>,
    converter: &dyn Converter,
) -> Result<RenderedPost, RenderError> {
    let mut post = Post::extract(page, options.draft);
    let assets = page.rewriter().rewrite(&mut post.body);
    if let Some(fields) = post.indieweb.as_mut() {
        if let Some(local) = assets.local_name_for(&fields.featured_image) {
            fields.featured_image = local.to_string();
        }
    }

    let markdown = post.body.to_markdown(converter);
    let document = build_document(&post, &markdown, options.default_image)?;
    let feed = MentionFeed::new(page.mentions()).to_json()?;

    Ok(RenderedPost {
        post,
        document,
        assets,
        feed,
    })
}
