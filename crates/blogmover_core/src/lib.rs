//! Blogmover core: platform extraction, content rewriting, webmentions and
//! front matter. Pure functions over parsed documents; no IO.
mod content;
mod dates;
pub mod dom;
mod frontmatter;
mod platform;
mod post;
mod render;
mod urls;
mod webmention;

pub use content::{Asset, AssetMap, ContentRewriter, Converter, Html2MdConverter, PageContent};
pub use dates::translate_russian_months;
pub use frontmatter::{build_document, build_front_matter, FrontMatterError, FRONT_MATTER_SEPARATOR};
pub use platform::{
    DiaryPage, ExtractContext, JournalPage, MicroblogPage, PageExtractor, Platform, SocialPage,
};
pub use post::{IndieWebFields, Post, UNDATED_YEAR};
pub use render::{render, RenderError, RenderOptions, RenderedPost};
pub use urls::{decoded_path, relative_path, repair_url};
pub use webmention::{
    Author, CommentSource, Mention, MentionContent, MentionFeed, IN_REPLY_TO, LIKE_OF, REPOST_OF,
};
