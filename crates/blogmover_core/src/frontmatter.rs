use serde::Serialize;
use toml::value::Datetime;

use crate::post::Post;

pub const FRONT_MATTER_SEPARATOR: &str = "+++\n";

#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    #[error("date cannot be expressed as a TOML datetime: {0}")]
    Date(#[from] toml::value::DatetimeParseError),
    #[error("failed to encode front matter: {0}")]
    Encode(#[from] toml::ser::Error),
}

// Keys are declared in alphabetical order, which is also their output order.
#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    aliases: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<Datetime>,
    draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    featured_image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    like_of: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    posse: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a [String]>,
    title: &'a str,
}

/// `+++`-delimited TOML block for a post.
///
/// `default_image` is the site-wide `og:image`; a featured image equal to it
/// is written as an empty string.
pub fn build_front_matter(
    post: &Post,
    default_image: Option<&str>,
) -> Result<String, FrontMatterError> {
    let date = post
        .date
        .as_ref()
        .map(|date| date.to_rfc3339().parse::<Datetime>())
        .transpose()?;

    let featured_image = post.indieweb.as_ref().map(|fields| {
        if Some(fields.featured_image.as_str()) == default_image {
            ""
        } else {
            fields.featured_image.as_str()
        }
    });

    let front_matter = FrontMatter {
        aliases: post.indieweb.as_ref().map(|f| f.aliases.as_slice()),
        date,
        draft: post.draft,
        featured_image,
        like_of: post.indieweb.as_ref().map(|f| f.like_of.as_str()),
        posse: post.indieweb.as_ref().map(|f| f.syndication.as_slice()),
        reply_to: post.indieweb.as_ref().map(|f| f.reply_to.as_slice()),
        tags: post.tags.as_deref(),
        title: &post.title,
    };
    let body = toml::to_string(&front_matter)?;
    Ok(format!("{FRONT_MATTER_SEPARATOR}{body}{FRONT_MATTER_SEPARATOR}"))
}

/// Front matter immediately followed by the Markdown body.
pub fn build_document(
    post: &Post,
    markdown: &str,
    default_image: Option<&str>,
) -> Result<String, FrontMatterError> {
    let mut document = build_front_matter(post, default_image)?;
    document.push_str(markdown);
    Ok(document)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::content::PageContent;
    use crate::post::IndieWebFields;

    fn post() -> Post {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        Post {
            title: "Soundcheck".into(),
            date: offset.with_ymd_and_hms(2009, 3, 17, 21, 5, 0).single(),
            canonical_slug: "p706232_soundcheck.htm".into(),
            tags: None,
            body: PageContent::default(),
            draft: false,
            indieweb: None,
        }
    }

    #[test]
    fn minimal_front_matter_has_structured_date() {
        let fm = build_front_matter(&post(), None).unwrap();
        assert_eq!(
            fm,
            "+++\ndate = 2009-03-17T21:05:00+03:00\ndraft = false\ntitle = \"Soundcheck\"\n+++\n"
        );
    }

    #[test]
    fn missing_date_is_omitted_and_tags_follow_platform_support() {
        let mut post = post();
        post.date = None;
        post.draft = true;
        post.tags = Some(vec!["music".into(), "life".into()]);
        let fm = build_front_matter(&post, None).unwrap();
        assert!(!fm.contains("date ="));
        assert!(fm.contains("draft = true"));
        assert!(fm.contains(r#"tags = ["music", "life"]"#), "{fm}");
    }

    #[test]
    fn default_featured_image_is_blanked() {
        let mut post = post();
        post.indieweb = Some(IndieWebFields {
            aliases: vec!["/2020/post".into()],
            featured_image: "https://blog.example/logo.png".into(),
            ..IndieWebFields::default()
        });
        let fm = build_front_matter(&post, Some("https://blog.example/logo.png")).unwrap();
        assert!(fm.contains("featured_image = \"\""), "{fm}");
        assert!(fm.contains(r#"aliases = ["/2020/post"]"#), "{fm}");
        assert!(fm.contains("like_of = \"\""));

        let fm = build_front_matter(&post, Some("https://blog.example/other.png")).unwrap();
        assert!(fm.contains("featured_image = \"https://blog.example/logo.png\""));
    }

    #[test]
    fn document_is_front_matter_then_body() {
        let doc = build_document(&post(), "Body text\n", None).unwrap();
        assert!(doc.starts_with(FRONT_MATTER_SEPARATOR));
        assert!(doc.ends_with("+++\nBody text\n"));
    }
}
