use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::{ParseError, Url};

/// Characters escaped in a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Decoded path component of an absolute or relative reference, without its
/// leading slash. Unparseable references yield `None`.
pub fn relative_path(reference: &str) -> Option<String> {
    Some(
        decoded_path(reference)?
            .trim_start_matches('/')
            .to_string(),
    )
}

/// Decoded path component including the leading slash.
pub fn decoded_path(reference: &str) -> Option<String> {
    let url = match Url::parse(reference) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("http://localhost/").ok()?;
            base.join(reference).ok()?
        }
        Err(_) => return None,
    };
    Some(percent_decode_str(url.path()).decode_utf8_lossy().into_owned())
}

/// Repair a link the microblog engine emitted with an unescaped slug.
///
/// The first path segment after the site prefix is kept; the rest is escaped
/// as one segment. Returns `None` when there is nothing to repair.
pub fn repair_url(website: &str, uri: &str) -> Option<String> {
    let website = website.trim_end_matches('/');
    let path = uri.strip_prefix(website).unwrap_or(uri);
    let path = path.strip_prefix('/').unwrap_or(path);
    let (first, rest) = path.split_once('/')?;
    let escaped = utf8_percent_encode(rest, PATH_SEGMENT);
    Some(format!("{website}/{first}/{escaped}"))
}

/// Last `/`-separated segment of a link.
pub fn last_segment(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}
