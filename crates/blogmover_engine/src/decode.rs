use blogmover_logging::migrate_warn;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use scraper::Html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
}

/// Decode a fetched page: BOM -> Content-Type charset -> meta charset -> chardetng.
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> DecodedHtml {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(enc) = content_type
        .and_then(extract_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    if let Some(enc) = meta_charset(bytes) {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

/// Decode an archived file: BOM -> meta charset -> UTF-8.
///
/// Saved pages announce their charset in markup only; anything undeclared is
/// taken as UTF-8.
pub fn decode_local(bytes: &[u8]) -> DecodedHtml {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }
    decode_with(bytes, meta_charset(bytes).unwrap_or(UTF_8))
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(['"', '\'']).to_string())
        })
        .next()
}

/// Charset declared by `<meta charset>` or `<meta http-equiv content>`; the
/// last declaration wins. Markup is ASCII in every encoding we meet, so a
/// lossy UTF-8 view is enough to read it.
fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let preview = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&preview);
    let metas = blogmover_core::dom::select_all(document.root_element(), "head meta");

    let mut found = None;
    for meta in metas {
        let element = meta.value();
        let label = match (element.attr("charset"), element.attr("http-equiv")) {
            (Some(charset), _) => Some(charset.to_string()),
            (None, Some(_)) => element.attr("content").and_then(extract_charset),
            (None, None) => None,
        };
        if let Some(enc) = label.and_then(|label| Encoding::for_label(label.trim().as_bytes())) {
            found = Some(enc);
        }
    }
    found
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedHtml {
    let (text, used, had_errors) = enc.decode(bytes);
    if had_errors {
        migrate_warn!(
            "Document is not valid {}, replacement characters inserted",
            used.name()
        );
    }
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: used.name().to_string(),
    }
}
