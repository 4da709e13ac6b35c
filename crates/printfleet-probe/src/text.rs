//! Best-effort text recovery for device payloads.
//!
//! Printer firmware is loose about charsets: headers lie, XML prologs
//! disagree with headers, and SNMP strings come back in whatever the
//! panel language happens to be. Decoding never fails; it degrades.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;

static INLINE_CHARSET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:charset|encoding)\s*=\s*["']?([A-Za-z0-9_\-:.]+)"#).ok()
});

/// Decode a body using the declared charset, else UTF-8, else Windows-1252.
///
/// The declared charset comes from the `Content-Type` header when present,
/// otherwise from an inline `<meta charset>` or `<?xml encoding?>` in the
/// first kilobyte.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_from_header)
        .or_else(|| sniff_inline_charset(bytes));

    if let Some(encoding) = declared {
        let (text, _, _) = encoding.decode(bytes);
        return strip_nuls(&text);
    }
    decode_loose(bytes)
}

/// Decode bytes with no declared charset (SNMP octet strings, mostly).
pub fn decode_loose(bytes: &[u8]) -> String {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return strip_nuls(&text);
    }
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    strip_nuls(&text)
}

/// `true` when a body that should be XML/JSON is actually an HTML page
/// (login redirect, 404 skin, captive portal).
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body.chars().take(200).collect::<String>().to_ascii_lowercase();
    head.contains("<html") || head.contains("<!doctype html")
}

fn charset_from_header(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

fn sniff_inline_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(1024)];
    let re = INLINE_CHARSET.as_ref()?;
    let caps = re.captures(head)?;
    Encoding::for_label(caps.get(1)?.as_bytes())
}

fn strip_nuls(text: &str) -> String {
    text.trim_matches('\0').to_owned()
}
