//! Filename derivation for downloaded leaves.
//!
//! Leaf names often only arrive with the byte stream (Content-Disposition)
//! or must be guessed from the URL path; either way the result has to be a
//! safe single path segment before it touches the filesystem.

/// Fallback name when neither the header nor the URL yields anything usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// Linux NAME_MAX; longer names are truncated at a char boundary.
const NAME_MAX: usize = 255;

/// Extracts a filename from a raw `Content-Disposition` header value.
///
/// `filename*=UTF-8''percent-encoded` (RFC 5987) wins over a plain
/// `filename=` parameter when both are present.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for part in header.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if key.eq_ignore_ascii_case("filename*") {
            // Only the UTF-8 form is handled; other charsets fall through
            // to a plain `filename=` parameter if one is present.
            let Some(encoded) = value
                .strip_prefix("UTF-8''")
                .or_else(|| value.strip_prefix("utf-8''"))
            else {
                continue;
            };
            let decoded = percent_decode(encoded);
            if !decoded.is_empty() {
                return Some(decoded);
            }
        } else if key.eq_ignore_ascii_case("filename") {
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .map(|v| v.replace("\\\"", "\"").replace("\\\\", "\\"))
                .unwrap_or_else(|| value.to_string());
            if !unquoted.is_empty() {
                plain = Some(unquoted);
            }
        }
    }

    plain
}

/// Extracts the last non-empty path segment of a URL for use as a filename hint.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().rsplit('/').find(|s| !s.is_empty())?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(percent_decode(segment))
}

/// Sanitizes a candidate filename into a safe single path segment.
///
/// Path separators, NUL and control characters become `_`; leading/trailing
/// dots and whitespace are trimmed; the result is capped at NAME_MAX bytes.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '/' || c == '\\' || c == '\0' || c.is_control() {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim().trim_matches('.').trim();
    let mut take = trimmed.len().min(NAME_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}

/// Derives a safe filename for a leaf download.
///
/// Prefers an explicitly known name, then the Content-Disposition header,
/// then the URL path; falls back to `download.bin`.
pub fn derive_filename(
    known_name: Option<&str>,
    content_disposition: Option<&str>,
    url: &str,
) -> String {
    let candidate = known_name
        .map(str::to_string)
        .or_else(|| content_disposition.and_then(content_disposition_filename))
        .or_else(|| filename_from_url(url));

    let sanitized = candidate.as_deref().map(sanitize_filename).unwrap_or_default();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let pair = bytes.get(i + 1..i + 3).and_then(|p| std::str::from_utf8(p).ok());
            if let Some(byte) = pair.and_then(|p| u8::from_str_radix(p, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_quoted() {
        let r = content_disposition_filename("attachment; filename=\"score.pdf\"");
        assert_eq!(r.as_deref(), Some("score.pdf"));
    }

    #[test]
    fn disposition_token() {
        let r = content_disposition_filename("attachment; filename=score.pdf");
        assert_eq!(r.as_deref(), Some("score.pdf"));
    }

    #[test]
    fn disposition_rfc5987_wins() {
        let r = content_disposition_filename(
            "attachment; filename=\"fallback.bin\"; filename*=UTF-8''caf%C3%A9.pdf",
        );
        assert_eq!(r.as_deref(), Some("café.pdf"));
    }

    #[test]
    fn disposition_unknown_charset_falls_back_to_plain_filename() {
        let r = content_disposition_filename(
            "attachment; filename*=ISO-8859-1''enc%E9.pdf; filename=\"plain.pdf\"",
        );
        assert_eq!(r.as_deref(), Some("plain.pdf"));
    }

    #[test]
    fn disposition_escaped_quotes() {
        let r = content_disposition_filename(r#"attachment; filename="a \"b\".pdf""#);
        assert_eq!(r.as_deref(), Some(r#"a "b".pdf"#));
    }

    #[test]
    fn url_last_segment() {
        assert_eq!(
            filename_from_url("https://example.com/a/b/score.zip").as_deref(),
            Some("score.zip")
        );
        assert_eq!(filename_from_url("https://example.com/"), None);
        assert_eq!(
            filename_from_url("https://example.com/my%20score.pdf").as_deref(),
            Some("my score.pdf")
        );
    }

    #[test]
    fn sanitize_separators_and_controls() {
        assert_eq!(sanitize_filename("a/b\\c.pdf"), "a_b_c.pdf");
        assert_eq!(sanitize_filename("x\x00y\x07z"), "x_y_z");
    }

    #[test]
    fn sanitize_trims_dots_and_spaces() {
        assert_eq!(sanitize_filename("  ..score.pdf.  "), "score.pdf");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_filename(&long).len(), 255);
    }

    #[test]
    fn derive_prefers_known_name() {
        assert_eq!(
            derive_filename(Some("known.pdf"), Some("attachment; filename=hdr.pdf"), "https://e.com/u.pdf"),
            "known.pdf"
        );
    }

    #[test]
    fn derive_falls_back_through_sources() {
        assert_eq!(
            derive_filename(None, Some("attachment; filename=hdr.pdf"), "https://e.com/u.pdf"),
            "hdr.pdf"
        );
        assert_eq!(derive_filename(None, None, "https://e.com/u.pdf"), "u.pdf");
        assert_eq!(derive_filename(None, None, "https://e.com/"), "download.bin");
    }
}
