//! `multipart/form-data` parser (C3).
//!
//! Ports `ngx_http_yy_sec_waf_process_multipart`: extracts the boundary
//! from the `Content-Type` header, then walks the body part by part,
//! pulling `name=`/`filename=` off each `Content-Disposition` line and the
//! part's own `Content-Type` line (if any), and locating each part's body
//! by searching for the next boundary delimiter.
//!
//! The original scans a null-terminated C buffer with `strnstr`, which
//! stops early at an embedded `\0` and has to retry past it. We operate on
//! a `&[u8]` with an explicit length throughout, so a plain subslice
//! search already covers embedded nulls correctly and no retry loop is
//! needed.

use crate::error::ProcessBodyError;
use crate::types::RequestContext;
use crate::uri::unescape_in_place;

/// Longest boundary token accepted out of `Content-Type`, matching the
/// original's fixed-size boundary buffer.
const MAX_BOUNDARY_LEN: usize = 70;

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn trim_ascii(s: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = s.len();
    while start < end && s[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && s[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    &s[start..end]
}

fn strip_quotes(s: &[u8]) -> &[u8] {
    if s.len() >= 2 && s[0] == b'"' && s[s.len() - 1] == b'"' {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Pull `boundary=...` out of a `Content-Type: multipart/form-data;
/// boundary=...` header value. Case-insensitive; value may be quoted.
fn extract_boundary(content_type: &[u8]) -> Option<Vec<u8>> {
    const MARKER: &[u8] = b"boundary=";

    let lower: Vec<u8> = content_type.to_ascii_lowercase();
    let pos = find_subslice(&lower, MARKER, 0)?;
    let rest = &content_type[pos + MARKER.len()..];

    let end = rest
        .iter()
        .position(|&b| b == b';' || b == b'\r' || b == b'\n')
        .unwrap_or(rest.len());
    let raw = trim_ascii(&rest[..end]);
    let raw = strip_quotes(raw);

    if raw.is_empty() {
        return None;
    }
    let truncated = &raw[..raw.len().min(MAX_BOUNDARY_LEN)];
    Some(truncated.to_vec())
}

/// One header value found on a `Content-Disposition` line.
struct Disposition {
    name: Vec<u8>,
    filename: Option<Vec<u8>>,
}

/// Parse a quoted `key="value"` parameter list off a disposition line,
/// honoring `\"` as an escaped quote inside the value (the original scans
/// byte by byte for the matching unescaped `"`).
fn parse_quoted_param(line: &[u8], key: &[u8]) -> Option<Vec<u8>> {
    let lower = line.to_ascii_lowercase();
    let pos = find_subslice(&lower, key, 0)?;
    let mut i = pos + key.len();
    if i >= line.len() || line[i] != b'"' {
        return None;
    }
    i += 1;
    let mut out = Vec::new();
    while i < line.len() {
        match line[i] {
            b'\\' if i + 1 < line.len() && line[i + 1] == b'"' => {
                out.push(b'"');
                i += 2;
            }
            b'"' => return Some(out),
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    None
}

fn parse_disposition(line: &[u8]) -> Option<Disposition> {
    let name = parse_quoted_param(line, b"name=")?;
    let filename = parse_quoted_param(line, b"filename=");
    Some(Disposition { name, filename })
}

fn parse_part_content_type(line: &[u8]) -> Option<Vec<u8>> {
    const PREFIX: &[u8] = b"content-type:";
    let lower = line.to_ascii_lowercase();
    let pos = find_subslice(&lower, PREFIX, 0)?;
    Some(trim_ascii(&line[pos + PREFIX.len()..]).to_vec())
}

/// Sanity-check a declared filename against the part's content type.
///
/// Ports the original's heuristic verbatim, including its duplicated
/// clauses: both the `text/html` comparisons in the `.html`/`.htm` check,
/// and both the `application/octet-stream` comparisons in the
/// `.php`/`.jsp` check, compare against the very same string twice, so
/// the second comparison in each pair can never disagree with the first.
/// Extension detection is substring matching (the original's `strstr`),
/// not a suffix check — `upload.html.bak` still "looks html".
fn filename_content_type_mismatch(filename: &[u8], content_type: &[u8]) -> bool {
    let lower_name = filename.to_ascii_lowercase();
    let lower_ct = content_type.to_ascii_lowercase();

    let looks_html =
        find_subslice(&lower_name, b".html", 0).is_some() || find_subslice(&lower_name, b".htm", 0).is_some();
    if looks_html {
        let declares_html = find_subslice(&lower_ct, b"text/html", 0).is_some();
        let declares_html_again = find_subslice(&lower_ct, b"text/html", 0).is_some();
        if !declares_html && !declares_html_again {
            return true;
        }
    }

    let looks_script =
        find_subslice(&lower_name, b".php", 0).is_some() || find_subslice(&lower_name, b".jsp", 0).is_some();
    if looks_script {
        let declares_octet_stream = find_subslice(&lower_ct, b"application/octet-stream", 0).is_some();
        let declares_octet_stream_again = find_subslice(&lower_ct, b"application/octet-stream", 0).is_some();
        if !declares_octet_stream && !declares_octet_stream_again {
            return true;
        }
    }

    false
}

/// Parse `body` as `multipart/form-data` per the boundary declared in
/// `content_type`, writing each part's name/filename/content-type into
/// `ctx` and setting `ctx.process_body_error[_msg]` on the first anomaly.
/// Parsing stops at the first framing error (bad boundary or malformed
/// disposition); a per-part heuristic failure (hex-encoding, filename
/// mismatch) is recorded but parsing continues to the next part.
pub fn process_multipart(content_type: &[u8], body: &[u8], ctx: &mut RequestContext) {
    let boundary = match extract_boundary(content_type) {
        Some(b) => b,
        None => {
            set_error(ctx, ProcessBodyError::UncommonPostBoundary);
            return;
        }
    };

    let mut delimiter = Vec::with_capacity(boundary.len() + 2);
    delimiter.extend_from_slice(b"--");
    delimiter.extend_from_slice(&boundary);

    let mut pos = match find_subslice(body, &delimiter, 0) {
        Some(p) => p,
        None => {
            set_error(ctx, ProcessBodyError::UncommonPostBoundary);
            return;
        }
    };

    loop {
        pos += delimiter.len();

        if body[pos..].starts_with(b"--") {
            break;
        }

        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        }

        let header_end = match find_subslice(body, b"\r\n\r\n", pos) {
            Some(p) => p,
            None => {
                set_error(ctx, ProcessBodyError::UncommonPostFormat);
                return;
            }
        };
        let headers = &body[pos..header_end];
        let body_start = header_end + 4;

        let mut disposition = None;
        let mut part_content_type = None;
        for line in headers.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            let lower = line.to_ascii_lowercase();
            if find_subslice(&lower, b"content-disposition", 0).is_some() {
                disposition = parse_disposition(line);
            } else if find_subslice(&lower, b"content-type", 0).is_some() {
                part_content_type = parse_part_content_type(line);
            }
        }

        let disposition = match disposition {
            Some(d) => d,
            None => {
                set_error(ctx, ProcessBodyError::UncommonPostFormat);
                return;
            }
        };

        let mut next_delimiter = Vec::with_capacity(delimiter.len() + 2);
        next_delimiter.extend_from_slice(b"\r\n");
        next_delimiter.extend_from_slice(&delimiter);

        let next_pos = match find_subslice(body, &next_delimiter, body_start) {
            Some(p) => p,
            None => {
                set_error(ctx, ProcessBodyError::UncommonPostBoundary);
                return;
            }
        };

        ctx.multipart_name.push(disposition.name);

        if let Some(mut filename) = disposition.filename {
            let nulls = unescape_in_place(&mut filename);
            if nulls > 0 {
                set_error(ctx, ProcessBodyError::UncommonHexEncoding);
            }
            if let Some(ct) = &part_content_type {
                if filename_content_type_mismatch(&filename, ct) {
                    set_error(ctx, ProcessBodyError::UncommonFilename);
                }
            }
            ctx.multipart_filename.push(filename);
        } else {
            ctx.multipart_filename.push(Vec::new());
        }

        ctx.multipart_content_type
            .push(part_content_type.unwrap_or_default());

        // `next_pos` is the start of "\r\n--boundary"; advance past just the
        // "\r\n" so `pos` lands on "--boundary" again, matching the
        // invariant the top of this loop expects.
        pos = next_pos + 2;
    }
}

fn set_error(ctx: &mut RequestContext, err: ProcessBodyError) {
    if !ctx.process_body_error {
        ctx.process_body_error = true;
        ctx.process_body_error_msg = Some(err);
    }
}
