//! `application/x-www-form-urlencoded` splitter (C2).
//!
//! Ports `ngx_http_yy_sec_waf_process_spliturl`: walks the raw body byte by
//! byte, splitting on `&` into `name=value` pairs, percent-decoding each
//! value, and joining the decoded values with `$`. A segment with no `=`
//! is not a field at all and is skipped — neither counted nor emitted,
//! matching the original's `else { p++; continue; }` branch. After every
//! value is decoded and joined, the *assembled* buffer is swept for `\r`,
//! `\n`, and `\0`, replacing each with a plain space — run before
//! decoding, a `%0D%0A` value would sail through unsanitized and only
//! turn into a raw CRLF once `unescape_uri` ran, reopening the line-split
//! smuggling the sweep exists to close.
//! Only values are kept — names are discarded, matching the original's
//! `ARGS_POST` semantics.

use crate::uri::unescape_uri;

fn sanitize_line_endings(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        if matches!(*b, b'\r' | b'\n' | 0) {
            *b = b' ';
        }
    }
}

/// Split and decode a urlencoded body. Returns the `$`-joined decoded
/// values and the number of `name=value` pairs found.
pub fn split_form(src: &[u8]) -> (Vec<u8>, u32) {
    let mut out = Vec::with_capacity(src.len());
    let mut count: u32 = 0;
    let mut first = true;

    for pair in src.split(|&b| b == b'&') {
        if pair.is_empty() {
            continue;
        }

        let Some(eq) = pair.iter().position(|&b| b == b'=') else {
            continue;
        };
        count += 1;

        let value = &pair[eq + 1..];
        let (decoded, _bad) = unescape_uri(value);

        if !first {
            out.push(b'$');
        }
        out.extend_from_slice(&decoded);
        first = false;
    }

    sanitize_line_endings(&mut out);
    (out, count)
}
