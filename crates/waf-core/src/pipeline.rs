//! Body-processing orchestration: wires C1 (URI decode), C2 (form
//! split), and C3 (multipart) together ahead of rule evaluation.
//!
//! Ports the content-type dispatch in `ngx_http_yy_sec_waf_process_body`:
//! a missing `Content-Type` on a request with a body is
//! `UNCOMMON_CONTENT_TYPE`; a body present under a content type that is
//! neither urlencoded nor multipart is `UNCOMMON_POST_FORMAT`. A request
//! with no body at all (GET, or a host that declined to buffer it) skips
//! body processing entirely — `ARGS` then resolves off the query string
//! alone.

use crate::error::ProcessBodyError;
use crate::formsplit::split_form;
use crate::multipart::process_multipart;
use crate::types::{RequestContext, RequestSource};
use crate::uri::unescape_uri;

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Populate `ctx` from everything `source` exposes about one request:
/// decoded query args, connection metadata, and — if a body is present —
/// either split form fields or parsed multipart parts.
pub fn populate_request(ctx: &mut RequestContext, source: &dyn RequestSource) {
    let (decoded_args, _bad) = unescape_uri(source.uri_args());
    ctx.args = decoded_args;
    ctx.real_client_ip = source.real_client_ip().map(str::to_string);
    ctx.server_ip = source.server_ip().map(str::to_string);
    ctx.conn_per_ip = source.conn_per_ip();

    let Some(body) = source.body() else {
        return;
    };
    ctx.full_body = Some(body.to_vec());

    let Some(content_type) = source.content_type() else {
        ctx.process_body_error = true;
        ctx.process_body_error_msg = Some(ProcessBodyError::UncommonContentType);
        return;
    };

    let lower = content_type.to_ascii_lowercase();
    if contains(&lower, b"application/x-www-form-urlencoded") {
        let (joined, count) = split_form(body);
        ctx.post_args = joined;
        ctx.post_args_count = count;
    } else if contains(&lower, b"multipart/form-data") {
        process_multipart(content_type, body, ctx);
    } else {
        ctx.process_body_error = true;
        ctx.process_body_error_msg = Some(ProcessBodyError::UncommonPostFormat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Method;

    struct Fixture {
        method: Method,
        uri_args: Vec<u8>,
        content_type: Option<Vec<u8>>,
        body: Option<Vec<u8>>,
    }

    impl RequestSource for Fixture {
        fn method(&self) -> Method {
            self.method
        }
        fn uri_args(&self) -> &[u8] {
            &self.uri_args
        }
        fn content_type(&self) -> Option<&[u8]> {
            self.content_type.as_deref()
        }
        fn body(&self) -> Option<&[u8]> {
            self.body.as_deref()
        }
        fn real_client_ip(&self) -> Option<&str> {
            None
        }
        fn server_ip(&self) -> Option<&str> {
            None
        }
        fn conn_per_ip(&self) -> u32 {
            0
        }
    }

    #[test]
    fn get_without_body_only_populates_args() {
        let source = Fixture {
            method: Method::Get,
            uri_args: b"q=hello%20world".to_vec(),
            content_type: None,
            body: None,
        };
        let mut ctx = RequestContext::default();
        populate_request(&mut ctx, &source);
        assert_eq!(ctx.args, b"q=hello world");
        assert!(!ctx.process_body_error);
    }

    #[test]
    fn post_urlencoded_body_splits_into_post_args() {
        let source = Fixture {
            method: Method::Post,
            uri_args: Vec::new(),
            content_type: Some(b"application/x-www-form-urlencoded".to_vec()),
            body: Some(b"a=1&b=2".to_vec()),
        };
        let mut ctx = RequestContext::default();
        populate_request(&mut ctx, &source);
        assert_eq!(ctx.post_args, b"1,2");
        assert_eq!(ctx.post_args_count, 2);
    }

    #[test]
    fn body_with_no_content_type_is_uncommon_content_type() {
        let source = Fixture {
            method: Method::Post,
            uri_args: Vec::new(),
            content_type: None,
            body: Some(b"a=1".to_vec()),
        };
        let mut ctx = RequestContext::default();
        populate_request(&mut ctx, &source);
        assert_eq!(
            ctx.process_body_error_msg,
            Some(ProcessBodyError::UncommonContentType)
        );
    }

    #[test]
    fn unrecognized_content_type_is_uncommon_post_format() {
        let source = Fixture {
            method: Method::Post,
            uri_args: Vec::new(),
            content_type: Some(b"application/json".to_vec()),
            body: Some(b"{}".to_vec()),
        };
        let mut ctx = RequestContext::default();
        populate_request(&mut ctx, &source);
        assert_eq!(
            ctx.process_body_error_msg,
            Some(ProcessBodyError::UncommonPostFormat)
        );
    }
}
