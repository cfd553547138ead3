//! End-to-end test: load a small rule file through `waf_loader`, replay a
//! handful of canned requests through the full request path exactly as
//! `waf-cli eval` does, and assert on the resulting decisions.

use waf_core::types::{Method, Phase, RequestContext, RequestSource, RuleEngine};
use waf_core::{interceptor, pipeline, run_phase, InterceptOutcome, PhaseOutcome};
use waf_loader::load_engine;

struct Request {
    method: Method,
    uri_args: String,
    content_type: Option<String>,
    body: Option<String>,
}

impl RequestSource for Request {
    fn method(&self) -> Method {
        self.method
    }

    fn uri_args(&self) -> &[u8] {
        self.uri_args.as_bytes()
    }

    fn content_type(&self) -> Option<&[u8]> {
        self.content_type.as_deref().map(str::as_bytes)
    }

    fn body(&self) -> Option<&[u8]> {
        self.body.as_deref().map(str::as_bytes)
    }

    fn real_client_ip(&self) -> Option<&str> {
        Some("198.51.100.7")
    }

    fn server_ip(&self) -> Option<&str> {
        Some("10.0.0.1")
    }

    fn conn_per_ip(&self) -> u32 {
        1
    }
}

const RULES: &str = r#"
# SQL-injection-ish probe in the query string
rule ARGS regex:(?i)union\s+select id:1001 lev:block msg:'sqli probe' status:403

# chained rule: only fires when both links match
rule ARGS str:admin id:1002 chain lev:block msg:'admin probe'
rule POST_ARGS_COUNT gt:0 id:1003 lev:block

# malformed multipart uploads get flagged and logged
rule PROCESS_BODY_ERROR str:UNCOMMON_POST_BOUNDARY id:1004 lev:log msg:'bad multipart'

block_list $ARGS (?i)evilbot
"#;

fn engine() -> RuleEngine {
    load_engine(RULES).expect("rule file should load")
}

fn decide(engine: &RuleEngine, req: &Request) -> (bool, InterceptOutcome) {
    let mut ctx = RequestContext::default();
    pipeline::populate_request(&mut ctx, req);

    for phase in [Phase::REQUEST_HEADER, Phase::REQUEST_BODY] {
        if matches!(
            run_phase(engine, phase, &mut ctx, req.method()).expect("eval should not error"),
            PhaseOutcome::Matched
        ) {
            break;
        }
    }
    interceptor::process_block_list(engine, &mut ctx, req.method());
    let outcome = interceptor::intercept(&mut ctx, &engine.counters, &engine.denied_page);
    (ctx.matched, outcome)
}

#[test]
fn benign_request_passes() {
    let engine = engine();
    let req = Request {
        method: Method::Get,
        uri_args: "page=2&sort=name".to_string(),
        content_type: None,
        body: None,
    };
    let (matched, outcome) = decide(&engine, &req);
    assert!(!matched);
    assert_eq!(outcome, InterceptOutcome::Pass);
}

#[test]
fn sqli_probe_is_blocked_with_its_own_status() {
    let engine = engine();
    let req = Request {
        method: Method::Get,
        uri_args: "q=1 UNION SELECT password FROM users".to_string(),
        content_type: None,
        body: None,
    };
    let (matched, outcome) = decide(&engine, &req);
    assert!(matched);
    assert_eq!(
        outcome,
        InterceptOutcome::Blocked {
            status: 403,
            body: engine.denied_page.clone(),
        }
    );
}

#[test]
fn chained_rule_requires_every_link_to_match() {
    let engine = engine();

    // ARGS contains "admin" but there's no POST body, so POST_ARGS_COUNT
    // is NOT_FOUND and the chain's second link can't match.
    let only_first_link = Request {
        method: Method::Get,
        uri_args: "user=admin".to_string(),
        content_type: None,
        body: None,
    };
    let (matched, outcome) = decide(&engine, &only_first_link);
    assert!(!matched);
    assert_eq!(outcome, InterceptOutcome::Pass);

    let both_links = Request {
        method: Method::Post,
        uri_args: "user=admin".to_string(),
        content_type: Some("application/x-www-form-urlencoded".to_string()),
        body: Some("submit=1".to_string()),
    };
    let (matched, outcome) = decide(&engine, &both_links);
    assert!(matched);
    assert!(matches!(outcome, InterceptOutcome::Blocked { status: 412, .. }));
}

#[test]
fn malformed_multipart_boundary_is_logged_not_blocked() {
    let engine = engine();
    let req = Request {
        method: Method::Post,
        uri_args: String::new(),
        content_type: Some("multipart/form-data".to_string()),
        body: Some("not actually multipart".to_string()),
    };
    let (matched, outcome) = decide(&engine, &req);
    assert!(matched);
    assert_eq!(outcome, InterceptOutcome::Logged);
}

#[test]
fn block_list_strengthens_an_unrelated_match_into_a_block() {
    let engine = engine();
    let req = Request {
        method: Method::Get,
        uri_args: "ref=evilbot-crawler".to_string(),
        content_type: None,
        body: None,
    };
    let (matched, outcome) = decide(&engine, &req);
    assert!(matched);
    assert!(matches!(outcome, InterceptOutcome::Blocked { .. }));
}
