//! JSON request fixtures for the `eval` subcommand: deserialize a
//! fixture into a `RequestSource`, run it through the engine exactly as
//! a host server would, and report the resulting decision as JSON.

use serde::{Deserialize, Serialize};

use waf_core::types::{Method, Phase, RequestContext, RequestSource, RuleEngine};
use waf_core::{interceptor, pipeline, run_phase, EvalError, InterceptOutcome, PhaseOutcome};

#[derive(Debug, Deserialize)]
pub struct FixtureRequest {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub uri_args: String,
    pub content_type: Option<String>,
    pub body: Option<String>,
    pub real_client_ip: Option<String>,
    pub server_ip: Option<String>,
    #[serde(default)]
    pub conn_per_ip: u32,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestSource for FixtureRequest {
    fn method(&self) -> Method {
        match self.method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            _ => Method::Other,
        }
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
        self.real_client_ip.as_deref()
    }

    fn server_ip(&self) -> Option<&str> {
        self.server_ip.as_deref()
    }

    fn conn_per_ip(&self) -> u32 {
        self.conn_per_ip
    }
}

#[derive(Debug, Serialize)]
pub struct Decision {
    pub matched: bool,
    pub rule_id: u32,
    pub msg: String,
    pub gids: String,
    pub action: &'static str,
    pub status: Option<u16>,
    pub process_body_error: Option<&'static str>,
}

/// Run `fixture` through every request-side phase in order, then the
/// block list and the interceptor, exactly as a host integration would.
/// Fails if evaluating any phase hits an `EvalError` (e.g. a `gt` rule
/// against a non-numeric value); a host driving this path would decline
/// the request rather than guess at a decision.
pub fn evaluate_fixture(engine: &RuleEngine, fixture: &FixtureRequest) -> Result<Decision, EvalError> {
    let mut ctx = RequestContext::default();
    pipeline::populate_request(&mut ctx, fixture);

    let method = fixture.method();
    for phase in [Phase::REQUEST_HEADER, Phase::REQUEST_BODY] {
        if matches!(run_phase(engine, phase, &mut ctx, method)?, PhaseOutcome::Matched) {
            break;
        }
    }

    interceptor::process_block_list(engine, &mut ctx, method);
    let outcome = interceptor::intercept(&mut ctx, &engine.counters, &engine.denied_page);

    let (action, status) = match outcome {
        InterceptOutcome::Pass => ("pass", None),
        InterceptOutcome::Logged => ("log", None),
        InterceptOutcome::Blocked { status, .. } => ("block", Some(status)),
    };

    Ok(Decision {
        matched: ctx.matched,
        rule_id: ctx.rule_id,
        msg: ctx.msg,
        gids: ctx.gids,
        action,
        status,
        process_body_error: ctx.process_body_error_msg.map(|e| e.as_str()),
    })
}
