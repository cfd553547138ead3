//! Variable registry (C4): resolves a rule's variable name to a byte
//! value out of the current `RequestContext`.
//!
//! Ports the `yy_sec_waf_get_*` family. Every resolver can return
//! "not found" — an absent variable makes its rule `AGAIN` rather than
//! `NoMatch` (see `evaluator`), mirroring the original's `NOT_FOUND` rc.
//!
//! `ARGS` and `ARGS_POST` intentionally resolve through the same
//! function: the original never split them, so a rule written against
//! `ARGS_POST` sees exactly what `ARGS` sees (§9 open question, kept
//! as-is rather than "fixed").

use std::collections::HashMap;

use crate::types::{Method, RawStringSource, RequestContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VariableKind {
    Args,
    ArgsPost,
    PostArgsCount,
    ProcessBodyError,
    MultipartName,
    MultipartFilename,
    MultipartContentType,
    ConnPerIp,
}

const ALL_KINDS: &[(&str, VariableKind)] = &[
    ("ARGS", VariableKind::Args),
    ("ARGS_POST", VariableKind::ArgsPost),
    ("POST_ARGS_COUNT", VariableKind::PostArgsCount),
    ("PROCESS_BODY_ERROR", VariableKind::ProcessBodyError),
    ("MULTIPART_NAME", VariableKind::MultipartName),
    ("MULTIPART_FILENAME", VariableKind::MultipartFilename),
    ("MULTIPART_CONTENT_TYPE", VariableKind::MultipartContentType),
    ("CONN_PER_IP", VariableKind::ConnPerIp),
];

/// Result of resolving a variable against a request.
pub enum ResolvedVar {
    Found(Vec<u8>),
    NotFound,
}

/// Maps variable names (as written in rule directives) to stable indices,
/// and resolves an index against a `RequestContext`.
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    by_name: HashMap<String, usize>,
    kinds: Vec<VariableKind>,
}

impl Default for VariableRegistry {
    fn default() -> Self {
        let mut by_name = HashMap::with_capacity(ALL_KINDS.len());
        let mut kinds = Vec::with_capacity(ALL_KINDS.len());
        for (i, (name, kind)) in ALL_KINDS.iter().enumerate() {
            by_name.insert((*name).to_string(), i);
            kinds.push(*kind);
        }
        Self { by_name, kinds }
    }
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable's index by its directive-file name (e.g. `ARGS`).
    pub fn get_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Resolve `index` against `ctx`. Takes `ctx` mutably because `ARGS`
    /// resolution also pins `raw_string` for the interceptor's log-line
    /// truncation, matching the original's side effect in the same call.
    pub fn resolve(&self, index: usize, ctx: &mut RequestContext, method: Method) -> ResolvedVar {
        match self.kinds[index] {
            VariableKind::Args | VariableKind::ArgsPost => resolve_args(ctx, method),
            VariableKind::PostArgsCount => {
                if ctx.post_args_count == 0 {
                    ResolvedVar::NotFound
                } else {
                    ResolvedVar::Found(ctx.post_args_count.to_string().into_bytes())
                }
            }
            VariableKind::ProcessBodyError => match ctx.process_body_error_msg {
                Some(err) => ResolvedVar::Found(err.as_str().as_bytes().to_vec()),
                None => ResolvedVar::NotFound,
            },
            VariableKind::MultipartName => join_nonempty(&ctx.multipart_name),
            VariableKind::MultipartFilename => join_nonempty(&ctx.multipart_filename),
            VariableKind::MultipartContentType => join_nonempty(&ctx.multipart_content_type),
            VariableKind::ConnPerIp => {
                if ctx.conn_per_ip == 0 {
                    ResolvedVar::NotFound
                } else {
                    ResolvedVar::Found(ctx.conn_per_ip.to_string().into_bytes())
                }
            }
        }
    }
}

fn resolve_args(ctx: &mut RequestContext, method: Method) -> ResolvedVar {
    if ctx.args.is_empty() && ctx.post_args.is_empty() {
        return ResolvedVar::NotFound;
    }

    ctx.raw_string = match method {
        Method::Get => RawStringSource::Args,
        Method::Post => RawStringSource::FullBody,
        Method::Other => RawStringSource::None,
    };

    if ctx.post_args.is_empty() {
        return ResolvedVar::Found(ctx.args.clone());
    }
    if ctx.args.is_empty() {
        return ResolvedVar::Found(ctx.post_args.clone());
    }

    let mut combined = Vec::with_capacity(ctx.args.len() + 1 + ctx.post_args.len());
    combined.extend_from_slice(&ctx.args);
    combined.push(b',');
    combined.extend_from_slice(&ctx.post_args);
    ResolvedVar::Found(combined)
}

/// Concatenate every part with no separator at all, matching the
/// original's bare `ngx_cpymem` copy loop over each multipart part.
fn join_nonempty(parts: &[Vec<u8>]) -> ResolvedVar {
    let total: usize = parts.iter().map(|p| p.len()).sum();
    if total == 0 {
        return ResolvedVar::NotFound;
    }
    let mut out = Vec::with_capacity(total);
    for p in parts {
        out.extend_from_slice(p);
    }
    ResolvedVar::Found(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve_to_indices() {
        let reg = VariableRegistry::new();
        assert!(reg.get_index("ARGS").is_some());
        assert!(reg.get_index("ARGS_POST").is_some());
        assert!(reg.get_index("NOT_A_REAL_VARIABLE").is_none());
    }

    #[test]
    fn args_and_args_post_resolve_identically() {
        let reg = VariableRegistry::new();
        let mut ctx = RequestContext {
            args: b"a=1".to_vec(),
            ..Default::default()
        };
        let i_args = reg.get_index("ARGS").unwrap();
        let i_args_post = reg.get_index("ARGS_POST").unwrap();

        let v1 = match reg.resolve(i_args, &mut ctx, Method::Get) {
            ResolvedVar::Found(v) => v,
            ResolvedVar::NotFound => panic!("expected found"),
        };
        let v2 = match reg.resolve(i_args_post, &mut ctx, Method::Get) {
            ResolvedVar::Found(v) => v,
            ResolvedVar::NotFound => panic!("expected found"),
        };
        assert_eq!(v1, v2);
    }

    #[test]
    fn args_not_found_when_both_empty() {
        let reg = VariableRegistry::new();
        let mut ctx = RequestContext::default();
        let idx = reg.get_index("ARGS").unwrap();
        assert!(matches!(
            reg.resolve(idx, &mut ctx, Method::Get),
            ResolvedVar::NotFound
        ));
    }

    #[test]
    fn args_combines_query_and_post_with_comma() {
        let reg = VariableRegistry::new();
        let mut ctx = RequestContext {
            args: b"q".to_vec(),
            post_args: b"p".to_vec(),
            ..Default::default()
        };
        let idx = reg.get_index("ARGS").unwrap();
        match reg.resolve(idx, &mut ctx, Method::Post) {
            ResolvedVar::Found(v) => assert_eq!(v, b"q,p"),
            ResolvedVar::NotFound => panic!("expected found"),
        }
        assert_eq!(ctx.raw_string, RawStringSource::FullBody);
    }

    #[test]
    fn process_body_error_resolves_to_tag_string() {
        let reg = VariableRegistry::new();
        let mut ctx = RequestContext {
            process_body_error: true,
            process_body_error_msg: Some(crate::error::ProcessBodyError::UncommonHexEncoding),
            ..Default::default()
        };
        let idx = reg.get_index("PROCESS_BODY_ERROR").unwrap();
        match reg.resolve(idx, &mut ctx, Method::Post) {
            ResolvedVar::Found(v) => assert_eq!(v, b"UNCOMMON_HEX_ENCODING"),
            ResolvedVar::NotFound => panic!("expected found"),
        }
    }

    #[test]
    fn multipart_name_concatenates_with_no_separator() {
        let reg = VariableRegistry::new();
        let mut ctx = RequestContext {
            multipart_name: vec![b"a".to_vec(), Vec::new(), b"b".to_vec()],
            ..Default::default()
        };
        let idx = reg.get_index("MULTIPART_NAME").unwrap();
        match reg.resolve(idx, &mut ctx, Method::Post) {
            ResolvedVar::Found(v) => assert_eq!(v, b"ab"),
            ResolvedVar::NotFound => panic!("expected found"),
        }
    }
}
