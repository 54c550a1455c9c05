//! Local JSON pointer resolution over a read-only OpenAPI document
//!
//! Only references into the same document are supported: `#/a/b`, `/a/b`,
//! `#` and the empty pointer. Any node reached while walking a pointer that
//! is itself a `{"$ref": ...}` is followed before the walk continues.

use serde_json::Value;

use crate::error::{Result, RolesError};

/// Maximum number of `$ref` hops followed for a single lookup, counting
/// every reference met along the way.
pub const MAX_REF_HOPS: usize = 64;

/// Escape a single reference token (`~` -> `~0`, `/` -> `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Encode reference tokens as a JSON pointer, e.g. `["paths", "/greet"]`
/// becomes `/paths/~1greet`.
pub fn encode_pointer<I, T>(tokens: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| format!("/{}", escape_token(token.as_ref())))
        .collect()
}

/// Decode a local pointer into its unescaped reference tokens.
pub fn decode_pointer(pointer: &str) -> Result<Vec<String>> {
    let body = if let Some(fragment) = pointer.strip_prefix('#') {
        urlencoding::decode(fragment)
            .map_err(|_| RolesError::UnresolvedRef(pointer.to_string()))?
            .into_owned()
    } else if pointer.is_empty() || pointer.starts_with('/') {
        pointer.to_string()
    } else {
        return Err(RolesError::NonLocalRef(pointer.to_string()));
    };

    if body.is_empty() {
        return Ok(Vec::new());
    }
    let Some(body) = body.strip_prefix('/') else {
        return Err(RolesError::NonLocalRef(pointer.to_string()));
    };

    Ok(body
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn ref_target(node: &Value) -> Option<&str> {
    node.as_object()?.get("$ref")?.as_str()
}

/// Follow `node` through any chain of `$ref` indirections.
///
/// Nodes that are not references are returned unchanged.
pub fn resolve<'a>(document: &'a Value, node: &'a Value) -> Result<&'a Value> {
    let mut hops = 0;
    follow(document, node, &mut hops)
}

/// Resolve a pointer string against `document`, following references on
/// every intermediate node.
pub fn resolve_ref<'a>(document: &'a Value, pointer: &str) -> Result<&'a Value> {
    let mut hops = 0;
    walk(document, pointer, &mut hops)
}

fn follow<'a>(document: &'a Value, node: &'a Value, hops: &mut usize) -> Result<&'a Value> {
    match ref_target(node) {
        Some(pointer) => walk(document, pointer, hops),
        None => Ok(node),
    }
}

fn walk<'a>(document: &'a Value, pointer: &str, hops: &mut usize) -> Result<&'a Value> {
    if *hops >= MAX_REF_HOPS {
        return Err(RolesError::RefCycle(pointer.to_string()));
    }
    *hops += 1;

    let tokens = decode_pointer(pointer)?;
    let mut current = follow(document, document, hops)?;
    for token in &tokens {
        let next = match current {
            Value::Object(map) => map.get(token.as_str()),
            Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        let next = next.ok_or_else(|| RolesError::UnresolvedRef(pointer.to_string()))?;
        current = follow(document, next, hops)?;
    }

    Ok(current)
}
