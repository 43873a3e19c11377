//! Environment variable fallbacks and `${VAR}` reference resolution.
//!
//! Env vars are fallbacks, not overrides: they only fill fields that no
//! config file set. Values from the embedded defaults do not count as set.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Supported env vars and the config field each one fills.
const ENV_MAPPINGS: &[(&str, &str)] = &[
    ("AUTHLIST_MODE", "broker.mode"),
    ("AUTHLIST_LOG_LEVEL", "logging.level"),
    ("AUTHLIST_APPROVAL_URL", "approval.url"),
    ("AUTHLIST_RPC_LISTEN", "rpc.listen"),
    ("AUTHLIST_USER_NAME", "approval.username"),
    ("AUTHLIST_USER_PASS", "approval.password"),
];

/// Apply env var fallbacks to fields not set by any config file.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for (var_name, field_path) in ENV_MAPPINGS {
        let set_by_file = sources
            .get(*field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if set_by_file {
            continue;
        }

        if let Some(val) = env_vars.get(*var_name) {
            debug!(var = var_name, field = field_path, "applying env var fallback");
            set_field(merged, field_path, toml::Value::String(val.clone()));
            sources.insert((*field_path).to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references inside string values, including strings in
/// arrays. Unresolvable references are left untouched.
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            for (_, child) in table.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut var_name = String::new();
        let mut closed = false;
        for ch in chars.by_ref() {
            if ch == '}' {
                closed = true;
                break;
            }
            var_name.push(ch);
        }

        if !closed || var_name.is_empty() {
            result.push_str("${");
            result.push_str(&var_name);
            if closed {
                result.push('}');
            }
        } else if let Some(val) = env_vars.get(&var_name) {
            result.push_str(val);
        } else {
            debug!(var = var_name, "unresolved env var reference in config");
            let _ = write!(result, "${{{var_name}}}");
        }
    }

    result
}

/// Set a dotted field in the tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
