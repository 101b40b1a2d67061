//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Environment variables are a fallback, not an override: they only fill
//! fields that no config file set.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// Supported `PERSONA_*` mappings plus the standard `OPENAI_API_KEY`.
///
/// Earlier entries win when two variables target the same field.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PERSONA_MODEL",
        field_path: "model.model",
    },
    EnvMapping {
        var_name: "PERSONA_MODEL_PROVIDER",
        field_path: "model.provider",
    },
    EnvMapping {
        var_name: "PERSONA_MODEL_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "OPENAI_API_KEY",
        field_path: "model.api_key",
    },
    EnvMapping {
        var_name: "PERSONA_MODEL_API_URL",
        field_path: "model.api_url",
    },
    EnvMapping {
        var_name: "PERSONA_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "PERSONA_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "PERSONA_MAX_TOOL_ITERATIONS",
        field_path: "orchestrator.max_tool_iterations",
    },
    EnvMapping {
        var_name: "PERSONA_MAX_RETRIES",
        field_path: "orchestrator.max_retries",
    },
    EnvMapping {
        var_name: "PERSONA_STRICT_PERSONA",
        field_path: "orchestrator.strict_persona",
    },
    EnvMapping {
        var_name: "PERSONA_APPROVAL_TIMEOUT_MS",
        field_path: "approval.timeout_ms",
    },
    EnvMapping {
        var_name: "PERSONA_SANDBOX_ENABLED",
        field_path: "sandbox.enabled",
    },
    EnvMapping {
        var_name: "PERSONA_SANDBOX_IMAGE",
        field_path: "sandbox.image",
    },
    EnvMapping {
        var_name: "PERSONA_SANDBOX_TIMEOUT_MS",
        field_path: "sandbox.timeout_ms",
    },
    EnvMapping {
        var_name: "PERSONA_DOCKER_URL",
        field_path: "sandbox.engine_url",
    },
];

/// Apply environment variable fallbacks to fields no config file set.
///
/// Returns the number of variables applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let taken = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if taken {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );
            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// Unresolved references are left as written.
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
        if ch == '$' && chars.peek() == Some(&'{') {
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

            if closed && !var_name.is_empty() {
                if let Some(val) = env_vars.get(&var_name) {
                    result.push_str(val);
                } else {
                    debug!(var = var_name, "unresolved env var reference in config");
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                result.push_str("${");
                result.push_str(&var_name);
                if closed {
                    result.push('}');
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);

    let Some((parents, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), toml_val);
        }
        return;
    };

    let mut current = root;
    for segment in parents.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), toml_val);
    }
}

/// Coerce an env var string to the TOML type its field expects.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(
        path,
        "orchestrator.max_tool_iterations"
            | "orchestrator.max_retries"
            | "approval.timeout_ms"
            | "sandbox.timeout_ms"
    ) && let Ok(i) = val.trim().parse::<i64>()
    {
        return toml::Value::Integer(i);
    }

    if matches!(path, "orchestrator.strict_persona" | "sandbox.enabled") {
        match val.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => return toml::Value::Boolean(true),
            "false" | "0" | "no" | "off" => return toml::Value::Boolean(false),
            _ => {},
        }
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
