//! Config file discovery and layered loading.
//!
//! `load()` runs these steps:
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge the user file (`<config dir>/persona/config.toml`)
//! 3. Merge the explicit file, if one was given
//! 4. Apply `PERSONA_*` fallbacks for fields no file set
//! 5. Resolve `${VAR}` references and deserialize
//! 6. Validate

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, resolve_env_references};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration plus where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Layer that set each dotted field path.
    pub field_sources: FieldSources,
    /// Files merged, in load order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// The layer that set `field` (dotted path), if tracked.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<&ConfigLayer> {
        self.field_sources.get(field)
    }
}

/// Load configuration with layered precedence.
///
/// `explicit` is an additional file merged above the user file.
/// `config_dir_override` replaces the platform config directory used to find
/// the user file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file cannot be read or parsed, or if
/// the merged configuration fails validation.
pub fn load(
    explicit: Option<&Path>,
    config_dir_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    if let Some(user_path) = user_config_path(config_dir_override)
        && let Some(overlay) = try_load_file(&user_path)?
    {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        })?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::File,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, &env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    resolve_env_references(&mut merged, &env_vars);
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a single file on top of the built-in defaults.
///
/// No user file and no environment fallbacks are applied.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(too_large(path, metadata.len()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Where the per-user config file lives.
fn user_config_path(config_dir_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = config_dir_override {
        return Some(dir.join("config.toml"));
    }
    directories::ProjectDirs::from("", "", "persona")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Read and parse a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    let len = u64::try_from(content.len()).unwrap_or(u64::MAX);
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(too_large(path, len));
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

fn too_large(path: &Path, len: u64) -> ConfigError {
    ConfigError::ValidationError {
        field: path.display().to_string(),
        message: format!(
            "config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults_deserialize_to_default_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_with_empty_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load(None, Some(dir.path())).unwrap();
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(resolved.config.orchestrator.max_tool_iterations, 5);
        assert_eq!(
            resolved.source_of("sandbox.image"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_explicit_file_overrides_user_file() {
        let user_dir = tempfile::tempdir().unwrap();
        write_file(
            user_dir.path(),
            "config.toml",
            "[orchestrator]\nmax_retries = 4\nmax_tool_iterations = 8\n",
        );
        let other = tempfile::tempdir().unwrap();
        let explicit = write_file(
            other.path(),
            "persona.toml",
            "[orchestrator]\nmax_tool_iterations = 3\n",
        );

        let resolved = load(Some(&explicit), Some(user_dir.path())).unwrap();
        let orch = &resolved.config.orchestrator;
        assert_eq!(orch.max_retries, 4);
        assert_eq!(orch.max_tool_iterations, 3);
        assert_eq!(
            resolved.source_of("orchestrator.max_retries"),
            Some(&ConfigLayer::User)
        );
        assert_eq!(
            resolved.source_of("orchestrator.max_tool_iterations"),
            Some(&ConfigLayer::File)
        );
        assert_eq!(resolved.loaded_files.len(), 2);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = load(Some(&missing), Some(dir.path()));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_servers_section_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "persona.toml",
            r#"
            [servers.filesystem]
            command = "npx"
            args = ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
            tier = "safe"
            "#,
        );
        let config = load_file(&path).unwrap();
        let fs = &config.servers["filesystem"];
        assert_eq!(fs.command, "npx");
        assert_eq!(fs.args.len(), 3);
        assert_eq!(fs.tier, "safe");
    }

    #[test]
    fn test_load_file_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bad.toml", "[model\nprovider = ");
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/persona.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_load_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "persona.toml",
            "[orchestrator]\nmax_tool_iterations = 0\n",
        );
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::ValidationError { ref field, .. }) if field == "orchestrator.max_tool_iterations"
        ));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("# padding\n");
        let line = format!("# {}\n", "x".repeat(1022));
        while body.len() <= 1_048_576 {
            body.push_str(&line);
        }
        let path = write_file(dir.path(), "big.toml", &body);
        assert!(matches!(
            try_load_file(&path),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_model_config_debug_redacts_api_key() {
        let mut config = Config::default();
        config.model.api_key = Some("sk-secret-12345".to_owned());

        let debug_str = format!("{:?}", config.model);
        assert!(!debug_str.contains("sk-secret-12345"));
        assert!(debug_str.contains("has_api_key: true"));

        let json = serde_json::to_string(&config.model).unwrap();
        assert!(!json.contains("sk-secret-12345"));
    }

    #[test]
    fn test_server_env_values_redacted_in_debug() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "persona.toml",
            "[servers.search]\ncommand = \"search\"\n[servers.search.env]\nTOKEN = \"hunter2\"\n",
        );
        let config = load_file(&path).unwrap();
        let debug_str = format!("{:?}", config.servers["search"]);
        assert!(debug_str.contains("TOKEN"));
        assert!(!debug_str.contains("hunter2"));
    }
}
