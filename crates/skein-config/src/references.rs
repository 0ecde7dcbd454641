//! Value references inside configuration files.
//!
//! Any string value of the exact form `{env:VAR}` or `{file:path}` is
//! replaced while loading:
//!
//! ```toml
//! [relay]
//! url = "{env:SKEIN_RELAY_URL}"
//!
//! [settings]
//! secret = "{file:~/.skein/secret}"
//! limits = "{file:limits.toml}"
//! ```
//!
//! - `{env:VAR}` must name a set variable or loading fails
//! - `{file:path}` reads a `.toml` file as structured data and anything else
//!   as a trimmed string; paths may be absolute, relative to the config
//!   directory, or start with `~/`

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ENV_PREFIX: &str = "{env:";
const FILE_PREFIX: &str = "{file:";
const SUFFIX: &str = "}";

fn reference<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.strip_prefix(prefix)?.strip_suffix(SUFFIX)
}

/// Resolves `path` against `base_dir`, expanding a leading `~/`.
pub fn resolve_path(path: &str, base_dir: &Path) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}

/// Reads and parses a TOML document.
pub fn read_toml(path: &Path) -> Result<toml::Value, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(toml::Value::Table(table))
}

fn read_file_value(path: &Path) -> Result<toml::Value, ConfigError> {
    if path.extension().is_some_and(|ext| ext == "toml") {
        return read_toml(path);
    }
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(toml::Value::String(content.trim().to_string()))
}

/// Replaces every reference in `value`, collecting all failures.
pub fn resolve_references(value: &mut toml::Value, base_dir: &Path) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    resolve_recursive(value, base_dir, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::References(errors))
    }
}

fn resolve_recursive(value: &mut toml::Value, base_dir: &Path, errors: &mut Vec<ConfigError>) {
    match value {
        toml::Value::String(s) => {
            if let Some(var) = reference(s, ENV_PREFIX) {
                debug!(var = %var, "Resolving env reference");
                match std::env::var(var) {
                    Ok(resolved) => *value = toml::Value::String(resolved),
                    Err(_) => {
                        warn!("Environment variable not found: {}", var);
                        errors.push(ConfigError::EnvVarNotFound(var.to_string()));
                    }
                }
            } else if let Some(file) = reference(s, FILE_PREFIX) {
                let path = resolve_path(file, base_dir);
                debug!("Resolving file reference: {} -> {}", file, path.display());
                match read_file_value(&path) {
                    Ok(resolved) => *value = resolved,
                    Err(e) => {
                        warn!("Failed to load file reference {}: {}", file, e);
                        errors.push(e);
                    }
                }
            }
        }
        toml::Value::Array(items) => {
            for item in items.iter_mut() {
                resolve_recursive(item, base_dir, errors);
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                resolve_recursive(item, base_dir, errors);
            }
        }
        _ => {}
    }
}

/// Overlays `source` onto `target`.
///
/// Tables merge key by key; every other value, arrays included, is replaced.
pub fn overlay(target: &mut toml::Value, source: toml::Value) {
    match (target, source) {
        (toml::Value::Table(target), toml::Value::Table(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn parse(s: &str) -> toml::Value {
        toml::Value::Table(toml::from_str(s).unwrap())
    }

    #[test]
    fn test_reference_extraction() {
        assert_eq!(reference("{env:HOME}", ENV_PREFIX), Some("HOME"));
        assert_eq!(reference("{file:a.toml}", FILE_PREFIX), Some("a.toml"));
        assert_eq!(reference("plain", ENV_PREFIX), None);
        assert_eq!(reference("{env:HOME", ENV_PREFIX), None);
        assert_eq!(reference("x{env:HOME}", ENV_PREFIX), None);
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/etc/skein");
        assert_eq!(resolve_path("a.toml", base), PathBuf::from("/etc/skein/a.toml"));
        assert_eq!(resolve_path("/tmp/a.toml", base), PathBuf::from("/tmp/a.toml"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_path("~/x", base), home.join("x"));
        }
    }

    #[test]
    #[serial]
    fn test_env_reference() {
        std::env::set_var("SKEIN_TEST_RELAY_URL", "ws://relay:4040");
        let mut value = parse(
            r#"
[relay]
url = "{env:SKEIN_TEST_RELAY_URL}"
"#,
        );

        resolve_references(&mut value, Path::new(".")).unwrap();
        assert_eq!(value["relay"]["url"].as_str(), Some("ws://relay:4040"));
        std::env::remove_var("SKEIN_TEST_RELAY_URL");
    }

    #[test]
    #[serial]
    fn test_missing_env_reference_fails() {
        std::env::remove_var("SKEIN_TEST_UNSET");
        let mut value = parse(r#"secret = "{env:SKEIN_TEST_UNSET}""#);

        let err = resolve_references(&mut value, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("SKEIN_TEST_UNSET"));
    }

    #[test]
    fn test_file_references() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("secret.txt"), "  hunter2\n").unwrap();
        fs::write(temp.path().join("limits.toml"), "max = 3\n").unwrap();

        let mut value = parse(
            r#"
secret = "{file:secret.txt}"
limits = "{file:limits.toml}"
list = ["{file:secret.txt}", "literal"]
"#,
        );
        resolve_references(&mut value, temp.path()).unwrap();

        assert_eq!(value["secret"].as_str(), Some("hunter2"));
        assert_eq!(value["limits"]["max"].as_integer(), Some(3));
        assert_eq!(value["list"][0].as_str(), Some("hunter2"));
        assert_eq!(value["list"][1].as_str(), Some("literal"));
    }

    #[test]
    fn test_all_failures_collected() {
        let temp = TempDir::new().unwrap();
        let mut value = parse(
            r#"
a = "{file:missing-one.txt}"
b = "{file:missing-two.toml}"
"#,
        );

        match resolve_references(&mut value, temp.path()) {
            Err(ConfigError::References(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected reference errors, got {:?}", other),
        }
    }

    #[test]
    fn test_overlay_merges_tables_and_replaces_arrays() {
        let mut base = parse(
            r#"
[server]
host = "0.0.0.0"
port = 3030

[realtime]
default_rooms = ["anonymous"]
"#,
        );
        overlay(
            &mut base,
            parse(
                r#"
[server]
port = 8080

[realtime]
default_rooms = ["guests"]
"#,
            ),
        );

        assert_eq!(base["server"]["host"].as_str(), Some("0.0.0.0"));
        assert_eq!(base["server"]["port"].as_integer(), Some(8080));
        let rooms = base["realtime"]["default_rooms"].as_array().unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].as_str(), Some("guests"));
    }
}
