//! Handlers for the `config` subcommands.
//!
//! The `cmd_config_*` functions are generic over [`ConfigManager`] so they
//! work for any config type; [`handle_config_command`] wires them to
//! [`LecternConfig`].

use std::path::PathBuf;

use lectern_core::{ConfigManager, Error, LecternConfig, Result};

use crate::cli::ConfigAction;

/// Dispatch a `config` subcommand.
pub fn handle_config_command(config_path: Option<&str>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path::<LecternConfig>(config_path),
        ConfigAction::Get { key } => cmd_config_get::<LecternConfig>(config_path, &key),
        ConfigAction::Set { key, value } => {
            cmd_config_set::<LecternConfig>(config_path, &key, &value)
        }
        ConfigAction::Init { file, force } => {
            cmd_config_init::<LecternConfig>(file.as_deref(), force)
        }
        ConfigAction::Export { docker_env } => {
            let config = LecternConfig::load(config_path)?;
            cmd_config_export(&config, docker_env)
        }
    }
}

/// Print the resolved config file path.
pub fn cmd_config_path<C: ConfigManager>(config_path: Option<&str>) -> Result<()> {
    let path = C::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory for this platform"))?;
    println!("{}", path.display());
    if !path.exists() {
        eprintln!(
            "(file does not exist; run `{} config init` to create it)",
            C::project_name()
        );
    }
    Ok(())
}

/// Print a value by dotted key.
pub fn cmd_config_get<C: ConfigManager>(config_path: Option<&str>, key: &str) -> Result<()> {
    println!("{}", config_value::<C>(config_path, key)?);
    Ok(())
}

/// Look up a dotted key in the loaded configuration, formatted for display.
pub fn config_value<C: ConfigManager>(config_path: Option<&str>, key: &str) -> Result<String> {
    let config = C::load(config_path)?;
    let value = toml::Value::try_from(&config).map_err(|e| Error::config(e.to_string()))?;
    get_nested_value(&value, key)
        .map(format_toml_value)
        .ok_or_else(|| Error::config(format!("Key '{key}' not found in configuration")))
}

/// Set a value by dotted key in the config file. The file must exist.
pub fn cmd_config_set<C: ConfigManager>(
    config_path: Option<&str>,
    key: &str,
    value: &str,
) -> Result<()> {
    let path = C::resolve_config_path(config_path)
        .ok_or_else(|| Error::config("Could not determine config directory"))?;
    if !path.exists() {
        return Err(Error::config(format!(
            "Config file does not exist at {}. Run `{} config init` first.",
            path.display(),
            C::project_name()
        )));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| Error::io_with_path(e, &path))?;
    let mut doc: toml::Value = toml::from_str(&content)
        .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;
    set_nested_value(&mut doc, key, parse_value(value))?;

    // Refuse edits that would leave a file the server cannot load.
    let rendered = toml::to_string_pretty(&doc).map_err(|e| Error::config(e.to_string()))?;
    toml::from_str::<C>(&rendered)
        .map_err(|e| Error::config(format!("'{key} = {value}' is not valid here: {e}")))?;

    std::fs::write(&path, rendered).map_err(|e| Error::io_with_path(e, &path))?;
    println!("Set {key} = {value} in {}", path.display());
    Ok(())
}

/// Write a default configuration file.
pub fn cmd_config_init<C: ConfigManager>(file: Option<&str>, force: bool) -> Result<()> {
    let path = match file {
        Some(p) => PathBuf::from(p),
        None => C::default_config_path()
            .ok_or_else(|| Error::config("Could not determine config directory"))?,
    };

    if path.exists() && !force {
        return Err(Error::config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
    }

    let toml_str = C::default().to_toml_string()?;
    std::fs::write(&path, &toml_str).map_err(|e| Error::io_with_path(e, &path))?;
    println!("Config file created at {}", path.display());
    Ok(())
}

/// Print the configuration as environment variables.
pub fn cmd_config_export<C: ConfigManager>(config: &C, docker_env: bool) -> Result<()> {
    for line in export_lines(config, docker_env)? {
        println!("{line}");
    }
    Ok(())
}

/// `KEY=VALUE` lines, or `--env KEY=VALUE` for `docker run`.
pub fn export_lines<C: ConfigManager>(config: &C, docker_env: bool) -> Result<Vec<String>> {
    Ok(config
        .to_env_vars()?
        .into_iter()
        .map(|(key, value)| {
            if docker_env {
                format!("--env {key}={value}")
            } else {
                format!("{key}={value}")
            }
        })
        .collect())
}

// ============================================================================
// TOML dotted-key helpers
// ============================================================================

/// Follow a dotted key path through nested tables.
pub fn get_nested_value<'a>(value: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(value, |current, part| current.as_table()?.get(part))
}

/// Set a value at a dotted key path, creating intermediate tables.
pub fn set_nested_value(root: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        return Err(Error::config("Empty key path"));
    };
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::config(format!("Invalid key '{key}'")));
    }

    let mut current = root;
    for part in parents {
        let table = current
            .as_table_mut()
            .ok_or_else(|| Error::config("Cannot navigate into a non-table value"))?;
        current = table
            .entry(part.to_string())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }
    current
        .as_table_mut()
        .ok_or_else(|| Error::config("Cannot set key on a non-table value"))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Parse a command-line value: bool, then integer, then float, then string.
pub fn parse_value(s: &str) -> toml::Value {
    match s {
        "true" => return toml::Value::Boolean(true),
        "false" => return toml::Value::Boolean(false),
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(s.to_string())
}

/// Render a value for stdout. Scalars print bare; tables print as TOML.
pub fn format_toml_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(dt) => dt.to_string(),
        toml::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(format_toml_value).collect();
            items.join(",")
        }
        toml::Value::Table(_) => {
            toml::to_string_pretty(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_default(dir: &TempDir) -> String {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, LecternConfig::default().to_toml_string().unwrap()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_config_path_explicit() {
        assert!(cmd_config_path::<LecternConfig>(Some("/explicit/config.toml")).is_ok());
    }

    #[test]
    fn test_config_value_nested_key() {
        let dir = TempDir::new().unwrap();
        let path = write_default(&dir);
        assert_eq!(
            config_value::<LecternConfig>(Some(&path), "server.port").unwrap(),
            "3000"
        );
        assert_eq!(
            config_value::<LecternConfig>(Some(&path), "auth.mode").unwrap(),
            "dev"
        );
    }

    #[test]
    fn test_config_value_missing_key() {
        let dir = TempDir::new().unwrap();
        let path = write_default(&dir);
        let err = config_value::<LecternConfig>(Some(&path), "server.nope").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_config_get_missing_explicit_file() {
        assert!(cmd_config_get::<LecternConfig>(Some("/nonexistent/lectern.toml"), "site_name").is_err());
    }

    #[test]
    fn test_config_set_nested_key() {
        let dir = TempDir::new().unwrap();
        let path = write_default(&dir);

        cmd_config_set::<LecternConfig>(Some(&path), "server.port", "8080").unwrap();
        cmd_config_set::<LecternConfig>(Some(&path), "site_name", "Academy").unwrap();

        let config = LecternConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site_name, "Academy");
    }

    #[test]
    fn test_config_set_rejects_wrong_type() {
        let dir = TempDir::new().unwrap();
        let path = write_default(&dir);

        let err = cmd_config_set::<LecternConfig>(Some(&path), "server.port", "eighty")
            .unwrap_err();
        assert!(err.to_string().contains("not valid"));
        assert_eq!(LecternConfig::load(Some(&path)).unwrap().server.port, 3000);
    }

    #[test]
    fn test_config_set_missing_file() {
        let err = cmd_config_set::<LecternConfig>(Some("/nonexistent/config.toml"), "key", "value")
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_config_init_creates_and_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lectern").join("config.toml");
        let path_str = path.to_str().unwrap();

        cmd_config_init::<LecternConfig>(Some(path_str), false).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[server]"));
        assert!(content.contains("[auth]"));

        let err = cmd_config_init::<LecternConfig>(Some(path_str), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(cmd_config_init::<LecternConfig>(Some(path_str), true).is_ok());
    }

    #[test]
    fn test_export_lines() {
        let config = LecternConfig::default();
        let plain = export_lines(&config, false).unwrap();
        assert!(plain.contains(&"LECTERN_SERVER_PORT=3000".to_string()));

        let docker = export_lines(&config, true).unwrap();
        assert!(docker.iter().all(|l| l.starts_with("--env LECTERN_")));
    }

    #[test]
    fn test_get_nested_value() {
        let val: toml::Value = toml::from_str("[server]\nport = 3000").unwrap();
        assert_eq!(
            get_nested_value(&val, "server.port"),
            Some(&toml::Value::Integer(3000))
        );
        assert!(get_nested_value(&val, "server.host").is_none());
        assert!(get_nested_value(&val, "server.port.deeper").is_none());
    }

    #[test]
    fn test_set_nested_value_creates_tables() {
        let mut val: toml::Value = toml::from_str("").unwrap();
        set_nested_value(&mut val, "auth.oidc_issuer", parse_value("https://idp")).unwrap();
        assert_eq!(
            get_nested_value(&val, "auth.oidc_issuer"),
            Some(&toml::Value::String("https://idp".into()))
        );
        assert!(set_nested_value(&mut val, "auth..x", parse_value("1")).is_err());
        assert!(set_nested_value(&mut val, "auth.oidc_issuer.x", parse_value("1")).is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_value("42"), toml::Value::Integer(42));
        assert_eq!(parse_value("0.5"), toml::Value::Float(0.5));
        assert_eq!(parse_value("dev"), toml::Value::String("dev".into()));
    }

    #[test]
    fn test_format_toml_value() {
        let list = toml::Value::Array(vec!["a".into(), "b".into()]);
        assert_eq!(format_toml_value(&list), "a,b");
        assert_eq!(format_toml_value(&toml::Value::Integer(7)), "7");
    }
}
