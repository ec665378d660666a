use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Name of the project config file, looked up in the project directory.
pub const PROJECT_CONFIG_FILE: &str = "tramnet.toml";

/// Environment variable overriding the database path.
pub const DB_ENV_VAR: &str = "TRAMNET_DB";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub db_path: PathBuf,
    pub resolved_output: String,
}

/// Load `tramnet.toml` from `project_root`, defaulting every missing field.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the per-user config from the platform config directory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("tramnet/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge flags, environment and config files into the effective settings.
///
/// # Errors
///
/// Returns an error if a config file is unreadable or invalid.
pub fn resolve_config(
    project_root: &Path,
    cli_db: Option<&Path>,
    cli_json: bool,
) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_db = env::var_os(DB_ENV_VAR).map(PathBuf::from);
    let db_path = resolve_db_path(project_root, cli_db, env_db.as_deref(), &project.database.path);

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        user,
        db_path,
        resolved_output,
    })
}

/// `--db` > `TRAMNET_DB` > config file; relative paths join `project_root`.
fn resolve_db_path(
    project_root: &Path,
    cli_db: Option<&Path>,
    env_db: Option<&Path>,
    configured: &Path,
) -> PathBuf {
    let chosen = cli_db
        .or_else(|| env_db.filter(|p| !p.as_os_str().is_empty()))
        .unwrap_or(configured);
    if chosen.is_absolute() {
        chosen.to_path_buf()
    } else {
        project_root.join(chosen)
    }
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tram_data.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_project_config(dir.path()).expect("defaults");
        assert_eq!(config.database.path, PathBuf::from("tram_data.db"));
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[server]\nport = 9090\n",
        )
        .expect("write config");
        let config = load_project_config(dir.path()).expect("parse");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database.path, PathBuf::from("tram_data.db"));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "[server\nport = ").expect("write");
        assert!(load_project_config(dir.path()).is_err());
    }

    #[test]
    fn db_path_precedence_is_flag_then_env_then_file() {
        let root = Path::new("/proj");
        let file = Path::new("data/net.db");
        assert_eq!(
            resolve_db_path(root, Some(Path::new("/tmp/a.db")), Some(Path::new("b.db")), file),
            PathBuf::from("/tmp/a.db")
        );
        assert_eq!(
            resolve_db_path(root, None, Some(Path::new("b.db")), file),
            PathBuf::from("/proj/b.db")
        );
        assert_eq!(
            resolve_db_path(root, None, Some(Path::new("")), file),
            PathBuf::from("/proj/data/net.db")
        );
    }

    #[test]
    fn explicit_json_wins_over_env_and_user() {
        assert_eq!(
            resolve_output(true, Some("pretty".into()), Some("text".into())),
            "json"
        );
        assert_eq!(resolve_output(false, Some("pretty".into()), Some("table".into())), "text");
        assert_eq!(resolve_output(false, Some("human".into()), None), "pretty");
    }
}
