//! Layered CLI configuration
//!
//! Priority: environment (`FILEID_*`) > config file > defaults. The config
//! file lives at the XDG-compliant path `~/.config/fileid/config.toml` unless
//! `XDG_CONFIG_HOME` says otherwise.

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// AniDB account credentials. Usually supplied via `FILEID_AUTH__USERNAME`
/// and `FILEID_AUTH__PASSWORD` rather than stored in the file.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ClientConfig {
    /// Registered AniDB client name.
    pub name: String,
    /// Registered client version.
    pub version: String,
    /// Server endpoint, `host:port`.
    pub server: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "fileid".to_string(),
            version: "1".to_string(),
            server: format!(
                "{}:{}",
                fileid_core::protocol::DEFAULT_SERVER,
                fileid_core::protocol::DEFAULT_PORT
            ),
        }
    }
}

/// Default XDG-compliant configuration path.
pub fn default_config_path() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg_config).join("fileid/config.toml");
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fileid/config.toml")
}

/// Load configuration with layered priority: ENV > file > defaults.
pub fn load(path: Option<&PathBuf>) -> Result<AppConfig> {
    let path = path.cloned().unwrap_or_else(default_config_path);

    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(&path));
    }
    figment = figment.merge(Env::prefixed("FILEID_").split("__"));

    figment
        .extract()
        .with_context(|| format!("invalid configuration (from {})", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let missing = PathBuf::from("/nonexistent/fileid/config.toml");
        let config = load(Some(&missing)).unwrap();
        assert_eq!(config.client.name, "fileid");
        assert_eq!(config.client.server, "api.anidb.net:9000");
        assert_eq!(config.auth.username, None);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[client]\nname = \"myclient\"\nversion = \"9\"\nserver = \"localhost:9000\"\n\n[auth]\nusername = \"someone\""
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.client.name, "myclient");
        assert_eq!(config.client.server, "localhost:9000");
        assert_eq!(config.auth.username.as_deref(), Some("someone"));
        assert_eq!(config.auth.password, None);
    }
}
