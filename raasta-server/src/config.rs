//! Server configuration
//!
//! Priority for every key: command line, then `RAASTA_*` environment variable (both
//! through clap), then the TOML config file, then compiled defaults.

use clap::Parser;
use raasta_common::config::{self as common_config, TomlConfig};
use raasta_common::validation::MAX_PHOTO_BYTES;
use raasta_common::{Error, Result, UserId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5001";

/// Command-line arguments
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "raasta-server", version, about = "Traffic report service")]
pub struct Args {
    /// Folder holding raasta.db and uploaded photos
    #[arg(long, env = "RAASTA_ROOT_FOLDER")]
    pub root_folder: Option<String>,

    /// Listen address
    #[arg(long, env = "RAASTA_BIND_ADDR")]
    pub bind_addr: Option<String>,

    /// Largest accepted photo, in bytes
    #[arg(long, env = "RAASTA_MAX_PHOTO_BYTES")]
    pub max_photo_bytes: Option<usize>,

    /// Explicit config file instead of the platform default location
    #[arg(long, env = "RAASTA_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Fully resolved server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root_folder: PathBuf,
    pub bind_addr: SocketAddr,
    pub max_photo_bytes: usize,
    pub sessions: HashMap<String, UserId>,
}

impl ServerConfig {
    /// Load the TOML file named by `args` (or the platform one) and resolve
    pub fn load(args: &Args) -> Result<Self> {
        let toml = match &args.config {
            Some(path) => common_config::read_toml_config(path)?,
            None => common_config::load_toml_config()?,
        };
        Self::resolve(args, &toml)
    }

    /// Combine already-parsed arguments with a TOML config
    pub fn resolve(args: &Args, toml: &TomlConfig) -> Result<Self> {
        let root_folder = common_config::resolve_root_folder(
            args.root_folder.as_deref(),
            "RAASTA_ROOT_FOLDER",
            Some(toml),
        );

        let bind_raw = args
            .bind_addr
            .as_deref()
            .or(toml.bind_addr.as_deref())
            .unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr = bind_raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind_raw, e)))?;

        let max_photo_bytes = args
            .max_photo_bytes
            .or(toml.max_photo_bytes)
            .unwrap_or(MAX_PHOTO_BYTES);
        if max_photo_bytes == 0 {
            return Err(Error::Config("max_photo_bytes must be positive".to_string()));
        }

        Ok(Self {
            root_folder,
            bind_addr,
            max_photo_bytes,
            sessions: toml.sessions.clone(),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        common_config::database_path(&self.root_folder)
    }

    pub fn photos_dir(&self) -> PathBuf {
        common_config::photos_dir(&self.root_folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_cli_overrides_toml() {
        let args = Args {
            root_folder: Some("/tmp/raasta-cli".into()),
            bind_addr: Some("0.0.0.0:8080".into()),
            ..Default::default()
        };
        let toml = TomlConfig {
            root_folder: Some("/tmp/raasta-toml".into()),
            bind_addr: Some("127.0.0.1:9000".into()),
            max_photo_bytes: Some(1024),
            ..Default::default()
        };

        let config = ServerConfig::resolve(&args, &toml).unwrap();
        assert_eq!(config.root_folder, PathBuf::from("/tmp/raasta-cli"));
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_photo_bytes, 1024);
    }

    #[test]
    fn test_defaults_and_sessions() {
        let user = Uuid::new_v4();
        let mut toml = TomlConfig {
            root_folder: Some("/tmp/raasta-toml".into()),
            ..Default::default()
        };
        toml.sessions.insert("token-1".into(), user);

        let config = ServerConfig::resolve(&Args::default(), &toml).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.max_photo_bytes, MAX_PHOTO_BYTES);
        assert_eq!(config.sessions.get("token-1"), Some(&user));
        assert!(config.database_path().ends_with("raasta.db"));
    }

    #[test]
    fn test_invalid_bind_addr() {
        let args = Args {
            root_folder: Some("/tmp/raasta".into()),
            bind_addr: Some("not-an-address".into()),
            ..Default::default()
        };
        assert!(matches!(
            ServerConfig::resolve(&args, &TomlConfig::default()),
            Err(Error::Config(_))
        ));
    }
}
