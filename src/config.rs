//! Service configuration
//!
//! Everything is read once at startup from the command line or the
//! environment. Only the export path and the intended branch can change
//! afterwards, through `/config`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),
}

/// Git auto-commit sidecar for exported configuration
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Cli {
    /// Listen address; `:9080` is shorthand for all interfaces
    #[arg(env = "CONFIGSYNC_ADDRESS", default_value = "0.0.0.0:9080")]
    pub address: String,

    /// Export path, relative to the repository
    #[arg(long, env = "EXPORT_PATH", default_value = "default/am/autosave-am")]
    pub export_path: String,

    /// Directory holding the checked-out project
    #[arg(long, env = "GIT_ROOT", default_value = "/git")]
    pub git_root: PathBuf,

    /// Project directory under the git root
    #[arg(long, env = "GIT_PROJECT_DIRECTORY", default_value = "forgeops-init")]
    pub project_dir: String,

    /// Branch autosave commits are meant for
    #[arg(long, env = "GIT_AUTOSAVE_BRANCH", default_value = "autosave")]
    pub branch: String,

    /// Push key, tried before the secret mount and ~/.ssh/id_rsa
    #[arg(long, env = "GIT_SSH_KEY_PATH")]
    pub ssh_key: Option<PathBuf>,

    /// Known hosts file; when set, unknown host keys are rejected
    #[arg(long, env = "GIT_SSH_KNOWN_HOSTS")]
    pub known_hosts: Option<PathBuf>,

    /// Export tool binary. Absent means exports are managed elsewhere.
    #[arg(long, env = "EXPORT_TOOL", default_value = "/opt/amster/amster")]
    pub export_tool: PathBuf,

    /// Server the export tool connects to
    #[arg(long, env = "EXPORT_TOOL_URL", default_value = "http://openam/openam")]
    pub export_tool_url: String,

    /// Key the export tool authenticates with
    #[arg(
        long,
        env = "EXPORT_TOOL_KEY",
        default_value = "/var/run/secrets/amster/id_rsa"
    )]
    pub export_tool_key: PathBuf,

    /// Static UI directory served under /ui
    #[arg(long, env = "UI_DIR", default_value = "ui/build/web")]
    pub ui_dir: PathBuf,
}

/// Settings for running the external export tool
#[derive(Debug, Clone)]
pub struct ExportToolConfig {
    pub binary: PathBuf,
    pub connect_url: String,
    pub key_path: PathBuf,
}

impl ExportToolConfig {
    /// Script that connects and exports everything to `target`
    pub fn script(&self, target: &str) -> String {
        format!(
            "connect -k {} {}\nexport-config --path {}\n:quit\n",
            self.key_path.display(),
            self.connect_url,
            target
        )
    }
}

/// Resolved, immutable startup configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen: SocketAddr,
    pub git_path: PathBuf,
    pub branch: String,
    pub export_path: String,
    pub ssh_key: Option<PathBuf>,
    pub known_hosts: Option<PathBuf>,
    pub export_tool: ExportToolConfig,
    pub is_auto_export: bool,
    pub ui_dir: PathBuf,
}

impl ServiceConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let listen = parse_listen_address(&cli.address)?;
        let git_path = cli.git_root.join(&cli.project_dir);
        let is_auto_export = !cli.export_tool.exists();

        Ok(Self {
            listen,
            git_path,
            branch: cli.branch,
            export_path: cli.export_path,
            ssh_key: cli.ssh_key,
            known_hosts: cli.known_hosts,
            export_tool: ExportToolConfig {
                binary: cli.export_tool,
                connect_url: cli.export_tool_url,
                key_path: cli.export_tool_key,
            },
            is_auto_export,
            ui_dir: cli.ui_dir,
        })
    }

    pub fn initial_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            export_path: self.export_path.clone(),
            git_path: self.git_path.clone(),
            git_branch: self.branch.clone(),
            is_auto_export: self.is_auto_export,
        }
    }
}

/// Accept `host:port` or the bare `:port` form
pub fn parse_listen_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let full = if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    };
    full.parse()
        .map_err(|_| ConfigError::InvalidAddress(address.to_string()))
}

/// Settings exposed by `/config`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    pub export_path: String,
    #[serde(rename = "gitRootDirectory")]
    pub git_path: PathBuf,
    pub git_branch: String,
    pub is_auto_export: bool,
}

/// Partial update accepted by `POST /config`; unknown fields are ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub export_path: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
}

impl RuntimeSettings {
    /// Apply an update. Values too short to be meaningful are ignored.
    ///
    /// Returns the new branch when it changed.
    pub fn apply(&mut self, update: SettingsUpdate) -> Option<String> {
        if let Some(path) = update.export_path.filter(|p| p.len() > 5) {
            self.export_path = path;
        }
        match update.git_branch.filter(|b| b.len() > 1) {
            Some(branch) if branch != self.git_branch => {
                self.git_branch = branch.clone();
                Some(branch)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RuntimeSettings {
        RuntimeSettings {
            export_path: "default/am/autosave-am".into(),
            git_path: PathBuf::from("/git/forgeops-init"),
            git_branch: "autosave".into(),
            is_auto_export: false,
        }
    }

    #[test]
    fn test_parse_listen_address() {
        assert_eq!(
            parse_listen_address(":9080").unwrap(),
            "0.0.0.0:9080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_listen_address("127.0.0.1:8080").unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_listen_address("nope").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["configsync"]).unwrap();
        let config = ServiceConfig::from_cli(cli).unwrap();
        assert_eq!(config.git_path, PathBuf::from("/git/forgeops-init"));
        assert_eq!(config.listen, "0.0.0.0:9080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_apply_ignores_short_values() {
        let mut s = settings();
        let changed = s.apply(SettingsUpdate {
            export_path: Some("x".into()),
            git_branch: Some("b".into()),
        });
        assert_eq!(changed, None);
        assert_eq!(s, settings());
    }

    #[test]
    fn test_apply_updates() {
        let mut s = settings();
        let changed = s.apply(SettingsUpdate {
            export_path: Some("realm/export".into()),
            git_branch: Some("feature".into()),
        });
        assert_eq!(changed.as_deref(), Some("feature"));
        assert_eq!(s.export_path, "realm/export");
        assert_eq!(s.git_branch, "feature");
    }

    #[test]
    fn test_settings_wire_names() {
        let json = serde_json::to_value(settings()).unwrap();
        assert_eq!(json["exportPath"], "default/am/autosave-am");
        assert_eq!(json["gitRootDirectory"], "/git/forgeops-init");
        assert_eq!(json["gitBranch"], "autosave");
        assert_eq!(json["isAutoExport"], false);
    }

    #[test]
    fn test_export_script() {
        let tool = ExportToolConfig {
            binary: PathBuf::from("/opt/amster/amster"),
            connect_url: "http://openam/openam".into(),
            key_path: PathBuf::from("/var/run/secrets/amster/id_rsa"),
        };
        assert_eq!(
            tool.script("/git/forgeops-init/default/am"),
            "connect -k /var/run/secrets/amster/id_rsa http://openam/openam\n\
             export-config --path /git/forgeops-init/default/am\n:quit\n"
        );
    }
}
