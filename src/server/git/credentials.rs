//! SSH credential used for `git push`
//!
//! The key is looked up once at startup. A missing or unparsable key is a
//! deployment error and aborts startup; nothing here retries.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

/// Secret mount the deployment provides the push key at
pub const SECRET_KEY_PATH: &str = "/etc/git-secret/ssh";

/// Principal every push authenticates as
pub const GIT_PRINCIPAL: &str = "git";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No git ssh key found (tried {0})")]
    NotFound(String),
    #[error("Failed to read ssh key {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse ssh key {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Key-based identity for pushes: principal plus private key file
#[derive(Debug, Clone)]
pub struct CredentialIdentity {
    principal: String,
    key_path: PathBuf,
    known_hosts: Option<PathBuf>,
}

impl CredentialIdentity {
    /// Candidate key locations, in lookup order.
    ///
    /// An explicit override comes first, then the secret mount, then
    /// `~/.ssh/id_rsa`.
    pub fn default_candidates(override_path: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(p) = override_path {
            candidates.push(p.to_path_buf());
        }
        candidates.push(PathBuf::from(SECRET_KEY_PATH));
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".ssh").join("id_rsa"));
        }
        candidates
    }

    /// Load the first existing candidate; it must parse as a private key
    pub fn load(candidates: &[PathBuf]) -> Result<Self, CredentialError> {
        for path in candidates {
            let pem = match fs::read_to_string(path) {
                Ok(pem) => pem,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("Can't read git ssh key at {}, trying next location", path.display());
                    continue;
                }
                Err(source) => {
                    return Err(CredentialError::Read {
                        path: path.clone(),
                        source,
                    })
                }
            };

            russh_keys::decode_secret_key(&pem, None).map_err(|e| CredentialError::Parse {
                path: path.clone(),
                message: e.to_string(),
            })?;

            info!("Loaded git ssh key from {}", path.display());
            return Ok(Self {
                principal: GIT_PRINCIPAL.to_string(),
                key_path: path.clone(),
                known_hosts: None,
            });
        }

        let tried = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(CredentialError::NotFound(tried))
    }

    /// Pin host keys to `path` instead of accepting new hosts on first use
    pub fn with_known_hosts(mut self, path: Option<PathBuf>) -> Self {
        self.known_hosts = path;
        self
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// `GIT_SSH_COMMAND` for this identity.
    ///
    /// git hands the command to `sh`, so paths are single-quoted. ssh splits
    /// `UserKnownHostsFile` values on whitespace, so that path is also
    /// double-quoted inside the option.
    pub fn ssh_command(&self) -> String {
        let mut cmd = format!(
            "ssh -i {} -o IdentitiesOnly=yes -o User={} -o BatchMode=yes",
            shell_quote(&self.key_path.display().to_string()),
            self.principal
        );
        match &self.known_hosts {
            Some(file) => cmd.push_str(&format!(
                " -o StrictHostKeyChecking=yes -o {}",
                shell_quote(&format!("UserKnownHostsFile=\"{}\"", file.display()))
            )),
            None => cmd.push_str(" -o StrictHostKeyChecking=accept-new"),
        }
        cmd
    }

    /// Environment handed to `git push`
    pub fn push_env(&self) -> Vec<(String, String)> {
        vec![
            ("GIT_SSH_COMMAND".to_string(), self.ssh_command()),
            ("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()),
        ]
    }
}

/// Quote `value` as one POSIX shell word
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
