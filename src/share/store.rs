// src/share/store.rs
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};

use crate::share::types::Credential;

/// Persistence for the session token of one account.
pub trait CredentialStore: Send + Sync {
    /// Missing or unreadable records mean "no prior session".
    fn load(&self) -> Option<Credential>;
    fn save(&self, cred: &Credential) -> Result<()>;
}

/// JSON file `{"token": "..."}`, by default at `$HOME/.dex.<user>`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_user(user: &str) -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::new(Path::new(&home).join(format!(".dex.{user}")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Option<Credential> {
        let s = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Credential>(&s) {
            Ok(c) if !c.token.is_empty() => Some(c),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(target: "share", path = %self.path.display(), "ignoring unreadable session: {e}");
                None
            }
        }
    }

    fn save(&self, cred: &Credential) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_vec(cred).context("encoding session")?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("writing session to {}", self.path.display()))?;
        Ok(())
    }
}

/// In-process store; also handy for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cred: Mutex<Option<Credential>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            cred: Mutex::new(Some(Credential {
                token: token.to_string(),
            })),
            saves: Mutex::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_else(|p| *p.into_inner())
    }
}

impl CredentialStore for MemoryStore {
    /// A poisoned store reads as empty, like an unreadable file.
    fn load(&self) -> Option<Credential> {
        self.cred.lock().ok()?.clone()
    }

    fn save(&self, cred: &Credential) -> Result<()> {
        *self
            .cred
            .lock()
            .map_err(|_| anyhow!("credential store lock poisoned"))? = Some(cred.clone());
        *self.saves.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        Ok(())
    }
}
