use crate::bridge::Mutation;
use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only log of document mutations made on the user's behalf
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Log stored as `audit.log` inside `dir`
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join("audit.log"),
        }
    }

    /// Log in the config directory (respecting XDG)
    pub fn default_location() -> Self {
        Self::new(&crate::config::config_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an entry to the audit log
    pub fn log(&self, entry: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(
            file,
            "[{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            entry
        )?;
        Ok(())
    }

    /// Record a mutation applied by `action` (an intent or transform name)
    pub fn log_mutation(&self, action: &str, mutation: &Mutation) -> Result<()> {
        self.log(&format!(
            "MUTATION: {:?} at {}..{} | ACTION: {}",
            mutation.mode, mutation.range.start, mutation.range.end, action
        ))
    }
}
