use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use super::roster::Roster;

/// Default roster document, relative to the working directory.
pub const DEFAULT_ROSTER_FILE: &str = "santa.json";

/// A roster loaded from (and written back to) a JSON document on disk.
#[derive(Debug)]
pub struct RosterFile {
    pub path: PathBuf,
    pub roster: Roster,
}

impl RosterFile {
    /// Create an empty roster document at `path`.
    /// Refuses to clobber an existing one unless `force` is set.
    pub fn init(path: &Path, force: bool) -> Result<Self> {
        if path.exists() && !force {
            bail!(
                "{} already exists (use --force to start over)",
                path.display()
            );
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let file = RosterFile {
            path: path.to_path_buf(),
            roster: Roster::new(),
        };
        file.save()?;
        Ok(file)
    }

    /// Open an existing roster document. Fails if it was never initialized.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "no roster at {}. Run `santa init` first.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let roster: Roster = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a valid roster file", path.display()))?;

        tracing::debug!(path = %path.display(), participants = roster.len(), "opened roster");
        Ok(RosterFile {
            path: path.to_path_buf(),
            roster,
        })
    }

    /// Write the roster back. Goes through a sibling temp file so a crash
    /// mid-write never leaves a truncated document behind.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.roster)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, format!("{}\n", json))
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
