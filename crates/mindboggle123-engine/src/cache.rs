//! Rerun detection for work units.
//!
//! Each unit gets a cache key: the sha256 digest of its resolved command
//! line plus, for every argument naming an existing file, either the file
//! contents or its mtime and length, depending on [`HashMethod`]. The key
//! and a completion marker live in the working directory; a unit whose key
//! matches a completed prior run is reported as succeeded without spawning
//! its process again.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::EngineError;
use crate::runner::ResolvedCommand;
use crate::settings::HashMethod;

/// File-backed rerun cache, scoped to one working directory.
#[derive(Debug, Clone)]
pub struct RerunCache {
  dir: PathBuf,
  method: HashMethod,
}

impl RerunCache {
  pub fn new(dir: impl Into<PathBuf>, method: HashMethod) -> Self {
    Self {
      dir: dir.into(),
      method,
    }
  }

  /// Derive the cache key for a resolved command.
  pub fn key_for(&self, unit: &str, command: &ResolvedCommand) -> Result<String, EngineError> {
    let mut hasher = Sha256::new();
    hasher.update(command.command_line().as_bytes());

    for arg in &command.args {
      let path = Path::new(arg);
      if !path.is_file() {
        continue;
      }
      match self.method {
        HashMethod::Content => {
          let bytes = fs::read(path).map_err(|source| EngineError::Cache {
            unit: unit.to_string(),
            source,
          })?;
          hasher.update(&bytes);
        }
        HashMethod::Timestamp => {
          let meta = fs::metadata(path).map_err(|source| EngineError::Cache {
            unit: unit.to_string(),
            source,
          })?;
          let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
          hasher.update(format!("{arg}:{mtime}:{}", meta.len()).as_bytes());
        }
      }
    }

    Ok(format!("{:x}", hasher.finalize()))
  }

  /// Whether the unit completed a prior run with exactly this key.
  pub fn is_fresh(&self, unit: &str, key: &str) -> bool {
    let stored = fs::read_to_string(self.key_path(unit)).ok();
    stored.as_deref() == Some(key) && self.done_path(unit).is_file()
  }

  /// Drop the completion marker before a unit starts, so an interrupted
  /// run is never mistaken for a completed one.
  pub fn invalidate(&self, unit: &str) {
    let _ = fs::remove_file(self.done_path(unit));
  }

  /// Record a completed run.
  pub fn record(&self, unit: &str, key: &str) -> Result<(), EngineError> {
    let write = |path: PathBuf, contents: &str| {
      fs::write(path, contents).map_err(|source| EngineError::Cache {
        unit: unit.to_string(),
        source,
      })
    };
    write(self.key_path(unit), key)?;
    write(self.done_path(unit), "")?;
    debug!(unit, key, "recorded completed run");
    Ok(())
  }

  fn key_path(&self, unit: &str) -> PathBuf {
    self.dir.join(format!("{unit}.sha256"))
  }

  fn done_path(&self, unit: &str) -> PathBuf {
    self.dir.join(format!("{unit}.done"))
  }
}
