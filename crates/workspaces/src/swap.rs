//! Atomic lockfile swap writer.
//!
//! A scoped lockfile is published by borrowing the directory's canonical
//! lockfile slot (`yarn.lock`): any real lockfile there is stashed under a
//! unique name, the scoped content passes through the slot, ends up at the
//! target name, and the stash is put back. Every exit path restores the slot.
//!
//! Two publishes into the same directory are serialised by a per-directory
//! async mutex; distinct directories proceed in parallel.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One async mutex per directory, created on first use.
#[derive(Debug, Default)]
struct DirectoryLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl DirectoryLocks {
    fn for_dir(&self, dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let key = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }
}

/// Publishes lockfile content through a directory's canonical slot.
#[derive(Debug, Default)]
pub struct SwapWriter {
    locks: DirectoryLocks,
}

impl SwapWriter {
    /// Creates a writer with no directories locked.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `content` to `dir/target_name` through `dir/canonical_name`.
    ///
    /// On success the file at `dir/canonical_name` is exactly what it was
    /// before the call (absent stays absent). On failure the previous
    /// `dir/target_name` is moved back where possible and the original error
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when a filesystem step fails and the slot could
    /// be restored, or [`Error::RecoveryRequired`] when it could not.
    pub async fn publish(
        &self,
        dir: &Path,
        canonical_name: &str,
        target_name: &str,
        content: &str,
    ) -> Result<PathBuf> {
        let lock = self.locks.for_dir(dir);
        let _guard = lock.lock().await;

        let slot = CanonicalSlot::acquire(dir, canonical_name).await?;
        let target = dir.join(target_name);

        match write_through(&slot, &target, content).await {
            Ok(()) => {
                slot.release().await?;
                info!(path = %target.display(), "Wrote workspace lockfile");
                Ok(target)
            }
            Err(error) => {
                warn!(dir = %dir.display(), error = %error, "Lockfile swap failed, restoring");
                slot.unwind(&target).await?;
                Err(error)
            }
        }
    }
}

async fn write_through(slot: &CanonicalSlot, target: &Path, content: &str) -> Result<()> {
    let canonical = &slot.canonical;

    if fs::try_exists(target).await.unwrap_or(false) {
        fs::rename(target, canonical)
            .await
            .map_err(|e| Error::io(e, target, "rename"))?;
    }

    let temp = slot.dir.join(format!(
        ".{}.lockscope-{}.tmp",
        slot.canonical_name,
        Uuid::new_v4()
    ));
    fs::write(&temp, content)
        .await
        .map_err(|e| Error::io(e, &temp, "write"))?;
    if let Err(e) = fs::rename(&temp, canonical).await {
        let _ = fs::remove_file(&temp).await;
        return Err(Error::io(e, canonical, "rename"));
    }

    fs::rename(canonical, target)
        .await
        .map_err(|e| Error::io(e, canonical, "rename"))
}

/// The borrowed canonical lockfile slot of one directory.
///
/// Acquiring moves an existing canonical file aside; releasing moves it back.
/// Dropping an unreleased slot restores it synchronously on a best-effort
/// basis.
#[derive(Debug)]
struct CanonicalSlot {
    dir: PathBuf,
    canonical_name: String,
    canonical: PathBuf,
    stash: Option<PathBuf>,
    released: bool,
}

impl CanonicalSlot {
    async fn acquire(dir: &Path, canonical_name: &str) -> Result<Self> {
        let canonical = dir.join(canonical_name);
        let mut stash = None;

        if fs::try_exists(&canonical).await.unwrap_or(false) {
            let path = dir.join(format!(".{canonical_name}.lockscope-{}", Uuid::new_v4()));
            fs::rename(&canonical, &path)
                .await
                .map_err(|e| Error::io(e, &canonical, "rename"))?;
            debug!(from = %canonical.display(), to = %path.display(), "Stashed canonical lockfile");
            stash = Some(path);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            canonical_name: canonical_name.to_string(),
            canonical,
            stash,
            released: false,
        })
    }

    /// Puts the stashed canonical lockfile back.
    async fn release(mut self) -> Result<()> {
        self.released = true;
        let Some(stash) = self.stash.take() else {
            return Ok(());
        };
        fs::rename(&stash, &self.canonical)
            .await
            .map_err(|e| self.recovery(stash.clone(), &e.to_string()))?;
        debug!(path = %self.canonical.display(), "Restored canonical lockfile");
        Ok(())
    }

    /// Moves whatever occupies the slot back to `target`, then releases.
    async fn unwind(self, target: &Path) -> Result<()> {
        if fs::try_exists(&self.canonical).await.unwrap_or(false)
            && let Err(e) = fs::rename(&self.canonical, target).await
        {
            if self.stash.is_none() {
                // Nothing to restore over the leftover, so it must go.
                if let Err(remove) = fs::remove_file(&self.canonical).await {
                    return Err(self.recovery(
                        self.canonical.clone(),
                        &format!("leftover could not be moved ({e}) or removed ({remove})"),
                    ));
                }
            } else {
                warn!(
                    path = %target.display(),
                    error = %e,
                    "Previous workspace lockfile could not be moved back"
                );
            }
        }
        self.release().await
    }

    fn recovery(&self, stash: PathBuf, message: &str) -> Error {
        Error::RecoveryRequired {
            dir: self.dir.clone(),
            stash,
            canonical: self.canonical.clone(),
            message: message.to_string(),
        }
    }
}

impl Drop for CanonicalSlot {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Some(stash) = self.stash.take() else {
            return;
        };
        match std::fs::rename(&stash, &self.canonical) {
            Ok(()) => warn!(
                path = %self.canonical.display(),
                "Canonical lockfile restored after interrupted swap"
            ),
            Err(e) => warn!(
                stash = %stash.display(),
                canonical = %self.canonical.display(),
                error = %e,
                "Canonical lockfile could not be restored, move it back manually"
            ),
        }
    }
}
