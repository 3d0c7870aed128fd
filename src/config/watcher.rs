//! Polling watcher that feeds settings-file edits into a live [`SharedSettings`].
//!
//! Compares mtime first and only re-reads when it moved; a content hash filters out
//! touches that did not change anything.

use super::persist::parse_settings;
use super::store::SharedSettings;
use crate::log_debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug)]
pub struct SettingsWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    last_hash: u64,
}

impl SettingsWatcher {
    /// Baseline is captured immediately so the first [`poll`](Self::poll) reports nothing.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let last_modified = modified_at(&path);
        let last_hash = fs::read_to_string(&path)
            .map(|contents| fnv1a(&contents))
            .unwrap_or(0);
        Self {
            path,
            last_modified,
            last_hash,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file if it changed and push the migrated settings into `store`.
    /// Returns whether subscribers were notified.
    pub fn poll(&mut self, store: &SharedSettings) -> bool {
        let current = modified_at(&self.path);
        if current == self.last_modified {
            return false;
        }
        self.last_modified = current;

        let Ok(contents) = fs::read_to_string(&self.path) else {
            return false;
        };
        let hash = fnv1a(&contents);
        if hash == self.last_hash {
            return false;
        }
        self.last_hash = hash;

        let changed = store.set(parse_settings(&contents, &self.path));
        if changed {
            log_debug(&format!("settings reloaded from {}", self.path.display()));
        }
        changed
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

fn fnv1a(content: &str) -> u64 {
    content.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}
