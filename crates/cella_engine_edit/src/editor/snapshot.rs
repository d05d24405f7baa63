use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use cella_engine::{CellGrid, Compression, EngineError, PatternFormat, read_pattern, write_pattern};

/// A temp pattern file owned by the history. The file is deleted when the
/// last record referring to it is dropped, so two records restoring the
/// same state can share one file via `Arc`.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SnapshotFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            log::warn!("could not delete snapshot {}: {err}", self.path.display());
        }
    }
}

/// Writes and reads full-universe snapshots in a private temp directory.
pub struct SnapshotStore {
    dir: PathBuf,
    issued: Vec<Weak<SnapshotFile>>,
    save_count: usize,
}

impl SnapshotStore {
    pub fn new() -> Result<Self, EngineError> {
        let dir = std::env::temp_dir().join(format!("cella-snapshots-{:08x}", fastrand::u32(..)));
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            issued: Vec::new(),
            save_count: 0,
        })
    }

    /// Serialize the whole universe to a fresh temp file. The backend
    /// decides the format: only the hashed backend can use the compact one.
    pub fn save(&mut self, grid: &mut CellGrid) -> Result<Arc<SnapshotFile>, EngineError> {
        let (format, compression, ext) = if grid.algorithm().supports_compact() {
            (PatternFormat::Compact, Compression::Zstd, "cac")
        } else {
            (PatternFormat::Text, Compression::None, "cells")
        };
        let path = self.dir.join(format!("snap-{:016x}.{ext}", fastrand::u64(..)));
        self.save_count += 1;
        write_pattern(&path, grid, format, compression, None)?;
        let snap = Arc::new(SnapshotFile { path });
        self.issued.push(Arc::downgrade(&snap));
        Ok(snap)
    }

    pub fn load(&self, file: &SnapshotFile) -> Result<CellGrid, EngineError> {
        read_pattern(&file.path)
    }

    /// How many times `save` ran. Lets callers verify that restoring a
    /// state another record already holds reuses its file instead of
    /// serializing again.
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    /// Delete leftover files in the store's directory that no live record
    /// owns. Handles cloned into a duplicated session keep their files,
    /// since ownership is tracked per file and not per session.
    pub fn reclaim(&mut self) -> usize {
        self.issued.retain(|snap| snap.strong_count() > 0);
        let live: Vec<Arc<SnapshotFile>> = self.issued.iter().filter_map(Weak::upgrade).collect();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if live.iter().any(|snap| snap.path == path) {
                continue;
            }
            if fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

impl Drop for SnapshotStore {
    fn drop(&mut self) {
        // snapshot files may still be live; only remove the dir if empty
        fs::remove_dir(&self.dir).ok();
    }
}
