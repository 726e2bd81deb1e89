//! Saving and restoring `ModelState`.
//!
//! A checkpoint for step `n` is written to `<prefix>-<n>`. A small index file
//! named `checkpoint`, next to the checkpoints, names the latest one. Both
//! are written to a temporary file first and renamed into place, so a crash
//! mid-write leaves the previous checkpoint in effect.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::model::ModelState;

const INDEX_FILE: &str = "checkpoint";

pub struct CheckpointStore {
    prefix: PathBuf,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Make a completed rename durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Write `path` through a temporary file next to it. On failure the
/// temporary file is removed and `path` is untouched.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = with_suffix(path, ".tmp");
    let result = write_file(&tmp, write)
        .and_then(|()| {
            fs::rename(&tmp, path).with_context(|| format!("failed to rename {tmp:?} to {path:?}"))
        });
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
        return result;
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    sync_dir(dir).with_context(|| format!("failed to sync directory {dir:?}"))
}

fn write_file<F>(tmp: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut f = BufWriter::new(
        File::create(tmp).with_context(|| format!("failed to create {tmp:?}"))?,
    );
    write(&mut f)?;
    f.flush().with_context(|| format!("failed to write {tmp:?}"))?;
    f.get_ref()
        .sync_all()
        .with_context(|| format!("failed to write {tmp:?}"))
}

impl CheckpointStore {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        CheckpointStore {
            prefix: prefix.into(),
        }
    }

    fn dir(&self) -> PathBuf {
        match self.prefix.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.dir().join(INDEX_FILE)
    }

    pub fn path_for_step(&self, step: u64) -> PathBuf {
        with_suffix(&self.prefix, &format!("-{step}"))
    }

    /// Write `state` and make it the latest checkpoint.
    pub fn save(&self, state: &ModelState) -> Result<PathBuf> {
        let dir = self.dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create checkpoint directory {dir:?}"))?;

        let path = self.path_for_step(state.global_step);
        write_atomically(&path, |f| {
            bincode::serialize_into(f, state)
                .with_context(|| format!("failed to write checkpoint {path:?}"))
        })?;

        let name = path
            .file_name()
            .context("checkpoint prefix has no file name")?
            .to_string_lossy()
            .into_owned();
        write_atomically(&self.index_path(), |f| {
            writeln!(f, "{name}").context("failed to write checkpoint index")
        })?;
        info!("saved checkpoint {path:?}");
        Ok(path)
    }

    /// Path of the latest checkpoint, if there is one.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        let index = self.index_path();
        let text = match fs::read_to_string(&index) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read checkpoint index {index:?}"))
            }
        };
        let name = text.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let path = self.dir().join(name);
        Ok(path.is_file().then_some(path))
    }

    /// Load the latest checkpoint. `Ok(None)` means there is nothing to
    /// restore; a checkpoint that exists but can't be read is an error.
    pub fn restore(&self) -> Result<Option<ModelState>> {
        let Some(path) = self.latest()? else {
            return Ok(None);
        };
        let f = BufReader::new(
            File::open(&path).with_context(|| format!("failed to open checkpoint {path:?}"))?,
        );
        let state = bincode::deserialize_from(f)
            .with_context(|| format!("failed to load checkpoint {path:?}"))?;
        info!("restored checkpoint {path:?}");
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn nothing_to_restore() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("model.ckpt"));
        assert!(store.latest().unwrap().is_none());
        assert!(store.restore().unwrap().is_none());
    }

    #[test]
    fn latest_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("model").join("model.ckpt"));
        let mut state = ModelState::new(5, 3, &mut StdRng::seed_from_u64(9));
        state.global_step = 10;
        let first = store.save(&state).unwrap();
        assert_eq!(first, dir.path().join("model").join("model.ckpt-10"));

        state.global_step = 20;
        state.b[0] = 42.0;
        store.save(&state).unwrap();

        let restored = store.restore().unwrap().unwrap();
        assert_eq!(restored, state);
        assert!(first.is_file());
    }

    #[test]
    fn dangling_index_means_no_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "model.ckpt-5\n").unwrap();
        let store = CheckpointStore::new(dir.path().join("model.ckpt"));
        assert!(store.restore().unwrap().is_none());
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ckpt-3");
        let result = write_atomically(&path, |f| {
            f.write_all(b"partial").unwrap();
            anyhow::bail!("disk full")
        });
        assert!(result.is_err());
        assert!(!path.exists());
        assert!(!with_suffix(&path, ".tmp").exists());

        write_atomically(&path, |f| Ok(f.write_all(b"whole")?)).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"whole");
        assert!(!with_suffix(&path, ".tmp").exists());
    }

    #[test]
    fn corrupt_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "model.ckpt-5\n").unwrap();
        fs::write(dir.path().join("model.ckpt-5"), b"garbage").unwrap();
        let store = CheckpointStore::new(dir.path().join("model.ckpt"));
        assert!(store.restore().is_err());
    }
}
