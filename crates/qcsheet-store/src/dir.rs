use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::{ByteStore, Result};

/// One file per source under a directory.
///
/// File names are derived from a hash of the source key, so keys may contain path separators or
/// non-ASCII text (the register names are Chinese) without any escaping. The original key is
/// kept in a sidecar `.key` file so [`ByteStore::keys`] can list entries.
#[derive(Clone, Debug)]
pub struct DirByteStore {
    dir: PathBuf,
}

impl DirByteStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: base_dir.into().join("register-cache"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", file_stem_for_key(key)))
    }

    fn key_path_for_key(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.key", file_stem_for_key(key)))
    }
}

impl ByteStore for DirByteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for_key(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        // Write the key first: a payload without its key file is invisible to `keys` but still
        // readable, while a key without a payload would list a phantom entry.
        atomic_write_bytes(&self.key_path_for_key(key), key.as_bytes())?;
        atomic_write_bytes(&self.path_for_key(key), bytes)?;
        log::debug!("stored {} bytes for `{key}` in {:?}", bytes.len(), self.dir);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let existed = remove_if_exists(&self.path_for_key(key))?;
        remove_if_exists(&self.key_path_for_key(key))?;
        Ok(existed)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("key") {
                continue;
            }
            if !path.with_extension("bin").is_file() {
                continue;
            }
            keys.push(fs::read_to_string(&path)?);
        }
        keys.sort();
        Ok(keys)
    }
}

fn file_stem_for_key(key: &str) -> String {
    // Versioned prefix so the naming scheme can change without clobbering older files.
    const PREFIX: &[u8] = b"qcsheet-register-cache-v1\0";
    let mut hasher = Sha256::new();
    hasher.update(PREFIX);
    hasher.update(key.as_bytes());
    format!("source-{}", hex::encode(hasher.finalize()))
}

/// Write to a temp file in the destination directory, sync it, then rename it into place.
/// On failure the destination is left untouched.
fn atomic_write_bytes(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|err| err.error)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
