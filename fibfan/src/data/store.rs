use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fs, io};

use super::*;
use crate::Error;

/// Maximum number of characters of a corrupted artifact echoed back in a [`Error::Parse`].
const PARSE_EXCERPT_LEN: usize = 64;

/// Flat directory artifact store.
///
/// Each artifact is a single `{key}.txt` file holding the decimal representation of its value:
///
/// ```text
///     - artifact dir
///       L {key}.txt
///       L {key}.{random}.tmp
///       L ...
/// ```
///
/// Every write lands in its own uniquely named `{key}.{random}.tmp` sibling first and is renamed into place once complete,
/// so that listing or reading never observes a partially written artifact and concurrent writes of the same key just
/// overwrite each other. Any other entry of the directory (the result table, leftover temporary
/// files, subdirectories) is ignored.
#[derive(Debug, Clone)]
pub struct DirStore {
    /// The directory holding the artifacts.
    dir: PathBuf,
}

impl DirStore {
    /// Open an existing artifact directory.
    ///
    /// Fails with [`Error::StorageUnavailable`] if `dir` does not exist or is not a writable directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { dir: dir.into() };
        store.ensure_available()?;

        Ok(store)
    }

    /// Open an artifact directory, creating it and its parents first if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        fs::create_dir_all(&dir).map_err(|source| Error::StorageUnavailable {
            path: dir.clone(),
            source,
        })?;

        Self::open(dir)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        self.dir.as_path()
    }

    /// Return the expected path of the artifact related to this key.
    pub fn artifact_path(&self, key: WorkKey) -> PathBuf {
        self.dir.join(utils::encode_key(key))
    }

    /// Asynchronously read back the artifact for `key`.
    ///
    /// Same semantics as [`ArtifactStore::read()`], without blocking the calling task while waiting on the file system.
    pub async fn load(&self, key: WorkKey) -> Result<WorkResult> {
        let path = self.artifact_path(key);

        tracing::trace!("Loading artifact {key} from `{}`", path.display());

        match tokio::fs::read(&path).await {
            Ok(bytes) => parse_value(key, &bytes),
            Err(source) => Err(read_error(key, path, source)),
        }
    }

    fn unavailable(&self, source: io::Error) -> Error {
        Error::StorageUnavailable {
            path: self.dir.clone(),
            source,
        }
    }
}

impl ArtifactStore for DirStore {
    fn ensure_available(&self) -> Result<()> {
        let metadata = fs::metadata(&self.dir).map_err(|source| self.unavailable(source))?;

        if !metadata.is_dir() {
            return Err(self.unavailable(io::Error::new(io::ErrorKind::InvalidInput, "not a directory")));
        }
        if metadata.permissions().readonly() {
            return Err(self.unavailable(io::ErrorKind::PermissionDenied.into()));
        }

        Ok(())
    }

    fn write(&self, key: WorkKey, value: &WorkResult) -> Result<()> {
        let path = self.artifact_path(key);

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{key}."))
            .suffix(&format!(".{}", utils::TEMP_EXT))
            .tempfile_in(&self.dir)
            .map_err(|source| Error::Io {
                path: self.dir.clone(),
                source,
            })?;

        write!(tmp, "{value}").map_err(|source| Error::Io {
            path: tmp.path().to_path_buf(),
            source,
        })?;
        tmp.persist(&path).map_err(|e| Error::Io {
            path: path.clone(),
            source: e.error,
        })?;

        tracing::trace!("Stored artifact {key} to `{}`", path.display());

        Ok(())
    }

    fn list_keys(&self) -> Result<BTreeSet<WorkKey>> {
        let io_err = |source| Error::Io {
            path: self.dir.clone(),
            source,
        };

        let mut keys = BTreeSet::new();

        for entry in self.dir.read_dir().map_err(|source| self.unavailable(source))? {
            let entry = entry.map_err(io_err)?;
            let name = entry.file_name();

            let is_file = entry.file_type().map_err(io_err)?.is_file();

            match utils::decode_key(&name) {
                Some(key) if is_file => {
                    keys.insert(key);
                }
                _ => tracing::trace!("Skipping {name:?}, not an artifact"),
            }
        }

        Ok(keys)
    }

    fn read(&self, key: WorkKey) -> Result<WorkResult> {
        let path = self.artifact_path(key);

        match fs::read(&path) {
            Ok(bytes) => parse_value(key, &bytes),
            Err(source) => Err(read_error(key, path, source)),
        }
    }
}

fn read_error(key: WorkKey, path: PathBuf, source: io::Error) -> Error {
    match source.kind() {
        io::ErrorKind::NotFound => Error::NotFound { key },
        _ => Error::Io { path, source },
    }
}

/// Parse the trimmed content of an artifact as a decimal integer.
///
/// Stricter than `BigUint`'s own parser, which would also accept a leading `+` or `_` separators.
fn parse_value(key: WorkKey, bytes: &[u8]) -> Result<WorkResult> {
    let content = String::from_utf8_lossy(bytes);
    let digits = content.trim();

    let invalid = || Error::Parse {
        key,
        content: content.chars().take(PARSE_EXCERPT_LEN).collect(),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits.parse().map_err(|_| invalid())
}
