//! Personalization blob stores.

#![allow(missing_docs)]

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::error::WebPartsError;

const ENVELOPE_MAGIC: &[u8; 4] = b"WPPS";
const ENVELOPE_VERSION: u16 = 1;

/// Persistence backend for personalization blobs.
///
/// Blobs are keyed by page path and, for user data, the user name. A `None`
/// user addresses the shared blob.
pub trait PersonalizationStore: Send + Sync {
    fn load_blob(&self, path: &str, user: Option<&str>) -> Result<Option<Vec<u8>>, WebPartsError>;
    fn save_blob(&self, path: &str, user: Option<&str>, blob: &[u8]) -> Result<(), WebPartsError>;
    fn reset_blob(&self, path: &str, user: Option<&str>) -> Result<(), WebPartsError>;
}

type BlobKey = (SmolStr, Option<SmolStr>);

fn blob_key(path: &str, user: Option<&str>) -> BlobKey {
    (SmolStr::new(path), user.map(SmolStr::new))
}

/// In-process store. Clones share the same blobs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<Mutex<FxHashMap<BlobKey, Vec<u8>>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

impl PersonalizationStore for MemoryStore {
    fn load_blob(&self, path: &str, user: Option<&str>) -> Result<Option<Vec<u8>>, WebPartsError> {
        Ok(self.blobs.lock().get(&blob_key(path, user)).cloned())
    }

    fn save_blob(&self, path: &str, user: Option<&str>, blob: &[u8]) -> Result<(), WebPartsError> {
        self.blobs.lock().insert(blob_key(path, user), blob.to_vec());
        Ok(())
    }

    fn reset_blob(&self, path: &str, user: Option<&str>) -> Result<(), WebPartsError> {
        self.blobs.lock().remove(&blob_key(path, user));
        Ok(())
    }
}

/// One checksummed file per page path and user under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `shared/<path>.wpps` or `user/<user>/<path>.wpps` under the root.
    #[must_use]
    pub fn blob_path(&self, path: &str, user: Option<&str>) -> PathBuf {
        let dir = match user {
            Some(user) => self.root.join("user").join(escape_segment(user)),
            None => self.root.join("shared"),
        };
        let mut name = escape_segment(path);
        name.push_str(".wpps");
        dir.join(name)
    }

    fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), WebPartsError> {
        let mut file = fs::File::create(path)
            .map_err(|err| WebPartsError::Store(format!("create {path:?}: {err}").into()))?;
        file.write_all(bytes)
            .map_err(|err| WebPartsError::Store(format!("write {path:?}: {err}").into()))
    }

    fn read_bytes(path: &Path) -> Result<Vec<u8>, WebPartsError> {
        let mut file = fs::File::open(path)
            .map_err(|err| WebPartsError::Store(format!("open {path:?}: {err}").into()))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|err| WebPartsError::Store(format!("read {path:?}: {err}").into()))?;
        Ok(buf)
    }
}

impl PersonalizationStore for FileStore {
    fn load_blob(&self, path: &str, user: Option<&str>) -> Result<Option<Vec<u8>>, WebPartsError> {
        let file = self.blob_path(path, user);
        if !file.exists() {
            return Ok(None);
        }
        let bytes = Self::read_bytes(&file)?;
        decode_envelope(&bytes)
            .map(Some)
            .inspect_err(|err| {
                warn!(file = %file.display(), error = %err, "unreadable personalization file");
            })
    }

    fn save_blob(&self, path: &str, user: Option<&str>, blob: &[u8]) -> Result<(), WebPartsError> {
        let file = self.blob_path(path, user);
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir)
                .map_err(|err| WebPartsError::Store(format!("create {dir:?}: {err}").into()))?;
        }
        debug!(file = %file.display(), len = blob.len(), "saving personalization blob");
        Self::write_bytes(&file, &encode_envelope(blob))
    }

    fn reset_blob(&self, path: &str, user: Option<&str>) -> Result<(), WebPartsError> {
        let file = self.blob_path(path, user);
        match fs::remove_file(&file) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(WebPartsError::Store(format!("remove {file:?}: {err}").into())),
        }
    }
}

/// Keeps ASCII alphanumerics and `-`; everything else becomes `_xx` hex.
fn escape_segment(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{byte:02x}"));
        }
    }
    out
}

/// Wraps a state blob with magic, version, length and CRC-32.
#[must_use]
pub fn encode_envelope(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 14);
    out.extend_from_slice(ENVELOPE_MAGIC);
    out.extend_from_slice(&ENVELOPE_VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    out
}

/// Unwraps and verifies an envelope written by [`encode_envelope`].
pub fn decode_envelope(bytes: &[u8]) -> Result<Vec<u8>, WebPartsError> {
    let truncated = || WebPartsError::Store("personalization file truncated".into());
    if bytes.len() < 14 {
        return Err(truncated());
    }
    if &bytes[..4] != ENVELOPE_MAGIC {
        return Err(WebPartsError::Store("invalid personalization file magic".into()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != ENVELOPE_VERSION {
        return Err(WebPartsError::Store(
            format!("unsupported personalization file version {version}").into(),
        ));
    }
    let len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    if bytes.len() != len + 14 {
        return Err(truncated());
    }
    let payload = &bytes[10..10 + len];
    let stored = u32::from_le_bytes([
        bytes[10 + len],
        bytes[11 + len],
        bytes[12 + len],
        bytes[13 + len],
    ]);
    if crc32fast::hash(payload) != stored {
        return Err(WebPartsError::Store("personalization file checksum mismatch".into()));
    }
    Ok(payload.to_vec())
}
