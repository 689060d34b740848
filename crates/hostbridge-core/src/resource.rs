//! Resource managers and the chunked read loop
//!
//! A `ResourceManager` resolves a resource name to a `RawFile`. Managed code
//! passes the manager as an opaque `External` value (`ResourceHandle`);
//! entry points clone the inner `Arc` so the worker owns its own reference.
//!
//! `read_resource()` is the one read loop every bridge uses: fixed
//! `READ_CHUNK` reads into a growing buffer, with the capacity checked
//! before every append.

use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::constants::{MAX_RESOURCE_NAME, READ_CHUNK};
use crate::error::{BridgeError, BridgeResult};
use crate::value::{External, Value};

/// An open resource
pub trait RawFile: Send {
    /// Bytes not yet read
    fn remaining(&self) -> usize;

    /// Read up to `buf.len()` bytes, returning how many were read
    fn read(&mut self, buf: &mut [u8]) -> BridgeResult<usize>;
}

/// Opens named resources. Shared between the runtime and workers.
pub trait ResourceManager: Send + Sync {
    fn open(&self, name: &str) -> BridgeResult<Box<dyn RawFile>>;
}

/// Read a whole resource as text.
///
/// Fails with `CapacityExceeded` before any byte past `capacity` would be
/// stored, `ResourceNotFound` for unknown names, and `ReadFailed` if the
/// resource stops yielding data while still reporting bytes remaining.
/// Bytes are decoded as UTF-8, replacing invalid sequences.
pub fn read_resource(
    manager: &dyn ResourceManager,
    name: &str,
    capacity: usize,
) -> BridgeResult<String> {
    let mut file = manager.open(name)?;
    let mut content: Vec<u8> = Vec::with_capacity(file.remaining().min(capacity));
    let mut chunk = [0u8; READ_CHUNK];

    while file.remaining() > 0 {
        let want = READ_CHUNK.min(file.remaining());
        if content.len() + want > capacity {
            return Err(BridgeError::CapacityExceeded { capacity });
        }
        let n = file.read(&mut chunk[..want])?;
        if n == 0 {
            return Err(BridgeError::ReadFailed(name.to_string()));
        }
        content.extend_from_slice(&chunk[..n]);
    }

    Ok(String::from_utf8_lossy(&content).into_owned())
}

/// Validate a resource name copied out of a managed string
pub fn resource_name(name: &str) -> BridgeResult<String> {
    if name.is_empty() || name.len() > MAX_RESOURCE_NAME {
        return Err(BridgeError::InvalidArgument {
            index: 0,
            expected: "a resource name of 1..=255 bytes",
        });
    }
    Ok(name.to_string())
}

// ============================================================================
// ResourceHandle
// ============================================================================

/// Opaque handle to a resource manager, as passed by managed code
#[derive(Clone)]
pub struct ResourceHandle {
    manager: Arc<dyn ResourceManager>,
}

impl ResourceHandle {
    pub fn new(manager: Arc<dyn ResourceManager>) -> Self {
        Self { manager }
    }

    /// Wrap as a managed value
    pub fn into_value(self) -> Value {
        Value::External(External::new(self))
    }

    /// Resolve the handle passed at argument `index`
    pub fn from_value(value: &Value, index: usize) -> BridgeResult<Self> {
        value
            .as_external()
            .and_then(|ext| ext.downcast_ref::<ResourceHandle>())
            .cloned()
            .ok_or(BridgeError::InvalidArgument {
                index,
                expected: "a resource manager",
            })
    }

    pub fn read(&self, name: &str, capacity: usize) -> BridgeResult<String> {
        read_resource(self.manager.as_ref(), name, capacity)
    }

    pub fn manager(&self) -> &Arc<dyn ResourceManager> {
        &self.manager
    }
}

// ============================================================================
// DirResourceManager
// ============================================================================

/// Resources are files under a root directory
pub struct DirResourceManager {
    root: PathBuf,
}

impl DirResourceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> BridgeResult<PathBuf> {
        let rel = Path::new(name);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(BridgeError::ResourceNotFound(name.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl ResourceManager for DirResourceManager {
    fn open(&self, name: &str) -> BridgeResult<Box<dyn RawFile>> {
        let path = self.resolve(name)?;
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BridgeError::ResourceNotFound(name.to_string()),
            _ => BridgeError::ReadFailed(name.to_string()),
        })?;
        let meta = file
            .metadata()
            .map_err(|_| BridgeError::ReadFailed(name.to_string()))?;
        if !meta.is_file() {
            return Err(BridgeError::ResourceNotFound(name.to_string()));
        }
        Ok(Box::new(DiskFile {
            name: name.to_string(),
            file,
            remaining: meta.len() as usize,
        }))
    }
}

struct DiskFile {
    name: String,
    file: File,
    remaining: usize,
}

impl RawFile for DiskFile {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn read(&mut self, buf: &mut [u8]) -> BridgeResult<usize> {
        let n = self
            .file
            .read(buf)
            .map_err(|_| BridgeError::ReadFailed(self.name.clone()))?;
        self.remaining = if n == 0 { 0 } else { self.remaining.saturating_sub(n) };
        Ok(n)
    }
}

// ============================================================================
// MemoryResourceManager
// ============================================================================

/// Resources held in memory
#[derive(Default)]
pub struct MemoryResourceManager {
    entries: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl MemoryResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(self, name: &str, content: impl AsRef<[u8]>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&self, name: &str, content: impl AsRef<[u8]>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(name.to_string(), Arc::from(content.as_ref()));
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        match self.entries.write() {
            Ok(mut entries) => entries.remove(name).is_some(),
            Err(_) => false,
        }
    }
}

impl ResourceManager for MemoryResourceManager {
    fn open(&self, name: &str) -> BridgeResult<Box<dyn RawFile>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BridgeError::ReadFailed(name.to_string()))?;
        let data = entries
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::ResourceNotFound(name.to_string()))?;
        Ok(Box::new(MemoryFile { data, pos: 0 }))
    }
}

struct MemoryFile {
    data: Arc<[u8]>,
    pos: usize,
}

impl RawFile for MemoryFile {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read(&mut self, buf: &mut [u8]) -> BridgeResult<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports data remaining but never yields any
    struct StuckManager;

    struct StuckFile;

    impl RawFile for StuckFile {
        fn remaining(&self) -> usize {
            10
        }
        fn read(&mut self, _buf: &mut [u8]) -> BridgeResult<usize> {
            Ok(0)
        }
    }

    impl ResourceManager for StuckManager {
        fn open(&self, _name: &str) -> BridgeResult<Box<dyn RawFile>> {
            Ok(Box::new(StuckFile))
        }
    }

    #[test]
    fn test_read_small_resource() {
        let rm = MemoryResourceManager::new().with("a.txt", "hello");
        assert_eq!(read_resource(&rm, "a.txt", 50_000).unwrap(), "hello");
    }

    #[test]
    fn test_read_multi_chunk_with_partial_tail() {
        let body = "x".repeat(READ_CHUNK * 3 + 7);
        let rm = MemoryResourceManager::new().with("big.txt", &body);
        assert_eq!(read_resource(&rm, "big.txt", 50_000).unwrap(), body);
    }

    #[test]
    fn test_capacity_boundary() {
        let cap = 250;
        let exact = "y".repeat(cap);
        let over = "y".repeat(cap + 1);
        let rm = MemoryResourceManager::new()
            .with("exact", &exact)
            .with("over", &over);

        assert_eq!(read_resource(&rm, "exact", cap).unwrap().len(), cap);
        assert_eq!(
            read_resource(&rm, "over", cap),
            Err(BridgeError::CapacityExceeded { capacity: cap })
        );
    }

    #[test]
    fn test_missing_resource() {
        let rm = MemoryResourceManager::new();
        assert_eq!(
            read_resource(&rm, "nope", 10),
            Err(BridgeError::ResourceNotFound("nope".into()))
        );
    }

    #[test]
    fn test_stuck_source_is_read_failure() {
        assert_eq!(
            read_resource(&StuckManager, "s", 100),
            Err(BridgeError::ReadFailed("s".into()))
        );
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let rm = MemoryResourceManager::new().with("bin", [b'o', b'k', 0xff]);
        assert_eq!(read_resource(&rm, "bin", 10).unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn test_dir_manager_reads_and_rejects_escape() {
        let dir = std::env::temp_dir().join(format!("hostbridge-res-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("note.txt"), "on disk").unwrap();

        let rm = DirResourceManager::new(&dir);
        assert_eq!(read_resource(&rm, "note.txt", 100).unwrap(), "on disk");
        assert!(matches!(
            read_resource(&rm, "../etc/passwd", 100),
            Err(BridgeError::ResourceNotFound(_))
        ));
        assert!(matches!(
            read_resource(&rm, "absent.txt", 100),
            Err(BridgeError::ResourceNotFound(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_handle_round_trip_through_value() {
        let rm: Arc<dyn ResourceManager> = Arc::new(MemoryResourceManager::new().with("k", "v"));
        let value = ResourceHandle::new(rm).into_value();
        let handle = ResourceHandle::from_value(&value, 1).unwrap();
        assert_eq!(handle.read("k", 10).unwrap(), "v");

        assert!(ResourceHandle::from_value(&Value::Int(1), 1).is_err());
    }

    #[test]
    fn test_resource_name_limits() {
        assert!(resource_name("ok.txt").is_ok());
        assert!(resource_name("").is_err());
        assert!(resource_name(&"n".repeat(256)).is_err());
    }
}
