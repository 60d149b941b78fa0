//! shared byte regions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::data::TableData;
use crate::read::{ReadError, TableRead};

/// A shared region of bytes.
///
/// Blobs are reference counted: cloning one is cheap and yields a second
/// handle to the same storage. A blob starts out writable and becomes
/// immutable forever once [`lock`](Blob::lock)ed (or as soon as it is
/// shared); publication paths lock a blob before handing it to readers, so
/// a published blob never changes underneath a view borrowed from it.
#[derive(Clone)]
pub struct Blob {
    inner: Arc<BlobData>,
}

struct BlobData {
    bytes: Box<[u8]>,
    locked: AtomicBool,
}

impl Blob {
    /// Create a new blob owning the provided bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Blob {
            inner: Arc::new(BlobData {
                bytes: bytes.into_boxed_slice(),
                locked: AtomicBool::new(false),
            }),
        }
    }

    /// Create a new blob holding a copy of the provided bytes.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    /// The shared zero-length blob.
    pub fn empty() -> Self {
        static EMPTY: OnceLock<Blob> = OnceLock::new();
        EMPTY
            .get_or_init(|| {
                let blob = Blob::new(Vec::new());
                blob.lock();
                blob
            })
            .clone()
    }

    /// The length of the blob, in bytes.
    pub fn len(&self) -> usize {
        self.inner.bytes.len()
    }

    /// `true` if the blob contains no bytes.
    pub fn is_empty(&self) -> bool {
        self.inner.bytes.is_empty()
    }

    /// The blob's contents.
    pub fn bytes(&self) -> &[u8] {
        &self.inner.bytes
    }

    /// The blob's contents, as [`TableData`] ready for parsing.
    pub fn data(&self) -> TableData<'_> {
        TableData::new(self.bytes())
    }

    /// Parse the blob as a table of type `T`.
    pub fn read_table<'a, T: TableRead<'a>>(&'a self) -> Result<T, ReadError> {
        T::read(self.data())
    }

    /// Reinterpret the blob's leading bytes as a reference to `T`.
    pub fn as_struct<T: bytemuck::AnyBitPattern>(&self) -> Result<&T, ReadError> {
        self.data().read_ref_at(0)
    }

    /// Freeze the blob. After this call it can never be mutated again.
    pub fn lock(&self) {
        self.inner.locked.store(true, Ordering::Release);
    }

    /// `true` once [`lock`](Blob::lock) has been called.
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::Acquire)
    }

    /// Mutable access to the blob's bytes.
    ///
    /// Returns `None` if the blob has been locked, or if other handles to
    /// the same storage exist. Mutation is only ever possible through the
    /// sole handle to an unlocked blob.
    pub fn try_bytes_mut(&mut self) -> Option<&mut [u8]> {
        if self.is_locked() {
            return None;
        }
        Arc::get_mut(&mut self.inner).map(|data| &mut *data.bytes)
    }

    /// Extract the blob's bytes as an owned, writable vector.
    ///
    /// When this handle is the only one and the blob was never locked, the
    /// storage is reused; otherwise the bytes are copied, leaving every
    /// other handle untouched.
    pub fn into_vec(self) -> Vec<u8> {
        match Arc::try_unwrap(self.inner) {
            Ok(data) if !data.locked.load(Ordering::Acquire) => data.bytes.into_vec(),
            Ok(data) => data.bytes.to_vec(),
            Err(shared) => shared.bytes.to_vec(),
        }
    }

    /// `true` if both handles refer to the same storage.
    pub fn ptr_eq(&self, other: &Blob) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.len())
            .field("locked", &self.is_locked())
            .finish()
    }
}
