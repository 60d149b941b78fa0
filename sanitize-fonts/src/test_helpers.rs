//! small utilities used in tests

use std::collections::HashMap;

use types::{Scalar, Tag};

use crate::blob::Blob;
use crate::data::TableData;
use crate::read::TableSource;

/// A convenience type for generating a buffer of big-endian bytes.
#[derive(Debug, Clone, Default)]
pub struct BeBuffer {
    data: Vec<u8>,
}

impl BeBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    /// The current length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer contains zero bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return a reference to the contents of the buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Write any scalar to this buffer.
    pub fn push(mut self, item: impl Scalar) -> Self {
        self.data.extend(item.to_raw().as_ref());
        self
    }

    /// Write multiple scalars into the buffer.
    pub fn extend<T: Scalar>(mut self, iter: impl IntoIterator<Item = T>) -> Self {
        for item in iter {
            self.data.extend(item.to_raw().as_ref());
        }
        self
    }

    pub fn data(&self) -> TableData {
        TableData::new(&self.data)
    }

    /// The buffer contents as a fresh blob.
    pub fn blob(&self) -> Blob {
        Blob::from_slice(&self.data)
    }
}

impl std::ops::Deref for BeBuffer {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// An in-memory face: a map from table tags to blobs.
#[derive(Default)]
pub struct MemFace {
    tables: HashMap<Tag, Blob>,
}

impl MemFace {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with(mut self, tag: Tag, blob: Blob) -> Self {
        self.tables.insert(tag, blob);
        self
    }
}

impl TableSource for MemFace {
    fn reference_table(&self, tag: Tag) -> Blob {
        self.tables.get(&tag).cloned().unwrap_or_else(Blob::empty)
    }
}
