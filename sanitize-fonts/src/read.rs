//! traits for interpreting table data

use types::Tag;

use crate::blob::Blob;
use crate::data::TableData;

/// A type with a declared minimum encoded size.
///
/// For fixed-size types this is the whole encoding; for types with a
/// variable tail it covers the mandatory prefix (for an array, its length
/// field). Bounds checks during sanitization are phrased in terms of this
/// value.
pub trait MinSize {
    /// The smallest number of bytes any well-formed value occupies.
    const MIN_SIZE: usize;
}

/// A type that can be read from raw table data.
///
/// This is implemented by the borrowing views used to interpret data that
/// has already been published. The `read` constructor validates only what it
/// must to hand out a view (lengths, not reachability); the deep structural
/// guarantees come from sanitization.
pub trait TableRead<'a>: Sized {
    /// Read an instance of `Self` from the provided data.
    fn read(data: TableData<'a>) -> Result<Self, ReadError>;
}

/// A table identified by a four-byte tag in a font's table directory.
pub trait TaggedTable {
    /// The table's tag.
    const TAG: Tag;
}

/// An interface for resolving table tags to blobs.
///
/// This is the face side of the contract: anything that can produce the raw
/// bytes for a tagged table can have those tables sanitized and cached.
pub trait TableSource {
    /// The blob for the given table, or the shared empty blob if absent.
    fn reference_table(&self, tag: Tag) -> Blob;

    /// Like [`reference_table`](Self::reference_table), but reporting an
    /// absent table as an error instead of an empty blob.
    fn expect_table(&self, tag: Tag) -> Result<Blob, ReadError> {
        let blob = self.reference_table(tag);
        if blob.is_empty() {
            Err(ReadError::TableIsMissing(tag))
        } else {
            Ok(blob)
        }
    }
}

/// An error that occurs when reading table data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    OutOfBounds,
    InvalidArrayLen,
    InvalidFormat(u16),
    NullOffset,
    TableIsMissing(Tag),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::OutOfBounds => write!(f, "an offset was out of bounds"),
            ReadError::InvalidArrayLen => {
                write!(f, "array length not a multiple of the item size")
            }
            ReadError::InvalidFormat(x) => write!(f, "invalid format '{x}'"),
            ReadError::NullOffset => write!(f, "an offset was unexpectedly null"),
            ReadError::TableIsMissing(tag) => write!(f, "the {tag} table is missing"),
        }
    }
}

impl std::error::Error for ReadError {}
