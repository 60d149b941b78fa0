//! Bounds-checked access, repair and serialization of binary font tables.
//!
//! Font tables arrive as untrusted blobs of big-endian data, stitched
//! together internally by byte offsets. Before anything else may interpret
//! such a table, it is *sanitized*: a bounded structural walk that proves
//! every reachable field lies inside the blob, and that severs (rather than
//! rejects) broken sub-tables by zeroing the offsets that lead to them.
//! Tables that pass are frozen and published; tables that fail are replaced
//! by a shared empty blob, so readers always see something well-formed.
//!
//! The crate provides:
//!
//! - [`Blob`]: a shared, freezable byte region.
//! - [`SanitizeContext`]: the bounds + work-budget + edit-tracking state for
//!   one validation pass, and the two-pass [`sanitize_blob`] driver.
//! - [`SerializeContext`]: an append-only writer with overflow detection.
//! - Schema markers for the array and offset families used by table
//!   definitions, and borrowing views for reading published data.
//! - [`TableLoader`]/[`LazyInstance`]: race-free lazy per-face publication.
//! - [`PaintExtents`]: a callback-driven bounds accumulator for paint trees.
//!
//! On-disk types never require copying or alignment fix-ups: scalar fields
//! are [`BigEndian`](types::BigEndian) wrappers and records are align-1
//! plain-old-data, reinterpreted in place via [`bytemuck`].
//!
//! [`sanitize_blob`]: SanitizeContext::sanitize_blob

pub mod array;
mod blob;
mod data;
mod dispatch;
pub mod extents;
mod lazy;
mod null;
mod offset;
mod read;
mod sanitize;
mod serialize;

#[doc(hidden)]
pub mod test_helpers;

#[cfg(test)]
pub(crate) mod test_tables;

pub use blob::Blob;
pub use data::TableData;
pub use dispatch::{Dispatch, DispatchContext};
pub use extents::PaintExtents;
pub use lazy::{LazyInit, LazyInstance, TableLoader};
pub use null::null_of;
pub use offset::{Offset, OffsetTo, ResolveOffset};
pub use read::{MinSize, ReadError, TableRead, TableSource, TaggedTable};
pub use sanitize::{Sanitize, SanitizeContext, SanitizeLimits, SanitizeWithArgs, SanitizeWithBase};
pub use serialize::{Placed, SerializeContext};

/// Public re-export of the wire-types crate.
pub extern crate wire_types as types;
