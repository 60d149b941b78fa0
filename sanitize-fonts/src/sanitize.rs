//! structural validation of untrusted table data
//!
//! Sanitization walks a table the way a reader would, but through a context
//! that re-asserts bounds at every step, charges each check against a work
//! budget, and may surgically repair the table by zeroing offsets whose
//! targets do not hold up. The walk operates on *byte positions* within the
//! pass data; the structural types being checked are zero-sized schema
//! markers (see [`crate::array`] and [`crate::offset`]), so nothing is
//! borrowed from the buffer while it may still be edited.

use types::Scalar;

use crate::blob::Blob;
use crate::read::{MinSize, TableSource, TaggedTable};

/// Work and edit bounds for a sanitization pass.
///
/// The defaults bound the damage a hostile font can do: the op budget
/// prevents quadratic traversals, and the edit cap prevents unbounded
/// rewriting. They are policy, not correctness; raising them only makes a
/// pass willing to do more work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeLimits {
    /// Maximum number of offset edits per pass.
    pub max_edits: u32,
    /// Op budget per input byte.
    pub max_ops_factor: usize,
    /// Op budget floor, applied to small inputs.
    pub max_ops_min: usize,
}

impl Default for SanitizeLimits {
    fn default() -> Self {
        SanitizeLimits {
            max_edits: 32,
            max_ops_factor: 8,
            max_ops_min: 16384,
        }
    }
}

/// The bytes a sanitization pass runs against.
///
/// A pass starts against the shared blob. If repairs turn out to be needed,
/// the pass switches to a private writable copy; the caller's bytes are
/// never mutated.
enum PassData {
    Detached,
    Shared(Blob),
    Writable(Vec<u8>),
}

impl PassData {
    fn bytes(&self) -> &[u8] {
        match self {
            PassData::Detached => &[],
            PassData::Shared(blob) => blob.bytes(),
            PassData::Writable(vec) => vec,
        }
    }

    fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            PassData::Writable(vec) => Some(vec),
            _ => None,
        }
    }
}

/// State for one structural validation pass.
///
/// The context tracks the valid byte range, the remaining op budget, and
/// the number of edits requested so far. Schema types call back into it for
/// every bounds decision; it is the only authority on what may be read or
/// written.
pub struct SanitizeContext {
    end: usize,
    max_ops: i64,
    edit_count: u32,
    writable: bool,
    num_glyphs: u32,
    limits: SanitizeLimits,
    data: PassData,
}

impl SanitizeContext {
    /// Create a context with default limits.
    pub fn new() -> Self {
        Self::with_limits(SanitizeLimits::default())
    }

    /// Create a context with the provided limits.
    pub fn with_limits(limits: SanitizeLimits) -> Self {
        SanitizeContext {
            end: 0,
            max_ops: 0,
            edit_count: 0,
            writable: false,
            num_glyphs: 0,
            limits,
            data: PassData::Detached,
        }
    }

    /// Record the glyph count of the face under inspection.
    ///
    /// The count is not used by the core checks; it is carried for table
    /// schemas whose validity depends on it (glyph-indexed arrays).
    pub fn set_num_glyphs(&mut self, num_glyphs: u32) {
        self.num_glyphs = num_glyphs;
    }

    /// The glyph count recorded by [`set_num_glyphs`](Self::set_num_glyphs).
    pub fn num_glyphs(&self) -> u32 {
        self.num_glyphs
    }

    /// The number of edits requested so far in this pass.
    pub fn edit_count(&self) -> u32 {
        self.edit_count
    }

    fn start_processing(&mut self) {
        let len = self.data.bytes().len();
        self.end = len;
        self.max_ops = self
            .limits
            .max_ops_min
            .max(len.saturating_mul(self.limits.max_ops_factor)) as i64;
        self.edit_count = 0;
        log::trace!("sanitize start: {len} bytes, {} ops", self.max_ops);
    }

    fn end_processing(&mut self) {
        log::trace!("sanitize end: {} edit requests", self.edit_count);
        self.data = PassData::Detached;
        self.end = 0;
    }

    /// Check that `[pos, pos + len)` lies within the pass data.
    ///
    /// Every call costs one op; once the budget is exhausted all checks
    /// fail, which terminates the traversal the same way out-of-range data
    /// would.
    pub fn check_range(&mut self, pos: usize, len: usize) -> bool {
        self.max_ops -= 1;
        self.max_ops > 0 && pos <= self.end && len <= self.end - pos
    }

    /// Check an array of `len` records of `record_size` bytes at `pos`.
    ///
    /// Fails if the total size overflows, without touching the data.
    pub fn check_array(&mut self, pos: usize, record_size: usize, len: usize) -> bool {
        match record_size.checked_mul(len) {
            Some(total) => self.check_range(pos, total),
            None => false,
        }
    }

    /// Check that a value of type `T` fits at `pos`.
    pub fn check_struct<T: MinSize>(&mut self, pos: usize) -> bool {
        self.check_range(pos, T::MIN_SIZE)
    }

    /// Ask permission to edit the bytes at `[pos, pos + len)`.
    ///
    /// The request is counted whether or not it is granted; a structure
    /// that keeps asking will exhaust the cap and start being refused.
    /// Permission is only ever granted against a private writable copy.
    pub fn may_edit(&mut self, _pos: usize, _len: usize) -> bool {
        if self.edit_count >= self.limits.max_edits {
            return false;
        }
        self.edit_count += 1;
        self.writable
    }

    /// Try to overwrite the scalar at `pos` with `value`.
    ///
    /// Returns `true` only if the edit was permitted and performed.
    pub fn try_set<T: Scalar>(&mut self, pos: usize, value: T) -> bool {
        if !self.may_edit(pos, T::RAW_BYTE_LEN) {
            return false;
        }
        let raw = value.to_raw();
        let end = match pos.checked_add(T::RAW_BYTE_LEN) {
            Some(end) => end,
            None => return false,
        };
        match self.data.bytes_mut().and_then(|bytes| bytes.get_mut(pos..end)) {
            Some(bytes) => {
                bytes.copy_from_slice(raw.as_ref());
                true
            }
            None => false,
        }
    }

    /// Decode the scalar at `pos`, if it lies within the pass data.
    ///
    /// This does not charge the op budget; readers are expected to have
    /// established bounds with a `check_*` call first.
    pub fn read_at<T: Scalar>(&self, pos: usize) -> Option<T> {
        self.data.bytes().get(pos..).and_then(T::read)
    }

    /// Validate `blob` as a table of type `T`, returning the blob to use.
    ///
    /// On success the blob (possibly a repaired copy) is locked and
    /// returned. On failure the shared empty blob is returned instead, so
    /// the caller always holds something structurally valid. An empty input
    /// is returned as-is.
    ///
    /// A pass that repairs anything is re-run to prove the repairs settled;
    /// a second round of edits means the structure cannot be stabilized and
    /// is treated as fatal. A read-only pass that *wanted* to repair
    /// something is retried against a private writable copy of the bytes.
    pub fn sanitize_blob<T: Sanitize>(mut self, blob: Blob) -> Blob {
        self.data = PassData::Shared(blob);
        self.writable = false;
        let sane = loop {
            self.start_processing();
            if self.end == 0 {
                let blob = match std::mem::replace(&mut self.data, PassData::Detached) {
                    PassData::Shared(blob) => blob,
                    _ => Blob::empty(),
                };
                self.end_processing();
                return blob;
            }

            let mut sane = T::sanitize(&mut self, 0);
            if sane {
                if self.edit_count > 0 {
                    log::trace!(
                        "passed first round with {} edits; going for second round",
                        self.edit_count
                    );
                    // check the edits did not step on each other's toes
                    self.edit_count = 0;
                    sane = T::sanitize(&mut self, 0);
                    if self.edit_count > 0 {
                        log::debug!(
                            "requested {} edits in second round; failing",
                            self.edit_count
                        );
                        sane = false;
                    }
                }
                break sane;
            }
            if self.edit_count > 0 && !self.writable {
                log::trace!("retrying with a writable copy");
                self.make_writable();
                continue;
            }
            break false;
        };

        let out = if sane {
            let blob = match std::mem::replace(&mut self.data, PassData::Detached) {
                PassData::Shared(blob) => blob,
                PassData::Writable(vec) => Blob::new(vec),
                PassData::Detached => Blob::empty(),
            };
            blob.lock();
            blob
        } else {
            Blob::empty()
        };
        log::trace!("sanitize {}", if sane { "passed" } else { "FAILED" });
        self.end_processing();
        out
    }

    /// Fetch the table `T` from `face` and sanitize it.
    pub fn reference_table<T: Sanitize + TaggedTable>(self, face: &impl TableSource) -> Blob {
        self.sanitize_blob::<T>(face.reference_table(T::TAG))
    }

    fn make_writable(&mut self) {
        let data = std::mem::replace(&mut self.data, PassData::Detached);
        let vec = match data {
            PassData::Shared(blob) => blob.into_vec(),
            PassData::Writable(vec) => vec,
            PassData::Detached => Vec::new(),
        };
        self.data = PassData::Writable(vec);
        self.writable = true;
    }
}

impl Default for SanitizeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural validation of an on-disk type.
///
/// `sanitize` is handed the byte position of the value within the pass
/// data; the type decides what to check there. Types whose members are
/// reached through offsets measured from an *enclosing* table implement
/// [`SanitizeWithBase`] instead.
pub trait Sanitize: MinSize {
    /// `true` if `sanitize` is nothing but a bounds check.
    ///
    /// Arrays of such types are validated with a single aggregate bounds
    /// check instead of one call per element; the two are equivalent
    /// precisely because there are no offsets to chase.
    const SHALLOW: bool;

    /// Check the value at `pos`, recursing into anything it references.
    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool;
}

/// Structural validation of a member whose offsets are measured from an
/// enclosing table.
pub trait SanitizeWithBase {
    /// Check the value at `pos`, resolving its offsets against `base`.
    fn sanitize_with_base(c: &mut SanitizeContext, pos: usize, base: usize) -> bool;
}

/// Structural validation of a type that needs external state.
///
/// The canonical case is an array with no length prefix, whose element
/// count lives elsewhere in the enclosing table.
pub trait SanitizeWithArgs {
    /// The external state needed to validate this type.
    type Args;

    /// Check the value at `pos` using the provided args.
    fn sanitize_with_args(c: &mut SanitizeContext, pos: usize, args: &Self::Args) -> bool;
}

impl<T: Scalar> MinSize for types::BigEndian<T> {
    const MIN_SIZE: usize = T::RAW_BYTE_LEN;
}

impl<T: Scalar> Sanitize for types::BigEndian<T> {
    const SHALLOW: bool = true;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        c.check_struct::<Self>(pos)
    }
}
