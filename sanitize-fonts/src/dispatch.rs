//! the protocol by which traversals visit table structures
//!
//! A *dispatch context* is any visitor over composite structures: sanitize
//! and serialize here, subsetting or lookup application in higher layers.
//! Structures route a traversal through [`Dispatch`] without knowing which
//! pass is running, so one set of schema declarations serves them all.
//!
//! Tables that come in several formats are sum types over a leading `u16`
//! tag, not class hierarchies; their `Dispatch` impls read the tag and
//! `match` on it, making every traversal total over the variants (see the
//! format-dispatch tests for the shape).

use types::Scalar;

use crate::sanitize::SanitizeContext;

/// A visitor over composite table structures.
pub trait DispatchContext {
    /// Short name identifying the traversal, for diagnostics.
    const NAME: &'static str;

    /// The result type of visiting one structure.
    type Return;

    /// The result of a traversal that had nothing to do.
    fn default_return_value() -> Self::Return;

    /// The result when a structure declines to dispatch (for example, an
    /// unreadable format tag).
    fn no_dispatch_return_value() -> Self::Return {
        Self::default_return_value()
    }

    /// Whether the format tag at `pos` may be examined at all.
    ///
    /// A context with bounds to enforce checks the tag's storage here
    /// before the structure reads it.
    fn may_dispatch(&mut self, _pos: usize) -> bool {
        true
    }
}

/// A structure that can be visited by the dispatch context `C`.
pub trait Dispatch<C: DispatchContext> {
    /// Visit the value at `pos`, routing to the right variant for
    /// format-tagged structures.
    fn dispatch(c: &mut C, pos: usize) -> C::Return;
}

impl DispatchContext for SanitizeContext {
    const NAME: &'static str = "sanitize";

    type Return = bool;

    fn default_return_value() -> bool {
        true
    }

    fn no_dispatch_return_value() -> bool {
        false
    }

    fn may_dispatch(&mut self, pos: usize) -> bool {
        // the format tag itself must be in bounds before it is read
        self.check_range(pos, u16::RAW_BYTE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;
    use crate::test_helpers::BeBuffer;
    use crate::test_tables::FormatSwitch;

    fn sanitize_ok(buf: &BeBuffer) -> bool {
        let out = crate::SanitizeContext::new().sanitize_blob::<FormatSwitch>(buf.blob());
        !out.ptr_eq(&Blob::empty())
    }

    #[test]
    fn known_formats_route_to_their_variant() {
        // format 1: single u16 payload
        let buf = BeBuffer::new().push(1u16).push(0xAAu16);
        assert!(sanitize_ok(&buf));
        // format 2: u32 payload, too short here
        let buf = BeBuffer::new().push(2u16).push(0xAAu16);
        assert!(!sanitize_ok(&buf));
        let buf = BeBuffer::new().push(2u16).push(0xAAu32);
        assert!(sanitize_ok(&buf));
    }

    #[test]
    fn unknown_format_fails_dispatch() {
        let buf = BeBuffer::new().push(9u16).push(0xAAu32);
        assert!(!sanitize_ok(&buf));
    }

    #[test]
    fn truncated_tag_fails_dispatch() {
        let buf = BeBuffer::new().push(1u8);
        assert!(!sanitize_ok(&buf));
    }
}
