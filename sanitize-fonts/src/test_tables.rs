//! hand-written table schemas exercising the traversal machinery
//!
//! Real table definitions live in higher layers; these minimal ones stand
//! in for them in tests, covering the shapes that matter: a table with an
//! offset measured from its own start, a format-tagged union, and a pair of
//! interdependent offsets that cannot be repaired consistently.

use types::{Offset16, Scalar, Tag, U16};

use crate::array::{ArrayOf, UnsizedArrayOf};
use crate::data::TableData;
use crate::dispatch::{Dispatch, DispatchContext};
use crate::offset::{Offset, OffsetTo, ResolveOffset};
use crate::read::{MinSize, ReadError, TableRead, TaggedTable};
use crate::sanitize::{Sanitize, SanitizeContext, SanitizeWithBase};

/// A table holding a format field and an offset to a `u16` sub-table.
pub struct ParentTable;

impl MinSize for ParentTable {
    const MIN_SIZE: usize = 4;
}

impl TaggedTable for ParentTable {
    const TAG: Tag = Tag::new(b"prnt");
}

impl Sanitize for ParentTable {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        c.check_struct::<Self>(pos) && OffsetTo::<U16>::sanitize_with_base(c, pos + 2, pos)
    }
}

/// The read view of a [`ParentTable`].
pub struct ParentView<'a> {
    data: TableData<'a>,
}

impl<'a> TableRead<'a> for ParentView<'a> {
    fn read(data: TableData<'a>) -> Result<Self, ReadError> {
        data.read_at::<u16>(0)?;
        Ok(ParentView { data })
    }
}

impl ParentView<'_> {
    pub fn format(&self) -> u16 {
        self.data.read_at(0).unwrap_or_default()
    }

    pub fn child(&self) -> Option<u16> {
        let offset: Offset16 = self.data.read_at(2).ok()?;
        let child: TableData = offset.resolve(self.data).ok()?;
        child.read_at(0).ok()
    }
}

/// A format-tagged union with two variants.
///
/// Format 1 carries a `u16` payload, format 2 a `u32`. Dispatch is an
/// explicit match on the tag, total over every variant.
pub struct FormatSwitch;

impl MinSize for FormatSwitch {
    const MIN_SIZE: usize = 2;
}

impl Sanitize for FormatSwitch {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        Self::dispatch(c, pos)
    }
}

impl Dispatch<SanitizeContext> for FormatSwitch {
    fn dispatch(c: &mut SanitizeContext, pos: usize) -> bool {
        if !c.may_dispatch(pos) {
            return SanitizeContext::no_dispatch_return_value();
        }
        match c.read_at::<u16>(pos) {
            Some(1) => c.check_range(pos + 2, u16::RAW_BYTE_LEN),
            Some(2) => c.check_range(pos + 2, u32::RAW_BYTE_LEN),
            _ => SanitizeContext::no_dispatch_return_value(),
        }
    }
}

/// A table that is nothing but an array of offsets to `u16` sub-tables,
/// each measured from the table start.
pub struct OffsetList;

impl MinSize for OffsetList {
    const MIN_SIZE: usize = 2;
}

impl Sanitize for OffsetList {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        ArrayOf::<OffsetTo<U16>>::sanitize_with_base(c, pos, pos)
    }
}

/// A count followed by an offset to an unsized array of that many `u16`s.
pub struct CountedTable;

impl MinSize for CountedTable {
    const MIN_SIZE: usize = 4;
}

impl Sanitize for CountedTable {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        if !c.check_struct::<Self>(pos) {
            return false;
        }
        let Some(count) = c.read_at::<u16>(pos) else {
            return false;
        };
        OffsetTo::<UnsizedArrayOf<U16>>::sanitize_with_base_args(
            c,
            pos + 2,
            pos,
            &(count as usize),
        )
    }
}

/// Two offsets with an unsatisfiable repair: the first is optional, the
/// second is required and must be accompanied by a live first link.
///
/// Neutering the first link invalidates the second; neutering the second
/// never settles, because a null second link keeps asking to be "repaired".
/// Sanitization must detect the oscillation and reject the table.
pub struct DoubleLink;

impl MinSize for DoubleLink {
    const MIN_SIZE: usize = 4;
}

impl Sanitize for DoubleLink {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        if !c.check_struct::<Self>(pos) {
            return false;
        }
        // first link: optional, target must fit
        if !OffsetTo::<U16>::sanitize_with_base(c, pos, pos) {
            return false;
        }
        // second link: required, target must fit, first link must be live
        let second_ok = match c.read_at::<Offset16>(pos + 2).map(Offset::non_null) {
            Some(Some(delta)) => {
                c.check_range(pos, delta)
                    && U16::sanitize(c, pos + delta)
                    && c
                        .read_at::<Offset16>(pos)
                        .is_some_and(|first| !first.is_null())
            }
            _ => false,
        };
        second_ok || c.try_set(pos + 2, Offset16::NULL)
    }
}
