//! offset traversal, repair and resolution

use std::marker::PhantomData;

use types::{FixedSize, Offset16, Offset24, Offset32, Scalar, Uint24};

use crate::data::TableData;
use crate::null::null_bytes;
use crate::read::{MinSize, ReadError, TableRead};
use crate::sanitize::{Sanitize, SanitizeContext, SanitizeWithArgs, SanitizeWithBase};

/// Any offset type.
pub trait Offset: Scalar + Copy + 'static {
    /// The null offset of this width.
    const NULL: Self;

    /// The offset as a byte delta.
    fn to_usize(self) -> usize;

    /// The offset as a byte delta, or `None` for the null offset.
    fn non_null(self) -> Option<usize> {
        match self.to_usize() {
            0 => None,
            delta => Some(delta),
        }
    }

    /// Encode a byte delta, or `None` if it does not fit this width.
    fn from_usize(delta: usize) -> Option<Self>;
}

impl Offset for Offset16 {
    const NULL: Self = Offset16::NULL;

    fn to_usize(self) -> usize {
        self.to_u32() as usize
    }

    fn from_usize(delta: usize) -> Option<Self> {
        u16::try_from(delta).ok().map(Offset16::new)
    }
}

impl Offset for Offset24 {
    const NULL: Self = Offset24::NULL;

    fn to_usize(self) -> usize {
        self.to_u32() as usize
    }

    fn from_usize(delta: usize) -> Option<Self> {
        let delta = u32::try_from(delta).ok()?;
        Uint24::checked_new(delta).map(|_| Offset24::new(delta))
    }
}

impl Offset for Offset32 {
    const NULL: Self = Offset32::NULL;

    fn to_usize(self) -> usize {
        self.to_u32() as usize
    }

    fn from_usize(delta: usize) -> Option<Self> {
        u32::try_from(delta).ok().map(Offset32::new)
    }
}

/// Schema marker for an offset field pointing at a table of type `T`.
///
/// The field holds a `W`-wide unsigned byte delta, measured from a base
/// position stated by the enclosing table. Zero means "no table".
///
/// During sanitization, a non-null offset whose target does not hold up is
/// *neutered* — overwritten with zero — rather than failing the parent:
/// broken sub-tables are severed, not fatal.
pub struct OffsetTo<T, W = Offset16> {
    _marker: PhantomData<(fn() -> T, W)>,
}

impl<T, W: Offset> MinSize for OffsetTo<T, W> {
    const MIN_SIZE: usize = W::RAW_BYTE_LEN;
}

impl<T, W: Offset> FixedSize for OffsetTo<T, W> {
    const RAW_BYTE_LEN: usize = W::RAW_BYTE_LEN;
}

impl<T: Sanitize, W: Offset> SanitizeWithBase for OffsetTo<T, W> {
    fn sanitize_with_base(c: &mut SanitizeContext, pos: usize, base: usize) -> bool {
        if !c.check_range(pos, W::RAW_BYTE_LEN) {
            return false;
        }
        let Some(offset) = c.read_at::<W>(pos) else {
            return false;
        };
        let Some(delta) = offset.non_null() else {
            return true;
        };
        let target_ok = c.check_range(base, delta) && T::sanitize(c, base + delta);
        target_ok || c.try_set(pos, W::NULL)
    }
}

impl<T, W: Offset> OffsetTo<T, W> {
    /// Like [`SanitizeWithBase::sanitize_with_base`], forwarding external
    /// state to the pointee.
    pub fn sanitize_with_base_args(
        c: &mut SanitizeContext,
        pos: usize,
        base: usize,
        args: &T::Args,
    ) -> bool
    where
        T: SanitizeWithArgs,
    {
        if !c.check_range(pos, W::RAW_BYTE_LEN) {
            return false;
        }
        let Some(offset) = c.read_at::<W>(pos) else {
            return false;
        };
        let Some(delta) = offset.non_null() else {
            return true;
        };
        let target_ok = c.check_range(base, delta) && T::sanitize_with_args(c, base + delta, args);
        target_ok || c.try_set(pos, W::NULL)
    }
}

/// A helper trait providing `resolve` methods for offset values.
pub trait ResolveOffset: Offset {
    /// The view at this offset from the start of `data`.
    ///
    /// A null offset is an error here; use [`resolve_or_null`] where a
    /// missing table should read as an empty one.
    ///
    /// [`resolve_or_null`]: ResolveOffset::resolve_or_null
    fn resolve<'a, T: TableRead<'a>>(self, data: TableData<'a>) -> Result<T, ReadError> {
        self.non_null()
            .ok_or(ReadError::NullOffset)
            .and_then(|delta| data.split_off(delta).ok_or(ReadError::OutOfBounds))
            .and_then(T::read)
    }

    /// The view at this offset, with a null offset resolving to the shared
    /// zeroed region, so the result reads as an empty table.
    fn resolve_or_null<'a, T: TableRead<'a>>(self, data: TableData<'a>) -> Result<T, ReadError> {
        match self.non_null() {
            None => T::read(TableData::new(null_bytes())),
            Some(delta) => data
                .split_off(delta)
                .ok_or(ReadError::OutOfBounds)
                .and_then(T::read),
        }
    }
}

impl<O: Offset> ResolveOffset for O {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        assert_eq!(<OffsetTo<u8> as MinSize>::MIN_SIZE, 2);
        assert_eq!(<OffsetTo<u8, Offset24> as MinSize>::MIN_SIZE, 3);
        assert_eq!(<OffsetTo<u8, Offset32> as MinSize>::MIN_SIZE, 4);
    }

    #[test]
    fn from_usize_checks_range() {
        assert_eq!(Offset16::from_usize(0xFFFF), Some(Offset16::new(0xFFFF)));
        assert_eq!(Offset16::from_usize(0x10000), None);
        assert_eq!(Offset24::from_usize(0xFFFFFF), Some(Offset24::new(0xFFFFFF)));
        assert_eq!(Offset24::from_usize(0x1000000), None);
        assert!(Offset32::from_usize(usize::MAX).is_none());
    }

    #[test]
    fn null_resolution() {
        let data = TableData::new(&[0xAA; 8]);
        let null = Offset16::NULL;
        assert_eq!(
            null.resolve::<TableData>(data).map(|_| ()),
            Err(ReadError::NullOffset)
        );
        let sentinel = null.resolve_or_null::<TableData>(data).unwrap();
        assert!(sentinel.as_bytes().iter().all(|&b| b == 0));
    }
}
