//! offsets to tables
//!
//! An offset is an unsigned byte delta, measured from some base position
//! stated by the enclosing table. The zero offset is reserved to mean
//! "no table".

use crate::Uint24;

macro_rules! impl_offset {
    ($name:ident, $bits:literal, $raw:ty) => {
        #[doc = concat!("A ", stringify!($bits), "-bit offset to a table.")]
        ///
        /// A value of zero is the null offset, pointing at nothing.
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name($raw);

        impl $name {
            /// The null offset.
            pub const NULL: Self = Self::new(0);

            /// Create a new offset.
            pub const fn new(raw: $raw) -> Self {
                Self(raw)
            }

            /// The raw integer value of this offset.
            pub const fn to_u32(self) -> u32 {
                self.0 as u32
            }

            /// `true` if this is the null offset.
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        crate::newtype_scalar!($name, [u8; $bits / 8]);
    };
}

impl_offset!(Offset16, 16, u16);
impl_offset!(Offset32, 32, u32);

/// A 24-bit offset to a table.
///
/// A value of zero is the null offset, pointing at nothing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Offset24(Uint24);

impl Offset24 {
    /// The null offset.
    pub const NULL: Self = Self(Uint24::MIN);

    /// Create a new offset.
    pub const fn new(raw: u32) -> Self {
        Self(Uint24::new(raw))
    }

    /// The raw integer value of this offset.
    pub const fn to_u32(self) -> u32 {
        self.0.to_u32()
    }

    /// `true` if this is the null offset.
    pub const fn is_null(self) -> bool {
        self.0.to_u32() == 0
    }
}

crate::newtype_scalar!(Offset24, [u8; 3]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scalar;

    #[test]
    fn null_and_value() {
        assert!(Offset16::NULL.is_null());
        assert!(!Offset16::new(2).is_null());
        assert_eq!(Offset32::new(0xDEAD).to_u32(), 0xDEAD);
        assert_eq!(Offset24::new(0x010203).to_raw(), [1, 2, 3]);
    }
}
