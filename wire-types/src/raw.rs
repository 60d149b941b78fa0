//! Raw big-endian bytes and the traits for decoding them.

/// A type that can be encoded to and decoded from big-endian bytes.
///
/// This is an internal trait describing how a value moves between its native
/// representation and the fixed-width byte array stored in a font file. You
/// do not normally implement it yourself; it backs the [`BigEndian`] wrapper
/// and everything built on top of it.
pub trait Scalar: Copy {
    /// The raw big-endian byte representation of this type.
    type Raw: Copy + AsRef<[u8]> + bytemuck::Pod;

    /// The size of the encoded value, in bytes.
    const RAW_BYTE_LEN: usize = std::mem::size_of::<Self::Raw>();

    /// Encode this value as big-endian bytes.
    fn to_raw(self) -> Self::Raw;

    /// Decode a value from big-endian bytes.
    fn from_raw(raw: Self::Raw) -> Self;

    /// Decode a value from the start of a byte slice.
    ///
    /// Returns `None` if the slice is shorter than [`Self::RAW_BYTE_LEN`].
    fn read(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..Self::RAW_BYTE_LEN)?;
        bytemuck::try_pod_read_unaligned(bytes).ok().map(Self::from_raw)
    }
}

/// A type with a size fully determined at compile time.
///
/// Implemented by scalars and by the fixed-width records composed of them.
pub trait FixedSize: Sized {
    /// The encoded size of this type, in bytes.
    const RAW_BYTE_LEN: usize;
}

impl<T: Scalar> FixedSize for BigEndian<T> {
    const RAW_BYTE_LEN: usize = std::mem::size_of::<T::Raw>();
}

/// An unaligned value, stored as raw big-endian bytes.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct BigEndian<T: Scalar>(T::Raw);

impl<T: Scalar> BigEndian<T> {
    /// Create a new wrapper, encoding the value.
    pub fn new(value: T) -> Self {
        Self(value.to_raw())
    }

    /// Decode a copy of the wrapped value.
    pub fn get(self) -> T {
        T::from_raw(self.0)
    }

    /// Set the value, overwriting the stored bytes.
    pub fn set(&mut self, value: T) {
        self.0 = value.to_raw();
    }

    /// The stored bytes, most significant first.
    pub fn be_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

// SAFETY: repr(transparent) over `T::Raw`, which is a `Pod` byte array.
unsafe impl<T: Scalar + 'static> bytemuck::Zeroable for BigEndian<T> {}
// SAFETY: as above; any bit pattern is a valid encoding.
unsafe impl<T: Scalar + 'static> bytemuck::Pod for BigEndian<T> {}

impl<T: Scalar> Default for BigEndian<T> {
    fn default() -> Self {
        Self(bytemuck::Zeroable::zeroed())
    }
}

impl<T: Scalar + std::fmt::Debug> std::fmt::Debug for BigEndian<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.get().fmt(f)
    }
}

impl<T: Scalar> PartialEq for BigEndian<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}

impl<T: Scalar> Eq for BigEndian<T> {}

impl<T: Scalar + PartialEq> PartialEq<T> for BigEndian<T> {
    fn eq(&self, other: &T) -> bool {
        self.get() == *other
    }
}

// Ordering compares the decoded values, so it is sign-correct for every
// scalar width, unlike a lexicographic comparison of the raw bytes.
impl<T: Scalar + Ord> Ord for BigEndian<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.get().cmp(&other.get())
    }
}

impl<T: Scalar + Ord> PartialOrd for BigEndian<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Scalar> From<T> for BigEndian<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

/// Shorthand for an unaligned big-endian `u8`.
pub type U8 = BigEndian<u8>;
/// Shorthand for an unaligned big-endian `i8`.
pub type I8 = BigEndian<i8>;
/// Shorthand for an unaligned big-endian `u16`.
pub type U16 = BigEndian<u16>;
/// Shorthand for an unaligned big-endian `i16`.
pub type I16 = BigEndian<i16>;
/// Shorthand for an unaligned big-endian 24-bit unsigned integer.
pub type U24 = BigEndian<crate::Uint24>;
/// Shorthand for an unaligned big-endian `u32`.
pub type U32 = BigEndian<u32>;
/// Shorthand for an unaligned big-endian `i32`.
pub type I32 = BigEndian<i32>;

/// An internal macro implementing `Scalar` for a newtype over another scalar.
#[macro_export]
macro_rules! newtype_scalar {
    ($name:ident, $raw:ty) => {
        impl crate::raw::Scalar for $name {
            type Raw = $raw;
            fn to_raw(self) -> $raw {
                crate::raw::Scalar::to_raw(self.0)
            }

            fn from_raw(raw: $raw) -> Self {
                Self(crate::raw::Scalar::from_raw(raw))
            }
        }
    };
}
