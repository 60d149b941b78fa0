//! the array families used by table definitions
//!
//! Each family exists twice: as a zero-sized *schema marker* describing the
//! on-disk layout to the sanitizer, and as a borrowing *view* for reading
//! data that has already been published. Out-of-range indexing through a
//! view does not fail; it yields the shared zeroed instance of the element
//! type, so readers never have to special-case damage.

use std::cmp::Ordering;
use std::marker::PhantomData;

use types::{BigEndian, FixedSize, Scalar};

use crate::data::TableData;
use crate::null::null_of;
use crate::read::{MinSize, ReadError, TableRead};
use crate::sanitize::{Sanitize, SanitizeContext, SanitizeWithArgs, SanitizeWithBase};
use crate::serialize::{Placed, SerializeContext};
use crate::OffsetTo;

/// A length prefix: a scalar that can index the elements following it.
pub trait LenPrefix: Scalar + Into<u32> + TryFrom<usize> {}

impl LenPrefix for u8 {}
impl LenPrefix for u16 {}
impl LenPrefix for u32 {}

fn read_len<L: LenPrefix>(c: &SanitizeContext, pos: usize) -> Option<usize> {
    let len: u32 = c.read_at::<L>(pos)?.into();
    Some(len as usize)
}

/// Schema marker for an array prefixed by its element count.
pub struct ArrayOf<T, L = u16> {
    _marker: PhantomData<(fn() -> T, L)>,
}

/// An [`ArrayOf`] with a 32-bit length prefix.
pub type LongArrayOf<T> = ArrayOf<T, u32>;

/// An [`ArrayOf`] whose elements are offsets to tables of type `T`.
pub type OffsetArrayOf<T, W = types::Offset16> = ArrayOf<OffsetTo<T, W>, u16>;

impl<T, L: LenPrefix> MinSize for ArrayOf<T, L> {
    const MIN_SIZE: usize = L::RAW_BYTE_LEN;
}

impl<T: Sanitize + FixedSize, L: LenPrefix> Sanitize for ArrayOf<T, L> {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        if !c.check_struct::<Self>(pos) {
            return false;
        }
        let Some(len) = read_len::<L>(c, pos) else {
            return false;
        };
        let data = pos + L::RAW_BYTE_LEN;
        if !c.check_array(data, T::RAW_BYTE_LEN, len) {
            return false;
        }
        if T::SHALLOW {
            // the aggregate bounds check covered every element
            return true;
        }
        (0..len).all(|i| T::sanitize(c, data + i * T::RAW_BYTE_LEN))
    }
}

impl<T: SanitizeWithBase + FixedSize, L: LenPrefix> SanitizeWithBase for ArrayOf<T, L> {
    fn sanitize_with_base(c: &mut SanitizeContext, pos: usize, base: usize) -> bool {
        if !c.check_struct::<Self>(pos) {
            return false;
        }
        let Some(len) = read_len::<L>(c, pos) else {
            return false;
        };
        let data = pos + L::RAW_BYTE_LEN;
        if !c.check_array(data, T::RAW_BYTE_LEN, len) {
            return false;
        }
        (0..len).all(|i| T::sanitize_with_base(c, data + i * T::RAW_BYTE_LEN, base))
    }
}

impl<T, L> ArrayOf<T, L>
where
    T: bytemuck::NoUninit + FixedSize,
    L: LenPrefix,
{
    /// Write `items` as a length-prefixed array at the serializer's head.
    ///
    /// Returns `None` if the count does not fit the prefix or the buffer
    /// runs out of room.
    pub fn serialize(s: &mut SerializeContext, items: &[T]) -> Option<Placed<Self>> {
        let len = L::try_from(items.len()).ok()?;
        let placed = s.allocate_size::<Self>(L::RAW_BYTE_LEN)?;
        s.write_scalar_at(placed.position(), len);
        for item in items {
            s.embed(item)?;
        }
        Some(placed)
    }
}

/// Schema marker for an array whose count includes an implicit first
/// element that is not stored; indexing starts at 1.
pub struct HeadlessArrayOf<T, L = u16> {
    _marker: PhantomData<(fn() -> T, L)>,
}

impl<T, L: LenPrefix> MinSize for HeadlessArrayOf<T, L> {
    const MIN_SIZE: usize = L::RAW_BYTE_LEN;
}

impl<T: Sanitize + FixedSize, L: LenPrefix> Sanitize for HeadlessArrayOf<T, L> {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        if !c.check_struct::<Self>(pos) {
            return false;
        }
        let Some(len) = read_len::<L>(c, pos) else {
            return false;
        };
        let stored = len.saturating_sub(1);
        let data = pos + L::RAW_BYTE_LEN;
        if !c.check_array(data, T::RAW_BYTE_LEN, stored) {
            return false;
        }
        if T::SHALLOW {
            return true;
        }
        (0..stored).all(|i| T::sanitize(c, data + i * T::RAW_BYTE_LEN))
    }
}

/// Schema marker for an array with no length prefix.
///
/// The element count lives elsewhere in the enclosing table and is passed
/// in as external state.
pub struct UnsizedArrayOf<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> MinSize for UnsizedArrayOf<T> {
    const MIN_SIZE: usize = 0;
}

impl<T: Sanitize + FixedSize> SanitizeWithArgs for UnsizedArrayOf<T> {
    type Args = usize;

    fn sanitize_with_args(c: &mut SanitizeContext, pos: usize, len: &usize) -> bool {
        if !c.check_array(pos, T::RAW_BYTE_LEN, *len) {
            return false;
        }
        if T::SHALLOW {
            return true;
        }
        (0..*len).all(|i| T::sanitize(c, pos + i * T::RAW_BYTE_LEN))
    }
}

/// Schema marker for a length-prefixed array sorted by its element order.
///
/// Layout and validation are identical to [`ArrayOf`]; the sort order is a
/// promise made by the format, consumed by the binary-searching view.
pub struct SortedArrayOf<T, L = u16> {
    _marker: PhantomData<(fn() -> T, L)>,
}

impl<T, L: LenPrefix> MinSize for SortedArrayOf<T, L> {
    const MIN_SIZE: usize = L::RAW_BYTE_LEN;
}

impl<T: Sanitize + FixedSize, L: LenPrefix> Sanitize for SortedArrayOf<T, L> {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        ArrayOf::<T, L>::sanitize(c, pos)
    }
}

/// The header of a binary-search array.
///
/// Alongside the element count, the format stores three values derived
/// from it that a searcher may use to avoid recomputing the split points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct BinSearchHeader {
    len: BigEndian<u16>,
    search_range: BigEndian<u16>,
    entry_selector: BigEndian<u16>,
    range_shift: BigEndian<u16>,
}

impl BinSearchHeader {
    /// Create a header for `len` elements, deriving the search fields.
    pub fn new(len: u16) -> Self {
        let bit_storage = 16 - (len as u32).leading_zeros().saturating_sub(16);
        let entry_selector = bit_storage.max(1) - 1;
        let search_range = 16u32 << entry_selector;
        let range_shift = (16 * len as u32).saturating_sub(search_range);
        BinSearchHeader {
            len: (len).into(),
            search_range: (search_range as u16).into(),
            entry_selector: (entry_selector as u16).into(),
            range_shift: (range_shift as u16).into(),
        }
    }

    /// The element count.
    pub fn len(&self) -> u16 {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn search_range(&self) -> u16 {
        self.search_range.get()
    }

    pub fn entry_selector(&self) -> u16 {
        self.entry_selector.get()
    }

    pub fn range_shift(&self) -> u16 {
        self.range_shift.get()
    }
}

impl MinSize for BinSearchHeader {
    const MIN_SIZE: usize = 8;
}

impl FixedSize for BinSearchHeader {
    const RAW_BYTE_LEN: usize = 8;
}

impl Sanitize for BinSearchHeader {
    const SHALLOW: bool = true;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        c.check_struct::<Self>(pos)
    }
}

/// Schema marker for a sorted array prefixed by a [`BinSearchHeader`].
pub struct BinSearchArrayOf<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> MinSize for BinSearchArrayOf<T> {
    const MIN_SIZE: usize = BinSearchHeader::MIN_SIZE;
}

impl<T: Sanitize + FixedSize> Sanitize for BinSearchArrayOf<T> {
    const SHALLOW: bool = false;

    fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
        if !BinSearchHeader::sanitize(c, pos) {
            return false;
        }
        let Some(len) = c.read_at::<u16>(pos) else {
            return false;
        };
        let data = pos + BinSearchHeader::RAW_BYTE_LEN;
        if !c.check_array(data, T::RAW_BYTE_LEN, len as usize) {
            return false;
        }
        if T::SHALLOW {
            return true;
        }
        (0..len as usize).all(|i| T::sanitize(c, data + i * T::RAW_BYTE_LEN))
    }
}

/// A view of a length-prefixed array.
///
/// `R` is the stored element representation: a [`BigEndian`] wrapper or an
/// align-1 record composed of them.
#[derive(Clone, Copy)]
pub struct Array<'a, R, L = u16> {
    items: &'a [R],
    _marker: PhantomData<L>,
}

impl<'a, R: bytemuck::AnyBitPattern, L: LenPrefix> TableRead<'a> for Array<'a, R, L> {
    fn read(data: TableData<'a>) -> Result<Self, ReadError> {
        let len: u32 = data.read_at::<L>(0)?.into();
        let start = L::RAW_BYTE_LEN;
        let byte_len = (len as usize)
            .checked_mul(std::mem::size_of::<R>())
            .ok_or(ReadError::OutOfBounds)?;
        let items = data.read_array(start..start + byte_len)?;
        Ok(Array {
            items,
            _marker: PhantomData,
        })
    }
}

impl<'a, R: bytemuck::AnyBitPattern, L> Array<'a, R, L> {
    /// The number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The element at `index`, or the shared zeroed element if out of range.
    pub fn get(&self, index: usize) -> &'a R {
        self.items.get(index).unwrap_or_else(|| null_of())
    }

    /// An iterator over the stored elements.
    pub fn iter(&self) -> std::slice::Iter<'a, R> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &'a [R] {
        self.items
    }
}

impl<'a, T: Scalar + 'static, L> Array<'a, BigEndian<T>, L> {
    /// The decoded value at `index`, or zero if out of range.
    pub fn value(&self, index: usize) -> T {
        self.get(index).get()
    }
}

/// A view of a headless array. Index 0 is the implicit missing element.
#[derive(Clone, Copy)]
pub struct HeadlessArray<'a, R, L = u16> {
    len: usize,
    items: &'a [R],
    _marker: PhantomData<L>,
}

impl<'a, R: bytemuck::AnyBitPattern, L: LenPrefix> TableRead<'a> for HeadlessArray<'a, R, L> {
    fn read(data: TableData<'a>) -> Result<Self, ReadError> {
        let len: u32 = data.read_at::<L>(0)?.into();
        let len = len as usize;
        let start = L::RAW_BYTE_LEN;
        let byte_len = len
            .saturating_sub(1)
            .checked_mul(std::mem::size_of::<R>())
            .ok_or(ReadError::OutOfBounds)?;
        let items = data.read_array(start..start + byte_len)?;
        Ok(HeadlessArray {
            len,
            items,
            _marker: PhantomData,
        })
    }
}

impl<'a, R: bytemuck::AnyBitPattern, L> HeadlessArray<'a, R, L> {
    /// The logical element count, including the unstored element 0.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The element at `index`.
    ///
    /// Index 0 and out-of-range indices yield the shared zeroed element.
    pub fn get(&self, index: usize) -> &'a R {
        if index == 0 {
            return null_of();
        }
        self.items.get(index - 1).unwrap_or_else(|| null_of())
    }
}

/// A view of an array with an externally supplied length.
#[derive(Clone, Copy)]
pub struct UnsizedArray<'a, R> {
    items: &'a [R],
}

impl<'a, R: bytemuck::AnyBitPattern> UnsizedArray<'a, R> {
    /// Read `len` elements from the start of `data`.
    pub fn read(data: TableData<'a>, len: usize) -> Result<Self, ReadError> {
        let byte_len = len
            .checked_mul(std::mem::size_of::<R>())
            .ok_or(ReadError::OutOfBounds)?;
        let items = data.read_array(0..byte_len)?;
        Ok(UnsizedArray { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The element at `index`, or the shared zeroed element if out of range.
    pub fn get(&self, index: usize) -> &'a R {
        self.items.get(index).unwrap_or_else(|| null_of())
    }
}

/// A view of a sorted, length-prefixed array, supporting binary search.
#[derive(Clone, Copy)]
pub struct SortedArray<'a, R, L = u16> {
    inner: Array<'a, R, L>,
}

impl<'a, R: bytemuck::AnyBitPattern, L: LenPrefix> TableRead<'a> for SortedArray<'a, R, L> {
    fn read(data: TableData<'a>) -> Result<Self, ReadError> {
        Array::read(data).map(|inner| SortedArray { inner })
    }
}

impl<'a, R: bytemuck::AnyBitPattern, L> SortedArray<'a, R, L> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, index: usize) -> &'a R {
        self.inner.get(index)
    }

    /// Binary search with a comparator over the stored elements.
    ///
    /// `compare` reports the ordering of its argument relative to the
    /// needle. Returns the matching index, or `None` if absent.
    pub fn binary_search_by(&self, compare: impl FnMut(&R) -> Ordering) -> Option<usize> {
        self.inner.items.binary_search_by(compare).ok()
    }
}

impl<'a, T: Scalar + Ord + 'static, L> SortedArray<'a, BigEndian<T>, L> {
    /// Binary search for a decoded value.
    pub fn binary_search(&self, needle: T) -> Option<usize> {
        self.binary_search_by(|probe| probe.get().cmp(&needle))
    }
}

/// A view of a binary-search array: a [`BinSearchHeader`] then sorted
/// elements.
#[derive(Clone, Copy)]
pub struct BinSearchArray<'a, R> {
    header: &'a BinSearchHeader,
    items: &'a [R],
}

impl<'a, R: bytemuck::AnyBitPattern> TableRead<'a> for BinSearchArray<'a, R> {
    fn read(data: TableData<'a>) -> Result<Self, ReadError> {
        let header: &BinSearchHeader = data.read_ref_at(0)?;
        let len = header.len() as usize;
        let start = BinSearchHeader::RAW_BYTE_LEN;
        let byte_len = len
            .checked_mul(std::mem::size_of::<R>())
            .ok_or(ReadError::OutOfBounds)?;
        let items = data.read_array(start..start + byte_len)?;
        Ok(BinSearchArray { header, items })
    }
}

impl<'a, R: bytemuck::AnyBitPattern> BinSearchArray<'a, R> {
    pub fn header(&self) -> &'a BinSearchHeader {
        self.header
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> &'a R {
        self.items.get(index).unwrap_or_else(|| null_of())
    }

    /// Binary search with a comparator over the stored elements.
    pub fn binary_search_by(&self, compare: impl FnMut(&R) -> Ordering) -> Option<usize> {
        self.items.binary_search_by(compare).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::Blob;
    use crate::test_helpers::BeBuffer;
    use crate::SanitizeContext;
    use types::U16;

    fn sanitize_ok<T: Sanitize>(buf: &BeBuffer) -> bool {
        let out = SanitizeContext::new().sanitize_blob::<T>(buf.blob());
        !out.ptr_eq(&Blob::empty())
    }

    #[test]
    fn minimal_valid_array() {
        // a 12-byte blob holding a single-element array
        let buf = BeBuffer::new().push(1u16).push(0x1234u16).extend([0u8; 8]);
        assert!(sanitize_ok::<ArrayOf<U16>>(&buf));

        let arr: Array<U16> = Array::read(TableData::new(buf.as_slice())).unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr.value(0), 0x1234);
        // past the end: the shared zeroed element
        assert_eq!(arr.value(1), 0);
    }

    #[test]
    fn out_of_range_length() {
        let buf = BeBuffer::new().push(0xFFFFu16).push(0u16);
        assert!(!sanitize_ok::<ArrayOf<U16>>(&buf));
    }

    #[test]
    fn huge_length_fails_before_elements() {
        // 64-byte records and a maximal length: rejected at the aggregate
        // check, without reading past the length field
        struct BigRecord;
        impl MinSize for BigRecord {
            const MIN_SIZE: usize = 64;
        }
        impl FixedSize for BigRecord {
            const RAW_BYTE_LEN: usize = 64;
        }
        impl Sanitize for BigRecord {
            const SHALLOW: bool = true;
            fn sanitize(c: &mut SanitizeContext, pos: usize) -> bool {
                c.check_struct::<Self>(pos)
            }
        }
        let buf = BeBuffer::new().push(u32::MAX).extend([0u8; 16]);
        assert!(!sanitize_ok::<LongArrayOf<BigRecord>>(&buf));
    }

    #[test]
    fn headless_count_includes_missing_first() {
        // len 3 stores two elements
        let buf = BeBuffer::new().push(3u16).extend([10u16, 20]);
        assert!(sanitize_ok::<HeadlessArrayOf<U16>>(&buf));
        let arr: HeadlessArray<U16> =
            HeadlessArray::read(TableData::new(buf.as_slice())).unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get(0).get(), 0);
        assert_eq!(arr.get(1).get(), 10);
        assert_eq!(arr.get(2).get(), 20);
        assert_eq!(arr.get(3).get(), 0);
    }

    #[test]
    fn unsized_needs_external_len() {
        let buf = BeBuffer::new().extend([1u16, 2, 3]);
        let data = TableData::new(buf.as_slice());
        let arr = UnsizedArray::<U16>::read(data, 3).unwrap();
        assert_eq!(arr.get(2).get(), 3);
        assert!(UnsizedArray::<U16>::read(data, 4).is_err());
    }

    #[test]
    fn sorted_binary_search() {
        let buf = BeBuffer::new().push(5u16).extend([2u16, 3, 5, 8, 13]);
        let arr: SortedArray<U16> =
            SortedArray::read(TableData::new(buf.as_slice())).unwrap();
        assert_eq!(arr.binary_search(2), Some(0));
        assert_eq!(arr.binary_search(8), Some(3));
        assert_eq!(arr.binary_search(4), None);
        assert_eq!(arr.binary_search(14), None);
    }

    #[test]
    fn offset_array_resolves_against_table_start() {
        use crate::test_tables::OffsetList;
        // len 2, offsets 6 and 8, two u16 sub-tables
        let buf = BeBuffer::new()
            .push(2u16)
            .push(6u16)
            .push(8u16)
            .extend([0xAAAAu16, 0xBBBB]);
        assert!(sanitize_ok::<OffsetList>(&buf));

        // one broken offset severs only its own sub-table
        let buf = BeBuffer::new()
            .push(2u16)
            .push(6u16)
            .push(0xFFu16)
            .extend([0xAAAAu16, 0xBBBB]);
        let out = SanitizeContext::new().sanitize_blob::<OffsetList>(buf.blob());
        assert_eq!(out.bytes(), [0, 2, 0, 6, 0, 0, 0xAA, 0xAA, 0xBB, 0xBB]);
    }

    #[test]
    fn unsized_array_behind_offset_uses_external_count() {
        use crate::test_tables::CountedTable;
        // count 3, offset 4, then the three elements
        let buf = BeBuffer::new()
            .push(3u16)
            .push(4u16)
            .extend([1u16, 2, 3]);
        assert!(sanitize_ok::<CountedTable>(&buf));

        // count exceeds the data: the offset is severed, the table survives
        let buf = BeBuffer::new().push(9u16).push(4u16).extend([1u16, 2, 3]);
        let out = SanitizeContext::new().sanitize_blob::<CountedTable>(buf.blob());
        assert_eq!(out.bytes(), [0, 9, 0, 0, 0, 1, 0, 2, 0, 3]);
    }

    #[test]
    fn bin_search_header_formulas() {
        for (len, search_range, entry_selector, range_shift) in [
            (1u16, 16u16, 0u16, 0u16),
            (2, 32, 1, 0),
            (3, 32, 1, 16),
            (4, 64, 2, 0),
            (39, 512, 5, 112),
            (1000, 8192, 9, 7808),
        ] {
            let header = BinSearchHeader::new(len);
            assert_eq!(header.len(), len);
            assert_eq!(header.search_range(), search_range, "len {len}");
            assert_eq!(header.entry_selector(), entry_selector, "len {len}");
            assert_eq!(header.range_shift(), range_shift, "len {len}");
        }
        // zero-length arrays still get a well-formed header
        assert_eq!(BinSearchHeader::new(0).search_range(), 16);
    }

    #[test]
    fn bin_search_array_round_trip() {
        let header = BinSearchHeader::new(3);
        let buf = BeBuffer::new()
            .push(header.len())
            .push(header.search_range())
            .push(header.entry_selector())
            .push(header.range_shift())
            .extend([7u16, 11, 13]);
        assert!(sanitize_ok::<BinSearchArrayOf<U16>>(&buf));
        let arr: BinSearchArray<U16> =
            BinSearchArray::read(TableData::new(buf.as_slice())).unwrap();
        assert_eq!(arr.header().entry_selector(), 1);
        assert_eq!(
            arr.binary_search_by(|probe| probe.get().cmp(&11)),
            Some(1)
        );
        assert_eq!(arr.get(5).get(), 0);
    }
}
