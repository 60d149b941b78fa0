//! an append-only writer for building tables in place

use std::marker::PhantomData;

use types::Scalar;

use crate::offset::Offset;
use crate::read::MinSize;

/// A typed location within a serialization buffer.
///
/// Holding a `Placed<T>` means a value of type `T` was (or is being) laid
/// out at that position; it is how later writes refer back to earlier ones
/// without borrowing the buffer.
pub struct Placed<T> {
    pos: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Placed<T> {
    fn new(pos: usize) -> Self {
        Placed {
            pos,
            _marker: PhantomData,
        }
    }

    /// The byte position within the buffer.
    pub fn position(self) -> usize {
        self.pos
    }
}

impl<T> Clone for Placed<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Placed<T> {}

/// State for serializing a table into a caller-provided buffer.
///
/// Writes are append-only: allocation hands out zeroed space at the head
/// and advances it. Running out of room sets a sticky flag; every
/// subsequent allocation fails cleanly and earlier writes are left intact,
/// so the caller checks once, at the end.
pub struct SerializeContext<'a> {
    buf: &'a mut [u8],
    head: usize,
    ran_out_of_room: bool,
}

impl<'a> SerializeContext<'a> {
    /// Create a context writing into `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        SerializeContext {
            buf,
            head: 0,
            ran_out_of_room: false,
        }
    }

    /// The current head position.
    pub fn head(&self) -> usize {
        self.head
    }

    /// `true` once any allocation has failed.
    pub fn ran_out_of_room(&self) -> bool {
        self.ran_out_of_room
    }

    /// Begin serializing a table of type `T` at the start of the buffer.
    pub fn start_serialize<T>(&mut self) -> Placed<T> {
        log::trace!("serialize start: {} bytes", self.buf.len());
        self.start_embed()
    }

    /// The position where the next value will land, typed as `T`.
    ///
    /// Does not advance the head.
    pub fn start_embed<T>(&self) -> Placed<T> {
        Placed::new(self.head)
    }

    /// Allocate `size` zeroed bytes at the head.
    ///
    /// Returns `None` (and sets the sticky flag) if the buffer cannot hold
    /// them.
    pub fn allocate_size<T>(&mut self, size: usize) -> Option<Placed<T>> {
        if self.ran_out_of_room || size > self.buf.len() - self.head {
            self.ran_out_of_room = true;
            return None;
        }
        self.buf[self.head..self.head + size].fill(0);
        let placed = Placed::new(self.head);
        self.head += size;
        Some(placed)
    }

    /// Allocate room for the fixed prefix of `T`.
    pub fn allocate_min<T: MinSize>(&mut self) -> Option<Placed<T>> {
        self.allocate_size(T::MIN_SIZE)
    }

    /// Copy a plain-old-data value to the head.
    pub fn embed<T: bytemuck::NoUninit>(&mut self, obj: &T) -> Option<Placed<T>> {
        let bytes = bytemuck::bytes_of(obj);
        let placed = self.allocate_size::<T>(bytes.len())?;
        self.buf[placed.pos..placed.pos + bytes.len()].copy_from_slice(bytes);
        Some(placed)
    }

    /// Encode a scalar at the head.
    pub fn embed_scalar<T: Scalar>(&mut self, value: T) -> Option<Placed<types::BigEndian<T>>> {
        let placed = self.allocate_size(T::RAW_BYTE_LEN)?;
        self.write_scalar_at(placed.pos, value);
        Some(placed)
    }

    /// Copy raw bytes to the head.
    pub fn embed_bytes(&mut self, bytes: &[u8]) -> Option<usize> {
        let placed = self.allocate_size::<u8>(bytes.len())?;
        self.buf[placed.pos..placed.pos + bytes.len()].copy_from_slice(bytes);
        Some(placed.pos)
    }

    /// Grow the buffer so it covers the fixed prefix of the value at
    /// `placed`.
    ///
    /// The value must lie within the written region, with its required end
    /// at or past the head: extension continues a value mid-construction,
    /// it cannot reach back over later ones.
    pub fn extend_min<T: MinSize>(&mut self, placed: Placed<T>) -> bool {
        self.extend_to(placed, T::MIN_SIZE)
    }

    /// Grow the buffer so it covers `size` bytes of the value at `placed`.
    pub fn extend_to<T>(&mut self, placed: Placed<T>, size: usize) -> bool {
        let required_end = placed.pos + size;
        debug_assert!(placed.pos <= self.head && required_end >= self.head);
        if required_end <= self.head {
            return true;
        }
        self.allocate_size::<T>(required_end - self.head).is_some()
    }

    /// Move the head back to `new_head`, discarding what followed it.
    ///
    /// # Panics
    ///
    /// Panics if `new_head` is past the current head.
    pub fn truncate(&mut self, new_head: usize) {
        assert!(new_head <= self.head);
        self.head = new_head;
    }

    /// Write an offset field as the delta from `base` to the current head.
    ///
    /// Call this immediately before embedding the sub-table the offset
    /// should point at: the head *is* the pointee position. Returns the
    /// pointee position, or `None` if the delta does not fit the offset
    /// width.
    pub fn serialize_offset<W: Offset>(
        &mut self,
        field: Placed<types::BigEndian<W>>,
        base: usize,
    ) -> Option<usize> {
        debug_assert!(base <= self.head);
        let offset = W::from_usize(self.head - base)?;
        if !self.write_scalar_at(field.pos, offset) {
            return None;
        }
        Some(self.head)
    }

    /// Encode a scalar at an already-allocated position.
    ///
    /// Returns `false` if the position is not within the written region.
    pub fn write_scalar_at<T: Scalar>(&mut self, pos: usize, value: T) -> bool {
        let raw = value.to_raw();
        let Some(end) = pos.checked_add(T::RAW_BYTE_LEN) else {
            return false;
        };
        if end > self.head {
            return false;
        }
        self.buf[pos..end].copy_from_slice(raw.as_ref());
        true
    }

    /// Duplicate the written region onto the heap.
    pub fn copy(&self) -> Vec<u8> {
        self.buf[..self.head].to_vec()
    }

    /// Finish serializing.
    ///
    /// Returns `true` if everything fit; `false` if any allocation failed.
    pub fn end_serialize(self) -> bool {
        log::trace!(
            "serialize end: {} bytes written{}",
            self.head,
            if self.ran_out_of_room {
                "; ran out of room"
            } else {
                ""
            }
        );
        !self.ran_out_of_room
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Array, ArrayOf};
    use crate::data::TableData;
    use crate::read::TableRead;
    use types::{Offset16, U16};

    #[test]
    fn allocation_advances_and_zeroes() {
        let mut buf = [0xAAu8; 8];
        let mut s = SerializeContext::new(&mut buf);
        let a = s.allocate_size::<u8>(3).unwrap();
        let b = s.allocate_size::<u8>(2).unwrap();
        assert_eq!(a.position(), 0);
        assert_eq!(b.position(), 3);
        assert_eq!(s.head(), 5);
        assert!(s.end_serialize());
        assert_eq!(buf, [0, 0, 0, 0, 0, 0xAA, 0xAA, 0xAA]);
    }

    #[test]
    fn out_of_room_is_sticky_and_nondestructive() {
        let mut buf = [0u8; 4];
        let mut s = SerializeContext::new(&mut buf);
        assert!(s.embed_scalar(0x1234u16).is_some());
        assert!(s.embed_scalar(0xBEEF_CAFEu32).is_none());
        // a write that would fit is still refused after overflow
        assert!(s.embed_scalar(0u8).is_none());
        assert_eq!(s.head(), 2);
        assert!(!s.end_serialize());
        assert_eq!(buf, [0x12, 0x34, 0, 0]);
    }

    #[test]
    fn embed_round_trips_pod() {
        use crate::array::BinSearchHeader;
        let mut buf = [0u8; 16];
        let mut s = SerializeContext::new(&mut buf);
        let header = BinSearchHeader::new(3);
        let placed = s.embed(&header).unwrap();
        let read_back: &BinSearchHeader = TableData::new(&buf)
            .read_ref_at(placed.position())
            .unwrap();
        assert_eq!(*read_back, BinSearchHeader::new(3));
    }

    #[test]
    fn truncate_moves_head_back() {
        let mut buf = [0u8; 8];
        let mut s = SerializeContext::new(&mut buf);
        s.embed_scalar(1u32).unwrap();
        let mark = s.head();
        s.embed_scalar(2u32).unwrap();
        s.truncate(mark);
        assert_eq!(s.head(), 4);
        assert_eq!(s.copy(), [0, 0, 0, 1]);
    }

    #[test]
    fn extend_grows_a_placed_value() {
        let mut buf = [0u8; 8];
        let mut s = SerializeContext::new(&mut buf);
        let arr: Placed<ArrayOf<U16>> = s.start_embed();
        assert!(s.extend_min(arr));
        assert_eq!(s.head(), 2);
        assert!(s.extend_to(arr, 6));
        assert_eq!(s.head(), 6);
    }

    #[test]
    fn offset_patch_points_at_child() {
        // a 4-byte header whose second field is an Offset16, then a child
        // table embedded at the head
        let mut buf = [0u8; 256];
        let mut s = SerializeContext::new(&mut buf);
        let header: Placed<()> = s.start_serialize();
        s.embed_scalar(0x0001u16).unwrap();
        let off_field = s.embed_scalar(Offset16::NULL).unwrap();
        let child_pos = s.serialize_offset(off_field, header.position()).unwrap();
        ArrayOf::<U16>::serialize(&mut s, &[U16::new(0xDEAD), U16::new(0xBEEF)]).unwrap();
        assert!(s.end_serialize());

        // reading the offset relative to the header finds the child
        let data = TableData::new(&buf);
        let offset: Offset16 = data.read_at(2).unwrap();
        assert_eq!(offset.to_u32() as usize, child_pos);
        let child: Array<U16> = Array::read(data.split_off(child_pos).unwrap()).unwrap();
        assert_eq!(child.value(0), 0xDEAD);
        assert_eq!(child.value(1), 0xBEEF);
    }

    #[test]
    fn array_serialize_writes_len_then_items() {
        let mut buf = [0u8; 16];
        let mut s = SerializeContext::new(&mut buf);
        ArrayOf::<U16>::serialize(&mut s, &[U16::new(7), U16::new(9)]).unwrap();
        assert!(s.end_serialize());
        assert_eq!(&buf[..6], [0, 2, 0, 7, 0, 9]);
    }
}
