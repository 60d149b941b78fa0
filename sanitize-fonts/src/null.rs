//! shared zero-initialized sentinels
//!
//! Out-of-range reads do not surface errors to the caller; they resolve to a
//! process-wide zeroed instance of the requested type, so a traversal over
//! damaged data keeps going and simply sees "nothing there". The sentinels
//! live in a fixed pool of zero bytes, reinterpreted per type.

/// The size of the shared zero pool, in bytes.
///
/// Every type handed out by [`null_of`] must fit within it.
pub(crate) const NULL_POOL_SIZE: usize = 64;

static NULL_POOL: [u8; NULL_POOL_SIZE] = [0; NULL_POOL_SIZE];

/// The shared zeroed instance of `T`.
///
/// `T` must be an align-1 plain-old-data type no larger than the pool.
///
/// # Panics
///
/// Panics if `size_of::<T>()` exceeds the pool size. Table types that large
/// should be represented by views, which have their own empty states.
pub fn null_of<T: bytemuck::AnyBitPattern>() -> &'static T {
    assert!(std::mem::size_of::<T>() <= NULL_POOL_SIZE);
    debug_assert_eq!(std::mem::align_of::<T>(), 1);
    bytemuck::from_bytes(&NULL_POOL[..std::mem::size_of::<T>()])
}

/// The shared zero pool as raw bytes.
///
/// Null *views* (for example, the target of a null offset) borrow from this
/// slice: a zero-length table parsed from it is empty and well-formed.
pub(crate) fn null_bytes() -> &'static [u8] {
    &NULL_POOL
}
