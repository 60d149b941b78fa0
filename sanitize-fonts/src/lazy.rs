//! lazy, race-free per-face table publication
//!
//! Each table of a face is sanitized at most once, on first use, and the
//! result published into an atomic slot. Threads may race the first load;
//! the compare-exchange decides a single winner and the loser discards its
//! candidate. No locks are taken, and the slot is written exactly once for
//! the lifetime of the loader.

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::blob::Blob;
use crate::read::{TableSource, TaggedTable};
use crate::sanitize::{Sanitize, SanitizeContext};

/// A lazily-populated slot holding the sanitized blob for table `T`.
pub struct TableLoader<'a, T, F> {
    face: &'a F,
    // owns a Box<Blob> once published; null until then
    blob: AtomicPtr<Blob>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T, F> TableLoader<'a, T, F>
where
    T: Sanitize + TaggedTable,
    F: TableSource,
{
    /// Create an empty loader for `face`.
    pub fn new(face: &'a F) -> Self {
        TableLoader {
            face,
            blob: AtomicPtr::new(ptr::null_mut()),
            _marker: PhantomData,
        }
    }

    /// The sanitized blob for `T`, producing and publishing it on first
    /// use.
    ///
    /// Every caller receives a handle to the same storage; if the table
    /// fails sanitization this is the shared empty blob.
    pub fn get(&self) -> Blob {
        loop {
            let published = self.blob.load(Ordering::Acquire);
            if !published.is_null() {
                // SAFETY: a non-null slot holds a leaked Box<Blob> that is
                // only reclaimed in Drop, which cannot run concurrently
                // with a shared borrow of self.
                return unsafe { (*published).clone() };
            }
            let candidate = SanitizeContext::new().reference_table::<T>(self.face);
            let raw = Box::into_raw(Box::new(candidate));
            match self.blob.compare_exchange(
                ptr::null_mut(),
                raw,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                // SAFETY: we own `raw` until the moment the store wins, and
                // the pointer stays valid for the lifetime of self.
                Ok(_) => return unsafe { (*raw).clone() },
                Err(_) => {
                    // another thread won the race; discard our candidate
                    // SAFETY: the exchange failed, so `raw` was never
                    // shared and we still own it.
                    drop(unsafe { Box::from_raw(raw) });
                }
            }
        }
    }
}

impl<T, F> Drop for TableLoader<'_, T, F> {
    fn drop(&mut self) {
        let published = *self.blob.get_mut();
        if !published.is_null() {
            // SAFETY: the slot owns the leaked Box created in get().
            drop(unsafe { Box::from_raw(published) });
        }
    }
}

/// A type that can be lazily constructed for a face.
pub trait LazyInit<F>: Sized + 'static {
    /// Build an instance for `face`, or `None` on failure.
    fn init(face: &F) -> Option<Self>;

    /// The shared instance standing in for a failed construction.
    fn null_instance() -> &'static Self;
}

/// A lazily-populated slot holding a heap-allocated `T`.
///
/// This is the companion to [`TableLoader`] for pre-built auxiliary
/// structures rather than raw table blobs. A failed construction publishes
/// the process-wide null instance, so `get` always has something to
/// return.
pub struct LazyInstance<'a, F, T: LazyInit<F>> {
    face: &'a F,
    instance: AtomicPtr<T>,
}

impl<'a, F, T: LazyInit<F>> LazyInstance<'a, F, T> {
    /// Create an empty slot for `face`.
    pub fn new(face: &'a F) -> Self {
        LazyInstance {
            face,
            instance: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// The instance, constructing and publishing it on first use.
    pub fn get(&self) -> &T {
        loop {
            let published = self.instance.load(Ordering::Acquire);
            if !published.is_null() {
                // SAFETY: a non-null slot is either the 'static null
                // instance or a leaked Box reclaimed only in Drop.
                return unsafe { &*published };
            }
            let candidate = match T::init(self.face) {
                Some(value) => Box::into_raw(Box::new(value)),
                None => T::null_instance() as *const T as *mut T,
            };
            match self.instance.compare_exchange(
                ptr::null_mut(),
                candidate,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                // SAFETY: as in TableLoader::get.
                Ok(_) => return unsafe { &*candidate },
                Err(_) => {
                    if !ptr::eq(candidate, T::null_instance()) {
                        // SAFETY: the exchange failed; we still own it.
                        drop(unsafe { Box::from_raw(candidate) });
                    }
                }
            }
        }
    }
}

impl<F, T: LazyInit<F>> Drop for LazyInstance<'_, F, T> {
    fn drop(&mut self) {
        let published = *self.instance.get_mut();
        // the null instance is 'static and must never be freed
        if !published.is_null() && !ptr::eq(published, T::null_instance()) {
            // SAFETY: the slot owns the leaked Box created in get().
            drop(unsafe { Box::from_raw(published) });
        }
    }
}
