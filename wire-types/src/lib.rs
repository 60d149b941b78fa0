//! Scalar data types in their on-disk big-endian form.
//!
//! Binary font tables store all multi-byte values big-endian and without any
//! alignment guarantee. The types in this crate describe those values exactly
//! as they appear on disk: each one is a plain byte array wrapped in a type
//! that knows how to decode itself, so a table can be traversed without
//! copying or realigning anything.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[cfg(all(not(feature = "std"), not(test)))]
#[macro_use]
extern crate core as std;

mod fixed;
mod fword;
mod glyph_id;
mod integers;
mod longdatetime;
mod offset;
mod raw;
mod tag;
mod uint24;

pub use fixed::{F2Dot14, Fixed};
pub use fword::{FWord, UfWord};
pub use glyph_id::GlyphId;
pub use longdatetime::LongDateTime;
pub use offset::{Offset16, Offset24, Offset32};
pub use raw::{BigEndian, FixedSize, Scalar, I16, I32, I8, U16, U24, U32, U8};
pub use tag::{InvalidTag, Tag};
pub use uint24::Uint24;
