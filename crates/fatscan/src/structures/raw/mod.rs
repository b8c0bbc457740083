//! Raw on-disk structures
//!
//! The structures defined here mirror the byte layout of FAT directory records exactly,
//! which is why multi-byte fields are kept as little endian byte arrays instead of integers.
//! They are repr(C, packed) so they can be cast straight from a 32 byte buffer.

pub mod constants;
pub mod directory;
