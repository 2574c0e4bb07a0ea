//! # lzip-core
//!
//! Shared low-level building blocks for the `lzip` crate: CRC-32 checksums,
//! the stable error taxonomy, and the streaming `Compressor`/`Decompressor`
//! traits used by the engine's public facade.
//!
//! This crate has no knowledge of the lzip container format itself — it is
//! the foundation the `lzip` crate builds the range coder and member framing
//! on top of.
//!
//! ## Example
//!
//! ```rust
//! use lzip_core::crc::Crc32;
//!
//! let crc = Crc32::compute(b"Hello, World!");
//! assert_eq!(crc, 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod crc;
pub mod error;
pub mod traits;

pub use crc::Crc32;
pub use error::{LzError, Result};
pub use traits::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::crc::Crc32;
    pub use crate::error::{LzError, Result};
    pub use crate::traits::{
        CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode,
    };
}
