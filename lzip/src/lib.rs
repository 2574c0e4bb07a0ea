//! # lzip
//!
//! A pure Rust implementation of the lzip compressed file format: an
//! LZMA-family, range-coded arithmetic compressor/decompressor built as a
//! byte-oriented engine.
//!
//! lzip files are organized into one or more independent **members**, each
//! with its own 6-byte header (magic, version, coded dictionary size), an
//! LZMA-coded body, and a 20-byte trailer (CRC-32 of the uncompressed data,
//! uncompressed size, member size). Concatenating members concatenates their
//! uncompressed data, which is how `lzip -S`-style volume splitting and
//! `cat a.lz b.lz` both work.
//!
//! ## Design
//!
//! This crate does no I/O of its own — no files, no sockets, no threads.
//! Every component communicates through push/pull byte buffers
//! ([`circular_buffer::CircularBuffer`]): callers call `write` to push input
//! in and `read` to pull output out, the same shape all the way from the
//! [`facade::LzCompressor`]/[`facade::LzDecompressor`] facade down to the
//! range coder itself. That keeps the engine usable from a CLI, an async
//! task, or a `no_std`-adjacent embedding without committing to any of them.
//!
//! ## Components
//!
//! - [`circular_buffer`] — the shared ring-buffer primitive.
//! - [`constants`] — format constants (magic bytes, size limits, marker
//!   values) shared across the engine.
//! - [`model`] — bit and length probability models, and the 12-state machine
//!   tracking the last few match/literal decisions.
//! - [`prices`] — bit-cost tables derived from the probability models, used
//!   by the optimal parser to compare encodings.
//! - [`range_coder`] — the arithmetic range encoder/decoder.
//! - [`member`] — member header/trailer framing.
//! - [`matchfinder`] — the hash-chain match finder shared by both encoders.
//! - [`decoder`] — the LZMA decoder (decompression engine).
//! - [`fast_encoder`] — a greedy/lazy single-step encoder tuned for speed.
//! - [`optimal_encoder`] — a trellis-based optimal-parsing encoder tuned for
//!   ratio.
//! - [`facade`] — the public [`LzCompressor`]/[`LzDecompressor`] API.
//!
//! ## Usage
//!
//! ```ignore
//! use lzip::{LzCompressor, LzDecompressor};
//!
//! let mut enc = LzCompressor::new(1 << 23, 273, 1 << 51)?;
//! enc.write(b"Hello, World!")?;
//! enc.finish()?;
//! let mut compressed = Vec::new();
//! let mut buf = [0u8; 4096];
//! loop {
//!     let n = enc.read(&mut buf)?;
//!     if n == 0 {
//!         break;
//!     }
//!     compressed.extend_from_slice(&buf[..n]);
//! }
//!
//! let mut dec = LzDecompressor::new();
//! dec.write(&compressed)?;
//! dec.finish()?;
//! let mut out = Vec::new();
//! loop {
//!     let n = dec.read(&mut buf)?;
//!     if n == 0 {
//!         break;
//!     }
//!     out.extend_from_slice(&buf[..n]);
//! }
//! assert_eq!(out, b"Hello, World!");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod circular_buffer;
pub mod constants;
pub mod decoder;
pub mod facade;
pub mod fast_encoder;
pub mod matchfinder;
pub mod member;
pub mod model;
pub mod optimal_encoder;
pub mod prices;
pub mod range_coder;

pub use facade::{LzCompressor, LzDecompressor};
pub use lzip_core::error::{LzError, Result};
pub use lzip_core::traits::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};
