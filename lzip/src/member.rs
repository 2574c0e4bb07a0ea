//! lzip member framing: the 6-byte header and 20-byte trailer that bracket
//! each range-coded block in a (possibly multi-member) `.lz` stream.

use crate::constants::{FORMAT_VERSION, HEADER_SIZE, LZIP_MAGIC, MAX_DICTIONARY_SIZE, TRAILER_SIZE};

#[inline]
fn is_valid_dictionary_size(size: u32) -> bool {
    (crate::constants::MIN_DICTIONARY_SIZE..=MAX_DICTIONARY_SIZE).contains(&size)
}

#[inline]
fn real_bits(mut value: u32) -> u32 {
    let mut bits = 0;
    while value > 0 {
        value >>= 1;
        bits += 1;
    }
    bits
}

/// The 6-byte member header: magic, format version, and a compact encoding
/// of the dictionary size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberHeader {
    bytes: [u8; HEADER_SIZE],
}

impl MemberHeader {
    /// Build a header with the given dictionary size. Fails if `size` is
    /// outside lzip's `[4 KiB, 512 MiB]` range.
    pub fn new(dictionary_size: u32) -> Option<Self> {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&LZIP_MAGIC);
        bytes[4] = FORMAT_VERSION;
        if !is_valid_dictionary_size(dictionary_size) {
            return None;
        }
        let bits = real_bits(dictionary_size - 1);
        bytes[5] = bits as u8;
        if dictionary_size > crate::constants::MIN_DICTIONARY_SIZE {
            let base_size = 1u32 << bits;
            let fraction = base_size / 16;
            for i in (1..=7u32).rev() {
                if base_size - i * fraction >= dictionary_size {
                    bytes[5] |= (i as u8) << 5;
                    break;
                }
            }
        }
        Some(Self { bytes })
    }

    /// View the header's raw bytes, e.g. to write them to an output buffer.
    pub fn as_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.bytes
    }

    /// Parse a 6-byte buffer into a header without validating it; use
    /// [`MemberHeader::verify`] to check the result.
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self { bytes }
    }

    /// `true` if the first 4 bytes equal the lzip magic exactly.
    pub fn verify_magic(&self) -> bool {
        self.bytes[0..4] == LZIP_MAGIC
    }

    /// `true` if `self.bytes[..prefix_len]` matches the corresponding
    /// prefix of the lzip magic. Used when fewer than 4 header bytes have
    /// arrived yet, to decide whether to keep waiting for more input.
    pub fn verify_prefix(prefix: &[u8]) -> bool {
        if prefix.is_empty() {
            return false;
        }
        prefix
            .iter()
            .zip(LZIP_MAGIC.iter())
            .take(4)
            .all(|(a, b)| a == b)
    }

    /// `true` if 2 or 3 (but not 0, 1, or all 4) of the magic bytes match.
    /// Distinguishes "this looks like a corrupted lzip member" from "this
    /// isn't a lzip file at all" when header validation fails.
    pub fn looks_corrupt(&self) -> bool {
        let matches = self.bytes[0..4]
            .iter()
            .zip(LZIP_MAGIC.iter())
            .filter(|(a, b)| a == b)
            .count();
        matches > 1 && matches < 4
    }

    /// The format version byte.
    pub fn version(&self) -> u8 {
        self.bytes[4]
    }

    /// `true` if the version byte is the one version this crate understands.
    pub fn verify_version(&self) -> bool {
        self.bytes[4] == FORMAT_VERSION
    }

    /// Decode the dictionary size field.
    pub fn dictionary_size(&self) -> u32 {
        let mut size = 1u32 << (self.bytes[5] & 0x1F);
        if size > crate::constants::MIN_DICTIONARY_SIZE {
            size -= (size / 16) * ((self.bytes[5] >> 5) & 7) as u32;
        }
        size
    }

    /// Full validation: magic, version, and a dictionary size in range.
    pub fn verify(&self) -> bool {
        self.verify_magic() && self.verify_version() && is_valid_dictionary_size(self.dictionary_size())
    }
}

/// The 20-byte member trailer: CRC-32 of the uncompressed data, its size,
/// and the total size of the member (header + compressed data + trailer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberTrailer {
    bytes: [u8; TRAILER_SIZE],
}

impl MemberTrailer {
    /// Build a trailer from its three logical fields.
    pub fn new(data_crc: u32, data_size: u64, member_size: u64) -> Self {
        let mut bytes = [0u8; TRAILER_SIZE];
        bytes[0..4].copy_from_slice(&data_crc.to_le_bytes());
        bytes[4..12].copy_from_slice(&data_size.to_le_bytes());
        bytes[12..20].copy_from_slice(&member_size.to_le_bytes());
        Self { bytes }
    }

    /// Parse a 20-byte buffer into a trailer.
    pub fn from_bytes(bytes: [u8; TRAILER_SIZE]) -> Self {
        Self { bytes }
    }

    /// View the trailer's raw bytes.
    pub fn as_bytes(&self) -> &[u8; TRAILER_SIZE] {
        &self.bytes
    }

    /// CRC-32 of the decompressed data.
    pub fn data_crc(&self) -> u32 {
        u32::from_le_bytes(self.bytes[0..4].try_into().unwrap())
    }

    /// Size in bytes of the decompressed data.
    pub fn data_size(&self) -> u64 {
        u64::from_le_bytes(self.bytes[4..12].try_into().unwrap())
    }

    /// Total size in bytes of the member (header + stream + this trailer).
    pub fn member_size(&self) -> u64 {
        u64::from_le_bytes(self.bytes[12..20].try_into().unwrap())
    }
}
