//! Facade (C10): the public push/pull compressor and decompressor, wrapping
//! the match finder/encoder/decoder engine behind the `write`/`read`/
//! `finish` surface callers actually drive, plus the member-management
//! operations (`restart_member`, `sync_flush`, `sync_to_member`) that don't
//! fit the plain [`lzip_core::traits::Compressor`]/[`Decompressor`] shape.
//!
//! Neither side does any I/O of its own: callers push bytes in and pull
//! bytes out, same as every other component in this crate.

use lzip_core::error::{LzError, Result};
use lzip_core::traits::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};

use crate::constants::{
    HEADER_SIZE, MAX_DICTIONARY_SIZE, MAX_MATCH_LEN_LIMIT, MIN_DICTIONARY_SIZE,
    MIN_MATCH_LEN_LIMIT, TRAILER_SIZE,
};
use crate::decoder::{DecodeStep, LzDecoder};
use crate::fast_encoder::{EncodeStep as FastStep, FastEncoder};
use crate::member::{MemberHeader, MemberTrailer};
use crate::optimal_encoder::{EncodeStep as OptStep, OptimalEncoder};
use crate::range_coder::RangeDecoder;

const MIN_MEMBER_SIZE: u64 = MIN_DICTIONARY_SIZE as u64;

/// dictionary_size/match_len_limit pair lzlib reserves for its fast mode; any
/// other combination gets the optimal (trellis) encoder.
const FAST_MODE_DICTIONARY_SIZE: u32 = 65535;
const FAST_MODE_MATCH_LEN_LIMIT: usize = 16;

enum Engine {
    Fast(FastEncoder),
    Optimal(OptimalEncoder),
}

impl Engine {
    fn build(dictionary_size: u32, match_len_limit: usize, member_size: u64) -> Option<Self> {
        if dictionary_size == FAST_MODE_DICTIONARY_SIZE && match_len_limit == FAST_MODE_MATCH_LEN_LIMIT {
            Some(Engine::Fast(FastEncoder::new(dictionary_size, member_size)?))
        } else {
            Some(Engine::Optimal(OptimalEncoder::new(dictionary_size, match_len_limit, member_size)?))
        }
    }

    fn write_data(&mut self, data: &[u8]) -> usize {
        match self {
            Engine::Fast(e) => e.write_data(data),
            Engine::Optimal(e) => e.write_data(data),
        }
    }

    fn finish(&mut self) {
        match self {
            Engine::Fast(e) => e.finish(),
            Engine::Optimal(e) => e.finish(),
        }
    }

    fn read_data(&mut self, out: &mut [u8]) -> usize {
        match self {
            Engine::Fast(e) => e.read_data(out),
            Engine::Optimal(e) => e.read_data(out),
        }
    }

    fn member_finished(&self) -> bool {
        match self {
            Engine::Fast(e) => e.member_finished(),
            Engine::Optimal(e) => e.member_finished(),
        }
    }

    fn data_position(&self) -> u64 {
        match self {
            Engine::Fast(e) => e.data_position(),
            Engine::Optimal(e) => e.data_position(),
        }
    }

    fn member_position(&self) -> u64 {
        match self {
            Engine::Fast(e) => e.member_position(),
            Engine::Optimal(e) => e.member_position(),
        }
    }

    fn crc(&self) -> u32 {
        match self {
            Engine::Fast(e) => e.crc(),
            Engine::Optimal(e) => e.crc(),
        }
    }

    fn request_sync_flush(&mut self) {
        match self {
            Engine::Fast(e) => e.request_sync_flush(),
            Engine::Optimal(e) => e.request_sync_flush(),
        }
    }

    fn try_shrink_header(&mut self, dictionary_size: u32) -> bool {
        match self {
            Engine::Fast(e) => e.try_shrink_header(dictionary_size),
            Engine::Optimal(e) => e.try_shrink_header(dictionary_size),
        }
    }

    fn reset(&mut self, dictionary_size: u32, member_size: u64) -> Option<()> {
        match self {
            Engine::Fast(e) => e.reset(dictionary_size, member_size),
            Engine::Optimal(e) => e.reset(dictionary_size, member_size),
        }
    }

    fn encode_member(&mut self) -> Step {
        match self {
            Engine::Fast(e) => match e.encode_member() {
                FastStep::NeedsInput => Step::NeedsInput,
                FastStep::NeedsOutput => Step::NeedsOutput,
                FastStep::MemberFinished => Step::MemberFinished,
            },
            Engine::Optimal(e) => match e.encode_member() {
                OptStep::NeedsInput => Step::NeedsInput,
                OptStep::NeedsOutput => Step::NeedsOutput,
                OptStep::MemberFinished => Step::MemberFinished,
            },
        }
    }
}

enum Step {
    NeedsInput,
    NeedsOutput,
    MemberFinished,
}

/// Validate the three parameters every open/restart call must agree on.
fn validate_params(dictionary_size: u32, match_len_limit: usize, member_size: u64) -> Result<()> {
    if !(MIN_DICTIONARY_SIZE..=MAX_DICTIONARY_SIZE).contains(&dictionary_size) {
        return Err(LzError::bad_argument(format!(
            "dictionary_size {dictionary_size} out of range [{MIN_DICTIONARY_SIZE}, {MAX_DICTIONARY_SIZE}]"
        )));
    }
    if !(MIN_MATCH_LEN_LIMIT as usize..=MAX_MATCH_LEN_LIMIT as usize).contains(&match_len_limit) {
        return Err(LzError::bad_argument(format!(
            "match_len_limit {match_len_limit} out of range [{MIN_MATCH_LEN_LIMIT}, {MAX_MATCH_LEN_LIMIT}]"
        )));
    }
    if member_size < MIN_MEMBER_SIZE {
        return Err(LzError::bad_argument(format!(
            "member_size {member_size} below minimum {MIN_MEMBER_SIZE}"
        )));
    }
    Ok(())
}

/// Push/pull lzip compressor: feed raw bytes with [`LzCompressor::write`],
/// pull compressed bytes with [`LzCompressor::read`].
///
/// Dispatches to the fast (greedy) or optimal (trellis) engine depending on
/// `dictionary_size`/`match_len_limit`, mirroring lzlib's own encoder
/// selection: the one combination lzlib's `-0` preset uses (64 KiB - 1
/// dictionary, match length limit 16) gets the cheap fast encoder, and every
/// other combination gets the optimal one.
pub struct LzCompressor {
    engine: Engine,
    dictionary_size: u32,
    match_len_limit: usize,
    member_size: u64,
    fatal: Option<String>,
    partial_in_size: u64,
    partial_out_size: u64,
}

impl LzCompressor {
    /// Open a compressor. Fails with [`LzError::BadArgument`] if any
    /// parameter is out of lzip's legal range, or [`LzError::MemError`] if
    /// the engine's internal buffers could not be sized.
    pub fn new(dictionary_size: u32, match_len_limit: usize, member_size: u64) -> Result<Self> {
        validate_params(dictionary_size, match_len_limit, member_size)?;
        let engine = Engine::build(dictionary_size, match_len_limit, member_size)
            .ok_or_else(|| LzError::mem_error("failed to allocate encoder state"))?;
        Ok(Self {
            engine,
            dictionary_size,
            match_len_limit,
            member_size,
            fatal: None,
            partial_in_size: 0,
            partial_out_size: 0,
        })
    }

    fn check_fatal(&self) -> Result<()> {
        match &self.fatal {
            Some(message) => Err(LzError::library_error(message.clone())),
            None => Ok(()),
        }
    }

    /// Feed raw input bytes, returning how many were actually accepted
    /// (bounded by the match finder's window).
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.check_fatal()?;
        Ok(self.engine.write_data(data))
    }

    /// Mark input as complete; once the window drains, the member closes
    /// out with an end marker and trailer.
    pub fn finish(&mut self) -> Result<()> {
        self.check_fatal()?;
        self.engine.finish();
        Ok(())
    }

    /// Arm a sync flush: the next [`LzCompressor::read`] drains whatever
    /// input is already buffered and emits a flush marker, without closing
    /// the member (no trailer, encoding can resume afterwards).
    pub fn sync_flush(&mut self) -> Result<()> {
        self.check_fatal()?;
        self.engine.request_sync_flush();
        Ok(())
    }

    /// Run the encoder forward as far as it can go without more input or
    /// output room, applying the shrink-on-finish header patch the moment
    /// the member closes having never received any data.
    fn pump(&mut self) -> Result<()> {
        if let Step::MemberFinished = self.engine.encode_member() {
            let produced = self.engine.data_position();
            if produced < self.dictionary_size as u64 {
                let trimmed = (produced as u32).max(MIN_DICTIONARY_SIZE);
                self.engine.try_shrink_header(trimmed);
            }
        }
        Ok(())
    }

    /// Pull up to `out.len()` compressed bytes, pumping the encoder forward
    /// first if its output ring is currently empty.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        self.check_fatal()?;
        self.pump()?;
        Ok(self.engine.read_data(out))
    }

    /// `true` once the current member has been closed with its trailer.
    pub fn member_finished(&self) -> bool {
        self.engine.member_finished()
    }

    /// Uncompressed bytes encoded so far in the current member.
    pub fn data_position(&self) -> u64 {
        self.engine.data_position()
    }

    /// Compressed bytes produced so far in the current member, header
    /// included.
    pub fn member_position(&self) -> u64 {
        self.engine.member_position()
    }

    /// Total uncompressed bytes across every member encoded so far,
    /// including the one in progress.
    pub fn total_in_size(&self) -> u64 {
        self.partial_in_size + self.engine.data_position()
    }

    /// Total compressed bytes produced across every member, including the
    /// one in progress.
    pub fn total_out_size(&self) -> u64 {
        self.partial_out_size + self.engine.member_position()
    }

    /// Close out the current member (if not already finished) and start a
    /// fresh one with a new size budget, keeping `dictionary_size` and
    /// `match_len_limit`. Errors with [`LzError::SequenceError`] if the
    /// current member hasn't finished yet.
    pub fn restart_member(&mut self, member_size: u64) -> Result<()> {
        self.check_fatal()?;
        if !self.engine.member_finished() {
            return Err(LzError::sequence_error(
                "restart_member called before the current member finished",
            ));
        }
        if member_size < MIN_MEMBER_SIZE {
            return Err(LzError::bad_argument(format!(
                "member_size {member_size} below minimum {MIN_MEMBER_SIZE}"
            )));
        }
        self.partial_in_size += self.engine.data_position();
        self.partial_out_size += self.engine.member_position();
        self.member_size = member_size;
        self.engine
            .reset(self.dictionary_size, self.member_size)
            .ok_or_else(|| LzError::mem_error("failed to reset encoder for new member"))?;
        Ok(())
    }
}

impl Compressor for LzCompressor {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)> {
        let consumed = self.write(input)?;
        match flush {
            FlushMode::None => {}
            FlushMode::Sync => self.sync_flush()?,
            FlushMode::Full | FlushMode::Finish => self.finish()?,
        }
        let produced = self.read(output)?;
        let status = if matches!(flush, FlushMode::Finish) && self.member_finished() {
            CompressStatus::Done
        } else if produced == output.len() && !output.is_empty() {
            CompressStatus::NeedsOutput
        } else {
            CompressStatus::NeedsInput
        };
        Ok((consumed, produced, status))
    }

    /// Rebuild the encoder from scratch with the parameters it was opened
    /// with, discarding any buffered input or output.
    fn reset(&mut self) {
        if let Some(engine) = Engine::build(self.dictionary_size, self.match_len_limit, self.member_size) {
            self.engine = engine;
        }
        self.fatal = None;
        self.partial_in_size = 0;
        self.partial_out_size = 0;
    }

    fn is_finished(&self) -> bool {
        self.member_finished()
    }
}

/// Push/pull lzip decompressor: feed compressed bytes with
/// [`LzDecompressor::write`], pull decompressed bytes with
/// [`LzDecompressor::read`]. Allocates its inner [`LzDecoder`] lazily, once
/// the first member's header has been parsed, since only the header reveals
/// the dictionary size to size it with.
pub struct LzDecompressor {
    rdec: RangeDecoder,
    dec: Option<LzDecoder>,
    member_closed: bool,
    member_start_pos: u64,
    seen_first_member: bool,
    fatal: Option<String>,
    partial_in_size: u64,
    partial_out_size: u64,
}

enum Advance {
    NeedsInput,
    NeedsOutput,
    Progressed,
    MemberEnd,
    StreamEnd,
}

impl LzDecompressor {
    /// Open a decompressor with empty internal buffers.
    pub fn new() -> Self {
        Self {
            rdec: RangeDecoder::new(),
            dec: None,
            member_closed: false,
            member_start_pos: 0,
            seen_first_member: false,
            fatal: None,
            partial_in_size: 0,
            partial_out_size: 0,
        }
    }

    fn check_fatal(&self) -> Result<()> {
        match &self.fatal {
            Some(message) => Err(LzError::library_error(message.clone())),
            None => Ok(()),
        }
    }

    /// Latch `err` as a sticky fault only if it's a [`LzError::LibraryError`]
    /// (an internal invariant broken, not recoverable); header/data/EOF
    /// errors are reported but leave the decompressor usable, e.g. via
    /// [`LzDecompressor::sync_to_member`].
    fn latch(&mut self, err: LzError) -> LzError {
        if let LzError::LibraryError { message } = &err {
            self.fatal = Some(message.clone());
        }
        err
    }

    /// Push compressed bytes into the input ring, returning how many were
    /// actually accepted.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.check_fatal()?;
        Ok(self.rdec.write_data(data))
    }

    /// Mark the input as complete: no more compressed bytes will arrive, so
    /// a short read from here on means the stream really did end (or was
    /// truncated).
    pub fn finish(&mut self) -> Result<()> {
        self.check_fatal()?;
        self.rdec.finish();
        Ok(())
    }

    fn advance(&mut self) -> Result<Advance> {
        if self.member_closed {
            if let Some(dec) = &self.dec {
                if dec.available_output() > 0 {
                    return Ok(Advance::NeedsOutput);
                }
            }
            self.member_closed = false;
            return Ok(Advance::Progressed);
        }

        if self.dec.is_none() {
            if self.rdec.available_bytes() < HEADER_SIZE {
                if self.rdec.finished() {
                    return if self.rdec.available_bytes() == 0 {
                        Ok(Advance::StreamEnd)
                    } else {
                        Err(self.latch(LzError::unexpected_eof("truncated member header")))
                    };
                }
                return Ok(Advance::NeedsInput);
            }

            self.member_start_pos = self.rdec.member_position();
            let mut raw = [0u8; HEADER_SIZE];
            self.rdec.read_raw_prefix(&mut raw);
            let header = MemberHeader::from_bytes(raw);
            if !header.verify() {
                if !self.seen_first_member {
                    self.rdec.unread_data(HEADER_SIZE);
                    return Err(LzError::header_error("invalid lzip member header"));
                }
                return Err(self.latch(LzError::data_error("invalid header at member boundary")));
            }
            self.seen_first_member = true;
            self.rdec.load_initial_state();
            let ds = header.dictionary_size();
            match &mut self.dec {
                Some(dec) => dec.reset(ds),
                None => self.dec = Some(LzDecoder::new(ds)),
            }
            return Ok(Advance::Progressed);
        }

        let dec = self.dec.as_mut().expect("checked above");
        let step = dec
            .decode_member(&mut self.rdec)
            .map_err(|e| self.latch(e))?;
        match step {
            DecodeStep::NeedsInput => Ok(Advance::NeedsInput),
            DecodeStep::NeedsOutput => Ok(Advance::NeedsOutput),
            DecodeStep::MemberEnd => {
                if self.rdec.available_bytes() < TRAILER_SIZE {
                    if self.rdec.finished() {
                        return Err(self.latch(LzError::unexpected_eof("truncated member trailer")));
                    }
                    return Ok(Advance::NeedsInput);
                }
                let mut raw = [0u8; TRAILER_SIZE];
                self.rdec.read_raw_prefix(&mut raw);
                let trailer = MemberTrailer::from_bytes(raw);
                let member_len = self.rdec.member_position() - self.member_start_pos;
                if trailer.data_crc() != dec.crc()
                    || trailer.data_size() != dec.data_position()
                    || trailer.member_size() != member_len
                {
                    return Err(self.latch(LzError::data_error("member trailer mismatch")));
                }
                self.partial_in_size += member_len;
                self.partial_out_size += dec.data_position();
                self.member_closed = true;
                Ok(Advance::MemberEnd)
            }
        }
    }

    /// Pull up to `out.len()` decompressed bytes, driving the decoder
    /// forward (parsing headers, decoding symbols, verifying trailers) as
    /// needed. Returns `0` without error when more input is needed or the
    /// stream has ended.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        self.check_fatal()?;
        loop {
            if let Some(dec) = &mut self.dec {
                if dec.available_output() > 0 {
                    return Ok(dec.read(out));
                }
            }
            match self.advance()? {
                Advance::NeedsInput | Advance::NeedsOutput | Advance::StreamEnd => return Ok(0),
                Advance::Progressed | Advance::MemberEnd => continue,
            }
        }
    }

    /// `true` once all input has been consumed, a member boundary (or the
    /// end of the stream) was reached cleanly, and every decoded byte has
    /// been read out.
    pub fn finished(&self) -> bool {
        self.rdec.finished() && self.dec.as_ref().is_none_or(|d| d.available_output() == 0)
    }

    /// `true` once the member currently being decoded has had its trailer
    /// validated.
    pub fn member_finished(&self) -> bool {
        self.member_closed
    }

    /// Total decompressed bytes produced across every completed member,
    /// not counting the one in progress.
    pub fn total_out_size(&self) -> u64 {
        self.partial_out_size
    }

    /// Total compressed bytes consumed across every completed member, not
    /// counting the one in progress.
    pub fn total_in_size(&self) -> u64 {
        self.partial_in_size
    }

    /// Recover synchronization after corrupt or non-lzip bytes: scan
    /// forward for the next valid member header, skipping everything
    /// before it. Clears any non-fatal error state. Returns the number of
    /// bytes skipped.
    pub fn sync_to_member(&mut self) -> Result<u64> {
        let (found, skipped) = self.rdec.find_header();
        self.partial_in_size += skipped;
        self.dec = None;
        self.member_closed = false;
        if !found {
            return Err(LzError::header_error("no valid member header found while resyncing"));
        }
        Ok(skipped)
    }

    /// Wipe all decoder state (buffered input, dictionary, member counters)
    /// without discarding the allocations that don't depend on a specific
    /// dictionary size.
    pub fn reset(&mut self) {
        self.rdec.reset();
        self.dec = None;
        self.member_closed = false;
        self.member_start_pos = 0;
        self.seen_first_member = false;
        self.fatal = None;
        self.partial_in_size = 0;
        self.partial_out_size = 0;
    }
}

impl Default for LzDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for LzDecompressor {
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<(usize, usize, DecompressStatus)> {
        let consumed = self.write(input)?;
        let produced = self.read(output)?;
        let status = if self.finished() {
            DecompressStatus::Done
        } else if self.member_closed {
            DecompressStatus::MemberEnd
        } else if produced == output.len() && !output.is_empty() {
            DecompressStatus::NeedsOutput
        } else {
            DecompressStatus::NeedsInput
        };
        Ok((consumed, produced, status))
    }

    fn reset(&mut self) {
        LzDecompressor::reset(self)
    }

    fn is_finished(&self) -> bool {
        self.finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lzip_core::crc::Crc32;

    fn compress_all(input: &[u8], dictionary_size: u32, match_len_limit: usize) -> Vec<u8> {
        let mut enc = LzCompressor::new(dictionary_size, match_len_limit, 1 << 24).unwrap();
        enc.write(input).unwrap();
        enc.finish().unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = enc.read(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
            if n == 0 {
                break;
            }
        }
        out
    }

    fn decompress_all(compressed: &[u8]) -> Vec<u8> {
        let mut dec = LzDecompressor::new();
        dec.write(compressed).unwrap();
        dec.finish().unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = dec.read(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
            if n == 0 {
                break;
            }
        }
        out
    }

    #[test]
    fn open_rejects_out_of_range_parameters() {
        assert!(LzCompressor::new(1 << 11, 16, 1 << 20).is_err());
        assert!(LzCompressor::new(1 << 16, 4, 1 << 20).is_err());
        assert!(LzCompressor::new(1 << 16, 16, 100).is_err());
    }

    #[test]
    fn fast_mode_dispatch_matches_lzlib_reserved_combination() {
        let enc = LzCompressor::new(65535, 16, 1 << 20).unwrap();
        assert!(matches!(enc.engine, Engine::Fast(_)));
        let enc = LzCompressor::new(65535, 17, 1 << 20).unwrap();
        assert!(matches!(enc.engine, Engine::Optimal(_)));
        let enc = LzCompressor::new(1 << 20, 16, 1 << 20).unwrap();
        assert!(matches!(enc.engine, Engine::Optimal(_)));
    }

    #[test]
    fn roundtrips_through_optimal_mode() {
        let input = b"the quick brown fox the quick brown fox jumps over the lazy dog";
        let compressed = compress_all(input, 1 << 16, 36);
        let decompressed = decompress_all(&compressed);
        assert_eq!(&decompressed, input);
    }

    #[test]
    fn roundtrips_through_fast_mode() {
        let input = b"the quick brown fox the quick brown fox jumps over the lazy dog";
        let compressed = compress_all(input, 65535, 16);
        let decompressed = decompress_all(&compressed);
        assert_eq!(&decompressed, input);
    }

    #[test]
    fn empty_input_shrinks_header_to_minimum_dictionary_size() {
        let compressed = compress_all(b"", 1 << 20, 36);
        assert_eq!(compressed[0..4], crate::constants::LZIP_MAGIC);
        // Known encoding of a 4 KiB dictionary: bits=12, no fractional correction.
        assert_eq!(compressed[5], 0x0C);
        assert_eq!(decompress_all(&compressed), b"");
    }

    #[test]
    fn single_byte_crc_matches_known_value() {
        let compressed = compress_all(b"A", 1 << 16, 36);
        assert_eq!(decompress_all(&compressed), b"A");
        assert_eq!(Crc32::compute(b"A"), 0xD3D9_9E8B);
    }

    #[test]
    fn concatenated_members_decode_in_sequence() {
        let mut stream = compress_all(b"hello", 1 << 16, 36);
        stream.extend(compress_all(b"world", 1 << 16, 36));
        assert_eq!(decompress_all(&stream), b"helloworld");
    }

    #[test]
    fn sync_to_member_skips_leading_garbage() {
        let mut stream = vec![0u8; 17];
        stream.extend(compress_all(b"payload", 1 << 16, 36));

        let mut dec = LzDecompressor::new();
        dec.write(&stream).unwrap();
        dec.finish().unwrap();
        let skipped = dec.sync_to_member().unwrap();
        assert_eq!(skipped, 17);

        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            let n = dec.read(&mut buf).unwrap();
            out.extend_from_slice(&buf[..n]);
            if n == 0 {
                break;
            }
        }
        assert_eq!(&out, b"payload");
        assert_eq!(dec.total_in_size(), stream.len() as u64);
    }

    #[test]
    fn restart_member_resets_and_accumulates_totals() {
        let mut enc = LzCompressor::new(1 << 16, 36, 1 << 20).unwrap();
        enc.write(b"first").unwrap();
        enc.finish().unwrap();
        let mut buf = [0u8; 256];
        loop {
            let n = enc.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
        }
        assert!(enc.member_finished());
        let first_total = enc.total_in_size();
        enc.restart_member(1 << 20).unwrap();
        assert!(!enc.member_finished());
        assert_eq!(enc.total_in_size(), first_total);
        enc.write(b"second").unwrap();
        enc.finish().unwrap();
        loop {
            let n = enc.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
        }
        assert_eq!(enc.total_in_size(), first_total + 6);
    }

    #[test]
    fn restart_member_before_finish_is_a_sequence_error() {
        let mut enc = LzCompressor::new(1 << 16, 36, 1 << 20).unwrap();
        enc.write(b"unflushed").unwrap();
        assert!(matches!(
            enc.restart_member(1 << 20),
            Err(LzError::SequenceError { .. })
        ));
    }
}
