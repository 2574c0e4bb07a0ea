//! The range coder: binary arithmetic coding over adaptive 11-bit
//! probabilities, streamed through a [`CircularBuffer`] in both directions.
//!
//! Unlike a textbook arithmetic coder this one never blocks on I/O — the
//! encoder appends coded bytes to its own output ring as it goes (starting
//! with the member header), and the decoder pulls coded bytes out of its
//! input ring on demand, reporting back through [`RangeDecoder::needs_data`]
//! when it has run dry.

use crate::circular_buffer::CircularBuffer;
use crate::constants::{BIT_MODEL_MOVE_BITS, BIT_MODEL_TOTAL, BIT_MODEL_TOTAL_BITS};
use crate::member::MemberHeader;
use crate::model::{BitModel, LenModel};

const TOP_VALUE: u32 = 0x0100_0000; // 1 << 24

/// Minimum number of bytes the decoder's input ring must hold before it can
/// guarantee forward progress decoding a symbol (5 for the initial reload
/// plus slack).
pub const RD_MIN_AVAILABLE_BYTES: usize = 10;

/// Binary range encoder. Writes coded bytes (header included) into its own
/// output [`CircularBuffer`]; callers drain that buffer with
/// [`RangeEncoder::read_data`].
pub struct RangeEncoder {
    cb: CircularBuffer,
    min_free_bytes: usize,
    low: u64,
    partial_member_pos: u64,
    range: u32,
    ff_count: u32,
    cache: u8,
}

impl RangeEncoder {
    /// Create a new encoder, writing the 6-byte member header for
    /// `dictionary_size` as the first bytes of the output stream.
    pub fn new(dictionary_size: u32, min_free_bytes: usize) -> Option<Self> {
        let mut renc = Self {
            cb: CircularBuffer::new(65536 + min_free_bytes),
            min_free_bytes,
            low: 0,
            partial_member_pos: 0,
            range: 0xFFFF_FFFF,
            ff_count: 0,
            cache: 0,
        };
        renc.reset(dictionary_size)?;
        Some(renc)
    }

    /// Reset coder state and start a new member with a fresh header.
    pub fn reset(&mut self, dictionary_size: u32) -> Option<()> {
        self.cb.reset();
        self.low = 0;
        self.partial_member_pos = 0;
        self.range = 0xFFFF_FFFF;
        self.ff_count = 0;
        self.cache = 0;
        let header = MemberHeader::new(dictionary_size)?;
        self.cb.write_data(header.as_bytes());
        Some(())
    }

    /// Absolute position (bytes) within the member, including data still
    /// buffered and not yet drained by [`RangeEncoder::read_data`].
    pub fn member_position(&self) -> u64 {
        self.partial_member_pos + self.cb.used_bytes() as u64 + self.ff_count as u64
    }

    /// `true` if the output ring has room for at least `min_free_bytes`
    /// plus whatever carry bytes are pending.
    pub fn enough_free_bytes(&self) -> bool {
        self.cb.free_bytes() >= self.min_free_bytes + self.ff_count as usize
    }

    /// Append raw, non-range-coded bytes straight to the output ring. Used
    /// for the 20-byte member trailer, which follows the flushed range-coded
    /// stream but isn't itself range coded.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.cb.write_data(data);
    }

    /// Drain up to `out.len()` coded bytes into `out`.
    pub fn read_data(&mut self, out: &mut [u8]) -> usize {
        let n = self.cb.read_data(out);
        if n > 0 {
            self.partial_member_pos += n as u64;
        }
        n
    }

    /// Patch the already-emitted 6-byte header in place with a smaller
    /// dictionary size. Only possible if nothing has been drained yet (the
    /// header bytes are still sitting at the front of the output ring).
    pub fn try_shrink_header(&mut self, dictionary_size: u32) -> bool {
        if self.partial_member_pos != 0 {
            return false;
        }
        match MemberHeader::new(dictionary_size) {
            Some(header) => self.cb.overwrite_front(header.as_bytes()),
            None => false,
        }
    }

    fn shift_low(&mut self) {
        if (self.low >> 24) != 0xFF {
            let carry = (self.low > 0xFFFF_FFFF) as u8;
            self.cb.put_byte(self.cache.wrapping_add(carry));
            while self.ff_count > 0 {
                self.cb.put_byte(0xFFu8.wrapping_add(carry));
                self.ff_count -= 1;
            }
            self.cache = (self.low >> 24) as u8;
        } else {
            self.ff_count += 1;
        }
        self.low = (self.low & 0x00FF_FFFF) << 8;
    }

    /// Flush the remaining state (5 bytes) and reset `low`/`range`/`cache`,
    /// ending the range-coded portion of the current member.
    pub fn flush(&mut self) {
        for _ in 0..5 {
            self.shift_low();
        }
        self.low = 0;
        self.range = 0xFFFF_FFFF;
        self.ff_count = 0;
        self.cache = 0;
    }

    /// Encode `num_bits` of `symbol` at a fixed 50% probability (MSB first).
    pub fn encode_direct(&mut self, symbol: u32, num_bits: u32) {
        let mut mask = 1u32 << (num_bits - 1);
        while mask > 0 {
            self.range >>= 1;
            if symbol & mask != 0 {
                self.low += self.range as u64;
            }
            if self.range <= 0x00FF_FFFF {
                self.range <<= 8;
                self.shift_low();
            }
            mask >>= 1;
        }
    }

    /// Encode one bit against an adaptive probability, updating it.
    pub fn encode_bit(&mut self, probability: &mut BitModel, bit: bool) {
        let bound = (self.range >> BIT_MODEL_TOTAL_BITS) * probability.0;
        if !bit {
            self.range = bound;
            probability.0 += (BIT_MODEL_TOTAL - probability.0) >> BIT_MODEL_MOVE_BITS;
        } else {
            self.low += bound as u64;
            self.range -= bound;
            probability.0 -= probability.0 >> BIT_MODEL_MOVE_BITS;
        }
        if self.range <= 0x00FF_FFFF {
            self.range <<= 8;
            self.shift_low();
        }
    }

    /// Encode a 3-bit tree symbol (length low/mid ranges).
    pub fn encode_tree3(&mut self, bm: &mut [BitModel], symbol: u32) {
        let mut bit = (symbol >> 2) & 1 != 0;
        self.encode_bit(&mut bm[1], bit);
        let mut model = 2 | bit as usize;
        bit = (symbol >> 1) & 1 != 0;
        self.encode_bit(&mut bm[model], bit);
        model = (model << 1) | bit as usize;
        self.encode_bit(&mut bm[model], symbol & 1 != 0);
    }

    /// Encode a 6-bit tree symbol (distance slot).
    pub fn encode_tree6(&mut self, bm: &mut [BitModel], symbol: u32) {
        let mut model = 1usize;
        for shift in (1..6).rev() {
            let bit = (symbol >> shift) & 1 != 0;
            self.encode_bit(&mut bm[model], bit);
            model = (model << 1) | bit as usize;
        }
        self.encode_bit(&mut bm[model], symbol & 1 != 0);
    }

    /// Encode an 8-bit tree symbol (plain literal, length high range).
    pub fn encode_tree8(&mut self, bm: &mut [BitModel], symbol: u32) {
        let mut model = 1usize;
        for i in (0..8).rev() {
            let bit = (symbol >> i) & 1 != 0;
            self.encode_bit(&mut bm[model], bit);
            model = (model << 1) | bit as usize;
        }
    }

    /// Encode a tree symbol, LSB first (distance low bits / alignment).
    pub fn encode_tree_reversed(&mut self, bm: &mut [BitModel], mut symbol: u32, num_bits: u32) {
        let mut model = 1usize;
        for _ in 0..num_bits {
            let bit = symbol & 1 != 0;
            symbol >>= 1;
            self.encode_bit(&mut bm[model], bit);
            model = (model << 1) | bit as usize;
        }
    }

    /// Encode a literal byte in the "matched" context, biased by the byte at
    /// the current rep0 distance.
    pub fn encode_matched(&mut self, bm: &mut [BitModel], symbol: u8, match_byte: u8) {
        let mut mask = 0x100u32;
        let mut symbol = symbol as u32 | mask;
        let mut match_byte = match_byte as u32;
        loop {
            match_byte <<= 1;
            let match_bit = match_byte & mask;
            symbol <<= 1;
            let bit = symbol & 0x100 != 0;
            self.encode_bit(&mut bm[(symbol >> 9) as usize + match_bit as usize + mask as usize], bit);
            if symbol >= 0x10000 {
                break;
            }
            mask &= !(match_bit ^ symbol);
        }
    }

    /// Encode a length field (match length or repeat-match length).
    pub fn encode_len(&mut self, lm: &mut LenModel, symbol: u32, pos_state: usize) {
        let mut symbol = symbol - crate::constants::MIN_MATCH_LEN;
        let low_symbols = crate::constants::LEN_LOW_SYMBOLS as u32;
        let mid_symbols = crate::constants::LEN_MID_SYMBOLS as u32;
        let mut bit = symbol >= low_symbols;
        self.encode_bit(&mut lm.choice1, bit);
        if !bit {
            self.encode_tree3(&mut lm.bm_low[pos_state], symbol);
            return;
        }
        symbol -= low_symbols;
        bit = symbol >= mid_symbols;
        self.encode_bit(&mut lm.choice2, bit);
        if !bit {
            self.encode_tree3(&mut lm.bm_mid[pos_state], symbol);
        } else {
            self.encode_tree8(&mut lm.bm_high, symbol - mid_symbols);
        }
    }
}

/// Binary range decoder. Pulls coded bytes from its own input
/// [`CircularBuffer`], fed by [`RangeDecoder::write_data`].
pub struct RangeDecoder {
    cb: CircularBuffer,
    member_position: u64,
    code: u32,
    range: u32,
    at_stream_end: bool,
    reload_pending: bool,
}

impl RangeDecoder {
    /// Create a decoder with an empty input buffer.
    pub fn new() -> Self {
        Self {
            cb: CircularBuffer::new(65536 + RD_MIN_AVAILABLE_BYTES),
            member_position: 0,
            code: 0,
            range: 0xFFFF_FFFF,
            at_stream_end: false,
            reload_pending: false,
        }
    }

    /// `true` if all input has been consumed and no more will arrive.
    pub fn finished(&self) -> bool {
        self.at_stream_end && self.cb.is_empty()
    }

    /// Mark the input stream as ended: no more bytes will be written.
    pub fn finish(&mut self) {
        self.at_stream_end = true;
    }

    /// `true` if at least [`RD_MIN_AVAILABLE_BYTES`] are buffered, the
    /// threshold under which decoding one symbol is guaranteed safe.
    pub fn enough_available_bytes(&self) -> bool {
        self.cb.used_bytes() >= RD_MIN_AVAILABLE_BYTES
    }

    /// Number of compressed bytes currently buffered.
    pub fn available_bytes(&self) -> usize {
        self.cb.used_bytes()
    }

    /// Number of bytes of free space for more compressed input (0 once the
    /// stream has ended).
    pub fn free_bytes(&self) -> usize {
        if self.at_stream_end {
            0
        } else {
            self.cb.free_bytes()
        }
    }

    /// Push more compressed bytes into the input ring.
    pub fn write_data(&mut self, data: &[u8]) -> usize {
        if self.at_stream_end || data.is_empty() {
            return 0;
        }
        self.cb.write_data(data)
    }

    /// Absolute byte position reached within the current member.
    pub fn member_position(&self) -> u64 {
        self.member_position
    }

    /// Discard all buffered input, returning the total size consumed so far
    /// (used when giving up on a truncated/corrupt stream).
    pub fn purge(&mut self) -> u64 {
        let size = self.member_position + self.cb.used_bytes() as u64;
        self.cb.reset();
        self.member_position = 0;
        self.at_stream_end = true;
        size
    }

    /// Reset to start decoding a new member from scratch.
    pub fn reset(&mut self) {
        self.cb.reset();
        self.member_position = 0;
        self.at_stream_end = false;
    }

    /// Roll back `size` bytes already consumed, e.g. after misreading the
    /// start of what turns out to be a new member's header.
    pub fn unread_data(&mut self, size: usize) -> bool {
        if size as u64 > self.member_position || !self.cb.unread_data(size) {
            return false;
        }
        self.member_position -= size as u64;
        true
    }

    /// Pull up to `out.len()` raw (not range-decoded) bytes straight out of
    /// the input ring, advancing `member_position` the same as
    /// [`RangeDecoder::get_byte`] would. Used to consume the 6-byte member
    /// header before [`RangeDecoder::load_initial_state`] takes over.
    pub fn read_raw_prefix(&mut self, out: &mut [u8]) -> usize {
        let n = self.cb.read_data(out);
        self.member_position += n as u64;
        n
    }

    /// Scan the input ring for the lzip magic followed by a header that
    /// validates, for recovering synchronization after corrupt data.
    /// Returns `(found, bytes_skipped)`.
    pub fn find_header(&mut self) -> (bool, u64) {
        let mut skipped = 0u64;
        loop {
            if self.cb.is_empty() {
                return (false, skipped);
            }
            if self.cb.peek_front() == crate::constants::LZIP_MAGIC[0] {
                if let Some(header) = self.cb.peek_front_n::<6>() {
                    if MemberHeader::from_bytes(header).verify() {
                        return (true, skipped);
                    }
                } else {
                    return (false, skipped);
                }
            }
            self.cb.get_byte();
            skipped += 1;
        }
    }

    fn get_byte(&mut self) -> u8 {
        if self.finished() {
            return 0xFF;
        }
        self.member_position += 1;
        self.cb.get_byte()
    }

    fn try_reload(&mut self) -> bool {
        if self.reload_pending && self.available_bytes() >= 5 {
            self.reload_pending = false;
            self.code = 0;
            for _ in 0..5 {
                self.code = (self.code << 8) | self.get_byte() as u32;
            }
            self.range = 0xFFFF_FFFF;
        }
        !self.reload_pending
    }

    /// Queue a reload of `code`/`range` from the next 5 input bytes (done at
    /// the start of every member, once the header has been consumed).
    pub fn load_initial_state(&mut self) -> bool {
        self.reload_pending = true;
        self.try_reload()
    }

    fn normalize(&mut self) {
        if self.range <= 0x00FF_FFFF {
            self.range <<= 8;
            self.code = (self.code << 8) | self.get_byte() as u32;
        }
    }

    /// Decode `num_bits` at a fixed 50% probability (MSB first).
    pub fn decode_direct(&mut self, num_bits: u32) -> u32 {
        let mut symbol = 0u32;
        for _ in 0..num_bits {
            self.normalize();
            self.range >>= 1;
            let bit = (self.code >= self.range) as u32;
            symbol = (symbol << 1) + bit;
            self.code -= self.range & (0u32.wrapping_sub(bit));
        }
        symbol
    }

    /// Decode one bit against an adaptive probability, updating it.
    pub fn decode_bit(&mut self, probability: &mut BitModel) -> u32 {
        self.normalize();
        let bound = (self.range >> BIT_MODEL_TOTAL_BITS) * probability.0;
        if self.code < bound {
            probability.0 += (BIT_MODEL_TOTAL - probability.0) >> BIT_MODEL_MOVE_BITS;
            self.range = bound;
            0
        } else {
            probability.0 -= probability.0 >> BIT_MODEL_MOVE_BITS;
            self.code -= bound;
            self.range -= bound;
            1
        }
    }

    /// Decode a 3-bit tree symbol.
    pub fn decode_tree3(&mut self, bm: &mut [BitModel]) -> u32 {
        let mut symbol = 2 | self.decode_bit(&mut bm[1]);
        symbol = (symbol << 1) | self.decode_bit(&mut bm[symbol as usize]);
        symbol = (symbol << 1) | self.decode_bit(&mut bm[symbol as usize]);
        symbol & 7
    }

    /// Decode a 6-bit tree symbol (distance slot).
    pub fn decode_tree6(&mut self, bm: &mut [BitModel]) -> u32 {
        let mut symbol = 2 | self.decode_bit(&mut bm[1]);
        for _ in 0..4 {
            symbol = (symbol << 1) | self.decode_bit(&mut bm[symbol as usize]);
        }
        symbol & 0x3F
    }

    /// Decode an 8-bit tree symbol (plain literal, length high range).
    pub fn decode_tree8(&mut self, bm: &mut [BitModel]) -> u32 {
        let mut symbol = 1u32;
        for _ in 0..8 {
            symbol = (symbol << 1) | self.decode_bit(&mut bm[symbol as usize]);
        }
        symbol & 0xFF
    }

    /// Decode a tree symbol, LSB first.
    pub fn decode_tree_reversed(&mut self, bm: &mut [BitModel], num_bits: u32) -> u32 {
        let mut model = 1usize;
        let mut symbol = 0u32;
        for i in 0..num_bits {
            let bit = self.decode_bit(&mut bm[model]);
            model = (model << 1) + bit as usize;
            symbol |= bit << i;
        }
        symbol
    }

    /// Decode a 4-bit tree symbol, LSB first (distance alignment bits).
    pub fn decode_tree_reversed4(&mut self, bm: &mut [BitModel]) -> u32 {
        self.decode_tree_reversed(bm, 4)
    }

    /// Decode a literal in the "matched" context, biased by `match_byte`.
    pub fn decode_matched(&mut self, bm: &mut [BitModel], match_byte: u8) -> u8 {
        let mut symbol = 1u32;
        let mut mask = 0x100u32;
        let mut match_byte = match_byte as u32;
        loop {
            match_byte <<= 1;
            let match_bit = match_byte & mask;
            let bit = self.decode_bit(&mut bm[(symbol + match_bit + mask) as usize]);
            symbol = (symbol << 1) + bit;
            if symbol > 0xFF {
                return (symbol & 0xFF) as u8;
            }
            mask &= !(match_bit ^ (bit << 8));
        }
    }

    /// Decode a length field (match length or repeat-match length).
    pub fn decode_len(&mut self, lm: &mut LenModel, pos_state: usize) -> u32 {
        if self.decode_bit(&mut lm.choice1) == 0 {
            return self.decode_tree3(&mut lm.bm_low[pos_state]);
        }
        if self.decode_bit(&mut lm.choice2) == 0 {
            return crate::constants::LEN_LOW_SYMBOLS as u32
                + self.decode_tree3(&mut lm.bm_mid[pos_state]);
        }
        crate::constants::LEN_LOW_SYMBOLS as u32
            + crate::constants::LEN_MID_SYMBOLS as u32
            + self.decode_tree8(&mut lm.bm_high)
    }
}

impl Default for RangeDecoder {
    fn default() -> Self {
        Self::new()
    }
}
