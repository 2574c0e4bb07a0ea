//! LZ decoder (C7): reverses the encoder's literal/match/rep decisions back
//! into the dictionary, which doubles as the output ring callers `read`
//! from.
//!
//! The dictionary is a plain [`CircularBuffer`] — matches copy from it by
//! peeking backward from the write cursor (never from the reader's lagging
//! `get` cursor), so bytes stay available for back-references for as long
//! as the buffer's capacity (at least `dictionary_size + MAX_MATCH_LEN`)
//! keeps them from being overwritten.

use lzip_core::crc::Crc32;
use lzip_core::error::LzError;

use crate::circular_buffer::CircularBuffer;
use crate::constants::{
    END_OF_MEMBER_MARKER, MAX_MATCH_LEN, MIN_MATCH_LEN, POS_STATE_MASK, get_len_state,
    get_lit_state,
};
use crate::model::{LzmaModel, State};
use crate::range_coder::RangeDecoder;

/// Result of one bounded decoding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// The range decoder's input ring is too empty to guarantee forward
    /// progress; the caller should feed more compressed bytes.
    NeedsInput,
    /// The dictionary (output) ring is too full; the caller should drain
    /// decoded bytes with [`LzDecoder::read`] first.
    NeedsOutput,
    /// The end-of-member marker was decoded; the caller should now read
    /// and verify the 20-byte trailer.
    MemberEnd,
}

/// LZMA literal/match/rep decoder, writing decompressed bytes into its
/// internal dictionary ring.
pub struct LzDecoder {
    dictionary: CircularBuffer,
    model: LzmaModel,
    state: State,
    reps: [u32; 4],
    crc: Crc32,
    dictionary_size: u32,
    data_position: u64,
    member_finished: bool,
}

impl LzDecoder {
    /// Build a decoder for a member with the given dictionary size. The
    /// backing ring is sized generously above `dictionary_size` so a full
    /// `MAX_MATCH_LEN`-byte match can always be written in one go.
    pub fn new(dictionary_size: u32) -> Self {
        let capacity = (dictionary_size as usize).max(1 << 16) + MAX_MATCH_LEN as usize;
        Self {
            dictionary: CircularBuffer::new(capacity),
            model: LzmaModel::new(1 << crate::constants::LITERAL_CONTEXT_BITS),
            state: State::new(),
            reps: [0; 4],
            crc: Crc32::new(),
            dictionary_size,
            data_position: 0,
            member_finished: false,
        }
    }

    /// Reset to start decoding a fresh member, keeping the dictionary
    /// buffer's allocation but discarding its contents.
    pub fn reset(&mut self, dictionary_size: u32) {
        let capacity = (dictionary_size as usize).max(1 << 16) + MAX_MATCH_LEN as usize;
        self.dictionary = CircularBuffer::new(capacity);
        self.model = LzmaModel::new(1 << crate::constants::LITERAL_CONTEXT_BITS);
        self.state = State::new();
        self.reps = [0; 4];
        self.crc = Crc32::new();
        self.dictionary_size = dictionary_size;
        self.data_position = 0;
        self.member_finished = false;
    }

    /// Total decompressed bytes produced so far in this member.
    pub fn data_position(&self) -> u64 {
        self.data_position
    }

    /// Running (un-finalized) CRC-32 of all bytes decoded so far.
    pub fn crc(&self) -> u32 {
        self.crc.value()
    }

    /// `true` once the end-of-member marker has been seen.
    pub fn member_finished(&self) -> bool {
        self.member_finished
    }

    /// Pull up to `out.len()` decompressed bytes into `out`.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        self.dictionary.read_data(out)
    }

    /// Bytes currently buffered and ready for [`LzDecoder::read`].
    pub fn available_output(&self) -> usize {
        self.dictionary.used_bytes()
    }

    fn put_byte(&mut self, byte: u8) {
        self.dictionary.put_byte(byte);
        self.crc.update(&[byte]);
        self.data_position += 1;
    }

    fn check_distance(&self, dist: u32) -> Result<(), LzError> {
        if dist >= self.dictionary_size {
            return Err(LzError::data_error("match distance exceeds dictionary size"));
        }
        // post-wrap: only the dictionary_size bound applies, mirroring lzlib.c's !pos_wrapped guard
        if self.data_position < self.dictionary_size as u64 && dist as u64 >= self.data_position {
            return Err(LzError::data_error("match distance exceeds data decoded so far"));
        }
        Ok(())
    }

    fn copy_match(&mut self, dist: u32, len: u32) -> Result<(), LzError> {
        self.check_distance(dist)?;
        for _ in 0..len {
            let byte = self.dictionary.peek(dist as usize);
            self.put_byte(byte);
        }
        Ok(())
    }

    fn decode_distance(&mut self, rdec: &mut RangeDecoder, len: u32) -> u32 {
        let len_state = get_len_state(len);
        let slot = rdec.decode_tree6(&mut self.model.dis_slot[len_state]);
        if slot < crate::constants::START_DIS_MODEL {
            return slot;
        }
        let direct_bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << direct_bits;
        if slot < crate::constants::END_DIS_MODEL {
            let offset = (base - slot) as usize;
            base + rdec.decode_tree_reversed(&mut self.model.dis_special[offset..], direct_bits)
        } else {
            base + (rdec.decode_direct(direct_bits - crate::constants::DIS_ALIGN_BITS) << crate::constants::DIS_ALIGN_BITS)
                + rdec.decode_tree_reversed4(&mut self.model.dis_align)
        }
    }

    /// Decode symbols until the dictionary or the input runs dry, or the
    /// end-of-member marker is reached.
    pub fn decode_member(&mut self, rdec: &mut RangeDecoder) -> Result<DecodeStep, LzError> {
        loop {
            if self.member_finished {
                return Ok(DecodeStep::MemberEnd);
            }
            if self.dictionary.free_bytes() < MAX_MATCH_LEN as usize {
                return Ok(DecodeStep::NeedsOutput);
            }
            if !rdec.enough_available_bytes() && !rdec.finished() {
                return Ok(DecodeStep::NeedsInput);
            }

            let pos_state = (self.data_position as u32 & POS_STATE_MASK) as usize;
            let st = self.state.index();
            if rdec.decode_bit(&mut self.model.is_match[st][pos_state]) == 0 {
                let prev_byte = if self.data_position == 0 { 0 } else { self.dictionary.peek(0) };
                let lit_state = get_lit_state(prev_byte);
                let byte = if self.state.is_char() {
                    rdec.decode_tree8(&mut self.model.literal[lit_state]) as u8
                } else {
                    let match_byte = self.dictionary.peek(self.reps[0] as usize);
                    rdec.decode_matched(&mut self.model.literal[lit_state], match_byte)
                };
                self.put_byte(byte);
                self.state.after_literal();
                continue;
            }

            if rdec.decode_bit(&mut self.model.is_rep[st]) == 0 {
                // Normal (non-repeat) match.
                let len = MIN_MATCH_LEN + rdec.decode_len(&mut self.model.match_len, pos_state);
                let dist = self.decode_distance(rdec, len);

                if dist == END_OF_MEMBER_MARKER {
                    // A marker is not a real match: leave `reps`/`state` exactly
                    // as they were so decoding can resume unaffected after a
                    // sync-flush reload.
                    if len == MIN_MATCH_LEN {
                        self.member_finished = true;
                        return Ok(DecodeStep::MemberEnd);
                    } else if len == MIN_MATCH_LEN + 1 {
                        rdec.load_initial_state();
                        continue;
                    } else {
                        return Err(LzError::data_error("invalid end-of-member marker length"));
                    }
                }

                self.reps[3] = self.reps[2];
                self.reps[2] = self.reps[1];
                self.reps[1] = self.reps[0];
                self.reps[0] = dist;
                self.state.after_match();
                self.copy_match(dist, len)?;
                continue;
            }

            if rdec.decode_bit(&mut self.model.is_rep0[st]) == 0 {
                if rdec.decode_bit(&mut self.model.is_rep0_long[st][pos_state]) == 0 {
                    // Short rep: single byte from rep0.
                    let byte = self.dictionary.peek(self.reps[0] as usize);
                    self.put_byte(byte);
                    self.state.after_short_rep();
                } else {
                    let len = MIN_MATCH_LEN + rdec.decode_len(&mut self.model.rep_len, pos_state);
                    self.state.after_rep();
                    self.copy_match(self.reps[0], len)?;
                }
                continue;
            }

            let dist = if rdec.decode_bit(&mut self.model.is_rep1[st]) == 0 {
                self.reps[1]
            } else if rdec.decode_bit(&mut self.model.is_rep2[st]) == 0 {
                self.reps[2]
            } else {
                let d = self.reps[3];
                self.reps[3] = self.reps[2];
                d
            };
            self.reps[2] = self.reps[1];
            self.reps[1] = self.reps[0];
            self.reps[0] = dist;

            let len = MIN_MATCH_LEN + rdec.decode_len(&mut self.model.rep_len, pos_state);
            self.state.after_rep();
            self.copy_match(dist, len)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::MemberHeader;
    use crate::range_coder::RangeEncoder;

    /// Encode a tiny, hand-built sequence (one literal, then a short-rep)
    /// directly through the range coder primitives and check the decoder
    /// reverses it to the same bytes, exercising the wiring between
    /// `RangeDecoder`, `LzmaModel`, and `CircularBuffer::peek`.
    #[test]
    fn decodes_literal_then_short_rep() {
        let ds = 1 << 16;
        let mut enc = RangeEncoder::new(ds, 4096).unwrap();
        let mut model = LzmaModel::new(1 << crate::constants::LITERAL_CONTEXT_BITS);
        let mut state = State::new();

        // pos_state = 0, literal 'A'.
        enc.encode_bit(&mut model.is_match[state.index()][0], false);
        enc.encode_tree8(&mut model.literal[get_lit_state(0)], b'A' as u32);
        state.after_literal();

        // pos_state = 1, short rep of 'A' (dist 0).
        enc.encode_bit(&mut model.is_match[state.index()][1], true);
        enc.encode_bit(&mut model.is_rep[state.index()], true);
        enc.encode_bit(&mut model.is_rep0[state.index()], false);
        enc.encode_bit(&mut model.is_rep0_long[state.index()][1], false);
        state.after_short_rep();

        // End marker: IS_MATCH=1, IS_REP=0, dist=0xFFFFFFFF, len=2.
        let pos_state = 2usize & crate::constants::POS_STATE_MASK as usize;
        enc.encode_bit(&mut model.is_match[state.index()][pos_state], true);
        enc.encode_bit(&mut model.is_rep[state.index()], false);
        enc.encode_len(&mut model.match_len, MIN_MATCH_LEN, pos_state);
        let slot = 63u32; // top distance slot, guaranteed >= END_DIS_MODEL
        enc.encode_tree6(&mut model.dis_slot[get_len_state(MIN_MATCH_LEN)], slot);
        let direct_bits = (slot >> 1) - 1;
        enc.encode_direct((END_OF_MEMBER_MARKER >> crate::constants::DIS_ALIGN_BITS) & ((1 << (direct_bits - crate::constants::DIS_ALIGN_BITS)) - 1), direct_bits - crate::constants::DIS_ALIGN_BITS);
        enc.encode_tree_reversed(&mut model.dis_align, END_OF_MEMBER_MARKER & 0xF, 4);
        enc.flush();

        let mut out = vec![0u8; 256];
        let n = enc.read_data(&mut out);
        out.truncate(n);

        let mut rdec = RangeDecoder::new();
        rdec.write_data(&out);
        rdec.finish();
        let mut header = [0u8; crate::constants::HEADER_SIZE];
        rdec.read_raw_prefix(&mut header);
        assert!(MemberHeader::from_bytes(header).verify());
        rdec.load_initial_state();

        let mut dec = LzDecoder::new(ds);
        let step = dec.decode_member(&mut rdec).unwrap();
        assert_eq!(step, DecodeStep::MemberEnd);
        assert_eq!(dec.data_position(), 2);

        let mut output = [0u8; 2];
        dec.read(&mut output);
        assert_eq!(&output, b"AA");
    }
}
