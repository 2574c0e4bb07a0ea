//! Fast LZ encoder (C8): a single greedy pass over the match finder's
//! hash4 chain, choosing between a literal, a short rep, a full rep, or a
//! normal match by comparing their range-coded bit costs — no lookahead
//! trellis, unlike the optimal encoder.

use lzip_core::crc::Crc32;

use crate::constants::{
    END_OF_MEMBER_MARKER, MAX_MARKER_SIZE, MAX_MATCH_LEN, MIN_MATCH_LEN, NUM_REP_DISTANCES,
    POS_STATE_MASK, TRAILER_SIZE, get_len_state, get_lit_state,
};
use crate::matchfinder::MatchFinder;
use crate::member::MemberTrailer;
use crate::model::{LzmaModel, State};
use crate::prices::{get_slot, price0, price1};
use crate::range_coder::RangeEncoder;

const MIN_DICTIONARY_SIZE: u64 = crate::constants::MIN_DICTIONARY_SIZE as u64;
const MAX_MEMBER_SIZE: u64 = 0x0008_0000_0000_0000;

/// Result of one bounded encoding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStep {
    /// The match finder's input window is too empty; feed more raw bytes.
    NeedsInput,
    /// The output ring is too full; drain it with
    /// [`FastEncoder::read_data`] first.
    NeedsOutput,
    /// The member has been closed out with an end marker and trailer; no
    /// further bytes will be produced until [`FastEncoder::reset`].
    MemberFinished,
}

/// Greedy hash-chain LZMA encoder producing a complete lzip member.
pub struct FastEncoder {
    mf: MatchFinder,
    renc: RangeEncoder,
    model: LzmaModel,
    state: State,
    reps: [u32; NUM_REP_DISTANCES],
    crc: Crc32,
    member_size_limit: u64,
    member_finished: bool,
}

impl FastEncoder {
    /// Build an encoder bounded to `member_size` bytes of output (clamped
    /// to lzip's `[min_dictionary_size, 2^51)` legal range minus trailer and
    /// marker slack).
    pub fn new(dictionary_size: u32, member_size: u64) -> Option<Self> {
        let renc = RangeEncoder::new(dictionary_size, MAX_MARKER_SIZE)?;
        let mut enc = Self {
            mf: MatchFinder::new(dictionary_size, 16, false),
            renc,
            model: LzmaModel::new(1 << crate::constants::LITERAL_CONTEXT_BITS),
            state: State::new(),
            reps: [0; NUM_REP_DISTANCES],
            crc: Crc32::new(),
            member_size_limit: 0,
            member_finished: false,
        };
        enc.set_member_size_limit(member_size);
        Some(enc)
    }

    fn set_member_size_limit(&mut self, member_size: u64) {
        let clamped = member_size.clamp(MIN_DICTIONARY_SIZE, MAX_MEMBER_SIZE);
        self.member_size_limit = clamped - TRAILER_SIZE as u64 - MAX_MARKER_SIZE as u64;
    }

    /// Reset to encode a fresh member with a new dictionary size and size
    /// budget, keeping allocations.
    pub fn reset(&mut self, dictionary_size: u32, member_size: u64) -> Option<()> {
        self.renc.reset(dictionary_size)?;
        self.mf = MatchFinder::new(dictionary_size, 16, false);
        self.model = LzmaModel::new(1 << crate::constants::LITERAL_CONTEXT_BITS);
        self.state = State::new();
        self.reps = [0; NUM_REP_DISTANCES];
        self.crc = Crc32::new();
        self.member_finished = false;
        self.set_member_size_limit(member_size);
        Some(())
    }

    /// Feed raw input bytes into the match finder's window.
    pub fn write_data(&mut self, data: &[u8]) -> usize {
        self.mf.write_data(data)
    }

    /// Mark the input as complete; once the window drains, the member is
    /// closed out with an end-of-member marker.
    pub fn finish(&mut self) {
        self.mf.finish();
    }

    /// Drain up to `out.len()` compressed bytes.
    pub fn read_data(&mut self, out: &mut [u8]) -> usize {
        self.renc.read_data(out)
    }

    pub fn member_finished(&self) -> bool {
        self.member_finished
    }

    pub fn data_position(&self) -> u64 {
        self.mf.data_position()
    }

    /// Absolute byte position reached within the current member's output.
    pub fn member_position(&self) -> u64 {
        self.renc.member_position()
    }

    /// Running CRC-32 of all input bytes encoded so far.
    pub fn crc(&self) -> u32 {
        self.crc.value()
    }

    /// Patch the already-emitted header with a smaller dictionary size,
    /// e.g. when closing a member that never got any data. Fails (and
    /// changes nothing) once any compressed bytes have been drained.
    pub fn try_shrink_header(&mut self, dictionary_size: u32) -> bool {
        self.renc.try_shrink_header(dictionary_size)
    }

    fn encode_pair(&mut self, dis: u32, len: u32, pos_state: usize) {
        self.renc.encode_len(&mut self.model.match_len, len, pos_state);
        let slot = get_slot(dis);
        self.renc
            .encode_tree6(&mut self.model.dis_slot[get_len_state(len)], slot as u32);
        if slot < crate::constants::START_DIS_MODEL as u8 {
            return;
        }
        let direct_bits = (slot as u32 >> 1) - 1;
        let base = (2 | (slot as u32 & 1)) << direct_bits;
        let direct_dis = dis - base;
        if (slot as u32) < crate::constants::END_DIS_MODEL {
            let offset = (base - slot as u32) as usize;
            self.renc.encode_tree_reversed(
                &mut self.model.dis_special[offset..],
                direct_dis,
                direct_bits,
            );
        } else {
            self.renc
                .encode_direct(direct_dis >> crate::constants::DIS_ALIGN_BITS, direct_bits - crate::constants::DIS_ALIGN_BITS);
            self.renc
                .encode_tree_reversed(&mut self.model.dis_align, direct_dis, crate::constants::DIS_ALIGN_BITS);
        }
    }

    fn encode_literal(&mut self, prev_byte: u8, symbol: u8) {
        self.renc
            .encode_tree8(&mut self.model.literal[get_lit_state(prev_byte)], symbol as u32);
    }

    fn encode_matched(&mut self, prev_byte: u8, symbol: u8, match_byte: u8) {
        self.renc
            .encode_matched(&mut self.model.literal[get_lit_state(prev_byte)], symbol, match_byte);
    }

    fn price_literal(&self, prev_byte: u8, symbol: u8) -> i32 {
        crate::prices::price_symbol8(&self.model.literal[get_lit_state(prev_byte)], symbol as u32)
    }

    fn price_matched(&self, prev_byte: u8, symbol: u8, match_byte: u8) -> i32 {
        crate::prices::price_matched(&self.model.literal[get_lit_state(prev_byte)], symbol as u32, match_byte as u32)
    }

    /// Write the end-of-member marker and trailer once there's nothing left
    /// to encode and enough room in the output ring.
    fn try_full_flush(&mut self) {
        if self.member_finished || !self.renc.enough_free_bytes() {
            return;
        }
        let pos_state = (self.mf.data_position() as u32 & POS_STATE_MASK) as usize;
        let st = self.state.index();
        self.member_finished = true;
        self.renc.encode_bit(&mut self.model.is_match[st][pos_state], true);
        self.renc.encode_bit(&mut self.model.is_rep[st], false);
        self.encode_pair(END_OF_MEMBER_MARKER, MIN_MATCH_LEN, pos_state);
        self.renc.flush();
        let trailer = MemberTrailer::new(
            self.crc.value(),
            self.mf.data_position(),
            self.renc.member_position() + TRAILER_SIZE as u64,
        );
        self.renc.write_raw(trailer.as_bytes());
    }

    /// Arm a pending sync flush: the next call to `encode_member` drains
    /// whatever input is already buffered, then emits a flush marker instead
    /// of waiting for more input or for the member to close.
    pub fn request_sync_flush(&mut self) {
        self.mf.set_sync_flush_pending();
    }

    /// Emit the `(0xFFFFFFFF, 3)` sync marker once all buffered input has
    /// been consumed. Unlike `try_full_flush`, this does not end the member:
    /// no trailer is written and encoding can resume once more data arrives.
    fn try_sync_flush(&mut self) -> bool {
        if !self.mf.sync_flush_ready() || !self.renc.enough_free_bytes() {
            return false;
        }
        let pos_state = (self.mf.data_position() as u32 & POS_STATE_MASK) as usize;
        let st = self.state.index();
        self.renc.encode_bit(&mut self.model.is_match[st][pos_state], true);
        self.renc.encode_bit(&mut self.model.is_rep[st], false);
        self.encode_pair(END_OF_MEMBER_MARKER, MIN_MATCH_LEN + 1, pos_state);
        self.renc.flush();
        self.mf.clear_sync_flush_pending();
        true
    }

    /// Encode as much as the match finder's window and the output ring
    /// allow, stopping to ask for more input/output room, or finishing the
    /// member outright once the input is exhausted.
    pub fn encode_member(&mut self) -> EncodeStep {
        if self.member_finished {
            return EncodeStep::MemberFinished;
        }
        if self.renc.member_position() >= self.member_size_limit {
            self.try_full_flush();
            return if self.member_finished { EncodeStep::MemberFinished } else { EncodeStep::NeedsOutput };
        }

        if self.mf.data_position() == 0 && !self.mf.data_finished() {
            if !self.mf.enough_available_bytes() || !self.renc.enough_free_bytes() {
                if self.try_sync_flush() {
                    return EncodeStep::NeedsOutput;
                }
                return if self.mf.enough_available_bytes() {
                    EncodeStep::NeedsOutput
                } else {
                    EncodeStep::NeedsInput
                };
            }
            let cur_byte = self.mf.peek(0);
            self.renc.encode_bit(&mut self.model.is_match[self.state.index()][0], false);
            self.encode_literal(0, cur_byte);
            self.crc.update(&[cur_byte]);
            self.mf.reset_key4();
            self.mf.update_and_move(1);
        }

        while !self.mf.data_finished() && self.renc.member_position() < self.member_size_limit {
            if !self.mf.enough_available_bytes() || !self.renc.enough_free_bytes() {
                if self.try_sync_flush() {
                    return EncodeStep::NeedsOutput;
                }
                return if self.mf.enough_available_bytes() {
                    EncodeStep::NeedsOutput
                } else {
                    EncodeStep::NeedsInput
                };
            }

            let (main_len, match_distance) = self.mf.longest_match_len();
            let pos_state = (self.mf.data_position() as u32 & POS_STATE_MASK) as usize;

            let mut rep_len = 0usize;
            let mut rep = 0usize;
            for (i, &r) in self.reps.iter().enumerate() {
                let tlen = self.mf.true_match_len(0, r as usize + 1);
                if tlen > rep_len {
                    rep_len = tlen;
                    rep = i;
                }
            }

            if rep_len > MIN_MATCH_LEN as usize && rep_len + 3 > main_len {
                let len = rep_len as u32;
                self.crc.update(self.mf.current_bytes(rep_len));
                let st = self.state.index();
                self.renc.encode_bit(&mut self.model.is_match[st][pos_state], true);
                self.renc.encode_bit(&mut self.model.is_rep[st], true);
                self.renc.encode_bit(&mut self.model.is_rep0[st], rep != 0);
                if rep == 0 {
                    self.renc.encode_bit(&mut self.model.is_rep0_long[st][pos_state], true);
                } else {
                    self.renc.encode_bit(&mut self.model.is_rep1[st], rep > 1);
                    if rep > 1 {
                        self.renc.encode_bit(&mut self.model.is_rep2[st], rep > 2);
                    }
                    let distance = self.reps[rep];
                    for i in (1..=rep).rev() {
                        self.reps[i] = self.reps[i - 1];
                    }
                    self.reps[0] = distance;
                }
                self.state.after_rep();
                self.renc.encode_len(&mut self.model.rep_len, len, pos_state);
                self.mf.move_pos();
                self.mf.update_and_move(rep_len - 1);
                continue;
            }

            if main_len > MIN_MATCH_LEN as usize {
                self.crc.update(self.mf.current_bytes(main_len));
                let st = self.state.index();
                self.renc.encode_bit(&mut self.model.is_match[st][pos_state], true);
                self.renc.encode_bit(&mut self.model.is_rep[st], false);
                self.state.after_match();
                for i in (1..NUM_REP_DISTANCES).rev() {
                    self.reps[i] = self.reps[i - 1];
                }
                self.reps[0] = match_distance as u32;
                self.encode_pair(match_distance as u32, main_len as u32, pos_state);
                self.mf.move_pos();
                self.mf.update_and_move(main_len - 1);
                continue;
            }

            let prev_byte = self.mf.peek(1);
            let cur_byte = self.mf.peek(0);
            let match_byte = self.mf.peek(self.reps[0] as usize + 1);
            // `longest_match_len` above already threaded this position into
            // the hash chain as a side effect of its own lookup; only the
            // cursor needs to move, not a second hash insertion.
            self.mf.move_pos();
            self.crc.update(&[cur_byte]);

            let st = self.state.index();
            if match_byte == cur_byte {
                let short_rep_price = price1(self.model.is_match[st][pos_state])
                    + price1(self.model.is_rep[st])
                    + price0(self.model.is_rep0[st])
                    + price0(self.model.is_rep0_long[st][pos_state]);
                let mut price = price0(self.model.is_match[st][pos_state]);
                price += if self.state.is_char() {
                    self.price_literal(prev_byte, cur_byte)
                } else {
                    self.price_matched(prev_byte, cur_byte, match_byte)
                };
                if short_rep_price < price {
                    self.renc.encode_bit(&mut self.model.is_match[st][pos_state], true);
                    self.renc.encode_bit(&mut self.model.is_rep[st], true);
                    self.renc.encode_bit(&mut self.model.is_rep0[st], false);
                    self.renc.encode_bit(&mut self.model.is_rep0_long[st][pos_state], false);
                    self.state.after_short_rep();
                    continue;
                }
            }

            self.renc.encode_bit(&mut self.model.is_match[st][pos_state], false);
            if self.state.is_char() {
                self.encode_literal(prev_byte, cur_byte);
            } else {
                self.encode_matched(prev_byte, cur_byte, match_byte);
            }
            self.state.after_literal();
        }

        self.try_full_flush();
        if self.member_finished { EncodeStep::MemberFinished } else { EncodeStep::NeedsOutput }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{DecodeStep, LzDecoder};
    use crate::member::MemberHeader;
    use crate::range_coder::RangeDecoder;

    #[test]
    fn roundtrips_repetitive_input() {
        let ds = 1 << 16;
        let mut enc = FastEncoder::new(ds, 1 << 20).unwrap();
        let input = b"the quick brown fox the quick brown fox jumps over the lazy dog";
        enc.write_data(input);
        enc.finish();

        let mut compressed = Vec::new();
        loop {
            match enc.encode_member() {
                EncodeStep::MemberFinished => break,
                EncodeStep::NeedsOutput => {
                    let mut buf = [0u8; 256];
                    let n = enc.read_data(&mut buf);
                    compressed.extend_from_slice(&buf[..n]);
                }
                EncodeStep::NeedsInput => unreachable!("all input was written up front"),
            }
        }
        let mut buf = [0u8; 4096];
        let n = enc.read_data(&mut buf);
        compressed.extend_from_slice(&buf[..n]);

        let mut rdec = RangeDecoder::new();
        rdec.write_data(&compressed);
        rdec.finish();
        let mut header = [0u8; crate::constants::HEADER_SIZE];
        rdec.read_raw_prefix(&mut header);
        assert!(MemberHeader::from_bytes(header).verify());
        rdec.load_initial_state();

        let mut dec = LzDecoder::new(ds);
        let step = dec.decode_member(&mut rdec).unwrap();
        assert_eq!(step, DecodeStep::MemberEnd);

        let mut out = vec![0u8; input.len()];
        dec.read(&mut out);
        assert_eq!(&out, input);
        assert_eq!(dec.crc(), enc.crc.value());
    }
}
