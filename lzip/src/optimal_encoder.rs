//! Optimal LZ encoder (C9): a forward dynamic-programming trellis over the
//! match finder's binary-tree candidates, picking the cheapest literal/rep/
//! match sequence by actual range-coded bit cost rather than the fast
//! encoder's greedy heuristics.
//!
//! Trials are priced one step at a time into [`Trial`] slots and replayed
//! backward from whichever slot turned out cheapest, the way a Viterbi
//! decode reconstructs its winning path. Besides the plain single-step moves
//! (literal, short rep, every rep length, every new match length), the
//! trellis also speculates two symbols ahead: "literal then rep0-run" and
//! the three-step "rep/match then literal then rep0-run", each collapsed
//! into one [`Trial`] slot via `prev_index2` and unwound into individual
//! steps by [`OptimalEncoder::backward`].

use lzip_core::crc::Crc32;

use crate::constants::{
    DIS_ALIGN_BITS, DIS_ALIGN_SIZE, END_OF_MEMBER_MARKER, LEN_LOW_SYMBOLS, LEN_MID_SYMBOLS,
    LEN_STATES, MAX_LEN_SYMBOLS, MAX_MARKER_SIZE, MAX_MATCH_LEN, MIN_MATCH_LEN, MODELED_DISTANCES,
    NUM_REP_DISTANCES, POS_STATES, POS_STATE_MASK, START_DIS_MODEL, TRAILER_SIZE, get_len_state,
    get_lit_state,
};
use crate::matchfinder::{MatchFinder, Pair};
use crate::member::MemberTrailer;
use crate::model::{LenModel, LzmaModel, State};
use crate::prices::{
    get_slot, price0, price1, price_bit, price_matched, price_symbol3, price_symbol6,
    price_symbol8, price_symbol_reversed,
};
use crate::range_coder::RangeEncoder;

const MIN_DICTIONARY_SIZE: u64 = crate::constants::MIN_DICTIONARY_SIZE as u64;
const MAX_MEMBER_SIZE: u64 = 0x0008_0000_0000_0000;
const INFINITE_PRICE: i32 = 0x0FFF_FFFF;
const MAX_NUM_TRIALS: usize = 1 << 13;

/// `prev_index2` value meaning "this trial is a plain single step".
const SINGLE_STEP_TRIAL: i32 = -2;
/// `prev_index2` value meaning "this trial collapses a literal followed by
/// a rep0 run"; the literal sits at `prev_index - 1`.
const DUAL_STEP_TRIAL: i32 = -1;

/// Result of one bounded encoding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStep {
    /// The match finder's input window is too empty; feed more raw bytes.
    NeedsInput,
    /// The output ring is too full; drain it with
    /// [`OptimalEncoder::read_data`] first.
    NeedsOutput,
    /// The member has been closed out with an end marker and trailer; no
    /// further bytes will be produced until [`OptimalEncoder::reset`].
    MemberFinished,
}

/// One node of the trellis.
///
/// Before a backward pass, `price` is the cumulative bit cost of the
/// cheapest known path reaching this position and `prev_index` names the
/// trial it came from. After [`OptimalEncoder::backward`] rewrites the span
/// `0..=cur`, `price` instead holds the step length and `dis4` the decision
/// to take, so the range that follows can simply replay it forward.
#[derive(Clone)]
struct Trial {
    state: State,
    price: i32,
    /// `-1` literal, `0..NUM_REP_DISTANCES` a rep index, otherwise a new
    /// match distance plus `NUM_REP_DISTANCES`.
    dis4: i32,
    prev_index: i32,
    /// Distinguishes a single-step predecessor ([`SINGLE_STEP_TRIAL`]), a
    /// "literal then rep0" pair ([`DUAL_STEP_TRIAL`]), or an explicit second
    /// predecessor (a trial index) for a three-step move.
    prev_index2: i32,
    reps: [u32; NUM_REP_DISTANCES],
}

impl Trial {
    fn new() -> Self {
        Self {
            state: State::new(),
            price: INFINITE_PRICE,
            dis4: -1,
            prev_index: -1,
            prev_index2: SINGLE_STEP_TRIAL,
            reps: [0; NUM_REP_DISTANCES],
        }
    }
}

#[inline]
fn tr_update(trial: &mut Trial, price: i32, dis4: i32, prev_index: i32) {
    if price < trial.price {
        trial.price = price;
        trial.dis4 = dis4;
        trial.prev_index = prev_index;
        trial.prev_index2 = SINGLE_STEP_TRIAL;
    }
}

/// Record a "literal then rep0-run" two-step move: the literal sits at
/// `prev_index - 1`, the rep0 run starts at `prev_index`.
#[inline]
fn tr_update2(trial: &mut Trial, price: i32, prev_index: i32) {
    if price < trial.price {
        trial.price = price;
        trial.dis4 = 0;
        trial.prev_index = prev_index;
        trial.prev_index2 = DUAL_STEP_TRIAL;
    }
}

/// Record a three-step move: `prev_index2` names the trial before the first
/// match, `prev_index` the trial after the literal that follows it.
#[inline]
fn tr_update3(trial: &mut Trial, price: i32, dis4: i32, prev_index: i32, prev_index2: i32) {
    if price < trial.price {
        trial.price = price;
        trial.dis4 = dis4;
        trial.prev_index = prev_index;
        trial.prev_index2 = prev_index2;
    }
}

/// Move-to-front the rep distances after committing to decision `dis4`.
fn mtf_reps(dis4: i32, reps: &mut [u32; NUM_REP_DISTANCES]) {
    if dis4 as usize >= NUM_REP_DISTANCES {
        reps[3] = reps[2];
        reps[2] = reps[1];
        reps[1] = reps[0];
        reps[0] = dis4 as u32 - NUM_REP_DISTANCES as u32;
    } else if dis4 > 0 {
        let distance = reps[dis4 as usize];
        for i in (1..=dis4 as usize).rev() {
            reps[i] = reps[i - 1];
        }
        reps[0] = distance;
    }
}

/// Lazily refreshed length-coding price table, one row per `pos_state`.
struct LenPrices {
    len_symbols: usize,
    prices: [[i32; MAX_LEN_SYMBOLS]; POS_STATES],
}

impl LenPrices {
    fn new(match_len_limit: usize) -> Self {
        Self {
            len_symbols: match_len_limit + 1 - MIN_MATCH_LEN as usize,
            prices: [[0; MAX_LEN_SYMBOLS]; POS_STATES],
        }
    }

    fn update_prices(&mut self, lm: &LenModel) {
        for pos_state in 0..POS_STATES {
            self.update_low_mid_prices(lm, pos_state);
        }
        if self.len_symbols > LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS {
            self.update_high_prices(lm);
        }
    }

    fn update_low_mid_prices(&mut self, lm: &LenModel, pos_state: usize) {
        let tmp0 = price0(lm.choice1);
        let mut len = 0usize;
        while len < LEN_LOW_SYMBOLS && len < self.len_symbols {
            self.prices[pos_state][len] = tmp0 + price_symbol3(&lm.bm_low[pos_state], len as u32);
            len += 1;
        }
        if len >= self.len_symbols {
            return;
        }
        let tmp1 = price1(lm.choice1) + price0(lm.choice2);
        while len < LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS && len < self.len_symbols {
            self.prices[pos_state][len] =
                tmp1 + price_symbol3(&lm.bm_mid[pos_state], (len - LEN_LOW_SYMBOLS) as u32);
            len += 1;
        }
    }

    fn update_high_prices(&mut self, lm: &LenModel) {
        let tmp = price1(lm.choice1) + price1(lm.choice2);
        for len in (LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS)..self.len_symbols {
            let p = tmp + price_symbol8(&lm.bm_high, (len - LEN_LOW_SYMBOLS - LEN_MID_SYMBOLS) as u32);
            for pos_state in 0..POS_STATES {
                self.prices[pos_state][len] = p;
            }
        }
    }

    fn price(&self, len: u32, pos_state: usize) -> i32 {
        self.prices[pos_state][len as usize - MIN_MATCH_LEN as usize]
    }
}

/// Lazily refreshed distance-coding price tables (slot, modeled-distance and
/// alignment components).
struct DistancePrices {
    dis_slot_prices: [[i32; 64]; LEN_STATES],
    dis_prices: [[i32; MODELED_DISTANCES as usize]; LEN_STATES],
    align_prices: [i32; DIS_ALIGN_SIZE],
}

impl DistancePrices {
    fn new() -> Self {
        Self {
            dis_slot_prices: [[0; 64]; LEN_STATES],
            dis_prices: [[0; MODELED_DISTANCES as usize]; LEN_STATES],
            align_prices: [0; DIS_ALIGN_SIZE],
        }
    }

    fn update(&mut self, model: &LzmaModel) {
        let mut base_dp = [0i32; MODELED_DISTANCES as usize];
        for dis in START_DIS_MODEL as usize..MODELED_DISTANCES as usize {
            let slot = get_slot(dis as u32) as u32;
            let direct_bits = (slot >> 1) - 1;
            let base = (2 | (slot & 1)) << direct_bits;
            let offset = (base - slot) as usize;
            base_dp[dis] = price_symbol_reversed(&model.dis_special[offset..], dis as u32 - base, direct_bits);
        }

        for len_state in 0..LEN_STATES {
            let bmds = &model.dis_slot[len_state];
            for slot in 0..64u32 {
                self.dis_slot_prices[len_state][slot as usize] = price_symbol6(bmds, slot);
            }
            for dis in 0..START_DIS_MODEL as usize {
                self.dis_prices[len_state][dis] = self.dis_slot_prices[len_state][dis];
            }
            for dis in START_DIS_MODEL as usize..MODELED_DISTANCES as usize {
                let slot = get_slot(dis as u32) as usize;
                self.dis_prices[len_state][dis] = base_dp[dis] + self.dis_slot_prices[len_state][slot];
            }
        }
        for i in 0..DIS_ALIGN_SIZE {
            self.align_prices[i] = price_symbol_reversed(&model.dis_align, i as u32, DIS_ALIGN_BITS);
        }
    }

    fn price_pair(&self, len_prices: &LenPrices, dis: u32, len: u32, pos_state: usize) -> i32 {
        let price = len_prices.price(len, pos_state);
        let len_state = get_len_state(len);
        if dis < MODELED_DISTANCES {
            price + self.dis_prices[len_state][dis as usize]
        } else {
            price
                + self.dis_slot_prices[len_state][get_slot(dis) as usize]
                + self.align_prices[(dis & (DIS_ALIGN_SIZE as u32 - 1)) as usize]
        }
    }
}

/// Trellis-driven LZMA encoder producing a complete lzip member.
pub struct OptimalEncoder {
    mf: MatchFinder,
    renc: RangeEncoder,
    model: LzmaModel,
    state: State,
    reps: [u32; NUM_REP_DISTANCES],
    crc: Crc32,
    member_size_limit: u64,
    member_finished: bool,
    match_len_limit: usize,
    trials: Vec<Trial>,
    pending_num_pairs: usize,
    pending_pairs: [Pair; MAX_MATCH_LEN as usize + 1],
    match_len_prices: LenPrices,
    rep_len_prices: LenPrices,
    dist_prices: DistancePrices,
}

impl OptimalEncoder {
    /// Build an encoder bounded to `member_size` bytes of output, searching
    /// up to `match_len_limit` bytes deep for each candidate match.
    pub fn new(dictionary_size: u32, match_len_limit: usize, member_size: u64) -> Option<Self> {
        let match_len_limit = match_len_limit.clamp(MIN_MATCH_LEN as usize, MAX_MATCH_LEN as usize);
        let renc = RangeEncoder::new(dictionary_size, MAX_MARKER_SIZE)?;
        let mut enc = Self {
            mf: MatchFinder::new(dictionary_size, match_len_limit, true),
            renc,
            model: LzmaModel::new(1 << crate::constants::LITERAL_CONTEXT_BITS),
            state: State::new(),
            reps: [0; NUM_REP_DISTANCES],
            crc: Crc32::new(),
            member_size_limit: 0,
            member_finished: false,
            match_len_limit,
            trials: (0..MAX_NUM_TRIALS + MAX_MATCH_LEN as usize + 2).map(|_| Trial::new()).collect(),
            pending_num_pairs: 0,
            pending_pairs: [Pair { dis: 0, len: 0 }; MAX_MATCH_LEN as usize + 1],
            match_len_prices: LenPrices::new(match_len_limit),
            rep_len_prices: LenPrices::new(match_len_limit),
            dist_prices: DistancePrices::new(),
        };
        enc.trials[1].prev_index = 0;
        enc.trials[1].prev_index2 = SINGLE_STEP_TRIAL;
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
        self.mf = MatchFinder::new(dictionary_size, self.match_len_limit, true);
        self.model = LzmaModel::new(1 << crate::constants::LITERAL_CONTEXT_BITS);
        self.state = State::new();
        self.reps = [0; NUM_REP_DISTANCES];
        self.crc = Crc32::new();
        self.member_finished = false;
        self.pending_num_pairs = 0;
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
        self.renc.encode_tree6(&mut self.model.dis_slot[get_len_state(len)], slot as u32);
        if slot < START_DIS_MODEL as u8 {
            return;
        }
        let direct_bits = (slot as u32 >> 1) - 1;
        let base = (2 | (slot as u32 & 1)) << direct_bits;
        let direct_dis = dis - base;
        if (slot as u32) < crate::constants::END_DIS_MODEL {
            let offset = (base - slot as u32) as usize;
            self.renc.encode_tree_reversed(&mut self.model.dis_special[offset..], direct_dis, direct_bits);
        } else {
            self.renc.encode_direct(direct_dis >> DIS_ALIGN_BITS, direct_bits - DIS_ALIGN_BITS);
            self.renc.encode_tree_reversed(&mut self.model.dis_align, direct_dis, DIS_ALIGN_BITS);
        }
    }

    fn encode_literal(&mut self, prev_byte: u8, symbol: u8) {
        self.renc.encode_tree8(&mut self.model.literal[get_lit_state(prev_byte)], symbol as u32);
    }

    fn encode_matched(&mut self, prev_byte: u8, symbol: u8, match_byte: u8) {
        self.renc.encode_matched(&mut self.model.literal[get_lit_state(prev_byte)], symbol, match_byte);
    }

    fn price_literal(&self, prev_byte: u8, symbol: u8) -> i32 {
        price_symbol8(&self.model.literal[get_lit_state(prev_byte)], symbol as u32)
    }

    fn price_matched_lit(&self, prev_byte: u8, symbol: u8, match_byte: u8) -> i32 {
        price_matched(&self.model.literal[get_lit_state(prev_byte)], symbol as u32, match_byte as u32)
    }

    fn price_shortrep(&self, state: State, pos_state: usize) -> i32 {
        price0(self.model.is_rep0[state.index()]) + price0(self.model.is_rep0_long[state.index()][pos_state])
    }

    fn price_rep0_len(&self, len: usize, state: State, pos_state: usize) -> i32 {
        self.price_rep(0, state, pos_state) + self.rep_len_prices.price(len as u32, pos_state)
    }

    fn price_rep(&self, rep: usize, state: State, pos_state: usize) -> i32 {
        if rep == 0 {
            return price0(self.model.is_rep0[state.index()]) + price1(self.model.is_rep0_long[state.index()][pos_state]);
        }
        let mut price = price1(self.model.is_rep0[state.index()]);
        if rep == 1 {
            price += price0(self.model.is_rep1[state.index()]);
        } else {
            price += price1(self.model.is_rep1[state.index()]);
            price += price_bit(self.model.is_rep2[state.index()], rep > 2);
        }
        price
    }

    fn read_match_distances(&mut self, pairs: &mut [Pair; MAX_MATCH_LEN as usize + 1]) -> usize {
        let num_pairs = self.mf.get_match_pairs(pairs);
        if num_pairs > 0 {
            let len = pairs[num_pairs - 1].len as usize;
            if len == self.match_len_limit && len < MAX_MATCH_LEN as usize {
                pairs[num_pairs - 1].len = self.mf.true_match_len(len, pairs[num_pairs - 1].dis as usize + 1) as u32;
            }
        }
        num_pairs
    }

    fn move_and_update(&mut self, mut n: usize) -> bool {
        let mut scratch = [Pair { dis: 0, len: 0 }; MAX_MATCH_LEN as usize + 1];
        loop {
            if !self.mf.move_pos() {
                return false;
            }
            n -= 1;
            if n == 0 {
                break;
            }
            self.mf.get_match_pairs(&mut scratch);
        }
        true
    }

    /// Rewrite `trials[0..=cur]` so that `price` holds the step length and
    /// `dis4` the decision to take at each position, reversing the
    /// `prev_index` chain left behind by the forward pass.
    fn backward(&mut self, start_cur: usize) {
        let mut cur = start_cur;
        let mut dis4 = self.trials[cur].dis4;
        while cur > 0 {
            let prev_index = self.trials[cur].prev_index as usize;
            let prev_index2 = self.trials[cur].prev_index2;

            if prev_index2 != SINGLE_STEP_TRIAL {
                // Unwind the collapsed literal step back into its own trial.
                self.trials[prev_index].dis4 = -1;
                self.trials[prev_index].prev_index = prev_index as i32 - 1;
                self.trials[prev_index].prev_index2 = SINGLE_STEP_TRIAL;
                if prev_index2 >= 0 {
                    // Three-step move: also unwind the leading match/rep.
                    self.trials[prev_index - 1].dis4 = dis4;
                    dis4 = 0;
                    self.trials[prev_index - 1].prev_index = prev_index2;
                    self.trials[prev_index - 1].prev_index2 = SINGLE_STEP_TRIAL;
                }
            }

            let len = (cur - prev_index) as i32;
            let carried = self.trials[prev_index].dis4;
            self.trials[prev_index].price = len;
            self.trials[prev_index].dis4 = dis4;
            dis4 = carried;
            cur = prev_index;
        }
    }

    /// Run one round of the trellis, returning how many bytes of lookahead
    /// it committed to (the replay length now encoded in `trials[0..ahead]`).
    fn sequence_optimizer(&mut self) -> usize {
        let reps0 = self.reps;
        let state0 = self.state;

        let mut pairs = [Pair { dis: 0, len: 0 }; MAX_MATCH_LEN as usize + 1];
        let num_pairs = if self.pending_num_pairs > 0 {
            let n = self.pending_num_pairs;
            self.pending_num_pairs = 0;
            pairs[..n].copy_from_slice(&self.pending_pairs[..n]);
            n
        } else {
            self.read_match_distances(&mut pairs)
        };
        let main_len = if num_pairs > 0 { pairs[num_pairs - 1].len as usize } else { 0 };

        let mut replens = [0usize; NUM_REP_DISTANCES];
        let mut rep_index = 0usize;
        for i in 0..NUM_REP_DISTANCES {
            replens[i] = self.mf.true_match_len(0, reps0[i] as usize + 1);
            if replens[i] > replens[rep_index] {
                rep_index = i;
            }
        }
        if replens[rep_index] >= self.match_len_limit {
            self.trials[0].price = replens[rep_index] as i32;
            self.trials[0].dis4 = rep_index as i32;
            self.move_and_update(replens[rep_index]);
            return replens[rep_index];
        }
        if main_len >= self.match_len_limit {
            self.trials[0].price = main_len as i32;
            self.trials[0].dis4 = pairs[num_pairs - 1].dis as i32 + NUM_REP_DISTANCES as i32;
            self.move_and_update(main_len);
            return main_len;
        }

        let pos_state = (self.mf.data_position() as u32 & POS_STATE_MASK) as usize;
        let st = state0.index();
        let match_price = price1(self.model.is_match[st][pos_state]);
        let rep_match_price = match_price + price1(self.model.is_rep[st]);
        let prev_byte = self.mf.peek(1);
        let cur_byte = self.mf.peek(0);
        let match_byte = self.mf.peek(reps0[0] as usize + 1);

        self.trials[1].price = price0(self.model.is_match[st][pos_state])
            + if state0.is_char() { self.price_literal(prev_byte, cur_byte) } else { self.price_matched_lit(prev_byte, cur_byte, match_byte) };
        self.trials[1].dis4 = -1;

        if match_byte == cur_byte {
            let price = rep_match_price + self.price_shortrep(state0, pos_state);
            tr_update(&mut self.trials[1], price, 0, 0);
        }

        let mut num_trials = main_len.max(replens[rep_index]);
        if num_trials < MIN_MATCH_LEN as usize {
            self.trials[0].price = 1;
            self.trials[0].dis4 = self.trials[1].dis4;
            self.mf.move_pos();
            return 1;
        }

        self.trials[0].state = state0;
        self.trials[0].reps = reps0;
        for len in MIN_MATCH_LEN as usize..=num_trials {
            self.trials[len].price = INFINITE_PRICE;
        }

        for rep in 0..NUM_REP_DISTANCES {
            if replens[rep] < MIN_MATCH_LEN as usize {
                continue;
            }
            let price = rep_match_price + self.price_rep(rep, state0, pos_state);
            for len in MIN_MATCH_LEN as usize..=replens[rep] {
                let p = price + self.rep_len_prices.price(len as u32, pos_state);
                tr_update(&mut self.trials[len], p, rep as i32, 0);
            }
        }

        if main_len > replens[0] {
            let normal_match_price = match_price + price0(self.model.is_rep[st]);
            let mut i = 0usize;
            let mut len = (replens[0] + 1).max(MIN_MATCH_LEN as usize);
            while len > pairs[i].len as usize {
                i += 1;
            }
            loop {
                let dis = pairs[i].dis;
                let price = normal_match_price + self.dist_prices.price_pair(&self.match_len_prices, dis, len as u32, pos_state);
                tr_update(&mut self.trials[len], price, dis as i32 + NUM_REP_DISTANCES as i32, 0);
                if len == pairs[i].len as usize {
                    i += 1;
                    if i >= num_pairs {
                        break;
                    }
                }
                len += 1;
            }
        }

        let mut cur = 0usize;
        loop {
            if !self.mf.move_pos() {
                self.backward(cur);
                return cur;
            }
            cur += 1;
            if cur >= num_trials {
                self.backward(cur);
                return cur;
            }

            let num_pairs = self.read_match_distances(&mut pairs);
            let newlen = if num_pairs > 0 { pairs[num_pairs - 1].len as usize } else { 0 };
            if newlen >= self.match_len_limit {
                self.pending_num_pairs = num_pairs;
                self.pending_pairs[..num_pairs].copy_from_slice(&pairs[..num_pairs]);
                self.backward(cur);
                return cur;
            }

            let prev_index_raw = self.trials[cur].prev_index;
            let dis4 = self.trials[cur].dis4;
            let prev_index2 = self.trials[cur].prev_index2;

            let (prev_index, cur_state) = if prev_index2 == SINGLE_STEP_TRIAL {
                let mut state = self.trials[prev_index_raw as usize].state;
                if prev_index_raw as usize + 1 == cur {
                    if dis4 == 0 { state.after_short_rep(); } else { state.after_literal(); }
                } else if (dis4 as usize) < NUM_REP_DISTANCES {
                    state.after_rep();
                } else {
                    state.after_match();
                }
                (prev_index_raw as usize, state)
            } else {
                let idx = if prev_index2 == DUAL_STEP_TRIAL { prev_index_raw - 1 } else { prev_index2 };
                (idx as usize, State::char_after_rep())
            };

            let mut cur_reps = self.trials[prev_index].reps;
            mtf_reps(dis4, &mut cur_reps);
            self.trials[cur].state = cur_state;
            self.trials[cur].reps = cur_reps;

            let pos_state = (self.mf.data_position() as u32 & POS_STATE_MASK) as usize;
            let prev_byte = self.mf.peek(1);
            let cur_byte = self.mf.peek(0);
            let match_byte = self.mf.peek(cur_reps[0] as usize + 1);

            let cur_price = self.trials[cur].price;
            let cst = cur_state.index();
            let mut next_price = cur_price + price0(self.model.is_match[cst][pos_state]);
            next_price += if cur_state.is_char() {
                self.price_literal(prev_byte, cur_byte)
            } else {
                self.price_matched_lit(prev_byte, cur_byte, match_byte)
            };
            tr_update(&mut self.trials[cur + 1], next_price, -1, cur as i32);

            let match_price = cur_price + price1(self.model.is_match[cst][pos_state]);
            let rep_match_price = match_price + price1(self.model.is_rep[cst]);

            if match_byte == cur_byte
                && self.trials[cur + 1].dis4 != 0
                && self.trials[cur + 1].prev_index2 == SINGLE_STEP_TRIAL
            {
                let price = rep_match_price + self.price_shortrep(cur_state, pos_state);
                if price <= self.trials[cur + 1].price {
                    self.trials[cur + 1].price = price;
                    self.trials[cur + 1].dis4 = 0;
                    self.trials[cur + 1].prev_index = cur as i32;
                }
            }

            let triable_bytes = self.mf.available_bytes().min(MAX_NUM_TRIALS - 1 - cur);
            if triable_bytes < MIN_MATCH_LEN as usize {
                continue;
            }
            let len_limit = self.match_len_limit.min(triable_bytes);

            // Speculate "literal then rep0-run": if the short rep wasn't
            // taken above (match_byte disagrees with cur_byte), a literal at
            // `cur` may still be immediately followed by a rep0 run.
            if match_byte != cur_byte && self.trials[cur + 1].prev_index != cur as i32 {
                let dis = cur_reps[0] as usize + 1;
                let limit = (self.match_len_limit + 1).min(triable_bytes);
                let end = self.mf.true_match_len(1, dis).min(limit);
                let len = end.saturating_sub(1);
                if len >= MIN_MATCH_LEN as usize {
                    let pos_state2 = (pos_state + 1) & POS_STATE_MASK as usize;
                    let mut state2 = cur_state;
                    state2.after_literal();
                    let price = next_price
                        + price1(self.model.is_match[state2.index()][pos_state2])
                        + price1(self.model.is_rep[state2.index()])
                        + self.price_rep0_len(len, state2, pos_state2);
                    while num_trials < cur + 1 + len {
                        num_trials += 1;
                        self.trials[num_trials].price = INFINITE_PRICE;
                    }
                    tr_update2(&mut self.trials[cur + 1 + len], price, cur as i32 + 1);
                }
            }

            let mut start_len = MIN_MATCH_LEN as usize;
            for rep in 0..NUM_REP_DISTANCES {
                let dis = cur_reps[rep] as usize + 1;
                let len = self.mf.true_match_len(0, dis).min(len_limit);
                if len < MIN_MATCH_LEN as usize {
                    continue;
                }
                while num_trials < cur + len {
                    num_trials += 1;
                    self.trials[num_trials].price = INFINITE_PRICE;
                }
                let price = rep_match_price + self.price_rep(rep, cur_state, pos_state);
                for l in MIN_MATCH_LEN as usize..=len {
                    let p = price + self.rep_len_prices.price(l as u32, pos_state);
                    tr_update(&mut self.trials[cur + l], p, rep as i32, cur as i32);
                }
                if rep == 0 {
                    start_len = len + 1;
                }

                // Speculate "rep then literal then rep0-run": a literal right
                // after this rep match, followed by another rep0 run at the
                // same distance (a periodic pattern interrupted by one byte).
                let limit2 = (self.match_len_limit + len + 1).min(triable_bytes);
                let end2 = self.mf.true_match_len(len + 1, dis).min(limit2);
                let len2 = end2.saturating_sub(len + 1);
                if len2 >= MIN_MATCH_LEN as usize {
                    let pos_state2 = (pos_state + len) & POS_STATE_MASK as usize;
                    let mut state2 = cur_state;
                    state2.after_rep();
                    let mut price2 = price
                        + self.rep_len_prices.price(len as u32, pos_state)
                        + price0(self.model.is_match[state2.index()][pos_state2]);
                    let lit_prev = self.mf.byte_ahead(len as isize - 1);
                    let lit_cur = self.mf.byte_ahead(len as isize);
                    let lit_match = self.mf.byte_ahead(len as isize - dis as isize);
                    price2 += self.price_matched_lit(lit_prev, lit_cur, lit_match);
                    let pos_state3 = (pos_state2 + 1) & POS_STATE_MASK as usize;
                    state2.after_literal();
                    price2 += price1(self.model.is_match[state2.index()][pos_state3])
                        + price1(self.model.is_rep[state2.index()])
                        + self.price_rep0_len(len2, state2, pos_state3);
                    while num_trials < cur + len + 1 + len2 {
                        num_trials += 1;
                        self.trials[num_trials].price = INFINITE_PRICE;
                    }
                    tr_update3(
                        &mut self.trials[cur + len + 1 + len2],
                        price2,
                        rep as i32,
                        cur as i32 + len as i32 + 1,
                        cur as i32,
                    );
                }
            }

            if newlen >= start_len && newlen <= len_limit {
                let normal_match_price = match_price + price0(self.model.is_rep[cst]);
                while num_trials < cur + newlen {
                    num_trials += 1;
                    self.trials[num_trials].price = INFINITE_PRICE;
                }
                let mut i = 0usize;
                while (pairs[i].len as usize) < start_len {
                    i += 1;
                }
                let mut dis = pairs[i].dis;
                let mut len = start_len;
                loop {
                    let price = normal_match_price + self.dist_prices.price_pair(&self.match_len_prices, dis, len as u32, pos_state);
                    tr_update(&mut self.trials[cur + len], price, dis as i32 + NUM_REP_DISTANCES as i32, cur as i32);

                    if len == pairs[i].len as usize {
                        // Speculate "match then literal then rep0-run": a
                        // literal right after this match, followed by a rep0
                        // run at the same distance.
                        let dis2 = dis as usize + 1;
                        let limit = (self.match_len_limit + len + 1).min(triable_bytes);
                        let end = self.mf.true_match_len(len + 1, dis2).min(limit);
                        let len2 = end.saturating_sub(len + 1);
                        if len2 >= MIN_MATCH_LEN as usize {
                            let pos_state2 = (pos_state + len) & POS_STATE_MASK as usize;
                            let mut state2 = cur_state;
                            state2.after_match();
                            let mut price2 = price + price0(self.model.is_match[state2.index()][pos_state2]);
                            let lit_prev = self.mf.byte_ahead(len as isize - 1);
                            let lit_cur = self.mf.byte_ahead(len as isize);
                            let lit_match = self.mf.byte_ahead(len as isize - dis2 as isize);
                            price2 += self.price_matched_lit(lit_prev, lit_cur, lit_match);
                            let pos_state3 = (pos_state2 + 1) & POS_STATE_MASK as usize;
                            state2.after_literal();
                            price2 += price1(self.model.is_match[state2.index()][pos_state3])
                                + price1(self.model.is_rep[state2.index()])
                                + self.price_rep0_len(len2, state2, pos_state3);
                            while num_trials < cur + len + 1 + len2 {
                                num_trials += 1;
                                self.trials[num_trials].price = INFINITE_PRICE;
                            }
                            tr_update3(
                                &mut self.trials[cur + len + 1 + len2],
                                price2,
                                dis as i32 + NUM_REP_DISTANCES as i32,
                                cur as i32 + len as i32 + 1,
                                cur as i32,
                            );
                        }
                        i += 1;
                        if i >= num_pairs {
                            break;
                        }
                        dis = pairs[i].dis;
                    }
                    if len >= newlen {
                        break;
                    }
                    len += 1;
                }
            }
        }
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

    /// Run the trellis and replay its decisions as range-coded output,
    /// stopping to ask for more input/output room, or finishing the member
    /// outright once the input is exhausted.
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
                return if self.mf.enough_available_bytes() { EncodeStep::NeedsOutput } else { EncodeStep::NeedsInput };
            }
            let cur_byte = self.mf.peek(0);
            self.renc.encode_bit(&mut self.model.is_match[self.state.index()][0], false);
            self.encode_literal(0, cur_byte);
            self.crc.update(&[cur_byte]);
            let mut scratch = [Pair { dis: 0, len: 0 }; MAX_MATCH_LEN as usize + 1];
            self.mf.get_match_pairs(&mut scratch);
            self.mf.move_pos();
        }

        while !self.mf.data_finished() {
            if !self.mf.enough_available_bytes() || !self.renc.enough_free_bytes() {
                if self.try_sync_flush() {
                    return EncodeStep::NeedsOutput;
                }
                return if self.mf.enough_available_bytes() { EncodeStep::NeedsOutput } else { EncodeStep::NeedsInput };
            }

            self.match_len_prices.update_prices(&self.model.match_len);
            self.rep_len_prices.update_prices(&self.model.rep_len);
            self.dist_prices.update(&self.model);

            let ahead = self.sequence_optimizer();
            if ahead == 0 {
                return EncodeStep::NeedsInput;
            }

            let mut i = 0usize;
            let mut remaining = ahead;
            while remaining > 0 {
                let pos_state = ((self.mf.data_position() - remaining as u64) as u32 & POS_STATE_MASK) as usize;
                let len = self.trials[i].price as usize;
                let dis4 = self.trials[i].dis4;
                let st = self.state.index();
                let is_literal = dis4 < 0;

                self.renc.encode_bit(&mut self.model.is_match[st][pos_state], !is_literal);
                if is_literal {
                    let prev_byte = self.mf.peek(remaining + 1);
                    let cur_byte = self.mf.peek(remaining);
                    self.crc.update(&[cur_byte]);
                    if self.state.is_char() {
                        self.encode_literal(prev_byte, cur_byte);
                    } else {
                        let match_byte = self.mf.peek(remaining + self.reps[0] as usize + 1);
                        self.encode_matched(prev_byte, cur_byte, match_byte);
                    }
                    self.state.after_literal();
                } else {
                    let mut bytes = [0u8; MAX_MATCH_LEN as usize];
                    for (k, b) in bytes[..len].iter_mut().enumerate() {
                        *b = self.mf.peek(remaining - k);
                    }
                    self.crc.update(&bytes[..len]);
                    mtf_reps(dis4, &mut self.reps);
                    let is_rep = (dis4 as usize) < NUM_REP_DISTANCES;
                    self.renc.encode_bit(&mut self.model.is_rep[st], is_rep);
                    if is_rep {
                        let rep = dis4 as usize;
                        self.renc.encode_bit(&mut self.model.is_rep0[st], rep != 0);
                        if rep == 0 {
                            self.renc.encode_bit(&mut self.model.is_rep0_long[st][pos_state], len > 1);
                        } else {
                            self.renc.encode_bit(&mut self.model.is_rep1[st], rep > 1);
                            if rep > 1 {
                                self.renc.encode_bit(&mut self.model.is_rep2[st], rep > 2);
                            }
                        }
                        if len == 1 {
                            self.state.after_short_rep();
                        } else {
                            self.renc.encode_len(&mut self.model.rep_len, len as u32, pos_state);
                            self.state.after_rep();
                        }
                    } else {
                        let dis = dis4 as u32 - NUM_REP_DISTANCES as u32;
                        self.encode_pair(dis, len as u32, pos_state);
                        self.state.after_match();
                    }
                }

                remaining -= len;
                i += len;
                if self.renc.member_position() >= self.member_size_limit {
                    self.mf.dec_pos(remaining);
                    self.try_full_flush();
                    return if self.member_finished { EncodeStep::MemberFinished } else { EncodeStep::NeedsOutput };
                }
            }
        }

        self.try_full_flush();
        if self.member_finished { EncodeStep::MemberFinished } else { EncodeStep::NeedsOutput }
    }
}
