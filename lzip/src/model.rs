//! Probability models: the adaptive state that the range coder reads from
//! and writes back to as it encodes or decodes each symbol.

use crate::constants::{
    BIT_MODEL_TOTAL, DIS_ALIGN_SIZE, LEN_LOW_SYMBOLS, LEN_MID_SYMBOLS, NUM_STATES, POS_STATES,
};

/// An 11-bit adaptive bit probability, as used by every context in the
/// model. `0` means "certainly a 1 bit", `BIT_MODEL_TOTAL` means
/// "certainly a 0 bit"; it starts at the midpoint and is nudged toward
/// whichever bit is actually observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitModel(pub u32);

impl BitModel {
    /// Construct the model at its initial, maximally uncertain state.
    pub const fn new() -> Self {
        Self(BIT_MODEL_TOTAL / 2)
    }
}

impl Default for BitModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a fixed-size array of freshly initialized bit models.
pub fn bit_model_array<const N: usize>() -> [BitModel; N] {
    [BitModel::new(); N]
}

/// The LZMA coder's 12-state state machine.
///
/// States `0..7` mean the previous symbol was a literal; `7..12` mean it was
/// a match of some kind. The exact value additionally selects which
/// literal-coding context (plain vs "matched") and which length/distance
/// price table region applies to the next symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State(u8);

/// `St_set_char` move-to-state table, indexed by the current state.
const NEXT_AFTER_LITERAL: [u8; NUM_STATES] = [0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 4, 5];

impl State {
    /// The initial state, entered at the start of every member.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Raw state index, `0..12`, for indexing per-state model tables.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// `true` if the previous symbol was a plain (non-match-aligned) literal.
    pub fn is_char(&self) -> bool {
        self.0 < 7
    }

    /// Transition after emitting a literal.
    pub fn after_literal(&mut self) {
        self.0 = NEXT_AFTER_LITERAL[self.0 as usize];
    }

    /// Transition after emitting a new match (non-repeat distance).
    pub fn after_match(&mut self) {
        self.0 = if self.0 < 7 { 7 } else { 10 };
    }

    /// Transition after emitting a repeat-distance match.
    pub fn after_rep(&mut self) {
        self.0 = if self.0 < 7 { 8 } else { 11 };
    }

    /// Transition after emitting a short (length-1) repeat-distance match.
    pub fn after_short_rep(&mut self) {
        self.0 = if self.0 < 7 { 9 } else { 11 };
    }

    /// State of the literal sandwiched between a rep/match and the rep0 run
    /// that follows it in a speculative multi-step trellis move. Used only
    /// by the optimizer's traceback, never by the range coder directly.
    pub const fn char_after_rep() -> Self {
        Self(8)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// Probability models for one length field (match length or repeat-match
/// length): a 2-way choice between three ranges, each range coded with its
/// own (possibly `pos_state`-indexed) tree.
#[derive(Debug, Clone)]
pub struct LenModel {
    pub choice1: BitModel,
    pub choice2: BitModel,
    pub bm_low: [[BitModel; LEN_LOW_SYMBOLS]; POS_STATES],
    pub bm_mid: [[BitModel; LEN_MID_SYMBOLS]; POS_STATES],
    pub bm_high: [BitModel; crate::constants::LEN_HIGH_SYMBOLS],
}

impl LenModel {
    pub fn new() -> Self {
        Self {
            choice1: BitModel::new(),
            choice2: BitModel::new(),
            bm_low: [bit_model_array(); POS_STATES],
            bm_mid: [bit_model_array(); POS_STATES],
            bm_high: bit_model_array(),
        }
    }
}

impl Default for LenModel {
    fn default() -> Self {
        Self::new()
    }
}

/// The full set of adaptive probabilities for one LZMA coder instance
/// (shared shape between encoder and decoder).
#[derive(Debug, Clone)]
pub struct LzmaModel {
    pub literal: Vec<[BitModel; 0x300]>,
    pub is_match: [[BitModel; POS_STATES]; NUM_STATES],
    pub is_rep: [BitModel; NUM_STATES],
    pub is_rep0: [BitModel; NUM_STATES],
    pub is_rep1: [BitModel; NUM_STATES],
    pub is_rep2: [BitModel; NUM_STATES],
    pub is_rep0_long: [[BitModel; POS_STATES]; NUM_STATES],
    pub dis_slot: [[BitModel; 64]; crate::constants::LEN_STATES],
    pub dis_special: [BitModel; 115],
    pub dis_align: [BitModel; DIS_ALIGN_SIZE],
    pub match_len: LenModel,
    pub rep_len: LenModel,
}

impl LzmaModel {
    /// Build a fresh model with `1 << literal_context_bits` literal-coder
    /// contexts, each holding the 0x300-entry literal tree.
    pub fn new(num_literal_contexts: usize) -> Self {
        Self {
            literal: (0..num_literal_contexts).map(|_| bit_model_array()).collect(),
            is_match: [[BitModel::new(); POS_STATES]; NUM_STATES],
            is_rep: [BitModel::new(); NUM_STATES],
            is_rep0: [BitModel::new(); NUM_STATES],
            is_rep1: [BitModel::new(); NUM_STATES],
            is_rep2: [BitModel::new(); NUM_STATES],
            is_rep0_long: [[BitModel::new(); POS_STATES]; NUM_STATES],
            dis_slot: [[BitModel::new(); 64]; crate::constants::LEN_STATES],
            dis_special: [BitModel::new(); 115],
            dis_align: bit_model_array(),
            match_len: LenModel::new(),
            rep_len: LenModel::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_starts_literal() {
        let s = State::new();
        assert!(s.is_char());
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn literal_transition_table_matches_reference() {
        // next[] = {0,0,0,0,1,2,3,4,5,6,4,5}
        let expect = [0u8, 0, 0, 0, 1, 2, 3, 4, 5, 6, 4, 5];
        for (raw, &want) in expect.iter().enumerate() {
            let mut s = State(raw as u8);
            s.after_literal();
            assert_eq!(s.index(), want as usize, "state {raw} -> {want}");
        }
    }

    #[test]
    fn match_rep_transitions_split_at_seven() {
        for raw in 0u8..7 {
            let mut s = State(raw);
            s.after_match();
            assert_eq!(s.index(), 7);
        }
        for raw in 7u8..NUM_STATES as u8 {
            let mut s = State(raw);
            s.after_match();
            assert_eq!(s.index(), 10);
        }
    }

    #[test]
    fn bit_model_starts_at_midpoint() {
        assert_eq!(BitModel::new().0, BIT_MODEL_TOTAL / 2);
    }
}
