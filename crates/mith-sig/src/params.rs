// crates/mith-sig/src/params.rs

//! Parameter sets. These are the only knobs the signer and verifier read.

use serde::{Deserialize, Serialize};

pub use mith_tree::SALT_SIZE;

/// Number of MPC parties. Shares are bit-sliced into one 64-bit word, so
/// this is fixed across parameter sets.
pub const NUM_PARTIES: usize = 64;

/// Named parameter sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamSet {
    /// 128-bit state, ten S-boxes per round.
    L1,
    /// 128-bit state, single S-box per round (more rounds, narrower
    /// nonlinear slice; exercises the 3-bit kernels).
    L1c,
    /// 192-bit state.
    L3,
    /// 256-bit state.
    L5,
}

impl ParamSet {
    /// All shipped sets.
    pub const ALL: [ParamSet; 4] = [ParamSet::L1, ParamSet::L1c, ParamSet::L3, ParamSet::L5];

    /// Stable lowercase name (CLI flag values, instance derivation label).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ParamSet::L1 => "l1",
            ParamSet::L1c => "l1c",
            ParamSet::L3 => "l3",
            ParamSet::L5 => "l5",
        }
    }

    /// Parse a CLI-style name.
    #[must_use]
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == s)
    }

    /// The parameter record.
    #[must_use]
    pub fn params(self) -> &'static Params {
        match self {
            ParamSet::L1 => &L1,
            ParamSet::L1c => &L1C,
            ParamSet::L3 => &L3,
            ParamSet::L5 => &L5,
        }
    }
}

/// Sizes and counts for one parameter set.
#[derive(Clone, Copy, Debug)]
pub struct Params {
    pub set: ParamSet,
    /// Cipher state and key width in bits (n).
    pub state_bits: usize,
    /// S-boxes per cipher round (m).
    pub sbox_count: usize,
    /// Cipher rounds (r).
    pub cipher_rounds: usize,
    /// Parallel MPC repetitions (T).
    pub num_rounds: usize,
    /// Repetitions opened to the verifier (τ).
    pub num_opened_rounds: usize,
    /// Seed bytes.
    pub seed_size: usize,
    /// Commitment / digest bytes.
    pub digest_size: usize,
}

pub const L1: Params = Params {
    set: ParamSet::L1,
    state_bits: 128,
    sbox_count: 10,
    cipher_rounds: 20,
    num_rounds: 250,
    num_opened_rounds: 36,
    seed_size: 16,
    digest_size: 32,
};

pub const L1C: Params = Params {
    set: ParamSet::L1c,
    state_bits: 128,
    sbox_count: 1,
    cipher_rounds: 182,
    num_rounds: 250,
    num_opened_rounds: 36,
    seed_size: 16,
    digest_size: 32,
};

pub const L3: Params = Params {
    set: ParamSet::L3,
    state_bits: 192,
    sbox_count: 10,
    cipher_rounds: 30,
    num_rounds: 419,
    num_opened_rounds: 52,
    seed_size: 24,
    digest_size: 48,
};

pub const L5: Params = Params {
    set: ParamSet::L5,
    state_bits: 256,
    sbox_count: 10,
    cipher_rounds: 38,
    num_rounds: 601,
    num_opened_rounds: 68,
    seed_size: 32,
    digest_size: 64,
};

impl Params {
    /// State/key bytes; also the per-round `input` length on the wire.
    #[inline]
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.state_bits / 8
    }

    /// Meaningful aux bits: one correction bit per AND gate.
    #[inline]
    #[must_use]
    pub fn and_size_bits(&self) -> usize {
        3 * self.cipher_rounds * self.sbox_count
    }

    /// Aux bytes on the wire (`⌈3·r·m / 8⌉`).
    #[inline]
    #[must_use]
    pub fn view_size(&self) -> usize {
        (self.and_size_bits() + 7) / 8
    }

    /// Per-party tape bytes.
    #[inline]
    #[must_use]
    pub fn tape_size(&self) -> usize {
        2 * self.view_size() + self.input_size()
    }

    /// Per-party message transcript bytes.
    #[inline]
    #[must_use]
    pub fn msgs_size(&self) -> usize {
        self.view_size() + self.input_size()
    }

    /// Meaningful message bits: one broadcast per AND gate plus the output
    /// mask reveal.
    #[inline]
    #[must_use]
    pub fn msgs_bits(&self) -> usize {
        self.state_bits + self.and_size_bits()
    }

    /// Bits of the nonlinear slice in the last state word.
    #[inline]
    #[must_use]
    pub fn sbox_bits(&self) -> usize {
        3 * self.sbox_count
    }
}
