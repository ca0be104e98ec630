// crates/mith-sig/src/tape.rs

//! Per-party pseudorandom tapes.
//!
//! Layout per party: n key-mask bits, then per AND gate one fresh-output-mask
//! bit and one and-helper bit. The aux engine rewrites party N−1's helper
//! bits in place; the cursor is reset once before the online phase so both
//! phases read identical positions.

use mith_crypto::Xof4;
use mith_tree::{SeedTree, SALT_SIZE};

use crate::bits::{get_bit, set_bit};
use crate::params::{Params, NUM_PARTIES};
use crate::shares::Shares;

/// All parties' tapes for one repetition, plus the shared bit cursor.
pub struct Tapes {
    tapes: Vec<Vec<u8>>,
    /// Bit position of the next read. Only ever advances, except for the
    /// single reset between the aux and online phases.
    pub pos: usize,
}

impl Tapes {
    /// Derive every party's tape from its seed: H⁴ over
    /// `(seed_j ‖ salt ‖ t ‖ j)`, squeezed to the full tape length.
    #[must_use]
    pub fn create(seeds: &SeedTree, salt: &[u8; SALT_SIZE], t: u16, params: &Params) -> Self {
        debug_assert_eq!(seeds.num_leaves(), NUM_PARTIES);
        let len = params.tape_size();
        let mut tapes = vec![vec![0u8; len]; NUM_PARTIES];
        for j in (0..NUM_PARTIES).step_by(4) {
            let mut h = Xof4::new();
            h.update_each([
                seeds.leaf(j),
                seeds.leaf(j + 1),
                seeds.leaf(j + 2),
                seeds.leaf(j + 3),
            ]);
            h.update_all(salt);
            h.update_u16_le_all(t);
            h.update_u16_le_each([j as u16, j as u16 + 1, j as u16 + 2, j as u16 + 3]);
            let mut r = h.finalize();
            let (head, tail) = tapes[j..].split_at_mut(2);
            let (t0, t1) = head.split_at_mut(1);
            let (t2, t3) = tail.split_at_mut(1);
            r.squeeze_each([
                &mut t0[0][..],
                &mut t1[0][..],
                &mut t2[0][..],
                &mut t3[0][..],
            ]);
        }
        Self { tapes, pos: 0 }
    }

    /// One bit from every party at the cursor, packed party-j-at-bit-j.
    #[inline]
    pub fn word(&mut self) -> u64 {
        let mut w = 0u64;
        for (j, tape) in self.tapes.iter().enumerate() {
            w |= u64::from(get_bit(tape, self.pos)) << j;
        }
        self.pos += 1;
        w
    }

    /// Fill `shares` with one word per secret bit.
    pub fn words_into(&mut self, shares: &mut Shares) {
        for i in 0..shares.len() {
            shares.set(i, self.word());
        }
    }

    /// Rewrite party N−1's bit at an already-consumed position (aux
    /// correction installation).
    #[inline]
    pub fn set_last_party_bit(&mut self, pos: usize, bit: u8) {
        set_bit(&mut self.tapes[NUM_PARTIES - 1], pos, bit);
    }

    /// Extract party N−1's aux correction bits: positions `n+1, n+3, …`,
    /// one per AND gate, into a zero-padded `view_size` buffer.
    #[must_use]
    pub fn aux_bits(&self, params: &Params) -> Vec<u8> {
        let mut out = vec![0u8; params.view_size()];
        let last = &self.tapes[NUM_PARTIES - 1];
        let first = params.state_bits + 1;
        for g in 0..params.and_size_bits() {
            set_bit(&mut out, g, get_bit(last, first + 2 * g));
        }
        out
    }

    /// Install aux correction bits into party N−1's helper positions.
    pub fn set_aux_bits(&mut self, aux: &[u8], params: &Params) {
        let last = &mut self.tapes[NUM_PARTIES - 1];
        let first = params.state_bits + 1;
        for g in 0..params.and_size_bits() {
            set_bit(last, first + 2 * g, get_bit(aux, g));
        }
    }

    /// Zero party `j`'s whole tape (the unopened party at verification).
    pub fn zero_party(&mut self, j: usize) {
        self.tapes[j].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::L1;

    fn test_tapes() -> Tapes {
        let salt = [3u8; SALT_SIZE];
        let tree = SeedTree::generate(NUM_PARTIES, L1.seed_size, &[0x11; 16], &salt, 0);
        Tapes::create(&tree, &salt, 0, &L1)
    }

    #[test]
    fn tapes_are_per_party_distinct_and_deterministic() {
        let a = test_tapes();
        let b = test_tapes();
        assert_eq!(a.tapes, b.tapes);
        assert_ne!(a.tapes[0], a.tapes[1]);
        assert_eq!(a.tapes.len(), NUM_PARTIES);
        assert_eq!(a.tapes[0].len(), L1.tape_size());
    }

    #[test]
    fn word_packs_party_bits() {
        let mut t = test_tapes();
        let w = t.word();
        assert_eq!(t.pos, 1);
        for j in 0..NUM_PARTIES {
            assert_eq!((w >> j) & 1, u64::from(get_bit(&t.tapes[j], 0)));
        }
    }

    #[test]
    fn aux_bits_round_trip() {
        let mut t = test_tapes();
        let mut aux = vec![0u8; L1.view_size()];
        for g in 0..L1.and_size_bits() {
            set_bit(&mut aux, g, (g % 3 == 0) as u8);
        }
        t.set_aux_bits(&aux, &L1);
        assert_eq!(t.aux_bits(&L1), aux);
    }
}
