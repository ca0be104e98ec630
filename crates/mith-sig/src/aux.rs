// crates/mith-sig/src/aux.rs

//! Preprocessing: party N−1's correction bits.
//!
//! The engine replays the cipher on the key-mask *values* (no plaintext, no
//! round constants) and, per AND gate, rewrites party N−1's and-helper bit
//! so the party-wise parity of the helper equals `mask_a ∧ mask_b`. The tape
//! cursor is reset to zero afterwards so the online phase re-reads the same
//! positions.

use mith_binmat::{parity64, Matrix};

use crate::cipher::{msb_bit, set_msb_bit, Instance};
use crate::shares::Shares;
use crate::tape::Tapes;

/// Run the aux engine over one repetition's tapes.
pub fn compute_aux(inst: &Instance, tapes: &mut Tapes) {
    let n = inst.params.state_bits;
    let m = inst.params.sbox_count;
    let k = &inst.kernels;

    let mut key_shares = Shares::new(n);
    tapes.words_into(&mut key_shares);
    let key = key_shares.reconstruct_vector(n);

    let mut state = Matrix::zero(1, n);
    (k.mul_vl)(&mut state, &key, &inst.k_lookup[0]);

    inst.eval_value_rounds(&mut state, &key, false, |d| sbox_aux(d, m, tapes));

    tapes.pos = 0;
}

fn sbox_aux(d: &mut u64, m: usize, tapes: &mut Tapes) {
    for i in (0..3 * m).step_by(3) {
        let a = msb_bit(*d, i + 2);
        let b = msb_bit(*d, i + 1);
        let c = msb_bit(*d, i);

        let ab = parity64(aux_and(a, b, tapes));
        let bc = parity64(aux_and(b, c, tapes));
        let ca = parity64(aux_and(c, a, tapes));

        set_msb_bit(d, i + 2, a ^ bc);
        set_msb_bit(d, i + 1, a ^ b ^ ca);
        set_msb_bit(d, i, a ^ b ^ c ^ ab);
    }
}

/// Consume one fresh output-mask word and one helper word; overwrite party
/// N−1's helper share so the helper's parity is `mask_a ∧ mask_b`. Returns
/// the fresh output mask.
fn aux_and(mask_a: u64, mask_b: u64, tapes: &mut Tapes) -> u64 {
    let fresh_output_mask = tapes.word();
    let mut and_helper = tapes.word();
    and_helper &= !(1u64 << 63);
    let aux_bit = (mask_a & mask_b) ^ parity64(and_helper);
    let pos = tapes.pos - 1;
    tapes.set_last_party_bit(pos, aux_bit as u8);
    fresh_output_mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamSet, NUM_PARTIES};
    use mith_tree::{SeedTree, SALT_SIZE};

    /// Replays the aux evaluation and asserts the AND-gate invariant with
    /// the corrected helper bits in place.
    fn check_invariant(inst: &Instance, tapes: &mut Tapes) {
        let n = inst.params.state_bits;
        let m = inst.params.sbox_count;
        let k = &inst.kernels;

        let mut key_shares = Shares::new(n);
        tapes.words_into(&mut key_shares);
        let key = key_shares.reconstruct_vector(n);
        let mut state = Matrix::zero(1, n);
        (k.mul_vl)(&mut state, &key, &inst.k_lookup[0]);

        inst.eval_value_rounds(&mut state, &key, false, |d| {
            for i in (0..3 * m).step_by(3) {
                let a = msb_bit(*d, i + 2);
                let b = msb_bit(*d, i + 1);
                let c = msb_bit(*d, i);
                let mut gate = |x: u64, y: u64| -> u64 {
                    let fresh = tapes.word();
                    let helper = tapes.word();
                    assert_eq!(parity64(helper), x & y, "aux invariant");
                    fresh
                };
                let ab = parity64(gate(a, b));
                let bc = parity64(gate(b, c));
                let ca = parity64(gate(c, a));
                set_msb_bit(d, i + 2, a ^ bc);
                set_msb_bit(d, i + 1, a ^ b ^ ca);
                set_msb_bit(d, i, a ^ b ^ c ^ ab);
            }
        });
        tapes.pos = 0;
    }

    #[test]
    fn and_gate_invariant_holds_after_aux() {
        for set in [ParamSet::L1, ParamSet::L1c] {
            let inst = Instance::new(set);
            let salt = [9u8; SALT_SIZE];
            let tree =
                SeedTree::generate(NUM_PARTIES, inst.params.seed_size, &[0x2cu8; 32][..inst.params.seed_size], &salt, 5);
            let mut tapes = Tapes::create(&tree, &salt, 5, inst.params);
            compute_aux(&inst, &mut tapes);
            assert_eq!(tapes.pos, 0);
            check_invariant(&inst, &mut tapes);
        }
    }
}
