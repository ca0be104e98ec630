// crates/mith-sig/src/online.rs

//! The online phase: masked-state simulation across all 64 parties at once.
//!
//! The public (masked) state and the per-bit mask shares evolve in lockstep:
//! the state through the split linear layer, the shares through the full
//! row-major matrices. Each AND gate consumes the same two tape words the
//! aux engine consumed, broadcasts one s-share word, and the recorded
//! transcript of the unopened party is patched in at every broadcast when
//! verifying.

use mith_binmat::{parity64, Matrix};

use crate::bits::{extend, get_bit, set_bit};
use crate::cipher::Instance;
use crate::error::SignatureError;
use crate::params::{Params, NUM_PARTIES};
use crate::shares::Shares;
use crate::tape::Tapes;

/// Per-party broadcast transcripts for one repetition.
pub struct Msgs {
    pub msgs: Vec<Vec<u8>>,
    /// Bits broadcast so far (shared across parties).
    pub pos: usize,
    /// Set when verifying an opened round: that party's bits are read from
    /// the transcript instead of recomputed.
    pub unopened: Option<usize>,
}

impl Msgs {
    /// Zeroed transcripts.
    #[must_use]
    pub fn new(params: &Params) -> Self {
        Self {
            msgs: vec![vec![0u8; params.msgs_size()]; NUM_PARTIES],
            pos: 0,
            unopened: None,
        }
    }

    /// Broadcast one share word: each party's bit is appended to its
    /// transcript. Returns the word actually broadcast, with the unopened
    /// party's bit replaced by its recorded transcript bit.
    pub fn broadcast(&mut self, mut w: u64) -> u64 {
        if let Some(u) = self.unopened {
            let recorded = u64::from(get_bit(&self.msgs[u], self.pos));
            w = (w & !(1u64 << u)) | (recorded << u);
        }
        for (j, buf) in self.msgs.iter_mut().enumerate() {
            set_bit(buf, self.pos, ((w >> j) & 1) as u8);
        }
        self.pos += 1;
        w
    }
}

/// Simulate the MPC evaluation of the cipher on a masked key. Returns
/// `SimulationFailed` when the unmasked output does not equal the public
/// ciphertext.
pub fn simulate_online(
    inst: &Instance,
    masked_key: &Matrix,
    key_shares: &Shares,
    tapes: &mut Tapes,
    msgs: &mut Msgs,
    plaintext: &Matrix,
    expected_ct: &[u8],
) -> Result<(), SignatureError> {
    let n = inst.params.state_bits;
    let m = inst.params.sbox_count;
    let k = &inst.kernels;

    // Masked state and its mask shares after key whitening.
    let mut state = Matrix::zero(1, n);
    (k.mul_vl)(&mut state, masked_key, &inst.k_lookup[0]);
    state.xor_assign(plaintext);

    let mut shares = Shares::new(n);
    key_shares.mul_matrix_into(&inst.k_full[0], &mut shares);

    let mut lin = Matrix::zero(1, n);
    let mut top = Matrix::zero(1, n);
    let mut next = Matrix::zero(1, n);
    let mut next_shares = Shares::new(n);
    let mut rk_shares = Shares::new(n);

    for r in 0..inst.params.cipher_rounds {
        inst.shuffle_state(&mut state);
        shares.permute_last_word(&inst.nl_perm);

        mpc_sbox(&mut state, &mut shares, tapes, msgs, m, n);

        (k.mul_vl)(&mut lin, &state, &inst.lz_lookup[r]);
        inst.parity_top(&mut top, &state, &inst.lt[r]);
        (k.xor)(&mut next, &lin, &top);
        next.xor_assign(&inst.rc[r]);
        (k.addmul_vl)(&mut next, masked_key, &inst.k_lookup[r + 1]);
        state.copy_from(&next);

        shares.mul_matrix_into(&inst.l_full[r], &mut next_shares);
        key_shares.mul_matrix_into(&inst.k_full[r + 1], &mut rk_shares);
        next_shares.xor_assign(&rk_shares);
        core::mem::swap(&mut shares, &mut next_shares);
    }

    // Reveal the output masks, then unmask and check against the public key.
    for i in 0..n {
        let patched = msgs.broadcast(shares.get(i));
        shares.set(i, patched);
    }
    let mask_values = shares.reconstruct_vector(n);
    state.xor_assign(&mask_values);

    let mut out = vec![0u8; inst.params.input_size()];
    state.read_row_bytes(0, &mut out);
    if out == expected_ct {
        Ok(())
    } else {
        Err(SignatureError::SimulationFailed)
    }
}

fn mpc_sbox(state: &mut Matrix, shares: &mut Shares, tapes: &mut Tapes, msgs: &mut Msgs, m: usize, n: usize) {
    for i in (0..3 * m).step_by(3) {
        // MSB-view indices i+2, i+1, i map to state bits n−3−i, n−2−i, n−1−i.
        let pa = n - 3 - i;
        let pb = n - 2 - i;
        let pc = n - 1 - i;

        let a = u64::from(state.bit(0, pa));
        let b = u64::from(state.bit(0, pb));
        let c = u64::from(state.bit(0, pc));
        let mask_a = shares.get(pa);
        let mask_b = shares.get(pb);
        let mask_c = shares.get(pc);

        let (ab, fresh_ab) = mpc_and(a, b, mask_a, mask_b, tapes, msgs);
        let (bc, fresh_bc) = mpc_and(b, c, mask_b, mask_c, tapes, msgs);
        let (ca, fresh_ca) = mpc_and(c, a, mask_c, mask_a, tapes, msgs);

        state.set_bit(0, pa, (a ^ bc) != 0);
        shares.set(pa, mask_a ^ fresh_bc);
        state.set_bit(0, pb, (a ^ b ^ ca) != 0);
        shares.set(pb, mask_a ^ mask_b ^ fresh_ca);
        state.set_bit(0, pc, (a ^ b ^ c ^ ab) != 0);
        shares.set(pc, mask_a ^ mask_b ^ mask_c ^ fresh_ab);
    }
}

/// One AND gate: masked product bit plus the fresh output mask that now
/// hides the product wire.
fn mpc_and(
    a: u64,
    b: u64,
    mask_a: u64,
    mask_b: u64,
    tapes: &mut Tapes,
    msgs: &mut Msgs,
) -> (u64, u64) {
    let fresh_output_mask = tapes.word();
    let and_helper = tapes.word();
    let s = (extend(a) & mask_b) ^ (extend(b) & mask_a) ^ and_helper ^ fresh_output_mask;
    let s = msgs.broadcast(s);
    ((parity64(s) ^ (a & b)) & 1, fresh_output_mask)
}
