// crates/mith-sig/src/cipher.rs

//! The LowMC-style cipher instance: affine-layer matrices, round constants,
//! and the nonlinear-slice selector, plus the plain evaluation path used by
//! key generation.
//!
//! Instance tables are derived deterministically from a domain-separated XOF
//! of the parameter-set name. Only forward evaluation is ever performed, so
//! round-matrix invertibility is not enforced.
//!
//! Per round, every path does the same three things: shuffle the selector
//! bits of the last state word to the top, apply the S-box to that slice,
//! then the linear layer. The linear layer is split by output bits: the low
//! part through the column-masked lookup matrix (`mul_vl`), the nonlinear
//! slice through the transposed-column parity kernel, XORed together. Mask
//! shares travel through the full row-major matrix instead; the two routes
//! compute the same map.

use mith_binmat::{shuffle_perm, Backend, Kernels, Matrix};
use mith_crypto::Xof;

use crate::params::{ParamSet, Params};

/// One fully-expanded cipher instance bound to a kernel set.
pub struct Instance {
    pub params: &'static Params,
    pub(crate) kernels: Kernels,
    /// Round matrices L[r], row-major (shares path).
    pub(crate) l_full: Vec<Matrix>,
    /// L[r] with the nonlinear-slice output columns zeroed, lookup form.
    pub(crate) lz_lookup: Vec<Matrix>,
    /// The nonlinear-slice columns of L[r], transposed: row j is column
    /// `n − 3m + j`, feeding the parity-dot kernel.
    pub(crate) lt: Vec<Matrix>,
    /// Key matrices K[0..=r], row-major (shares path).
    pub(crate) k_full: Vec<Matrix>,
    /// K[0..=r] in lookup form (value paths).
    pub(crate) k_lookup: Vec<Matrix>,
    /// Round constants.
    pub(crate) rc: Vec<Matrix>,
    /// Public selector of the S-box bits within the last state word.
    pub(crate) nl_mask: u64,
    /// Index permutation induced by shuffling with `nl_mask`.
    pub(crate) nl_perm: [usize; 64],
}

impl Instance {
    /// Instance with auto-detected kernels.
    #[must_use]
    pub fn new(set: ParamSet) -> Self {
        let params = set.params();
        Self::generate(params, *Kernels::auto(params.state_bits))
    }

    /// Instance pinned to an explicit backend (None when the CPU lacks it).
    #[must_use]
    pub fn with_backend(set: ParamSet, backend: Backend) -> Option<Self> {
        let params = set.params();
        Kernels::for_backend(backend, params.state_bits).map(|k| Self::generate(params, k))
    }

    /// The backend this instance computes with.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.kernels.backend
    }

    fn generate(params: &'static Params, kernels: Kernels) -> Self {
        let n = params.state_bits;
        let r = params.cipher_rounds;
        let sb = params.sbox_bits();
        let row_bytes = params.input_size();

        let mut xof = Xof::new();
        xof.update(b"mith.cipher.instance.v1");
        xof.update(params.set.name().as_bytes());
        let mut reader = xof.finalize();
        let mut buf = vec![0u8; row_bytes];

        let mut squeeze_matrix = |rows: usize| {
            let mut m = Matrix::zero(rows, n);
            for row in 0..rows {
                reader.squeeze(&mut buf);
                m.fill_row_from_bytes(row, &buf);
            }
            m
        };

        let l_full: Vec<Matrix> = (0..r).map(|_| squeeze_matrix(n)).collect();
        let k_full: Vec<Matrix> = (0..=r).map(|_| squeeze_matrix(n)).collect();
        let rc: Vec<Matrix> = (0..r).map(|_| squeeze_matrix(1)).collect();

        let mut mask_bytes = [0u8; 8];
        reader.squeeze(&mut mask_bytes);
        let nl_mask = fix_popcount(u64::from_le_bytes(mask_bytes), sb as u32);
        let nl_perm = shuffle_perm(nl_mask);

        // Derived forms for the split linear layer.
        let top_mask = !0u64 << (64 - sb);
        let width = n / 64;
        let mut lz_lookup = Vec::with_capacity(r);
        let mut lt = Vec::with_capacity(r);
        for l in &l_full {
            let mut lz = l.clone();
            for row in 0..n {
                lz.row_mut(row)[width - 1] &= !top_mask;
            }
            lz_lookup.push(lz.precompute_lookup());

            let mut t = Matrix::zero(sb, n);
            for i in 0..n {
                let last = l.row(i)[width - 1];
                for j in 0..sb {
                    if (last >> (64 - sb + j)) & 1 != 0 {
                        t.set_bit(j, i, true);
                    }
                }
            }
            lt.push(t);
        }

        let k_lookup = k_full.iter().map(Matrix::precompute_lookup).collect();

        Self {
            params,
            kernels,
            l_full,
            lz_lookup,
            lt,
            k_full,
            k_lookup,
            rc,
            nl_mask,
            nl_perm,
        }
    }

    #[inline]
    pub(crate) fn shuffle_state(&self, x: &mut Matrix) {
        if self.params.sbox_count == 1 {
            (self.kernels.shuffle_3)(x, self.nl_mask);
        } else {
            (self.kernels.shuffle_30)(x, self.nl_mask);
        }
    }

    #[inline]
    pub(crate) fn parity_top(&self, c: &mut Matrix, v: &Matrix, at: &Matrix) {
        if self.params.sbox_count == 1 {
            (self.kernels.mul_v_parity_3)(c, v, at);
        } else {
            (self.kernels.mul_v_parity_30)(c, v, at);
        }
    }

    /// Run the cipher rounds on a value state with an arbitrary S-box word
    /// transform (plain or aux-producing). Round constants are skipped on
    /// the aux path, which evaluates mask values only.
    pub(crate) fn eval_value_rounds<F: FnMut(&mut u64)>(
        &self,
        state: &mut Matrix,
        key: &Matrix,
        with_rc: bool,
        mut sbox: F,
    ) {
        let n = self.params.state_bits;
        let w = n / 64;
        let k = &self.kernels;
        let mut lin = Matrix::zero(1, n);
        let mut top = Matrix::zero(1, n);
        let mut next = Matrix::zero(1, n);
        for r in 0..self.params.cipher_rounds {
            self.shuffle_state(state);
            let mut d = state.row(0)[w - 1];
            sbox(&mut d);
            state.row_mut(0)[w - 1] = d;

            (k.mul_vl)(&mut lin, state, &self.lz_lookup[r]);
            self.parity_top(&mut top, state, &self.lt[r]);
            (k.xor)(&mut next, &lin, &top);
            if with_rc {
                next.xor_assign(&self.rc[r]);
            }
            (k.addmul_vl)(&mut next, key, &self.k_lookup[r + 1]);
            state.copy_from(&next);
        }
    }

    /// Plain encryption: `ct = Enc_key(pt)`. Defines the public key.
    #[must_use]
    pub fn enc(&self, key_bytes: &[u8], pt_bytes: &[u8]) -> Vec<u8> {
        let n = self.params.state_bits;
        let k = &self.kernels;
        let key = Matrix::vector_from_bytes(n, key_bytes);
        let pt = Matrix::vector_from_bytes(n, pt_bytes);

        let mut state = Matrix::zero(1, n);
        (k.mul_vl)(&mut state, &key, &self.k_lookup[0]);
        state.xor_assign(&pt);

        let m = self.params.sbox_count;
        self.eval_value_rounds(&mut state, &key, true, |d| sbox_plain(d, m));

        let mut out = vec![0u8; self.params.input_size()];
        state.read_row_bytes(0, &mut out);
        out
    }
}

/// Deterministically adjust a word to the requested popcount: strip lowest
/// set bits while too heavy, then fill lowest clear bits while too light.
fn fix_popcount(mut x: u64, k: u32) -> u64 {
    while x.count_ones() > k {
        x &= x - 1;
    }
    let mut bit = 0;
    while x.count_ones() < k {
        if (x >> bit) & 1 == 0 {
            x |= 1 << bit;
        }
        bit += 1;
    }
    x
}

/// Bit `i` of `d` in the S-box's MSB-first view.
#[inline]
pub(crate) fn msb_bit(d: u64, i: usize) -> u64 {
    (d >> (63 - i)) & 1
}

/// Set bit `i` (MSB-first view) of `d`.
#[inline]
pub(crate) fn set_msb_bit(d: &mut u64, i: usize, b: u64) {
    *d = (*d & !(1u64 << (63 - i))) | (b << (63 - i));
}

/// The 3-bit S-box applied to the top `3m` bits of `d`:
/// `(a, b, c) → (a ⊕ bc, a ⊕ b ⊕ ca, a ⊕ b ⊕ c ⊕ ab)`.
pub(crate) fn sbox_plain(d: &mut u64, m: usize) {
    for i in (0..3 * m).step_by(3) {
        let a = msb_bit(*d, i + 2);
        let b = msb_bit(*d, i + 1);
        let c = msb_bit(*d, i);
        set_msb_bit(d, i + 2, a ^ (b & c));
        set_msb_bit(d, i + 1, a ^ b ^ (c & a));
        set_msb_bit(d, i, a ^ b ^ c ^ (a & b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_popcount_is_exact_and_stable() {
        for (x, k) in [(0u64, 30u32), (u64::MAX, 30), (0x1234, 3), (0xffff_ffff, 30)] {
            let m = fix_popcount(x, k);
            assert_eq!(m.count_ones(), k);
            assert_eq!(fix_popcount(m, k), m);
        }
    }

    #[test]
    fn sbox_permutes_each_triple() {
        // The 3-bit map must be a bijection on each triple.
        let mut seen = [false; 8];
        for t in 0u64..8 {
            let mut d = t << 61; // occupy the top triple
            sbox_plain(&mut d, 1);
            let out = (d >> 61) & 7;
            assert!(!seen[out as usize]);
            seen[out as usize] = true;
        }
    }

    #[test]
    fn enc_is_deterministic_and_key_sensitive() {
        let inst = Instance::new(ParamSet::L1);
        let key = [0x42u8; 16];
        let pt = [0x17u8; 16];
        let c1 = inst.enc(&key, &pt);
        let c2 = inst.enc(&key, &pt);
        assert_eq!(c1, c2);

        let mut key2 = key;
        key2[0] ^= 1;
        assert_ne!(inst.enc(&key2, &pt), c1);
        let mut pt2 = pt;
        pt2[15] ^= 0x80;
        assert_ne!(inst.enc(&key, &pt2), c1);
    }

    #[test]
    fn instances_differ_per_set() {
        let a = Instance::new(ParamSet::L1);
        let b = Instance::new(ParamSet::L1c);
        assert_ne!(a.nl_mask, b.nl_mask);
    }
}
