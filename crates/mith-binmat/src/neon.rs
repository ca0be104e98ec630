// crates/mith-binmat/src/neon.rs

//! NEON kernels (aarch64, where NEON is baseline). Same shape as the SSE2
//! backend: 128-bit registers, two-register rows for widths 3 and 4.

use core::arch::aarch64::{
    uint64x2_t, vandq_u64, vdupq_n_u64, veorq_u64, vld1q_u64, vst1q_u64,
};

use crate::Matrix;

#[inline]
unsafe fn load(p: *const u64) -> uint64x2_t {
    unsafe { vld1q_u64(p) }
}

#[inline]
unsafe fn store(p: *mut u64, v: uint64x2_t) {
    unsafe { vst1q_u64(p, v) }
}

#[inline]
unsafe fn mask128(idx: u64, bit: u32) -> uint64x2_t {
    unsafe { vdupq_n_u64(((idx >> bit) & 1).wrapping_neg()) }
}

/* ------------------------------- XOR ------------------------------------ */

#[target_feature(enable = "neon")]
unsafe fn xor_words(res: &mut Matrix, a: &Matrix, b: &Matrix) {
    let n = a.words().len();
    let ap = a.words().as_ptr();
    let bp = b.words().as_ptr();
    let rp = res.words_mut().as_mut_ptr();
    let mut i = 0;
    while i < n {
        unsafe {
            store(rp.add(i), veorq_u64(load(ap.add(i)), load(bp.add(i))));
        }
        i += 2;
    }
}

pub(crate) fn xor(res: &mut Matrix, a: &Matrix, b: &Matrix) {
    debug_assert_eq!(a.words().len() % 2, 0);
    // SAFETY: NEON is baseline on aarch64.
    unsafe { xor_words(res, a, b) }
}

/* --------------------------- mul_v / addmul_v --------------------------- */

#[target_feature(enable = "neon")]
unsafe fn addmul_v_128_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { vdupq_n_u64(0) };
        let mut acc1 = vdupq_n_u64(0);
        let mut off = 0usize;
        for w in 0..2 {
            let mut idx = vw[w];
            for _ in 0..16 {
                acc0 = veorq_u64(acc0, vandq_u64(load(ap.add(off)), mask128(idx, 0)));
                acc1 = veorq_u64(acc1, vandq_u64(load(ap.add(off + 2)), mask128(idx, 1)));
                acc0 = veorq_u64(acc0, vandq_u64(load(ap.add(off + 4)), mask128(idx, 2)));
                acc1 = veorq_u64(acc1, vandq_u64(load(ap.add(off + 6)), mask128(idx, 3)));
                idx >>= 4;
                off += 8;
            }
        }
        store(cp, veorq_u64(acc0, acc1));
    }
}

#[target_feature(enable = "neon")]
unsafe fn addmul_v_wide_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let width = v.width();
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { vdupq_n_u64(0) };
        let mut acc1 = if accumulate { load(cp.add(2)) } else { vdupq_n_u64(0) };
        let mut acc2 = vdupq_n_u64(0);
        let mut acc3 = vdupq_n_u64(0);
        let mut off = 0usize;
        for w in 0..width {
            let mut idx = vw[w];
            for _ in 0..32 {
                let m0 = mask128(idx, 0);
                let m1 = mask128(idx, 1);
                acc0 = veorq_u64(acc0, vandq_u64(load(ap.add(off)), m0));
                acc1 = veorq_u64(acc1, vandq_u64(load(ap.add(off + 2)), m0));
                acc2 = veorq_u64(acc2, vandq_u64(load(ap.add(off + 4)), m1));
                acc3 = veorq_u64(acc3, vandq_u64(load(ap.add(off + 6)), m1));
                idx >>= 2;
                off += 8;
            }
        }
        store(cp, veorq_u64(acc0, acc2));
        store(cp.add(2), veorq_u64(acc1, acc3));
    }
}

pub(crate) fn mul_v_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { addmul_v_128_impl(c, v, a, false) }
}

pub(crate) fn addmul_v_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { addmul_v_128_impl(c, v, a, true) }
}

pub(crate) fn mul_v_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { addmul_v_wide_impl(c, v, a, false) }
}

pub(crate) fn addmul_v_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { addmul_v_wide_impl(c, v, a, true) }
}

/* --------------------------- lookup variants ---------------------------- */

#[target_feature(enable = "neon")]
unsafe fn addmul_vl_128_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { vdupq_n_u64(0) };
        let mut acc1 = vdupq_n_u64(0);
        let mut block = 0usize;
        for w in 0..2 {
            let mut idx = vw[w];
            for _ in 0..4 {
                let c0 = (idx & 0xff) as usize;
                acc0 = veorq_u64(acc0, load(ap.add(block + c0 * 2)));
                block += 512;
                let c1 = ((idx >> 8) & 0xff) as usize;
                acc1 = veorq_u64(acc1, load(ap.add(block + c1 * 2)));
                block += 512;
                idx >>= 16;
            }
        }
        store(cp, veorq_u64(acc0, acc1));
    }
}

#[target_feature(enable = "neon")]
unsafe fn addmul_vl_wide_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let width = v.width();
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { vdupq_n_u64(0) };
        let mut acc1 = if accumulate { load(cp.add(2)) } else { vdupq_n_u64(0) };
        let mut acc2 = vdupq_n_u64(0);
        let mut acc3 = vdupq_n_u64(0);
        let mut block = 0usize;
        for w in 0..width {
            let mut idx = vw[w];
            for _ in 0..4 {
                let c0 = (idx & 0xff) as usize * 4;
                acc0 = veorq_u64(acc0, load(ap.add(block + c0)));
                acc1 = veorq_u64(acc1, load(ap.add(block + c0 + 2)));
                block += 1024;
                let c1 = ((idx >> 8) & 0xff) as usize * 4;
                acc2 = veorq_u64(acc2, load(ap.add(block + c1)));
                acc3 = veorq_u64(acc3, load(ap.add(block + c1 + 2)));
                block += 1024;
                idx >>= 16;
            }
        }
        store(cp, veorq_u64(acc0, acc2));
        store(cp.add(2), veorq_u64(acc1, acc3));
    }
}

pub(crate) fn mul_vl_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { addmul_vl_128_impl(c, v, a, false) }
}

pub(crate) fn addmul_vl_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { addmul_vl_128_impl(c, v, a, true) }
}

pub(crate) fn mul_vl_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { addmul_vl_wide_impl(c, v, a, false) }
}

pub(crate) fn addmul_vl_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: NEON is baseline on aarch64.
    unsafe { addmul_vl_wide_impl(c, v, a, true) }
}
