// crates/mith-binmat/src/sse2.rs

//! SSE2 kernels (x86-64). SSE2 is baseline on x86-64, so the safe wrappers
//! here are unconditionally sound; they still go through `target_feature`
//! functions so the compiler may assume the ISA in the hot loops.

use core::arch::x86_64::{
    __m128i, _mm_and_si128, _mm_loadu_si128, _mm_set1_epi64x, _mm_setzero_si128, _mm_storeu_si128,
    _mm_xor_si128,
};

use crate::Matrix;

#[inline]
unsafe fn load(p: *const u64) -> __m128i {
    unsafe { _mm_loadu_si128(p.cast()) }
}

#[inline]
unsafe fn store(p: *mut u64, v: __m128i) {
    unsafe { _mm_storeu_si128(p.cast(), v) }
}

#[inline]
unsafe fn mask128(idx: u64, bit: u32) -> __m128i {
    unsafe { _mm_set1_epi64x((((idx >> bit) & 1).wrapping_neg()) as i64) }
}

/* ------------------------------- XOR ------------------------------------ */

#[target_feature(enable = "sse2")]
unsafe fn xor_words(res: &mut Matrix, a: &Matrix, b: &Matrix) {
    let n = a.words().len();
    let ap = a.words().as_ptr();
    let bp = b.words().as_ptr();
    let rp = res.words_mut().as_mut_ptr();
    let mut i = 0;
    while i < n {
        unsafe {
            let x = _mm_xor_si128(load(ap.add(i)), load(bp.add(i)));
            store(rp.add(i), x);
        }
        i += 2;
    }
}

pub(crate) fn xor(res: &mut Matrix, a: &Matrix, b: &Matrix) {
    debug_assert_eq!(a.words().len() % 2, 0);
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { xor_words(res, a, b) }
}

/* --------------------------- mul_v / addmul_v --------------------------- */

#[target_feature(enable = "sse2")]
unsafe fn addmul_v_128_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { _mm_setzero_si128() };
        let mut acc1 = _mm_setzero_si128();
        let mut off = 0usize;
        for w in 0..2 {
            let mut idx = vw[w];
            for _ in 0..16 {
                acc0 = _mm_xor_si128(acc0, _mm_and_si128(load(ap.add(off)), mask128(idx, 0)));
                acc1 = _mm_xor_si128(acc1, _mm_and_si128(load(ap.add(off + 2)), mask128(idx, 1)));
                acc0 = _mm_xor_si128(acc0, _mm_and_si128(load(ap.add(off + 4)), mask128(idx, 2)));
                acc1 = _mm_xor_si128(acc1, _mm_and_si128(load(ap.add(off + 6)), mask128(idx, 3)));
                idx >>= 4;
                off += 8;
            }
        }
        store(cp, _mm_xor_si128(acc0, acc1));
    }
}

/// Width-3/4 operands: rows are two `__m128i`; two rows per iteration.
#[target_feature(enable = "sse2")]
unsafe fn addmul_v_wide_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let width = v.width();
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { _mm_setzero_si128() };
        let mut acc1 = if accumulate { load(cp.add(2)) } else { _mm_setzero_si128() };
        let mut acc2 = _mm_setzero_si128();
        let mut acc3 = _mm_setzero_si128();
        let mut off = 0usize;
        for w in 0..width {
            let mut idx = vw[w];
            for _ in 0..32 {
                let m0 = mask128(idx, 0);
                let m1 = mask128(idx, 1);
                acc0 = _mm_xor_si128(acc0, _mm_and_si128(load(ap.add(off)), m0));
                acc1 = _mm_xor_si128(acc1, _mm_and_si128(load(ap.add(off + 2)), m0));
                acc2 = _mm_xor_si128(acc2, _mm_and_si128(load(ap.add(off + 4)), m1));
                acc3 = _mm_xor_si128(acc3, _mm_and_si128(load(ap.add(off + 6)), m1));
                idx >>= 2;
                off += 8;
            }
        }
        store(cp, _mm_xor_si128(acc0, acc2));
        store(cp.add(2), _mm_xor_si128(acc1, acc3));
    }
}

pub(crate) fn mul_v_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { addmul_v_128_impl(c, v, a, false) }
}

pub(crate) fn addmul_v_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { addmul_v_128_impl(c, v, a, true) }
}

pub(crate) fn mul_v_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { addmul_v_wide_impl(c, v, a, false) }
}

pub(crate) fn addmul_v_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { addmul_v_wide_impl(c, v, a, true) }
}

/* --------------------------- lookup variants ---------------------------- */

#[target_feature(enable = "sse2")]
unsafe fn addmul_vl_128_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { _mm_setzero_si128() };
        let mut acc1 = _mm_setzero_si128();
        let mut block = 0usize; // word offset of the current 256-row block
        for w in 0..2 {
            let mut idx = vw[w];
            for _ in 0..4 {
                let c0 = (idx & 0xff) as usize;
                acc0 = _mm_xor_si128(acc0, load(ap.add(block + c0 * 2)));
                block += 512;
                let c1 = ((idx >> 8) & 0xff) as usize;
                acc1 = _mm_xor_si128(acc1, load(ap.add(block + c1 * 2)));
                block += 512;
                idx >>= 16;
            }
        }
        store(cp, _mm_xor_si128(acc0, acc1));
    }
}

#[target_feature(enable = "sse2")]
unsafe fn addmul_vl_wide_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let width = v.width();
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { _mm_setzero_si128() };
        let mut acc1 = if accumulate { load(cp.add(2)) } else { _mm_setzero_si128() };
        let mut acc2 = _mm_setzero_si128();
        let mut acc3 = _mm_setzero_si128();
        let mut block = 0usize;
        for w in 0..width {
            let mut idx = vw[w];
            for _ in 0..4 {
                let c0 = (idx & 0xff) as usize * 4;
                acc0 = _mm_xor_si128(acc0, load(ap.add(block + c0)));
                acc1 = _mm_xor_si128(acc1, load(ap.add(block + c0 + 2)));
                block += 1024;
                let c1 = ((idx >> 8) & 0xff) as usize * 4;
                acc2 = _mm_xor_si128(acc2, load(ap.add(block + c1)));
                acc3 = _mm_xor_si128(acc3, load(ap.add(block + c1 + 2)));
                block += 1024;
                idx >>= 16;
            }
        }
        store(cp, _mm_xor_si128(acc0, acc2));
        store(cp.add(2), _mm_xor_si128(acc1, acc3));
    }
}

pub(crate) fn mul_vl_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { addmul_vl_128_impl(c, v, a, false) }
}

pub(crate) fn addmul_vl_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { addmul_vl_128_impl(c, v, a, true) }
}

pub(crate) fn mul_vl_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { addmul_vl_wide_impl(c, v, a, false) }
}

pub(crate) fn addmul_vl_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: SSE2 is baseline on x86-64.
    unsafe { addmul_vl_wide_impl(c, v, a, true) }
}
