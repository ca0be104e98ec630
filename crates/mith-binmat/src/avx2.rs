// crates/mith-binmat/src/avx2.rs

//! AVX2 kernels (x86-64, runtime detected). 192/256-bit rows are one 256-bit
//! register; 128-bit operands pack two rows per register with a split mask.
//!
//! # Selection contract
//! Every public function here is only bound into a dispatch table after
//! `is_x86_feature_detected!("avx2")` has returned true; the `unsafe` blocks
//! in the wrappers rely on exactly that.

use core::arch::x86_64::{
    __m128i, __m256i, _mm256_and_si256, _mm256_castsi256_si128, _mm256_extracti128_si256,
    _mm256_loadu_si256, _mm256_set1_epi64x, _mm256_set_epi64x, _mm256_setzero_si256,
    _mm256_storeu_si256, _mm256_xor_si256, _mm_loadu_si128, _mm_storeu_si128, _mm_xor_si128,
};

use crate::Matrix;

#[inline]
unsafe fn load(p: *const u64) -> __m256i {
    unsafe { _mm256_loadu_si256(p.cast()) }
}

#[inline]
unsafe fn store(p: *mut u64, v: __m256i) {
    unsafe { _mm256_storeu_si256(p.cast(), v) }
}

#[inline]
unsafe fn mask256(idx: u64, bit: u32) -> __m256i {
    unsafe { _mm256_set1_epi64x((((idx >> bit) & 1).wrapping_neg()) as i64) }
}

/// Masks for two adjacent vector bits, replicated per 128-bit half; used by
/// the row-pair walk over 128-bit operands.
#[inline]
unsafe fn mask256_2(idx: u64, bit: u32) -> __m256i {
    let m1 = ((idx >> bit) & 1).wrapping_neg() as i64;
    let m2 = ((idx >> (bit + 1)) & 1).wrapping_neg() as i64;
    unsafe { _mm256_set_epi64x(m2, m2, m1, m1) }
}

#[inline]
unsafe fn fold128(x: __m256i) -> __m128i {
    unsafe { _mm_xor_si128(_mm256_castsi256_si128(x), _mm256_extracti128_si256::<1>(x)) }
}

/* ------------------------------- XOR ------------------------------------ */

#[target_feature(enable = "avx2")]
unsafe fn xor_words(res: &mut Matrix, a: &Matrix, b: &Matrix) {
    let n = a.words().len();
    let ap = a.words().as_ptr();
    let bp = b.words().as_ptr();
    let rp = res.words_mut().as_mut_ptr();
    let mut i = 0;
    while i < n {
        unsafe {
            store(rp.add(i), _mm256_xor_si256(load(ap.add(i)), load(bp.add(i))));
        }
        i += 4;
    }
}

/// XOR for stride-4 operands (width 3 and 4).
pub(crate) fn xor_wide(res: &mut Matrix, a: &Matrix, b: &Matrix) {
    debug_assert_eq!(a.words().len() % 4, 0);
    // SAFETY: selection contract (module docs).
    unsafe { xor_words(res, a, b) }
}

/* --------------------------- mul_v / addmul_v --------------------------- */

#[target_feature(enable = "avx2")]
unsafe fn addmul_v_128_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = _mm256_setzero_si256();
        let mut acc1 = _mm256_setzero_si256();
        let mut off = 0usize;
        for w in 0..2 {
            let mut idx = vw[w];
            for _ in 0..8 {
                acc0 = _mm256_xor_si256(acc0, _mm256_and_si256(load(ap.add(off)), mask256_2(idx, 0)));
                acc1 = _mm256_xor_si256(acc1, _mm256_and_si256(load(ap.add(off + 4)), mask256_2(idx, 2)));
                acc0 = _mm256_xor_si256(acc0, _mm256_and_si256(load(ap.add(off + 8)), mask256_2(idx, 4)));
                acc1 = _mm256_xor_si256(acc1, _mm256_and_si256(load(ap.add(off + 12)), mask256_2(idx, 6)));
                idx >>= 8;
                off += 16;
            }
        }
        let mut folded = fold128(_mm256_xor_si256(acc0, acc1));
        if accumulate {
            folded = _mm_xor_si128(folded, _mm_loadu_si128(cp.cast()));
        }
        _mm_storeu_si128(cp.cast(), folded);
    }
}

#[target_feature(enable = "avx2")]
unsafe fn addmul_v_wide_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let width = v.width();
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { _mm256_setzero_si256() };
        let mut acc1 = _mm256_setzero_si256();
        let mut off = 0usize;
        for w in 0..width {
            let mut idx = vw[w];
            for _ in 0..16 {
                acc0 = _mm256_xor_si256(acc0, _mm256_and_si256(load(ap.add(off)), mask256(idx, 0)));
                acc1 = _mm256_xor_si256(acc1, _mm256_and_si256(load(ap.add(off + 4)), mask256(idx, 1)));
                acc0 = _mm256_xor_si256(acc0, _mm256_and_si256(load(ap.add(off + 8)), mask256(idx, 2)));
                acc1 = _mm256_xor_si256(acc1, _mm256_and_si256(load(ap.add(off + 12)), mask256(idx, 3)));
                idx >>= 4;
                off += 16;
            }
        }
        store(cp, _mm256_xor_si256(acc0, acc1));
    }
}

pub(crate) fn mul_v_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: selection contract (module docs).
    unsafe { addmul_v_128_impl(c, v, a, false) }
}

pub(crate) fn addmul_v_128(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: selection contract (module docs).
    unsafe { addmul_v_128_impl(c, v, a, true) }
}

pub(crate) fn mul_v_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: selection contract (module docs).
    unsafe { addmul_v_wide_impl(c, v, a, false) }
}

pub(crate) fn addmul_v_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: selection contract (module docs).
    unsafe { addmul_v_wide_impl(c, v, a, true) }
}

/* --------------------------- lookup variants ---------------------------- */

#[target_feature(enable = "avx2")]
unsafe fn addmul_vl_wide_impl(c: &mut Matrix, v: &Matrix, a: &Matrix, accumulate: bool) {
    let width = v.width();
    let vw = v.row(0);
    let ap = a.words().as_ptr();
    unsafe {
        let cp = c.words_mut().as_mut_ptr();
        let mut acc0 = if accumulate { load(cp) } else { _mm256_setzero_si256() };
        let mut acc1 = _mm256_setzero_si256();
        let mut block = 0usize;
        for w in 0..width {
            let mut idx = vw[w];
            for _ in 0..4 {
                let c0 = (idx & 0xff) as usize * 4;
                acc0 = _mm256_xor_si256(acc0, load(ap.add(block + c0)));
                block += 1024;
                let c1 = ((idx >> 8) & 0xff) as usize * 4;
                acc1 = _mm256_xor_si256(acc1, load(ap.add(block + c1)));
                block += 1024;
                idx >>= 16;
            }
        }
        store(cp, _mm256_xor_si256(acc0, acc1));
    }
}

pub(crate) fn mul_vl_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: selection contract (module docs).
    unsafe { addmul_vl_wide_impl(c, v, a, false) }
}

pub(crate) fn addmul_vl_wide(c: &mut Matrix, v: &Matrix, a: &Matrix) {
    // SAFETY: selection contract (module docs).
    unsafe { addmul_vl_wide_impl(c, v, a, true) }
}
