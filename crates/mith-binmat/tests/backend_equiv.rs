//! Cross-backend battery: every available backend must agree bit-for-bit
//! with the scalar reference on every kernel, for every supported width.

use mith_binmat::{shuffle_perm, shuffle_word, Backend, Kernels, Matrix};

/// Deterministic xorshift so the battery is reproducible.
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed | 1)
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

fn rand_matrix(rng: &mut Rng, rows: usize, cols: usize) -> Matrix {
    let mut m = Matrix::zero(rows, cols);
    for r in 0..rows {
        for w in 0..m.width() {
            m.row_mut(r)[w] = rng.next();
        }
    }
    m
}

fn rand_vector(rng: &mut Rng, cols: usize) -> Matrix {
    rand_matrix(rng, 1, cols)
}

fn mask_with_popcount(rng: &mut Rng, k: u32) -> u64 {
    let mut m = rng.next();
    while m.count_ones() > k {
        m &= m - 1; // drop lowest set bit
    }
    let mut bit = 0;
    while m.count_ones() < k {
        if (m >> bit) & 1 == 0 {
            m |= 1 << bit;
        }
        bit += 1;
    }
    m
}

#[test]
fn all_backends_match_scalar_on_core_kernels() {
    for width in [128usize, 192, 256] {
        let mut rng = Rng::new(0xc0ff_ee00 + width as u64);
        let a = rand_matrix(&mut rng, width, width);
        let al = a.precompute_lookup();
        let at30 = rand_matrix(&mut rng, 30, width);
        let at3 = rand_matrix(&mut rng, 3, width);
        let scalar = Kernels::scalar(width);

        for _ in 0..64 {
            let v = rand_vector(&mut rng, width);
            let x = rand_vector(&mut rng, width);
            let seed_acc = rand_vector(&mut rng, width);

            let mut want = Matrix::zero(1, width);
            for backend in Kernels::available_backends() {
                let k = Kernels::for_backend(backend, width).expect("listed backend");
                let mut got = Matrix::zero(1, width);

                (scalar.xor)(&mut want, &v, &x);
                (k.xor)(&mut got, &v, &x);
                assert_eq!(want, got, "xor {backend:?} width {width}");

                (scalar.mul_v)(&mut want, &v, &a);
                (k.mul_v)(&mut got, &v, &a);
                assert_eq!(want, got, "mul_v {backend:?} width {width}");

                want.copy_from(&seed_acc);
                got.copy_from(&seed_acc);
                (scalar.addmul_v)(&mut want, &v, &a);
                (k.addmul_v)(&mut got, &v, &a);
                assert_eq!(want, got, "addmul_v {backend:?} width {width}");

                (scalar.mul_vl)(&mut want, &v, &al);
                (k.mul_vl)(&mut got, &v, &al);
                assert_eq!(want, got, "mul_vl {backend:?} width {width}");

                want.copy_from(&seed_acc);
                got.copy_from(&seed_acc);
                (scalar.addmul_vl)(&mut want, &v, &al);
                (k.addmul_vl)(&mut got, &v, &al);
                assert_eq!(want, got, "addmul_vl {backend:?} width {width}");

                (scalar.mul_v_parity_30)(&mut want, &v, &at30);
                (k.mul_v_parity_30)(&mut got, &v, &at30);
                assert_eq!(want, got, "parity_30 {backend:?} width {width}");

                (scalar.mul_v_parity_3)(&mut want, &v, &at3);
                (k.mul_v_parity_3)(&mut got, &v, &at3);
                assert_eq!(want, got, "parity_3 {backend:?} width {width}");
            }
        }
    }
}

/// 1024 vectors per width, scalar vs every SIMD backend, byte-equality of
/// the product.
#[test]
fn mul_v_thousand_vector_battery() {
    for width in [128usize, 192, 256] {
        let mut rng = Rng::new(0xbead_5eed ^ width as u64);
        let a = rand_matrix(&mut rng, width, width);
        let scalar = Kernels::scalar(width);
        let simd: Vec<Kernels> = Kernels::available_backends()
            .into_iter()
            .filter(|b| *b != Backend::Scalar)
            .map(|b| Kernels::for_backend(b, width).expect("listed backend"))
            .collect();

        let mut want = Matrix::zero(1, width);
        let mut got = Matrix::zero(1, width);
        let mut bytes_want = vec![0u8; width / 8];
        let mut bytes_got = vec![0u8; width / 8];
        for _ in 0..1024 {
            let v = rand_vector(&mut rng, width);
            (scalar.mul_v)(&mut want, &v, &a);
            for k in &simd {
                (k.mul_v)(&mut got, &v, &a);
                want.read_row_bytes(0, &mut bytes_want);
                got.read_row_bytes(0, &mut bytes_got);
                assert_eq!(bytes_want, bytes_got, "{:?} width {width}", k.backend);
            }
        }
    }
}

#[test]
fn mul_equals_addmul_on_cleared_accumulator() {
    for width in [128usize, 192, 256] {
        let mut rng = Rng::new(0xabcd + width as u64);
        let a = rand_matrix(&mut rng, width, width);
        for backend in Kernels::available_backends() {
            let k = Kernels::for_backend(backend, width).expect("listed backend");
            let v = rand_vector(&mut rng, width);
            let mut c0 = Matrix::zero(1, width);
            let mut c1 = rand_vector(&mut rng, width);
            c1.clear();
            (k.mul_v)(&mut c0, &v, &a);
            (k.addmul_v)(&mut c1, &v, &a);
            assert_eq!(c0, c1, "{backend:?} width {width}");
        }
    }
}

#[test]
fn xor_algebra() {
    for width in [128usize, 192, 256] {
        let mut rng = Rng::new(0x5151 + width as u64);
        let k = Kernels::scalar(width);
        let x = rand_vector(&mut rng, width);
        let y = rand_vector(&mut rng, width);
        let zero = Matrix::zero(1, width);

        let mut xy = Matrix::zero(1, width);
        let mut yx = Matrix::zero(1, width);
        (k.xor)(&mut xy, &x, &y);
        (k.xor)(&mut yx, &y, &x);
        assert_eq!(xy, yx);

        let mut xx = Matrix::zero(1, width);
        (k.xor)(&mut xx, &x, &x);
        assert_eq!(xx, zero);
    }
}

#[test]
fn lookup_form_matches_direct_product() {
    for width in [128usize, 192, 256] {
        let mut rng = Rng::new(0x1005_0ca7 + width as u64);
        let a = rand_matrix(&mut rng, width, width);
        let al = a.precompute_lookup();
        for backend in Kernels::available_backends() {
            let k = Kernels::for_backend(backend, width).expect("listed backend");
            let v = rand_vector(&mut rng, width);
            let mut direct = Matrix::zero(1, width);
            let mut lookup = Matrix::zero(1, width);
            (k.mul_v)(&mut direct, &v, &a);
            (k.mul_vl)(&mut lookup, &v, &al);
            assert_eq!(direct, lookup, "{backend:?} width {width}");
        }
    }
}

#[test]
fn parity_kernels_zero_low_bits() {
    for width in [128usize, 192, 256] {
        let mut rng = Rng::new(0x9999 + width as u64);
        let at30 = rand_matrix(&mut rng, 30, width);
        let at3 = rand_matrix(&mut rng, 3, width);
        for backend in Kernels::available_backends() {
            let k = Kernels::for_backend(backend, width).expect("listed backend");
            let v = rand_vector(&mut rng, width);
            let mut c = rand_vector(&mut rng, width);
            (k.mul_v_parity_30)(&mut c, &v, &at30);
            let w = c.width();
            for i in 0..w - 1 {
                assert_eq!(c.row(0)[i], 0);
            }
            assert_eq!(c.row(0)[w - 1] & ((1u64 << 34) - 1), 0);

            (k.mul_v_parity_3)(&mut c, &v, &at3);
            for i in 0..w - 1 {
                assert_eq!(c.row(0)[i], 0);
            }
            assert_eq!(c.row(0)[w - 1] & ((1u64 << 61) - 1), 0);
        }
    }
}

#[test]
fn shuffle_backends_agree_and_permute() {
    for width in [128usize, 192, 256] {
        let mut rng = Rng::new(0x7777 ^ width as u64);
        for _ in 0..32 {
            let mask30 = mask_with_popcount(&mut rng, 30);
            let mask3 = mask_with_popcount(&mut rng, 3);
            let v = rand_vector(&mut rng, width);
            let w = v.width();

            let expect30 = shuffle_word(v.row(0)[w - 1], mask30);
            let expect3 = shuffle_word(v.row(0)[w - 1], mask3);

            for backend in Kernels::available_backends() {
                let k = Kernels::for_backend(backend, width).expect("listed backend");

                let mut x = v.clone();
                (k.shuffle_30)(&mut x, mask30);
                assert_eq!(x.row(0)[w - 1], expect30, "{backend:?}");
                // Words below the last are untouched.
                assert_eq!(&x.row(0)[..w - 1], &v.row(0)[..w - 1]);

                let mut y = v.clone();
                (k.shuffle_3)(&mut y, mask3);
                assert_eq!(y.row(0)[w - 1], expect3, "{backend:?}");
            }

            // Round trip through the induced permutation.
            let perm = shuffle_perm(mask30);
            let mut back = 0u64;
            for (old, &new) in perm.iter().enumerate() {
                back |= ((expect30 >> new) & 1) << old;
            }
            assert_eq!(back, v.row(0)[w - 1]);
        }
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// addmul is mul followed by an XOR of the previous accumulator.
        #[test]
        fn addmul_decomposes(seed in any::<u64>()) {
            let mut rng = super::Rng::new(seed);
            let a = rand_matrix(&mut rng, 128, 128);
            let v = rand_vector(&mut rng, 128);
            let acc = rand_vector(&mut rng, 128);
            let k = Kernels::scalar(128);

            let mut left = Matrix::zero(1, 128);
            left.copy_from(&acc);
            (k.addmul_v)(&mut left, &v, &a);

            let mut prod = Matrix::zero(1, 128);
            (k.mul_v)(&mut prod, &v, &a);
            let mut right = Matrix::zero(1, 128);
            (k.xor)(&mut right, &prod, &acc);

            prop_assert_eq!(left, right);
        }

        /// v·A over GF(2) is linear: (v ⊕ w)·A = v·A ⊕ w·A.
        #[test]
        fn mul_is_linear(seed in any::<u64>()) {
            let mut rng = super::Rng::new(seed);
            let a = rand_matrix(&mut rng, 192, 192);
            let v = rand_vector(&mut rng, 192);
            let w = rand_vector(&mut rng, 192);
            let k = Kernels::scalar(192);

            let mut vw = Matrix::zero(1, 192);
            (k.xor)(&mut vw, &v, &w);
            let mut left = Matrix::zero(1, 192);
            (k.mul_v)(&mut left, &vw, &a);

            let mut right = Matrix::zero(1, 192);
            (k.mul_v)(&mut right, &v, &a);
            (k.addmul_v)(&mut right, &w, &a);

            prop_assert_eq!(left, right);
        }
    }
}
