// crates/mith-binmat/src/dispatch.rs

//! Backend selection.
//!
//! A [`Kernels`] record binds one concrete implementation per operation for a
//! given state width. [`Kernels::auto`] picks the widest ISA the CPU offers
//! (AVX2 → SSE2 → NEON → scalar), once per process, into a read-only table;
//! [`Kernels::for_backend`] lets tests force any available backend and assert
//! bit-exact agreement.

use std::sync::OnceLock;

use crate::{scalar, shuffle, Matrix};

#[cfg(target_arch = "x86_64")]
use crate::{avx2, sse2};

#[cfg(target_arch = "aarch64")]
use crate::neon;

/// Three-operand kernel: destination, vector, matrix (or two sources for XOR).
pub type Kernel3 = fn(&mut Matrix, &Matrix, &Matrix);

/// Last-word shuffle kernel.
pub type ShuffleKernel = fn(&mut Matrix, u64);

/// Implementation families, in selection priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Scalar,
    Sse2,
    Avx2,
    Neon,
}

/// The capability set consumed by the cipher and protocol layers. Immutable
/// after construction; every member is pure on its outputs and deterministic
/// across backends.
#[derive(Clone, Copy)]
pub struct Kernels {
    pub backend: Backend,
    pub xor: Kernel3,
    pub mul_v: Kernel3,
    pub addmul_v: Kernel3,
    pub mul_vl: Kernel3,
    pub addmul_vl: Kernel3,
    pub mul_v_parity_30: Kernel3,
    pub mul_v_parity_3: Kernel3,
    pub shuffle_30: ShuffleKernel,
    pub shuffle_3: ShuffleKernel,
}

impl core::fmt::Debug for Kernels {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Kernels").field("backend", &self.backend).finish_non_exhaustive()
    }
}

impl Kernels {
    /// Portable kernels for an arbitrary vector width. The per-width tables
    /// below are preferred whenever the width is 128, 192 or 256.
    #[must_use]
    pub fn scalar_generic() -> Self {
        Self {
            backend: Backend::Scalar,
            xor: scalar::xor,
            mul_v: scalar::mul_v,
            addmul_v: scalar::addmul_v,
            mul_vl: scalar::mul_vl,
            addmul_vl: scalar::addmul_vl,
            mul_v_parity_30: scalar::mul_v_parity_30,
            mul_v_parity_3: scalar::mul_v_parity_3,
            shuffle_30: shuffle::shuffle_30,
            shuffle_3: shuffle::shuffle_3,
        }
    }

    /// Width-specialized scalar kernels.
    #[must_use]
    pub fn scalar(width_bits: usize) -> Self {
        let mut k = Self::scalar_generic();
        match width_bits {
            128 => {
                k.xor = scalar::xor_128;
                k.mul_v = scalar::mul_v_128;
                k.addmul_v = scalar::addmul_v_128;
            }
            192 => {
                k.xor = scalar::xor_192;
                k.mul_v = scalar::mul_v_192;
                k.addmul_v = scalar::addmul_v_192;
            }
            256 => {
                k.xor = scalar::xor_256;
                k.mul_v = scalar::mul_v_256;
                k.addmul_v = scalar::addmul_v_256;
            }
            _ => panic!("unsupported state width {width_bits}"),
        }
        k
    }

    /// Kernels for an explicitly chosen backend, or `None` when the current
    /// CPU (or target) cannot run it.
    #[must_use]
    pub fn for_backend(backend: Backend, width_bits: usize) -> Option<Self> {
        assert!(
            matches!(width_bits, 128 | 192 | 256),
            "unsupported state width {width_bits}"
        );
        match backend {
            Backend::Scalar => Some(Self::scalar(width_bits)),
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 => Some(Self::sse2(width_bits)),
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => {
                if std::arch::is_x86_feature_detected!("avx2") {
                    Some(Self::avx2(width_bits))
                } else {
                    None
                }
            }
            #[cfg(target_arch = "aarch64")]
            Backend::Neon => Some(Self::neon(width_bits)),
            #[cfg(not(all(target_arch = "x86_64", target_arch = "aarch64")))]
            _ => None,
        }
    }

    /// Every backend the current CPU can run, scalar first.
    #[must_use]
    pub fn available_backends() -> Vec<Backend> {
        let mut out = vec![Backend::Scalar];
        #[cfg(target_arch = "x86_64")]
        {
            out.push(Backend::Sse2);
            if std::arch::is_x86_feature_detected!("avx2") {
                out.push(Backend::Avx2);
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            out.push(Backend::Neon);
        }
        out
    }

    /// The process-wide auto-selected table for the given state width.
    #[must_use]
    pub fn auto(width_bits: usize) -> &'static Self {
        static TABLE: OnceLock<[Kernels; 3]> = OnceLock::new();
        let table = TABLE.get_or_init(|| {
            let backend = detect();
            [128, 192, 256].map(|w| {
                Kernels::for_backend(backend, w).unwrap_or_else(|| Kernels::scalar(w))
            })
        });
        match width_bits {
            128 => &table[0],
            192 => &table[1],
            256 => &table[2],
            _ => panic!("unsupported state width {width_bits}"),
        }
    }

    #[cfg(target_arch = "x86_64")]
    fn sse2(width_bits: usize) -> Self {
        let mut k = Self::scalar(width_bits);
        k.backend = Backend::Sse2;
        k.xor = sse2::xor;
        k.mul_v_parity_30 = scalar::mul_v_parity_popcnt_30;
        k.mul_v_parity_3 = scalar::mul_v_parity_popcnt_3;
        if width_bits == 128 {
            k.mul_v = sse2::mul_v_128;
            k.addmul_v = sse2::addmul_v_128;
            k.mul_vl = sse2::mul_vl_128;
            k.addmul_vl = sse2::addmul_vl_128;
        } else {
            k.mul_v = sse2::mul_v_wide;
            k.addmul_v = sse2::addmul_v_wide;
            k.mul_vl = sse2::mul_vl_wide;
            k.addmul_vl = sse2::addmul_vl_wide;
        }
        k
    }

    #[cfg(target_arch = "x86_64")]
    fn avx2(width_bits: usize) -> Self {
        let mut k = Self::sse2(width_bits);
        k.backend = Backend::Avx2;
        if width_bits == 128 {
            // 128-bit rows: two rows per 256-bit register with split masks;
            // the lookup walk stays on the 128-bit path.
            k.mul_v = avx2::mul_v_128;
            k.addmul_v = avx2::addmul_v_128;
        } else {
            k.xor = avx2::xor_wide;
            k.mul_v = avx2::mul_v_wide;
            k.addmul_v = avx2::addmul_v_wide;
            k.mul_vl = avx2::mul_vl_wide;
            k.addmul_vl = avx2::addmul_vl_wide;
        }
        if std::arch::is_x86_feature_detected!("bmi2") {
            k.shuffle_30 = shuffle::pext::shuffle_30;
            k.shuffle_3 = shuffle::pext::shuffle_3;
        }
        k
    }

    #[cfg(target_arch = "aarch64")]
    fn neon(width_bits: usize) -> Self {
        let mut k = Self::scalar(width_bits);
        k.backend = Backend::Neon;
        k.xor = neon::xor;
        k.mul_v_parity_30 = scalar::mul_v_parity_popcnt_30;
        k.mul_v_parity_3 = scalar::mul_v_parity_popcnt_3;
        if width_bits == 128 {
            k.mul_v = neon::mul_v_128;
            k.addmul_v = neon::addmul_v_128;
            k.mul_vl = neon::mul_vl_128;
            k.addmul_vl = neon::addmul_vl_128;
        } else {
            k.mul_v = neon::mul_v_wide;
            k.addmul_v = neon::addmul_v_wide;
            k.mul_vl = neon::mul_vl_wide;
            k.addmul_vl = neon::addmul_vl_wide;
        }
        k
    }
}

fn detect() -> Backend {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            Backend::Avx2
        } else {
            Backend::Sse2
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        Backend::Neon
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        Backend::Scalar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_table_is_stable() {
        let a = Kernels::auto(128);
        let b = Kernels::auto(128);
        assert_eq!(a.backend, b.backend);
    }

    #[test]
    fn scalar_always_available() {
        assert!(Kernels::available_backends().contains(&Backend::Scalar));
        for w in [128, 192, 256] {
            assert_eq!(Kernels::for_backend(Backend::Scalar, w).map(|k| k.backend), Some(Backend::Scalar));
        }
    }
}
