// crates/mith-crypto/src/lib.rs

//! The H / H⁴ extendable-output hash contract.
//!
//! Every hash in the signature scheme goes through this interface: init
//! (optionally with a 1-byte domain prefix), absorb, finalize, squeeze.
//! Realized over BLAKE3's XOF with a fixed workspace domain string, the same
//! way the transcript layer seeds its hasher. Callers depend only on the
//! contract; absorption *order* is part of the protocol and lives with the
//! callers.
//!
//! The 4-lane form drives four hashers over shared or per-lane inputs.
//! Callers never assume any cross-lane mixing, so the batching is purely an
//! API affordance (and a vectorization opportunity for the backend hash).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all, clippy::unwrap_used, clippy::expect_used)]

use blake3::{Hasher, OutputReader};

/// Fixed domain prefix seeding every hasher in the workspace.
const DOMAIN: &[u8] = b"mith.xof.v1";

/// 1-byte domain prefixes for the places the protocol re-keys the oracle.
pub mod prefix {
    /// Challenge-extension rehash inside HCP (`h := H(prefix, h)`).
    pub const REHASH: u8 = 1;
    /// Seed-tree node expansion.
    pub const SEED_TREE: u8 = 2;
    /// Merkle parent-node hashing.
    pub const MERKLE: u8 = 3;
}

/// Incremental XOF: absorb, then squeeze any number of bytes.
#[derive(Clone)]
pub struct Xof {
    h: Hasher,
}

impl Xof {
    /// Fresh hasher over the workspace domain.
    #[must_use]
    pub fn new() -> Self {
        let mut h = Hasher::new();
        h.update(DOMAIN);
        Self { h }
    }

    /// Fresh hasher whose first absorbed byte is `prefix`.
    #[must_use]
    pub fn with_prefix(prefix: u8) -> Self {
        let mut x = Self::new();
        x.update(&[prefix]);
        x
    }

    /// Absorb raw bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.h.update(data);
    }

    /// Absorb a little-endian u16 (round and party indices on the wire).
    pub fn update_u16_le(&mut self, x: u16) {
        self.h.update(&x.to_le_bytes());
    }

    /// Finalize the absorption phase and hand back the squeeze stream.
    #[must_use]
    pub fn finalize(self) -> XofReader {
        XofReader {
            r: self.h.finalize_xof(),
        }
    }
}

impl Default for Xof {
    fn default() -> Self {
        Self::new()
    }
}

/// Squeeze side of an [`Xof`].
pub struct XofReader {
    r: OutputReader,
}

impl XofReader {
    /// Fill `out` with the next squeeze bytes.
    pub fn squeeze(&mut self, out: &mut [u8]) {
        self.r.fill(out);
    }

    /// Squeeze `n` fresh bytes.
    #[must_use]
    pub fn squeeze_vec(&mut self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        self.squeeze(&mut out);
        out
    }
}

/// Four independent H lanes absorbed in lockstep.
pub struct Xof4 {
    lanes: [Xof; 4],
}

impl Xof4 {
    /// Four fresh lanes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lanes: core::array::from_fn(|_| Xof::new()),
        }
    }

    /// Absorb per-lane data (e.g. four party seeds).
    pub fn update_each(&mut self, data: [&[u8]; 4]) {
        for (lane, d) in self.lanes.iter_mut().zip(data) {
            lane.update(d);
        }
    }

    /// Absorb the same bytes into every lane (e.g. the salt).
    pub fn update_all(&mut self, data: &[u8]) {
        for lane in &mut self.lanes {
            lane.update(data);
        }
    }

    /// Absorb one little-endian u16 per lane (e.g. party indices j..j+3).
    pub fn update_u16_le_each(&mut self, xs: [u16; 4]) {
        for (lane, x) in self.lanes.iter_mut().zip(xs) {
            lane.update_u16_le(x);
        }
    }

    /// Absorb the same little-endian u16 into every lane.
    pub fn update_u16_le_all(&mut self, x: u16) {
        for lane in &mut self.lanes {
            lane.update_u16_le(x);
        }
    }

    /// Finalize all four lanes.
    #[must_use]
    pub fn finalize(self) -> XofReader4 {
        XofReader4 {
            lanes: self.lanes.map(Xof::finalize),
        }
    }
}

impl Default for Xof4 {
    fn default() -> Self {
        Self::new()
    }
}

/// Squeeze side of an [`Xof4`].
pub struct XofReader4 {
    lanes: [XofReader; 4],
}

impl XofReader4 {
    /// Fill the four output buffers with each lane's next squeeze bytes.
    pub fn squeeze_each(&mut self, outs: [&mut [u8]; 4]) {
        for (lane, out) in self.lanes.iter_mut().zip(outs) {
            lane.squeeze(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_order_sensitive() {
        let mut a = Xof::new();
        a.update(b"ab");
        let mut b = Xof::new();
        b.update(b"a");
        b.update(b"b");
        // Streaming boundaries don't matter…
        assert_eq!(a.finalize().squeeze_vec(32), b.finalize().squeeze_vec(32));

        // …but ordering does.
        let mut c = Xof::new();
        c.update(b"ba");
        let mut d = Xof::new();
        d.update(b"ab");
        assert_ne!(c.finalize().squeeze_vec(32), d.finalize().squeeze_vec(32));
    }

    #[test]
    fn prefix_separates() {
        let mut plain = Xof::new();
        plain.update(&[prefix::REHASH, 7]);
        let mut prefixed = Xof::with_prefix(prefix::REHASH);
        prefixed.update(&[7]);
        // Same byte stream: must agree (the prefix is just an absorbed byte).
        assert_eq!(
            plain.finalize().squeeze_vec(16),
            prefixed.finalize().squeeze_vec(16)
        );

        let p1 = Xof::with_prefix(1).finalize().squeeze_vec(16);
        let p2 = Xof::with_prefix(2).finalize().squeeze_vec(16);
        assert_ne!(p1, p2);
    }

    #[test]
    fn batched_lanes_match_scalar() {
        let seeds: [&[u8]; 4] = [b"s0", b"s1", b"s2", b"s3"];
        let mut x4 = Xof4::new();
        x4.update_each(seeds);
        x4.update_all(b"salt");
        x4.update_u16_le_each([10, 11, 12, 13]);
        let mut r4 = x4.finalize();
        let mut outs = [[0u8; 24]; 4];
        {
            let [o0, o1, o2, o3] = &mut outs;
            r4.squeeze_each([&mut o0[..], &mut o1[..], &mut o2[..], &mut o3[..]]);
        }

        for (i, seed) in seeds.iter().enumerate() {
            let mut x = Xof::new();
            x.update(seed);
            x.update(b"salt");
            x.update_u16_le(10 + i as u16);
            assert_eq!(x.finalize().squeeze_vec(24), outs[i]);
        }
    }

    #[test]
    fn squeeze_is_streaming() {
        let mut r = Xof::new().finalize();
        let a = r.squeeze_vec(16);
        let b = r.squeeze_vec(16);
        let whole = Xof::new().finalize().squeeze_vec(32);
        assert_eq!([a, b].concat(), whole);
    }
}
