// crates/mith-sig/src/keys.rs

//! Key generation and key material. A keypair is `(sk, pk = (pt, ct))` with
//! `ct = Enc_sk(pt)` under the instance cipher.

use mith_crypto::Xof;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::cipher::Instance;
use crate::params::ParamSet;

/// Public key: a plaintext/ciphertext pair under the secret key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Parameter set the keypair belongs to.
    pub set: ParamSet,
    /// Public plaintext block.
    pub plaintext: Vec<u8>,
    /// Its encryption under the secret key.
    pub ciphertext: Vec<u8>,
}

/// Secret key with its public counterpart embedded (the signer needs both).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey {
    /// Parameter set the keypair belongs to.
    pub set: ParamSet,
    /// The cipher key.
    pub key: Vec<u8>,
    /// Matching public key.
    pub public: PublicKey,
}

/// Generate a keypair from an external randomness source.
pub fn keygen_with_rng<R: RngCore>(inst: &Instance, rng: &mut R) -> SecretKey {
    let len = inst.params.input_size();
    let mut key = vec![0u8; len];
    let mut pt = vec![0u8; len];
    rng.fill_bytes(&mut key);
    rng.fill_bytes(&mut pt);
    finish_keygen(inst, key, pt)
}

/// Generate a keypair from the OS RNG.
#[must_use]
pub fn keygen(inst: &Instance) -> SecretKey {
    keygen_with_rng(inst, &mut rand::rngs::OsRng)
}

/// Deterministic keypair from a seed (fixed test vectors, reproducible
/// fixtures). Not for production keys.
#[must_use]
pub fn keygen_from_seed(inst: &Instance, seed: &[u8]) -> SecretKey {
    let len = inst.params.input_size();
    let mut h = Xof::new();
    h.update(b"mith.keygen.seed.v1");
    h.update(inst.params.set.name().as_bytes());
    h.update(seed);
    let mut r = h.finalize();
    let mut key = vec![0u8; len];
    let mut pt = vec![0u8; len];
    r.squeeze(&mut key);
    r.squeeze(&mut pt);
    finish_keygen(inst, key, pt)
}

fn finish_keygen(inst: &Instance, key: Vec<u8>, plaintext: Vec<u8>) -> SecretKey {
    let ciphertext = inst.enc(&key, &plaintext);
    SecretKey {
        set: inst.params.set,
        key,
        public: PublicKey {
            set: inst.params.set,
            plaintext,
            ciphertext,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_keygen_is_reproducible() {
        let inst = Instance::new(ParamSet::L1);
        let a = keygen_from_seed(&inst, b"vector-1");
        let b = keygen_from_seed(&inst, b"vector-1");
        let c = keygen_from_seed(&inst, b"vector-2");
        assert_eq!(a, b);
        assert_ne!(a.key, c.key);
        assert_eq!(a.public.ciphertext, inst.enc(&a.key, &a.public.plaintext));
    }
}
