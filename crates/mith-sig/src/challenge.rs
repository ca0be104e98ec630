// crates/mith-sig/src/challenge.rs

//! HCP: the Fiat–Shamir derivation selecting which repetitions are opened
//! and which party per opened repetition stays hidden.

use mith_crypto::{prefix, Xof};
use mith_tree::{ceil_log2, SALT_SIZE};

use crate::bits::get_bit;
use crate::params::{Params, NUM_PARTIES};

/// Split a digest into consecutive little-endian chunks of `chunk_bits`.
fn bits_to_chunks(chunk_bits: usize, input: &[u8]) -> Vec<u16> {
    let count = input.len() * 8 / chunk_bits;
    (0..count)
        .map(|i| {
            let mut v = 0u16;
            for j in 0..chunk_bits {
                v |= u16::from(get_bit(input, i * chunk_bits + j)) << j;
            }
            v
        })
        .collect()
}

fn rehash(digest: &[u8], params: &Params) -> Vec<u8> {
    let mut h = Xof::with_prefix(prefix::REHASH);
    h.update(digest);
    h.finalize().squeeze_vec(params.digest_size)
}

/// Derive `(challengeC, challengeP)` from the per-round commitment hashes,
/// the view-tree root, and the public inputs.
pub(crate) fn hcp(
    ch: &[Vec<u8>],
    cv_root: &[u8],
    salt: &[u8; SALT_SIZE],
    pub_ct: &[u8],
    pub_pt: &[u8],
    message: &[u8],
    params: &Params,
) -> (Vec<u16>, Vec<u16>) {
    debug_assert!(params.num_opened_rounds < params.num_rounds);
    let tau = params.num_opened_rounds;

    let mut h = Xof::new();
    for d in ch {
        h.update(d);
    }
    h.update(cv_root);
    h.update(salt);
    h.update(pub_ct);
    h.update(pub_pt);
    h.update(message);
    let mut digest = h.finalize().squeeze_vec(params.digest_size);

    let bits_c = ceil_log2(params.num_rounds);
    let mut challenge_c: Vec<u16> = Vec::with_capacity(tau);
    while challenge_c.len() < tau {
        for chunk in bits_to_chunks(bits_c, &digest) {
            if (chunk as usize) < params.num_rounds && !challenge_c.contains(&chunk) {
                challenge_c.push(chunk);
                if challenge_c.len() == tau {
                    break;
                }
            }
        }
        // The digest is always extended once after C is filled, so the P
        // derivation starts from a fresh value.
        digest = rehash(&digest, params);
    }

    let bits_p = ceil_log2(NUM_PARTIES);
    let mut challenge_p: Vec<u16> = Vec::with_capacity(tau);
    while challenge_p.len() < tau {
        for chunk in bits_to_chunks(bits_p, &digest) {
            if (chunk as usize) < NUM_PARTIES {
                challenge_p.push(chunk);
                if challenge_p.len() == tau {
                    break;
                }
            }
        }
        digest = rehash(&digest, params);
    }

    (challenge_c, challenge_p)
}

/// First position of `value` in `list`.
pub(crate) fn index_of(list: &[u16], value: u16) -> Option<usize> {
    list.iter().position(|&x| x == value)
}

/// Round indices not opened by `challenge_c`, ascending.
pub(crate) fn missing_leaves(challenge_c: &[u16], params: &Params) -> Vec<u16> {
    (0..params.num_rounds as u16)
        .filter(|t| !challenge_c.contains(t))
        .collect()
}
