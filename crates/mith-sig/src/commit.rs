// crates/mith-sig/src/commit.rs

//! Commitments over seeds, aux bits and views. Absorption orders here are
//! part of the wire protocol; do not reorder.

use mith_crypto::{Xof, Xof4};
use mith_tree::SALT_SIZE;

use crate::online::Msgs;
use crate::params::{Params, NUM_PARTIES};

/// `C[t][j] = H(seed ‖ [aux] ‖ salt ‖ t ‖ j)`.
#[must_use]
pub fn commit(
    seed: &[u8],
    aux: Option<&[u8]>,
    salt: &[u8; SALT_SIZE],
    t: u16,
    j: u16,
    params: &Params,
) -> Vec<u8> {
    let mut h = Xof::new();
    h.update(seed);
    if let Some(aux) = aux {
        debug_assert_eq!(aux.len(), params.view_size());
        h.update(aux);
    }
    h.update(salt);
    h.update_u16_le(t);
    h.update_u16_le(j);
    h.finalize().squeeze_vec(params.digest_size)
}

/// Four party commitments at once: shared salt and `t`, parties `j..j+4`,
/// no aux.
#[must_use]
pub fn commit_x4(
    seeds: [&[u8]; 4],
    salt: &[u8; SALT_SIZE],
    t: u16,
    j: u16,
    params: &Params,
) -> [Vec<u8>; 4] {
    let mut h = Xof4::new();
    h.update_each(seeds);
    h.update_all(salt);
    h.update_u16_le_all(t);
    h.update_u16_le_each([j, j + 1, j + 2, j + 3]);
    let mut r = h.finalize();
    let mut out = [(); 4].map(|()| vec![0u8; params.digest_size]);
    {
        let [o0, o1, o2, o3] = &mut out;
        r.squeeze_each([&mut o0[..], &mut o1[..], &mut o2[..], &mut o3[..]]);
    }
    out
}

/// `Ch[t] = H(C[t][0] ‖ … ‖ C[t][N−1])`.
#[must_use]
pub fn commit_h(party_commitments: &[Vec<u8>], params: &Params) -> Vec<u8> {
    debug_assert_eq!(party_commitments.len(), NUM_PARTIES);
    let mut h = Xof::new();
    for c in party_commitments {
        h.update(c);
    }
    h.finalize().squeeze_vec(params.digest_size)
}

/// `Cv[t] = H(input ‖ msgs[0] ‖ … ‖ msgs[N−1])`, each transcript truncated
/// to the bytes actually written.
#[must_use]
pub fn commit_v(input: &[u8], msgs: &Msgs, params: &Params) -> Vec<u8> {
    let mut h = Xof::new();
    h.update(input);
    let used = (msgs.pos + 7) / 8;
    for m in &msgs.msgs {
        h.update(&m[..used]);
    }
    h.finalize().squeeze_vec(params.digest_size)
}
