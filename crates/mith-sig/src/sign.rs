// crates/mith-sig/src/sign.rs

//! The signer: per-repetition preprocessing, online simulation, challenge
//! derivation, and proof assembly.

use mith_binmat::Matrix;
use mith_crypto::Xof;
use mith_tree::{MerkleTree, SeedTree, SALT_SIZE};

use crate::aux::compute_aux;
use crate::challenge::{hcp, missing_leaves};
use crate::cipher::Instance;
use crate::commit::{commit, commit_h, commit_v, commit_x4};
use crate::error::SignatureError;
use crate::keys::SecretKey;
use crate::online::{simulate_online, Msgs};
use crate::params::NUM_PARTIES;
use crate::shares::Shares;
use crate::tape::Tapes;

/// Everything revealed for one opened repetition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundProof {
    /// Seed-tree reveal for all parties except the hidden one.
    pub seed_info: Vec<u8>,
    /// Aux correction bits; present exactly when the hidden party is not
    /// N−1 (party N−1's own commitment already binds them).
    pub aux: Option<Vec<u8>>,
    /// The masked key fed to the online phase.
    pub input: Vec<u8>,
    /// The hidden party's broadcast transcript.
    pub msgs: Vec<u8>,
    /// The hidden party's commitment.
    pub commitment: Vec<u8>,
}

/// A structured signature; `serialize`/`deserialize` give the wire form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// Opened repetition indices, in derivation order.
    pub challenge_c: Vec<u16>,
    /// Hidden party per opened repetition, parallel to `challenge_c`.
    pub challenge_p: Vec<u16>,
    /// Per-signature salt.
    pub salt: [u8; SALT_SIZE],
    /// Seed-tree reveal of the unopened repetitions' initial seeds.
    pub iseed_info: Vec<u8>,
    /// Merkle nodes covering the unopened repetitions' view digests.
    pub cv_info: Vec<u8>,
    /// One entry per repetition; `Some` exactly for opened ones.
    pub proofs: Vec<Option<RoundProof>>,
}

/// Derive the salt and the root of the initial-seed tree from the secret
/// key, the message and the public inputs.
fn salt_and_root(sk: &SecretKey, message: &[u8], inst: &Instance) -> ([u8; SALT_SIZE], Vec<u8>) {
    let mut h = Xof::new();
    h.update(&sk.key);
    h.update(message);
    h.update(&sk.public.ciphertext);
    h.update(&sk.public.plaintext);
    h.update_u16_le(inst.params.state_bits as u16);
    let mut r = h.finalize();
    let mut salt = [0u8; SALT_SIZE];
    r.squeeze(&mut salt);
    let root = r.squeeze_vec(inst.params.seed_size);
    (salt, root)
}

/// Sign `message` under `sk`.
pub fn sign(inst: &Instance, sk: &SecretKey, message: &[u8]) -> Result<Signature, SignatureError> {
    let p = inst.params;
    assert_eq!(sk.set, p.set, "key does not match the instance");
    let n = p.state_bits;
    let t_rounds = p.num_rounds;
    let last = NUM_PARTIES - 1;

    let (salt, root) = salt_and_root(sk, message, inst);
    let iseeds = SeedTree::generate(t_rounds, p.seed_size, &root, &salt, 0);

    /* ----------------- seeds, tapes, aux (preprocessing) ----------------- */

    let mut seeds = Vec::with_capacity(t_rounds);
    let mut tapes = Vec::with_capacity(t_rounds);
    for t in 0..t_rounds {
        let st = SeedTree::generate(NUM_PARTIES, p.seed_size, iseeds.leaf(t), &salt, t as u16);
        let mut tp = Tapes::create(&st, &salt, t as u16, p);
        compute_aux(inst, &mut tp);
        seeds.push(st);
        tapes.push(tp);
    }

    /* --------------------- commit to seeds and aux ----------------------- */

    let mut commitments: Vec<Vec<Vec<u8>>> = Vec::with_capacity(t_rounds);
    for t in 0..t_rounds {
        let mut per_party = Vec::with_capacity(NUM_PARTIES);
        for j in (0..NUM_PARTIES).step_by(4) {
            let batch = commit_x4(
                [
                    seeds[t].leaf(j),
                    seeds[t].leaf(j + 1),
                    seeds[t].leaf(j + 2),
                    seeds[t].leaf(j + 3),
                ],
                &salt,
                t as u16,
                j as u16,
                p,
            );
            per_party.extend(batch);
        }
        let aux = tapes[t].aux_bits(p);
        per_party[last] = commit(seeds[t].leaf(last), Some(&aux), &salt, t as u16, last as u16, p);
        commitments.push(per_party);
    }

    /* ------------------------- online simulation ------------------------- */

    let sk_vec = Matrix::vector_from_bytes(n, &sk.key);
    let pt_vec = Matrix::vector_from_bytes(n, &sk.public.plaintext);
    let mut inputs: Vec<Vec<u8>> = Vec::with_capacity(t_rounds);
    let mut all_msgs: Vec<Msgs> = Vec::with_capacity(t_rounds);
    for t in 0..t_rounds {
        let mut key_shares = Shares::new(n);
        tapes[t].words_into(&mut key_shares);
        let mut masked_key = key_shares.reconstruct_vector(n);
        masked_key.xor_assign(&sk_vec);

        let mut msgs = Msgs::new(p);
        simulate_online(
            inst,
            &masked_key,
            &key_shares,
            &mut tapes[t],
            &mut msgs,
            &pt_vec,
            &sk.public.ciphertext,
        )?;

        let mut input = vec![0u8; p.input_size()];
        masked_key.read_row_bytes(0, &mut input);
        inputs.push(input);
        all_msgs.push(msgs);
    }

    /* -------------------- commitments over the views ---------------------- */

    let ch: Vec<Vec<u8>> = commitments.iter().map(|c| commit_h(c, p)).collect();
    let cv: Vec<Vec<u8>> = (0..t_rounds)
        .map(|t| commit_v(&inputs[t], &all_msgs[t], p))
        .collect();

    let mut tree_cv = MerkleTree::new(t_rounds, p.digest_size);
    tree_cv.build(&cv, &salt);

    /* ------------------------- challenges, proof -------------------------- */

    let (challenge_c, challenge_p) = hcp(
        &ch,
        tree_cv.root(),
        &salt,
        &sk.public.ciphertext,
        &sk.public.plaintext,
        message,
        p,
    );

    let missing = missing_leaves(&challenge_c, p);
    let cv_info = tree_cv.open(&missing);
    let iseed_info = iseeds.reveal(&challenge_c);

    let mut proofs: Vec<Option<RoundProof>> = (0..t_rounds).map(|_| None).collect();
    for (idx, &t) in challenge_c.iter().enumerate() {
        let t = t as usize;
        let hidden = challenge_p[idx] as usize;
        let aux = (hidden != last).then(|| tapes[t].aux_bits(p));
        proofs[t] = Some(RoundProof {
            seed_info: seeds[t].reveal(&[hidden as u16]),
            aux,
            input: inputs[t].clone(),
            msgs: all_msgs[t].msgs[hidden].clone(),
            commitment: commitments[t][hidden].clone(),
        });
    }

    Ok(Signature {
        challenge_c,
        challenge_p,
        salt,
        iseed_info,
        cv_info,
        proofs,
    })
}
