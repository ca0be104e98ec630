// crates/mith-sig/src/verify.rs

//! The verifier: rebuild everything the signer committed to from the opened
//! material, then compare the recomputed challenges bit-exactly.

use mith_binmat::Matrix;
use mith_tree::{MerkleTree, SeedTree};

use crate::aux::compute_aux;
use crate::challenge::{hcp, index_of, missing_leaves};
use crate::cipher::Instance;
use crate::commit::{commit, commit_h, commit_v, commit_x4};
use crate::error::SignatureError;
use crate::keys::PublicKey;
use crate::online::{simulate_online, Msgs};
use crate::params::NUM_PARTIES;
use crate::shares::Shares;
use crate::sign::Signature;
use crate::tape::Tapes;

/// Verify a structured signature. Every reject collapses to an error; the
/// caller treats all of them as "invalid".
pub fn verify(
    inst: &Instance,
    pk: &PublicKey,
    message: &[u8],
    sig: &Signature,
) -> Result<(), SignatureError> {
    let p = inst.params;
    assert_eq!(pk.set, p.set, "key does not match the instance");
    let n = p.state_bits;
    let t_rounds = p.num_rounds;
    let last = NUM_PARTIES - 1;
    let salt = &sig.salt;

    // Shape and range checks; `deserialize` enforces these on the wire, but
    // structured signatures are accepted here too.
    if sig.challenge_c.len() != p.num_opened_rounds
        || sig.challenge_p.len() != p.num_opened_rounds
        || sig.proofs.len() != t_rounds
    {
        return Err(SignatureError::InvalidSignatureSize);
    }
    if sig.challenge_c.iter().any(|&c| c as usize >= t_rounds)
        || sig.challenge_p.iter().any(|&x| x as usize >= NUM_PARTIES)
    {
        return Err(SignatureError::ChallengeOutOfRange);
    }
    for (i, &c) in sig.challenge_c.iter().enumerate() {
        if sig.challenge_c[..i].contains(&c) {
            return Err(SignatureError::ChallengeDuplicate);
        }
    }

    let iseeds = SeedTree::reconstruct(
        t_rounds,
        p.seed_size,
        &sig.challenge_c,
        &sig.iseed_info,
        salt,
        0,
    )
    .map_err(|_| SignatureError::SeedReconstructionFailed)?;

    let pt_vec = Matrix::vector_from_bytes(n, &pk.plaintext);
    let mut ch: Vec<Vec<u8>> = Vec::with_capacity(t_rounds);
    let mut cv: Vec<Option<Vec<u8>>> = Vec::with_capacity(t_rounds);

    for t in 0..t_rounds {
        let opened = index_of(&sig.challenge_c, t as u16);

        // One party per opened repetition has a bogus (all-zero) seed; its
        // tape is replaced below and its commitment comes from the proof.
        let seeds_t = match opened {
            None => SeedTree::generate(NUM_PARTIES, p.seed_size, iseeds.leaf(t), salt, t as u16),
            Some(idx) => {
                let proof = sig.proofs[t].as_ref().ok_or(SignatureError::InvalidSignatureSize)?;
                SeedTree::reconstruct(
                    NUM_PARTIES,
                    p.seed_size,
                    &[sig.challenge_p[idx]],
                    &proof.seed_info,
                    salt,
                    t as u16,
                )
                .map_err(|_| SignatureError::SeedReconstructionFailed)?
            }
        };
        let mut tapes_t = Tapes::create(&seeds_t, salt, t as u16, p);

        let mut per_party = Vec::with_capacity(NUM_PARTIES);
        for j in (0..NUM_PARTIES).step_by(4) {
            let batch = commit_x4(
                [
                    seeds_t.leaf(j),
                    seeds_t.leaf(j + 1),
                    seeds_t.leaf(j + 2),
                    seeds_t.leaf(j + 3),
                ],
                salt,
                t as u16,
                j as u16,
                p,
            );
            per_party.extend(batch);
        }

        match opened {
            None => {
                // Re-derive the aux bits from scratch to re-commit.
                compute_aux(inst, &mut tapes_t);
                let aux = tapes_t.aux_bits(p);
                per_party[last] =
                    commit(seeds_t.leaf(last), Some(&aux), salt, t as u16, last as u16, p);
                ch.push(commit_h(&per_party, p));
                cv.push(None);
            }
            Some(idx) => {
                let proof = sig.proofs[t].as_ref().ok_or(SignatureError::InvalidSignatureSize)?;
                let hidden = sig.challenge_p[idx] as usize;

                // Structured signatures can arrive without passing through
                // `deserialize`; re-check the per-section lengths.
                if proof.input.len() != p.input_size()
                    || proof.msgs.len() != p.msgs_size()
                    || proof.commitment.len() != p.digest_size
                    || proof.aux.as_ref().is_some_and(|a| a.len() != p.view_size())
                    || proof.aux.is_some() == (hidden == last)
                {
                    return Err(SignatureError::InvalidSignatureSize);
                }

                if hidden != last {
                    let aux = proof.aux.as_ref().ok_or(SignatureError::InvalidSignatureSize)?;
                    per_party[last] =
                        commit(seeds_t.leaf(last), Some(aux), salt, t as u16, last as u16, p);
                }
                per_party[hidden].clone_from(&proof.commitment);
                ch.push(commit_h(&per_party, p));

                // Re-simulate with the hidden party's tape zeroed and its
                // transcript taken from the proof.
                if let Some(aux) = &proof.aux {
                    tapes_t.set_aux_bits(aux, p);
                }
                tapes_t.zero_party(hidden);

                let mut msgs = Msgs::new(p);
                msgs.msgs[hidden].copy_from_slice(&proof.msgs);
                msgs.unopened = Some(hidden);

                let mut key_shares = Shares::new(n);
                tapes_t.words_into(&mut key_shares);
                let masked_key = Matrix::vector_from_bytes(n, &proof.input);
                simulate_online(
                    inst,
                    &masked_key,
                    &key_shares,
                    &mut tapes_t,
                    &mut msgs,
                    &pt_vec,
                    &pk.ciphertext,
                )?;
                cv.push(Some(commit_v(&proof.input, &msgs, p)));
            }
        }
    }

    /* ------------------- Merkle over views, then HCP ---------------------- */

    let missing = missing_leaves(&sig.challenge_c, p);
    let mut tree_cv = MerkleTree::new(t_rounds, p.digest_size);
    tree_cv
        .add_nodes(&missing, &sig.cv_info)
        .map_err(|_| SignatureError::MerkleVerificationFailed)?;
    tree_cv
        .verify(&cv, salt)
        .map_err(|_| SignatureError::MerkleVerificationFailed)?;

    let (challenge_c, challenge_p) = hcp(
        &ch,
        tree_cv.root(),
        salt,
        &pk.ciphertext,
        &pk.plaintext,
        message,
        p,
    );

    if challenge_c == sig.challenge_c && challenge_p == sig.challenge_p {
        Ok(())
    } else {
        Err(SignatureError::ChallengeMismatch)
    }
}

/// Deserialize and verify in one step (the public boundary).
pub fn verify_bytes(
    inst: &Instance,
    pk: &PublicKey,
    message: &[u8],
    sig_bytes: &[u8],
) -> Result<(), SignatureError> {
    let sig = Signature::deserialize(inst.params, sig_bytes)?;
    verify(inst, pk, message, &sig)
}
