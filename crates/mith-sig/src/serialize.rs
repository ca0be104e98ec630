// crates/mith-sig/src/serialize.rs

//! The signature wire format.
//!
//! Layout, in order: `challengeC` (τ × u16 LE), `challengeP` (τ × u16 LE),
//! salt, `iSeedInfo`, `cvInfo`, then per opened repetition in ascending
//! index order: seed reveal, aux (absent when the hidden party is N−1),
//! input, msgs, the hidden party's commitment. No section carries its own
//! length: everything is recomputed from the challenge lists, and any total
//! length mismatch is a reject.

use mith_tree::{MerkleTree, SeedTree, SALT_SIZE};

use crate::bits::padding_bits_zero;
use crate::challenge::{index_of, missing_leaves};
use crate::error::SignatureError;
use crate::params::{Params, NUM_PARTIES};
use crate::sign::{RoundProof, Signature};

struct Cursor<'a> {
    bytes: &'a [u8],
    off: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], SignatureError> {
        let end = self.off.checked_add(n).ok_or(SignatureError::InvalidSignatureSize)?;
        if end > self.bytes.len() {
            return Err(SignatureError::InvalidSignatureSize);
        }
        let s = &self.bytes[self.off..end];
        self.off = end;
        Ok(s)
    }

    fn take_u16s(&mut self, count: usize) -> Result<Vec<u16>, SignatureError> {
        let raw = self.take(2 * count)?;
        Ok(raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }
}

impl Signature {
    /// Exact wire size of this signature.
    #[must_use]
    pub fn serialized_size(&self, params: &Params) -> usize {
        let mut size = 4 * params.num_opened_rounds + SALT_SIZE;
        size += self.iseed_info.len() + self.cv_info.len();
        for proof in self.proofs.iter().flatten() {
            size += proof.seed_info.len();
            if proof.aux.is_some() {
                size += params.view_size();
            }
            size += params.input_size();
            size += params.msgs_size();
            size += params.digest_size;
        }
        size
    }

    /// Serialize into a caller-provided buffer; returns the bytes written.
    /// A too-small buffer is the caller's error, reported without writing.
    pub fn serialize_into(
        &self,
        params: &Params,
        out: &mut [u8],
    ) -> Result<usize, SignatureError> {
        let need = self.serialized_size(params);
        if out.len() < need {
            return Err(SignatureError::InvalidSignatureSize);
        }
        let mut off = 0usize;
        let mut put = |out: &mut [u8], data: &[u8]| {
            out[off..off + data.len()].copy_from_slice(data);
            off += data.len();
        };

        for &c in &self.challenge_c {
            put(out, &c.to_le_bytes());
        }
        for &p in &self.challenge_p {
            put(out, &p.to_le_bytes());
        }
        put(out, &self.salt);
        put(out, &self.iseed_info);
        put(out, &self.cv_info);

        for proof in self.proofs.iter().flatten() {
            put(out, &proof.seed_info);
            if let Some(aux) = &proof.aux {
                put(out, aux);
            }
            put(out, &proof.input);
            put(out, &proof.msgs);
            put(out, &proof.commitment);
        }
        debug_assert_eq!(off, need);
        Ok(need)
    }

    /// Serialize to a fresh exactly-sized buffer.
    #[must_use]
    pub fn to_bytes(&self, params: &Params) -> Vec<u8> {
        let mut out = vec![0u8; self.serialized_size(params)];
        let written = self
            .serialize_into(params, &mut out)
            .unwrap_or_else(|_| unreachable!("buffer sized by serialized_size"));
        debug_assert_eq!(written, out.len());
        out
    }

    /// Parse and validate a wire signature. Checks ranges, uniqueness,
    /// recomputed section lengths, the exact total length, and the zero
    /// padding of `aux` and `msgs`.
    pub fn deserialize(params: &Params, bytes: &[u8]) -> Result<Self, SignatureError> {
        let tau = params.num_opened_rounds;
        let mut cur = Cursor { bytes, off: 0 };

        let challenge_c = cur.take_u16s(tau)?;
        let challenge_p = cur.take_u16s(tau)?;
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(cur.take(SALT_SIZE)?);

        if challenge_c
            .iter()
            .any(|&c| c as usize >= params.num_rounds)
            || challenge_p.iter().any(|&p| p as usize >= NUM_PARTIES)
        {
            return Err(SignatureError::ChallengeOutOfRange);
        }
        for (i, &c) in challenge_c.iter().enumerate() {
            if challenge_c[..i].contains(&c) {
                return Err(SignatureError::ChallengeDuplicate);
            }
        }

        /* ----------- recompute every section length up front -------------- */

        let iseed_len = SeedTree::reveal_size(params.num_rounds, params.seed_size, &challenge_c);
        let missing = missing_leaves(&challenge_c, params);
        let cv_len = MerkleTree::open_size(params.num_rounds, params.digest_size, &missing);

        let mut need = 4 * tau + SALT_SIZE + iseed_len + cv_len;
        for t in 0..params.num_rounds as u16 {
            if let Some(idx) = index_of(&challenge_c, t) {
                let hidden = challenge_p[idx];
                need += SeedTree::reveal_size(NUM_PARTIES, params.seed_size, &[hidden]);
                if hidden as usize != NUM_PARTIES - 1 {
                    need += params.view_size();
                }
                need += params.input_size();
                need += params.msgs_size();
                need += params.digest_size;
            }
        }
        if bytes.len() != need {
            return Err(SignatureError::InvalidSignatureSize);
        }

        /* --------------------------- sections ----------------------------- */

        let iseed_info = cur.take(iseed_len)?.to_vec();
        let cv_info = cur.take(cv_len)?.to_vec();

        let mut proofs: Vec<Option<RoundProof>> =
            (0..params.num_rounds).map(|_| None).collect();
        for t in 0..params.num_rounds as u16 {
            let Some(idx) = index_of(&challenge_c, t) else {
                continue;
            };
            let hidden = challenge_p[idx];

            let seed_len = SeedTree::reveal_size(NUM_PARTIES, params.seed_size, &[hidden]);
            let seed_info = cur.take(seed_len)?.to_vec();

            let aux = if hidden as usize != NUM_PARTIES - 1 {
                let aux = cur.take(params.view_size())?.to_vec();
                if !padding_bits_zero(&aux, params.and_size_bits()) {
                    return Err(SignatureError::PaddingBitsNonZero);
                }
                Some(aux)
            } else {
                None
            };

            let input = cur.take(params.input_size())?.to_vec();
            let msgs = cur.take(params.msgs_size())?.to_vec();
            if !padding_bits_zero(&msgs, params.msgs_bits()) {
                return Err(SignatureError::PaddingBitsNonZero);
            }
            let commitment = cur.take(params.digest_size)?.to_vec();

            proofs[t as usize] = Some(RoundProof {
                seed_info,
                aux,
                input,
                msgs,
                commitment,
            });
        }
        debug_assert_eq!(cur.off, bytes.len());

        Ok(Signature {
            challenge_c,
            challenge_p,
            salt,
            iseed_info,
            cv_info,
            proofs,
        })
    }
}
