//! End-to-end signature tests: round trips, tamper rejection, wire-format
//! exactness, and cross-backend agreement.

use std::sync::OnceLock;

use mith_sig::{
    keygen_from_seed, sign, verify, verify_bytes, Backend, Instance, ParamSet, SecretKey,
    Signature, SignatureError, NUM_PARTIES,
};

struct Fixture {
    inst: Instance,
    sk: SecretKey,
    sig: Signature,
    bytes: Vec<u8>,
}

fn fixture(set: ParamSet, cell: &'static OnceLock<Fixture>, message: &[u8]) -> &'static Fixture {
    cell.get_or_init(|| {
        let inst = Instance::new(set);
        let sk = keygen_from_seed(&inst, b"fixture");
        let sig = sign(&inst, &sk, message).expect("signing the fixture message");
        let bytes = sig.to_bytes(inst.params);
        Fixture {
            inst,
            sk,
            sig,
            bytes,
        }
    })
}

fn l1() -> &'static Fixture {
    static CELL: OnceLock<Fixture> = OnceLock::new();
    // Scenario: the empty message under the L1 set.
    fixture(ParamSet::L1, &CELL, b"")
}

#[test]
fn l1_round_trip_accepts() {
    let f = l1();
    verify(&f.inst, &f.sk.public, b"", &f.sig).expect("honest signature verifies");
    verify_bytes(&f.inst, &f.sk.public, b"", &f.bytes).expect("wire form verifies");
}

#[test]
fn l1_challenges_are_well_formed() {
    let f = l1();
    let p = f.inst.params;
    assert_eq!(f.sig.challenge_c.len(), p.num_opened_rounds);
    assert_eq!(f.sig.challenge_p.len(), p.num_opened_rounds);
    let mut seen = f.sig.challenge_c.clone();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), p.num_opened_rounds, "opened rounds are distinct");
    assert!(f.sig.challenge_c.iter().all(|&c| (c as usize) < p.num_rounds));
    assert!(f.sig.challenge_p.iter().all(|&x| (x as usize) < NUM_PARTIES));
}

#[test]
fn l1_wrong_message_rejected() {
    let f = l1();
    assert!(verify(&f.inst, &f.sk.public, b"x", &f.sig).is_err());
}

#[test]
fn l1_bit_flips_rejected() {
    let f = l1();
    let len = f.bytes.len();
    // One position in every section of the wire format, plus the ends.
    let tau = f.inst.params.num_opened_rounds;
    let positions = [
        0,                      // challengeC
        2 * tau,                // challengeP
        4 * tau + 5,            // salt
        4 * tau + 32,           // iSeedInfo
        len - 1,                // last proof's commitment
        len / 2,                // somewhere in the proofs
        len / 3,
    ];
    for &pos in &positions {
        for bit in [0u8, 7] {
            let mut bytes = f.bytes.clone();
            bytes[pos] ^= 1 << bit;
            assert!(
                verify_bytes(&f.inst, &f.sk.public, b"", &bytes).is_err(),
                "flip at byte {pos} bit {bit} must invalidate"
            );
        }
    }
}

#[test]
fn l1_serialization_is_exact() {
    let f = l1();
    let p = f.inst.params;
    assert_eq!(f.bytes.len(), f.sig.serialized_size(p));

    // Structural round trip.
    let back = Signature::deserialize(p, &f.bytes).expect("own bytes parse");
    assert_eq!(back, f.sig);
    assert_eq!(back.to_bytes(p), f.bytes);

    // Length must match exactly in both directions.
    let mut short = f.bytes.clone();
    short.pop();
    assert_eq!(
        Signature::deserialize(p, &short).unwrap_err(),
        SignatureError::InvalidSignatureSize
    );
    let mut long = f.bytes.clone();
    long.push(0);
    assert_eq!(
        Signature::deserialize(p, &long).unwrap_err(),
        SignatureError::InvalidSignatureSize
    );

    // Undersized output buffers are refused.
    let mut buf = vec![0u8; f.bytes.len() - 1];
    assert_eq!(
        f.sig.serialize_into(p, &mut buf).unwrap_err(),
        SignatureError::InvalidSignatureSize
    );
}

#[test]
fn l1_challenge_tamper_is_typed() {
    let f = l1();
    let p = f.inst.params;

    // Duplicate an opened-round index.
    let mut bytes = f.bytes.clone();
    let dup = [bytes[2], bytes[3]];
    bytes[0] = dup[0];
    bytes[1] = dup[1];
    let err = Signature::deserialize(p, &bytes).unwrap_err();
    assert!(
        matches!(
            err,
            SignatureError::ChallengeDuplicate | SignatureError::InvalidSignatureSize
        ),
        "duplicate challenge must reject, got {err:?}"
    );

    // Out-of-range round index.
    let mut bytes = f.bytes.clone();
    bytes[0] = 0xff;
    bytes[1] = 0xff;
    let err = Signature::deserialize(p, &bytes).unwrap_err();
    assert_eq!(err, SignatureError::ChallengeOutOfRange);
}

/// Aux bits appear on the wire exactly when the hidden party is not N−1,
/// and the wire length follows.
#[test]
fn aux_presence_follows_hidden_party() {
    let inst = Instance::new(ParamSet::L1);
    let sk = keygen_from_seed(&inst, b"aux-presence");
    let p = inst.params;

    let mut saw_last_hidden = false;
    let mut saw_other_hidden = false;
    for i in 0..16u8 {
        let sig = sign(&inst, &sk, &[i]).expect("sign");
        for (idx, &t) in sig.challenge_c.iter().enumerate() {
            let proof = sig.proofs[t as usize].as_ref().expect("opened round");
            let hidden = sig.challenge_p[idx] as usize;
            if hidden == NUM_PARTIES - 1 {
                assert!(proof.aux.is_none(), "no aux when party N−1 is hidden");
                saw_last_hidden = true;
            } else {
                assert!(proof.aux.is_some());
                saw_other_hidden = true;
            }
        }
        // The exact-size accounting covers the shrink for hidden == N−1.
        assert_eq!(sig.to_bytes(p).len(), sig.serialized_size(p));
        if saw_last_hidden && saw_other_hidden {
            break;
        }
    }
    assert!(saw_other_hidden);
    assert!(
        saw_last_hidden,
        "no repetition hid party N−1 across the fixture messages"
    );
}

fn l3() -> &'static Fixture {
    static CELL: OnceLock<Fixture> = OnceLock::new();
    fixture(ParamSet::L3, &CELL, b"l3 message")
}

#[test]
fn l3_round_trip_accepts() {
    let f = l3();
    verify_bytes(&f.inst, &f.sk.public, b"l3 message", &f.bytes).expect("L3 verifies");
}

/// Scenario: flipping a padding bit of `msgs` is a deterministic, typed
/// reject. L3 has four non-zero padding bits per transcript.
#[test]
fn l3_msgs_padding_tamper_rejected() {
    let f = l3();
    let p = f.inst.params;
    assert_ne!(p.msgs_bits() % 8, 0, "set must have msgs padding");

    // Locate the first opened round's msgs section.
    let first_t = (0..p.num_rounds)
        .find(|&t| f.sig.proofs[t].is_some())
        .expect("at least one opened round");
    let proof = f.sig.proofs[first_t].as_ref().expect("opened");
    let mut off = 4 * p.num_opened_rounds + 32 + f.sig.iseed_info.len() + f.sig.cv_info.len();
    off += proof.seed_info.len();
    if proof.aux.is_some() {
        off += p.view_size();
    }
    off += p.input_size();
    let msgs_last_byte = off + p.msgs_size() - 1;

    let mut bytes = f.bytes.clone();
    bytes[msgs_last_byte] ^= 0x80; // top bit of the final byte is padding
    assert_eq!(
        Signature::deserialize(p, &bytes).unwrap_err(),
        SignatureError::PaddingBitsNonZero
    );
}

#[test]
fn l1c_round_trip_and_aux_padding() {
    let inst = Instance::new(ParamSet::L1c);
    let sk = keygen_from_seed(&inst, b"compact");
    let p = inst.params;
    let sig = sign(&inst, &sk, b"m").expect("sign");
    let bytes = sig.to_bytes(p);
    verify_bytes(&inst, &sk.public, b"m", &bytes).expect("compact set verifies");

    // The compact set leaves padding in aux; flipping it is a typed reject.
    assert_ne!(p.and_size_bits() % 8, 0);
    if let Some((t, proof)) = (0..p.num_rounds)
        .filter_map(|t| sig.proofs[t].as_ref().map(|pr| (t, pr)))
        .find(|(_, pr)| pr.aux.is_some())
    {
        let mut off = 4 * p.num_opened_rounds + 32 + sig.iseed_info.len() + sig.cv_info.len();
        for pr in (0..t).filter_map(|tt| sig.proofs[tt].as_ref()) {
            off += pr.seed_info.len()
                + pr.aux.as_ref().map_or(0, |_| p.view_size())
                + p.input_size()
                + p.msgs_size()
                + p.digest_size;
        }
        off += proof.seed_info.len();
        let aux_last_byte = off + p.view_size() - 1;
        let mut tampered = bytes.clone();
        tampered[aux_last_byte] ^= 0x80;
        assert_eq!(
            Signature::deserialize(p, &tampered).unwrap_err(),
            SignatureError::PaddingBitsNonZero
        );
    } else {
        panic!("no opened round carries aux");
    }
}

#[test]
fn l5_round_trip_accepts() {
    static CELL: OnceLock<Fixture> = OnceLock::new();
    let f = fixture(ParamSet::L5, &CELL, b"l5");
    verify_bytes(&f.inst, &f.sk.public, b"l5", &f.bytes).expect("L5 verifies");
}

/// Scenario: a signature produced under forced-scalar kernels is
/// byte-identical to the auto-dispatch one, and each verifies under the
/// other's instance.
#[test]
fn backends_produce_identical_signatures() {
    let auto = Instance::new(ParamSet::L1);
    let scalar = Instance::with_backend(ParamSet::L1, Backend::Scalar).expect("scalar always available");
    let sk = keygen_from_seed(&auto, b"backend");
    assert_eq!(sk, keygen_from_seed(&scalar, b"backend"));

    let sig_auto = sign(&auto, &sk, b"msg").expect("sign auto").to_bytes(auto.params);
    let sig_scalar = sign(&scalar, &sk, b"msg").expect("sign scalar").to_bytes(scalar.params);
    assert_eq!(sig_auto, sig_scalar, "backends must be bit-identical");

    verify_bytes(&scalar, &sk.public, b"msg", &sig_auto).expect("cross-verify auto→scalar");
    verify_bytes(&auto, &sk.public, b"msg", &sig_scalar).expect("cross-verify scalar→auto");
}
