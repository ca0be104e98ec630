// crates/mith-sig/src/lib.rs

//! MPC-in-the-head signature core.
//!
//! A signature proves knowledge of a cipher key mapping a public plaintext
//! to a public ciphertext. The prover simulates a 64-party evaluation of the
//! cipher per repetition, commits to every party's view, and opens all but
//! one party for a challenge-selected subset of repetitions; the verifier
//! re-runs the opened material and recomputes the challenges bit-exactly.
//!
//! Layering: [`Instance`] binds a parameter set to a kernel backend and the
//! expanded cipher tables; [`sign`]/[`verify`] drive the protocol;
//! [`Signature`] carries the structured proof with its exact wire format.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]

mod aux;
mod bits;
mod challenge;
mod cipher;
mod commit;
mod error;
mod keys;
mod online;
mod params;
mod serialize;
mod shares;
mod sign;
mod tape;
mod verify;

pub use cipher::Instance;
pub use error::SignatureError;
pub use keys::{keygen, keygen_from_seed, keygen_with_rng, PublicKey, SecretKey};
pub use params::{ParamSet, Params, L1, L1C, L3, L5, NUM_PARTIES, SALT_SIZE};
pub use sign::{sign, RoundProof, Signature};
pub use verify::{verify, verify_bytes};

// The backend enum is part of the public surface so callers can pin kernels.
pub use mith_binmat::Backend;
