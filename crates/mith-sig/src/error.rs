// crates/mith-sig/src/error.rs

//! Error kinds. Internal layers return these precisely; the public verify
//! boundary collapses every reject into one invalid verdict.

use thiserror::Error;

/// Everything that can go wrong while signing, verifying, or moving a
/// signature across the wire.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// Serialized length does not match the recomputed exact length, or a
    /// caller-provided output buffer is too small.
    #[error("signature size is invalid")]
    InvalidSignatureSize,
    /// A challenge index is outside `[0, num_rounds)` / `[0, N)`.
    #[error("challenge index out of range")]
    ChallengeOutOfRange,
    /// The opened-round list contains a duplicate.
    #[error("duplicate opened-round challenge")]
    ChallengeDuplicate,
    /// Revealed seed data could not rebuild the tree.
    #[error("seed tree reconstruction failed")]
    SeedReconstructionFailed,
    /// The view-commitment Merkle root is not derivable or inconsistent.
    #[error("merkle verification failed")]
    MerkleVerificationFailed,
    /// The online MPC simulation did not reproduce the public key.
    #[error("MPC simulation failed")]
    SimulationFailed,
    /// A padding bit of `aux` or `msgs` is non-zero.
    #[error("padding bits are not zero")]
    PaddingBitsNonZero,
    /// Recomputed challenges differ from the deserialized ones.
    #[error("recomputed challenge does not match")]
    ChallengeMismatch,
    /// Allocation failure surfaced by a fallible allocation path. Ordinary
    /// allocation failure aborts the process; the kind exists for the error
    /// taxonomy at the public boundary.
    #[error("allocation failed")]
    AllocationFailed,
}
