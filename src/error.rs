// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use crate::GuardianId;

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum Error {
    #[error("the following protocol error occurred: {0}")]
    ProtocolError(ProtocolError),
    #[error("the following sanity-check error occurred: {0}")]
    SanityCheckError(SanityCheckError),
    #[error("discrete log search exceeded its bound of {bound}")]
    DiscreteLogBoundExceeded { bound: u64 },
    #[error("encryption of {object_id} produced an invalid proof: {failures:?}")]
    EncryptionFailure {
        object_id: String,
        failures: Vec<String>,
    },
    #[error("an internal error that should never have happened and signifies a bug")]
    InternalError,
}

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum ProtocolError {
    #[error("the following guardians {malicious_guardians:?} behaved maliciously by submitting invalid proofs")]
    ProofVerificationError { malicious_guardians: Vec<GuardianId> },
    #[error("proof failed verification: {failures:?}")]
    InvalidProof { failures: Vec<String> },
    #[error("missing decryption shares from guardians {missing_guardians:?}")]
    MissingDecryptionShares { missing_guardians: Vec<GuardianId> },
}

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum SanityCheckError {
    #[error("invalid Params")]
    InvalidParams(),
    #[error("invalid group parameters: {0}")]
    InvalidGroupParameters(&'static str),
    #[error("nonce must not be zero")]
    ZeroNonce,
    #[error("message must be non-negative, got {0}")]
    NegativeMessage(i64),
    #[error("nonce index must be non-negative, got {0}")]
    NegativeNonceIndex(i64),
    #[error("at least one ciphertext is required")]
    EmptyCiphertexts,
    #[error("secret key must be in [2, q)")]
    InvalidSecretKey,
    #[error("value is out of range for its modulus")]
    OutOfRange,
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
    #[error("a disjunctive proof can only be made for a plaintext of 0 or 1, got {0}")]
    InvalidPlaintext(u64),
    #[error("selection {selection_id} has vote {vote}, expected 0 or 1")]
    InvalidVote { selection_id: String, vote: i64 },
    #[error("contest {contest_id} has {votes} votes, but only {limit} are allowed")]
    Overvote {
        contest_id: String,
        votes: u64,
        limit: u64,
    },
    #[error("{0} is not described by the manifest")]
    UnknownObject(String),
    #[error("coordinate {0} appears among the other coordinates")]
    DuplicateCoordinate(u64),
    #[error("the quorum must be at least one")]
    InvalidQuorum,
    #[error("ballot {0} has already been tallied")]
    DuplicateBallot(String),
}

impl From<SanityCheckError> for Error {
    fn from(err: SanityCheckError) -> Self {
        Error::SanityCheckError(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::ProtocolError(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
