// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

//! Non-interactive zero-knowledge proofs, made non-interactive by the Fiat-Shamir hash.
//!
//! Every proof has exactly two operations: `make()`, and `is_valid()`, which never fails but
//! returns a [`ProofValidation`] naming each sub-check that did not hold.

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "benchmarking")]
pub use benches::benchmark_disjunctive_chaum_pedersen;

use crate::{ElementModQ, ProtocolError, Result};

mod chaum_pedersen;
mod constant_chaum_pedersen;
mod disjunctive_chaum_pedersen;
mod schnorr;

pub use chaum_pedersen::ChaumPedersenProof;
pub use constant_chaum_pedersen::{ConstantChaumPedersenProof, MAX_CONSTANT};
pub use disjunctive_chaum_pedersen::{DisjunctiveBranch, DisjunctiveChaumPedersenProof};
pub use schnorr::SchnorrProof;

/// The domain separator of the nonce sequence for generic and constant proofs.
pub(crate) const CONSTANT_PROOF_HEADER: &str = "constant-chaum-pedersen-proof";
/// The domain separator of the nonce sequence for disjunctive proofs.
pub(crate) const DISJUNCTIVE_PROOF_HEADER: &str = "disjoint-chaum-pedersen-proof";

/// The commitments of a sigma protocol, either kept alongside the proof or recomputed from the
/// challenge, the response and the statement.
///
/// Both forms validate identically; `expand()` on each proof turns the derived form into the
/// stored one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Commitments<C> {
    Stored(C),
    Derived,
}

impl<C: Copy> Commitments<C> {
    pub fn stored(&self) -> Option<C> {
        match self {
            Commitments::Stored(commitments) => Some(*commitments),
            Commitments::Derived => None,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, Commitments::Stored(_))
    }
}

/// The itemized outcome of validating a proof or an encrypted object.
///
/// An empty list of failures means the validation succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct ProofValidation {
    subject: String,
    failures: Vec<String>,
}

impl ProofValidation {
    pub(crate) fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            failures: vec![],
        }
    }

    /// Records `check` as failed unless `holds`.
    pub(crate) fn check(&mut self, check: &str, holds: bool) {
        if !holds {
            log::debug!("{}: check `{}` failed", self.subject, check);
            self.failures.push(check.to_string());
        }
    }

    /// Folds the failures of a nested validation into this one, prefixed by its subject.
    pub(crate) fn merge(&mut self, other: ProofValidation) {
        let subject = other.subject;
        self.failures.extend(
            other
                .failures
                .into_iter()
                .map(|failure| format!("{subject}: {failure}")),
        );
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            return Ok(());
        }

        Err(ProtocolError::InvalidProof {
            failures: self.failures,
        }
        .into())
    }
}

impl fmt::Display for ProofValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}: valid", self.subject)
        } else {
            write!(f, "{}: invalid ({})", self.subject, self.failures.join(", "))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofKind {
    Schnorr,
    ChaumPedersen,
    DisjunctiveChaumPedersen,
    ConstantChaumPedersen,
}

/// Any of the proofs of this module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proof {
    Schnorr(SchnorrProof),
    ChaumPedersen(ChaumPedersenProof),
    DisjunctiveChaumPedersen(DisjunctiveChaumPedersenProof),
    ConstantChaumPedersen(ConstantChaumPedersenProof),
}

impl Proof {
    pub fn kind(&self) -> ProofKind {
        match self {
            Proof::Schnorr(_) => ProofKind::Schnorr,
            Proof::ChaumPedersen(_) => ProofKind::ChaumPedersen,
            Proof::DisjunctiveChaumPedersen(_) => ProofKind::DisjunctiveChaumPedersen,
            Proof::ConstantChaumPedersen(_) => ProofKind::ConstantChaumPedersen,
        }
    }

    /// The overall Fiat-Shamir challenge $c$.
    pub fn challenge(&self) -> ElementModQ {
        match self {
            Proof::Schnorr(proof) => *proof.challenge(),
            Proof::ChaumPedersen(proof) => *proof.challenge(),
            Proof::DisjunctiveChaumPedersen(proof) => *proof.challenge(),
            Proof::ConstantChaumPedersen(proof) => *proof.challenge(),
        }
    }
}

impl From<SchnorrProof> for Proof {
    fn from(proof: SchnorrProof) -> Self {
        Proof::Schnorr(proof)
    }
}

impl From<ChaumPedersenProof> for Proof {
    fn from(proof: ChaumPedersenProof) -> Self {
        Proof::ChaumPedersen(proof)
    }
}

impl From<DisjunctiveChaumPedersenProof> for Proof {
    fn from(proof: DisjunctiveChaumPedersenProof) -> Self {
        Proof::DisjunctiveChaumPedersen(proof)
    }
}

impl From<ConstantChaumPedersenProof> for Proof {
    fn from(proof: ConstantChaumPedersenProof) -> Self {
        Proof::ConstantChaumPedersen(proof)
    }
}

#[cfg(test)]
mod tests {
    use rand_core::OsRng;

    use super::*;
    use crate::{elgamal::KeyPair, test_exports::test_group, Error};

    #[test]
    fn validation_collects_every_failure() {
        let mut validation = ProofValidation::new("proof");
        validation.check("first", true);
        validation.check("second", false);
        validation.check("third", false);

        assert!(!validation.is_valid());
        assert_eq!(validation.failures(), ["second", "third"]);
        assert_eq!(
            validation.into_result(),
            Err(Error::ProtocolError(ProtocolError::InvalidProof {
                failures: vec!["second".to_string(), "third".to_string()]
            }))
        );
    }

    #[test]
    fn merged_failures_name_their_subject() {
        let mut outer = ProofValidation::new("contest");
        let mut inner = ProofValidation::new("selection-1");
        inner.check("same_c", false);

        outer.merge(inner);
        outer.merge(ProofValidation::new("selection-2"));

        assert_eq!(outer.failures(), ["selection-1: same_c"]);
        assert_eq!(outer.to_string(), "contest: invalid (selection-1: same_c)");
        assert!(ProofValidation::new("ballot").into_result().is_ok());
    }

    #[test]
    fn proof_enum_exposes_kind_and_challenge() {
        let group = test_group();
        let key_pair = KeyPair::random(&group, &mut OsRng).unwrap();
        let schnorr = SchnorrProof::make(&group, &key_pair, &group.rand_q(&mut OsRng));

        let proof = Proof::from(schnorr.clone());

        assert_eq!(proof.kind(), ProofKind::Schnorr);
        assert_eq!(proof.challenge(), *schnorr.challenge());
        assert_eq!(Commitments::Stored(1).stored(), Some(1));
        assert!(!Commitments::<u8>::Derived.is_stored());
    }
}

#[cfg(feature = "benchmarking")]
mod benches {
    use criterion::Criterion;
    use rand_core::OsRng;

    use super::*;
    use crate::{elgamal, elgamal::KeyPair, test_exports::standard_group};

    pub fn benchmark_disjunctive_chaum_pedersen(c: &mut Criterion) {
        let mut g = c.benchmark_group("disjunctive chaum pedersen");
        g.sample_size(10);

        let group = standard_group();
        let key_pair = KeyPair::random(group, &mut OsRng).unwrap();
        let extended_base_hash = group.rand_q(&mut OsRng);

        for plaintext in [0u64, 1] {
            let nonce = group.rand_range_q(1, &mut OsRng).unwrap();
            let seed = group.rand_q(&mut OsRng);
            let ciphertext =
                elgamal::encrypt(group, plaintext as i64, &nonce, key_pair.public_key()).unwrap();

            let proof = DisjunctiveChaumPedersenProof::make(
                group,
                &ciphertext,
                &nonce,
                key_pair.public_key(),
                &extended_base_hash,
                &seed,
                plaintext,
            )
            .unwrap();

            g.bench_function(format!("make() for plaintext {plaintext}"), |bench| {
                bench.iter(|| {
                    DisjunctiveChaumPedersenProof::make(
                        group,
                        &ciphertext,
                        &nonce,
                        key_pair.public_key(),
                        &extended_base_hash,
                        &seed,
                        plaintext,
                    )
                })
            });

            g.bench_function(format!("is_valid() for plaintext {plaintext}"), |bench| {
                bench.iter(|| {
                    proof.is_valid(
                        group,
                        &ciphertext,
                        key_pair.public_key(),
                        &extended_base_hash,
                    )
                })
            });
        }

        g.finish();
    }
}
