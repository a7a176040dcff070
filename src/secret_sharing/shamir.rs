// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear

use std::ops::{Add, Mul};

use crate::{Result, SanityCheckError};

/// Polynomial of some degree $n$
///
/// Polynomial has a form: $f(x) = a_0 + a_1 x^1 + \dots{} + a_{n-1} x^{n-1} + a_n x^n$
///
/// Coefficients $a_i$ and indeterminate $x$ are within a ring,
/// and this type is generic for any concrete type that implements ring arithmetic operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial<T>
where
    T: Copy + Add<T, Output = T> + Mul<T, Output = T>,
{
    constant_term: T,
    higher_coefficients: Vec<T>,
}

impl<T> Polynomial<T>
where
    T: Copy + Add<T, Output = T> + Mul<T, Output = T>,
{
    /// Constructs polynomial $f(x)$ from list of coefficients $a_0, \dots, a_n$ in the ring
    ///
    /// ## Order
    ///
    /// $a_i$ should corresponds to polynomial $i^{\text{th}}$ coefficient $f(x) = \dots{} + a_i x^i + \dots$
    pub fn from_coefficients(coefficients: Vec<T>) -> Result<Self> {
        let mut coefficients = coefficients.into_iter();
        let constant_term = coefficients.next().ok_or(SanityCheckError::InvalidParams())?;

        Ok(Self {
            constant_term,
            higher_coefficients: coefficients.collect(),
        })
    }

    /// Takes scalar $x$ and evaluates $f(x)$
    pub fn evaluate(&self, x: &T) -> T {
        // Accumulate $a_i x^i$ head to tail, carrying $x^i$ along.
        let (evaluation, _) = self.higher_coefficients.iter().fold(
            (self.constant_term, *x),
            |(partially_evaluated_polynomial, power_of_x), coefficient| {
                (
                    partially_evaluated_polynomial + (*coefficient) * power_of_x,
                    power_of_x * (*x),
                )
            },
        );

        evaluation
    }
}

#[cfg(test)]
mod tests {
    use crypto_bigint::{Wrapping, U64};

    use super::*;

    #[test]
    fn evaluates() {
        let polynomial = Polynomial::from_coefficients(vec![
            Wrapping(U64::from(1u8)),
            Wrapping(U64::from(2u8)),
            Wrapping(U64::from(3u8)),
        ])
        .unwrap();

        assert_eq!(
            polynomial.evaluate(&Wrapping(U64::from(0u8))),
            Wrapping(U64::from(1u8))
        );

        assert_eq!(
            polynomial.evaluate(&Wrapping(U64::from(5u8))),
            Wrapping(U64::from(86u8))
        );
    }

    #[test]
    fn constant_polynomial_evaluates_to_its_constant() {
        let polynomial = Polynomial::from_coefficients(vec![Wrapping(U64::from(7u8))]).unwrap();

        assert_eq!(
            polynomial.evaluate(&Wrapping(U64::from(9u8))),
            Wrapping(U64::from(7u8))
        );
        assert_eq!(
            polynomial.evaluate(&Wrapping(U64::from(0u8))),
            Wrapping(U64::from(7u8))
        );
    }

    #[test]
    fn rejects_empty_coefficients() {
        assert_eq!(
            Polynomial::<Wrapping<U64>>::from_coefficients(vec![]),
            Err(SanityCheckError::InvalidParams().into())
        );
    }
}
