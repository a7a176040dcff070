// Author: dWallet Labs, Ltd.
// SPDX-License-Identifier: BSD-3-Clause-Clear
use std::fmt;
use std::hash::{Hash, Hasher};

use crypto_bigint::{Encoding, Uint};
use serde::{Deserialize, Serialize};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use crate::{Error, LargePrimeSizedNumber, SanityCheckError, SmallPrimeSizedNumber};

/// An element of $\mathbb{Z}_p$, the integers modulo the large prime $p$.
///
/// Values are held in their natural (non-Montgomery) form; arithmetic goes through
/// [`GroupParameters`](crate::GroupParameters), which owns the modulus.
#[derive(PartialEq, Eq, Clone, Copy, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementModP(pub(crate) LargePrimeSizedNumber);

/// An element of $\mathbb{Z}_q$, the integers modulo the small prime $q$.
#[derive(PartialEq, Eq, Clone, Copy, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementModQ(pub(crate) SmallPrimeSizedNumber);

macro_rules! impl_element {
    ($element:ident, $number:ty) => {
        impl $element {
            pub const ZERO: Self = Self(<$number>::ZERO);
            pub const ONE: Self = Self(<$number>::ONE);

            pub fn value(&self) -> &$number {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == <$number>::ZERO
            }

            /// Uppercase hex of the underlying integer, zero-padded to an even number of digits.
            /// Zero renders as `"00"`.
            pub fn to_hex(&self) -> String {
                to_hex(&self.0)
            }

            /// Parses hex of any case and length, as long as the value fits.
            /// The result is not reduced; use the checked conversions on
            /// [`GroupParameters`](crate::GroupParameters) to bound it.
            pub fn from_hex(hex: &str) -> crate::Result<Self> {
                from_hex(hex).map(Self)
            }
        }

        impl fmt::Display for $element {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl Hash for $element {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.as_words().hash(state);
            }
        }

        impl ConstantTimeEq for $element {
            fn ct_eq(&self, other: &Self) -> Choice {
                self.0.ct_eq(&other.0)
            }
        }

        impl ConditionallySelectable for $element {
            fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
                Self(<$number>::conditional_select(&a.0, &b.0, choice))
            }
        }

        impl From<$element> for String {
            fn from(element: $element) -> Self {
                element.to_hex()
            }
        }

        impl TryFrom<String> for $element {
            type Error = Error;

            fn try_from(hex: String) -> crate::Result<Self> {
                Self::from_hex(&hex)
            }
        }
    };
}

impl_element!(ElementModP, LargePrimeSizedNumber);
impl_element!(ElementModQ, SmallPrimeSizedNumber);

fn to_hex<const LIMBS: usize>(value: &Uint<LIMBS>) -> String
where
    Uint<LIMBS>: Encoding,
{
    let bytes = value.to_be_bytes();
    let bytes = bytes.as_ref();
    let first_non_zero = bytes.iter().position(|byte| *byte != 0);

    match first_non_zero {
        Some(start) => hex::encode_upper(&bytes[start..]),
        None => "00".to_string(),
    }
}

fn from_hex<const LIMBS: usize>(hex: &str) -> crate::Result<Uint<LIMBS>>
where
    Uint<LIMBS>: Encoding,
{
    if hex.is_empty() {
        return Err(SanityCheckError::InvalidHex(String::new()).into());
    }

    // `hex` only decodes an even number of digits.
    let padded = if hex.len() % 2 == 1 {
        format!("0{hex}")
    } else {
        hex.to_string()
    };

    let decoded = hex::decode(&padded)
        .map_err(|_| Error::from(SanityCheckError::InvalidHex(hex.to_string())))?;

    let significant: &[u8] = match decoded.iter().position(|byte| *byte != 0) {
        Some(start) => &decoded[start..],
        None => &[],
    };

    if significant.len() > Uint::<LIMBS>::BYTES {
        return Err(SanityCheckError::OutOfRange.into());
    }

    let mut bytes = vec![0u8; Uint::<LIMBS>::BYTES];
    bytes[Uint::<LIMBS>::BYTES - significant.len()..].copy_from_slice(significant);

    Ok(Uint::<LIMBS>::from_be_slice(&bytes))
}
