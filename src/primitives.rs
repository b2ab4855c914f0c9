// Guestbook runtime: transaction lifecycle for on-chain guestbooks
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2025 by the Guestbook contributors.
//
// Copyright (C) 2025 Guestbook contributors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use amplify::hex;
use amplify::{ByteArray, Bytes20, Bytes32};

#[derive(Clone, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ParseError {
    /// invalid hex encoding: {0}
    #[from]
    Hex(hex::Error),

    /// value '{0}' is not a valid amount of base units.
    Amount(String),

    /// value '{0}' is not a valid chain identifier.
    Chain(String),
}

/// Account or contract address on the ledger.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Address(Bytes20);

impl Address {
    pub fn to_byte_array(&self) -> [u8; 20] { self.0.to_byte_array() }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self { Address(Bytes20::from_byte_array(bytes)) }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "0x{}", self.0) }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        Bytes20::from_str(s).map(Address).map_err(ParseError::from)
    }
}

/// Opaque transaction identifier returned by the ledger at submission.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TxId(Bytes32);

impl TxId {
    pub fn to_byte_array(&self) -> [u8; 32] { self.0.to_byte_array() }
}

impl From<[u8; 32]> for TxId {
    fn from(bytes: [u8; 32]) -> Self { TxId(Bytes32::from_byte_array(bytes)) }
}

impl Display for TxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "0x{}", self.0) }
}

impl FromStr for TxId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        Bytes32::from_str(s).map(TxId).map_err(ParseError::from)
    }
}

/// Amount of the ledger native currency, in its smallest base units.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Display)]
#[display(inner)]
pub struct Amount(u128);

impl From<u128> for Amount {
    fn from(units: u128) -> Self { Amount(units) }
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[inline]
    pub const fn from_units(units: u128) -> Self { Amount(units) }
    #[inline]
    pub const fn units(self) -> u128 { self.0 }
    #[inline]
    pub const fn is_zero(self) -> bool { self.0 == 0 }

    pub fn checked_mul(self, count: u128) -> Option<Amount> { self.0.checked_mul(count).map(Amount) }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount { Amount(self.0.saturating_add(other.0)) }
}

impl FromStr for Amount {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.replace('_', "")
            .parse::<u128>()
            .map(Amount)
            .map_err(|_| ParseError::Amount(s.to_owned()))
    }
}

/// Identifier of the chain the wallet session is connected to.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[display(inner)]
pub struct ChainId(u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self { ChainId(id) }
}

impl ChainId {
    #[inline]
    pub const fn new(id: u64) -> Self { ChainId(id) }
    #[inline]
    pub const fn to_u64(self) -> u64 { self.0 }
}

impl Default for ChainId {
    fn default() -> Self { ChainId(1) }
}

impl FromStr for ChainId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(ChainId)
            .map_err(|_| ParseError::Chain(s.to_owned()))
    }
}

#[cfg(feature = "serde")]
mod _serde {
    use serde::de::{self, Error as _, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::*;

    macro_rules! serde_str {
        ($ty:ty) => {
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(&self.to_string())
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let s = String::deserialize(deserializer)?;
                    s.parse().map_err(D::Error::custom)
                }
            }
        };
    }

    serde_str!(Address);
    serde_str!(TxId);

    impl Serialize for Amount {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for Amount {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct AmountVisitor;

            impl Visitor<'_> for AmountVisitor {
                type Value = Amount;

                fn expecting(&self, f: &mut Formatter) -> fmt::Result {
                    f.write_str("amount in base units, as an integer or a decimal string")
                }

                fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                    Ok(Amount(v as u128))
                }

                fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
                    Ok(Amount(v))
                }

                fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                    u128::try_from(v)
                        .map(Amount)
                        .map_err(|_| E::custom(format!("negative amount {v}")))
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                    v.parse().map_err(E::custom)
                }
            }

            deserializer.deserialize_any(AmountVisitor)
        }
    }

    impl Serialize for ChainId {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u64(self.0)
        }
    }

    impl<'de> Deserialize<'de> for ChainId {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            u64::deserialize(deserializer).map(ChainId)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn address_display_from_str() {
        let addr = Address::from([0xab; 20]);
        let s = addr.to_string();
        assert_eq!(s, format!("0x{}", "ab".repeat(20)));
        assert_eq!(Address::from_str(&s).unwrap(), addr);
        assert_eq!(Address::from_str(&"ab".repeat(20)).unwrap(), addr);
        assert!(Address::from_str("0x1234").is_err());
    }

    #[test]
    fn amount_arithmetics() {
        let fee = Amount::from_units(1_000);
        assert_eq!(fee.checked_mul(10), Some(Amount::from_units(10_000)));
        assert_eq!(Amount::from_units(u128::MAX).checked_mul(2), None);
        assert_eq!(Amount::from_str("1_000").unwrap(), fee);
        assert!(Amount::from_str("-1").is_err());
        assert!(Amount::ZERO.is_zero());
    }
}
