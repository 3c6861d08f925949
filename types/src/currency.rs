// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use encoding::{Decodable, Encodable};
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::{Read, Write};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use std::str::FromStr;

/// A non-negative, arbitrary-precision amount of value. Subtraction is
/// only available checked; conservation checks never underflow silently.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Currency(BigInt);

impl Currency {
    pub fn zero() -> Self {
        Currency(BigInt::zero())
    }

    pub fn new(amount: u128) -> Self {
        Currency(BigInt::from(amount))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtracts, returning `None` on underflow.
    pub fn checked_sub(&self, other: &Currency) -> Option<Currency> {
        if self.0 < other.0 {
            None
        } else {
            Some(Currency(&self.0 - &other.0))
        }
    }

    /// Big-endian magnitude with no leading zero bytes.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be().1
    }

    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Currency(BigInt::from_bytes_be(Sign::Plus, bytes))
    }
}

impl From<u64> for Currency {
    fn from(amount: u64) -> Self {
        Currency(BigInt::from(amount))
    }
}

impl Add for Currency {
    type Output = Currency;

    fn add(self, other: Currency) -> Currency {
        Currency(self.0 + other.0)
    }
}

impl<'a> Add<&'a Currency> for Currency {
    type Output = Currency;

    fn add(self, other: &'a Currency) -> Currency {
        Currency(self.0 + &other.0)
    }
}

impl AddAssign for Currency {
    fn add_assign(&mut self, other: Currency) {
        self.0 += other.0;
    }
}

impl Mul<u64> for Currency {
    type Output = Currency;

    fn mul(self, rhs: u64) -> Currency {
        Currency(self.0 * rhs)
    }
}

impl<'a> Mul<u64> for &'a Currency {
    type Output = Currency;

    fn mul(self, rhs: u64) -> Currency {
        Currency(&self.0 * rhs)
    }
}

impl Sum for Currency {
    fn sum<I: Iterator<Item = Currency>>(iter: I) -> Currency {
        iter.fold(Currency::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Currency> for Currency {
    fn sum<I: Iterator<Item = &'a Currency>>(iter: I) -> Currency {
        iter.fold(Currency::zero(), Add::add)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = num_bigint::ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Currency(BigInt::from_str(s)?))
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Currency::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Encodable for Currency {
    fn encode<W: Write>(&self, w: &mut W) -> Result<(), encoding::Error> {
        self.to_bytes_be().encode(w)
    }
}

impl Decodable for Currency {
    fn decode<R: Read>(r: &mut R) -> Result<Self, encoding::Error> {
        let bytes = Vec::<u8>::decode(r)?;
        Ok(Currency::from_bytes_be(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding::{from_slice, to_vec};

    #[test]
    fn checked_sub_underflow() {
        let a = Currency::from(5u64);
        let b = Currency::from(7u64);
        assert_eq!(b.checked_sub(&a), Some(Currency::from(2u64)));
        assert_eq!(a.checked_sub(&b), None);
        assert_eq!(a.checked_sub(&a), Some(Currency::zero()));
    }

    #[test]
    fn wire_round_trip() {
        let c = Currency::new(2389084800000000000000000000000000);
        let bz = to_vec(&c).unwrap();
        assert_eq!(from_slice::<Currency>(&bz).unwrap(), c);
        // Zero has no magnitude bytes.
        assert_eq!(to_vec(&Currency::zero()).unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn json_as_decimal_string() {
        let c = Currency::from(1500u64);
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"1500\"");
        assert_eq!(serde_json::from_str::<Currency>("\"1500\"").unwrap(), c);
    }
}
