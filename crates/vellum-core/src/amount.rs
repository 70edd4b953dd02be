//! Arbitrary-precision token amounts.
//!
//! Ledger amounts are integers in the smallest denomination (atto-units for
//! fungible resources). Running totals can exceed any fixed-width integer, so
//! amounts wrap a signed big integer.

use num_bigint::{BigInt, Sign};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use thiserror::Error;

/// Error parsing a decimal amount string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid decimal amount: {0:?}")]
pub struct AmountParseError(pub String);

/// A signed, arbitrary-precision token amount.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(BigInt);

impl TokenAmount {
    pub fn zero() -> Self {
        Self(BigInt::from(0))
    }

    pub fn from_i64(value: i64) -> Self {
        Self(BigInt::from(value))
    }

    /// Parse a (possibly signed) base-10 integer string.
    pub fn from_decimal_str(s: &str) -> Result<Self, AmountParseError> {
        s.parse::<BigInt>()
            .map(Self)
            .map_err(|_| AmountParseError(s.to_owned()))
    }

    pub fn is_zero(&self) -> bool {
        self.0.sign() == Sign::NoSign
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// Two's-complement big-endian encoding, for storage rows.
    pub fn to_signed_bytes_be(&self) -> Vec<u8> {
        self.0.to_signed_bytes_be()
    }

    pub fn from_signed_bytes_be(bytes: &[u8]) -> Self {
        Self(BigInt::from_signed_bytes_be(bytes))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TokenAmount {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl Add<&TokenAmount> for &TokenAmount {
    type Output = TokenAmount;

    fn add(self, rhs: &TokenAmount) -> TokenAmount {
        TokenAmount(&self.0 + &rhs.0)
    }
}

impl Sub<&TokenAmount> for &TokenAmount {
    type Output = TokenAmount;

    fn sub(self, rhs: &TokenAmount) -> TokenAmount {
        TokenAmount(&self.0 - &rhs.0)
    }
}

impl AddAssign<&TokenAmount> for TokenAmount {
    fn add_assign(&mut self, rhs: &TokenAmount) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&TokenAmount> for TokenAmount {
    fn sub_assign(&mut self, rhs: &TokenAmount) {
        self.0 -= &rhs.0;
    }
}

impl Neg for TokenAmount {
    type Output = TokenAmount;

    fn neg(self) -> TokenAmount {
        TokenAmount(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_decimal_strings() {
        assert_eq!(
            TokenAmount::from_decimal_str("1000000000000000000").unwrap(),
            TokenAmount::from_i64(1_000_000_000_000_000_000)
        );
        assert_eq!(
            TokenAmount::from_decimal_str("-42").unwrap(),
            TokenAmount::from_i64(-42)
        );
        assert!(TokenAmount::from_decimal_str("12.5").is_err());
        assert!(TokenAmount::from_decimal_str("").is_err());
    }

    #[test]
    fn arithmetic_and_predicates() {
        let mut total = TokenAmount::zero();
        assert!(total.is_zero());

        total += &TokenAmount::from_i64(5);
        total -= &TokenAmount::from_i64(2);
        assert_eq!(total, TokenAmount::from_i64(3));

        total -= &TokenAmount::from_i64(10);
        assert!(total.is_negative());
    }

    #[test]
    fn signed_bytes_roundtrip() {
        for value in [0i64, 1, -1, 255, -256, i64::MAX, i64::MIN] {
            let amount = TokenAmount::from_i64(value);
            let bytes = amount.to_signed_bytes_be();
            assert_eq!(TokenAmount::from_signed_bytes_be(&bytes), amount);
        }
    }

    #[test]
    fn signed_bytes_roundtrip_beyond_u64() {
        let big = TokenAmount::from_decimal_str("340282366920938463463374607431768211456").unwrap();
        let bytes = big.to_signed_bytes_be();
        assert_eq!(TokenAmount::from_signed_bytes_be(&bytes), big);
    }
}
