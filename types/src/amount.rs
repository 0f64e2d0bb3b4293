//! Amount types for ETH (wei) and USD.
//!
//! Amounts are represented as fixed-point integers (u128) to avoid floating-point errors.
//! Cumulative totals are summed over millions of blocks, so every operation here is
//! exact; rounding only happens in the `format_*` helpers used for presentation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use crate::TypesError;

/// Decimal places of one ETH expressed in wei.
pub const WEI_DECIMALS: u32 = 18;

/// 1 ETH in wei.
pub const WEI_PER_ETH: u128 = 10u128.pow(WEI_DECIMALS);

/// Decimal places of one dollar expressed in [`UsdAmount`] raw units.
pub const USD_DECIMALS: u32 = 6;

/// 1 USD in raw units (micro-dollars).
pub const MICROS_PER_USD: u128 = 10u128.pow(USD_DECIMALS);

/// An amount of ETH, stored in wei.
///
/// Serialized as a decimal string so JSON consumers never see a lossy number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WeiAmount(u128);

impl WeiAmount {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole ETH converted to wei.
    pub fn from_eth(eth: u64) -> Self {
        Self(eth as u128 * WEI_PER_ETH)
    }

    /// Parse a decimal ETH string such as `"301720.664913446243502258"`.
    ///
    /// Digits beyond 18 decimal places are truncated.
    pub fn parse_eth(s: &str) -> Result<Self, TypesError> {
        parse_fixed(s, WEI_DECIMALS).map(Self)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whole ETH, rounded down.
    pub fn whole_eth(&self) -> u128 {
        self.0 / WEI_PER_ETH
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Scale by an integer factor (e.g. `base_fee * gas_used`).
    pub fn saturating_mul(self, factor: u128) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    /// Value of this amount at `price` USD per ETH.
    ///
    /// Exact for any realistic supply: 10^26 wei at a price of 10^12 micro-dollars
    /// still fits in a u128 before the division.
    pub fn value_in_usd(&self, price: UsdAmount) -> UsdAmount {
        UsdAmount(self.0.saturating_mul(price.raw()) / WEI_PER_ETH)
    }

    /// ETH with `decimals` fractional digits, rounded half-up, thousands grouped.
    pub fn format_eth(&self, decimals: u32) -> String {
        format_fixed(self.0, WEI_DECIMALS, decimals)
    }
}

impl Add for WeiAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for WeiAmount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for WeiAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for WeiAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<WeiAmount> for String {
    fn from(amount: WeiAmount) -> Self {
        amount.0.to_string()
    }
}

impl TryFrom<String> for WeiAmount {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| TypesError::InvalidAmount(s))
    }
}

impl fmt::Display for WeiAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", format_fixed(self.0, WEI_DECIMALS, WEI_DECIMALS))
    }
}

/// A USD amount, stored in micro-dollars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct UsdAmount(u128);

impl UsdAmount {
    pub const ZERO: Self = Self(0);

    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn from_dollars(dollars: u64) -> Self {
        Self(dollars as u128 * MICROS_PER_USD)
    }

    /// Parse a decimal dollar string such as `"4123.57"`.
    ///
    /// Digits beyond six decimal places are truncated.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        parse_fixed(s, USD_DECIMALS).map(Self)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Whole dollars, rounded down.
    pub fn whole_dollars(&self) -> u128 {
        self.0 / MICROS_PER_USD
    }

    /// Dollars with `decimals` fractional digits, rounded half-up, thousands grouped.
    pub fn format_dollars(&self, decimals: u32) -> String {
        format!("${}", format_fixed(self.0, USD_DECIMALS, decimals))
    }

    /// Compact form with a K/M/B suffix, e.g. `$6.00B`, `$456.70K`.
    pub fn format_compact(&self) -> String {
        const SUFFIXES: [(u128, &str); 3] = [
            (1_000_000_000, "B"),
            (1_000_000, "M"),
            (1_000, "K"),
        ];
        for (scale, suffix) in SUFFIXES {
            let unit = scale * MICROS_PER_USD;
            if self.0 >= unit {
                // Re-scale so the suffix unit has six decimals like a plain dollar.
                let scaled = self.0 / scale;
                return format!("${}{}", format_fixed(scaled, USD_DECIMALS, 2), suffix);
            }
        }
        self.format_dollars(2)
    }
}

impl Add for UsdAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for UsdAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl From<UsdAmount> for String {
    fn from(amount: UsdAmount) -> Self {
        amount.0.to_string()
    }
}

impl TryFrom<String> for UsdAmount {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| TypesError::InvalidAmount(s))
    }
}

impl fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_dollars(2))
    }
}

/// Format a signed wei difference as ETH, always carrying a sign.
pub fn format_signed_eth(raw: i128, decimals: u32) -> String {
    let sign = if raw < 0 { "-" } else { "+" };
    format!(
        "{sign}{}",
        format_fixed(raw.unsigned_abs(), WEI_DECIMALS, decimals)
    )
}

fn parse_fixed(s: &str, scale: u32) -> Result<u128, TypesError> {
    let invalid = || TypesError::InvalidAmount(s.to_string());
    let trimmed = s.trim();
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };

    let kept = &frac_part[..frac_part.len().min(scale as usize)];
    let mut frac_value: u128 = if kept.is_empty() {
        0
    } else {
        kept.parse().map_err(|_| invalid())?
    };
    frac_value *= 10u128.pow(scale - kept.len() as u32);

    int_value
        .checked_mul(10u128.pow(scale))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(invalid)
}

fn format_fixed(raw: u128, scale: u32, decimals: u32) -> String {
    let decimals = decimals.min(scale);
    let unit = 10u128.pow(scale - decimals);
    let rounded = if unit > 1 {
        raw / unit + u128::from(raw % unit >= unit / 2)
    } else {
        raw
    };
    let divisor = 10u128.pow(decimals);
    let int_part = group_thousands(rounded / divisor);
    if decimals == 0 {
        int_part
    } else {
        format!(
            "{int_part}.{:0width$}",
            rounded % divisor,
            width = decimals as usize
        )
    }
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_eth_is_exact() {
        let amount = WeiAmount::parse_eth("301720.664913446243502258").unwrap();
        assert_eq!(amount.raw(), 301_720_664_913_446_243_502_258);
        assert_eq!(amount.whole_eth(), 301_720);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(WeiAmount::parse_eth("").is_err());
        assert!(WeiAmount::parse_eth("1.2.3").is_err());
        assert!(UsdAmount::parse("-4").is_err());
        assert!(UsdAmount::parse("abc").is_err());
    }

    #[test]
    fn parse_usd_truncates_extra_digits() {
        let price = UsdAmount::parse("4123.5712349").unwrap();
        assert_eq!(price.raw(), 4_123_571_234);
    }

    #[test]
    fn format_rounds_half_up_and_groups() {
        let amount = WeiAmount::parse_eth("1234567.125").unwrap();
        assert_eq!(amount.format_eth(2), "1,234,567.13");
        assert_eq!(amount.format_eth(0), "1,234,567");
        assert_eq!(WeiAmount::ZERO.format_eth(2), "0.00");
    }

    #[test]
    fn usd_value_of_eth() {
        let burned = WeiAmount::from_eth(1_500_000);
        let price = UsdAmount::parse("4000").unwrap();
        assert_eq!(burned.value_in_usd(price), UsdAmount::from_dollars(6_000_000_000));
    }

    #[test]
    fn compact_usd_formatting() {
        assert_eq!(UsdAmount::from_dollars(6_000_000_000).format_compact(), "$6.00B");
        assert_eq!(UsdAmount::parse("456700").unwrap().format_compact(), "$456.70K");
        assert_eq!(UsdAmount::parse("12.345").unwrap().format_compact(), "$12.35");
    }

    #[test]
    fn signed_formatting() {
        assert_eq!(format_signed_eth(-(WEI_PER_ETH as i128) * 3 / 2, 2), "-1.50");
        assert_eq!(format_signed_eth(WEI_PER_ETH as i128 * 2, 1), "+2.0");
    }

    #[test]
    fn amounts_serialize_as_strings() {
        let json = serde_json::to_string(&WeiAmount::new(42)).unwrap();
        assert_eq!(json, "\"42\"");
        let back: WeiAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WeiAmount::new(42));
    }
}
