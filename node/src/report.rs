//! Report text.
//!
//! Amounts are rendered with two decimals; dollar figures use the compact
//! K/M/B form. When no price has been observed yet the dollar figures are
//! left out rather than guessed.

use std::fmt::Write;

use ember_types::amount::format_signed_eth;
use ember_types::{Threshold, UsdAmount, WeiAmount};

use crate::window::AggregateSnapshot;

fn with_usd(amount: WeiAmount, price: Option<UsdAmount>) -> String {
    match price {
        Some(price) => format!(
            "{} ETH ({})",
            amount.format_eth(2),
            amount.value_in_usd(price).format_compact()
        ),
        None => format!("{} ETH", amount.format_eth(2)),
    }
}

/// Hourly or daily summary.
pub fn bucket_report(snapshot: &AggregateSnapshot, price: Option<UsdAmount>) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "{} Report: {}",
        snapshot.bucket.kind_name(),
        snapshot.bucket.range()
    );
    let _ = writeln!(text, "Burned: {}", with_usd(snapshot.burned, price));
    let _ = writeln!(text, "Issued: {} ETH", snapshot.issuance().format_eth(2));
    let _ = writeln!(
        text,
        "Net change: {} ETH",
        format_signed_eth(snapshot.net_issuance(), 2)
    );
    let _ = writeln!(
        text,
        "Cumulative burned: {}",
        with_usd(snapshot.cumulative_burned, price)
    );
    let _ = write!(
        text,
        "Blocks {}-{} ({})",
        snapshot.start_block,
        snapshot.end_block,
        snapshot.block_count()
    );
    text
}

/// Cumulative burn reached a whole-ETH step.
pub fn eth_threshold_report(step: WeiAmount, price: Option<UsdAmount>) -> String {
    let mut text = format!("{} ETH burned since London", step.format_eth(0));
    if let Some(price) = price {
        let _ = write!(
            text,
            "\nWorth {} at {} per ETH",
            step.value_in_usd(price).format_compact(),
            price.format_dollars(2)
        );
    }
    text
}

/// Cumulative burn, valued at `price`, reached a dollar step.
pub fn usd_threshold_report(step: UsdAmount, cumulative: WeiAmount, price: UsdAmount) -> String {
    format!(
        "{} worth of ETH burned since London\n{} ETH at {} per ETH",
        step.format_compact(),
        cumulative.format_eth(2),
        price.format_dollars(2)
    )
}

/// Title line used when logging a threshold emission.
pub fn threshold_title(threshold: &Threshold) -> String {
    format!("Threshold reached: {threshold}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_types::{Bucket, Timestamp};

    fn snapshot() -> AggregateSnapshot {
        AggregateSnapshot {
            bucket: Bucket::hour_of(Timestamp::new(1_636_695_067)),
            start_block: 13_600_000,
            end_block: 13_600_279,
            burned: WeiAmount::parse_eth("1234.567").unwrap(),
            base_issuance: WeiAmount::from_eth(560),
            uncle_issuance: WeiAmount::parse_eth("3.5").unwrap(),
            cumulative_burned: WeiAmount::parse_eth("949398.2416").unwrap(),
        }
    }

    #[test]
    fn hourly_report_with_price() {
        let text = bucket_report(&snapshot(), Some(UsdAmount::from_dollars(4_000)));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Hourly Report: 2021-11-12 05:00-06:00 UTC");
        assert_eq!(lines[1], "Burned: 1,234.57 ETH ($4.94M)");
        assert_eq!(lines[2], "Issued: 563.50 ETH");
        assert_eq!(lines[3], "Net change: -671.07 ETH");
        assert_eq!(lines[4], "Cumulative burned: 949,398.24 ETH ($3.80B)");
        assert_eq!(lines[5], "Blocks 13600000-13600279 (280)");
    }

    #[test]
    fn report_without_price_omits_dollars() {
        let text = bucket_report(&snapshot(), None);
        assert!(text.contains("Burned: 1,234.57 ETH\n"));
        assert!(!text.contains('$'));
    }

    #[test]
    fn threshold_reports() {
        let eth = eth_threshold_report(WeiAmount::from_eth(10_000), Some(UsdAmount::from_dollars(4_500)));
        assert_eq!(
            eth,
            "10,000 ETH burned since London\nWorth $45.00M at $4,500.00 per ETH"
        );
        assert_eq!(
            eth_threshold_report(WeiAmount::from_eth(20_000), None),
            "20,000 ETH burned since London"
        );

        let usd = usd_threshold_report(
            UsdAmount::from_dollars(6_000_000_000),
            WeiAmount::from_eth(1_500_000),
            UsdAmount::from_dollars(4_000),
        );
        assert!(usd.starts_with("$6.00B worth of ETH burned since London"));
        assert!(usd.ends_with("1,500,000.00 ETH at $4,000.00 per ETH"));
    }
}
