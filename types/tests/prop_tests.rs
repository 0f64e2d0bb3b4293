use proptest::prelude::*;

use ember_types::quantity::{format_quantity, parse_quantity};
use ember_types::{Bucket, RecordHash, Timestamp, UsdAmount, WeiAmount};

proptest! {
    /// RecordHash roundtrip through its 0x-hex string form.
    #[test]
    fn record_hash_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = RecordHash::new(bytes);
        let parsed: RecordHash = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// Hex quantities roundtrip for every u128.
    #[test]
    fn quantity_roundtrip(value in any::<u128>()) {
        prop_assert_eq!(parse_quantity(&format_quantity(value)).unwrap(), value);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp has_expired agrees with manual arithmetic.
    #[test]
    fn timestamp_has_expired_correct(
        start in 0u64..500_000,
        duration in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start.saturating_add(offset));
        prop_assert_eq!(t.has_expired(duration, now), offset >= duration);
    }

    /// Every timestamp lies inside its own hour and day bucket, and the hour
    /// bucket lies inside the day bucket.
    #[test]
    fn buckets_contain_their_timestamp(secs in 0u64..4_000_000_000) {
        let ts = Timestamp::new(secs);
        let hour = Bucket::hour_of(ts);
        let day = Bucket::day_of(ts);
        prop_assert!(hour.contains(ts));
        prop_assert!(day.contains(ts));
        prop_assert!(day.contains(hour.start()));
        prop_assert!(hour.end() <= day.end());
    }

    /// Parsing a whole-ETH string yields exactly eth * 10^18 wei.
    #[test]
    fn wei_parse_whole_eth(eth in 0u64..1_000_000_000) {
        let parsed = WeiAmount::parse_eth(&eth.to_string()).unwrap();
        prop_assert_eq!(parsed, WeiAmount::from_eth(eth));
        prop_assert_eq!(parsed.whole_eth(), eth as u128);
    }

    /// WeiAmount: checked_add(a, b) == Some(a + b) when no overflow.
    #[test]
    fn wei_checked_add(a in 0u128..u128::MAX / 2, b in 0u128..u128::MAX / 2) {
        let sum = WeiAmount::new(a).checked_add(WeiAmount::new(b));
        prop_assert_eq!(sum, Some(WeiAmount::new(a + b)));
    }

    /// WeiAmount: saturating_sub never panics and returns ZERO on underflow.
    #[test]
    fn wei_saturating_sub(a in 0u128..1_000_000, b in 0u128..1_000_000) {
        let result = WeiAmount::new(a).saturating_sub(WeiAmount::new(b));
        if b > a {
            prop_assert_eq!(result, WeiAmount::ZERO);
        } else {
            prop_assert_eq!(result, WeiAmount::new(a - b));
        }
    }

    /// Valuing whole ETH at a whole-dollar price is exact.
    #[test]
    fn usd_value_is_exact(eth in 0u64..100_000_000, dollars in 0u64..100_000) {
        let value = WeiAmount::from_eth(eth).value_in_usd(UsdAmount::from_dollars(dollars));
        prop_assert_eq!(value.whole_dollars(), eth as u128 * dollars as u128);
    }
}
