use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use runevault_common::config::SizeWeights;
use runevault_common::fee_estimation::{calculate_total_fee, estimate_fee, estimate_tx_size, is_dust_amount};
use runevault_common::WalletError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn test_size_model_reference_value() {
    let weights = SizeWeights::default();
    // 10 + 2*64 + 0*42 + 4*40
    assert_eq!(estimate_tx_size(2, 0, 4, &weights), 298);
    assert_eq!(estimate_tx_size(0, 0, 0, &weights), 10);
    assert_eq!(estimate_tx_size(1, 1, 2, &weights), 10 + 64 + 42 + 80);
}

#[test]
fn test_size_model_uses_configured_weights() {
    let weights = SizeWeights {
        base: 11,
        taproot_input: 58,
        legacy_input: 148,
        output: 43,
    };
    assert_eq!(estimate_tx_size(2, 1, 3, &weights), 11 + 116 + 148 + 129);
}

#[test]
fn test_fee_floor_applies_to_small_transactions() {
    assert_eq!(estimate_fee(298, dec!(0.5), 250).unwrap(), 250);
    assert_eq!(estimate_fee(10, dec!(1), 250).unwrap(), 250);
    assert_eq!(estimate_fee(298, Decimal::ZERO, 250).unwrap(), 250);
}

#[test]
fn test_fee_above_floor_is_size_times_rate() {
    assert_eq!(estimate_fee(298, dec!(2), 250).unwrap(), 596);
    assert_eq!(estimate_fee(298, dec!(10), 250).unwrap(), 2_980);
}

#[test]
fn test_fee_rounds_up() {
    // 362 * 1.1 = 398.2
    assert_eq!(estimate_fee(362, dec!(1.1), 250).unwrap(), 399);
    assert_eq!(calculate_total_fee(dec!(0.1), 5).unwrap(), 1);
}

#[test]
fn test_negative_rate_hits_floor() {
    assert_eq!(estimate_fee(1_000, dec!(-3), 250).unwrap(), 250);
}

#[test]
fn test_out_of_range_fee_is_an_error() {
    // Decimal overflow in the multiplication itself
    let err = estimate_fee(298, Decimal::MAX, 250).unwrap_err();
    assert!(matches!(err, WalletError::InvalidArgument(_)));

    // Product fits in a Decimal but not in a u64
    let err = calculate_total_fee(Decimal::from(u64::MAX), 2).unwrap_err();
    assert!(matches!(err, WalletError::InvalidArgument(_)));
}

#[test]
fn test_dust_detection() {
    assert!(is_dust_amount(0));
    assert!(is_dust_amount(545));
    assert!(!is_dust_amount(546));
}

#[quickcheck]
fn fee_never_below_floor(size: u16, rate_tenths: u16) -> bool {
    let rate = Decimal::new(i64::from(rate_tenths), 1);
    estimate_fee(usize::from(size), rate, 250).unwrap() >= 250
}

#[quickcheck]
fn fee_covers_size_times_rate(size: u16, rate_tenths: u16) -> TestResult {
    let rate = Decimal::new(i64::from(rate_tenths), 1);
    let fee = estimate_fee(usize::from(size), rate, 250).unwrap();
    let exact = Decimal::from(size) * rate;

    TestResult::from_bool(Decimal::from(fee) >= exact && Decimal::from(fee) < exact.max(dec!(250)) + dec!(1))
}
