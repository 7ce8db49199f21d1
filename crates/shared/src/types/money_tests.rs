use super::*;
use crate::types::money::Currency;
use rust_decimal::Decimal;
use std::str::FromStr;

#[test]
fn test_money_creation() {
    let usd = Currency::new("USD").unwrap();
    let money = Money::new(Decimal::new(100, 2), usd);
    assert_eq!(money.amount, Decimal::new(100, 2));
    assert_eq!(money.currency, usd);
}

#[test]
fn test_money_zero() {
    let money = Money::zero(Currency::new("USD").unwrap());
    assert_eq!(money.amount, Decimal::ZERO);
    assert!(money.is_zero());
}

#[test]
fn test_money_negative() {
    let money = Money::new(Decimal::new(-100, 2), Currency::new("USD").unwrap());
    assert!(money.is_negative());
}

#[test]
fn test_currency_display() {
    assert_eq!(format!("{}", Currency::new("usd").unwrap()), "USD");
    assert_eq!(format!("{}", Currency::new("IDR").unwrap()), "IDR");
    assert_eq!(format!("{}", Currency::new("eur").unwrap()), "EUR");
}

#[test]
fn test_currency_from_str() {
    assert_eq!(Currency::from_str("USD").unwrap(), Currency::new("usd").unwrap());
    assert!(Currency::from_str("INVALID").is_err());
    assert!(Currency::from_str("U5D").is_err());
}
