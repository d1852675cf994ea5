//! Helpers shared by the retailer normalizers: names, prices and discounts.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PRICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("price pattern compiles"));

/// Trim and collapse inner whitespace (including NBSP) to single spaces.
pub fn clean_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse shelf price text such as `"89,99 ₽"`, `"1 299 ₽"` or `"от 45.50"`.
///
/// Thousands separators (space, NBSP, narrow NBSP) are dropped before the
/// first number is taken. Zero or negative prices are rejected.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\u{2009}'))
        .collect();
    let number = PRICE_NUMBER.find(&compact)?.as_str().replace(',', ".");
    number
        .parse::<f64>()
        .ok()
        .filter(|p| *p > 0.0)
        .map(round_price)
}

/// Read a price from a JSON number or numeric string
pub fn value_to_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|p| *p > 0.0).map(round_price),
        Value::String(s) => parse_price_text(s),
        _ => None,
    }
}

/// Whole-percent discount from `old_price` to `price`
pub fn discount_percent(price: f64, old_price: f64) -> Option<u32> {
    if old_price <= 0.0 || price >= old_price {
        return None;
    }
    Some(((old_price - price) / old_price * 100.0).round() as u32)
}

/// Resolved pricing of one product
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub price: f64,
    pub old_price: Option<f64>,
    pub discount_percent: Option<u32>,
}

/// Combine a current price with an optional pre-discount price.
///
/// The old price is kept only when it is strictly higher; a provider-given
/// discount wins over the computed one.
pub fn pricing(price: f64, old_price: Option<f64>, provider_discount: Option<u32>) -> Pricing {
    let old_price = old_price.filter(|old| *old > price);
    let discount_percent = old_price.and_then(|old| {
        provider_discount
            .filter(|d| *d > 0 && *d < 100)
            .or_else(|| discount_percent(price, old))
    });
    Pricing {
        price,
        old_price,
        discount_percent,
    }
}
