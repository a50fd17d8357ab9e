//! Price cleaning: currency stripping and separator normalization.
//!
//! Supplier files mix every convention — `"1 234,56"`, `"1,234.56"`,
//! `"1.234,56"`, `"€1234.56"`, `"1234,56 руб."`, ranges like `"100-150"`.
//! Everything funnels through [`clean_price`], which yields a two-decimal
//! [`Decimal`] or `None`; prices never touch floats.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

/// Currency markers recognized during detection/stripping, mapped to ISO
/// 4217 codes. Longer tokens come first so `"рублей"` wins over `"руб"`.
const CURRENCY_MARKERS: &[(&str, &str)] = &[
    ("рублей", "RUB"),
    ("руб.", "RUB"),
    ("руб", "RUB"),
    ("dollars", "USD"),
    ("dollar", "USD"),
    ("euros", "EUR"),
    ("euro", "EUR"),
    ("byn", "BYN"),
    ("usd", "USD"),
    ("eur", "EUR"),
    ("rub", "RUB"),
    ("₽", "RUB"),
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
];

/// Outcome of a price parse.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceParse {
    pub amount: Option<Decimal>,
    pub currency_code: Option<&'static str>,
}

impl PriceParse {
    fn none() -> Self {
        Self {
            amount: None,
            currency_code: None,
        }
    }
}

/// Detects a currency marker anywhere in the string.
pub fn detect_currency(raw: &str) -> Option<&'static str> {
    let lower = raw.to_lowercase();
    CURRENCY_MARKERS
        .iter()
        .find(|(marker, _)| lower.contains(marker))
        .map(|(_, code)| *code)
}

/// Cleans a raw price cell into a non-negative two-decimal amount.
///
/// Rules:
/// - currency glyphs and words are stripped (and reported);
/// - a range takes its first value (`"100-150"` → 100);
/// - thousand/decimal separators are unified: when both `.` and `,`
///   appear, the rightmost one is the decimal point; a lone `,` is decimal
///   iff it is followed by at most two digits;
/// - anything non-numeric after cleaning → `None`.
pub fn clean_price(raw: &str) -> PriceParse {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PriceParse::none();
    }

    let currency_code = detect_currency(trimmed);
    let mut text = trimmed.to_lowercase();
    for (marker, _) in CURRENCY_MARKERS {
        text = text.replace(marker, " ");
    }

    // First numeric token; everything after a range dash is dropped.
    let number = match number_token(&text) {
        Some(token) => token,
        None => return PriceParse::none(),
    };

    let normalized = normalize_separators(&number);
    let amount = normalized
        .parse::<Decimal>()
        .ok()
        .filter(|d| !d.is_sign_negative())
        .map(|d| d.round_dp(2));

    PriceParse {
        amount,
        currency_code,
    }
}

/// Convenience wrapper returning just the amount.
pub fn clean_price_amount(raw: &str) -> Option<Decimal> {
    clean_price(raw).amount
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d\s.,]*").expect("valid number regex"))
}

/// Extracts the first number-like run of digits/separators, with internal
/// spaces (thousand separators) removed.
fn number_token(text: &str) -> Option<String> {
    let m = number_re().find(text)?;
    let token: String = m
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let token = token.trim_end_matches(['.', ',']).to_string();
    (!token.is_empty()).then_some(token)
}

fn normalize_separators(token: &str) -> String {
    let has_dot = token.contains('.');
    let has_comma = token.contains(',');

    match (has_dot, has_comma) {
        (true, true) => {
            // Rightmost separator is the decimal point.
            let last_dot = token.rfind('.').unwrap_or(0);
            let last_comma = token.rfind(',').unwrap_or(0);
            if last_dot > last_comma {
                token.replace(',', "")
            } else {
                token.replace('.', "").replace(',', ".")
            }
        }
        (false, true) => {
            let after = token.rfind(',').map(|i| token.len() - i - 1).unwrap_or(0);
            if token.matches(',').count() == 1 && after <= 2 {
                token.replace(',', ".")
            } else {
                token.replace(',', "")
            }
        }
        (true, false) => {
            if token.matches('.').count() > 1 {
                // Multiple dots can only be thousand separators.
                token.replace('.', "")
            } else {
                token.to_string()
            }
        }
        (false, false) => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn plain_decimal() {
        assert_eq!(clean_price_amount("1234.56"), Some(dec("1234.56")));
    }

    #[test]
    fn us_thousands() {
        assert_eq!(clean_price_amount("1,234.56"), Some(dec("1234.56")));
    }

    #[test]
    fn european_space_thousands() {
        assert_eq!(clean_price_amount("1 234,56"), Some(dec("1234.56")));
    }

    #[test]
    fn european_dot_thousands() {
        assert_eq!(clean_price_amount("1.234,56"), Some(dec("1234.56")));
    }

    #[test]
    fn currency_glyphs_are_stripped() {
        let parse = clean_price("€1234.56");
        assert_eq!(parse.amount, Some(dec("1234.56")));
        assert_eq!(parse.currency_code, Some("EUR"));
    }

    #[test]
    fn russian_currency_words() {
        let parse = clean_price("1234,56 руб.");
        assert_eq!(parse.amount, Some(dec("1234.56")));
        assert_eq!(parse.currency_code, Some("RUB"));
    }

    #[test]
    fn range_takes_the_first_value() {
        assert_eq!(clean_price_amount("100-150"), Some(dec("100")));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(clean_price_amount("not a price"), None);
        assert_eq!(clean_price_amount(""), None);
        assert_eq!(clean_price_amount("   "), None);
    }

    #[test]
    fn spaces_as_thousands_without_decimals() {
        assert_eq!(clean_price_amount("1 500"), Some(dec("1500")));
    }

    #[test]
    fn lone_comma_with_three_digits_is_thousands() {
        assert_eq!(clean_price_amount("1,234"), Some(dec("1234")));
    }

    #[test]
    fn currency_detection_variants() {
        assert_eq!(detect_currency("₽1500"), Some("RUB"));
        assert_eq!(detect_currency("99.99$"), Some("USD"));
        assert_eq!(detect_currency("25 рублей"), Some("RUB"));
        assert_eq!(detect_currency("99 USD"), Some("USD"));
        assert_eq!(detect_currency("1500"), None);
    }

    #[test]
    fn amounts_are_quantized_to_two_decimals() {
        assert_eq!(clean_price_amount("10.999"), Some(dec("11.00")));
    }
}
