//! Helper functions and utilities
//!
//! Text normalization and formatting shared by the classifier and the handlers.

use rust_decimal::{Decimal, RoundingStrategy};

/// Lowercase, fold Spanish accents and turn punctuation into spaces.
///
/// The result is a single-spaced string of alphanumeric words; a leading
/// slash is kept so commands like "/admin" survive.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            '/' => '/',
            c if c.is_alphanumeric() => c,
            _ => ' ',
        })
        .collect();

    normalize_whitespace(&folded)
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format an amount with two decimals and a currency symbol
pub fn format_money(amount: Decimal, currency_symbol: &str) -> String {
    format!(
        "{} {:.2}",
        currency_symbol,
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}
