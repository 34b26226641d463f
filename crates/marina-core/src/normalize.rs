//! Normalization of loosely written catway attributes
//!
//! Imported berth lists spell types and states in several languages and with
//! accents ("Réparation", "bon état", "Grand"). These helpers fold such text
//! to the canonical enums. Unknown spellings fall back to `long` / `free`.

use crate::catway::{CatwayState, CatwayType};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold text for synonym matching: trimmed, lowercased and without diacritics.
///
/// Text is decomposed (NFD) first, so precomposed and decomposed accents fold
/// the same way.
pub fn fold_text(s: &str) -> String {
    let mut folded = String::with_capacity(s.len());
    for c in s
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
    {
        match c {
            'œ' => folded.push_str("oe"),
            'æ' => folded.push_str("ae"),
            'ß' => folded.push_str("ss"),
            other => folded.push(other),
        }
    }
    folded
}

/// Map free text to a catway type
pub fn normalize_type(raw: &str) -> CatwayType {
    match fold_text(raw).as_str() {
        "short" | "court" | "petit" => CatwayType::Short,
        _ => CatwayType::Long,
    }
}

/// Map free text to a catway state
pub fn normalize_state(raw: &str) -> CatwayState {
    match fold_text(raw).as_str() {
        "busy" | "occupe" | "pris" | "reserve" | "indisponible" => CatwayState::Busy,
        "maintenance" | "reparation" | "hors service" | "hs" => CatwayState::Maintenance,
        _ => CatwayState::Free,
    }
}
