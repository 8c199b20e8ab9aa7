//! Title normalization
//!
//! OCR output and reference titles are both reduced to a comparable form
//! before scoring: digit variants are folded to ASCII and punctuation,
//! symbols and whitespace are dropped.

use once_cell::sync::Lazy;
use regex::Regex;

static IGNORED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{P}\p{S}\s]").expect("ignored character class is valid"));

/// Race events carry a parenthesized suffix that is never drawn in game.
static RACE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<origin>レース.+?)\([0-9].+?\)$").expect("race suffix pattern is valid")
});

/// Fold full-width and circled digits, then drop punctuation, symbols and
/// whitespace.
pub fn normalize_for_comparison(text: &str) -> String {
    let folded: String = text.chars().map(fold_digit).collect();
    IGNORED.replace_all(&folded, "").into_owned()
}

/// Comparison key of a reference title.
pub fn reference_title_key(title: &str) -> String {
    let visible = RACE_SUFFIX
        .captures(title)
        .and_then(|caps| caps.name("origin"))
        .map_or(title, |m| m.as_str());
    normalize_for_comparison(visible)
}

fn fold_digit(c: char) -> char {
    match c {
        '０'..='９' => shift_digit(c, '０', b'0'),
        '①'..='⑨' => shift_digit(c, '①', b'1'),
        _ => c,
    }
}

fn shift_digit(c: char, first: char, ascii_first: u8) -> char {
    char::from(ascii_first + (c as u32 - first as u32) as u8)
}
