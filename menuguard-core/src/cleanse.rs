//! OCR noise cleansing.
//!
//! First stage of the pipeline: strips symbol noise, fixes known OCR
//! misreadings, and normalizes price notation. Pure over its input;
//! confidence and bounding boxes pass through untouched.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{CleansedFragment, OcrFragment};

/// Symbol characters that OCR picks up from menu decorations and borders.
const SYMBOL_BLACKLIST: &[char] = &[
    '#', '$', '%', '&', '*', '@', '!', '~', '^', '+', '=', '<', '>',
];

/// Whole-token OCR misreadings. OCR frequently splits a Hangul syllable
/// into a consonant glyph plus a Latin look-alike ("l" for ㅣ, "0" for ㅇ).
/// Matched against complete tokens only.
const MISREAD_TOKENS: &[(&str, &str)] = &[
    ("0l", "이"),
    ("7l", "기"),
    ("ㅊl", "치"),
    ("ㅁH", "매"),
    ("人l", "시"),
];

/// Multi-character misreadings fixed anywhere in the text.
const MISREAD_SUBSTRINGS: &[(&str, &str)] = &[
    ("ㅉl", "찌"),
    ("ㄲH", "깨"),
    ("ㅂr", "바"),
    ("ㄱH", "개"),
    ("ㅊl", "치"),
];

static THOUSANDS_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d),(\d{3})").expect("static regex"));

static K_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)[kK]\b").expect("static regex"));

static MAN_WON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)만원").expect("static regex"));

/// A bare number with an optional currency marker, used when collapsing
/// price-labeled text down to just the price itself.
static PRICE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"₩?\d+\s?(?:원|won)?").expect("static regex"));

/// Cleanse a batch of OCR fragments. Empty input yields empty output;
/// this never fails.
pub fn cleanse(fragments: &[OcrFragment]) -> Vec<CleansedFragment> {
    fragments.iter().map(cleanse_fragment).collect()
}

fn cleanse_fragment(fragment: &OcrFragment) -> CleansedFragment {
    let text = strip_noise(&fragment.text);
    let text = fix_misreads(&text);
    let text = normalize_price(&text);

    CleansedFragment {
        original: fragment.text.clone(),
        cleansed: text,
        confidence: fragment.confidence,
        bounding_box: fragment.bounding_box,
    }
}

/// Drop blacklisted symbols, collapse whitespace runs, trim the ends.
fn strip_noise(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !SYMBOL_BLACKLIST.contains(c))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply the misread lookup table: whole tokens first, then a raw
/// substring pass for multi-character typos.
fn fix_misreads(text: &str) -> String {
    let tokens: Vec<&str> = text.split(' ').collect();
    let mut out = tokens
        .iter()
        .map(|token| {
            MISREAD_TOKENS
                .iter()
                .find(|(bad, _)| bad == token)
                .map(|(_, good)| *good)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ");

    for (bad, good) in MISREAD_SUBSTRINGS {
        out = out.replace(bad, good);
    }

    out
}

/// Normalize price notation: strip thousands commas, expand the "10k"
/// shorthand and the Korean 만원 (ten-thousand won) notation, and collapse
/// price-labeled text to just the numeric token.
fn normalize_price(text: &str) -> String {
    let mut out = text.to_string();

    // 1,000,000 needs repeated passes since matches cannot overlap.
    while THOUSANDS_COMMA.is_match(&out) {
        out = THOUSANDS_COMMA.replace_all(&out, "$1$2").into_owned();
    }

    out = K_SHORTHAND
        .replace_all(&out, |caps: &regex::Captures| {
            match caps[1].parse::<u64>().ok().and_then(|n| n.checked_mul(1000)) {
                Some(n) => n.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    out = MAN_WON
        .replace_all(&out, |caps: &regex::Captures| {
            match caps[1]
                .parse::<u64>()
                .ok()
                .and_then(|n| n.checked_mul(10_000))
            {
                Some(n) => format!("{}원", n),
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    if is_price_description(&out) {
        if let Some(m) = PRICE_TOKEN.find(&out) {
            return m.as_str().trim().to_string();
        }
    }

    out
}

/// Fragments explicitly labeled as prices ("가격: 12000원", "Price 9000")
/// carry no menu-item information beyond the number itself.
fn is_price_description(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("price") || text.starts_with("가격")
}
