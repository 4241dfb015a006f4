//! Normalization and deduplication of cleansed menu fragments.
//!
//! Per-item transform (spacing, typo table, abbreviation expansion)
//! followed by a greedy single-pass merge of near-duplicate entries using
//! Levenshtein similarity. O(n²) in item count, which is fine for menus
//! (tens of items per scan).

use crate::types::{CleansedFragment, NormalizedItem};

/// Two entries whose normalized text is at least this similar (percent)
/// are considered the same menu item.
pub const MERGE_THRESHOLD: f64 = 80.0;

/// Known typo variants that OCR and handwriting produce for the same word.
/// All variants converge to one canonical spelling.
const TYPO_VARIANTS: &[(&str, &str)] = &[
    ("찌게", "찌개"),
    ("찌계", "찌개"),
    ("지개", "찌개"),
    ("뽁음", "볶음"),
    ("뽂음", "볶음"),
];

/// Menu shorthand expanded to the full item name.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("삼겹", "삼겹살"),
    ("물냉", "물냉면"),
    ("비냉", "비빔냉면"),
    ("김찌", "김치찌개"),
    ("된찌", "된장찌개"),
    ("아아", "아이스 아메리카노"),
];

/// Normalize and deduplicate a batch of cleansed fragments.
/// Empty input yields empty output.
pub fn normalize(cleansed: &[CleansedFragment]) -> Vec<NormalizedItem> {
    let items: Vec<NormalizedItem> = cleansed.iter().map(normalize_fragment).collect();
    dedupe(items)
}

fn normalize_fragment(fragment: &CleansedFragment) -> NormalizedItem {
    let text = standardize_spacing(&fragment.cleansed);
    let text = fix_typos(&text);
    let text = expand_abbreviations(&text);

    NormalizedItem {
        original: fragment.original.clone(),
        normalized: text,
        confidence: fragment.confidence,
        bounding_box: fragment.bounding_box,
    }
}

/// Menu names should not contain internal spaces; OCR introduces them when
/// it splits one name across regions. A space survives only between two
/// digits, so numbers like "10 000" stay intact while "김치 찌개" and
/// "10 인분" are joined.
fn standardize_spacing(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        if c != ' ' {
            out.push(c);
            continue;
        }
        let prev = chars[..i].iter().rev().find(|ch| **ch != ' ');
        let next = chars[i + 1..].iter().find(|ch| **ch != ' ');
        if let (Some(p), Some(n)) = (prev, next) {
            if p.is_ascii_digit() && n.is_ascii_digit() && !out.ends_with(' ') {
                out.push(' ');
            }
        }
    }

    out
}

fn fix_typos(text: &str) -> String {
    let mut out = text.to_string();
    for (variant, canonical) in TYPO_VARIANTS {
        out = out.replace(variant, canonical);
    }
    out
}

/// Expand menu shorthand. Preference order: a whole-token match, then the
/// first boundary-anchored occurrence, then an exact-equality shortcut for
/// single-token inputs.
fn expand_abbreviations(text: &str) -> String {
    let tokens: Vec<&str> = text.split(' ').collect();

    for (abbr, full) in ABBREVIATIONS {
        if tokens.iter().any(|t| t == abbr) {
            return tokens
                .iter()
                .map(|t| if t == abbr { *full } else { *t })
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    for (abbr, full) in ABBREVIATIONS {
        // Skip inputs that already contain the expansion, otherwise
        // "삼겹살" would expand its own prefix again.
        if text.contains(full) {
            continue;
        }
        if let Some(start) = find_anchored(text, abbr) {
            let mut out = String::with_capacity(text.len() + full.len());
            out.push_str(&text[..start]);
            out.push_str(full);
            out.push_str(&text[start + abbr.len()..]);
            return out;
        }
    }

    for (abbr, full) in ABBREVIATIONS {
        if text == *abbr {
            return full.to_string();
        }
    }

    text.to_string()
}

/// Byte offset of the first occurrence of `needle` that sits at word
/// boundaries on both sides (string edge or a non-alphanumeric character).
/// Keeps the substitution pass from splicing inside a longer word.
fn find_anchored(text: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = text[from..].find(needle) {
        let start = from + offset;
        let end = start + needle.len();
        let left_ok = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let right_ok = text[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if left_ok && right_ok {
            return Some(start);
        }
        from = start
            + needle
                .chars()
                .next()
                .map_or(1, |c| c.len_utf8());
    }
    None
}

/// Greedy single-pass merge: each candidate is compared against the
/// already-accepted items; on a duplicate the higher-confidence record
/// survives (ties keep the accepted one). Order-dependent by design.
fn dedupe(items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
    let mut accepted: Vec<NormalizedItem> = Vec::new();

    'candidates: for candidate in items {
        for existing in accepted.iter_mut() {
            let exact =
                existing.normalized.to_lowercase() == candidate.normalized.to_lowercase();
            if exact || similarity(&existing.normalized, &candidate.normalized) >= MERGE_THRESHOLD
            {
                if candidate.confidence > existing.confidence {
                    *existing = candidate;
                }
                continue 'candidates;
            }
        }
        accepted.push(candidate);
    }

    accepted
}

/// Percent similarity between two strings: `(maxLen − dist) / maxLen × 100`.
/// Two empty strings are 100% similar; empty vs non-empty is 0%.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return 100.0;
    }

    let dist = edit_distance(a, b);
    (max_len - dist) as f64 / max_len as f64 * 100.0
}

/// Classic Levenshtein distance (single-character insert/delete/substitute)
/// over Unicode scalar values, two-row DP.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
