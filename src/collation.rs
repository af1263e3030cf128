//! The `DAAP` collation and the `like`/`daap_no_zero` SQL functions,
//! registered against every per-worker handle by [`crate::store`].
//!
//! Ported from `sqlext.c`'s `daap_unicode_xcollation`, `icuLikeCompare` and
//! `daap_no_zero_xfunc`.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use crate::error::CoreError;
use crate::unicode_fold::{DiacriticMode, fold};

/// Maximum LIKE pattern length in bytes, matching
/// `SQLITE_MAX_LIKE_PATTERN_LENGTH` in `sqlext.c`.
pub const MAX_LIKE_PATTERN_LENGTH: usize = 50_000;

/// Bound on pattern recursion depth (one level per run of literal `%`s).
/// The original C code has no such bound and relies on the pattern-length
/// cap alone; we add this because Rust has no sigaltstack-based guard page
/// detection, so an unbounded stack of `%` in a 50000-byte pattern could
/// still recurse tens of thousands of times.
const MAX_LIKE_RECURSION: u32 = 1024;

/// Case/diacritic-insensitive ordering. Non-alphabetic strings (numbers,
/// punctuation) always sort after alphabetic ones regardless of the
/// character-by-character comparison, then ties are broken by an
/// NFD-normalized, casefolded comparison.
pub fn daap_collate(left: &str, right: &str) -> Ordering {
    let lch = left.chars().next();
    let rch = right.chars().next();

    let lalpha = lch.is_some_and(|c| c.is_alphabetic());
    let ralpha = rch.is_some_and(|c| c.is_alphabetic());

    match (lalpha, ralpha) {
        (false, true) => return Ordering::Greater,
        (true, false) => return Ordering::Less,
        _ => {}
    }

    let lfold: String = left.nfd().flat_map(|c| char::from_u32(fold(c as u32, DiacriticMode::Keep))).collect();
    let rfold: String = right.nfd().flat_map(|c| char::from_u32(fold(c as u32, DiacriticMode::Keep))).collect();
    lfold.cmp(&rfold)
}

/// `daap_no_zero(new_value, old_value)`: keep `new_value` unless it is
/// zero, in which case fall back to `old_value`. Used to preserve a
/// persistent id across a rescan that momentarily computed a hash of zero.
pub fn daap_no_zero(new_value: i64, old_value: i64) -> i64 {
    if new_value != 0 { new_value } else { old_value }
}

/// `like(pattern, string[, escape])`. Case/diacritic-insensitive, with `%`
/// matching any run of characters and `_` matching exactly one.
pub fn like_match(pattern: &str, string: &str, escape: Option<char>) -> Result<bool, CoreError> {
    if pattern.len() > MAX_LIKE_PATTERN_LENGTH {
        return Err(CoreError::ClientMalformed(
            "LIKE pattern too complex".to_string(),
        ));
    }
    let pat: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = string.chars().collect();
    like_compare(&pat, &s, escape, 0).map_err(|_| {
        CoreError::ClientMalformed("LIKE pattern recursion too deep".to_string())
    })
}

fn like_compare(pattern: &[char], s: &[char], esc: Option<char>, depth: u32) -> Result<bool, ()> {
    if depth > MAX_LIKE_RECURSION {
        return Err(());
    }

    const MATCH_ALL: char = '%';
    const MATCH_ONE: char = '_';

    let mut pi = 0usize;
    let mut si = 0usize;
    let mut prev_escape = false;

    while pi < pattern.len() {
        let p = pattern[pi];
        pi += 1;

        if p == MATCH_ALL && !prev_escape && Some(p) != esc {
            while pi < pattern.len() && (pattern[pi] == MATCH_ALL || pattern[pi] == MATCH_ONE) {
                if pattern[pi] == MATCH_ONE {
                    if si >= s.len() {
                        return Ok(false);
                    }
                    si += 1;
                }
                pi += 1;
            }
            if pi >= pattern.len() {
                return Ok(true);
            }
            while si < s.len() {
                if like_compare(&pattern[pi..], &s[si..], esc, depth + 1)? {
                    return Ok(true);
                }
                si += 1;
            }
            return Ok(false);
        } else if p == MATCH_ONE && !prev_escape && Some(p) != esc {
            if si >= s.len() {
                return Ok(false);
            }
            si += 1;
        } else if Some(p) == esc && !prev_escape {
            prev_escape = true;
        } else {
            if si >= s.len() {
                return Ok(false);
            }
            let sc = s[si];
            si += 1;
            if fold(sc as u32, DiacriticMode::Simple) != fold(p as u32, DiacriticMode::Simple) {
                return Ok(false);
            }
            prev_escape = false;
        }
    }

    Ok(si == s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collate_sorts_digits_after_letters() {
        assert_eq!(daap_collate("1984", "Abbey Road"), Ordering::Greater);
        assert_eq!(daap_collate("Abbey Road", "1984"), Ordering::Less);
    }

    #[test]
    fn collate_is_case_insensitive_modulo_accents() {
        // NFD-normalized comparison is case-insensitive but does not strip
        // diacritics: both sides must carry the same combining marks.
        assert_eq!(daap_collate("café", "CAFÉ"), Ordering::Equal);
        assert_eq!(daap_collate("abbey road", "Abbey Road"), Ordering::Equal);
        assert_ne!(daap_collate("cafe", "café"), Ordering::Equal);
    }

    #[test]
    fn no_zero_falls_back() {
        assert_eq!(daap_no_zero(0, 42), 42);
        assert_eq!(daap_no_zero(7, 42), 7);
    }

    #[test]
    fn like_basic_wildcards() {
        assert!(like_match("test%", "testing", None).unwrap());
        assert!(like_match("t_st", "test", None).unwrap());
        assert!(!like_match("t_st", "teast", None).unwrap());
    }

    #[test]
    fn like_is_diacritic_insensitive() {
        assert!(like_match("æ", "Æ", None).unwrap());
        assert!(like_match("o", "Ö", None).unwrap());
        assert!(like_match("é", "e", None).unwrap());
        assert!(!like_match("O", "Ø", None).unwrap());
        assert!(like_match("Ö", "o", None).unwrap());
    }

    #[test]
    fn like_escape_disables_wildcard() {
        assert!(!like_match("test\\%", "testx", Some('\\')).unwrap());
        assert!(like_match("test\\%", "test%", Some('\\')).unwrap());
    }

    #[test]
    fn like_rejects_oversized_pattern() {
        let pattern = "a".repeat(MAX_LIKE_PATTERN_LENGTH + 1);
        assert!(like_match(&pattern, "a", None).is_err());
    }
}
