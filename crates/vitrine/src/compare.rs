//! Natural ordering for displayed labels.
//!
//! Approximates an English, numeric-aware collation in three levels. The
//! primary level ignores accents and case: whitespace sorts before
//! punctuation, punctuation before numbers, numbers before letters, and runs
//! of digits compare by numeric value. Accents break primary ties, then case
//! (lower case first).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// One primary collation element
#[derive(Debug, Clone, PartialEq, Eq)]
enum Key {
    Space,
    Punct(char),
    /// Digit run without leading zeros
    Number(String),
    Letter(char),
}

impl Key {
    const fn rank(&self) -> u8 {
        match self {
            Self::Space => 0,
            Self::Punct(_) => 1,
            Self::Number(_) => 2,
            Self::Letter(_) => 3,
        }
    }
}

fn flush_digits(digits: &mut String, out: &mut Vec<Key>) {
    if !digits.is_empty() {
        out.push(Key::Number(digits.trim_start_matches('0').to_string()));
        digits.clear();
    }
}

fn keys(s: &str) -> Vec<Key> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in s.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        flush_digits(&mut digits, &mut out);
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase().map(Key::Letter));
        } else if c.is_whitespace() {
            out.push(Key::Space);
        } else {
            out.push(Key::Punct(c));
        }
    }
    flush_digits(&mut digits, &mut out);
    out
}

fn compare_key(a: &Key, b: &Key) -> Ordering {
    match (a, b) {
        (Key::Number(x), Key::Number(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Key::Letter(x), Key::Letter(y)) | (Key::Punct(x), Key::Punct(y)) => x.cmp(y),
        _ => a.rank().cmp(&b.rank()),
    }
}

fn compare_primary(a: &str, b: &str) -> Ordering {
    let left = keys(a);
    let right = keys(b);
    for (x, y) in left.iter().zip(&right) {
        let ord = compare_key(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len())
}

fn compare_accents(a: &str, b: &str) -> Ordering {
    a.nfd()
        .filter(|c| is_combining_mark(*c))
        .cmp(b.nfd().filter(|c| is_combining_mark(*c)))
}

fn compare_case(a: &str, b: &str) -> Ordering {
    for (x, y) in a.chars().zip(b.chars()) {
        if x != y {
            return match (x.is_lowercase(), y.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => x.cmp(&y),
            };
        }
    }
    a.len().cmp(&b.len())
}

/// Compare two labels with numeric-aware, case-insensitive ordering.
///
/// `"Item 2"` sorts before `"Item 10"`, `"apple"` before `"Banana"`,
/// `"Éclair"` before `"Zebra"` and `"a-1"` before `"a1"`.
#[must_use]
pub fn compare_natural(a: &str, b: &str) -> Ordering {
    compare_primary(a, b)
        .then_with(|| compare_accents(a, b))
        .then_with(|| compare_case(a, b))
}

/// Required order of a list of labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Each label strictly after the previous one
    Ascending,
    /// Each label strictly before the previous one
    Descending,
}

impl SortOrder {
    /// Whether `current` may follow `previous`
    #[must_use]
    pub fn admits(self, previous: &str, current: &str) -> bool {
        match self {
            Self::Ascending => compare_natural(current, previous) == Ordering::Greater,
            Self::Descending => compare_natural(current, previous) == Ordering::Less,
        }
    }

    /// First adjacent pair that breaks the order, if any
    #[must_use]
    pub fn first_violation<'a>(self, labels: &'a [String]) -> Option<OrderViolation<'a>> {
        labels.windows(2).enumerate().find_map(|(i, pair)| {
            if self.admits(&pair[0], &pair[1]) {
                None
            } else {
                Some(OrderViolation {
                    position: i + 1,
                    previous: &pair[0],
                    current: &pair[1],
                })
            }
        })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => f.write_str("ascending"),
            Self::Descending => f.write_str("descending"),
        }
    }
}

/// Adjacent labels out of order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderViolation<'a> {
    /// Position of `current` in the list
    pub position: usize,
    /// Label before the break
    pub previous: &'a str,
    /// Label that broke the order
    pub current: &'a str,
}
