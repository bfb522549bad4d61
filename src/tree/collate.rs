//! Russian-aware name collation
//!
//! Catalog names are predominantly Russian. Unicode already stores а..я in
//! alphabet order, but ё lives outside that block at U+0451 while the
//! alphabet places it between е and ж. Doubling every scalar value leaves
//! odd slots free, and ё takes the slot right after е. Comparison is
//! case-insensitive first, with the raw strings as a final tie-break so the
//! result is a total order.

use std::cmp::Ordering;

const YO: char = 'ё';
const YE: char = 'е';

/// Collation weight of one lowercased scalar
fn rank(c: char) -> u64 {
    if c == YO {
        2 * (YE as u64) + 1
    } else {
        2 * (c as u64)
    }
}

/// Compare two names with Russian alphabet ordering
///
/// Case differences only matter when the names are otherwise equal.
pub fn compare_ru(a: &str, b: &str) -> Ordering {
    let ranks_a = a.chars().flat_map(char::to_lowercase).map(rank);
    let ranks_b = b.chars().flat_map(char::to_lowercase).map(rank);
    ranks_a.cmp(ranks_b).then_with(|| a.cmp(b))
}
