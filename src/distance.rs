//! Levenshtein edit distance.
//!
//! Used by the candidate search to score both assembly names and type names
//! against a vanished type descriptor.

/// Returns the Levenshtein distance between `a` and `b`.
///
/// Insertions, deletions and substitutions each cost one. Operates on Unicode
/// scalar values, so `distance("é", "e")` is 1. Keeps a single rolling row of
/// the dynamic-programming table.
pub fn distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = usize::from(ca != cb);
            row[j + 1] = (above + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }

    row[b.len()]
}
