//! "Did you mean" lookups for tool names and argument fields.
//!
//! Names are compared after folding case and dropping separators, so
//! `checkConnection`, `check-connection` and `check_connection` are the
//! same token.

fn fold(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn edit_distance(a: &[u8], b: &[u8]) -> usize {
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
            let substitution = diagonal + usize::from(ca != cb);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Distance between folded names; containment counts as one edit.
fn distance(input: &str, candidate: &str) -> Option<usize> {
    if input.is_empty() || candidate.is_empty() {
        return None;
    }
    if input == candidate {
        return Some(0);
    }
    if input.contains(candidate) || candidate.contains(input) {
        return Some(1);
    }
    Some(edit_distance(input.as_bytes(), candidate.as_bytes()))
}

fn tolerance(folded_len: usize) -> usize {
    match folded_len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        n => (n * 35 / 100).max(3),
    }
}

/// Up to `limit` candidates close to `input`, best first. Ties go to the
/// shorter name, then alphabetical order.
pub fn suggest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let folded = fold(input);
    if folded.is_empty() {
        return Vec::new();
    }
    let allowed = tolerance(folded.len());

    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .filter_map(|candidate| {
            distance(&folded, &fold(candidate))
                .filter(|d| *d <= allowed)
                .map(|d| (d, candidate))
        })
        .collect();
    scored.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(b.1))
    });

    let mut out: Vec<String> = Vec::new();
    for (_, candidate) in scored {
        if out.iter().any(|existing| existing == candidate) {
            continue;
        }
        out.push(candidate.clone());
        if out.len() >= limit.max(1) {
            break;
        }
    }
    out
}
