//! Text similarity used for subject fallback and response ranking.
//!
//! [`ratio`] is the Ratcliff/Obershelp measure: find the longest common block, recurse on both
//! sides of it, and report `2 * matched / (len(a) + len(b))`. Comparison is on lower-cased chars.
//!
//! [`score`] compares a label against the whole text and against every run of consecutive words
//! of the same length as the label, keeping the best. A short label like "Atraso" then scores well
//! against a long conversation that contains "atrasado".

/// Similarity in `[0, 1]`. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(a, b) as f64 / total as f64
}

/// Best of [`ratio`] over the whole text and over each word window sized like `label`.
pub fn score(text: &str, label: &str) -> f64 {
    let whole = ratio(text, label);
    let label_words = words(label);
    if label_words.is_empty() {
        return whole;
    }
    let label_chars: Vec<char> = label_words.join(" ").chars().collect();
    let text_words = words(text);
    text_words
        .windows(label_words.len())
        .map(|w| {
            let window: Vec<char> = w.join(" ").chars().collect();
            ratio_chars(&window, &label_chars)
        })
        .fold(whole, f64::max)
}

/// Lower-cased words with surrounding punctuation stripped; empty tokens dropped.
fn words(s: &str) -> Vec<String> {
    s.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Total size of the matching blocks between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(start_a, start_b, len)`.
/// Among equally long blocks the one starting earliest in `a`, then in `b`, wins.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    let width = bhi.saturating_sub(blo);
    // prev[c] = length of the common run ending at (i - 1, blo + c - 1)
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let k = prev[col - 1] + 1;
                cur[col] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            } else {
                cur[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    (best_i, best_j, best_k)
}
