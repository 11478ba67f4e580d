//! Normalized string similarity
//!
//! `ratio` is the InDel similarity on a 0-100 scale:
//! `200 * LCS(a, b) / (|a| + |b|)`, computed over chars.

/// Length of the longest common subsequence of two char slices
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    // Single rolling row
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Similarity of two strings, 0.0 (nothing shared) to 100.0 (identical)
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(&a, &b) as f64 / total as f64
}

/// Score `query` against every choice and keep the best `limit`
///
/// Sorted by descending score; ties keep the order of `choices`.
pub fn extract<'a, I>(query: &str, choices: I, limit: usize) -> Vec<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scored: Vec<(&'a str, f64)> = choices
        .into_iter()
        .map(|choice| (choice, ratio(query, choice)))
        .collect();
    scored.sort_by(|x, y| y.1.total_cmp(&x.1));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_disjoint() {
        assert_eq!(ratio("egg", "egg"), 100.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_typo_scores() {
        // eggz vs egg: LCS 3, lengths 4 + 3
        assert!((ratio("eggz", "egg") - 600.0 / 7.0).abs() < 1e-9);
        // eggz vs eggs: LCS 3, lengths 4 + 4
        assert!((ratio("eggz", "eggs") - 75.0).abs() < 1e-9);
        assert!(ratio("bananna", "banana") >= 80.0);
    }

    #[test]
    fn test_symmetric() {
        let pairs = [("chicken breast", "chiken brest"), ("oats", "oatmeal")];
        for (a, b) in pairs {
            assert_eq!(ratio(a, b), ratio(b, a));
        }
    }

    #[test]
    fn test_extract_orders_and_limits() {
        let choices = ["apple", "egg", "eggs", "egg whites", "banana", "eggplant"];
        let top = extract("eggz", choices.iter().copied(), 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].0, "egg");
        assert_eq!(top[1].0, "eggs");
        assert!(top[0].1 >= top[1].1 && top[1].1 >= top[2].1);
    }

    #[test]
    fn test_extract_stable_on_ties() {
        let top = extract("ab", ["ax", "bx", "ay"].iter().copied(), 3);
        // all score 50, original order kept
        assert_eq!(top.iter().map(|t| t.0).collect::<Vec<_>>(), vec!["ax", "bx", "ay"]);
    }
}
