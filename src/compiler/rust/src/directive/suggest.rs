/* src/compiler/rust/src/directive/suggest.rs */

pub fn levenshtein(a: &str, b: &str) -> usize {
  let b: Vec<char> = b.chars().collect();
  let n = b.len();
  let mut prev: Vec<usize> = (0..=n).collect();
  let mut curr = vec![0; n + 1];
  for (i, ca) in a.chars().enumerate() {
    curr[0] = i + 1;
    for (j, cb) in b.iter().enumerate() {
      let cost = if ca == *cb { 0 } else { 1 };
      curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
    }
    std::mem::swap(&mut prev, &mut curr);
  }
  prev[n]
}

/// Closest candidate within edit distance 3. On equal distance a name from
/// `preferred` wins over one from `candidates`.
pub fn did_you_mean<'a>(
  name: &str,
  candidates: &[&'a str],
  preferred: &[&'a str],
) -> Option<&'a str> {
  preferred
    .iter()
    .chain(candidates.iter())
    .map(|c| (*c, levenshtein(name, c)))
    .filter(|(_, d)| *d <= 3 && *d > 0)
    .min_by_key(|(_, d)| *d)
    .map(|(c, _)| c)
}
