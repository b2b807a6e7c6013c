//! Numeric-aware ordering of file names (`run_2` before `run_10`).

use std::cmp::Ordering;

#[derive(Debug)]
enum Chunk {
    Text(String),
    Number(String),
}

impl Ord for Chunk {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                let a = a.trim_start_matches('0');
                let b = b.trim_start_matches('0');
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
        }
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Chunk {}

impl PartialOrd for Chunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Alternating text and digit runs; text is lowercased. Always starts with
/// a (possibly empty) text run so positions line up between keys.
fn sort_key(name: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;
    for ch in name.chars() {
        let is_digit = ch.is_ascii_digit();
        if is_digit != in_digits {
            chunks.push(finish(std::mem::take(&mut current), in_digits));
            in_digits = is_digit;
        }
        current.push(ch);
    }
    chunks.push(finish(current, in_digits));
    chunks
}

fn finish(run: String, digits: bool) -> Chunk {
    if digits {
        Chunk::Number(run)
    } else {
        Chunk::Text(run.to_lowercase())
    }
}

/// Compare two names with digit runs taken as numbers.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}

/// Sort `names` in place with [`natural_cmp`].
pub fn natural_sort<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_runs() {
        let mut names = vec!["s2p_2.s2p", "s2p_10.s2p", "s2p_1.s2p"];
        natural_sort(&mut names);
        assert_eq!(names, vec!["s2p_1.s2p", "s2p_2.s2p", "s2p_10.s2p"]);
    }

    #[test]
    fn test_case_insensitive_text() {
        let mut names = vec!["Vd_B.s2p", "vd_a.s2p", "VD_C.s2p"];
        natural_sort(&mut names);
        assert_eq!(names, vec!["vd_a.s2p", "Vd_B.s2p", "VD_C.s2p"]);
    }

    #[test]
    fn test_leading_zeros_and_bias_points() {
        let mut names = vec!["Id_20mA.s2p", "Id_005mA.s2p", "Id_8mA.s2p", "Id_10mA.s2p"];
        natural_sort(&mut names);
        assert_eq!(
            names,
            vec!["Id_005mA.s2p", "Id_8mA.s2p", "Id_10mA.s2p", "Id_20mA.s2p"]
        );
    }

    #[test]
    fn test_leading_digit_names() {
        assert_eq!(natural_cmp("9.s2p", "10.s2p"), Ordering::Less);
        assert_eq!(natural_cmp("a.s2p", "a.s2p"), Ordering::Equal);
    }
}
