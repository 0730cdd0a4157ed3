//! Version string comparison.

use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;

use crate::relation::Relation;

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(r"^(?:(\d+):)?([^-]+)(?:-(.+))?$").unwrap();
}

/// Splits a full version string into (epoch, version, release).
fn explode(v: &str) -> (Option<&str>, &str, Option<&str>) {
    match VERSION_RE.captures(v) {
        Some(caps) => {
            let epoch = caps.get(1).map(|m| m.as_str());
            let version = caps.get(2).map(|m| m.as_str()).unwrap_or(v);
            let release = caps.get(3).map(|m| m.as_str());
            (epoch, version, release)
        }
        None => (None, v, None),
    }
}

/// Compares two version strings of the form `[epoch:]version[-release]`.
///
/// Epochs are compared numerically and a present epoch always wins over
/// an absent one. The release part only participates when both sides
/// carry one, so `1.0` and `1.0-3` compare equal.
///
/// # Arguments
///
/// * `a` - Left version string
/// * `b` - Right version string
///
/// # Returns
///
/// The ordering of `a` relative to `b`
pub fn compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let (epoch_a, ver_a, rel_a) = explode(a);
    let (epoch_b, ver_b, rel_b) = explode(b);

    match (epoch_a, epoch_b) {
        (Some(ea), Some(eb)) => {
            let na: u64 = ea.parse().unwrap_or(0);
            let nb: u64 = eb.parse().unwrap_or(0);
            match na.cmp(&nb) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        (Some(_), None) => return Ordering::Greater,
        (None, Some(_)) => return Ordering::Less,
        (None, None) => {}
    }

    match compare_part(ver_a, ver_b) {
        Ordering::Equal => {}
        other => return other,
    }

    match (rel_a, rel_b) {
        (Some(ra), Some(rb)) => compare_part(ra, rb),
        _ => Ordering::Equal,
    }
}

/// Compares one version segment by walking alternating digit and alpha
/// runs. Digit runs compare numerically with leading zeros stripped,
/// alpha runs lexically, and a digit run sorts after an alpha run.
fn compare_part(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let ab = a.as_bytes();
    let bb = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    loop {
        while i < ab.len() && !ab[i].is_ascii_alphanumeric() {
            i += 1;
        }
        while j < bb.len() && !bb[j].is_ascii_alphanumeric() {
            j += 1;
        }
        if i >= ab.len() || j >= bb.len() {
            break;
        }

        let start_i = i;
        let start_j = j;
        let numeric = ab[i].is_ascii_digit();

        if numeric {
            while i < ab.len() && ab[i].is_ascii_digit() {
                i += 1;
            }
            while j < bb.len() && bb[j].is_ascii_digit() {
                j += 1;
            }
        } else {
            while i < ab.len() && ab[i].is_ascii_alphabetic() {
                i += 1;
            }
            while j < bb.len() && bb[j].is_ascii_alphabetic() {
                j += 1;
            }
        }

        // The other side produced an empty run, so the runs are of
        // different types. A numeric run sorts after an alpha run.
        if start_j == j {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let mut run_a = &a[start_i..i];
        let mut run_b = &b[start_j..j];

        if numeric {
            run_a = run_a.trim_start_matches('0');
            run_b = run_b.trim_start_matches('0');
            match run_a.len().cmp(&run_b.len()) {
                Ordering::Equal => {}
                other => return other,
            }
        }

        match run_a.cmp(run_b) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    if i >= ab.len() && j >= bb.len() {
        Ordering::Equal
    } else if i >= ab.len() {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Checks whether a candidate version satisfies a relation against a
/// target version, e.g. `satisfies("1.2", Relation::GreaterEqual, "1.0")`.
pub fn satisfies(candidate: &str, relation: Relation, target: &str) -> bool {
    match compare(candidate, target) {
        Ordering::Less => relation.allows_less(),
        Ordering::Equal => relation.allows_equal(),
        Ordering::Greater => relation.allows_greater(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_strings() {
        assert_eq!(compare("1.0", "1.0"), Ordering::Equal);
        assert_eq!(compare("2:1.0-3", "2:1.0-3"), Ordering::Equal);
    }

    #[test]
    fn test_basic_ordering() {
        assert_eq!(compare("2.0.0", "1.0.0"), Ordering::Greater);
        assert_eq!(compare("1.0.0", "2.0.0"), Ordering::Less);
        assert_eq!(compare("1.0.1", "1.0.0"), Ordering::Greater);
    }

    #[test]
    fn test_numeric_runs_compare_numerically() {
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("1.2", "1.10"), Ordering::Less);
    }

    #[test]
    fn test_leading_zeros_ignored() {
        assert_eq!(compare("1.01", "1.1"), Ordering::Equal);
        assert_eq!(compare("1.010", "1.10"), Ordering::Equal);
        assert_eq!(compare("1.02", "1.1"), Ordering::Greater);
    }

    #[test]
    fn test_epoch_dominates() {
        assert_eq!(compare("1:1.0", "2.0"), Ordering::Greater);
        assert_eq!(compare("1.0", "1:0.1"), Ordering::Less);
        assert_eq!(compare("2:0.1", "1:9.9"), Ordering::Greater);
    }

    #[test]
    fn test_epoch_compares_numerically() {
        assert_eq!(compare("10:1.0", "9:1.0"), Ordering::Greater);
    }

    #[test]
    fn test_release_ignored_when_one_side_lacks_it() {
        assert_eq!(compare("1.0", "1.0-3"), Ordering::Equal);
        assert_eq!(compare("1.0-3", "1.0"), Ordering::Equal);
        assert_eq!(compare("1.0-4", "1.0-3"), Ordering::Greater);
    }

    #[test]
    fn test_digit_beats_alpha() {
        assert_eq!(compare("1.0a", "1.0.1"), Ordering::Less);
        assert_eq!(compare("2a", "2.1"), Ordering::Less);
    }

    #[test]
    fn test_alpha_runs_compare_lexically() {
        assert_eq!(compare("1.0b", "1.0a"), Ordering::Greater);
        assert_eq!(compare("1.0rc1", "1.0rc2"), Ordering::Less);
    }

    #[test]
    fn test_separators_do_not_matter() {
        assert_eq!(compare("1.0.1", "1_0_1"), Ordering::Equal);
        assert_eq!(compare("1..0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_longer_version_wins_on_common_prefix() {
        assert_eq!(compare("1.0.1", "1.0"), Ordering::Greater);
        assert_eq!(compare("1.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_satisfies() {
        assert!(satisfies("1.2", Relation::GreaterEqual, "1.0"));
        assert!(satisfies("1.0", Relation::GreaterEqual, "1.0"));
        assert!(!satisfies("0.9", Relation::GreaterEqual, "1.0"));
        assert!(satisfies("0.9", Relation::Less, "1.0"));
        assert!(!satisfies("1.0", Relation::Less, "1.0"));
        assert!(satisfies("1.0-1", Relation::Equal, "1.0"));
        assert!(satisfies("2.0", Relation::Greater, "1.0"));
        assert!(!satisfies("2.0", Relation::LessEqual, "1.0"));
    }
}
