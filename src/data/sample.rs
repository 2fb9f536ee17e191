//! Sample Code Module
//! Parses the composite `site_coordinate_depth` sample identifier.

use std::cmp::Ordering;

/// Separator between the parts of a sample code.
pub const CODE_SEPARATOR: char = '_';

/// Sampling metadata encoded in a sample code such as `A_12_0-10`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleCode {
    pub site: Option<String>,
    pub coordinate: Option<String>,
    pub depth: Option<String>,
}

impl SampleCode {
    /// Split a code positionally. Missing or empty parts become `None`,
    /// anything after the third part is ignored.
    pub fn parse(code: &str) -> Self {
        let mut parts = code.split(CODE_SEPARATOR).map(|p| {
            let p = p.trim();
            (!p.is_empty()).then(|| p.to_string())
        });

        Self {
            site: parts.next().flatten(),
            coordinate: parts.next().flatten(),
            depth: parts.next().flatten(),
        }
    }
}

/// Compare two strings so that embedded digit runs order numerically:
/// `"2" < "10"` and `"5-10" < "10-20"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let na = take_digits(&mut a_chars);
                let nb = take_digits(&mut b_chars);
                let ord = compare_digit_runs(&na, &nb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                let ord = ca.cmp(&cb);
                if ord != Ordering::Equal {
                    return ord;
                }
                a_chars.next();
                b_chars.next();
            }
        }
    }
}

/// `natural_cmp` over optional values; `None` sorts after every value.
pub fn natural_cmp_opt(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => natural_cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

// Digit runs can exceed u64, so compare by trimmed length then lexically.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_parts() {
        let code = SampleCode::parse("A_12_0-10");
        assert_eq!(code.site.as_deref(), Some("A"));
        assert_eq!(code.coordinate.as_deref(), Some("12"));
        assert_eq!(code.depth.as_deref(), Some("0-10"));
    }

    #[test]
    fn short_code_leaves_missing_parts_empty() {
        let code = SampleCode::parse("B_3");
        assert_eq!(code.site.as_deref(), Some("B"));
        assert_eq!(code.coordinate.as_deref(), Some("3"));
        assert_eq!(code.depth, None);

        assert_eq!(SampleCode::parse(""), SampleCode::default());
    }

    #[test]
    fn extra_parts_are_ignored() {
        let code = SampleCode::parse("C_1_5-10_dup");
        assert_eq!(code.depth.as_deref(), Some("5-10"));
    }

    #[test]
    fn empty_parts_become_none() {
        let code = SampleCode::parse("D__20");
        assert_eq!(code.site.as_deref(), Some("D"));
        assert_eq!(code.coordinate, None);
        assert_eq!(code.depth.as_deref(), Some("20"));
    }

    #[test]
    fn natural_order_compares_numbers_by_value() {
        assert_eq!(natural_cmp("2", "10"), Ordering::Less);
        assert_eq!(natural_cmp("5-10", "10-20"), Ordering::Less);
        assert_eq!(natural_cmp("0-5", "0-15"), Ordering::Less);
        assert_eq!(natural_cmp("A", "B"), Ordering::Less);
        assert_eq!(natural_cmp("site10", "site9"), Ordering::Greater);
        assert_eq!(natural_cmp("x", "x"), Ordering::Equal);
    }

    #[test]
    fn natural_order_puts_none_last() {
        assert_eq!(natural_cmp_opt(Some("a"), None), Ordering::Less);
        assert_eq!(natural_cmp_opt(None, Some("a")), Ordering::Greater);
        assert_eq!(natural_cmp_opt(None, None), Ordering::Equal);
    }

    #[test]
    fn natural_sort_of_depth_intervals() {
        let mut depths = vec!["10-20", "0-5", "5-10", "20-30"];
        depths.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(depths, vec!["0-5", "5-10", "10-20", "20-30"]);
    }
}
