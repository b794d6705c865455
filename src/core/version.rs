// ─── Game Version Ordering ───
// Bedrock versions are dotted numbers ("1.21.50.7"); compare them numerically
// segment by segment so that "1.21.100" sorts after "1.21.99".

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which version a single-version command should process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Latest,
    Version(String),
}

impl FromStr for Target {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("latest") {
            Ok(Target::Latest)
        } else {
            Ok(Target::Version(s.to_string()))
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Latest => write!(f, "latest"),
            Target::Version(v) => write!(f, "{v}"),
        }
    }
}

/// Compare two version strings, numerically where both segments are numbers.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let mut lhs = left.split(['.', '-', '_']);
    let mut rhs = right.split(['.', '-', '_']);

    loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => return left.cmp(right),
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(a), Some(b)) => {
                let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Greater,
                    (Err(_), Ok(_)) => Ordering::Less,
                    (Err(_), Err(_)) => a.cmp(b),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Sort version strings oldest first.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(a, b));
}
