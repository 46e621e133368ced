//! Constant values and the loose integer matching used for value lookups.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of a class constant: an integer or a string.
///
/// Used both as the query side of value lookups and as the key of
/// value-keyed result maps, so it is `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstValue {
    Int(i64),
    Str(String),
}

impl ConstValue {
    /// Coerce to an integer the way a loose `(int)` cast does: an optional
    /// sign followed by leading digits, anything else (or nothing) is 0.
    /// `"5abc"` coerces to 5. Value lookups compare both sides through this
    /// coercion, so a string constant `"5"` matches a numeric query `5`;
    /// strict comparison stays available through plain `==`.
    pub fn to_int(&self) -> i64 {
        match self {
            ConstValue::Int(n) => *n,
            ConstValue::Str(s) => leading_int(s),
        }
    }

    /// Loose equality: both sides coerced to integer before comparison.
    pub fn loosely_eq(&self, other: &ConstValue) -> bool {
        self.to_int() == other.to_int()
    }
}

fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let mut value: i64 = 0;
    for c in rest.chars() {
        let Some(digit) = c.to_digit(10) else { break };
        value = value
            .saturating_mul(10)
            .saturating_add(i64::from(digit));
    }

    if negative { -value } else { value }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(n) => write!(f, "{}", n),
            ConstValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ConstValue {
    fn from(n: i64) -> Self {
        ConstValue::Int(n)
    }
}

impl From<&str> for ConstValue {
    fn from(s: &str) -> Self {
        ConstValue::Str(s.to_string())
    }
}

impl From<String> for ConstValue {
    fn from(s: String) -> Self {
        ConstValue::Str(s)
    }
}
