//! Numeric value wrapper used by Slurm's JSON output.
//!
//! Recent Slurm versions wrap numbers as `{"set": true, "infinite": false,
//! "number": N}`; older ones emit a bare integer. Both decode to
//! [`NumberValue`].

use serde::{Deserialize, Deserializer};

/// Slurm numeric value.
///
/// - `NotSet`: the value was not set in Slurm (set=false)
/// - `Infinite`: the value represents infinity (set=true, infinite=true)
/// - `Value(i64)`: a concrete number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumberValue {
    #[default]
    NotSet,
    Infinite,
    Value(i64),
}

impl NumberValue {
    /// Returns the numeric value if set and not infinite.
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        match self {
            NumberValue::Value(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the numeric value, or 0 if not set or infinite.
    #[must_use]
    pub fn number(&self) -> i64 {
        self.value().unwrap_or(0)
    }

    #[must_use]
    pub fn is_infinite(&self) -> bool {
        matches!(self, NumberValue::Infinite)
    }
}

impl From<i64> for NumberValue {
    fn from(n: i64) -> Self {
        NumberValue::Value(n)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberValueRaw {
    Bare(i64),
    Wrapped {
        #[serde(default)]
        set: Option<bool>,
        #[serde(default)]
        infinite: bool,
        #[serde(default)]
        number: i64,
    },
}

impl<'de> Deserialize<'de> for NumberValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match NumberValueRaw::deserialize(deserializer)? {
            NumberValueRaw::Bare(n) => NumberValue::Value(n),
            NumberValueRaw::Wrapped { set: Some(false), .. } => NumberValue::NotSet,
            NumberValueRaw::Wrapped { infinite: true, .. } => NumberValue::Infinite,
            NumberValueRaw::Wrapped { number, .. } => NumberValue::Value(number),
        })
    }
}
