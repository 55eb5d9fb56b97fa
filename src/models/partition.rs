//! Partition records built from `sinfo -s` summary lines.

use std::str::FromStr;

use crate::error::ParseWarning;
use crate::formatting::{cut_string, layout, round2};

/// Node counts from the `allocated/idle/other/total` column of `sinfo -s`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCounts {
    pub allocated: u64,
    pub idle: u64,
    pub other: u64,
    pub total: u64,
}

impl NodeCounts {
    /// Whether the three categories add up to the reported total
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.allocated
            .checked_add(self.idle)
            .and_then(|sum| sum.checked_add(self.other))
            == Some(self.total)
    }
}

impl FromStr for NodeCounts {
    type Err = String;

    /// Strict parser: exactly four unsigned decimal integers separated by `/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let [allocated, idle, other, total] = parts.as_slice() else {
            return Err(format!(
                "expected allocated/idle/other/total, got '{}' ({} fields)",
                s,
                parts.len()
            ));
        };

        let number = |field: &str| -> Result<u64, String> {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("'{}' is not a node count in '{}'", field, s));
            }
            field
                .parse()
                .map_err(|_| format!("'{}' is out of range in '{}'", field, s))
        };

        Ok(NodeCounts {
            allocated: number(allocated)?,
            idle: number(idle)?,
            other: number(other)?,
            total: number(total)?,
        })
    }
}

/// One partition as shown in the partition panel
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRecord {
    /// Display name, cut to [`layout::PARTITION_NAME_LEN`] characters
    pub name: String,
    pub allocated: u64,
    pub idle: u64,
    pub other: u64,
    pub total: u64,
    /// Busy share of the partition in percent, rounded to two decimals
    pub usage_ratio: f64,
}

impl PartitionRecord {
    /// Build a record and derive its usage ratio.
    ///
    /// # Errors
    /// `DivisionByZero` when the partition reports zero nodes.
    pub fn new(name: &str, counts: NodeCounts) -> Result<Self, ParseWarning> {
        if counts.total == 0 {
            return Err(ParseWarning::DivisionByZero {
                partition: name.to_string(),
            });
        }

        if !counts.is_consistent() {
            tracing::warn!(
                partition = name,
                allocated = counts.allocated,
                idle = counts.idle,
                other = counts.other,
                total = counts.total,
                "node counts do not add up to total"
            );
        }

        let busy = counts.allocated.saturating_add(counts.other) as f64;
        let usage_ratio = round2(busy / counts.total as f64 * 100.0);

        Ok(PartitionRecord {
            name: cut_string(name, layout::PARTITION_NAME_LEN),
            allocated: counts.allocated,
            idle: counts.idle,
            other: counts.other,
            total: counts.total,
            usage_ratio,
        })
    }

    /// True when the reported counts push usage past 100%
    #[must_use]
    pub fn is_overcommitted(&self) -> bool {
        self.usage_ratio > 100.0
    }

    /// Split a bar of `width` cells into allocated, idle and other segments.
    #[must_use]
    pub fn load_bar(&self, width: usize) -> LoadBar {
        let share = |count: u64| -> usize {
            ((count as f64 / self.total as f64) * width as f64).floor() as usize
        };
        let allocated = share(self.allocated).min(width);
        let idle = share(self.idle).min(width - allocated);
        LoadBar {
            allocated,
            idle,
            other: width - allocated - idle,
        }
    }
}

/// Cell counts of a partition load bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadBar {
    pub allocated: usize,
    pub idle: usize,
    pub other: usize,
}
