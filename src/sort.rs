//! Type-aware column sort over job records.
//!
//! Each column compares according to its [`ColumnKind`]: elapsed time as a
//! duration, ids/counts/priorities as integers, everything else as text.
//! Direction is remembered per column in a [`SortState`]: the first sort of a
//! column is ascending and every further sort of that same column flips it.
//!
//! Sorting never touches the published snapshot; it returns a reordered copy
//! together with the state to use next time.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::duration::parse_verbose_duration;
use crate::error::SortError;
use crate::models::{ColumnKind, JobColumn, JobRecord};

/// Direction a column was (or will be) sorted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Header marker for the column
    #[must_use]
    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// Per-view sort state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    /// Column of the most recent successful sort
    pub active_column: Option<JobColumn>,
    /// `true` = the next sort of this column is descending
    pub toggle: HashMap<JobColumn, bool>,
}

impl SortState {
    /// Direction the next sort of `column` will use
    #[must_use]
    pub fn next_direction(&self, column: JobColumn) -> SortDirection {
        match self.toggle.get(&column) {
            Some(true) => SortDirection::Descending,
            _ => SortDirection::Ascending,
        }
    }

    /// Active column and the direction it is currently displayed in
    #[must_use]
    pub fn current(&self) -> Option<(JobColumn, SortDirection)> {
        let column = self.active_column?;
        let direction = match self.toggle.get(&column) {
            Some(false) => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        Some((column, direction))
    }
}

/// Sort key of one cell, computed once per record before ordering
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey<'a> {
    Seconds(u64),
    Integer(i64),
    Text(&'a str),
}

fn sort_key(record: &JobRecord, column: JobColumn) -> Result<SortKey<'_>, SortError> {
    let value = record.field(column);
    match column.kind() {
        ColumnKind::Duration => parse_verbose_duration(value)
            .map(SortKey::Seconds)
            .map_err(|source| SortError::InvalidDuration {
                column: column.as_str(),
                source,
            }),
        ColumnKind::Integer => value
            .trim()
            .parse::<i64>()
            .map(SortKey::Integer)
            .map_err(|_| SortError::InvalidInteger {
                column: column.as_str(),
                value: value.to_string(),
            }),
        ColumnKind::Text => Ok(SortKey::Text(value)),
    }
}

/// Sort engine owning the sort state of one view
#[derive(Debug, Clone, Default)]
pub struct SortEngine {
    state: SortState,
}

impl SortEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &SortState {
        &self.state
    }

    /// Sort `records` by `column` starting from `state`.
    ///
    /// Returns the reordered records and the updated state. Ties keep their
    /// input order in both directions. On error nothing is returned and the
    /// caller's state stays as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// use slurmtop::models::{JobColumn, JobRecord};
    /// use slurmtop::sort::{SortEngine, SortState};
    ///
    /// let jobs: Vec<JobRecord> = ["3", "1", "2"]
    ///     .iter()
    ///     .map(|id| JobRecord { job_id: id.to_string(), ..Default::default() })
    ///     .collect();
    ///
    /// let (asc, state) = SortEngine::sort(&jobs, JobColumn::JobId, &SortState::default()).unwrap();
    /// let ids: Vec<&str> = asc.iter().map(|j| j.job_id.as_str()).collect();
    /// assert_eq!(ids, ["1", "2", "3"]);
    ///
    /// let (desc, _) = SortEngine::sort(&asc, JobColumn::JobId, &state).unwrap();
    /// let ids: Vec<&str> = desc.iter().map(|j| j.job_id.as_str()).collect();
    /// assert_eq!(ids, ["3", "2", "1"]);
    /// ```
    ///
    /// # Errors
    /// `InvalidDuration` or `InvalidInteger` when a cell in the column does
    /// not parse as the column's kind.
    pub fn sort(
        records: &[JobRecord],
        column: JobColumn,
        state: &SortState,
    ) -> Result<(Vec<JobRecord>, SortState), SortError> {
        let keys = records
            .iter()
            .map(|record| sort_key(record, column))
            .collect::<Result<Vec<_>, _>>()?;

        let direction = state.next_direction(column);
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| {
            let ordering: Ordering = keys[a].cmp(&keys[b]);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        let mut next = state.clone();
        next.active_column = Some(column);
        next.toggle
            .insert(column, direction == SortDirection::Ascending);

        let sorted = order.into_iter().map(|i| records[i].clone()).collect();
        Ok((sorted, next))
    }

    /// Sort with the engine's own state, committing it only on success
    pub fn sort_in_session(
        &mut self,
        records: &[JobRecord],
        column: JobColumn,
    ) -> Result<Vec<JobRecord>, SortError> {
        let (sorted, state) = Self::sort(records, column, &self.state)?;
        self.state = state;
        Ok(sorted)
    }

    /// Like [`sort_in_session`](Self::sort_in_session) with a column identifier
    /// such as `"priority_number"` or a header label such as `"PRIORITY"`.
    pub fn sort_by_name(
        &mut self,
        records: &[JobRecord],
        column: &str,
    ) -> Result<Vec<JobRecord>, SortError> {
        let column = column
            .parse::<JobColumn>()
            .map_err(SortError::UnknownColumn)?;
        self.sort_in_session(records, column)
    }

    /// Re-apply the active column in its current direction, e.g. after a new
    /// snapshot arrived. Returns the records unchanged when nothing is active.
    pub fn reapply(&self, records: &[JobRecord]) -> Result<Vec<JobRecord>, SortError> {
        let Some((column, direction)) = self.state.current() else {
            return Ok(records.to_vec());
        };
        let mut replay = self.state.clone();
        replay
            .toggle
            .insert(column, direction == SortDirection::Descending);
        Self::sort(records, column, &replay).map(|(sorted, _)| sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DurationError;

    fn job(id: &str, name: &str, elapsed: &str, priority: &str) -> JobRecord {
        JobRecord {
            job_id: id.to_string(),
            name: name.to_string(),
            elapsed: elapsed.to_string(),
            priority: priority.to_string(),
            node_count: "1".to_string(),
            ..Default::default()
        }
    }

    fn ids(records: &[JobRecord]) -> Vec<&str> {
        records.iter().map(|r| r.job_id.as_str()).collect()
    }

    #[test]
    fn test_numeric_id_toggles() {
        let jobs = vec![job("3", "c", "", "0"), job("1", "a", "", "0"), job("2", "b", "", "0")];
        let mut engine = SortEngine::new();

        let sorted = engine.sort_in_session(&jobs, JobColumn::JobId).unwrap();
        assert_eq!(ids(&sorted), ["1", "2", "3"]);

        let sorted = engine.sort_in_session(&sorted, JobColumn::JobId).unwrap();
        assert_eq!(ids(&sorted), ["3", "2", "1"]);

        let sorted = engine.sort_in_session(&sorted, JobColumn::JobId).unwrap();
        assert_eq!(ids(&sorted), ["1", "2", "3"]);
    }

    #[test]
    fn test_integer_not_lexicographic() {
        let jobs = vec![job("10", "", "", "0"), job("9", "", "", "0"), job("100", "", "", "0")];
        let (sorted, _) = SortEngine::sort(&jobs, JobColumn::JobId, &SortState::default()).unwrap();
        assert_eq!(ids(&sorted), ["9", "10", "100"]);
    }

    #[test]
    fn test_duration_column_compares_seconds() {
        let jobs = vec![
            job("1", "", "1 day, 0:00:00", "0"),
            job("2", "", "9:59:59", "0"),
            job("3", "", "", "0"),
            job("4", "", "10:00:00", "0"),
        ];
        let (sorted, _) = SortEngine::sort(&jobs, JobColumn::Elapsed, &SortState::default()).unwrap();
        assert_eq!(ids(&sorted), ["3", "2", "4", "1"]);
    }

    #[test]
    fn test_stable_in_both_directions() {
        let jobs = vec![
            job("1", "x", "", "5"),
            job("2", "y", "", "7"),
            job("3", "z", "", "5"),
            job("4", "w", "", "7"),
        ];
        let (asc, state) = SortEngine::sort(&jobs, JobColumn::Priority, &SortState::default()).unwrap();
        assert_eq!(ids(&asc), ["1", "3", "2", "4"]);

        let (desc, _) = SortEngine::sort(&jobs, JobColumn::Priority, &state).unwrap();
        assert_eq!(ids(&desc), ["2", "4", "1", "3"]);
    }

    #[test]
    fn test_text_is_case_sensitive() {
        let jobs = vec![job("1", "beta", "", "0"), job("2", "Zeta", "", "0"), job("3", "alpha", "", "0")];
        let (sorted, _) = SortEngine::sort(&jobs, JobColumn::Name, &SortState::default()).unwrap();
        assert_eq!(ids(&sorted), ["2", "3", "1"]);
    }

    #[test]
    fn test_toggles_are_independent_per_column() {
        let jobs = vec![job("2", "b", "", "1"), job("1", "a", "", "2")];
        let mut engine = SortEngine::new();

        engine.sort_in_session(&jobs, JobColumn::JobId).unwrap();
        engine.sort_in_session(&jobs, JobColumn::Name).unwrap();
        engine.sort_in_session(&jobs, JobColumn::Name).unwrap();

        let state = engine.state();
        assert_eq!(state.active_column, Some(JobColumn::Name));
        assert_eq!(state.toggle.get(&JobColumn::JobId), Some(&true));
        assert_eq!(state.toggle.get(&JobColumn::Name), Some(&false));
        assert_eq!(state.toggle.get(&JobColumn::Priority), None);

        // JobId picks up where it left off: descending
        let sorted = engine.sort_in_session(&jobs, JobColumn::JobId).unwrap();
        assert_eq!(ids(&sorted), ["2", "1"]);
        assert_eq!(
            engine.state().current(),
            Some((JobColumn::JobId, SortDirection::Descending))
        );
    }

    #[test]
    fn test_unknown_column_leaves_state() {
        let jobs = vec![job("1", "a", "", "0")];
        let mut engine = SortEngine::new();
        engine.sort_in_session(&jobs, JobColumn::Name).unwrap();
        let before = engine.state().clone();

        let err = engine.sort_by_name(&jobs, "walltime").unwrap_err();
        assert_eq!(err, SortError::UnknownColumn("walltime".to_string()));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_sort_by_name() {
        let jobs = vec![job("1", "", "", "3"), job("2", "", "", "9")];
        let mut engine = SortEngine::new();
        let sorted = engine.sort_by_name(&jobs, "priority_number").unwrap();
        assert_eq!(ids(&sorted), ["1", "2"]);
        let sorted = engine.sort_by_name(&jobs, "PRIORITY").unwrap();
        assert_eq!(ids(&sorted), ["2", "1"]);
    }

    #[test]
    fn test_invalid_duration_leaves_state() {
        let jobs = vec![job("1", "", "1:00:00", "0"), job("2", "", "1-00:00:00", "0")];
        let mut engine = SortEngine::new();
        let err = engine.sort_in_session(&jobs, JobColumn::Elapsed).unwrap_err();
        assert_eq!(
            err,
            SortError::InvalidDuration {
                column: "time_elapse",
                source: DurationError::InvalidDurationFormat("1-00:00:00".to_string()),
            }
        );
        assert_eq!(engine.state(), &SortState::default());
    }

    #[test]
    fn test_invalid_integer_leaves_state() {
        let jobs = vec![job("1", "", "", "0"), job("123_4", "", "", "0")];
        let state = SortState::default();
        let err = SortEngine::sort(&jobs, JobColumn::JobId, &state).unwrap_err();
        assert!(matches!(err, SortError::InvalidInteger { column: "job_id", .. }));
    }

    #[test]
    fn test_reapply_keeps_direction() {
        let jobs = vec![job("1", "", "", "0"), job("3", "", "", "0"), job("2", "", "", "0")];
        let mut engine = SortEngine::new();
        assert_eq!(ids(&engine.reapply(&jobs).unwrap()), ["1", "3", "2"]);

        engine.sort_in_session(&jobs, JobColumn::JobId).unwrap();
        engine.sort_in_session(&jobs, JobColumn::JobId).unwrap();
        let before = engine.state().clone();

        let refreshed = vec![job("4", "", "", "0"), job("1", "", "", "0"), job("5", "", "", "0")];
        assert_eq!(ids(&engine.reapply(&refreshed).unwrap()), ["5", "4", "1"]);
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn test_empty_records() {
        let (sorted, state) = SortEngine::sort(&[], JobColumn::Elapsed, &SortState::default()).unwrap();
        assert!(sorted.is_empty());
        assert_eq!(state.active_column, Some(JobColumn::Elapsed));
    }
}
