//! TUI application state
//!
//! The app never talks to Slurm. The runtime hands it each new snapshot from
//! the refresh coordinator; the app keeps its own sorted view of the job
//! records and a per-view [`SortEngine`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyEvent, MouseEvent};

use crate::models::{HostInfo, JobColumn, JobRecord, PartitionRecord, Snapshot};
use crate::refresh::{Source, SourceHealth};
use crate::sort::SortEngine;
use crate::tui::event::{EventResult, InputEvent, KeyAction};
use crate::tui::theme::Theme;

/// How long a status message stays on screen
const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    shown_at: Instant,
}

/// Screen geometry recorded by the last render, used to map mouse clicks
#[derive(Debug, Clone, Default)]
pub struct JobTableLayout {
    /// Terminal row of the job table header
    pub header_row: u16,
    /// Horizontal extent `[start, end)` of each header cell
    pub column_spans: Vec<(JobColumn, u16, u16)>,
    /// First terminal row of the job rows
    pub body_top: u16,
    pub body_height: u16,
    pub scroll_offset: usize,
}

impl JobTableLayout {
    fn column_at(&self, row: u16, column: u16) -> Option<JobColumn> {
        if row != self.header_row {
            return None;
        }
        self.column_spans
            .iter()
            .find(|(_, start, end)| (*start..*end).contains(&column))
            .map(|(col, _, _)| *col)
    }

    fn index_at(&self, row: u16) -> Option<usize> {
        let offset = row.checked_sub(self.body_top)?;
        (offset < self.body_height).then(|| self.scroll_offset + offset as usize)
    }
}

pub struct App {
    pub info: Arc<HostInfo>,
    pub partitions: Arc<Snapshot<PartitionRecord>>,
    jobs: Arc<Snapshot<JobRecord>>,
    /// Job records in display order
    pub job_view: Vec<JobRecord>,
    pub sort: SortEngine,
    pub selected: usize,
    pub partitions_health: SourceHealth,
    pub jobs_health: SourceHealth,
    pub status: Option<StatusMessage>,
    pub theme: Theme,
    pub layout: JobTableLayout,
    /// Whether any job snapshot has arrived yet
    pub jobs_loaded: bool,
    /// Column applied once the first job snapshot arrives
    initial_sort: Option<String>,
    refresh_requested: bool,
}

impl App {
    pub fn new(theme: Theme, initial_sort: Option<String>) -> Self {
        Self {
            info: Arc::new(HostInfo::default()),
            partitions: Arc::new(Snapshot::empty()),
            jobs: Arc::new(Snapshot::empty()),
            job_view: Vec::new(),
            sort: SortEngine::new(),
            selected: 0,
            partitions_health: SourceHealth::default(),
            jobs_health: SourceHealth::default(),
            status: None,
            theme,
            layout: JobTableLayout::default(),
            jobs_loaded: false,
            initial_sort,
            refresh_requested: false,
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error,
            shown_at: Instant::now(),
        });
    }

    /// Drop an expired status message; returns true if one was removed
    pub fn expire_status(&mut self) -> bool {
        if self
            .status
            .as_ref()
            .is_some_and(|s| s.shown_at.elapsed() >= STATUS_TTL)
        {
            self.status = None;
            return true;
        }
        false
    }

    /// True once after the user asked for a refresh
    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    pub fn set_info(&mut self, info: Arc<HostInfo>) {
        self.info = info;
    }

    pub fn set_partitions(&mut self, snapshot: Arc<Snapshot<PartitionRecord>>) {
        self.partitions = snapshot;
    }

    /// Take a new job snapshot and rebuild the view in the current sort order
    pub fn set_jobs(&mut self, snapshot: Arc<Snapshot<JobRecord>>) {
        self.jobs = snapshot;
        self.jobs_loaded = true;

        if let Some(column) = self.initial_sort.take() {
            match self.sort.sort_by_name(&self.jobs.records, &column) {
                Ok(sorted) => self.job_view = sorted,
                Err(e) => {
                    self.job_view = self.jobs.records.clone();
                    self.set_status(format!("Default sort: {e}"), true);
                }
            }
        } else {
            match self.sort.reapply(&self.jobs.records) {
                Ok(sorted) => self.job_view = sorted,
                Err(e) => {
                    // The view is back in source order, so drop the header arrow too
                    self.job_view = self.jobs.records.clone();
                    self.sort = SortEngine::new();
                    self.set_status(format!("Sort cleared: {e}"), true);
                }
            }
        }

        self.selected = self.selected.min(self.job_view.len().saturating_sub(1));
    }

    pub fn set_health(&mut self, source: Source, health: SourceHealth) {
        match source {
            Source::Partitions => self.partitions_health = health,
            Source::Jobs => self.jobs_health = health,
            Source::Info => {}
        }
    }

    /// Sort the visible jobs by `column`; on error the view stays as it was
    pub fn sort_by(&mut self, column: JobColumn) {
        match self.sort.sort_in_session(&self.job_view, column) {
            Ok(sorted) => {
                self.job_view = sorted;
                self.selected = 0;
            }
            Err(e) => self.set_status(format!("Sort: {e}"), true),
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) -> EventResult {
        match event {
            InputEvent::Key(key) => self.handle_key(key),
            InputEvent::Mouse(mouse) => self.handle_mouse(mouse),
            InputEvent::Resize(..) => EventResult::Continue,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> EventResult {
        self.handle_action(KeyAction::from_key_event(key))
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> EventResult {
        self.handle_action(KeyAction::from_mouse_event(mouse))
    }

    fn handle_action(&mut self, action: KeyAction) -> EventResult {
        let page = (self.layout.body_height as usize).max(1);
        match action {
            KeyAction::Quit => return EventResult::Quit,
            KeyAction::MoveDown | KeyAction::MouseScrollDown => self.move_selection(1),
            KeyAction::MoveUp | KeyAction::MouseScrollUp => self.move_selection(-1),
            KeyAction::PageDown => self.move_selection(page as isize),
            KeyAction::PageUp => self.move_selection(-(page as isize)),
            KeyAction::MoveToTop => self.selected = 0,
            KeyAction::MoveToBottom => self.selected = self.job_view.len().saturating_sub(1),
            KeyAction::SortBy(column) => self.sort_by(column),
            KeyAction::Refresh => {
                self.refresh_requested = true;
                self.set_status("Refreshing jobs...", false);
            }
            KeyAction::MouseClick { row, column } => {
                if let Some(col) = self.layout.column_at(row, column) {
                    self.sort_by(col);
                } else if let Some(index) = self.layout.index_at(row)
                    && index < self.job_view.len()
                {
                    self.selected = index;
                } else {
                    return EventResult::Unchanged;
                }
            }
            KeyAction::Unknown => return EventResult::Unchanged,
        }
        EventResult::Continue
    }

    fn move_selection(&mut self, delta: isize) {
        let last = self.job_view.len().saturating_sub(1);
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn jobs(ids: &[&str]) -> Arc<Snapshot<JobRecord>> {
        let records = ids
            .iter()
            .map(|id| JobRecord {
                job_id: id.to_string(),
                elapsed: "0:00:10".to_string(),
                ..Default::default()
            })
            .collect();
        Arc::new(Snapshot::new(records, Vec::new()))
    }

    fn view_ids(app: &App) -> Vec<&str> {
        app.job_view.iter().map(|j| j.job_id.as_str()).collect()
    }

    fn key(c: char) -> InputEvent {
        InputEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn test_digit_sorts_and_toggles() {
        let mut app = App::new(Theme::dark(), None);
        app.set_jobs(jobs(&["3", "1", "2"]));
        assert_eq!(view_ids(&app), ["3", "1", "2"]);

        assert_eq!(app.handle_input(key('1')), EventResult::Continue);
        assert_eq!(view_ids(&app), ["1", "2", "3"]);
        app.handle_input(key('1'));
        assert_eq!(view_ids(&app), ["3", "2", "1"]);
    }

    #[test]
    fn test_new_snapshot_keeps_sort_order() {
        let mut app = App::new(Theme::dark(), None);
        app.set_jobs(jobs(&["3", "1", "2"]));
        app.sort_by(JobColumn::JobId);
        app.sort_by(JobColumn::JobId);

        app.set_jobs(jobs(&["5", "9", "7"]));
        assert_eq!(view_ids(&app), ["9", "7", "5"]);
    }

    #[test]
    fn test_initial_sort_applied_once() {
        let mut app = App::new(Theme::dark(), Some("job_id".to_string()));
        app.set_jobs(jobs(&["2", "1"]));
        assert_eq!(view_ids(&app), ["1", "2"]);
        app.set_jobs(jobs(&["4", "3"]));
        assert_eq!(view_ids(&app), ["3", "4"]);
    }

    #[test]
    fn test_bad_initial_sort_reports_error() {
        let mut app = App::new(Theme::dark(), Some("walltime".to_string()));
        app.set_jobs(jobs(&["2", "1"]));
        assert_eq!(view_ids(&app), ["2", "1"]);
        let status = app.status.as_ref().unwrap();
        assert!(status.is_error);
        assert!(status.text.contains("walltime"));
    }

    #[test]
    fn test_sort_error_leaves_view() {
        let mut app = App::new(Theme::dark(), None);
        app.set_jobs(jobs(&["2", "1"]));
        let mut broken = (*app.jobs).clone();
        broken.records[0].job_id = "12_3".to_string();
        app.set_jobs(Arc::new(broken));

        app.handle_input(key('1'));
        assert_eq!(view_ids(&app), ["12_3", "1"]);
        assert!(app.status.as_ref().unwrap().is_error);
        assert_eq!(app.sort.state().active_column, None);
    }

    #[test]
    fn test_unsortable_snapshot_clears_sort() {
        let mut app = App::new(Theme::dark(), None);
        app.set_jobs(jobs(&["3", "1", "2"]));
        app.sort_by(JobColumn::JobId);
        assert!(app.sort.state().current().is_some());

        app.set_jobs(jobs(&["5", "12_3", "4"]));
        assert_eq!(view_ids(&app), ["5", "12_3", "4"]);
        assert_eq!(app.sort.state().current(), None);
        assert!(app.status.as_ref().unwrap().is_error);

        app.set_jobs(jobs(&["9", "8"]));
        assert_eq!(view_ids(&app), ["9", "8"]);
    }

    #[test]
    fn test_selection_clamped() {
        let mut app = App::new(Theme::dark(), None);
        app.set_jobs(jobs(&["1", "2", "3"]));
        app.handle_input(key('G'));
        assert_eq!(app.selected, 2);
        app.handle_input(key('j'));
        assert_eq!(app.selected, 2);

        app.set_jobs(jobs(&["1"]));
        assert_eq!(app.selected, 0);
        app.handle_input(key('k'));
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_header_click_sorts() {
        let mut app = App::new(Theme::dark(), None);
        app.set_jobs(jobs(&["2", "1"]));
        app.layout = JobTableLayout {
            header_row: 10,
            column_spans: vec![(JobColumn::JobId, 1, 11), (JobColumn::Partition, 12, 22)],
            body_top: 11,
            body_height: 5,
            scroll_offset: 0,
        };

        let click = |row, column| {
            InputEvent::Mouse(MouseEvent {
                kind: crossterm::event::MouseEventKind::Down(crossterm::event::MouseButton::Left),
                column,
                row,
                modifiers: KeyModifiers::NONE,
            })
        };

        app.handle_input(click(10, 4));
        assert_eq!(view_ids(&app), ["1", "2"]);
        assert_eq!(app.sort.state().active_column, Some(JobColumn::JobId));

        app.handle_input(click(12, 4));
        assert_eq!(app.selected, 1);
        assert_eq!(app.handle_input(click(30, 4)), EventResult::Unchanged);
    }

    #[test]
    fn test_refresh_request() {
        let mut app = App::new(Theme::dark(), None);
        assert!(!app.take_refresh_request());
        app.handle_input(key('r'));
        assert!(app.take_refresh_request());
        assert!(!app.take_refresh_request());
    }
}
