//! Rendering of the single-screen TUI: info line, partition panel, job
//! table and status line.

use chrono::Local;
use ratatui::layout::Flex;
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table};

use crate::formatting::{format_percent, layout};
use crate::models::{JobColumn, PartitionRecord};
use crate::refresh::SourceHealth;
use crate::tui::app::{App, JobTableLayout};
use crate::tui::theme::Theme;

/// Job table column widths, in `JobColumn` order
const JOB_COLUMN_WIDTHS: [u16; 9] = [10, 10, 20, 10, 3, 16, 7, 20, 10];

/// Upper bound on partition panel rows before it starts eating the job table
const MAX_PARTITION_ROWS: u16 = 12;

pub fn render(app: &mut App, frame: &mut Frame) {
    let partition_rows = (app.partitions.len() as u16).clamp(1, MAX_PARTITION_ROWS);
    let [info_area, partitions_area, jobs_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(partition_rows + 3),
        Constraint::Min(5),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_info(app, frame, info_area);
    render_partitions(app, frame, partitions_area);
    render_jobs(app, frame, jobs_area);
    render_status(app, frame, status_area);
}

/// Panel title with a staleness marker when the last poll failed
fn panel_title<'a>(name: &'a str, health: &SourceHealth, theme: &Theme) -> Line<'a> {
    let mut spans = vec![Span::styled(
        format!(" {name} "),
        Style::default().fg(theme.title).bold(),
    )];
    if health.is_stale() {
        let marker = match health.stale_for(Local::now()) {
            Some(age) => format!("stale {}s ", age.as_secs()),
            None => "no data ".to_string(),
        };
        spans.push(Span::styled(marker, Style::default().fg(theme.stale_indicator)));
    }
    Line::from(spans)
}

fn panel<'a>(title: Line<'a>, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(title)
}

fn render_info(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let block = panel(
        Line::from(Span::styled(" SLURMTOP ", Style::default().fg(theme.title).bold())),
        theme,
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let clock = Local::now().format("%c").to_string();
    let [left, right] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(clock.chars().count() as u16),
    ])
    .areas(inner);

    let info = &app.info;
    let summary = if info.user.is_empty() {
        "Loading...".to_string()
    } else {
        info.summary()
    };
    frame.render_widget(Paragraph::new(summary).style(Style::default().fg(theme.fg)), left);
    frame.render_widget(
        Paragraph::new(clock)
            .style(Style::default().fg(theme.fg))
            .alignment(Alignment::Right),
        right,
    );
}

/// Load bar as colored spans: allocated `|`, idle `|`, other `.`, then the ratio
fn load_bar_line(partition: &PartitionRecord, theme: &Theme) -> Line<'static> {
    let bar = partition.load_bar(layout::LOAD_BAR_WIDTH);
    Line::from(vec![
        Span::raw("["),
        Span::styled("|".repeat(bar.allocated), Style::default().fg(theme.allocated)),
        Span::styled("|".repeat(bar.idle), Style::default().fg(theme.idle)),
        Span::styled(".".repeat(bar.other), Style::default().fg(theme.other)),
        Span::styled(
            format_percent(partition.usage_ratio),
            Style::default().fg(theme.usage_color(partition.usage_ratio)),
        ),
        Span::raw("]"),
    ])
}

fn render_partitions(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let block = panel(panel_title("SINFO", &app.partitions_health, theme), theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.partitions.is_empty() {
        let msg = if app.partitions_health.last_success.is_none() {
            "Loading partitions..."
        } else {
            "No partitions found"
        };
        frame.render_widget(
            Paragraph::new(msg).style(Style::default().fg(theme.border)),
            inner,
        );
        return;
    }

    let header = Row::new([
        Cell::from("Partition"),
        Cell::from("Load"),
        Cell::from("Alloc").style(Style::default().fg(theme.allocated)),
        Cell::from("Idle").style(Style::default().fg(theme.idle)),
        Cell::from("Other").style(Style::default().fg(theme.other)),
        Cell::from("Total"),
    ])
    .style(Style::default().fg(theme.header_fg).bold());

    let rows = app.partitions.records.iter().map(|p| {
        Row::new([
            Cell::from(p.name.clone()).style(Style::default().fg(Color::Cyan)),
            Cell::from(load_bar_line(p, theme)),
            Cell::from(Text::from(p.allocated.to_string()).right_aligned()),
            Cell::from(Text::from(p.idle.to_string()).right_aligned()),
            Cell::from(Text::from(p.other.to_string()).right_aligned()),
            Cell::from(Text::from(p.total.to_string()).right_aligned()),
        ])
    });

    let widths = [
        Constraint::Length(layout::PARTITION_NAME_LEN as u16 + 1),
        Constraint::Length(layout::LOAD_BAR_WIDTH as u16 + 8),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
    ];

    frame.render_widget(Table::new(rows, widths).header(header), inner);
}

/// Keep the selected row visible
fn scroll_offset(selected: usize, visible: usize, total: usize) -> usize {
    if visible == 0 || total <= visible {
        return 0;
    }
    if selected < visible / 2 {
        0
    } else {
        (selected - visible / 2).min(total - visible)
    }
}

fn render_jobs(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = panel(panel_title("SQUEUE", &app.jobs_health, &app.theme), &app.theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let theme = &app.theme;

    let constraints = JOB_COLUMN_WIDTHS.map(Constraint::Length);
    let header_rect = Rect { height: 1, ..inner };
    let spans = Layout::horizontal(constraints)
        .flex(Flex::Start)
        .spacing(1)
        .split(header_rect);

    let sorted = app.sort.state().current();
    let header = Row::new(JobColumn::ALL.map(|column| match sorted {
        Some((active, direction)) if active == column => Cell::from(format!(
            "{} {}",
            column.header(),
            direction.arrow()
        ))
        .style(Style::default().fg(theme.sorted_header_fg).bold()),
        _ => Cell::from(column.header()).style(Style::default().fg(theme.header_fg).bold()),
    }));

    let body_height = inner.height.saturating_sub(1);
    let offset = scroll_offset(app.selected, body_height as usize, app.job_view.len());

    let rows: Vec<Row> = app
        .job_view
        .iter()
        .enumerate()
        .skip(offset)
        .take(body_height as usize)
        .map(|(index, job)| {
            let cells = JobColumn::ALL.map(|column| {
                let value = job.field(column).to_string();
                if column == JobColumn::State {
                    Cell::from(value.clone()).style(Style::default().fg(theme.state_color(&value)))
                } else {
                    Cell::from(value)
                }
            });
            let row = Row::new(cells);
            if index == app.selected {
                row.style(Style::default().bg(theme.selected_bg).fg(theme.selected_fg))
            } else {
                row
            }
        })
        .collect();

    if rows.is_empty() {
        let msg = if app.jobs_loaded { "No jobs found" } else { "Loading jobs..." };
        frame.render_widget(Table::new(Vec::<Row>::new(), constraints).header(header), inner);
        let body = Rect {
            y: inner.y + 1,
            height: body_height,
            ..inner
        };
        frame.render_widget(Paragraph::new(msg).style(Style::default().fg(theme.border)), body);
    } else {
        frame.render_widget(
            Table::new(rows, constraints).header(header).column_spacing(1),
            inner,
        );
    }

    app.layout = JobTableLayout {
        header_row: inner.y,
        column_spans: JobColumn::ALL
            .iter()
            .zip(spans.iter())
            .map(|(column, rect)| (*column, rect.x, rect.x + rect.width))
            .collect(),
        body_top: inner.y + 1,
        body_height,
        scroll_offset: offset,
    };
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let theme = &app.theme;
    let line = match &app.status {
        Some(status) if status.is_error => Line::from(Span::styled(
            status.text.clone(),
            Style::default().fg(theme.status_error),
        )),
        Some(status) => Line::from(Span::styled(status.text.clone(), Style::default().fg(theme.fg))),
        None => Line::from(Span::styled(
            format!(
                " q quit  r refresh  1-9 sort  j/k move   {} jobs",
                app.job_view.len()
            ),
            Style::default().fg(theme.border),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}
