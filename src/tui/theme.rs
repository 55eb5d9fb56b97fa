//! Color themes for the TUI
//!
//! Dark is the default; `[display] theme = "light"` switches to darker,
//! more saturated colors for light terminals.

use ratatui::style::Color;

use crate::formatting::thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "light" => ThemeName::Light,
            _ => ThemeName::Dark,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,

    pub fg: Color,
    pub border: Color,
    pub title: Color,

    // Job state codes
    pub running: Color,
    pub pending: Color,
    pub completed: Color,
    pub failed: Color,

    // Partition load bar segments
    pub allocated: Color,
    pub idle: Color,
    pub other: Color,

    pub selected_bg: Color,
    pub selected_fg: Color,
    pub header_fg: Color,
    pub sorted_header_fg: Color,
    pub stale_indicator: Color,
    pub status_error: Color,

    pub usage_low: Color,
    pub usage_warn: Color,
    pub usage_crit: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: ThemeName::Dark,

            fg: Color::White,
            border: Color::DarkGray,
            title: Color::Rgb(51, 255, 190),

            running: Color::Rgb(0, 200, 0),
            pending: Color::Rgb(255, 180, 0),
            completed: Color::Rgb(80, 160, 255),
            failed: Color::Rgb(255, 80, 80),

            allocated: Color::Rgb(255, 80, 80),
            idle: Color::Rgb(0, 200, 0),
            other: Color::Rgb(255, 165, 0),

            selected_bg: Color::Rgb(60, 60, 80),
            selected_fg: Color::White,
            header_fg: Color::White,
            sorted_header_fg: Color::Cyan,
            stale_indicator: Color::Rgb(255, 100, 100),
            status_error: Color::Rgb(255, 80, 80),

            usage_low: Color::Rgb(0, 200, 0),
            usage_warn: Color::Rgb(255, 180, 0),
            usage_crit: Color::Rgb(255, 80, 80),
        }
    }

    pub fn light() -> Self {
        Self {
            name: ThemeName::Light,

            fg: Color::Black,
            border: Color::Rgb(120, 120, 120),
            title: Color::Rgb(0, 120, 90),

            running: Color::Rgb(0, 140, 0),
            pending: Color::Rgb(200, 120, 0),
            completed: Color::Rgb(0, 80, 180),
            failed: Color::Rgb(200, 0, 0),

            allocated: Color::Rgb(200, 0, 0),
            idle: Color::Rgb(0, 140, 0),
            other: Color::Rgb(200, 120, 0),

            selected_bg: Color::Rgb(200, 220, 255),
            selected_fg: Color::Black,
            header_fg: Color::Black,
            sorted_header_fg: Color::Rgb(0, 100, 180),
            stale_indicator: Color::Rgb(200, 0, 0),
            status_error: Color::Rgb(200, 0, 0),

            usage_low: Color::Rgb(0, 140, 0),
            usage_warn: Color::Rgb(200, 120, 0),
            usage_crit: Color::Rgb(200, 0, 0),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match ThemeName::parse(name) {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
        }
    }

    /// Color for a single-character job state code
    pub fn state_color(&self, code: &str) -> Color {
        match code {
            "R" => self.running,
            "P" | "S" => self.pending,
            "C" => self.completed,
            "F" | "T" | "N" | "B" | "O" | "D" => self.failed,
            _ => self.fg,
        }
    }

    /// Color for a partition usage ratio
    pub fn usage_color(&self, percent: f64) -> Color {
        if percent >= thresholds::UTILIZATION_HIGH {
            self.usage_crit
        } else if percent >= thresholds::UTILIZATION_LOW {
            self.usage_warn
        } else {
            self.usage_low
        }
    }
}
