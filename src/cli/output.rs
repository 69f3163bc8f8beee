// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User-facing console output.
//!
//! Text mode prints plain lines with highlighted values and spinners. Json
//! mode prints one JSON document per line so scripts can follow along:
//! `{"message": ...}` for messages and the raw payload for status events.

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct ConsoleOutput {
    format: OutputFormat,
}

impl ConsoleOutput {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Render `message` as a line; in json mode empty lines are skipped
    pub fn render(&self, message: &str) -> Option<String> {
        match self.format {
            OutputFormat::Text => Some(message.to_string()),
            OutputFormat::Json if message.is_empty() => None,
            OutputFormat::Json => Some(serde_json::json!({ "message": message }).to_string()),
        }
    }

    pub fn log(&self, message: &str) {
        if let Some(line) = self.render(message) {
            println!("{}", line);
        }
    }

    /// Print a payload as json; text mode ignores it
    pub fn json<T: Serialize>(&self, payload: &T) {
        if self.is_json() {
            match serde_json::to_string(payload) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize output: {}", e),
            }
        }
    }

    /// Brand colour in text mode, unchanged in json mode
    pub fn highlight(&self, text: &str) -> String {
        match self.format {
            OutputFormat::Text => acurast_color(text).to_string(),
            OutputFormat::Json => text.to_string(),
        }
    }

    pub fn warning(&self, text: &str) -> String {
        match self.format {
            OutputFormat::Text => text.red().to_string(),
            OutputFormat::Json => text.to_string(),
        }
    }

    /// Spinner on stderr; hidden in json mode
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if self.is_json() {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

pub fn acurast_color(text: &str) -> ColoredString {
    text.truecolor(255, 128, 0)
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.yellow} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn indented_spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("  {spinner:.yellow} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Ordered list of spinners, one per deployment step, below a heading
pub struct StepList {
    _multi: MultiProgress,
    header: ProgressBar,
    steps: Vec<ProgressBar>,
}

impl StepList {
    pub fn new(header: &str, titles: &[String]) -> Self {
        let multi = MultiProgress::new();
        let header_bar = multi.add(ProgressBar::new_spinner());
        header_bar.set_style(spinner_style());
        header_bar.set_message(header.to_string());
        header_bar.enable_steady_tick(Duration::from_millis(100));
        let steps = titles
            .iter()
            .map(|title| {
                let step = multi.add(ProgressBar::new_spinner());
                step.set_style(indented_spinner_style());
                step.set_message(title.clone());
                step.enable_steady_tick(Duration::from_millis(100));
                step
            })
            .collect();
        Self {
            _multi: multi,
            header: header_bar,
            steps,
        }
    }

    pub fn header(&self) -> String {
        self.header.message()
    }

    pub fn set_header(&self, header: &str) {
        if !self.header.is_finished() {
            self.header.set_message(header.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn update(&self, index: usize, title: &str) {
        if let Some(step) = self.steps.get(index) {
            step.set_message(title.to_string());
        }
    }

    pub fn complete(&self, index: usize, title: &str) {
        if let Some(step) = self.steps.get(index) {
            step.finish_with_message(format!("{} {}", "✔".green(), title));
        }
    }

    pub fn fail(&self, index: usize, title: &str) {
        if let Some(step) = self.steps.get(index) {
            step.abandon_with_message(format!("{} {}", "✖".red(), title));
        }
    }

    pub fn title(&self, index: usize) -> Option<String> {
        self.steps.get(index).map(|step| step.message())
    }

    /// Stop every spinner that is still running
    pub fn finish(&self) {
        for step in &self.steps {
            if !step.is_finished() {
                step.finish();
            }
        }
        if !self.header.is_finished() {
            self.header.finish();
        }
    }
}
