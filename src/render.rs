//! Two-column terminal tables for tool results.
//!
//! Sections with nothing to show are skipped when they are added, so a
//! renderer can feed every schema field in without checking it first.

use crossterm::style::{Color, Stylize};

const MAX_RULE_WIDTH: usize = 80;

/// A labelled list of sections separated by horizontal rules.
#[derive(Debug, Default)]
pub struct Table {
    sections: Vec<Section>,
}

#[derive(Debug)]
struct Section {
    label: String,
    body: Body,
}

#[derive(Debug)]
enum Body {
    Text { value: String, color: Color },
    Rows(Vec<(String, String)>),
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text section; `None` or blank values are skipped.
    pub fn text(&mut self, label: &str, value: Option<&str>, color: Color) -> &mut Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.sections.push(Section {
                label: label.to_string(),
                body: Body::Text {
                    value: value.to_string(),
                    color,
                },
            });
        }
        self
    }

    /// Add a nested two-column section; skipped when `rows` is empty.
    pub fn rows(&mut self, label: &str, rows: Vec<(String, String)>) -> &mut Self {
        if !rows.is_empty() {
            self.sections.push(Section {
                label: label.to_string(),
                body: Body::Rows(rows),
            });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn render(&self) -> String {
        let label_width = self
            .sections
            .iter()
            .map(|s| s.label.chars().count())
            .max()
            .unwrap_or(0);
        let indent = " ".repeat(label_width + 2);

        let mut blocks = Vec::with_capacity(self.sections.len());
        let mut widest = 0;

        for section in &self.sections {
            let lines = section.body.lines();
            widest = widest.max(lines.iter().map(|(plain, _)| plain).max().copied().unwrap_or(0));

            let mut block = String::new();
            for (i, (_, styled)) in lines.iter().enumerate() {
                if i == 0 {
                    let label = format!("{:<width$}", section.label, width = label_width);
                    block.push_str(&format!("{}  {}", label.bold(), styled));
                } else {
                    block.push('\n');
                    block.push_str(&indent);
                    block.push_str(styled);
                }
            }
            blocks.push(block);
        }

        let rule_width = (label_width + 2 + widest).min(MAX_RULE_WIDTH);
        let rule = format!("\n{}\n", "─".repeat(rule_width).with(Color::DarkGrey));
        blocks.join(&rule)
    }
}

impl Body {
    /// Rendered lines paired with their visible width.
    fn lines(&self) -> Vec<(usize, String)> {
        match self {
            Body::Text { value, color } => value
                .lines()
                .map(|line| (line.chars().count(), line.with(*color).to_string()))
                .collect(),
            Body::Rows(rows) => {
                let left_width = rows
                    .iter()
                    .map(|(left, _)| left.chars().count())
                    .max()
                    .unwrap_or(0);
                rows.iter()
                    .map(|(left, right)| {
                        let left = format!("{:<width$}", left, width = left_width);
                        let width = left_width + 2 + right.chars().count();
                        (width, format!("{}  {}", left.with(Color::Cyan), right))
                    })
                    .collect()
            }
        }
    }
}
