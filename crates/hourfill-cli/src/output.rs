use console::{style, StyledObject};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Writes command results either for a terminal or as one JSON document.
///
/// In JSON mode stdout carries exactly one `{"status", "data"}` envelope;
/// progress lines are suppressed and warnings go to stderr.
pub struct OutputWriter {
    json: bool,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn success(&self, message: impl Display) {
        self.line(style("✓").green().bold(), message);
    }

    pub fn info(&self, message: impl Display) {
        self.line(style("ℹ").blue().bold(), message);
    }

    pub fn warning(&self, message: impl Display) {
        if self.json {
            eprintln!("{}", pretty(&status_message("warning", message)));
        } else {
            eprintln!("{} {}", style("⚠").yellow().bold(), message);
        }
    }

    pub fn section(&self, title: impl Display) {
        if !self.json {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        if !self.json {
            println!("{}: {}", style(key).bold(), value);
        }
    }

    /// Rounded table for humans; the same rows as the envelope's `data` in JSON mode
    pub fn table<T: Tabled + Serialize>(&self, rows: Vec<T>) -> anyhow::Result<()> {
        if self.json {
            return self.result(rows);
        }
        if rows.is_empty() {
            println!("{}", style("(no data)").dim());
        } else {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        Ok(())
    }

    /// Print a serializable result, wrapped in the success envelope in JSON mode
    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let body = if self.json {
            json!({ "status": "success", "data": data })
        } else {
            serde_json::to_value(data)?
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        Ok(())
    }

    fn line(&self, marker: StyledObject<&str>, message: impl Display) {
        if !self.json {
            println!("{} {}", marker, message);
        }
    }
}

fn status_message(status: &str, message: impl Display) -> Value {
    json!({ "status": status, "message": message.to_string() })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
