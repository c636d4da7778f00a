use crate::output::OutputWriter;
use serde::Serialize;
use std::fmt;

/// Something a run would do, listed instead of done under `--dry-run`
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub action_type: ActionType,
    pub description: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    FetchRange,
    CreateFile,
    OverwriteFile,
    AppendFile,
    Skip,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionType::FetchRange => "fetch",
            ActionType::CreateFile => "create",
            ActionType::OverwriteFile => "overwrite",
            ActionType::AppendFile => "append",
            ActionType::Skip => "skip",
        };
        f.write_str(label)
    }
}

impl PlannedAction {
    pub fn new(action_type: ActionType, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: description.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn with_details<I, S>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.details.extend(details.into_iter().map(Into::into));
        self
    }
}

pub fn display_planned_actions(output: &OutputWriter, actions: &[PlannedAction]) -> anyhow::Result<()> {
    if output.is_json() {
        return output.result(serde_json::json!({
            "dry_run": true,
            "planned_actions": actions,
        }));
    }

    output.section("Dry run");
    for action in actions {
        output.info(format!("[{}] {}", action.action_type, action.description));
        for detail in &action.details {
            println!("      {}", detail);
        }
    }
    output.info("No requests were sent and no files were written");
    Ok(())
}
