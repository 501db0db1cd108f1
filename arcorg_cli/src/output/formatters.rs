use super::OutputFormatter;
use crate::orchestrators::{Plan, PlannedAction, ResourceChange, RunReport};
use crate::state::StateFile;
use anyhow::Result;
use colored::*;
use serde_json::{Value, json};

/// Text formatter for human-readable output
pub struct TextFormatter {
    use_color: bool,
}

impl TextFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format_plan(&self, plan: &Plan) -> Result<String> {
        let mut output = String::new();

        for entry in &plan.entries {
            let line = match &entry.action {
                PlannedAction::Create => {
                    format!("  {} {}", self.colorize("+", |s| s.green()), entry.key)
                }
                PlannedAction::Keep => format!("    {}", entry.key),
                PlannedAction::Replace {
                    field,
                    stored,
                    desired,
                } => format!(
                    "  {} {} ({field}: {stored} -> {desired}; destroy and re-create)",
                    self.colorize("!", |s| s.yellow()),
                    entry.key
                ),
                PlannedAction::Rename { from } => format!(
                    "  {} {} (renamed from {from})",
                    self.colorize("~", |s| s.cyan()),
                    entry.key
                ),
                PlannedAction::Destroy => format!(
                    "  {} {} (quarantine)",
                    self.colorize("-", |s| s.red()),
                    entry.key
                ),
            };
            output.push_str(&line);
            output.push('\n');
        }

        let creates = plan.count(|a| *a == PlannedAction::Create);
        let destroys = plan.count(|a| *a == PlannedAction::Destroy);
        let replaces = plan.count(|a| matches!(a, PlannedAction::Replace { .. }));
        let renames = plan.count(|a| matches!(a, PlannedAction::Rename { .. }));

        if plan.has_changes() {
            output.push_str(&format!(
                "\nPlan: {creates} to create, {destroys} to quarantine, {replaces} blocked\n"
            ));
            if renames > 0 {
                output.push_str(&format!("{renames} record(s) move to a renamed key\n"));
            }
        } else {
            output.push_str("\nNo changes. State matches the manifest.\n");
        }

        Ok(output)
    }

    fn format_report(&self, command: &str, report: &RunReport) -> Result<String> {
        let mut output = String::new();

        for result in &report.results {
            let line = match &result.outcome {
                Ok(change) => {
                    let label = match change {
                        ResourceChange::Skipped(_) => self.colorize(change.label(), |s| s.yellow()),
                        ResourceChange::Unchanged(_) | ResourceChange::Refreshed(_) => {
                            change.label().to_string()
                        }
                        _ => self.colorize(change.label(), |s| s.green()),
                    };
                    match change.record() {
                        Some(record) => format!("  {}: {label} ({})", result.key, record.id),
                        None => format!("  {}: {label}", result.key),
                    }
                }
                Err(e) => format!(
                    "  {}: {} ({}) {e}",
                    result.key,
                    self.colorize("failed", |s| s.red()),
                    e.category()
                ),
            };
            output.push_str(&line);
            output.push('\n');
        }

        for (key, warning) in report.warnings() {
            output.push_str(&format!(
                "\n{} {key}: {}\n  {}\n",
                self.colorize("Warning:", |s| s.yellow()),
                warning.summary,
                warning.detail
            ));
        }

        let failures = report.failure_count();
        output.push_str(&format!(
            "\n{command}: {} resource(s), {} failed\n",
            report.results.len(),
            failures
        ));

        Ok(output)
    }

    fn format_state(&self, state: &StateFile) -> Result<String> {
        if state.is_empty() {
            return Ok("No managed accounts.\n".to_string());
        }

        let mut output = String::new();
        for (key, record) in &state.resources {
            output.push_str(&format!("{}\n", self.colorize(key, |s| s.bold())));
            output.push_str(&format!("  id:             {}\n", record.id));
            output.push_str(&format!("  email:          {}\n", record.email));
            output.push_str(&format!("  name:           {}\n", record.name));
            output.push_str(&format!("  active_unit_id: {}\n", record.active_unit_id));
            output.push_str(&format!("  closed_unit_id: {}\n", record.closed_unit_id));
        }
        Ok(output)
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &Value) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_plan(&self, plan: &Plan) -> Result<String> {
        self.render(&json!({
            "has_changes": plan.has_changes(),
            "entries": plan.entries,
        }))
    }

    fn format_report(&self, command: &str, report: &RunReport) -> Result<String> {
        let results: Vec<Value> = report
            .results
            .iter()
            .map(|result| match &result.outcome {
                Ok(change) => {
                    let mut value = json!({
                        "key": result.key,
                        "status": change.label(),
                    });
                    if let Some(record) = change.record() {
                        value["record"] = json!(record);
                    }
                    if let ResourceChange::Skipped(warning) = change {
                        value["warning"] = json!(warning);
                    }
                    value
                }
                Err(e) => json!({
                    "key": result.key,
                    "status": "failed",
                    "category": e.category().to_string(),
                    "error": e.to_string(),
                    "remediation": e.remediation(),
                    "retryable": e.is_retryable(),
                }),
            })
            .collect();

        self.render(&json!({
            "command": command,
            "success": report.is_success(),
            "results": results,
        }))
    }

    fn format_state(&self, state: &StateFile) -> Result<String> {
        self.render(&json!(state))
    }
}
