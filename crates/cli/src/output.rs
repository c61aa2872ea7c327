// Terminal output
use ambrogio_core::domain::MowerState;
use colored::Colorize;
use serde_json::Value;
use tabled::{Table, Tabled};

/// Outcome of one step of a script (or of a single command)
pub struct StepOutcome {
    pub action: String,
    pub result: Result<Value, String>,
}

#[derive(Tabled)]
struct StepRow {
    step: usize,
    action: String,
    status: String,
}

#[derive(Tabled)]
struct StateRow {
    field: &'static str,
    value: String,
}

pub fn print_result(action: &str, value: &Value, json: bool) {
    if json {
        println!("{}", pretty(value));
        return;
    }

    println!("{}", format!("✓ {} completed", action).green().bold());
    if !value.is_null() {
        println!();
        println!("{}", pretty(value));
    }
}

pub fn print_queued(actions: &[String]) {
    for action in actions {
        println!("{}", format!("• {} queued", action).cyan());
    }
}

pub fn print_steps(steps: &[StepOutcome], json: bool) {
    if json {
        let values: Vec<Value> = steps
            .iter()
            .map(|s| match &s.result {
                Ok(v) => serde_json::json!({ "action": s.action, "ok": true, "result": v }),
                Err(e) => serde_json::json!({ "action": s.action, "ok": false, "error": e }),
            })
            .collect();
        println!("{}", pretty(&Value::Array(values)));
        return;
    }

    let rows: Vec<StepRow> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| StepRow {
            step: i + 1,
            action: s.action.clone(),
            status: match &s.result {
                Ok(_) => "ok".green().to_string(),
                Err(e) => format!("{} {}", "failed:".red(), e),
            },
        })
        .collect();

    println!("{}", "Script results".cyan().bold());
    println!("{}", Table::new(rows));
}

pub fn print_state(state: &MowerState) {
    let rows = vec![
        StateRow {
            field: "location",
            value: state.location_label(),
        },
        StateRow {
            field: "connectivity",
            value: state.connectivity_label().to_string(),
        },
        StateRow {
            field: "position source",
            value: state
                .position_source
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
        StateRow {
            field: "updated",
            value: state
                .loc_updated
                .as_ref()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
        StateRow {
            field: "source",
            value: state
                .source
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
    ];

    println!("{}", "Mower state".cyan().bold());
    println!("{}", Table::new(rows));
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
