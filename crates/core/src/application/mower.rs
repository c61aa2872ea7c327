// Mower command builders
// Validated, typed actions for one mower, all routed through the command queue

use crate::application::queue::CommandQueue;
use crate::domain::operation::DEFAULT_ACK_TIMEOUT_SECS;
use crate::domain::{Command, Identity, MethodCall, Operation};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// SMS body that wakes a sleeping mower
pub const WAKE_UP_MESSAGE: &str = "UP";

/// Keep-out zone around a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeepOut {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
}

/// Something a user can ask a mower to do
///
/// Deserializes from `{"action": "<name>", ...}` so scripts can be written
/// as plain JSON arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MowerAction {
    /// Profile 1..=3
    SetProfile { profile: u8 },
    WorkNow,
    BorderCut,
    ChargeNow,
    /// Charge until hh:mm on weekday 1..=7 (Monday first)
    ChargeUntil { hours: u8, minutes: u8, weekday: u8 },
    TracePosition,
    KeepOut(KeepOut),
    WakeUp,
    ThingFind,
    ThingList,
    Raw {
        command: String,
        #[serde(default)]
        params: Value,
    },
    Delay { seconds: f64 },
}

impl MowerAction {
    pub fn name(&self) -> &'static str {
        match self {
            MowerAction::SetProfile { .. } => "set_profile",
            MowerAction::WorkNow => "work_now",
            MowerAction::BorderCut => "border_cut",
            MowerAction::ChargeNow => "charge_now",
            MowerAction::ChargeUntil { .. } => "charge_until",
            MowerAction::TracePosition => "trace_position",
            MowerAction::KeepOut(_) => "keep_out",
            MowerAction::WakeUp => "wake_up",
            MowerAction::ThingFind => "thing_find",
            MowerAction::ThingList => "thing_list",
            MowerAction::Raw { .. } => "raw",
            MowerAction::Delay { .. } => "delay",
        }
    }
}

/// Builds and submits commands for a single mower
#[derive(Clone)]
pub struct MowerCommands {
    queue: Arc<CommandQueue>,
    identity: Identity,
    ack_timeout_secs: u64,
}

impl MowerCommands {
    pub fn new(queue: Arc<CommandQueue>, identity: impl Into<Identity>) -> Self {
        Self {
            queue,
            identity: identity.into(),
            ack_timeout_secs: DEFAULT_ACK_TIMEOUT_SECS,
        }
    }

    pub fn with_ack_timeout(mut self, secs: u64) -> Self {
        self.ack_timeout_secs = secs;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Validate `action` and turn it into a queue command
    ///
    /// # Errors
    /// `AppError::Validation` for out-of-range arguments.
    pub fn command(&self, action: &MowerAction) -> Result<Command> {
        let operation = match action {
            MowerAction::SetProfile { profile } => {
                check_range("profile", *profile, 1, 3)?;
                self.method("set_profile", Some(json!({ "profile": profile - 1 })))
            }
            MowerAction::WorkNow => self.method("work_now", None),
            MowerAction::BorderCut => self.method("border_cut", None),
            MowerAction::ChargeNow => self.method("charge_now", None),
            MowerAction::ChargeUntil {
                hours,
                minutes,
                weekday,
            } => {
                check_range("hours", *hours, 0, 23)?;
                check_range("minutes", *minutes, 0, 59)?;
                check_range("weekday", *weekday, 1, 7)?;
                self.method(
                    "charge_until",
                    Some(json!({ "hh": hours, "mm": minutes, "weekday": weekday - 1 })),
                )
            }
            MowerAction::TracePosition => self.method("trace_position", None),
            MowerAction::KeepOut(zone) => self.method("keep_out", Some(keep_out_params(zone)?)),
            MowerAction::WakeUp => Operation::sms(WAKE_UP_MESSAGE),
            MowerAction::ThingFind => Operation::FindByIdentity,
            MowerAction::ThingList => Operation::ListByIdentities { keys: Vec::new() },
            MowerAction::Raw { command, params } => {
                if command.trim().is_empty() {
                    return Err(AppError::Validation("raw command name is empty".into()));
                }
                Operation::Raw {
                    command: command.clone(),
                    params: params.clone(),
                }
            }
            MowerAction::Delay { seconds } => {
                if !seconds.is_finite() || *seconds < 0.0 {
                    return Err(AppError::Validation(format!(
                        "delay must be a non-negative number of seconds, got {}",
                        seconds
                    )));
                }
                let delay = Duration::try_from_secs_f64(*seconds).map_err(|e| {
                    AppError::Validation(format!("delay of {} seconds is out of range: {}", seconds, e))
                })?;
                Operation::Delay(delay)
            }
        };

        Ok(Command::new(self.identity.clone(), operation).with_label(action.name()))
    }

    /// Submit `action` and wait for its result
    pub async fn execute(&self, action: &MowerAction) -> Result<Value> {
        let command = self.command(action)?;
        Ok(self.queue.execute(command).await?)
    }

    /// Submit `action` without waiting
    pub async fn enqueue(&self, action: &MowerAction) -> Result<()> {
        let command = self.command(action)?;
        Ok(self.queue.enqueue(command).await?)
    }

    pub async fn set_profile(&self, profile: u8) -> Result<Value> {
        self.execute(&MowerAction::SetProfile { profile }).await
    }

    pub async fn work_now(&self) -> Result<Value> {
        self.execute(&MowerAction::WorkNow).await
    }

    pub async fn border_cut(&self) -> Result<Value> {
        self.execute(&MowerAction::BorderCut).await
    }

    pub async fn charge_now(&self) -> Result<Value> {
        self.execute(&MowerAction::ChargeNow).await
    }

    pub async fn charge_until(&self, hours: u8, minutes: u8, weekday: u8) -> Result<Value> {
        self.execute(&MowerAction::ChargeUntil {
            hours,
            minutes,
            weekday,
        })
        .await
    }

    pub async fn trace_position(&self) -> Result<Value> {
        self.execute(&MowerAction::TracePosition).await
    }

    pub async fn keep_out(&self, zone: KeepOut) -> Result<Value> {
        self.execute(&MowerAction::KeepOut(zone)).await
    }

    pub async fn wake_up(&self) -> Result<Value> {
        self.execute(&MowerAction::WakeUp).await
    }

    pub async fn thing_find(&self) -> Result<Value> {
        self.execute(&MowerAction::ThingFind).await
    }

    pub async fn thing_list(&self) -> Result<Value> {
        self.execute(&MowerAction::ThingList).await
    }

    fn method(&self, name: &str, params: Option<Value>) -> Operation {
        let mut call = MethodCall::new(name).with_ack_timeout(self.ack_timeout_secs);
        if let Some(params) = params {
            call = call.with_params(params);
        }
        Operation::MethodExec(call)
    }
}

fn check_range(field: &str, value: u8, min: u8, max: u8) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )))
    }
}

fn keep_out_params(zone: &KeepOut) -> Result<Value> {
    if !(-90.0..=90.0).contains(&zone.latitude) || !(-180.0..=180.0).contains(&zone.longitude) {
        return Err(AppError::Validation(format!(
            "invalid keep-out location {},{}",
            zone.latitude, zone.longitude
        )));
    }

    let mut params = Map::new();
    params.insert("latitude".into(), json!(zone.latitude));
    params.insert("longitude".into(), json!(zone.longitude));
    if let Some(radius) = zone.radius {
        params.insert("radius".into(), json!(radius));
    }
    if let Some(hours) = zone.hours {
        check_range("hours", hours, 0, 23)?;
        params.insert("hh".into(), json!(hours));
    }
    if let Some(minutes) = zone.minutes {
        check_range("minutes", minutes, 0, 59)?;
        params.insert("mm".into(), json!(minutes));
    }
    if let Some(index) = zone.index {
        params.insert("index".into(), json!(index));
    }
    Ok(Value::Object(params))
}
