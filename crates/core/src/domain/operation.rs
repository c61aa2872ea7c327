// Operation Domain Model
// One closed variant per kind of work a command can carry

use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;

/// Default acknowledgement timeout passed with `method.exec` (seconds)
pub const DEFAULT_ACK_TIMEOUT_SECS: u64 = 30;

/// SMS coding used for wake-up messages
pub const DEFAULT_SMS_CODING: &str = "SEVEN_BIT";

/// Fields requested from `thing.list`
pub const THING_LIST_FIELDS: [&str; 13] = [
    "id",
    "key",
    "name",
    "connected",
    "lastSeen",
    "lastCommunication",
    "loc",
    "properties",
    "alarms",
    "attrs",
    "createdOn",
    "storage",
    "varBillingPlanCode",
];

/// Remote method invocation on the mower
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub params: Option<Value>,
    pub ack_timeout_secs: u64,
    pub singleton: bool,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
            ack_timeout_secs: DEFAULT_ACK_TIMEOUT_SECS,
            singleton: true,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_ack_timeout(mut self, secs: u64) -> Self {
        self.ack_timeout_secs = secs;
        self
    }
}

/// What a command does when a worker picks it up
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `method.exec` against the command's identity
    MethodExec(MethodCall),
    /// `sms.send` to the command's identity
    SendSms { message: String, coding: String },
    /// `thing.find` for the command's identity
    FindByIdentity,
    /// `thing.list` for the given keys (empty means the command's identity)
    ListByIdentities { keys: Vec<String> },
    /// Any other TR50 command, passed through untouched
    Raw { command: String, params: Value },
    /// Explicit pause for scripts; the queue never inserts one itself
    Delay(Duration),
    /// Shutdown sentinel, only ever enqueued by `CommandQueue::stop`
    Stop,
}

/// Remote command name plus request body for one API call
#[derive(Debug, Clone, PartialEq)]
pub struct CallShape {
    pub command: String,
    pub params: Value,
}

/// How a worker carries out an operation
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionPlan {
    Sleep(Duration),
    Call(CallShape),
    Shutdown,
}

impl Operation {
    pub fn sms(message: impl Into<String>) -> Self {
        Operation::SendSms {
            message: message.into(),
            coding: DEFAULT_SMS_CODING.to_string(),
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &str {
        match self {
            Operation::MethodExec(_) => "method.exec",
            Operation::SendSms { .. } => "sms.send",
            Operation::FindByIdentity => "thing.find",
            Operation::ListByIdentities { .. } => "thing.list",
            Operation::Raw { command, .. } => command.as_str(),
            Operation::Delay(_) => "delay",
            Operation::Stop => "__stop__",
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Operation::Stop)
    }

    /// Resolve the operation into what the worker should do for `identity`
    pub fn plan(&self, identity: &str) -> ExecutionPlan {
        let call = |command: &str, params: Value| {
            ExecutionPlan::Call(CallShape {
                command: command.to_string(),
                params,
            })
        };

        match self {
            Operation::MethodExec(m) => {
                let mut body = Map::new();
                body.insert("method".into(), Value::String(m.method.clone()));
                body.insert("imei".into(), Value::String(identity.to_string()));
                body.insert("ackTimeout".into(), json!(m.ack_timeout_secs));
                body.insert("singleton".into(), Value::Bool(m.singleton));
                if let Some(params) = &m.params {
                    body.insert("params".into(), params.clone());
                }
                call("method.exec", Value::Object(body))
            }
            Operation::SendSms { message, coding } => call(
                "sms.send",
                json!({ "coding": coding, "imei": identity, "message": message }),
            ),
            Operation::FindByIdentity => call("thing.find", json!({ "imei": identity })),
            Operation::ListByIdentities { keys } => {
                let keys = if keys.is_empty() {
                    vec![identity.to_string()]
                } else {
                    keys.clone()
                };
                call(
                    "thing.list",
                    json!({ "show": THING_LIST_FIELDS, "hideFields": true, "keys": keys }),
                )
            }
            Operation::Raw { command, params } => call(command, params.clone()),
            Operation::Delay(duration) => ExecutionPlan::Sleep(*duration),
            Operation::Stop => ExecutionPlan::Shutdown,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(plan: ExecutionPlan) -> CallShape {
        match plan {
            ExecutionPlan::Call(shape) => shape,
            other => panic!("expected a remote call, got {:?}", other),
        }
    }

    #[test]
    fn test_method_exec_merges_identity() {
        let op = Operation::MethodExec(
            MethodCall::new("set_profile").with_params(json!({"profile": 0})),
        );
        let shape = shape(op.plan("3561"));

        assert_eq!(shape.command, "method.exec");
        assert_eq!(
            shape.params,
            json!({
                "method": "set_profile",
                "imei": "3561",
                "ackTimeout": 30,
                "singleton": true,
                "params": {"profile": 0}
            })
        );
    }

    #[test]
    fn test_method_exec_without_params_omits_key() {
        let shape = shape(Operation::MethodExec(MethodCall::new("work_now")).plan("1"));
        assert!(shape.params.get("params").is_none());
    }

    #[test]
    fn test_sms_and_find_shapes() {
        let sms = shape(Operation::sms("UP").plan("42"));
        assert_eq!(sms.command, "sms.send");
        assert_eq!(
            sms.params,
            json!({"coding": "SEVEN_BIT", "imei": "42", "message": "UP"})
        );

        let find = shape(Operation::FindByIdentity.plan("42"));
        assert_eq!(find.command, "thing.find");
        assert_eq!(find.params, json!({"imei": "42"}));
    }

    #[test]
    fn test_list_defaults_to_own_identity() {
        let list = shape(Operation::ListByIdentities { keys: vec![] }.plan("42"));
        assert_eq!(list.command, "thing.list");
        assert_eq!(list.params["keys"], json!(["42"]));
        assert_eq!(list.params["hideFields"], json!(true));
        assert_eq!(list.params["show"].as_array().map(Vec::len), Some(13));
    }

    #[test]
    fn test_raw_is_untouched() {
        let op = Operation::Raw {
            command: "alarm.history".into(),
            params: json!({"thingKey": "k"}),
        };
        let raw = shape(op.plan("42"));
        assert_eq!(raw.command, "alarm.history");
        assert_eq!(raw.params, json!({"thingKey": "k"}));
    }

    #[test]
    fn test_delay_and_stop_plans() {
        assert_eq!(
            Operation::Delay(Duration::from_millis(5)).plan("x"),
            ExecutionPlan::Sleep(Duration::from_millis(5))
        );
        assert_eq!(Operation::Stop.plan("x"), ExecutionPlan::Shutdown);
        assert!(Operation::Stop.is_stop());
    }
}
