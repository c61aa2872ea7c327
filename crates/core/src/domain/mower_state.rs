//! Mower state projection
//!
//! Folds `thing.find` / `thing.list` payloads into the latest known
//! position, connectivity and info blob of a mower. Position sources are
//! ranked: an on-demand trace fix first, then the robot state alarm, then
//! the plain location record.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Primary timestamp format used by the API
pub const DATETIME_FORMAT_DEFAULT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Fallback timestamp format (no fractional seconds)
pub const DATETIME_FORMAT_FALLBACK: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Location timestamp, kept raw when the API sends something unparseable
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    Parsed(DateTime<FixedOffset>),
    Raw(String),
}

impl Timestamp {
    pub fn parse(raw: &str) -> Self {
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, DATETIME_FORMAT_DEFAULT))
            .or_else(|_| DateTime::parse_from_str(raw, DATETIME_FORMAT_FALLBACK))
            .map(Timestamp::Parsed)
            .unwrap_or_else(|_| Timestamp::Raw(raw.to_string()))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Self::parse(s)),
            other => Some(Timestamp::Raw(other.to_string())),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Parsed(dt) => write!(f, "{}", dt.to_rfc3339()),
            Timestamp::Raw(s) => f.write_str(s),
        }
    }
}

/// Where the current coordinates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    TraceFix,
    RobotState,
    Location,
}

impl fmt::Display for PositionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSource::TraceFix => write!(f, "loc(trace)"),
            PositionSource::RobotState => write!(f, "alarms.robot_state"),
            PositionSource::Location => write!(f, "loc"),
        }
    }
}

/// Lookup that last changed the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lookup {
    #[serde(rename = "thing.find")]
    Find,
    #[serde(rename = "thing.list")]
    List,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Find => write!(f, "thing.find"),
            Lookup::List => write!(f, "thing.list"),
        }
    }
}

/// Latest known state of one mower
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MowerState {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub connected: Option<bool>,
    pub loc_updated: Option<Timestamp>,
    pub position_source: Option<PositionSource>,
    pub info: Option<Value>,
    pub source: Option<Lookup>,
}

struct Fix<'a> {
    latitude: f64,
    longitude: f64,
    when: Option<&'a Value>,
    source: PositionSource,
}

impl MowerState {
    /// Apply the `params` of a `thing.find` response; returns true if anything changed
    pub fn apply_find(&mut self, params: &Value) -> bool {
        self.apply_thing(params, Lookup::Find)
    }

    /// Apply the `params` of a `thing.list` response (first result only)
    pub fn apply_list(&mut self, params: &Value) -> bool {
        let first = params
            .get("result")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .cloned()
            .unwrap_or(Value::Null);
        self.apply_thing(&first, Lookup::List)
    }

    /// Human-readable "lat,lng" or "unknown"
    pub fn location_label(&self) -> String {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => format!("{},{}", lat, lng),
            _ => "unknown".to_string(),
        }
    }

    pub fn connectivity_label(&self) -> &'static str {
        match self.connected {
            Some(true) => "connected",
            Some(false) => "disconnected",
            None => "unknown",
        }
    }

    fn apply_thing(&mut self, thing: &Value, lookup: Lookup) -> bool {
        let mut changed = false;
        let fix = best_fix(thing);

        if let Some(fix) = &fix {
            let lat = round6(fix.latitude);
            let lng = round6(fix.longitude);
            if self.latitude != Some(lat) || self.longitude != Some(lng) {
                self.latitude = Some(lat);
                self.longitude = Some(lng);
                changed = true;
            }
        }

        if let Some(connected) = thing.get("connected").and_then(truthiness) {
            if self.connected != Some(connected) {
                self.connected = Some(connected);
                changed = true;
            }
        }

        let when = fix
            .as_ref()
            .and_then(|f| f.when)
            .and_then(Timestamp::from_value);
        if let Some(when) = when {
            if self.loc_updated.as_ref() != Some(&when) {
                self.loc_updated = Some(when);
                changed = true;
            }
        }

        if let Some(fix) = &fix {
            if self.position_source != Some(fix.source) {
                self.position_source = Some(fix.source);
                changed = true;
            }
        }

        let has_info = thing.as_object().is_some_and(|o| !o.is_empty());
        if has_info && self.info.as_ref() != Some(thing) {
            self.info = Some(thing.clone());
            changed = true;
        }

        if changed {
            self.source = Some(lookup);
        }
        changed
    }
}

fn best_fix(thing: &Value) -> Option<Fix<'_>> {
    let loc = thing.get("loc");
    let loc_lat = loc.and_then(|l| l.get("lat")).and_then(coordinate);
    let loc_lng = loc.and_then(|l| l.get("lng")).and_then(coordinate);
    let loc_when = present(thing.get("locUpdated")).or_else(|| present(loc?.get("since")));
    let is_trace = loc
        .and_then(|l| l.get("corrId"))
        .and_then(Value::as_str)
        .is_some_and(|corr| corr == "trace");

    let robot = thing.pointer("/alarms/robot_state");
    let rs_lat = robot.and_then(|r| r.get("lat")).and_then(coordinate);
    let rs_lng = robot.and_then(|r| r.get("lng")).and_then(coordinate);
    let rs_when = robot.and_then(|r| present(r.get("ts")).or_else(|| present(r.get("since"))));

    let fix = |latitude, longitude, when, source| Fix {
        latitude,
        longitude,
        when,
        source,
    };

    match (loc_lat, loc_lng, rs_lat, rs_lng) {
        (Some(lat), Some(lng), _, _) if is_trace => {
            Some(fix(lat, lng, loc_when, PositionSource::TraceFix))
        }
        (_, _, Some(lat), Some(lng)) => Some(fix(lat, lng, rs_when, PositionSource::RobotState)),
        (Some(lat), Some(lng), _, _) => Some(fix(lat, lng, loc_when, PositionSource::Location)),
        _ => None,
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn coordinate(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|v: &f64| v.is_finite())
}

fn truthiness(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
        Value::String(s) => Some(!s.is_empty()),
        Value::Array(a) => Some(!a.is_empty()),
        Value::Object(o) => Some(!o.is_empty()),
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
