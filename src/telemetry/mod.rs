//! Telemetry message builder.
//!
//! A message is a list of data sets, each optionally stamped with an
//! ISO-8601 time, serialized as:
//!
//! ```json
//! {"d":[{"dt":"2024-06-01T12:34:56.000Z","d":{"temperature":21.5,"gps":{"lat":45.2}}}]}
//! ```
//!
//! Values are addressed by paths with at most one `.`: `temperature` writes a
//! top-level field of the current data set and `gps.lat` writes `lat` inside
//! the `gps` object, creating it on first use.
//!
//! ```
//! use libiotconnect::config::{ClientConfig, DeviceConfig, DeviceTopology, Session};
//! use libiotconnect::telemetry::TelemetryMessage;
//!
//! let mut session = Session::new();
//! session
//!     .init(&ClientConfig {
//!         device: DeviceConfig { topology: DeviceTopology::Custom, ..Default::default() },
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! let mut msg = TelemetryMessage::create(&session).unwrap();
//! msg.set_bool("door.open", false).unwrap();
//! msg.set_number("temperature", 21.5).unwrap();
//! assert_eq!(
//!     msg.create_serialized_string(false).unwrap(),
//!     r#"{"d":[{"d":{"door":{"open":false},"temperature":21.5}}]}"#
//! );
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::config::Session;
use crate::error::{Error, Result};
use crate::util::{TimeSource, to_iso_timestamp, try_clone_str};

#[derive(Debug, Serialize)]
struct DataSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    dt: Option<String>,
    d: Map<String, Value>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    d: &'a [DataSet],
}

/// A telemetry document under construction.
///
/// Dropping the message releases it; serialized strings returned by
/// [`TelemetryMessage::create_serialized_string`] are independent of it.
#[derive(Debug)]
pub struct TelemetryMessage {
    data_sets: Vec<DataSet>,
    time_source: Option<TimeSource>,
}

impl TelemetryMessage {
    /// Creates an empty message.
    ///
    /// Fails with [`Error::ConfigMissing`] if `session` is not initialised.
    pub fn create(session: &Session) -> Result<Self> {
        session.ensure_valid("telemetry create")?;
        Ok(Self {
            data_sets: Vec::new(),
            time_source: session.time_source(),
        })
    }

    /// Starts a new data set; later `set_*` calls write into it.
    ///
    /// Without an explicit `timestamp` the session's time source is used, and
    /// without a time source the data set carries no `dt` at all so the
    /// server stamps it on receipt.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigError`] when the time source reports a time before
    /// 2024.
    pub fn add_data_set(&mut self, timestamp: Option<&str>) -> Result<()> {
        let dt = match (timestamp, self.time_source) {
            (Some(ts), _) => Some(try_clone_str(ts)?),
            (None, Some(now)) => Some(try_clone_str(&to_iso_timestamp(now())?)?),
            (None, None) => None,
        };
        self.data_sets.try_reserve(1)?;
        self.data_sets.push(DataSet { dt, d: Map::new() });
        Ok(())
    }

    pub fn data_set_count(&self) -> usize {
        self.data_sets.len()
    }

    pub fn set_number(&mut self, path: &str, value: f64) -> Result<()> {
        self.set("set_number", path, number_value(value))
    }

    pub fn set_string(&mut self, path: &str, value: &str) -> Result<()> {
        let value = try_clone_str(value)?;
        self.set("set_string", path, Value::String(value))
    }

    pub fn set_bool(&mut self, path: &str, value: bool) -> Result<()> {
        self.set("set_bool", path, Value::Bool(value))
    }

    pub fn set_null(&mut self, path: &str) -> Result<()> {
        self.set("set_null", path, Value::Null)
    }

    /// Renders the message, indented when `pretty` is set. A message without
    /// data sets renders as `{"d":[]}`.
    pub fn create_serialized_string(&self, pretty: bool) -> Result<String> {
        let envelope = Envelope { d: &self.data_sets };
        let rendered = if pretty {
            serde_json::to_string_pretty(&envelope)
        } else {
            serde_json::to_string(&envelope)
        };
        rendered.map_err(|_| {
            error!("create_serialized_string: serialization failed");
            Error::Failed
        })
    }

    /// Releases the message. Equivalent to dropping it.
    pub fn destroy(self) {
        drop(self);
    }

    fn set(&mut self, what: &str, path: &str, value: Value) -> Result<()> {
        let (parent, leaf) = self.locate(what, path)?;
        parent.insert(try_clone_str(leaf)?, value);
        Ok(())
    }

    // Returns the object that holds the leaf of `path` and the leaf name.
    // Nothing is modified unless the path is valid.
    fn locate<'p>(
        &mut self,
        what: &str,
        path: &'p str,
    ) -> Result<(&mut Map<String, Value>, &'p str)> {
        if path.is_empty() {
            error!("{}: the path argument is required", what);
            return Err(Error::MissingValue);
        }
        let split = split_path(path).inspect_err(|_| {
            error!("{}: path \"{}\" may hold one inner \".\" at most", what, path);
        })?;

        if self.data_sets.is_empty() {
            self.add_data_set(None)?;
        }
        let Some(current) = self.data_sets.last_mut() else {
            return Err(Error::Failed);
        };

        let Some((object_name, leaf)) = split else {
            return Ok((&mut current.d, path));
        };
        if !current.d.contains_key(object_name) {
            current
                .d
                .insert(try_clone_str(object_name)?, Value::Object(Map::new()));
        }
        match current.d.get_mut(object_name) {
            Some(Value::Object(parent)) => Ok((parent, leaf)),
            _ => {
                error!("{}: \"{}\" already holds a non-object value", what, object_name);
                Err(Error::BadValue)
            }
        }
    }
}

// `Ok(None)` for a plain name, `Ok(Some((object, leaf)))` for `object.leaf`.
fn split_path(path: &str) -> Result<Option<(&str, &str)>> {
    match path.split_once('.') {
        None => Ok(None),
        Some((object, leaf)) if object.is_empty() || leaf.is_empty() || leaf.contains('.') => {
            Err(Error::BadValue)
        }
        Some(split) => Ok(Some(split)),
    }
}

// Integral values are written without a fraction; NaN and infinities become null.
fn number_value(value: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if (-MAX_EXACT..=MAX_EXACT).contains(&value) && (value as i64) as f64 == value {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}
