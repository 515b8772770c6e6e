//! Cloud-to-device event codec.
//!
//! Inbound messages are parsed with [`C2dEvent::parse`] (or parsed and
//! dispatched in one step with [`Session::process_event`]). Only device
//! commands (`"ct": 0`) and OTA notifications (`"ct": 1`) are actionable;
//! every other type code is recognised by [`EventType`] but rejected.
//!
//! A command looks like:
//!
//! ```json
//! {"v":"2.1","ct":0,"cmd":"set-led on","ack":"5f7c2a0e-2a1d-4a53-8a85-b7f1c6c0d0a1"}
//! ```
//!
//! and an OTA notification like:
//!
//! ```json
//! {"v":"2.1","ct":1,"sw":"1.2.0","hw":"rev3","ack":"...",
//!  "urls":[{"url":"https://fw.example.com/app.bin?sig=...","fileName":"app.bin"}]}
//! ```
//!
//! Acknowledgements are built with [`create_cmd_ack_json`] and
//! [`create_ota_ack_json`].

#![allow(missing_docs)]
#![deny(unsafe_code)]

use core::sync::atomic::{AtomicBool, Ordering};

use alloc::vec::Vec;
use serde_json::Value;

use crate::config::{PROTOCOL_VERSION, Session};
use crate::error::{Error, Result};

mod ack;

pub use ack::{
    ACK_JSON_MAX_LEN, ACK_MESSAGE_MAX_LEN, AckJson, CMD_FAILED, CMD_SUCCESS, CMD_SUCCESS_WITH_ACK, OTA_DOWNLOAD_DONE,
    OTA_DOWNLOAD_FAILED, OTA_DOWNLOADING, OTA_FAILED, OTA_SUCCESS, create_cmd_ack_json,
    create_ota_ack_json,
};

const HTTPS_PREFIX: &str = "https://";

static VERSION_WARNING_LOGGED: AtomicBool = AtomicBool::new(false);

/// Message type codes (`"ct"`) defined by the 2.1 protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    DeviceCommand,
    DeviceOta,
    ModuleCommand,
    RefreshAttribute,
    /// Also used for twin updates.
    RefreshSetting,
    RefreshEdgeRule,
    RefreshChildDevice,
    DataFrequencyChange,
    DeviceDeleted,
    DeviceDisabled,
    DeviceReleased,
    StopOperation,
    StartHeartbeat,
    StopHeartbeat,
    Unknown(i64),
}

impl EventType {
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::DeviceCommand,
            1 => Self::DeviceOta,
            2 => Self::ModuleCommand,
            101 => Self::RefreshAttribute,
            102 => Self::RefreshSetting,
            103 => Self::RefreshEdgeRule,
            104 => Self::RefreshChildDevice,
            105 => Self::DataFrequencyChange,
            106 => Self::DeviceDeleted,
            107 => Self::DeviceDisabled,
            108 => Self::DeviceReleased,
            109 => Self::StopOperation,
            110 => Self::StartHeartbeat,
            111 => Self::StopHeartbeat,
            other => Self::Unknown(other),
        }
    }

    pub const fn code(self) -> i64 {
        match self {
            Self::DeviceCommand => 0,
            Self::DeviceOta => 1,
            Self::ModuleCommand => 2,
            Self::RefreshAttribute => 101,
            Self::RefreshSetting => 102,
            Self::RefreshEdgeRule => 103,
            Self::RefreshChildDevice => 104,
            Self::DataFrequencyChange => 105,
            Self::DeviceDeleted => 106,
            Self::DeviceDisabled => 107,
            Self::DeviceReleased => 108,
            Self::StopOperation => 109,
            Self::StartHeartbeat => 110,
            Self::StopHeartbeat => 111,
            Self::Unknown(code) => code,
        }
    }

    /// Whether this library can hand the event to a handler.
    pub const fn is_actionable(self) -> bool {
        matches!(self, Self::DeviceCommand | Self::DeviceOta)
    }
}

/// A device command.
#[derive(Debug)]
pub struct CommandEvent {
    root: Value,
}

impl CommandEvent {
    /// The `"cmd"` string, command name followed by its arguments.
    pub fn command(&self) -> Result<&str> {
        required_str(&self.root, "cmd")
    }

    pub fn ack_id(&self) -> Option<&str> {
        self.root.get("ack").and_then(Value::as_str)
    }
}

/// An over-the-air update notification.
#[derive(Debug)]
pub struct OtaEvent {
    root: Value,
}

impl OtaEvent {
    fn urls(&self) -> Result<&Vec<Value>> {
        self.root.get("urls").and_then(Value::as_array).ok_or_else(|| {
            error!("the \"urls\" array is not found in the c2d message");
            Error::ParsingError
        })
    }

    fn url_item(&self, index: usize) -> Result<&Value> {
        let urls = self.urls()?;
        urls.get(index).ok_or_else(|| {
            error!(
                "OTA url index {} is out of range, the message has {} urls",
                index,
                urls.len()
            );
            Error::BadValue
        })
    }

    pub fn url_count(&self) -> Result<usize> {
        Ok(self.urls()?.len())
    }

    /// Download URL at `index`. Elements may be bare strings or objects with
    /// a `"url"` member.
    pub fn url(&self, index: usize) -> Result<&str> {
        match self.url_item(index)? {
            Value::String(url) => Ok(url),
            item => required_str(item, "url"),
        }
    }

    /// Host part of the download URL at `index`.
    pub fn url_hostname(&self, index: usize) -> Result<&str> {
        split_https_url(self.url(index)?).map(|(host, _)| host)
    }

    /// Path and query of the download URL at `index`, starting with `/`.
    pub fn url_resource(&self, index: usize) -> Result<&str> {
        split_https_url(self.url(index)?).map(|(_, resource)| resource)
    }

    /// The `"fileName"` the firmware was uploaded with.
    pub fn original_filename(&self, index: usize) -> Result<&str> {
        required_str(self.url_item(index)?, "fileName")
    }

    pub fn sw_version(&self) -> Result<&str> {
        required_str(&self.root, "sw")
    }

    pub fn hw_version(&self) -> Result<&str> {
        required_str(&self.root, "hw")
    }

    pub fn ack_id(&self) -> Option<&str> {
        self.root.get("ack").and_then(Value::as_str)
    }
}

/// A classified inbound event.
///
/// Accessors for the other variant fail with [`Error::BadValue`].
#[derive(Debug)]
pub enum C2dEvent {
    Command(CommandEvent),
    Ota(OtaEvent),
}

impl C2dEvent {
    /// Parses and classifies a message.
    ///
    /// # Errors
    ///
    /// [`Error::ParsingError`] for malformed JSON, a missing or non-string
    /// `"v"`, a missing or non-numeric `"ct"`, or a type code other than
    /// command or OTA.
    pub fn parse(payload: impl AsRef<[u8]>) -> Result<Self> {
        let root: Value = serde_json::from_slice(payload.as_ref()).map_err(|_| {
            error!("c2d: JSON parsing error or out of memory while parsing the message");
            Error::ParsingError
        })?;

        let Some(version) = root.get("v").and_then(Value::as_str) else {
            error!("c2d: unable to parse the protocol version from the message");
            return Err(Error::ParsingError);
        };
        if version != PROTOCOL_VERSION && !VERSION_WARNING_LOGGED.load(Ordering::Relaxed) {
            VERSION_WARNING_LOGGED.store(true, Ordering::Relaxed);
            warn!("c2d: encountered potentially unsupported protocol version {}", version);
        }

        let Some(code) = root
            .get("ct")
            .and_then(|ct| ct.as_i64().or_else(|| ct.as_f64().map(|f| f as i64)))
        else {
            error!("c2d: unable to parse the message type (\"ct\")");
            return Err(Error::ParsingError);
        };

        match EventType::from_code(code) {
            EventType::DeviceCommand => Ok(Self::Command(CommandEvent { root })),
            EventType::DeviceOta => Ok(Self::Ota(OtaEvent { root })),
            _ => {
                warn!("c2d: received unsupported message type {}", code);
                Err(Error::ParsingError)
            }
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            Self::Command(_) => EventType::DeviceCommand,
            Self::Ota(_) => EventType::DeviceOta,
        }
    }

    /// The optional `"ack"` id. `None` means no acknowledgement is expected.
    pub fn ack_id(&self) -> Option<&str> {
        match self {
            Self::Command(cmd) => cmd.ack_id(),
            Self::Ota(ota) => ota.ack_id(),
        }
    }

    pub fn command(&self) -> Result<&str> {
        self.as_command("command")?.command()
    }

    pub fn ota_url_count(&self) -> Result<usize> {
        self.as_ota("URL count")?.url_count()
    }

    pub fn ota_url(&self, index: usize) -> Result<&str> {
        self.as_ota("OTA URL")?.url(index)
    }

    pub fn ota_url_hostname(&self, index: usize) -> Result<&str> {
        self.as_ota("OTA URL hostname")?.url_hostname(index)
    }

    pub fn ota_url_resource(&self, index: usize) -> Result<&str> {
        self.as_ota("OTA URL resource")?.url_resource(index)
    }

    pub fn ota_original_filename(&self, index: usize) -> Result<&str> {
        self.as_ota("OTA original filename")?.original_filename(index)
    }

    pub fn ota_sw_version(&self) -> Result<&str> {
        self.as_ota("sw version")?.sw_version()
    }

    pub fn ota_hw_version(&self) -> Result<&str> {
        self.as_ota("hw version")?.hw_version()
    }

    /// Releases the event before the handler returns.
    pub fn destroy(self) {
        drop(self);
    }

    fn as_command(&self, what: &str) -> Result<&CommandEvent> {
        match self {
            Self::Command(cmd) => Ok(cmd),
            Self::Ota(_) => {
                error!("c2d: requested the {} value of an OTA event", what);
                Err(Error::BadValue)
            }
        }
    }

    fn as_ota(&self, what: &str) -> Result<&OtaEvent> {
        match self {
            Self::Ota(ota) => Ok(ota),
            Self::Command(_) => {
                error!("c2d: requested the {} value of a command event", what);
                Err(Error::BadValue)
            }
        }
    }
}

impl Session {
    /// Parses an inbound message and hands it to the matching handler.
    ///
    /// The handler runs synchronously on the caller's stack and owns the
    /// event; it is dropped when the handler returns unless the handler
    /// released it earlier with [`C2dEvent::destroy`]. A missing handler is not
    /// an error.
    pub fn process_event(&self, payload: impl AsRef<[u8]>) -> Result<()> {
        let event = C2dEvent::parse(payload)?;
        self.ensure_valid("process_event")?;

        let events = self.events();
        match event {
            C2dEvent::Command(_) => {
                if let Some(handler) = events.command {
                    handler(self, event);
                }
            }
            C2dEvent::Ota(_) => {
                if let Some(handler) = events.ota {
                    handler(self, event);
                }
            }
        }
        Ok(())
    }
}

fn required_str<'a>(object: &'a Value, name: &str) -> Result<&'a str> {
    object.get(name).and_then(Value::as_str).ok_or_else(|| {
        error!("\"{}\" was not found in the c2d message", name);
        Error::MissingValue
    })
}

fn split_https_url(url: &str) -> Result<(&str, &str)> {
    let Some(rest) = url.strip_prefix(HTTPS_PREFIX) else {
        error!("the download URL is missing the leading \"https://\"");
        return Err(Error::ParsingError);
    };
    let Some(slash) = rest.find('/') else {
        error!("the download URL does not appear to be correctly formatted");
        return Err(Error::ParsingError);
    };
    Ok(rest.split_at(slash))
}
