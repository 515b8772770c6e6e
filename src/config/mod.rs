//! Session configuration and MQTT topic derivation.
//!
//! A [`Session`] is the explicit replacement for a process-wide configuration
//! singleton. The integrator constructs one, initialises it with a
//! [`ClientConfig`] before connecting, passes it by reference to every other
//! operation, and deinitialises it after disconnecting.
//!
//! For the four cloud-specific topologies, [`Session::init`] derives every
//! MQTT string from the device identifiers:
//!
//! | Topology | report topic | ack topic | subscribe topic | username |
//! |---|---|---|---|---|
//! | AWS | `$aws/rules/msg_d2c_rpt/{clientId}/2.1/0` | `$aws/rules/msg_d2c_ack/{clientId}/2.1/6` | `iot/{clientId}/cmd` | none |
//! | Azure | `devices/{clientId}/messages/events/cd={cd}&v=2.1&mt=0` | same with `mt=6` | `devices/{clientId}/messages/devicebound/#` | `{host}/{clientId}/?api-version=2018-06-30` |
//!
//! The client id is the DUID for dedicated instances and `{cpid}-{duid}` for
//! shared ones. [`DeviceTopology::Custom`] skips derivation entirely; the topic
//! set is then filled by [`crate::rest::identity::configure_session`] or by hand
//! through [`Session::topics_mut`].
//!
//! ```
//! use libiotconnect::config::{ClientConfig, DeviceConfig, DeviceTopology, Session};
//!
//! let mut session = Session::new();
//! session
//!     .init(&ClientConfig {
//!         device: DeviceConfig {
//!             topology: DeviceTopology::AwsDedicated,
//!             duid: Some("sensor-01"),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! assert_eq!(session.topics().c2d_topic.as_deref(), Some("iot/sensor-01/cmd"));
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

use alloc::string::String;

use crate::c2d::C2dEvent;
use crate::error::{Error, Result};
use crate::util::{IsoTimestamp, TimeSource, to_iso_timestamp, try_clone_str, try_format};

#[cfg(test)]
mod tests;

/// TLS port used by every supported broker.
pub const MQTT_PORT: u16 = 8883;
/// Message protocol version spoken by this library.
pub const PROTOCOL_VERSION: &str = "2.1";

/// Maximum DUID length accepted by the platform.
pub const DUID_MAX_LEN: usize = 64;
/// Maximum CPID length accepted by the platform.
pub const CPID_MAX_LEN: usize = 63;
/// Maximum environment name length accepted by the platform.
pub const ENV_MAX_LEN: usize = 20;
/// Maximum MQTT client id length: `{cpid}-{duid}` plus headroom.
pub const CLIENT_ID_MAX_LEN: usize = 128;
/// Longest ack id the platform generates.
pub const MAX_ACK_LENGTH: usize = 36;

/// Publishes `payload` on `topic`. Failures are the transport's concern.
pub type MqttSend = fn(topic: &str, payload: &str);
/// Receives a device command. The event is released when the handler returns.
pub type CommandHandler = fn(session: &Session, event: C2dEvent);
/// Receives an OTA notification. The event is released when the handler returns.
pub type OtaHandler = fn(session: &Session, event: C2dEvent);

/// The cloud instance layout the device connects to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DeviceTopology {
    /// Not configured. Rejected by [`Session::init`].
    #[default]
    Undefined,
    /// Multi-tenant AWS instance.
    AwsShared,
    /// Single-tenant AWS instance.
    AwsDedicated,
    /// Multi-tenant Azure instance.
    AzureShared,
    /// Single-tenant Azure instance.
    AzureDedicated,
    /// Topics are supplied externally, for example from the identity REST API.
    Custom,
}

impl DeviceTopology {
    /// Shared instances prefix the client id with the CPID.
    pub const fn is_shared(self) -> bool {
        matches!(self, Self::AwsShared | Self::AzureShared)
    }

    /// Azure instances need `cd` and a username.
    pub const fn is_azure(self) -> bool {
        matches!(self, Self::AzureShared | Self::AzureDedicated)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::AwsShared => "AwsShared",
            Self::AwsDedicated => "AwsDedicated",
            Self::AzureShared => "AzureShared",
            Self::AzureDedicated => "AzureDedicated",
            Self::Custom => "Custom",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceTopology {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// Device identity as provisioned on the platform.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig<'a> {
    pub topology: DeviceTopology,
    /// Device unique id. Required unless the topology is custom.
    pub duid: Option<&'a str>,
    /// Company id. Required for shared topologies.
    pub cpid: Option<&'a str>,
    /// Message tag. Required for Azure topologies.
    pub cd: Option<&'a str>,
    /// Broker host. Only used to derive the Azure username.
    pub host: Option<&'a str>,
}

/// Callbacks invoked by [`Session::process_event`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EventHandlers {
    pub command: Option<CommandHandler>,
    pub ota: Option<OtaHandler>,
}

/// Everything [`Session::init`] needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClientConfig<'a> {
    pub device: DeviceConfig<'a>,
    pub events: EventHandlers,
    /// Used by the `send_*` helpers. Without it they return
    /// [`Error::ConfigMissing`].
    pub mqtt_send: Option<MqttSend>,
    /// Stamps telemetry data sets that were not given an explicit timestamp.
    pub time_source: Option<TimeSource>,
    /// Skip the printable-character screening of inbound topics and payloads.
    pub disable_printable_check: bool,
}

/// Owned MQTT connection strings.
///
/// Every field starts out `None`. After a successful non-custom
/// [`Session::init`] the client id and the three topics are always present.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MqttTopicSet {
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub host: Option<String>,
    pub report_topic: Option<String>,
    pub ack_topic: Option<String>,
    pub c2d_topic: Option<String>,
    pub cd: Option<String>,
    pub version: Option<String>,
}

impl MqttTopicSet {
    pub fn report_topic_len(&self) -> usize {
        self.report_topic.as_deref().map_or(0, str::len)
    }

    pub fn ack_topic_len(&self) -> usize {
        self.ack_topic.as_deref().map_or(0, str::len)
    }

    pub fn c2d_topic_len(&self) -> usize {
        self.c2d_topic.as_deref().map_or(0, str::len)
    }

    /// True when none of the connection strings are set.
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none()
            && self.username.is_none()
            && self.host.is_none()
            && self.report_topic.is_none()
            && self.ack_topic.is_none()
            && self.c2d_topic.is_none()
    }

    /// Releases every string.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn derive(device: &DeviceConfig<'_>) -> Result<Self> {
        let duid = device.duid.unwrap_or_default();
        let client_id = if device.topology.is_shared() {
            try_format(format_args!("{}-{}", device.cpid.unwrap_or_default(), duid))?
        } else {
            try_clone_str(duid)?
        };

        let mut set = MqttTopicSet::default();
        if device.topology.is_azure() {
            let cd = device.cd.unwrap_or_default();
            if let Some(host) = device.host.filter(|h| !h.is_empty()) {
                set.username = Some(try_format(format_args!(
                    "{}/{}/?api-version=2018-06-30",
                    host, client_id
                ))?);
                set.host = Some(try_clone_str(host)?);
            }
            set.report_topic = Some(try_format(format_args!(
                "devices/{}/messages/events/cd={}&v=2.1&mt=0",
                client_id, cd
            ))?);
            set.ack_topic = Some(try_format(format_args!(
                "devices/{}/messages/events/cd={}&v=2.1&mt=6",
                client_id, cd
            ))?);
            set.c2d_topic = Some(try_format(format_args!(
                "devices/{}/messages/devicebound/#",
                client_id
            ))?);
            set.cd = Some(try_clone_str(cd)?);
            set.version = Some(try_clone_str(PROTOCOL_VERSION)?);
        } else {
            set.report_topic = Some(try_format(format_args!(
                "$aws/rules/msg_d2c_rpt/{}/2.1/0",
                client_id
            ))?);
            set.ack_topic = Some(try_format(format_args!(
                "$aws/rules/msg_d2c_ack/{}/2.1/6",
                client_id
            ))?);
            set.c2d_topic = Some(try_format(format_args!("iot/{}/cmd", client_id))?);
        }
        set.client_id = Some(client_id);
        Ok(set)
    }
}

/// Library state shared by every codec operation.
///
/// `init` and `deinit` need exclusive access; everything else borrows the
/// session immutably, so reconfiguring while messages are in flight is
/// rejected by the borrow checker.
#[derive(Debug, Default)]
pub struct Session {
    valid: bool,
    topology: DeviceTopology,
    topics: MqttTopicSet,
    events: EventHandlers,
    mqtt_send: Option<MqttSend>,
    time_source: Option<TimeSource>,
    disable_printable_check: bool,
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(str::is_empty)
}

impl Session {
    /// An unconfigured session.
    pub const fn new() -> Self {
        Self {
            valid: false,
            topology: DeviceTopology::Undefined,
            topics: MqttTopicSet {
                client_id: None,
                username: None,
                host: None,
                report_topic: None,
                ack_topic: None,
                c2d_topic: None,
                cd: None,
                version: None,
            },
            events: EventHandlers {
                command: None,
                ota: None,
            },
            mqtt_send: None,
            time_source: None,
            disable_printable_check: false,
        }
    }

    /// Validates `config` and derives the topic set.
    ///
    /// Any previous configuration is dropped first. On failure the session is
    /// left deinitialised.
    ///
    /// # Errors
    ///
    /// * [`Error::ConfigError`] for [`DeviceTopology::Undefined`].
    /// * [`Error::MissingValue`] when `duid` (non-custom), `cpid` (shared) or
    ///   `cd` (Azure) is absent or empty.
    /// * [`Error::OutOfMemory`] if a topic string cannot be allocated.
    pub fn init(&mut self, config: &ClientConfig<'_>) -> Result<()> {
        self.deinit();

        let device = &config.device;
        let topology = device.topology;
        if topology == DeviceTopology::Undefined {
            error!("init: invalid device topology {}", topology.as_str());
            return Err(Error::ConfigError);
        }
        let is_custom = topology == DeviceTopology::Custom;
        if !is_custom && is_blank(device.duid) {
            error!("init: DUID is required");
            return Err(Error::MissingValue);
        }
        if topology.is_shared() && is_blank(device.cpid) {
            error!("init: CPID is required for shared instance configuration");
            return Err(Error::MissingValue);
        }
        if topology.is_azure() && is_blank(device.cd) {
            error!("init: CD is required for Azure instance configuration");
            return Err(Error::MissingValue);
        }

        if !is_custom {
            match MqttTopicSet::derive(device) {
                Ok(topics) => self.topics = topics,
                Err(e) => {
                    error!("init: out of memory while allocating topic strings");
                    self.deinit();
                    return Err(e);
                }
            }
        }

        self.topology = topology;
        self.events = config.events;
        self.mqtt_send = config.mqtt_send;
        self.time_source = config.time_source;
        self.disable_printable_check = config.disable_printable_check;
        self.valid = true;
        Ok(())
    }

    /// [`Session::init`] followed by an info-level dump of the device values.
    pub fn init_and_log_config(&mut self, config: &ClientConfig<'_>) -> Result<()> {
        self.init(config)?;
        let device = &config.device;
        info!("-- Device Config --");
        info!("Topology: {}", device.topology.as_str());
        log_if_set("DUID", device.duid);
        log_if_set("CPID", device.cpid);
        log_if_set("CD  ", device.cd);
        log_if_set("Host", device.host);
        Ok(())
    }

    /// Releases every owned string and returns to the unconfigured state.
    /// Idempotent.
    pub fn deinit(&mut self) {
        *self = Self::new();
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn topology(&self) -> DeviceTopology {
        self.topology
    }

    /// The current topic set. Logs a missing-configuration error when the
    /// session is not initialised, but still returns the (empty) set.
    pub fn topics(&self) -> &MqttTopicSet {
        if !self.valid {
            error!("topics: the session is not configured");
        }
        &self.topics
    }

    /// Mutable access for custom topologies that populate topics by hand.
    pub fn topics_mut(&mut self) -> Result<&mut MqttTopicSet> {
        if !self.valid {
            error!("topics_mut: the session is not configured");
            return Err(Error::ConfigMissing);
        }
        Ok(&mut self.topics)
    }

    pub fn events(&self) -> &EventHandlers {
        &self.events
    }

    pub fn mqtt_send(&self) -> Option<MqttSend> {
        self.mqtt_send
    }

    pub fn time_source(&self) -> Option<TimeSource> {
        self.time_source
    }

    pub fn printable_check_disabled(&self) -> bool {
        self.disable_printable_check
    }

    /// The time source's current reading as `YYYY-MM-DDTHH:MM:SS.000Z`.
    ///
    /// # Errors
    ///
    /// * [`Error::ConfigMissing`] if the session is not initialised.
    /// * [`Error::ConfigError`] without a time source, or when it reports a
    ///   time before 2024.
    pub fn iso_timestamp_now(&self) -> Result<IsoTimestamp> {
        self.ensure_valid("iso_timestamp_now")?;
        let Some(now) = self.time_source else {
            error!("iso_timestamp_now: no time source is configured");
            return Err(Error::ConfigError);
        };
        to_iso_timestamp(now())
    }

    /// Logs the MQTT connection strings at info level.
    pub fn log_config(&self) {
        if !self.valid {
            error!("log_config: the session is not configured");
            return;
        }
        let t = &self.topics;
        info!("-- MQTT Config --");
        log_if_set("Client ID", t.client_id.as_deref());
        log_if_set("Username ", t.username.as_deref());
        log_if_set("Host     ", t.host.as_deref());
        log_if_set("Pub RPT  ", t.report_topic.as_deref());
        log_if_set("Pub ACK  ", t.ack_topic.as_deref());
        log_if_set("Sub C2D  ", t.c2d_topic.as_deref());
    }

    pub(crate) fn ensure_valid(&self, what: &str) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            error!("{}: the session is not configured", what);
            Err(Error::ConfigMissing)
        }
    }
}

fn log_if_set(heading: &str, value: Option<&str>) {
    if let Some(value) = value {
        info!("{}: {}", heading, value);
    }
}
