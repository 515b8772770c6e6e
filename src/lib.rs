//! # libiotconnect - IoTConnect device protocol core
//!
//! Encodes and decodes the IoTConnect 2.1 device message protocol for
//! resource-constrained devices. The library produces topic and payload
//! strings and consumes received payloads; the MQTT, TLS and HTTPS transports
//! stay with the integrator.
//!
//! ## Components
//!
//! - [`config`]: the [`Session`](config::Session) holding MQTT client id,
//!   username and topics derived from the device topology
//! - [`telemetry`]: builder for time-bucketed telemetry documents with
//!   dotted-path addressing
//! - [`c2d`]: cloud-to-device command and OTA event parsing, dispatch and
//!   acknowledgements
//! - [`mqtt`]: publish and receive routing through the session's topics
//! - [`rest`]: discovery and identity REST bootstrap for custom topologies
//!
//! ## Usage
//!
//! ```rust
//! use libiotconnect::c2d::{C2dEvent, CMD_SUCCESS};
//! use libiotconnect::config::{ClientConfig, DeviceConfig, DeviceTopology, EventHandlers, Session};
//! use libiotconnect::telemetry::TelemetryMessage;
//!
//! fn publish(topic: &str, payload: &str) {
//!     // hand over to the MQTT client
//!     let _ = (topic, payload);
//! }
//!
//! fn on_command(session: &Session, event: C2dEvent) {
//!     if let Some(ack) = event.ack_id() {
//!         let _ = session.send_cmd_ack(ack, CMD_SUCCESS, None);
//!     }
//! }
//!
//! let mut session = Session::new();
//! session
//!     .init(&ClientConfig {
//!         device: DeviceConfig {
//!             topology: DeviceTopology::AwsShared,
//!             duid: Some("sensor-01"),
//!             cpid: Some("ACME"),
//!             ..Default::default()
//!         },
//!         events: EventHandlers { command: Some(on_command), ota: None },
//!         mqtt_send: Some(publish),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! let mut msg = TelemetryMessage::create(&session).unwrap();
//! msg.set_number("temperature", 21.5).unwrap();
//! session.send_telemetry(&msg, false).unwrap();
//!
//! session
//!     .receive("iot/ACME-sensor-01/cmd", r#"{"v":"2.1","ct":0,"cmd":"reboot","ack":"a1"}"#)
//!     .unwrap();
//! ```
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `log`: Route diagnostics through the `log` facade
//! - `defmt`: Route diagnostics through `defmt` for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod error;
pub mod util;

/// Session state and MQTT topic derivation.
pub mod config;

/// Telemetry document builder.
pub mod telemetry;

/// Cloud-to-device events and acknowledgements.
pub mod c2d;

/// Publish and receive routing.
pub mod mqtt;

/// Discovery and identity REST bootstrap.
pub mod rest;

pub use error::{Error, Result};
