//! Glue between the codecs and the integrator's MQTT client.
//!
//! The library never talks to a broker. Outbound messages are handed to the
//! [`MqttSend`](crate::config::MqttSend) function registered in the session;
//! inbound messages are pushed in through [`Session::receive`] by the
//! client's message callback.

#![deny(unsafe_code)]

use crate::c2d::{create_cmd_ack_json, create_ota_ack_json};
use crate::config::{MqttSend, Session};
use crate::error::{Error, Result};
use crate::telemetry::TelemetryMessage;
use crate::util::is_printable;

enum Route {
    Report,
    Ack,
}

impl Session {
    /// Serializes `message` and publishes it on the report topic.
    ///
    /// Fails with [`Error::ConfigMissing`] if the session is not initialised,
    /// has no report topic, or has no send function.
    pub fn send_telemetry(&self, message: &TelemetryMessage, pretty: bool) -> Result<()> {
        let (topic, send) = self.publish_route("send_telemetry", Route::Report)?;
        let payload = message.create_serialized_string(pretty)?;
        send(topic, &payload);
        Ok(())
    }

    /// Publishes a command acknowledgement on the ack topic.
    pub fn send_cmd_ack(&self, ack_id: &str, status: i32, message: Option<&str>) -> Result<()> {
        let (topic, send) = self.publish_route("send_cmd_ack", Route::Ack)?;
        let payload = create_cmd_ack_json(ack_id, status, message)?;
        send(topic, &payload);
        Ok(())
    }

    /// Publishes an OTA acknowledgement on the ack topic.
    pub fn send_ota_ack(&self, ack_id: &str, status: i32, message: Option<&str>) -> Result<()> {
        let (topic, send) = self.publish_route("send_ota_ack", Route::Ack)?;
        let payload = create_ota_ack_json(ack_id, status, message)?;
        send(topic, &payload);
        Ok(())
    }

    /// Entry point for every message the MQTT client receives.
    ///
    /// Returns [`Error::Ignored`] for topics other than the C2D subscription,
    /// so callers can route the message elsewhere.
    ///
    /// The topic is compared byte for byte with the configured C2D topic; MQTT
    /// wildcards are not expanded. Azure subscriptions end in `/#` and
    /// deliveries arrive on concrete topics below it, so Azure integrations
    /// should pass C2D messages to [`Session::receive_c2d`] directly.
    pub fn receive(&self, topic: &str, payload: impl AsRef<[u8]>) -> Result<()> {
        self.ensure_valid("receive")?;
        is_printable("receive: topic", topic.as_bytes(), self.printable_check_disabled())?;
        match self.topics().c2d_topic.as_deref() {
            Some(c2d) if !topic.is_empty() && c2d == topic => self.receive_c2d(payload),
            _ => {
                debug!("receive: ignoring message on topic {}", topic);
                Err(Error::Ignored)
            }
        }
    }

    /// Processes a payload already known to come from the C2D topic.
    pub fn receive_c2d(&self, payload: impl AsRef<[u8]>) -> Result<()> {
        let payload = payload.as_ref();
        is_printable("receive: payload", payload, self.printable_check_disabled())?;
        self.process_event(payload)
    }

    fn publish_route(&self, what: &str, route: Route) -> Result<(&str, MqttSend)> {
        self.ensure_valid(what)?;
        let topics = self.topics();
        let topic = match route {
            Route::Report => topics.report_topic.as_deref(),
            Route::Ack => topics.ack_topic.as_deref(),
        };
        let Some(topic) = topic else {
            error!("{}: the publish topic is not configured", what);
            return Err(Error::ConfigMissing);
        };
        let Some(send) = self.mqtt_send() else {
            error!("{}: no MQTT send function is configured", what);
            return Err(Error::ConfigMissing);
        };
        Ok((topic, send))
    }
}
