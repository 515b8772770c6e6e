//! Identity REST API: resolves a device to its MQTT broker and topics.

use alloc::string::String;

use serde::Deserialize;

use super::url::UrlContext;
use crate::config::{DeviceTopology, Session};
use crate::error::{Error, Result};
use crate::util::try_format;

/// Path segment placed between the base URL and the DUID.
pub const IDENTITY_PREFIX: &str = "/uid/";

// Indexed by the `ec` value of the response.
const EC_MESSAGES: [&str; 11] = [
    "OK - No Error",
    "Device not found. Device is not whitelisted to platform.",
    "Device is not active.",
    "Un-Associated. Device has not any template associated with it.",
    "Device is not acquired. Device is created but it is in release state.",
    "Device is disabled. It's disabled from broker by Platform Admin",
    "Company not found as SID is not valid",
    "Subscription is expired.",
    "Connection Not Allowed.",
    "Invalid Bootstrap Certificate.",
    "Invalid Operational Certificate.",
];

/// Human readable description of an identity `ec` code.
pub fn error_code_message(ec: i64) -> &'static str {
    usize::try_from(ec)
        .ok()
        .and_then(|i| EC_MESSAGES.get(i))
        .copied()
        .unwrap_or("<Unknown Error>")
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    status: Option<i64>,
    d: Option<IdentityData>,
}

#[derive(Debug, Deserialize)]
struct IdentityData {
    ec: Option<i64>,
    p: Option<MqttParameters>,
}

#[derive(Debug, Deserialize)]
struct MqttParameters {
    un: Option<String>,
    h: Option<String>,
    id: Option<String>,
    topics: Option<Topics>,
}

#[derive(Debug, Deserialize)]
struct Topics {
    rpt: Option<String>,
    ack: Option<String>,
    c2d: Option<String>,
}

/// Points `base_url` at the identity endpoint of `duid` by setting the
/// suffix `/uid/{duid}`.
pub fn build_url(base_url: &mut UrlContext, duid: &str) -> Result<()> {
    if duid.is_empty() {
        error!("identity: DUID is required");
        return Err(Error::MissingValue);
    }
    let suffix = try_format(format_args!("{}{}", IDENTITY_PREFIX, duid))?;
    base_url.use_suffix_path(&suffix)
}

/// Fills the topic set of a custom-topology session from an identity
/// response.
///
/// The session must be initialised with [`DeviceTopology::Custom`] and its
/// topic set must still be empty. Other topologies are rejected without
/// touching their derived topics. Stray values in a custom session are
/// cleared before the [`Error::ConfigError`] is returned. On any other
/// failure the topic set is left empty.
///
/// # Errors
///
/// * [`Error::ConfigMissing`] if the session is not initialised.
/// * [`Error::ConfigError`] for a non-custom session or a pre-filled topic set.
/// * [`Error::ParsingError`] for malformed JSON or a missing field. Only
///   `un` is optional.
/// * [`Error::BadValue`] when `status` is not 200 or `ec` is non-zero.
pub fn configure_session(session: &mut Session, response: impl AsRef<[u8]>) -> Result<()> {
    session.ensure_valid("identity").inspect_err(|_| {
        error!("identity: configure the session in custom mode first");
    })?;
    if session.topology() != DeviceTopology::Custom {
        error!(
            "identity: expected a custom topology session, got {}",
            session.topology().as_str()
        );
        return Err(Error::ConfigError);
    }
    let topics = session.topics_mut()?;
    if !topics.is_empty() {
        warn!("identity: the session's MQTT configuration should not be set");
        topics.clear();
        return Err(Error::ConfigError);
    }

    let response: IdentityResponse = serde_json::from_slice(response.as_ref()).map_err(|_| {
        error!("identity: parsing error or out of memory while parsing the response");
        Error::ParsingError
    })?;

    let status = response.status.ok_or_else(|| missing_field("status"))?;
    if status != 200 {
        error!("identity: bad response status {}", status);
        return Err(Error::BadValue);
    }
    let data = response.d.ok_or_else(|| missing_field("d"))?;
    let ec = data.ec.ok_or_else(|| missing_field("ec"))?;
    if ec != 0 {
        error!(
            "identity: received error {}, message: {}",
            ec,
            error_code_message(ec)
        );
        return Err(Error::BadValue);
    }
    let params = data.p.ok_or_else(|| missing_field("p"))?;
    let t = params.topics.ok_or_else(|| missing_field("topics"))?;

    let host = params.h.ok_or_else(|| missing_field("h"))?;
    let client_id = params.id.ok_or_else(|| missing_field("id"))?;
    let report_topic = t.rpt.ok_or_else(|| missing_field("rpt"))?;
    let ack_topic = t.ack.ok_or_else(|| missing_field("ack"))?;
    let c2d_topic = t.c2d.ok_or_else(|| missing_field("c2d"))?;

    let topics = session.topics_mut()?;
    topics.username = params.un;
    topics.host = Some(host);
    topics.client_id = Some(client_id);
    topics.report_topic = Some(report_topic);
    topics.ack_topic = Some(ack_topic);
    topics.c2d_topic = Some(c2d_topic);
    Ok(())
}

fn missing_field(field: &str) -> Error {
    error!("identity: error while parsing the response field \"{}\"", field);
    Error::ParsingError
}
