//! Acknowledgement JSON for commands and OTA updates.
//!
//! Status values follow what the 2.1 back end actually accepts, which differs
//! from the published reference table for commands.

use heapless::String;
use serde::Serialize;

use crate::error::{Error, Result};

/// Upper bound on a serialized ack document.
///
/// Acks are serialized into a fixed stack buffer of this size. With a [`MAX_ACK_LENGTH`](crate::config::MAX_ACK_LENGTH) ack id,
/// single digit status and no escaping, the message may be up to
/// [`ACK_MESSAGE_MAX_LEN`] bytes. Longer documents fail with
/// [`Error::Overflow`].
pub const ACK_JSON_MAX_LEN: usize = 512;

/// Longest unescaped message that fits next to a 36 character ack id.
pub const ACK_MESSAGE_MAX_LEN: usize = 435;

/// Serialized ack ready to publish on the ack topic.
pub type AckJson = String<ACK_JSON_MAX_LEN>;

pub const CMD_SUCCESS: i32 = 7;
pub const CMD_FAILED: i32 = 4;
/// Rarely needed; the back end treats it like [`CMD_SUCCESS`].
pub const CMD_SUCCESS_WITH_ACK: i32 = 7;

pub const OTA_SUCCESS: i32 = 0;
pub const OTA_FAILED: i32 = 1;
pub const OTA_DOWNLOADING: i32 = 2;
pub const OTA_DOWNLOAD_DONE: i32 = 3;
pub const OTA_DOWNLOAD_FAILED: i32 = 4;

const ACK_TYPE_COMMAND: u8 = 0;
const ACK_TYPE_OTA: u8 = 1;

#[derive(Serialize)]
struct AckBody<'a> {
    ack: &'a str,
    st: i32,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<&'a str>,
}

#[derive(Serialize)]
struct Ack<'a> {
    d: AckBody<'a>,
}

/// Builds `{"d":{"ack":..,"st":..,"type":0,"msg":..}}` for a command.
///
/// `message` is omitted from the document when `None` or empty.
///
/// # Errors
///
/// [`Error::MissingValue`] for an empty `ack_id`, [`Error::Overflow`] when the
/// document does not fit in [`ACK_JSON_MAX_LEN`] bytes. Messages longer than
/// [`ACK_MESSAGE_MAX_LEN`] should be truncated by the caller.
pub fn create_cmd_ack_json(ack_id: &str, status: i32, message: Option<&str>) -> Result<AckJson> {
    if ack_id.is_empty() {
        error!("create_cmd_ack_json: ack_id is required");
        return Err(Error::MissingValue);
    }
    create_ack(ACK_TYPE_COMMAND, ack_id, status, message)
}

/// Builds the ack document for an OTA update.
///
/// Same bounds and errors as [`create_cmd_ack_json`]: the document is capped
/// at [`ACK_JSON_MAX_LEN`] bytes.
pub fn create_ota_ack_json(ack_id: &str, status: i32, message: Option<&str>) -> Result<AckJson> {
    if ack_id.is_empty() {
        error!("create_ota_ack_json: ack_id is required");
        return Err(Error::MissingValue);
    }
    create_ack(ACK_TYPE_OTA, ack_id, status, message)
}

fn create_ack(kind: u8, ack_id: &str, status: i32, message: Option<&str>) -> Result<AckJson> {
    let ack = Ack {
        d: AckBody {
            ack: ack_id,
            st: status,
            kind,
            msg: message.filter(|m| !m.is_empty()),
        },
    };

    let mut buf = [0u8; ACK_JSON_MAX_LEN];
    let len = serde_json_core::to_slice(&ack, &mut buf).map_err(|_| {
        error!(
            "ack JSON does not fit in {} bytes, message length is {}",
            ACK_JSON_MAX_LEN,
            message.map_or(0, str::len)
        );
        Error::Overflow
    })?;
    let text = core::str::from_utf8(&buf[..len]).map_err(|_| Error::Failed)?;
    String::try_from(text).map_err(|_| Error::Overflow)
}
