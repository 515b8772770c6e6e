//! Discovery REST API: resolves a company and environment to the base URL
//! of the device agent API.

use alloc::string::String;

use serde::Deserialize;

use super::url::UrlContext;
use crate::error::{Error, Result};
use crate::util::try_format;

/// Default discovery host for AWS instances.
pub const DISCOVERY_HOST_AWS: &str = "awsdiscovery.iotconnect.io";
/// Default discovery host for Azure instances.
pub const DISCOVERY_HOST_AZURE: &str = "discovery.iotconnect.io";

/// Error code the server returns for an expired subscription.
pub const EC_SUBSCRIPTION_EXPIRED: i64 = 3;

/// How a discovery response is turned into a base URL.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Spare bytes reserved in the base URL buffer for the identity suffix.
    pub slack: usize,
    /// Accept responses that report an expired subscription. Some instances
    /// report this while still serving devices.
    pub ignore_subscription_expired: bool,
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    status: Option<i64>,
    message: Option<String>,
    d: Option<DiscoveryData>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryData {
    ec: Option<i64>,
    bu: Option<String>,
}

/// Discovery URL for a custom discovery `host`.
///
/// All arguments are required; an empty one is [`Error::MissingValue`].
pub fn url_with_host(host: &str, cpid: &str, env: &str) -> Result<UrlContext> {
    if host.is_empty() || cpid.is_empty() || env.is_empty() {
        error!("discovery: host, cpid and env arguments are required");
        return Err(Error::MissingValue);
    }
    let url = try_format(format_args!(
        "https://{}/api/v2.1/dsdk/cpId/{}/env/{}",
        host, cpid, env
    ))?;
    UrlContext::new(&url)
}

/// Discovery URL on the default AWS host.
pub fn url_aws(cpid: &str, env: &str) -> Result<UrlContext> {
    url_with_host(DISCOVERY_HOST_AWS, cpid, env)
}

/// Discovery URL on the default Azure host.
pub fn url_azure(cpid: &str, env: &str) -> Result<UrlContext> {
    url_with_host(DISCOVERY_HOST_AZURE, cpid, env)
}

/// Extracts the base URL from a discovery response.
///
/// Expects `{"status":200,"message":..,"d":{"ec":0,"bu":"<base url>"}}`.
///
/// # Errors
///
/// * [`Error::ParsingError`] for malformed JSON or a missing field.
/// * [`Error::BadValue`] when `status` is not 200 or `ec` is non-zero. The
///   server message is logged.
/// * Any error of [`UrlContext::with_slack`] for the returned base URL.
pub fn parse_response(response: impl AsRef<[u8]>, options: &DiscoveryOptions) -> Result<UrlContext> {
    let response: DiscoveryResponse = serde_json::from_slice(response.as_ref()).map_err(|_| {
        error!("discovery: parsing error or out of memory while parsing the response");
        Error::ParsingError
    })?;

    let status = response.status.ok_or_else(|| missing_field("status"))?;
    if status != 200 {
        error!("discovery: received status {}. Incorrect environment name?", status);
        return Err(Error::BadValue);
    }
    let message = response.message.as_deref().unwrap_or("");
    let data = response.d.ok_or_else(|| missing_field("d"))?;
    let ec = data.ec.ok_or_else(|| missing_field("ec"))?;

    if ec == EC_SUBSCRIPTION_EXPIRED && options.ignore_subscription_expired {
        warn!("discovery: received error {}, server message was \"{}\". Ignoring", ec, message);
    } else if ec != 0 {
        error!("discovery: received error {}, server message was \"{}\"", ec, message);
        return Err(Error::BadValue);
    }

    let base_url = data.bu.ok_or_else(|| missing_field("bu"))?;
    UrlContext::with_slack(&base_url, options.slack).inspect_err(|_| {
        error!("discovery: unable to initialize the base URL from the response");
    })
}

fn missing_field(field: &str) -> Error {
    error!("discovery: error while parsing the response field \"{}\"", field);
    Error::ParsingError
}
