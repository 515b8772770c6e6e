//! Mutable REST URL buffer.

use alloc::string::String;

use crate::error::{Error, Result};
use crate::util::try_clone_str;

const HTTPS_SCHEME: &str = "https://";
const HTTP_SCHEME: &str = "http://";

/// An absolute URL whose path can be extended with a replaceable suffix.
///
/// The URL buffer is allocated with `slack` spare bytes so that suffixes up
/// to that length are written in place. A longer suffix reallocates the
/// buffer once, to exactly the size it needs. An empty suffix restores the
/// base URL.
///
/// ```
/// use libiotconnect::rest::url::UrlContext;
///
/// let mut url = UrlContext::with_slack("https://host/api/v2.1/base", 16).unwrap();
/// assert_eq!(url.hostname(), "host");
/// assert_eq!(url.resource(), "/api/v2.1/base");
///
/// url.use_suffix_path("/uid/abc").unwrap();
/// assert_eq!(url.url(), "https://host/api/v2.1/base/uid/abc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlContext {
    url: String,
    hostname: String,
    path_start: usize,
    suffix_start: usize,
    is_https: bool,
}

impl UrlContext {
    /// Parses `url` without spare capacity.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_slack(url, 0)
    }

    /// Parses `url` and reserves `slack` extra bytes for suffixes.
    ///
    /// # Errors
    ///
    /// * [`Error::MissingValue`] for an empty URL.
    /// * [`Error::ParsingError`] without an `http://` or `https://` scheme, or
    ///   without a `/` after the host.
    /// * [`Error::OutOfMemory`] if a buffer cannot be allocated.
    pub fn with_slack(url: &str, slack: usize) -> Result<Self> {
        if url.is_empty() {
            error!("URL: the URL is empty");
            return Err(Error::MissingValue);
        }
        let (is_https, scheme_len) = if url.starts_with(HTTPS_SCHEME) {
            (true, HTTPS_SCHEME.len())
        } else if url.starts_with(HTTP_SCHEME) {
            (false, HTTP_SCHEME.len())
        } else {
            error!("URL: unable to parse the scheme of \"{}\"", url);
            return Err(Error::ParsingError);
        };
        let Some(host_len) = url[scheme_len..].find('/') else {
            error!("URL: no path after the host in \"{}\"", url);
            return Err(Error::ParsingError);
        };
        let path_start = scheme_len + host_len;

        let capacity = url.len().checked_add(slack).ok_or(Error::Overflow)?;
        let mut buffer = String::new();
        buffer.try_reserve_exact(capacity).inspect_err(|_| {
            error!("URL: out of memory while allocating the URL buffer");
        })?;
        buffer.push_str(url);
        let hostname = try_clone_str(&url[scheme_len..path_start])?;

        Ok(Self {
            url: buffer,
            hostname,
            path_start,
            suffix_start: url.len(),
            is_https,
        })
    }

    /// The full URL including the current suffix.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Everything from the first `/` after the host, suffix included.
    pub fn resource(&self) -> &str {
        &self.url[self.path_start..]
    }

    pub fn is_https(&self) -> bool {
        self.is_https
    }

    /// Bytes the URL buffer can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.url.capacity()
    }

    /// Replaces the suffix after the base URL with `suffix`.
    ///
    /// On allocation failure the URL is left at its base and
    /// [`Error::OutOfMemory`] is returned.
    pub fn use_suffix_path(&mut self, suffix: &str) -> Result<()> {
        self.url.truncate(self.suffix_start);
        if self.url.capacity() - self.suffix_start < suffix.len() {
            self.url.try_reserve_exact(suffix.len()).inspect_err(|_| {
                error!("URL: out of memory while growing the buffer for suffix {}", suffix);
            })?;
        }
        self.url.push_str(suffix);
        Ok(())
    }
}
