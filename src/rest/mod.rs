//! Device REST API bootstrap.
//!
//! A device that only knows its company id, environment and DUID resolves its
//! broker settings in two HTTPS calls performed by the integrator:
//!
//! 1. GET the URL from [`discovery::url_aws`] (or [`discovery::url_azure`])
//!    and pass the body to [`discovery::parse_response`], which yields the
//!    base URL of the device agent API as a [`url::UrlContext`].
//! 2. Append the device path with [`identity::build_url`], GET that URL and
//!    pass the body to [`identity::configure_session`], which fills the topic
//!    set of a [`Session`](crate::config::Session) initialised with the custom
//!    topology.
//!
//! ```
//! use libiotconnect::config::{ClientConfig, DeviceConfig, DeviceTopology, Session};
//! use libiotconnect::rest::{discovery, identity};
//!
//! let options = discovery::DiscoveryOptions { slack: 32, ..Default::default() };
//! let mut base = discovery::parse_response(
//!     r#"{"status":200,"message":"Success","d":{"ec":0,"bu":"https://host/api/v2.1/base"}}"#,
//!     &options,
//! )
//! .unwrap();
//! identity::build_url(&mut base, "abc").unwrap();
//! assert_eq!(base.resource(), "/api/v2.1/base/uid/abc");
//!
//! let mut session = Session::new();
//! session
//!     .init(&ClientConfig {
//!         device: DeviceConfig { topology: DeviceTopology::Custom, ..Default::default() },
//!         ..Default::default()
//!     })
//!     .unwrap();
//! identity::configure_session(
//!     &mut session,
//!     r#"{"status":200,"d":{"ec":0,"p":{"n":"mqtt","h":"broker.example.com","id":"abc",
//!        "topics":{"rpt":"devices/abc/rpt","ack":"devices/abc/ack","c2d":"devices/abc/c2d"}}}}"#,
//! )
//! .unwrap();
//! assert_eq!(session.topics().host.as_deref(), Some("broker.example.com"));
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

pub mod discovery;
pub mod identity;
pub mod url;
