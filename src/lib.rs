//! igd-gateway - UPnP Internet Gateway Device control client
//!
//! This library locates the WAN connection service of a UPnP gateway from a
//! raw SSDP discovery reply and drives it over SOAP: external IP lookup and
//! NAT port mapping add/remove/inspect.
//!
//! ```no_run
//! use igd_gateway::{Gateway, IpProtocol};
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! # fn example(ssdp_reply: &[u8]) -> igd_gateway::Result<()> {
//! let gateway = Gateway::connect(
//!     ssdp_reply,
//!     Ipv4Addr::new(192, 168, 1, 20),
//!     IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
//! )?;
//!
//! if gateway.open_port(8080, IpProtocol::TCP, "my-app")? {
//!     println!("mapped, external ip: {:?}", gateway.external_ip());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod settings;
pub mod upnp;

pub use settings::TransportSettings;
pub use upnp::{
    ActionFailure, DiscoveryFailure, Gateway, GatewayEndpoint, HttpResponse, HttpTransport,
    IpProtocol, PortMappingRequest, ReqwestTransport, SoapParams, SoapResult, TransportError,
    UpnpMappingManager,
};

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The discovered device cannot be driven as an IGD (construction-time failure)
    #[error("Unsupported gateway: {0}")]
    UnsupportedGateway(#[from] DiscoveryFailure),

    /// A SOAP action did not complete successfully
    #[error("Action {action} failed: {cause}")]
    ActionFailed {
        /// SOAP action name
        action: String,
        /// Underlying reason, kept for diagnostics
        cause: ActionFailure,
    },

    /// HTTP transport could not be built
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Port argument outside [0, 65535]
    #[error("Invalid port: {0}")]
    InvalidPort(i64),

    /// Configuration could not be loaded or saved
    #[error("Config error: {0}")]
    Config(String),

    /// Background task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize logging for binaries embedding the library
pub fn init() {
    tracing_subscriber::fmt::init();
}

#[cfg(test)]
mod tests;
