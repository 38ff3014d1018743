//! Common types for the UPnP client

use super::soap::SoapParams;
use super::transport::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// IP protocol numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IpProtocol {
    /// TCP protocol
    TCP = 6,
    /// UDP protocol
    UDP = 17,
}

impl IpProtocol {
    /// Value of the `NewProtocol` SOAP argument
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TCP => "TCP",
            Self::UDP => "UDP",
        }
    }
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WAN connection service picked out of a device description
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedService {
    pub service_type: String,
    pub control_url: String,
}

/// Resolved control endpoint of a gateway
///
/// Only produced by a successful discovery + description walk, so the
/// service type and control URL are always both present. Read-only after
/// construction. Serializable for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayEndpoint {
    local_address: Ipv4Addr,
    gateway_address: IpAddr,
    service_type: String,
    control_url: String,
}

impl GatewayEndpoint {
    pub(crate) fn new(
        local_address: Ipv4Addr,
        gateway_address: IpAddr,
        service: ResolvedService,
    ) -> Self {
        Self {
            local_address,
            gateway_address,
            service_type: service.service_type,
            control_url: service.control_url,
        }
    }

    /// LAN address of this host, used as `NewInternalClient`
    pub fn local_address(&self) -> Ipv4Addr {
        self.local_address
    }

    /// Address of the gateway device
    pub fn gateway_address(&self) -> IpAddr {
        self.gateway_address
    }

    /// Service type URN, e.g. `urn:schemas-upnp-org:service:WANIPConnection:1`
    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    /// Absolute control URL that accepts SOAP actions
    pub fn control_url(&self) -> &str {
        &self.control_url
    }
}

/// Arguments of an `AddPortMapping` action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMappingRequest {
    /// External (WAN) port
    pub external_port: u16,
    /// Transport protocol
    pub protocol: IpProtocol,
    /// LAN host receiving the forwarded traffic
    pub internal_client: Ipv4Addr,
    /// Port on the LAN host
    pub internal_port: u16,
    /// Whether the rule is active
    pub enabled: bool,
    /// Free-form label shown in the router UI
    pub description: String,
    /// Lease in seconds (0 = until removed or reboot)
    pub lease_duration: u32,
}

impl PortMappingRequest {
    /// Permanent, enabled mapping of `port` to the same port on `internal_client`
    pub fn new(
        port: u16,
        protocol: IpProtocol,
        internal_client: Ipv4Addr,
        description: impl Into<String>,
    ) -> Self {
        Self {
            external_port: port,
            protocol,
            internal_client,
            internal_port: port,
            enabled: true,
            description: description.into(),
            lease_duration: 0,
        }
    }

    /// Forward to a different internal port
    pub fn with_internal_port(mut self, internal_port: u16) -> Self {
        self.internal_port = internal_port;
        self
    }

    /// Request a finite lease
    pub fn with_lease_duration(mut self, lease_duration: u32) -> Self {
        self.lease_duration = lease_duration;
        self
    }

    /// Create the rule disabled
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// SOAP arguments in the order declared by the WANIPConnection SCPD
    pub fn to_params(&self) -> SoapParams {
        SoapParams::new()
            .with("NewRemoteHost", "")
            .with("NewExternalPort", self.external_port.to_string())
            .with("NewProtocol", self.protocol.as_str())
            .with("NewInternalPort", self.internal_port.to_string())
            .with("NewInternalClient", self.internal_client.to_string())
            .with("NewEnabled", if self.enabled { "1" } else { "0" })
            .with("NewPortMappingDescription", self.description.as_str())
            .with("NewLeaseDuration", self.lease_duration.to_string())
    }
}

/// Why a discovered device could not be turned into a [`GatewayEndpoint`]
#[derive(Debug, Error)]
pub enum DiscoveryFailure {
    /// SSDP reply carries no LOCATION header
    #[error("SSDP response has no LOCATION header")]
    MissingLocation,

    /// LOCATION has no path separator after the authority
    #[error("Malformed location URL: {0}")]
    MalformedLocation(String),

    /// Description document could not be fetched or parsed
    #[error("Device description unavailable: {0}")]
    DescriptionUnavailable(String),

    /// No WANIPConnection/WANPPPConnection service with a control URL
    #[error("No WAN connection service in device description")]
    NoWanService,
}

/// Underlying cause of a failed SOAP action
#[derive(Debug, Error)]
pub enum ActionFailure {
    /// Connection or I/O failure
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// Gateway answered with a non-2xx status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Response body is not well-formed XML
    #[error("malformed response: {0}")]
    MalformedXml(String),

    /// Response carries a UPnP `errorCode`
    #[error("UPnP error {code} {}", .description.as_deref().unwrap_or_default())]
    Upnp {
        /// `errorCode` value
        code: String,
        /// `errorDescription` value, if present
        description: Option<String>,
    },
}
