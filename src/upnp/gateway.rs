//! Resolved gateway and its port mapping operations
//!
//! A [`Gateway`] only exists once discovery and description resolution have
//! both succeeded; its endpoint never changes afterwards. Operations are
//! independent blocking round trips, so one gateway can be shared across
//! threads without locking.
//!
//! Two API layers are offered. The `Result`-returning methods
//! (`add_port_mapping`, `delete_port_mapping`, `specific_port_mapping_entry`,
//! `external_ip_address`) keep the failure cause. The convenience methods
//! (`open_port`, `close_port`, `is_mapped`, `external_ip`) collapse every
//! per-operation failure into `false`/`None`. Only an out-of-range port is
//! reported as an error by them.

use super::description;
use super::soap::{SoapClient, SoapParams, SoapResult};
use super::ssdp;
use super::transport::{HttpTransport, ReqwestTransport};
use super::types::{GatewayEndpoint, IpProtocol, PortMappingRequest};
use crate::settings::TransportSettings;
use crate::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, info, warn};

const ACTION_GET_EXTERNAL_IP: &str = "GetExternalIPAddress";
const ACTION_ADD_PORT_MAPPING: &str = "AddPortMapping";
const ACTION_DELETE_PORT_MAPPING: &str = "DeletePortMapping";
const ACTION_GET_SPECIFIC_ENTRY: &str = "GetSpecificPortMappingEntry";

/// UPnP IGD with a resolved WAN connection service
#[derive(Debug)]
pub struct Gateway<T = ReqwestTransport> {
    endpoint: GatewayEndpoint,
    client: SoapClient<T>,
}

impl Gateway<ReqwestTransport> {
    /// Resolve a gateway from an SSDP reply using the default reqwest transport
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedGateway`] if the reply has no LOCATION, the
    /// description has no WAN connection service or the location is not a
    /// usable base URL.
    pub fn connect(
        ssdp_response: &[u8],
        local_address: Ipv4Addr,
        gateway_address: IpAddr,
    ) -> Result<Self> {
        Self::connect_with_settings(
            &TransportSettings::default(),
            ssdp_response,
            local_address,
            gateway_address,
        )
    }

    /// Same as [`Gateway::connect`] with explicit transport settings
    pub fn connect_with_settings(
        settings: &TransportSettings,
        ssdp_response: &[u8],
        local_address: Ipv4Addr,
        gateway_address: IpAddr,
    ) -> Result<Self> {
        let transport = ReqwestTransport::from_settings(settings)?;
        Self::with_transport(transport, ssdp_response, local_address, gateway_address)
    }
}

impl<T: HttpTransport> Gateway<T> {
    /// Resolve a gateway from an SSDP reply over `transport`
    pub fn with_transport(
        transport: T,
        ssdp_response: &[u8],
        local_address: Ipv4Addr,
        gateway_address: IpAddr,
    ) -> Result<Self> {
        let location = ssdp::parse_location(ssdp_response)?;
        debug!("Resolving gateway {} via {}", gateway_address, location);

        let service = description::resolve(&transport, &location)?;
        let endpoint = GatewayEndpoint::new(local_address, gateway_address, service);

        info!(
            "Gateway {} ready: {} at {}",
            gateway_address,
            endpoint.service_type(),
            endpoint.control_url()
        );

        Ok(Self {
            endpoint,
            client: SoapClient::new(transport),
        })
    }

    /// Resolved endpoint
    pub fn endpoint(&self) -> &GatewayEndpoint {
        &self.endpoint
    }

    /// Address of the gateway device
    pub fn gateway_address(&self) -> IpAddr {
        self.endpoint.gateway_address()
    }

    /// LAN address mappings are pointed at
    pub fn local_address(&self) -> Ipv4Addr {
        self.endpoint.local_address()
    }

    fn invoke(&self, action: &str, params: &SoapParams) -> Result<SoapResult> {
        self.client.invoke(
            self.endpoint.service_type(),
            self.endpoint.control_url(),
            action,
            params,
        )
    }

    /// Query `GetExternalIPAddress`
    ///
    /// `Ok(None)` when the gateway answered without an address.
    pub fn external_ip_address(&self) -> Result<Option<String>> {
        let result = self.invoke(ACTION_GET_EXTERNAL_IP, &SoapParams::new())?;

        if let Some(ip) = result.get("NewExternalIPAddress") {
            return Ok(Some(ip.to_string()));
        }
        match result.upnp_error() {
            Some(cause) => Err(Error::ActionFailed {
                action: ACTION_GET_EXTERNAL_IP.to_string(),
                cause,
            }),
            None => Ok(None),
        }
    }

    /// External IP as reported by the gateway, `None` on any failure
    pub fn external_ip(&self) -> Option<String> {
        match self.external_ip_address() {
            Ok(ip) => ip,
            Err(e) => {
                debug!("External IP lookup failed: {}", e);
                None
            }
        }
    }

    /// Send `AddPortMapping`
    ///
    /// An `errorCode` in the response is an error.
    pub fn add_port_mapping(&self, request: &PortMappingRequest) -> Result<SoapResult> {
        debug!(
            "Adding port mapping {} {} -> {}:{}",
            request.protocol, request.external_port, request.internal_client, request.internal_port
        );

        let result = self.invoke(ACTION_ADD_PORT_MAPPING, &request.to_params())?;
        reject_upnp_error(ACTION_ADD_PORT_MAPPING, result)
    }

    /// Send `DeletePortMapping`
    ///
    /// The response body is not inspected: a completed round trip counts as
    /// success even if it carries an `errorCode`.
    pub fn delete_port_mapping(&self, port: u16, protocol: IpProtocol) -> Result<SoapResult> {
        debug!("Deleting port mapping {} {}", protocol, port);
        self.invoke(ACTION_DELETE_PORT_MAPPING, &mapping_key(port, protocol))
    }

    /// Send `GetSpecificPortMappingEntry`
    ///
    /// An `errorCode` in the response is an error.
    pub fn specific_port_mapping_entry(
        &self,
        port: u16,
        protocol: IpProtocol,
    ) -> Result<SoapResult> {
        let result = self.invoke(ACTION_GET_SPECIFIC_ENTRY, &mapping_key(port, protocol))?;
        reject_upnp_error(ACTION_GET_SPECIFIC_ENTRY, result)
    }

    /// Map external `port` to the same port on this host, permanently
    ///
    /// Returns `Ok(false)` if the gateway refused or could not be reached.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPort`] if `port` is outside [0, 65535]; nothing is
    /// sent in that case.
    pub fn open_port(
        &self,
        port: impl Into<i64>,
        protocol: IpProtocol,
        description: &str,
    ) -> Result<bool> {
        let port = validate_port(port)?;
        let request = PortMappingRequest::new(port, protocol, self.local_address(), description);

        match self.add_port_mapping(&request) {
            Ok(_) => {
                info!("Opened {} port {} on {}", protocol, port, self.gateway_address());
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to open {} port {}: {}", protocol, port, e);
                Ok(false)
            }
        }
    }

    /// Remove the mapping for external `port`
    ///
    /// Returns `Ok(true)` whenever the request completed, whatever the
    /// gateway answered.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPort`] if `port` is outside [0, 65535].
    pub fn close_port(&self, port: impl Into<i64>, protocol: IpProtocol) -> Result<bool> {
        let port = validate_port(port)?;

        match self.delete_port_mapping(port, protocol) {
            Ok(_) => {
                info!("Closed {} port {} on {}", protocol, port, self.gateway_address());
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to close {} port {}: {}", protocol, port, e);
                Ok(false)
            }
        }
    }

    /// Whether the gateway reports a mapping for external `port`
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPort`] if `port` is outside [0, 65535].
    pub fn is_mapped(&self, port: impl Into<i64>, protocol: IpProtocol) -> Result<bool> {
        let port = validate_port(port)?;

        match self.specific_port_mapping_entry(port, protocol) {
            Ok(entry) => Ok(entry.contains("NewInternalPort")),
            Err(e) => {
                debug!("No {} mapping for port {}: {}", protocol, port, e);
                Ok(false)
            }
        }
    }
}

/// Check a caller-supplied port against [0, 65535]
pub fn validate_port(port: impl Into<i64>) -> Result<u16> {
    let port = port.into();
    u16::try_from(port).map_err(|_| Error::InvalidPort(port))
}

/// Arguments identifying one mapping
fn mapping_key(port: u16, protocol: IpProtocol) -> SoapParams {
    SoapParams::new()
        .with("NewRemoteHost", "")
        .with("NewExternalPort", port.to_string())
        .with("NewProtocol", protocol.as_str())
}

fn reject_upnp_error(action: &str, result: SoapResult) -> Result<SoapResult> {
    match result.upnp_error() {
        Some(cause) => Err(Error::ActionFailed {
            action: action.to_string(),
            cause,
        }),
        None => Ok(result),
    }
}
