//! UPnP IGD client
//!
//! The pieces compose top-down:
//! - `ssdp` - pulls the description URL out of an SSDP reply
//! - `description` - fetches the device description and finds the WAN connection service
//! - `soap` - serializes, posts and flattens SOAP actions
//! - `gateway` - the resolved gateway and its port mapping operations
//!
//! HTTP and XML are consumed through `transport` and `xml`.

// Submodules
pub mod description;
pub mod gateway;
pub mod manager;
pub mod soap;
pub mod ssdp;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export commonly used types
pub use types::{
    ActionFailure, DiscoveryFailure, GatewayEndpoint, IpProtocol, PortMappingRequest,
};

pub use gateway::Gateway;
pub use manager::{MappedPort, UpnpMappingManager};
pub use soap::{SoapParams, SoapResult};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
