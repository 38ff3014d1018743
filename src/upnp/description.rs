//! Device description resolution
//!
//! Fetches the description document named by the SSDP LOCATION header and
//! picks the first WANIPConnection or WANPPPConnection service that carries
//! a control URL. The control URL is then made absolute against the
//! location's scheme and authority.

use super::transport::HttpTransport;
use super::types::{DiscoveryFailure, ResolvedService};
use super::xml::{self, XmlEvent};
use std::ops::ControlFlow;
use tracing::{debug, info};

/// Service type fragments accepted as a WAN connection service
const WAN_SERVICE_MARKERS: &[&str] = &[":wanipconnection:", ":wanpppconnection:"];

/// Fetch the description at `location` and resolve the WAN control endpoint
pub(crate) fn resolve(
    transport: &dyn HttpTransport,
    location: &str,
) -> Result<ResolvedService, DiscoveryFailure> {
    let base = base_url(location)?;

    let response = transport
        .get(location)
        .map_err(|e| DiscoveryFailure::DescriptionUnavailable(e.to_string()))?;
    if !response.is_success() {
        return Err(DiscoveryFailure::DescriptionUnavailable(format!(
            "HTTP status {}",
            response.status
        )));
    }

    let service = find_wan_service(&response.body)?;
    let control_url = absolute_control_url(base, &service.control_url);

    info!(
        "Resolved WAN service {} at {}",
        service.service_type, control_url
    );

    Ok(ResolvedService {
        service_type: service.service_type,
        control_url,
    })
}

/// Walk a description document and return the first WAN connection service
///
/// The control URL is returned exactly as written in the document.
pub(crate) fn find_wan_service(document: &[u8]) -> Result<ResolvedService, DiscoveryFailure> {
    let mut scanner = ServiceScanner::default();

    xml::walk(document, |event| scanner.on_event(event))
        .map_err(|e| DiscoveryFailure::DescriptionUnavailable(e.to_string()))?;

    scanner.finish().ok_or(DiscoveryFailure::NoWanService)
}

/// Case-insensitive match against the WAN connection service types
pub(crate) fn is_wan_connection(service_type: &str) -> bool {
    let lower = service_type.to_ascii_lowercase();
    WAN_SERVICE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Scheme and authority of `location`, without trailing slash
///
/// This is everything before the first `/` following `://`. A location
/// with no path at all can't be used as a base.
pub(crate) fn base_url(location: &str) -> Result<&str, DiscoveryFailure> {
    let authority_start = location.find("://").map_or(7, |i| i + 3);

    location
        .get(authority_start..)
        .and_then(|rest| rest.find('/'))
        .map(|slash| &location[..authority_start + slash])
        .ok_or_else(|| DiscoveryFailure::MalformedLocation(location.to_string()))
}

/// Join a control URL from the description onto `base`
pub(crate) fn absolute_control_url(base: &str, control_url: &str) -> String {
    if control_url.starts_with('/') {
        format!("{}{}", base, control_url)
    } else {
        format!("{}/{}", base, control_url)
    }
}

/// serviceType/controlURL pair collected inside one `service` element
#[derive(Debug, Default)]
struct ServiceDescriptor {
    service_type: Option<String>,
    control_url: Option<String>,
}

impl ServiceDescriptor {
    fn into_wan_service(self) -> Option<ResolvedService> {
        match (self.service_type, self.control_url) {
            (Some(service_type), Some(control_url)) if is_wan_connection(&service_type) => {
                Some(ResolvedService {
                    service_type,
                    control_url,
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
enum ScanState {
    #[default]
    OutsideService,
    Collecting(ServiceDescriptor),
    Matched(ResolvedService),
}

/// Event-driven matcher for the first qualifying `service` block
#[derive(Debug, Default)]
pub(crate) struct ServiceScanner {
    state: ScanState,
    current_tag: Option<String>,
}

impl ServiceScanner {
    pub(crate) fn on_event(&mut self, event: XmlEvent<'_>) -> ControlFlow<()> {
        match event {
            XmlEvent::Open(name) => {
                if name.eq_ignore_ascii_case("service") {
                    self.state = ScanState::Collecting(ServiceDescriptor::default());
                }
                self.current_tag = Some(name.to_string());
            }
            XmlEvent::Text(text) => {
                let text = text.trim();
                if let (ScanState::Collecting(descriptor), Some(tag)) =
                    (&mut self.state, &self.current_tag)
                {
                    if text.is_empty() {
                        return ControlFlow::Continue(());
                    }
                    if tag.eq_ignore_ascii_case("serviceType") {
                        descriptor.service_type = Some(text.to_string());
                    } else if tag.eq_ignore_ascii_case("controlURL") {
                        descriptor.control_url = Some(text.to_string());
                    }
                }
            }
            XmlEvent::Close(name) => {
                self.current_tag = None;
                if name.eq_ignore_ascii_case("service") {
                    if let ScanState::Collecting(descriptor) = std::mem::take(&mut self.state) {
                        match descriptor.into_wan_service() {
                            Some(service) => {
                                debug!("Matched service {}", service.service_type);
                                self.state = ScanState::Matched(service);
                                return ControlFlow::Break(());
                            }
                            None => self.state = ScanState::OutsideService,
                        }
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }

    pub(crate) fn finish(self) -> Option<ResolvedService> {
        match self.state {
            ScanState::Matched(service) => Some(service),
            _ => None,
        }
    }
}
