//! SSDP reply parsing
//!
//! Only the LOCATION header matters here: it points at the device
//! description document. The multicast search itself is left to the caller.

use super::types::DiscoveryFailure;
use tracing::debug;

/// Extract the LOCATION header value from a raw SSDP reply
///
/// Status lines (`HTTP/1.x ...`) and `NOTIFY *` request lines are skipped,
/// header names match case-insensitively and values are trimmed. When the
/// header repeats, the last occurrence wins.
pub fn parse_location(response: &[u8]) -> Result<String, DiscoveryFailure> {
    let text = String::from_utf8_lossy(response);
    let mut location = None;

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() || line.starts_with("HTTP/1.") || line.starts_with("NOTIFY *") {
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            continue;
        };

        if name.trim().eq_ignore_ascii_case("location") {
            location = Some(value.trim().to_string());
        }
    }

    match location {
        Some(location) => {
            debug!("SSDP location: {}", location);
            Ok(location)
        }
        None => Err(DiscoveryFailure::MissingLocation),
    }
}
