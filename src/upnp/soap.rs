//! SOAP action client
//!
//! Requests are built from a fixed SOAP 1.1 envelope template; responses
//! are flattened into a tag name -> text map with no schema checks, which
//! is about all that can be relied on across router firmwares.

use super::transport::HttpTransport;
use super::types::ActionFailure;
use super::xml::{self, XmlError, XmlEvent};
use crate::{Error, Result};
use std::collections::HashMap;
use std::ops::ControlFlow;
use tracing::debug;

const ENVELOPE_OPEN: &str = "<?xml version=\"1.0\"?>\
<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\" \
SOAP-ENV:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
<SOAP-ENV:Body>";

const ENVELOPE_CLOSE: &str = "</SOAP-ENV:Body></SOAP-ENV:Envelope>";

/// Ordered SOAP action arguments
///
/// Arguments are serialized in insertion order, so the same action always
/// produces the same bytes on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapParams {
    entries: Vec<(String, String)>,
}

impl SoapParams {
    /// Empty argument list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Append an argument
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Arguments in serialization order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no arguments
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flattened SOAP response: element name -> last text seen inside it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoapResult {
    fields: HashMap<String, String>,
}

impl SoapResult {
    /// Flatten a response body
    ///
    /// Each text node is stored under its directly enclosing element; a
    /// repeated element name overwrites the earlier value. Text following a
    /// child's closing tag has no enclosing element on record and is
    /// dropped.
    pub fn parse(document: &[u8]) -> std::result::Result<Self, XmlError> {
        let mut fields = HashMap::new();
        let mut current_tag: Option<String> = None;

        xml::walk(document, |event| {
            match event {
                XmlEvent::Open(name) => current_tag = Some(name.to_string()),
                XmlEvent::Text(text) => {
                    if let Some(tag) = &current_tag {
                        fields.insert(tag.clone(), text.to_string());
                    }
                }
                XmlEvent::Close(_) => current_tag = None,
            }
            ControlFlow::Continue(())
        })?;

        Ok(Self { fields })
    }

    /// Value of `name`, if the response contained it
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// True if the response contained `name`
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// UPnP `errorCode`, the error signal of a SOAP fault body
    pub fn error_code(&self) -> Option<&str> {
        self.get("errorCode")
    }

    /// Turn an `errorCode`-bearing result into [`ActionFailure::Upnp`]
    pub fn upnp_error(&self) -> Option<ActionFailure> {
        self.error_code().map(|code| ActionFailure::Upnp {
            code: code.to_string(),
            description: self.get("errorDescription").map(str::to_string),
        })
    }

    /// Number of distinct fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no text was found at all
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serialize `action` with `params` into a SOAP request body
///
/// Values are written verbatim; callers pass text that is already safe
/// inside an XML element.
pub fn build_envelope(service_type: &str, action: &str, params: &SoapParams) -> String {
    let mut soap = String::with_capacity(512);
    soap.push_str(ENVELOPE_OPEN);
    soap.push_str(&format!("<m:{} xmlns:m=\"{}\">", action, service_type));

    for (name, value) in params.iter() {
        soap.push_str(&format!("<{}>{}</{}>", name, value, name));
    }

    soap.push_str(&format!("</m:{}>", action));
    soap.push_str(ENVELOPE_CLOSE);
    soap
}

/// Quoted `SOAPAction` header value
pub fn soap_action_header(service_type: &str, action: &str) -> String {
    format!("\"{}#{}\"", service_type, action)
}

/// Posts SOAP actions over an [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct SoapClient<T> {
    transport: T,
}

impl<T: HttpTransport> SoapClient<T> {
    /// Client over `transport`
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Invoke `action` on `control_url` and flatten the response
    ///
    /// Transport failures, non-2xx statuses and unparsable bodies all come
    /// back as [`Error::ActionFailed`]. An `errorCode` inside a 2xx body is
    /// not treated as a failure here; that call belongs to the caller.
    pub fn invoke(
        &self,
        service_type: &str,
        control_url: &str,
        action: &str,
        params: &SoapParams,
    ) -> Result<SoapResult> {
        let failed = |cause: ActionFailure| Error::ActionFailed {
            action: action.to_string(),
            cause,
        };

        let body = build_envelope(service_type, action, params).into_bytes();
        let headers = [
            ("Content-Type", "text/xml".to_string()),
            ("SOAPAction", soap_action_header(service_type, action)),
            ("Connection", "Close".to_string()),
            ("Content-Length", body.len().to_string()),
        ];

        debug!("Invoking {} on {}", action, control_url);
        let response = self
            .transport
            .post(control_url, &headers, body)
            .map_err(|e| failed(e.into()))?;

        if !response.is_success() {
            return Err(failed(ActionFailure::HttpStatus(response.status)));
        }

        let result = SoapResult::parse(&response.body)
            .map_err(|e| failed(ActionFailure::MalformedXml(e.to_string())))?;

        debug!("{} returned {} fields", action, result.len());
        Ok(result)
    }
}
