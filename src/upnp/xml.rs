//! Forward-only XML event walk over quick-xml
//!
//! Gateways ship loosely structured XML, so callers don't build a tree.
//! They see a flat stream of open/text/close events and keep whatever state
//! they need. Element names are reported without namespace prefix.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::ops::ControlFlow;
use thiserror::Error;

/// One step of the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEvent<'a> {
    /// Element opened (also emitted for `<empty/>` elements)
    Open(&'a str),
    /// Unescaped character data, including CDATA sections
    Text(&'a str),
    /// Element closed
    Close(&'a str),
}

/// Document could not be tokenized
#[derive(Debug, Error)]
pub enum XmlError {
    /// Syntax error, mismatched tags or bad entity
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// Name or CDATA is not valid UTF-8
    #[error("XML encoding error: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Input ended with elements still open, or held no element at all
    #[error("XML document truncated ({0} unclosed elements)")]
    Truncated(usize),
}

/// Walk `document`, feeding every event to `visit`
///
/// Stops at end of input or as soon as `visit` returns
/// [`ControlFlow::Break`]; anything after that point is never read. Reaching
/// end of input without a complete root element is an error.
pub fn walk<F>(document: &[u8], mut visit: F) -> Result<(), XmlError>
where
    F: FnMut(XmlEvent<'_>) -> ControlFlow<()>,
{
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let flow = match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                depth += 1;
                seen_root = true;
                let name = std::str::from_utf8(e.local_name().into_inner())?;
                visit(XmlEvent::Open(name))
            }
            Event::Empty(e) => {
                seen_root = true;
                let name = std::str::from_utf8(e.local_name().into_inner())?;
                match visit(XmlEvent::Open(name)) {
                    ControlFlow::Continue(()) => visit(XmlEvent::Close(name)),
                    brk => brk,
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let name = std::str::from_utf8(e.local_name().into_inner())?;
                visit(XmlEvent::Close(name))
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                visit(XmlEvent::Text(&text))
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                visit(XmlEvent::Text(std::str::from_utf8(&raw)?))
            }
            Event::Eof if depth > 0 || !seen_root => return Err(XmlError::Truncated(depth)),
            Event::Eof => return Ok(()),
            _ => ControlFlow::Continue(()),
        };

        if flow.is_break() {
            return Ok(());
        }
        buf.clear();
    }
}
