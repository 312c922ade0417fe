//! SOAP 1.1 envelope construction and fault extraction.
//!
//! Two actions exist on the wire: Discover and Execute, both HTTP POST
//! with a fixed envelope shape. Responses are scanned for a
//! `<faultstring>` before any payload parsing happens.

use quick_xml::events::Event;
use quick_xml::Reader;

pub const DISCOVER_ACTION: &str = "\"urn:schemas-microsoft-com:xml-analysis:Discover\"";
pub const EXECUTE_ACTION: &str = "\"urn:schemas-microsoft-com:xml-analysis:Execute\"";

const ENVELOPE_OPEN: &str = "<SOAP-ENV:Envelope \
xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\" \
SOAP-ENV:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\
<SOAP-ENV:Body>";
const ENVELOPE_CLOSE: &str = "</SOAP-ENV:Body></SOAP-ENV:Envelope>";

/// Escape text for embedding in an XML element.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Build a Discover request envelope.
pub fn discover_envelope(
    request_type: &str,
    restrictions: &[(&str, &str)],
    properties: &[(&str, &str)],
) -> String {
    let mut body = String::new();
    body.push_str(ENVELOPE_OPEN);
    body.push_str("<Discover xmlns=\"urn:schemas-microsoft-com:xml-analysis\">");
    body.push_str(&format!(
        "<RequestType>{}</RequestType>",
        escape_xml(request_type)
    ));

    body.push_str("<Restrictions><RestrictionList>");
    for (name, value) in restrictions {
        body.push_str(&format!("<{0}>{1}</{0}>", name, escape_xml(value)));
    }
    body.push_str("</RestrictionList></Restrictions>");

    body.push_str("<Properties><PropertyList>");
    for (name, value) in properties {
        body.push_str(&format!("<{0}>{1}</{0}>", name, escape_xml(value)));
    }
    body.push_str("</PropertyList></Properties>");

    body.push_str("</Discover>");
    body.push_str(ENVELOPE_CLOSE);
    body
}

/// Build an Execute request envelope carrying one MDX statement.
pub fn execute_envelope(statement: &str, properties: &[(&str, &str)]) -> String {
    let mut body = String::new();
    body.push_str(ENVELOPE_OPEN);
    body.push_str("<Execute xmlns=\"urn:schemas-microsoft-com:xml-analysis\">");
    body.push_str(&format!(
        "<Command><Statement>{}</Statement></Command>",
        escape_xml(statement)
    ));

    body.push_str("<Properties><PropertyList>");
    for (name, value) in properties {
        body.push_str(&format!("<{0}>{1}</{0}>", name, escape_xml(value)));
    }
    body.push_str("</PropertyList></Properties>");

    body.push_str("</Execute>");
    body.push_str(ENVELOPE_CLOSE);
    body
}

/// Build an Execute envelope carrying a session Cancel command.
pub fn cancel_envelope(session_id: &str) -> String {
    let mut body = String::new();
    body.push_str(ENVELOPE_OPEN);
    body.push_str("<Execute xmlns=\"urn:schemas-microsoft-com:xml-analysis\">");
    body.push_str(&format!(
        "<Command><Cancel xmlns=\"http://schemas.microsoft.com/analysisservices/2003/engine\">\
         <SessionID>{}</SessionID></Cancel></Command>",
        escape_xml(session_id)
    ));
    body.push_str("<Properties><PropertyList/></Properties>");
    body.push_str("</Execute>");
    body.push_str(ENVELOPE_CLOSE);
    body
}

/// Extract a SOAP fault string from a response body, if any.
pub fn extract_fault(body: &str) -> Option<String> {
    let mut reader = Reader::from_reader(body.as_bytes());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"faultstring" => {
                let text = reader.read_text(e.name()).ok()?.into_owned();
                return Some(text);
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}
