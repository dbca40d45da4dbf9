//! CAS `serviceValidate` response parser
//!
//! Streams the document with `quick-xml` and matches elements by local name,
//! so `<cas:user>` and `<user>` are treated alike. Only the CAS 2.0 shapes
//! matter here:
//!
//! ```text
//! <cas:serviceResponse>
//!   <cas:authenticationSuccess>
//!     <cas:user>alice</cas:user>
//!     <cas:attributes><cas:email>a@x.com</cas:email></cas:attributes>
//!   </cas:authenticationSuccess>
//! </cas:serviceResponse>
//!
//! <cas:serviceResponse>
//!   <cas:authenticationFailure code="INVALID_TICKET">Ticket expired</cas:authenticationFailure>
//! </cas:serviceResponse>
//! ```
//!
//! Attribute rule: only direct children of `attributes` that hold plain text
//! become attributes. An element with element children is skipped together
//! with everything inside it.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{ValidationError, ValidationResult};

/// Username reported when the success block carries no `user` element
pub const UNKNOWN_USER: &str = "unknown";

const DEFAULT_FAILURE_MESSAGE: &str = "authentication failed";
const NO_RESULT_MESSAGE: &str = "no authentication result found";

/// Parse a CAS 2.0 `serviceValidate` response body.
///
/// Never panics; every malformed input becomes
/// `Failure(ValidationError::ParseAnomaly(..))`.
pub fn parse_service_response(xml: &str) -> ValidationResult {
    let scanner = match scan(xml) {
        Ok(scanner) => scanner,
        Err(message) => {
            tracing::warn!(
                event = "cas_response_malformed",
                body_len = xml.len(),
                error = %message,
                "CAS response is not well-formed XML"
            );
            return ValidationResult::Failure(ValidationError::ParseAnomaly(message));
        }
    };

    scanner.into_result()
}

fn scan(xml: &str) -> Result<Scanner, String> {
    let mut reader = Reader::from_str(xml);
    let mut scanner = Scanner::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => scanner.open(&e),
            Ok(Event::Empty(e)) => {
                scanner.open(&e);
                scanner.close();
            }
            Ok(Event::End(_)) => scanner.close(),
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| format!("{} at position {}", err, reader.buffer_position()))?;
                scanner.text(&text);
            }
            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                scanner.text(&String::from_utf8_lossy(&raw));
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(format!("{} at position {}", err, reader.error_position()));
            }
            Ok(_) => {}
        }
    }

    if let Some(open) = scanner.stack.last() {
        return Err(format!("document ends inside <{}>", open));
    }

    Ok(scanner)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn code_attribute(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"code")
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Text collected for an open element at `depth`
struct Capture {
    depth: usize,
    text: String,
}

struct AttributeCapture {
    name: String,
    depth: usize,
    text: String,
    has_children: bool,
}

struct FailureCapture {
    depth: usize,
    code: Option<String>,
    text: String,
}

#[derive(Default)]
struct Scanner {
    stack: Vec<String>,

    saw_success: bool,
    success_depth: Option<usize>,
    user: Option<String>,
    user_capture: Option<Capture>,

    attributes_seen: bool,
    attributes_depth: Option<usize>,
    attribute: Option<AttributeCapture>,
    attributes: HashMap<String, String>,

    failure: Option<(Option<String>, String)>,
    failure_capture: Option<FailureCapture>,
}

impl Scanner {
    fn open(&mut self, e: &BytesStart<'_>) {
        let name = local_name(e);
        self.stack.push(name.clone());
        let depth = self.stack.len();

        match name.as_str() {
            "authenticationSuccess" if !self.saw_success => {
                self.saw_success = true;
                self.success_depth = Some(depth);
                return;
            }
            "authenticationFailure" if self.failure.is_none() && self.failure_capture.is_none() => {
                self.failure_capture = Some(FailureCapture {
                    depth,
                    code: code_attribute(e),
                    text: String::new(),
                });
                return;
            }
            _ => {}
        }

        if self.success_depth.is_none() {
            return;
        }

        if let Some(attributes_depth) = self.attributes_depth {
            if depth == attributes_depth + 1 {
                self.attribute = Some(AttributeCapture {
                    name,
                    depth,
                    text: String::new(),
                    has_children: false,
                });
            } else if let Some(attribute) = self.attribute.as_mut() {
                attribute.has_children = true;
            }
            return;
        }

        match name.as_str() {
            "user" if self.user.is_none() && self.user_capture.is_none() => {
                self.user_capture = Some(Capture {
                    depth,
                    text: String::new(),
                });
            }
            "attributes" if !self.attributes_seen => {
                self.attributes_seen = true;
                self.attributes_depth = Some(depth);
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(capture) = self.user_capture.as_mut() {
            capture.text.push_str(text);
        }
        if let Some(attribute) = self.attribute.as_mut() {
            attribute.text.push_str(text);
        }
        if let Some(failure) = self.failure_capture.as_mut() {
            failure.text.push_str(text);
        }
    }

    fn close(&mut self) {
        let depth = self.stack.len();

        if self.user_capture.as_ref().is_some_and(|c| c.depth == depth) {
            if let Some(capture) = self.user_capture.take() {
                let user = capture.text.trim();
                if !user.is_empty() {
                    self.user = Some(user.to_string());
                }
            }
        }

        if self.attribute.as_ref().is_some_and(|a| a.depth == depth) {
            if let Some(attribute) = self.attribute.take() {
                self.finish_attribute(attribute);
            }
        }

        if self.attributes_depth == Some(depth) {
            self.attributes_depth = None;
        }

        if self.failure_capture.as_ref().is_some_and(|f| f.depth == depth) {
            if let Some(failure) = self.failure_capture.take() {
                self.failure = Some((failure.code, failure.text.trim().to_string()));
            }
        }

        if self.success_depth == Some(depth) {
            self.success_depth = None;
        }

        self.stack.pop();
    }

    fn finish_attribute(&mut self, attribute: AttributeCapture) {
        if attribute.has_children {
            tracing::debug!(name = %attribute.name, "Skipping non-leaf CAS attribute");
            return;
        }

        let raw = attribute.text.trim();
        if raw.is_empty() {
            return;
        }

        // Some CAS servers percent-encode attribute values
        let value = match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(e) => {
                tracing::debug!(
                    name = %attribute.name,
                    error = %e,
                    "Attribute value is not valid percent-encoding, keeping raw value"
                );
                raw.to_string()
            }
        };

        self.attributes.insert(attribute.name, value);
    }

    fn into_result(self) -> ValidationResult {
        if self.saw_success {
            let username = self.user.unwrap_or_else(|| {
                tracing::warn!("CAS success response has no user element");
                UNKNOWN_USER.to_string()
            });
            return ValidationResult::Success {
                username,
                attributes: self.attributes,
            };
        }

        if let Some((code, text)) = self.failure {
            let message = if text.is_empty() {
                DEFAULT_FAILURE_MESSAGE.to_string()
            } else {
                text
            };
            return ValidationResult::Failure(ValidationError::CasFailure { code, message });
        }

        ValidationResult::Failure(ValidationError::ParseAnomaly(NO_RESULT_MESSAGE.to_string()))
    }
}
