//! Strict response decoding.
//!
//! The exchange answers in one of two envelope shapes that differ only in the
//! namespace prefix (`soap:` or `s:`). Inside the body the operation's
//! `<op>Response/<op>Result` element carries a pipe-delimited string whose
//! first field is the status code. Anything outside that shape is reported as
//! a typed [`ParseError`] rather than guessed at.

use super::operation::Operation;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Status code the exchange uses for an accepted request
pub const SUCCESS_CODE: &str = "100";

/// Recognized envelope shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// `soap:Envelope/soap:Body`
    Soap,
    /// `s:Envelope/s:Body`
    Short,
}

impl EnvelopeShape {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "soap" => Some(EnvelopeShape::Soap),
            "s" => Some(EnvelopeShape::Short),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            EnvelopeShape::Soap => "soap",
            EnvelopeShape::Short => "s",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Empty response from exchange")]
    EmptyBody,

    #[error("Malformed XML in exchange response: {0}")]
    Malformed(String),

    #[error("Unrecognized response envelope: {0}")]
    UnrecognizedEnvelope(String),

    #[error("Response envelope has no body")]
    MissingBody,

    #[error("Response body has no {expected} element")]
    MissingResult { expected: String },

    #[error("Empty result from exchange")]
    EmptyResult,

    #[error("Result has no status code")]
    MissingStatusCode,

    #[error("Exchange returned a SOAP fault: {0}")]
    Fault(String),
}

/// Decoded result string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorResult {
    pub status_code: String,
    pub order_id: Option<String>,
    pub message: String,
}

impl VendorResult {
    /// Split `code|orderId|message` or `code|message`.
    ///
    /// Only the first two delimiters are significant, so a message may itself
    /// contain `|`.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ParseError::EmptyResult);
        }

        let parts: Vec<&str> = raw.splitn(3, '|').map(str::trim).collect();
        let status_code = parts[0];
        if status_code.is_empty() {
            return Err(ParseError::MissingStatusCode);
        }

        let (order_id, message) = match parts.as_slice() {
            [_, order_id, message] => (
                Some(*order_id).filter(|id| !id.is_empty()),
                if message.is_empty() { *order_id } else { *message },
            ),
            [_, message] => (None, *message),
            _ => (None, ""),
        };

        let message = if message.is_empty() {
            format!("No message from exchange (status {})", status_code)
        } else {
            message.to_string()
        };

        Ok(Self {
            status_code: status_code.to_string(),
            order_id: order_id.map(str::to_string),
            message,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status_code == SUCCESS_CODE
    }
}

/// Body content of a recognized envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyContent {
    Result(String),
    Fault(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub shape: EnvelopeShape,
    pub content: BodyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Envelope,
    Header,
    Body,
    Response,
    ResultField,
    Fault,
    FaultText,
    Other,
}

/// Locate the result (or fault) for `operation` in a raw response body
pub fn parse_envelope(operation: Operation, body: &str) -> Result<ResponseEnvelope, ParseError> {
    scan_envelope(body, &operation.response_element(), &operation.result_element())
}

/// Reason carried by a SOAP fault body, whatever operation it answers.
/// `None` when the body is not a well-formed envelope holding a fault.
pub fn fault_reason(body: &str) -> Option<String> {
    match scan_envelope(body, "", "") {
        Ok(ResponseEnvelope {
            content: BodyContent::Fault(reason),
            ..
        }) => Some(non_empty_reason(reason)),
        _ => None,
    }
}

fn non_empty_reason(reason: String) -> String {
    if reason.trim().is_empty() {
        "no reason given".to_string()
    } else {
        reason
    }
}

fn scan_envelope(
    body: &str,
    response_element: &str,
    result_element: &str,
) -> Result<ResponseEnvelope, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::EmptyBody);
    }

    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut shape: Option<EnvelopeShape> = None;
    let mut saw_body = false;
    let mut result: Option<String> = None;
    let mut fault: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::Malformed(e.to_string()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let qname = e.name();
                let prefix = qname
                    .prefix()
                    .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                let node = match stack.last() {
                    None => {
                        if shape.is_some() {
                            return Err(ParseError::Malformed(
                                "content after envelope".to_string(),
                            ));
                        }
                        let recognized = (local == "Envelope")
                            .then(|| prefix.as_deref().and_then(EnvelopeShape::from_prefix))
                            .flatten();
                        match recognized {
                            Some(s) => {
                                shape = Some(s);
                                Node::Envelope
                            }
                            None => {
                                return Err(ParseError::UnrecognizedEnvelope(
                                    String::from_utf8_lossy(qname.as_ref()).into_owned(),
                                ))
                            }
                        }
                    }
                    Some(Node::Envelope) => {
                        let same_prefix = prefix.as_deref() == shape.map(|s| s.prefix());
                        match local.as_str() {
                            "Body" if same_prefix => {
                                saw_body = true;
                                Node::Body
                            }
                            "Header" if same_prefix => Node::Header,
                            _ => Node::Other,
                        }
                    }
                    Some(Node::Body) if local == response_element => Node::Response,
                    Some(Node::Body) if local == "Fault" => {
                        fault.get_or_insert_with(String::new);
                        Node::Fault
                    }
                    Some(Node::Response) if local == result_element => {
                        result.get_or_insert_with(String::new);
                        Node::ResultField
                    }
                    Some(Node::Fault) | Some(Node::FaultText) => {
                        if local == "Text" || local == "faultstring" {
                            Node::FaultText
                        } else {
                            Node::Fault
                        }
                    }
                    Some(_) => Node::Other,
                };

                if !is_empty {
                    stack.push(node);
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ParseError::Malformed(e.to_string()))?;
                append_text(&stack, &text, &mut result, &mut fault);
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                append_text(&stack, &text, &mut result, &mut fault);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed(
            "unexpected end of document".to_string(),
        ));
    }

    let shape = shape.ok_or_else(|| ParseError::UnrecognizedEnvelope("no root element".to_string()))?;
    if !saw_body {
        return Err(ParseError::MissingBody);
    }

    let content = match (fault, result) {
        (Some(reason), _) => BodyContent::Fault(reason),
        (None, Some(result)) => BodyContent::Result(result),
        (None, None) => {
            return Err(ParseError::MissingResult {
                expected: format!("{}/{}", response_element, result_element),
            })
        }
    };

    Ok(ResponseEnvelope { shape, content })
}

fn append_text(stack: &[Node], text: &str, result: &mut Option<String>, fault: &mut Option<String>) {
    match stack.last() {
        Some(Node::ResultField) => {
            if let Some(r) = result.as_mut() {
                r.push_str(text);
            }
        }
        Some(Node::FaultText) => {
            if let Some(f) = fault.as_mut() {
                if !f.is_empty() {
                    f.push(' ');
                }
                f.push_str(text);
            }
        }
        _ => {}
    }
}

/// Decode a response body down to the vendor result
pub fn parse_response(operation: Operation, body: &str) -> Result<VendorResult, ParseError> {
    match parse_envelope(operation, body)?.content {
        BodyContent::Result(raw) => VendorResult::parse(&raw),
        BodyContent::Fault(reason) => Err(ParseError::Fault(non_empty_reason(reason))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COB: Operation = Operation::ChangeOfBrokerEntry;

    fn soap_body(result: &str) -> String {
        format!(
            r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Body><changeOfBrokerEntryParamResponse xmlns="http://bsestarmf.in/"><changeOfBrokerEntryParamResult>{}</changeOfBrokerEntryParamResult></changeOfBrokerEntryParamResponse></soap:Body></soap:Envelope>"#,
            result
        )
    }

    #[test]
    fn test_soap_shape_success() {
        let parsed = parse_response(COB, &soap_body("100|ORD123|Accepted")).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.order_id.as_deref(), Some("ORD123"));
        assert_eq!(parsed.message, "Accepted");
    }

    #[test]
    fn test_short_shape_with_header() {
        let body = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:a="http://www.w3.org/2005/08/addressing">
            <s:Header><a:Action s:mustUnderstand="1">http://bsestarmf.in/MFOrderEntry/changeOfBrokerEntryParamResponse</a:Action></s:Header>
            <s:Body>
              <changeOfBrokerEntryParamResponse xmlns="http://bsestarmf.in/">
                <changeOfBrokerEntryParamResult>101|Invalid Scheme</changeOfBrokerEntryParamResult>
              </changeOfBrokerEntryParamResponse>
            </s:Body>
          </s:Envelope>"#;

        let envelope = parse_envelope(COB, body).unwrap();
        assert_eq!(envelope.shape, EnvelopeShape::Short);

        let parsed = parse_response(COB, body).unwrap();
        assert!(!parsed.is_success());
        assert_eq!(parsed.status_code, "101");
        assert_eq!(parsed.order_id, None);
        assert_eq!(parsed.message, "Invalid Scheme");
    }

    #[test]
    fn test_escaped_and_cdata_results() {
        let parsed = parse_response(COB, &soap_body("101||Folio &amp; PAN mismatch")).unwrap();
        assert_eq!(parsed.order_id, None);
        assert_eq!(parsed.message, "Folio & PAN mismatch");

        let parsed = parse_response(COB, &soap_body("<![CDATA[100|ORD9|ok]]>")).unwrap();
        assert_eq!(parsed.order_id.as_deref(), Some("ORD9"));
    }

    #[test]
    fn test_message_keeps_extra_delimiters() {
        let parsed = VendorResult::parse("101|REF1|bad field|see docs").unwrap();
        assert_eq!(parsed.order_id.as_deref(), Some("REF1"));
        assert_eq!(parsed.message, "bad field|see docs");
    }

    #[test]
    fn test_code_only_result_gets_fallback_message() {
        let parsed = VendorResult::parse("101").unwrap();
        assert_eq!(parsed.status_code, "101");
        assert!(parsed.message.contains("101"));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(parse_response(COB, "").unwrap_err(), ParseError::EmptyBody);
        assert_eq!(parse_response(COB, "  \n ").unwrap_err(), ParseError::EmptyBody);
    }

    #[test]
    fn test_empty_result_element() {
        let body = r#"<soap:Envelope xmlns:soap="x"><soap:Body><changeOfBrokerEntryParamResponse><changeOfBrokerEntryParamResult/></changeOfBrokerEntryParamResponse></soap:Body></soap:Envelope>"#;
        assert_eq!(parse_response(COB, body).unwrap_err(), ParseError::EmptyResult);
    }

    #[test]
    fn test_unrecognized_envelope() {
        let body = r#"<env:Envelope xmlns:env="x"><env:Body/></env:Envelope>"#;
        assert!(matches!(
            parse_response(COB, body).unwrap_err(),
            ParseError::UnrecognizedEnvelope(_)
        ));
        assert!(matches!(
            parse_response(COB, "<html><body>Service Unavailable</body></html>").unwrap_err(),
            ParseError::UnrecognizedEnvelope(_)
        ));
    }

    #[test]
    fn test_result_for_another_operation_is_missing() {
        let body = soap_body("100|ORD1|ok");
        assert!(matches!(
            parse_response(Operation::OrderEntry, &body).unwrap_err(),
            ParseError::MissingResult { .. }
        ));
    }

    #[test]
    fn test_missing_body() {
        let body = r#"<soap:Envelope xmlns:soap="x"><soap:Header/></soap:Envelope>"#;
        assert_eq!(parse_response(COB, body).unwrap_err(), ParseError::MissingBody);
    }

    #[test]
    fn test_malformed_xml() {
        let body = r#"<soap:Envelope xmlns:soap="x"><soap:Body><changeOfBrokerEntryParamResponse></soap:Body></soap:Envelope>"#;
        assert!(matches!(
            parse_response(COB, body).unwrap_err(),
            ParseError::Malformed(_)
        ));

        let truncated = r#"<soap:Envelope xmlns:soap="x"><soap:Body>"#;
        assert!(matches!(
            parse_response(COB, truncated).unwrap_err(),
            ParseError::Malformed(_)
        ));
    }

    #[test]
    fn test_soap_fault() {
        let body = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><s:Fault><s:Code><s:Value>s:Receiver</s:Value></s:Code><s:Reason><s:Text xml:lang="en-US">Object reference not set</s:Text></s:Reason></s:Fault></s:Body></s:Envelope>"#;
        assert_eq!(
            parse_response(COB, body).unwrap_err(),
            ParseError::Fault("Object reference not set".to_string())
        );
    }

    #[test]
    fn test_fault_reason_ignores_operation() {
        let fault = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><s:Fault><s:Reason><s:Text xml:lang="en-US">The formatter threw an exception</s:Text></s:Reason></s:Fault></s:Body></s:Envelope>"#;
        assert_eq!(
            fault_reason(fault).as_deref(),
            Some("The formatter threw an exception")
        );

        assert_eq!(fault_reason(&soap_body("100|ORD123|Accepted")), None);
        assert_eq!(fault_reason("<html>Bad Gateway</html>"), None);
        assert_eq!(fault_reason(""), None);
    }
}
