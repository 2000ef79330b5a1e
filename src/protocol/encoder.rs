//! Request encoding: positional pipe parameters wrapped in a SOAP 1.2 envelope.
//!
//! Field order and count are part of the exchange contract. Unused fields are
//! passed as empty strings and rendered as such, never dropped.

use super::operation::{Operation, SERVICE_NAMESPACE};
use crate::domain::errors::GatewayError;
use quick_xml::escape::escape;
use thiserror::Error;
use zeroize::Zeroizing;

pub const FIELD_DELIMITER: char = '|';

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncodeError {
    #[error("{operation} expects {expected} fields, got {actual}")]
    FieldCount {
        operation: Operation,
        expected: usize,
        actual: usize,
    },

    #[error("Field {index} contains the '|' delimiter")]
    DelimiterInField { index: usize },

    #[error("{0} does not take a pipe parameter")]
    NotParameterized(Operation),
}

impl From<EncodeError> for GatewayError {
    fn from(error: EncodeError) -> Self {
        match error {
            EncodeError::DelimiterInField { .. } => GatewayError::Validation(error.to_string()),
            _ => GatewayError::Configuration(error.to_string()),
        }
    }
}

/// Join fields with `|`, rejecting any field that would shift the layout
pub fn build_pipe_params(fields: &[String]) -> Result<Zeroizing<String>, EncodeError> {
    let mut params = Zeroizing::new(String::with_capacity(fields.iter().map(|f| f.len() + 1).sum()));
    for (index, field) in fields.iter().enumerate() {
        if field.contains(FIELD_DELIMITER) {
            return Err(EncodeError::DelimiterInField { index });
        }
        if index > 0 {
            params.push(FIELD_DELIMITER);
        }
        params.push_str(field);
    }
    Ok(params)
}

/// Builds envelopes addressed to one order-entry endpoint
#[derive(Debug, Clone)]
pub struct SoapEncoder {
    endpoint_url: String,
}

impl SoapEncoder {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Envelope whose body is `<root><Param>a|b|c</Param></root>`
    pub fn encode_params(
        &self,
        operation: Operation,
        fields: &[String],
    ) -> Result<Zeroizing<String>, EncodeError> {
        let expected = operation
            .field_count()
            .ok_or(EncodeError::NotParameterized(operation))?;
        if fields.len() != expected {
            return Err(EncodeError::FieldCount {
                operation,
                expected,
                actual: fields.len(),
            });
        }

        let params = build_pipe_params(fields)?;
        Ok(self.encode_children(operation, &[("Param", params.as_str())]))
    }

    /// Envelope whose body carries one element per named child
    pub fn encode_children(&self, operation: Operation, children: &[(&str, &str)]) -> Zeroizing<String> {
        let root = operation.root_element();
        let mut body = Zeroizing::new(format!("<bses:{}>", root));
        for (name, value) in children {
            body.push_str(&format!("<bses:{0}>{1}</bses:{0}>", name, escape(*value)));
        }
        body.push_str(&format!("</bses:{}>", root));

        self.envelope(operation, &body)
    }

    fn envelope(&self, operation: Operation, body: &str) -> Zeroizing<String> {
        Zeroizing::new(format!(
            concat!(
                r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope" xmlns:bses="{ns}">"#,
                r#"<soap:Header xmlns:wsa="http://www.w3.org/2005/08/addressing">"#,
                "<wsa:Action>{action}</wsa:Action>",
                "<wsa:To>{to}</wsa:To>",
                "</soap:Header>",
                "<soap:Body>{body}</soap:Body>",
                "</soap:Envelope>"
            ),
            ns = SERVICE_NAMESPACE,
            action = operation.action(),
            to = escape(self.endpoint_url.as_str()),
            body = body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_empty_fields_are_kept_in_place() {
        let params = build_pipe_params(&strings(&["NEW", "", "", "X"])).unwrap();
        assert_eq!(params.as_str(), "NEW|||X");
    }

    #[test]
    fn test_all_empty_fields_keep_count() {
        let params = build_pipe_params(&vec![String::new(); 16]).unwrap();
        assert_eq!(params.matches('|').count(), 15);
    }

    #[test]
    fn test_delimiter_in_field_rejected() {
        let err = build_pipe_params(&strings(&["NEW", "bad|remark"])).unwrap_err();
        assert_eq!(err, EncodeError::DelimiterInField { index: 1 });
    }

    #[test]
    fn test_field_count_enforced() {
        let encoder = SoapEncoder::new("https://example.test/MFOrderEntry/MFOrder.svc");
        let err = encoder
            .encode_params(Operation::ChangeOfBrokerEntry, &vec![String::new(); 15])
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::FieldCount {
                operation: Operation::ChangeOfBrokerEntry,
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_get_password_is_not_parameterized() {
        let encoder = SoapEncoder::new("https://example.test/svc");
        assert_eq!(
            encoder.encode_params(Operation::GetPassword, &[]).unwrap_err(),
            EncodeError::NotParameterized(Operation::GetPassword)
        );
    }

    #[test]
    fn test_envelope_wraps_param_under_root() {
        let encoder = SoapEncoder::new("https://example.test/MFOrderEntry/MFOrder.svc");
        let mut fields = vec![String::new(); 16];
        fields[0] = "NEW".to_string();
        fields[10] = "R&D <transfer>".to_string();
        let envelope = encoder
            .encode_params(Operation::ChangeOfBrokerEntry, &fields)
            .unwrap();

        assert!(envelope.starts_with("<soap:Envelope"));
        assert!(envelope.contains(
            "<wsa:Action>http://bsestarmf.in/MFOrderEntry/changeOfBrokerEntryParam</wsa:Action>"
        ));
        assert!(envelope.contains("<wsa:To>https://example.test/MFOrderEntry/MFOrder.svc</wsa:To>"));
        assert!(envelope.contains("<soap:Body><bses:changeOfBrokerEntryParam><bses:Param>NEW|"));
        assert!(envelope.contains("R&amp;D &lt;transfer&gt;"));
        assert!(envelope.ends_with("</bses:changeOfBrokerEntryParam></soap:Body></soap:Envelope>"));
    }

    #[test]
    fn test_named_children_for_token_request() {
        let encoder = SoapEncoder::new("https://example.test/svc");
        let envelope = encoder.encode_children(
            Operation::GetPassword,
            &[("UserId", "1000101"), ("Password", "p@ss"), ("PassKey", "key")],
        );
        assert!(envelope.contains(
            "<bses:getPassword><bses:UserId>1000101</bses:UserId><bses:Password>p@ss</bses:Password><bses:PassKey>key</bses:PassKey></bses:getPassword>"
        ));
    }
}
