use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{trace, warn};

use crate::types::{ROLE_SESSION_NAME_ATTRIBUTE, SESSION_DURATION_ATTRIBUTE};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed assertion, not valid base64: {0}")]
    Malformed(#[from] base64::DecodeError),
    #[error("Malformed assertion, invalid XML: {0}")]
    Xml(String),
    #[error("Malformed assertion, missing {0} condition")]
    MissingConditions(&'static str),
    #[error("Malformed assertion, invalid {attribute} timestamp {value:?}: {source}")]
    InvalidTimestamp {
        attribute: &'static str,
        value: String,
        source: chrono::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

fn xml_err(err: impl std::fmt::Display) -> Error {
    Error::Xml(err.to_string())
}

/// Window in which the assertion may be exchanged: `[not_before, not_on_or_after)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditions {
    pub not_before: DateTime<Utc>,
    pub not_on_or_after: DateTime<Utc>,
}

impl Conditions {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now < self.not_on_or_after
    }

    /// Past `NotOnOrAfter`. Ignores `NotBefore`, which may lie slightly ahead
    /// of a local clock running behind the identity provider.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.not_on_or_after
    }
}

/// Decoded SAML response as posted by the identity provider.
#[derive(Debug)]
pub struct SamlResponse {
    decoded_xml: Vec<u8>,
}

impl SamlResponse {
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let compact: Vec<u8> = encoded
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        Ok(Self {
            decoded_xml: STANDARD.decode(compact)?,
        })
    }

    fn reader(&self) -> Reader<&[u8]> {
        let mut reader = Reader::from_reader(self.decoded_xml.as_slice());
        reader.config_mut().trim_text(true);
        reader
    }

    /// All values bound to `attribute_name`, in document order.
    /// An absent attribute yields an empty list.
    pub fn attribute_values(&self, attribute_name: &str) -> Result<Vec<String>> {
        let mut reader = self.reader();
        let mut buf = Vec::new();
        let mut values = Vec::new();
        let mut in_attribute = false;
        let mut current: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf).map_err(xml_err)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"Attribute" => in_attribute = has_name(&e, attribute_name)?,
                    b"AttributeValue" if in_attribute => current = Some(String::new()),
                    _ => {}
                },
                Event::Empty(e) if in_attribute => {
                    if e.local_name().as_ref() == b"AttributeValue" {
                        values.push(String::new());
                    }
                }
                Event::Text(e) => {
                    if let Some(value) = current.as_mut() {
                        value.push_str(&e.unescape().map_err(xml_err)?);
                    }
                }
                Event::CData(e) => {
                    if let Some(value) = current.as_mut() {
                        value.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"AttributeValue" => values.extend(current.take()),
                    b"Attribute" => in_attribute = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        trace!("Attribute {attribute_name} has {} value(s)", values.len());
        Ok(values)
    }

    /// Reads the first `Conditions` element of the document.
    pub fn conditions(&self) -> Result<Conditions> {
        let mut reader = self.reader();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf).map_err(xml_err)? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Conditions" => {
                    return Ok(Conditions {
                        not_before: timestamp_attribute(&e, "NotBefore")?,
                        not_on_or_after: timestamp_attribute(&e, "NotOnOrAfter")?,
                    });
                }
                Event::Eof => return Err(Error::MissingConditions("Conditions")),
                _ => {}
            }
            buf.clear();
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.conditions()?.contains(now))
    }

    pub fn role_session_name(&self) -> Result<Option<String>> {
        Ok(self
            .attribute_values(ROLE_SESSION_NAME_ATTRIBUTE)?
            .into_iter()
            .next())
    }

    /// Maximum session duration advertised by the identity provider, if any.
    pub fn session_duration(&self) -> Result<Option<i32>> {
        let Some(raw) = self
            .attribute_values(SESSION_DURATION_ATTRIBUTE)?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        match raw.trim().parse() {
            Ok(duration) => Ok(Some(duration)),
            Err(_) => {
                warn!("Ignoring unparsable SessionDuration attribute {raw:?}");
                Ok(None)
            }
        }
    }
}

/// Whether `assertion` can be exchanged right now. Empty input is never valid.
pub fn is_valid(assertion: &str) -> Result<bool> {
    is_valid_at(assertion, Utc::now())
}

pub fn is_valid_at(assertion: &str, now: DateTime<Utc>) -> Result<bool> {
    if assertion.is_empty() {
        return Ok(false);
    }
    SamlResponse::from_base64(assertion)?.is_valid_at(now)
}

/// Whether `assertion` can no longer be exchanged. Empty input counts as expired.
pub fn is_expired(assertion: &str) -> Result<bool> {
    is_expired_at(assertion, Utc::now())
}

pub fn is_expired_at(assertion: &str, now: DateTime<Utc>) -> Result<bool> {
    if assertion.is_empty() {
        return Ok(true);
    }
    Ok(SamlResponse::from_base64(assertion)?
        .conditions()?
        .has_expired(now))
}

fn attribute_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value().map_err(xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

fn has_name(e: &BytesStart, expected: &str) -> Result<bool> {
    Ok(attribute_value(e, b"Name")?.is_some_and(|name| name == expected))
}

fn timestamp_attribute(e: &BytesStart, attribute: &'static str) -> Result<DateTime<Utc>> {
    let value =
        attribute_value(e, attribute.as_bytes())?.ok_or(Error::MissingConditions(attribute))?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| Error::InvalidTimestamp {
            attribute,
            value,
            source,
        })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::types::ROLE_ATTRIBUTE;
    use chrono::TimeZone;

    const NOT_BEFORE: &str = "2024-05-01T10:00:00.000Z";
    const NOT_ON_OR_AFTER: &str = "2024-05-01T11:00:00.000Z";

    fn window_assertion() -> String {
        encode(&response_xml(NOT_BEFORE, NOT_ON_OR_AFTER, &[], ""))
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_validity_window_boundaries() {
        let assertion = window_assertion();
        assert!(!is_valid_at(&assertion, at(9, 59, 59)).unwrap());
        assert!(is_valid_at(&assertion, at(10, 0, 0)).unwrap());
        assert!(is_valid_at(&assertion, at(10, 30, 0)).unwrap());
        assert!(is_valid_at(&assertion, at(10, 59, 59)).unwrap());
        // expiry itself is already expired
        assert!(!is_valid_at(&assertion, at(11, 0, 0)).unwrap());
        assert!(!is_valid_at(&assertion, at(12, 0, 0)).unwrap());
    }

    #[test]
    fn test_expiry_ignores_not_before() {
        let assertion = window_assertion();
        assert!(!is_expired_at(&assertion, at(9, 59, 58)).unwrap());
        assert!(!is_expired_at(&assertion, at(10, 59, 59)).unwrap());
        assert!(is_expired_at(&assertion, at(11, 0, 0)).unwrap());
        assert!(is_expired("").unwrap());
    }

    #[test]
    fn test_fractional_seconds_are_accepted() {
        let assertion = encode(&response_xml(
            "2024-05-01T10:00:00.123456789Z",
            "2024-05-01T10:00:01.5Z",
            &[],
            "",
        ));
        let conditions = SamlResponse::from_base64(&assertion)
            .unwrap()
            .conditions()
            .unwrap();
        assert_eq!(conditions.not_before.timestamp_subsec_nanos(), 123_456_789);
        assert!(conditions.contains(at(10, 0, 1)));
        assert!(!conditions.contains(at(10, 0, 2)));
    }

    #[test]
    fn test_empty_assertion_is_not_valid() {
        assert!(!is_valid("").unwrap());
    }

    #[test]
    fn test_undecodable_assertion_is_an_error() {
        assert!(matches!(
            is_valid("%%% not base64 %%%"),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_invalid_timestamp_is_an_error() {
        let assertion = encode(&response_xml("yesterday", NOT_ON_OR_AFTER, &[], ""));
        match is_valid(&assertion) {
            Err(Error::InvalidTimestamp {
                attribute, value, ..
            }) => {
                assert_eq!(attribute, "NotBefore");
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected InvalidTimestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_conditions_is_an_error() {
        let assertion = encode("<Response><Assertion/></Response>");
        assert!(matches!(
            is_valid(&assertion),
            Err(Error::MissingConditions("Conditions"))
        ));
    }

    #[test]
    fn test_whitespace_in_encoded_assertion_is_ignored() {
        let assertion = window_assertion();
        let (head, tail) = assertion.split_at(40);
        let wrapped = format!("{head}\r\n{tail}\n");
        assert!(is_valid_at(&wrapped, at(10, 30, 0)).unwrap());
    }

    #[test]
    fn test_attribute_values_in_document_order() {
        let assertion = encode(&response_xml(
            NOT_BEFORE,
            NOT_ON_OR_AFTER,
            &["arn:role/A,arn:principal/X", "arn:role/B,arn:principal/Y"],
            "",
        ));
        let response = SamlResponse::from_base64(&assertion).unwrap();
        assert_eq!(
            response.attribute_values(ROLE_ATTRIBUTE).unwrap(),
            vec!["arn:role/A,arn:principal/X", "arn:role/B,arn:principal/Y"]
        );
    }

    #[test]
    fn test_absent_attribute_is_empty() {
        let response = SamlResponse::from_base64(&window_assertion()).unwrap();
        assert!(response
            .attribute_values("urn:example:missing")
            .unwrap()
            .is_empty());
        assert_eq!(response.role_session_name().unwrap(), None);
        assert_eq!(response.session_duration().unwrap(), None);
    }

    #[test]
    fn test_attribute_values_without_namespace_prefix() {
        let xml = format!(
            r#"<Response><Assertion><AttributeStatement>
                <Attribute Name="{ROLE_ATTRIBUTE}">
                    <AttributeValue> arn:role/A,arn:principal/X </AttributeValue>
                    <AttributeValue><![CDATA[arn:role/B,arn:principal/Y]]></AttributeValue>
                </Attribute>
                <Attribute Name="other"><AttributeValue>ignored</AttributeValue></Attribute>
            </AttributeStatement></Assertion></Response>"#
        );
        let response = SamlResponse::from_base64(&encode(&xml)).unwrap();
        assert_eq!(
            response.attribute_values(ROLE_ATTRIBUTE).unwrap(),
            vec!["arn:role/A,arn:principal/X", "arn:role/B,arn:principal/Y"]
        );
    }

    #[test]
    fn test_broken_xml_is_an_error() {
        let response =
            SamlResponse::from_base64(&encode("<Response><Attribute Name=\"x\"></Response>"))
                .unwrap();
        assert!(matches!(
            response.attribute_values("x"),
            Err(Error::Xml(_))
        ));
    }

    #[test]
    fn test_session_attributes() {
        let assertion = encode(&response_xml(
            NOT_BEFORE,
            NOT_ON_OR_AFTER,
            &[],
            &session_attributes("jane@example.com", "43200"),
        ));
        let response = SamlResponse::from_base64(&assertion).unwrap();
        assert_eq!(
            response.role_session_name().unwrap().as_deref(),
            Some("jane@example.com")
        );
        assert_eq!(response.session_duration().unwrap(), Some(43200));
    }

    #[test]
    fn test_unparsable_session_duration_is_ignored() {
        let assertion = encode(&response_xml(
            NOT_BEFORE,
            NOT_ON_OR_AFTER,
            &[],
            &session_attributes("jane@example.com", "twelve hours"),
        ));
        let response = SamlResponse::from_base64(&assertion).unwrap();
        assert_eq!(response.session_duration().unwrap(), None);
    }
}
