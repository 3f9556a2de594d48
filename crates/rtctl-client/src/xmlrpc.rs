//! XML-RPC request encoding and response decoding.
//!
//! # Design
//! - Responses are first read into a small element tree, then interpreted; text
//!   is kept verbatim so string values keep their whitespace.
//! - Namespace prefixes are ignored, so `<ex:nil/>` and `<ex:i8>` decode like
//!   their unprefixed forms.
//! - Integers outside the `i32` range are encoded as `<i8>`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use rtctl_core::{Fault, Value};

use crate::error::XmlRpcError;

/// Decoded `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    /// The call succeeded with this value.
    Success(Value),
    /// The call failed as a whole.
    Fault(Fault),
}

/// Encode a `<methodCall>` document.
#[must_use]
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(param, &mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn write_tagged(tag: &str, text: &str, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(text);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Nil => out.push_str("<nil/>"),
        Value::Bool(flag) => write_tagged("boolean", if *flag { "1" } else { "0" }, out),
        Value::Int(number) => {
            let tag = if i32::try_from(*number).is_ok() { "i4" } else { "i8" };
            write_tagged(tag, &number.to_string(), out);
        }
        Value::Double(number) => write_tagged("double", &number.to_string(), out),
        Value::Str(text) => write_tagged("string", &escape(text.as_str()), out),
        Value::Bytes(bytes) => write_tagged("base64", &STANDARD.encode(bytes), out),
        Value::DateTime(stamp) => write_tagged("dateTime.iso8601", &escape(stamp.as_str()), out),
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member>");
                write_tagged("name", &escape(name.as_str()), out);
                write_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Decode a `<methodResponse>` document.
///
/// # Errors
///
/// Returns an [`XmlRpcError`] when the document is malformed or does not follow
/// the XML-RPC response grammar.
pub fn decode_response(xml: &str) -> Result<MethodResponse, XmlRpcError> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(XmlRpcError::MissingElement {
            expected: "methodResponse",
        });
    }
    if let Some(fault) = root.child("fault") {
        let value = decode_value(fault.require("value")?)?;
        let fault = value.as_fault().ok_or(XmlRpcError::MissingElement {
            expected: "faultCode",
        })?;
        return Ok(MethodResponse::Fault(fault));
    }
    let value = root
        .require("params")?
        .require("param")?
        .require("value")?;
    decode_value(value).map(MethodResponse::Success)
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(start: &BytesStart<'_>) -> Result<Self, XmlRpcError> {
        let name = std::str::from_utf8(start.local_name().as_ref())
            .map_err(|_| XmlRpcError::InvalidName)?
            .to_string();
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    fn require(&self, name: &'static str) -> Result<&Self, XmlRpcError> {
        self.child(name)
            .ok_or(XmlRpcError::MissingElement { expected: name })
    }
}

fn parse_tree(xml: &str) -> Result<Element, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    let mut stack = vec![Element::default()];
    loop {
        match reader
            .read_event()
            .map_err(|source| XmlRpcError::Syntax { source })?
        {
            Event::Start(start) => stack.push(Element::named(&start)?),
            Event::Empty(start) => {
                let element = Element::named(&start)?;
                stack
                    .last_mut()
                    .ok_or(XmlRpcError::Unbalanced)?
                    .children
                    .push(element);
            }
            Event::End(_) => {
                let done = stack.pop().ok_or(XmlRpcError::Unbalanced)?;
                stack
                    .last_mut()
                    .ok_or(XmlRpcError::Unbalanced)?
                    .children
                    .push(done);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|source| XmlRpcError::Syntax { source })?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data).map_err(|_| XmlRpcError::InvalidScalar {
                    kind: "cdata",
                    text: String::from_utf8_lossy(&data).into_owned(),
                })?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    let document = stack.pop().ok_or(XmlRpcError::Unbalanced)?;
    if !stack.is_empty() {
        return Err(XmlRpcError::Unbalanced);
    }
    document
        .children
        .into_iter()
        .next()
        .ok_or(XmlRpcError::MissingElement {
            expected: "methodResponse",
        })
}

fn decode_value(element: &Element) -> Result<Value, XmlRpcError> {
    let Some(typed) = element.children.first() else {
        return Ok(Value::Str(element.text.clone()));
    };
    let text = typed.text.trim();
    let invalid = |kind: &'static str| XmlRpcError::InvalidScalar {
        kind,
        text: text.to_string(),
    };
    match typed.name.as_str() {
        "i4" | "i8" | "int" => text.parse().map(Value::Int).map_err(|_| invalid("int")),
        "boolean" => match text {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            _ => Err(invalid("boolean")),
        },
        "double" => text
            .parse()
            .map(Value::Double)
            .map_err(|_| invalid("double")),
        "string" => Ok(Value::Str(typed.text.clone())),
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map(Value::Bytes)
                .map_err(|source| XmlRpcError::InvalidBase64 { source })
        }
        "dateTime.iso8601" => Ok(Value::DateTime(text.to_string())),
        "nil" => Ok(Value::Nil),
        "array" => {
            let Some(data) = typed.child("data") else {
                return Ok(Value::Array(Vec::new()));
            };
            data.children
                .iter()
                .filter(|child| child.name == "value")
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = IndexMap::with_capacity(typed.children.len());
            for member in typed.children.iter().filter(|child| child.name == "member") {
                let name = member.require("name")?.text.clone();
                let value = decode_value(member.require("value")?)?;
                members.insert(name, value);
            }
            Ok(Value::Struct(members))
        }
        other => Err(XmlRpcError::UnknownType {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?>\n<methodResponse>\n<params>\n<param><value>{value}</value></param>\n</params>\n</methodResponse>"
        )
    }

    #[test]
    fn encodes_typed_parameters() {
        let mut members = IndexMap::new();
        members.insert("methodName".to_string(), Value::str("d.name"));
        let xml = encode_call(
            "system.multicall",
            &[
                Value::Int(7),
                Value::Int(5_000_000_000),
                Value::str("a<b&c"),
                Value::Bytes(b"hi".to_vec()),
                Value::Nil,
                Value::Bool(true),
                Value::Array(vec![Value::Struct(members)]),
            ],
        );
        assert!(xml.starts_with("<?xml version=\"1.0\"?><methodCall><methodName>system.multicall</methodName>"));
        assert!(xml.contains("<value><i4>7</i4></value>"));
        assert!(xml.contains("<value><i8>5000000000</i8></value>"));
        assert!(xml.contains("<value><string>a&lt;b&amp;c</string></value>"));
        assert!(xml.contains("<value><base64>aGk=</base64></value>"));
        assert!(xml.contains("<value><nil/></value>"));
        assert!(xml.contains("<value><boolean>1</boolean></value>"));
        assert!(xml.contains(
            "<array><data><value><struct><member><name>methodName</name><value><string>d.name</string></value></member></struct></value></data></array>"
        ));
    }

    #[test]
    fn decodes_scalars() -> Result<(), XmlRpcError> {
        let cases = [
            ("<i4>42</i4>", Value::Int(42)),
            ("<i8>-5000000000</i8>", Value::Int(-5_000_000_000)),
            ("<int>0</int>", Value::Int(0)),
            ("<boolean>1</boolean>", Value::Bool(true)),
            ("<double>1.5</double>", Value::Double(1.5)),
            ("<string> padded </string>", Value::str(" padded ")),
            ("untyped &amp; raw", Value::str("untyped & raw")),
            ("<base64>aGk=</base64>", Value::Bytes(b"hi".to_vec())),
            (
                "<dateTime.iso8601>20240101T00:00:00</dateTime.iso8601>",
                Value::DateTime("20240101T00:00:00".to_string()),
            ),
            ("<nil/>", Value::Nil),
            ("<ex:nil/>", Value::Nil),
            ("<string><![CDATA[x<y]]></string>", Value::str("x<y")),
        ];
        for (body, expected) in cases {
            assert_eq!(
                decode_response(&response(body))?,
                MethodResponse::Success(expected),
                "{body}"
            );
        }
        Ok(())
    }

    #[test]
    fn decodes_nested_multicall_results() -> Result<(), XmlRpcError> {
        let body = "<array><data>\
            <value><array><data><value><string>ABC</string></value></data></array></value>\
            <value><struct>\
              <member><name>faultCode</name><value><i4>-501</i4></value></member>\
              <member><name>faultString</name><value><string>bad hash</string></value></member>\
            </struct></value>\
            <value><array></array></value>\
            </data></array>";
        let MethodResponse::Success(Value::Array(results)) = decode_response(&response(body))?
        else {
            panic!("expected array response");
        };
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Value::Array(vec![Value::str("ABC")]));
        let fault = results[1].as_fault().expect("fault element");
        assert_eq!(fault.code, -501);
        assert_eq!(fault.message, "bad hash");
        assert_eq!(results[2], Value::Array(Vec::new()));
        Ok(())
    }

    #[test]
    fn decodes_top_level_faults() -> Result<(), XmlRpcError> {
        let xml = "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><int>-506</int></value></member>\
            <member><name>faultString</name><value><string>Method 'x' not defined</string></value></member>\
            </struct></value></fault></methodResponse>";
        match decode_response(xml)? {
            MethodResponse::Fault(fault) => {
                assert_eq!(fault.code, -506);
                assert_eq!(fault.message, "Method 'x' not defined");
            }
            other => panic!("unexpected response {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            decode_response("<methodResponse><params></methodResponse>"),
            Err(XmlRpcError::Syntax { .. })
        ));
        assert!(matches!(
            decode_response(&response("<i4>nope</i4>")),
            Err(XmlRpcError::InvalidScalar { kind: "int", .. })
        ));
        assert!(matches!(
            decode_response(&response("<bignum>1</bignum>")),
            Err(XmlRpcError::UnknownType { .. })
        ));
        assert!(matches!(
            decode_response("<methodCall></methodCall>"),
            Err(XmlRpcError::MissingElement {
                expected: "methodResponse"
            })
        ));
        assert!(matches!(
            decode_response("<methodResponse></methodResponse>"),
            Err(XmlRpcError::MissingElement { expected: "params" })
        ));
    }
}
