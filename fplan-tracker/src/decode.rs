//! XML feed payloads to message trees
//!
//! Feed messages arrive as XML text. They are turned into the tree layout
//! the normalizer probes:
//! - the document is an object keyed by the root element name
//! - attributes become `@name` keys
//! - text of an element with attributes or children lands under `#text`
//! - a text-only element becomes a string and an empty one becomes `null`
//! - repeated child elements collect into an array
//!
//! Namespace prefixes stay part of the key (`fdm:arrivalInformation`).

use fplan_common::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Decode(format!("Malformed XML attribute: {}", e)))?;
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Decode(format!("Malformed XML attribute value: {}", e)))?;
            fields.insert(
                format!("@{}", String::from_utf8_lossy(attr.key.as_ref())),
                Value::String(value.into_owned()),
            );
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            fields,
            text: String::new(),
        })
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    fn into_value(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text".to_string(), Value::String(text.to_string()));
            }
            Value::Object(fields)
        };
        (self.name, value)
    }
}

/// Decode one XML document into a message tree
pub fn xml_to_tree(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::Decode(format!("Malformed XML: {}", e)))?;

        let closed = match event {
            Event::Start(start) => {
                open.push(Element::open(&start)?);
                None
            }
            Event::Empty(start) => Some(Element::open(&start)?),
            Event::End(_) => open.pop(),
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| Error::Decode(format!("Malformed XML text: {}", e)))?;
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&text);
                }
                None
            }
            Event::CData(data) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some(element) = closed {
            let (name, value) = element.into_value();
            match open.last_mut() {
                Some(parent) => parent.add_child(name, value),
                None if root.is_none() => root = Some((name, value)),
                None => return Err(Error::Decode("XML has more than one root element".to_string())),
            }
        }
    }

    if !open.is_empty() {
        return Err(Error::Decode("XML ended inside an open element".to_string()));
    }

    let (name, value) = root.ok_or_else(|| Error::Decode("No XML root element".to_string()))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attributes_text_and_children() {
        let tree = xml_to_tree(
            r#"<fdm:fltdMessage acid="N1QS" msgType="FlightTimes">
                 <fdm:ncsmFlightTimes>
                   <nxcm:eta etaType="ESTIMATED" timeValue="2025-06-02T12:00:00Z"/>
                   <nxcm:timeOfArrival estimated="true">2025-06-02T12:05:00Z</nxcm:timeOfArrival>
                   <nxcm:flightAircraftSpecs>C68A</nxcm:flightAircraftSpecs>
                   <nxcm:rvsmData/>
                 </fdm:ncsmFlightTimes>
               </fdm:fltdMessage>"#,
        )
        .unwrap();

        assert_eq!(
            tree,
            json!({"fdm:fltdMessage": {
                "@acid": "N1QS",
                "@msgType": "FlightTimes",
                "fdm:ncsmFlightTimes": {
                    "nxcm:eta": {"@etaType": "ESTIMATED", "@timeValue": "2025-06-02T12:00:00Z"},
                    "nxcm:timeOfArrival": {"@estimated": "true", "#text": "2025-06-02T12:05:00Z"},
                    "nxcm:flightAircraftSpecs": "C68A",
                    "nxcm:rvsmData": null
                }
            }})
        );
    }

    #[test]
    fn test_repeated_children_collect_into_array() {
        let tree = xml_to_tree("<r><leg>A</leg><leg>B</leg><leg>C</leg></r>").unwrap();
        assert_eq!(tree, json!({"r": {"leg": ["A", "B", "C"]}}));
    }

    #[test]
    fn test_entities_unescaped() {
        let tree = xml_to_tree(r#"<r note="a &amp; b">x &lt; y</r>"#).unwrap();
        assert_eq!(tree, json!({"r": {"@note": "a & b", "#text": "x < y"}}));
    }

    #[test]
    fn test_non_xml_is_error() {
        assert!(matches!(xml_to_tree("test"), Err(Error::Decode(_))));
        assert!(matches!(xml_to_tree(""), Err(Error::Decode(_))));
        assert!(xml_to_tree("<a><b></a>").is_err());
        assert!(xml_to_tree("<a>").is_err());
    }
}
