//! Flattening of nested bulletin elements into a single property map.
//!
//! Every child element contributes one key built from its tag name and its
//! `type`, `unit` and `condition` attributes, so siblings such as
//! `<Wave type="A">` and `<Wave type="B">` land on different keys. Nested
//! elements are flattened recursively and their keys prefixed with the
//! parent's key.

use geojson::{JsonObject, JsonValue};

use crate::xml::Element;

/// Tag whose text and `type` are written to fixed top-level keys.
pub const DATETIME_TAG: &str = "DateTime";

/// Attributes that qualify a child's key, in key order.
const QUALIFIERS: [&str; 3] = ["type", "unit", "condition"];

/// Builds the property key for a child element:
/// `tag[_type][_unit][_condition]`, skipping missing or empty qualifiers.
#[must_use]
pub fn property_key(element: &Element) -> String {
    let mut key = element.name.clone();
    for qualifier in QUALIFIERS {
        if let Some(value) = element.attribute(qualifier).filter(|v| !v.is_empty()) {
            key.push('_');
            key.push_str(value);
        }
    }
    key
}

/// Flattens an element's attributes and descendants into one map.
///
/// Leaf children map to their text (`null` when empty). A `DateTime`
/// child writes `DateTime` and, if it has one, `type` directly. Later keys
/// overwrite earlier ones.
#[must_use]
pub fn flatten(element: &Element) -> JsonObject {
    let mut properties = JsonObject::new();

    for (name, value) in &element.attributes {
        properties.insert(name.clone(), JsonValue::String(value.clone()));
    }

    for child in &element.children {
        if child.name == DATETIME_TAG {
            properties.insert(DATETIME_TAG.to_string(), text_value(child));
            if let Some(kind) = child.attribute("type") {
                properties.insert("type".to_string(), JsonValue::String(kind.to_string()));
            }
            continue;
        }

        let key = property_key(child);

        if child.children.is_empty() {
            properties.insert(key, text_value(child));
        } else {
            for (nested_key, value) in flatten(child) {
                properties.insert(format!("{key}_{nested_key}"), value);
            }
        }
    }

    properties
}

fn text_value(element: &Element) -> JsonValue {
    element
        .text
        .as_ref()
        .map_or(JsonValue::Null, |t| JsonValue::String(t.clone()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::xml::parse_document;

    fn flatten_str(xml: &str) -> JsonObject {
        flatten(&parse_document(xml).unwrap())
    }

    #[test]
    fn sibling_qualifiers_produce_distinct_keys() {
        let props = flatten_str(
            r#"<Info><Wave type="A" unit="m">1.2</Wave><Wave type="B" unit="m">0.8</Wave></Info>"#,
        );

        assert_eq!(props.get("Wave_A_m"), Some(&json!("1.2")));
        assert_eq!(props.get("Wave_B_m"), Some(&json!("0.8")));
    }

    #[test]
    fn condition_qualifier_follows_type_and_unit() {
        let props = flatten_str(
            r#"<Info><Speed type="最大風速" unit="m/s" condition="中心付近">35</Speed></Info>"#,
        );
        assert_eq!(props.get("Speed_最大風速_m/s_中心付近"), Some(&json!("35")));
    }

    #[test]
    fn empty_qualifier_is_skipped() {
        let props = flatten_str(r#"<Info><Name type="">Halong</Name></Info>"#);
        assert_eq!(props.get("Name"), Some(&json!("Halong")));
    }

    #[test]
    fn nested_children_are_prefixed() {
        let props = flatten_str(
            r#"<Info type="台風情報"><Item><Kind><Property><Type>中心</Type></Property></Kind><Area><Name>沖縄</Name></Area></Item></Info>"#,
        );

        assert_eq!(props.get("type"), Some(&json!("台風情報")));
        assert_eq!(props.get("Item_Kind_Property_Type"), Some(&json!("中心")));
        assert_eq!(props.get("Item_Area_Name"), Some(&json!("沖縄")));
    }

    #[test]
    fn nested_element_attributes_are_prefixed() {
        let props = flatten_str(r#"<Info><Area codeType="地域"><Name>a</Name></Area></Info>"#);
        assert_eq!(props.get("Area_codeType"), Some(&json!("地域")));
        assert_eq!(props.get("Area_Name"), Some(&json!("a")));
    }

    #[test]
    fn datetime_child_writes_fixed_keys() {
        let props = flatten_str(
            r#"<Info type="block"><DateTime type="実況">2024-11-10T01:00:00+09:00</DateTime></Info>"#,
        );

        assert_eq!(props.get("DateTime"), Some(&json!("2024-11-10T01:00:00+09:00")));
        assert_eq!(props.get("type"), Some(&json!("実況")));
        assert!(props.keys().all(|k| !k.starts_with("DateTime_")));
    }

    #[test]
    fn nested_datetime_is_prefixed_by_parent() {
        let props = flatten_str(
            r#"<Info><Valid><DateTime type="予報">2024-11-11T00:00:00+09:00</DateTime></Valid></Info>"#,
        );

        assert_eq!(props.get("Valid_DateTime"), Some(&json!("2024-11-11T00:00:00+09:00")));
        assert_eq!(props.get("Valid_type"), Some(&json!("予報")));
    }

    #[test]
    fn empty_leaf_is_null() {
        let props = flatten_str("<Info><Remark/></Info>");
        assert_eq!(props.get("Remark"), Some(&JsonValue::Null));
    }

    #[test]
    fn later_sibling_overwrites_earlier_key() {
        let props = flatten_str("<Info><Name>first</Name><Name>second</Name></Info>");
        assert_eq!(props.get("Name"), Some(&json!("second")));
    }
}
