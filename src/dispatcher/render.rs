//! Turning settled outcomes into display text.
//!
//! Both renderers take the payload as-is; whether it came from a resolved or
//! a rejected command makes no difference. Object entries are visited the way a
//! browser enumerates own properties: array-index keys first in ascending
//! numeric order, then the remaining keys in insertion order.

use serde_json::{Map, Number, Value};

/// Largest array index a property key can name (2^32 - 2).
const MAX_INDEX: u64 = 4_294_967_294;

/// Response region: text verbatim, anything else as compact JSON.
pub fn response_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => {
            let mut out = String::new();
            write_json(other, &mut out);
            out
        }
    }
}

/// Topic region: the payload's values, one per line, keys discarded.
///
/// A text payload contributes its characters as values, so a rejected
/// `list_topics` with an error message renders one character per line.
pub fn topic_list_text(value: &Value) -> String {
    let values: Vec<String> = match value {
        Value::Object(map) => ordered_entries(map)
            .into_iter()
            .map(|(_, item)| join_item(item))
            .collect(),
        Value::Array(items) => items.iter().map(join_item).collect(),
        Value::String(text) => text.chars().map(String::from).collect(),
        Value::Null | Value::Bool(_) | Value::Number(_) => Vec::new(),
    };
    values.join("\n")
}

fn array_index(key: &str) -> Option<u64> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u64>().ok().filter(|index| *index <= MAX_INDEX)
}

fn ordered_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut indexed: Vec<(u64, &String, &Value)> = Vec::new();
    let mut named: Vec<(&String, &Value)> = Vec::new();

    for (key, value) in map {
        match array_index(key) {
            Some(index) => indexed.push((index, key, value)),
            None => named.push((key, value)),
        }
    }
    indexed.sort_by_key(|(index, _, _)| *index);

    indexed
        .into_iter()
        .map(|(_, key, value)| (key, value))
        .chain(named)
        .collect()
}

// Integral floats print without a fractional part.
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < 1e21 => {
            if float == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", float)
            }
        }
        _ => number.to_string(),
    }
}

fn write_json(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Value::Number(number) => out.push_str(&number_text(number)),
        Value::String(_) => out.push_str(&serde_json::to_string(value).unwrap_or_default()),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in ordered_entries(map).into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_json(item, out);
            }
            out.push('}');
        }
    }
}

// Element text as produced by joining a list of loosely typed values.
fn join_item(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number_text(number),
        Value::Array(items) => items.iter().map(join_item).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_shows_text_verbatim() {
        assert_eq!(response_text(&json!("sent")), "sent");
        assert_eq!(response_text(&json!("")), "");
    }

    #[test]
    fn response_serializes_structured_values() {
        assert_eq!(
            response_text(&json!({ "status": "ok", "count": 1 })),
            r#"{"status":"ok","count":1}"#
        );
        assert_eq!(response_text(&json!(null)), "null");
        assert_eq!(response_text(&json!([1, "two"])), r#"[1,"two"]"#);
        assert_eq!(response_text(&json!(42)), "42");
    }

    #[test]
    fn topics_take_mapping_values_in_order() {
        assert_eq!(
            topic_list_text(&json!({ "a": "orders", "b": "payments" })),
            "orders\npayments"
        );
    }

    #[test]
    fn topics_accept_index_keyed_lists() {
        assert_eq!(topic_list_text(&json!(["orders", "payments"])), "orders\npayments");
        assert_eq!(topic_list_text(&json!([])), "");
    }

    #[test]
    fn text_failure_renders_one_character_per_line() {
        assert_eq!(topic_list_text(&json!("down")), "d\no\nw\nn");
    }

    #[test]
    fn scalar_payloads_render_empty_topic_list() {
        assert_eq!(topic_list_text(&json!(null)), "");
        assert_eq!(topic_list_text(&json!(7)), "");
        assert_eq!(topic_list_text(&json!(true)), "");
    }

    #[test]
    fn nested_values_render_like_joined_text() {
        let value = json!({ "a": null, "b": 3, "c": ["x", "y"], "d": { "k": "v" } });
        assert_eq!(topic_list_text(&value), "\n3\nx,y\n[object Object]");
    }

    #[test]
    fn index_keys_come_first_in_numeric_order() {
        let value = json!({ "b": "payments", "1": "orders", "0": "audit" });
        assert_eq!(topic_list_text(&value), "audit\norders\npayments");
        assert_eq!(
            response_text(&value),
            r#"{"0":"audit","1":"orders","b":"payments"}"#
        );
    }

    #[test]
    fn non_index_numeric_keys_keep_insertion_order() {
        let value = json!({ "10": "x", "2": "y", "01": "z", "4294967295": "w" });
        assert_eq!(
            response_text(&value),
            r#"{"2":"y","10":"x","01":"z","4294967295":"w"}"#
        );
    }

    #[test]
    fn integral_floats_drop_fraction() {
        assert_eq!(response_text(&json!({ "count": 1.0 })), r#"{"count":1}"#);
        assert_eq!(response_text(&json!([2.5, -3.0, 0.0])), "[2.5,-3,0]");
        assert_eq!(topic_list_text(&json!([4.0, "t"])), "4\nt");
    }

    #[test]
    fn nested_objects_and_strings_are_escaped() {
        let value = json!({ "msg": "say \"hi\"", "inner": { "1": true, "a": null } });
        assert_eq!(
            response_text(&value),
            r#"{"msg":"say \"hi\"","inner":{"1":true,"a":null}}"#
        );
    }
}
