//! Query-string encoding for GET arguments.
//!
//! Nested values are flattened with bracket keys (`merge_fields[FNAME]`,
//! `ids[0]`), booleans become `1`/`0`, and nulls are dropped.

use serde_json::Value;
use url::form_urlencoded;

/// Encode `args` as a query string. Anything other than a JSON object
/// encodes to an empty string.
pub fn encode_query(args: &Value) -> String {
    let mut pairs = Vec::new();
    if let Value::Object(map) = args {
        for (key, value) in map {
            flatten(key.clone(), value, &mut pairs);
        }
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn flatten(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => out.push((key, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => out.push((key, number.to_string())),
        Value::String(text) => out.push((key, text.clone())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{key}[{index}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (name, item) in map {
                flatten(format!("{key}[{name}]"), item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_object_encodes_pairs() {
        assert_eq!(encode_query(&json!({"count": 5, "offset": 10})), "count=5&offset=10");
    }

    #[test]
    fn empty_and_non_object_args_encode_to_nothing() {
        assert_eq!(encode_query(&json!({})), "");
        assert_eq!(encode_query(&Value::Null), "");
        assert_eq!(encode_query(&json!([1, 2])), "");
    }

    #[test]
    fn nested_values_use_brackets() {
        let query = encode_query(&json!({"ids": ["a", "b"], "merge": {"FNAME": "Ann"}}));
        assert_eq!(query, "ids%5B0%5D=a&ids%5B1%5D=b&merge%5BFNAME%5D=Ann");
    }

    #[test]
    fn booleans_and_nulls() {
        assert_eq!(encode_query(&json!({"a": true, "b": false, "c": null})), "a=1&b=0");
    }

    #[test]
    fn values_are_form_encoded() {
        assert_eq!(encode_query(&json!({"fields": "lists.id,lists.name", "q": "a b&c"})), "fields=lists.id%2Clists.name&q=a+b%26c");
    }
}
