//! Conversion of DynamoDB attribute-typed JSON (`{ "name": { "S": "Ada" } }`)
//! into plain JSON values.

use serde_json::{ Map, Number, Value };

const TYPE_TAGS: [&str; 10] = ["S", "N", "BOOL", "NULL", "L", "M", "SS", "NS", "B", "BS"];

/// Unwraps a response body. `Item` and `Items` wrappers are flattened to the
/// item (or list of items) they hold; other objects have their attribute
/// values unwrapped field by field.
pub fn unwrap_response(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(item) = map.remove("Item") {
                return unwrap_item(item);
            }
            if let Some(Value::Array(items)) = map.remove("Items") {
                return Value::Array(items.into_iter().map(unwrap_item).collect());
            }
            unwrap_item(Value::Object(map))
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_item).collect()),
        other => other,
    }
}

pub fn unwrap_item(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter().map(|(key, field)| (key, unwrap_attribute(field))).collect()
        ),
        other => other,
    }
}

/// Decodes one attribute value. Anything that is not a single-tag typed
/// object is returned unchanged.
pub fn unwrap_attribute(value: Value) -> Value {
    let (tag, inner) = match value {
        Value::Object(map) if is_typed(&map) => match map.into_iter().next() {
            Some(pair) => pair,
            None => {
                return Value::Null;
            }
        },
        other => {
            return other;
        }
    };

    match (tag.as_str(), inner) {
        ("S", s @ Value::String(_)) => s,
        ("N", Value::String(n)) => parse_number(&n),
        ("BOOL", b @ Value::Bool(_)) => b,
        ("NULL", _) => Value::Null,
        ("L", Value::Array(items)) => Value::Array(items.into_iter().map(unwrap_attribute).collect()),
        ("M", Value::Object(map)) => unwrap_item(Value::Object(map)),
        ("SS", set @ Value::Array(_)) | ("BS", set @ Value::Array(_)) => set,
        ("NS", Value::Array(items)) => Value::Array(
            items
                .into_iter()
                .map(|n| match n {
                    Value::String(s) => parse_number(&s),
                    other => other,
                })
                .collect()
        ),
        ("B", b) => b,
        (tag, inner) => {
            let mut map = Map::new();
            map.insert(tag.to_string(), inner);
            Value::Object(map)
        }
    }
}

fn is_typed(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.keys().all(|tag| TYPE_TAGS.contains(&tag.as_str()))
}

fn parse_number(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_scalar_attributes() {
        let item = json!({
            "record_id": { "S": "EDU-001" },
            "attendance": { "N": "92" },
            "engagement": { "N": "0.75" },
            "active": { "BOOL": true },
            "notes": { "NULL": true }
        });
        assert_eq!(
            unwrap_item(item),
            json!({
                "record_id": "EDU-001",
                "attendance": 92,
                "engagement": 0.75,
                "active": true,
                "notes": null
            })
        );
    }

    #[test]
    fn unwraps_nested_lists_maps_and_sets() {
        let item = json!({
            "sessions": { "L": [ { "S": "math" }, { "N": "3" } ] },
            "guardian": { "M": { "name": { "S": "Kim" } } },
            "tags": { "SS": ["a", "b"] },
            "scores": { "NS": ["1", "2.5"] }
        });
        assert_eq!(
            unwrap_item(item),
            json!({
                "sessions": ["math", 3],
                "guardian": { "name": "Kim" },
                "tags": ["a", "b"],
                "scores": [1, 2.5]
            })
        );
    }

    #[test]
    fn plain_values_are_left_alone() {
        let item = json!({ "name": "Ada", "meta": { "S": "x", "extra": 1 }, "grade": { "X": "1" } });
        assert_eq!(unwrap_item(item.clone()), item);
    }

    #[test]
    fn item_wrappers_are_flattened() {
        let single = json!({ "Item": { "name": { "S": "Ada" } } });
        assert_eq!(unwrap_response(single), json!({ "name": "Ada" }));

        let many = json!({ "Items": [ { "name": { "S": "Ada" } }, { "name": { "S": "Lin" } } ], "Count": 2 });
        assert_eq!(unwrap_response(many), json!([{ "name": "Ada" }, { "name": "Lin" }]));
    }

    #[test]
    fn unparsable_numbers_stay_strings() {
        assert_eq!(unwrap_attribute(json!({ "N": "n/a" })), json!("n/a"));
    }
}
