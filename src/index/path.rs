use crate::core::types::{DocValue, IndexPath};

static NULL: DocValue = DocValue::Null;

/// Walk `path` through `doc` and collect the leaf values to index.
///
/// Arrays met on the way fan out over their elements with the rest of the
/// path; an array at the leaf is flattened. A scalar in the middle of the
/// path yields nothing.
pub fn get_in<'a>(doc: &'a DocValue, path: &IndexPath) -> Vec<&'a DocValue> {
    let mut out = Vec::new();
    if doc.is_object() {
        walk(doc, path.segments(), &mut out);
    }
    out
}

fn walk<'a>(mut thing: &'a DocValue, segments: &[String], out: &mut Vec<&'a DocValue>) {
    for (i, seg) in segments.iter().enumerate() {
        match thing {
            DocValue::Object(map) => match map.get(seg) {
                Some(next) => thing = next,
                None => thing = &NULL,
            },
            DocValue::Array(items) => {
                for item in items {
                    if item.is_object() {
                        walk(item, &segments[i..], out);
                    }
                }
                return;
            }
            _ => return,
        }
    }

    match thing {
        DocValue::Array(items) => out.extend(items.iter()),
        other => out.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_and_arrays() {
        let doc = json!({
            "a": {"b": [1, 2]},
            "tags": [{"name": "x"}, {"name": "y"}, {"other": 1}],
            "n": 5
        });

        let leaf = get_in(&doc, &IndexPath::new(["a", "b"]));
        assert_eq!(leaf, vec![&json!(1), &json!(2)]);

        let fanned = get_in(&doc, &IndexPath::new(["tags", "name"]));
        assert_eq!(fanned, vec![&json!("x"), &json!("y"), &DocValue::Null]);

        assert!(get_in(&doc, &IndexPath::new(["n", "deeper"])).is_empty());
        assert_eq!(get_in(&doc, &IndexPath::new(["missing"])), vec![&DocValue::Null]);
    }

    #[test]
    fn non_object_document_has_no_values() {
        assert!(get_in(&json!([1, 2]), &IndexPath::new(["a"])).is_empty());
    }
}
