//! Dot-path traversal over JSON values.

use weft_types::Value;

/// Walk `path` segments through nested objects (numeric segments index into
/// arrays). Returns `None` when any segment is missing.
pub fn get_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut cur = value;
    for seg in path {
        cur = match cur {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Write `new` at `path`, creating missing intermediate objects.
///
/// When both the current value at `path` and `new` are objects, `new`'s keys
/// are merged in (non-destructive); otherwise the value is replaced outright.
/// With `merge` false the value always replaces.
pub fn set_path(target: &mut Value, path: &[String], new: Value, merge: bool) {
    let Some((last, parents)) = path.split_last() else {
        *target = new;
        return;
    };

    let mut cur = target;
    for seg in parents {
        if !cur.is_object() {
            *cur = Value::Object(serde_json::Map::new());
        }
        cur = cur
            .as_object_mut()
            .unwrap()
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }

    if !cur.is_object() {
        *cur = Value::Object(serde_json::Map::new());
    }
    let map = cur.as_object_mut().unwrap();

    match (merge, map.get_mut(last), new) {
        (true, Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (k, v) in incoming {
                existing.insert(k, v);
            }
        }
        (_, _, new) => {
            map.insert(last.clone(), new);
        }
    }
}
