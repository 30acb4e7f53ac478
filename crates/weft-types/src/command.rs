//! Command classification.
//!
//! Raw commands arrive as untyped JSON values. [`Command::classify`] sorts
//! each value into a [`CommandKind`] exactly once, so the interpreter can
//! dispatch with an exhaustive match instead of re-sniffing object keys at
//! every step. Classification is total: shapes that match nothing fall back
//! to [`CommandKind::Verbatim`].

use crate::reference::RefExpr;
use crate::Value;
use serde::{Deserialize, Serialize};

/// The kind of a classified command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// `{".path@": value}` / `{"..path@": value}` — merge-or-replace write.
    Assignment { dest: RefExpr, value: Value },
    /// `{"if": [cond, ifTrue, ifFalse]}`.
    Conditional {
        cond: Value,
        if_true: Value,
        if_false: Value,
    },
    /// `{"goto": destination}` — always terminates further chain execution.
    Goto { destination: Value },
    /// `{"=.path.to.fn": {...}}` — invoke a registered builtin by reference.
    BuiltinCall {
        name: RefExpr,
        data_in: Option<Value>,
        data_out: Option<RefExpr>,
    },
    /// A JSON array of commands, evaluated strictly in order.
    Composite(Vec<Command>),
    /// Anything else: passed through the interpreter untouched.
    Verbatim(Value),
}

/// A classified command paired with its immutable original value.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The raw value the command was classified from. Kept unmodified for
    /// re-resolution against the live tree and for snapshots.
    pub raw: Value,
    /// The classified kind.
    pub kind: CommandKind,
}

impl Command {
    /// Classify a raw value into a command. Total; never fails.
    pub fn classify(raw: Value) -> Command {
        let kind = classify_kind(&raw);
        Command { raw, kind }
    }

    /// A short tag naming the command kind, used for action types and logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            CommandKind::Assignment { .. } => "assignment",
            CommandKind::Conditional { .. } => "conditional",
            CommandKind::Goto { .. } => "goto",
            CommandKind::BuiltinCall { .. } => "builtin_call",
            CommandKind::Composite(_) => "composite",
            CommandKind::Verbatim(_) => "verbatim",
        }
    }
}

fn classify_kind(raw: &Value) -> CommandKind {
    match raw {
        Value::Array(items) => {
            CommandKind::Composite(items.iter().cloned().map(Command::classify).collect())
        }
        Value::Object(map) => classify_object(map),
        other => CommandKind::Verbatim(other.clone()),
    }
}

fn classify_object(map: &serde_json::Map<String, Value>) -> CommandKind {
    if let Some(Value::Array(arms)) = map.get("if") {
        if arms.len() == 3 {
            return CommandKind::Conditional {
                cond: arms[0].clone(),
                if_true: arms[1].clone(),
                if_false: arms[2].clone(),
            };
        }
    }

    if let Some(dest) = map.get("goto") {
        return CommandKind::Goto {
            destination: dest.clone(),
        };
    }

    // Builtin calls and assignments are single-key objects whose key is a
    // reference expression.
    if map.len() == 1 {
        let (key, value) = map.iter().next().unwrap();
        if let Some(r) = RefExpr::parse(key) {
            if r.eval {
                let (data_in, data_out) = split_call_descriptor(value);
                return CommandKind::BuiltinCall {
                    name: r,
                    data_in,
                    data_out,
                };
            }
            if r.assign {
                return CommandKind::Assignment {
                    dest: r,
                    value: value.clone(),
                };
            }
        }
    }

    CommandKind::Verbatim(Value::Object(map.clone()))
}

/// Pull `dataIn`/`dataOut` out of a builtin-call descriptor.
///
/// Descriptor objects carrying the legacy `dataKey` name are normalized to
/// `dataIn`. A non-descriptor value is the call input as-is.
fn split_call_descriptor(value: &Value) -> (Option<Value>, Option<RefExpr>) {
    if let Value::Object(map) = value {
        if map.contains_key("dataIn") || map.contains_key("dataOut") || map.contains_key("dataKey")
        {
            let data_in = map.get("dataIn").or_else(|| map.get("dataKey")).cloned();
            let data_out = map
                .get("dataOut")
                .and_then(Value::as_str)
                .and_then(RefExpr::parse);
            return (data_in, data_out);
        }
    }
    if value.is_null() {
        (None, None)
    } else {
        (Some(value.clone()), None)
    }
}

/// Explicit boolean coercion for conditionals.
///
/// - booleans pass through;
/// - `"true"` / `"false"` (case-insensitive) coerce to their value;
/// - other strings: non-empty is true;
/// - numbers: non-zero is true;
/// - null is false; arrays and objects are true.
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => {
            if s.eq_ignore_ascii_case("true") {
                true
            } else if s.eq_ignore_ascii_case("false") {
                false
            } else {
                !s.is_empty()
            }
        }
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

// Serde passthrough: a Command serializes as its raw value.
impl Serialize for Command {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Command::classify(Value::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_assignment() {
        let cmd = Command::classify(json!({".path@": 6}));
        match cmd.kind {
            CommandKind::Assignment { dest, value } => {
                assert_eq!(dest.path, vec!["path"]);
                assert_eq!(value, json!(6));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn classify_conditional() {
        let cmd = Command::classify(json!({"if": [true, "X", "Y"]}));
        assert!(matches!(cmd.kind, CommandKind::Conditional { .. }));
    }

    #[test]
    fn classify_goto() {
        let cmd = Command::classify(json!({"goto": "SignIn"}));
        assert!(matches!(cmd.kind, CommandKind::Goto { .. }));
    }

    #[test]
    fn classify_builtin_call_with_descriptor() {
        let cmd = Command::classify(json!({
            "=.builtin.fetch": {"dataIn": {"url": "~/api"}, "dataOut": "..response"}
        }));
        match cmd.kind {
            CommandKind::BuiltinCall {
                name,
                data_in,
                data_out,
            } => {
                assert_eq!(name.path, vec!["builtin", "fetch"]);
                assert_eq!(data_in, Some(json!({"url": "~/api"})));
                assert_eq!(data_out.unwrap().path, vec!["response"]);
            }
            other => panic!("expected builtin call, got {other:?}"),
        }
    }

    #[test]
    fn data_key_normalizes_to_data_in() {
        let cmd = Command::classify(json!({"=.builtin.echo": {"dataKey": "..selection"}}));
        match cmd.kind {
            CommandKind::BuiltinCall { data_in, .. } => {
                assert_eq!(data_in, Some(json!("..selection")));
            }
            other => panic!("expected builtin call, got {other:?}"),
        }
    }

    #[test]
    fn classify_composite() {
        let cmd = Command::classify(json!([{".a@": 1}, {".b@": 2}]));
        match cmd.kind {
            CommandKind::Composite(cmds) => assert_eq!(cmds.len(), 2),
            other => panic!("expected composite, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_shapes_are_verbatim() {
        assert!(matches!(
            Command::classify(json!({"style": {"color": "red"}})).kind,
            CommandKind::Verbatim(_)
        ));
        assert!(matches!(
            Command::classify(json!("hello")).kind,
            CommandKind::Verbatim(_)
        ));
    }

    #[test]
    fn boolean_coercion_table() {
        assert!(to_boolean(&json!(true)));
        assert!(!to_boolean(&json!(false)));
        assert!(to_boolean(&json!("true")));
        assert!(!to_boolean(&json!("false")));
        assert!(!to_boolean(&json!("FALSE")));
        assert!(to_boolean(&json!("yes")));
        assert!(!to_boolean(&json!("")));
        assert!(to_boolean(&json!(1)));
        assert!(!to_boolean(&json!(0)));
        assert!(!to_boolean(&json!(null)));
        assert!(to_boolean(&json!({})));
        assert!(to_boolean(&json!([])));
    }
}
