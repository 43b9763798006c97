//! Normalization of the accepted plan spec shapes.
//!
//! A spec is one of:
//!
//! - a list of step objects (or bare command strings),
//! - a single command string,
//! - an object with a `steps` list and an optional `title`,
//! - a single step object.
//!
//! All four normalize to the same list of [`StepSpec`] values.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{KeelError, Result},
    models::{Language, StepAction},
};

/// A reference from one step's `after` list to another step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StepRef {
    /// Position in the spec (0-indexed)
    Index(usize),
    /// A step's `key`
    Key(String),
    /// `{ "id": "..." }`, matched like a key
    Object { id: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AfterField {
    Many(Vec<StepRef>),
    One(StepRef),
}

impl From<AfterField> for Vec<StepRef> {
    fn from(field: AfterField) -> Self {
        match field {
            AfterField::Many(refs) => refs,
            AfterField::One(r) => vec![r],
        }
    }
}

/// Raw step object as it appears in JSON.
#[derive(Debug, Default, Deserialize)]
struct RawStep {
    #[serde(default, alias = "name")]
    key: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "cmd")]
    command: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "lang")]
    language: Option<String>,
    #[serde(default, alias = "description")]
    action: Option<String>,
    #[serde(default)]
    after: Option<AfterField>,
    #[serde(default, alias = "timeout_secs")]
    timeout: Option<u64>,
    #[serde(default)]
    cost: Option<f64>,
    #[serde(default, alias = "blockOnFail")]
    block_on_fail: Option<bool>,
}

/// One normalized step, before IDs are assigned and references resolved.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub key: Option<String>,
    pub title: String,
    pub action: StepAction,
    pub after: Option<Vec<StepRef>>,
    pub timeout_secs: Option<u64>,
    pub cost: Option<f64>,
    pub block_on_fail: Option<bool>,
}

impl StepSpec {
    /// A step that runs a shell command line.
    pub fn command(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            key: None,
            title: summarize(&command),
            action: StepAction::command(command),
            after: None,
            timeout_secs: None,
            cost: None,
            block_on_fail: None,
        }
    }

    /// A step carrying an arbitrary action, e.g. a callback.
    pub fn action(title: impl Into<String>, action: StepAction) -> Self {
        Self {
            title: title.into(),
            action,
            ..Self::command(String::new())
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn after(mut self, refs: impl IntoIterator<Item = StepRef>) -> Self {
        self.after = Some(refs.into_iter().collect());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_block_on_fail(mut self, block: bool) -> Self {
        self.block_on_fail = Some(block);
        self
    }

    fn from_raw(raw: RawStep, index: usize) -> Result<Self> {
        let field = format!("steps[{index}]");

        let action = if let Some(command) = raw.command {
            if command.trim().is_empty() {
                return Err(KeelError::validation(field).with_reason("Command cannot be empty"));
            }
            StepAction::Command { command }
        } else if let Some(source) = raw.code {
            let language = match raw.language.as_deref() {
                Some(tag) => Language::from_str(tag)
                    .map_err(|reason| KeelError::validation(&field).with_reason(reason))?,
                None => Language::detect(&source, None),
            };
            StepAction::Code { language, source }
        } else {
            StepAction::Noop {
                note: raw.action.clone(),
            }
        };

        let title = raw
            .title
            .or_else(|| raw.key.clone())
            .or_else(|| action.text().map(summarize))
            .unwrap_or_else(|| format!("Step {}", index + 1));

        Ok(Self {
            key: raw.key,
            title,
            action,
            after: raw.after.map(Into::into),
            timeout_secs: raw.timeout,
            cost: raw.cost,
            block_on_fail: raw.block_on_fail,
        })
    }
}

/// A parsed spec: the optional plan title and its steps in order.
#[derive(Debug, Clone)]
pub struct PlanSpec {
    pub title: Option<String>,
    pub steps: Vec<StepSpec>,
}

impl PlanSpec {
    pub fn new(steps: Vec<StepSpec>) -> Self {
        Self { title: None, steps }
    }

    /// Resolve one of the accepted shapes.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for values matching no shape, step
    /// entries that are neither objects nor strings, unknown languages, and
    /// specs without steps.
    pub fn from_value(value: Value) -> Result<Self> {
        let spec = match value {
            Value::Array(items) => Self {
                title: None,
                steps: parse_steps(items)?,
            },
            Value::String(command) => {
                if command.trim().is_empty() {
                    return Err(KeelError::validation("spec").with_reason("Command cannot be empty"));
                }
                Self::new(vec![StepSpec::command(command)])
            }
            Value::Object(mut map) => match map.remove("steps") {
                Some(Value::Array(items)) => Self {
                    title: map.get("title").and_then(Value::as_str).map(str::to_string),
                    steps: parse_steps(items)?,
                },
                Some(_) => {
                    return Err(KeelError::validation("steps").with_reason("Expected a list of steps"))
                }
                None => {
                    let step = parse_step(Value::Object(map), 0)?;
                    Self {
                        title: Some(step.title.clone()),
                        steps: vec![step],
                    }
                }
            },
            other => {
                return Err(KeelError::validation("spec").with_reason(format!(
                    "Expected a list of steps, a command string or an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        if spec.steps.is_empty() {
            return Err(KeelError::validation("spec").with_reason("Plan has no steps"));
        }
        Ok(spec)
    }
}

fn parse_steps(items: Vec<Value>) -> Result<Vec<StepSpec>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_step(item, index))
        .collect()
}

fn parse_step(item: Value, index: usize) -> Result<StepSpec> {
    match item {
        Value::String(command) => {
            let raw = RawStep {
                command: Some(command),
                ..RawStep::default()
            };
            StepSpec::from_raw(raw, index)
        }
        Value::Object(_) => {
            let raw: RawStep = serde_json::from_value(item).map_err(|e| {
                KeelError::validation(format!("steps[{index}]")).with_reason(e.to_string())
            })?;
            StepSpec::from_raw(raw, index)
        }
        other => Err(KeelError::validation(format!("steps[{index}]")).with_reason(format!(
            "Expected a step object or command string, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// First line of `text`, shortened for use as a title.
fn summarize(text: &str) -> String {
    const MAX_CHARS: usize = 60;
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > MAX_CHARS {
        let cut: String = line.chars().take(MAX_CHARS - 1).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_list_of_step_objects() {
        let spec = PlanSpec::from_value(json!([
            {"title": "List", "cmd": "ls", "key": "list"},
            {"command": "echo hi", "after": "list", "timeout": 5, "cost": 2.5, "blockOnFail": false},
        ]))
        .expect("valid spec");

        assert_eq!(spec.steps.len(), 2);
        assert_eq!(spec.steps[0].title, "List");
        assert_eq!(spec.steps[0].key.as_deref(), Some("list"));
        assert_eq!(spec.steps[1].title, "echo hi");
        assert_eq!(spec.steps[1].after, Some(vec![StepRef::Key("list".to_string())]));
        assert_eq!(spec.steps[1].timeout_secs, Some(5));
        assert_eq!(spec.steps[1].cost, Some(2.5));
        assert_eq!(spec.steps[1].block_on_fail, Some(false));
    }

    #[test]
    fn test_single_command_string() {
        let spec = PlanSpec::from_value(json!("git status")).expect("valid spec");
        assert_eq!(spec.steps.len(), 1);
        assert!(matches!(&spec.steps[0].action, StepAction::Command { command } if command == "git status"));
    }

    #[test]
    fn test_object_with_steps() {
        let spec = PlanSpec::from_value(json!({
            "title": "Release",
            "steps": ["cargo build", {"action": "announce", "after": [0]}]
        }))
        .expect("valid spec");

        assert_eq!(spec.title.as_deref(), Some("Release"));
        assert_eq!(spec.steps.len(), 2);
        assert!(matches!(&spec.steps[1].action, StepAction::Noop { note: Some(note) } if note == "announce"));
        assert_eq!(spec.steps[1].after, Some(vec![StepRef::Index(0)]));
    }

    #[test]
    fn test_single_step_object() {
        let spec = PlanSpec::from_value(json!({"title": "Only", "code": "print(1)", "language": "py"}))
            .expect("valid spec");
        assert_eq!(spec.title.as_deref(), Some("Only"));
        assert!(matches!(
            spec.steps[0].action,
            StepAction::Code { language: Language::Python, .. }
        ));
    }

    #[test]
    fn test_missing_optional_fields_never_fail() {
        let spec = PlanSpec::from_value(json!([{}])).expect("valid spec");
        assert_eq!(spec.steps[0].title, "Step 1");
        assert!(matches!(spec.steps[0].action, StepAction::Noop { note: None }));
    }

    #[test]
    fn test_invalid_shapes() {
        for value in [json!(42), json!(null), json!(true), json!([]), json!([1, 2]), json!({"steps": "x"})] {
            let err = PlanSpec::from_value(value.clone()).unwrap_err();
            assert!(matches!(err, KeelError::Validation { .. }), "{value} should be rejected");
        }
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let err = PlanSpec::from_value(json!({"code": "x", "language": "cobol"})).unwrap_err();
        assert!(err.to_string().contains("cobol"));
    }

    #[test]
    fn test_summarize_long_command() {
        let long = "echo ".repeat(40);
        let title = summarize(&long);
        assert_eq!(title.chars().count(), 60);
        assert!(title.ends_with('…'));
    }
}
