//! Plan model: decoding and validation of the `{"steps": [...]}` document.
//!
//! A plan is an ordered list of steps, each an object tagged by an `action`
//! key. Decoding is strict about required fields and value ranges but keeps
//! the boundary contract loose where the wire format is loose: extra fields
//! are ignored and an unrecognized `action` becomes [`Step::Unknown`] rather
//! than a rejection.

use serde::Deserialize;
use serde_json::Value;

use crate::error::PlanError;

/// An ordered sequence of browser actions. Order is semantically significant
/// and is preserved exactly during execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

/// One action entry within a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Navigate {
        url: String,
    },
    /// Click `selector`, `times` times, sleeping `delay` seconds between
    /// repetitions. There is no trailing sleep after the final click.
    Click {
        selector: String,
        times: u32,
        delay: f64,
    },
    Input {
        selector: String,
        value: String,
    },
    Wait {
        seconds: f64,
    },
    /// Capture the page. When `path` is `None` the interpreter derives one
    /// from the capture-time Unix timestamp.
    Screenshot {
        path: Option<String>,
    },
    /// Read the inner text of `selector` into a variable. Unnamed
    /// extractions receive `var_1`, `var_2`, ... in the order the unnamed
    /// extractions run.
    Extract {
        selector: String,
        name: Option<String>,
    },
    /// Any action tag outside the known set. Executes as a no-op and only
    /// produces a diagnostic.
    Unknown {
        action: String,
    },
}

/// Whether a primitive failure in this step ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The failure aborts all remaining steps.
    Abort,
    /// The failure is converted to a default value and the run continues.
    Tolerate,
}

impl Step {
    /// Short action tag, matching the wire-format spelling.
    pub fn kind(&self) -> &str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::Click { .. } => "click",
            Step::Input { .. } => "input",
            Step::Wait { .. } => "wait",
            Step::Screenshot { .. } => "screenshot",
            Step::Extract { .. } => "extract",
            Step::Unknown { .. } => "unknown",
        }
    }

    /// The abort/tolerate table the interpreter applies. `Wait` and
    /// `Unknown` cannot fail, so their entries are never consulted.
    pub fn on_failure(&self) -> FailurePolicy {
        match self {
            Step::Navigate { .. }
            | Step::Click { .. }
            | Step::Input { .. }
            | Step::Screenshot { .. } => FailurePolicy::Abort,
            Step::Wait { .. } | Step::Extract { .. } | Step::Unknown { .. } => {
                FailurePolicy::Tolerate
            }
        }
    }
}

/// Loose per-step shape. Unknown keys are ignored on purpose; plans come
/// from humans and LLMs alike and both add fields we don't know about.
#[derive(Debug, Deserialize)]
struct RawStep {
    action: Option<String>,
    url: Option<String>,
    selector: Option<String>,
    value: Option<String>,
    times: Option<u32>,
    delay: Option<f64>,
    seconds: Option<f64>,
    path: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    steps: Vec<Value>,
}

impl Plan {
    /// Decode a plan from its JSON text form.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode a plan from an already-parsed JSON document. An absent
    /// `steps` key is an empty plan.
    pub fn from_value(value: Value) -> Result<Self, PlanError> {
        let raw: RawPlan = serde_json::from_value(value)?;
        let mut steps = Vec::with_capacity(raw.steps.len());
        for (index, step) in raw.steps.into_iter().enumerate() {
            steps.push(decode_step(index + 1, step)?);
        }
        Ok(Plan { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

fn decode_step(index: usize, value: Value) -> Result<Step, PlanError> {
    if !value.is_object() {
        return Err(PlanError::StepNotObject { index });
    }
    let raw: RawStep = serde_json::from_value(value)?;
    let action = raw.action.ok_or(PlanError::MissingAction { index })?;

    let step = match action.as_str() {
        "navigate" => Step::Navigate {
            url: require(raw.url, index, "navigate", "url")?,
        },
        "click" => {
            let times = raw.times.unwrap_or(1);
            if times == 0 {
                return Err(PlanError::InvalidField {
                    index,
                    action: "click",
                    field: "times",
                    problem: "must be at least 1",
                });
            }
            Step::Click {
                selector: require(raw.selector, index, "click", "selector")?,
                times,
                delay: non_negative(raw.delay.unwrap_or(0.5), index, "click", "delay")?,
            }
        }
        "input" => Step::Input {
            selector: require(raw.selector, index, "input", "selector")?,
            value: raw.value.unwrap_or_default(),
        },
        "wait" => Step::Wait {
            seconds: non_negative(raw.seconds.unwrap_or(1.0), index, "wait", "seconds")?,
        },
        "screenshot" => Step::Screenshot { path: raw.path },
        "extract" => Step::Extract {
            selector: require(raw.selector, index, "extract", "selector")?,
            name: raw.name,
        },
        _ => Step::Unknown { action },
    };
    Ok(step)
}

fn require(
    field: Option<String>,
    index: usize,
    action: &'static str,
    name: &'static str,
) -> Result<String, PlanError> {
    field.ok_or(PlanError::MissingField {
        index,
        action,
        field: name,
    })
}

fn non_negative(
    value: f64,
    index: usize,
    action: &'static str,
    field: &'static str,
) -> Result<f64, PlanError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PlanError::InvalidField {
            index,
            action,
            field,
            problem: "must be a non-negative number",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_every_action_with_defaults() {
        let plan = Plan::from_value(json!({
            "steps": [
                {"action": "navigate", "url": "https://example.com"},
                {"action": "click", "selector": "#login"},
                {"action": "input", "selector": "#user"},
                {"action": "wait"},
                {"action": "screenshot"},
                {"action": "extract", "selector": "h1", "name": "title"},
            ]
        }))
        .unwrap();

        assert_eq!(plan.len(), 6);
        assert_eq!(
            plan.steps[1],
            Step::Click {
                selector: "#login".into(),
                times: 1,
                delay: 0.5,
            }
        );
        assert_eq!(
            plan.steps[2],
            Step::Input {
                selector: "#user".into(),
                value: String::new(),
            }
        );
        assert_eq!(plan.steps[3], Step::Wait { seconds: 1.0 });
        assert_eq!(plan.steps[4], Step::Screenshot { path: None });
    }

    #[test]
    fn preserves_declared_order() {
        let plan = Plan::from_value(json!({
            "steps": [
                {"action": "wait", "seconds": 2},
                {"action": "navigate", "url": "https://a.test"},
                {"action": "wait", "seconds": 3},
            ]
        }))
        .unwrap();
        let kinds: Vec<&str> = plan.steps.iter().map(Step::kind).collect();
        assert_eq!(kinds, ["wait", "navigate", "wait"]);
    }

    #[test]
    fn unrecognized_action_becomes_unknown() {
        let plan = Plan::from_value(json!({
            "steps": [{"action": "hover", "selector": "#menu"}]
        }))
        .unwrap();
        assert_eq!(
            plan.steps[0],
            Step::Unknown {
                action: "hover".into()
            }
        );
    }

    #[test]
    fn missing_selector_is_rejected() {
        let err = Plan::from_value(json!({
            "steps": [{"action": "click"}]
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            PlanError::MissingField {
                index: 1,
                action: "click",
                field: "selector",
            }
        ));
    }

    #[test]
    fn zero_click_count_is_rejected() {
        let err = Plan::from_value(json!({
            "steps": [{"action": "click", "selector": "#x", "times": 0}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlanError::InvalidField { field: "times", .. }));
    }

    #[test]
    fn negative_wait_is_rejected() {
        let err = Plan::from_value(json!({
            "steps": [{"action": "wait", "seconds": -1.0}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlanError::InvalidField { field: "seconds", .. }));
    }

    #[test]
    fn step_without_action_is_rejected() {
        let err = Plan::from_value(json!({"steps": [{"url": "https://a.test"}]})).unwrap_err();
        assert!(matches!(err, PlanError::MissingAction { index: 1 }));
    }

    #[test]
    fn absent_steps_key_is_an_empty_plan() {
        let plan = Plan::from_value(json!({})).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let plan = Plan::parse(
            r#"{"steps": [{"action": "navigate", "url": "https://a.test", "comment": "hi"}]}"#,
        )
        .unwrap();
        assert_eq!(
            plan.steps[0],
            Step::Navigate {
                url: "https://a.test".into()
            }
        );
    }
}
