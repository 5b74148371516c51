//! Taint rule configuration.
//!
//! Rules are loaded from JSON and validated eagerly: condition kinds that
//! a configuration preprocessor must expand before the engine runs are
//! rejected at load time, as are malformed match patterns. After
//! [`TaintRulebook::from_json`] succeeds the evaluators can assume a
//! well-formed rule set.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, Result};
use crate::taint::fact::TaintMark;

/// A value slot of a call statement, as seen from the rule language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    /// The receiver object of an instance call.
    This,
    /// The zero-based argument at `index`.
    Argument { index: u32 },
    /// Any argument; resolves per argument when applied.
    AnyArgument,
    /// The value the call assigns.
    Result,
}

/// A literal in a rule condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Condition tree attached to every rule.
///
/// `IsType`, `AnnotationType` and `SourceFunctionMatches` are placeholder
/// kinds a configuration preprocessor expands into concrete conditions;
/// they never reach a running engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    True,
    Not { arg: Box<Condition> },
    And { args: Vec<Condition> },
    Or { args: Vec<Condition> },
    IsConstant { position: Position },
    ConstantEq { position: Position, value: ConstantValue },
    ConstantLt { position: Position, value: ConstantValue },
    ConstantGt { position: Position, value: ConstantValue },
    ConstantMatches { position: Position, pattern: String },
    TypeMatches { position: Position, type_name: String },
    ContainsMark { position: Position, mark: TaintMark },
    IsType { position: Position, type_name: String },
    AnnotationType { position: Position, annotation: String },
    SourceFunctionMatches { position: Position, pattern: String },
}

impl Condition {
    /// Reject unexpanded kinds and invalid match patterns anywhere in the
    /// tree.
    fn validate(&self) -> Result<()> {
        match self {
            Condition::True
            | Condition::IsConstant { .. }
            | Condition::ConstantEq { .. }
            | Condition::ConstantLt { .. }
            | Condition::ConstantGt { .. }
            | Condition::TypeMatches { .. }
            | Condition::ContainsMark { .. } => Ok(()),
            Condition::Not { arg } => arg.validate(),
            Condition::And { args } | Condition::Or { args } => {
                args.iter().try_for_each(Condition::validate)
            }
            Condition::ConstantMatches { pattern, .. } => {
                compile_full_match(pattern).map(|_| ())
            }
            Condition::IsType { .. } => Err(EngineError::UnexpandedCondition(
                "is_type".to_string(),
            )),
            Condition::AnnotationType { .. } => Err(EngineError::UnexpandedCondition(
                "annotation_type".to_string(),
            )),
            Condition::SourceFunctionMatches { .. } => Err(EngineError::UnexpandedCondition(
                "source_function_matches".to_string(),
            )),
        }
    }
}

/// Anchored compilation: rule patterns match the whole operand, not a
/// substring.
pub(crate) fn compile_full_match(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|error| EngineError::config(format!("invalid match pattern '{pattern}': {error}")))
}

/// How a fired rule changes the taint state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaintAction {
    AssignMark { mark: TaintMark, position: Position },
    CopyMark { mark: TaintMark, from: Position, to: Position },
    CopyAllMarks { from: Position, to: Position },
    RemoveMark { mark: TaintMark, position: Position },
    RemoveAllMarks { position: Position },
}

/// A call that introduces taint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRule {
    pub method: String,
    pub condition: Condition,
    pub actions: Vec<TaintAction>,
}

/// A call where tainted input is a vulnerability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRule {
    pub method: String,
    pub condition: Condition,
    pub message: String,
    pub rule_id: String,
}

/// A call that moves taint between its positions (e.g. `concat`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassThroughRule {
    pub method: String,
    pub condition: Condition,
    pub actions: Vec<TaintAction>,
}

/// A call that removes taint (e.g. a sanitizer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanerRule {
    pub method: String,
    pub condition: Condition,
    pub actions: Vec<TaintAction>,
}

/// The complete rule set of one analysis run, keyed by plain method name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaintRulebook {
    #[serde(default)]
    pub sources: Vec<SourceRule>,
    #[serde(default)]
    pub sinks: Vec<SinkRule>,
    #[serde(default)]
    pub pass_throughs: Vec<PassThroughRule>,
    #[serde(default)]
    pub cleaners: Vec<CleanerRule>,
}

impl TaintRulebook {
    /// Parse and validate a JSON rule set.
    pub fn from_json(text: &str) -> Result<Self> {
        let rulebook: TaintRulebook = serde_json::from_str(text)
            .map_err(|error| EngineError::config(format!("invalid rule json: {error}")))?;
        rulebook.validate()?;
        Ok(rulebook)
    }

    pub fn validate(&self) -> Result<()> {
        for condition in self
            .sources
            .iter()
            .map(|rule| &rule.condition)
            .chain(self.sinks.iter().map(|rule| &rule.condition))
            .chain(self.pass_throughs.iter().map(|rule| &rule.condition))
            .chain(self.cleaners.iter().map(|rule| &rule.condition))
        {
            condition.validate()?;
        }
        Ok(())
    }

    pub fn sources_for<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a SourceRule> {
        self.sources.iter().filter(move |rule| rule.method == method)
    }

    pub fn sinks_for<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a SinkRule> {
        self.sinks.iter().filter(move |rule| rule.method == method)
    }

    pub fn pass_throughs_for<'a>(
        &'a self,
        method: &'a str,
    ) -> impl Iterator<Item = &'a PassThroughRule> {
        self.pass_throughs
            .iter()
            .filter(move |rule| rule.method == method)
    }

    pub fn cleaners_for<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a CleanerRule> {
        self.cleaners.iter().filter(move |rule| rule.method == method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_rulebook() {
        let json = r#"{
            "sources": [{
                "method": "get_input",
                "condition": { "kind": "true" },
                "actions": [{
                    "kind": "assign_mark",
                    "mark": "UNTRUSTED",
                    "position": { "kind": "result" }
                }]
            }],
            "sinks": [{
                "method": "run_query",
                "condition": {
                    "kind": "contains_mark",
                    "position": { "kind": "argument", "index": 0 },
                    "mark": "UNTRUSTED"
                },
                "message": "untrusted data reaches a query",
                "rule_id": "SQLI-1"
            }]
        }"#;
        let rulebook = TaintRulebook::from_json(json).unwrap();
        assert_eq!(rulebook.sources_for("get_input").count(), 1);
        assert_eq!(rulebook.sinks_for("run_query").count(), 1);
        assert_eq!(rulebook.sinks_for("other").count(), 0);
    }

    #[test]
    fn rejects_unexpanded_condition_kinds() {
        let json = r#"{
            "sinks": [{
                "method": "m",
                "condition": {
                    "kind": "is_type",
                    "position": { "kind": "this" },
                    "type_name": "java.lang.String"
                },
                "message": "x",
                "rule_id": "R"
            }]
        }"#;
        let result = TaintRulebook::from_json(json);
        assert!(matches!(result, Err(EngineError::UnexpandedCondition(_))));
    }

    #[test]
    fn rejects_invalid_match_patterns() {
        let json = r#"{
            "cleaners": [{
                "method": "m",
                "condition": {
                    "kind": "constant_matches",
                    "position": { "kind": "argument", "index": 0 },
                    "pattern": "(unclosed"
                },
                "actions": []
            }]
        }"#;
        let result = TaintRulebook::from_json(json);
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
