//! Rule condition evaluation.
//!
//! Position resolution is best effort: a position the front end cannot
//! resolve makes the enclosing atom false rather than erroring, which
//! under-approximates (rules silently do not fire) and never invents
//! taint.

use crate::errors::{EngineError, Result};
use crate::taint::config::{compile_full_match, Condition, ConstantValue, Position};
use crate::taint::fact::{Tainted, Variable};

/// What a position resolved to at a concrete call statement. Fields are
/// filled as far as the front end knows them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operand {
    pub constant: Option<ConstantValue>,
    pub type_name: Option<String>,
    pub variable: Option<Variable>,
}

impl Operand {
    pub fn constant(value: ConstantValue) -> Self {
        Operand {
            constant: Some(value),
            ..Operand::default()
        }
    }

    pub fn variable(variable: Variable) -> Self {
        Operand {
            variable: Some(variable),
            ..Operand::default()
        }
    }
}

/// Maps rule positions to operands of one concrete statement.
pub trait PositionResolver {
    fn resolve(&self, position: &Position) -> Option<Operand>;
}

/// Evaluates every condition kind that does not look at the dataflow
/// fact. `ContainsMark` is rejected here: use
/// [`FactAwareConditionEvaluator`] when a fact is in scope.
pub struct BasicConditionEvaluator<'a> {
    resolver: &'a dyn PositionResolver,
}

impl<'a> BasicConditionEvaluator<'a> {
    pub fn new(resolver: &'a dyn PositionResolver) -> Self {
        BasicConditionEvaluator { resolver }
    }

    pub fn eval(&self, condition: &Condition) -> Result<bool> {
        match condition {
            Condition::True => Ok(true),
            Condition::Not { arg } => Ok(!self.eval(arg)?),
            Condition::And { args } => {
                for arg in args {
                    if !self.eval(arg)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or { args } => {
                for arg in args {
                    if self.eval(arg)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::IsConstant { position } => Ok(self
                .resolve(position)
                .is_some_and(|operand| operand.constant.is_some())),
            Condition::ConstantEq { position, value } => Ok(self
                .resolve(position)
                .and_then(|operand| operand.constant)
                .is_some_and(|constant| constant == *value)),
            Condition::ConstantLt { position, value } => {
                self.compare_int(position, value, |actual, bound| actual < bound)
            }
            Condition::ConstantGt { position, value } => {
                self.compare_int(position, value, |actual, bound| actual > bound)
            }
            Condition::ConstantMatches { position, pattern } => {
                let Some(operand) = self.resolve(position) else {
                    return Ok(false);
                };
                let Some(text) = render_operand(&operand) else {
                    return Ok(false);
                };
                Ok(compile_full_match(pattern)?.is_match(&text))
            }
            Condition::TypeMatches {
                position,
                type_name,
            } => Ok(self
                .resolve(position)
                .and_then(|operand| operand.type_name)
                .is_some_and(|name| name == *type_name)),
            Condition::ContainsMark { .. } => Err(EngineError::config(
                "contains_mark requires a fact-aware evaluator",
            )),
            Condition::IsType { .. } => {
                Err(EngineError::UnexpandedCondition("is_type".to_string()))
            }
            Condition::AnnotationType { .. } => Err(EngineError::UnexpandedCondition(
                "annotation_type".to_string(),
            )),
            Condition::SourceFunctionMatches { .. } => Err(EngineError::UnexpandedCondition(
                "source_function_matches".to_string(),
            )),
        }
    }

    fn resolve(&self, position: &Position) -> Option<Operand> {
        self.resolver.resolve(position)
    }

    fn compare_int(
        &self,
        position: &Position,
        value: &ConstantValue,
        cmp: impl Fn(i64, i64) -> bool,
    ) -> Result<bool> {
        let ConstantValue::Int(bound) = value else {
            return Err(EngineError::config(
                "ordered comparison requires an integer constant",
            ));
        };
        Ok(self
            .resolve(position)
            .and_then(|operand| operand.constant)
            .is_some_and(|constant| match constant {
                ConstantValue::Int(actual) => cmp(actual, *bound),
                _ => false,
            }))
    }
}

fn render_operand(operand: &Operand) -> Option<String> {
    if let Some(constant) = &operand.constant {
        return Some(match constant {
            ConstantValue::Bool(value) => value.to_string(),
            ConstantValue::Int(value) => value.to_string(),
            ConstantValue::Str(value) => value.clone(),
        });
    }
    operand
        .variable
        .as_ref()
        .map(|variable| variable.as_str().to_string())
        .or_else(|| operand.type_name.clone())
}

/// Evaluator with the current taint fact in scope, enabling
/// `ContainsMark`.
pub struct FactAwareConditionEvaluator<'a> {
    fact: &'a Tainted,
    base: BasicConditionEvaluator<'a>,
}

impl<'a> FactAwareConditionEvaluator<'a> {
    pub fn new(fact: &'a Tainted, resolver: &'a dyn PositionResolver) -> Self {
        FactAwareConditionEvaluator {
            fact,
            base: BasicConditionEvaluator::new(resolver),
        }
    }

    pub fn eval(&self, condition: &Condition) -> Result<bool> {
        match condition {
            // Connectives recurse here so nested ContainsMark stays
            // fact-aware.
            Condition::Not { arg } => Ok(!self.eval(arg)?),
            Condition::And { args } => {
                for arg in args {
                    if !self.eval(arg)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or { args } => {
                for arg in args {
                    if self.eval(arg)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::ContainsMark { position, mark } => {
                if self.fact.mark != *mark {
                    return Ok(false);
                }
                Ok(self
                    .base
                    .resolve(position)
                    .and_then(|operand| operand.variable)
                    .is_some_and(|variable| variable == self.fact.variable))
            }
            other => self.base.eval(other),
        }
    }
}
