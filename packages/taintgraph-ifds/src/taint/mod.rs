//! Taint analysis on top of the tabulation engine: the fact domain, the
//! JSON rule language with its condition evaluators, and the forward
//! analyzer.

pub mod condition;
pub mod config;
pub mod fact;
pub mod flow;

pub use condition::{
    BasicConditionEvaluator, FactAwareConditionEvaluator, Operand, PositionResolver,
};
pub use config::{
    CleanerRule, Condition, ConstantValue, PassThroughRule, Position, SinkRule, SourceRule,
    TaintAction, TaintRulebook,
};
pub use fact::{TaintFact, TaintMark, Tainted, Variable};
pub use flow::{
    CallPositionResolver, ForwardTaintAnalyzer, ForwardTaintFlowFunctions, TaintStatementOps,
    TaintVulnerability,
};
