//! Forward taint analysis: flow functions, the analyzer, and its finding
//! type.

use std::sync::Arc;

use tracing::warn;

use crate::analyzer::{Analyzer, AnalyzerEvent, FlowFunctions};
use crate::domain::{Edge, Method, Stmt, Vertex};
use crate::graph::ApplicationGraph;
use crate::taint::condition::{
    BasicConditionEvaluator, FactAwareConditionEvaluator, Operand, PositionResolver,
};
use crate::taint::config::{Condition, Position, TaintAction, TaintRulebook};
use crate::taint::fact::{TaintFact, Tainted, Variable};

/// Statement-level queries the taint flow functions need from a front
/// end, beyond what [`ApplicationGraph`] provides.
pub trait TaintStatementOps<M, S>: Send + Sync {
    /// Plain name of the method invoked at `stmt`, if it is a call.
    fn call_name(&self, stmt: &S) -> Option<String>;

    /// Resolve a rule position against a call statement.
    fn resolve_position(&self, stmt: &S, position: &Position) -> Option<Operand>;

    /// `(to, from)` of a plain copy assignment, if `stmt` is one.
    fn copy_assignment(&self, stmt: &S) -> Option<(Variable, Variable)>;

    /// Variables `stmt` overwrites (kill set).
    fn written_variables(&self, stmt: &S) -> Vec<Variable>;

    /// `(argument variable, parameter variable)` pairs binding a call to
    /// `callee`.
    fn parameter_bindings(&self, call_site: &S, callee: &M) -> Vec<(Variable, Variable)>;

    /// Variable receiving the call result at `call_site`, if any.
    fn result_variable(&self, call_site: &S) -> Option<Variable>;

    /// Variable returned at the exit statement `exit`, if any.
    fn returned_variable(&self, exit: &S) -> Option<Variable>;
}

/// [`PositionResolver`] over one concrete call statement.
pub struct CallPositionResolver<'a, M, S> {
    ops: &'a dyn TaintStatementOps<M, S>,
    stmt: &'a S,
}

impl<'a, M, S> CallPositionResolver<'a, M, S> {
    pub fn new(ops: &'a dyn TaintStatementOps<M, S>, stmt: &'a S) -> Self {
        CallPositionResolver { ops, stmt }
    }
}

impl<M, S> PositionResolver for CallPositionResolver<'_, M, S> {
    fn resolve(&self, position: &Position) -> Option<Operand> {
        self.ops.resolve_position(self.stmt, position)
    }
}

/// Forward taint propagation.
///
/// `Zero` flows everywhere unconditionally; tainted facts follow copies,
/// die when their variable is overwritten, and are created, moved and
/// removed by the rulebook at call sites.
pub struct ForwardTaintFlowFunctions<M, S> {
    ops: Arc<dyn TaintStatementOps<M, S>>,
    rules: Arc<TaintRulebook>,
}

impl<M, S> ForwardTaintFlowFunctions<M, S>
where
    M: Method,
    S: Stmt,
{
    pub fn new(ops: Arc<dyn TaintStatementOps<M, S>>, rules: Arc<TaintRulebook>) -> Self {
        ForwardTaintFlowFunctions { ops, rules }
    }

    /// Rule condition check that treats evaluation failures as non-match.
    /// Rulebooks are validated at load, so a failure here is a front-end
    /// resolver bug worth a log line, not a reason to lose the run.
    fn fires(&self, condition: &Condition, fact: &Tainted, call_site: &S) -> bool {
        let resolver = CallPositionResolver::new(self.ops.as_ref(), call_site);
        let evaluator = FactAwareConditionEvaluator::new(fact, &resolver);
        match evaluator.eval(condition) {
            Ok(result) => result,
            Err(error) => {
                warn!(%error, "rule condition failed to evaluate, skipping rule");
                false
            }
        }
    }

    fn source_facts(&self, call_site: &S, name: &str) -> Vec<TaintFact> {
        let resolver = CallPositionResolver::new(self.ops.as_ref(), call_site);
        let mut facts = Vec::new();
        for rule in self.rules.sources_for(name) {
            let evaluator = BasicConditionEvaluator::new(&resolver);
            let fired = match evaluator.eval(&rule.condition) {
                Ok(result) => result,
                Err(error) => {
                    warn!(%error, "source condition failed to evaluate, skipping rule");
                    false
                }
            };
            if !fired {
                continue;
            }
            for action in &rule.actions {
                if let TaintAction::AssignMark { mark, position } = action {
                    if let Some(variable) = self
                        .ops
                        .resolve_position(call_site, position)
                        .and_then(|operand| operand.variable)
                    {
                        facts.push(TaintFact::tainted(variable, mark.clone()));
                    }
                }
            }
        }
        facts
    }

    /// Whether a cleaner action at `call_site` removes `fact`.
    fn cleaned(&self, call_site: &S, name: &str, fact: &Tainted) -> bool {
        for rule in self.rules.cleaners_for(name) {
            if !self.fires(&rule.condition, fact, call_site) {
                continue;
            }
            for action in &rule.actions {
                let (position, mark) = match action {
                    TaintAction::RemoveMark { mark, position } => (position, Some(mark)),
                    TaintAction::RemoveAllMarks { position } => (position, None),
                    _ => continue,
                };
                if mark.is_some_and(|mark| *mark != fact.mark) {
                    continue;
                }
                let removed = self
                    .ops
                    .resolve_position(call_site, position)
                    .and_then(|operand| operand.variable);
                if removed.as_ref() == Some(&fact.variable) {
                    return true;
                }
            }
        }
        false
    }

    /// Facts generated from `fact` by pass-through copies at `call_site`.
    fn passed_through(&self, call_site: &S, name: &str, fact: &Tainted) -> Vec<TaintFact> {
        let mut facts = Vec::new();
        for rule in self.rules.pass_throughs_for(name) {
            if !self.fires(&rule.condition, fact, call_site) {
                continue;
            }
            for action in &rule.actions {
                let (from, to, mark) = match action {
                    TaintAction::CopyMark { mark, from, to } => (from, to, Some(mark)),
                    TaintAction::CopyAllMarks { from, to } => (from, to, None),
                    _ => continue,
                };
                if mark.is_some_and(|mark| *mark != fact.mark) {
                    continue;
                }
                let source = self
                    .ops
                    .resolve_position(call_site, from)
                    .and_then(|operand| operand.variable);
                if source.as_ref() != Some(&fact.variable) {
                    continue;
                }
                if let Some(target) = self
                    .ops
                    .resolve_position(call_site, to)
                    .and_then(|operand| operand.variable)
                {
                    facts.push(TaintFact::Tainted(fact.moved_to(target)));
                }
            }
        }
        facts
    }
}

impl<M, S> FlowFunctions<M, S, TaintFact> for ForwardTaintFlowFunctions<M, S>
where
    M: Method,
    S: Stmt,
{
    fn sequent(&self, current: &S, _next: &S, fact: &TaintFact) -> Vec<TaintFact> {
        let TaintFact::Tainted(tainted) = fact else {
            return vec![TaintFact::Zero];
        };
        if let Some((to, from)) = self.ops.copy_assignment(current) {
            if tainted.variable == from {
                // Taint flows through the copy and survives at the source.
                return vec![
                    fact.clone(),
                    TaintFact::Tainted(tainted.moved_to(to)),
                ];
            }
            if tainted.variable == to {
                return Vec::new();
            }
            return vec![fact.clone()];
        }
        if self.ops.written_variables(current).contains(&tainted.variable) {
            return Vec::new();
        }
        vec![fact.clone()]
    }

    fn call_to_return(&self, call_site: &S, _return_site: &S, fact: &TaintFact) -> Vec<TaintFact> {
        let Some(name) = self.ops.call_name(call_site) else {
            return vec![fact.clone()];
        };
        match fact {
            TaintFact::Zero => {
                let mut facts = vec![TaintFact::Zero];
                facts.extend(self.source_facts(call_site, &name));
                facts
            }
            TaintFact::Tainted(tainted) => {
                if self.cleaned(call_site, &name, tainted) {
                    return Vec::new();
                }
                let mut facts = Vec::new();
                // The call overwrites its result variable.
                if self.ops.result_variable(call_site).as_ref() != Some(&tainted.variable) {
                    facts.push(fact.clone());
                }
                facts.extend(self.passed_through(call_site, &name, tainted));
                facts
            }
        }
    }

    fn call_to_start(&self, call_site: &S, callee: &M, fact: &TaintFact) -> Vec<TaintFact> {
        let TaintFact::Tainted(tainted) = fact else {
            return vec![TaintFact::Zero];
        };
        let mut facts = Vec::new();
        for (argument, parameter) in self.ops.parameter_bindings(call_site, callee) {
            if tainted.variable == argument {
                facts.push(TaintFact::Tainted(tainted.moved_to(parameter)));
            }
        }
        facts
    }

    fn exit_to_return_site(
        &self,
        call_site: &S,
        _return_site: &S,
        exit: &S,
        exit_fact: &TaintFact,
    ) -> Vec<TaintFact> {
        let TaintFact::Tainted(tainted) = exit_fact else {
            // Zero re-enters the caller through call-to-return, not here.
            return Vec::new();
        };
        let returned = self.ops.returned_variable(exit);
        if returned.as_ref() != Some(&tainted.variable) {
            return Vec::new();
        }
        match self.ops.result_variable(call_site) {
            Some(result) => vec![TaintFact::Tainted(tainted.moved_to(result))],
            None => Vec::new(),
        }
    }
}

/// A sink rule that fired on a tainted vertex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaintVulnerability<S> {
    pub message: String,
    pub rule_id: String,
    pub sink: Vertex<S, TaintFact>,
}

/// Forward taint analyzer: seeds `Zero`, records summaries at method
/// exits and reports sink hits as findings.
pub struct ForwardTaintAnalyzer<M, S, G>
where
    G: ApplicationGraph<M, S>,
    S: Stmt,
{
    graph: Arc<G>,
    ops: Arc<dyn TaintStatementOps<M, S>>,
    rules: Arc<TaintRulebook>,
    flow: ForwardTaintFlowFunctions<M, S>,
}

impl<M, S, G> ForwardTaintAnalyzer<M, S, G>
where
    M: Method,
    S: Stmt,
    G: ApplicationGraph<M, S>,
{
    pub fn new(
        graph: Arc<G>,
        ops: Arc<dyn TaintStatementOps<M, S>>,
        rules: Arc<TaintRulebook>,
    ) -> Self {
        let flow = ForwardTaintFlowFunctions::new(Arc::clone(&ops), Arc::clone(&rules));
        ForwardTaintAnalyzer {
            graph,
            ops,
            rules,
            flow,
        }
    }

    fn sink_findings(
        &self,
        vertex: &Vertex<S, TaintFact>,
    ) -> Vec<TaintVulnerability<S>> {
        let TaintFact::Tainted(tainted) = &vertex.fact else {
            return Vec::new();
        };
        let Some(name) = self.ops.call_name(&vertex.stmt) else {
            return Vec::new();
        };
        let resolver = CallPositionResolver::new(self.ops.as_ref(), &vertex.stmt);
        let evaluator = FactAwareConditionEvaluator::new(tainted, &resolver);
        let mut findings = Vec::new();
        for rule in self.rules.sinks_for(&name) {
            match evaluator.eval(&rule.condition) {
                Ok(true) => findings.push(TaintVulnerability {
                    message: rule.message.clone(),
                    rule_id: rule.rule_id.clone(),
                    sink: vertex.clone(),
                }),
                Ok(false) => {}
                Err(error) => {
                    warn!(%error, rule = %rule.rule_id, "sink condition failed to evaluate");
                }
            }
        }
        findings
    }
}

impl<M, S, G> Analyzer<M, S, TaintFact, TaintVulnerability<S>> for ForwardTaintAnalyzer<M, S, G>
where
    M: Method,
    S: Stmt,
    G: ApplicationGraph<M, S> + 'static,
{
    fn flow_functions(&self) -> &dyn FlowFunctions<M, S, TaintFact> {
        &self.flow
    }

    fn obtain_possible_start_facts(&self, _method: &M) -> Vec<TaintFact> {
        vec![TaintFact::Zero]
    }

    fn handle_new_edge(
        &self,
        edge: &Edge<S, TaintFact>,
    ) -> Vec<AnalyzerEvent<S, TaintFact, TaintVulnerability<S>>> {
        let mut events = Vec::new();
        if self.graph.is_exit_point(&edge.to.stmt) {
            events.push(AnalyzerEvent::NewSummaryEdge { edge: edge.clone() });
        }
        for finding in self.sink_findings(&edge.to) {
            events.push(AnalyzerEvent::NewFinding { finding });
        }
        events
    }
}
