//! A tiny straight-line language for exercising the engine end to end.

#![allow(dead_code)]

use rustc_hash::FxHashMap;

use taintgraph_ifds::taint::{Operand, Position, TaintStatementOps, Variable};
use taintgraph_ifds::ApplicationGraph;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MiniStmtKind {
    Nop,
    Assign {
        to: String,
        from: String,
    },
    Call {
        result: Option<String>,
        callee: String,
        args: Vec<String>,
    },
    Return {
        value: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MiniStmt {
    pub id: u32,
    pub method: String,
    pub kind: MiniStmtKind,
}

pub fn nop() -> MiniStmtKind {
    MiniStmtKind::Nop
}

pub fn assign(to: &str, from: &str) -> MiniStmtKind {
    MiniStmtKind::Assign {
        to: to.to_string(),
        from: from.to_string(),
    }
}

pub fn call(result: Option<&str>, callee: &str, args: &[&str]) -> MiniStmtKind {
    MiniStmtKind::Call {
        result: result.map(str::to_string),
        callee: callee.to_string(),
        args: args.iter().map(|arg| arg.to_string()).collect(),
    }
}

pub fn ret(value: Option<&str>) -> MiniStmtKind {
    MiniStmtKind::Return {
        value: value.map(str::to_string),
    }
}

/// Straight-line methods with single-target calls. Calls to names without
/// a body stay call sites (external methods), they just resolve to no
/// callees.
#[derive(Default)]
pub struct MiniProgram {
    bodies: FxHashMap<String, Vec<MiniStmt>>,
    params: FxHashMap<String, Vec<String>>,
    next_id: u32,
}

impl MiniProgram {
    pub fn new() -> Self {
        MiniProgram::default()
    }

    pub fn method(mut self, name: &str, params: &[&str], kinds: Vec<MiniStmtKind>) -> Self {
        let body = kinds
            .into_iter()
            .map(|kind| {
                let stmt = MiniStmt {
                    id: self.next_id,
                    method: name.to_string(),
                    kind,
                };
                self.next_id += 1;
                stmt
            })
            .collect();
        self.bodies.insert(name.to_string(), body);
        self.params.insert(
            name.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn stmt(&self, method: &str, index: usize) -> MiniStmt {
        self.bodies[method][index].clone()
    }

    fn body_of(&self, stmt: &MiniStmt) -> &[MiniStmt] {
        self.bodies
            .get(&stmt.method)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn index_of(&self, stmt: &MiniStmt) -> Option<usize> {
        self.body_of(stmt).iter().position(|s| s.id == stmt.id)
    }
}

impl ApplicationGraph<String, MiniStmt> for MiniProgram {
    fn predecessors(&self, stmt: &MiniStmt) -> Vec<MiniStmt> {
        match self.index_of(stmt) {
            Some(index) if index > 0 => vec![self.body_of(stmt)[index - 1].clone()],
            _ => Vec::new(),
        }
    }

    fn successors(&self, stmt: &MiniStmt) -> Vec<MiniStmt> {
        if matches!(stmt.kind, MiniStmtKind::Return { .. }) {
            return Vec::new();
        }
        match self.index_of(stmt) {
            Some(index) => self
                .body_of(stmt)
                .get(index + 1)
                .cloned()
                .into_iter()
                .collect(),
            None => Vec::new(),
        }
    }

    fn callees(&self, stmt: &MiniStmt) -> Vec<String> {
        match &stmt.kind {
            MiniStmtKind::Call { callee, .. } if self.bodies.contains_key(callee) => {
                vec![callee.clone()]
            }
            _ => Vec::new(),
        }
    }

    fn callers(&self, method: &String) -> Vec<MiniStmt> {
        self.bodies
            .values()
            .flatten()
            .filter(|stmt| matches!(&stmt.kind, MiniStmtKind::Call { callee, .. } if callee == method))
            .cloned()
            .collect()
    }

    fn entry_points(&self, method: &String) -> Vec<MiniStmt> {
        self.bodies
            .get(method)
            .and_then(|body| body.first())
            .cloned()
            .into_iter()
            .collect()
    }

    fn exit_points(&self, method: &String) -> Vec<MiniStmt> {
        let Some(body) = self.bodies.get(method) else {
            return Vec::new();
        };
        let returns: Vec<MiniStmt> = body
            .iter()
            .filter(|stmt| matches!(stmt.kind, MiniStmtKind::Return { .. }))
            .cloned()
            .collect();
        if returns.is_empty() {
            body.last().cloned().into_iter().collect()
        } else {
            returns
        }
    }

    fn method_of(&self, stmt: &MiniStmt) -> String {
        stmt.method.clone()
    }

    // External calls (no body) must still be treated as call sites so the
    // rulebook applies on the call-to-return path.
    fn is_call_site(&self, stmt: &MiniStmt) -> bool {
        matches!(stmt.kind, MiniStmtKind::Call { .. })
    }
}

impl TaintStatementOps<String, MiniStmt> for MiniProgram {
    fn call_name(&self, stmt: &MiniStmt) -> Option<String> {
        match &stmt.kind {
            MiniStmtKind::Call { callee, .. } => Some(callee.clone()),
            _ => None,
        }
    }

    fn resolve_position(&self, stmt: &MiniStmt, position: &Position) -> Option<Operand> {
        let MiniStmtKind::Call { result, args, .. } = &stmt.kind else {
            return None;
        };
        match position {
            Position::Argument { index } => args
                .get(*index as usize)
                .map(|arg| Operand::variable(Variable::new(arg.clone()))),
            Position::Result => result
                .as_ref()
                .map(|r| Operand::variable(Variable::new(r.clone()))),
            Position::This | Position::AnyArgument => None,
        }
    }

    fn copy_assignment(&self, stmt: &MiniStmt) -> Option<(Variable, Variable)> {
        match &stmt.kind {
            MiniStmtKind::Assign { to, from } => {
                Some((Variable::new(to.clone()), Variable::new(from.clone())))
            }
            _ => None,
        }
    }

    fn written_variables(&self, stmt: &MiniStmt) -> Vec<Variable> {
        match &stmt.kind {
            MiniStmtKind::Assign { to, .. } => vec![Variable::new(to.clone())],
            MiniStmtKind::Call { result, .. } => result
                .as_ref()
                .map(|r| Variable::new(r.clone()))
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    fn parameter_bindings(&self, call_site: &MiniStmt, callee: &String) -> Vec<(Variable, Variable)> {
        let MiniStmtKind::Call { args, .. } = &call_site.kind else {
            return Vec::new();
        };
        let params = self.params.get(callee).map(Vec::as_slice).unwrap_or_default();
        args.iter()
            .zip(params)
            .map(|(arg, param)| (Variable::new(arg.clone()), Variable::new(param.clone())))
            .collect()
    }

    fn result_variable(&self, call_site: &MiniStmt) -> Option<Variable> {
        match &call_site.kind {
            MiniStmtKind::Call { result, .. } => {
                result.as_ref().map(|r| Variable::new(r.clone()))
            }
            _ => None,
        }
    }

    fn returned_variable(&self, exit: &MiniStmt) -> Option<Variable> {
        match &exit.kind {
            MiniStmtKind::Return { value } => value.as_ref().map(|v| Variable::new(v.clone())),
            _ => None,
        }
    }
}
