//! Taint domain facts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A taint label attached to a variable, e.g. `UNTRUSTED` or `SQL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaintMark(String);

impl TaintMark {
    pub fn new(name: impl Into<String>) -> Self {
        TaintMark(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaintMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A front-end variable name. Front ends flatten whatever access-path
/// notion they have into this before talking to the taint analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A variable carrying a mark.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tainted {
    pub variable: Variable,
    pub mark: TaintMark,
}

impl Tainted {
    pub fn new(variable: Variable, mark: TaintMark) -> Self {
        Tainted { variable, mark }
    }

    /// Same mark, different variable.
    pub fn moved_to(&self, variable: Variable) -> Self {
        Tainted {
            variable,
            mark: self.mark.clone(),
        }
    }
}

/// The dataflow fact of the taint analyses.
///
/// `Zero` is the neutral fact: it holds everywhere reachable and is what
/// source rules generate new taints from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaintFact {
    Zero,
    Tainted(Tainted),
}

impl TaintFact {
    pub fn tainted(variable: Variable, mark: TaintMark) -> Self {
        TaintFact::Tainted(Tainted::new(variable, mark))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, TaintFact::Zero)
    }
}
