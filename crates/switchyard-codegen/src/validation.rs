//! Graph lints: advisory diagnostics over a state graph.
//!
//! [`validate_graph`] runs every rule and returns what it found;
//! [`validate_or_raise`] fails on the first `Error`-severity diagnostic.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use switchyard_dot::DotGraph;
use switchyard_types::{Result, SwitchyardError};

use crate::graph::{build_model, vertex_name};

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub vertex: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.rule)?;
        if let Some(vertex) = &self.vertex {
            write!(f, " {vertex}")?;
        }
        write!(f, ": {}", self.message)
    }
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, graph: &DotGraph) -> Vec<Diagnostic>;
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Anything that keeps the model from being derived at all.
struct ModelRule {
    base_name: String,
}

impl LintRule for ModelRule {
    fn name(&self) -> &str { "model" }
    fn apply(&self, graph: &DotGraph) -> Vec<Diagnostic> {
        match build_model(&self.base_name, graph, None) {
            Ok(_) => vec![],
            Err(e) => vec![Diagnostic {
                rule: self.name().into(),
                severity: Severity::Error,
                message: e.to_string(),
                vertex: None,
            }],
        }
    }
}

/// Vertices other than the first that no edge leads to.
struct ReachabilityRule;
impl LintRule for ReachabilityRule {
    fn name(&self) -> &str { "reachability" }
    fn apply(&self, graph: &DotGraph) -> Vec<Diagnostic> {
        let targets: HashSet<&str> = graph
            .edges
            .iter()
            .filter(|e| e.from != e.to)
            .map(|e| e.to.as_str())
            .collect();
        graph
            .nodes
            .iter()
            .skip(1)
            .filter(|n| !targets.contains(n.id.as_str()))
            .map(|n| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!("state '{}' has no incoming transitions", vertex_name(graph, &n.id)),
                vertex: Some(n.id.clone()),
            })
            .collect()
    }
}

struct TerminalStateRule;
impl LintRule for TerminalStateRule {
    fn name(&self) -> &str { "terminal_state" }
    fn apply(&self, graph: &DotGraph) -> Vec<Diagnostic> {
        graph
            .nodes
            .iter()
            .filter(|n| graph.outgoing(&n.id).next().is_none())
            .map(|n| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Info,
                message: format!("state '{}' is terminal", vertex_name(graph, &n.id)),
                vertex: Some(n.id.clone()),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all lint rules; returns every diagnostic found.
pub fn validate_graph(base_name: &str, graph: &DotGraph) -> Vec<Diagnostic> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(ModelRule {
            base_name: base_name.to_string(),
        }),
        Box::new(ReachabilityRule),
        Box::new(TerminalStateRule),
    ];

    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(graph));
    }
    for d in diagnostics.iter().filter(|d| d.severity != Severity::Info) {
        tracing::warn!(rule = %d.rule, severity = %d.severity, vertex = ?d.vertex, "{}", d.message);
    }
    diagnostics
}

/// Run all lint rules; return `Err` if any `Error`-severity diagnostic found.
pub fn validate_or_raise(base_name: &str, graph: &DotGraph) -> Result<Vec<Diagnostic>> {
    let diagnostics = validate_graph(base_name, graph);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| d.message.clone())
        .collect();
    if !errors.is_empty() {
        return Err(SwitchyardError::ModelDerivation {
            message: errors.join("; "),
        });
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
