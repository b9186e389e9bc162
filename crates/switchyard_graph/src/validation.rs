//! Structural checks over a graph's static transitions.
//!
//! Validation is a batch analysis; the engine never calls it. Director
//! nodes choose their successors at run time, so only static transitions
//! are followed.

use core::fmt;
use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

use crate::graph::Graph;
use crate::node::NodeId;

/// How serious a [`Diagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational note.
    Info,
    /// Suspicious but runnable.
    Warning,
    /// The graph cannot run as built.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One finding about one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the finding is.
    pub severity: Severity,
    /// What was found.
    pub message: String,
    /// The node concerned, or [`NodeId::NONE`] for graph-wide notes.
    pub node: NodeId,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.node, self.message)
    }
}

/// Options for [`validate`].
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    known_nodes: Option<Vec<NodeId>>,
    warn_on_self_loop: bool,
    strict_terminal_path: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            known_nodes: None,
            warn_on_self_loop: true,
            strict_terminal_path: false,
        }
    }
}

impl ValidationOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that check every node of `graph`, enabling the unreachable
    /// and duplicate-name checks.
    #[must_use]
    pub fn exhaustive(graph: &Graph) -> Self {
        Self::new().with_known_nodes(graph.nodes().iter().map(|node| node.id().clone()))
    }

    /// Supplies the full node set, enabling the unreachable and
    /// duplicate-name checks.
    #[must_use]
    pub fn with_known_nodes(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.known_nodes = Some(nodes.into_iter().collect());
        self
    }

    /// Whether a node transitioning to itself is reported (default `true`).
    #[must_use]
    pub fn warn_on_self_loop(mut self, enabled: bool) -> Self {
        self.warn_on_self_loop = enabled;
        self
    }

    /// Whether a missing terminal path is an error instead of a warning
    /// (default `false`).
    #[must_use]
    pub fn strict_terminal_path(mut self, enabled: bool) -> Self {
        self.strict_terminal_path = enabled;
        self
    }
}

/// The diagnostics produced by [`validate`], in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    /// All diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics of the given severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    fn add(&mut self, severity: Severity, message: impl Into<String>, node: &NodeId) {
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.into(),
            node: node.clone(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

/// Checks `graph` for structural problems.
///
/// Walks the static transitions breadth-first from the start node and
/// reports dangling destinations, self-loops and the absence of any terminal
/// node. With the full node set supplied, also reports unreachable nodes and
/// duplicate names.
#[must_use]
pub fn validate(graph: &Graph, options: &ValidationOptions) -> ValidationReport {
    let mut report = ValidationReport::default();

    let start = graph.start_node().id();
    if graph.node(start).is_none() {
        report.add(Severity::Error, "start node does not exist in graph", start);
        return report;
    }

    let mut visited: HashSet<i32> = HashSet::new();
    let mut queue = VecDeque::from([start.clone()]);
    let mut saw_terminal = false;

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.index()) {
            continue;
        }
        if graph.node(&current).is_none() {
            report.add(Severity::Error, "node referenced during traversal does not exist", &current);
            continue;
        }
        let Some(dest) = graph.transition(&current).and_then(|t| t.destination()) else {
            saw_terminal = true;
            continue;
        };
        if dest.is_none() {
            report.add(Severity::Error, "transition destination is the NONE sentinel", &current);
            continue;
        }
        if graph.node(dest).is_none() {
            report.add(
                Severity::Error,
                format!("transition points to non-existent node #{}", dest.index()),
                &current,
            );
        }
        if options.warn_on_self_loop && dest == &current {
            report.add(Severity::Warning, "self-loop transition detected", &current);
        }
        queue.push_back(dest.clone());
    }

    if !saw_terminal {
        let severity = if options.strict_terminal_path {
            Severity::Error
        } else {
            Severity::Warning
        };
        report.add(severity, "no terminal node reachable from start", start);
    }

    match options.known_nodes.as_deref() {
        Some(known) if !known.is_empty() => {
            for node in known {
                if !visited.contains(&node.index()) {
                    report.add(Severity::Warning, "node is unreachable from start", node);
                }
            }

            let mut by_name: HashMap<&str, usize> = HashMap::new();
            for name in known.iter().filter_map(NodeId::name) {
                *by_name.entry(name).or_default() += 1;
            }
            for node in known {
                if let Some(name) = node.name()
                    && by_name.get(name).copied().unwrap_or_default() > 1
                {
                    report.add(Severity::Warning, format!("duplicate node name '{name}'"), node);
                }
            }
        }
        _ => report.add(
            Severity::Info,
            "skipped unreachable and duplicate-name checks (node set not provided)",
            &NodeId::NONE,
        ),
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::logic::RelayLogic;

    fn count(report: &ValidationReport, severity: Severity) -> usize {
        report.with_severity(severity).count()
    }

    #[test]
    fn linear_chain_is_clean() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(RelayLogic::success());
        builder.chain(&a, RelayLogic::success()).unwrap();
        let graph = builder.build().unwrap();

        let report = validate(&graph, &ValidationOptions::exhaustive(&graph));
        assert!(report.diagnostics().is_empty(), "{report}");
    }

    #[test]
    fn reports_skipped_checks_without_node_set() {
        let mut builder = GraphBuilder::new();
        builder.add_node(RelayLogic::success());
        let graph = builder.build().unwrap();

        let report = validate(&graph, &ValidationOptions::new());
        assert_eq!(count(&report, Severity::Info), 1);
        assert!(!report.has_errors());
    }

    #[test]
    fn dangling_destination_is_error() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(RelayLogic::success());
        builder.add_transition(&a, &NodeId::new(7)).unwrap();
        let graph = builder.build().unwrap();

        let report = validate(&graph, &ValidationOptions::new());
        assert!(report.has_errors());
        assert!(
            report
                .with_severity(Severity::Error)
                .any(|d| d.message.contains("#7"))
        );
    }

    #[test]
    fn self_loop_without_exit() {
        let mut builder = GraphBuilder::new();
        let a = builder.add_node(RelayLogic::success());
        builder.add_transition(&a, &a).unwrap();
        let graph = builder.build().unwrap();

        let report = validate(&graph, &ValidationOptions::new());
        assert_eq!(count(&report, Severity::Warning), 2);

        let quiet = ValidationOptions::new()
            .warn_on_self_loop(false)
            .strict_terminal_path(true);
        let report = validate(&graph, &quiet);
        assert_eq!(count(&report, Severity::Warning), 0);
        assert_eq!(count(&report, Severity::Error), 1);
    }

    #[test]
    fn unreachable_and_duplicate_names() {
        let mut builder = GraphBuilder::new();
        builder.add_named("twin", RelayLogic::success());
        builder.add_named("twin", RelayLogic::success());
        let graph = builder.build().unwrap();

        let report = validate(&graph, &ValidationOptions::exhaustive(&graph));
        let warnings: Vec<_> = report.with_severity(Severity::Warning).collect();
        assert_eq!(warnings.len(), 3);
        assert_eq!(warnings[0].message, "node is unreachable from start");
        assert_eq!(warnings[0].node.index(), 1);
        assert!(warnings[1..].iter().all(|d| d.message == "duplicate node name 'twin'"));
    }
}
