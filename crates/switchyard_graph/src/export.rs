//! Mermaid flowchart export.
//!
//! Only static transitions are drawn. Branches chosen at run time by a
//! [`Director`](crate::logic::Director) have no static edge.

use core::fmt::{self, Write};

use crate::graph::Graph;
use crate::node::NodeId;

const TERMINAL: &str = "End";

/// Flowchart direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowDirection {
    /// `TB`
    TopToBottom,
    /// `LR`
    #[default]
    LeftToRight,
    /// `RL`
    RightToLeft,
    /// `BT`
    BottomToTop,
}

impl FlowDirection {
    fn keyword(self) -> &'static str {
        match self {
            Self::TopToBottom => "TB",
            Self::LeftToRight => "LR",
            Self::RightToLeft => "RL",
            Self::BottomToTop => "BT",
        }
    }
}

/// Options for [`to_mermaid`].
#[derive(Debug, Clone)]
pub struct MermaidOptions {
    direction: FlowDirection,
    show_indices: bool,
    use_names: bool,
    terminal_node: bool,
    terminal_label: String,
    title: Option<String>,
}

impl Default for MermaidOptions {
    fn default() -> Self {
        Self {
            direction: FlowDirection::default(),
            show_indices: true,
            use_names: true,
            terminal_node: true,
            terminal_label: TERMINAL.to_owned(),
            title: None,
        }
    }
}

impl MermaidOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flow direction (default left to right).
    #[must_use]
    pub fn with_direction(mut self, direction: FlowDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Whether labels end with the node index, as in `fetch [2]`.
    #[must_use]
    pub fn with_indices(mut self, enabled: bool) -> Self {
        self.show_indices = enabled;
        self
    }

    /// Whether labels prefer the node name over a generic label.
    #[must_use]
    pub fn with_names(mut self, enabled: bool) -> Self {
        self.use_names = enabled;
        self
    }

    /// Whether terminal nodes link to a synthetic `End` node.
    #[must_use]
    pub fn with_terminal_node(mut self, enabled: bool) -> Self {
        self.terminal_node = enabled;
        self
    }

    /// Label of the synthetic `End` node. Blank labels fall back to `End`.
    #[must_use]
    pub fn with_terminal_label(mut self, label: impl Into<String>) -> Self {
        self.terminal_label = label.into();
        self
    }

    /// Title written in the header comment. Defaults to the graph ID.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Renders `graph` as a Mermaid flowchart.
#[must_use]
pub fn to_mermaid(graph: &Graph, options: &MermaidOptions) -> String {
    let mut out = String::with_capacity(256 + graph.node_count() * 32);
    // Writing into a String cannot fail.
    let _ = write_mermaid(&mut out, graph, options);
    out
}

/// Writes the flowchart for `graph` into `out`.
///
/// # Errors
///
/// Propagates errors from `out`.
pub fn write_mermaid(out: &mut impl Write, graph: &Graph, options: &MermaidOptions) -> fmt::Result {
    let title = options
        .title
        .clone()
        .unwrap_or_else(|| graph.id().to_string());
    writeln!(out, "%% switchyard mermaid export: {}", title.replace(['\r', '\n'], " "))?;
    writeln!(out, "flowchart {}", options.direction.keyword())?;

    for (index, node) in graph.nodes().iter().enumerate() {
        let label = escape(&label(node.id(), index, options));
        if node.kind().director().is_some() {
            writeln!(out, "  n{index}{{\"{label}\"}}")?;
        } else if index == 0 {
            writeln!(out, "  n{index}([\"{label}\"])")?;
        } else {
            writeln!(out, "  n{index}[\"{label}\"]")?;
        }
    }

    let needs_terminal = graph.edges().iter().any(|edge| edge.is_empty());
    if options.terminal_node && needs_terminal {
        let label = match options.terminal_label.trim() {
            "" => TERMINAL,
            label => label,
        };
        writeln!(out, "  {TERMINAL}((\"{}\"))", escape(label))?;
    }

    for (index, edge) in graph.edges().iter().enumerate() {
        match edge.destination() {
            None if options.terminal_node => writeln!(out, "  n{index} --> {TERMINAL}")?,
            None => {}
            Some(dest) => match dest.slot().filter(|slot| *slot < graph.node_count()) {
                Some(slot) => writeln!(out, "  n{index} --> n{slot}")?,
                None if options.terminal_node => {
                    writeln!(out, "  n{index} -. invalid .-> {TERMINAL}")?;
                }
                None => {}
            },
        }
    }
    Ok(())
}

fn label(id: &NodeId, index: usize, options: &MermaidOptions) -> String {
    let base = match id.name() {
        Some(name) if options.use_names && !name.is_empty() => name,
        _ if index == 0 => "Start",
        _ => "Node",
    };
    if options.show_indices {
        format!("{base} [{index}]")
    } else {
        base.to_owned()
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}
