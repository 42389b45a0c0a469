//! Budgeted walk over the accessibility tree.
//!
//! The walk is an explicit stack of `{node, depth}` frames. Before a frame is
//! expanded the deadline, node and line budgets are checked; running out of
//! any of them ends the walk with whatever was collected so far. Frames deeper
//! than `max_depth` are never pushed.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;

use crate::config::CaptureBudgets;

use super::attributes::{AttributeCategory, AttributePlan};
use super::bridge::{AccessibilityTree, AttributeValue, NodeRef};
use super::text::LineCollector;

/// Why the walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalStop {
    /// Every reachable node within the depth limit was read.
    Exhausted,
    NodeBudget,
    LineBudget,
    Deadline,
}

#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    pub lines: Vec<String>,
    pub nodes_visited: usize,
    pub deepest: usize,
    pub stop: TraversalStop,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeRef,
    depth: usize,
}

pub struct Traversal<'a> {
    tree: &'a dyn AccessibilityTree,
    plan: &'a AttributePlan,
    budgets: &'a CaptureBudgets,
    deadline: Instant,
}

impl<'a> Traversal<'a> {
    pub fn new(
        tree: &'a dyn AccessibilityTree,
        plan: &'a AttributePlan,
        budgets: &'a CaptureBudgets,
        deadline: Instant,
    ) -> Self {
        Self {
            tree,
            plan,
            budgets,
            deadline,
        }
    }

    fn budget_exhausted(&self, visited: usize, lines: usize) -> Option<TraversalStop> {
        if Instant::now() >= self.deadline {
            Some(TraversalStop::Deadline)
        } else if visited >= self.budgets.max_nodes {
            Some(TraversalStop::NodeBudget)
        } else if lines >= self.budgets.max_lines {
            Some(TraversalStop::LineBudget)
        } else {
            None
        }
    }

    /// Walks from `roots` in order; earlier roots are read first.
    pub fn run(&self, roots: &[NodeRef]) -> TraversalOutcome {
        let mut stack: Vec<Frame> = roots
            .iter()
            .rev()
            .map(|&node| Frame { node, depth: 0 })
            .collect();
        let mut visited: HashSet<NodeRef> = HashSet::new();
        let mut collector = LineCollector::new();
        let mut deepest = 0;
        let mut stop = TraversalStop::Exhausted;

        while let Some(frame) = stack.pop() {
            if let Some(reason) = self.budget_exhausted(visited.len(), collector.len()) {
                stop = reason;
                break;
            }
            if !visited.insert(frame.node) {
                continue;
            }
            deepest = deepest.max(frame.depth);

            let children = self.read_node(frame.node, &mut collector);

            if frame.depth < self.budgets.max_depth {
                for child in children.into_iter().rev() {
                    if !visited.contains(&child) {
                        stack.push(Frame {
                            node: child,
                            depth: frame.depth + 1,
                        });
                    }
                }
            }
        }

        // A budget can also run out while reading the last node.
        if stop == TraversalStop::Exhausted && collector.len() >= self.budgets.max_lines {
            stop = TraversalStop::LineBudget;
        }

        TraversalOutcome {
            nodes_visited: visited.len(),
            lines: collector.into_lines(),
            deepest,
            stop,
        }
    }

    /// Collects the node's text lines and returns its child elements in
    /// attribute order.
    fn read_node(&self, node: NodeRef, collector: &mut LineCollector) -> Vec<NodeRef> {
        let discovered = self.tree.attribute_names(node);
        let mut children = Vec::new();

        for name in self.plan.order(&discovered) {
            if collector.len() >= self.budgets.max_lines || Instant::now() >= self.deadline {
                break;
            }
            let Some(value) = self.tree.attribute_value(node, &name) else {
                continue;
            };
            let category = self.plan.categorize(&name);
            self.absorb(value, category, collector, &mut children);
        }

        children
    }

    fn absorb(
        &self,
        value: AttributeValue,
        category: AttributeCategory,
        collector: &mut LineCollector,
        children: &mut Vec<NodeRef>,
    ) {
        match value {
            AttributeValue::Text(text) => {
                if collector.len() < self.budgets.max_lines {
                    collector.push(&text);
                }
            }
            AttributeValue::Number(number) if category == AttributeCategory::Text => {
                if collector.len() < self.budgets.max_lines {
                    collector.push(&format_number(number));
                }
            }
            AttributeValue::Number(_) | AttributeValue::Bool(_) => {}
            AttributeValue::Node(child) => children.push(child),
            AttributeValue::Array(items) => {
                for item in items {
                    self.absorb(item, category, collector, children);
                }
            }
        }
    }
}

fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}
