//! Decision tree and influence diagram for the launch decision.
//!
//! The tree is evaluated by rolling back expected values: chance nodes take the
//! probability-weighted mean of their outcomes, decision nodes take the best
//! option. Both diagrams are written as Graphviz DOT files.

use super::{format_currency, write_numbered};
use crate::config::PathConfig;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

pub const DECISION_TREE_DOT: &str = "campervan_decision_tree.dot";
pub const INFLUENCE_DIAGRAM_DOT: &str = "campervan_influence_diagram.dot";

const PROBABILITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug)]
pub enum DecisionError {
    InvalidProbability { node: String, probability: f64 },
    ProbabilitiesDoNotSumToOne { node: String, total: f64 },
    EmptyNode(String),
    RootNotDecision,
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for DecisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionError::InvalidProbability { node, probability } => write!(
                f,
                "'{}' has an outcome with probability {} outside [0, 1]",
                node, probability
            ),
            DecisionError::ProbabilitiesDoNotSumToOne { node, total } => write!(
                f,
                "outcome probabilities of '{}' sum to {} instead of 1",
                node, total
            ),
            DecisionError::EmptyNode(node) => write!(f, "'{}' has no branches", node),
            DecisionError::RootNotDecision => write!(f, "tree root must be a decision node"),
            DecisionError::Io { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for DecisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecisionError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Decision { name: String, options: Vec<Branch> },
    Chance { name: String, outcomes: Vec<Branch> },
    Payoff(f64),
}

/// An edge of the tree; `probability` is only meaningful below a chance node.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub label: String,
    pub probability: Option<f64>,
    pub node: Node,
}

impl Branch {
    pub fn option(label: impl Into<String>, node: Node) -> Self {
        Self {
            label: label.into(),
            probability: None,
            node,
        }
    }

    pub fn outcome(label: impl Into<String>, probability: f64, node: Node) -> Self {
        Self {
            label: label.into(),
            probability: Some(probability),
            node,
        }
    }
}

impl Node {
    /// Checks every chance node: probabilities within [0, 1] summing to 1.
    pub fn validate(&self) -> Result<(), DecisionError> {
        match self {
            Node::Payoff(_) => Ok(()),
            Node::Decision { name, options } => {
                if options.is_empty() {
                    return Err(DecisionError::EmptyNode(name.clone()));
                }
                options.iter().try_for_each(|branch| branch.node.validate())
            }
            Node::Chance { name, outcomes } => {
                if outcomes.is_empty() {
                    return Err(DecisionError::EmptyNode(name.clone()));
                }
                let mut total = 0.0;
                for branch in outcomes {
                    let probability = branch.probability.unwrap_or(f64::NAN);
                    if !(0.0..=1.0).contains(&probability) {
                        return Err(DecisionError::InvalidProbability {
                            node: name.clone(),
                            probability,
                        });
                    }
                    total += probability;
                    branch.node.validate()?;
                }
                if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
                    return Err(DecisionError::ProbabilitiesDoNotSumToOne {
                        node: name.clone(),
                        total,
                    });
                }
                Ok(())
            }
        }
    }

    /// Rolled-back expected value. Call `validate` first.
    pub fn expected_value(&self) -> f64 {
        match self {
            Node::Payoff(value) => *value,
            Node::Chance { outcomes, .. } => outcomes
                .iter()
                .map(|branch| branch.probability.unwrap_or(0.0) * branch.node.expected_value())
                .sum(),
            Node::Decision { options, .. } => options
                .iter()
                .map(|branch| branch.node.expected_value())
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionValue {
    pub label: String,
    pub expected_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionEvaluation {
    pub question: String,
    pub options: Vec<OptionValue>,
    /// Highest expected value; the first option wins a tie.
    pub recommended: OptionValue,
}

/// Validates the tree and scores each option of its root decision.
pub fn evaluate(root: &Node) -> Result<DecisionEvaluation, DecisionError> {
    root.validate()?;
    let (question, options) = match root {
        Node::Decision { name, options } => (name.clone(), options.as_slice()),
        Node::Chance { .. } | Node::Payoff(_) => return Err(DecisionError::RootNotDecision),
    };

    let options: Vec<OptionValue> = options
        .iter()
        .map(|branch| OptionValue {
            label: branch.label.clone(),
            expected_value: branch.node.expected_value(),
        })
        .collect();
    let recommended = options
        .iter()
        .fold(None::<&OptionValue>, |best, option| match best {
            Some(current) if current.expected_value >= option.expected_value => Some(current),
            _ => Some(option),
        })
        .cloned()
        .ok_or_else(|| DecisionError::EmptyNode(question.clone()))?;

    Ok(DecisionEvaluation {
        question,
        options,
        recommended,
    })
}

/// The launch decision: demand and weather drive the profit of investing.
pub fn campervan_tree() -> Node {
    let weather = |favorable: f64, unfavorable: f64| Node::Chance {
        name: "Weather Conditions".to_string(),
        outcomes: vec![
            Branch::outcome("Favorable", 0.6, Node::Payoff(favorable)),
            Branch::outcome("Unfavorable", 0.4, Node::Payoff(unfavorable)),
        ],
    };

    Node::Decision {
        name: "Invest in Campervan Rental?".to_string(),
        options: vec![
            Branch::option(
                "Yes",
                Node::Chance {
                    name: "Market Demand".to_string(),
                    outcomes: vec![
                        Branch::outcome("High", 0.4, weather(200_000.0, 100_000.0)),
                        Branch::outcome("Medium", 0.4, weather(100_000.0, 50_000.0)),
                        Branch::outcome("Low", 0.2, weather(20_000.0, -30_000.0)),
                    ],
                },
            ),
            Branch::option("No", Node::Payoff(0.0)),
        ],
    }
}

/// Left-to-right DOT rendering: squares for decisions, circles for chance
/// nodes, plain text for payoffs.
pub fn decision_tree_dot(root: &Node) -> String {
    let mut out = String::from("// Campervan Rental Decision Tree\ndigraph {\n\trankdir=LR\n");
    let mut counter = 0usize;
    write_node(&mut out, root, &mut counter);
    out.push_str("}\n");
    out
}

fn write_node(out: &mut String, node: &Node, counter: &mut usize) -> String {
    let id = format!("N{}", *counter);
    *counter += 1;

    let (label, shape, branches) = match node {
        Node::Decision { name, options } => (name.clone(), "square", options.as_slice()),
        Node::Chance { name, outcomes } => (name.clone(), "circle", outcomes.as_slice()),
        Node::Payoff(value) => (format!("Profit {}", format_currency(*value)), "plaintext", &[][..]),
    };
    out.push_str(&format!(
        "\t{} [label=\"{}\" shape={}]\n",
        id,
        dot_escape(&label),
        shape
    ));

    for branch in branches {
        let child = write_node(out, &branch.node, counter);
        let edge_label = match branch.probability {
            Some(probability) => format!("{}\n({})", branch.label, probability),
            None => branch.label.clone(),
        };
        out.push_str(&format!(
            "\t{} -> {} [label=\"{}\"]\n",
            id,
            child,
            dot_escape(&edge_label)
        ));
    }
    id
}

/// Factors that feed profitability, as a DOT influence diagram.
pub fn influence_diagram_dot() -> String {
    let nodes = [
        ("D1", "Invest in Campervan Rental", "square"),
        ("C1", "Market Demand", "circle"),
        ("C2", "Weather Conditions", "circle"),
        ("C3", "Operational Costs", "circle"),
        ("C4", "Competition", "circle"),
        ("V1", "Profitability", "diamond"),
    ];
    let edges = [
        ("D1", "V1"),
        ("C1", "V1"),
        ("C2", "V1"),
        ("C3", "V1"),
        ("C4", "V1"),
        ("C1", "C3"),
        ("C2", "C3"),
        ("C4", "C1"),
    ];

    let mut out = String::from("// Campervan Rental Influence Diagram\ndigraph {\n");
    for (id, label, shape) in nodes {
        out.push_str(&format!(
            "\t{} [label=\"{}\" shape={}]\n",
            id,
            dot_escape(label),
            shape
        ));
    }
    for (from, to) in edges {
        out.push_str(&format!("\t{} -> {}\n", from, to));
    }
    out.push_str("}\n");
    out
}

fn dot_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub evaluation: DecisionEvaluation,
    pub diagrams: Vec<PathBuf>,
}

pub fn run(paths: &PathConfig) -> Result<DecisionOutcome, DecisionError> {
    let tree = campervan_tree();
    let evaluation = evaluate(&tree)?;
    info!(
        recommended = %evaluation.recommended.label,
        expected_value = evaluation.recommended.expected_value,
        "decision tree evaluated"
    );

    let mut diagrams = Vec::with_capacity(2);
    for (name, contents) in [
        (DECISION_TREE_DOT, decision_tree_dot(&tree)),
        (INFLUENCE_DIAGRAM_DOT, influence_diagram_dot()),
    ] {
        let path = paths.output(name);
        std::fs::write(&path, contents).map_err(|source| DecisionError::Io {
            path: path.clone(),
            source,
        })?;
        info!(diagram = %path.display(), "diagram written");
        diagrams.push(path);
    }

    Ok(DecisionOutcome {
        evaluation,
        diagrams,
    })
}

impl DecisionOutcome {
    pub fn render_text(&self) -> String {
        let evaluation = &self.evaluation;
        let mut out = String::new();
        out.push_str(&format!("Decision: {}\n", evaluation.question));
        for option in &evaluation.options {
            out.push_str(&format!(
                "   - {}: expected profit {}\n",
                option.label,
                format_currency(option.expected_value)
            ));
        }
        out.push_str(&format!(
            "\nRecommended: {} (expected profit {})\n",
            evaluation.recommended.label,
            format_currency(evaluation.recommended.expected_value)
        ));

        out.push_str("\nDiagrams written (Graphviz DOT):\n");
        for path in &self.diagrams {
            out.push_str(&format!("   - {}\n", path.display()));
        }

        out.push('\n');
        write_numbered(
            &mut out,
            "How to use this data:",
            &[
                "Revisit the demand and weather probabilities as the tourism and weather analyses are updated",
                "Render the DOT files with `dot -Tpng` to share the decision structure",
                "Compare the expected profit with the NPV from the financial analysis before committing",
            ],
        );
        out
    }
}
