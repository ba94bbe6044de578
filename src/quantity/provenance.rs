//! Derivation history attached to every `TrackedQuantity`.
//!
//! Each entry is one `Step` plus links to the entries it was derived from.
//! The links are shared `Arc`s, so the tail of any quantity is the root of
//! its complete derivation graph and histories are never copied.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A binary operation between two quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Compare,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Compare => "compare",
        })
    }
}

/// What happened in one derivation step. Magnitudes and units are the
/// quantity's state right after the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Created {
        magnitude: f64,
        unit: String,
    },
    Converted {
        from: String,
        to: String,
        magnitude: f64,
    },
    Combined {
        operation: Operation,
        magnitude: f64,
        unit: String,
    },
    Scaled {
        factor: f64,
        magnitude: f64,
        unit: String,
    },
    Powered {
        exponent: f64,
        magnitude: f64,
        unit: String,
    },
    /// An argument accepted by a checked function, in the declared unit.
    Input {
        function: String,
        parameter: String,
        magnitude: f64,
        unit: String,
    },
    Computed {
        function: String,
        magnitude: f64,
        unit: String,
    },
}

impl Step {
    pub fn magnitude(&self) -> f64 {
        match self {
            Step::Created { magnitude, .. }
            | Step::Converted { magnitude, .. }
            | Step::Combined { magnitude, .. }
            | Step::Scaled { magnitude, .. }
            | Step::Powered { magnitude, .. }
            | Step::Input { magnitude, .. }
            | Step::Computed { magnitude, .. } => *magnitude,
        }
    }

    pub fn unit(&self) -> &str {
        match self {
            Step::Converted { to, .. } => to,
            Step::Created { unit, .. }
            | Step::Combined { unit, .. }
            | Step::Scaled { unit, .. }
            | Step::Powered { unit, .. }
            | Step::Input { unit, .. }
            | Step::Computed { unit, .. } => unit,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Created { magnitude, unit } => write!(f, "created: {} {}", magnitude, unit),
            Step::Converted { from, to, magnitude } => {
                write!(f, "converted {} -> {}: {} {}", from, to, magnitude, to)
            }
            Step::Combined { operation, magnitude, unit } => {
                write!(f, "combined via {}: {} {}", operation, magnitude, unit)
            }
            Step::Scaled { factor, magnitude, unit } => {
                write!(f, "scaled by {}: {} {}", factor, magnitude, unit)
            }
            Step::Powered { exponent, magnitude, unit } => {
                write!(f, "raised to power {}: {} {}", exponent, magnitude, unit)
            }
            Step::Input { function, parameter, magnitude, unit } => {
                write!(f, "input {} of {}: {} {}", parameter, function, magnitude, unit)
            }
            Step::Computed { function, magnitude, unit } => {
                write!(f, "computed by {}: {} {}", function, magnitude, unit)
            }
        }
    }
}

/// One step in a quantity's derivation chain, linked to the entries it was
/// derived from: the previous state for unary steps, both operands for
/// `Combined`, the argument's tail for `Input`, the inputs for `Computed`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceEntry {
    step: Step,
    sources: Vec<Arc<ProvenanceEntry>>,
}

impl ProvenanceEntry {
    pub fn new(step: Step, sources: Vec<Arc<ProvenanceEntry>>) -> Self {
        Self { step, sources }
    }

    pub fn created(magnitude: f64, unit: impl Into<String>) -> Self {
        Self::new(
            Step::Created {
                magnitude,
                unit: unit.into(),
            },
            Vec::new(),
        )
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn sources(&self) -> &[Arc<ProvenanceEntry>] {
        &self.sources
    }

    pub fn magnitude(&self) -> f64 {
        self.step.magnitude()
    }

    pub fn unit(&self) -> &str {
        self.step.unit()
    }
}

impl fmt::Display for ProvenanceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step)?;
        if matches!(self.step, Step::Input { .. }) && self.sources.is_empty() {
            f.write_str(" (raw number)")?;
        }
        Ok(())
    }
}

/// Flat, index-linked form of a provenance graph.
///
/// `nodes` are topologically ordered (sources first) and shared entries
/// appear once; `chain` lists the quantity's own history by node index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub nodes: Vec<NodeRecord>,
    pub chain: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub step: Step,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<usize>,
}

impl ProvenanceRecord {
    pub fn from_chain(chain: &[Arc<ProvenanceEntry>]) -> Self {
        let mut record = Self {
            nodes: Vec::new(),
            chain: Vec::with_capacity(chain.len()),
        };
        let mut index = HashMap::new();
        for entry in chain {
            let id = record.intern(entry, &mut index);
            record.chain.push(id);
        }
        record
    }

    /// Iterative post-order walk so long histories do not exhaust the stack.
    fn intern(&mut self, root: &Arc<ProvenanceEntry>, index: &mut HashMap<*const ProvenanceEntry, usize>) -> usize {
        let mut stack = vec![(root, false)];
        while let Some((entry, expanded)) = stack.pop() {
            let key = Arc::as_ptr(entry);
            if index.contains_key(&key) {
                continue;
            }
            if expanded {
                let sources = entry
                    .sources()
                    .iter()
                    .filter_map(|s| index.get(&Arc::as_ptr(s)).copied())
                    .collect();
                index.insert(key, self.nodes.len());
                self.nodes.push(NodeRecord {
                    step: entry.step().clone(),
                    sources,
                });
            } else {
                stack.push((entry, true));
                stack.extend(entry.sources().iter().rev().map(|s| (s, false)));
            }
        }
        index.get(&Arc::as_ptr(root)).copied().unwrap_or_default()
    }

    /// Rebuilds the shared entries. Every source index must point at an
    /// earlier node.
    pub fn into_chain(self) -> Result<Vec<Arc<ProvenanceEntry>>, String> {
        let mut built: Vec<Arc<ProvenanceEntry>> = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.into_iter().enumerate() {
            let sources = node
                .sources
                .iter()
                .map(|&s| {
                    built
                        .get(s)
                        .filter(|_| s < i)
                        .cloned()
                        .ok_or_else(|| format!("provenance node {} references invalid source {}", i, s))
                })
                .collect::<Result<Vec<_>, _>>()?;
            built.push(Arc::new(ProvenanceEntry::new(node.step, sources)));
        }
        self.chain
            .iter()
            .map(|&id| {
                built
                    .get(id)
                    .cloned()
                    .ok_or_else(|| format!("provenance chain references unknown node {}", id))
            })
            .collect()
    }
}
