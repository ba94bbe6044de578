use crate::quantity::{ProvenanceEntry, TrackedQuantity};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

/// Renders the derivation graph behind `quantity` as an indented tree,
/// newest step first. Entries reachable along more than one path are
/// expanded once and referenced afterwards.
///
/// A run of single-source steps is printed at one indent, so a long linear
/// history costs one short line per step.
pub fn format_trace(quantity: &TrackedQuantity) -> String {
    let mut tracer = Tracer {
        visited_at_level: HashMap::new(),
        output: String::new(),
    };
    let _ = writeln!(tracer.output, "AUDIT TRACE for {}:", quantity);
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    tracer.trace_from(quantity.provenance_tail());
    tracer.output
}

struct Frame {
    entry: Arc<ProvenanceEntry>,
    level: usize,
    stem: String,
    connector: &'static str,
    // Sole source of its parent.
    in_chain: bool,
}

struct Tracer {
    visited_at_level: HashMap<*const ProvenanceEntry, usize>,
    output: String,
}

impl Tracer {
    // Depth-first with an explicit stack; histories can be arbitrarily deep.
    fn trace_from(&mut self, root: Arc<ProvenanceEntry>) {
        let mut stack = vec![Frame {
            entry: root,
            level: 1,
            stem: String::new(),
            connector: "",
            in_chain: false,
        }];

        while let Some(frame) = stack.pop() {
            let key = Arc::as_ptr(&frame.entry);
            if let Some(&first_seen) = self.visited_at_level.get(&key) {
                let _ = writeln!(
                    self.output,
                    "{}{}[L{}] {} (see above)",
                    frame.stem, frame.connector, first_seen, frame.entry
                );
                continue;
            }
            self.visited_at_level.insert(key, frame.level);
            let _ = writeln!(
                self.output,
                "{}{}[L{}] {}",
                frame.stem, frame.connector, frame.level, frame.entry
            );
            push_sources(&mut stack, &frame);
        }
    }
}

fn push_sources(stack: &mut Vec<Frame>, parent: &Frame) {
    let sources = parent.entry.sources();
    let stem = if sources.len() == 1 && parent.in_chain {
        parent.stem.clone()
    } else {
        build_child_stem(&parent.stem, parent.connector)
    };
    // Reversed so the first source is printed first.
    for (i, source) in sources.iter().enumerate().rev() {
        stack.push(Frame {
            entry: Arc::clone(source),
            level: parent.level + 1,
            stem: stem.clone(),
            connector: if i == sources.len() - 1 { "`-- " } else { "|-- " },
            in_chain: sources.len() == 1,
        });
    }
}

fn build_child_stem(stem: &str, connector: &str) -> String {
    let continuation = match connector {
        "|-- " => "|   ",
        "`-- " => "    ",
        _ => "",
    };
    format!("{}{}", stem, continuation)
}
