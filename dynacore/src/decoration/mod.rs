//! The staged decoration pipeline (spec.md 4.3, capability C3): ordered
//! stages of tree-mutating and read-only processors, run in order, each
//! automatically wrapped in the `CompilerState` push/pop an `Options` node
//! requires.

pub mod checker;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::diagnostics::{DiagnosticCode, FilePosition};
use crate::state::{self, CompilerStateGuard};

/// The four stages, always run in this order (spec.md 4.3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    PreDecorate,
    Decorate,
    Optimize,
    Optimized,
}

/// May replace or delete the node it's handed, then descends into (possibly
/// new) children. To keep a node unchanged, return `Some(id)` -- the same
/// id it was given. To replace it, mutate the tree itself (e.g. via
/// `Ast::replace` against the node's *children*, since it doesn't have its
/// own parent link in hand) and return the id that should now be treated as
/// this position; the pipeline driver wires that decision into the actual
/// parent slot. Returning `None` deletes this node and its subtree; the
/// driver detaches it from its parent.
pub trait PrefixProcessor {
    fn visit(&mut self, ast: &mut Ast, id: NodeId) -> Option<NodeId>;
}

/// Read-only with respect to tree structure (no append/replace/remove of
/// children), but may still annotate node metadata -- flags, `ValueType`,
/// `ContextType`, `Scope` -- which is exactly what `CoreSemanticChecker`
/// needs to do.
pub trait PrefixVisitor {
    /// Pre-order hook. Return whether to descend into `id`'s children.
    fn visit(&mut self, ast: &mut Ast, id: NodeId) -> bool;
    /// Post-order hook, run after children (and their own `end_visit`s).
    fn end_visit(&mut self, _ast: &mut Ast, _id: NodeId) {}
}

/// One stage's processor, in either style.
pub enum Processor {
    Prefix(Box<dyn PrefixProcessor>),
    Visitor(Box<dyn PrefixVisitor>),
}

/// An ordered list of processors per stage, run in insertion order within a
/// stage and stage order overall.
#[derive(Default)]
pub struct Pipeline {
    pre_decorate: Vec<Processor>,
    decorate: Vec<Processor>,
    optimize: Vec<Processor>,
    optimized: Vec<Processor>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    pub fn add(&mut self, stage: Stage, processor: Processor) {
        match stage {
            Stage::PreDecorate => self.pre_decorate.push(processor),
            Stage::Decorate => self.decorate.push(processor),
            Stage::Optimize => self.optimize.push(processor),
            Stage::Optimized => self.optimized.push(processor),
        }
    }

    /// Run every stage's processors against `root`, in order, and return the
    /// (possibly replaced) root afterward. The `Ast`'s own root pointer is
    /// updated to match.
    pub fn run(&mut self, ast: &mut Ast, root: NodeId) -> NodeId {
        let mut current = root;
        for (stage_name, stage) in [
            ("PreDecorate", &mut self.pre_decorate),
            ("Decorate", &mut self.decorate),
            ("Optimize", &mut self.optimize),
            ("Optimized", &mut self.optimized),
        ] {
            log::debug!("running {stage_name} stage ({} processor(s))", stage.len());
            for processor in stage.iter_mut() {
                current = match processor {
                    Processor::Prefix(p) => run_processor(ast, current, p.as_mut()).unwrap_or(current),
                    Processor::Visitor(v) => {
                        run_visitor(ast, current, v.as_mut());
                        current
                    }
                };
            }
        }
        ast.set_root(current);
        current
    }
}

/// Push the `CompilerState` an `Options` node introduces, if `id` is one.
fn push_state_for(ast: &Ast, id: NodeId) -> Option<CompilerStateGuard> {
    match ast.kind(id) {
        NodeKind::Options(overrides) => {
            let base = state::current()?;
            let derived = state::CompilerState::new(base.language_name.clone(), overrides.apply(&base.options));
            Some(state::push(derived))
        }
        _ => None,
    }
}

/// Depth-first prefix-processor walk starting at `id`. See
/// [`PrefixProcessor`] for the replace/delete contract.
pub fn run_processor(ast: &mut Ast, id: NodeId, processor: &mut dyn PrefixProcessor) -> Option<NodeId> {
    let _guard = push_state_for(ast, id);
    let current = processor.visit(ast, id)?;
    let children = ast.children(current).to_vec();
    for child in children {
        match run_processor(ast, child, processor) {
            Some(new_child) if new_child != child => {
                let _ = ast.replace(child, new_child);
            }
            Some(_) => {}
            None => {
                let _ = ast.remove(child);
            }
        }
    }
    Some(current)
}

/// Depth-first prefix-visitor walk starting at `id`.
pub fn run_visitor(ast: &mut Ast, id: NodeId, visitor: &mut dyn PrefixVisitor) {
    let _guard = push_state_for(ast, id);
    let descend = visitor.visit(ast, id);
    if descend {
        let children = ast.children(id).to_vec();
        for child in children {
            run_visitor(ast, child, visitor);
        }
    }
    visitor.end_visit(ast, id);
}

/// Record an unexpected internal failure (spec.md 4.3: "parser-level
/// exceptions are caught and reported as `InternalCompilerError`") against
/// the active `CompilerState`'s message sink, if any is active.
pub fn report_internal_error(source_name: &str, position: FilePosition, detail: impl std::fmt::Display) {
    if let Some(current) = state::current() {
        let msg = DiagnosticCode::InternalCompilerError.to_message(
            current.options.treat_warnings_as_errors,
            source_name,
            position,
            &[detail.to_string()],
        );
        current.messages.borrow_mut().push(msg);
    }
}
