//! `CoreSemanticChecker`, the standard `Decorate`-stage processor (spec.md
//! 4.3): marks tail positions and propagates value context once, then runs
//! a single prefix/postfix walk invoking `CheckSemantics`/`CheckSemantics2`.

use crate::ast::{Ast, NodeId};
use crate::decoration::{run_visitor, PrefixVisitor};
use crate::state;
use crate::types::TypeRef;

pub struct CoreSemanticChecker {
    initial_tail: bool,
    initial_context: TypeRef,
}

impl CoreSemanticChecker {
    pub fn new(initial_tail: bool, initial_context: TypeRef) -> CoreSemanticChecker {
        CoreSemanticChecker { initial_tail, initial_context }
    }

    /// Run the full standard check over `root`: `MarkTail` and
    /// `SetValueContext` once each, then the prefix/postfix walk. Diagnostics
    /// land in the active `CompilerState`'s message sink.
    pub fn check(&mut self, ast: &mut Ast, root: NodeId) {
        ast.mark_tail(root, self.initial_tail);
        ast.set_value_context(root, self.initial_context.clone());
        run_visitor(ast, root, self);
    }

    fn treat_warnings_as_errors(&self) -> bool {
        state::current().map(|s| s.options.treat_warnings_as_errors).unwrap_or(false)
    }
}

impl PrefixVisitor for CoreSemanticChecker {
    fn visit(&mut self, ast: &mut Ast, id: NodeId) -> bool {
        record(ast.check_semantics(id, self.treat_warnings_as_errors()));
        true
    }

    fn end_visit(&mut self, ast: &mut Ast, id: NodeId) {
        record(ast.check_semantics2(id, self.treat_warnings_as_errors()));
    }
}

fn record(messages: Vec<crate::diagnostics::OutputMessage>) {
    if messages.is_empty() {
        return;
    }
    if let Some(current) = state::current() {
        let mut sink = current.messages.borrow_mut();
        for message in messages {
            sink.push(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::scope::{LexicalScope, Symbol};
    use crate::ast::NodeKind;
    use crate::diagnostics::FilePosition;
    use crate::operator::Value;
    use crate::state::{CompilerOptions, CompilerState};
    use crate::types;
    use std::rc::Rc;

    fn pos() -> FilePosition {
        FilePosition::START
    }

    #[test]
    fn clean_function_body_produces_no_errors() {
        let guard = state::push(CompilerState::new("scheme", CompilerOptions::default()));
        let mut ast = Ast::new();
        let lit = ast.alloc(NodeKind::Literal(Value::Int(1)), Rc::from("t.scm"), pos(), pos());
        ast.set_value_type(lit, types::INT.clone());
        let root_scope = LexicalScope::root();
        ast.set_scope(lit, root_scope);

        let mut checker = CoreSemanticChecker::new(true, types::INT.clone());
        checker.check(&mut ast, lit);

        let current = state::current().unwrap();
        assert!(!current.messages.borrow().has_errors());
        drop(guard);
    }

    #[test]
    fn readonly_assignment_is_reported_to_active_state() {
        let guard = state::push(CompilerState::new("scheme", CompilerOptions::default()));
        let mut ast = Ast::new();
        let target = ast.alloc(NodeKind::Variable("x".to_string()), Rc::from("t.scm"), pos(), pos());
        let value = ast.alloc(NodeKind::Literal(Value::Int(1)), Rc::from("t.scm"), pos(), pos());
        ast.set_value_type(value, types::INT.clone());
        let assign = ast.alloc(NodeKind::Assign, Rc::from("t.scm"), pos(), pos());
        ast.append_child(assign, target).unwrap();
        ast.append_child(assign, value).unwrap();
        let root_scope = LexicalScope::root();
        root_scope.declare(Symbol::new("x", types::INT.clone(), true));
        ast.set_scope(assign, root_scope);
        ast.set_value_type(assign, types::VOID.clone());

        let mut checker = CoreSemanticChecker::new(false, types::VOID.clone());
        checker.check(&mut ast, assign);

        let current = state::current().unwrap();
        assert!(current.messages.borrow().has_errors());
        drop(guard);
    }
}
