//! Shared helpers for the integration test suite: small builders so each
//! scenario reads as "build this tree, run it" rather than repeating arena
//! plumbing (spec.md 8's "hand-constructed ASTs via `Ast` builder helper
//! methods" approach, lifted up to test-crate scope).

use dynacore::ast::scope::{LexicalScope, Symbol};
use dynacore::ast::{Ast, NodeId, NodeKind};
use dynacore::diagnostics::FilePosition;
use dynacore::operator::Value;
use dynacore::types::TypeRef;
use std::rc::Rc;

pub fn pos() -> FilePosition {
    FilePosition::START
}

pub fn lit(ast: &mut Ast, value: Value) -> NodeId {
    ast.alloc(NodeKind::Literal(value), Rc::from("t.scm"), pos(), pos())
}

pub fn var(ast: &mut Ast, name: &str) -> NodeId {
    ast.alloc(NodeKind::Variable(name.to_string()), Rc::from("t.scm"), pos(), pos())
}

pub fn block(ast: &mut Ast, children: &[NodeId]) -> NodeId {
    let id = ast.alloc(NodeKind::Block, Rc::from("t.scm"), pos(), pos());
    for &c in children {
        ast.append_child(id, c).unwrap();
    }
    id
}

pub fn op(ast: &mut Ast, operator: dynacore::operator::OperatorRef, children: &[NodeId]) -> NodeId {
    let id = ast.alloc(NodeKind::Op(operator), Rc::from("t.scm"), pos(), pos());
    for &c in children {
        ast.append_child(id, c).unwrap();
    }
    id
}

pub fn assign(ast: &mut Ast, target: NodeId, value: NodeId) -> NodeId {
    let id = ast.alloc(NodeKind::Assign, Rc::from("t.scm"), pos(), pos());
    ast.append_child(id, target).unwrap();
    ast.append_child(id, value).unwrap();
    id
}

pub fn if_node(ast: &mut Ast, cond: NodeId, then: NodeId, r#else: Option<NodeId>) -> NodeId {
    let id = ast.alloc(NodeKind::If, Rc::from("t.scm"), pos(), pos());
    ast.append_child(id, cond).unwrap();
    ast.append_child(id, then).unwrap();
    if let Some(e) = r#else {
        ast.append_child(id, e).unwrap();
    }
    id
}

pub fn declare(scope: &Rc<LexicalScope>, name: &str, ty: TypeRef, read_only: bool) {
    scope.declare(Symbol::new(name, ty, read_only));
}
