//! A call-aware evaluator layered on top of `dynacore::interp`'s frame and
//! variable primitives (spec.md 6.3: a `Language` may need evaluation
//! semantics the core doesn't model). The core's `NodeKind` taxonomy has no
//! `Call` variant, so the lowering stage tags invocation forms as a
//! `Container` carrying a `call` attribute; this module is what actually
//! knows what that tag means. Everything else reimplements
//! `dynacore::interp::evaluate`'s match verbatim, but recurses into this
//! module's own `evaluate` rather than the core's, so a call nested inside
//! e.g. an `Op`'s operand or an `if`'s branch still gets special-cased.
//!
//! Closures here only see their own parameters, never an enclosing frame's
//! locals: the core's interpreter always resolves a `Variable` against the
//! single innermost active frame (`interp::read_variable`), never a frame
//! chain -- true lexical capture is a compiled-backend feature
//! (`Slot::ClosureCell`) this tree-walking path doesn't implement. A lambda
//! body referencing a name that isn't one of its own parameters resolves
//! against whatever frame happens to be active when it runs, the same as
//! any other `Variable` node.

use dynacore::ast::{Ast, NodeId, NodeKind};
use dynacore::error::RuntimeError;
use dynacore::interp;
use dynacore::operator::{self, Value};
use dynacore::state;
use std::sync::Arc;

/// A `lambda` value: its body and parameter names, downcast out of
/// `Value::Object` at call time. `Send + Sync` (hence plain `NodeId`/
/// `Vec<String>`, not the node's `Rc<FunctionTemplate>`) because
/// `Value::Object` requires it.
#[derive(Clone, Debug)]
struct Closure {
    body: NodeId,
    param_names: Vec<String>,
}

fn is_call(ast: &Ast, id: NodeId) -> bool {
    ast.attributes(id).iter().any(|(k, v)| k == "call" && v == "true")
}

/// Evaluate `id`, recursing through this module rather than
/// `dynacore::interp::evaluate` so nested calls are always special-cased.
pub fn evaluate(ast: &Ast, id: NodeId) -> Result<Value, RuntimeError> {
    interp::tick()?;
    match ast.kind(id).clone() {
        NodeKind::Literal(value) => Ok(value),

        NodeKind::Variable(name) => interp::read_variable(ast, id, &name),

        NodeKind::Assign => {
            let children = ast.children(id);
            let (target, value_node) = (children[0], children[1]);
            let value = evaluate(ast, value_node)?;
            if let NodeKind::Variable(name) = ast.kind(target).clone() {
                interp::write_variable(ast, target, &name, value.clone())?;
            }
            Ok(value)
        }

        NodeKind::Container if is_call(ast, id) => evaluate_call(ast, id),

        NodeKind::Block | NodeKind::Container => {
            let mut result = Value::Null;
            for &child in ast.children(id) {
                result = evaluate(ast, child)?;
            }
            Ok(result)
        }

        NodeKind::If => {
            let children = ast.children(id);
            let condition = evaluate(ast, children[0])?;
            if condition.is_truthy() {
                evaluate(ast, children[1])
            } else if let Some(&else_branch) = children.get(2) {
                evaluate(ast, else_branch)
            } else {
                Ok(Value::Null)
            }
        }

        NodeKind::Op(op) => {
            let children = ast.children(id);
            if op.arity == 1 {
                let operand = evaluate(ast, children[0])?;
                operator::evaluate_runtime(&op, &operand, &operand, false, false)
            } else {
                let (checked, promote_on_overflow) = state::current()
                    .map(|s| (s.options.checked, s.options.promote_on_overflow))
                    .unwrap_or((false, false));
                let mut acc = evaluate(ast, children[0])?;
                for &rhs_id in &children[1..] {
                    let rhs = evaluate(ast, rhs_id)?;
                    acc = operator::evaluate_runtime(&op, &acc, &rhs, checked, promote_on_overflow)?;
                }
                Ok(acc)
            }
        }

        NodeKind::Cast(_) => evaluate(ast, ast.children(id)[0]),

        NodeKind::Options(overrides) => {
            let guard = state::current().map(|base| {
                let derived =
                    state::CompilerState::new(base.language_name.clone(), overrides.apply(&base.options));
                state::push(derived)
            });
            let mut result = Value::Null;
            for &child in ast.children(id) {
                result = evaluate(ast, child)?;
            }
            drop(guard);
            Ok(result)
        }

        // A `lambda` evaluates to a callable `Closure`, unlike the core's own
        // `evaluate` (which has no notion of a value reaching for a
        // `Function` node directly -- it only models a caller pushing a
        // frame and binding parameters ahead of a body walk).
        NodeKind::Function(func) => {
            let children = ast.children(id);
            let param_count = func.template.param_count();
            let body = children[param_count];
            Ok(Value::Object(Arc::new(Closure {
                body,
                param_names: func.template.param_names.clone(),
            })))
        }

        NodeKind::Parameter(_) => Ok(Value::Null),
    }
}

fn evaluate_call(ast: &Ast, id: NodeId) -> Result<Value, RuntimeError> {
    let children = ast.children(id);
    let callee = evaluate(ast, children[0])?;
    let closure = match &callee {
        Value::Object(obj) => obj.downcast_ref::<Closure>().cloned(),
        _ => None,
    }
    .ok_or_else(|| RuntimeError::NotCallable(format!("{callee:?}")))?;

    let mut args = Vec::with_capacity(children.len() - 1);
    for &arg_id in &children[1..] {
        args.push(evaluate(ast, arg_id)?);
    }
    if args.len() != closure.param_names.len() {
        return Err(RuntimeError::ArityMismatch(format!(
            "expected {} argument(s), got {}",
            closure.param_names.len(),
            args.len()
        )));
    }

    let _frame = interp::push_frame();
    for (name, value) in closure.param_names.iter().zip(args) {
        interp::bind_parameter(name, value);
    }
    evaluate(ast, closure.body)
}

/// Run a freshly lowered program to completion: resets the step counter,
/// pushes one top-level frame, and evaluates `root`.
pub fn run(ast: &Ast, root: NodeId) -> Result<Value, RuntimeError> {
    interp::reset_steps();
    let _frame = interp::push_frame();
    evaluate(ast, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LispParser;
    use crate::scanner::LispScanner;
    use dynacore::binding::TopLevel;
    use dynacore::language::IParser;
    use dynacore::state::{CompilerOptions, CompilerState};

    fn eval_source(source: &str) -> Value {
        let _guard = state::push(CompilerState::new("scheme", CompilerOptions::default()));
        let top_level = TopLevel::new();
        let mut parser = LispParser::new(LispScanner::default(), &top_level);
        let (ast, root) = parser.parse(source, "t.scm").unwrap();
        run(&ast, root).unwrap()
    }

    #[test]
    fn evaluates_arithmetic() {
        let v = eval_source("(+ 1 2 3)");
        assert!(matches!(v, Value::Long(6)));
    }

    #[test]
    fn calls_a_defined_function() {
        let v = eval_source("(define double (lambda (x) (* x 2))) (double 21)");
        assert!(matches!(v, Value::Long(42)));
    }

    #[test]
    fn calls_nested_inside_an_operator() {
        let v = eval_source("(define one (lambda () 1)) (+ (one) 41)");
        assert!(matches!(v, Value::Long(42)));
    }

    #[test]
    fn if_selects_a_branch() {
        let v = eval_source("(if #f 1 2)");
        assert!(matches!(v, Value::Long(2)));
    }

    #[test]
    fn calling_a_non_function_errors() {
        let mut ast = Ast::new();
        let lit = ast.alloc(
            NodeKind::Literal(Value::Long(1)),
            std::rc::Rc::from("t.scm"),
            dynacore::diagnostics::FilePosition::START,
            dynacore::diagnostics::FilePosition::START,
        );
        let call = ast.alloc(
            NodeKind::Container,
            std::rc::Rc::from("t.scm"),
            dynacore::diagnostics::FilePosition::START,
            dynacore::diagnostics::FilePosition::START,
        );
        ast.add_attribute(call, "call", "true");
        ast.append_child(call, lit).unwrap();

        let _frame = interp::push_frame();
        let err = evaluate(&ast, call).unwrap_err();
        assert!(matches!(err, RuntimeError::NotCallable(_)));
    }

    #[test]
    fn wrong_arity_errors() {
        let _guard = state::push(CompilerState::new("scheme", CompilerOptions::default()));
        let top_level = TopLevel::new();
        let mut parser = LispParser::new(LispScanner::default(), &top_level);
        let (ast, root) = parser.parse("(define f (lambda (x y) x)) (f 1)", "t.scm").unwrap();
        let err = run(&ast, root).unwrap_err();
        assert!(matches!(err, RuntimeError::ArityMismatch(_)));
    }
}
