//! Tree-walking interpretation of a decorated `Ast` (spec.md 5, capability
//! C5's "both compiled and interpreted execution behind the same `Slot`
//! contract"). Variable references resolve to `Slot::InterpretedLocal`
//! lazily, the same "materialized on first use" idiom `LocalProxySlot` uses
//! for compiled locals. Grounded in the teacher's step-counting discipline
//! (`Machine::execute_next_inner` in `crates/core/src/machine.rs`): every
//! evaluation increments a cycle counter bounded by `MAX_EVAL_STEPS`,
//! surfaced as `RuntimeError::TooManyCycles`.

use crate::ast::scope::Symbol;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::emitter::slot::{InterpretedLocalSlot, Slot};
use crate::error::RuntimeError;
use crate::operator::{self, Value};
use crate::state;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Upper bound on node evaluations per `evaluate` entry point, guarding
/// against runaway recursion in a buggy or adversarial program (teacher's
/// `MAX_CYCLE_COUNT`, generalized from "machine instructions" to "tree
/// nodes walked").
pub const MAX_EVAL_STEPS: u64 = 1_000_000;

#[derive(Debug, Default)]
struct Frame {
    locals: HashMap<String, Value>,
}

#[derive(Debug, Default)]
struct InterpreterEnvironment {
    frames: Vec<Frame>,
    steps: u64,
}

thread_local! {
    static ENV: RefCell<InterpreterEnvironment> = RefCell::new(InterpreterEnvironment::default());
}

/// RAII guard for one interpreted call frame -- pushed on entry, popped on
/// every exit path including an early `?` return or panic unwind, mirroring
/// [`crate::state::CompilerStateGuard`].
#[must_use]
pub struct FrameGuard {
    _private: (),
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        ENV.with(|env| {
            env.borrow_mut().frames.pop();
        });
    }
}

/// Push a fresh, empty call frame for the current thread.
pub fn push_frame() -> FrameGuard {
    ENV.with(|env| env.borrow_mut().frames.push(Frame::default()));
    FrameGuard { _private: () }
}

/// Seed `name` into the innermost frame, e.g. binding a parameter before
/// evaluating a function body. Panics if no frame is active -- callers must
/// `push_frame` first.
pub fn bind_parameter(name: &str, value: Value) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        let frame = env.frames.last_mut().expect("bind_parameter called with no active frame");
        frame.locals.insert(name.to_string(), value);
    });
}

fn lookup_local(name: &str) -> Option<Value> {
    ENV.with(|env| env.borrow().frames.last().and_then(|f| f.locals.get(name).cloned()))
}

fn store_local(name: &str, value: Value) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        if let Some(frame) = env.frames.last_mut() {
            frame.locals.insert(name.to_string(), value);
        }
    });
}

/// Reset the step counter, e.g. before starting a fresh top-level
/// evaluation on a thread that's already interpreted something.
pub fn reset_steps() {
    ENV.with(|env| env.borrow_mut().steps = 0);
}

/// Charge one step against the active step budget. Exposed so a host
/// language building its own compound evaluator on top of this module's
/// frame/variable primitives (e.g. for call semantics this core doesn't
/// model) can share the same step-counting discipline instead of
/// reimplementing it.
pub fn tick() -> Result<(), RuntimeError> {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        env.steps += 1;
        if env.steps > MAX_EVAL_STEPS {
            Err(RuntimeError::TooManyCycles)
        } else {
            Ok(())
        }
    })
}

/// `symbol`'s interpreted slot, materializing it as `InterpretedLocal` on
/// first use (spec.md 3.4: "`slot` starts `None` and is filled in during
/// emission/interpretation setup").
fn interpreted_slot(symbol: &Rc<Symbol>) -> Slot {
    if let Some(slot) = symbol.slot.borrow().as_ref() {
        return slot.clone();
    }
    let slot = Slot::InterpretedLocal(InterpretedLocalSlot {
        name: symbol.name.clone(),
        ty: symbol.ty.clone(),
    });
    *symbol.slot.borrow_mut() = Some(slot.clone());
    slot
}

/// Read `name` (a `Variable` node, `id`) out of the innermost active frame,
/// resolving through `Ast`'s scope chain and materializing its
/// `InterpretedLocal` slot on first use. Exposed for host languages whose
/// own compound evaluator (e.g. one implementing call semantics, which this
/// core does not model) still wants to resolve plain variable reads through
/// the same frame.
pub fn read_variable(ast: &Ast, id: NodeId, name: &str) -> Result<Value, RuntimeError> {
    let symbol = ast
        .scope(id)
        .and_then(|scope| scope.resolve(name))
        .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))?;
    match interpreted_slot(&symbol) {
        Slot::InterpretedLocal(s) => {
            lookup_local(&s.name).ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
        }
        _ => unreachable!("interp::evaluate only ever produces InterpretedLocal slots"),
    }
}

/// Store `value` into `name` (a `Variable` node, `target`), enforcing the
/// read-only-reassignment check. See [`read_variable`] for why this is
/// public.
pub fn write_variable(ast: &Ast, target: NodeId, name: &str, value: Value) -> Result<(), RuntimeError> {
    let symbol = ast
        .scope(target)
        .and_then(|scope| scope.resolve(name))
        .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))?;
    let is_reassignment = lookup_local(&symbol.name).is_some();
    if symbol.is_read_only && is_reassignment {
        return Err(RuntimeError::ReadOnlyVariable(name.to_string()));
    }
    if let Slot::InterpretedLocal(s) = interpreted_slot(&symbol) {
        store_local(&s.name, value);
    }
    Ok(())
}

/// Evaluate `id` against the innermost active call frame, recursing into
/// whatever children its kind demands.
pub fn evaluate(ast: &Ast, id: NodeId) -> Result<Value, RuntimeError> {
    tick()?;
    match ast.kind(id).clone() {
        NodeKind::Literal(value) => Ok(value),

        NodeKind::Variable(name) => read_variable(ast, id, &name),

        NodeKind::Assign => {
            let children = ast.children(id);
            let (target, value_node) = (children[0], children[1]);
            let value = evaluate(ast, value_node)?;
            if let NodeKind::Variable(name) = ast.kind(target).clone() {
                write_variable(ast, target, &name, value.clone())?;
            }
            Ok(value)
        }

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

        // A function's own body is evaluated by its caller (who pushes a
        // frame and binds parameters first, see `push_frame`/
        // `bind_parameter`), not by a bare walk over the `Function` node
        // itself; reaching one directly just yields no value. `Parameter`
        // nodes are declarative and likewise produce nothing when walked.
        NodeKind::Function(_) | NodeKind::Parameter(_) => Ok(Value::Null),
    }
}
