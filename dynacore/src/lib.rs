//! Core implementation of a language-agnostic compiler/interpreter
//! platform. A concrete surface language plugs in by implementing
//! [`language::Language`] and its `IScanner`/`IParser`/`InstructionBuilder`
//! seams; this crate supplies everything else: the type lattice and
//! conversion engine, the arena-backed `Ast` and its decoration pipeline,
//! operator dispatch, the stack-machine emitter, and a tree-walking
//! interpreter, all driven by a shared [`state::CompilerState`].
//!
//! ```
//! use dynacore::ast::{Ast, NodeKind};
//! use dynacore::ast::scope::LexicalScope;
//! use dynacore::diagnostics::FilePosition;
//! use dynacore::operator::Value;
//! use dynacore::state::{CompilerOptions, CompilerState};
//! use dynacore::{interp, state, types};
//! use std::rc::Rc;
//!
//! let _guard = state::push(CompilerState::new("demo", CompilerOptions::default()));
//!
//! let mut ast = Ast::new();
//! let pos = FilePosition::START;
//! let a = ast.alloc(NodeKind::Literal(Value::Int(2)), Rc::from("demo"), pos, pos);
//! let b = ast.alloc(NodeKind::Literal(Value::Int(3)), Rc::from("demo"), pos, pos);
//! let op = ast.alloc(NodeKind::Op(dynacore::operator::ADD.clone()), Rc::from("demo"), pos, pos);
//! ast.append_child(op, a).unwrap();
//! ast.append_child(op, b).unwrap();
//! ast.set_root(op);
//! ast.set_scope(op, LexicalScope::root());
//! ast.mark_tail(op, true);
//! ast.set_value_context(op, types::INT.clone());
//!
//! let _frame = interp::push_frame();
//! let result = interp::evaluate(&ast, op).unwrap();
//! assert!(matches!(result, Value::Int(5)));
//! ```

pub mod ast;
pub mod binding;
pub mod conversion;
pub mod decoration;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod interp;
pub mod language;
pub mod operator;
pub mod state;
pub mod types;
