//! Concrete end-to-end scenarios (spec.md 8, S1-S6), via hand-constructed
//! decorated ASTs rather than a production parser -- each test builds the
//! tree a real front end would hand the core after lowering (value types and
//! scopes already attached), runs it through `check_semantics`/
//! `check_semantics2` and/or `interp::evaluate`, and checks the documented
//! outcome.

mod support;

use dynacore::ast::scope::LexicalScope;
use dynacore::ast::{Ast, NodeFlags, NodeKind};
use dynacore::binding::{FunctionTemplate, TopLevel};
use dynacore::conversion::common_base_type;
use dynacore::emitter::slot::{ClosureCellSlot, Slot};
use dynacore::interp;
use dynacore::operator::{Value, ADD};
use dynacore::state::{CompilerOptions, CompilerState};
use dynacore::state;
use dynacore::types;
use support::*;

#[test]
fn s1_add_of_two_ints_is_a_constant_int() {
    let mut ast = Ast::new();
    let a = lit(&mut ast, Value::Int(1));
    let b = lit(&mut ast, Value::Int(2));
    ast.set_value_type(a, types::INT.clone());
    ast.set_value_type(b, types::INT.clone());
    let add = op(&mut ast, ADD.clone(), &[a, b]);
    ast.set_value_type(add, common_base_type(Some(&types::INT), Some(&types::INT)));

    ast.check_semantics2(a, false);
    ast.check_semantics2(b, false);
    let messages = ast.check_semantics2(add, false);
    assert!(messages.is_empty());
    assert!(ast.flags(add).contains(NodeFlags::CONSTANT));
    assert_eq!(ast.value_type(add), Some(types::INT.clone()));

    let _frame = interp::push_frame();
    let v = interp::evaluate(&ast, add).unwrap();
    assert!(matches!(v, Value::Int(3)));
}

#[test]
fn s2_add_of_int_and_double_promotes_to_double() {
    let mut ast = Ast::new();
    let a = lit(&mut ast, Value::Int(1));
    let b = lit(&mut ast, Value::Double(2.5));
    ast.set_value_type(a, types::INT.clone());
    ast.set_value_type(b, types::DOUBLE.clone());
    let add = op(&mut ast, ADD.clone(), &[a, b]);
    ast.set_value_type(add, common_base_type(Some(&types::INT), Some(&types::DOUBLE)));
    assert_eq!(ast.value_type(add), Some(types::DOUBLE.clone()));

    let _frame = interp::push_frame();
    let v = interp::evaluate(&ast, add).unwrap();
    assert!(matches!(v, Value::Double(n) if n == 3.5));
}

#[test]
fn s3_let_bound_local_is_mutated_through_set_and_reads_back() {
    // (let ((a 1)) (set! a 2) a)
    let _guard = state::push(CompilerState::new("scheme", CompilerOptions::default()));
    let mut ast = Ast::new();

    let scope = LexicalScope::root();
    declare(&scope, "a", types::INT.clone(), false);

    let init_target = var(&mut ast, "a");
    let init_value = lit(&mut ast, Value::Int(1));
    ast.set_value_type(init_value, types::INT.clone());
    let init_assign = assign(&mut ast, init_target, init_value);

    let set_target = var(&mut ast, "a");
    let set_value = lit(&mut ast, Value::Int(2));
    ast.set_value_type(set_value, types::INT.clone());
    let set_assign = assign(&mut ast, set_target, set_value);

    let read = var(&mut ast, "a");
    let prog = block(&mut ast, &[init_assign, set_assign, read]);
    ast.set_scope(prog, scope);

    let _frame = interp::push_frame();
    let initializing = interp::evaluate(&ast, init_assign).unwrap();
    assert!(matches!(initializing, Value::Int(1)));
    let reassigned = interp::evaluate(&ast, set_assign).unwrap();
    assert!(matches!(reassigned, Value::Int(2)));
    let read_back = interp::evaluate(&ast, read).unwrap();
    assert!(matches!(read_back, Value::Int(2)));

    // The interpreted binding for `a` materializes as an `InterpretedLocal`
    // slot -- the interpreted-mode counterpart of a compiled `Local` slot.
    let symbol = ast.scope(read).unwrap().resolve("a").unwrap();
    assert!(symbol.slot.borrow().is_some());
    assert!(matches!(*symbol.slot.borrow(), Some(Slot::InterpretedLocal(_))));
}

#[test]
fn s4_lambda_of_one_required_parameter_applies_to_four() {
    // (lambda (x) (+ x 1)) applied to 3 -> 4
    let template = FunctionTemplate::new(
        "anon",
        vec!["x".to_string()],
        vec![types::INT.clone()],
        1,
        0,
        false,
        false,
        TopLevel::new(),
    )
    .unwrap();
    assert_eq!(template.required, 1);
    assert_eq!(template.optional, 0);
    assert!(!template.has_list_param);

    let args = template
        .make_arguments(vec![Value::Int(3)], &[], |_| unreachable!(), || unreachable!(), Value::Null)
        .unwrap();
    assert_eq!(args.len(), 1);

    let mut ast = Ast::new();
    let scope = LexicalScope::root();
    declare(&scope, "x", types::INT.clone(), false);
    let x_ref = var(&mut ast, "x");
    let one = lit(&mut ast, Value::Int(1));
    ast.set_value_type(one, types::INT.clone());
    let body = op(&mut ast, ADD.clone(), &[x_ref, one]);
    ast.set_scope(body, scope);

    let _frame = interp::push_frame();
    interp::bind_parameter("x", args[0].clone());
    let result = interp::evaluate(&ast, body).unwrap();
    assert!(matches!(result, Value::Int(4)));
}

#[test]
fn s5_nested_function_reads_an_outer_variable_through_a_depth_one_closure_cell() {
    // A nested function closing over `count` sees it as a `ClosureCell` one
    // `$parent` hop up from its own closure instance, named after the
    // variable it captures.
    let slot = Slot::ClosureCell(ClosureCellSlot {
        depth: 1,
        field_name: "count".to_string(),
        ty: types::INT.clone(),
    });
    assert_eq!(slot.type_of(), types::INT.clone());
    match slot {
        Slot::ClosureCell(cell) => {
            assert_eq!(cell.depth, 1);
            assert_eq!(cell.field_name, "count");
        }
        _ => panic!("expected a ClosureCell slot"),
    }
}

#[test]
fn s6_option_node_forces_unchecked_evaluation_to_wrap() {
    // (.option ((checked #f)) (+ 2147483647 1)) -> -2147483648
    let _guard = state::push(CompilerState::new(
        "scheme",
        CompilerOptions { checked: true, promote_on_overflow: true, ..CompilerOptions::default() },
    ));
    let mut ast = Ast::new();
    let a = lit(&mut ast, Value::Int(i32::MAX));
    let b = lit(&mut ast, Value::Int(1));
    let add = op(&mut ast, ADD.clone(), &[a, b]);
    let overrides = dynacore::ast::OptionsOverrides {
        checked: Some(false),
        ..Default::default()
    };
    let options_node = ast.alloc(
        NodeKind::Options(overrides),
        std::rc::Rc::from("t.scm"),
        pos(),
        pos(),
    );
    ast.append_child(options_node, add).unwrap();

    let _frame = interp::push_frame();
    let v = interp::evaluate(&ast, options_node).unwrap();
    assert!(matches!(v, Value::Int(n) if n == i32::MIN));

    // Without the override, the outer checked+promote policy widens instead.
    let mut ast2 = Ast::new();
    let a2 = lit(&mut ast2, Value::Int(i32::MAX));
    let b2 = lit(&mut ast2, Value::Int(1));
    let add2 = op(&mut ast2, ADD.clone(), &[a2, b2]);
    let v2 = interp::evaluate(&ast2, add2).unwrap();
    assert!(matches!(v2, Value::Long(n) if n == i32::MAX as i64 + 1));

    // Outer checked, without promote: the same expression throws instead.
    let _guard2 = state::push(CompilerState::new(
        "scheme",
        CompilerOptions { checked: true, promote_on_overflow: false, ..CompilerOptions::default() },
    ));
    let mut ast3 = Ast::new();
    let a3 = lit(&mut ast3, Value::Int(i32::MAX));
    let b3 = lit(&mut ast3, Value::Int(1));
    let add3 = op(&mut ast3, ADD.clone(), &[a3, b3]);
    let err = interp::evaluate(&ast3, add3).unwrap_err();
    assert!(matches!(err, dynacore::error::RuntimeError::Overflow));
}
