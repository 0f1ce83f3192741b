//! `SchemeLanguage`, this front end's `dynacore::language::Language` plug-in
//! (spec.md 6.3). Its `Scanner`/`Parser` are `LispScanner`/`LispParser`; its
//! decorator pipeline is just the core's own `CoreSemanticChecker`, the same
//! way the teacher's own language wires a single standard checking pass.
//! `Builder` is `TraceBuilder`, a backend that records each emitted
//! instruction as a string rather than real bytecode -- this front end never
//! actually compiles (`dynalisp::interp` tree-walks instead), so the
//! `Builder` association only needs to type-check, not do anything useful;
//! grounded in the core's own `RecordingBuilder` test double
//! (`dynacore::language` tests).

use crate::parser::LispParser;
use crate::scanner::LispScanner;
use dynacore::binding::TopLevel;
use dynacore::decoration::checker::CoreSemanticChecker;
use dynacore::decoration::{Pipeline, Processor, Stage};
use dynacore::emitter::instruction::{ArithOp, CallKind, Const, ConvMode, InstructionBuilder, Label};
use dynacore::language::{DecoratorType, Language};
use dynacore::types::{self, MethodInfo, TypeCode, TypeRef};
use std::sync::Arc;

/// Records every instruction it's handed as a formatted string instead of
/// emitting real bytecode.
#[derive(Default)]
pub struct TraceBuilder {
    ops: Vec<String>,
}

impl TraceBuilder {
    pub fn ops(&self) -> &[String] {
        &self.ops
    }
}

impl InstructionBuilder for TraceBuilder {
    fn push_const(&mut self, value: Const) {
        self.ops.push(format!("push_const {value:?}"));
    }
    fn load_local(&mut self, index: u32) {
        self.ops.push(format!("load_local {index}"));
    }
    fn store_local(&mut self, index: u32) {
        self.ops.push(format!("store_local {index}"));
    }
    fn load_local_addr(&mut self, index: u32) {
        self.ops.push(format!("load_local_addr {index}"));
    }
    fn load_arg(&mut self, index: u32) {
        self.ops.push(format!("load_arg {index}"));
    }
    fn store_arg(&mut self, index: u32) {
        self.ops.push(format!("store_arg {index}"));
    }
    fn load_arg_addr(&mut self, index: u32) {
        self.ops.push(format!("load_arg_addr {index}"));
    }
    fn load_field(&mut self, field: String, is_static: bool) {
        self.ops.push(format!("load_field {field} {is_static}"));
    }
    fn store_field(&mut self, field: String, is_static: bool) {
        self.ops.push(format!("store_field {field} {is_static}"));
    }
    fn load_indirect(&mut self, code: TypeCode) {
        self.ops.push(format!("load_indirect {code:?}"));
    }
    fn store_indirect(&mut self, code: TypeCode) {
        self.ops.push(format!("store_indirect {code:?}"));
    }
    fn new_array(&mut self, element: TypeRef) {
        self.ops.push(format!("new_array {}", element.name()));
    }
    fn load_array_elem(&mut self, element: TypeRef) {
        self.ops.push(format!("load_array_elem {}", element.name()));
    }
    fn store_array_elem(&mut self, element: TypeRef) {
        self.ops.push(format!("store_array_elem {}", element.name()));
    }
    fn init_array_data(&mut self, element: TypeRef, bytes: Vec<u8>) {
        self.ops.push(format!("init_array_data {} ({} bytes)", element.name(), bytes.len()));
    }
    fn dup(&mut self) {
        self.ops.push("dup".into());
    }
    fn pop(&mut self) {
        self.ops.push("pop".into());
    }
    fn ret(&mut self) {
        self.ops.push("ret".into());
    }
    fn branch(&mut self, target: Label) {
        self.ops.push(format!("branch {target:?}"));
    }
    fn branch_if_false(&mut self, target: Label) {
        self.ops.push(format!("branch_if_false {target:?}"));
    }
    fn mark_label(&mut self, label: Label) {
        self.ops.push(format!("mark_label {label:?}"));
    }
    fn new_label(&mut self) -> Label {
        let label = Label(self.ops.len() as u32);
        self.ops.push(format!("new_label {label:?}"));
        label
    }
    fn new_object(&mut self, ctor: MethodInfo) {
        self.ops.push(format!("new_object {}", ctor.name));
    }
    fn call(&mut self, method: MethodInfo, kind: CallKind) {
        self.ops.push(format!("call {} {kind:?}", method.name));
    }
    fn call_static(&mut self, method: MethodInfo) {
        self.ops.push(format!("call_static {}", method.name));
    }
    fn call_runtime_convert(&mut self) {
        self.ops.push("call_runtime_convert".into());
    }
    fn call_runtime_evaluate(&mut self) {
        self.ops.push("call_runtime_evaluate".into());
    }
    fn push_cached_binding(&mut self, name: String) {
        self.ops.push(format!("push_cached_binding {name}"));
    }
    fn check_binding(&mut self) {
        self.ops.push("check_binding".into());
    }
    fn load_binding_value(&mut self) {
        self.ops.push("load_binding_value".into());
    }
    fn store_binding_value(&mut self) {
        self.ops.push("store_binding_value".into());
    }
    fn arith(&mut self, op: ArithOp, code: TypeCode, checked: bool) {
        self.ops.push(format!("arith {op:?} {code:?} {checked}"));
    }
    fn box_value(&mut self, value_type: TypeRef) {
        self.ops.push(format!("box {}", value_type.name()));
    }
    fn unbox(&mut self, value_type: TypeRef) {
        self.ops.push(format!("unbox {}", value_type.name()));
    }
    fn castclass(&mut self, target: TypeRef) {
        self.ops.push(format!("castclass {}", target.name()));
    }
    fn initobj(&mut self, value_type: TypeRef) {
        self.ops.push(format!("initobj {}", value_type.name()));
    }
    fn ldtoken(&mut self, ty: TypeRef) {
        self.ops.push(format!("ldtoken {}", ty.name()));
    }
    fn attach_custom_attribute(&mut self, name: String) {
        self.ops.push(format!("attach_custom_attribute {name}"));
    }
    fn begin_try(&mut self) {
        self.ops.push("begin_try".into());
    }
    fn begin_catch(&mut self, exception_type: TypeRef) {
        self.ops.push(format!("begin_catch {}", exception_type.name()));
    }
    fn begin_finally(&mut self) {
        self.ops.push("begin_finally".into());
    }
    fn leave(&mut self, target: Label) {
        self.ops.push(format!("leave {target:?}"));
    }
    fn end_exception_region(&mut self) {
        self.ops.push("end_exception_region".into());
    }
    fn convert(&mut self, from: TypeCode, to: TypeCode, mode: ConvMode, source_unsigned: bool) {
        self.ops.push(format!("convert {from:?} {to:?} {mode:?} {source_unsigned}"));
    }
}

/// The demo Scheme-like language, parameterized over the `TopLevel`
/// namespace its `lambda`s capture into their `FunctionTemplate`.
pub struct SchemeLanguage<'a> {
    top_level: &'a Arc<TopLevel>,
}

impl<'a> SchemeLanguage<'a> {
    pub fn new(top_level: &'a Arc<TopLevel>) -> Self {
        SchemeLanguage { top_level }
    }
}

impl<'a> Language for SchemeLanguage<'a> {
    type Builder = TraceBuilder;
    type Scanner = LispScanner;
    type Parser = LispParser<'a>;

    fn name(&self) -> &str {
        "scheme"
    }

    fn create_scanner(&self) -> LispScanner {
        LispScanner::default()
    }

    fn create_parser(&self, scanner: LispScanner) -> LispParser<'a> {
        LispParser::new(scanner, self.top_level)
    }

    fn create_decorator(&self, _kind: DecoratorType) -> Pipeline {
        let mut pipeline = Pipeline::new();
        pipeline.add(
            Stage::Decorate,
            Processor::Visitor(Box::new(CoreSemanticChecker::new(true, types::ANY.clone()))),
        );
        pipeline
    }
}
