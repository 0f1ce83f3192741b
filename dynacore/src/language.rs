//! The `Language` plug-in surface (spec.md 6.3): what a concrete front end
//! hands the core in exchange for decoration, emission, and interpretation.
//! The core never names a concrete scanner, parser, or token type -- it only
//! asks for one that satisfies `IScanner`/`IParser` -- and never names a
//! concrete backend, only one that satisfies `InstructionBuilder`.

use crate::ast::{Ast, NodeId};
use crate::decoration::Pipeline;
use crate::emitter::instruction::InstructionBuilder;
use crate::emitter::Emitter;
use crate::error::CompileError;
use crate::state::{CompilerOptions, CompilerState};
use crate::types::TypeRef;
use std::sync::Arc;

/// Produces a token stream from source text. The core is agnostic to
/// whether a front end lexes by hand, with `nom`, or by fusing scanning into
/// parsing entirely (in which case this is a thin pass-through).
pub trait IScanner {
    type Token;

    fn scan(&mut self, source: &str) -> Result<Vec<Self::Token>, CompileError>;
}

/// Built from a `Scanner` (spec.md 6.3: `create_parser(scanner)`) and then
/// fed source text directly; produces an unchecked `Ast` rooted at the
/// returned `NodeId`. Semantic checking happens later, in `Decorate`.
pub trait IParser<S: IScanner> {
    fn parse(&mut self, source: &str, source_name: &str) -> Result<(Ast, NodeId), CompileError>;
}

/// Which decorator pipeline a `Language` should assemble: the one that
/// prepares a tree for `Emitter` output, or the one that prepares a tree for
/// `interp::evaluate` (spec.md 5, 6.3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecoratorType {
    Compiled,
    Interpreted,
}

/// A concrete surface language plugged into the core. `Builder` is the
/// front end's chosen `InstructionBuilder` backend; `Scanner`/`Parser` are
/// its chosen lexing/parsing technology.
pub trait Language {
    type Builder: InstructionBuilder;
    type Scanner: IScanner;
    type Parser: IParser<Self::Scanner>;

    fn name(&self) -> &str;

    /// A fresh top-level `CompilerState` for this language's default
    /// options.
    fn create_compiler_state(&self) -> Arc<CompilerState> {
        CompilerState::new(self.name().to_string(), CompilerOptions::default())
    }

    /// A child state that inherits `parent`'s options (spec.md 6.3: the
    /// `create_compiler_state(parent)` overload), e.g. for an `Options`
    /// node or a nested function evaluation.
    fn create_compiler_state_from(&self, parent: &CompilerState) -> Arc<CompilerState> {
        CompilerState::derive(parent)
    }

    fn create_scanner(&self) -> Self::Scanner;
    fn create_parser(&self, scanner: Self::Scanner) -> Self::Parser;

    /// Assemble this language's decorator pipeline for `kind`. A language
    /// always runs `CoreSemanticChecker` in the `Decorate` stage; it may add
    /// its own `PreDecorate`/`Optimize`/`Optimized` processors (e.g.
    /// constant folding) around it, and typically differs between
    /// `Compiled` and `Interpreted` only in which `Optimize`-stage
    /// processors it registers.
    fn create_decorator(&self, kind: DecoratorType) -> Pipeline;

    /// A fresh `Emitter` over `builder`, targeting `enclosing_type`.
    fn create_emitter(
        &self,
        builder: Self::Builder,
        enclosing_type: TypeRef,
        is_static: bool,
    ) -> Emitter<Self::Builder> {
        Emitter::new(builder, enclosing_type, is_static, false)
    }

    /// Run `create_decorator(kind)` over `root`, returning the (possibly
    /// replaced) root afterward -- spec.md 6.3's `Decorate(&mut node,
    /// DecoratorType)`.
    fn decorate(&self, ast: &mut Ast, root: NodeId, kind: DecoratorType) -> NodeId {
        let mut pipeline = self.create_decorator(kind);
        pipeline.run(ast, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::decoration::checker::CoreSemanticChecker;
    use crate::decoration::{Processor, Stage};
    use crate::diagnostics::FilePosition;
    use crate::emitter::instruction::{Const, Label};
    use crate::operator::Value;
    use crate::types;
    use std::rc::Rc;

    /// A trivial scanner/parser pair used only to exercise `Language`'s
    /// default method wiring -- not a real surface language.
    struct NullScanner;
    impl IScanner for NullScanner {
        type Token = ();
        fn scan(&mut self, _source: &str) -> Result<Vec<()>, CompileError> {
            Ok(Vec::new())
        }
    }

    struct NullParser;
    impl IParser<NullScanner> for NullParser {
        fn parse(&mut self, _source: &str, source_name: &str) -> Result<(Ast, NodeId), CompileError> {
            let mut ast = Ast::new();
            let lit = ast.alloc(
                NodeKind::Literal(Value::Int(0)),
                Rc::from(source_name),
                FilePosition::START,
                FilePosition::START,
            );
            ast.set_root(lit);
            Ok((ast, lit))
        }
    }

    /// Every op just appends a label to `ops`; good enough to exercise
    /// `Language`'s default wiring without standing up a real backend.
    #[derive(Default)]
    struct RecordingBuilder {
        ops: Vec<String>,
    }
    impl InstructionBuilder for RecordingBuilder {
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
        fn load_indirect(&mut self, code: types::TypeCode) {
            self.ops.push(format!("load_indirect {code:?}"));
        }
        fn store_indirect(&mut self, code: types::TypeCode) {
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
        fn new_object(&mut self, ctor: types::MethodInfo) {
            self.ops.push(format!("new_object {}", ctor.name));
        }
        fn call(&mut self, method: types::MethodInfo, kind: crate::emitter::instruction::CallKind) {
            self.ops.push(format!("call {} {kind:?}", method.name));
        }
        fn call_static(&mut self, method: types::MethodInfo) {
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
        fn arith(&mut self, op: crate::emitter::instruction::ArithOp, code: types::TypeCode, checked: bool) {
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
        fn convert(
            &mut self,
            from: types::TypeCode,
            to: types::TypeCode,
            mode: crate::emitter::instruction::ConvMode,
            source_unsigned: bool,
        ) {
            self.ops.push(format!("convert {from:?} {to:?} {mode:?} {source_unsigned}"));
        }
    }

    struct TinyLang;
    impl Language for TinyLang {
        type Builder = RecordingBuilder;
        type Scanner = NullScanner;
        type Parser = NullParser;

        fn name(&self) -> &str {
            "tiny"
        }

        fn create_scanner(&self) -> NullScanner {
            NullScanner
        }

        fn create_parser(&self, _scanner: NullScanner) -> NullParser {
            NullParser
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

    #[test]
    fn decorate_runs_core_semantic_checker() {
        let lang = TinyLang;
        let mut scanner = lang.create_scanner();
        let tokens = scanner.scan("").unwrap();
        assert!(tokens.is_empty());
        let mut parser = lang.create_parser(scanner);
        let (mut ast, root) = parser.parse("", "t.tiny").unwrap();
        ast.set_value_type(root, types::INT.clone());
        ast.set_scope(root, crate::ast::scope::LexicalScope::root());

        let decorated = lang.decorate(&mut ast, root, DecoratorType::Compiled);
        assert_eq!(decorated, root);
    }

    #[test]
    fn create_emitter_wires_a_fresh_emitter() {
        let lang = TinyLang;
        let builder = RecordingBuilder::default();
        let emitter = lang.create_emitter(builder, types::OBJECT.clone(), true);
        assert!(emitter.is_static());
    }
}
