//! The abstract stack machine (spec.md 6.1). `InstructionBuilder` is the
//! seam between the emitter and whatever backend a host actually targets
//! (bytecode interpreter, SSA IR, or a cranelift/LLVM-style codegen) --
//! Design Notes 9 calls this out explicitly as an interface boundary the
//! core must not collapse.

use crate::types::{MethodInfo, TypeCode, TypeRef};

/// Overflow-check mode for arithmetic and conversion opcodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConvMode {
    Checked,
    Unchecked,
}

/// The four call forms named in spec.md 6.1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallKind {
    Direct,
    Virtual,
    Constrained,
    Indirect,
}

/// The arithmetic/bitwise opcode family operator dispatch (spec.md 4.4)
/// chooses between. Floating-point `Modulus` and any `Bitwise*` applied to a
/// float operand are rejected at type-check time and never reach a backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
}

/// A branch target. The backend is responsible for resolving labels; the
/// core only ever refers to them symbolically.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

/// A compile-time constant, for the push-const opcode family.
#[derive(Clone, Debug, PartialEq)]
pub enum Const {
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Null,
    Type(TypeRef),
}

/// One operation family per line of spec.md 6.1. A faithful backend maps
/// each of these to its own instruction encoding; the core only ever calls
/// through this trait, never emits raw bytes itself.
pub trait InstructionBuilder {
    fn push_const(&mut self, value: Const);

    fn load_local(&mut self, index: u32);
    fn store_local(&mut self, index: u32);
    fn load_local_addr(&mut self, index: u32);

    fn load_arg(&mut self, index: u32);
    fn store_arg(&mut self, index: u32);
    fn load_arg_addr(&mut self, index: u32);

    fn load_field(&mut self, field: String, is_static: bool);
    fn store_field(&mut self, field: String, is_static: bool);

    fn load_indirect(&mut self, code: TypeCode);
    fn store_indirect(&mut self, code: TypeCode);

    fn new_array(&mut self, element: TypeRef);
    fn load_array_elem(&mut self, element: TypeRef);
    fn store_array_elem(&mut self, element: TypeRef);
    /// Packs a constant primitive array into an `InitializedData` blob,
    /// referenced via `RuntimeHelpers.InitializeArray` (spec.md 4.5).
    fn init_array_data(&mut self, element: TypeRef, bytes: Vec<u8>);

    fn dup(&mut self);
    fn pop(&mut self);
    fn ret(&mut self);

    fn branch(&mut self, target: Label);
    fn branch_if_false(&mut self, target: Label);
    fn mark_label(&mut self, label: Label);
    fn new_label(&mut self) -> Label;

    fn new_object(&mut self, ctor: MethodInfo);
    fn call(&mut self, method: MethodInfo, kind: CallKind);
    fn call_static(&mut self, method: MethodInfo);
    /// The generic `Ops.convert_to(value, Type)` runtime fallback used when
    /// static reasoning is insufficient (spec.md 4.1).
    fn call_runtime_convert(&mut self);
    /// The generic operator runtime fallback, `Operator.Evaluate(a, b, opts)`
    /// (spec.md 4.4).
    fn call_runtime_evaluate(&mut self);

    /// Push a cached reference to the named top-level [`Binding`]
    /// (spec.md 4.5, "Top-level slot semantics").
    ///
    /// [`Binding`]: crate::binding::Binding
    fn push_cached_binding(&mut self, name: String);
    /// Assert (in debug/non-optimized builds) that the binding on top of the
    /// stack is bound, raising `UndefinedVariable` otherwise.
    fn check_binding(&mut self);
    /// Read `Binding.Value` from the binding reference on top of the stack.
    fn load_binding_value(&mut self);
    /// Write the value beneath the binding reference on top of the stack
    /// into `Binding.Value`.
    fn store_binding_value(&mut self);

    /// Apply `op` to the two `code`-typed values on top of the stack
    /// (spec.md 4.4 "Opcode choice"): `checked` selects the `*_Ovf`/`*_Ovf_Un`
    /// forms for Add/Sub/Mul; `code.is_unsigned()` selects the signed vs.
    /// unsigned Div/Mod opcode.
    fn arith(&mut self, op: ArithOp, code: TypeCode, checked: bool);

    fn box_value(&mut self, value_type: TypeRef);
    fn unbox(&mut self, value_type: TypeRef);
    fn castclass(&mut self, target: TypeRef);
    fn initobj(&mut self, value_type: TypeRef);
    fn ldtoken(&mut self, ty: TypeRef);
    fn attach_custom_attribute(&mut self, name: String);

    fn begin_try(&mut self);
    fn begin_catch(&mut self, exception_type: TypeRef);
    fn begin_finally(&mut self);
    fn leave(&mut self, target: Label);
    fn end_exception_region(&mut self);

    /// The full `Conv_*` matrix: `checked`/unchecked, signed/`_Un` source.
    fn convert(&mut self, from: TypeCode, to: TypeCode, mode: ConvMode, source_unsigned: bool);
}
