//! Operator dispatch (spec.md 4.4, capability C4): operator singletons,
//! static overload resolution, emission of the binary fold, opcode choice,
//! and the `Evaluate(a, b, options)` runtime fallback used both by emitted
//! code that couldn't resolve statically and by [`crate::interp`].

use crate::conversion;
use crate::emitter::instruction::{ArithOp, Const, InstructionBuilder};
use crate::emitter::Emitter;
use crate::error::{CompileError, RuntimeError};
use crate::types::{self, MethodInfo, TypeCode, TypeRef};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// A value, reference-counted-name operator (spec.md 4.4: "Operators are
/// values ... singletons ... plus user-defined extensions"). Identity, not
/// structural content, is what the runtime fallback path pushes and compares
/// against -- two `Operator`s with the same name are still distinct unless
/// they're the literal same `Arc`.
#[derive(Debug)]
pub struct Operator {
    pub name: String,
    pub arity: u8,
    /// `op_Addition`-style overload method name searched for on operand
    /// types. `None` for operators (like `LogicalTruth`) with no overload
    /// protocol.
    pub op_overload_name: Option<String>,
    arith: Option<ArithOp>,
}

pub type OperatorRef = Arc<Operator>;

fn binary(name: &str, overload: &str, arith: ArithOp) -> OperatorRef {
    Arc::new(Operator {
        name: name.to_string(),
        arity: 2,
        op_overload_name: Some(overload.to_string()),
        arith: Some(arith),
    })
}

macro_rules! operator_singleton {
    ($static_name:ident, $name:expr, $overload:expr, $arith:expr) => {
        pub static $static_name: Lazy<OperatorRef> = Lazy::new(|| binary($name, $overload, $arith));
    };
}

operator_singleton!(ADD, "Add", "op_Addition", ArithOp::Add);
operator_singleton!(SUBTRACT, "Subtract", "op_Subtraction", ArithOp::Subtract);
operator_singleton!(MULTIPLY, "Multiply", "op_Multiply", ArithOp::Multiply);
operator_singleton!(DIVIDE, "Divide", "op_Division", ArithOp::Divide);
operator_singleton!(MODULUS, "Modulus", "op_Modulus", ArithOp::Modulus);
operator_singleton!(BITWISE_AND, "BitwiseAnd", "op_BitwiseAnd", ArithOp::BitwiseAnd);
operator_singleton!(BITWISE_OR, "BitwiseOr", "op_BitwiseOr", ArithOp::BitwiseOr);
operator_singleton!(BITWISE_XOR, "BitwiseXor", "op_BitwiseXor", ArithOp::BitwiseXor);

pub static LOGICAL_TRUTH: Lazy<OperatorRef> = Lazy::new(|| {
    Arc::new(Operator {
        name: "LogicalTruth".to_string(),
        arity: 1,
        op_overload_name: None,
        arith: None,
    })
});

/// First primitive numeric in promotion-preference order that `ty` has an
/// implicit conversion to, used for the "implicit-to-primitive" fallback
/// step in both `get_value_type` and the emission fold.
fn numeric_fallback(ty: &TypeRef) -> Option<TypeRef> {
    if ty.code().is_primitive_numeric() {
        return Some(ty.clone());
    }
    const CANDIDATES: [TypeCode; 9] = [
        TypeCode::Int,
        TypeCode::Long,
        TypeCode::UInt,
        TypeCode::ULong,
        TypeCode::Single,
        TypeCode::Double,
        TypeCode::Decimal,
        TypeCode::BigInt,
        TypeCode::Byte,
    ];
    CANDIDATES.iter().find_map(|&code| {
        let candidate = types::primitive_by_code(code)?;
        if conversion::has_implicit_conversion(ty, &candidate) {
            Some(candidate)
        } else {
            None
        }
    })
}

/// Static overload resolution (spec.md 4.4): collect public static methods
/// named `name` from both operand types (union, no duplicate signatures),
/// try an exact-parameter-type match first, then an implicit-convertible
/// match. `Ok(None)` means "no overload, fall through"; `Err` means
/// ambiguous.
fn resolve_overload(
    name: &str,
    lhs: &TypeRef,
    rhs: &TypeRef,
) -> Result<Option<MethodInfo>, CompileError> {
    let mut candidates: Vec<MethodInfo> = Vec::new();
    for m in lhs.methods_named(name).into_iter().chain(rhs.methods_named(name)) {
        if m.is_static
            && m.param_types.len() == 2
            && !candidates
                .iter()
                .any(|c| c.param_types[0] == m.param_types[0] && c.param_types[1] == m.param_types[1])
        {
            candidates.push(m);
        }
    }

    let exact: Vec<&MethodInfo> = candidates
        .iter()
        .filter(|m| m.param_types[0] == *lhs && m.param_types[1] == *rhs)
        .collect();
    if exact.len() > 1 {
        log::warn!("ambiguous exact-match overload for `{name}` between `{lhs:?}` and `{rhs:?}`");
        return Err(CompileError::AmbiguousOverload);
    }
    if let Some(m) = exact.into_iter().next() {
        return Ok(Some(m.clone()));
    }

    let implicit: Vec<&MethodInfo> = candidates
        .iter()
        .filter(|m| {
            conversion::has_implicit_conversion(lhs, &m.param_types[0])
                && conversion::has_implicit_conversion(rhs, &m.param_types[1])
        })
        .collect();
    if implicit.len() > 1 {
        log::warn!("ambiguous implicit-conversion overload for `{name}` between `{lhs:?}` and `{rhs:?}`");
        return Err(CompileError::AmbiguousOverload);
    }
    Ok(implicit.into_iter().next().cloned())
}

/// `get_value_type` (spec.md 4.4): folds the operand types of an n-ary `Op`
/// node pairwise. `checked`/`promote_on_overflow` apply the overflow
/// downgrade to `Unknown` once, to the final folded type.
pub fn get_value_type(
    op: &Operator,
    children: &[TypeRef],
    checked: bool,
    promote_on_overflow: bool,
) -> TypeRef {
    if children.is_empty() {
        return types::VOID.clone();
    }
    let mut acc = children[0].clone();
    for next in &children[1..] {
        acc = get_value_type_pair(op, &acc, next);
    }
    if let Some(unknown) = conversion::overflow_downgrade(checked, promote_on_overflow, &acc) {
        return unknown;
    }
    acc
}

fn get_value_type_pair(op: &Operator, a: &TypeRef, b: &TypeRef) -> TypeRef {
    if *a == *types::UNKNOWN || *b == *types::UNKNOWN {
        return types::UNKNOWN.clone();
    }
    if a.code().is_primitive_numeric() && b.code().is_primitive_numeric() {
        let code = conversion::promote_for_binary_op(a.code(), b.code());
        return types::primitive_by_code(code).unwrap_or_else(|| types::INVALID.clone());
    }
    if let Some(overload_name) = &op.op_overload_name {
        match resolve_overload(overload_name, a, b) {
            Ok(Some(m)) => return m.return_type,
            Ok(None) => {}
            Err(_) => return types::INVALID.clone(),
        }
    }
    if let (Some(pa), Some(pb)) = (numeric_fallback(a), numeric_fallback(b)) {
        let code = conversion::promote_for_binary_op(pa.code(), pb.code());
        return types::primitive_by_code(code).unwrap_or_else(|| types::INVALID.clone());
    }
    types::INVALID.clone()
}

fn options_bitmask(checked: bool, promote_on_overflow: bool) -> i32 {
    (checked as i32) | ((promote_on_overflow as i32) << 1)
}

/// One step of the binary fold (spec.md 4.4 "Emission"): `lhs_type`'s value
/// must already be on top of the stack; `emit_rhs` pushes the next operand.
/// Returns the accumulated type after applying `op`, matching whatever
/// `get_value_type_pair` would have predicted for the same inputs.
pub fn emit_binary_step<B: InstructionBuilder>(
    emitter: &mut Emitter<B>,
    op: &Operator,
    checked: bool,
    promote_on_overflow: bool,
    auto_promote: bool,
    lhs_type: &TypeRef,
    rhs_type: &TypeRef,
    emit_rhs: impl FnOnce(&mut Emitter<B>),
) -> Result<TypeRef, CompileError> {
    let lhs_numeric = numeric_fallback(lhs_type);
    let rhs_numeric = numeric_fallback(rhs_type);

    if (!auto_promote || (lhs_type.code().is_primitive_numeric() && rhs_type.code().is_primitive_numeric()))
        && lhs_numeric.is_some()
        && rhs_numeric.is_some()
    {
        let lhs_num = lhs_numeric.unwrap();
        let rhs_num = rhs_numeric.unwrap();
        let code = conversion::promote_for_binary_op(lhs_num.code(), rhs_num.code());
        let target = types::primitive_by_code(code).ok_or(CompileError::CannotApplyOperator)?;

        conversion::emit_safe_conversion(emitter.builder_mut(), lhs_type, &target, checked)
            .map_err(|_| CompileError::CannotConvertType { from: lhs_type.clone(), to: target.clone() })?;
        emit_rhs(emitter);
        conversion::emit_safe_conversion(emitter.builder_mut(), rhs_type, &target, checked)
            .map_err(|_| CompileError::CannotConvertType { from: rhs_type.clone(), to: target.clone() })?;

        match (op.arith, target.code()) {
            (Some(ArithOp::Modulus), TypeCode::Single) | (Some(ArithOp::Modulus), TypeCode::Double) => {
                emitter.builder_mut().call_static(MethodInfo {
                    name: "Ops.fmod".to_string(),
                    is_static: true,
                    param_types: vec![target.clone(), target.clone()],
                    return_type: target.clone(),
                });
            }
            (Some(arith_op), code) => {
                emitter.builder_mut().arith(arith_op, code, checked);
            }
            (None, _) => return Err(CompileError::CannotApplyOperator),
        }
        return Ok(target);
    }

    if let Some(overload_name) = &op.op_overload_name {
        match resolve_overload(overload_name, lhs_type, rhs_type)? {
            Some(method) => {
                let param0 = method.param_types[0].clone();
                let param1 = method.param_types[1].clone();
                conversion::emit_safe_conversion(emitter.builder_mut(), lhs_type, &param0, checked)
                    .map_err(|_| CompileError::CannotConvertType { from: lhs_type.clone(), to: param0.clone() })?;
                emit_rhs(emitter);
                conversion::emit_safe_conversion(emitter.builder_mut(), rhs_type, &param1, checked)
                    .map_err(|_| CompileError::CannotConvertType { from: rhs_type.clone(), to: param1 })?;
                let return_type = method.return_type.clone();
                emitter.builder_mut().call_static(method);
                return Ok(return_type);
            }
            None => {}
        }
    }

    Ok(emit_runtime_fallback(
        emitter,
        op,
        checked,
        promote_on_overflow,
        lhs_type,
        rhs_type,
        emit_rhs,
    ))
}

fn emit_runtime_fallback<B: InstructionBuilder>(
    emitter: &mut Emitter<B>,
    op: &Operator,
    checked: bool,
    promote_on_overflow: bool,
    lhs_type: &TypeRef,
    rhs_type: &TypeRef,
    emit_rhs: impl FnOnce(&mut Emitter<B>),
) -> TypeRef {
    let _ = conversion::emit_safe_conversion(emitter.builder_mut(), lhs_type, &types::OBJECT, checked);
    let temp = emitter.alloc_local_temp(types::OBJECT.clone(), false);
    match &temp {
        crate::emitter::slot::Slot::Local(s) => emitter.builder_mut().store_local(s.index),
        crate::emitter::slot::Slot::Field(s) => {
            emitter.builder_mut().store_field(s.name.clone(), s.is_static)
        }
        _ => unreachable!("alloc_local_temp only returns Local or Field"),
    }

    // "push the operator singleton (this)": the backend identifies which
    // runtime Operator instance to evaluate against by name.
    emitter.builder_mut().push_const(Const::Str(op.name.clone()));
    temp.emit_get(emitter.builder_mut());
    emit_rhs(emitter);
    let _ = conversion::emit_safe_conversion(emitter.builder_mut(), rhs_type, &types::OBJECT, checked);
    emitter
        .builder_mut()
        .push_const(Const::I32(options_bitmask(checked, promote_on_overflow)));
    emitter.builder_mut().call_runtime_evaluate();

    emitter.free_local_temp(temp);
    types::UNKNOWN.clone()
}

/// `LogicalTruth` emission fast path (spec.md 4.4): if the operand's static
/// type is already `Bool`, use it directly; otherwise call the runtime
/// helper and unbox if the caller wants a primitive `Bool` back.
pub fn emit_logical_truth<B: InstructionBuilder>(
    emitter: &mut Emitter<B>,
    operand_type: &TypeRef,
    desired: &TypeRef,
    emit_operand: impl FnOnce(&mut Emitter<B>),
) {
    emit_operand(emitter);
    if *operand_type == *types::BOOL {
        return;
    }
    let _ = conversion::emit_safe_conversion(emitter.builder_mut(), operand_type, &types::OBJECT, false);
    emitter.builder_mut().call_static(MethodInfo {
        name: "LogicalTruth.Evaluate".to_string(),
        is_static: true,
        param_types: vec![types::OBJECT.clone()],
        return_type: types::OBJECT.clone(),
    });
    if *desired == *types::BOOL {
        emitter.builder_mut().unbox(types::BOOL.clone());
    }
}

/// A dynamically-typed runtime value, for [`evaluate_runtime`] and
/// [`crate::interp`]. `BigInt` is approximated with `i128`; a host targeting
/// values outside that range would plug in a real arbitrary-precision type
/// at this seam.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    SByte(i8),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Char(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Single(f32),
    Double(f64),
    BigInt(i128),
    Str(Arc<String>),
    Null,
    Object(Arc<dyn std::any::Any + Send + Sync>),
}

impl Value {
    pub fn type_code(&self) -> TypeCode {
        match self {
            Value::Bool(_) => TypeCode::Bool,
            Value::SByte(_) => TypeCode::SByte,
            Value::Byte(_) => TypeCode::Byte,
            Value::Short(_) => TypeCode::Short,
            Value::UShort(_) => TypeCode::UShort,
            Value::Char(_) => TypeCode::Char,
            Value::Int(_) => TypeCode::Int,
            Value::UInt(_) => TypeCode::UInt,
            Value::Long(_) => TypeCode::Long,
            Value::ULong(_) => TypeCode::ULong,
            Value::Single(_) => TypeCode::Single,
            Value::Double(_) => TypeCode::Double,
            Value::BigInt(_) => TypeCode::BigInt,
            Value::Str(_) => TypeCode::String,
            Value::Null | Value::Object(_) => TypeCode::Object,
        }
    }

    /// Truthiness for [`LOGICAL_TRUTH`]: `null` and `false` are false, all
    /// else is true (spec.md 4.4).
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Value::SByte(v) => *v as i128,
            Value::Byte(v) => *v as i128,
            Value::Short(v) => *v as i128,
            Value::UShort(v) => *v as i128,
            Value::Char(v) => *v as i128,
            Value::Int(v) => *v as i128,
            Value::UInt(v) => *v as i128,
            Value::Long(v) => *v as i128,
            Value::ULong(v) => *v as i128,
            Value::BigInt(v) => *v,
            _ => return None,
        })
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Single(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    fn from_code(code: TypeCode, v: i128) -> Value {
        match code {
            TypeCode::SByte => Value::SByte(v as i8),
            TypeCode::Byte => Value::Byte(v as u8),
            TypeCode::Short => Value::Short(v as i16),
            TypeCode::UShort => Value::UShort(v as u16),
            TypeCode::Char => Value::Char(v as u16),
            TypeCode::Int => Value::Int(v as i32),
            TypeCode::UInt => Value::UInt(v as u32),
            TypeCode::Long => Value::Long(v as i64),
            TypeCode::ULong => Value::ULong(v as u64),
            _ => Value::BigInt(v),
        }
    }
}

/// Widen `code` one step up the promote-on-overflow retry ladder (spec.md
/// 4.4: int->long->BigInt, uint->ulong->BigInt). `None` once `BigInt` (or a
/// float) is reached -- nothing wider to retry with.
fn widen_once(code: TypeCode) -> Option<TypeCode> {
    match code {
        TypeCode::SByte | TypeCode::Short | TypeCode::Int => Some(TypeCode::Long),
        TypeCode::Long => Some(TypeCode::BigInt),
        TypeCode::Byte | TypeCode::UShort | TypeCode::Char | TypeCode::UInt => Some(TypeCode::ULong),
        TypeCode::ULong => Some(TypeCode::BigInt),
        _ => None,
    }
}

/// Raw `i128` arithmetic with no range check (division/modulus by zero still
/// errors). Used for the unchecked path, where an out-of-range result is
/// truncated back to the target width by [`Value::from_code`]'s `as` casts
/// rather than rejected.
fn raw_integer_op(op: &Operator, a: i128, b: i128) -> Result<i128, RuntimeError> {
    Ok(match op.arith {
        Some(ArithOp::Add) => a.wrapping_add(b),
        Some(ArithOp::Subtract) => a.wrapping_sub(b),
        Some(ArithOp::Multiply) => a.wrapping_mul(b),
        Some(ArithOp::Divide) => {
            if b == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            a.wrapping_div(b)
        }
        Some(ArithOp::Modulus) => {
            if b == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            a.wrapping_rem(b)
        }
        Some(ArithOp::BitwiseAnd) => a & b,
        Some(ArithOp::BitwiseOr) => a | b,
        Some(ArithOp::BitwiseXor) => a ^ b,
        None => return Err(RuntimeError::CantApplyOperator),
    })
}

fn checked_integer_op(op: &Operator, code: TypeCode, a: i128, b: i128) -> Result<i128, RuntimeError> {
    let (min, max): (i128, i128) = match code {
        TypeCode::SByte => (i8::MIN as i128, i8::MAX as i128),
        TypeCode::Byte => (u8::MIN as i128, u8::MAX as i128),
        TypeCode::Short => (i16::MIN as i128, i16::MAX as i128),
        TypeCode::UShort | TypeCode::Char => (u16::MIN as i128, u16::MAX as i128),
        TypeCode::Int => (i32::MIN as i128, i32::MAX as i128),
        TypeCode::UInt => (u32::MIN as i128, u32::MAX as i128),
        TypeCode::Long => (i64::MIN as i128, i64::MAX as i128),
        TypeCode::ULong => (u64::MIN as i128, u64::MAX as i128),
        _ => (i128::MIN, i128::MAX),
    };
    // Operands near u64::MAX/BigInt range can overflow the i128 accumulator
    // itself on multiply, not just the narrower `code` range below -- use
    // checked arithmetic so that case surfaces as Overflow (promotable)
    // instead of panicking (debug) or silently wrapping (release).
    let result = match op.arith {
        Some(ArithOp::Add) => a.checked_add(b).ok_or(RuntimeError::Overflow)?,
        Some(ArithOp::Subtract) => a.checked_sub(b).ok_or(RuntimeError::Overflow)?,
        Some(ArithOp::Multiply) => a.checked_mul(b).ok_or(RuntimeError::Overflow)?,
        Some(ArithOp::Divide) => {
            if b == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            a / b
        }
        Some(ArithOp::Modulus) => {
            if b == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            a % b
        }
        Some(ArithOp::BitwiseAnd) => a & b,
        Some(ArithOp::BitwiseOr) => a | b,
        Some(ArithOp::BitwiseXor) => a ^ b,
        None => return Err(RuntimeError::CantApplyOperator),
    };
    if code != TypeCode::BigInt && (result < min || result > max) {
        return Err(RuntimeError::Overflow);
    }
    Ok(result)
}

fn float_op(op: &Operator, a: f64, b: f64) -> Result<f64, RuntimeError> {
    Ok(match op.arith {
        Some(ArithOp::Add) => a + b,
        Some(ArithOp::Subtract) => a - b,
        Some(ArithOp::Multiply) => a * b,
        Some(ArithOp::Divide) => a / b,
        Some(ArithOp::Modulus) => a % b,
        _ => return Err(RuntimeError::CantApplyOperator),
    })
}

/// The runtime `Evaluate(a, b, options)` fallback (spec.md 4.4): promotes
/// both operands to a common numeric type, applies `op`, and -- when
/// `checked` and the result overflows with `promote_on_overflow` set --
/// widens one step (int->long->BigInt, uint->ulong->BigInt) and retries
/// rather than raising [`RuntimeError::Overflow`].
pub fn evaluate_runtime(
    op: &Operator,
    a: &Value,
    b: &Value,
    checked: bool,
    promote_on_overflow: bool,
) -> Result<Value, RuntimeError> {
    if op.arity == 1 {
        debug_assert_eq!(op.name, LOGICAL_TRUTH.name, "only LogicalTruth is unary");
        return Ok(Value::Bool(a.is_truthy()));
    }

    let a_code = a.type_code();
    let b_code = b.type_code();
    let is_float = matches!(a_code, TypeCode::Single | TypeCode::Double)
        || matches!(b_code, TypeCode::Single | TypeCode::Double);

    if is_float {
        let (av, bv) = (
            a.as_f64().ok_or(RuntimeError::CantApplyOperator)?,
            b.as_f64().ok_or(RuntimeError::CantApplyOperator)?,
        );
        // IEEE: float division/remainder by zero yields inf/NaN, never an error.
        return Ok(Value::Double(float_op(op, av, bv)?));
    }

    let mut code = conversion::promote_for_binary_op(a_code, b_code);
    let (av, bv) = (
        a.as_i128().ok_or(RuntimeError::CantApplyOperator)?,
        b.as_i128().ok_or(RuntimeError::CantApplyOperator)?,
    );

    if !checked {
        let v = raw_integer_op(op, av, bv)?;
        return Ok(Value::from_code(code, v));
    }

    loop {
        match checked_integer_op(op, code, av, bv) {
            Ok(v) => return Ok(Value::from_code(code, v)),
            Err(RuntimeError::Overflow) if promote_on_overflow => match widen_once(code) {
                Some(next) => {
                    code = next;
                    continue;
                }
                None => return Err(RuntimeError::Overflow),
            },
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_truth_treats_null_and_false_as_false() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
    }

    #[test]
    fn checked_add_overflow_without_promote_errors() {
        let err = evaluate_runtime(&ADD, &Value::Int(i32::MAX), &Value::Int(1), true, false).unwrap_err();
        assert!(matches!(err, RuntimeError::Overflow));
    }

    #[test]
    fn checked_promote_widens_int_to_long() {
        let v = evaluate_runtime(&ADD, &Value::Int(i32::MAX), &Value::Int(1), true, true).unwrap();
        assert!(matches!(v, Value::Long(n) if n == i32::MAX as i64 + 1));
    }

    #[test]
    fn checked_promote_widens_long_to_bigint() {
        let v = evaluate_runtime(&ADD, &Value::Long(i64::MAX), &Value::Long(1), true, true).unwrap();
        assert!(matches!(v, Value::BigInt(n) if n == i64::MAX as i128 + 1));
    }

    #[test]
    fn integer_divide_by_zero_errors() {
        let err = evaluate_runtime(&DIVIDE, &Value::Int(5), &Value::Int(0), false, false).unwrap_err();
        assert!(matches!(err, RuntimeError::DivideByZero));
    }

    #[test]
    fn float_divide_by_zero_yields_infinity() {
        let v = evaluate_runtime(&DIVIDE, &Value::Double(1.0), &Value::Double(0.0), false, false).unwrap();
        assert!(matches!(v, Value::Double(n) if n.is_infinite()));
    }

    #[test]
    fn unchecked_overflow_wraps() {
        let v = evaluate_runtime(&ADD, &Value::Int(i32::MAX), &Value::Int(1), false, false).unwrap();
        assert!(matches!(v, Value::Int(n) if n == i32::MIN));
    }

    #[test]
    fn numeric_fallback_prefers_int() {
        assert_eq!(numeric_fallback(&types::INT), Some(types::INT.clone()));
    }
}
