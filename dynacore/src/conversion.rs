//! The implicit-conversion table, common-base-type computation, primitive
//! numeric promotion, and conversion emission (safe/unsafe/runtime).
//!
//! This is the part of the type lattice (C1, spec.md 4.1) that actually
//! drives decisions: "can `a` be used where `b` is expected", "what's the
//! natural result type of combining `a` and `b`", and "emit whatever
//! instructions get a value of type `a` onto the stack as type `b`".

use crate::emitter::instruction::{ConvMode, InstructionBuilder};
use crate::types::{self, TypeCode, TypeKind, TypeRef};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Ordered implicit-conversion table for primitive numerics: for each source
/// code, the destinations reachable without loss of information. Built once;
/// see spec.md 4.1 for the widening rules this encodes.
static IMPLICIT_TABLE: Lazy<HashMap<TypeCode, Vec<TypeCode>>> = Lazy::new(|| {
    use TypeCode::*;
    let mut m = HashMap::new();
    m.insert(SByte, vec![Short, Int, Long, Single, Double, Decimal, BigInt]);
    m.insert(
        Byte,
        vec![Short, UShort, Int, UInt, Long, ULong, Single, Double, Decimal, BigInt],
    );
    m.insert(Short, vec![Int, Long, Single, Double, Decimal, BigInt]);
    m.insert(
        UShort,
        vec![Int, UInt, Long, ULong, Single, Double, Decimal, BigInt],
    );
    // Char behaves as UShort (spec.md 4.1).
    m.insert(
        Char,
        vec![Int, UInt, Long, ULong, Single, Double, Decimal, BigInt, UShort],
    );
    m.insert(Int, vec![Long, Single, Double, Decimal, BigInt]);
    m.insert(UInt, vec![Long, ULong, Single, Double, Decimal, BigInt]);
    m.insert(Long, vec![Single, Double, Decimal, BigInt]);
    m.insert(ULong, vec![Single, Double, Decimal, BigInt]);
    m.insert(Single, vec![Double]);
    m.insert(Double, vec![]);
    m.insert(Decimal, vec![]);
    m.insert(BigInt, vec![]);
    m
});

/// Ordered promotion preference list used by [`promote_for_binary_op`] when
/// the operands' signs agree, their sizes differ, or either is floating
/// point (spec.md 4.1).
const PROMOTION_PREFERENCE: [TypeCode; 5] = [
    TypeCode::Double,
    TypeCode::Single,
    TypeCode::ULong,
    TypeCode::Long,
    TypeCode::UInt,
];

/// Common base type of two types, per the 6-step algorithm in spec.md 4.1.
/// `a`/`b` are `Option` to model "null" (the absence of a statically known
/// type, e.g. a literal `nil`).
pub fn common_base_type(a: Option<&TypeRef>, b: Option<&TypeRef>) -> TypeRef {
    match (a, b) {
        (Some(a), Some(b)) => common_base_type_some(a, b),
        (None, Some(t)) | (Some(t), None) => {
            if *t == *types::UNKNOWN {
                types::UNKNOWN.clone()
            } else {
                types::OBJECT.clone()
            }
        }
        (None, None) => types::OBJECT.clone(),
    }
}

fn common_base_type_some(a: &TypeRef, b: &TypeRef) -> TypeRef {
    // 1. Identity.
    if a == b {
        return a.clone();
    }
    // 2. Either Unknown -> Unknown.
    if *a == *types::UNKNOWN || *b == *types::UNKNOWN {
        return types::UNKNOWN.clone();
    }
    // 3. Either Void -> the other.
    if *a == *types::VOID {
        return b.clone();
    }
    if *b == *types::VOID {
        return a.clone();
    }
    // 4. Differing value/reference kind -> Object.
    if a.kind() != b.kind() {
        return types::OBJECT.clone();
    }
    // 5. Both reference: subclass relationship wins.
    if a.kind() == TypeKind::Reference {
        if a.is_subclass_of(b) {
            return b.clone();
        }
        if b.is_subclass_of(a) {
            return a.clone();
        }
        // fall through to interface search below
    }
    // 6. Both primitive numerics: implicit conversion in either direction.
    if a.code().is_primitive_numeric() && b.code().is_primitive_numeric() {
        if has_implicit_conversion(a, b) {
            return b.clone();
        }
        if has_implicit_conversion(b, a) {
            return a.clone();
        }
    }
    // 7. First interface implemented by both; else Object.
    for iface in a.all_interfaces() {
        if b.implements(&iface) {
            return iface;
        }
    }
    types::OBJECT.clone()
}

/// Fold an n-ary common-base computation, with the interface-intersection
/// fallback described in spec.md 4.1: if the running fold result degrades to
/// `Object` but no input was explicitly `Object`/null, prefer a shared
/// interface over `Object`.
pub fn common_base_type_n(types_in: &[Option<TypeRef>]) -> TypeRef {
    if types_in.is_empty() {
        return types::OBJECT.clone();
    }
    let mut result = types_in[0]
        .clone()
        .unwrap_or_else(|| types::OBJECT.clone());
    let mut any_explicit_object_or_null = types_in[0].is_none()
        || types_in[0].as_ref() == Some(&*types::OBJECT);

    for next in &types_in[1..] {
        any_explicit_object_or_null |=
            next.is_none() || next.as_ref() == Some(&*types::OBJECT);
        result = common_base_type(Some(&result), next.as_ref());
    }

    if result == *types::OBJECT && !any_explicit_object_or_null {
        // Search the intersection of implemented interfaces of all inputs.
        let mut candidates: Option<Vec<TypeRef>> = None;
        for t in types_in {
            let ifaces = t.as_ref().map(|t| t.all_interfaces()).unwrap_or_default();
            candidates = Some(match candidates {
                None => ifaces,
                Some(prev) => {
                    prev.into_iter().filter(|i| ifaces.contains(i)).collect()
                }
            });
        }
        if let Some(first) = candidates.into_iter().flatten().next() {
            return first;
        }
    }
    result
}

/// `from == to` -> true; null to any reference type -> true; upcast by
/// assignability; primitive numeric table lookup; else a matching static
/// `op_Implicit` (directly, or transitively through a primitive the target
/// itself implicitly converts to).
pub fn has_implicit_conversion(from: &TypeRef, to: &TypeRef) -> bool {
    has_implicit_conversion_inner(from, to, 0)
}

fn has_implicit_conversion_inner(from: &TypeRef, to: &TypeRef, depth: u32) -> bool {
    if from == to {
        return true;
    }
    if depth > 8 {
        // defend against pathological op_Implicit cycles
        return false;
    }
    if to.kind() == TypeKind::Reference && from.is_subclass_of(to) {
        return true;
    }
    if from.code().is_primitive_numeric() && to.code().is_primitive_numeric() {
        if let Some(reachable) = IMPLICIT_TABLE.get(&from.code()) {
            if reachable.contains(&to.code()) {
                return true;
            }
        }
    }
    // Static op_Implicit(from) -> T, where T == to or T implicitly converts.
    for method in from.methods_named("op_Implicit") {
        if method.param_types.len() == 1 && method.param_types[0] == *from {
            if method.return_type == *to
                || has_implicit_conversion_inner(&method.return_type, to, depth + 1)
            {
                return true;
            }
        }
    }
    false
}

/// Binary numeric promotion rule, spec.md 4.1. Given the two operands' type
/// codes, picks the promoted result code.
pub fn promote_for_binary_op(ltc: TypeCode, rtc: TypeCode) -> TypeCode {
    let same_sign = ltc.is_unsigned() == rtc.is_unsigned();
    let sizes_differ = match (ltc.byte_size(), rtc.byte_size()) {
        (Some(l), Some(r)) => l != r,
        _ => true,
    };
    let either_float = ltc.is_floating_point() || rtc.is_floating_point();

    if same_sign || sizes_differ || either_float {
        for &candidate in PROMOTION_PREFERENCE.iter() {
            if ltc == candidate || rtc == candidate {
                return candidate;
            }
        }
        TypeCode::Int
    } else {
        // Same size, different sign, integral.
        match ltc.byte_size() {
            Some(8) => TypeCode::BigInt,
            Some(4) => TypeCode::Long,
            _ => TypeCode::Int,
        }
    }
}

/// Overflow-promotion policy (spec.md 4.1 last paragraph): when
/// `checked && promote_on_overflow` and `ty` is a primitive, the compile-time
/// `ValueType` becomes `Unknown` because the actual result width is
/// data-dependent. Returns `Some(Unknown)` when the downgrade applies, else
/// `None` (caller keeps the statically-known type).
pub fn overflow_downgrade(
    checked: bool,
    promote_on_overflow: bool,
    ty: &TypeRef,
) -> Option<TypeRef> {
    if checked && promote_on_overflow && ty.code().is_primitive_numeric() {
        Some(types::UNKNOWN.clone())
    } else {
        None
    }
}

/// Emits a conversion that is always safe to perform implicitly: widenings,
/// null-to-reference, and boxing of value types into reference destinations.
/// For non-primitive pairs, falls back to a static `op_Implicit`. Returns
/// `Err` if no safe conversion exists (callers should fall back to
/// [`emit_runtime_conversion`] or report `CannotConvertType`).
pub fn emit_safe_conversion<B: InstructionBuilder>(
    builder: &mut B,
    src: &TypeRef,
    dst: &TypeRef,
    checked: bool,
) -> Result<(), ()> {
    if src == dst {
        return Ok(());
    }
    if dst.kind() == TypeKind::Reference
        && src.kind() == TypeKind::Value
        && (dst == &*types::OBJECT || src.is_subclass_of(dst))
    {
        builder.box_value(src.clone());
        return Ok(());
    }
    if src.code().is_primitive_numeric() && dst.code().is_primitive_numeric() {
        if has_implicit_conversion(src, dst) {
            let mode = if checked { ConvMode::Checked } else { ConvMode::Unchecked };
            builder.convert(src.code(), dst.code(), mode, src.code().is_unsigned());
            return Ok(());
        }
        return Err(());
    }
    if has_implicit_conversion(src, dst) {
        for method in src.methods_named("op_Implicit") {
            if method.return_type == *dst {
                builder.call_static(method);
                return Ok(());
            }
        }
    }
    Err(())
}

/// As [`emit_safe_conversion`], but additionally permits downcasts
/// (`castclass`) and unboxing value types out of a reference source.
pub fn emit_unsafe_conversion<B: InstructionBuilder>(
    builder: &mut B,
    src: &TypeRef,
    dst: &TypeRef,
    checked: bool,
) -> Result<(), ()> {
    if emit_safe_conversion(builder, src, dst, checked).is_ok() {
        return Ok(());
    }
    if src.kind() == TypeKind::Reference && dst.kind() == TypeKind::Value {
        builder.unbox(dst.clone());
        return Ok(());
    }
    if src.kind() == TypeKind::Reference && dst.kind() == TypeKind::Reference {
        builder.castclass(dst.clone());
        return Ok(());
    }
    Err(())
}

/// Falls back to a generic `Ops.convert_to(value, Type)` runtime call when
/// static reasoning is insufficient (e.g. `src` is `Unknown`). The result is
/// unboxed/cast back to `dst`'s kind.
pub fn emit_runtime_conversion<B: InstructionBuilder>(builder: &mut B, dst: &TypeRef) {
    builder.ldtoken(dst.clone());
    builder.call_runtime_convert();
    match dst.kind() {
        TypeKind::Value => builder.unbox(dst.clone()),
        TypeKind::Reference => builder.castclass(dst.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    #[test]
    fn identity_returns_self() {
        let t = INT.clone();
        assert_eq!(common_base_type(Some(&t), Some(&t)), t);
    }

    #[test]
    fn unknown_dominates() {
        assert_eq!(
            common_base_type(Some(&UNKNOWN), Some(&INT)),
            *UNKNOWN
        );
    }

    #[test]
    fn implicit_conversion_drives_base_type() {
        assert!(has_implicit_conversion(&INT, &LONG));
        assert_eq!(common_base_type(Some(&INT), Some(&LONG)), *LONG);
        assert_eq!(common_base_type(Some(&LONG), Some(&INT)), *LONG);
    }

    #[test]
    fn promotion_rule_table() {
        assert_eq!(
            promote_for_binary_op(TypeCode::Int, TypeCode::UInt),
            TypeCode::Long
        );
        assert_eq!(
            promote_for_binary_op(TypeCode::Long, TypeCode::ULong),
            TypeCode::BigInt
        );
        assert_eq!(
            promote_for_binary_op(TypeCode::Short, TypeCode::UShort),
            TypeCode::Int
        );
        assert_eq!(
            promote_for_binary_op(TypeCode::Double, TypeCode::Int),
            TypeCode::Double
        );
    }

    #[test]
    fn void_yields_other_operand() {
        assert_eq!(common_base_type(Some(&VOID), Some(&INT)), *INT);
    }

    #[test]
    fn differing_kind_falls_to_object() {
        let r#ref = TypeRef::new_reference("Foo");
        assert_eq!(common_base_type(Some(&INT), Some(&r#ref)), *OBJECT);
    }
}
