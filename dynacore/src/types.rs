//! The type lattice: [`TypeRef`], the universe of value/reference types a
//! decorated program can mention, and the distinguished singletons
//! (`Void`, `Object`, `Unknown`, `Any`, `Invalid`).
//!
//! `TypeRef` instances are interned: two handles to the same underlying type
//! must compare equal by reference, never by structural content. We get that
//! by wrapping an `Arc<TypeData>` and implementing `PartialEq`/`Hash` over the
//! pointer rather than deriving them.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

/// Value vs. reference semantics, mirrored from the host type system this
/// platform is embedded in (e.g. a CLR- or JVM-style runtime).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Value,
    Reference,
}

/// Primitive fast-path discriminant. `Other` covers every user-defined or
/// host reference type that isn't one of the built-ins below.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Bool,
    SByte,
    Byte,
    Short,
    UShort,
    Char,
    Int,
    UInt,
    Long,
    ULong,
    Single,
    Double,
    Decimal,
    BigInt,
    Rational,
    Complex,
    String,
    Object,
    Void,
    Other,
}

impl TypeCode {
    pub fn is_primitive_numeric(self) -> bool {
        use TypeCode::*;
        matches!(
            self,
            SByte | Byte | Short | UShort | Char | Int | UInt | Long | ULong
                | Single | Double | Decimal | BigInt | Rational | Complex
        )
    }

    pub fn is_integral(self) -> bool {
        use TypeCode::*;
        matches!(
            self,
            SByte | Byte | Short | UShort | Char | Int | UInt | Long | ULong
                | BigInt
        )
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, TypeCode::Single | TypeCode::Double | TypeCode::Decimal)
    }

    pub fn is_unsigned(self) -> bool {
        use TypeCode::*;
        matches!(self, Byte | UShort | Char | UInt | ULong)
    }

    /// Size in bytes, for the "same size, different sign" promotion branch.
    /// Non-integral/non-fixed-width codes return `None`.
    pub fn byte_size(self) -> Option<u32> {
        use TypeCode::*;
        Some(match self {
            SByte | Byte => 1,
            Short | UShort | Char => 2,
            Int | UInt | Single => 4,
            Long | ULong | Double => 8,
            _ => return None,
        })
    }
}

/// A method signature, used both for ordinary methods/constructors and for
/// operator overloads (`op_Addition` etc, see [`crate::operator`]).
#[derive(Clone, Debug)]
pub struct MethodInfo {
    pub name: String,
    pub is_static: bool,
    pub param_types: Vec<TypeRef>,
    pub return_type: TypeRef,
}

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: TypeRef,
    pub is_static: bool,
    pub is_init_only: bool,
    pub is_literal: bool,
}

/// The interned, mutable-after-construction data behind a [`TypeRef`]. Fields
/// are behind `RwLock` so a host `Language` can keep adding operator
/// overloads/fields to a type after it's first interned (e.g. while compiling
/// a forward-referenced type's methods).
struct TypeData {
    name: String,
    kind: TypeKind,
    code: TypeCode,
    base: RwLock<Option<TypeRef>>,
    interfaces: RwLock<Vec<TypeRef>>,
    fields: RwLock<Vec<FieldInfo>>,
    methods: RwLock<Vec<MethodInfo>>,
    constructors: RwLock<Vec<MethodInfo>>,
    element_type: RwLock<Option<TypeRef>>,
}

impl fmt::Debug for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeData")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("code", &self.code)
            .finish()
    }
}

/// A handle to an interned type. Cheap to clone; equality and hashing are by
/// pointer identity, not by name or structure.
#[derive(Clone)]
pub struct TypeRef(Arc<TypeData>);

impl TypeRef {
    fn new(
        name: impl Into<String>,
        kind: TypeKind,
        code: TypeCode,
    ) -> TypeRef {
        TypeRef(Arc::new(TypeData {
            name: name.into(),
            kind,
            code,
            base: RwLock::new(None),
            interfaces: RwLock::new(Vec::new()),
            fields: RwLock::new(Vec::new()),
            methods: RwLock::new(Vec::new()),
            constructors: RwLock::new(Vec::new()),
            element_type: RwLock::new(None),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn code(&self) -> TypeCode {
        self.0.code
    }

    pub fn base_type(&self) -> Option<TypeRef> {
        self.0.base.read().unwrap().clone()
    }

    pub fn set_base_type(&self, base: TypeRef) {
        *self.0.base.write().unwrap() = Some(base);
    }

    pub fn interfaces(&self) -> Vec<TypeRef> {
        self.0.interfaces.read().unwrap().clone()
    }

    pub fn add_interface(&self, iface: TypeRef) {
        self.0.interfaces.write().unwrap().push(iface);
    }

    pub fn fields(&self) -> Vec<FieldInfo> {
        self.0.fields.read().unwrap().clone()
    }

    pub fn add_field(&self, field: FieldInfo) {
        self.0.fields.write().unwrap().push(field);
    }

    pub fn methods(&self) -> Vec<MethodInfo> {
        self.0.methods.read().unwrap().clone()
    }

    pub fn add_method(&self, method: MethodInfo) {
        self.0.methods.write().unwrap().push(method);
    }

    /// Methods matching `name`, both static and instance. Used by operator
    /// overload resolution (`op_Addition` and friends).
    pub fn methods_named(&self, name: &str) -> Vec<MethodInfo> {
        self.0
            .methods
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    pub fn constructors(&self) -> Vec<MethodInfo> {
        self.0.constructors.read().unwrap().clone()
    }

    pub fn add_constructor(&self, ctor: MethodInfo) {
        self.0.constructors.write().unwrap().push(ctor);
    }

    pub fn element_type(&self) -> Option<TypeRef> {
        self.0.element_type.read().unwrap().clone()
    }

    pub fn set_element_type(&self, elem: TypeRef) {
        *self.0.element_type.write().unwrap() = Some(elem);
    }

    /// Is `self` the same type as, or a transitive base of, `other`'s chain
    /// (i.e. can a value of type `self` be assigned from an instance whose
    /// static type is `other`, walking from `other` up to `Object`)?
    pub fn is_subclass_of(&self, ancestor: &TypeRef) -> bool {
        let mut cur = self.clone();
        loop {
            if &cur == ancestor {
                return true;
            }
            match cur.base_type() {
                Some(base) => cur = base,
                None => return false,
            }
        }
    }

    pub fn implements(&self, iface: &TypeRef) -> bool {
        self.interfaces().iter().any(|i| i == iface)
            || self
                .base_type()
                .map_or(false, |base| base.implements(iface))
    }

    /// All interfaces implemented anywhere in this type's ancestor chain.
    pub fn all_interfaces(&self) -> Vec<TypeRef> {
        let mut out = self.interfaces();
        if let Some(base) = self.base_type() {
            for iface in base.all_interfaces() {
                if !out.contains(&iface) {
                    out.push(iface);
                }
            }
        }
        out
    }

    /// Create a fresh, interned reference type with no base/interfaces set
    /// yet (callers typically call `set_base_type`/`add_interface` right
    /// after). This is the entry point a `Language` uses to register its own
    /// numeric/collection types into the lattice.
    pub fn new_reference(name: impl Into<String>) -> TypeRef {
        TypeRef::new(name, TypeKind::Reference, TypeCode::Other)
    }

    pub fn new_value(name: impl Into<String>) -> TypeRef {
        TypeRef::new(name, TypeKind::Value, TypeCode::Other)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.0.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

macro_rules! primitive_singleton {
    ($static_name:ident, $display:expr, $kind:expr, $code:expr) => {
        pub static $static_name: Lazy<TypeRef> =
            Lazy::new(|| TypeRef::new($display, $kind, $code));
    };
}

// The five distinguished sentinels from spec.md 3.1.
primitive_singleton!(VOID, "void", TypeKind::Value, TypeCode::Void);
primitive_singleton!(OBJECT, "object", TypeKind::Reference, TypeCode::Object);
primitive_singleton!(UNKNOWN, "<unknown>", TypeKind::Reference, TypeCode::Object);
primitive_singleton!(ANY, "<any>", TypeKind::Reference, TypeCode::Object);
primitive_singleton!(INVALID, "<invalid>", TypeKind::Reference, TypeCode::Object);

// Primitive numerics + string/bool.
primitive_singleton!(BOOL, "bool", TypeKind::Value, TypeCode::Bool);
primitive_singleton!(SBYTE, "sbyte", TypeKind::Value, TypeCode::SByte);
primitive_singleton!(BYTE, "byte", TypeKind::Value, TypeCode::Byte);
primitive_singleton!(SHORT, "short", TypeKind::Value, TypeCode::Short);
primitive_singleton!(USHORT, "ushort", TypeKind::Value, TypeCode::UShort);
primitive_singleton!(CHAR, "char", TypeKind::Value, TypeCode::Char);
primitive_singleton!(INT, "int", TypeKind::Value, TypeCode::Int);
primitive_singleton!(UINT, "uint", TypeKind::Value, TypeCode::UInt);
primitive_singleton!(LONG, "long", TypeKind::Value, TypeCode::Long);
primitive_singleton!(ULONG, "ulong", TypeKind::Value, TypeCode::ULong);
primitive_singleton!(SINGLE, "single", TypeKind::Value, TypeCode::Single);
primitive_singleton!(DOUBLE, "double", TypeKind::Value, TypeCode::Double);
primitive_singleton!(DECIMAL, "decimal", TypeKind::Value, TypeCode::Decimal);
primitive_singleton!(BIGINT, "bigint", TypeKind::Value, TypeCode::BigInt);
primitive_singleton!(RATIONAL, "rational", TypeKind::Value, TypeCode::Rational);
primitive_singleton!(COMPLEX, "complex", TypeKind::Value, TypeCode::Complex);
primitive_singleton!(STRING, "string", TypeKind::Reference, TypeCode::String);

/// Look up a primitive singleton by its [`TypeCode`]. Returns `None` for
/// `Object`/`Void`/`Other`, which aren't numeric primitives (use [`OBJECT`]
/// / [`VOID`] directly).
pub fn primitive_by_code(code: TypeCode) -> Option<TypeRef> {
    use TypeCode::*;
    Some(match code {
        Bool => BOOL.clone(),
        SByte => SBYTE.clone(),
        Byte => BYTE.clone(),
        Short => SHORT.clone(),
        UShort => USHORT.clone(),
        Char => CHAR.clone(),
        Int => INT.clone(),
        UInt => UINT.clone(),
        Long => LONG.clone(),
        ULong => ULONG.clone(),
        Single => SINGLE.clone(),
        Double => DOUBLE.clone(),
        Decimal => DECIMAL.clone(),
        BigInt => BIGINT.clone(),
        Rational => RATIONAL.clone(),
        Complex => COMPLEX.clone(),
        String => STRING.clone(),
        Object | Void | Other => return None,
    })
}

/// Process-wide registry of user-defined (non-primitive, non-singleton)
/// types, keyed by name, so a `Language` can look its own types back up by
/// name after registering them (e.g. when resolving a type annotation in
/// source).
static REGISTRY: Lazy<RwLock<HashMap<String, TypeRef>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a user-defined type under `name`, returning the existing
/// registration if one is already present (the registry is idempotent by
/// name, matching the "TypeRef instances are interned" invariant).
pub fn register(name: &str, ty: TypeRef) -> TypeRef {
    let mut registry = REGISTRY.write().unwrap();
    registry.entry(name.to_string()).or_insert(ty).clone()
}

pub fn lookup(name: &str) -> Option<TypeRef> {
    REGISTRY.read().unwrap().get(name).cloned()
}
