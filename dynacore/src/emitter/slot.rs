//! The [`Slot`] sum type (spec.md 3.4): a uniform abstraction over every
//! addressable location a variable reference can resolve to, for both
//! compiled and interpreted execution.

use crate::binding::Binding;
use crate::emitter::instruction::InstructionBuilder;
use crate::types::TypeRef;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// The field name used for the "up one closure" link in a synthesized
/// closure record (spec.md 4.5).
pub const PARENT_CLOSURE_FIELD: &str = "$parent";

/// A stack-allocated local, materialized up front (debug builds: one slot
/// per named local; release/generator builds: reused from the emitter's
/// free list -- see [`crate::emitter::Emitter::alloc_local_variable`]).
#[derive(Clone, Debug)]
pub struct LocalSlot {
    pub index: u32,
    pub ty: TypeRef,
}

/// A deferred local: the backing stack slot isn't allocated until first
/// use. `allocate` is called at most once; the returned index is memoized.
#[derive(Clone)]
pub struct LocalProxySlot {
    pub ty: TypeRef,
    materialized: Rc<RefCell<Option<u32>>>,
    allocate: Rc<dyn Fn() -> u32>,
}

impl LocalProxySlot {
    pub fn new(ty: TypeRef, allocate: Rc<dyn Fn() -> u32>) -> Self {
        LocalProxySlot {
            ty,
            materialized: Rc::new(RefCell::new(None)),
            allocate,
        }
    }

    fn index(&self) -> u32 {
        if let Some(i) = *self.materialized.borrow() {
            return i;
        }
        let i = (self.allocate)();
        *self.materialized.borrow_mut() = Some(i);
        i
    }
}

impl fmt::Debug for LocalProxySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalProxySlot")
            .field("ty", &self.ty)
            .field("materialized", &*self.materialized.borrow())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ParameterSlot {
    pub index: u32,
    pub ty: TypeRef,
    pub by_ref: bool,
}

#[derive(Clone, Debug)]
pub struct FieldSlot {
    pub name: String,
    pub ty: TypeRef,
    pub is_static: bool,
    pub is_init_only: bool,
    pub is_literal: bool,
}

#[derive(Clone, Debug)]
pub struct ArrayElementSlot {
    pub element_type: TypeRef,
}

#[derive(Clone, Debug)]
pub struct ClosureCellSlot {
    /// Number of `$parent` hops from the current closure instance to reach
    /// the frame that declared this variable.
    pub depth: u32,
    pub field_name: String,
    pub ty: TypeRef,
}

#[derive(Clone, Debug)]
pub struct TopLevelSlot {
    pub binding: Arc<Binding>,
    pub ty: TypeRef,
}

#[derive(Clone, Debug)]
pub struct InterpretedLocalSlot {
    pub name: String,
    pub ty: TypeRef,
}

/// Every addressable location a variable reference resolves to (spec.md 3.4
/// table). `array` and `this` aren't separate fields on `ArrayElement`
/// because indexing is driven by the emitter pushing the array ref and index
/// itself before calling into the slot -- the slot only needs to know the
/// element type to pick the right opcode.
#[derive(Clone, Debug)]
pub enum Slot {
    Local(LocalSlot),
    LocalProxy(LocalProxySlot),
    Parameter(ParameterSlot),
    This(TypeRef),
    Field(FieldSlot),
    ArrayElement(ArrayElementSlot),
    ClosureCell(ClosureCellSlot),
    TopLevel(TopLevelSlot),
    InterpretedLocal(InterpretedLocalSlot),
}

impl Slot {
    pub fn type_of(&self) -> TypeRef {
        match self {
            Slot::Local(s) => s.ty.clone(),
            Slot::LocalProxy(s) => s.ty.clone(),
            Slot::Parameter(s) => s.ty.clone(),
            Slot::This(ty) => ty.clone(),
            Slot::Field(s) => s.ty.clone(),
            Slot::ArrayElement(s) => s.element_type.clone(),
            Slot::ClosureCell(s) => s.ty.clone(),
            Slot::TopLevel(s) => s.ty.clone(),
            Slot::InterpretedLocal(s) => s.ty.clone(),
        }
    }

    pub fn can_read(&self) -> bool {
        true // every variant supports reads (spec.md 3.4 table)
    }

    pub fn can_write(&self, in_constructor: bool) -> bool {
        match self {
            Slot::Field(f) => !f.is_init_only || in_constructor,
            _ => true,
        }
    }

    /// `requested`, when present, is the type the caller wants the address
    /// as -- only [`Slot::ArrayElement`] cares (address is only available
    /// when the requested type matches the element type exactly) and
    /// [`Slot::TopLevel`] (address-of only makes sense for `Object`-typed
    /// bindings).
    pub fn can_addr(&self, requested: Option<&TypeRef>) -> bool {
        match self {
            Slot::Local(_) | Slot::LocalProxy(_) | Slot::Parameter(_) | Slot::This(_) => true,
            Slot::Field(f) => !f.is_literal,
            Slot::ArrayElement(s) => requested.map_or(false, |r| *r == s.element_type),
            Slot::ClosureCell(_) => true,
            Slot::TopLevel(s) => s.ty.code() == crate::types::TypeCode::Object,
            Slot::InterpretedLocal(_) => false,
        }
    }

    /// Emit opcodes that push this slot's current value onto the stack.
    pub fn emit_get<B: InstructionBuilder>(&self, b: &mut B) {
        match self {
            Slot::Local(s) => b.load_local(s.index),
            Slot::LocalProxy(s) => b.load_local(s.index()),
            Slot::Parameter(s) => {
                b.load_arg(s.index);
                if s.by_ref {
                    b.load_indirect(s.ty.code());
                }
            }
            Slot::This(_) => b.load_arg(0),
            Slot::Field(s) => b.load_field(s.name.clone(), s.is_static),
            Slot::ArrayElement(s) => b.load_array_elem(s.element_type.clone()),
            Slot::ClosureCell(s) => {
                for _ in 0..s.depth {
                    b.load_field(PARENT_CLOSURE_FIELD.to_string(), false);
                }
                b.load_field(s.field_name.clone(), false);
            }
            Slot::TopLevel(s) => {
                b.push_cached_binding(s.binding.name.clone());
                b.check_binding();
                b.load_binding_value();
            }
            Slot::InterpretedLocal(_) => {
                // Interpreted locals are resolved by `interp::Frame`, not by
                // the emitter; this is only reachable if a host mistakenly
                // tries to emit code for an interpreted-only slot.
                unreachable!("InterpretedLocal has no compiled representation")
            }
        }
    }

    pub fn emit_get_addr<B: InstructionBuilder>(&self, b: &mut B) {
        match self {
            Slot::Local(s) => b.load_local_addr(s.index),
            Slot::LocalProxy(s) => b.load_local_addr(s.index()),
            Slot::Parameter(s) => b.load_arg_addr(s.index),
            Slot::This(_) => b.load_arg_addr(0),
            Slot::Field(_) => self.emit_get(b), // backend treats a field load as already-addressable
            Slot::ArrayElement(s) => b.load_array_elem(s.element_type.clone()),
            Slot::ClosureCell(_) => self.emit_get(b),
            Slot::TopLevel(_) => self.emit_get(b),
            Slot::InterpretedLocal(_) => {
                unreachable!("InterpretedLocal has no compiled representation")
            }
        }
    }

    /// Emit a store. `emit_value` pushes the new value onto the stack first;
    /// `is_initialize` distinguishes a binding's initializing assignment
    /// (which skips the `check_binding`/init-only guards) from a later
    /// reassignment.
    pub fn emit_set<B: InstructionBuilder>(
        &self,
        b: &mut B,
        emit_value: impl FnOnce(&mut B),
        is_initialize: bool,
    ) {
        match self {
            Slot::Local(s) => {
                emit_value(b);
                b.store_local(s.index);
            }
            Slot::LocalProxy(s) => {
                emit_value(b);
                b.store_local(s.index());
            }
            Slot::Parameter(s) => {
                if s.by_ref {
                    b.load_arg(s.index);
                    emit_value(b);
                    b.store_indirect(s.ty.code());
                } else {
                    emit_value(b);
                    b.store_arg(s.index);
                }
            }
            Slot::This(_) => {
                emit_value(b);
                b.store_arg(0);
            }
            Slot::Field(s) => {
                emit_value(b);
                b.store_field(s.name.clone(), s.is_static);
            }
            Slot::ArrayElement(s) => {
                emit_value(b);
                b.store_array_elem(s.element_type.clone());
            }
            Slot::ClosureCell(s) => {
                for _ in 0..s.depth {
                    b.load_field(PARENT_CLOSURE_FIELD.to_string(), false);
                }
                emit_value(b);
                b.store_field(s.field_name.clone(), false);
            }
            Slot::TopLevel(s) => {
                b.push_cached_binding(s.binding.name.clone());
                if !is_initialize {
                    b.check_binding(); // require prior definition before reassignment
                }
                emit_value(b);
                b.store_binding_value();
            }
            Slot::InterpretedLocal(_) => {
                unreachable!("InterpretedLocal has no compiled representation")
            }
        }
    }

    /// Aliasing check used to detect `x = x` (spec.md 8, property 12): true
    /// only for slots that provably name the same storage location.
    pub fn is_same_as(&self, other: &Slot) -> bool {
        match (self, other) {
            (Slot::Local(a), Slot::Local(b)) => a.index == b.index,
            (Slot::Parameter(a), Slot::Parameter(b)) => a.index == b.index,
            (Slot::This(_), Slot::This(_)) => true,
            (Slot::Field(a), Slot::Field(b)) => {
                a.name == b.name && a.is_static == b.is_static
            }
            (Slot::ClosureCell(a), Slot::ClosureCell(b)) => {
                a.depth == b.depth && a.field_name == b.field_name
            }
            (Slot::TopLevel(a), Slot::TopLevel(b)) => Arc::ptr_eq(&a.binding, &b.binding),
            (Slot::InterpretedLocal(a), Slot::InterpretedLocal(b)) => a.name == b.name,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    #[test]
    fn local_slots_alias_by_index() {
        let a = Slot::Local(LocalSlot { index: 1, ty: types::INT.clone() });
        let b = Slot::Local(LocalSlot { index: 1, ty: types::INT.clone() });
        let c = Slot::Local(LocalSlot { index: 2, ty: types::INT.clone() });
        assert!(a.is_same_as(&b));
        assert!(!a.is_same_as(&c));
    }

    #[test]
    fn distinct_slot_kinds_never_alias() {
        let local = Slot::Local(LocalSlot { index: 0, ty: types::INT.clone() });
        let param = Slot::Parameter(ParameterSlot { index: 0, ty: types::INT.clone(), by_ref: false });
        assert!(!local.is_same_as(&param));
    }

    #[test]
    fn init_only_field_unwritable_outside_ctor() {
        let f = Slot::Field(FieldSlot {
            name: "x".into(),
            ty: types::INT.clone(),
            is_static: false,
            is_init_only: true,
            is_literal: false,
        });
        assert!(!f.can_write(false));
        assert!(f.can_write(true));
    }

    #[test]
    fn literal_field_has_no_address() {
        let f = Slot::Field(FieldSlot {
            name: "x".into(),
            ty: types::INT.clone(),
            is_static: true,
            is_init_only: true,
            is_literal: true,
        });
        assert!(!f.can_addr(None));
    }

    #[test]
    fn array_element_addr_requires_matching_type() {
        let s = Slot::ArrayElement(ArrayElementSlot { element_type: types::INT.clone() });
        assert!(s.can_addr(Some(&types::INT)));
        assert!(!s.can_addr(Some(&types::DOUBLE)));
        assert!(!s.can_addr(None));
    }

    #[test]
    fn local_proxy_materializes_once() {
        let calls = Rc::new(RefCell::new(0));
        let calls2 = calls.clone();
        let slot = LocalProxySlot::new(
            types::INT.clone(),
            Rc::new(move || {
                *calls2.borrow_mut() += 1;
                7
            }),
        );
        assert_eq!(slot.index(), 7);
        assert_eq!(slot.index(), 7);
        assert_eq!(*calls.borrow(), 1);
    }
}
