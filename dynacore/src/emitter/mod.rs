//! The `Emitter`: scope protocol, typed emit helpers, constant caching,
//! closure wiring, and tail-return handling (spec.md 4.5). Generic over the
//! backend's [`InstructionBuilder`] so the same emission logic drives any
//! target (bytecode interpreter, SSA IR, real codegen).

pub mod closure;
pub mod instruction;
pub mod slot;

use crate::binding::Binding;
use crate::conversion;
use crate::emitter::closure::ClosureFrame;
use crate::emitter::instruction::{Const, InstructionBuilder, Label};
use crate::emitter::slot::{ClosureCellSlot, FieldSlot, LocalSlot, Slot};
use crate::error::CompileError;
use crate::types::TypeRef;
use std::collections::HashMap;
use std::sync::Arc;

/// Key under which a materialized value is cached by [`Emitter::request_cached_const`].
/// Spec.md 4.5: "Equality is by value (reference for bindings, element-wise
/// for arrays, `Equals` otherwise)". Primitives and null are never cached
/// (the caller should inline them with `push_const` directly).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A binding, keyed by its `Arc` identity.
    Binding(usize),
    /// Anything else whose cache identity is a stable, precomputed textual
    /// key (e.g. a serialized array/object literal).
    Other(String),
}

impl CacheKey {
    pub fn for_binding(binding: &Arc<Binding>) -> CacheKey {
        CacheKey::Binding(Arc::as_ptr(binding) as usize)
    }
}

/// Stack-machine bookkeeping for one method body (spec.md 4.5).
pub struct Emitter<B: InstructionBuilder> {
    builder: B,
    enclosing_type: TypeRef,
    is_static: bool,
    is_generator: bool,
    locals_allocated: bool,
    /// `true` in "debug builds": every named local gets its own fresh slot
    /// instead of being drawn from the free-list pool.
    keep_symbol_info: bool,

    scopes: Vec<HashMap<String, Slot>>,
    free_list: HashMap<TypeRef, Vec<u32>>,
    next_local_index: u32,
    next_generator_field: u32,

    const_cache: HashMap<CacheKey, Slot>,
    next_cache_id: u32,

    closure: Option<ClosureFrame>,

    function_exit_label: Option<Label>,
}

impl<B: InstructionBuilder> Emitter<B> {
    pub fn new(builder: B, enclosing_type: TypeRef, is_static: bool, keep_symbol_info: bool) -> Self {
        Emitter {
            builder,
            enclosing_type,
            is_static,
            is_generator: false,
            locals_allocated: false,
            keep_symbol_info,
            scopes: Vec::new(),
            free_list: HashMap::new(),
            next_local_index: 0,
            next_generator_field: 0,
            const_cache: HashMap::new(),
            next_cache_id: 0,
            closure: None,
            function_exit_label: None,
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut B {
        &mut self.builder
    }

    pub fn enclosing_type(&self) -> &TypeRef {
        &self.enclosing_type
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_generator(&self) -> bool {
        self.is_generator
    }

    /// Marks this method as a generator. Must be called before any local is
    /// allocated (spec.md 4.5): once set, every temporary allocated through
    /// [`Self::alloc_local_temp`] is promoted to a field instead of a stack
    /// slot, so it survives a suspension point.
    pub fn set_generator(&mut self) {
        assert!(
            !self.locals_allocated,
            "is_generator must be set before any local allocation"
        );
        self.is_generator = true;
    }

    // ---- Scope protocol ----------------------------------------------

    pub fn begin_scope(&mut self) {
        log::trace!("begin_scope depth={}", self.scopes.len() + 1);
        self.scopes.push(HashMap::new());
    }

    pub fn end_scope(&mut self) {
        self.scopes.pop().expect("end_scope without matching begin_scope");
        log::trace!("end_scope depth={}", self.scopes.len());
    }

    /// Asserts every opened scope was closed -- called once the method body
    /// is fully emitted.
    pub fn finish(&self) {
        assert!(self.scopes.is_empty(), "Emitter::finish with open scopes");
    }

    fn declare(&mut self, name: &str, slot: Slot) {
        self.scopes
            .last_mut()
            .expect("declare outside any scope")
            .insert(name.to_string(), slot);
    }

    /// Resolve `name` against the innermost enclosing scope outward.
    pub fn resolve(&self, name: &str) -> Option<Slot> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).cloned())
    }

    fn fresh_local_index(&mut self) -> u32 {
        let index = self.next_local_index;
        self.next_local_index += 1;
        index
    }

    /// Allocate storage for a named local and declare it in the innermost
    /// scope. Debug builds (`keep_symbol_info`) get a dedicated slot;
    /// otherwise this delegates to [`Self::alloc_local_temp`].
    pub fn alloc_local_variable(&mut self, name: &str, ty: TypeRef) -> Slot {
        let slot = if self.keep_symbol_info {
            self.locals_allocated = true;
            Slot::Local(LocalSlot {
                index: self.fresh_local_index(),
                ty,
            })
        } else {
            self.alloc_local_temp(ty, true)
        };
        self.declare(name, slot.clone());
        slot
    }

    /// Allocate an unnamed temporary, reusing a same-typed slot from the
    /// free list when one is available. `keep` is accepted for symmetry with
    /// spec.md's signature; both `true`/`false` draw from the same pool, the
    /// difference is purely about caller intent to call
    /// [`Self::free_local_temp`] afterward.
    pub fn alloc_local_temp(&mut self, ty: TypeRef, _keep: bool) -> Slot {
        self.locals_allocated = true;
        if self.is_generator {
            let name = format!("<local>${}", self.next_generator_field);
            self.next_generator_field += 1;
            return Slot::Field(FieldSlot {
                name,
                ty,
                is_static: false,
                is_init_only: false,
                is_literal: false,
            });
        }
        let index = self
            .free_list
            .get_mut(&ty)
            .and_then(|free| free.pop())
            .unwrap_or_else(|| self.fresh_local_index());
        Slot::Local(LocalSlot { index, ty })
    }

    /// Return a temporary to the free-list pool for reuse. Generator-backed
    /// fields are never pooled: each survives for the method's lifetime.
    pub fn free_local_temp(&mut self, slot: Slot) {
        if let Slot::Local(local) = slot {
            self.free_list.entry(local.ty).or_default().push(local.index);
        }
    }

    // ---- Typed emit helpers --------------------------------------------

    /// Emit a node (via `emit_node`) whose static type is `ty`, then convert
    /// to `desired` if the two differ.
    pub fn emit_typed_node(
        &mut self,
        ty: &TypeRef,
        desired: &TypeRef,
        checked: bool,
        emit_node: impl FnOnce(&mut B),
    ) -> Result<(), CompileError> {
        emit_node(&mut self.builder);
        if ty == desired {
            return Ok(());
        }
        conversion::emit_safe_conversion(&mut self.builder, ty, desired, checked)
            .or_else(|_| conversion::emit_unsafe_conversion(&mut self.builder, ty, desired, checked))
            .map_err(|_| CompileError::CannotConvertType {
                from: ty.clone(),
                to: desired.clone(),
            })
    }

    /// Emit a node that must leave the evaluation stack unchanged (a
    /// statement in expression position).
    pub fn emit_void(&mut self, emit_node: impl FnOnce(&mut B)) {
        emit_node(&mut self.builder);
    }

    /// Emit a `new Type[count]` plus its elements. When `constants` is
    /// supplied (every element is a compile-time constant of a primitive
    /// element type), the elements are packed into one `InitializedData`
    /// blob instead of individual stores (spec.md 4.5).
    pub fn emit_array(
        &mut self,
        element: TypeRef,
        count: u32,
        constants: Option<Vec<u8>>,
        mut emit_element: impl FnMut(&mut B, u32),
    ) {
        self.builder.push_const(Const::I32(count as i32));
        self.builder.new_array(element.clone());
        if element.code().is_primitive_numeric() {
            if let Some(bytes) = constants {
                self.builder.init_array_data(element, bytes);
                return;
            }
        }
        for index in 0..count {
            self.builder.dup();
            self.builder.push_const(Const::I32(index as i32));
            emit_element(&mut self.builder, index);
            self.builder.store_array_elem(element.clone());
        }
    }

    // ---- Constant caching ----------------------------------------------

    /// Request a cached slot for a non-primitive constant, materializing it
    /// the first time `key` is seen and reusing the same slot on every
    /// subsequent request (spec.md 4.5). Primitives and null should be
    /// inlined with `push_const` directly instead of going through this.
    pub fn request_cached_const(
        &mut self,
        key: CacheKey,
        ty: TypeRef,
        materialize: impl FnOnce(&mut B),
    ) -> Slot {
        if let Some(slot) = self.const_cache.get(&key) {
            return slot.clone();
        }
        let name = closure::const_cache_name(self.next_cache_id);
        self.next_cache_id += 1;
        let slot = Slot::Field(FieldSlot {
            name: name.clone(),
            ty,
            is_static: true,
            is_init_only: true,
            is_literal: false,
        });
        materialize(&mut self.builder);
        self.builder.store_field(name, true);
        self.const_cache.insert(key, slot.clone());
        slot
    }

    // ---- Closures -------------------------------------------------------

    /// Install this method's own closure frame (called once, if and only if
    /// the method captures at least one outer variable or is captured by a
    /// nested one).
    pub fn set_closure(&mut self, frame: ClosureFrame) {
        self.closure = Some(frame);
    }

    pub fn closure(&self) -> Option<&ClosureFrame> {
        self.closure.as_ref()
    }

    /// Record a capture of `name` by this method's own closure frame,
    /// returning the [`Slot::ClosureCell`] a local reference to it should be
    /// rewritten to. `None` if this method has no closure frame installed.
    pub fn capture(&mut self, name: &str, ty: TypeRef) -> Option<Slot> {
        let field_name = self.closure.as_mut()?.capture(name, ty.clone());
        Some(Slot::ClosureCell(ClosureCellSlot {
            depth: 0,
            field_name,
            ty,
        }))
    }

    // ---- Tail return / try-region leave semantics -----------------------

    fn function_exit_label(&mut self) -> Label {
        if let Some(label) = self.function_exit_label {
            return label;
        }
        let label = self.builder.new_label();
        self.function_exit_label = Some(label);
        label
    }

    /// Emit a tail return. `in_try` is the evaluated
    /// `node.flags().contains(NodeFlags::IN_TRY)` for the node being
    /// returned (Open Question 2, resolved in SPEC_FULL.md): inside a
    /// protected region a bare `Ret` is invalid on most stack machines, so
    /// this emits `Leave` to a function-exit label instead; the label is
    /// bound by [`Self::emit_function_epilogue`] after all enclosing
    /// try/catch regions have closed.
    pub fn emit_tail_return(&mut self, in_try: bool) {
        if in_try {
            let label = self.function_exit_label();
            self.builder.leave(label);
        } else {
            self.builder.ret();
        }
    }

    /// Bind the function-exit label (if any tail return inside a try region
    /// requested one) and emit the real `Ret`. Call once, after the method
    /// body is fully emitted.
    pub fn emit_function_epilogue(&mut self) {
        if let Some(label) = self.function_exit_label {
            self.builder.mark_label(label);
            self.builder.ret();
        }
    }

    /// Consume the emitter, returning the underlying builder.
    pub fn into_builder(self) -> B {
        self.builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::instruction::{CallKind, ConvMode};
    use crate::types;

    #[derive(Default)]
    struct RecordingBuilder {
        ops: Vec<String>,
        next_label: u32,
    }

    impl InstructionBuilder for RecordingBuilder {
        fn push_const(&mut self, value: Const) {
            self.ops.push(format!("push_const {:?}", value));
        }
        fn load_local(&mut self, index: u32) {
            self.ops.push(format!("load_local {}", index));
        }
        fn store_local(&mut self, index: u32) {
            self.ops.push(format!("store_local {}", index));
        }
        fn load_local_addr(&mut self, index: u32) {
            self.ops.push(format!("load_local_addr {}", index));
        }
        fn load_arg(&mut self, index: u32) {
            self.ops.push(format!("load_arg {}", index));
        }
        fn store_arg(&mut self, index: u32) {
            self.ops.push(format!("store_arg {}", index));
        }
        fn load_arg_addr(&mut self, index: u32) {
            self.ops.push(format!("load_arg_addr {}", index));
        }
        fn load_field(&mut self, field: String, is_static: bool) {
            self.ops.push(format!("load_field {} {}", field, is_static));
        }
        fn store_field(&mut self, field: String, is_static: bool) {
            self.ops.push(format!("store_field {} {}", field, is_static));
        }
        fn load_indirect(&mut self, code: types::TypeCode) {
            self.ops.push(format!("load_indirect {:?}", code));
        }
        fn store_indirect(&mut self, code: types::TypeCode) {
            self.ops.push(format!("store_indirect {:?}", code));
        }
        fn new_array(&mut self, element: TypeRef) {
            self.ops.push(format!("new_array {}", element));
        }
        fn load_array_elem(&mut self, element: TypeRef) {
            self.ops.push(format!("load_array_elem {}", element));
        }
        fn store_array_elem(&mut self, element: TypeRef) {
            self.ops.push(format!("store_array_elem {}", element));
        }
        fn init_array_data(&mut self, element: TypeRef, bytes: Vec<u8>) {
            self.ops.push(format!("init_array_data {} {}", element, bytes.len()));
        }
        fn dup(&mut self) {
            self.ops.push("dup".to_string());
        }
        fn pop(&mut self) {
            self.ops.push("pop".to_string());
        }
        fn ret(&mut self) {
            self.ops.push("ret".to_string());
        }
        fn branch(&mut self, target: Label) {
            self.ops.push(format!("branch {:?}", target));
        }
        fn branch_if_false(&mut self, target: Label) {
            self.ops.push(format!("branch_if_false {:?}", target));
        }
        fn mark_label(&mut self, label: Label) {
            self.ops.push(format!("mark_label {:?}", label));
        }
        fn new_label(&mut self) -> Label {
            let label = Label(self.next_label);
            self.next_label += 1;
            label
        }
        fn new_object(&mut self, ctor: types::MethodInfo) {
            self.ops.push(format!("new_object {}", ctor.name));
        }
        fn call(&mut self, method: types::MethodInfo, kind: CallKind) {
            self.ops.push(format!("call {} {:?}", method.name, kind));
        }
        fn call_static(&mut self, method: types::MethodInfo) {
            self.ops.push(format!("call_static {}", method.name));
        }
        fn call_runtime_convert(&mut self) {
            self.ops.push("call_runtime_convert".to_string());
        }
        fn call_runtime_evaluate(&mut self) {
            self.ops.push("call_runtime_evaluate".to_string());
        }
        fn push_cached_binding(&mut self, name: String) {
            self.ops.push(format!("push_cached_binding {}", name));
        }
        fn check_binding(&mut self) {
            self.ops.push("check_binding".to_string());
        }
        fn load_binding_value(&mut self) {
            self.ops.push("load_binding_value".to_string());
        }
        fn store_binding_value(&mut self) {
            self.ops.push("store_binding_value".to_string());
        }
        fn arith(&mut self, op: crate::emitter::instruction::ArithOp, code: types::TypeCode, checked: bool) {
            self.ops.push(format!("arith {:?} {:?} checked={}", op, code, checked));
        }
        fn box_value(&mut self, value_type: TypeRef) {
            self.ops.push(format!("box_value {}", value_type));
        }
        fn unbox(&mut self, value_type: TypeRef) {
            self.ops.push(format!("unbox {}", value_type));
        }
        fn castclass(&mut self, target: TypeRef) {
            self.ops.push(format!("castclass {}", target));
        }
        fn initobj(&mut self, value_type: TypeRef) {
            self.ops.push(format!("initobj {}", value_type));
        }
        fn ldtoken(&mut self, ty: TypeRef) {
            self.ops.push(format!("ldtoken {}", ty));
        }
        fn attach_custom_attribute(&mut self, name: String) {
            self.ops.push(format!("attach_custom_attribute {}", name));
        }
        fn begin_try(&mut self) {
            self.ops.push("begin_try".to_string());
        }
        fn begin_catch(&mut self, exception_type: TypeRef) {
            self.ops.push(format!("begin_catch {}", exception_type));
        }
        fn begin_finally(&mut self) {
            self.ops.push("begin_finally".to_string());
        }
        fn leave(&mut self, target: Label) {
            self.ops.push(format!("leave {:?}", target));
        }
        fn end_exception_region(&mut self) {
            self.ops.push("end_exception_region".to_string());
        }
        fn convert(&mut self, from: types::TypeCode, to: types::TypeCode, mode: ConvMode, source_unsigned: bool) {
            self.ops.push(format!("convert {:?}->{:?} {:?} unsigned={}", from, to, mode, source_unsigned));
        }
    }

    fn emitter() -> Emitter<RecordingBuilder> {
        Emitter::new(RecordingBuilder::default(), types::OBJECT.clone(), true, true)
    }

    #[test]
    fn scopes_resolve_inner_before_outer() {
        let mut e = emitter();
        e.begin_scope();
        e.alloc_local_variable("x", types::INT.clone());
        e.begin_scope();
        e.alloc_local_variable("y", types::INT.clone());
        assert!(e.resolve("x").is_some());
        assert!(e.resolve("y").is_some());
        e.end_scope();
        assert!(e.resolve("y").is_none());
        e.end_scope();
        e.finish();
    }

    #[test]
    #[should_panic]
    fn finish_panics_with_open_scope() {
        let mut e = emitter();
        e.begin_scope();
        e.finish();
    }

    #[test]
    fn generator_temporaries_become_fields() {
        let mut e = emitter();
        e.set_generator();
        let slot = e.alloc_local_temp(types::INT.clone(), true);
        assert!(matches!(slot, Slot::Field(_)));
    }

    #[test]
    #[should_panic]
    fn set_generator_after_allocation_panics() {
        let mut e = emitter();
        let _ = e.alloc_local_temp(types::INT.clone(), true);
        e.set_generator();
    }

    #[test]
    fn freed_temp_is_reused() {
        let mut e = emitter();
        let a = e.alloc_local_temp(types::INT.clone(), false);
        let index = match &a {
            Slot::Local(s) => s.index,
            _ => panic!("expected Local"),
        };
        e.free_local_temp(a);
        let b = e.alloc_local_temp(types::INT.clone(), false);
        assert!(matches!(b, Slot::Local(s) if s.index == index));
    }

    #[test]
    fn cached_const_is_materialized_once() {
        let mut e = emitter();
        let key = CacheKey::Other("\"hello\"".to_string());
        let slot1 = e.request_cached_const(key.clone(), types::STRING.clone(), |b| {
            b.push_const(Const::Str("hello".to_string()));
        });
        let slot2 = e.request_cached_const(key, types::STRING.clone(), |b| {
            b.push_const(Const::Str("hello".to_string()));
        });
        assert!(slot1.is_same_as(&slot2));
        let store_count = e.builder.ops.iter().filter(|op| op.starts_with("store_field")).count();
        assert_eq!(store_count, 1);
    }

    #[test]
    fn tail_return_outside_try_emits_ret_directly() {
        let mut e = emitter();
        e.emit_tail_return(false);
        assert_eq!(e.builder.ops.last().unwrap(), "ret");
    }

    #[test]
    fn tail_return_inside_try_leaves_to_epilogue() {
        let mut e = emitter();
        e.emit_tail_return(true);
        assert!(e.builder.ops.last().unwrap().starts_with("leave"));
        e.emit_function_epilogue();
        assert_eq!(e.builder.ops.last().unwrap(), "ret");
        assert!(e.builder.ops.iter().any(|op| op.starts_with("mark_label")));
    }
}
