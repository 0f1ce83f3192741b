//! Closure synthesis bookkeeping (spec.md 4.5). A closure is requested by a
//! function that has captured variables: the emitter synthesizes a nested
//! record type with one field per captured variable (plus an optional
//! `$parent` link to the enclosing closure), instantiates it at function
//! entry, and rewrites each captured reference to a [`ClosureCellSlot`].

use crate::emitter::slot::{ClosureCellSlot, PARENT_CLOSURE_FIELD};
use crate::types::TypeRef;
use std::collections::HashMap;

/// One level of closure nesting under construction.
#[derive(Debug, Default)]
pub struct ClosureFrame {
    /// Captured variable name -> its type, in capture order (this order
    /// becomes the synthesized type's field order).
    captures: Vec<(String, TypeRef)>,
    by_name: HashMap<String, usize>,
    has_parent: bool,
}

impl ClosureFrame {
    pub fn new(has_parent: bool) -> ClosureFrame {
        ClosureFrame {
            captures: Vec::new(),
            by_name: HashMap::new(),
            has_parent,
        }
    }

    pub fn has_parent(&self) -> bool {
        self.has_parent
    }

    /// Ensure `name` is captured by this frame, returning its field name.
    /// Idempotent: capturing the same name twice returns the same field.
    pub fn capture(&mut self, name: &str, ty: TypeRef) -> String {
        if let Some(&idx) = self.by_name.get(name) {
            return self.captures[idx].0.clone();
        }
        let field_name = format!("${}", name);
        let idx = self.captures.len();
        self.captures.push((field_name.clone(), ty));
        self.by_name.insert(name.to_string(), idx);
        field_name
    }

    /// Field declarations for the synthesized closure record, in order.
    /// `$parent` (if present) always comes first, matching the "outer
    /// closure instance passed as the inner constructor's `this`" wiring in
    /// spec.md 4.5.
    pub fn fields(&self) -> Vec<(String, TypeRef)> {
        let mut out = Vec::new();
        if self.has_parent {
            // The parent field's type is opaque to this frame (it's whatever
            // the enclosing closure's own synthesized type turns out to be);
            // callers substitute the real type once the outer frame is
            // finalized.
            out.push((PARENT_CLOSURE_FIELD.to_string(), crate::types::OBJECT.clone()));
        }
        out.extend(self.captures.iter().cloned());
        out
    }

    /// Build a [`ClosureCellSlot`] for a variable captured `depth` frames up
    /// (0 = this frame).
    pub fn slot_for(&self, name: &str, depth: u32, ty: TypeRef) -> Option<ClosureCellSlot> {
        self.by_name.get(name).map(|&idx| ClosureCellSlot {
            depth,
            field_name: self.captures[idx].0.clone(),
            ty,
        })
    }
}

/// Naming scheme for persisted closure/constant-cache helper types
/// (spec.md 6.4). Not used unless a host actually persists compiled output;
/// kept here because it's the natural place to document the convention.
pub fn closure_type_name(index: u32) -> String {
    format!("closure${}", index)
}

pub fn lambda_name(index: u32, hint: &str) -> String {
    format!("lambda${}{}", index, hint)
}

pub fn const_cache_name(index: u32) -> String {
    format!("const${}", index)
}

pub fn data_blob_name(index: u32, element_type_name: &str) -> String {
    format!("data${}_{}", index, element_type_name)
}

pub fn temp_name(index: u32) -> String {
    format!("tmp${}", index)
}
