//! Bindings, top-level namespaces, and function parameter normalization
//! (spec.md 3.5, 4.5 `MakeArguments`).

use crate::error::CompileError;
use crate::types::TypeRef;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A late-bound global's current value. `Unbound` until first assigned;
/// reading an `Unbound` binding is a runtime error (`UndefinedVariable`).
#[derive(Clone, Debug)]
pub enum BindingValue {
    Unbound,
    Object(Arc<dyn std::any::Any + Send + Sync>),
}

impl BindingValue {
    pub fn is_bound(&self) -> bool {
        !matches!(self, BindingValue::Unbound)
    }
}

/// Where a binding's name came from -- useful for diagnostics distinguishing
/// "redefining a builtin" from "plain reassignment".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BindingOrigin {
    UserDefined,
    Builtin,
}

/// A shared, mutable cell referenced by every use of a top-level name.
/// `value` gets its own lock (rather than relying on the dictionary's lock)
/// so that reads of *different* bindings never contend with each other --
/// the dictionary lock only has to be held while inserting a brand new name
/// (spec.md 5).
#[derive(Debug)]
pub struct Binding {
    pub name: String,
    pub origin: BindingOrigin,
    value: RwLock<BindingValue>,
}

impl Binding {
    fn new(name: impl Into<String>, origin: BindingOrigin) -> Arc<Binding> {
        Arc::new(Binding {
            name: name.into(),
            origin,
            value: RwLock::new(BindingValue::Unbound),
        })
    }

    pub fn get(&self) -> BindingValue {
        self.value.read().unwrap().clone()
    }

    pub fn set(&self, value: BindingValue) {
        *self.value.write().unwrap() = value;
    }

    pub fn is_bound(&self) -> bool {
        self.value.read().unwrap().is_bound()
    }
}

/// Thread-safe `name -> Binding` map. One per [`TopLevel`].
#[derive(Debug, Default)]
pub struct BindingDictionary {
    bindings: RwLock<HashMap<String, Arc<Binding>>>,
}

impl BindingDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the binding for `name`, creating one (as `Unbound`,
    /// `UserDefined`) if it doesn't exist yet.
    pub fn get_or_create(&self, name: &str) -> Arc<Binding> {
        if let Some(b) = self.bindings.read().unwrap().get(name) {
            return b.clone();
        }
        let mut bindings = self.bindings.write().unwrap();
        bindings
            .entry(name.to_string())
            .or_insert_with(|| Binding::new(name, BindingOrigin::UserDefined))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Binding>> {
        self.bindings.read().unwrap().get(name).cloned()
    }

    pub fn declare_builtin(&self, name: &str) -> Arc<Binding> {
        let mut bindings = self.bindings.write().unwrap();
        bindings
            .entry(name.to_string())
            .or_insert_with(|| Binding::new(name, BindingOrigin::Builtin))
            .clone()
    }
}

/// A thread's global namespace: one [`BindingDictionary`], shared across
/// threads that cooperate on the same namespace (spec.md 5).
#[derive(Debug, Default)]
pub struct TopLevel {
    pub bindings: BindingDictionary,
}

impl TopLevel {
    pub fn new() -> Arc<TopLevel> {
        Arc::new(TopLevel::default())
    }
}

thread_local! {
    static CURRENT_TOP_LEVEL: std::cell::RefCell<Vec<Arc<TopLevel>>> = std::cell::RefCell::new(Vec::new());
}

#[must_use]
pub struct TopLevelGuard {
    _private: (),
}

impl Drop for TopLevelGuard {
    fn drop(&mut self) {
        CURRENT_TOP_LEVEL.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub fn push_top_level(top: Arc<TopLevel>) -> TopLevelGuard {
    CURRENT_TOP_LEVEL.with(|stack| stack.borrow_mut().push(top));
    TopLevelGuard { _private: () }
}

pub fn current_top_level() -> Option<Arc<TopLevel>> {
    CURRENT_TOP_LEVEL.with(|stack| stack.borrow().last().cloned())
}

/// How a [`Parameter`](crate::ast::NodeKind::Parameter) is consumed when
/// normalizing a call's argument list.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    Normal,
    List,
    Dict,
}

/// Describes a function's call surface: its name, parameter names/types,
/// required/optional counts, and list/dict flags -- everything
/// [`FunctionTemplate::make_arguments`] needs to normalize a raw positional
/// argument array (spec.md 3.5, 4.5).
#[derive(Clone, Debug)]
pub struct FunctionTemplate {
    pub name: String,
    pub param_names: Vec<String>,
    pub param_types: Vec<TypeRef>,
    pub required: usize,
    pub optional: usize,
    pub has_list_param: bool,
    pub has_dict_param: bool,
    pub captured_top_level: Arc<TopLevel>,
}

impl FunctionTemplate {
    pub fn new(
        name: impl Into<String>,
        param_names: Vec<String>,
        param_types: Vec<TypeRef>,
        required: usize,
        optional: usize,
        has_list_param: bool,
        has_dict_param: bool,
        captured_top_level: Arc<TopLevel>,
    ) -> Result<FunctionTemplate, CompileError> {
        // Open Question 1 (SPEC_FULL.md): restrict the grammar rather than
        // guess at the wrapper-generation behavior the original left
        // unimplemented.
        if has_list_param && has_dict_param {
            return Err(CompileError::ConflictingParameterKinds);
        }
        Ok(FunctionTemplate {
            name: name.into(),
            param_names,
            param_types,
            required,
            optional,
            has_list_param,
            has_dict_param,
            captured_top_level,
        })
    }

    pub fn param_count(&self) -> usize {
        self.param_names.len()
    }

    fn fixed_count(&self) -> usize {
        self.param_count()
            - (self.has_list_param as usize)
            - (self.has_dict_param as usize)
    }

    /// Normalize a positional argument array against this template, per the
    /// 7-step algorithm in spec.md 4.5. `list_ctor`/`dict_ctor` build the
    /// language-provided list/dict parameter values; `defaults` supplies
    /// default values for any unset optional slots (tail-aligned: the last
    /// `defaults.len()` optional parameters get them, in order).
    pub fn make_arguments<T: Clone>(
        &self,
        mut args: Vec<T>,
        defaults: &[T],
        list_ctor: impl FnOnce(Vec<T>) -> T,
        dict_ctor: impl FnOnce() -> T,
        empty: T,
    ) -> Result<Vec<T>, CompileError> {
        let fixed_count = self.fixed_count();

        // 1. Too many positional args, and no list param to absorb them.
        if !self.has_list_param && args.len() > self.param_count() {
            return Err(CompileError::TooManyArguments);
        }
        // 2. Too few arguments to satisfy the required count.
        if args.len() < self.required {
            return Err(CompileError::TooFewArguments);
        }

        // 3/4. Output array, fixed positionals copied verbatim.
        let mut out: Vec<T> = vec![empty; self.param_count()];
        let copy_count = fixed_count.min(args.len());
        let remainder: Vec<T> = args.split_off(copy_count);
        for (i, arg) in args.into_iter().enumerate() {
            out[i] = arg;
        }

        let mut next_slot = fixed_count;

        // 5. Pack remaining positionals into the list parameter.
        if self.has_list_param {
            out[next_slot] = list_ctor(remainder);
            next_slot += 1;
        }
        // 6. Dict parameter starts empty (keyword-call merging is a
        // front-end concern layered on top of this normalization).
        if self.has_dict_param {
            out[next_slot] = dict_ctor();
        }

        // 7. Fill unset optional slots from the tail of `defaults`.
        let first_optional = self.required;
        let last_optional = fixed_count; // exclusive
        let mut default_idx = defaults.len();
        for slot in (first_optional..last_optional).rev() {
            if slot >= copy_count {
                if default_idx == 0 {
                    break;
                }
                default_idx -= 1;
                out[slot] = defaults[default_idx].clone();
            }
        }

        Ok(out)
    }
}
