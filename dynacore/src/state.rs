//! [`CompilerState`] (spec.md 3.6): process-wide policy plus a per-thread
//! push/pop stack, and the scoped RAII guard that gives `Options` nodes their
//! exception-safe push/pop discipline (spec.md 5, Design Notes 9).

use crate::diagnostics::MessageSink;
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Policy flags a host `Language` can tune, loadable from JSON/TOML via
/// `serde` so embedding hosts don't have to hand-construct `CompilerState`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub checked: bool,
    pub promote_on_overflow: bool,
    pub optimize: bool,
    pub debug: bool,
    pub treat_warnings_as_errors: bool,
    /// Language-specific extension flags (e.g. `allow_redefinition`,
    /// `optimistic_operator_inlining`), keyed by name so the core doesn't
    /// need to know about every front end's policy surface.
    #[serde(flatten)]
    pub extensions: HashMap<String, bool>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            checked: false,
            promote_on_overflow: false,
            optimize: true,
            debug: false,
            treat_warnings_as_errors: false,
            extensions: HashMap::new(),
        }
    }
}

impl CompilerOptions {
    pub fn extension(&self, name: &str) -> bool {
        self.extensions.get(name).copied().unwrap_or(false)
    }
}

/// Process-wide compiler state: the active language name, diagnostic sink,
/// and policy flags. One is pushed per `Options` node, per function
/// evaluation, and per interpreter frame (spec.md 5).
#[derive(Debug)]
pub struct CompilerState {
    pub language_name: String,
    pub options: CompilerOptions,
    pub messages: RefCell<MessageSink>,
}

impl CompilerState {
    pub fn new(language_name: impl Into<String>, options: CompilerOptions) -> Arc<CompilerState> {
        Arc::new(CompilerState {
            language_name: language_name.into(),
            options,
            messages: RefCell::new(MessageSink::new()),
        })
    }

    /// Derive a child state that inherits this one's options and language,
    /// but gets its own message sink (matches `Language::create_compiler_state(parent)`
    /// in spec.md 6.3).
    pub fn derive(parent: &CompilerState) -> Arc<CompilerState> {
        CompilerState::new(parent.language_name.clone(), parent.options.clone())
    }
}

thread_local! {
    static STATE_STACK: RefCell<Vec<Arc<CompilerState>>> = RefCell::new(Vec::new());
}

/// Push `state` onto this thread's stack and return a guard. Dropping the
/// guard pops it back off, even on an early return or panic unwind -- the
/// "scoped-resource construct" Design Notes 9 asks for, so an `Options` node
/// can never leak a pushed state on an error exit.
#[must_use]
pub struct CompilerStateGuard {
    _private: (),
}

impl Drop for CompilerStateGuard {
    fn drop(&mut self) {
        STATE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub fn push(state: Arc<CompilerState>) -> CompilerStateGuard {
    STATE_STACK.with(|stack| stack.borrow_mut().push(state));
    CompilerStateGuard { _private: () }
}

/// The innermost `CompilerState` on this thread's stack, if any.
pub fn current() -> Option<Arc<CompilerState>> {
    STATE_STACK.with(|stack| stack.borrow().last().cloned())
}
