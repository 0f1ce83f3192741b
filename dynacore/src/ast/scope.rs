//! Lexical scopes and the symbols they bind (spec.md 3.2, 3.4).

use crate::emitter::slot::Slot;
use crate::types::TypeRef;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A declared name: its static type, whether it's read-only (spec.md 8,
/// property 11), and the [`Slot`] it ultimately resolves to once the
/// emitter has allocated storage for it. `slot` starts `None` and is filled
/// in during emission/interpretation setup.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub ty: TypeRef,
    pub is_read_only: bool,
    pub slot: RefCell<Option<Slot>>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: TypeRef, is_read_only: bool) -> Rc<Symbol> {
        Rc::new(Symbol {
            name: name.into(),
            ty,
            is_read_only,
            slot: RefCell::new(None),
        })
    }
}

/// A lexical scope: a name -> symbol map with a pointer to the enclosing
/// scope. Scopes form a tree via parent pointers only (no back-references),
/// so `Rc` is sufficient -- no cycle to worry about, unlike the AST itself.
#[derive(Debug)]
pub struct LexicalScope {
    parent: Option<Rc<LexicalScope>>,
    symbols: RefCell<HashMap<String, Rc<Symbol>>>,
}

impl LexicalScope {
    pub fn root() -> Rc<LexicalScope> {
        Rc::new(LexicalScope {
            parent: None,
            symbols: RefCell::new(HashMap::new()),
        })
    }

    pub fn child_of(parent: &Rc<LexicalScope>) -> Rc<LexicalScope> {
        Rc::new(LexicalScope {
            parent: Some(parent.clone()),
            symbols: RefCell::new(HashMap::new()),
        })
    }

    pub fn parent(&self) -> Option<&Rc<LexicalScope>> {
        self.parent.as_ref()
    }

    /// Declare `symbol` in this scope, shadowing any outer declaration of the
    /// same name. Returns the previous local (not outer) declaration, if any,
    /// which callers use to detect illegal redeclaration within one scope.
    pub fn declare(&self, symbol: Rc<Symbol>) -> Option<Rc<Symbol>> {
        self.symbols.borrow_mut().insert(symbol.name.clone(), symbol)
    }

    /// Resolve `name`, searching outward through enclosing scopes.
    pub fn resolve(&self, name: &str) -> Option<Rc<Symbol>> {
        if let Some(sym) = self.symbols.borrow().get(name) {
            return Some(sym.clone());
        }
        self.parent.as_ref().and_then(|p| p.resolve(name))
    }

    /// True if `name` is declared directly in this scope (not an ancestor).
    pub fn declares_locally(&self, name: &str) -> bool {
        self.symbols.borrow().contains_key(name)
    }
}
