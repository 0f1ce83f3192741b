//! The typed AST arena (spec.md 3.2, 4.2, capability C2). Nodes live in a
//! single [`Ast`] arena and are addressed by [`NodeId`]; this sidesteps the
//! parent/child/sibling reference cycles a pointer-based tree would need
//! `Rc`+`Weak`+`RefCell` gymnastics for.

pub mod flags;
pub mod scope;

use crate::binding::{FunctionTemplate, ParameterKind};
use crate::diagnostics::{DiagnosticCode, FilePosition, OutputMessage};
use crate::error::CompileTimeException;
use crate::operator::{OperatorRef, Value};
use crate::state::{self, CompilerOptions};
use crate::types::{self, TypeRef};
use flags::NodeFlags;
use scope::LexicalScope;
use std::rc::Rc;

/// An index into an [`Ast`] arena. Only meaningful relative to the arena
/// that produced it; mixing ids from two different `Ast`s is a programming
/// error the arena has no way to detect, the same tradeoff any arena-backed
/// tree makes in exchange for not needing `Rc<RefCell<_>>` everywhere.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// The conversion strength a `Cast` node requests (spec.md 4.1): which of
/// `emit_safe_conversion` / `emit_unsafe_conversion` / `emit_runtime_conversion`
/// a code generator should reach for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CastKind {
    Safe,
    Unsafe,
    Runtime,
}

/// Per-instance data for a `Parameter` node (spec.md 3.3). The default
/// value, if any, is the node's sole child.
#[derive(Clone, Debug)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: TypeRef,
    pub kind: ParameterKind,
}

/// Overrides an `Options` node applies to the `CompilerState` it pushes for
/// its body (spec.md 3.6). `None` fields inherit the enclosing state's
/// current value.
#[derive(Clone, Debug, Default)]
pub struct OptionsOverrides {
    pub checked: Option<bool>,
    pub promote_on_overflow: Option<bool>,
    pub optimize: Option<bool>,
    pub debug: Option<bool>,
    pub treat_warnings_as_errors: Option<bool>,
}

impl OptionsOverrides {
    /// Apply these overrides on top of `base`, producing the options for
    /// the state this node pushes for its body.
    pub fn apply(&self, base: &CompilerOptions) -> CompilerOptions {
        CompilerOptions {
            checked: self.checked.unwrap_or(base.checked),
            promote_on_overflow: self.promote_on_overflow.unwrap_or(base.promote_on_overflow),
            optimize: self.optimize.unwrap_or(base.optimize),
            debug: self.debug.unwrap_or(base.debug),
            treat_warnings_as_errors: self
                .treat_warnings_as_errors
                .unwrap_or(base.treat_warnings_as_errors),
            extensions: base.extensions.clone(),
        }
    }
}

/// Everything a `Function` node needs beyond its children (spec.md 3.3,
/// 3.5). Children are `[..parameters, body]`.
#[derive(Clone, Debug)]
pub struct FunctionNode {
    pub template: Rc<FunctionTemplate>,
    pub creates_closure: bool,
    pub is_generator: bool,
}

/// The closed node-kind taxonomy (spec.md 3.3). `Ast` itself only enforces
/// the leaf/container distinction; per-kind arity (e.g. `Op`'s child count
/// matching `operator.arity`) is `CheckSemantics`'s job once scope and type
/// information are available.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Leaf. A compile-time constant value.
    Literal(Value),
    /// Leaf. Resolved against the node's effective `LexicalScope` by name.
    Variable(String),
    /// `[target, value]`. The target's context is always `Unknown` -- it
    /// isn't read, only addressed.
    Assign,
    /// An ordered statement list; the last child is the block's value.
    Block,
    /// `[condition, then, else]`.
    If,
    /// Operand children, one per operator argument.
    Op(OperatorRef),
    /// `[operand]`.
    Cast(CastKind),
    /// `[..parameters, body]`.
    Function(FunctionNode),
    /// Leaf, or `[default_value]` if the parameter is optional.
    Parameter(ParameterInfo),
    /// Pushes a derived `CompilerState` for its body on entry (spec.md 3.6).
    Options(OptionsOverrides),
    /// Non-executable grouping (a top-level program, a literal sequence's
    /// element list, ...).
    Container,
}

impl NodeKind {
    /// Leaf kinds reject `append_child` outright (spec.md 3.2, "read-only
    /// empty collection for leaf nodes").
    fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Literal(_) | NodeKind::Variable(_))
    }
}

struct NodeData {
    parent: Option<NodeId>,
    index_in_parent: usize,
    children: Vec<NodeId>,
    kind: NodeKind,
    source_name: Rc<str>,
    start: FilePosition,
    end: FilePosition,
    scope: Option<Rc<LexicalScope>>,
    flags: NodeFlags,
    value_type: Option<TypeRef>,
    context_type: Option<TypeRef>,
    attributes: Vec<(String, String)>,
}

/// The arena owning every node of one compilation unit's tree.
#[derive(Default)]
pub struct Ast {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Ast {
        Ast { nodes: Vec::new(), root: None }
    }

    /// Allocate a new, parentless node.
    pub fn alloc(
        &mut self,
        kind: NodeKind,
        source_name: Rc<str>,
        start: FilePosition,
        end: FilePosition,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            parent: None,
            index_in_parent: 0,
            children: Vec::new(),
            kind,
            source_name,
            start,
            end,
            scope: None,
            flags: NodeFlags::empty(),
            value_type: None,
            context_type: None,
            attributes: Vec::new(),
        });
        id
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Overwrite a node's kind in place, e.g. when a `PrefixProcessor`
    /// rewrites a `Variable` into a resolved `Literal` after constant
    /// propagation. Does not touch children or links.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.node_mut(id).kind = kind;
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn index_in_parent(&self, id: NodeId) -> usize {
        self.node(id).index_in_parent
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let data = self.node(id);
        let parent = data.parent?;
        let idx = data.index_in_parent;
        if idx == 0 {
            None
        } else {
            Some(self.node(parent).children[idx - 1])
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let data = self.node(id);
        let parent = data.parent?;
        let idx = data.index_in_parent;
        self.node(parent).children.get(idx + 1).copied()
    }

    pub fn position(&self, id: NodeId) -> (FilePosition, FilePosition) {
        let data = self.node(id);
        (data.start, data.end)
    }

    pub fn source_name(&self, id: NodeId) -> Rc<str> {
        self.node(id).source_name.clone()
    }

    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.node(id).flags
    }

    pub fn set_flag(&mut self, id: NodeId, flag: NodeFlags, value: bool) {
        self.node_mut(id).flags.set(flag, value);
    }

    pub fn value_type(&self, id: NodeId) -> Option<TypeRef> {
        self.node(id).value_type.clone()
    }

    pub fn set_value_type(&mut self, id: NodeId, ty: TypeRef) {
        self.node_mut(id).value_type = Some(ty);
    }

    pub fn context_type(&self, id: NodeId) -> Option<TypeRef> {
        self.node(id).context_type.clone()
    }

    pub fn set_context_type(&mut self, id: NodeId, ty: TypeRef) {
        self.node_mut(id).context_type = Some(ty);
    }

    /// The scope locally attached to `id`, if any -- no ancestor walk. Use
    /// [`Ast::scope`] for the "nearest ancestor" lookup spec.md 3.2 actually
    /// specifies for node-to-scope resolution.
    pub fn local_scope(&self, id: NodeId) -> Option<Rc<LexicalScope>> {
        self.node(id).scope.clone()
    }

    pub fn set_scope(&mut self, id: NodeId, scope: Rc<LexicalScope>) {
        self.node_mut(id).scope = Some(scope);
    }

    /// `id`'s own scope, or its nearest ancestor's if none is locally set
    /// (spec.md 3.2).
    pub fn scope(&self, id: NodeId) -> Option<Rc<LexicalScope>> {
        let mut cur = Some(id);
        while let Some(node_id) = cur {
            if let Some(scope) = self.node(node_id).scope.clone() {
                return Some(scope);
            }
            cur = self.node(node_id).parent;
        }
        None
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        &self.node(id).attributes
    }

    pub fn add_attribute(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        self.node_mut(id).attributes.push((key.into(), value.into()));
    }

    /// Append `child` as the new last child of `parent`. Rejects leaf
    /// parents and re-parenting an already-owned node (spec.md 4.2).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), CompileTimeException> {
        if self.node(parent).kind.is_leaf() {
            return Err(CompileTimeException::Internal(format!(
                "cannot append a child to leaf node {:?}",
                self.node(parent).kind
            )));
        }
        if self.node(child).parent.is_some() {
            return Err(CompileTimeException::Internal(
                "node is already owned by a parent; re-parenting is not allowed".to_string(),
            ));
        }
        let index = self.node(parent).children.len();
        self.node_mut(child).parent = Some(parent);
        self.node_mut(child).index_in_parent = index;
        self.node_mut(parent).children.push(child);
        Ok(())
    }

    /// Replace the child at `old`'s position with `new`, O(1) given `old`'s
    /// index (spec.md 4.2).
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), CompileTimeException> {
        let parent = self
            .node(old)
            .parent
            .ok_or_else(|| CompileTimeException::Internal("cannot replace the root node".to_string()))?;
        if self.node(new).parent.is_some() {
            return Err(CompileTimeException::Internal(
                "replacement node is already owned by a parent".to_string(),
            ));
        }
        let index = self.node(old).index_in_parent;
        self.node_mut(old).parent = None;
        self.node_mut(new).parent = Some(parent);
        self.node_mut(new).index_in_parent = index;
        self.node_mut(parent).children[index] = new;
        if self.root == Some(old) {
            self.root = Some(new);
        }
        Ok(())
    }

    /// Remove `id` from its parent's child list, reindexing every later
    /// sibling.
    pub fn remove(&mut self, id: NodeId) -> Result<(), CompileTimeException> {
        let parent = self
            .node(id)
            .parent
            .ok_or_else(|| CompileTimeException::Internal("cannot remove the root node".to_string()))?;
        let index = self.node(id).index_in_parent;
        self.node_mut(parent).children.remove(index);
        self.node_mut(id).parent = None;
        self.node_mut(id).index_in_parent = 0;
        let tail: Vec<NodeId> = self.node(parent).children[index..].to_vec();
        for (offset, sibling) in tail.into_iter().enumerate() {
            self.node_mut(sibling).index_in_parent = index + offset;
        }
        Ok(())
    }

    /// Walk the parent chain (not including `id`), returning the first
    /// ancestor whose kind matches `predicate`.
    pub fn get_ancestor(&self, id: NodeId, mut predicate: impl FnMut(&NodeKind) -> bool) -> Option<NodeId> {
        let mut cur = self.node(id).parent;
        while let Some(node_id) = cur {
            if predicate(&self.node(node_id).kind) {
                return Some(node_id);
            }
            cur = self.node(node_id).parent;
        }
        None
    }

    /// Depth-first, document-order descendants of `id` (not including `id`)
    /// matching `predicate`.
    pub fn get_descendants(&self, id: NodeId, mut predicate: impl FnMut(&NodeKind) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut predicate, &mut out);
        out
    }

    fn collect_descendants(
        &self,
        id: NodeId,
        predicate: &mut impl FnMut(&NodeKind) -> bool,
        out: &mut Vec<NodeId>,
    ) {
        for &child in &self.node(id).children {
            if predicate(&self.node(child).kind) {
                out.push(child);
            }
            self.collect_descendants(child, predicate, out);
        }
    }

    /// Default: set `IsTail` and recurse with `false` for every child.
    /// Control-flow-producing kinds override this (spec.md 4.2):
    /// `Block`/`Options` propagate only to their last child, `If` to both
    /// branches, `Function` always marks its body tail-true in its own new
    /// frame regardless of the incoming flag.
    pub fn mark_tail(&mut self, id: NodeId, tail: bool) {
        self.set_flag(id, NodeFlags::TAIL, tail);
        let children = self.children(id).to_vec();
        match self.kind(id).clone() {
            NodeKind::Block => self.mark_tail_last_only(&children, tail),
            NodeKind::Options(overrides) => {
                let _guard = state::current().map(|base| {
                    let derived = state::CompilerState::new(base.language_name.clone(), overrides.apply(&base.options));
                    state::push(derived)
                });
                self.mark_tail_last_only(&children, tail);
            }
            NodeKind::If => {
                let mut iter = children.iter();
                if let Some(&cond) = iter.next() {
                    self.mark_tail(cond, false);
                }
                for &branch in iter {
                    self.mark_tail(branch, tail);
                }
            }
            NodeKind::Function(_) => {
                if let Some((&body, params)) = children.split_last() {
                    for &p in params {
                        self.mark_tail(p, false);
                    }
                    self.mark_tail(body, true);
                }
            }
            _ => {
                for &c in &children {
                    self.mark_tail(c, false);
                }
            }
        }
    }

    fn mark_tail_last_only(&mut self, children: &[NodeId], tail: bool) {
        if let Some((&last, rest)) = children.split_last() {
            for &c in rest {
                self.mark_tail(c, false);
            }
            self.mark_tail(last, tail);
        }
    }

    /// Default: store `desired` as `ContextType` and propagate this node's
    /// `ValueType` (or `desired`, if not yet known) to every child. `Assign`
    /// overrides this so its target receives `Unknown` -- it is addressed,
    /// not read (spec.md 4.2). `Parameter` contextualizes its default-value
    /// child against its own declared type, not the parent's request.
    pub fn set_value_context(&mut self, id: NodeId, desired: TypeRef) {
        self.set_context_type(id, desired.clone());
        let children = self.children(id).to_vec();
        match self.kind(id).clone() {
            NodeKind::Assign => {
                if let [target, value] = children.as_slice() {
                    self.set_value_context(*target, types::UNKNOWN.clone());
                    let value_ctx = self.value_type(id).unwrap_or(desired);
                    self.set_value_context(*value, value_ctx);
                }
            }
            NodeKind::Parameter(info) => {
                for &c in &children {
                    self.set_value_context(c, info.ty.clone());
                }
            }
            _ => {
                let propagate = self.value_type(id).unwrap_or(desired);
                for &c in &children {
                    self.set_value_context(c, propagate.clone());
                }
            }
        }
    }

    /// Prefix check (spec.md 4.2): `ContextType` and `Scope` must be set,
    /// and `ValueType` must be convertible to `ContextType` unless
    /// `ContextType` is `Any` on a non-void-producing node.
    pub fn check_semantics(&self, id: NodeId, treat_warnings_as_errors: bool) -> Vec<OutputMessage> {
        let mut out = Vec::new();
        let source_name = self.source_name(id);
        let (start, _) = self.position(id);
        let ctx = self.context_type(id);
        if ctx.is_none() {
            out.push(DiagnosticCode::InternalCompilerError.to_message(
                treat_warnings_as_errors,
                source_name.as_ref(),
                start,
                &["node reached CheckSemantics with no ContextType".to_string()],
            ));
        }
        if self.scope(id).is_none() {
            out.push(DiagnosticCode::InternalCompilerError.to_message(
                treat_warnings_as_errors,
                source_name.as_ref(),
                start,
                &["node reached CheckSemantics with no reachable Scope".to_string()],
            ));
        }
        if let (Some(ctx), Some(value_type)) = (ctx, self.value_type(id)) {
            let produces_void = value_type == *types::VOID;
            let exempt = ctx == *types::ANY && !produces_void;
            if !exempt && !crate::conversion::has_implicit_conversion(&value_type, &ctx) {
                let code = if produces_void {
                    DiagnosticCode::ExpectedValue
                } else {
                    DiagnosticCode::CannotConvertType
                };
                let args = if produces_void {
                    Vec::new()
                } else {
                    vec![value_type.name().to_string(), ctx.name().to_string()]
                };
                out.push(code.to_message(treat_warnings_as_errors, source_name.as_ref(), start, &args));
            }
        }
        out
    }

    /// Postfix check (spec.md 4.2): computes `IsConstant` bottom-up and
    /// flags late errors -- writes to read-only variables, self-assignment.
    pub fn check_semantics2(&mut self, id: NodeId, treat_warnings_as_errors: bool) -> Vec<OutputMessage> {
        let mut out = Vec::new();
        let source_name = self.source_name(id);
        let (start, _) = self.position(id);
        let kind = self.kind(id).clone();
        let children = self.children(id).to_vec();

        let is_constant = match &kind {
            NodeKind::Literal(_) => true,
            NodeKind::Op(_) | NodeKind::Cast(_) | NodeKind::Block | NodeKind::If | NodeKind::Container => {
                children.iter().all(|&c| self.flags(c).contains(NodeFlags::CONSTANT))
            }
            _ => false,
        };
        self.set_flag(id, NodeFlags::CONSTANT, is_constant);

        if let NodeKind::Assign = kind {
            if let [target, value] = children.as_slice() {
                if let NodeKind::Variable(name) = self.kind(*target).clone() {
                    if let Some(symbol) = self.scope(*target).and_then(|s| s.resolve(&name)) {
                        if symbol.is_read_only {
                            out.push(DiagnosticCode::ReadOnlyVariableAssigned.to_message(
                                treat_warnings_as_errors,
                                source_name.as_ref(),
                                start,
                                &[name.clone()],
                            ));
                        }
                        if let NodeKind::Variable(value_name) = self.kind(*value).clone() {
                            if value_name == name {
                                if let Some(value_symbol) = self.scope(*value).and_then(|s| s.resolve(&value_name)) {
                                    if Rc::ptr_eq(&symbol, &value_symbol) {
                                        out.push(DiagnosticCode::VariableAssignedToSelf.to_message(
                                            treat_warnings_as_errors,
                                            source_name.as_ref(),
                                            start,
                                            &[],
                                        ));
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        out
    }
}
