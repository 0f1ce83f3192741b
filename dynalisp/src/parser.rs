//! Parsing for the demo Scheme-like surface syntax (spec.md 6.3's
//! `IParser`): builds a nested `Sexpr` tree out of the scanner's tokens,
//! then lowers it into a `dynacore::ast::Ast`. Special forms
//! (`define`, `set!`, `begin`, `if`, `lambda`, `options`) get dedicated
//! lowering; anything else lowers to either an `Op` node (for the core's
//! arithmetic/bitwise/truth operators) or a `Container` call expression
//! tagged via `add_attribute`, mirroring how the teacher's `Parse` trait
//! (`core/src/parse.rs`) dispatches per syntactic form.

use crate::scanner::Token;
use dynacore::ast::scope::{LexicalScope, Symbol};
use dynacore::ast::{Ast, CastKind, FunctionNode, NodeId, NodeKind, OptionsOverrides, ParameterInfo};
use dynacore::binding::{FunctionTemplate, ParameterKind, TopLevel};
use dynacore::diagnostics::FilePosition;
use dynacore::error::CompileError;
use dynacore::language::{IParser, IScanner};
use dynacore::operator::{self, Value};
use dynacore::types::{self, TypeRef};
use std::rc::Rc;
use std::sync::Arc;

/// An unparsed-into-`Ast` s-expression. Bare tokens stay bare; `(...)` forms
/// become `List`.
#[derive(Clone, Debug, PartialEq)]
enum Sexpr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Symbol(String),
    List(Vec<Sexpr>),
}

fn read_sexpr(tokens: &[Token], pos: &mut usize) -> Result<Sexpr, CompileError> {
    let tok = tokens
        .get(*pos)
        .ok_or_else(|| CompileError::SyntaxError("unexpected end of input".to_string()))?;
    *pos += 1;
    match tok {
        Token::LParen => {
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    Some(Token::RParen) => {
                        *pos += 1;
                        return Ok(Sexpr::List(items));
                    }
                    Some(_) => items.push(read_sexpr(tokens, pos)?),
                    None => return Err(CompileError::SyntaxError("unterminated list".to_string())),
                }
            }
        }
        Token::RParen => Err(CompileError::SyntaxError("unexpected `)`".to_string())),
        Token::Int(n) => Ok(Sexpr::Int(*n)),
        Token::Float(f) => Ok(Sexpr::Float(*f)),
        Token::Str(s) => Ok(Sexpr::Str(s.clone())),
        Token::Bool(b) => Ok(Sexpr::Bool(*b)),
        Token::Symbol(s) => Ok(Sexpr::Symbol(s.clone())),
    }
}

fn read_program(tokens: &[Token]) -> Result<Vec<Sexpr>, CompileError> {
    let mut pos = 0;
    let mut forms = Vec::new();
    while pos < tokens.len() {
        forms.push(read_sexpr(tokens, &mut pos)?);
    }
    Ok(forms)
}

/// Which core `Operator` singleton a symbol names, if any.
fn lookup_operator(name: &str) -> Option<operator::OperatorRef> {
    match name {
        "+" => Some(operator::ADD.clone()),
        "-" => Some(operator::SUBTRACT.clone()),
        "*" => Some(operator::MULTIPLY.clone()),
        "/" => Some(operator::DIVIDE.clone()),
        "modulo" => Some(operator::MODULUS.clone()),
        "bitwise-and" => Some(operator::BITWISE_AND.clone()),
        "bitwise-or" => Some(operator::BITWISE_OR.clone()),
        "bitwise-xor" => Some(operator::BITWISE_XOR.clone()),
        "not" => Some(operator::LOGICAL_TRUTH.clone()),
        _ => None,
    }
}

/// Lowers a parsed `Sexpr` program into a `dynacore::ast::Ast`, threading a
/// `LexicalScope` chain and the top-level binding namespace the way the
/// core's own `Function`/`Variable` nodes expect.
struct Lowering<'a> {
    ast: Ast,
    source_name: Rc<str>,
    top_level: &'a Arc<TopLevel>,
}

const POS: FilePosition = FilePosition::START;

impl<'a> Lowering<'a> {
    fn new(source_name: Rc<str>, top_level: &'a Arc<TopLevel>) -> Self {
        Lowering { ast: Ast::new(), source_name: source_name.clone(), top_level }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.ast.alloc(kind, self.source_name.clone(), POS, POS)
    }

    fn lower_program(&mut self, forms: &[Sexpr], scope: &Rc<LexicalScope>) -> Result<NodeId, CompileError> {
        let root = self.alloc(NodeKind::Container);
        self.ast.set_scope(root, scope.clone());
        for form in forms {
            let child = self.lower(form, scope)?;
            self.ast
                .append_child(root, child)
                .map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        }
        self.ast.set_root(root);
        Ok(root)
    }

    fn lower(&mut self, sexpr: &Sexpr, scope: &Rc<LexicalScope>) -> Result<NodeId, CompileError> {
        match sexpr {
            Sexpr::Int(n) => Ok(self.alloc(NodeKind::Literal(Value::Long(*n)))),
            Sexpr::Float(f) => Ok(self.alloc(NodeKind::Literal(Value::Double(*f)))),
            Sexpr::Str(s) => Ok(self.alloc(NodeKind::Literal(Value::Str(Arc::new(s.clone()))))),
            Sexpr::Bool(b) => Ok(self.alloc(NodeKind::Literal(Value::Bool(*b)))),
            Sexpr::Symbol(name) => {
                let node = self.alloc(NodeKind::Variable(name.clone()));
                self.ast.set_scope(node, scope.clone());
                Ok(node)
            }
            Sexpr::List(items) => self.lower_list(items, scope),
        }
    }

    fn lower_list(&mut self, items: &[Sexpr], scope: &Rc<LexicalScope>) -> Result<NodeId, CompileError> {
        let head = items.first().ok_or_else(|| CompileError::SyntaxError("empty form `()`".to_string()))?;
        if let Sexpr::Symbol(name) = head {
            match name.as_str() {
                "define" => return self.lower_define(items, scope, false),
                "set!" => return self.lower_define(items, scope, true),
                "begin" => return self.lower_begin(&items[1..], scope),
                "if" => return self.lower_if(&items[1..], scope),
                "lambda" => return self.lower_lambda(&items[1..], scope),
                "options" => return self.lower_options(&items[1..], scope),
                _ => {}
            }
            if let Some(op) = lookup_operator(name) {
                return self.lower_op(op, &items[1..], scope);
            }
        }
        self.lower_call(items, scope)
    }

    fn lower_define(
        &mut self,
        items: &[Sexpr],
        scope: &Rc<LexicalScope>,
        reassignment: bool,
    ) -> Result<NodeId, CompileError> {
        let name = match items.get(1) {
            Some(Sexpr::Symbol(n)) => n.clone(),
            _ => return Err(CompileError::SyntaxError("expected a name to define/set!".to_string())),
        };
        let value_form = items
            .get(2)
            .ok_or_else(|| CompileError::SyntaxError(format!("`{name}` has no value")))?;

        if !reassignment && !scope.declares_locally(&name) {
            scope.declare(Symbol::new(name.clone(), types::ANY.clone(), false));
        }

        let target = self.alloc(NodeKind::Variable(name));
        self.ast.set_scope(target, scope.clone());
        let value = self.lower(value_form, scope)?;
        let assign = self.alloc(NodeKind::Assign);
        self.ast.append_child(assign, target).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        self.ast.append_child(assign, value).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        self.ast.set_scope(assign, scope.clone());
        Ok(assign)
    }

    fn lower_begin(&mut self, body: &[Sexpr], scope: &Rc<LexicalScope>) -> Result<NodeId, CompileError> {
        if body.is_empty() {
            return Err(CompileError::SyntaxError("`begin` needs at least one form".to_string()));
        }
        let block = self.alloc(NodeKind::Block);
        self.ast.set_scope(block, scope.clone());
        for form in body {
            let child = self.lower(form, scope)?;
            self.ast.append_child(block, child).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        }
        Ok(block)
    }

    fn lower_if(&mut self, parts: &[Sexpr], scope: &Rc<LexicalScope>) -> Result<NodeId, CompileError> {
        if parts.len() < 2 || parts.len() > 3 {
            return Err(CompileError::SyntaxError("`if` takes a condition, a then-branch, and an optional else-branch".to_string()));
        }
        let if_node = self.alloc(NodeKind::If);
        self.ast.set_scope(if_node, scope.clone());
        for part in parts {
            let child = self.lower(part, scope)?;
            self.ast.append_child(if_node, child).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        }
        Ok(if_node)
    }

    fn lower_lambda(&mut self, parts: &[Sexpr], scope: &Rc<LexicalScope>) -> Result<NodeId, CompileError> {
        let param_names = match parts.first() {
            Some(Sexpr::List(names)) => names
                .iter()
                .map(|n| match n {
                    Sexpr::Symbol(s) => Ok(s.clone()),
                    _ => Err(CompileError::SyntaxError("lambda parameters must be symbols".to_string())),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(CompileError::SyntaxError("`lambda` needs a parameter list".to_string())),
        };
        let body_forms = &parts[1..];
        if body_forms.is_empty() {
            return Err(CompileError::SyntaxError("`lambda` needs a body".to_string()));
        }

        let body_scope = LexicalScope::child_of(scope);
        let param_types: Vec<TypeRef> = param_names.iter().map(|_| types::ANY.clone()).collect();
        let template = FunctionTemplate::new(
            "lambda",
            param_names.clone(),
            param_types.clone(),
            param_names.len(),
            0,
            false,
            false,
            self.top_level.clone(),
        )?;

        let func = self.alloc(NodeKind::Function(FunctionNode {
            template: Rc::new(template),
            creates_closure: true,
            is_generator: false,
        }));
        self.ast.set_scope(func, body_scope.clone());

        for (name, ty) in param_names.iter().zip(param_types.iter()) {
            body_scope.declare(Symbol::new(name.clone(), ty.clone(), false));
            let param = self.alloc(NodeKind::Parameter(ParameterInfo {
                name: name.clone(),
                ty: ty.clone(),
                kind: ParameterKind::Normal,
            }));
            self.ast.set_scope(param, body_scope.clone());
            self.ast.append_child(func, param).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        }

        let body = if body_forms.len() == 1 {
            self.lower(&body_forms[0], &body_scope)?
        } else {
            self.lower_begin(body_forms, &body_scope)?
        };
        self.ast.append_child(func, body).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        Ok(func)
    }

    fn lower_options(&mut self, parts: &[Sexpr], scope: &Rc<LexicalScope>) -> Result<NodeId, CompileError> {
        let settings = match parts.first() {
            Some(Sexpr::List(pairs)) => pairs,
            _ => return Err(CompileError::SyntaxError("`options` needs a settings list".to_string())),
        };
        let mut overrides = OptionsOverrides::default();
        for pair in settings {
            if let Sexpr::List(kv) = pair {
                if let [Sexpr::Symbol(key), Sexpr::Bool(value)] = kv.as_slice() {
                    match key.as_str() {
                        "checked" => overrides.checked = Some(*value),
                        "promote-on-overflow" => overrides.promote_on_overflow = Some(*value),
                        "optimize" => overrides.optimize = Some(*value),
                        "debug" => overrides.debug = Some(*value),
                        "treat-warnings-as-errors" => overrides.treat_warnings_as_errors = Some(*value),
                        other => return Err(CompileError::SyntaxError(format!("unknown option `{other}`"))),
                    }
                    continue;
                }
            }
            return Err(CompileError::SyntaxError("each option is `(name #t|#f)`".to_string()));
        }

        let body_forms = &parts[1..];
        if body_forms.is_empty() {
            return Err(CompileError::SyntaxError("`options` needs a body".to_string()));
        }
        let node = self.alloc(NodeKind::Options(overrides));
        self.ast.set_scope(node, scope.clone());
        for form in body_forms {
            let child = self.lower(form, scope)?;
            self.ast.append_child(node, child).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        }
        Ok(node)
    }

    fn lower_op(
        &mut self,
        op: operator::OperatorRef,
        args: &[Sexpr],
        scope: &Rc<LexicalScope>,
    ) -> Result<NodeId, CompileError> {
        if args.is_empty() {
            return Err(CompileError::SyntaxError("operator needs at least one operand".to_string()));
        }
        let node = self.alloc(NodeKind::Op(op));
        self.ast.set_scope(node, scope.clone());
        for arg in args {
            let child = self.lower(arg, scope)?;
            self.ast.append_child(node, child).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        }
        Ok(node)
    }

    /// A call to a user-defined function: `(f a b)`. The core's node
    /// taxonomy has no dedicated `Call` kind (spec.md 3.3's non-goal "does
    /// not fix a surface syntax" extends to invocation), so this lowers to
    /// a `Container` tagged `call` -- `crate::interp` is what actually
    /// knows to special-case it.
    fn lower_call(&mut self, items: &[Sexpr], scope: &Rc<LexicalScope>) -> Result<NodeId, CompileError> {
        let node = self.alloc(NodeKind::Container);
        self.ast.set_scope(node, scope.clone());
        self.ast.add_attribute(node, "call", "true");
        for item in items {
            let child = self.lower(item, scope)?;
            self.ast.append_child(node, child).map_err(|e| CompileError::SyntaxError(e.to_string()))?;
        }
        Ok(node)
    }
}

/// Parses a full program's source text into a `dynacore::ast::Ast` rooted
/// at a top-level `Container`. Built from the scanner `create_parser`
/// handed it (spec.md 6.3), even though this particular scanner is
/// stateless -- a front end with a real lexer-level state (e.g. nested
/// string interpolation) would thread it through the same way.
pub struct LispParser<'a> {
    scanner: crate::scanner::LispScanner,
    top_level: &'a Arc<TopLevel>,
}

impl<'a> LispParser<'a> {
    pub fn new(scanner: crate::scanner::LispScanner, top_level: &'a Arc<TopLevel>) -> Self {
        LispParser { scanner, top_level }
    }
}

impl<'a> IParser<crate::scanner::LispScanner> for LispParser<'a> {
    fn parse(&mut self, source: &str, source_name: &str) -> Result<(Ast, NodeId), CompileError> {
        let tokens = self.scanner.scan(source)?;
        let forms = read_program(&tokens)?;
        let scope = LexicalScope::root();
        let mut lowering = Lowering::new(Rc::from(source_name), self.top_level);
        let root = lowering.lower_program(&forms, &scope)?;
        Ok((lowering.ast, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynacore::ast::NodeKind;

    fn parse(source: &str) -> (Ast, NodeId) {
        let top_level = TopLevel::new();
        let mut parser = LispParser::new(crate::scanner::LispScanner::default(), &top_level);
        parser.parse(source, "t.scm").unwrap()
    }

    #[test]
    fn parses_a_literal_program() {
        let (ast, root) = parse("42");
        let children = ast.children(root);
        assert_eq!(children.len(), 1);
        assert!(matches!(ast.kind(children[0]), NodeKind::Literal(Value::Long(42))));
    }

    #[test]
    fn parses_define_as_assign() {
        let (ast, root) = parse("(define x 5)");
        let assign = ast.children(root)[0];
        assert!(matches!(ast.kind(assign), NodeKind::Assign));
    }

    #[test]
    fn parses_arithmetic_as_op_node() {
        let (ast, root) = parse("(+ 1 2 3)");
        let op = ast.children(root)[0];
        assert!(matches!(ast.kind(op), NodeKind::Op(_)));
        assert_eq!(ast.children(op).len(), 3);
    }

    #[test]
    fn parses_a_call_as_a_tagged_container() {
        let (ast, root) = parse("(define f (lambda (x) x)) (f 1)");
        let call = ast.children(root)[1];
        assert!(matches!(ast.kind(call), NodeKind::Container));
        assert_eq!(ast.attributes(call).to_vec(), vec![("call".to_string(), "true".to_string())]);
    }

    #[test]
    fn parses_lambda_with_parameters() {
        let (ast, root) = parse("(lambda (x y) (+ x y))");
        let func = ast.children(root)[0];
        match ast.kind(func) {
            NodeKind::Function(f) => assert_eq!(f.template.param_names, vec!["x", "y"]),
            other => panic!("expected Function, got {other:?}"),
        }
        assert_eq!(ast.children(func).len(), 3);
    }

    #[test]
    fn rejects_an_unbalanced_program() {
        let top_level = TopLevel::new();
        let mut parser = LispParser::new(crate::scanner::LispScanner::default(), &top_level);
        let result = parser.parse("(+ 1 2", "t.scm");
        assert!(result.is_err());
    }
}
