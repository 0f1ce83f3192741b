//! Lexing for the minimal Scheme-like surface syntax (spec.md 6.3's
//! `IScanner`): turns source text into a flat token stream. Grounded in the
//! teacher's `nom`-based tokenizing style (`core/src/parse.rs`), but split
//! into its own stage since this front end keeps scanning and parsing
//! separate rather than fusing them the way the teacher's single-pass
//! combinators do.

use dynacore::error::CompileError;
use dynacore::language::IScanner;
use nom::{
    branch::alt,
    bytes::complete::{escaped, is_not, tag, take_while1},
    character::complete::{char, digit1, multispace1, none_of, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// One lexical unit. Atoms keep their raw text; `Symbol` covers everything
/// that isn't a paren, number, string, or boolean literal (including
/// operator names like `+` and keywords like `lambda` -- the parser decides
/// what a symbol means from context).
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Symbol(String),
}

fn lparen(input: &str) -> IResult<&str, Token> {
    value(Token::LParen, char('('))(input)
}

fn rparen(input: &str) -> IResult<&str, Token> {
    value(Token::RParen, char(')'))(input)
}

fn boolean(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Bool(true), tag("#t")),
        value(Token::Bool(false), tag("#f")),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('"'),
            opt(escaped(none_of("\"\\"), '\\', one_of("\"\\nrt"))),
            char('"'),
        ),
        |s: Option<&str>| Token::Str(s.unwrap_or("").to_string()),
    )(input)
}

fn float_literal(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
        |s: &str| s.parse::<f64>().map(Token::Float),
    )(input)
}

fn int_literal(input: &str) -> IResult<&str, Token> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| s.parse::<i64>().map(Token::Int))(input)
}

fn number(input: &str) -> IResult<&str, Token> {
    alt((float_literal, int_literal))(input)
}

fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != '"'
}

fn symbol(input: &str) -> IResult<&str, Token> {
    map(take_while1(is_symbol_char), |s: &str| Token::Symbol(s.to_string()))(input)
}

fn comment(input: &str) -> IResult<&str, ()> {
    value((), pair(char(';'), is_not("\n\r")))(input)
}

fn skip(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((value((), multispace1), comment))))(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((lparen, rparen, boolean, string_literal, number, symbol))(input)
}

fn tokens(input: &str) -> IResult<&str, Vec<Token>> {
    terminated(many0(preceded(skip, token)), skip)(input)
}

/// The tokenizer for the demo Scheme-like language. Stateless: `scan` can be
/// called repeatedly with different source.
#[derive(Default)]
pub struct LispScanner;

impl IScanner for LispScanner {
    type Token = Token;

    fn scan(&mut self, source: &str) -> Result<Vec<Token>, CompileError> {
        match tokens(source) {
            Ok((remaining, toks)) if remaining.trim().is_empty() => Ok(toks),
            Ok((remaining, _)) => Err(CompileError::SyntaxError(format!(
                "unconsumed input starting at {:?}",
                &remaining[..remaining.len().min(20)]
            ))),
            Err(e) => Err(CompileError::SyntaxError(format!("{e:?}"))),
        }
    }
}
