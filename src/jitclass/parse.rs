//! Parser for surface type annotations such as `Dict[str, List[T]]`

use std::fmt::{Display, Formatter};

use fxhash::FxHashMap;
use log::trace;

use crate::class::ClassId;
use crate::error::{ErrorKind, JitResult};
use crate::failf;
use crate::idents::{Ident, Identifiers};
use crate::type_expr::{TypeExpr, TypeParam};
use crate::typemap::TypeMap;
use TokenKind as K;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    OpenBracket,
    CloseBracket,
    Comma,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            K::Ident => f.write_str("identifier"),
            K::OpenBracket => f.write_str("'['"),
            K::CloseBracket => f.write_str("']'"),
            K::Comma => f.write_str("','"),
            K::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: u32,
    pub len: u32,
}

pub fn lex_type_text(text: &str) -> JitResult<Vec<Token>> {
    let mut tokens = Vec::with_capacity(8);
    let mut chars = text.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        let single = |kind| Token { kind, start: pos as u32, len: 1 };
        match c {
            '[' => tokens.push(single(K::OpenBracket)),
            ']' => tokens.push(single(K::CloseBracket)),
            ',' => tokens.push(single(K::Comma)),
            c if c.is_whitespace() => {}
            c if c.is_alphabetic() || c == '_' => {
                let mut end = pos + c.len_utf8();
                while let Some((next_pos, next)) = chars.peek().copied() {
                    if next.is_alphanumeric() || next == '_' {
                        end = next_pos + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token { kind: K::Ident, start: pos as u32, len: (end - pos) as u32 });
            }
            other => {
                return failf!(
                    ErrorKind::Parse,
                    "Unexpected character '{other}' at {pos} in type '{text}'"
                );
            }
        }
    }
    tokens.push(Token { kind: K::Eof, start: text.len() as u32, len: 0 });
    Ok(tokens)
}

/// Names visible to a type annotation
pub struct TypeScope<'a> {
    pub idents: &'a Identifiers,
    pub params: &'a [TypeParam],
    /// The class the annotation appears in, if any
    pub own_name: Option<Ident>,
    pub classes: &'a FxHashMap<Ident, ClassId>,
    pub typemap: &'a TypeMap,
}

impl TypeScope<'_> {
    fn resolve_name(&self, name: &str, args: Vec<TypeExpr>) -> JitResult<TypeExpr> {
        if let Some(param) = self.params.iter().find(|p| p.name.as_str() == name) {
            if !args.is_empty() {
                return failf!(
                    ErrorKind::Parse,
                    "Type parameter {name} cannot take type arguments"
                );
            }
            return Ok(TypeExpr::Param(param.clone()));
        }
        let Some(ident) = self.idents.get(name) else {
            return failf!(ErrorKind::UnknownType, "No type named {name}");
        };
        if self.own_name == Some(ident) {
            return Ok(TypeExpr::OwnClass { args });
        }
        if let Some(class) = self.classes.get(&ident) {
            return Ok(TypeExpr::Class { class: *class, args });
        }
        if self.typemap.contains(ident) {
            return Ok(TypeExpr::Named { name: ident, args });
        }
        failf!(ErrorKind::UnknownType, "No type named {name}")
    }
}

struct Parser<'text, 'scope> {
    text: &'text str,
    tokens: Vec<Token>,
    cursor: usize,
    scope: &'scope TypeScope<'scope>,
}

impl<'text, 'scope> Parser<'text, 'scope> {
    fn make(text: &'text str, scope: &'scope TypeScope<'scope>) -> JitResult<Self> {
        let tokens = lex_type_text(text)?;
        Ok(Parser { text, tokens, cursor: 0, scope })
    }

    fn peek(&self) -> Token {
        self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if token.kind != K::Eof {
            self.cursor += 1;
        }
        token
    }

    fn token_text(&self, token: Token) -> &'text str {
        let start = token.start as usize;
        &self.text[start..start + token.len as usize]
    }

    fn expect(&mut self, kind: TokenKind) -> JitResult<Token> {
        let token = self.advance();
        if token.kind != kind {
            return failf!(
                ErrorKind::Parse,
                "Expected {kind} but got {} at {} in type '{}'",
                token.kind,
                token.start,
                self.text
            );
        }
        Ok(token)
    }

    fn expect_type_expression(&mut self) -> JitResult<TypeExpr> {
        let name_token = self.expect(K::Ident)?;
        let name = self.token_text(name_token);
        let args = if self.peek().kind == K::OpenBracket {
            self.advance();
            let args = self.expect_type_list(K::CloseBracket)?;
            if args.is_empty() {
                return failf!(ErrorKind::Parse, "Empty type argument list for {name}");
            }
            self.expect(K::CloseBracket)?;
            args
        } else {
            Vec::new()
        };
        trace!("parsed type name {name} with {} args", args.len());
        self.scope.resolve_name(name, args)
    }

    fn expect_type_list(&mut self, terminator: TokenKind) -> JitResult<Vec<TypeExpr>> {
        let mut list = Vec::new();
        if self.peek().kind == terminator {
            return Ok(list);
        }
        loop {
            list.push(self.expect_type_expression()?);
            if self.peek().kind == K::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(list)
    }
}

pub fn parse_type(text: &str, scope: &TypeScope) -> JitResult<TypeExpr> {
    let mut parser = Parser::make(text, scope)?;
    let expr = parser.expect_type_expression()?;
    parser.expect(K::Eof)?;
    Ok(expr)
}

/// Comma separated types, as written inside `Class[...]`
pub fn parse_type_list(text: &str, scope: &TypeScope) -> JitResult<Vec<TypeExpr>> {
    let mut parser = Parser::make(text, scope)?;
    let list = parser.expect_type_list(K::Eof)?;
    parser.expect(K::Eof)?;
    Ok(list)
}
