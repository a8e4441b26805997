//! Declaration text parser.
//!
//! ```text
//! decl   := entry*                 a lone top-level `{ ... }` is unwrapped
//! entry  := [ident ':'] type
//! type   := base suffix*
//! base   := ident | number | '{' decl '}'
//! suffix := '[' number ']' | '(' number ')'
//! ```
//!
//! Integer types are `u<N>`/`i<N>` with an optional `b` (big-endian) or `l`
//! (little-endian) suffix. `Bytes[N]`, `bytes[N]`, `Bytes(N)` and a bare `N`
//! declare raw byte fields. Any other suffixed type becomes an array.

use std::rc::Rc;

use crate::{
    errors::CompileError,
    layout::Layout,
    types::{ByteOrder, TypeDescriptor},
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Number(usize),
    Open(char),
    Close(char),
    Colon,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    text: String,
    position: usize,
}

fn syntax(message: &'static str, token: &str, position: usize) -> CompileError {
    CompileError::Syntax {
        message,
        token: token.to_string(),
        position,
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            TokenKind::Ident(source[start..end].to_string())
        } else if c.is_ascii_digit() {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                end = i + 1;
                chars.next();
            }
            let text = &source[start..end];
            let value = text
                .parse::<usize>()
                .map_err(|_| syntax("number too large", text, start))?;
            TokenKind::Number(value)
        } else {
            chars.next();
            match c {
                '{' | '[' | '(' => TokenKind::Open(c),
                '}' | ']' | ')' => TokenKind::Close(c),
                ':' => TokenKind::Colon,
                _ => return Err(syntax("invalid character", &c.to_string(), start)),
            }
        };

        let end = chars.peek().map_or(source.len(), |&(i, _)| i);
        tokens.push(Token {
            kind,
            text: source[start..end].trim_end().to_string(),
            position: start,
        });
    }

    Ok(tokens)
}

fn closing(open: char) -> char {
    match open {
        '{' => '}',
        '[' => ']',
        _ => ')',
    }
}

/// What a base token resolved to before its suffixes are applied.
enum Base {
    Type(TypeDescriptor),
    /// `Bytes` / `bytes`, which needs a length suffix.
    Bytes,
}

/// Deepest allowed nesting of `{ ... }` structs.
const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Byte length of the source, used as the position of end-of-input errors.
    end: usize,
    /// Number of `{` currently open.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eof(&self, message: &'static str) -> CompileError {
        syntax(message, "", self.end)
    }

    /// Parses entries until end of input (`open == None`) or the `}` matching
    /// the `{` at `open`.
    fn entries(
        &mut self,
        open: Option<&Token>,
    ) -> Result<Vec<(Option<String>, TypeDescriptor)>, CompileError> {
        let mut entries = Vec::new();

        loop {
            match self.peek() {
                None => match open {
                    Some(open) => return Err(syntax("unclosed bracket", &open.text, open.position)),
                    None => break,
                },
                Some(Token {
                    kind: TokenKind::Close(c),
                    text,
                    position,
                }) => {
                    if open.is_some() && *c == '}' {
                        self.pos += 1;
                        break;
                    }
                    return Err(syntax("unexpected closing bracket", text, *position));
                }
                Some(_) => entries.push(self.entry()?),
            }
        }

        Ok(entries)
    }

    fn entry(&mut self) -> Result<(Option<String>, TypeDescriptor), CompileError> {
        let named = matches!(
            (self.peek_kind(0), self.peek_kind(1)),
            (Some(TokenKind::Ident(_)), Some(TokenKind::Colon))
        );

        let name = if named {
            let name = self.next().map(|t| t.text);
            self.pos += 1;
            name
        } else {
            None
        };

        if let Some(Token {
            kind: TokenKind::Colon,
            text,
            position,
        }) = self.peek()
        {
            return Err(syntax("expected a field name before ':'", text, *position));
        }

        let ty = self.ty()?;
        Ok((name, ty))
    }

    fn ty(&mut self) -> Result<TypeDescriptor, CompileError> {
        let token = self.next().ok_or_else(|| self.eof("expected a type"))?;

        let mut base = match &token.kind {
            TokenKind::Ident(name) => named_type(name)?,
            TokenKind::Number(len) => Base::Type(TypeDescriptor::bytes(*len)),
            TokenKind::Open('{') => {
                if self.depth >= MAX_DEPTH {
                    return Err(syntax("nesting too deep", &token.text, token.position));
                }
                self.depth += 1;
                let entries = self.entries(Some(&token))?;
                self.depth -= 1;
                Base::Type(TypeDescriptor::structure(Layout::compile(entries)?))
            }
            _ => return Err(syntax("expected a type", &token.text, token.position)),
        };

        while let Some(TokenKind::Open(open @ ('[' | '('))) = self.peek_kind(0) {
            let open = *open;
            let open_token = self.next().ok_or_else(|| self.eof("expected a type"))?;

            let count = match self.next() {
                Some(Token {
                    kind: TokenKind::Number(n),
                    ..
                }) => n,
                Some(other) => {
                    return Err(syntax("expected an element count", &other.text, other.position));
                }
                None => return Err(self.eof("expected an element count")),
            };

            match self.next() {
                Some(Token {
                    kind: TokenKind::Close(c),
                    ..
                }) if c == closing(open) => {}
                Some(other) => {
                    return Err(syntax("mismatched brackets", &other.text, other.position));
                }
                None => {
                    return Err(syntax("unclosed bracket", &open_token.text, open_token.position));
                }
            }

            base = match base {
                Base::Bytes => Base::Type(TypeDescriptor::bytes(count)),
                Base::Type(element) => Base::Type(TypeDescriptor::array(element, count)?),
            };
        }

        match base {
            Base::Type(ty) => Ok(ty),
            Base::Bytes => Err(syntax("Bytes needs a length", &token.text, token.position)),
        }
    }
}

/// Resolves a type name: `u8`..`u64`, `i8`..`i64` with `b`/`l` suffixes, the
/// `byte`/`char` aliases and `Bytes`/`bytes`.
fn named_type(name: &str) -> Result<Base, CompileError> {
    match name {
        "Bytes" | "bytes" => return Ok(Base::Bytes),
        "byte" => return Ok(Base::Type(TypeDescriptor::UInt { bits: 8, order: ByteOrder::Little })),
        "char" => return Ok(Base::Type(TypeDescriptor::Int { bits: 8, order: ByteOrder::Little })),
        _ => {}
    }

    let unsupported = || CompileError::UnsupportedType(name.to_string());

    let (signed, rest) = match name.split_at_checked(1) {
        Some(("u", rest)) => (false, rest),
        Some(("i", rest)) => (true, rest),
        _ => return Err(unsupported()),
    };

    let (digits, order) = match rest.strip_suffix('b') {
        Some(digits) => (digits, ByteOrder::Big),
        None => (rest.strip_suffix('l').unwrap_or(rest), ByteOrder::Little),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unsupported());
    }
    let bits = digits.parse::<u32>().map_err(|_| unsupported())?;

    let ty = if signed {
        TypeDescriptor::int(bits, order)
    } else {
        TypeDescriptor::uint(bits, order)
    };
    ty.map(Base::Type).map_err(|_| unsupported())
}

pub(crate) fn parse_layout(source: &str) -> Result<Layout, CompileError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    let mut entries = parser.entries(None)?;

    let wrapped = parser.tokens.first().map(|t| &t.kind) == Some(&TokenKind::Open('{'))
        && matches!(entries.as_slice(), [(None, TypeDescriptor::Struct(_))]);
    if wrapped {
        if let Some((_, TypeDescriptor::Struct(layout))) = entries.pop() {
            return Ok(Rc::unwrap_or_clone(layout));
        }
    }

    Layout::compile(entries)
}

pub(crate) fn parse_type(source: &str) -> Result<TypeDescriptor, CompileError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    let ty = parser.ty()?;

    match parser.peek() {
        Some(extra) => Err(syntax("unexpected token after type", &extra.text, extra.position)),
        None => Ok(ty),
    }
}
