//! Block tree for Gradle scripts.
//!
//! The parser understands the statement shapes build scripts are made of:
//! blocks (`android { }`, `getByName("release") { }`), assignments
//! (`compileSdk = 34`, `excludes += "x"`, `val dir: Directory = ...`) and
//! calls, including Groovy command calls (`minSdkVersion 21`,
//! `apply plugin: 'x'`) and infix tails (`id("x") version "1" apply false`).
//! Anything else is skipped with brace balance preserved; unbalanced
//! delimiters and unterminated literals are errors.

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Infix words accepted after a call on the same line.
const INFIX_WORDS: &[&str] = &["version", "apply"];

/// Factory calls whose first string argument names the block they open.
const NAMED_BLOCK_FACTORIES: &[&str] = &["getByName", "named", "create", "maybeCreate", "register"];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String literal; `$var` markers are resolved during normalization.
    Str(String),
    Number(String),
    Bool(bool),
    Null,
    /// Identifier path (`JavaVersion.VERSION_11`, `extra[kotlin_version]`).
    Ref(String),
    Call(Call),
    List(Vec<Value>),
    /// `a + b + c`
    Concat(Vec<Value>),
    Closure(Vec<Node>),
    /// Expression the parser does not model, kept as text.
    Raw(String),
}

impl Value {
    /// Best-effort source text, used for diagnostics and index keys.
    pub fn text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Number(n) => n.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Ref(r) => r.clone(),
            Value::Call(c) => c.text(),
            Value::List(items) => format!(
                "[{}]",
                items.iter().map(Value::text).collect::<Vec<_>>().join(", ")
            ),
            Value::Concat(parts) => parts.iter().map(Value::text).collect::<Vec<_>>().join(" + "),
            Value::Closure(_) => "{ ... }".to_string(),
            Value::Raw(r) => r.clone(),
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Value::Call(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    /// `plugin = "x"` / `plugin: 'x'`
    pub name: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    /// `a.b(x).c()` is `c` with receiver `a.b(x)`.
    pub receiver: Option<Box<Value>>,
    pub args: Vec<Arg>,
    /// `version "1.9.22"`, `apply false`
    pub infix: Vec<(String, Value)>,
}

impl Call {
    fn new(name: String, args: Vec<Arg>) -> Self {
        Call {
            name,
            receiver: None,
            args,
            infix: Vec::new(),
        }
    }

    /// First positional argument.
    pub fn first_arg(&self) -> Option<&Value> {
        self.args.iter().find(|a| a.name.is_none()).map(|a| &a.value)
    }

    pub fn named_arg(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.value)
    }

    pub fn infix(&self, word: &str) -> Option<&Value> {
        self.infix.iter().find(|(w, _)| w == word).map(|(_, v)| v)
    }

    /// Full dotted name including receivers (`rootProject.layout.buildDirectory.dir.get`).
    pub fn qualified_name(&self) -> String {
        match self.receiver.as_deref() {
            Some(Value::Call(inner)) => format!("{}.{}", inner.qualified_name(), self.name),
            Some(Value::Ref(r)) => format!("{}.{}", r, self.name),
            _ => self.name.clone(),
        }
    }

    fn text(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|a| match &a.name {
                Some(n) => format!("{} = {}", n, a.value.text()),
                None => a.value.text(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        match self.receiver.as_deref() {
            Some(r) => format!("{}.{}({})", r.text(), self.name, args),
            None => format!("{}({})", self.name, args),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Append,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Display name; `getByName("release") { }` is named `release`.
    pub name: String,
    pub args: Vec<Arg>,
    pub body: Vec<Node>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: String,
    pub op: AssignOp,
    pub value: Value,
    /// `val` / `var` / `def` declaration.
    pub declared: bool,
    pub line: usize,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub call: Call,
    pub line: usize,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block(Block),
    Assign(Assign),
    Call(Statement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
    /// Every comment in source order.
    pub comments: Vec<Comment>,
}

impl Document {
    /// Line of the first statement, if any.
    pub fn first_code_line(&self) -> Option<usize> {
        self.nodes.first().map(|n| match n {
            Node::Block(b) => b.line,
            Node::Assign(a) => a.line,
            Node::Call(s) => s.line,
        })
    }
}

/// Parse a Gradle script into a block tree.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    for token in tokenize(source)? {
        match token.kind {
            TokenKind::Comment(text) => comments.push(Comment {
                line: token.line,
                text,
            }),
            _ => tokens.push(token),
        }
    }

    let trailing = comments
        .iter()
        .map(|c| (c.line, c.text.clone()))
        .collect::<BTreeMap<_, _>>();
    let mut parser = Parser {
        tokens,
        pos: 0,
        path: Vec::new(),
        trailing,
    };
    let nodes = parser.parse_body(None)?;
    Ok(Document { nodes, comments })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    path: Vec<String>,
    /// Comment text by line, for trailing markers.
    trailing: BTreeMap<usize, String>,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn prev_line(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|p| self.tokens.get(p))
            .map_or(1, |t| t.line)
    }

    fn bump(&mut self) -> Option<TokenKind> {
        let kind = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if kind.is_some() {
            self.pos += 1;
        }
        kind
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&TokenKind::Newline) {
            self.pos += 1;
        }
    }

    /// Next significant token past any newlines.
    fn peek_past_newlines(&self) -> Option<&TokenKind> {
        self.tokens[self.pos..]
            .iter()
            .map(|t| &t.kind)
            .find(|k| **k != TokenKind::Newline)
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            None | Some(TokenKind::Newline) | Some(TokenKind::RBrace)
        )
    }

    fn error(&self, message: impl Into<String>, line: usize) -> ParseError {
        ParseError::syntax(message, &self.path, line)
    }

    fn comment_on(&self, line: usize) -> Option<String> {
        self.trailing.get(&line).cloned()
    }

    fn parse_body(&mut self, open_line: Option<usize>) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                None => {
                    return match open_line {
                        Some(line) => Err(self.error("unbalanced '{': block is never closed", line)),
                        None => Ok(nodes),
                    };
                }
                Some(TokenKind::RBrace) => {
                    if open_line.is_some() {
                        self.pos += 1;
                        return Ok(nodes);
                    }
                    return Err(self.error("unbalanced '}'", self.line()));
                }
                _ => {
                    if let Some(node) = self.parse_statement()? {
                        nodes.push(node);
                    }
                    self.finish_statement()?;
                }
            }
        }
    }

    /// Skip whatever is left of the current statement.
    fn finish_statement(&mut self) -> Result<(), ParseError> {
        if self.at_statement_end() {
            return Ok(());
        }
        self.skip_balanced(false)
    }

    /// Consume tokens up to the end of the line (or, when `nested`, up to a
    /// `,` / `)` / `]` at depth zero), keeping delimiters balanced.
    fn skip_balanced(&mut self, nested: bool) -> Result<(), ParseError> {
        let mut stack: Vec<(TokenKind, usize)> = Vec::new();
        loop {
            let line = self.line();
            let Some(kind) = self.peek().cloned() else {
                return match stack.last() {
                    Some((open, open_line)) => Err(self.error(
                        format!("unbalanced '{}'", delimiter_char(open)),
                        *open_line,
                    )),
                    None => Ok(()),
                };
            };
            if stack.is_empty() {
                let stop = match kind {
                    TokenKind::RBrace => true,
                    TokenKind::Newline => !nested,
                    TokenKind::Comma | TokenKind::RParen | TokenKind::RBracket => nested,
                    _ => false,
                };
                if stop {
                    return Ok(());
                }
            }
            self.pos += 1;
            match kind {
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => {
                    stack.push((kind, line))
                }
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    match stack.pop() {
                        Some((open, _)) if closes(&open, &kind) => {}
                        Some((open, open_line)) => {
                            return Err(self.error(
                                format!(
                                    "unbalanced '{}': closed by '{}'",
                                    delimiter_char(&open),
                                    delimiter_char(&kind)
                                ),
                                open_line,
                            ))
                        }
                        None => {
                            return Err(self.error(
                                format!("unbalanced '{}'", delimiter_char(&kind)),
                                line,
                            ))
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Skip `<Type, Other>` after an identifier when it is followed by `(` or `{`.
    fn skip_type_args(&mut self) {
        if self.peek() != Some(&TokenKind::Lt) {
            return;
        }
        let mut depth = 0usize;
        let mut offset = 0usize;
        loop {
            match self.peek_at(offset) {
                Some(TokenKind::Lt) => depth += 1,
                Some(TokenKind::Gt) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(TokenKind::Ident(_))
                | Some(TokenKind::Comma)
                | Some(TokenKind::Dot)
                | Some(TokenKind::Other('?'))
                | Some(TokenKind::Other('*')) => {}
                _ => return,
            }
            offset += 1;
        }
        if matches!(
            self.peek_at(offset + 1),
            Some(TokenKind::LParen) | Some(TokenKind::LBrace)
        ) {
            self.pos += offset + 1;
        }
    }

    fn parse_statement(&mut self) -> Result<Option<Node>, ParseError> {
        let line = self.line();
        let name = match self.peek() {
            Some(TokenKind::Ident(name)) => name.clone(),
            _ => return Ok(None),
        };
        self.pos += 1;

        if matches!(name.as_str(), "val" | "var" | "def") {
            return self.parse_declaration(line);
        }

        self.skip_type_args();
        let mut target = name;
        if self.peek() == Some(&TokenKind::LBracket) {
            target = self.parse_index(target)?;
        }

        match self.peek() {
            Some(TokenKind::Eq) | Some(TokenKind::PlusEq) => {
                let op = if self.bump() == Some(TokenKind::PlusEq) {
                    AssignOp::Append
                } else {
                    AssignOp::Set
                };
                let value = self.parse_required_value(line)?;
                Ok(Some(Node::Assign(Assign {
                    target,
                    op,
                    value,
                    declared: false,
                    line,
                    comment: self.comment_on(self.prev_line()),
                })))
            }
            Some(TokenKind::LBrace) => {
                self.pos += 1;
                self.parse_block(target, Vec::new(), line).map(Some)
            }
            Some(TokenKind::LParen) => {
                self.pos += 1;
                let args = self.parse_args(line)?;
                if self.peek() == Some(&TokenKind::LBrace) {
                    self.pos += 1;
                    return self.parse_block(target, args, line).map(Some);
                }
                let value = self.parse_postfix(Value::Call(Call::new(target, args)), false)?;
                let mut call = into_call(value);
                self.parse_infix(&mut call)?;
                if self.peek() == Some(&TokenKind::LBrace) {
                    self.pos += 1;
                    let name = call.qualified_name();
                    return self.parse_block(name, call.args, line).map(Some);
                }
                Ok(Some(self.statement(call, line)))
            }
            None | Some(TokenKind::Newline) | Some(TokenKind::RBrace) => {
                Ok(Some(self.statement(Call::new(target, Vec::new()), line)))
            }
            Some(kind) if starts_value(kind) => {
                let args = self.parse_command_args()?;
                let mut call = Call::new(target, args);
                self.parse_infix(&mut call)?;
                if self.peek() == Some(&TokenKind::LBrace) {
                    self.pos += 1;
                    return self.parse_block(call.name, call.args, line).map(Some);
                }
                Ok(Some(self.statement(call, line)))
            }
            _ => Ok(None),
        }
    }

    fn statement(&self, call: Call, line: usize) -> Node {
        Node::Call(Statement {
            call,
            line,
            comment: self.comment_on(self.prev_line()),
        })
    }

    fn parse_declaration(&mut self, line: usize) -> Result<Option<Node>, ParseError> {
        let name = match self.peek() {
            Some(TokenKind::Ident(name)) => name.clone(),
            _ => return Ok(None),
        };
        self.pos += 1;
        if self.peek() == Some(&TokenKind::Colon) {
            self.pos += 1;
            while matches!(
                self.peek(),
                Some(TokenKind::Ident(_))
                    | Some(TokenKind::Lt)
                    | Some(TokenKind::Gt)
                    | Some(TokenKind::Comma)
                    | Some(TokenKind::Dot)
                    | Some(TokenKind::Other('?'))
            ) {
                self.pos += 1;
            }
        }
        if self.peek() != Some(&TokenKind::Eq) {
            return Ok(None);
        }
        self.pos += 1;
        let value = self.parse_required_value(line)?;
        Ok(Some(Node::Assign(Assign {
            target: name,
            op: AssignOp::Set,
            value,
            declared: true,
            line,
            comment: self.comment_on(self.prev_line()),
        })))
    }

    fn parse_block(&mut self, name: String, args: Vec<Arg>, line: usize) -> Result<Node, ParseError> {
        let display = block_display_name(&name, &args);
        self.path.push(display.clone());
        let body = self.parse_body(Some(line));
        self.path.pop();
        Ok(Node::Block(Block {
            name: display,
            args,
            body: body?,
            line,
        }))
    }

    fn parse_index(&mut self, base: String) -> Result<String, ParseError> {
        let line = self.line();
        self.pos += 1;
        let key = self.parse_expr(true)?;
        self.skip_newlines();
        if self.bump() != Some(TokenKind::RBracket) {
            return Err(self.error("unbalanced '['", line));
        }
        Ok(format!("{}[{}]", base, key.text()))
    }

    fn parse_required_value(&mut self, line: usize) -> Result<Value, ParseError> {
        self.skip_newlines();
        match self.peek() {
            None | Some(TokenKind::RBrace) => Err(self.error("missing value after '='", line)),
            _ => self.parse_expr(false),
        }
    }

    /// Arguments after `(`, through the matching `)`.
    fn parse_args(&mut self, open_line: usize) -> Result<Vec<Arg>, ParseError> {
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                None => return Err(self.error("unbalanced '('", open_line)),
                Some(TokenKind::RParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(TokenKind::RBrace) => {
                    return Err(self.error("unexpected '}' in argument list", self.line()))
                }
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            let name = self.parse_arg_label();
            let mut value = self.parse_expr(true)?;
            if !matches!(
                self.peek(),
                None | Some(TokenKind::Comma)
                    | Some(TokenKind::RParen)
                    | Some(TokenKind::Newline)
                    | Some(TokenKind::RBrace)
            ) {
                // Unmodelled tail (`x as String`, trailing lambda, ...).
                let start = self.pos;
                self.skip_balanced(true)?;
                let tail = self.tokens[start..self.pos]
                    .iter()
                    .map(|t| token_text(&t.kind))
                    .collect::<Vec<_>>()
                    .join(" ");
                value = Value::Raw(format!("{} {}", value.text(), tail));
            }
            args.push(Arg { name, value });
        }
    }

    /// `name =` (Kotlin) or `name:` (Groovy) label before an argument.
    fn parse_arg_label(&mut self) -> Option<String> {
        let TokenKind::Ident(name) = self.peek()? else {
            return None;
        };
        match self.peek_at(1) {
            Some(TokenKind::Eq) | Some(TokenKind::Colon) => {
                let name = name.clone();
                self.pos += 2;
                Some(name)
            }
            _ => None,
        }
    }

    /// Groovy command-call arguments: `a, key: b` up to the end of the line.
    fn parse_command_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        let mut args = Vec::new();
        loop {
            let name = self.parse_arg_label();
            let value = self.parse_expr(false)?;
            args.push(Arg { name, value });
            if self.peek() == Some(&TokenKind::Comma) {
                self.pos += 1;
                self.skip_newlines();
                continue;
            }
            return Ok(args);
        }
    }

    fn parse_infix(&mut self, call: &mut Call) -> Result<(), ParseError> {
        while let Some(TokenKind::Ident(word)) = self.peek() {
            if !INFIX_WORDS.contains(&word.as_str()) {
                break;
            }
            let word = word.clone();
            match self.peek_at(1) {
                Some(kind) if starts_value(kind) => {}
                _ => break,
            }
            self.pos += 1;
            let value = self.parse_postfix_primary(false)?;
            call.infix.push((word, value));
        }
        Ok(())
    }

    fn parse_expr(&mut self, nested: bool) -> Result<Value, ParseError> {
        let first = self.parse_postfix_primary(nested)?;
        let mut parts = vec![first];
        let mut raw: Option<String> = None;
        loop {
            if nested {
                self.skip_newlines();
            }
            match self.peek() {
                Some(TokenKind::Other('+')) => {
                    self.pos += 1;
                    if nested {
                        self.skip_newlines();
                    }
                    let next = self.parse_postfix_primary(nested)?;
                    if let Some(text) = raw.as_mut() {
                        text.push_str(" + ");
                        text.push_str(&next.text());
                    }
                    parts.push(next);
                }
                Some(kind) if is_operator(kind) || (raw.is_some() && *kind == TokenKind::Colon) => {
                    let text = raw.get_or_insert_with(|| {
                        parts.iter().map(Value::text).collect::<Vec<_>>().join(" + ")
                    });
                    while let Some(op) = self.peek().filter(|k| {
                        is_operator(k) || **k == TokenKind::Colon || **k == TokenKind::Eq
                    }) {
                        text.push(' ');
                        text.push_str(&token_text(op));
                        self.pos += 1;
                    }
                    if nested {
                        self.skip_newlines();
                    }
                    if self.peek().is_some_and(starts_value) {
                        let next = self.parse_postfix_primary(nested)?;
                        text.push(' ');
                        text.push_str(&next.text());
                    }
                }
                _ => break,
            }
        }
        if let Some(text) = raw {
            return Ok(Value::Raw(text));
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Value::Concat(parts)
        })
    }

    fn parse_postfix_primary(&mut self, nested: bool) -> Result<Value, ParseError> {
        let base = self.parse_primary(nested)?;
        self.parse_postfix(base, nested)
    }

    /// `.member`, `.call(...)`, `?.member` chains.
    fn parse_postfix(&mut self, mut value: Value, nested: bool) -> Result<Value, ParseError> {
        loop {
            let chained = match self.peek() {
                Some(TokenKind::Dot) => true,
                Some(TokenKind::Other('?')) => self.peek_at(1) == Some(&TokenKind::Dot),
                Some(TokenKind::Newline) => {
                    !nested && self.peek_past_newlines() == Some(&TokenKind::Dot)
                }
                _ => false,
            };
            if !chained {
                return Ok(value);
            }
            self.skip_newlines();
            if self.peek() == Some(&TokenKind::Other('?')) {
                self.pos += 1;
            }
            self.pos += 1;
            let line = self.line();
            let member = match self.bump() {
                Some(TokenKind::Ident(m)) => m,
                _ => return Err(self.error("expected member name after '.'", line)),
            };
            if self.peek() == Some(&TokenKind::LParen) {
                self.pos += 1;
                let args = self.parse_args(line)?;
                value = Value::Call(Call {
                    name: member,
                    receiver: Some(Box::new(value)),
                    args,
                    infix: Vec::new(),
                });
            } else {
                value = match value {
                    Value::Ref(base) => Value::Ref(format!("{}.{}", base, member)),
                    other => Value::Call(Call {
                        name: member,
                        receiver: Some(Box::new(other)),
                        args: Vec::new(),
                        infix: Vec::new(),
                    }),
                };
            }
        }
    }

    fn parse_primary(&mut self, nested: bool) -> Result<Value, ParseError> {
        let line = self.line();
        let Some(kind) = self.bump() else {
            return Err(self.error("unexpected end of input", line));
        };
        match kind {
            TokenKind::Str(s) => Ok(Value::Str(s)),
            TokenKind::Number(n) => Ok(Value::Number(n)),
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                _ => {
                    self.skip_type_args();
                    match self.peek() {
                        Some(TokenKind::LParen) => {
                            self.pos += 1;
                            let args = self.parse_args(line)?;
                            Ok(Value::Call(Call::new(name, args)))
                        }
                        Some(TokenKind::LBracket) => Ok(Value::Ref(self.parse_index(name)?)),
                        _ => Ok(Value::Ref(name)),
                    }
                }
            },
            TokenKind::LBracket => self.parse_list(line),
            TokenKind::LParen => {
                let inner = self.parse_expr(true)?;
                self.skip_newlines();
                if self.bump() != Some(TokenKind::RParen) {
                    return Err(self.error("unbalanced '('", line));
                }
                Ok(inner)
            }
            TokenKind::LBrace => {
                let body = self.parse_body(Some(line))?;
                Ok(Value::Closure(body))
            }
            TokenKind::Other('-') => match self.peek() {
                Some(TokenKind::Number(n)) => {
                    let n = format!("-{}", n);
                    self.pos += 1;
                    Ok(Value::Number(n))
                }
                _ => {
                    let inner = self.parse_primary(nested)?;
                    Ok(Value::Raw(format!("-{}", inner.text())))
                }
            },
            TokenKind::Other('!') => {
                let inner = self.parse_postfix_primary(nested)?;
                Ok(Value::Raw(format!("!{}", inner.text())))
            }
            TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                Err(self.error(format!("unexpected '{}'", delimiter_char(&kind)), line))
            }
            TokenKind::Newline | TokenKind::Comma | TokenKind::Eq | TokenKind::PlusEq => {
                Err(self.error("missing value", line))
            }
            other => Ok(Value::Raw(token_text(&other))),
        }
    }

    /// `[a, b]` list or Groovy `[k: v]` map (keys are dropped).
    fn parse_list(&mut self, open_line: usize) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                None => return Err(self.error("unbalanced '['", open_line)),
                Some(TokenKind::RBracket) => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                    continue;
                }
                Some(TokenKind::Colon) if items.is_empty() => {
                    // Empty Groovy map `[:]`.
                    self.pos += 1;
                    continue;
                }
                _ => {}
            }
            self.parse_arg_label();
            items.push(self.parse_expr(true)?);
            if !matches!(
                self.peek(),
                None | Some(TokenKind::Comma) | Some(TokenKind::RBracket) | Some(TokenKind::Newline)
            ) {
                self.skip_balanced(true)?;
            }
        }
    }
}

fn into_call(value: Value) -> Call {
    match value {
        Value::Call(call) => call,
        other => Call::new(other.text(), Vec::new()),
    }
}

fn block_display_name(name: &str, args: &[Arg]) -> String {
    let short = name.rsplit('.').next().unwrap_or(name);
    if NAMED_BLOCK_FACTORIES.contains(&short) {
        if let Some(Arg {
            name: None,
            value: Value::Str(s),
        }) = args.first()
        {
            return s.clone();
        }
    }
    name.to_string()
}

fn starts_value(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Str(_)
            | TokenKind::Number(_)
            | TokenKind::Ident(_)
            | TokenKind::LBracket
            | TokenKind::Other('-')
            | TokenKind::Other('!')
    )
}

fn is_operator(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::Other('-')
            | TokenKind::Other('*')
            | TokenKind::Other('/')
            | TokenKind::Other('%')
            | TokenKind::Other('=')
            | TokenKind::Other('!')
            | TokenKind::Other('<')
            | TokenKind::Other('>')
            | TokenKind::Other('&')
            | TokenKind::Other('|')
            | TokenKind::Other('?')
    )
}

fn closes(open: &TokenKind, close: &TokenKind) -> bool {
    matches!(
        (open, close),
        (TokenKind::LBrace, TokenKind::RBrace)
            | (TokenKind::LParen, TokenKind::RParen)
            | (TokenKind::LBracket, TokenKind::RBracket)
    )
}

fn delimiter_char(kind: &TokenKind) -> char {
    match kind {
        TokenKind::LBrace => '{',
        TokenKind::RBrace => '}',
        TokenKind::LParen => '(',
        TokenKind::RParen => ')',
        TokenKind::LBracket => '[',
        TokenKind::RBracket => ']',
        _ => '?',
    }
}

fn token_text(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(s) | TokenKind::Number(s) => s.clone(),
        TokenKind::Str(s) => format!("\"{}\"", s),
        TokenKind::Comment(s) => format!("/* {} */", s),
        TokenKind::Newline => "\n".to_string(),
        TokenKind::Eq => "=".to_string(),
        TokenKind::PlusEq => "+=".to_string(),
        TokenKind::Colon => ":".to_string(),
        TokenKind::Comma => ",".to_string(),
        TokenKind::Dot => ".".to_string(),
        TokenKind::Lt => "<".to_string(),
        TokenKind::Gt => ">".to_string(),
        TokenKind::Other(c) => c.to_string(),
        open_or_close => delimiter_char(open_or_close).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_block(doc: &Document) -> &Block {
        match &doc.nodes[..] {
            [Node::Block(b)] => b,
            other => panic!("expected one block, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks_and_assignments() {
        let doc = parse("android {\n  namespace = \"com.x\"\n  defaultConfig {\n    minSdk = 21\n  }\n}\n")
            .unwrap();
        let android = only_block(&doc);
        assert_eq!(android.name, "android");
        assert_eq!(android.body.len(), 2);
        match &android.body[0] {
            Node::Assign(a) => {
                assert_eq!(a.target, "namespace");
                assert_eq!(a.value, Value::Str("com.x".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &android.body[1] {
            Node::Block(b) => assert_eq!(b.name, "defaultConfig"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_plugin_infix_tail() {
        let doc = parse("plugins {\n  id(\"com.android.application\") version \"8.1.1\" apply false\n}").unwrap();
        let plugins = only_block(&doc);
        let Node::Call(stmt) = &plugins.body[0] else {
            panic!("expected call");
        };
        assert_eq!(stmt.call.name, "id");
        assert_eq!(stmt.call.infix("version"), Some(&Value::Str("8.1.1".into())));
        assert_eq!(stmt.call.infix("apply"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_groovy_command_calls() {
        let doc = parse("apply plugin: 'kotlin-android'\nminSdkVersion 21\nid 'x' version '1.0'").unwrap();
        let Node::Call(apply) = &doc.nodes[0] else {
            panic!("expected call");
        };
        assert_eq!(apply.call.named_arg("plugin"), Some(&Value::Str("kotlin-android".into())));
        let Node::Call(min) = &doc.nodes[1] else {
            panic!("expected call");
        };
        assert_eq!(min.call.first_arg(), Some(&Value::Number("21".into())));
        let Node::Call(id) = &doc.nodes[2] else {
            panic!("expected call");
        };
        assert_eq!(id.call.infix("version"), Some(&Value::Str("1.0".into())));
    }

    #[test]
    fn test_named_factory_blocks() {
        let doc = parse("buildTypes {\n getByName(\"release\") {\n isMinifyEnabled = false\n }\n}").unwrap();
        let types = only_block(&doc);
        let Node::Block(release) = &types.body[0] else {
            panic!("expected block");
        };
        assert_eq!(release.name, "release");
    }

    #[test]
    fn test_typed_val_and_chained_call() {
        let doc = parse(
            "val newBuildDir: Directory = rootProject.layout.buildDirectory.dir(\"../../build\").get()",
        )
        .unwrap();
        let Node::Assign(a) = &doc.nodes[0] else {
            panic!("expected assign");
        };
        assert!(a.declared);
        assert_eq!(a.target, "newBuildDir");
        let call = a.value.as_call().unwrap();
        assert_eq!(call.name, "get");
        assert_eq!(call.qualified_name(), "rootProject.layout.buildDirectory.dir.get");
    }

    #[test]
    fn test_generic_register_block() {
        let doc = parse("tasks.register<Delete>(\"clean\") {\n delete(rootProject.layout.buildDirectory)\n}").unwrap();
        let block = only_block(&doc);
        assert_eq!(block.name, "clean");
        assert_eq!(block.body.len(), 1);
    }

    #[test]
    fn test_trailing_comment_attaches() {
        let doc = parse("implementation(\"a:b:1\") // override\nimplementation(\"c:d:2\")").unwrap();
        let Node::Call(first) = &doc.nodes[0] else {
            panic!("expected call");
        };
        assert_eq!(first.comment.as_deref(), Some("override"));
        let Node::Call(second) = &doc.nodes[1] else {
            panic!("expected call");
        };
        assert_eq!(second.comment, None);
    }

    #[test]
    fn test_extra_index_assignment() {
        let doc = parse("extra[\"kotlin_version\"] = \"1.9.22\"").unwrap();
        let Node::Assign(a) = &doc.nodes[0] else {
            panic!("expected assign");
        };
        assert_eq!(a.target, "extra[kotlin_version]");
    }

    #[test]
    fn test_unbalanced_brace_names_block_path() {
        let err = parse("android {\n  defaultConfig {\n    minSdk = 21\n}\n").unwrap_err();
        assert_eq!(err.block_path().as_deref(), Some("android"));
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_inner_unclosed_block_reports_inner_path() {
        let err = parse("android {\n  defaultConfig {\n    minSdk = (21\n  }\n}\n").unwrap_err();
        assert!(err.to_string().contains("android > defaultConfig"), "{}", err);
    }

    #[test]
    fn test_stray_closing_brace() {
        assert!(parse("}\n").is_err());
    }

    #[test]
    fn test_missing_value_is_error() {
        let err = parse("android {\n  compileSdk =\n}").unwrap_err();
        assert!(err.to_string().contains("missing value"));
    }

    #[test]
    fn test_unmodelled_statements_are_skipped() {
        let doc = parse(
            "if (x == 1 && y != 2) {\n  a = 1\n}\nfun foo(): Int {\n  return 1\n}\nb = 2\n",
        )
        .unwrap();
        assert!(doc
            .nodes
            .iter()
            .any(|n| matches!(n, Node::Assign(a) if a.target == "b")));
    }
}
