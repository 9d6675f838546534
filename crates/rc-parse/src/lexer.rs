//! Tokenizer for Gradle build scripts (Kotlin and Groovy DSL).
//!
//! Dotted identifier paths (`JavaVersion.VERSION_11`) are lexed as a single
//! identifier. Comments are kept as tokens so the parser can attach trailing
//! markers (`// override`) and recover intent annotations.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// String literal with escapes resolved; `$var` markers are kept.
    Str(String),
    Number(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,
    PlusEq,
    Colon,
    Comma,
    Dot,
    Lt,
    Gt,
    /// Newline or `;`.
    Newline,
    Comment(String),
    /// Any other single character (`+`, `!`, `-`, `?`, ...).
    Other(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
    line: usize,
    tokens: Vec<Token>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.char_indices().peekable(),
            src,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Character after the next one, without consuming.
    fn peek_second(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next();
        it.next().map(|(_, c)| c)
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some((start, c)) = self.chars.next() {
            match c {
                '\n' => {
                    self.push(TokenKind::Newline);
                    self.line += 1;
                }
                ';' => self.push(TokenKind::Newline),
                c if c.is_whitespace() => {}
                '/' if self.peek_char() == Some('/') => {
                    let text = self.take_while(|c| c != '\n');
                    let text = text.trim_start_matches('/').trim().to_string();
                    self.push(TokenKind::Comment(text));
                }
                '/' if self.peek_char() == Some('*') => self.block_comment()?,
                '"' | '\'' => self.string(c)?,
                '`' => {
                    // Kotlin backtick identifier: `kotlin-android`
                    let text = self.take_while(|c| c != '`' && c != '\n');
                    if self.peek_char() != Some('`') {
                        return Err(ParseError::lex("unterminated backtick identifier", self.line));
                    }
                    self.chars.next();
                    self.push(TokenKind::Ident(text));
                }
                '{' => self.push(TokenKind::LBrace),
                '}' => self.push(TokenKind::RBrace),
                '(' => self.push(TokenKind::LParen),
                ')' => self.push(TokenKind::RParen),
                '[' => self.push(TokenKind::LBracket),
                ']' => self.push(TokenKind::RBracket),
                ':' => self.push(TokenKind::Colon),
                ',' => self.push(TokenKind::Comma),
                '.' => self.push(TokenKind::Dot),
                // Comparison operators collapse onto their first character.
                '<' | '>' | '!' if self.peek_char() == Some('=') => {
                    self.chars.next();
                    self.push(TokenKind::Other(c));
                }
                '<' => self.push(TokenKind::Lt),
                '>' => self.push(TokenKind::Gt),
                '=' if self.peek_char() == Some('=') => {
                    self.chars.next();
                    self.push(TokenKind::Other('='));
                }
                '=' => self.push(TokenKind::Eq),
                '+' if self.peek_char() == Some('=') => {
                    self.chars.next();
                    self.push(TokenKind::PlusEq);
                }
                c if c.is_ascii_digit() => {
                    let mut text = String::from(c);
                    loop {
                        match self.peek_char() {
                            Some(d) if d.is_ascii_digit() || d == '_' => {
                                text.push(d);
                                self.chars.next();
                            }
                            Some('.') if self.peek_second().is_some_and(|d| d.is_ascii_digit()) => {
                                text.push('.');
                                self.chars.next();
                            }
                            Some('L' | 'l' | 'f' | 'F') => {
                                self.chars.next();
                                break;
                            }
                            _ => break,
                        }
                    }
                    self.push(TokenKind::Number(text));
                }
                c if is_ident_start(c) => {
                    let mut end = start + c.len_utf8();
                    loop {
                        match self.peek_char() {
                            Some(n) if is_ident_char(n) => {
                                end += n.len_utf8();
                                self.chars.next();
                            }
                            Some('.') if self.peek_second().is_some_and(is_ident_start) => {
                                end += 1;
                                self.chars.next();
                            }
                            _ => break,
                        }
                    }
                    self.push(TokenKind::Ident(self.src[start..end].to_string()));
                }
                other => self.push(TokenKind::Other(other)),
            }
        }
        Ok(self.tokens)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.chars.next();
        }
        out
    }

    fn block_comment(&mut self) -> Result<(), ParseError> {
        let start_line = self.line;
        self.chars.next(); // '*'
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '*')) if self.peek_char() == Some('/') => {
                    self.chars.next();
                    break;
                }
                Some((_, c)) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    text.push(c);
                }
                None => {
                    return Err(ParseError::lex("unterminated block comment", start_line));
                }
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::Comment(text.trim().trim_start_matches('*').trim().to_string()),
            line: start_line,
        });
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<(), ParseError> {
        let start_line = self.line;
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    // Escaped dollar must not be treated as interpolation.
                    Some((_, '$')) => text.push('\u{0}'),
                    Some((_, c)) => text.push(c),
                    None => break,
                },
                // `${...}` may contain quotes of its own: "${extra["agp"]}"
                Some((_, '$')) if quote == '"' && self.peek_char() == Some('{') => {
                    text.push('$');
                    let mut depth = 0usize;
                    for (_, c) in self.chars.by_ref() {
                        if c == '\n' {
                            return Err(ParseError::lex("unterminated string literal", start_line));
                        }
                        text.push(c);
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Some((_, '\n')) => {
                    return Err(ParseError::lex("unterminated string literal", start_line));
                }
                Some((_, c)) if c == quote => {
                    self.tokens.push(Token {
                        kind: TokenKind::Str(text),
                        line: start_line,
                    });
                    return Ok(());
                }
                Some((_, c)) => text.push(c),
                None => break,
            }
        }
        Err(ParseError::lex("unterminated string literal", start_line))
    }
}
