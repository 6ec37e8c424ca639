//! Tokenizer for rule scripts.
//!
//! Produces a flat token stream with line/column positions. Whitespace,
//! `// line` and `/* block */` comments are dropped here so the parser never
//! sees them.

use crate::ParseError;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Semi,
    Arrow,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Not,
    Eof,
}

impl Token {
    /// How the token reads in an error message.
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{name}'"),
            Token::Str(s) => format!("string \"{s}\""),
            Token::Num(n) => format!("number {n}"),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::Dot => "'.'".into(),
            Token::Comma => "','".into(),
            Token::Semi => "';'".into(),
            Token::Arrow => "'=>'".into(),
            Token::Eq => "'=='".into(),
            Token::StrictEq => "'==='".into(),
            Token::NotEq => "'!='".into(),
            Token::StrictNotEq => "'!=='".into(),
            Token::Lt => "'<'".into(),
            Token::Lte => "'<='".into(),
            Token::Gt => "'>'".into(),
            Token::Gte => "'>='".into(),
            Token::And => "'&&'".into(),
            Token::Or => "'||'".into(),
            Token::Not => "'!'".into(),
            Token::Eof => "end of script".into(),
        }
    }
}

/// A token plus where it came from. `start..end` are byte offsets.
#[derive(Debug, Clone)]
pub(crate) struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

/// Tokenize a whole script. The last token is always [`Token::Eof`].
pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer {
        chars: input.char_indices().peekable(),
        len: input.len(),
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();

    loop {
        lexer.skip_trivia()?;
        let (line, column, start) = (lexer.line, lexer.column, lexer.offset());
        let Some(c) = lexer.bump() else {
            tokens.push(Spanned {
                token: Token::Eof,
                line,
                column,
                start,
                end: start,
            });
            break;
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '.' => Token::Dot,
            ',' => Token::Comma,
            ';' => Token::Semi,
            '"' | '\'' | '`' => lexer.string(c, line, column)?,
            '=' => {
                if lexer.eat('>') {
                    Token::Arrow
                } else if lexer.eat('=') {
                    if lexer.eat('=') { Token::StrictEq } else { Token::Eq }
                } else {
                    return Err(syntax(line, column, "assignment is not supported"));
                }
            }
            '!' => {
                if lexer.eat('=') {
                    if lexer.eat('=') { Token::StrictNotEq } else { Token::NotEq }
                } else {
                    Token::Not
                }
            }
            '<' => {
                if lexer.eat('=') { Token::Lte } else { Token::Lt }
            }
            '>' => {
                if lexer.eat('=') { Token::Gte } else { Token::Gt }
            }
            '&' if lexer.eat('&') => Token::And,
            '|' if lexer.eat('|') => Token::Or,
            '-' if lexer.peek().is_some_and(|n| n.is_ascii_digit()) => {
                lexer.number('-', line, column)?
            }
            _ if c.is_ascii_digit() => lexer.number(c, line, column)?,
            _ if c.is_alphabetic() || c == '_' || c == '$' => lexer.ident(c),
            other => {
                return Err(syntax(line, column, format!("unexpected character '{other}'")));
            }
        };

        tokens.push(Spanned {
            token,
            line,
            column,
            start,
            end: lexer.offset(),
        });
    }

    Ok(tokens)
}

fn syntax(line: usize, column: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax {
        line,
        column,
        message: message.into(),
    }
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    len: usize,
    line: usize,
    column: usize,
}

impl Lexer<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.len)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(syntax(line, column, "unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn string(&mut self, quote: char, line: usize, column: usize) -> Result<Token, ParseError> {
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('0') => s.push('\0'),
                    Some(escaped) => s.push(escaped),
                    None => break,
                },
                Some(c) if c == quote => return Ok(Token::Str(s)),
                Some('\n') if quote != '`' => break,
                Some('$') if quote == '`' && self.peek() == Some('{') => {
                    return Err(syntax(line, column, "template interpolation is not supported"));
                }
                Some(c) => s.push(c),
                None => break,
            }
        }
        Err(syntax(line, column, "unterminated string literal"))
    }

    fn number(&mut self, first: char, line: usize, column: usize) -> Result<Token, ParseError> {
        let mut text = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '.'
                && !text.contains('.')
                && self.peek_second().is_some_and(|n| n.is_ascii_digit())
            {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map(Token::Num)
            .map_err(|_| syntax(line, column, format!("invalid number: {text}")))
    }

    fn ident(&mut self, first: char) -> Token {
        let mut word = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::Ident(word)
    }
}
