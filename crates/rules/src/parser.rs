//! Recursive-descent parser for rule scripts.
//!
//! Grammar (informal):
//! ```text
//! script    = { statement [";"] }
//! statement = "on" "(" STRING { "," STRING } ")" { ".filter(" predicate ")" } "." VERB "(" [args] ")"
//!           | "include" "(" STRING ")"
//! args      = arg { "," arg }
//! arg       = STRING | "contents" "(" STRING ")"
//! predicate = ( IDENT | "(" IDENT ")" ) "=>" ( expr | "{" "return" expr [";"] "}" )
//! expr      = and { "||" and }
//! and       = unary { "&&" unary }
//! unary     = "!" unary | compare
//! compare   = postfix [ ("==" | "===" | "!=" | "!==" | "<" | "<=" | ">" | ">=") postfix ]
//! postfix   = primary { "." IDENT [ "(" [ expr { "," expr } ] ")" ] | "[" expr "]" }
//! primary   = STRING | NUMBER | "true" | "false" | "null" | PARAM | "(" expr ")"
//! ```

use crate::ParseError;
use crate::lexer::{Spanned, Token, tokenize};
use crate::model::{ArgExpr, Entry, Include, Rule, Verb};
use crate::pattern::EventPattern;
use crate::predicate::{CompareOp, Expr, Method, Predicate};
use issuewright_core::RepoCoord;
use regex_lite::Regex;
use serde_json::Value;

/// Deepest allowed nesting of `(`, `[`, `!` and method arguments.
const MAX_NESTING: usize = 64;

/// Most tokens one filter predicate may span.
const MAX_PREDICATE_TOKENS: usize = 512;

/// Parse script text into entries, in source order.
pub(crate) fn parse_script(
    input: &str,
    origin: Option<&RepoCoord>,
) -> Result<Vec<Entry>, ParseError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
        origin,
        depth: 0,
        predicate_start: 0,
    };
    parser.script()
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    origin: Option<&'a RepoCoord>,
    /// Current expression nesting.
    depth: usize,
    /// Token index where the predicate being parsed begins.
    predicate_start: usize,
}

impl Parser<'_> {
    // ── Token helpers ─────────────────────────────────────────────────

    fn peek(&self) -> &Spanned {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Spanned {
        let token = self.tokens[self.pos].clone();
        if token.token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        &self.peek().token == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<Spanned, ParseError> {
        if self.check(&token) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = self.peek();
        ParseError::Syntax {
            line: found.line,
            column: found.column,
            message: format!("expected {expected}, found {}", found.token.describe()),
        }
    }

    fn string(&mut self, expected: &str) -> Result<(String, Spanned), ParseError> {
        match &self.peek().token {
            Token::Str(s) => {
                let s = s.clone();
                Ok((s, self.advance()))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn ident(&mut self, expected: &str) -> Result<(String, Spanned), ParseError> {
        match &self.peek().token {
            Token::Ident(name) => {
                let name = name.clone();
                Ok((name, self.advance()))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// A non-empty path argument: `("spec")`.
    fn path_argument(&mut self, function: &str) -> Result<String, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let (spec, token) = self.string("a path string")?;
        if spec.trim().is_empty() {
            return Err(ParseError::Syntax {
                line: token.line,
                column: token.column,
                message: format!("{function}() needs a non-empty path"),
            });
        }
        self.expect(Token::RParen, "')'")?;
        Ok(spec)
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.syntax("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Reject predicates that grow past the token budget. Called once per
    /// operator so that long `&&`/`||`/member chains stop early.
    fn within_budget(&self) -> Result<(), ParseError> {
        if self.pos - self.predicate_start > MAX_PREDICATE_TOKENS {
            return Err(self.syntax("filter expression is too long"));
        }
        Ok(())
    }

    fn syntax(&self, message: &str) -> ParseError {
        let at = self.peek();
        ParseError::Syntax {
            line: at.line,
            column: at.column,
            message: message.into(),
        }
    }

    // ── Statements ────────────────────────────────────────────────────

    fn script(&mut self) -> Result<Vec<Entry>, ParseError> {
        let mut entries = Vec::new();
        loop {
            let current = self.peek().clone();
            match &current.token {
                Token::Eof => return Ok(entries),
                Token::Semi => {
                    self.advance();
                }
                Token::Ident(name) if name == "on" => entries.push(Entry::Rule(self.rule()?)),
                Token::Ident(name) if name == "include" => {
                    entries.push(Entry::Include(self.include()?))
                }
                Token::Ident(name) if name == "contents" => {
                    return Err(ParseError::Syntax {
                        line: current.line,
                        column: current.column,
                        message: "contents() is only valid as an action argument".into(),
                    });
                }
                Token::Ident(name) => {
                    return Err(ParseError::UnknownFunction {
                        name: name.clone(),
                        line: current.line,
                    });
                }
                _ => return Err(self.unexpected("'on(...)' or 'include(...)'")),
            }
        }
    }

    fn include(&mut self) -> Result<Include, ParseError> {
        let keyword = self.advance();
        let spec = self.path_argument("include")?;
        Ok(Include {
            spec,
            origin: self.origin.cloned(),
            line: keyword.line,
        })
    }

    fn rule(&mut self) -> Result<Rule, ParseError> {
        let keyword = self.advance();
        self.expect(Token::LParen, "'('")?;
        let mut patterns = Vec::new();
        loop {
            let (text, token) = self.string("an event pattern string")?;
            let pattern = EventPattern::parse(&text).map_err(|detail| {
                ParseError::InvalidPattern {
                    line: token.line,
                    detail,
                }
            })?;
            patterns.push(pattern);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;

        let mut filters = Vec::new();
        loop {
            if !self.eat(&Token::Dot) {
                return Err(ParseError::MissingAction { line: keyword.line });
            }
            let (name, token) = self.ident("a method name")?;
            if name == "filter" {
                self.expect(Token::LParen, "'('")?;
                filters.push(self.predicate()?);
                self.expect(Token::RParen, "')'")?;
                continue;
            }

            let verb = Verb::from_name(&name).ok_or_else(|| ParseError::UnknownVerb {
                name: name.clone(),
                line: token.line,
            })?;
            self.expect(Token::LParen, "'('")?;
            let args = self.args()?;
            self.expect(Token::RParen, "')'")?;
            let action = verb.build(args, token.line)?;

            if self.eat(&Token::Dot) {
                let next = match &self.peek().token {
                    Token::Ident(next) => next.clone(),
                    other => other.describe(),
                };
                return Err(ParseError::AlreadyFinalized {
                    name: next,
                    line: keyword.line,
                });
            }

            return Ok(Rule {
                patterns,
                filters,
                action,
                origin: self.origin.cloned(),
                line: keyword.line,
            });
        }
    }

    fn args(&mut self) -> Result<Vec<ArgExpr>, ParseError> {
        let mut args = Vec::new();
        if self.check(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.arg()?);
            if !self.eat(&Token::Comma) {
                return Ok(args);
            }
        }
    }

    fn arg(&mut self) -> Result<ArgExpr, ParseError> {
        let current = self.peek().clone();
        match current.token {
            Token::Str(s) => {
                self.advance();
                Ok(ArgExpr::Literal(s))
            }
            Token::Ident(name) if name == "contents" => {
                self.advance();
                let spec = self.path_argument("contents")?;
                Ok(ArgExpr::Contents {
                    spec,
                    origin: self.origin.cloned(),
                })
            }
            Token::Ident(name) => Err(ParseError::UnknownFunction {
                name,
                line: current.line,
            }),
            _ => Err(self.unexpected("a string or contents(...)")),
        }
    }

    // ── Predicates ────────────────────────────────────────────────────

    fn predicate(&mut self) -> Result<Predicate, ParseError> {
        let start = self.peek().start;
        self.predicate_start = self.pos;
        let param = if self.eat(&Token::LParen) {
            let (param, _) = self.ident("a parameter name")?;
            self.expect(Token::RParen, "')'")?;
            param
        } else {
            self.ident("a parameter name")?.0
        };
        self.expect(Token::Arrow, "'=>'")?;

        let body = if self.eat(&Token::LBrace) {
            let (keyword, token) = self.ident("'return'")?;
            if keyword != "return" {
                return Err(ParseError::Syntax {
                    line: token.line,
                    column: token.column,
                    message: format!("expected 'return', found '{keyword}'"),
                });
            }
            let body = self.expr(&param)?;
            self.eat(&Token::Semi);
            self.expect(Token::RBrace, "'}'")?;
            body
        } else {
            self.expr(&param)?
        };

        let end = self.tokens[self.pos.saturating_sub(1)].end;
        let source = self.input[start..end].to_string();
        Ok(Predicate::new(param, body, source))
    }

    fn expr(&mut self, param: &str) -> Result<Expr, ParseError> {
        let mut left = self.and(param)?;
        while self.eat(&Token::Or) {
            self.within_budget()?;
            let right = self.and(param)?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self, param: &str) -> Result<Expr, ParseError> {
        let mut left = self.unary(param)?;
        while self.eat(&Token::And) {
            self.within_budget()?;
            let right = self.unary(param)?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self, param: &str) -> Result<Expr, ParseError> {
        if self.eat(&Token::Not) {
            let inner = self.nested(|p| p.unary(param))?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.compare(param)
    }

    fn compare(&mut self, param: &str) -> Result<Expr, ParseError> {
        let left = self.postfix(param)?;
        let op = match self.peek().token {
            Token::Eq => CompareOp::LooseEq,
            Token::NotEq => CompareOp::LooseNotEq,
            Token::StrictEq => CompareOp::StrictEq,
            Token::StrictNotEq => CompareOp::StrictNotEq,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.postfix(param)?;
        Ok(Expr::Compare(Box::new(left), op, Box::new(right)))
    }

    fn postfix(&mut self, param: &str) -> Result<Expr, ParseError> {
        let mut expr = self.primary(param)?;
        loop {
            self.within_budget()?;
            if self.eat(&Token::Dot) {
                let (name, token) = self.ident("a property name")?;
                if !self.eat(&Token::LParen) {
                    expr = Expr::Member(Box::new(expr), name);
                    continue;
                }

                let method = Method::from_name(&name).ok_or_else(|| {
                    ParseError::UnknownFunction {
                        name: name.clone(),
                        line: token.line,
                    }
                })?;
                let args = self.nested(|p| {
                    let mut args = Vec::new();
                    if !p.check(&Token::RParen) {
                        loop {
                            args.push(p.expr(param)?);
                            if !p.eat(&Token::Comma) {
                                break;
                            }
                        }
                    }
                    p.expect(Token::RParen, "')'")?;
                    Ok(args)
                })?;

                if args.len() != method.arity() {
                    return Err(ParseError::Arity {
                        name,
                        line: token.line,
                        expected: method.arity().to_string(),
                        found: args.len(),
                    });
                }
                if let (Method::Match, Some(Expr::Literal(Value::String(pattern)))) =
                    (method, args.first())
                {
                    Regex::new(pattern).map_err(|e| ParseError::InvalidRegex {
                        line: token.line,
                        detail: e.to_string(),
                    })?;
                }
                expr = Expr::Call {
                    target: Box::new(expr),
                    method,
                    args,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.nested(|p| {
                    let index = p.expr(param)?;
                    p.expect(Token::RBracket, "']'")?;
                    Ok(index)
                })?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self, param: &str) -> Result<Expr, ParseError> {
        let current = self.peek().clone();
        let expr = match current.token {
            Token::Str(s) => Expr::Literal(Value::String(s)),
            Token::Num(n) => Expr::Literal(number(n)),
            Token::Ident(name) => match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ if name == param => Expr::Param,
                _ => {
                    return Err(ParseError::UnknownIdentifier {
                        name,
                        line: current.line,
                    });
                }
            },
            Token::LParen => {
                self.advance();
                return self.nested(|p| {
                    let inner = p.expr(param)?;
                    p.expect(Token::RParen, "')'")?;
                    Ok(inner)
                });
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(expr)
    }
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
