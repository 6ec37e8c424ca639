//! Rule data model: the types a parsed script is made of.

use crate::ParseError;
use crate::pattern::EventPattern;
use crate::predicate::Predicate;
use issuewright_core::{EventContext, RepoCoord};
use std::fmt;

/// The built-in action verbs.
///
/// This is the whole registry: a name that is not listed here is a parse
/// error, so every action a script can request is known statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Comment,
    Close,
    Reopen,
    Label,
    Assign,
}

/// How many arguments a verb takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(k) => write!(f, "{k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Comment, Verb::Close, Verb::Reopen, Verb::Label, Verb::Assign];

    pub fn name(self) -> &'static str {
        match self {
            Verb::Comment => "comment",
            Verb::Close => "close",
            Verb::Reopen => "reopen",
            Verb::Label => "label",
            Verb::Assign => "assign",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.name() == name)
    }

    pub fn arity(self) -> Arity {
        match self {
            Verb::Comment => Arity::Exactly(1),
            Verb::Close | Verb::Reopen => Arity::Exactly(0),
            Verb::Label | Verb::Assign => Arity::AtLeast(1),
        }
    }

    /// Build the action for this verb, checking the argument count.
    pub(crate) fn build(self, mut args: Vec<ArgExpr>, line: usize) -> Result<Action, ParseError> {
        if !self.arity().accepts(args.len()) {
            return Err(ParseError::Arity {
                name: self.name().to_string(),
                line,
                expected: self.arity().to_string(),
                found: args.len(),
            });
        }
        Ok(match self {
            Verb::Comment => Action::Comment {
                body: args.remove(0),
            },
            Verb::Close => Action::Close,
            Verb::Reopen => Action::Reopen,
            Verb::Label => Action::Label { names: args },
            Verb::Assign => Action::Assign { logins: args },
        })
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An action argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgExpr {
    Literal(String),
    /// `contents(spec)`: fetched when the action runs, relative to the
    /// repository of the script that contained it.
    Contents {
        spec: String,
        origin: Option<RepoCoord>,
    },
}

impl fmt::Display for ArgExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgExpr::Literal(s) => write!(f, "{s:?}"),
            ArgExpr::Contents { spec, .. } => write!(f, "contents({spec:?})"),
        }
    }
}

/// The effect a matched rule performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Comment { body: ArgExpr },
    Close,
    Reopen,
    Label { names: Vec<ArgExpr> },
    Assign { logins: Vec<ArgExpr> },
}

impl Action {
    pub fn verb(&self) -> Verb {
        match self {
            Action::Comment { .. } => Verb::Comment,
            Action::Close => Verb::Close,
            Action::Reopen => Verb::Reopen,
            Action::Label { .. } => Verb::Label,
            Action::Assign { .. } => Verb::Assign,
        }
    }

    pub fn args(&self) -> &[ArgExpr] {
        match self {
            Action::Comment { body } => std::slice::from_ref(body),
            Action::Close | Action::Reopen => &[],
            Action::Label { names } => names,
            Action::Assign { logins } => logins,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args().iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.verb(), args.join(", "))
    }
}

/// One `on(...)...verb(...)` statement.
#[derive(Debug, Clone)]
pub struct Rule {
    pub patterns: Vec<EventPattern>,
    pub filters: Vec<Predicate>,
    pub action: Action,
    /// Repository of the script this rule was parsed from.
    pub origin: Option<RepoCoord>,
    /// 1-based line of the `on` keyword.
    pub line: usize,
}

impl Rule {
    /// Does any of the rule's patterns match the event?
    pub fn matches(&self, ctx: &EventContext) -> bool {
        self.patterns.iter().any(|p| p.matches(ctx))
    }

    /// Where the rule came from, for logs and reports.
    pub fn location(&self) -> String {
        match &self.origin {
            Some(origin) => format!("{origin} line {}", self.line),
            None => format!("line {}", self.line),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<String> = self.patterns.iter().map(|p| format!("{:?}", p.to_string())).collect();
        write!(f, "on({})", patterns.join(", "))?;
        for filter in &self.filters {
            write!(f, ".filter({filter})")?;
        }
        write!(f, ".{}", self.action)
    }
}

/// One `include(spec)` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub spec: String,
    /// Repository the spec is resolved against when it is relative.
    pub origin: Option<RepoCoord>,
    pub line: usize,
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "include({:?})", self.spec)
    }
}

/// A statement, in source order.
#[derive(Debug, Clone)]
pub enum Entry {
    Rule(Rule),
    Include(Include),
}

/// A parsed script.
#[derive(Debug, Clone, Default)]
pub struct Script {
    origin: Option<RepoCoord>,
    entries: Vec<Entry>,
}

impl Script {
    /// An empty script owned by `origin`.
    pub fn empty(origin: Option<RepoCoord>) -> Self {
        Self {
            origin,
            entries: Vec::new(),
        }
    }

    /// Parse script text. `origin` is the repository the text lives in; it
    /// becomes the active repository for relative `include()`/`contents()`.
    pub fn parse(text: &str, origin: Option<RepoCoord>) -> Result<Self, ParseError> {
        let entries = crate::parser::parse_script(text, origin.as_ref())?;
        Ok(Self { origin, entries })
    }

    pub fn origin(&self) -> Option<&RepoCoord> {
        self.origin.as_ref()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Rule(rule) => Some(rule),
            Entry::Include(_) => None,
        })
    }

    pub fn includes(&self) -> impl Iterator<Item = &Include> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Include(include) => Some(include),
            Entry::Rule(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append another script's entries, keeping their own origins.
    pub fn extend(&mut self, other: Script) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_registry_round_trips_names() {
        for verb in Verb::ALL {
            assert_eq!(Verb::from_name(verb.name()), Some(verb));
        }
        assert_eq!(Verb::from_name("delete"), None);
    }

    #[test]
    fn build_checks_arity() {
        assert_eq!(Verb::Close.build(vec![], 1).unwrap(), Action::Close);
        let err = Verb::Close
            .build(vec![ArgExpr::Literal("x".into())], 4)
            .unwrap_err();
        assert!(matches!(err, ParseError::Arity { line: 4, found: 1, .. }));
        assert!(Verb::Comment.build(vec![], 1).is_err());
        assert!(Verb::Label.build(vec![], 1).is_err());

        let action = Verb::Label
            .build(vec![ArgExpr::Literal("bug".into()), ArgExpr::Literal("p1".into())], 1)
            .unwrap();
        assert_eq!(action.args().len(), 2);
    }

    #[test]
    fn action_display() {
        let action = Action::Comment {
            body: ArgExpr::Contents {
                spec: "reply.md".into(),
                origin: None,
            },
        };
        assert_eq!(action.to_string(), "comment(contents(\"reply.md\"))");
        assert_eq!(Action::Close.to_string(), "close()");
    }
}
