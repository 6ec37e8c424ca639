//! Event patterns: the `"topic"` / `"topic.action"` strings given to `on()`.

use issuewright_core::EventContext;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a rule listens for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventPattern {
    pub topic: String,
    /// `None` matches every action of the topic.
    pub action: Option<String>,
}

impl EventPattern {
    /// Parse `topic` or `topic.action`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut parts = s.split('.');
        let topic = parts.next().unwrap_or_default();
        let action = parts.next();
        if parts.next().is_some() {
            return Err(format!("'{s}' has more than one '.'"));
        }
        if !is_name(topic) {
            return Err(format!("'{s}' has an invalid topic"));
        }
        if let Some(action) = action {
            if !is_name(action) {
                return Err(format!("'{s}' has an invalid action"));
            }
        }
        Ok(Self {
            topic: topic.to_string(),
            action: action.map(str::to_string),
        })
    }

    /// Does this pattern match the event?
    pub fn matches(&self, ctx: &EventContext) -> bool {
        self.topic == ctx.event()
            && self
                .action
                .as_deref()
                .is_none_or(|action| action == ctx.action())
    }
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Some(action) => write!(f, "{}.{}", self.topic, action),
            None => f.write_str(&self.topic),
        }
    }
}

impl TryFrom<String> for EventPattern {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<EventPattern> for String {
    fn from(p: EventPattern) -> Self {
        p.to_string()
    }
}
