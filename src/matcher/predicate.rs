// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Pluggable value predicates
//!
//! A predicate checks one value (a header value, a body, or a whole request)
//! and answers either right away or through a future that must settle before
//! the match verdict is issued.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::RequestDescriptor;

/// Outcome of a predicate: `Err` carries the failure reason
pub type Verdict = std::result::Result<(), String>;

/// Shared predicate handle
pub type SharedPredicate = Arc<dyn Predicate>;

/// Value a predicate is evaluated against
#[derive(Debug, Clone)]
pub enum Subject {
    /// Header value or text body
    Text(String),
    /// Parsed JSON body
    Json(Value),
    /// Binary body
    Bytes(Bytes),
    /// Whole request
    Request(Box<RequestDescriptor>),
}

impl Subject {
    /// Text view of the subject, if it has one
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Subject::Text(text) => Some(Cow::Borrowed(text)),
            Subject::Json(Value::String(s)) => Some(Cow::Borrowed(s)),
            Subject::Json(value) => Some(Cow::Owned(value.to_string())),
            Subject::Bytes(bytes) => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            Subject::Request(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Subject::Text(_) => "text",
            Subject::Json(_) => "JSON",
            Subject::Bytes(_) => "bytes",
            Subject::Request(_) => "request",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Text(text) => write!(f, "'{}'", text),
            Subject::Json(value) => write!(f, "{}", value),
            Subject::Bytes(bytes) => write!(f, "{} bytes", bytes.len()),
            Subject::Request(request) => f.write_str(&request.request_line()),
        }
    }
}

/// Result of evaluating a predicate
pub enum Evaluation {
    /// Verdict available immediately
    Ready(Verdict),
    /// Verdict available once the future settles
    Suspended(BoxFuture<'static, Verdict>),
    /// The predicate itself is unusable; fatal for the session
    Invalid(String),
}

impl Evaluation {
    /// Resolve to a verdict, failing on an invalid predicate
    pub async fn settle(self) -> Result<Verdict> {
        match self {
            Evaluation::Ready(verdict) => Ok(verdict),
            Evaluation::Suspended(future) => Ok(future.await),
            Evaluation::Invalid(reason) => Err(Error::predicate(reason)),
        }
    }
}

/// A check on one value
pub trait Predicate: Send + Sync {
    /// Evaluate against a subject
    fn evaluate(&self, subject: Subject) -> Evaluation;

    /// Short description used in diffs (`to match /^foo/`)
    fn describe(&self) -> String;
}

impl fmt::Debug for dyn Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.describe())
    }
}

/// Structural equality against a JSON value (strings compare as text)
pub fn equals(expected: impl Into<Value>) -> SharedPredicate {
    Arc::new(Equals(expected.into()))
}

struct Equals(Value);

impl Predicate for Equals {
    fn evaluate(&self, subject: Subject) -> Evaluation {
        let ok = match (&subject, &self.0) {
            (Subject::Json(actual), expected) => actual == expected,
            (_, Value::String(expected)) => subject.as_text().as_deref() == Some(expected.as_str()),
            (subject, expected) => {
                subject.as_text().as_deref() == Some(expected.to_string().as_str())
            }
        };
        Evaluation::Ready(if ok {
            Ok(())
        } else {
            Err(format!("expected {} to equal {}", subject, self.0))
        })
    }

    fn describe(&self) -> String {
        format!("to equal {}", self.0)
    }
}

/// Regular expression match on the text view
///
/// An invalid pattern makes every evaluation `Invalid`.
pub fn matches(pattern: &str) -> SharedPredicate {
    Arc::new(Matches {
        source: pattern.to_string(),
        regex: Regex::new(pattern).map_err(|e| e.to_string()),
    })
}

struct Matches {
    source: String,
    regex: std::result::Result<Regex, String>,
}

impl Predicate for Matches {
    fn evaluate(&self, subject: Subject) -> Evaluation {
        let regex = match &self.regex {
            Ok(regex) => regex,
            Err(err) => return Evaluation::Invalid(format!("/{}/: {}", self.source, err)),
        };
        text_check(&subject, |text| regex.is_match(text), || self.describe())
    }

    fn describe(&self) -> String {
        format!("to match /{}/", self.source)
    }
}

/// Text prefix check
pub fn starts_with(prefix: impl Into<String>) -> SharedPredicate {
    Arc::new(TextOp {
        operand: prefix.into(),
        op: TextOpKind::StartsWith,
    })
}

/// Text suffix check
pub fn ends_with(suffix: impl Into<String>) -> SharedPredicate {
    Arc::new(TextOp {
        operand: suffix.into(),
        op: TextOpKind::EndsWith,
    })
}

/// Substring check
pub fn contains(needle: impl Into<String>) -> SharedPredicate {
    Arc::new(TextOp {
        operand: needle.into(),
        op: TextOpKind::Contains,
    })
}

#[derive(Clone, Copy)]
enum TextOpKind {
    StartsWith,
    EndsWith,
    Contains,
}

struct TextOp {
    operand: String,
    op: TextOpKind,
}

impl Predicate for TextOp {
    fn evaluate(&self, subject: Subject) -> Evaluation {
        let operand = self.operand.as_str();
        text_check(
            &subject,
            |text| match self.op {
                TextOpKind::StartsWith => text.starts_with(operand),
                TextOpKind::EndsWith => text.ends_with(operand),
                TextOpKind::Contains => text.contains(operand),
            },
            || self.describe(),
        )
    }

    fn describe(&self) -> String {
        let verb = match self.op {
            TextOpKind::StartsWith => "to begin with",
            TextOpKind::EndsWith => "to end with",
            TextOpKind::Contains => "to contain",
        };
        format!("{} '{}'", verb, self.operand)
    }
}

fn text_check(
    subject: &Subject,
    check: impl Fn(&str) -> bool,
    describe: impl Fn() -> String,
) -> Evaluation {
    let verdict = match subject.as_text() {
        Some(text) if check(&text) => Ok(()),
        Some(_) => Err(format!("expected {} {}", subject, describe())),
        None => Err(format!("expected {} {}, got {}", subject.kind(), describe(), subject)),
    };
    Evaluation::Ready(verdict)
}

/// Synchronous custom check
pub fn satisfy<F>(description: impl Into<String>, check: F) -> SharedPredicate
where
    F: Fn(&Subject) -> Verdict + Send + Sync + 'static,
{
    Arc::new(Satisfy {
        description: description.into(),
        check,
    })
}

struct Satisfy<F> {
    description: String,
    check: F,
}

impl<F> Predicate for Satisfy<F>
where
    F: Fn(&Subject) -> Verdict + Send + Sync,
{
    fn evaluate(&self, subject: Subject) -> Evaluation {
        Evaluation::Ready((self.check)(&subject))
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Asynchronous custom check; the verdict is awaited before matching finishes
pub fn eventually<F, Fut>(description: impl Into<String>, check: F) -> SharedPredicate
where
    F: Fn(Subject) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Verdict> + Send + 'static,
{
    Arc::new(Eventually {
        description: description.into(),
        check,
    })
}

struct Eventually<F> {
    description: String,
    check: F,
}

impl<F, Fut> Predicate for Eventually<F>
where
    F: Fn(Subject) -> Fut + Send + Sync,
    Fut: Future<Output = Verdict> + Send + 'static,
{
    fn evaluate(&self, subject: Subject) -> Evaluation {
        Evaluation::Suspended((self.check)(subject).boxed())
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Look up a built-in predicate by its fixture name
pub fn named(name: &str, value: Value) -> Result<SharedPredicate> {
    let text = || match &value {
        Value::String(s) => Ok(s.clone()),
        other => Err(Error::predicate(format!(
            "{} expects a string operand, got {}",
            name, other
        ))),
    };

    match name {
        "equals" | "to equal" => Ok(equals(value.clone())),
        "startsWith" | "to begin with" => Ok(starts_with(text()?)),
        "endsWith" | "to end with" => Ok(ends_with(text()?)),
        "contains" | "to contain" => Ok(contains(text()?)),
        "matches" | "to match" => {
            let pattern = text()?;
            Regex::new(&pattern).map_err(|e| Error::predicate(format!("/{}/: {}", pattern, e)))?;
            Ok(matches(&pattern))
        }
        other => Err(Error::predicate(format!("unknown predicate '{}'", other))),
    }
}
