// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Structured per-field match outcomes

use crate::model::{RequestDescriptor, ResponseDescriptor};

/// Outcome of comparing one field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldOutcome {
    /// Field satisfied its expectation (or had none)
    #[default]
    Ok,
    /// Plain value difference
    Differs { expected: String, actual: String },
    /// A check failed for a reason other than a value difference
    Failed { expectation: String, reason: String },
    /// Expected but absent
    Missing { expected: String },
    /// Present but not expected
    Extra,
}

impl FieldOutcome {
    /// Check if the field passed
    pub fn is_ok(&self) -> bool {
        matches!(self, FieldOutcome::Ok)
    }
}

/// Outcome for one header name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderOutcome {
    /// Header name as declared by the expectation (or the subject, for extras)
    pub name: String,
    pub outcome: FieldOutcome,
}

/// Outcome of comparing bodies
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BodyOutcome {
    /// Bodies agree
    #[default]
    Ok,
    /// Structural JSON difference, as annotated lines
    Json(Vec<String>),
    /// Textual or binary difference; expected body as display lines
    Differs { expected: Vec<String> },
    /// A body predicate failed
    Failed { expectation: String, reason: String },
}

impl BodyOutcome {
    /// Check if the bodies agree
    pub fn is_ok(&self) -> bool {
        matches!(self, BodyOutcome::Ok)
    }
}

/// Field-by-field result of matching one request against its expectation
#[derive(Debug, Clone)]
pub struct MismatchReport {
    /// The observed request
    pub request: RequestDescriptor,
    /// Expected request line, when method or path differ
    pub expected_line: Option<String>,
    pub method: FieldOutcome,
    pub path: FieldOutcome,
    pub host: FieldOutcome,
    pub port: FieldOutcome,
    pub encrypted: FieldOutcome,
    pub headers: Vec<HeaderOutcome>,
    pub body: BodyOutcome,
    /// `cert`, `key` and `ca`
    pub tls: Vec<(&'static str, FieldOutcome)>,
    pub reject_unauthorized: FieldOutcome,
    /// Whole-request predicate
    pub predicate: FieldOutcome,
}

impl MismatchReport {
    /// A report with every field passing
    pub fn new(request: RequestDescriptor) -> Self {
        Self {
            request,
            expected_line: None,
            method: FieldOutcome::Ok,
            path: FieldOutcome::Ok,
            host: FieldOutcome::Ok,
            port: FieldOutcome::Ok,
            encrypted: FieldOutcome::Ok,
            headers: Vec::new(),
            body: BodyOutcome::Ok,
            tls: Vec::new(),
            reject_unauthorized: FieldOutcome::Ok,
            predicate: FieldOutcome::Ok,
        }
    }

    /// Check if every field passed
    pub fn is_match(&self) -> bool {
        self.differing_fields().is_empty()
    }

    /// Names of the fields that failed
    pub fn differing_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = [
            ("method", &self.method),
            ("path", &self.path),
            ("host", &self.host),
            ("port", &self.port),
            ("encrypted", &self.encrypted),
            ("rejectUnauthorized", &self.reject_unauthorized),
            ("request", &self.predicate),
        ]
        .iter()
        .filter(|(_, outcome)| !outcome.is_ok())
        .map(|(name, _)| name.to_string())
        .collect();

        fields.extend(
            self.headers
                .iter()
                .filter(|h| !h.outcome.is_ok())
                .map(|h| format!("header {}", h.name)),
        );
        if !self.body.is_ok() {
            fields.push("body".to_string());
        }
        fields.extend(
            self.tls
                .iter()
                .filter(|(_, outcome)| !outcome.is_ok())
                .map(|(name, _)| name.to_string()),
        );
        fields
    }

    /// Outcome recorded for a header name
    pub fn header(&self, name: &str) -> Option<&FieldOutcome> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| &h.outcome)
    }
}

/// Field-by-field result of comparing a mocked response with the live one
#[derive(Debug, Clone)]
pub struct ResponseReport {
    /// What the mock delivered
    pub mock: ResponseDescriptor,
    /// What the live service answered
    pub live: ResponseDescriptor,
    /// Status line
    pub status: FieldOutcome,
    /// Headers present in either side, minus ignored ones
    pub headers: Vec<HeaderOutcome>,
    pub body: BodyOutcome,
    /// Transport error shape
    pub error: FieldOutcome,
}

impl ResponseReport {
    /// Check if the two responses agree
    pub fn is_match(&self) -> bool {
        self.status.is_ok()
            && self.error.is_ok()
            && self.body.is_ok()
            && self.headers.iter().all(|h| h.outcome.is_ok())
    }

    /// Outcome recorded for a header name
    pub fn header(&self, name: &str) -> Option<&FieldOutcome> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| &h.outcome)
    }
}
