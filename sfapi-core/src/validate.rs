//! # Request Validation
//!
//! Every request shape declares its rules by implementing [`Validate`]. The
//! [`Validator`] runs all of them and collects every violation instead of
//! stopping at the first one, so a caller learns everything that is wrong
//! with a request in a single round-trip.
use crate::{
    envelope::Envelope,
    request::{
        DescribeRequest, IdRequest, QueryRequest, RecordsRequest, SearchRequest, UpsertRequest,
    },
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rule {
    NotEmpty,
    ArrayNotEmpty,
    Present,
    IsJson,
    IsObject,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::NotEmpty => "notEmpty",
            Rule::ArrayNotEmpty => "arrayNotEmpty",
            Rule::Present => "present",
            Rule::IsJson => "isJson",
            Rule::IsObject => "isObject",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Path of the offending field, e.g. `records[2].contents`.
    pub path: String,
    pub rule: Rule,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("Invalid input: {}", summary(.violations))]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

fn summary(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("{} ({})", v.path, v.rule))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationFailure {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.path.as_str())
    }
}

/// Declares the rules of a request shape.
pub trait Validate {
    fn rules(&self, v: &mut Validator);
}

/// Checks `value` against its rules, returning it untouched when valid.
pub fn validate<T: Validate>(value: T) -> Result<T, ValidationFailure> {
    let mut validator = Validator::default();
    value.rules(&mut validator);
    validator.finish()?;
    Ok(value)
}

/// Accumulates violations while rules are checked.
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    fn violation(&mut self, path: impl Into<String>, rule: Rule, description: impl Into<String>) {
        self.violations.push(Violation {
            path: path.into(),
            rule,
            description: description.into(),
        });
    }

    /// Required, non-empty string.
    pub fn not_empty(&mut self, path: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.violation(path, Rule::NotEmpty, format!("{path} should not be empty"));
        }
        self
    }

    /// Optional string; checked only when present.
    pub fn optional_not_empty(&mut self, path: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.not_empty(path, value);
        }
        self
    }

    /// Required, non-empty array of non-empty strings.
    pub fn not_empty_strings(&mut self, path: &str, values: &[String]) -> &mut Self {
        if values.is_empty() {
            self.violation(
                path,
                Rule::ArrayNotEmpty,
                format!("{path} should contain at least one element"),
            );
        }

        for (i, value) in values.iter().enumerate() {
            self.not_empty(&format!("{path}[{i}]"), value);
        }
        self
    }

    /// Required, non-empty array where every element has its own rules.
    pub fn each<T>(
        &mut self,
        path: &str,
        items: &[T],
        mut rule: impl FnMut(&mut Self, &str, &T),
    ) -> &mut Self {
        if items.is_empty() {
            self.violation(
                path,
                Rule::ArrayNotEmpty,
                format!("{path} should contain at least one element"),
            );
        }

        for (i, item) in items.iter().enumerate() {
            rule(self, &format!("{path}[{i}]"), item);
        }
        self
    }

    /// The envelope must carry JSON describing a single record.
    pub fn json_object(&mut self, path: &str, envelope: &Envelope) -> &mut Self {
        let path = format!("{path}.contents");

        match envelope.value() {
            Ok(Some(value)) if value.is_object() => {}
            Ok(Some(_)) => self.violation(path, Rule::IsObject, "record should be a JSON object"),
            Ok(None) => self.violation(path, Rule::Present, "record contents are missing"),
            Err(err) => self.violation(path, Rule::IsJson, err.to_string()),
        }
        self
    }

    pub fn finish(self) -> Result<(), ValidationFailure> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure {
                violations: self.violations,
            })
        }
    }
}

impl Validate for QueryRequest {
    fn rules(&self, v: &mut Validator) {
        v.not_empty_strings("fields", &self.fields)
            .not_empty("table", &self.table)
            .optional_not_empty("clauses", self.clauses.as_deref());
    }
}

impl Validate for IdRequest {
    fn rules(&self, v: &mut Validator) {
        v.not_empty("object", &self.object)
            .not_empty_strings("ids", &self.ids);
    }
}

impl Validate for RecordsRequest {
    fn rules(&self, v: &mut Validator) {
        v.not_empty("object", &self.object)
            .each("records", &self.records, |v, path, record| {
                v.json_object(path, record);
            });
    }
}

impl Validate for UpsertRequest {
    fn rules(&self, v: &mut Validator) {
        v.not_empty("object", &self.object)
            .each("records", &self.records, |v, path, record| {
                v.json_object(path, record);
            })
            .not_empty("extId", &self.ext_id);
    }
}

impl Validate for DescribeRequest {
    fn rules(&self, v: &mut Validator) {
        v.not_empty("object", &self.object);
    }
}

impl Validate for SearchRequest {
    fn rules(&self, v: &mut Validator) {
        v.not_empty("search", &self.search)
            .not_empty("retrieve", &self.retrieve);
    }
}
