//! Validation errors
//!
//! A check collects [`Issue`]s into an [`ErrorTree`] that mirrors the shape
//! of the checked value. [`ErrorTree::flatten`] turns it into a map keyed by
//! rendered paths such as `bar.arrayObject[0].array[1][0]`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{self, Step};

/// Machine-readable reason a value failed a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotAString,
    NotANumber,
    NotAnInteger,
    NotABoolean,
    NotAnObject,
    NotAnArray,
    NotInEnum,
    InvalidFormat,
    MinLength,
    MaxLength,
    Min,
    Max,
    NotUnique,
    NotAllowed,
    Required,
    InvalidTupleLength,
    WeakPassword,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotAString => "NOT_A_STRING",
            ErrorCode::NotANumber => "NOT_A_NUMBER",
            ErrorCode::NotAnInteger => "NOT_AN_INTEGER",
            ErrorCode::NotABoolean => "NOT_A_BOOLEAN",
            ErrorCode::NotAnObject => "NOT_AN_OBJECT",
            ErrorCode::NotAnArray => "NOT_AN_ARRAY",
            ErrorCode::NotInEnum => "NOT_IN_ENUM",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::MinLength => "MIN_LENGTH",
            ErrorCode::MaxLength => "MAX_LENGTH",
            ErrorCode::Min => "MIN",
            ErrorCode::Max => "MAX",
            ErrorCode::NotUnique => "NOT_UNIQUE",
            ErrorCode::NotAllowed => "NOT_ALLOWED",
            ErrorCode::Required => "REQUIRED",
            ErrorCode::InvalidTupleLength => "INVALID_TUPLE_LENGTH",
            ErrorCode::WeakPassword => "WEAK_PASSWORD",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One leaf error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "message")]
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Issue {
    pub fn new(code: ErrorCode) -> Self {
        Self { code, meta: None }
    }

    pub fn with_meta(code: ErrorCode, meta: Value) -> Self {
        Self {
            code,
            meta: Some(meta),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.meta {
            Some(meta) => write!(f, "{} {}", self.code, meta),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Issues at one node plus the errors of its children, in check order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorTree {
    issues: Vec<Issue>,
    children: Vec<(Step, ErrorTree)>,
}

impl ErrorTree {
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    /// Attach a child's errors under `step`; empty trees are dropped
    pub fn attach(&mut self, step: Step, child: ErrorTree) {
        if !child.is_empty() {
            self.children.push((step, child));
        }
    }

    /// Record a single issue at a child position
    pub fn push_at(&mut self, step: Step, issue: Issue) {
        let mut child = ErrorTree::default();
        child.push(issue);
        self.attach(step, child);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn children(&self) -> &[(Step, ErrorTree)] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.children.iter().all(|(_, c)| c.is_empty())
    }

    /// Total number of leaf issues
    pub fn len(&self) -> usize {
        self.issues.len() + self.children.iter().map(|(_, c)| c.len()).sum::<usize>()
    }

    /// Map every rendered path to the issues recorded there. Issues on the
    /// root node are keyed by the empty string.
    pub fn flatten(&self) -> BTreeMap<String, Vec<Issue>> {
        let mut flat = BTreeMap::new();
        let mut steps = Vec::new();
        self.flatten_into(&mut steps, &mut flat);
        flat
    }

    fn flatten_into(&self, steps: &mut Vec<Step>, flat: &mut BTreeMap<String, Vec<Issue>>) {
        if !self.issues.is_empty() {
            flat.entry(path::render(steps))
                .or_insert_with(Vec::new)
                .extend(self.issues.iter().cloned());
        }
        for (step, child) in &self.children {
            steps.push(step.clone());
            child.flatten_into(steps, flat);
            steps.pop();
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// Outcome of one `check` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    tree: ErrorTree,
}

impl Report {
    pub fn new(tree: ErrorTree) -> Self {
        Self { tree }
    }

    pub fn is_valid(&self) -> bool {
        self.tree.is_empty()
    }

    /// Flat path → issues map
    pub fn errors(&self) -> BTreeMap<String, Vec<Issue>> {
        self.tree.flatten()
    }

    pub fn tree(&self) -> &ErrorTree {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Codes recorded at a rendered path (`""` for the root)
    pub fn codes_at(&self, path: &str) -> Vec<ErrorCode> {
        self.errors()
            .get(path)
            .map(|issues| issues.iter().map(|i| i.code).collect())
            .unwrap_or_default()
    }

    pub fn has(&self, path: &str, code: ErrorCode) -> bool {
        self.codes_at(path).contains(&code)
    }
}

impl Serialize for Report {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.errors().serialize(serializer)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, issues)) in self.errors().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let label = if path.is_empty() { "(root)" } else { path.as_str() };
            let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();
            write!(f, "  {}: {}", label, rendered.join(", "))?;
        }
        Ok(())
    }
}
