//! The bookreader test catalogue
//!
//! Cases are registered in run order. Each one starts from the baseline
//! (logged out, about pane shown, annotation lightbox closed) and sets up
//! whatever else it needs itself, so no case depends on another having run.

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::page::Bookreader;

mod annotate;
mod initialisation;
mod reader;
mod session;

/// Body of a test case
pub type CaseFn = for<'a> fn(&'a Bookreader) -> LocalBoxFuture<'a, E2eResult<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// The application starts in a good state
    Initialisation,
    /// Login and logout
    Session,
    /// Chapter reading and navigation
    Reader,
    /// Adding, deleting and rendering comments
    Annotate,
}

impl Group {
    pub const ALL: [Group; 4] = [
        Group::Initialisation,
        Group::Session,
        Group::Reader,
        Group::Annotate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Initialisation => "initialisation",
            Group::Session => "session",
            Group::Reader => "reader",
            Group::Annotate => "annotate",
        }
    }
}

impl std::str::FromStr for Group {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Group::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown group: {s}"))
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct TestCase {
    pub group: Group,
    pub name: &'static str,
    pub description: &'static str,
    /// Writes comments to the data store; the runner purges the test
    /// user's comments before and after.
    pub mutates_store: bool,
    pub run: CaseFn,
}

impl TestCase {
    pub fn new(group: Group, name: &'static str, description: &'static str, run: CaseFn) -> Self {
        Self {
            group,
            name,
            description,
            mutates_store: false,
            run,
        }
    }

    /// Mark the case as writing to the data store
    pub fn mutating(mut self) -> Self {
        self.mutates_store = true;
        self
    }
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("mutates_store", &self.mutates_store)
            .finish()
    }
}

/// Every case, in run order
pub fn all() -> Vec<TestCase> {
    let mut cases = Vec::new();
    cases.extend(initialisation::cases());
    cases.extend(session::cases());
    cases.extend(reader::cases());
    cases.extend(annotate::cases());
    cases
}

/// Narrow the catalogue to a group and/or a single case name
pub fn select(group: Option<Group>, name: Option<&str>) -> E2eResult<Vec<TestCase>> {
    let selected: Vec<TestCase> = all()
        .into_iter()
        .filter(|c| group.map_or(true, |g| c.group == g))
        .filter(|c| name.map_or(true, |n| c.name == n))
        .collect();

    match name {
        Some(n) if selected.is_empty() => Err(E2eError::CaseNotFound(n.to_string())),
        _ => Ok(selected),
    }
}
