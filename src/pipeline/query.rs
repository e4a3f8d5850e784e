//! Read-only queries over a published module collection.
//!
//! Every function assumes the slice is already sorted by date descending,
//! which [`RefreshScheduler`](super::RefreshScheduler) guarantees on publish.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::Module;

/// Shape of a read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    All,
    Latest,
    Tags,
    ByTag(String),
}

/// Answer to a [`Query`], serialized as its bare payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Modules(Vec<Module>),
    Module(Module),
    Tags(Vec<String>),
}

/// Answer a query against the collection.
pub fn dispatch(modules: &[Module], query: &Query) -> Result<QueryResult> {
    match query {
        Query::All => Ok(QueryResult::Modules(all(modules).to_vec())),
        Query::Latest => latest(modules).map(|m| QueryResult::Module(m.clone())),
        Query::Tags => Ok(QueryResult::Tags(all_tags(modules))),
        Query::ByTag(tag) => by_tag(modules, tag)
            .map(|found| QueryResult::Modules(found.into_iter().cloned().collect())),
    }
}

/// Most recent module; the first one wins on equal dates.
pub fn latest(modules: &[Module]) -> Result<&Module> {
    modules.first().ok_or(AppError::EmptyCollection)
}

/// Every distinct tag, sorted.
pub fn all_tags(modules: &[Module]) -> Vec<String> {
    modules
        .iter()
        .flat_map(|m| m.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Modules carrying `tag`, in collection order.
pub fn by_tag<'a>(modules: &'a [Module], tag: &str) -> Result<Vec<&'a Module>> {
    let found: Vec<&Module> = modules.iter().filter(|m| m.has_tag(tag)).collect();
    if found.is_empty() {
        return Err(AppError::not_found(tag));
    }
    Ok(found)
}

/// The whole collection.
pub fn all(modules: &[Module]) -> &[Module] {
    modules
}
