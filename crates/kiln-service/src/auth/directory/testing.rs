//! Scripted `DirectoryTransport` for unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use super::{DirectoryEntry, DirectoryTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    pub base: String,
    pub filter: String,
    pub attrs: Vec<String>,
}

/// Answers searches from a queue of scripted results; once the queue is
/// empty every search answers with `fallback`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Vec<DirectoryEntry>, TransportError>>>,
    fallback: Vec<DirectoryEntry>,
    searches: Mutex<Vec<RecordedSearch>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Result<Vec<DirectoryEntry>, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn with_fallback(mut self, entries: Vec<DirectoryEntry>) -> Self {
        self.fallback = entries;
        self
    }

    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.searches.lock().expect("searches lock").clone()
    }
}

#[async_trait]
impl DirectoryTransport for ScriptedTransport {
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>, TransportError> {
        self.searches
            .lock()
            .expect("searches lock")
            .push(RecordedSearch {
                base: base.to_string(),
                filter: filter.to_string(),
                attrs: attrs.iter().map(ToString::to_string).collect(),
            });

        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// A user entry carrying the given `memberOf` values.
pub fn user_entry(uid: &str, member_of: &[&str]) -> DirectoryEntry {
    let mut attrs = HashMap::new();
    attrs.insert("uid".to_string(), vec![uid.to_string()]);
    attrs.insert(
        "memberOf".to_string(),
        member_of.iter().map(ToString::to_string).collect(),
    );
    DirectoryEntry {
        dn: format!("uid={uid},ou=users,dc=example,dc=com"),
        attrs,
    }
}
