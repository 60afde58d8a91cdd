//! Inverted keyword index over one agent's memories.
//!
//! Postings are kept in a `BTreeMap` so prefix lookups are a range scan
//! starting at the prefix.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use agent_model::Memory;

use crate::text::tokenize;

/// A memory together with the day bucket it was read from.
#[derive(Debug, Clone)]
pub struct IndexedMemory {
    pub day: NaiveDate,
    pub memory: Memory,
}

#[derive(Debug, Default)]
pub struct KeywordIndex {
    entries: Vec<IndexedMemory>,
    postings: BTreeMap<String, BTreeSet<usize>>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexedMemory] {
        &self.entries
    }

    pub fn insert(&mut self, day: NaiveDate, memory: Memory) {
        let slot = self.entries.len();
        for token in memory_tokens(&memory) {
            self.postings.entry(token).or_default().insert(slot);
        }
        self.entries.push(IndexedMemory { day, memory });
    }

    /// Slots whose tokens include one starting with `prefix`.
    fn prefix_postings(&self, prefix: &str) -> BTreeSet<usize> {
        self.postings
            .range(prefix.to_string()..)
            .take_while(|(token, _)| token.starts_with(prefix))
            .flat_map(|(_, slots)| slots.iter().copied())
            .collect()
    }

    /// Entries matching every query token by prefix. An empty query matches
    /// everything.
    pub fn query(&self, query: &str) -> Vec<&IndexedMemory> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return self.entries.iter().collect();
        }

        let mut matched: Option<BTreeSet<usize>> = None;
        for token in &tokens {
            let slots = self.prefix_postings(token);
            matched = Some(match matched {
                None => slots,
                Some(acc) => acc.intersection(&slots).copied().collect(),
            });
            if matched.as_ref().is_some_and(|m| m.is_empty()) {
                return Vec::new();
            }
        }

        matched
            .unwrap_or_default()
            .into_iter()
            .map(|slot| &self.entries[slot])
            .collect()
    }
}

fn memory_tokens(memory: &Memory) -> BTreeSet<String> {
    let mut tokens: BTreeSet<String> = tokenize(&memory.content).into_iter().collect();
    for tag in &memory.tags {
        tokens.extend(tokenize(tag));
    }
    for participant in &memory.participants {
        tokens.extend(tokenize(participant));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_model::MemoryKind;
    use chrono::Utc;

    fn index() -> KeywordIndex {
        let now = Utc::now();
        let day = now.date_naive();
        let mut index = KeywordIndex::new();
        index.insert(
            day,
            Memory::new(MemoryKind::Interaction, "Debugged the Kubernetes rollout", now)
                .with_tags(["deploy"]),
        );
        index.insert(
            day,
            Memory::new(MemoryKind::Interaction, "Argued about tabs", now).with_participants(["meme_lord"]),
        );
        index
    }

    #[test]
    fn test_prefix_and_case_insensitive_match() {
        let index = index();
        assert_eq!(index.query("kube").len(), 1);
        assert_eq!(index.query("KUBERNETES rollout").len(), 1);
        assert_eq!(index.query("deploy").len(), 1);
        assert_eq!(index.query("meme_lord").len(), 1);
    }

    #[test]
    fn test_all_tokens_must_match() {
        let index = index();
        assert!(index.query("kubernetes tabs").is_empty());
        assert!(index.query("nothing").is_empty());
    }

    #[test]
    fn test_empty_query_matches_all() {
        assert_eq!(index().query("  ").len(), 2);
    }
}
