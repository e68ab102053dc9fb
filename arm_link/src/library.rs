use serde::{Deserialize, Serialize};

use crate::drivers::CommandSink;
use crate::packets::ArmCommand;

/// A saved action, known by name only until it is loaded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub name: String,
}

/// Cached view of the controller's action library.
///
/// Never authoritative: every `act_list` replaces the whole cache.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryMirror {
    entries: Vec<LibraryEntry>,
    refreshes: u64,
}

impl LibraryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&self, sink: &dyn CommandSink) {
        sink.send(ArmCommand::ActList);
    }

    /// Swaps in the names from an `act_list` message, as sent.
    pub fn replace(&mut self, names: Vec<String>) {
        self.entries = names.into_iter().map(|name| LibraryEntry { name }).collect();
        self.refreshes += 1;
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&LibraryEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `act_list` messages applied so far.
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_keeps_server_order() {
        let mut library = LibraryMirror::new();
        library.replace(vec!["b".into(), "a".into()]);
        assert_eq!(library.names().collect::<Vec<_>>(), ["b", "a"]);
        library.replace(vec![]);
        assert!(library.is_empty());
        assert_eq!(library.refreshes(), 2);
    }
}
