use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A bidirectional dictionary for mapping between strings and integer IDs
///
/// IDs are assigned densely in first-seen order. Only the id-ordered string
/// list is serialized, the reverse index is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Dictionary {
    /// Map from string to ID
    str_to_id: HashMap<String, u32>,
    /// Map from ID to string
    id_to_str: Vec<String>,
}

impl Dictionary {
    /// Create a new empty dictionary
    pub fn new() -> Self {
        Self {
            str_to_id: HashMap::new(),
            id_to_str: Vec::new(),
        }
    }

    /// Get the number of entries in the dictionary
    pub fn len(&self) -> usize {
        self.id_to_str.len()
    }

    /// Returns `true` if the dictionary contains no entries
    pub fn is_empty(&self) -> bool {
        self.id_to_str.is_empty()
    }

    /// Get or create an ID for a string
    pub fn get_or_insert(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.str_to_id.get(s) {
            id
        } else {
            let id = self.id_to_str.len() as u32;
            self.str_to_id.insert(s.to_string(), id);
            self.id_to_str.push(s.to_string());
            id
        }
    }

    /// Look up the ID of a string without inserting it
    pub fn get(&self, s: &str) -> Option<u32> {
        self.str_to_id.get(s).copied()
    }

    /// Look up the string for an ID
    pub fn name(&self, id: u32) -> Option<&str> {
        self.id_to_str.get(id as usize).map(String::as_str)
    }

    /// Iterate over all (string, id) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.id_to_str
            .iter()
            .enumerate()
            .map(|(id, s)| (s.as_str(), id as u32))
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<String>> for Dictionary {
    fn from(id_to_str: Vec<String>) -> Self {
        let str_to_id = id_to_str
            .iter()
            .enumerate()
            .map(|(id, s)| (s.clone(), id as u32))
            .collect();
        Self {
            str_to_id,
            id_to_str,
        }
    }
}

impl From<Dictionary> for Vec<String> {
    fn from(dict: Dictionary) -> Self {
        dict.id_to_str
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_basic() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.len(), 0);

        let id1 = dict.get_or_insert("NN");
        assert_eq!(id1, 0);
        assert_eq!(dict.len(), 1);

        let id2 = dict.get_or_insert("VB");
        assert_eq!(id2, 1);
        assert_eq!(dict.len(), 2);

        // Getting the same string should return the same ID
        let id3 = dict.get_or_insert("NN");
        assert_eq!(id3, id1);
        assert_eq!(dict.len(), 2);

        assert_eq!(dict.get("VB"), Some(1));
        assert_eq!(dict.get("JJ"), None);
        assert_eq!(dict.name(0), Some("NN"));
        assert_eq!(dict.name(7), None);
    }

    #[test]
    fn test_dictionary_iter() {
        let mut dict = Dictionary::new();
        dict.get_or_insert("hello");
        dict.get_or_insert("world");
        dict.get_or_insert("rust");

        let items: Vec<_> = dict.iter().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], ("hello", 0));
        assert_eq!(items[1], ("world", 1));
        assert_eq!(items[2], ("rust", 2));
    }

    #[test]
    fn test_dictionary_serde_rebuilds_index() {
        let mut dict = Dictionary::new();
        dict.get_or_insert("DT");
        dict.get_or_insert("NN");

        let json = serde_json::to_string(&dict).unwrap();
        assert_eq!(json, r#"["DT","NN"]"#);

        let restored: Dictionary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, dict);
        assert_eq!(restored.get("NN"), Some(1));
    }
}
