use std::fmt;

use thiserror::Error;

const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path '{path}' contains an empty key")]
    EmptyKey { path: String },
    #[error("path key '{key}' contains forbidden character '{character}'")]
    ForbiddenCharacter { key: String, character: char },
}

/// Slash separated location in the database tree. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DbPath {
    keys: Vec<String>,
}

impl DbPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut keys = Vec::new();
        for key in trimmed.split('/') {
            validate_key(key, raw)?;
            keys.push(key.to_string());
        }
        Ok(Self { keys })
    }

    pub fn child(&self, key: &str) -> Result<Self, PathError> {
        validate_key(key, key)?;
        let mut keys = self.keys.clone();
        keys.push(key.to_string());
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_ancestor_or_self_of(&self, other: &DbPath) -> bool {
        other.keys.len() >= self.keys.len() && other.keys[..self.keys.len()] == self.keys[..]
    }

    /// True when a write at `self` can change the value observed at `other`.
    pub fn overlaps(&self, other: &DbPath) -> bool {
        self.is_ancestor_or_self_of(other) || other.is_ancestor_or_self_of(self)
    }
}

impl fmt::Display for DbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys.join("/"))
    }
}

fn validate_key(key: &str, path: &str) -> Result<(), PathError> {
    if key.is_empty() {
        return Err(PathError::EmptyKey {
            path: path.to_string(),
        });
    }
    if let Some(character) = key.chars().find(|ch| FORBIDDEN_KEY_CHARS.contains(ch)) {
        return Err(PathError::ForbiddenCharacter {
            key: key.to_string(),
            character,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_keys_and_ignores_outer_slashes() {
        let path = DbPath::parse("/players/abc/").expect("path");
        assert_eq!(path.keys(), ["players", "abc"]);
        assert_eq!(path.to_string(), "players/abc");
    }

    #[test]
    fn empty_string_is_root() {
        assert!(DbPath::parse("").expect("root").is_root());
        assert!(DbPath::parse("/").expect("root").is_root());
    }

    #[test]
    fn rejects_empty_and_forbidden_keys() {
        assert!(matches!(
            DbPath::parse("players//abc"),
            Err(PathError::EmptyKey { .. })
        ));
        for raw in ["a.b", "a#b", "players/$x", "a[0]"] {
            assert!(
                matches!(
                    DbPath::parse(raw),
                    Err(PathError::ForbiddenCharacter { .. })
                ),
                "raw={raw}"
            );
        }
    }

    #[test]
    fn overlap_covers_ancestors_descendants_and_self() {
        let players = DbPath::parse("players").expect("path");
        let entry = DbPath::parse("players/abc").expect("path");
        let other = DbPath::parse("rooms/1").expect("path");

        assert!(players.overlaps(&entry));
        assert!(entry.overlaps(&players));
        assert!(entry.overlaps(&entry));
        assert!(DbPath::root().overlaps(&other));
        assert!(!players.overlaps(&other));
    }

    #[test]
    fn sibling_with_shared_prefix_text_does_not_overlap() {
        let player = DbPath::parse("players").expect("path");
        let playerish = DbPath::parse("players2").expect("path");
        assert!(!player.overlaps(&playerish));
    }
}
