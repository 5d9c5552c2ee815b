//! Core types for the avatar cache

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A requested avatar resolution/variant.
///
/// The `Display` form is the stable token used both in cache keys and as the
/// map key in the remote source's JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvatarFormat {
    #[serde(rename = "square_40")]
    Square40,
    #[serde(rename = "square_192")]
    Square192,
    #[serde(rename = "square_360")]
    Square360,
    #[serde(rename = "full")]
    FullSize,
}

impl fmt::Display for AvatarFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            AvatarFormat::Square40 => "square_40",
            AvatarFormat::Square192 => "square_192",
            AvatarFormat::Square360 => "square_360",
            AvatarFormat::FullSize => "full",
        };
        write!(f, "{}", token)
    }
}

/// identity -> format -> URL.
///
/// This is both the shape returned by the remote source (where an empty
/// string URL means "no image for this pair") and the shape returned to the
/// caller (where URLs are presentable).
pub type AvatarMap = HashMap<String, HashMap<AvatarFormat, String>>;

/// Cache key for one (identity, format) pair. Stable across restarts.
pub fn cache_key(name: &str, format: AvatarFormat) -> String {
    format!("{}:{}", name, format)
}

/// Pre-allocate a response with an empty inner map per requested identity,
/// so identities with zero resolved formats still appear.
pub fn alloc_response(names: &[String]) -> AvatarMap {
    let mut res = AvatarMap::with_capacity(names.len());
    for name in names {
        res.entry(name.clone()).or_default();
    }
    res
}

/// Merge remote results into a response, only for identities the response
/// was allocated for. The matrix-shaped remote fetch may return pairs that
/// were never requested; those are ignored here (the population dispatch
/// still warms the cache with them).
pub fn merge_response(res: &mut AvatarMap, fetched: &AvatarMap) {
    for (name, rec) in fetched {
        if let Some(inner) = res.get_mut(name) {
            for (format, url) in rec {
                inner.insert(*format, url.clone());
            }
        }
    }
}

/// One (identity, format) pair being classified for a request.
#[derive(Debug, Clone)]
pub struct LoadPair {
    pub name: String,
    pub format: AvatarFormat,
    /// Cached file path; present for hits and stales.
    pub path: Option<String>,
}

/// The classification of one request: every requested pair lands in exactly
/// one of the three sets.
#[derive(Debug, Default)]
pub struct LoadSpec {
    pub hits: Vec<LoadPair>,
    pub stales: Vec<LoadPair>,
    pub misses: Vec<LoadPair>,
}

impl LoadSpec {
    fn details(pairs: &[LoadPair]) -> (Vec<String>, Vec<AvatarFormat>) {
        let mut names = HashSet::new();
        let mut formats = HashSet::new();
        for pair in pairs {
            names.insert(pair.name.clone());
            formats.insert(pair.format);
        }
        (names.into_iter().collect(), formats.into_iter().collect())
    }

    /// Distinct identities and formats across the miss set, for one batched
    /// remote call.
    pub fn miss_details(&self) -> (Vec<String>, Vec<AvatarFormat>) {
        Self::details(&self.misses)
    }

    /// Distinct identities and formats across the stale set.
    pub fn stale_details(&self) -> (Vec<String>, Vec<AvatarFormat>) {
        Self::details(&self.stales)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_display_tokens() {
        assert_eq!(AvatarFormat::Square40.to_string(), "square_40");
        assert_eq!(AvatarFormat::Square192.to_string(), "square_192");
        assert_eq!(AvatarFormat::Square360.to_string(), "square_360");
        assert_eq!(AvatarFormat::FullSize.to_string(), "full");
    }

    #[test]
    fn test_cache_key_is_stable() {
        assert_eq!(cache_key("alice", AvatarFormat::Square192), "alice:square_192");
        assert_eq!(
            cache_key("alice", AvatarFormat::Square192),
            cache_key("alice", AvatarFormat::Square192)
        );
    }

    #[test]
    fn test_avatar_map_deserializes_format_keys() {
        let json = r#"{"alice": {"square_192": "https://x/a.png", "full": ""}}"#;
        let map: AvatarMap = serde_json::from_str(json).unwrap();
        assert_eq!(
            map["alice"][&AvatarFormat::Square192],
            "https://x/a.png"
        );
        assert_eq!(map["alice"][&AvatarFormat::FullSize], "");
    }

    #[test]
    fn test_alloc_response_covers_all_names() {
        let names = vec!["alice".to_string(), "bob".to_string()];
        let res = alloc_response(&names);
        assert_eq!(res.len(), 2);
        assert!(res["alice"].is_empty());
        assert!(res["bob"].is_empty());
    }

    #[test]
    fn test_merge_ignores_unrequested_identities() {
        let mut res = alloc_response(&["alice".to_string()]);
        let mut fetched = AvatarMap::new();
        fetched
            .entry("alice".to_string())
            .or_default()
            .insert(AvatarFormat::Square40, "https://x/a.png".to_string());
        fetched
            .entry("mallory".to_string())
            .or_default()
            .insert(AvatarFormat::Square40, "https://x/m.png".to_string());

        merge_response(&mut res, &fetched);
        assert_eq!(res["alice"][&AvatarFormat::Square40], "https://x/a.png");
        assert!(!res.contains_key("mallory"));
    }

    #[test]
    fn test_details_deduplicates() {
        let spec = LoadSpec {
            misses: vec![
                LoadPair {
                    name: "alice".to_string(),
                    format: AvatarFormat::Square40,
                    path: None,
                },
                LoadPair {
                    name: "alice".to_string(),
                    format: AvatarFormat::Square192,
                    path: None,
                },
                LoadPair {
                    name: "bob".to_string(),
                    format: AvatarFormat::Square40,
                    path: None,
                },
            ],
            ..Default::default()
        };

        let (names, formats) = spec.miss_details();
        assert_eq!(names.len(), 2);
        assert_eq!(formats.len(), 2);
    }
}
