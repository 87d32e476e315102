//! Response cache metadata and tag invalidation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

/// Tag carried by every response built from site config values.
pub const SITE_CONFIG_CACHE_TAG: &str = "site:config";

/// Responses vary by the interface language picked from the URL.
pub const LANGUAGE_CACHE_CONTEXT: &str = "languages:language_url";

/// Cache tags and contexts attached to a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheableMetadata {
    tags: BTreeSet<String>,
    contexts: BTreeSet<String>,
}

impl CacheableMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for anything rendered from site config values.
    pub fn site_config() -> Self {
        Self::new()
            .add_tag(SITE_CONFIG_CACHE_TAG)
            .add_context(LANGUAGE_CACHE_CONTEXT)
    }

    pub fn add_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.contexts.insert(context.into());
        self
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(String::as_str)
    }

    /// Union of both sets of tags and contexts.
    pub fn merge(mut self, other: &CacheableMetadata) -> Self {
        self.tags.extend(other.tags.iter().cloned());
        self.contexts.extend(other.contexts.iter().cloned());
        self
    }
}

/// Invalidates cached responses by tag.
pub trait CacheTagsInvalidator: Send + Sync {
    fn invalidate_tags(&self, tags: &[&str]);
}

/// Records invalidations in memory; useful when no external cache is present.
#[derive(Debug, Default)]
pub struct MemoryCacheTags {
    invalidations: Mutex<HashMap<String, usize>>,
}

impl MemoryCacheTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `tag` has been invalidated.
    pub fn invalidations(&self, tag: &str) -> usize {
        let counts = self
            .invalidations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        counts.get(tag).copied().unwrap_or(0)
    }
}

impl CacheTagsInvalidator for MemoryCacheTags {
    fn invalidate_tags(&self, tags: &[&str]) {
        debug!(?tags, "invalidating cache tags");
        let mut counts = self.invalidations.lock().unwrap_or_else(|poisoned| {
            warn!(?tags, "cache tag lock poisoned, recovering");
            self.invalidations.clear_poison();
            PoisonError::into_inner(poisoned)
        });
        for tag in tags {
            *counts.entry(tag.to_string()).or_default() += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn site_config_metadata() {
        let metadata = CacheableMetadata::site_config();
        assert_eq!(metadata.tags().collect::<Vec<_>>(), ["site:config"]);
        assert_eq!(
            metadata.contexts().collect::<Vec<_>>(),
            ["languages:language_url"]
        );
    }

    #[test]
    fn merge_deduplicates() {
        let merged = CacheableMetadata::site_config()
            .merge(&CacheableMetadata::new().add_tag("site:config").add_tag("node:1"));
        assert_eq!(merged.tags().collect::<Vec<_>>(), ["node:1", "site:config"]);
    }

    #[test]
    fn memory_tags_count_invalidations() {
        let tags = MemoryCacheTags::new();
        assert_eq!(tags.invalidations(SITE_CONFIG_CACHE_TAG), 0);
        tags.invalidate_tags(&[SITE_CONFIG_CACHE_TAG]);
        tags.invalidate_tags(&[SITE_CONFIG_CACHE_TAG, "other"]);
        assert_eq!(tags.invalidations(SITE_CONFIG_CACHE_TAG), 2);
        assert_eq!(tags.invalidations("other"), 1);
    }

    #[test]
    #[traced_test]
    fn invalidation_survives_poisoned_lock() {
        let tags = std::sync::Arc::new(MemoryCacheTags::new());
        let poisoner = tags.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.invalidations.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        tags.invalidate_tags(&[SITE_CONFIG_CACHE_TAG]);
        assert_eq!(tags.invalidations(SITE_CONFIG_CACHE_TAG), 1);
        assert!(logs_contain("cache tag lock poisoned"));
    }
}
