//! Keyword and regex lore matching, the default strategy.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serene_core::{LoreMatchingStrategy, MatchMessage, MatchableEntry, MatchingError};
use tokio::sync::RwLock;

/// Compiled regex keys by pattern and case sensitivity. `None` marks a
/// pattern that failed to compile.
type RegexCache = HashMap<(String, bool), Option<Regex>>;

/// Matches when any comma-separated key occurs in the message text.
///
/// Keys are plain substrings unless the entry sets `use_regex`. An invalid
/// pattern is logged once and tested as a plain substring instead.
#[derive(Debug, Default)]
pub struct KeywordMatchingStrategy {
    regexes: RwLock<RegexCache>,
}

impl KeywordMatchingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    async fn compiled(&self, key: &str, case_sensitive: bool) -> Option<Regex> {
        let cache_key = (key.to_string(), case_sensitive);
        if let Some(hit) = self.regexes.read().await.get(&cache_key) {
            return hit.clone();
        }
        let compiled = match RegexBuilder::new(key)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(key, error = %e, "Invalid lore regex, using substring match");
                None
            }
        };
        self.regexes
            .write()
            .await
            .insert(cache_key, compiled.clone());
        compiled
    }

    async fn key_matches(
        &self,
        key: &str,
        text: &str,
        case_sensitive: bool,
        use_regex: bool,
    ) -> bool {
        if use_regex {
            if let Some(re) = self.compiled(key, case_sensitive).await {
                return re.is_match(text);
            }
        }

        if case_sensitive {
            text.contains(key)
        } else {
            text.to_lowercase().contains(&key.to_lowercase())
        }
    }
}

#[async_trait]
impl LoreMatchingStrategy for KeywordMatchingStrategy {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn cleanup(&mut self) -> Result<(), MatchingError> {
        self.regexes.get_mut().clear();
        Ok(())
    }

    async fn matches_message(
        &self,
        entry: &dyn MatchableEntry,
        message: &MatchMessage<'_>,
    ) -> Result<bool, MatchingError> {
        let case_sensitive = entry.case_sensitive();
        let use_regex = entry.use_regex();
        for key in entry.key_list() {
            if self
                .key_matches(key, message.text, case_sensitive, use_regex)
                .await
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
