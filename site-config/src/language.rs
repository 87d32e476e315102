//! Current interface language.

/// Language code used when nothing more specific is known.
pub const DEFAULT_LANGCODE: &str = "en";

/// Whether `langcode` is a plain language tag: ASCII lowercase letters,
/// digits and hyphens. Codes become part of storage keys and paths.
pub fn is_valid_langcode(langcode: &str) -> bool {
    !langcode.is_empty()
        && !langcode.starts_with('-')
        && langcode
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Supplies the language of the current request.
pub trait LanguageContext: Send + Sync {
    fn current_language(&self) -> &str;
}

/// A language context that always answers with the same code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedLanguage(String);

impl FixedLanguage {
    pub fn new(langcode: impl Into<String>) -> Self {
        Self(langcode.into())
    }
}

impl Default for FixedLanguage {
    fn default() -> Self {
        Self::new(DEFAULT_LANGCODE)
    }
}

impl LanguageContext for FixedLanguage {
    fn current_language(&self) -> &str {
        &self.0
    }
}
