//! Cache key for synthesis results.

use std::fmt;

/// Identity of a synthesis result: normalized text plus voice id.
///
/// The text is trimmed and lowercased so that `"Hello world"` and
/// `"hello world  "` share an entry.  Playback rate is deliberately *not*
/// part of the key — the same audio serves every rate.
///
/// ```rust
/// use pronounce_engine::cache::CacheKey;
///
/// let a = CacheKey::new("  Hello World ", "Nova");
/// let b = CacheKey::new("hello world", "Nova");
/// assert_eq!(a, b);
/// assert_eq!(a.text(), "hello world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text: String,
    voice: String,
}

impl CacheKey {
    pub fn new(text: &str, voice: &str) -> Self {
        Self {
            text: text.trim().to_lowercase(),
            voice: voice.to_string(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Flat string form used as the key in the persistent store.
    ///
    /// The unit separator cannot appear in either component, so the
    /// encoding is unambiguous.
    pub fn storage_key(&self) -> String {
        format!("{}\u{1f}{}", self.voice, self.text)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.text, self.voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_text_but_not_voice() {
        let key = CacheKey::new("  Hello World ", "Nova");
        assert_eq!(key.text(), "hello world");
        assert_eq!(key.voice(), "Nova");
    }

    #[test]
    fn distinct_voices_are_distinct_keys() {
        assert_ne!(
            CacheKey::new("hello", "Nova"),
            CacheKey::new("hello", "Aria")
        );
    }

    #[test]
    fn storage_key_round_trips_identity() {
        let a = CacheKey::new("hello world", "Nova");
        let b = CacheKey::new("HELLO WORLD", "Nova");
        assert_eq!(a.storage_key(), b.storage_key());

        let c = CacheKey::new("hello world", "Aria");
        assert_ne!(a.storage_key(), c.storage_key());
    }
}
