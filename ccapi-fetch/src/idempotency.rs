//! Idempotency key generation.
//!
//! Mutating requests carry an `X-Idempotency-Key` header so the backend can
//! deduplicate replays. Keys come from the first [`KeySource`] in the chain
//! that can produce one:
//!
//! 1. [`PlatformUuid`] - the platform UUIDv4 generator
//! 2. [`SecureRandomUuid`] - UUIDv4 assembled from 16 bytes of system randomness
//! 3. [`CounterFallback`] - timestamp plus an in-process counter
//!
//! Fallback keys start with [`FALLBACK_PREFIX`] so they can never be mistaken
//! for a UUID. They are not cryptographically unique, only unique enough for
//! deduplication within a short window.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};

use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, warn};

/// Header carrying the idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

/// Prefix of keys produced by [`CounterFallback`].
pub const FALLBACK_PREFIX: &str = "fallback-";

// ============================================================================
// Key Sources
// ============================================================================

/// A strategy for producing idempotency keys.
///
/// Returning `None` means the capability is unavailable right now and the
/// next source in the chain should be tried.
pub trait KeySource: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Produces a key, or `None` if this source cannot.
    fn generate(&self) -> Option<String>;
}

/// UUIDv4 from the platform generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformUuid;

impl KeySource for PlatformUuid {
    fn name(&self) -> &'static str {
        "platform_uuid"
    }

    fn generate(&self) -> Option<String> {
        Some(uuid::Uuid::new_v4().to_string())
    }
}

/// UUIDv4 assembled by hand from the system's secure random source.
#[derive(Debug)]
pub struct SecureRandomUuid {
    rng: SystemRandom,
}

impl SecureRandomUuid {
    /// Creates the source.
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SecureRandomUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for SecureRandomUuid {
    fn name(&self) -> &'static str {
        "secure_random"
    }

    fn generate(&self) -> Option<String> {
        let mut bytes = [0u8; 16];
        if let Err(e) = self.rng.fill(&mut bytes) {
            debug!(error = ?e, "System random source unavailable");
            return None;
        }
        Some(format_uuid_v4(bytes))
    }
}

/// Process-wide fallback counter, shared by every [`CounterFallback`].
static FALLBACK_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Timestamp-plus-counter keys for environments without randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterFallback;

impl CounterFallback {
    /// Advances the shared counter, wrapping at 16 bits.
    fn next_counter() -> u32 {
        let previous = FALLBACK_COUNTER
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some((n + 1) & 0xffff)
            })
            .unwrap_or_default();
        (previous + 1) & 0xffff
    }
}

impl KeySource for CounterFallback {
    fn name(&self) -> &'static str {
        "counter_fallback"
    }

    fn generate(&self) -> Option<String> {
        let now = chrono::Utc::now().timestamp_millis();
        let counter = Self::next_counter();
        Some(format!("{FALLBACK_PREFIX}{now:x}-{counter:04x}"))
    }
}

/// Formats 16 random bytes as a canonical RFC 4122 version 4 UUID.
///
/// The version nibble is forced to 4 and the variant bits to `10`.
pub fn format_uuid_v4(mut bytes: [u8; 16]) -> String {
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let mut out = String::with_capacity(36);
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// Generator
// ============================================================================

/// Ordered chain of key sources.
pub struct IdempotencyKeyGenerator {
    sources: Vec<Box<dyn KeySource>>,
}

impl IdempotencyKeyGenerator {
    /// Creates the default chain: platform UUID, secure random, counter.
    pub fn new() -> Self {
        Self::with_sources(vec![
            Box::new(PlatformUuid),
            Box::new(SecureRandomUuid::new()),
            Box::new(CounterFallback),
        ])
    }

    /// Creates a generator from an explicit chain.
    ///
    /// If every source declines, [`new_key`](Self::new_key) still returns a
    /// counter fallback key.
    pub fn with_sources(sources: Vec<Box<dyn KeySource>>) -> Self {
        Self { sources }
    }

    /// Returns the source names in lookup order.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Produces a new key from the first available source.
    pub fn new_key(&self) -> String {
        for source in &self.sources {
            if let Some(key) = source.generate() {
                return key;
            }
            debug!(source = source.name(), "Key source unavailable, trying next");
        }

        warn!("All idempotency key sources unavailable, using counter fallback");
        CounterFallback.generate().unwrap_or_default()
    }
}

impl Default for IdempotencyKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdempotencyKeyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyKeyGenerator")
            .field("sources", &self.source_names())
            .finish()
    }
}

/// Returns true if `key` is a canonical lowercase version 4 UUID.
pub fn is_uuid_v4(key: &str) -> bool {
    uuid::Uuid::try_parse(key).is_ok_and(|id| {
        id.get_version_num() == 4
            && id.get_variant() == uuid::Variant::RFC4122
            && id.hyphenated().to_string() == key
    })
}

/// Returns true if `key` was produced by [`CounterFallback`].
pub fn is_fallback_key(key: &str) -> bool {
    key.strip_prefix(FALLBACK_PREFIX)
        .and_then(|rest| rest.split_once('-'))
        .is_some_and(|(ts, counter)| {
            !ts.is_empty()
                && ts.chars().all(|c| c.is_ascii_hexdigit())
                && counter.len() == 4
                && counter.chars().all(|c| c.is_ascii_hexdigit())
        })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct Unavailable;

    impl KeySource for Unavailable {
        fn name(&self) -> &'static str {
            "unavailable"
        }

        fn generate(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_platform_uuid_is_v4() {
        let key = PlatformUuid.generate().unwrap();
        assert!(is_uuid_v4(&key), "{key}");
    }

    #[test]
    fn test_secure_random_uuid_is_v4() {
        let source = SecureRandomUuid::new();
        let key = source.generate().unwrap();
        assert!(is_uuid_v4(&key), "{key}");
        assert_ne!(key, source.generate().unwrap());
    }

    #[test]
    fn test_format_uuid_forces_version_and_variant() {
        let key = format_uuid_v4([0xff; 16]);
        assert_eq!(key, "ffffffff-ffff-4fff-bfff-ffffffffffff");

        let key = format_uuid_v4([0x00; 16]);
        assert_eq!(key, "00000000-0000-4000-8000-000000000000");
        assert!(is_uuid_v4(&key));
    }

    #[test]
    fn test_fallback_key_format() {
        let key = CounterFallback.generate().unwrap();
        assert!(key.starts_with(FALLBACK_PREFIX));
        assert!(is_fallback_key(&key), "{key}");
        assert!(!is_uuid_v4(&key));
    }

    #[test]
    fn test_fallback_keys_are_distinct() {
        let keys: HashSet<String> = (0..100)
            .filter_map(|_| CounterFallback.generate())
            .collect();
        assert_eq!(keys.len(), 100);
    }

    #[test]
    fn test_chain_skips_unavailable_sources() {
        let generator = IdempotencyKeyGenerator::with_sources(vec![
            Box::new(Unavailable),
            Box::new(SecureRandomUuid::new()),
        ]);
        assert!(is_uuid_v4(&generator.new_key()));

        let generator =
            IdempotencyKeyGenerator::with_sources(vec![Box::new(Unavailable), Box::new(CounterFallback)]);
        assert!(is_fallback_key(&generator.new_key()));
    }

    #[test]
    fn test_empty_chain_still_produces_fallback() {
        let generator = IdempotencyKeyGenerator::with_sources(vec![Box::new(Unavailable)]);
        assert!(is_fallback_key(&generator.new_key()));
    }

    #[test]
    fn test_default_chain_order() {
        let generator = IdempotencyKeyGenerator::new();
        assert_eq!(
            generator.source_names(),
            vec!["platform_uuid", "secure_random", "counter_fallback"]
        );
    }

    #[test]
    fn test_keys_are_unique() {
        let generator = IdempotencyKeyGenerator::new();
        let keys: HashSet<String> = (0..1000).map(|_| generator.new_key()).collect();
        assert_eq!(keys.len(), 1000);
    }
}
