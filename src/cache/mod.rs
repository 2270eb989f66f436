//! Two-tier cache of synthesis results.
//!
//! # Tiers
//!
//! ```text
//! speak(text, voice)
//!   │
//!   ├─ MemoryCache      — process lifetime, bounded (default 10 entries),
//!   │                     holds bytes + derived local playable reference
//!   │
//!   └─ PersistentCache  — survives restarts, holds URL *references* only;
//!                         every read is a best-effort hint validated by a
//!                         play attempt before trust
//! ```
//!
//! Both tiers share [`CacheKey`] — `(normalized text, voice)`; playback
//! rate is not part of the identity.

pub mod key;
pub mod memory;
pub mod persistent;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use key::CacheKey;
pub use memory::{CachedAudio, MemoryCache, MemoryCacheEntry};
pub use persistent::{CacheError, PersistentCache, PersistentEntry};
