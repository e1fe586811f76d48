//! Hermes Auth Core
//!
//! The gateway's admission machinery:
//! - API-key hashing and generation (`crypto`)
//! - Scoped internal service keys (`internal`)
//! - Session-token → user → subscription resolution (`resolver`)
//! - The public-surface IP rate limiter (`rate_limit`)

pub mod crypto;
pub mod internal;
pub mod rate_limit;
pub mod resolver;

pub use crypto::{constant_time_str_eq, generate_api_key, hash_api_key, GeneratedKey};
pub use internal::{InternalKeyRegistry, InternalScope};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use resolver::{AuthResolver, ResolvedSession};
