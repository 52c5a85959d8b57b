//! Identity types shared across Tidings services.
//!
//! Provides the `IdentityHeaders` extractor for gateway-injected identity.

pub mod identity;
