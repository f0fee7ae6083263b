//! FOP Core Library
//!
//! Rule model and selector canonicalisation for the Filter Orderer and
//! Preener. Everything here is a pure string transform; reading and writing
//! filter list files happens in `fop-cli`.
//!
//! # Modules
//!
//! - `types`: rule model, domain and option tokens, filter syntax constants
//! - `selector`: string-aware canonicalisation of element hiding selectors

pub mod selector;
pub mod types;

// Re-export commonly used types
pub use selector::canonicalize;
pub use types::{
    canonical_domains, canonical_options, has_included_domain, DomainToken, ElementRule,
    FilterRule, OptionToken, Rule, Separator,
};
