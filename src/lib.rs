//! Zonegate - the control-plane core for authoritative DNS zones.
//!
//! This crate decides, per incoming request, three things the surrounding
//! service must get right: *is this request authentic?*, *is this zone
//! well-formed?*, and *does this PTR record belong in this zone?*. The HTTP
//! routing layer, the persistent stores, and the change-processing pipeline
//! all live outside; they talk to this core through small injected traits.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          zonegate                               │
//! │                                                                 │
//! │   HTTP layer ──▶ ┌───────────────┐     ┌──────────────────┐    │
//! │   (external)     │ Authenticator │────▶│ AuthPrincipal-   │    │
//! │                  │  (SigV4)      │     │ Provider (trait) │    │
//! │                  └──────┬────────┘     └──────────────────┘    │
//! │                         │ CryptoAlgebra                         │
//! │                         ▼                                       │
//! │                  ┌───────────────┐     ┌──────────────────┐    │
//! │                  │ Zone model &  │────▶│ ZoneRepository   │    │
//! │                  │ validation    │     │ (trait, external)│    │
//! │                  └──────┬────────┘     └──────────────────┘    │
//! │                         │                                       │
//! │                         ▼                                       │
//! │                  ┌───────────────┐                              │
//! │                  │ Reverse-zone  │  PTR ↔ IP, CIDR membership  │
//! │                  │ helpers       │                              │
//! │                  └───────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dependency order is leaves-first: the crypto algebra is a pure leaf, the
//! zone model depends on crypto and the field validators, the reverse-zone
//! helpers depend on the zone model, and the authenticator depends on crypto
//! plus an injected principal provider. No component imports from above it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zonegate::{Authenticator, MemoryAuthPrincipalProvider, NoOpCrypto, SignedRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = Arc::new(MemoryAuthPrincipalProvider::new());
//!     let authenticator = Authenticator::new(provider, Arc::new(NoOpCrypto), false);
//!
//!     let request = SignedRequest::new("GET", "/zones")
//!         .header("Host", "api.example.com")
//!         .header("X-Amz-Date", "20180101T000000Z")
//!         .header("Authorization", "AWS4-HMAC-SHA256 Credential=...");
//!
//!     let outcome = authenticator.authenticate(&request, "").await.unwrap();
//!     println!("{outcome:?}");
//! }
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod metrics;
pub mod reverse;
pub mod telemetry;
pub mod validation;
pub mod zone;

// Re-export main types
pub use auth::{
    AuthPrincipalProvider, AuthenticationOutcome, Authenticator, MemoryAuthPrincipalProvider,
    Principal, SignedRequest,
};
pub use config::{AuthConfig, Config, CryptoConfig, TelemetryConfig};
pub use crypto::{Aes256GcmCrypto, CryptoAlgebra, NoOpCrypto};
pub use error::Error;
pub use reverse::{ptr_is_in_zone, InvalidRequest};
pub use validation::ValidationError;
pub use zone::{
    AccessLevel, AclRule, Zone, ZoneAcl, ZoneConnection, ZoneRepository, ZoneRequest, ZoneStatus,
};
