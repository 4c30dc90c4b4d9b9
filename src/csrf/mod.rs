//! CSRF token subsystem.
//!
//! # Data Flow
//! ```text
//! ensure_valid_token()
//!     → cached? return it
//!     → refresh_token()
//!         → sources.request_cookie() → page meta `csrf-token`
//!         → sources.request_token()  → {token}
//!         → sources.meta_token()     (token from the initial page load)
//!         → none: 419 "No CSRF token available after refresh attempts"
//! ```
//!
//! # Design Decisions
//! - The manager is the only holder of the token; other components go
//!   through `get_token`/`refresh_token`/`set_token`/`clear_token`
//! - Source failures are logged and swallowed until every source is tried

pub mod manager;
pub mod meta;
pub mod sources;

pub use manager::{CsrfTokenManager, NO_TOKEN_MESSAGE};
pub use meta::PageMeta;
pub use sources::{HttpTokenSources, TokenSources};
