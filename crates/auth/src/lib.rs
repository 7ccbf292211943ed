//! `journalplus-auth` — pure authorization boundary.
//!
//! Decoupled from any host: documents ask a [`PermissionCheck`] before they
//! post, and [`Principal`] is the policy-backed implementation.

pub mod authorize;
pub mod permissions;
pub mod principal;

pub use authorize::{AllowAll, AuthzError, DocRef, PermissionCheck, Principal, authorize};
pub use permissions::{Permission, PermissionAction};
pub use principal::{CompanyMembership, PrincipalId};
