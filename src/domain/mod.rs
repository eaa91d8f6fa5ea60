//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `entitlement` - Entitlement record, plans, tariffs and the extension rule

pub mod entitlement;
pub mod foundation;
