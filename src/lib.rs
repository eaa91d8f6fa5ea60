//! Lumos Access - Paid-access entitlement service
//!
//! This crate reconciles trial signups, one-time payments, recurring
//! payments and subscription status notifications into one entitlement
//! record per customer email, and answers access checks against it.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
