//! Entitlement handlers.
//!
//! ## Commands
//! - Trial signup
//! - One-time payment
//! - Recurring payment (with schedule reconciliation)
//! - Recurring status notification
//!
//! ## Queries
//! - Check access
//! - Get entitlement details

mod check_access;
mod get_entitlement;
mod register_from_one_time_payment;
mod register_from_recurring_payment;
mod register_from_trial;
mod register_recurring_status;

// Commands
pub use register_from_one_time_payment::{
    RegisterFromOneTimePaymentCommand, RegisterFromOneTimePaymentHandler,
    RegisterFromOneTimePaymentResult,
};
pub use register_from_recurring_payment::{
    RegisterFromRecurringPaymentCommand, RegisterFromRecurringPaymentHandler,
    RegisterFromRecurringPaymentResult, ScheduleChange,
};
pub use register_from_trial::{
    RegisterFromTrialCommand, RegisterFromTrialHandler, RegisterFromTrialResult,
};
pub use register_recurring_status::{
    RegisterRecurringStatusCommand, RegisterRecurringStatusHandler, RegisterRecurringStatusResult,
};

// Queries
pub use check_access::{CheckAccessHandler, CheckAccessQuery, CheckAccessResult};
pub use get_entitlement::{
    EntitlementView, GetEntitlementHandler, GetEntitlementQuery, GetEntitlementResult,
};
