//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod entitlement;

pub use entitlement::{
    // Commands and Results
    RegisterFromOneTimePaymentCommand, RegisterFromOneTimePaymentHandler,
    RegisterFromOneTimePaymentResult, RegisterFromRecurringPaymentCommand,
    RegisterFromRecurringPaymentHandler, RegisterFromRecurringPaymentResult,
    RegisterFromTrialCommand, RegisterFromTrialHandler, RegisterFromTrialResult,
    RegisterRecurringStatusCommand, RegisterRecurringStatusHandler,
    RegisterRecurringStatusResult, ScheduleChange,
    // Queries
    CheckAccessHandler, CheckAccessQuery, CheckAccessResult, EntitlementView,
    GetEntitlementHandler, GetEntitlementQuery, GetEntitlementResult,
};
