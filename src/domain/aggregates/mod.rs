//! Aggregates module
pub mod order;
pub mod refund;

pub use order::{Billing, Order, OrderError, OrderItem, PickupOverride, ReturnBooking, ReturnTracking, Totals};
pub use refund::{Decision, RefundError, RefundRequest, RefundStatus};
