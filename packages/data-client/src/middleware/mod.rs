//! Legacy per-operation hooks applied directly on a [`BaseClient`].
//!
//! Middleware rewrite an operation in place before the base client executes
//! it. Unlike extensions they cannot wrap the call or observe its result.
//!
//! [`BaseClient`]: crate::client::base::BaseClient

pub mod booking_reference;

use crate::operation::Operation;

pub use self::booking_reference::BookingReferenceMiddleware;

pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn before(&self, op: &mut Operation);
}
