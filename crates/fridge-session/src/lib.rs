//! Authenticated request pipeline for the fridge API
//!
//! Wraps a `Transport` so that every request carries the stored access token
//! and an expired token is renewed transparently. Concurrent requests that
//! hit a 401 while a renewal is already running wait for that renewal instead
//! of starting their own, then replay once with the new token.
//!
//! Request lifecycle:
//! 1. `AuthPipeline::authorize` attaches `Authorization: Bearer <access>` unless
//!    the path is in the No-Auth set
//! 2. The transport executes the call
//! 3. `AuthPipeline::recover` passes everything but a first 401 through untouched
//! 4. On a first 401, `RenewalCoordinator::begin_or_join` starts or joins the
//!    single in-flight renewal
//! 5. Renewal success: the new pair is saved, every waiter replays with the new
//!    access token (at most once)
//! 6. Renewal failure: the store is wiped, `SessionEvent::Expired` is published,
//!    every waiter fails with the same `RenewalError`

pub mod coordinator;
pub mod error;
pub mod events;
pub mod metrics;
pub mod pipeline;

pub use coordinator::{RenewalCoordinator, RenewalOutcome};
pub use error::{Error, RenewalError, Result};
pub use events::SessionEvent;
pub use pipeline::{AuthPipeline, DEFAULT_RENEWAL_TIMEOUT};
