// SPDX-License-Identifier: MIT

//! Bus transaction engines.
//!
//! [`controller`] drives transactions we initiate, [`responder`] reacts to an
//! external controller, [`retry`] wraps the asynchronous send for callers
//! that tolerate a busy bus. One engine value exists per physical bus
//! instance; sharing between the main line and the bus interrupt goes through
//! [`crate::sync::Shared`].

pub mod controller;
pub mod responder;
pub mod retry;

pub use controller::BusController;
pub use responder::BusResponder;
pub use responder::ResponderClient;
pub use retry::async_send_retry;

/// Capacity of the engine-owned transfer buffers, in bytes.
pub const TRANSFER_CAPACITY: usize = 32;

/// Pre-flight rejection of an asynchronous request. Nothing was put on the
/// bus; the caller may retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// The request does not fit the engine's internal buffer.
    BufferTooLarge,
    /// Another asynchronous transaction is still in flight.
    TransactionInProgress,
    /// The peripheral does not observe the bus as idle.
    BusNotIdle,
}

/// Failure of a transaction that was already on the bus. Surfaced via return
/// code on the synchronous path and via the completion callback on the
/// asynchronous path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// The peer did not acknowledge.
    NoAcknowledgment,
    /// Bus error or arbitration loss.
    BusFault,
}
