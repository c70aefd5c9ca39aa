// SPDX-License-Identifier: MIT

//! In-field firmware update.
//!
//! [`updater`] implements the request/response command set that reprograms
//! the device's own application flash over the bus responder; [`platform`]
//! holds the main control loop that keeps the device in update mode while
//! host traffic is flowing and hands control back to the application (or a
//! watchdog reset) when it is not.

pub mod platform;
pub mod updater;

pub use platform::run;
pub use platform::Platform;
pub use updater::TickAction;
pub use updater::Updater;
