// SPDX-License-Identifier: MIT

//! Scoped interrupt-masking lock.
//!
//! Engine state is written from two contexts: the main line issues requests
//! and the bus interrupt handler advances them. [`Shared`] wraps a value in a
//! `critical_section::Mutex<RefCell<_>>` so every access happens inside a
//! scoped critical section that raises the interrupt mask for its duration
//! and restores it on exit. The interrupt handler goes through the same
//! entry point; on a single core the nested mask is a no-op and it keeps the
//! `RefCell` borrow sound.
//!
//! The closure passed to [`Shared::lock`] runs with interrupts masked: keep
//! it short and never park inside it waiting on another interrupt. The one
//! sanctioned exception is the synchronous bus transfer path, which
//! busy-waits on hardware status by design.
//!
//! Targets provide the `critical-section` implementation (for example the
//! `cortex-m` single-core one); host tests use the crate's `std` feature.

use core::cell::RefCell;
use critical_section::Mutex;

/// A value shared between the main line and an interrupt handler.
pub struct Shared<T> {
    cell: Mutex<RefCell<T>>,
}

impl<T> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self {
            cell: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` on the inner value inside a critical section.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.cell.borrow_ref_mut(cs)))
    }
}
