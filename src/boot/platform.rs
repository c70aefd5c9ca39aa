// SPDX-License-Identifier: MIT

//! Update-mode main loop.
//!
//! The protocol work all happens in interrupt context through the responder
//! engine; the foreground loop only paces the keep-alive countdown, blinks
//! the indicator so the device is visibly in update mode, and performs the
//! two exits (boot the application, or reboot through the watchdog).

use crate::hw::nvm::NvmOps;
use crate::sync::Shared;

use super::updater::{TickAction, Updater};

/// Target-specific services the update loop needs.
pub trait Platform {
    /// Transfer control to the resident application. Does not return.
    fn boot_application(&mut self) -> !;

    /// Arm the watchdog with a short timeout so the spin below resets the
    /// device.
    fn arm_watchdog(&mut self);

    /// Drive the update-mode indicator LED.
    fn set_indicator(&mut self, on: bool);

    /// Block until the next tick period elapses.
    fn wait_tick(&mut self);
}

/// Run update mode until one of the exits fires.
///
/// The updater is shared with the bus interrupt, so every access goes
/// through its lock and is kept short.
pub fn run<N, P>(updater: &Shared<Updater<N>>, platform: &mut P) -> !
where
    N: NvmOps,
    P: Platform,
{
    let mut indicator = false;
    loop {
        match updater.lock(|u| u.tick()) {
            TickAction::Stay => {}
            TickAction::BootApplication => platform.boot_application(),
            TickAction::RebootViaWatchdog => {
                platform.arm_watchdog();
                loop {
                    core::hint::spin_loop();
                }
            }
        }

        indicator = !indicator;
        platform.set_indicator(indicator);
        platform.wait_tick();
    }
}
