// SPDX-License-Identifier: MIT

//! Hardware-access traits for the two-wire bus.
//!
//! The transaction engines in [`crate::bus`] are generic over these traits so
//! that one engine type serves every physical bus instance, and so the engine
//! logic can be exercised against the mocks in [`crate::hw::mock`]. A target
//! binding implements them as thin wrappers over its bus register block; all
//! sequencing decisions stay in the engines.

use bitflags::bitflags;
use core::convert::Infallible;

/// 7-bit peer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusAddress(u8);

impl BusAddress {
    /// Build an address, rejecting values above 0x7F.
    pub const fn new(addr: u8) -> Option<Self> {
        if addr <= 0x7F {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Raw 7-bit value.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Transfer direction requested of a controller port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write,
    Read,
}

bitflags! {
    /// Snapshot of the controller-side hardware status flags.
    ///
    /// `WRITE_READY` / `READ_READY` mirror the write/read interrupt flags of
    /// the peripheral: one of them accompanies every bus event. The remaining
    /// bits qualify that event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControllerStatus: u8 {
        /// Write phase event: address or data byte finished clocking out.
        const WRITE_READY = 1 << 0;
        /// Read phase event: a received byte is waiting in the data register.
        const READ_READY = 1 << 1;
        /// The peer answered the last byte with NACK.
        const NACK_RECEIVED = 1 << 2;
        /// Arbitration was lost to another controller.
        const ARBITRATION_LOST = 1 << 3;
        /// Illegal bus condition detected by the peripheral.
        const BUS_ERROR = 1 << 4;
    }
}

impl ControllerStatus {
    /// Whether the event is a bus/arbitration fault.
    pub fn is_fault(self) -> bool {
        self.intersects(Self::ARBITRATION_LOST | Self::BUS_ERROR)
    }
}

/// Controller (initiating) side of one physical bus instance.
///
/// One value of an implementing type exists per enabled bus; the engine owns
/// it exclusively for its lifetime.
pub trait ControllerPort {
    /// Put a start condition plus `addr` and the R/W bit on the bus.
    fn start(&mut self, addr: BusAddress, dir: Direction);

    /// Poll the status flags; `WouldBlock` until a bus event is pending.
    fn poll(&mut self) -> nb::Result<ControllerStatus, Infallible>;

    /// Clock out one data byte.
    fn write_byte(&mut self, byte: u8);

    /// Take the received byte out of the data register.
    fn read_byte(&mut self) -> u8;

    /// ACK the received byte and keep the transfer going.
    fn ack_continue(&mut self);

    /// Issue a stop condition.
    fn stop(&mut self);

    /// NACK the last received byte and issue a stop, per bus convention for
    /// the final byte of a read.
    fn nack_stop(&mut self);

    /// Force the peripheral's bus-state tracking back to idle after a fault.
    fn force_idle(&mut self);

    /// Whether the peripheral currently observes the bus as idle.
    fn is_idle(&self) -> bool;

    /// Gate the bus-event interrupt used by the asynchronous path.
    fn set_event_interrupt(&mut self, enabled: bool);
}

/// Hardware event delivered to the responder engine.
///
/// The target's interrupt handler translates its status register into one of
/// these per invocation and feeds it to
/// [`BusResponder::on_event`](crate::bus::BusResponder::on_event).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponderEvent {
    /// Our own address matched; `controller_reads` is the transaction
    /// direction from the remote controller's point of view.
    Address { controller_reads: bool },
    /// Data event: a received byte is available (controller write) or the
    /// next outbound byte is wanted (controller read).
    Data,
    /// Stop condition observed.
    Stop,
    /// Collision or bus error ended the transaction.
    Fault,
}

/// Responder (reacting) side of one physical bus instance.
pub trait ResponderPort {
    /// Program the peripheral's own 7-bit address match.
    fn set_address(&mut self, addr: BusAddress);

    /// Take the received byte out of the data register.
    fn read_byte(&mut self) -> u8;

    /// Stage the next outbound byte.
    fn write_byte(&mut self, byte: u8);

    /// Complete the current event with an ACK.
    fn ack(&mut self);

    /// Complete the current event with a NACK.
    fn nack(&mut self);

    /// Signal transaction completion to the peripheral.
    fn complete(&mut self);

    /// Release the bus lines after a fault.
    fn release(&mut self);
}
