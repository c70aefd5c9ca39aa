// SPDX-License-Identifier: MIT

//! Controller-side transaction engine.
//!
//! The engine multiplexes two usage styles over one bus instance:
//!
//! - **Synchronous** [`send`](BusController::send) / [`recv`](BusController::recv)
//!   busy-wait on hardware status between bytes. Simple, but a genuinely
//!   unresponsive peer hangs the caller; callers needing bounded latency use
//!   the asynchronous path (plus [`crate::bus::retry`]).
//! - **Asynchronous** [`async_send`](BusController::async_send) /
//!   [`async_recv`](BusController::async_recv) return immediately after
//!   copying the request into the engine-owned buffer; the transaction is
//!   advanced byte by byte from [`on_interrupt`](BusController::on_interrupt)
//!   and finished by invoking the registered completion exactly once, from
//!   interrupt context. Completions must be short, must not block, and must
//!   not issue another synchronous transaction.
//!
//! At most one asynchronous transaction is in flight per engine; a second
//! request is rejected, never queued. When the engine lives in a
//! [`crate::sync::Shared`], the interrupt handler calls `on_interrupt`
//! through the same lock the main line uses.

use core::convert::Infallible;
use heapless::Vec;

use super::{RequestError, TransferError, TRANSFER_CAPACITY};
use crate::hw::bus::{BusAddress, ControllerPort, ControllerStatus, Direction};

/// Completion callback for an asynchronous write; receives the caller's token
/// and the acknowledged byte count.
pub type SendCompletion = fn(token: usize, result: Result<usize, TransferError>);

/// Completion callback for an asynchronous read; receives the caller's token
/// and the engine-owned buffer holding the received bytes. The slice is only
/// valid for the duration of the call.
pub type RecvCompletion = fn(token: usize, result: Result<&[u8], TransferError>);

enum Completion {
    Send { f: Option<SendCompletion>, token: usize },
    Recv { f: RecvCompletion, token: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Writing,
    Reading,
}

/// One controller engine per enabled physical bus.
pub struct BusController<P: ControllerPort> {
    port: P,
    phase: Phase,
    buffer: Vec<u8, TRANSFER_CAPACITY>,
    progress: usize,
    total: usize,
    completion: Option<Completion>,
}

impl<P: ControllerPort> BusController<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            phase: Phase::Idle,
            buffer: Vec::new(),
            progress: 0,
            total: 0,
            completion: None,
        }
    }

    /// Release the underlying port.
    pub fn free(self) -> P {
        self.port
    }

    /// Access the underlying port, e.g. for target-specific setup.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Whether an asynchronous transaction is in flight.
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    fn wait_event(port: &mut P) -> ControllerStatus {
        match nb::block!(port.poll()) {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }

    /// Synchronously write `data` to the peer at `addr`.
    ///
    /// Returns the number of acknowledged bytes, which is short of
    /// `data.len()` when the peer NACKs mid-frame and `0` when it NACKs the
    /// address itself. `Err(BusFault)` means the status flags reported no
    /// write completion for an event, i.e. the bus is in an illegal state.
    pub fn send(&mut self, addr: BusAddress, data: &[u8]) -> Result<usize, TransferError> {
        self.port.start(addr, Direction::Write);

        let status = Self::wait_event(&mut self.port);
        if !status.contains(ControllerStatus::WRITE_READY) {
            return Err(TransferError::BusFault);
        }
        if status.contains(ControllerStatus::NACK_RECEIVED) {
            self.port.stop();
            return Ok(0);
        }

        let mut sent = 0;
        for &byte in data {
            self.port.write_byte(byte);
            sent += 1;

            let status = Self::wait_event(&mut self.port);
            if !status.contains(ControllerStatus::WRITE_READY) {
                return Err(TransferError::BusFault);
            }
            if status.contains(ControllerStatus::NACK_RECEIVED) {
                break;
            }
        }
        self.port.stop();

        Ok(sent)
    }

    /// Synchronously read `buf.len()` bytes from the peer at `addr`.
    ///
    /// The final byte is answered with NACK + stop per bus convention.
    /// Returns `Ok(0)` when the peer NACKs the address.
    pub fn recv(&mut self, addr: BusAddress, buf: &mut [u8]) -> Result<usize, TransferError> {
        self.port.start(addr, Direction::Read);

        let status = Self::wait_event(&mut self.port);
        if status.is_fault() {
            return Err(TransferError::BusFault);
        }
        if !status.contains(ControllerStatus::READ_READY) {
            self.port.stop();
            return Ok(0);
        }
        if buf.is_empty() {
            self.port.nack_stop();
            return Ok(0);
        }

        let mut count = 0;
        loop {
            buf[count] = self.port.read_byte();
            count += 1;
            if count == buf.len() {
                break;
            }

            self.port.ack_continue();
            let status = Self::wait_event(&mut self.port);
            if status.is_fault() || !status.contains(ControllerStatus::READ_READY) {
                return Err(TransferError::BusFault);
            }
        }
        self.port.nack_stop();

        Ok(count)
    }

    /// Start an asynchronous write of `data` to `addr`.
    ///
    /// On acceptance the engine copies `data` into its owned buffer, arms the
    /// bus-event interrupt and returns `Ok(data.len())` immediately; the
    /// completion (if any) later fires exactly once from interrupt context.
    pub fn async_send(
        &mut self,
        addr: BusAddress,
        data: &[u8],
        completion: Option<SendCompletion>,
        token: usize,
    ) -> Result<usize, RequestError> {
        if data.len() > TRANSFER_CAPACITY {
            return Err(RequestError::BufferTooLarge);
        }
        if self.phase != Phase::Idle {
            return Err(RequestError::TransactionInProgress);
        }
        if !self.port.is_idle() {
            return Err(RequestError::BusNotIdle);
        }

        self.buffer.clear();
        self.buffer.extend_from_slice(data).ok();
        self.progress = 0;
        self.total = data.len();
        self.phase = Phase::Writing;
        self.completion = Some(Completion::Send {
            f: completion,
            token,
        });

        self.port.set_event_interrupt(true);
        self.port.start(addr, Direction::Write);

        Ok(data.len())
    }

    /// Start an asynchronous read of `n` bytes (`1..=TRANSFER_CAPACITY`)
    /// from `addr`.
    ///
    /// The completion fires exactly once from interrupt context with the
    /// engine-owned buffer.
    pub fn async_recv(
        &mut self,
        addr: BusAddress,
        n: usize,
        completion: RecvCompletion,
        token: usize,
    ) -> Result<(), RequestError> {
        if n == 0 || n > TRANSFER_CAPACITY {
            return Err(RequestError::BufferTooLarge);
        }
        if self.phase != Phase::Idle {
            return Err(RequestError::TransactionInProgress);
        }
        if !self.port.is_idle() {
            return Err(RequestError::BusNotIdle);
        }

        self.buffer.clear();
        self.progress = 0;
        self.total = n;
        self.phase = Phase::Reading;
        self.completion = Some(Completion::Recv {
            f: completion,
            token,
        });

        self.port.set_event_interrupt(true);
        self.port.start(addr, Direction::Read);

        Ok(())
    }

    /// Advance the in-flight asynchronous transaction by one hardware event.
    ///
    /// Called once per bus interrupt. Spurious invocations (no event pending,
    /// or no transaction in flight) are ignored.
    pub fn on_interrupt(&mut self) {
        let status = match self.port.poll() {
            Ok(status) => status,
            Err(nb::Error::WouldBlock) => return,
            Err(nb::Error::Other(never)) => match never {},
        };

        match self.phase {
            Phase::Idle => {}
            Phase::Writing => self.step_write(status),
            Phase::Reading => self.step_read(status),
        }
    }

    fn step_write(&mut self, status: ControllerStatus) {
        if status.is_fault() {
            return self.abort(true, TransferError::BusFault);
        }
        if status.contains(ControllerStatus::NACK_RECEIVED) {
            return self.abort(false, TransferError::NoAcknowledgment);
        }
        if !status.contains(ControllerStatus::WRITE_READY) {
            return;
        }

        if self.progress >= self.total {
            // Last byte acknowledged: close out, then notify.
            self.port.stop();
            self.port.set_event_interrupt(false);
            let sent = self.progress;
            self.reset_transaction();
            if let Some(Completion::Send { f: Some(f), token }) = self.completion.take() {
                f(token, Ok(sent));
            }
        } else {
            let byte = self.buffer[self.progress];
            self.port.write_byte(byte);
            self.progress += 1;
        }
    }

    fn step_read(&mut self, status: ControllerStatus) {
        if status.is_fault() {
            return self.abort(true, TransferError::BusFault);
        }
        if status.contains(ControllerStatus::WRITE_READY) {
            // During a read, a write event carries the address NACK.
            if status.contains(ControllerStatus::NACK_RECEIVED) {
                self.abort(false, TransferError::NoAcknowledgment);
            }
            return;
        }
        if !status.contains(ControllerStatus::READ_READY) {
            return;
        }

        let byte = self.port.read_byte();
        self.buffer.push(byte).ok();
        self.progress += 1;

        if self.progress >= self.total {
            self.port.nack_stop();
            self.port.set_event_interrupt(false);
            self.phase = Phase::Idle;
            self.progress = 0;
            self.total = 0;
            if let Some(Completion::Recv { f, token }) = self.completion.take() {
                f(token, Ok(&self.buffer));
            }
        } else {
            self.port.ack_continue();
        }
    }

    fn reset_transaction(&mut self) {
        self.phase = Phase::Idle;
        self.progress = 0;
        self.total = 0;
    }

    fn abort(&mut self, fault: bool, err: TransferError) {
        if fault {
            self.port.force_idle();
        } else {
            self.port.stop();
        }
        self.port.set_event_interrupt(false);
        self.reset_transaction();

        match self.completion.take() {
            Some(Completion::Send { f: Some(f), token }) => f(token, Err(err)),
            Some(Completion::Send { f: None, .. }) => {}
            Some(Completion::Recv { f, token }) => f(token, Err(err)),
            None => {}
        }
    }
}
