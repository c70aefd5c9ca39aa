// SPDX-License-Identifier: MIT

//! Responder-side transaction engine.
//!
//! Entirely reactive: the target's interrupt handler translates each hardware
//! event into a [`ResponderEvent`] and feeds it to
//! [`BusResponder::on_event`]. The engine runs the
//! `Idle -> Receiving -> Idle` / `Idle -> Sending -> Idle` state machine and
//! calls into its long-lived [`ResponderClient`] at the transaction
//! boundaries. Client callbacks run strictly inside the hardware-event path:
//! they must be short, must not block and must not start bus transactions of
//! their own.

use heapless::Vec;

use crate::hw::bus::{BusAddress, ResponderEvent, ResponderPort};

/// Capacity of the inbound accumulation buffer, in bytes.
pub const RECV_CAPACITY: usize = 32;

/// Capacity of the outbound staging buffer, in bytes.
pub const SEND_CAPACITY: usize = 32;

/// Client of one responder engine, bound at construction.
pub trait ResponderClient {
    /// A transaction boundary was reached (stop or error, either direction).
    /// Clear any per-transaction flags here.
    fn on_reset(&mut self) {}

    /// A controller-write transaction ended; `frame` is the complete
    /// accumulated buffer. May be empty (address match with no data);
    /// clients ignore empty deliveries.
    fn on_receive(&mut self, frame: &[u8]);

    /// A controller-read transaction is starting: provision `buf` and return
    /// the number of bytes to send. Must be `<= buf.len()` (the engine clamps
    /// regardless); returning 0 NACKs the address.
    fn fill_transmit(&mut self, buf: &mut [u8]) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Receiving,
    Sending,
}

/// One responder engine per enabled physical bus.
pub struct BusResponder<P: ResponderPort, C: ResponderClient> {
    port: P,
    client: C,
    state: State,
    recv: Vec<u8, RECV_CAPACITY>,
    send: Vec<u8, SEND_CAPACITY>,
    sent: usize,
}

impl<P: ResponderPort, C: ResponderClient> BusResponder<P, C> {
    pub fn new(port: P, client: C) -> Self {
        Self {
            port,
            client,
            state: State::Idle,
            recv: Vec::new(),
            send: Vec::new(),
            sent: 0,
        }
    }

    /// Release the port and the client.
    pub fn free(self) -> (P, C) {
        (self.port, self.client)
    }

    /// Program our own 7-bit address match.
    pub fn set_address(&mut self, addr: BusAddress) {
        self.port.set_address(addr);
    }

    /// Access the underlying port, e.g. for target-specific setup.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Handle one hardware event. Called from the bus interrupt.
    pub fn on_event(&mut self, event: ResponderEvent) {
        match event {
            ResponderEvent::Address { controller_reads } => {
                // A repeated start arrives without a stop in between; close
                // out the previous transaction first.
                self.end_transaction();
                if controller_reads {
                    self.begin_send();
                } else {
                    self.begin_receive();
                }
            }
            ResponderEvent::Data => match self.state {
                State::Receiving => self.receive_byte(),
                State::Sending => self.send_byte(),
                State::Idle => {}
            },
            ResponderEvent::Stop => self.end_transaction(),
            ResponderEvent::Fault => {
                self.port.release();
                self.end_transaction();
            }
        }
    }

    fn begin_receive(&mut self) {
        self.recv.clear();
        self.state = State::Receiving;
        self.port.ack();
    }

    fn begin_send(&mut self) {
        let mut staging = [0u8; SEND_CAPACITY];
        let n = self.client.fill_transmit(&mut staging).min(SEND_CAPACITY);

        self.send.clear();
        self.send.extend_from_slice(&staging[..n]).ok();
        self.sent = 0;

        if n == 0 {
            // Nothing to provide: refuse the address.
            self.port.nack();
            self.state = State::Idle;
        } else {
            self.state = State::Sending;
            self.port.ack();
        }
    }

    fn receive_byte(&mut self) {
        let byte = self.port.read_byte();
        if self.recv.push(byte).is_ok() {
            self.port.ack();
        } else {
            // Buffer exhausted: refuse further bytes.
            self.port.nack();
        }
    }

    fn send_byte(&mut self) {
        if self.sent < self.send.len() {
            let byte = self.send[self.sent];
            self.sent += 1;
            self.port.write_byte(byte);
        } else {
            // Controller kept reading past our buffer.
            self.port.complete();
        }
    }

    fn end_transaction(&mut self) {
        match self.state {
            State::Idle => {}
            State::Receiving => {
                self.state = State::Idle;
                self.client.on_receive(&self.recv);
                self.recv.clear();
                self.client.on_reset();
            }
            State::Sending => {
                self.state = State::Idle;
                self.send.clear();
                self.sent = 0;
                self.client.on_reset();
            }
        }
    }
}
