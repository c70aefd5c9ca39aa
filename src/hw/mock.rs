// SPDX-License-Identifier: MIT

//! Scripted hardware mocks.
//!
//! Each mock replays a queue of hardware events and records every command the
//! engine issues, so tests can drive the state machines event by event and
//! assert on the exact register-level command stream. The mocks are plain
//! `heapless` state and work in `no_std` builds as well as host tests.

use core::convert::Infallible;
use heapless::{Deque, Vec};

use super::bus::{
    BusAddress, ControllerPort, ControllerStatus, Direction, ResponderPort,
};
use super::nvm::NvmOps;

const LOG_CAPACITY: usize = 64;

/// One command issued through [`ControllerPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerOp {
    Start { addr: u8, dir: Direction },
    WriteByte(u8),
    AckContinue,
    Stop,
    NackStop,
    ForceIdle,
    EventInterrupt(bool),
}

/// Scripted controller-side bus port.
pub struct MockControllerPort {
    events: Deque<ControllerStatus, LOG_CAPACITY>,
    rx: Deque<u8, LOG_CAPACITY>,
    ops: Vec<ControllerOp, LOG_CAPACITY>,
    idle: bool,
}

impl MockControllerPort {
    pub fn new() -> Self {
        Self {
            events: Deque::new(),
            rx: Deque::new(),
            ops: Vec::new(),
            idle: true,
        }
    }

    /// Queue a status snapshot to be returned by the next `poll`.
    pub fn script_event(&mut self, status: ControllerStatus) {
        self.events.push_back(status).ok();
    }

    /// Queue a byte to be handed out by the next `read_byte`.
    pub fn script_byte(&mut self, byte: u8) {
        self.rx.push_back(byte).ok();
    }

    /// Pretend the bus is busy (or idle again) for pre-flight checks.
    pub fn set_idle(&mut self, idle: bool) {
        self.idle = idle;
    }

    /// Every command issued so far, in order.
    pub fn ops(&self) -> &[ControllerOp] {
        &self.ops
    }

    /// Just the data bytes clocked out so far.
    pub fn written(&self) -> Vec<u8, LOG_CAPACITY> {
        let mut out = Vec::new();
        for op in &self.ops {
            if let ControllerOp::WriteByte(b) = op {
                out.push(*b).ok();
            }
        }
        out
    }

    /// Whether the engine currently has the event interrupt armed.
    pub fn interrupt_enabled(&self) -> bool {
        let mut enabled = false;
        for op in &self.ops {
            if let ControllerOp::EventInterrupt(e) = op {
                enabled = *e;
            }
        }
        enabled
    }

    fn log(&mut self, op: ControllerOp) {
        self.ops.push(op).ok();
    }
}

impl Default for MockControllerPort {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerPort for MockControllerPort {
    fn start(&mut self, addr: BusAddress, dir: Direction) {
        self.idle = false;
        self.log(ControllerOp::Start {
            addr: addr.raw(),
            dir,
        });
    }

    fn poll(&mut self) -> nb::Result<ControllerStatus, Infallible> {
        self.events.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn write_byte(&mut self, byte: u8) {
        self.log(ControllerOp::WriteByte(byte));
    }

    fn read_byte(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }

    fn ack_continue(&mut self) {
        self.log(ControllerOp::AckContinue);
    }

    fn stop(&mut self) {
        self.idle = true;
        self.log(ControllerOp::Stop);
    }

    fn nack_stop(&mut self) {
        self.idle = true;
        self.log(ControllerOp::NackStop);
    }

    fn force_idle(&mut self) {
        self.idle = true;
        self.log(ControllerOp::ForceIdle);
    }

    fn is_idle(&self) -> bool {
        self.idle
    }

    fn set_event_interrupt(&mut self, enabled: bool) {
        self.log(ControllerOp::EventInterrupt(enabled));
    }
}

/// One command issued through [`ResponderPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderOp {
    SetAddress(u8),
    WriteByte(u8),
    Ack,
    Nack,
    Complete,
    Release,
}

/// Scripted responder-side bus port.
pub struct MockResponderPort {
    rx: Deque<u8, LOG_CAPACITY>,
    ops: Vec<ResponderOp, LOG_CAPACITY>,
}

impl MockResponderPort {
    pub fn new() -> Self {
        Self {
            rx: Deque::new(),
            ops: Vec::new(),
        }
    }

    /// Queue a byte to be handed out by the next `read_byte`.
    pub fn script_byte(&mut self, byte: u8) {
        self.rx.push_back(byte).ok();
    }

    /// Every command issued so far, in order.
    pub fn ops(&self) -> &[ResponderOp] {
        &self.ops
    }

    /// Just the data bytes staged for the controller so far.
    pub fn written(&self) -> Vec<u8, LOG_CAPACITY> {
        let mut out = Vec::new();
        for op in &self.ops {
            if let ResponderOp::WriteByte(b) = op {
                out.push(*b).ok();
            }
        }
        out
    }

    fn log(&mut self, op: ResponderOp) {
        self.ops.push(op).ok();
    }
}

impl Default for MockResponderPort {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponderPort for MockResponderPort {
    fn set_address(&mut self, addr: BusAddress) {
        self.log(ResponderOp::SetAddress(addr.raw()));
    }

    fn read_byte(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }

    fn write_byte(&mut self, byte: u8) {
        self.log(ResponderOp::WriteByte(byte));
    }

    fn ack(&mut self) {
        self.log(ResponderOp::Ack);
    }

    fn nack(&mut self) {
        self.log(ResponderOp::Nack);
    }

    fn complete(&mut self) {
        self.log(ResponderOp::Complete);
    }

    fn release(&mut self) {
        self.log(ResponderOp::Release);
    }
}

/// One command issued through [`NvmOps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvmOp {
    Fill { address: u32, word: u16 },
    EraseWrite { address: u32 },
    EraseUserRow,
}

/// Recording NVM controller.
pub struct MockNvm {
    ops: Vec<NvmOp, LOG_CAPACITY>,
    page_size: u16,
}

impl MockNvm {
    pub fn new(page_size: u16) -> Self {
        Self {
            ops: Vec::new(),
            page_size,
        }
    }

    /// Every programming command issued so far, in order.
    pub fn ops(&self) -> &[NvmOp] {
        &self.ops
    }
}

impl NvmOps for MockNvm {
    fn fill_page_word(&mut self, address: u32, word: u16) {
        self.ops.push(NvmOp::Fill { address, word }).ok();
    }

    fn erase_write_page(&mut self, address: u32) {
        self.ops.push(NvmOp::EraseWrite { address }).ok();
    }

    fn erase_user_row(&mut self) {
        self.ops.push(NvmOp::EraseUserRow).ok();
    }

    fn page_size(&self) -> u16 {
        self.page_size
    }
}
