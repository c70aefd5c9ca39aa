// SPDX-License-Identifier: MIT

//! # Omnibus
//!
//! Bus transaction core and in-field firmware-update protocol for small
//! robotics MCUs.
//!
//! The crate covers the two pieces of a board-support layer that coordinate
//! concurrent, failure-prone hardware state: the interrupt-driven bus engines
//! (controller and responder sides of a shared two-wire bus) and the
//! self-reprogramming update protocol that rides on the responder side.
//! Peripheral drivers sit on top of these as ordinary bus clients.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hw`] | Narrow hardware-access traits (bus ports, NVM controller) + mocks |
//! | [`bus`] | Controller/responder transaction engines and the retry helper |
//! | [`protocol`] | Fletcher-16 checksum and update-protocol frame codec |
//! | [`boot`] | Firmware updater, keep-alive countdown, main control loop |
//! | [`sync`] | Scoped interrupt-masking lock shared between main line and ISR |
//!
//! All hardware access is isolated behind the traits in [`hw`]; a target
//! binding implements them over its register blocks, and the bundled mocks
//! implement them for host-side tests. The engines themselves are
//! target-agnostic.
//!
//! ## License
//!
//! Licensed under the **MIT License**.

#![cfg_attr(not(test), no_std)]

pub mod boot;
pub mod bus;
pub mod hw;
pub mod protocol;
pub mod sync;
