// SPDX-License-Identifier: MIT

pub mod checksum;
pub mod frame;

pub use checksum::checksum;
pub use frame::FailureCode;
