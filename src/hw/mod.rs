// SPDX-License-Identifier: MIT

pub mod bus;
pub mod mock;
pub mod nvm;

pub use bus::BusAddress;
pub use bus::ControllerPort;
pub use bus::Direction;
pub use bus::ControllerStatus;
pub use bus::ResponderEvent;
pub use bus::ResponderPort;
pub use nvm::NvmOps;
