// SPDX-License-Identifier: MIT

//! Non-volatile memory controller interface.
//!
//! The update protocol never touches program flash directly: the MCU's memory
//! controller owns the page buffer, and software's role is limited to issuing
//! fill/erase/write commands in the correct sequence through this trait. A
//! target binding wraps the self-programming primitives (typically a few
//! protected register writes or inline-assembly stubs); the mock in
//! [`crate::hw::mock`] records the command stream for tests.
//!
//! Programming failures are not independently detectable on the reference
//! hardware, so these operations are infallible here. A target with
//! programming-status feedback should surface it in its own binding and
//! refuse further commands after a failure.

pub trait NvmOps {
    /// Load one 16-bit word into the hardware page buffer at `address`.
    fn fill_page_word(&mut self, address: u32, word: u16);

    /// Erase the application flash page containing `address`, then write the
    /// accumulated page buffer into it.
    fn erase_write_page(&mut self, address: u32);

    /// Erase the user signature row.
    fn erase_user_row(&mut self);

    /// Size in bytes of one application flash page.
    fn page_size(&self) -> u16;
}
