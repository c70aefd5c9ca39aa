// SPDX-License-Identifier: MIT

//! Bounded retry around the asynchronous send.
//!
//! Peripheral drivers sharing a bus routinely see `TransactionInProgress` or
//! `BusNotIdle` when another transfer is still draining. This helper retries
//! those two rejections with a short pause in between, and gives the peers
//! time to recover. Anything else is returned immediately.

use embedded_hal::blocking::delay::DelayUs;

use super::controller::{BusController, SendCompletion};
use super::RequestError;
use crate::hw::bus::{BusAddress, ControllerPort};
use crate::sync::Shared;

/// Attempts used by drivers that have no better idea.
pub const DEFAULT_ATTEMPTS: u8 = 10;

/// Pause between attempts, in microseconds.
pub const RETRY_PAUSE_US: u16 = 100;

/// Try `async_send` up to `attempts` times.
///
/// Retries only the transient pre-flight rejections; `BufferTooLarge` can
/// never succeed and is passed through at once. Returns the last rejection
/// when every attempt fails.
pub fn async_send_retry<P, D>(
    bus: &Shared<BusController<P>>,
    delay: &mut D,
    addr: BusAddress,
    data: &[u8],
    completion: Option<SendCompletion>,
    token: usize,
    attempts: u8,
) -> Result<usize, RequestError>
where
    P: ControllerPort,
    D: DelayUs<u16>,
{
    let mut last = Err(RequestError::BusNotIdle);
    for _ in 0..attempts {
        match bus.lock(|b| b.async_send(addr, data, completion, token)) {
            Ok(n) => return Ok(n),
            Err(e @ (RequestError::TransactionInProgress | RequestError::BusNotIdle)) => {
                last = Err(e);
                delay.delay_us(RETRY_PAUSE_US);
            }
            Err(e) => return Err(e),
        }
    }
    last
}
