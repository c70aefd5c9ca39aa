// SPDX-License-Identifier: MIT

//! Firmware-update protocol handler.
//!
//! Runs entirely inside the responder engine's receive path: every delivered
//! frame is checked against its trailing Fletcher-16 checksum, dispatched on
//! its register id, and answered with a staged frame that the next
//! controller-read picks up through `fill_transmit`.
//!
//! Checksum policy is uniformly fail-closed: a frame that does not verify is
//! answered `InvalidChecksum` and its command is not executed. A mistake here
//! corrupts the device's only copy of its program memory, so no command runs
//! on unverified input.

use byteorder::{ByteOrder, LittleEndian};
use heapless::Vec;

use crate::bus::responder::ResponderClient;
use crate::hw::nvm::NvmOps;
use crate::protocol::frame::{self, FailureCode};

/// Capacity of the staged answer, checksum included.
pub const ANSWER_CAPACITY: usize = 32;

/// Ticks of host silence before control transfers to the application.
/// 20 ticks of 50 ms ≈ 1 s.
pub const KEEP_ALIVE_TICKS: u8 = 20;

/// Main-loop tick period, in milliseconds.
pub const TICK_PERIOD_MS: u32 = 50;

/// Smallest full PushPage frame: id + 32-bit address + checksum.
const PUSH_PAGE_MIN_FRAME: usize = 7;

/// What the main loop should do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickAction {
    /// Stay in update mode.
    Stay,
    /// Keep-alive expired: jump to the resident application.
    BootApplication,
    /// A Reboot command was latched: arm the watchdog and spin.
    RebootViaWatchdog,
}

/// Update-protocol state, one per device.
pub struct Updater<N: NvmOps> {
    nvm: N,
    answer: Vec<u8, ANSWER_CAPACITY>,
    keep_alive: u8,
    reboot_requested: bool,
}

impl<N: NvmOps> Updater<N> {
    pub fn new(nvm: N) -> Self {
        Self {
            nvm,
            answer: Vec::new(),
            keep_alive: KEEP_ALIVE_TICKS,
            reboot_requested: false,
        }
    }

    /// Whether a Reboot command has been latched.
    pub fn reboot_requested(&self) -> bool {
        self.reboot_requested
    }

    /// The currently staged answer frame, checksum included.
    pub fn answer(&self) -> &[u8] {
        &self.answer
    }

    /// Advance the keep-alive countdown by one main-loop tick.
    pub fn tick(&mut self) -> TickAction {
        if self.reboot_requested {
            return TickAction::RebootViaWatchdog;
        }
        if self.keep_alive == 0 {
            return TickAction::BootApplication;
        }
        self.keep_alive -= 1;
        TickAction::Stay
    }

    /// Validate and execute one received frame, staging the answer.
    pub fn handle_frame(&mut self, frame_bytes: &[u8]) {
        if frame_bytes.len() < frame::MIN_FRAME_SIZE {
            return self.stage_failure(FailureCode::InvalidFrameSize);
        }
        if !frame::verify(frame_bytes) {
            return self.stage_failure(FailureCode::InvalidChecksum);
        }

        let register_id = frame_bytes[0];
        let payload = &frame_bytes[1..frame_bytes.len() - frame::CHECKSUM_SIZE];

        if matches!(
            register_id,
            frame::REG_INFO | frame::REG_PUSH_PAGE | frame::REG_COMMIT_PAGE | frame::REG_REBOOT
        ) {
            // Recognized host traffic: stay in update mode.
            self.keep_alive = KEEP_ALIVE_TICKS;
        }

        match register_id {
            frame::REG_INFO => {
                let mut body = [0u8; 3];
                body[0] = frame::REG_ANSWER_INFO;
                LittleEndian::write_u16(&mut body[1..], self.nvm.page_size());
                self.stage_answer(&body);
            }
            frame::REG_PUSH_PAGE => self.push_page(frame_bytes.len(), payload),
            frame::REG_COMMIT_PAGE => {
                if payload.len() < 4 {
                    return self.stage_failure(FailureCode::InvalidFrameSize);
                }
                let address = LittleEndian::read_u32(&payload[..4]);
                self.nvm.erase_write_page(address);
                self.stage_failure(FailureCode::Success);
            }
            frame::REG_REBOOT => {
                self.reboot_requested = true;
                self.stage_failure(FailureCode::Success);
            }
            _ => self.stage_failure(FailureCode::InvalidRegisterId),
        }
    }

    /// PushPage: a 32-bit address followed by an even number of data bytes.
    ///
    /// `frame_len` counts the full frame including checksum; a frame with no
    /// data bytes is a valid no-op. Each 16-bit little-endian word is loaded
    /// into the hardware page buffer at its offset from `address`.
    fn push_page(&mut self, frame_len: usize, payload: &[u8]) {
        if frame_len < PUSH_PAGE_MIN_FRAME || (frame_len - PUSH_PAGE_MIN_FRAME) % 2 != 0 {
            return self.stage_failure(FailureCode::InvalidFrameSize);
        }

        let address = LittleEndian::read_u32(&payload[..4]);
        let data = &payload[4..];
        for (i, word) in data.chunks_exact(2).enumerate() {
            let offset = (i as u32) * 2;
            self.nvm.fill_page_word(address + offset, LittleEndian::read_u16(word));
        }

        self.stage_failure(FailureCode::Success);
    }

    /// Stage `body` as the next answer, clamped to capacity, and seal it.
    fn stage_answer(&mut self, body: &[u8]) {
        self.answer.clear();
        let max = ANSWER_CAPACITY - frame::CHECKSUM_SIZE;
        let n = body.len().min(max);
        self.answer.extend_from_slice(&body[..n]).ok();
        // Cannot overflow: clamped above.
        frame::seal(&mut self.answer).ok();
    }

    fn stage_failure(&mut self, code: FailureCode) {
        self.stage_answer(&[frame::REG_ANSWER_FAILURE, code as u8]);
    }
}

impl<N: NvmOps> ResponderClient for Updater<N> {
    fn on_receive(&mut self, frame: &[u8]) {
        if frame.is_empty() {
            return;
        }
        self.handle_frame(frame);
    }

    fn fill_transmit(&mut self, buf: &mut [u8]) -> usize {
        let n = self.answer.len().min(buf.len());
        buf[..n].copy_from_slice(&self.answer[..n]);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::mock::{MockNvm, NvmOp};
    use crate::protocol::checksum;

    const PAGE_SIZE: u16 = 512;

    fn updater() -> Updater<MockNvm> {
        Updater::new(MockNvm::new(PAGE_SIZE))
    }

    /// Build a request frame with a valid checksum.
    fn sealed(body: &[u8]) -> std::vec::Vec<u8> {
        let mut out = body.to_vec();
        out.extend_from_slice(&checksum(body).to_le_bytes());
        out
    }

    fn failure_answer(code: FailureCode) -> std::vec::Vec<u8> {
        sealed(&[frame::REG_ANSWER_FAILURE, code as u8])
    }

    #[test]
    fn info_answers_page_size() {
        let mut u = updater();
        u.handle_frame(&sealed(&[frame::REG_INFO]));

        assert_eq!(u.answer(), &sealed(&[frame::REG_ANSWER_INFO, 0x00, 0x02])[..]);
        assert!(frame::verify(u.answer()));
    }

    #[test]
    fn push_page_fills_words_little_endian() {
        let mut u = updater();
        // address 0x00002000, data 01 02 03 04
        u.handle_frame(&sealed(&[
            frame::REG_PUSH_PAGE,
            0x00,
            0x20,
            0x00,
            0x00,
            0x01,
            0x02,
            0x03,
            0x04,
        ]));

        assert_eq!(
            u.nvm.ops(),
            &[
                NvmOp::Fill {
                    address: 0x0000_2000,
                    word: 0x0201
                },
                NvmOp::Fill {
                    address: 0x0000_2002,
                    word: 0x0403
                },
            ]
        );
        assert_eq!(u.answer(), &failure_answer(FailureCode::Success)[..]);
    }

    #[test]
    fn push_page_without_data_is_a_noop_success() {
        let mut u = updater();
        u.handle_frame(&sealed(&[frame::REG_PUSH_PAGE, 0x00, 0x20, 0x00, 0x00]));

        assert!(u.nvm.ops().is_empty());
        assert_eq!(u.answer(), &failure_answer(FailureCode::Success)[..]);
    }

    #[test]
    fn push_page_short_frame_rejected() {
        let mut u = updater();
        // 6 bytes before the checksum: address is truncated.
        u.handle_frame(&sealed(&[frame::REG_PUSH_PAGE, 0x00, 0x20, 0x00, 0x00, 0x01]));

        assert!(u.nvm.ops().is_empty());
        assert_eq!(u.answer(), &failure_answer(FailureCode::InvalidFrameSize)[..]);
    }

    #[test]
    fn push_page_odd_data_rejected() {
        let mut u = updater();
        u.handle_frame(&sealed(&[
            frame::REG_PUSH_PAGE,
            0x00,
            0x20,
            0x00,
            0x00,
            0x01,
            0x02,
            0x03,
        ]));

        assert!(u.nvm.ops().is_empty());
        assert_eq!(u.answer(), &failure_answer(FailureCode::InvalidFrameSize)[..]);
    }

    #[test]
    fn corrupted_checksum_is_fail_closed_for_push_page() {
        let mut u = updater();
        let mut req = sealed(&[
            frame::REG_PUSH_PAGE,
            0x00,
            0x20,
            0x00,
            0x00,
            0x01,
            0x02,
        ]);
        let last = req.len() - 1;
        req[last] ^= 0xFF;
        u.handle_frame(&req);

        assert!(u.nvm.ops().is_empty());
        assert_eq!(u.answer(), &failure_answer(FailureCode::InvalidChecksum)[..]);
    }

    #[test]
    fn corrupted_checksum_is_fail_closed_for_reboot() {
        let mut u = updater();
        let mut req = sealed(&[frame::REG_REBOOT]);
        req[1] ^= 0x01;
        u.handle_frame(&req);

        // Fail-closed: the command must not run on unverified input.
        assert!(!u.reboot_requested());
        assert_eq!(u.answer(), &failure_answer(FailureCode::InvalidChecksum)[..]);
    }

    #[test]
    fn corrupted_checksum_is_fail_closed_for_commit() {
        let mut u = updater();
        let mut req = sealed(&[frame::REG_COMMIT_PAGE, 0x00, 0x20, 0x00, 0x00]);
        req[2] ^= 0x10;
        u.handle_frame(&req);

        assert!(u.nvm.ops().is_empty());
        assert_eq!(u.answer(), &failure_answer(FailureCode::InvalidChecksum)[..]);
    }

    #[test]
    fn commit_page_erases_and_writes() {
        let mut u = updater();
        u.handle_frame(&sealed(&[frame::REG_COMMIT_PAGE, 0x00, 0x20, 0x00, 0x00]));

        assert_eq!(
            u.nvm.ops(),
            &[NvmOp::EraseWrite {
                address: 0x0000_2000
            }]
        );
        assert_eq!(u.answer(), &failure_answer(FailureCode::Success)[..]);
    }

    #[test]
    fn commit_page_with_truncated_address_rejected() {
        let mut u = updater();
        u.handle_frame(&sealed(&[frame::REG_COMMIT_PAGE, 0x00, 0x20]));

        assert!(u.nvm.ops().is_empty());
        assert_eq!(u.answer(), &failure_answer(FailureCode::InvalidFrameSize)[..]);
    }

    #[test]
    fn reboot_latches_flag() {
        let mut u = updater();
        assert!(!u.reboot_requested());

        u.handle_frame(&sealed(&[frame::REG_REBOOT]));

        assert!(u.reboot_requested());
        assert_eq!(u.answer(), &failure_answer(FailureCode::Success)[..]);
    }

    #[test]
    fn unknown_register_id_rejected() {
        let mut u = updater();
        u.handle_frame(&sealed(&[0xAA, 0x01, 0x02]));

        assert_eq!(
            u.answer(),
            &failure_answer(FailureCode::InvalidRegisterId)[..]
        );
    }

    #[test]
    fn runt_frame_rejected() {
        let mut u = updater();
        u.handle_frame(&[frame::REG_INFO, 0x00]);

        assert_eq!(u.answer(), &failure_answer(FailureCode::InvalidFrameSize)[..]);
    }

    #[test]
    fn oversized_answer_is_clamped_and_sealed() {
        let mut u = updater();
        let body = [0x55u8; ANSWER_CAPACITY + 8];
        u.stage_answer(&body);

        assert_eq!(u.answer().len(), ANSWER_CAPACITY);
        assert!(frame::verify(u.answer()));
    }

    #[test]
    fn empty_delivery_is_ignored() {
        let mut u = updater();
        for _ in 0..5 {
            assert_eq!(u.tick(), TickAction::Stay);
        }

        u.on_receive(&[]);

        // Neither an answer nor a keep-alive reset.
        assert!(u.answer().is_empty());
        assert_eq!(u.keep_alive, KEEP_ALIVE_TICKS - 5);
    }

    #[test]
    fn keep_alive_expires_exactly_once() {
        let mut u = updater();
        for _ in 0..KEEP_ALIVE_TICKS {
            assert_eq!(u.tick(), TickAction::Stay);
        }
        assert_eq!(u.tick(), TickAction::BootApplication);
        assert_eq!(u.tick(), TickAction::BootApplication);
    }

    #[test]
    fn valid_traffic_resets_keep_alive() {
        let mut u = updater();
        for _ in 0..KEEP_ALIVE_TICKS {
            assert_eq!(u.tick(), TickAction::Stay);
        }

        u.on_receive(&sealed(&[frame::REG_INFO]));

        for _ in 0..KEEP_ALIVE_TICKS {
            assert_eq!(u.tick(), TickAction::Stay);
        }
        assert_eq!(u.tick(), TickAction::BootApplication);
    }

    #[test]
    fn unrecognized_traffic_does_not_reset_keep_alive() {
        let mut u = updater();
        for _ in 0..5 {
            assert_eq!(u.tick(), TickAction::Stay);
        }

        // Corrupted checksum and unknown register id both answer the host
        // but do not count as valid commands.
        let mut bad = sealed(&[frame::REG_INFO]);
        bad[1] ^= 0x01;
        u.on_receive(&bad);
        u.on_receive(&sealed(&[0xAA]));

        assert_eq!(u.keep_alive, KEEP_ALIVE_TICKS - 5);
    }

    #[test]
    fn reboot_wins_over_keep_alive() {
        let mut u = updater();
        u.on_receive(&sealed(&[frame::REG_REBOOT]));

        assert_eq!(u.tick(), TickAction::RebootViaWatchdog);
        assert_eq!(u.tick(), TickAction::RebootViaWatchdog);
    }

    #[test]
    fn fill_transmit_clamps_to_caller_buffer() {
        let mut u = updater();
        u.handle_frame(&sealed(&[frame::REG_INFO]));

        let mut small = [0u8; 2];
        let n = u.fill_transmit(&mut small);
        assert_eq!(n, 2);
        assert_eq!(small, [frame::REG_ANSWER_INFO, 0x00]);

        let mut big = [0u8; 64];
        let n = u.fill_transmit(&mut big);
        assert_eq!(&big[..n], u.answer());
    }
}
