// SPDX-License-Identifier: MIT

//! Update-protocol frame layout.
//!
//! A frame is a one-byte register id, a payload of zero or more bytes, and a
//! two-byte little-endian checksum, where the checksum is Fletcher-16 over
//! everything preceding it. The same shape is
//! used for requests and answers; answers are always sealed by this module,
//! callers never supply their own checksum.

use heapless::Vec;

use super::checksum::checksum;

// Register IDs
pub const REG_INFO: u8 = 0xF0;
pub const REG_ANSWER_INFO: u8 = 0xF1;
pub const REG_PUSH_PAGE: u8 = 0xF2;
pub const REG_COMMIT_PAGE: u8 = 0xF3;
pub const REG_REBOOT: u8 = 0xF4;
pub const REG_ANSWER_FAILURE: u8 = 0xFF;

/// Trailing checksum bytes on every frame.
pub const CHECKSUM_SIZE: usize = 2;

/// Smallest parseable frame: register id + checksum.
pub const MIN_FRAME_SIZE: usize = 1 + CHECKSUM_SIZE;

/// Status codes carried by an `AnswerFailure` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FailureCode {
    Success = 0,
    InvalidChecksum = 1,
    InvalidFrameSize = 2,
    InvalidRegisterId = 0xF0,
}

/// The frame to seal did not leave room for its checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow;

/// Append the little-endian Fletcher-16 checksum to `frame`.
pub fn seal<const N: usize>(frame: &mut Vec<u8, N>) -> Result<(), Overflow> {
    if frame.len() + CHECKSUM_SIZE > N {
        return Err(Overflow);
    }
    let sum = checksum(frame);
    let [lo, hi] = sum.to_le_bytes();
    frame.push(lo).ok();
    frame.push(hi).ok();
    Ok(())
}

/// Check the trailing checksum of a received frame.
///
/// Frames shorter than [`MIN_FRAME_SIZE`] never verify.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < MIN_FRAME_SIZE {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - CHECKSUM_SIZE);
    checksum(body) == u16::from_le_bytes([tail[0], tail[1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_verify_round_trips() {
        let mut frame: Vec<u8, 8> = Vec::new();
        frame.extend_from_slice(&[REG_INFO]).unwrap();
        seal(&mut frame).unwrap();
        assert_eq!(frame.len(), 3);
        assert!(verify(&frame));
    }

    #[test]
    fn seal_appends_little_endian() {
        let mut frame: Vec<u8, 8> = Vec::new();
        frame.extend_from_slice(&[0x01, 0x02]).unwrap();
        seal(&mut frame).unwrap();
        // checksum([0x01, 0x02]) == 0x0403 -> bytes 0x03, 0x04.
        assert_eq!(&frame[..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn verify_rejects_corruption() {
        let mut frame: Vec<u8, 16> = Vec::new();
        frame
            .extend_from_slice(&[REG_PUSH_PAGE, 0x00, 0x20, 0x00, 0x00, 0xAA, 0xBB])
            .unwrap();
        seal(&mut frame).unwrap();
        assert!(verify(&frame));

        for i in 0..frame.len() {
            let mut corrupted = frame.clone();
            corrupted[i] ^= 0x80;
            assert!(!verify(&corrupted), "corruption at {} undetected", i);
        }
    }

    #[test]
    fn verify_rejects_short_frames() {
        assert!(!verify(&[]));
        assert!(!verify(&[REG_INFO]));
        assert!(!verify(&[REG_INFO, 0x00]));
    }

    #[test]
    fn seal_requires_checksum_room() {
        let mut frame: Vec<u8, 2> = Vec::new();
        frame.push(REG_INFO).unwrap();
        assert_eq!(seal(&mut frame), Err(Overflow));
        assert_eq!(frame.len(), 1);
    }
}
