//! Length-prefixed, checksummed frames.
//!
//! # Layout
//!
//! | Offset  | Field                                   |
//! |---------|-----------------------------------------|
//! | 0-3     | Body length N (u32, little-endian)      |
//! | 4-N+3   | Protobuf body                           |
//! | N+4-N+7 | CRC32 over the length and body (u32 LE) |

use std::fmt;

use crate::constants::MAX_FRAME_LENGTH;

const LENGTH_SIZE: usize = 4;
const CHECKSUM_SIZE: usize = 4;

/// Errors decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than the header or the declared length require.
    Truncated { needed: usize, available: usize },
    /// Bytes remain after the checksum.
    TrailingBytes(usize),
    /// The declared body length is above the frame limit.
    TooLarge(usize),
    ChecksumMismatch { expected: u32, actual: u32 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "truncated frame: need {needed} bytes, have {available}")
            }
            Self::TrailingBytes(n) => write!(f, "{n} trailing bytes after frame"),
            Self::TooLarge(n) => {
                write!(f, "frame body of {n} bytes exceeds {MAX_FRAME_LENGTH}")
            }
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "frame checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
            ),
        }
    }
}

impl std::error::Error for FrameError {}

/// Wrap `body` in a frame.
pub fn encode(body: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = u32::try_from(body.len())
        .ok()
        .filter(|_| body.len() <= MAX_FRAME_LENGTH)
        .ok_or(FrameError::TooLarge(body.len()))?;
    let mut out = Vec::with_capacity(LENGTH_SIZE + body.len() + CHECKSUM_SIZE);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(body);
    let checksum = crc32fast::hash(&out);
    out.extend_from_slice(&checksum.to_le_bytes());
    Ok(out)
}

/// Verify a frame and return its body.
pub fn decode(frame: &[u8]) -> Result<&[u8], FrameError> {
    let header: [u8; LENGTH_SIZE] = frame
        .get(..LENGTH_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or(FrameError::Truncated {
            needed: LENGTH_SIZE,
            available: frame.len(),
        })?;
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_LENGTH {
        return Err(FrameError::TooLarge(len));
    }

    let total = LENGTH_SIZE + len + CHECKSUM_SIZE;
    if frame.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: frame.len(),
        });
    }
    if frame.len() > total {
        return Err(FrameError::TrailingBytes(frame.len() - total));
    }

    let (covered, trailer) = frame.split_at(LENGTH_SIZE + len);
    let mut stored = [0u8; CHECKSUM_SIZE];
    stored.copy_from_slice(trailer);
    let expected = u32::from_le_bytes(stored);
    let actual = crc32fast::hash(covered);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }
    Ok(&covered[LENGTH_SIZE..])
}
