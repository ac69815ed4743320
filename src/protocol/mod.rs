//! Binary control protocol spoken to the remote host
//!
//! Every frame is one opcode byte followed by a fixed payload. Signed payload
//! fields are little-endian `i16`.
//!
//! ```text
//! Move        [1, dx_lo, dx_hi, dy_lo, dy_hi]
//! ButtonDown  [2, 0]
//! ButtonUp    [3, 0]
//! ScrollX     [5, dx_lo, dx_hi]
//! ScrollY     [6, dy_lo, dy_hi]
//! keep-alive  []
//! ```
//!
//! The zero-length keep-alive frame carries no meaning and is skipped by
//! [`decode_frame`].

use std::fmt;

pub const OP_MOVE: u8 = 1;
pub const OP_BUTTON_DOWN: u8 = 2;
pub const OP_BUTTON_UP: u8 = 3;
pub const OP_SCROLL_X: u8 = 5;
pub const OP_SCROLL_Y: u8 = 6;

/// One message of the control protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Relative cursor motion
    Move { dx: i16, dy: i16 },
    /// Synthetic button press
    ButtonDown,
    /// Synthetic button release
    ButtonUp,
    /// Horizontal scroll ticks
    ScrollX(i16),
    /// Vertical scroll ticks
    ScrollY(i16),
}

// Codec errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("Frame for opcode {opcode} too short: expected {expected} bytes, got {actual}")]
    Truncated {
        opcode: u8,
        expected: usize,
        actual: usize,
    },
}

impl ControlMessage {
    pub fn opcode(&self) -> u8 {
        match self {
            ControlMessage::Move { .. } => OP_MOVE,
            ControlMessage::ButtonDown => OP_BUTTON_DOWN,
            ControlMessage::ButtonUp => OP_BUTTON_UP,
            ControlMessage::ScrollX(_) => OP_SCROLL_X,
            ControlMessage::ScrollY(_) => OP_SCROLL_Y,
        }
    }

    /// Size of the encoded frame, opcode included
    pub fn encoded_len(&self) -> usize {
        frame_len(self.opcode()).unwrap_or(1)
    }

    /// Encodes the message into a freshly allocated frame
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.encoded_len());
        frame.push(self.opcode());
        match *self {
            ControlMessage::Move { dx, dy } => {
                frame.extend_from_slice(&dx.to_le_bytes());
                frame.extend_from_slice(&dy.to_le_bytes());
            }
            // Button frames carry one reserved byte
            ControlMessage::ButtonDown | ControlMessage::ButtonUp => frame.push(0),
            ControlMessage::ScrollX(delta) | ControlMessage::ScrollY(delta) => {
                frame.extend_from_slice(&delta.to_le_bytes());
            }
        }
        frame
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::Move { dx, dy } => write!(f, "Move({}, {})", dx, dy),
            ControlMessage::ButtonDown => write!(f, "ButtonDown"),
            ControlMessage::ButtonUp => write!(f, "ButtonUp"),
            ControlMessage::ScrollX(dx) => write!(f, "ScrollX({})", dx),
            ControlMessage::ScrollY(dy) => write!(f, "ScrollY({})", dy),
        }
    }
}

fn frame_len(opcode: u8) -> Option<usize> {
    match opcode {
        OP_MOVE => Some(5),
        OP_BUTTON_DOWN | OP_BUTTON_UP => Some(2),
        OP_SCROLL_X | OP_SCROLL_Y => Some(3),
        _ => None,
    }
}

/// Parses one frame as it appears on the wire
///
/// Returns `Ok(None)` for the zero-length keep-alive frame. Trailing bytes
/// beyond the fixed layout are ignored.
pub fn decode_frame(frame: &[u8]) -> Result<Option<ControlMessage>, CodecError> {
    let Some(&opcode) = frame.first() else {
        return Ok(None);
    };
    let expected = frame_len(opcode).ok_or(CodecError::UnknownOpcode(opcode))?;
    if frame.len() < expected {
        return Err(CodecError::Truncated {
            opcode,
            expected,
            actual: frame.len(),
        });
    }

    let read_i16 = |at: usize| i16::from_le_bytes([frame[at], frame[at + 1]]);
    let message = match opcode {
        OP_MOVE => ControlMessage::Move {
            dx: read_i16(1),
            dy: read_i16(3),
        },
        OP_BUTTON_DOWN => ControlMessage::ButtonDown,
        OP_BUTTON_UP => ControlMessage::ButtonUp,
        OP_SCROLL_X => ControlMessage::ScrollX(read_i16(1)),
        OP_SCROLL_Y => ControlMessage::ScrollY(read_i16(1)),
        other => return Err(CodecError::UnknownOpcode(other)),
    };
    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_is_opcode_then_two_little_endian_words() {
        let frame = ControlMessage::Move { dx: 2, dy: -1 }.encode();
        assert_eq!(frame, vec![1, 0x02, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn button_frames_carry_a_reserved_byte() {
        assert_eq!(ControlMessage::ButtonDown.encode(), vec![2, 0]);
        assert_eq!(ControlMessage::ButtonUp.encode(), vec![3, 0]);
    }

    #[test]
    fn scroll_frames_use_their_own_opcodes() {
        assert_eq!(ControlMessage::ScrollX(-300).encode(), vec![5, 0xD4, 0xFE]);
        assert_eq!(ControlMessage::ScrollY(1).encode(), vec![6, 0x01, 0x00]);
    }

    #[test]
    fn encoded_len_matches_frame() {
        for message in [
            ControlMessage::Move { dx: 0, dy: 0 },
            ControlMessage::ButtonDown,
            ControlMessage::ScrollY(7),
        ] {
            assert_eq!(message.encode().len(), message.encoded_len());
        }
    }

    #[test]
    fn keepalive_frame_decodes_to_nothing() {
        assert_eq!(decode_frame(&[]), Ok(None));
    }

    #[test]
    fn decode_reads_what_encode_wrote_at_the_extremes() {
        let message = ControlMessage::Move {
            dx: i16::MIN,
            dy: i16::MAX,
        };
        assert_eq!(decode_frame(&message.encode()), Ok(Some(message)));
    }

    #[test]
    fn decode_rejects_unknown_opcode_and_short_frames() {
        assert_eq!(decode_frame(&[4, 0]), Err(CodecError::UnknownOpcode(4)));
        assert_eq!(
            decode_frame(&[1, 0, 0]),
            Err(CodecError::Truncated {
                opcode: 1,
                expected: 5,
                actual: 3
            })
        );
    }
}
