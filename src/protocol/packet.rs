//! Message framing and parsing

use ufmt::derive::uDebug;

use super::{ProtocolError, Result};
use crate::menu::Input;

/// Longest frame accepted, terminator excluded.
pub const FRAME_LEN: usize = 32;

const SEPARATOR: u8 = b':';

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
pub enum Message {
    /// Joystick or button input from the remote controller.
    Controller(Input),
    /// Water tank level reading.
    Water(i32),
    /// Air quality reading.
    Air(i32),
}

impl Message {
    /// Parses one frame without its NUL terminator. Trailing CR/LF are
    /// tolerated.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        let frame = trim_line_end(frame);
        let split = frame
            .iter()
            .position(|&b| b == SEPARATOR)
            .ok_or(ProtocolError::MissingSeparator)?;
        let (kind, value) = (&frame[..split], &frame[split + 1..]);

        match kind {
            b"CONTROLLER" => {
                let name = core::str::from_utf8(value).map_err(|_| ProtocolError::InvalidInput)?;
                Input::from_name(name)
                    .map(Message::Controller)
                    .ok_or(ProtocolError::InvalidInput)
            }
            b"WATER" => parse_int(value).map(Message::Water),
            b"AIR" => parse_int(value).map(Message::Air),
            _ => Err(ProtocolError::UnknownKind),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Controller(_) => "CONTROLLER",
            Message::Water(_) => "WATER",
            Message::Air(_) => "AIR",
        }
    }
}

fn trim_line_end(mut frame: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = frame {
        frame = rest;
    }
    frame
}

fn parse_int(digits: &[u8]) -> Result<i32> {
    let (negative, digits) = match digits {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        _ => (false, digits),
    };
    if digits.is_empty() {
        return Err(ProtocolError::InvalidValue);
    }

    let mut value: i32 = 0;
    for &d in digits {
        if !d.is_ascii_digit() {
            return Err(ProtocolError::InvalidValue);
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((d - b'0') as i32))
            .ok_or(ProtocolError::InvalidValue)?;
    }
    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_controller_inputs() {
        assert_eq!(
            Message::parse(b"CONTROLLER:UP"),
            Ok(Message::Controller(Input::Up))
        );
        assert_eq!(
            Message::parse(b"CONTROLLER:SELECT\r\n"),
            Ok(Message::Controller(Input::JoystickSelect))
        );
        assert_eq!(
            Message::parse(b"CONTROLLER:JUMP"),
            Err(ProtocolError::InvalidInput)
        );
    }

    #[test]
    fn parses_numeric_readings() {
        assert_eq!(Message::parse(b"WATER:42"), Ok(Message::Water(42)));
        assert_eq!(Message::parse(b"AIR:-7"), Ok(Message::Air(-7)));
        assert_eq!(Message::parse(b"AIR:"), Err(ProtocolError::InvalidValue));
        assert_eq!(Message::parse(b"WATER:4x"), Err(ProtocolError::InvalidValue));
        assert_eq!(
            Message::parse(b"WATER:99999999999"),
            Err(ProtocolError::InvalidValue)
        );
    }

    #[test]
    fn rejects_malformed_frames() {
        assert_eq!(Message::parse(b"WATER"), Err(ProtocolError::MissingSeparator));
        assert_eq!(Message::parse(b""), Err(ProtocolError::MissingSeparator));
        assert_eq!(Message::parse(b"SOIL:3"), Err(ProtocolError::UnknownKind));
        assert_eq!(Message::parse(b"water:3"), Err(ProtocolError::UnknownKind));
    }
}
