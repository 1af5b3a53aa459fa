//! Serial control protocol
//!
//! The host sends NUL-terminated ASCII frames of the form `KIND:VALUE`.
//! `transport` buffers received bytes and schedules the frame handler,
//! `packet` turns one frame into a typed message.

pub mod packet;
pub mod transport;

use ufmt::derive::uDebug;

pub use packet::{Message, FRAME_LEN};
pub use transport::SerialLink;

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
pub enum ProtocolError {
    /// The receive buffer or the frame buffer ran out of space.
    Overflow,
    /// No `:` between kind and value.
    MissingSeparator,
    UnknownKind,
    /// The value of a numeric message is not a decimal integer.
    InvalidValue,
    /// The value of a controller message is not an input name.
    InvalidInput,
}

pub type Result<T> = core::result::Result<T, ProtocolError>;
