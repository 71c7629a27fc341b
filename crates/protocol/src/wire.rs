//! The bytes and tokens that travel over the serial line.

use core::fmt;

use serde::{Deserialize, Serialize};
use xyplot_geom::ShapeKind;

/// Host acknowledges, and asks us to continue.
pub const CONTINUE: u8 = b'n';
/// Shape data follows.
pub const SHAPE_START: u8 = b'p';
/// Terminates a numeric field.
pub const FIELD_END: u8 = b';';
/// Ends the current shape's parameters.
pub const SHAPE_END: u8 = b'q';
/// Ends the whole shape list.
pub const LIST_END: u8 = b'u';

pub const CIRCLE: u8 = b'C';
pub const ELLIPSE: u8 = b'E';
pub const CUBIC_CURVE: u8 = b'B';
pub const POLYGON: u8 = b'P';

pub fn shape_kind(byte: u8) -> Option<ShapeKind> {
    match byte {
        CIRCLE => Some(ShapeKind::Circle),
        ELLIPSE => Some(ShapeKind::Ellipse),
        CUBIC_CURVE => Some(ShapeKind::CubicCurve),
        POLYGON => Some(ShapeKind::Polygon),
        _ => None,
    }
}

/// Bytes that change what the session is doing, wherever they turn up.
pub fn is_command(byte: u8) -> bool {
    matches!(byte, CONTINUE | SHAPE_START | LIST_END)
}

/// Bytes that end a chunk the host expects an answer to, apart from the
/// commands.
pub fn expects_reply(byte: u8) -> bool {
    matches!(byte, FIELD_END | SHAPE_END) || shape_kind(byte).is_some()
}

pub fn shape_tag(kind: ShapeKind) -> u8 {
    match kind {
        ShapeKind::Circle => CIRCLE,
        ShapeKind::Ellipse => ELLIPSE,
        ShapeKind::CubicCurve => CUBIC_CURVE,
        ShapeKind::Polygon => POLYGON,
    }
}

/// The flow-control tokens that the device sends to the host.
///
/// After sending one of these, the device waits for the host to answer
/// before sending another.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// Advertised while waiting for a host to connect.
    Ready,
    /// Send the next chunk.
    Next,
    /// The batch is full; the host should hold on while we draw.
    Wait,
}

impl Reply {
    pub fn token(self) -> &'static str {
        match self {
            Reply::Ready => ";Ready;",
            Reply::Next => ";next;",
            Reply::Wait => ";wait;",
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Plain-text status lines. The host just prints these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    PenLevel { percent: u8 },
    StartDrawing,
    Done,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::PenLevel { percent } => write!(f, "Pen: {percent}%"),
            Status::StartDrawing => f.write_str("Start drawing"),
            Status::Done => f.write_str("Done!"),
        }
    }
}
