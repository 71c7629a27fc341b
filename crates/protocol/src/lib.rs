//! The device side of the serial protocol that the host uses to send shapes.
//!
//! The host and the device take turns: the device sends a short token (see
//! [`Reply`]), and the host answers with the next chunk of its shape list. The
//! [`Session`] state machine consumes that byte stream and collects the shapes
//! into a bounded [`Batch`]. When the batch fills up (or the host says it's done)
//! the session hands over to pen calibration and drawing.

#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt;

use xyplot_geom::ShapeError;

pub mod accum;
pub mod batch;
pub mod session;
pub mod wire;

pub use accum::{DigitAccumulator, MAX_DIGITS};
pub use batch::{Batch, BATCH_CAPACITY};
pub use session::{Phase, Session, MAX_PARAMS};
pub use wire::{Reply, Status};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// A byte that makes no sense in the current phase.
    UnexpectedByte { byte: u8, phase: Phase },
    /// A numeric field with more than `MAX_DIGITS` digits.
    FieldTooLong,
    /// A `;` with no digits before it.
    EmptyField,
    /// The shape ended while a numeric field was still missing its `;`.
    UnterminatedField,
    /// More numeric fields than any shape can use.
    TooManyParams,
    /// The parameters don't describe a valid shape.
    BadShape(ShapeError),
    /// A shape ended without ever being told what kind it was.
    MissingShapeKind,
    /// A shape arrived after the batch was already full.
    BatchFull,
}

impl From<ShapeError> for ProtocolError {
    fn from(e: ShapeError) -> Self {
        ProtocolError::BadShape(e)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnexpectedByte { byte, phase } => write!(
                f,
                "unexpected byte '{}' while {phase}",
                (*byte as char).escape_default()
            ),
            ProtocolError::FieldTooLong => {
                write!(f, "numeric field is longer than {MAX_DIGITS} digits")
            }
            ProtocolError::EmptyField => f.write_str("numeric field has no digits"),
            ProtocolError::UnterminatedField => {
                f.write_str("shape ended in the middle of a numeric field")
            }
            ProtocolError::TooManyParams => {
                write!(f, "shape has more than {MAX_PARAMS} parameters")
            }
            ProtocolError::BadShape(e) => write!(f, "bad shape: {e}"),
            ProtocolError::MissingShapeKind => f.write_str("shape ended before its tag"),
            ProtocolError::BatchFull => {
                write!(f, "batch already holds {BATCH_CAPACITY} shapes")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}
