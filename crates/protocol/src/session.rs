use core::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use xyplot_geom::{Shape, ShapeKind, MAX_POLYGON_VERTICES};

use crate::{
    wire::{self, Reply},
    Batch, DigitAccumulator, ProtocolError,
};

/// The most numeric fields a single shape can carry. Polygons are the
/// greediest, with two per vertex.
pub const MAX_PARAMS: usize = 2 * MAX_POLYGON_VERTICES;

/// Where we are in a session with the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Nobody has talked to us yet. We advertise ourselves periodically.
    AwaitConnect,
    /// Between shapes, waiting for the next instruction.
    AwaitCommand,
    /// In the middle of a shape's numeric parameters.
    Accumulate,
    /// Dropping the rest of a malformed chunk, up to the next byte that the
    /// host expects an answer to.
    Discard,
    /// Not reading input: the pen's down angle is being adjusted.
    PenCalibration,
    /// Not reading input: the batch is being drawn.
    Drawing,
    /// Everything has been drawn.
    Done,
}

impl Phase {
    /// Are we currently accepting bytes from the host?
    pub fn is_receiving(self) -> bool {
        matches!(
            self,
            Phase::AwaitConnect | Phase::AwaitCommand | Phase::Accumulate | Phase::Discard
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::AwaitConnect => "waiting for a connection",
            Phase::AwaitCommand => "waiting for a command",
            Phase::Accumulate => "reading shape parameters",
            Phase::Discard => "skipping a malformed shape",
            Phase::PenCalibration => "calibrating the pen",
            Phase::Drawing => "drawing",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

/// The state of one connection with the host.
///
/// Bytes from the host go in through [`Session::feed`], which answers with
/// the token (if any) to send back. Once the batch is full or the host has
/// finished its list, the session moves to [`Phase::PenCalibration`] and stops
/// accepting input until the batch has been drawn.
#[derive(Clone, Debug)]
pub struct Session {
    phase: Phase,
    connected: bool,
    // Set by 'p', consumed by the shape tag that follows it.
    shape_pending: bool,
    kind: Option<ShapeKind>,
    digits: DigitAccumulator,
    params: heapless::Vec<i32, MAX_PARAMS>,
    batch: Batch,
    more_to_come: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            phase: Phase::AwaitConnect,
            connected: false,
            shape_pending: false,
            kind: None,
            digits: DigitAccumulator::new(),
            params: heapless::Vec::new(),
            batch: Batch::new(),
            more_to_come: true,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Has the host not yet told us that its shape list is finished?
    pub fn more_to_come(&self) -> bool {
        self.more_to_come
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Called when no byte has arrived for a while.
    pub fn idle(&mut self) -> Option<Reply> {
        (self.phase == Phase::AwaitConnect).then_some(Reply::Ready)
    }

    /// Processes one byte from the host.
    ///
    /// If the byte doesn't fit the protocol, the shape being received is
    /// thrown away. The host is still owed an answer for that byte if it is
    /// one that a well-formed stream gets an answer for; the caller should
    /// send [`Session::reply_after_error`]. Otherwise we quietly drop bytes
    /// until the next one that gets an answer, so that the host never has
    /// more than one chunk in flight.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Reply>, ProtocolError> {
        let ret = match self.phase {
            Phase::AwaitConnect => {
                info!("host connected");
                self.connected = true;
                self.phase = Phase::AwaitCommand;
                Ok(Some(Reply::Next))
            }
            Phase::AwaitCommand => self.command(byte),
            Phase::Accumulate => self.accumulate(byte),
            Phase::Discard => Ok(self.discard(byte)),
            phase => {
                return Err(ProtocolError::UnexpectedByte { byte, phase });
            }
        };

        if ret.is_err() {
            self.resync(byte);
        }
        ret
    }

    /// The answer owed to the host for a byte that [`Session::feed`] just
    /// rejected.
    pub fn reply_after_error(&self) -> Option<Reply> {
        (self.phase == Phase::AwaitCommand).then_some(Reply::Next)
    }

    fn command(&mut self, byte: u8) -> Result<Option<Reply>, ProtocolError> {
        match byte {
            wire::CONTINUE => Ok(Some(Reply::Next)),
            wire::SHAPE_START => {
                self.shape_pending = true;
                Ok(Some(Reply::Next))
            }
            wire::LIST_END => {
                info!("end of shape list, {} shapes in the batch", self.batch.len());
                self.more_to_come = false;
                self.shape_pending = false;
                self.phase = Phase::PenCalibration;
                Ok(None)
            }
            b if b.is_ascii_whitespace() => Ok(None),
            b => match wire::shape_kind(b) {
                Some(kind) if self.shape_pending => {
                    self.shape_pending = false;
                    self.kind = Some(kind);
                    self.phase = Phase::Accumulate;
                    Ok(Some(Reply::Next))
                }
                _ => Err(ProtocolError::UnexpectedByte {
                    byte,
                    phase: self.phase,
                }),
            },
        }
    }

    fn accumulate(&mut self, byte: u8) -> Result<Option<Reply>, ProtocolError> {
        match byte {
            b'0'..=b'9' => {
                self.digits.push(byte)?;
                Ok(None)
            }
            wire::FIELD_END => {
                let value = self.digits.finish()?;
                self.params
                    .push(value)
                    .map_err(|_| ProtocolError::TooManyParams)?;
                Ok(Some(Reply::Next))
            }
            wire::SHAPE_END => self.finish_shape().map(Some),
            _ => Err(ProtocolError::UnexpectedByte {
                byte,
                phase: self.phase,
            }),
        }
    }

    fn discard(&mut self, byte: u8) -> Option<Reply> {
        if wire::is_command(byte) {
            self.phase = Phase::AwaitCommand;
            return self.command(byte).ok().flatten();
        }
        if wire::expects_reply(byte) {
            debug!("back in step with the host");
            self.phase = Phase::AwaitCommand;
            Some(Reply::Next)
        } else {
            None
        }
    }

    fn finish_shape(&mut self) -> Result<Reply, ProtocolError> {
        if !self.digits.is_empty() {
            return Err(ProtocolError::UnterminatedField);
        }
        let kind = self.kind.take().ok_or(ProtocolError::MissingShapeKind)?;
        let shape = Shape::from_params(kind, &self.params)?;
        self.params.clear();

        let idx = self
            .batch
            .push(shape)
            .map_err(|_| ProtocolError::BatchFull)?;
        debug!("buffered {kind} at index {idx}");

        if self.batch.is_full() {
            info!("batch is full, pausing input");
            self.phase = Phase::PenCalibration;
            Ok(Reply::Wait)
        } else {
            self.phase = Phase::AwaitCommand;
            Ok(Reply::Next)
        }
    }

    /// Throws away any partially received shape after `byte` was rejected.
    ///
    /// Command bytes still do what they say. Other bytes that the host
    /// expects an answer to leave us waiting for a command; anything else
    /// starts a discard.
    fn resync(&mut self, byte: u8) {
        self.shape_pending = false;
        self.kind = None;
        self.digits.reset();
        self.params.clear();
        if wire::is_command(byte) {
            self.phase = Phase::AwaitCommand;
            let _ = self.command(byte);
        } else if wire::expects_reply(byte) {
            self.phase = Phase::AwaitCommand;
        } else {
            self.phase = Phase::Discard;
        }
    }

    /// The pen has been calibrated; start drawing.
    ///
    /// Returns false (and does nothing) if we weren't calibrating the pen.
    pub fn confirm_pen(&mut self) -> bool {
        if self.phase == Phase::PenCalibration {
            self.phase = Phase::Drawing;
            true
        } else {
            false
        }
    }

    /// Takes the shapes to draw, leaving the batch empty.
    pub fn take_batch(&mut self) -> impl Iterator<Item = Shape> {
        self.batch.take()
    }

    /// The batch has been drawn. If the host has more shapes, we go back to
    /// receiving them and return the token asking for the next one.
    pub fn finish_drawing(&mut self) -> Option<Reply> {
        if self.phase != Phase::Drawing {
            return None;
        }
        if self.more_to_come {
            self.phase = Phase::AwaitCommand;
            Some(Reply::Next)
        } else {
            info!("all shapes drawn");
            self.phase = Phase::Done;
            None
        }
    }
}
