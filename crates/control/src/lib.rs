//! The plotter's main loop: talk to the host, calibrate the pen, draw.

#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt;

use embedded_hal::blocking::delay::DelayMs;
use log::{debug, info, warn};
use xyplot_geom::{Position, Travel};
use xyplot_motion::{Axis, LimitSensor, MotionController, Tool};
use xyplot_protocol::{Phase, Reply, Session, Status};

/// The serial connection to the host.
pub trait HostLink {
    /// Returns the next byte from the host, if one arrives within the idle
    /// interval.
    fn poll_byte(&mut self) -> Option<u8>;

    /// Sends one line to the host. The implementation adds the line ending.
    fn send_line(&mut self, line: fmt::Arguments<'_>);
}

/// The knob (and button) used to set how hard the pen presses.
pub trait CalibrationInput {
    /// A reading between 0 and `MAX_LEVEL`.
    fn read_level(&mut self) -> u16;
    fn confirmed(&mut self) -> bool;
}

pub const MAX_LEVEL: u16 = 1023;

/// What the control loop needs from the motion side.
pub trait Machine: Travel {
    fn set_tool_low_angle(&mut self, angle: u8) -> u8;
    fn raise_tool(&mut self);
}

impl<A, L, T, D> Machine for MotionController<A, L, T, D>
where
    A: Axis,
    L: LimitSensor,
    T: Tool,
    D: DelayMs<u32>,
{
    fn set_tool_low_angle(&mut self, angle: u8) -> u8 {
        MotionController::set_tool_low_angle(self, angle)
    }

    fn raise_tool(&mut self) {
        MotionController::raise_tool(self)
    }
}

/// Maps a calibration level to a servo angle and a percentage.
pub fn level_to_pen(level: u16) -> (u8, u8) {
    let level = u32::from(level.min(MAX_LEVEL));
    let max = u32::from(MAX_LEVEL);
    ((level * 180 / max) as u8, (level * 100 / max) as u8)
}

pub struct Plotter<H, C, M> {
    host: H,
    calibration: C,
    machine: M,
    session: Session,
    // Only report the pen level when it changes.
    last_percent: Option<u8>,
}

impl<H: HostLink, C: CalibrationInput, M: Machine> Plotter<H, C, M> {
    pub fn new(host: H, calibration: C, machine: M) -> Self {
        Plotter {
            host,
            calibration,
            machine,
            session: Session::new(),
            last_percent: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn into_parts(self) -> (H, C, M) {
        (self.host, self.calibration, self.machine)
    }

    fn reply(&mut self, reply: Reply) {
        self.host.send_line(format_args!("{reply}"));
    }

    fn status(&mut self, status: Status) {
        self.host.send_line(format_args!("{status}"));
    }

    /// Does one unit of work (handling one byte, one calibration reading, or
    /// drawing a whole batch) and returns the phase we end up in.
    pub fn step(&mut self) -> Phase {
        match self.session.phase() {
            Phase::AwaitConnect | Phase::AwaitCommand | Phase::Accumulate | Phase::Discard => {
                self.receive()
            }
            Phase::PenCalibration => self.calibrate(),
            Phase::Drawing => self.draw(),
            Phase::Done => {}
        }
        self.session.phase()
    }

    /// Runs a whole session, from waiting for the host until everything is
    /// drawn.
    pub fn run_session(&mut self) {
        self.session = Session::new();
        self.last_percent = None;
        while self.step() != Phase::Done {}
    }

    fn receive(&mut self) {
        let Some(byte) = self.host.poll_byte() else {
            if let Some(reply) = self.session.idle() {
                self.reply(reply);
            }
            return;
        };

        match self.session.feed(byte) {
            Ok(Some(reply)) => self.reply(reply),
            Ok(None) => {}
            Err(e) => {
                warn!("{e}; dropping the current shape");
                if let Some(reply) = self.session.reply_after_error() {
                    self.reply(reply);
                }
            }
        }
    }

    fn calibrate(&mut self) {
        let (angle, percent) = level_to_pen(self.calibration.read_level());
        self.machine.set_tool_low_angle(angle);
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            self.status(Status::PenLevel { percent });
        }

        if self.calibration.confirmed() && self.session.confirm_pen() {
            info!("pen set to {angle} degrees, drawing");
            self.last_percent = None;
            self.status(Status::StartDrawing);
        }
    }

    fn draw(&mut self) {
        for shape in self.session.take_batch() {
            debug!("drawing {}", shape.describe());
            let end = shape.realize(&mut self.machine);
            debug!("finished at {end}");
        }
        self.machine.raise_tool();

        match self.session.finish_drawing() {
            Some(reply) => self.reply(reply),
            None => {
                self.status(Status::Done);
                let parked = self.machine.travel(0, 0, false);
                if parked != Position::ORIGIN {
                    warn!("parked at {parked} instead of the origin");
                }
            }
        }
    }
}
