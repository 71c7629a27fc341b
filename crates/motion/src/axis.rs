use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::{OutputPin, PinState};

use crate::Direction;

/// One stepper-driven axis.
///
/// The axis keeps count of the steps it has taken: forward steps add one,
/// backward steps subtract one.
pub trait Axis {
    /// Takes one step forward, returning the new count.
    fn step_forward(&mut self) -> i32;
    /// Takes one step backward, returning the new count.
    fn step_backward(&mut self) -> i32;
    /// Overwrites the step count, without moving.
    fn override_position(&mut self, n: i32);
    fn count(&self) -> i32;

    fn step(&mut self, dir: Direction) -> i32 {
        match dir {
            Direction::Forward => self.step_forward(),
            Direction::Backward => self.step_backward(),
        }
    }
}

/// Step resolutions selectable through a driver's MS1/MS2 inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Microstep {
    Full,
    Half,
    Quarter,
    Eighth,
}

impl Microstep {
    /// Looks up the mode that splits each full step into `divisor` parts.
    pub fn from_divisor(divisor: u8) -> Option<Microstep> {
        match divisor {
            1 => Some(Microstep::Full),
            2 => Some(Microstep::Half),
            4 => Some(Microstep::Quarter),
            8 => Some(Microstep::Eighth),
            _ => None,
        }
    }

    pub fn divisor(self) -> u8 {
        match self {
            Microstep::Full => 1,
            Microstep::Half => 2,
            Microstep::Quarter => 4,
            Microstep::Eighth => 8,
        }
    }

    /// MS1 and MS2 levels, in the EasyDriver's encoding.
    pub fn pin_states(self) -> (PinState, PinState) {
        match self {
            Microstep::Full => (PinState::Low, PinState::Low),
            Microstep::Half => (PinState::High, PinState::Low),
            Microstep::Quarter => (PinState::Low, PinState::High),
            Microstep::Eighth => (PinState::High, PinState::High),
        }
    }
}

/// The inputs that choose a driver's step resolution.
///
/// `()` stands for a driver whose resolution is fixed by its wiring, and a
/// pair of pins for one with MS1 and MS2 under our control.
pub trait MicrostepSelect {
    /// Returns false if the resolution can't be changed.
    fn select(&mut self, mode: Microstep) -> bool;
}

impl MicrostepSelect for () {
    fn select(&mut self, _mode: Microstep) -> bool {
        false
    }
}

impl<A: OutputPin, B: OutputPin> MicrostepSelect for (A, B) {
    fn select(&mut self, mode: Microstep) -> bool {
        let (ms1, ms2) = mode.pin_states();
        set(&mut self.0, ms1);
        set(&mut self.1, ms2);
        true
    }
}

/// A stepper driver with step, direction and (active low) enable inputs,
/// like the EasyDriver or the A4988.
pub struct StepDir<S, D, E, T, M = ()> {
    step: S,
    dir: D,
    enable: E,
    delay: T,
    microstep: M,
    // Each half of the step pulse lasts this long.
    delay_ms: u32,
    // Swaps the direction pin's meaning, for motors that are wired backwards.
    inverted: bool,
    count: i32,
}

// Pin writes on the boards we use can't fail, and there's nothing sensible to
// do mid-step if they did.
fn set<P: OutputPin>(pin: &mut P, state: PinState) {
    let _ = pin.set_state(state);
}

impl<S, D, E, T> StepDir<S, D, E, T>
where
    S: OutputPin,
    D: OutputPin,
    E: OutputPin,
    T: DelayMs<u32>,
{
    pub fn new(step: S, dir: D, enable: E, delay: T, delay_ms: u32, inverted: bool) -> Self {
        let mut ret = StepDir {
            step,
            dir,
            enable,
            delay,
            microstep: (),
            delay_ms,
            inverted,
            count: 0,
        };
        // Start out unpowered; we only energize the coils while stepping.
        set(&mut ret.enable, PinState::High);
        set(&mut ret.step, PinState::Low);
        ret
    }

    /// Hands over the driver's MS1 and MS2 inputs. They start out in full
    /// step mode.
    pub fn with_microstep_pins<A: OutputPin, B: OutputPin>(
        self,
        ms1: A,
        ms2: B,
    ) -> StepDir<S, D, E, T, (A, B)> {
        let mut ret = StepDir {
            step: self.step,
            dir: self.dir,
            enable: self.enable,
            delay: self.delay,
            microstep: (ms1, ms2),
            delay_ms: self.delay_ms,
            inverted: self.inverted,
            count: self.count,
        };
        ret.microstep.select(Microstep::Full);
        ret
    }
}

impl<S, D, E, T, M> StepDir<S, D, E, T, M>
where
    S: OutputPin,
    D: OutputPin,
    E: OutputPin,
    T: DelayMs<u32>,
    M: MicrostepSelect,
{
    /// Changes the step resolution. Returns false if this driver's resolution
    /// is hardwired.
    ///
    /// The step count is in whatever units the driver was stepping in, so
    /// home afterwards.
    pub fn set_microstep(&mut self, mode: Microstep) -> bool {
        self.microstep.select(mode)
    }

    fn pulse(&mut self, forward: bool) {
        set(&mut self.enable, PinState::Low);
        // Forward is "direction pin low" unless the motor is inverted.
        set(&mut self.dir, PinState::from(forward == self.inverted));

        set(&mut self.step, PinState::High);
        self.delay.delay_ms(self.delay_ms);
        set(&mut self.step, PinState::Low);
        self.delay.delay_ms(self.delay_ms);

        set(&mut self.enable, PinState::High);
    }
}

impl<S, D, E, T, M> Axis for StepDir<S, D, E, T, M>
where
    S: OutputPin,
    D: OutputPin,
    E: OutputPin,
    T: DelayMs<u32>,
    M: MicrostepSelect,
{
    fn step_forward(&mut self) -> i32 {
        self.pulse(true);
        self.count += 1;
        self.count
    }

    fn step_backward(&mut self) -> i32 {
        self.pulse(false);
        self.count -= 1;
        self.count
    }

    fn override_position(&mut self, n: i32) {
        self.count = n;
    }

    fn count(&self) -> i32 {
        self.count
    }
}
