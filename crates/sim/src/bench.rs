//! A pretend plotter on the workbench: the pins, servo and analog inputs that
//! the firmware drivers talk to, wired to a model of the carriage.

use std::{cell::RefCell, convert::Infallible, rc::Rc};

use embedded_hal::{blocking::delay::DelayMs, digital::v2::OutputPin};
use xyplot_control::CalibrationInput;
use xyplot_geom::{Position, XY};
use xyplot_motion::{AnalogChannel, MachineConfig, ServoOutput, Thresholds};

/// The pen touches the paper once the servo is this far from its up angle.
const CONTACT_DEGREES: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisName {
    X,
    Y,
}

fn pick<T>(xy: &mut XY<T>, axis: AxisName) -> &mut T {
    match axis {
        AxisName::X => &mut xy.x,
        AxisName::Y => &mut xy.y,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinRole {
    Step,
    Dir,
    Enable,
    Ms1,
    Ms2,
}

pub struct Bench {
    /// Where the carriage really is. The switches are at zero and `extent`.
    pub physical: XY<i32>,
    pub extent: XY<i32>,
    /// Physical steps taken on each axis.
    pub steps: XY<u64>,
    /// Time spent in delays.
    pub elapsed_ms: u64,
    /// Polylines drawn with the pen touching the paper.
    pub strokes: Vec<Vec<Position>>,
    /// Levels on each driver's MS1 and MS2 inputs.
    pub microstep_pins: XY<[bool; 2]>,
    servo_angle: u8,
    pen_up_angle: u8,
    in_stroke: bool,
    dir_high: XY<bool>,
    enabled: XY<bool>,
    step_high: XY<bool>,
    // Motors that turn the other way, matching the configured inversion.
    wired_backwards: XY<bool>,
    thresholds: Thresholds,
}

pub type Shared = Rc<RefCell<Bench>>;

impl Bench {
    pub fn new(config: &MachineConfig, extent: XY<i32>, start: XY<i32>) -> Shared {
        Rc::new(RefCell::new(Bench {
            physical: start,
            extent,
            steps: XY::default(),
            elapsed_ms: 0,
            strokes: Vec::new(),
            microstep_pins: XY::default(),
            servo_angle: config.pen_up_angle,
            pen_up_angle: config.pen_up_angle,
            in_stroke: false,
            dir_high: XY::default(),
            enabled: XY::default(),
            step_high: XY::default(),
            wired_backwards: XY::new(config.invert_x, config.invert_y),
            thresholds: config.thresholds(),
        }))
    }

    pub fn pen_position(&self) -> Position {
        Position::new(self.physical.x, self.physical.y)
    }

    pub fn touching(&self) -> bool {
        self.servo_angle.abs_diff(self.pen_up_angle) > CONTACT_DEGREES
    }

    fn set_pin(&mut self, axis: AxisName, role: PinRole, high: bool) {
        match role {
            PinRole::Dir => *pick(&mut self.dir_high, axis) = high,
            // Active low.
            PinRole::Enable => *pick(&mut self.enabled, axis) = !high,
            PinRole::Ms1 => pick(&mut self.microstep_pins, axis)[0] = high,
            PinRole::Ms2 => pick(&mut self.microstep_pins, axis)[1] = high,
            PinRole::Step => {
                let was_high = std::mem::replace(pick(&mut self.step_high, axis), high);
                if high && !was_high && *pick(&mut self.enabled, axis) {
                    self.step(axis);
                }
            }
        }
    }

    fn step(&mut self, axis: AxisName) {
        let forward = *pick(&mut self.dir_high, axis) == *pick(&mut self.wired_backwards, axis);
        let before = self.pen_position();
        *pick(&mut self.physical, axis) += if forward { 1 } else { -1 };
        *pick(&mut self.steps, axis) += 1;

        if self.touching() {
            if !self.in_stroke {
                self.strokes.push(vec![before]);
                self.in_stroke = true;
            }
            let after = self.pen_position();
            if let Some(stroke) = self.strokes.last_mut() {
                stroke.push(after);
            }
        }
    }

    fn write_servo(&mut self, degrees: u8) {
        self.servo_angle = degrees;
        if !self.touching() {
            self.in_stroke = false;
        }
    }

    /// What the resistor ladder on `axis` would read.
    fn reading(&mut self, axis: AxisName) -> u16 {
        let extent = *pick(&mut self.extent, axis);
        let p = *pick(&mut self.physical, axis);
        if p <= 0 {
            self.thresholds.negative
        } else if p >= extent {
            self.thresholds.positive
        } else {
            0
        }
    }
}

pub struct SimPin {
    pub bench: Shared,
    pub axis: AxisName,
    pub role: PinRole,
}

impl OutputPin for SimPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.bench.borrow_mut().set_pin(self.axis, self.role, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.bench.borrow_mut().set_pin(self.axis, self.role, true);
        Ok(())
    }
}

pub struct SimServo(pub Shared);

impl ServoOutput for SimServo {
    fn write_angle(&mut self, degrees: u8) {
        self.0.borrow_mut().write_servo(degrees);
    }
}

pub struct SimChannel {
    pub bench: Shared,
    pub axis: AxisName,
}

impl AnalogChannel for SimChannel {
    fn read_raw(&mut self) -> u16 {
        self.bench.borrow_mut().reading(self.axis)
    }
}

/// Doesn't actually wait; just keeps track of how long we would have.
pub struct SimDelay(pub Shared);

impl DelayMs<u32> for SimDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().elapsed_ms += u64::from(ms);
    }
}

/// A calibration knob that's already turned to `level`, with the button held.
pub struct FixedLevel(pub u16);

impl CalibrationInput for FixedLevel {
    fn read_level(&mut self) -> u16 {
        self.0
    }

    fn confirmed(&mut self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xyplot_motion::{
        AnalogLimit, Axis, LimitReading, LimitSensor, MachineConfigBuilder, StepDir,
    };

    fn driver(bench: &Shared, axis: AxisName, inverted: bool) -> StepDir<SimPin, SimPin, SimPin, SimDelay> {
        let pin = |role| SimPin {
            bench: bench.clone(),
            axis,
            role,
        };
        StepDir::new(
            pin(PinRole::Step),
            pin(PinRole::Dir),
            pin(PinRole::Enable),
            SimDelay(bench.clone()),
            5,
            inverted,
        )
    }

    #[test]
    fn steps_move_the_carriage() {
        let config = MachineConfig::default();
        let bench = Bench::new(&config, XY::new(100, 100), XY::new(10, 10));
        let mut x = driver(&bench, AxisName::X, false);
        x.step_forward();
        x.step_forward();
        x.step_backward();
        assert_eq!(bench.borrow().physical, XY::new(11, 10));
        assert_eq!(bench.borrow().steps.x, 3);
        assert_eq!(bench.borrow().elapsed_ms, 30);
    }

    #[test]
    fn inverted_wiring_matches_inverted_driver() {
        let config = MachineConfigBuilder::default()
            .with_inverted_axes(false, true)
            .build();
        let bench = Bench::new(&config, XY::new(100, 100), XY::new(10, 10));
        let mut y = driver(&bench, AxisName::Y, true);
        y.step_forward();
        assert_eq!(bench.borrow().physical.y, 11);
    }

    #[test]
    fn switches() {
        let config = MachineConfig::default();
        let bench = Bench::new(&config, XY::new(100, 100), XY::new(1, 99));
        let mut x_limit = AnalogLimit::new(
            SimChannel {
                bench: bench.clone(),
                axis: AxisName::X,
            },
            config.thresholds(),
        );
        let mut y_limit = AnalogLimit::new(
            SimChannel {
                bench: bench.clone(),
                axis: AxisName::Y,
            },
            config.thresholds(),
        );
        assert_eq!(x_limit.read(), LimitReading::Clear);
        assert_eq!(y_limit.read(), LimitReading::Clear);

        driver(&bench, AxisName::X, false).step_backward();
        driver(&bench, AxisName::Y, false).step_forward();
        assert_eq!(x_limit.read(), LimitReading::NegativeLimit);
        assert_eq!(y_limit.read(), LimitReading::PositiveLimit);
    }

    #[test]
    fn strokes_follow_the_pen() {
        let config = MachineConfig::default();
        let bench = Bench::new(&config, XY::new(100, 100), XY::new(10, 10));
        let mut x = driver(&bench, AxisName::X, false);
        let mut servo = SimServo(bench.clone());

        x.step_forward();
        servo.write_angle(90);
        x.step_forward();
        x.step_forward();
        servo.write_angle(0);
        x.step_forward();

        let strokes = &bench.borrow().strokes;
        assert_eq!(
            strokes,
            &vec![vec![
                Position::new(11, 10),
                Position::new(12, 10),
                Position::new(13, 10)
            ]]
        );
    }
}
