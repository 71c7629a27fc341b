use embedded_hal::blocking::delay::DelayMs;

/// The thing that does the drawing.
pub trait Tool {
    /// Lifts the tool off the paper. Does nothing if it's already up.
    fn raise(&mut self);
    /// Puts the tool on the paper. Does nothing if it's already down.
    fn lower(&mut self);
    /// Changes how far the tool goes down, returning the (clamped) new value.
    /// Takes effect on the next `lower`.
    fn set_low_angle(&mut self, angle: u8) -> u8;
}

/// A hobby servo, addressed in whole degrees.
pub trait ServoOutput {
    fn write_angle(&mut self, degrees: u8);
}

const MAX_ANGLE: u8 = 180;

/// A pen on a servo-driven lift.
///
/// The servo is slow, and slamming the pen down makes blots, so we move it one
/// degree at a time.
pub struct Pen<S, T> {
    servo: S,
    delay: T,
    delay_ms: u32,
    up_angle: u8,
    low_angle: u8,
    angle: u8,
}

impl<S: ServoOutput, T: DelayMs<u32>> Pen<S, T> {
    /// Creates a pen, and immediately lifts it.
    pub fn new(mut servo: S, delay: T, delay_ms: u32, up_angle: u8, low_angle: u8) -> Self {
        let up_angle = up_angle.min(MAX_ANGLE);
        servo.write_angle(up_angle);
        Pen {
            servo,
            delay,
            delay_ms,
            up_angle,
            low_angle: low_angle.min(MAX_ANGLE),
            angle: up_angle,
        }
    }

    fn ramp_to(&mut self, target: u8) {
        while self.angle != target {
            if self.angle < target {
                self.angle += 1;
            } else {
                self.angle -= 1;
            }
            self.servo.write_angle(self.angle);
            self.delay.delay_ms(self.delay_ms);
        }
    }

    pub fn angle(&self) -> u8 {
        self.angle
    }

    pub fn low_angle(&self) -> u8 {
        self.low_angle
    }

    pub fn is_up(&self) -> bool {
        self.angle == self.up_angle
    }
}

impl<S: ServoOutput, T: DelayMs<u32>> Tool for Pen<S, T> {
    fn raise(&mut self) {
        self.ramp_to(self.up_angle);
    }

    fn lower(&mut self) {
        self.ramp_to(self.low_angle);
    }

    fn set_low_angle(&mut self, angle: u8) -> u8 {
        self.low_angle = angle.min(MAX_ANGLE);
        self.low_angle
    }
}
