use serde::{Deserialize, Serialize};

use crate::{Microstep, Thresholds};

/// Everything about the machine that might differ between two plotters built
/// from the same parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Half the period of a step pulse, in milliseconds.
    pub step_delay_ms: u32,
    /// How long the pen servo takes to move one degree.
    pub servo_delay_ms: u32,
    pub pen_up_angle: u8,
    pub pen_down_angle: u8,
    /// Expected analog reading of a closed home-end switch.
    pub negative_limit: u16,
    /// Expected analog reading of a closed far-end switch.
    pub positive_limit: u16,
    pub limit_tolerance: u16,
    pub invert_x: bool,
    pub invert_y: bool,
    /// Parts per full step, for drivers whose MS1/MS2 inputs we control: 1, 2,
    /// 4 or 8.
    pub microstep: u8,
    /// Pause between steps while homing.
    pub home_delay_ms: u32,
    /// How often to repeat the ready announcement while waiting for a host.
    pub ready_interval_ms: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfigBuilder::default().build()
    }
}

impl MachineConfig {
    /// Starts a builder from this configuration, for tweaking a few fields.
    pub fn to_builder(&self) -> MachineConfigBuilder {
        MachineConfigBuilder { config: *self }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            negative: self.negative_limit,
            positive: self.positive_limit,
            tolerance: self.limit_tolerance,
        }
    }
}

pub struct MachineConfigBuilder {
    config: MachineConfig,
}

impl Default for MachineConfigBuilder {
    fn default() -> Self {
        Self {
            config: MachineConfig {
                step_delay_ms: 5,
                servo_delay_ms: 5,
                pen_up_angle: 0,
                pen_down_angle: 180,
                negative_limit: 340,
                positive_limit: 510,
                limit_tolerance: 50,
                invert_x: false,
                invert_y: false,
                microstep: 1,
                home_delay_ms: 5,
                ready_interval_ms: 1000,
            },
        }
    }
}

impl MachineConfigBuilder {
    pub fn build(&self) -> MachineConfig {
        self.config
    }

    pub fn with_step_delay(&mut self, ms: u32) -> &mut Self {
        self.config.step_delay_ms = ms;
        self
    }

    pub fn with_servo_delay(&mut self, ms: u32) -> &mut Self {
        self.config.servo_delay_ms = ms;
        self
    }

    /// Servo angles are clamped to 180 degrees.
    pub fn with_pen_angles(&mut self, up: u8, down: u8) -> &mut Self {
        self.config.pen_up_angle = up.min(180);
        self.config.pen_down_angle = down.min(180);
        self
    }

    /// The limit switches are calibrated by closing each one by hand and
    /// reading the analog input. `tolerance` should be less than half the
    /// difference between the two readings, or the windows will overlap.
    pub fn with_limit_readings(&mut self, negative: u16, positive: u16, tolerance: u16) -> &mut Self {
        self.config.negative_limit = negative;
        self.config.positive_limit = positive;
        self.config.limit_tolerance = tolerance;
        self
    }

    pub fn with_inverted_axes(&mut self, x: bool, y: bool) -> &mut Self {
        self.config.invert_x = x;
        self.config.invert_y = y;
        self
    }

    /// Returns `None` (leaving the builder alone) for a divisor the drivers
    /// don't support.
    pub fn with_microstep(&mut self, divisor: u8) -> Option<&mut Self> {
        Microstep::from_divisor(divisor)?;
        self.config.microstep = divisor;
        Some(self)
    }

    pub fn with_home_delay(&mut self, ms: u32) -> &mut Self {
        self.config.home_delay_ms = ms;
        self
    }

}
