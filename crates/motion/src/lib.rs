//! Moving the pen: stepper axes, the pen-lift servo, limit switches, and the
//! controller that coordinates them.
//!
//! The hardware-facing pieces are written against small traits ([`Axis`],
//! [`Tool`], [`LimitSensor`]) plus `embedded-hal` pins and delays, so that the
//! whole thing runs the same on the plotter and in tests.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod axis;
pub mod config;
pub mod controller;
pub mod limit;
pub mod stepper;
pub mod tool;

pub use axis::{Axis, Microstep, MicrostepSelect, StepDir};
pub use config::{MachineConfig, MachineConfigBuilder};
pub use controller::MotionController;
pub use limit::{AnalogChannel, AnalogLimit, LimitReading, LimitSensor, Thresholds};
pub use stepper::{Direction, StepIter, Tick};
pub use tool::{Pen, ServoOutput, Tool};
