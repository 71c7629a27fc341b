//! Travel-limit switches.
//!
//! Each axis has two limit switches sharing one analog input through a
//! resistor ladder: each switch pulls the input to its own voltage, so we can
//! tell them apart by which window the reading falls into.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitReading {
    /// At the home end of the axis.
    NegativeLimit,
    /// At the far end of the axis.
    PositiveLimit,
    Clear,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// The reading we expect when the negative (home) switch is closed.
    pub negative: u16,
    /// The reading we expect when the positive switch is closed.
    pub positive: u16,
    /// How far from the expected value a reading may be and still count.
    pub tolerance: u16,
}

impl Thresholds {
    fn in_window(&self, center: u16, value: u16) -> bool {
        center.saturating_sub(self.tolerance) <= value
            && u32::from(value) < u32::from(center) + u32::from(self.tolerance)
    }

    pub fn classify(&self, value: u16) -> LimitReading {
        if self.in_window(self.negative, value) {
            LimitReading::NegativeLimit
        } else if self.in_window(self.positive, value) {
            LimitReading::PositiveLimit
        } else {
            LimitReading::Clear
        }
    }
}

/// A raw analog input.
pub trait AnalogChannel {
    fn read_raw(&mut self) -> u16;
}

pub trait LimitSensor {
    fn read(&mut self) -> LimitReading;
}

/// A limit sensor made from an analog channel and some thresholds.
pub struct AnalogLimit<C> {
    channel: C,
    thresholds: Thresholds,
}

impl<C: AnalogChannel> AnalogLimit<C> {
    pub fn new(channel: C, thresholds: Thresholds) -> Self {
        Self {
            channel,
            thresholds,
        }
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

impl<C: AnalogChannel> LimitSensor for AnalogLimit<C> {
    fn read(&mut self) -> LimitReading {
        self.thresholds.classify(self.channel.read_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: Thresholds = Thresholds {
        negative: 340,
        positive: 510,
        tolerance: 50,
    };

    #[test]
    fn windows() {
        assert_eq!(T.classify(0), LimitReading::Clear);
        assert_eq!(T.classify(289), LimitReading::Clear);
        assert_eq!(T.classify(290), LimitReading::NegativeLimit);
        assert_eq!(T.classify(389), LimitReading::NegativeLimit);
        assert_eq!(T.classify(390), LimitReading::Clear);
        assert_eq!(T.classify(460), LimitReading::PositiveLimit);
        assert_eq!(T.classify(559), LimitReading::PositiveLimit);
        assert_eq!(T.classify(560), LimitReading::Clear);
        assert_eq!(T.classify(1023), LimitReading::Clear);
    }

    #[test]
    fn overlapping_windows_prefer_home() {
        let t = Thresholds {
            negative: 100,
            positive: 120,
            tolerance: 50,
        };
        assert_eq!(t.classify(110), LimitReading::NegativeLimit);
        assert_eq!(t.classify(160), LimitReading::PositiveLimit);
    }

    #[test]
    fn no_overflow_at_the_edges() {
        let t = Thresholds {
            negative: 10,
            positive: u16::MAX - 10,
            tolerance: 50,
        };
        assert_eq!(t.classify(0), LimitReading::NegativeLimit);
        assert_eq!(t.classify(u16::MAX), LimitReading::PositiveLimit);
    }

    struct Fixed(u16);

    impl AnalogChannel for Fixed {
        fn read_raw(&mut self) -> u16 {
            self.0
        }
    }

    #[test]
    fn analog_limit() {
        let mut limit = AnalogLimit::new(Fixed(500), T);
        assert_eq!(limit.read(), LimitReading::PositiveLimit);
        limit.channel_mut().0 = 700;
        assert_eq!(limit.read(), LimitReading::Clear);
    }

    proptest! {
        #[test]
        fn classify_is_pure(v: u16) {
            prop_assert_eq!(T.classify(v), T.classify(v));
        }
    }
}
