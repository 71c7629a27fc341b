//! Splitting a straight move into interleaved steps on the two axes.
//!
//! This is a ratio-based digital differential analyzer: the axis with more
//! steps to go (the "major" axis) takes `ratio` steps for every step of the
//! "minor" axis, where `ratio` is the rounded quotient of the two step counts.
//! Whatever is left over at the end is stepped on its own.

use xyplot_geom::Position;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards larger coordinates.
    Forward,
    /// Towards smaller coordinates, and towards home.
    Backward,
}

impl Direction {
    /// The direction that takes us from `from` to `to`, if they differ.
    fn between(from: i32, to: i32) -> Option<Direction> {
        // `from - to` is positive when the target is below us.
        match (i64::from(from) - i64::from(to)).signum() {
            1 => Some(Direction::Backward),
            -1 => Some(Direction::Forward),
            _ => None,
        }
    }

    /// How a step in this direction changes the coordinate.
    pub fn delta(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// The steps to take in one iteration of the control loop.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    pub x: Option<Direction>,
    pub y: Option<Direction>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Major {
    X,
    Y,
}

#[derive(Clone, Debug)]
pub struct StepIter {
    x_dir: Option<Direction>,
    y_dir: Option<Direction>,
    // Steps remaining on each axis.
    x_left: u32,
    y_left: u32,
    major: Major,
    // Major steps per minor step. `None` if only one axis moves, in which case
    // there's nothing to interleave (and nothing to divide by).
    ratio: Option<u32>,
    // Major steps taken since the last minor step.
    counter: u32,
}

impl StepIter {
    pub fn new(from: Position, to: Position) -> Self {
        let x_left = from.x.abs_diff(to.x);
        let y_left = from.y.abs_diff(to.y);
        let major = if x_left >= y_left { Major::X } else { Major::Y };
        let (major_steps, minor_steps) = match major {
            Major::X => (x_left, y_left),
            Major::Y => (y_left, x_left),
        };

        let ratio = (minor_steps > 0).then(|| {
            // Round half away from zero, in integers.
            let (maj, min) = (u64::from(major_steps), u64::from(minor_steps));
            ((2 * maj + min) / (2 * min)) as u32
        });

        StepIter {
            x_dir: Direction::between(from.x, to.x),
            y_dir: Direction::between(from.y, to.y),
            x_left,
            y_left,
            major,
            ratio,
            counter: 0,
        }
    }

    /// The number of major-axis steps taken for each minor-axis step, or `None`
    /// for a move along a single axis.
    pub fn ratio(&self) -> Option<u32> {
        self.ratio
    }
}

impl Iterator for StepIter {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        if self.x_left == 0 && self.y_left == 0 {
            return None;
        }

        let (major_left, minor_left, major_dir, minor_dir) = match self.major {
            Major::X => (&mut self.x_left, &mut self.y_left, self.x_dir, self.y_dir),
            Major::Y => (&mut self.y_left, &mut self.x_left, self.y_dir, self.x_dir),
        };
        let ratio = self.ratio.unwrap_or(u32::MAX);

        let mut major_step = None;
        let mut minor_step = None;
        if *major_left > 0 && (self.counter < ratio || *minor_left == 0) {
            *major_left -= 1;
            self.counter += 1;
            major_step = major_dir;
        }
        // This deliberately looks at the major axis after it has (maybe) stepped:
        // if that was its last step, the minor axis goes in the same tick.
        if *minor_left > 0 && (self.counter >= ratio || *major_left == 0) {
            *minor_left -= 1;
            self.counter = 0;
            minor_step = minor_dir;
        }

        Some(match self.major {
            Major::X => Tick {
                x: major_step,
                y: minor_step,
            },
            Major::Y => Tick {
                x: minor_step,
                y: major_step,
            },
        })
    }
}
