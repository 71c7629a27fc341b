//! The motion controller ties the two axes, their limit switches and the pen
//! together, and knows how to move in straight lines.

use embedded_hal::blocking::delay::DelayMs;
use xyplot_geom::{Position, Travel, XY};

use crate::{Axis, Direction, LimitReading, LimitSensor, MachineConfig, StepIter, Tool};

pub struct MotionController<A, L, T, D> {
    axes: XY<A>,
    limits: XY<L>,
    tool: T,
    delay: D,
    home_delay_ms: u32,
    // Always the position we've actually stepped to, never a target.
    position: Position,
}

impl<A, L, T, D> MotionController<A, L, T, D>
where
    A: Axis,
    L: LimitSensor,
    T: Tool,
    D: DelayMs<u32>,
{
    /// The initial position is whatever the axes' step counters say.
    pub fn new(axes: XY<A>, limits: XY<L>, tool: T, delay: D, config: &MachineConfig) -> Self {
        let position = Position::new(axes.x.count(), axes.y.count());
        MotionController {
            axes,
            limits,
            tool,
            delay,
            home_delay_ms: config.home_delay_ms,
            position,
        }
    }

    fn tripped(&mut self) -> Option<(LimitReading, LimitReading)> {
        let x = self.limits.x.read();
        let y = self.limits.y.read();
        if x == LimitReading::Clear && y == LimitReading::Clear {
            None
        } else {
            Some((x, y))
        }
    }

    /// Moves in a straight line to `(x, y)`, with the pen down if `marking`.
    ///
    /// If a limit switch trips on the way, we give up on the move, re-home,
    /// and return the home position.
    pub fn travel(&mut self, x: i32, y: i32, marking: bool) -> Position {
        let target = Position::new(x, y);
        if target == self.position {
            return self.position;
        }

        log::debug!("{} -> {target}, marking: {marking}", self.position);
        if marking {
            self.tool.lower();
        } else {
            self.tool.raise();
        }

        for tick in StepIter::new(self.position, target) {
            if let Some(dir) = tick.x {
                self.axes.x.step(dir);
                self.position.x += dir.delta();
            }
            if let Some(dir) = tick.y {
                self.axes.y.step(dir);
                self.position.y += dir.delta();
            }

            if let Some((x_limit, y_limit)) = self.tripped() {
                log::warn!(
                    "limit tripped at {} on the way to {}: x {:?}, y {:?}",
                    self.position,
                    target,
                    x_limit,
                    y_limit
                );
                return self.home();
            }
        }

        self.position
    }

    /// Drives both axes backwards until they reach their home switches, backs
    /// off until the switches open again, and declares that spot to be the
    /// origin.
    ///
    /// There's no timeout: if a home switch never closes, this never returns.
    pub fn home(&mut self) -> Position {
        self.tool.raise();

        let mut steps = XY::new(0u32, 0u32);
        loop {
            let x_home = self.limits.x.read() == LimitReading::NegativeLimit;
            let y_home = self.limits.y.read() == LimitReading::NegativeLimit;
            if x_home && y_home {
                break;
            }
            if !x_home {
                self.axes.x.step(Direction::Backward);
                steps.x += 1;
            }
            if !y_home {
                self.axes.y.step(Direction::Backward);
                steps.y += 1;
            }
            self.delay.delay_ms(self.home_delay_ms);
        }

        // Sitting on a closed switch would trip the next move straight away.
        loop {
            let x_clear = self.limits.x.read() == LimitReading::Clear;
            let y_clear = self.limits.y.read() == LimitReading::Clear;
            if x_clear && y_clear {
                break;
            }
            if !x_clear {
                self.axes.x.step(Direction::Forward);
            }
            if !y_clear {
                self.axes.y.step(Direction::Forward);
            }
            self.delay.delay_ms(self.home_delay_ms);
        }

        log::info!("homed after ({}, {}) steps", steps.x, steps.y);
        self.axes.x.override_position(0);
        self.axes.y.override_position(0);
        self.position = Position::ORIGIN;
        self.position
    }

    pub fn current_position(&self) -> Position {
        self.position
    }

    /// Sets how far the pen goes down, and puts it there so the effect is
    /// visible. Returns the angle actually used.
    pub fn set_tool_low_angle(&mut self, angle: u8) -> u8 {
        let angle = self.tool.set_low_angle(angle);
        self.tool.lower();
        angle
    }

    pub fn raise_tool(&mut self) {
        self.tool.raise();
    }

    pub fn axes(&self) -> &XY<A> {
        &self.axes
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn into_parts(self) -> (XY<A>, XY<L>, T, D) {
        (self.axes, self.limits, self.tool, self.delay)
    }
}

impl<A, L, T, D> Travel for MotionController<A, L, T, D>
where
    A: Axis,
    L: LimitSensor,
    T: Tool,
    D: DelayMs<u32>,
{
    fn travel(&mut self, x: i32, y: i32, marking: bool) -> Position {
        MotionController::travel(self, x, y, marking)
    }

    fn current_position(&self) -> Position {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::tests::NoDelay;
    use proptest::prelude::*;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Event {
        Step(char, Direction),
        Raise,
        Lower,
        SetLow(u8),
    }

    /// A pretend plotter. Each axis' physical position is its step count plus
    /// an offset, and the home switch is closed at physical position zero or
    /// below.
    #[derive(Default)]
    struct Machine {
        events: Vec<Event>,
        physical: XY<i32>,
        polls: usize,
        // Report a far-end trip on this poll of the x switch.
        trip_on_poll: Option<usize>,
    }

    type Shared = Rc<RefCell<Machine>>;

    struct MockAxis {
        name: char,
        count: i32,
        machine: Shared,
    }

    impl MockAxis {
        fn physical(&self) -> i32 {
            let m = self.machine.borrow();
            if self.name == 'x' {
                m.physical.x
            } else {
                m.physical.y
            }
        }

        fn move_by(&mut self, dir: Direction) -> i32 {
            let mut m = self.machine.borrow_mut();
            m.events.push(Event::Step(self.name, dir));
            if self.name == 'x' {
                m.physical.x += dir.delta();
            } else {
                m.physical.y += dir.delta();
            }
            self.count += dir.delta();
            self.count
        }
    }

    impl Axis for MockAxis {
        fn step_forward(&mut self) -> i32 {
            self.move_by(Direction::Forward)
        }

        fn step_backward(&mut self) -> i32 {
            self.move_by(Direction::Backward)
        }

        fn override_position(&mut self, n: i32) {
            self.count = n;
        }

        fn count(&self) -> i32 {
            self.count
        }
    }

    struct MockLimit {
        name: char,
        machine: Shared,
    }

    impl LimitSensor for MockLimit {
        fn read(&mut self) -> LimitReading {
            let mut m = self.machine.borrow_mut();
            let physical = if self.name == 'x' {
                m.polls += 1;
                m.physical.x
            } else {
                m.physical.y
            };
            if physical <= 0 {
                LimitReading::NegativeLimit
            } else if self.name == 'x' && m.trip_on_poll == Some(m.polls) {
                LimitReading::PositiveLimit
            } else {
                LimitReading::Clear
            }
        }
    }

    struct MockTool(Shared);

    impl Tool for MockTool {
        fn raise(&mut self) {
            self.0.borrow_mut().events.push(Event::Raise);
        }

        fn lower(&mut self) {
            self.0.borrow_mut().events.push(Event::Lower);
        }

        fn set_low_angle(&mut self, angle: u8) -> u8 {
            self.0.borrow_mut().events.push(Event::SetLow(angle));
            angle
        }
    }

    type Controller = MotionController<MockAxis, MockLimit, MockTool, NoDelay>;

    /// A controller at logical position `start`, physically `offset` steps
    /// further from home on each axis.
    fn controller(start: Position, offset: i32) -> (Controller, Shared) {
        let machine = Shared::default();
        machine.borrow_mut().physical = XY::new(start.x + offset, start.y + offset);
        let axis = |name, count| MockAxis {
            name,
            count,
            machine: machine.clone(),
        };
        let limit = |name| MockLimit {
            name,
            machine: machine.clone(),
        };
        let c = MotionController::new(
            XY::new(axis('x', start.x), axis('y', start.y)),
            XY::new(limit('x'), limit('y')),
            MockTool(machine.clone()),
            NoDelay,
            &MachineConfig::default(),
        );
        (c, machine)
    }

    fn steps(events: &[Event], axis: char) -> Vec<Direction> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Step(a, d) if *a == axis => Some(*d),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn axis_aligned_travel() {
        let (mut c, m) = controller(Position::new(100, 100), 1000);
        assert_eq!(c.travel(100, 50, false), Position::new(100, 50));

        let events = &m.borrow().events;
        assert_eq!(events[0], Event::Raise);
        assert!(!events.contains(&Event::Lower));
        assert!(steps(events, 'x').is_empty());
        assert_eq!(steps(events, 'y'), vec![Direction::Backward; 50]);
        assert_eq!(c.axes().y.count(), 50);
    }

    #[test]
    fn diagonal_marking_travel() {
        let (mut c, m) = controller(Position::ORIGIN, 1000);
        assert_eq!(c.travel(30, 10, true), Position::new(30, 10));

        let events = &m.borrow().events;
        assert_eq!(events[0], Event::Lower);
        assert_eq!(events.iter().filter(|e| **e == Event::Lower).count(), 1);
        assert_eq!(steps(events, 'x'), vec![Direction::Forward; 30]);
        assert_eq!(steps(events, 'y'), vec![Direction::Forward; 10]);

        // Three x steps for every y step.
        let pattern: String = events[1..]
            .iter()
            .map(|e| match e {
                Event::Step(a, _) => *a,
                _ => '?',
            })
            .collect();
        assert_eq!(pattern, "xxxy".repeat(10));
    }

    #[test]
    fn trip_rehomes() {
        let (mut c, m) = controller(Position::new(20, 20), 5);
        m.borrow_mut().trip_on_poll = Some(7);
        assert_eq!(c.travel(60, 40, true), Position::ORIGIN);
        assert_eq!(c.current_position(), Position::ORIGIN);
        assert_eq!(c.axes().x.count(), 0);
        assert_eq!(c.axes().y.count(), 0);

        let m = m.borrow();
        assert_eq!(m.physical, XY::new(1, 1));
        // The pen comes up before homing.
        let first_backward = m
            .events
            .iter()
            .position(|e| matches!(e, Event::Step(_, Direction::Backward)))
            .unwrap();
        assert_eq!(m.events[first_backward - 1], Event::Raise);
    }

    #[test]
    fn home_converges() {
        let (mut c, m) = controller(Position::new(-7, 12), 30);
        assert_eq!(c.home(), Position::ORIGIN);
        assert_eq!(c.axes().x.count(), 0);
        assert_eq!(c.axes().y.count(), 0);

        let m = m.borrow();
        let mut backward = vec![Direction::Backward; 23];
        backward.push(Direction::Forward);
        assert_eq!(steps(&m.events, 'x'), backward);
        assert_eq!(steps(&m.events, 'y').len(), 43);
        // Backed off the switches.
        assert_eq!(m.physical, XY::new(1, 1));
    }

    #[test]
    fn calibration_lowers_the_pen() {
        let (mut c, m) = controller(Position::ORIGIN, 10);
        assert_eq!(c.set_tool_low_angle(120), 120);
        assert_eq!(m.borrow().events, vec![Event::SetLow(120), Event::Lower]);
    }

    proptest! {
        #[test]
        fn no_op_travel(x in -500..500i32, y in -500..500i32, marking: bool) {
            let (mut c, m) = controller(Position::new(x, y), 1000);
            prop_assert_eq!(c.travel(x, y, marking), Position::new(x, y));
            prop_assert!(m.borrow().events.is_empty());
            prop_assert_eq!(c.axes().x.count(), x);
            prop_assert_eq!(c.axes().y.count(), y);
        }

        #[test]
        fn untripped_travel_arrives(
            x0 in -300..300i32,
            y0 in -300..300i32,
            x1 in -300..300i32,
            y1 in -300..300i32,
        ) {
            let (mut c, m) = controller(Position::new(x0, y0), 1000);
            prop_assert_eq!(c.travel(x1, y1, true), Position::new(x1, y1));
            prop_assert_eq!(c.axes().x.count(), x1);
            prop_assert_eq!(c.axes().y.count(), y1);

            let events = &m.borrow().events;
            prop_assert_eq!(steps(events, 'x').len() as i32, (x1 - x0).abs());
            prop_assert_eq!(steps(events, 'y').len() as i32, (y1 - y0).abs());
        }
    }
}
