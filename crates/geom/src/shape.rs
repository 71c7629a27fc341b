//! The shapes that the plotter can draw, and the sequences of moves that draw them.
//!
//! Each shape is turned into a sequence of [`Waypoint`]s: a target position, and
//! whether the pen should be down while traveling there. [`Shape::realize`] feeds
//! those waypoints to anything implementing [`Travel`].

use core::fmt;

use libm::{cos, sin, sqrt, trunc};
use serde::{Deserialize, Serialize};

use crate::{Position, Travel};

/// The largest number of vertices a single polygon can carry, including the
/// vertex that closes the loop.
pub const MAX_POLYGON_VERTICES: usize = 32;

pub type Vertices = heapless::Vec<Position, MAX_POLYGON_VERTICES>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Ellipse,
    CubicCurve,
    Polygon,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::CubicCurve => "cubic curve",
            ShapeKind::Polygon => "polygon",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShapeError {
    /// The shape was given a number of parameters that it doesn't know how to interpret.
    WrongParamCount { kind: ShapeKind, count: usize },
    /// The polygon (after closing it up) has more vertices than we have room for.
    TooManyVertices(usize),
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::WrongParamCount { kind, count } => {
                write!(f, "a {kind} can't be made from {count} parameters")
            }
            ShapeError::TooManyVertices(n) => write!(
                f,
                "polygon has {n} vertices, but at most {MAX_POLYGON_VERTICES} are supported"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ShapeError {}

/// One step of drawing a shape: go to `pos`, with the pen down if `marking`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Waypoint {
    pub pos: Position,
    pub marking: bool,
}

impl Waypoint {
    fn move_to(pos: Position) -> Self {
        Waypoint {
            pos,
            marking: false,
        }
    }

    fn line_to(pos: Position) -> Self {
        Waypoint { pos, marking: true }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Position,
    pub radius: i32,
}

impl Circle {
    /// A circle is just an ellipse whose semi-axes agree.
    pub fn as_ellipse(&self) -> Ellipse {
        Ellipse {
            center: self.center,
            a: self.radius,
            b: self.radius,
            rotation: None,
        }
    }
}

/// Rotation of an ellipse about some point.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub origin: Position,
    /// Counter-clockwise, in radians.
    pub angle: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub center: Position,
    /// The horizontal semi-axis (before rotation).
    pub a: i32,
    /// The vertical semi-axis (before rotation).
    pub b: i32,
    pub rotation: Option<Rotation>,
}

impl Ellipse {
    /// The height of the upper half of the (unrotated, centered) ellipse at `x`.
    fn half_height(&self, x: i32) -> i32 {
        if self.a == 0 {
            return 0;
        }
        let a = self.a as f64;
        let x = x as f64;
        // Points outside the x range would give a NaN; clamp them to the tip.
        let root = sqrt((a * a - x * x).max(0.0));
        trunc(self.b as f64 / a * root) as i32
    }

    /// Converts a point relative to the center into an absolute position,
    /// applying the rotation if there is one.
    fn place(&self, dx: i32, dy: i32) -> Position {
        let p = Position::new(
            self.center.x.saturating_add(dx),
            self.center.y.saturating_add(dy),
        );
        match self.rotation {
            None => p,
            Some(Rotation { origin, angle }) => {
                let (s, c) = (sin(angle), cos(angle));
                let rx = p.x as f64 - origin.x as f64;
                let ry = p.y as f64 - origin.y as f64;
                Position::new(
                    origin.x.saturating_add(trunc(c * rx - s * ry) as i32),
                    origin.y.saturating_add(trunc(s * rx + c * ry) as i32),
                )
            }
        }
    }

    pub fn waypoints(&self) -> EllipsePoints {
        EllipsePoints {
            ellipse: *self,
            state: EllipseState::Start,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum EllipseState {
    Start,
    Upper(i32),
    Lower(i32),
    Finished,
}

/// Walks the upper half of the ellipse from left to right, and then the lower
/// half from right to left, one step of x at a time.
#[derive(Clone, Debug)]
pub struct EllipsePoints {
    ellipse: Ellipse,
    state: EllipseState,
}

impl Iterator for EllipsePoints {
    type Item = Waypoint;

    fn next(&mut self) -> Option<Waypoint> {
        // Keeps -a representable.
        let a = self.ellipse.a.saturating_abs();
        let (ret, next_state) = match self.state {
            EllipseState::Start => (
                Waypoint::move_to(self.ellipse.place(-a, 0)),
                EllipseState::Upper(-a),
            ),
            EllipseState::Upper(x) => {
                let y = self.ellipse.half_height(x);
                let next = if x < a {
                    EllipseState::Upper(x + 1)
                } else {
                    EllipseState::Lower(a)
                };
                (Waypoint::line_to(self.ellipse.place(x, y)), next)
            }
            EllipseState::Lower(x) => {
                let y = self.ellipse.half_height(x);
                let next = if x > -a {
                    EllipseState::Lower(x - 1)
                } else {
                    EllipseState::Finished
                };
                (Waypoint::line_to(self.ellipse.place(x, -y)), next)
            }
            EllipseState::Finished => return None,
        };
        self.state = next_state;
        Some(ret)
    }
}

/// A cubic Bézier curve from `points[0]` to `points[3]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubicCurve {
    pub points: [Position; 4],
}

impl CubicCurve {
    /// The number of segments to break the curve into: the larger of its
    /// horizontal and vertical extents, so that each segment is about one step long.
    fn span(&self) -> u32 {
        let extent = |f: fn(&Position) -> i32| {
            let min = self.points.iter().map(f).min().unwrap_or(0);
            let max = self.points.iter().map(f).max().unwrap_or(0);
            max.abs_diff(min)
        };
        extent(|p| p.x).max(extent(|p| p.y))
    }

    pub fn eval(&self, t: f64) -> Position {
        let [p0, p1, p2, p3] = self.points;
        let t2 = t * t;
        let t3 = t2 * t;
        let coord = |c0: i32, c1: i32, c2: i32, c3: i32| {
            let (c0, c1, c2, c3) = (c0 as f64, c1 as f64, c2 as f64, c3 as f64);
            trunc(
                c0 + 3.0 * t * (c1 - c0)
                    + 3.0 * t2 * (c0 + c2 - 2.0 * c1)
                    + t3 * (c3 - c0 + 3.0 * c1 - 3.0 * c2),
            ) as i32
        };
        Position::new(coord(p0.x, p1.x, p2.x, p3.x), coord(p0.y, p1.y, p2.y, p3.y))
    }

    pub fn waypoints(&self) -> CurvePoints {
        CurvePoints {
            curve: *self,
            span: self.span(),
            next: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CurvePoints {
    curve: CubicCurve,
    span: u32,
    // `None` until the initial move-to has been emitted. Wider than `span`,
    // so that it can count one past the end.
    next: Option<u64>,
}

impl Iterator for CurvePoints {
    type Item = Waypoint;

    fn next(&mut self) -> Option<Waypoint> {
        match self.next {
            None => {
                self.next = Some(0);
                Some(Waypoint::move_to(self.curve.points[0]))
            }
            Some(i) if i > u64::from(self.span) => None,
            Some(i) => {
                self.next = Some(i + 1);
                if self.span == 0 {
                    return Some(Waypoint::line_to(self.curve.points[3]));
                }
                let t = i as f64 / self.span as f64;
                Some(Waypoint::line_to(self.curve.eval(t)))
            }
        }
    }
}

/// A closed sequence of straight lines.
///
/// The first vertex is always repeated at the end, so the pen comes back to
/// where it started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vertices,
}

impl Polygon {
    /// Builds a polygon from its vertices, closing it up if the last vertex
    /// isn't already the first one.
    pub fn new(vertices: impl IntoIterator<Item = Position>) -> Result<Self, ShapeError> {
        let mut vs = Vertices::new();
        let mut count = 0;
        for v in vertices {
            count += 1;
            // Keep counting after we run out of space, so the error can say how many there were.
            let _ = vs.push(v);
        }
        if let (Some(&first), Some(&last)) = (vs.first(), vs.last()) {
            if count <= MAX_POLYGON_VERTICES && first != last {
                count += 1;
                let _ = vs.push(first);
            }
        }
        if count > MAX_POLYGON_VERTICES {
            return Err(ShapeError::TooManyVertices(count));
        }
        Ok(Polygon { vertices: vs })
    }

    pub fn vertices(&self) -> &[Position] {
        &self.vertices
    }

    pub fn waypoints(&self) -> PolygonPoints<'_> {
        PolygonPoints {
            vertices: self.vertices.iter(),
            first: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PolygonPoints<'a> {
    vertices: core::slice::Iter<'a, Position>,
    first: bool,
}

impl<'a> Iterator for PolygonPoints<'a> {
    type Item = Waypoint;

    fn next(&mut self) -> Option<Waypoint> {
        let &pos = self.vertices.next()?;
        let marking = !self.first;
        self.first = false;
        Some(Waypoint { pos, marking })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle(Circle),
    Ellipse(Ellipse),
    CubicCurve(CubicCurve),
    Polygon(Polygon),
}

impl Shape {
    /// Interprets a list of integer parameters as a shape of the given kind.
    ///
    /// - circles take `cx, cy, r`;
    /// - ellipses take `cx, cy, a, b` and optionally `origin_x, origin_y, degrees`;
    /// - cubic curves take the four control points, `x0, y0, ..., x3, y3`;
    /// - polygons take any (non-zero, even) number of coordinates, paired up into vertices.
    pub fn from_params(kind: ShapeKind, params: &[i32]) -> Result<Shape, ShapeError> {
        let wrong_count = ShapeError::WrongParamCount {
            kind,
            count: params.len(),
        };
        let pos = |i: usize| Position::new(params[i], params[i + 1]);

        match (kind, params.len()) {
            (ShapeKind::Circle, 3) => Ok(Shape::Circle(Circle {
                center: pos(0),
                radius: params[2],
            })),
            (ShapeKind::Ellipse, 4 | 7) => {
                let rotation = (params.len() == 7).then(|| Rotation {
                    origin: pos(4),
                    angle: (params[6] as f64).to_radians(),
                });
                Ok(Shape::Ellipse(Ellipse {
                    center: pos(0),
                    a: params[2],
                    b: params[3],
                    rotation,
                }))
            }
            (ShapeKind::CubicCurve, 8) => Ok(Shape::CubicCurve(CubicCurve {
                points: [pos(0), pos(2), pos(4), pos(6)],
            })),
            (ShapeKind::Polygon, n) if n > 0 && n % 2 == 0 => Ok(Shape::Polygon(Polygon::new(
                params.chunks_exact(2).map(|c| Position::new(c[0], c[1])),
            )?)),
            _ => Err(wrong_count),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Ellipse(_) => ShapeKind::Ellipse,
            Shape::CubicCurve(_) => ShapeKind::CubicCurve,
            Shape::Polygon(_) => ShapeKind::Polygon,
        }
    }

    pub fn waypoints(&self) -> Waypoints<'_> {
        match self {
            Shape::Circle(c) => Waypoints::Ellipse(c.as_ellipse().waypoints()),
            Shape::Ellipse(e) => Waypoints::Ellipse(e.waypoints()),
            Shape::CubicCurve(c) => Waypoints::Curve(c.waypoints()),
            Shape::Polygon(p) => Waypoints::Polygon(p.waypoints()),
        }
    }

    /// Draws this shape, returning the position that we end up at.
    pub fn realize<T: Travel + ?Sized>(&self, motion: &mut T) -> Position {
        let mut pos = motion.current_position();
        for wp in self.waypoints() {
            pos = motion.travel(wp.pos.x, wp.pos.y, wp.marking);
        }
        pos
    }

    /// A short human-readable description, used for echoing back to the host.
    pub fn describe(&self) -> impl fmt::Display + '_ {
        self
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Circle(c) => write!(f, "C({},{},{})", c.center.x, c.center.y, c.radius),
            Shape::Ellipse(e) => {
                write!(f, "E({},{},{},{}", e.center.x, e.center.y, e.a, e.b)?;
                if let Some(r) = e.rotation {
                    write!(f, ",{},{},{:.2}", r.origin.x, r.origin.y, r.angle)?;
                }
                f.write_str(")")
            }
            Shape::CubicCurve(c) => {
                let [p0, p1, p2, p3] = c.points;
                write!(
                    f,
                    "B({},{},{},{},{},{},{},{})",
                    p0.x, p0.y, p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
                )
            }
            Shape::Polygon(p) => write!(f, "P({})", p.vertices().len()),
        }
    }
}

pub enum Waypoints<'a> {
    Ellipse(EllipsePoints),
    Curve(CurvePoints),
    Polygon(PolygonPoints<'a>),
}

impl<'a> Iterator for Waypoints<'a> {
    type Item = Waypoint;

    fn next(&mut self) -> Option<Waypoint> {
        match self {
            Waypoints::Ellipse(it) => it.next(),
            Waypoints::Curve(it) => it.next(),
            Waypoints::Polygon(it) => it.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Recorder {
        pos: Position,
        moves: Vec<Waypoint>,
    }

    impl Travel for Recorder {
        fn travel(&mut self, x: i32, y: i32, marking: bool) -> Position {
            self.pos = Position::new(x, y);
            self.moves.push(Waypoint {
                pos: self.pos,
                marking,
            });
            self.pos
        }

        fn current_position(&self) -> Position {
            self.pos
        }
    }

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn param_counts() {
        assert!(Shape::from_params(ShapeKind::Circle, &[1, 2, 3]).is_ok());
        assert_eq!(
            Shape::from_params(ShapeKind::Circle, &[1, 2]),
            Err(ShapeError::WrongParamCount {
                kind: ShapeKind::Circle,
                count: 2
            })
        );
        assert!(Shape::from_params(ShapeKind::Ellipse, &[1, 2, 3, 4]).is_ok());
        assert!(Shape::from_params(ShapeKind::Ellipse, &[1, 2, 3, 4, 5]).is_err());
        assert!(Shape::from_params(ShapeKind::Ellipse, &[1, 2, 3, 4, 5, 6, 7]).is_ok());
        assert!(Shape::from_params(ShapeKind::CubicCurve, &[0; 8]).is_ok());
        assert!(Shape::from_params(ShapeKind::CubicCurve, &[0; 6]).is_err());
        assert!(Shape::from_params(ShapeKind::Polygon, &[]).is_err());
        assert!(Shape::from_params(ShapeKind::Polygon, &[1, 2, 3]).is_err());
        assert!(Shape::from_params(ShapeKind::Polygon, &[1, 2, 3, 4]).is_ok());
    }

    #[test]
    fn ellipse_angle_is_converted_to_radians() {
        let Ok(Shape::Ellipse(e)) =
            Shape::from_params(ShapeKind::Ellipse, &[10, 20, 5, 3, 10, 20, 90])
        else {
            panic!("expected an ellipse");
        };
        let r = e.rotation.unwrap();
        assert_eq!(r.origin, p(10, 20));
        assert!((r.angle - core::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn small_circle() {
        let c = Circle {
            center: p(10, 10),
            radius: 1,
        };
        let wps: Vec<_> = Shape::Circle(c).waypoints().collect();
        assert_eq!(
            wps,
            vec![
                Waypoint::move_to(p(9, 10)),
                Waypoint::line_to(p(9, 10)),
                Waypoint::line_to(p(10, 11)),
                Waypoint::line_to(p(11, 10)),
                Waypoint::line_to(p(11, 10)),
                Waypoint::line_to(p(10, 9)),
                Waypoint::line_to(p(9, 10)),
            ]
        );
    }

    #[test]
    fn rotated_ellipse_about_its_center() {
        let e = Ellipse {
            center: p(100, 100),
            a: 10,
            b: 5,
            rotation: Some(Rotation {
                origin: p(100, 100),
                angle: core::f64::consts::FRAC_PI_2,
            }),
        };
        // A quarter turn takes the left tip to the bottom.
        let start = e.waypoints().next().unwrap();
        assert_eq!(start, Waypoint::move_to(p(100, 90)));
    }

    #[test]
    fn polygon_is_closed() {
        let poly = Polygon::new([p(0, 0), p(0, 10), p(10, 10)]).unwrap();
        assert_eq!(poly.vertices(), &[p(0, 0), p(0, 10), p(10, 10), p(0, 0)]);

        // Already closed polygons are left alone.
        let poly = Polygon::new([p(0, 0), p(0, 10), p(0, 0)]).unwrap();
        assert_eq!(poly.vertices().len(), 3);
    }

    #[test]
    fn polygon_too_big() {
        let vs = (0..MAX_POLYGON_VERTICES as i32).map(|i| p(i, 0));
        assert_eq!(
            Polygon::new(vs),
            Err(ShapeError::TooManyVertices(MAX_POLYGON_VERTICES + 1))
        );
        let vs = (0..MAX_POLYGON_VERTICES as i32 - 1).map(|i| p(i, 0));
        assert!(Polygon::new(vs).is_ok());
    }

    #[test]
    fn polygon_moves_then_draws() {
        let shape = Shape::from_params(ShapeKind::Polygon, &[400, 400, 400, 1700, 1700, 1700])
            .unwrap();
        let mut rec = Recorder {
            pos: Position::ORIGIN,
            moves: Vec::new(),
        };
        let end = shape.realize(&mut rec);
        assert_eq!(end, p(400, 400));
        assert_eq!(
            rec.moves,
            vec![
                Waypoint::move_to(p(400, 400)),
                Waypoint::line_to(p(400, 1700)),
                Waypoint::line_to(p(1700, 1700)),
                Waypoint::line_to(p(400, 400)),
            ]
        );
    }

    #[test]
    fn vertical_curve_is_subdivided() {
        let c = CubicCurve {
            points: [p(0, 0), p(0, 10), p(0, 20), p(0, 30)],
        };
        let wps: Vec<_> = c.waypoints().collect();
        assert_eq!(wps.len(), 32);
        assert_eq!(wps.last().unwrap().pos, p(0, 30));
    }

    #[test]
    fn degenerate_curve() {
        let c = CubicCurve {
            points: [p(5, 5); 4],
        };
        let wps: Vec<_> = c.waypoints().collect();
        assert_eq!(wps, vec![Waypoint::move_to(p(5, 5)), Waypoint::line_to(p(5, 5))]);
    }

    #[test]
    fn extreme_semi_axis() {
        let e = Ellipse {
            center: Position::ORIGIN,
            a: i32::MIN,
            b: 10,
            rotation: None,
        };
        let wps: Vec<_> = e.waypoints().take(3).collect();
        assert_eq!(wps[0], Waypoint::move_to(p(-i32::MAX, 0)));
        assert_eq!(wps.len(), 3);
        assert!(wps[1..].iter().all(|w| w.marking));
    }

    #[test]
    fn widest_curve_ends() {
        let c = CubicCurve {
            points: [p(i32::MIN, 0), p(0, 0), p(0, 0), p(i32::MAX, 0)],
        };
        assert_eq!(c.span(), u32::MAX);
        let mut wps = c.waypoints();
        wps.next = Some(u64::from(u32::MAX));
        assert_eq!(wps.next(), Some(Waypoint::line_to(p(i32::MAX, 0))));
        assert_eq!(wps.next(), None);
    }

    #[test]
    fn describe() {
        let shape = Shape::from_params(ShapeKind::Circle, &[500, 500, 100]).unwrap();
        assert_eq!(shape.describe().to_string(), "C(500,500,100)");
        let shape = Shape::from_params(ShapeKind::Polygon, &[0, 0, 1, 1]).unwrap();
        assert_eq!(shape.describe().to_string(), "P(3)");
    }

    proptest! {
        #[test]
        fn circle_points_stay_near_the_circle(cx in -1000..1000i32, cy in -1000..1000i32, r in 0..300i32) {
            let c = Circle { center: p(cx, cy), radius: r };
            let wps: Vec<_> = Shape::Circle(c).waypoints().collect();
            prop_assert_eq!(wps.len(), 1 + 2 * (2 * r as usize + 1));
            prop_assert!(!wps[0].marking);
            for wp in &wps[1..] {
                prop_assert!(wp.marking);
                let dx = (wp.pos.x - cx) as f64;
                let dy = (wp.pos.y - cy) as f64;
                let d = (dx * dx + dy * dy).sqrt();
                prop_assert!(d <= r as f64 + 1e-9);
            }
            // The trace ends where it started.
            prop_assert_eq!(wps.last().unwrap().pos, wps[0].pos);
        }

        #[test]
        fn curve_hits_its_endpoints(coords in proptest::array::uniform8(-500..500i32)) {
            let c = CubicCurve {
                points: [p(coords[0], coords[1]), p(coords[2], coords[3]), p(coords[4], coords[5]), p(coords[6], coords[7])],
            };
            let wps: Vec<_> = c.waypoints().collect();
            prop_assert_eq!(wps[0], Waypoint::move_to(c.points[0]));
            prop_assert_eq!(wps.last().unwrap().pos, c.points[3]);
            prop_assert!(wps[1..].iter().all(|w| w.marking));
        }

        #[test]
        fn polygons_are_closed(coords in proptest::collection::vec(-500..500i32, 1..30)) {
            let coords: Vec<i32> = coords.iter().flat_map(|&c| [c, c / 2]).collect();
            let Shape::Polygon(poly) = Shape::from_params(ShapeKind::Polygon, &coords).unwrap() else {
                panic!("expected a polygon");
            };
            let vs = poly.vertices();
            prop_assert_eq!(vs.first(), vs.last());
            let wps: Vec<_> = poly.waypoints().collect();
            prop_assert!(!wps[0].marking);
            prop_assert!(wps[1..].iter().all(|w| w.marking));
        }
    }
}
