use xyplot_geom::Shape;

/// How many shapes we buffer before stopping to draw them.
pub const BATCH_CAPACITY: usize = 50;

/// Shapes waiting to be drawn, in the order they arrived.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    shapes: heapless::Vec<Shape, BATCH_CAPACITY>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a shape, returning the index it was stored at.
    ///
    /// If the batch is already full, the shape is handed back.
    pub fn push(&mut self, shape: Shape) -> Result<usize, Shape> {
        let idx = self.shapes.len();
        self.shapes.push(shape)?;
        Ok(idx)
    }

    pub fn is_full(&self) -> bool {
        self.shapes.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    /// Empties the batch, returning its shapes in insertion order.
    pub fn take(&mut self) -> impl Iterator<Item = Shape> {
        core::mem::take(&mut self.shapes).into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xyplot_geom::{Circle, Position};

    fn circle(r: i32) -> Shape {
        Shape::Circle(Circle {
            center: Position::ORIGIN,
            radius: r,
        })
    }

    #[test]
    fn fills_up() {
        let mut batch = Batch::new();
        for i in 0..BATCH_CAPACITY {
            assert!(!batch.is_full());
            assert_eq!(batch.push(circle(i as i32)), Ok(i));
        }
        assert!(batch.is_full());
        assert_eq!(batch.push(circle(99)), Err(circle(99)));

        let radii: Vec<_> = batch
            .take()
            .map(|s| match s {
                Shape::Circle(c) => c.radius,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(radii, (0..BATCH_CAPACITY as i32).collect::<Vec<_>>());
        assert!(batch.is_empty());
    }
}
