use std::io::Write;

use svg::{
    node::element::{path::Data, Path, Rectangle},
    Document,
};
use xyplot_geom::{Position, XY};

/// Draws the pen strokes, with the travel area outlined.
pub fn render(strokes: &[Vec<Position>], extent: XY<i32>) -> Document {
    let mut document = Document::new().set("viewBox", (0, 0, extent.x, extent.y));
    document = document.add(
        Rectangle::new()
            .set("width", extent.x)
            .set("height", extent.y)
            .set("fill", "none")
            .set("stroke", "lightgray"),
    );

    for stroke in strokes {
        let Some((first, rest)) = stroke.split_first() else {
            continue;
        };
        let mut data = Data::new().move_to((first.x as f32, first.y as f32));
        for p in rest {
            data = data.line_to((p.x as f32, p.y as f32));
        }
        document = document.add(
            Path::new()
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", 2)
                .set("d", data),
        );
    }
    document
}

pub fn write(out: impl Write, strokes: &[Vec<Position>], extent: XY<i32>) -> std::io::Result<()> {
    svg::write(out, &render(strokes, extent))
}
