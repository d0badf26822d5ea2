// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fmt::Write;

/// An RGBA colour. Alpha is 0.0 (transparent) to 1.0 (opaque).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Color {
        Color { r, g, b, a }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Point {
        Point { x, y }
    }
}

/// Something the renderer can paint onto.
pub trait Surface {
    fn width(&self) -> f32;

    fn height(&self) -> f32;

    /// Erases everything previously drawn.
    fn clear(&mut self);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);

    fn stroke_line(&mut self, from: Point, to: Point, line_width: f32, color: Color);

    fn fill_polygon(&mut self, points: &[Point], color: Color);
}

/// A single recorded drawing operation.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    Line {
        from: Point,
        to: Point,
        line_width: f32,
        color: Color,
    },
    Polygon {
        points: Vec<Point>,
        color: Color,
    },
}

/// A surface that records what was drawn so a shell can rasterise it.
#[derive(Clone, Debug)]
pub struct DisplayList {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
    /// Incremented on every clear.
    generation: u64,
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> DisplayList {
        DisplayList {
            width,
            height,
            ops: Vec::new(),
            generation: 0,
        }
    }

    /// The operations drawn since the last clear.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// The number of times this surface has been cleared.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn write_svg_body(&self, out: &mut String) -> std::fmt::Result {
        for op in self.ops.iter() {
            match op {
                DrawOp::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => writeln!(
                    out,
                    r#"<rect x="{x}" y="{y}" width="{width}" height="{height}" {}/>"#,
                    svg_fill(color)
                )?,
                DrawOp::Line {
                    from,
                    to,
                    line_width,
                    color,
                } => writeln!(
                    out,
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="rgb({},{},{})" stroke-opacity="{}" stroke-width="{line_width}"/>"#,
                    from.x, from.y, to.x, to.y, color.r, color.g, color.b, color.a
                )?,
                DrawOp::Polygon { points, color } => {
                    let points = points
                        .iter()
                        .map(|p| format!("{},{}", p.x, p.y))
                        .collect::<Vec<_>>()
                        .join(" ");
                    writeln!(out, r#"<polygon points="{points}" {}/>"#, svg_fill(color))?
                }
            }
        }
        Ok(())
    }
}

fn svg_fill(color: &Color) -> String {
    format!(
        r#"fill="rgb({},{},{})" fill-opacity="{}""#,
        color.r, color.g, color.b, color.a
    )
}

impl Surface for DisplayList {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.generation += 1;
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.ops.push(DrawOp::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn stroke_line(&mut self, from: Point, to: Point, line_width: f32, color: Color) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            line_width,
            color,
        });
    }

    fn fill_polygon(&mut self, points: &[Point], color: Color) {
        self.ops.push(DrawOp::Polygon {
            points: points.to_vec(),
            color,
        });
    }
}

/// Stacks display lists (first is bottom) into one SVG document sized to the first layer.
pub fn to_svg(layers: &[&DisplayList], background: Color) -> String {
    let (width, height) = layers
        .first()
        .map(|layer| (layer.width, layer.height))
        .unwrap_or((0.0, 0.0));
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = writeln!(
        out,
        r#"<rect x="0" y="0" width="{width}" height="{height}" {}/>"#,
        svg_fill(&background)
    );
    for layer in layers {
        let _ = layer.write_svg_body(&mut out);
    }
    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_list_records_and_clears() {
        let mut list = DisplayList::new(100.0, 50.0);
        list.fill_rect(0.0, 0.0, 10.0, 50.0, Color::rgb(1, 2, 3));
        list.stroke_line(
            Point::new(5.0, 0.0),
            Point::new(5.0, 50.0),
            1.0,
            Color::rgb(4, 5, 6),
        );
        assert_eq!(list.ops().len(), 2);
        assert_eq!(list.generation(), 0);

        list.clear();
        assert!(list.ops().is_empty());
        assert_eq!(list.generation(), 1);
    }

    #[test]
    fn test_svg_contains_every_layer() {
        let mut bottom = DisplayList::new(20.0, 10.0);
        bottom.fill_polygon(
            &[Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(0.0, 10.0)],
            Color::rgb(0, 255, 0),
        );
        let mut top = DisplayList::new(20.0, 10.0);
        top.fill_rect(0.0, 0.0, 5.0, 10.0, Color::rgba(0, 0, 0, 0.5));

        let svg = to_svg(&[&bottom, &top], Color::rgb(0, 0, 0));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"<polygon points="0,0 10,5 0,10""#));
        assert!(svg.contains(r#"fill-opacity="0.5""#));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.find("<polygon").unwrap() < svg.find(r#"width="5""#).unwrap());
    }
}
