//! Shape palette: the shapes a user can drop onto the canvas.

use crate::style::{
    DEFAULT_FILL, DEFAULT_STROKE, DEFAULT_TEXT_COLOR, PROPERTY_FILL, PROPERTY_OUTLINE,
    PROPERTY_TEXT_COLOR,
};
use kurbo::{BezPath, Ellipse, Point, Rect, RoundedRect, Shape, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tolerance used when flattening curved outlines.
const PATH_TOLERANCE: f64 = 0.1;

/// Geometric outline drawn for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Rectangle,
    RoundedRectangle,
    Ellipse,
    Diamond,
    Parallelogram,
    Triangle,
    Hexagon,
    Document,
    Cylinder,
}

impl ShapeKind {
    /// Outline of the shape fitted to `bounds`.
    pub fn outline(self, bounds: Rect) -> BezPath {
        let (x0, y0, x1, y1) = (bounds.x0, bounds.y0, bounds.x1, bounds.y1);
        let w = bounds.width();
        let h = bounds.height();
        let c = bounds.center();
        match self {
            ShapeKind::Rectangle => bounds.to_path(PATH_TOLERANCE),
            ShapeKind::RoundedRectangle => {
                let radius = w.min(h) / 2.0;
                RoundedRect::from_rect(bounds, radius).to_path(PATH_TOLERANCE)
            }
            ShapeKind::Ellipse => Ellipse::from_rect(bounds).to_path(PATH_TOLERANCE),
            ShapeKind::Diamond => polygon(&[
                Point::new(c.x, y0),
                Point::new(x1, c.y),
                Point::new(c.x, y1),
                Point::new(x0, c.y),
            ]),
            ShapeKind::Parallelogram => {
                let skew = w * 0.2;
                polygon(&[
                    Point::new(x0 + skew, y0),
                    Point::new(x1, y0),
                    Point::new(x1 - skew, y1),
                    Point::new(x0, y1),
                ])
            }
            ShapeKind::Triangle => polygon(&[
                Point::new(c.x, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ]),
            ShapeKind::Hexagon => {
                let inset = w * 0.2;
                polygon(&[
                    Point::new(x0 + inset, y0),
                    Point::new(x1 - inset, y0),
                    Point::new(x1, c.y),
                    Point::new(x1 - inset, y1),
                    Point::new(x0 + inset, y1),
                    Point::new(x0, c.y),
                ])
            }
            ShapeKind::Document => {
                let wave = h * 0.1;
                let mut path = BezPath::new();
                path.move_to((x0, y0));
                path.line_to((x1, y0));
                path.line_to((x1, y1 - wave));
                path.curve_to(
                    (x0 + w * 0.75, y1 - 3.0 * wave),
                    (x0 + w * 0.25, y1 + wave),
                    (x0, y1 - wave),
                );
                path.close_path();
                path
            }
            ShapeKind::Cylinder => {
                let cap = (h * 0.15).min(w / 2.0);
                let mut path = BezPath::new();
                path.move_to((x0, y0 + cap));
                path.curve_to((x0, y0 - cap / 3.0), (x1, y0 - cap / 3.0), (x1, y0 + cap));
                path.line_to((x1, y1 - cap));
                path.curve_to((x1, y1 + cap / 3.0), (x0, y1 + cap / 3.0), (x0, y1 - cap));
                path.close_path();
                path
            }
        }
    }
}

fn polygon(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((&first, rest)) = points.split_first() {
        path.move_to(first);
        for &point in rest {
            path.line_to(point);
        }
        path.close_path();
    }
    path
}

/// A shape offered by the palette. Its id becomes the dropped node's type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDefinition {
    pub id: String,
    pub label: String,
    pub kind: ShapeKind,
    /// Size override for dropped nodes.
    pub size: Option<Size>,
}

impl ShapeDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ShapeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            size: None,
        }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }
}

/// A named group of shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSet {
    pub id: String,
    pub name: String,
    pub shapes: Vec<ShapeDefinition>,
}

impl ShapeSet {
    /// Flowchart symbols.
    pub fn flowchart() -> Self {
        Self {
            id: "flowchart".to_string(),
            name: "Flowchart".to_string(),
            shapes: vec![
                ShapeDefinition::new("process", "Process", ShapeKind::Rectangle),
                ShapeDefinition::new("decision", "Decision", ShapeKind::Diamond)
                    .with_size(Size::new(120.0, 120.0)),
                ShapeDefinition::new("terminus", "Terminus", ShapeKind::RoundedRectangle)
                    .with_size(Size::new(120.0, 60.0)),
                ShapeDefinition::new("data", "Data", ShapeKind::Parallelogram),
                ShapeDefinition::new("document", "Document", ShapeKind::Document),
                ShapeDefinition::new("preparation", "Preparation", ShapeKind::Hexagon),
                ShapeDefinition::new("database", "Database", ShapeKind::Cylinder),
            ],
        }
    }

    /// Basic geometric shapes.
    pub fn basic() -> Self {
        Self {
            id: "basic".to_string(),
            name: "Basic Shapes".to_string(),
            shapes: vec![
                ShapeDefinition::new("rectangle", "Rectangle", ShapeKind::Rectangle),
                ShapeDefinition::new("ellipse", "Ellipse", ShapeKind::Ellipse),
                ShapeDefinition::new("circle", "Circle", ShapeKind::Ellipse)
                    .with_size(Size::new(80.0, 80.0)),
                ShapeDefinition::new("triangle", "Triangle", ShapeKind::Triangle),
                ShapeDefinition::new("diamond", "Diamond", ShapeKind::Diamond),
            ],
        }
    }
}

/// Ordered collection of shape sets. Earlier sets win on duplicate ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeLibrary {
    sets: Vec<ShapeSet>,
}

impl Default for ShapeLibrary {
    fn default() -> Self {
        Self::new(vec![ShapeSet::flowchart(), ShapeSet::basic()])
    }
}

impl ShapeLibrary {
    pub fn new(sets: Vec<ShapeSet>) -> Self {
        Self { sets }
    }

    pub fn sets(&self) -> &[ShapeSet] {
        &self.sets
    }

    /// Look up a shape by id.
    pub fn shape(&self, id: &str) -> Option<&ShapeDefinition> {
        self.sets
            .iter()
            .flat_map(|set| set.shapes.iter())
            .find(|shape| shape.id == id)
    }
}

/// Supplies the initial payload of a node dropped from the palette.
pub trait PayloadGenerator {
    fn generate(&self, shape: &ShapeDefinition) -> Map<String, Value>;
}

impl<F> PayloadGenerator for F
where
    F: Fn(&ShapeDefinition) -> Map<String, Value>,
{
    fn generate(&self, shape: &ShapeDefinition) -> Map<String, Value> {
        self(shape)
    }
}

/// Default fill, outline and text color.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPayload;

impl PayloadGenerator for DefaultPayload {
    fn generate(&self, _shape: &ShapeDefinition) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(PROPERTY_FILL.to_string(), Value::from(DEFAULT_FILL.to_hex()));
        payload.insert(PROPERTY_OUTLINE.to_string(), Value::from(DEFAULT_STROKE.to_hex()));
        payload.insert(
            PROPERTY_TEXT_COLOR.to_string(),
            Value::from(DEFAULT_TEXT_COLOR.to_hex()),
        );
        payload
    }
}
