//! Canvas positions stored in annotations.
//!
//! The editor keeps node coordinates under the [`POSITION_ANNOTATION`] key of
//! a task's, input's or output's annotation map, encoded as a JSON string
//! (`"{\"x\":10,\"y\":20}"`). Plain JSON objects are accepted on read.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component::{Annotations, InputSpec, OutputSpec};
use crate::task::TaskSpec;

/// Annotation key holding the canvas position.
pub const POSITION_ANNOTATION: &str = "editor.position";

/// A point on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    /// Center of the bounding box of `points`; `None` when empty.
    pub fn bounding_center<I>(points: I) -> Option<Position>
    where
        I: IntoIterator<Item = Position>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (mut min, mut max) = (first, first);
        for p in points {
            min = Position::new(min.x.min(p.x), min.y.min(p.y));
            max = Position::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some(Position::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0))
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

fn read_position(annotations: &Annotations) -> Option<Position> {
    match annotations.get(POSITION_ANNOTATION)? {
        Value::String(text) => serde_json::from_str(text).ok(),
        value @ Value::Object(_) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}

fn write_position(annotations: &mut Annotations, position: Position) {
    if let Ok(text) = serde_json::to_string(&position) {
        annotations.insert(POSITION_ANNOTATION.to_string(), Value::String(text));
    }
}

/// Anything carrying an annotation map that may hold a canvas position.
pub trait Positioned {
    fn annotations(&self) -> &Annotations;
    fn annotations_mut(&mut self) -> &mut Annotations;

    fn position(&self) -> Option<Position> {
        read_position(self.annotations())
    }

    fn set_position(&mut self, position: Position) {
        write_position(self.annotations_mut(), position);
    }
}

impl Positioned for TaskSpec {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

impl Positioned for InputSpec {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

impl Positioned for OutputSpec {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips_through_annotation_string() {
        let mut task = TaskSpec::default();
        assert_eq!(task.position(), None);
        task.set_position(Position::new(10.0, -4.5));
        assert!(matches!(
            task.annotations.get(POSITION_ANNOTATION),
            Some(Value::String(_))
        ));
        assert_eq!(task.position(), Some(Position::new(10.0, -4.5)));
    }

    #[test]
    fn object_encoded_position_is_accepted() {
        let mut input = InputSpec::new("x");
        input.annotations.insert(
            POSITION_ANNOTATION.to_string(),
            serde_json::json!({"x": 1, "y": 2}),
        );
        assert_eq!(input.position(), Some(Position::new(1.0, 2.0)));
    }

    #[test]
    fn garbage_position_reads_as_none() {
        let mut output = OutputSpec::new("y");
        output
            .annotations
            .insert(POSITION_ANNOTATION.to_string(), Value::Bool(true));
        assert_eq!(output.position(), None);
    }

    #[test]
    fn bounding_center() {
        let center = Position::bounding_center([
            Position::new(0.0, 0.0),
            Position::new(100.0, 40.0),
            Position::new(50.0, 10.0),
        ]);
        assert_eq!(center, Some(Position::new(50.0, 20.0)));
        assert_eq!(Position::bounding_center(Vec::new()), None);
        assert_eq!(
            Position::new(1.0, 2.0) + Position::new(3.0, 4.0) - Position::new(1.0, 1.0),
            Position::new(3.0, 5.0)
        );
    }
}
