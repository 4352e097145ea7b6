//! Parsed machine motion.

use std::fmt;
use std::str::FromStr;

use millsim_math::{Axes, Bounds3, Point3};
use serde_json::{Map, Value};

use crate::{ProjectError, Result};

/// Kind of motion. Only rapid moves are excluded from cutting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MoveType {
    /// Positioning move; never removes material.
    #[default]
    Rapid,
    /// Any move made at feed rate.
    Cutting,
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MoveType::Rapid => "RAPID",
            MoveType::Cutting => "CUTTING",
        })
    }
}

impl FromStr for MoveType {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("MOVE_").unwrap_or(&upper) {
            "RAPID" => Ok(MoveType::Rapid),
            "CUTTING" | "LINEAR" | "ARC" | "DRILL" | "PROBE" => Ok(MoveType::Cutting),
            _ => Err(ProjectError::UnknownMoveType(s.to_string())),
        }
    }
}

/// One straight-line motion segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    /// Rapid or cutting.
    pub kind: MoveType,
    /// Machine position at the start of the move.
    pub start: Axes,
    /// Machine position at the end of the move.
    pub end: Axes,
    /// Seconds from the start of the path.
    pub start_time: f64,
    /// Tool number; negative means no tool.
    pub tool: i32,
    /// Feed rate in mm/min.
    pub feed: f64,
    /// Spindle speed in RPM.
    pub speed: f64,
    /// Source line number.
    pub line: u32,
}

impl Move {
    /// Create a move.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: MoveType,
        start: Axes,
        end: Axes,
        start_time: f64,
        tool: i32,
        feed: f64,
        speed: f64,
        line: u32,
    ) -> Self {
        Self {
            kind,
            start,
            end,
            start_time,
            tool,
            feed,
            speed,
            line,
        }
    }

    /// Cutting move between two XYZ points with no feed.
    pub fn cutting(start: Point3, end: Point3, tool: i32) -> Self {
        Self::new(
            MoveType::Cutting,
            Axes::from_xyz(&start),
            Axes::from_xyz(&end),
            0.0,
            tool,
            0.0,
            0.0,
            0,
        )
    }

    /// Tool tip position at the start.
    pub fn start_point(&self) -> Point3 {
        self.start.xyz()
    }

    /// Tool tip position at the end.
    pub fn end_point(&self) -> Point3 {
        self.end.xyz()
    }

    /// Length of the XYZ travel.
    pub fn distance(&self) -> f64 {
        (self.end_point() - self.start_point()).norm()
    }

    /// Duration in seconds at the programmed feed; 0 without a feed.
    pub fn time(&self) -> f64 {
        if self.feed > 0.0 {
            self.distance() / self.feed * 60.0
        } else {
            0.0
        }
    }

    /// Seconds from the start of the path to the end of this move.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.time()
    }
}

/// Ordered moves with running bounds, time and distance.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPath {
    moves: Vec<Move>,
    bounds: Bounds3,
    time: f64,
    distance: f64,
}

impl Default for ToolPath {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolPath {
    /// Create an empty path.
    pub fn new() -> Self {
        Self {
            moves: Vec::new(),
            bounds: Bounds3::empty(),
            time: 0.0,
            distance: 0.0,
        }
    }

    /// Append a move.
    pub fn push(&mut self, m: Move) {
        self.bounds.add_point(&m.start_point());
        self.bounds.add_point(&m.end_point());
        self.time += m.time();
        self.distance += m.distance();
        self.moves.push(m);
    }

    /// Moves in order.
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// Move at `index`.
    pub fn get(&self, index: usize) -> Option<&Move> {
        self.moves.get(index)
    }

    /// Number of moves.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// True if there are no moves.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Box around every start and end point.
    pub fn bounds(&self) -> Bounds3 {
        self.bounds
    }

    /// Total duration in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Total XYZ travel.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Index of the move running at `time`.
    pub fn find(&self, time: f64) -> Option<usize> {
        let mut first = 0;
        let mut last = self.moves.len();

        while last - first > 1 {
            let mid = (first + last) / 2;
            if time < self.moves[mid].start_time {
                last = mid;
            } else {
                first = mid;
            }
        }

        let m = self.moves.get(first)?;
        (m.start_time <= time && time <= m.end_time()).then_some(first)
    }

    /// Read a JSON list of moves.
    ///
    /// Each entry holds the end position by axis letter plus optional
    /// `type`, `line`, `tool`, `feed` and `speed`. Missing values carry
    /// over from the previous entry. The first move starts at the origin
    /// as a rapid with tool 1.
    pub fn from_json(value: &Value) -> Result<Self> {
        let list = value
            .as_array()
            .ok_or_else(|| ProjectError::InvalidToolPath("expected a list of moves".into()))?;

        let mut path = Self::new();
        let mut start = Axes::new();
        let mut kind = MoveType::Rapid;
        let mut line = 0u32;
        let mut tool = 1i32;
        let mut feed = 0.0;
        let mut speed = 0.0;
        let mut time = 0.0;

        for (i, entry) in list.iter().enumerate() {
            let dict = entry.as_object().ok_or_else(|| {
                ProjectError::InvalidToolPath(format!("move {} is not an object", i))
            })?;

            let mut end = start;
            for (axis, letter) in Axes::AXES.chars().enumerate() {
                if let Some(v) = number(dict, &letter.to_string(), i)? {
                    end[axis] = v;
                }
            }

            if let Some(t) = dict.get("type").and_then(Value::as_str) {
                kind = t.parse()?;
            }
            if let Some(v) = number(dict, "line", i)? {
                line = v as u32;
            }
            if let Some(v) = number(dict, "tool", i)? {
                tool = v as i32;
            }
            feed = number(dict, "feed", i)?.unwrap_or(feed);
            speed = number(dict, "speed", i)?.unwrap_or(speed);

            let m = Move::new(kind, start, end, time, tool, feed, speed, line);
            time += m.time();
            start = end;
            path.push(m);
        }

        Ok(path)
    }

    /// Write the JSON list form, emitting only values that changed from
    /// the previous move.
    pub fn to_json(&self) -> Value {
        let mut last_pos = Axes::splat(f64::INFINITY);
        let mut kind = None;
        let mut line = None;
        let mut tool = None;
        let mut feed = None;
        let mut speed = None;

        let list = self
            .moves
            .iter()
            .map(|m| {
                let mut dict = Map::new();

                for (axis, letter) in Axes::AXES.chars().enumerate() {
                    if m.end[axis] != last_pos[axis] {
                        last_pos[axis] = m.end[axis];
                        dict.insert(letter.to_string(), Value::from(m.end[axis]));
                    }
                }
                if kind.replace(m.kind) != Some(m.kind) {
                    dict.insert("type".into(), Value::from(m.kind.to_string()));
                }
                if line.replace(m.line) != Some(m.line) {
                    dict.insert("line".into(), Value::from(m.line));
                }
                if tool.replace(m.tool) != Some(m.tool) {
                    dict.insert("tool".into(), Value::from(m.tool));
                }
                if feed.replace(m.feed) != Some(m.feed) {
                    dict.insert("feed".into(), Value::from(m.feed));
                }
                if speed.replace(m.speed) != Some(m.speed) {
                    dict.insert("speed".into(), Value::from(m.speed));
                }

                Value::Object(dict)
            })
            .collect();

        Value::Array(list)
    }
}

fn number(dict: &Map<String, Value>, key: &str, index: usize) -> Result<Option<f64>> {
    match dict.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| {
            ProjectError::InvalidToolPath(format!("move {}: '{}' is not a number: {}", index, key, v))
        }),
    }
}

impl<'a> IntoIterator for &'a ToolPath {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}

impl FromIterator<Move> for ToolPath {
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        let mut path = Self::new();
        for m in iter {
            path.push(m);
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn test_move_type_tokens() {
        assert_eq!("rapid".parse::<MoveType>().unwrap(), MoveType::Rapid);
        assert_eq!("MOVE_ARC".parse::<MoveType>().unwrap(), MoveType::Cutting);
        assert_eq!("Drill".parse::<MoveType>().unwrap(), MoveType::Cutting);
        assert!(matches!(
            "teleport".parse::<MoveType>(),
            Err(ProjectError::UnknownMoveType(_))
        ));
    }

    #[test]
    fn test_move_time() {
        let mut m = Move::cutting(Point3::origin(), Point3::new(3.0, 4.0, 0.0), 1);
        assert_relative_eq!(m.distance(), 5.0);
        assert_eq!(m.time(), 0.0);

        m.feed = 300.0;
        assert_relative_eq!(m.time(), 1.0);
        m.start_time = 2.0;
        assert_relative_eq!(m.end_time(), 3.0);
    }

    #[test]
    fn test_read_inherits_values() {
        let path = ToolPath::from_json(&json!([
            {"X": 10, "feed": 600},
            {"type": "cutting", "Z": -1, "tool": 3},
            {"Y": 5, "line": 7},
        ]))
        .unwrap();

        assert_eq!(path.len(), 3);

        let first = &path.moves()[0];
        assert_eq!(first.kind, MoveType::Rapid);
        assert_eq!(first.tool, 1);
        assert_eq!(first.start_point(), Point3::origin());
        assert_eq!(first.end_point(), Point3::new(10.0, 0.0, 0.0));
        assert_relative_eq!(first.time(), 1.0);

        let second = &path.moves()[1];
        assert_eq!(second.kind, MoveType::Cutting);
        assert_eq!(second.tool, 3);
        assert_eq!(second.start_point(), Point3::new(10.0, 0.0, 0.0));
        assert_eq!(second.end_point(), Point3::new(10.0, 0.0, -1.0));
        assert_relative_eq!(second.start_time, 1.0);
        assert_relative_eq!(second.feed, 600.0);

        let third = &path.moves()[2];
        assert_eq!(third.kind, MoveType::Cutting);
        assert_eq!(third.line, 7);
        assert_eq!(third.end_point(), Point3::new(10.0, 5.0, -1.0));

        assert_relative_eq!(path.distance(), 16.0);
        assert_relative_eq!(path.time(), 1.6, epsilon = 1e-12);
        assert_eq!(path.bounds().min(), Point3::new(0.0, 0.0, -1.0));
        assert_eq!(path.bounds().max(), Point3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn test_read_rejects_bad_entries() {
        assert!(ToolPath::from_json(&json!({"X": 1})).is_err());
        assert!(ToolPath::from_json(&json!([1, 2])).is_err());
        assert!(ToolPath::from_json(&json!([{"X": "far"}])).is_err());
        assert!(ToolPath::from_json(&json!([{"type": "warp"}])).is_err());
    }

    #[test]
    fn test_write_only_changes() {
        let path = ToolPath::from_json(&json!([
            {"X": 1, "feed": 100, "type": "cutting"},
            {"X": 2},
        ]))
        .unwrap();

        let out = path.to_json();
        let list = out.as_array().unwrap();
        assert_eq!(list.len(), 2);

        // First entry carries every axis and attribute
        assert_eq!(list[0].as_object().unwrap().len(), 9 + 5);
        assert_eq!(list[1], json!({"X": 2.0}));

        assert_eq!(ToolPath::from_json(&out).unwrap(), path);
    }

    #[test]
    fn test_find() {
        let path: ToolPath = (0..4)
            .map(|i| {
                let x = i as f64;
                let mut m = Move::cutting(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 0.0, 0.0), 1);
                m.feed = 60.0;
                m.start_time = x;
                m
            })
            .collect();

        assert_relative_eq!(path.time(), 4.0);
        assert_eq!(path.find(0.0), Some(0));
        assert_eq!(path.find(2.5), Some(2));
        assert_eq!(path.find(4.0), Some(3));
        assert_eq!(path.find(4.5), None);
        assert_eq!(path.find(-1.0), None);
        assert_eq!(ToolPath::new().find(0.0), None);
    }
}
