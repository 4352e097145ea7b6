//! Tool definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use millsim_math::Axes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{Result, ToolError};

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Unit system a tool was specified in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolUnits {
    /// Millimeters.
    #[default]
    #[serde(alias = "mm")]
    Mm,
    /// Inches.
    #[serde(alias = "inch")]
    Inch,
}

impl ToolUnits {
    /// Factor converting a value in these units to millimeters.
    pub fn to_mm(self) -> f64 {
        match self {
            ToolUnits::Mm => 1.0,
            ToolUnits::Inch => MM_PER_INCH,
        }
    }
}

impl fmt::Display for ToolUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolUnits::Mm => "MM",
            ToolUnits::Inch => "INCH",
        })
    }
}

impl FromStr for ToolUnits {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MM" => Ok(ToolUnits::Mm),
            "INCH" | "IN" => Ok(ToolUnits::Inch),
            _ => Err(ToolError::UnknownUnits(s.to_string())),
        }
    }
}

/// Profile of the cutting end of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolShape {
    /// Flat end mill.
    #[default]
    Cylindrical,
    /// V-bit tapering to a point.
    Conical,
    /// Hemispherical tip on a cylindrical shank.
    Ballnose,
    /// Ellipsoid of revolution.
    Spheroid,
    /// Truncated cone.
    Snubnose,
}

impl ToolShape {
    /// All shapes in declaration order.
    pub const ALL: [ToolShape; 5] = [
        ToolShape::Cylindrical,
        ToolShape::Conical,
        ToolShape::Ballnose,
        ToolShape::Spheroid,
        ToolShape::Snubnose,
    ];
}

impl fmt::Display for ToolShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolShape::Cylindrical => "CYLINDRICAL",
            ToolShape::Conical => "CONICAL",
            ToolShape::Ballnose => "BALLNOSE",
            ToolShape::Spheroid => "SPHEROID",
            ToolShape::Snubnose => "SNUBNOSE",
        })
    }
}

impl FromStr for ToolShape {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CYLINDRICAL" => Ok(ToolShape::Cylindrical),
            "CONICAL" => Ok(ToolShape::Conical),
            "BALLNOSE" => Ok(ToolShape::Ballnose),
            "SPHEROID" | "SPHEROIDAL" => Ok(ToolShape::Spheroid),
            "SNUBNOSE" => Ok(ToolShape::Snubnose),
            _ => Err(ToolError::UnknownShape(s.to_string())),
        }
    }
}

/// A cutting tool.
///
/// `length`, `radius` and `snub_diameter` are stored in millimeters whatever
/// [`ToolUnits`] the tool uses. Changing the units does not rescale them.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    number: u32,
    pocket: u32,
    units: ToolUnits,
    shape: ToolShape,
    length: f64,
    radius: f64,
    snub_diameter: f64,
    description: String,
    offsets: Axes,
}

impl Tool {
    /// Create a cylindrical tool with defaults for the unit system.
    ///
    /// Metric tools are 10mm long with a 1mm radius; imperial tools are one
    /// inch long with a 1/16 inch radius.
    pub fn new(number: u32, pocket: u32, units: ToolUnits) -> Self {
        let (length, radius) = match units {
            ToolUnits::Mm => (10.0, 1.0),
            ToolUnits::Inch => (MM_PER_INCH, MM_PER_INCH / 16.0),
        };

        Self {
            number,
            pocket,
            units,
            shape: ToolShape::Cylindrical,
            length,
            radius,
            snub_diameter: 0.0,
            description: String::new(),
            offsets: Axes::new(),
        }
    }

    /// The tool used for lookups of undefined tool numbers.
    pub fn null() -> Self {
        Self::new(0, 0, ToolUnits::Mm)
    }

    /// Tool number (T word).
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Set the tool number.
    pub fn set_number(&mut self, number: u32) {
        self.number = number;
    }

    /// Tool changer pocket.
    pub fn pocket(&self) -> u32 {
        self.pocket
    }

    /// Set the tool changer pocket.
    pub fn set_pocket(&mut self, pocket: u32) {
        self.pocket = pocket;
    }

    /// Unit system used for display and serialization.
    pub fn units(&self) -> ToolUnits {
        self.units
    }

    /// Set the unit system. Stored lengths are left untouched.
    pub fn set_units(&mut self, units: ToolUnits) {
        self.units = units;
    }

    /// Cutting profile.
    pub fn shape(&self) -> ToolShape {
        self.shape
    }

    /// Set the cutting profile.
    pub fn set_shape(&mut self, shape: ToolShape) {
        self.shape = shape;
    }

    /// Length in mm.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Set the length in mm.
    pub fn set_length(&mut self, length: f64) {
        self.length = length;
    }

    /// Radius in mm.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Set the radius in mm.
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }

    /// Diameter in mm.
    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }

    /// Set the diameter in mm. Updates the radius.
    pub fn set_diameter(&mut self, diameter: f64) {
        self.radius = diameter / 2.0;
    }

    /// Tip diameter of a snubnose tool in mm.
    pub fn snub_diameter(&self) -> f64 {
        self.snub_diameter
    }

    /// Set the snubnose tip diameter in mm.
    pub fn set_snub_diameter(&mut self, snub_diameter: f64) {
        self.snub_diameter = snub_diameter;
    }

    /// Free text description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Set the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Axis offsets.
    pub fn offsets(&self) -> &Axes {
        &self.offsets
    }

    /// Mutable axis offsets.
    pub fn offsets_mut(&mut self) -> &mut Axes {
        &mut self.offsets
    }

    /// Included angle in degrees of the cone spanned by radius and length,
    /// rounded to two decimals.
    pub fn angle(&self) -> f64 {
        let angle = 180.0 - 360.0 * (self.length / self.radius).atan() / std::f64::consts::PI;
        (angle * 100.0).round() / 100.0
    }

    /// Set the length so that [`Tool::angle`] returns `angle`.
    pub fn set_length_from_angle(&mut self, angle: f64) {
        self.length = self.radius * ((1.0 - angle / 180.0) * std::f64::consts::FRAC_PI_2).tan();
    }

    /// Short size label such as `6x20mm` or `60deg 0.25inch`.
    pub fn size_text(&self) -> String {
        let scale = 1.0 / self.units.to_mm();
        let diameter = self.diameter() * scale;
        let length = self.length * scale;

        let size = if self.shape == ToolShape::Conical {
            format!("{}deg {}", format_g(self.angle()), format_g(diameter))
        } else {
            format!("{}x{}", format_g(diameter), format_g(length))
        };

        size + &self.units.to_string().to_lowercase()
    }

    /// Description, or the size label and shape if there is none.
    pub fn text(&self) -> String {
        if !self.description.is_empty() {
            return self.description.clone();
        }

        let shape = self.shape.to_string().to_lowercase();
        let mut chars = shape.chars();
        let shape = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };

        format!("{} {}", self.size_text(), shape)
    }

    /// Check that length and radius are positive.
    pub fn validate(&self) -> Result<()> {
        if !(self.length > 0.0) {
            return Err(ToolError::InvalidDimension {
                number: self.number,
                field: "length",
                value: self.length,
            });
        }
        if !(self.radius > 0.0) {
            return Err(ToolError::InvalidDimension {
                number: self.number,
                field: "radius",
                value: self.radius,
            });
        }
        Ok(())
    }

    /// Read the attributes of a `<tool>` element.
    ///
    /// Bad `units` or `shape` tokens are logged and ignored. A missing
    /// `length`, or missing both `radius` and `diameter`, is an error.
    /// Values are in the tool's units and converted to mm.
    pub fn read_attributes(&mut self, attrs: &BTreeMap<String, String>) -> Result<()> {
        if let Some(units) = attrs.get("units") {
            match units.parse() {
                Ok(units) => self.units = units,
                Err(err) => log::warn!("tool {}: {}", self.number, err),
            }
        }

        if let Some(shape) = attrs.get("shape") {
            match shape.parse() {
                Ok(shape) => self.shape = shape,
                Err(err) => log::warn!("tool {}: {}", self.number, err),
            }
        }

        let scale = self.units.to_mm();

        match attrs.get("length") {
            Some(length) => self.length = parse_number("length", length)? * scale,
            None => return Err(ToolError::MissingLength(self.number)),
        }

        if let Some(radius) = attrs.get("radius") {
            self.radius = parse_number("radius", radius)? * scale;
        } else if let Some(diameter) = attrs.get("diameter") {
            self.radius = parse_number("diameter", diameter)? / 2.0 * scale;
        } else {
            return Err(ToolError::MissingRadius(self.number));
        }

        if let Some(snub) = attrs.get("snub_diameter") {
            self.snub_diameter = parse_number("snub_diameter", snub)? * scale;
        }

        self.validate()
    }

    /// Attributes of the `<tool>` element, values in the tool's units.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let scale = 1.0 / self.units.to_mm();

        let mut attrs = vec![
            ("number", self.number.to_string()),
            ("units", self.units.to_string()),
            ("shape", self.shape.to_string()),
            ("length", (self.length * scale).to_string()),
            ("radius", (self.radius * scale).to_string()),
        ];
        if self.shape == ToolShape::Snubnose && self.snub_diameter > 1e-7 {
            attrs.push(("snub_diameter", (self.snub_diameter * scale).to_string()));
        }

        attrs
    }

    /// JSON form, values in the tool's units.
    pub fn to_json(&self, with_number: bool) -> Value {
        let scale = 1.0 / self.units.to_mm();

        let mut dict = Map::new();
        if with_number {
            dict.insert("number".into(), json!(self.number));
        }
        dict.insert("units".into(), json!(self.units.to_string()));
        dict.insert("shape".into(), json!(self.shape.to_string()));
        dict.insert("length".into(), json!(self.length * scale));
        dict.insert("diameter".into(), json!(self.diameter() * scale));
        if self.shape == ToolShape::Snubnose {
            dict.insert("snub_diameter".into(), json!(self.snub_diameter * scale));
        }
        dict.insert("description".into(), json!(self.description));

        Value::Object(dict)
    }

    /// Update from the JSON form. Absent keys keep their current value,
    /// except `description` which defaults to empty.
    pub fn read_json(&mut self, value: &Value) -> Result<()> {
        let dict = value
            .as_object()
            .ok_or_else(|| ToolError::Json(format!("expected object, got {}", value)))?;

        if let Some(number) = dict.get("number") {
            self.number = number
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ToolError::InvalidNumber {
                    field: "number",
                    value: number.to_string(),
                })?;
        }

        if let Some(units) = dict.get("units").and_then(Value::as_str) {
            self.units = units.parse()?;
        }

        let scale = self.units.to_mm();

        if let Some(shape) = dict.get("shape").and_then(Value::as_str) {
            self.shape = shape.parse()?;
        }

        if let Some(length) = dict.get("length").and_then(Value::as_f64) {
            self.length = length * scale;
        }

        if let Some(diameter) = dict.get("diameter").and_then(Value::as_f64) {
            self.set_diameter(diameter * scale);
        }

        if let Some(snub) = dict.get("snub_diameter").and_then(Value::as_f64) {
            self.snub_diameter = snub * scale;
        }

        self.description = dict
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(())
    }
}

impl Default for Tool {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{} R{} L{}{}", self.number, self.radius, self.length, self.offsets)
    }
}

fn parse_number(field: &'static str, text: &str) -> Result<f64> {
    text.trim().parse().map_err(|_| ToolError::InvalidNumber {
        field,
        value: text.to_string(),
    })
}

/// Format like C's `%g`: up to six decimals, no trailing zeros.
fn format_g(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
