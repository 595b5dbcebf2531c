//! Colors and line styles carried in node and edge payloads.

use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload key for a node's fill color.
pub const PROPERTY_FILL: &str = "fill";
/// Payload key for a node's outline color.
pub const PROPERTY_OUTLINE: &str = "outline";
/// Payload key for a node's text color.
pub const PROPERTY_TEXT_COLOR: &str = "textColor";
/// Payload key for a node's text.
pub const PROPERTY_TEXT: &str = "text";
/// Payload key for an edge's label.
pub const PROPERTY_LABEL: &str = "label";
/// Payload key for an edge's color.
pub const PROPERTY_COLOR: &str = "color";
/// Payload key for an edge's line style.
pub const PROPERTY_LINE_STYLE: &str = "lineStyle";

/// Default node fill.
pub const DEFAULT_FILL: SerializableColor = SerializableColor::new(255, 255, 255, 255);
/// Default node outline and edge stroke.
pub const DEFAULT_STROKE: SerializableColor = SerializableColor::new(0x00, 0x80, 0x80, 255);
/// Default node text color.
pub const DEFAULT_TEXT_COLOR: SerializableColor = SerializableColor::new(0, 0, 0, 255);

/// Serializable color representation (RGBA8).
///
/// Serialized as a CSS hex string (`#rrggbb`, or `#rrggbbaa` when not opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a CSS-style color: `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Some(Self::transparent());
        }
        let hex = s.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let byte = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Self::new(r * 17, g * 17, b * 17, 255))
            }
            6 => Some(Self::new(byte(0..2)?, byte(2..4)?, byte(4..6)?, 255)),
            8 => Some(Self::new(byte(0..2)?, byte(2..4)?, byte(4..6)?, byte(6..8)?)),
            _ => None,
        }
    }

    /// Format as a lowercase CSS hex string.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for SerializableColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SerializableColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SerializableColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color: {s}")))
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style attributes of a node, read from its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    pub fill: SerializableColor,
    pub outline: SerializableColor,
    pub text_color: SerializableColor,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fill: DEFAULT_FILL,
            outline: DEFAULT_STROKE,
            text_color: DEFAULT_TEXT_COLOR,
        }
    }
}

impl NodeStyle {
    /// Get the fill as a peniko Color.
    pub fn fill(&self) -> Color {
        self.fill.into()
    }

    /// Get the outline as a peniko Color.
    pub fn outline(&self) -> Color {
        self.outline.into()
    }
}

/// How an edge line is decorated. Stored under `lineStyle` in the edge payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineStyle {
    /// No arrowheads.
    Plain,
    /// Arrowhead at the source end.
    SourceArrow,
    /// Arrowhead at the target end.
    #[default]
    TargetArrow,
    /// Arrowheads at both ends.
    BothArrows,
    /// Dashed line without arrowheads.
    Dashed,
}

impl LineStyle {
    /// All line styles in display order.
    pub const ALL: [LineStyle; 5] = [
        LineStyle::Plain,
        LineStyle::SourceArrow,
        LineStyle::TargetArrow,
        LineStyle::BothArrows,
        LineStyle::Dashed,
    ];

    /// The payload string for this style.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStyle::Plain => "plain",
            LineStyle::SourceArrow => "sourceArrow",
            LineStyle::TargetArrow => "targetArrow",
            LineStyle::BothArrows => "bothArrows",
            LineStyle::Dashed => "dashed",
        }
    }

    /// Parse a payload string.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.as_str() == s)
    }

    pub fn has_source_arrow(&self) -> bool {
        matches!(self, LineStyle::SourceArrow | LineStyle::BothArrows)
    }

    pub fn has_target_arrow(&self) -> bool {
        matches!(self, LineStyle::TargetArrow | LineStyle::BothArrows)
    }

    /// Cycle to the next line style.
    pub fn next(self) -> Self {
        match self {
            LineStyle::Plain => LineStyle::SourceArrow,
            LineStyle::SourceArrow => LineStyle::TargetArrow,
            LineStyle::TargetArrow => LineStyle::BothArrows,
            LineStyle::BothArrows => LineStyle::Dashed,
            LineStyle::Dashed => LineStyle::Plain,
        }
    }
}
