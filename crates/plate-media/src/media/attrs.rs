use plate_core::{AttrPatch, Attrs, Node};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

/// Quarter-turn rotation. Serialized as plain degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// The next clockwise quarter turn; four steps return to the start.
    pub fn next(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Rotation::from_degrees(value).ok_or_else(|| format!("unsupported rotation: {value}"))
    }
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

/// Persisted attributes of an image or video node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttrs {
    pub src: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, rename = "textAlign")]
    pub alignment: Alignment,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl MediaAttrs {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            width: None,
            height: None,
            alignment: Alignment::default(),
            rotation: Rotation::default(),
            alt: None,
        }
    }

    pub fn width(mut self, width: Option<u32>) -> Self {
        self.width = width;
        self
    }

    pub fn alt(mut self, alt: Option<String>) -> Self {
        self.alt = alt;
        self
    }

    /// Reads attributes tolerantly: malformed values fall back to their
    /// defaults instead of failing, so a hand-edited document still renders.
    pub fn from_attrs(attrs: &Attrs) -> Self {
        let src = attrs
            .get("src")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let dimension = |key: &str| {
            attrs
                .get(key)
                .and_then(Value::as_u64)
                .filter(|&n| n > 0)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        };
        let alignment = attrs
            .get("textAlign")
            .and_then(Value::as_str)
            .and_then(Alignment::parse)
            .unwrap_or_default();
        let rotation = attrs
            .get("rotation")
            .and_then(Value::as_u64)
            .and_then(|d| u16::try_from(d).ok())
            .and_then(Rotation::from_degrees)
            .unwrap_or_default();
        let alt = attrs
            .get("alt")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            src,
            width: dimension("width"),
            height: dimension("height"),
            alignment,
            rotation,
            alt,
        }
    }

    /// Applies the per-kind invariants: widths below `floor` are raised to
    /// it, and video nodes carry neither rotation nor alt text.
    pub fn normalized(mut self, kind: MediaKind, floor: u32) -> Self {
        self.width = self.width.map(|w| w.max(floor));
        if kind == MediaKind::Video {
            self.rotation = Rotation::Deg0;
            self.alt = None;
        }
        self
    }

    pub fn to_attrs(&self) -> Attrs {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => Attrs::default(),
        }
    }

    /// A patch that turns `current` into exactly these attributes, leaving
    /// keys this type does not own untouched.
    pub fn patch_from(&self, current: &Attrs) -> AttrPatch {
        let mut patch = AttrPatch::default();
        let target = self.to_attrs();
        for (key, value) in &target {
            if current.get(key) != Some(value) {
                patch.set.insert(key.clone(), value.clone());
            }
        }
        if self.alt.is_none() && current.contains_key("alt") {
            patch.remove.push("alt".to_string());
        }
        patch
    }

    pub fn into_node(self, kind: MediaKind) -> Node {
        Node::void(kind.tag(), self.to_attrs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_persistence_shape() {
        let attrs = MediaAttrs::new("https://example.com/a.png").alt(Some("A".into()));
        let value = serde_json::to_value(&attrs).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "src": "https://example.com/a.png",
                "width": null,
                "height": null,
                "textAlign": "center",
                "rotation": 0,
                "alt": "A"
            })
        );
    }

    #[test]
    fn rejects_unknown_rotation_when_strict() {
        let err = serde_json::from_value::<MediaAttrs>(serde_json::json!({
            "src": "x",
            "rotation": 45
        }));
        assert!(err.is_err());
    }

    #[test]
    fn tolerant_read_falls_back_to_defaults() {
        let mut attrs = Attrs::new();
        attrs.insert("src".into(), serde_json::json!(" https://e.com/v "));
        attrs.insert("width".into(), serde_json::json!(-4));
        attrs.insert("textAlign".into(), serde_json::json!("justify"));
        attrs.insert("rotation".into(), serde_json::json!(45));

        let media = MediaAttrs::from_attrs(&attrs);
        assert_eq!(media.src, "https://e.com/v");
        assert_eq!(media.width, None);
        assert_eq!(media.alignment, Alignment::Center);
        assert_eq!(media.rotation, Rotation::Deg0);
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let start = Rotation::Deg90;
        assert_eq!(start.next().next().next().next(), start);
    }

    #[test]
    fn patch_from_only_touches_differences() {
        let current = MediaAttrs::new("a").width(Some(200)).to_attrs();
        let mut next = MediaAttrs::from_attrs(&current);
        next.alignment = Alignment::Right;

        let patch = next.patch_from(&current);
        assert_eq!(patch.set.len(), 1);
        assert_eq!(patch.set.get("textAlign"), Some(&serde_json::json!("right")));
        assert!(patch.remove.is_empty());
    }
}
