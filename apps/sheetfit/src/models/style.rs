//! Named styles as written in a sheet, and their resolution into concrete values.
//!
//! A `StyleDef` only states what it changes. Resolution walks the `inherit`
//! chain and applies it root-first on top of the built-in defaults for the
//! role being styled (`page`, `section`, `block`, `title`, `cell`), so a
//! resolved `Style` never has a missing attribute.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::Advisory;
use crate::layout::font_metrics::FontFace;
use crate::layout::geometry::Spacing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontStyle {
    pub family: String,
    pub size: f32,
    pub face: FontFace,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStyle {
    pub align: TextAlign,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BoxStyle {
    pub margin: Spacing,
    pub padding: Spacing,
    pub border_width: f32,
    pub border_color: Option<String>,
    pub background: Option<String>,
}

impl BoxStyle {
    /// Padding plus border on every side.
    pub fn inset(&self) -> Spacing {
        self.padding + Spacing::balanced(self.border_width)
    }

    pub fn has_decoration(&self) -> bool {
        self.background.is_some() || self.border_width > 0.0
    }
}

/// A fully resolved style.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Style {
    pub name: String,
    pub font: FontStyle,
    pub text: TextStyle,
    pub box_style: BoxStyle,
}

impl Style {
    /// Built-in defaults for a role. Unknown roles get the plain base style.
    pub fn builtin(name: &str) -> Style {
        let mut style = Style {
            name: name.to_string(),
            font: FontStyle {
                family: "helvetica".to_string(),
                size: 10.0,
                face: FontFace::Regular,
            },
            text: TextStyle {
                align: TextAlign::Left,
                color: "#000000".to_string(),
            },
            box_style: BoxStyle::default(),
        };
        match name {
            "page" => style.box_style.padding = Spacing::balanced(36.0),
            "section" => style.box_style.margin = Spacing::new(0.0, 0.0, 0.0, 8.0),
            "block" => {
                style.box_style.margin = Spacing::balanced(4.0);
                style.box_style.padding = Spacing::balanced(2.0);
            }
            "title" => {
                style.font.face = FontFace::Bold;
                style.font.size = 11.0;
                style.box_style.margin = Spacing::new(0.0, 0.0, 0.0, 2.0);
            }
            "cell" => style.box_style.margin = Spacing::new(2.0, 2.0, 0.0, 0.0),
            _ => {}
        }
        style
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Definitions as written in the sheet
// ────────────────────────────────────────────────────────────────────────────

/// Either one value for all four sides or an explicit per-side spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpacingDef {
    Uniform(f32),
    Sides(Spacing),
}

impl From<SpacingDef> for Spacing {
    fn from(def: SpacingDef) -> Spacing {
        match def {
            SpacingDef::Uniform(v) => Spacing::balanced(v),
            SpacingDef::Sides(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDef {
    pub inherit: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub font_face: Option<FontFace>,
    pub align: Option<TextAlign>,
    pub color: Option<String>,
    pub margin: Option<SpacingDef>,
    pub padding: Option<SpacingDef>,
    pub border_width: Option<f32>,
    pub border_color: Option<String>,
    pub background: Option<String>,
}

impl StyleDef {
    fn apply(&self, name: &str, style: &mut Style, advisories: &mut Vec<Advisory>) {
        if let Some(family) = &self.font_family {
            style.font.family = family.clone();
        }
        match self.font_size {
            Some(size) if size > 0.0 => style.font.size = size,
            Some(_) => advisories.push(Advisory::UndefinedAttribute {
                style: name.to_string(),
                attribute: "font_size".to_string(),
            }),
            None => {}
        }
        if let Some(face) = self.font_face {
            style.font.face = face;
        }
        if let Some(align) = self.align {
            style.text.align = align;
        }
        if let Some(color) = &self.color {
            style.text.color = color.clone();
        }
        if let Some(margin) = self.margin {
            style.box_style.margin = margin.into();
        }
        if let Some(padding) = self.padding {
            style.box_style.padding = padding.into();
        }
        if let Some(width) = self.border_width {
            style.box_style.border_width = width.max(0.0);
        }
        if let Some(color) = &self.border_color {
            style.box_style.border_color = Some(color.clone());
        }
        if let Some(background) = &self.background {
            style.box_style.background = Some(background.clone());
        }
    }
}

/// The sheet's named style map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSheet {
    defs: HashMap<String, StyleDef>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, def: StyleDef) -> Self {
        self.defs.insert(name.into(), def);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Flattens `name` and its ancestors over `base`. `None` if `name` is not defined.
    ///
    /// A missing parent or an inheritance cycle cuts the chain where it occurs
    /// and is reported as an advisory.
    pub fn resolve(&self, name: &str, base: Style) -> Option<(Style, Vec<Advisory>)> {
        let mut advisories = Vec::new();
        let mut chain: Vec<(&str, &StyleDef)> = vec![(name, self.defs.get(name)?)];
        let mut seen: HashSet<&str> = HashSet::from([name]);

        while let Some(parent) = chain.last().and_then(|&(_, def)| def.inherit.as_deref()) {
            if !seen.insert(parent) {
                advisories.push(Advisory::UndefinedAttribute {
                    style: name.to_string(),
                    attribute: format!("inherit cycle at '{parent}'"),
                });
                break;
            }
            match self.defs.get(parent) {
                Some(def) => chain.push((parent, def)),
                None => {
                    advisories.push(Advisory::UnknownStyle {
                        name: parent.to_string(),
                        fallback: base.name.clone(),
                    });
                    break;
                }
            }
        }

        let mut style = base;
        for (def_name, def) in chain.iter().rev() {
            def.apply(def_name, &mut style, &mut advisories);
        }
        style.name = name.to_string();
        Some((style, advisories))
    }
}
