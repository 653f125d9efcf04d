//! Collaborators the layout consumes: styles, fonts and images.
//!
//! Each lookup returns a value that is always usable plus any advisories raised
//! while resolving it. A missing style, font or image never fails a layout.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Advisory;
use crate::layout::font_metrics::{Font, FontFamily};
use crate::models::style::{FontStyle, Style, StyleSheet};

/// Natural size of the stand-in for a missing image.
const PLACEHOLDER_SIZE: f32 = 48.0;

const FALLBACK_FAMILY: &str = "helvetica";

/// A looked-up value and the advisories raised on the way.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub advisories: Vec<Advisory>,
}

impl<T> Resolved<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            advisories: Vec::new(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Styles
// ────────────────────────────────────────────────────────────────────────────

pub trait StyleProvider {
    /// Fully resolved style `name`, or the built-in `default_name` style when
    /// `name` is absent or unknown.
    fn style(&self, name: Option<&str>, default_name: &str) -> Resolved<Style>;
}

impl StyleProvider for StyleSheet {
    fn style(&self, name: Option<&str>, default_name: &str) -> Resolved<Style> {
        let base = || {
            self.resolve(default_name, Style::builtin(default_name))
                .unwrap_or_else(|| (Style::builtin(default_name), Vec::new()))
        };
        let Some(name) = name else {
            let (value, advisories) = base();
            return Resolved { value, advisories };
        };

        let (base_style, mut advisories) = base();
        match self.resolve(name, base_style.clone()) {
            Some((value, more)) => {
                advisories.extend(more);
                Resolved { value, advisories }
            }
            None => {
                advisories.push(Advisory::UnknownStyle {
                    name: name.to_string(),
                    fallback: default_name.to_string(),
                });
                Resolved {
                    value: base_style,
                    advisories,
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fonts
// ────────────────────────────────────────────────────────────────────────────

pub trait FontProvider {
    fn get_font(&self, style: &FontStyle) -> Resolved<Font>;
}

/// The standard families with built-in metric tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFonts;

impl FontProvider for StandardFonts {
    fn get_font(&self, style: &FontStyle) -> Resolved<Font> {
        match FontFamily::from_name(&style.family) {
            Some(family) => Resolved::clean(Font::new(family, style.face, style.size)),
            None => Resolved {
                value: Font::new(FontFamily::Helvetica, style.face, style.size),
                advisories: vec![Advisory::UnknownFont {
                    family: style.family.clone(),
                    fallback: FALLBACK_FAMILY.to_string(),
                }],
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Images
// ────────────────────────────────────────────────────────────────────────────

/// An image's natural size in points and its encoded data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetail {
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing)]
    pub pixel_data: Vec<u8>,
}

impl ImageDetail {
    pub fn placeholder() -> Self {
        Self {
            width: PLACEHOLDER_SIZE,
            height: PLACEHOLDER_SIZE,
            pixel_data: Vec::new(),
        }
    }
}

pub trait ImageProvider {
    fn get_image(&self, reference: &str) -> Resolved<Arc<ImageDetail>>;
}

/// Images declared by the document, keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct ImageLibrary {
    images: HashMap<String, Arc<ImageDetail>>,
}

impl ImageLibrary {
    pub fn new(images: HashMap<String, ImageDetail>) -> Self {
        Self {
            images: images.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
        }
    }
}

impl ImageProvider for ImageLibrary {
    fn get_image(&self, reference: &str) -> Resolved<Arc<ImageDetail>> {
        match self.images.get(reference) {
            Some(image) => Resolved::clean(Arc::clone(image)),
            None => Resolved {
                value: Arc::new(ImageDetail::placeholder()),
                advisories: vec![Advisory::MissingImage {
                    reference: reference.to_string(),
                }],
            },
        }
    }
}
