//! The placement tree handed to the drawing sink.
//!
//! Every node's `location` is relative to its parent; `bounds()` is the node's
//! rectangle in the parent's coordinate space. Qualities are computed by the
//! code that builds a node, never aggregated automatically here.

use serde::Serialize;

use crate::layout::font_metrics::FontSpec;
use crate::layout::geometry::{Extent, Point, Rect, EPSILON};
use crate::layout::quality::PlacementQuality;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedContent {
    /// Debug path of the structure node this content was built from.
    pub represents: Option<String>,
    pub extent: Extent,
    pub location: Point,
    pub quality: PlacementQuality,
    pub kind: PlacedKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlacedKind {
    Group(PlacedGroupContent),
    Run(PlacedRunContent),
    Rect(PlacedRectContent),
    Image(PlacedImageContent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedGroupContent {
    pub items: Vec<PlacedContent>,
    /// Index of the child whose bounds define the visible frame.
    pub clip_item: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "segment", rename_all = "snake_case")]
pub enum SegmentKind {
    Text { text: String },
    Checkbox { checked: bool },
    TextField,
}

/// One measured piece of a wrapped run, positioned relative to the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSegment {
    pub kind: SegmentKind,
    /// Top-left of the segment's line box.
    pub offset: Point,
    pub width: f32,
    pub font: FontSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedRunContent {
    pub segments: Vec<RunSegment>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedRectContent {
    pub fill: Option<String>,
    pub border_width: f32,
    pub border_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedImageContent {
    pub reference: String,
    pub natural: Extent,
}

// ────────────────────────────────────────────────────────────────────────────
// Construction
// ────────────────────────────────────────────────────────────────────────────

impl PlacedGroupContent {
    /// Wraps already-placed children in a group at the origin.
    ///
    /// With `extent = None` the group is sized to the union of its children,
    /// which must not extend above or left of the group's origin.
    pub fn from_items(
        items: Vec<PlacedContent>,
        quality: PlacementQuality,
        extent: Option<Extent>,
    ) -> PlacedContent {
        let extent = extent.unwrap_or_else(|| {
            let Some(union) = items
                .iter()
                .map(PlacedContent::bounds)
                .reduce(|a, b| a.union(&b))
            else {
                return Extent::ZERO;
            };
            debug_assert!(
                union.left >= -EPSILON && union.top >= -EPSILON,
                "group children extend past the origin: {union:?}"
            );
            Extent::new(union.right.max(0.0), union.bottom.max(0.0))
        });
        PlacedContent {
            represents: None,
            extent,
            location: Point::ZERO,
            quality,
            kind: PlacedKind::Group(PlacedGroupContent {
                items,
                clip_item: None,
            }),
        }
    }
}

impl PlacedContent {
    /// A decoration rectangle filling `extent` at the origin.
    pub fn rect(extent: Extent, fill: Option<String>, border_width: f32, border_color: Option<String>) -> Self {
        PlacedContent {
            represents: None,
            extent,
            location: Point::ZERO,
            quality: PlacementQuality::for_decoration(),
            kind: PlacedKind::Rect(PlacedRectContent {
                fill,
                border_width,
                border_color,
            }),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin(self.location, self.extent)
    }

    pub fn at(mut self, location: Point) -> Self {
        self.location = location;
        self
    }

    pub fn represents(mut self, name: impl Into<String>) -> Self {
        self.represents = Some(name.into());
        self
    }

    pub fn with_clip_item(mut self, index: usize) -> Self {
        if let PlacedKind::Group(group) = &mut self.kind {
            debug_assert!(index < group.items.len());
            group.clip_item = Some(index);
        }
        self
    }

    pub fn children(&self) -> &[PlacedContent] {
        match &self.kind {
            PlacedKind::Group(group) => &group.items,
            _ => &[],
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
