//! Drawing: walks a placed page and emits primitives in page coordinates.
//!
//! The layout tree stores locations relative to each parent; `draw_page`
//! accumulates them so a sink only ever sees absolute positions. The bundled
//! `DisplayList` sink records commands for serialization; a PDF or raster
//! backend would implement `DrawingSink` the same way.

use serde::Serialize;

use crate::layout::font_metrics::{Font, FontSpec};
use crate::layout::geometry::{Extent, Point, Rect};
use crate::layout::placed::{PlacedContent, PlacedKind, SegmentKind};

pub trait DrawingSink {
    fn rect(&mut self, bounds: Rect, fill: Option<&str>, border_width: f32, border_color: Option<&str>);

    /// `baseline` is the left end of the text's baseline.
    fn text(&mut self, baseline: Point, text: &str, font: &FontSpec, color: &str);

    fn checkbox(&mut self, bounds: Rect, checked: bool);

    fn text_field(&mut self, bounds: Rect);

    fn image(&mut self, bounds: Rect, reference: &str);

    fn begin_clip(&mut self, _bounds: Rect) {}

    fn end_clip(&mut self) {}
}

/// Draws `page` with its own origin at the page origin.
pub fn draw_page(page: &PlacedContent, sink: &mut dyn DrawingSink) {
    draw(page, Point::ZERO, sink);
}

fn draw(content: &PlacedContent, origin: Point, sink: &mut dyn DrawingSink) {
    let at = origin + content.location;
    let bounds = Rect::from_origin(at, content.extent);
    match &content.kind {
        PlacedKind::Group(group) => {
            let clip = group.clip_item.and_then(|i| group.items.get(i));
            if let Some(frame) = clip {
                draw(frame, at, sink);
                sink.begin_clip(frame.bounds().translate(at));
            }
            for (i, item) in group.items.iter().enumerate() {
                if group.clip_item != Some(i) {
                    draw(item, at, sink);
                }
            }
            if clip.is_some() {
                sink.end_clip();
            }
        }
        PlacedKind::Rect(rect) => {
            sink.rect(bounds, rect.fill.as_deref(), rect.border_width, rect.border_color.as_deref());
        }
        PlacedKind::Image(image) => sink.image(bounds, &image.reference),
        PlacedKind::Run(run) => {
            for segment in &run.segments {
                let font = Font::from_spec(segment.font);
                let top_left = at + segment.offset;
                let baseline = Point::new(top_left.x, top_left.y + font.ascent());
                match &segment.kind {
                    SegmentKind::Text { text } => sink.text(baseline, text, &segment.font, &run.color),
                    SegmentKind::Checkbox { checked } => {
                        let side = segment.width.min(font.ascent());
                        let corner = Point::new(top_left.x, baseline.y - side);
                        sink.checkbox(Rect::from_origin(corner, Extent::new(side, side)), *checked);
                    }
                    SegmentKind::TextField => {
                        sink.text_field(Rect::from_origin(
                            top_left,
                            Extent::new(segment.width, font.line_spacing()),
                        ));
                    }
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Display list
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Rect {
        bounds: Rect,
        fill: Option<String>,
        border_width: f32,
        border_color: Option<String>,
    },
    Text {
        baseline: Point,
        text: String,
        font: FontSpec,
        color: String,
    },
    Checkbox {
        bounds: Rect,
        checked: bool,
    },
    TextField {
        bounds: Rect,
    },
    Image {
        bounds: Rect,
        reference: String,
    },
    BeginClip {
        bounds: Rect,
    },
    EndClip,
}

/// A sink that records every primitive in drawing order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn for_page(page: &PlacedContent) -> Self {
        let mut list = DisplayList::default();
        draw_page(page, &mut list);
        list
    }
}

impl DrawingSink for DisplayList {
    fn rect(&mut self, bounds: Rect, fill: Option<&str>, border_width: f32, border_color: Option<&str>) {
        self.commands.push(DrawCommand::Rect {
            bounds,
            fill: fill.map(str::to_string),
            border_width,
            border_color: border_color.map(str::to_string),
        });
    }

    fn text(&mut self, baseline: Point, text: &str, font: &FontSpec, color: &str) {
        self.commands.push(DrawCommand::Text {
            baseline,
            text: text.to_string(),
            font: *font,
            color: color.to_string(),
        });
    }

    fn checkbox(&mut self, bounds: Rect, checked: bool) {
        self.commands.push(DrawCommand::Checkbox { bounds, checked });
    }

    fn text_field(&mut self, bounds: Rect) {
        self.commands.push(DrawCommand::TextField { bounds });
    }

    fn image(&mut self, bounds: Rect, reference: &str) {
        self.commands.push(DrawCommand::Image {
            bounds,
            reference: reference.to_string(),
        });
    }

    fn begin_clip(&mut self, bounds: Rect) {
        self.commands.push(DrawCommand::BeginClip { bounds });
    }

    fn end_clip(&mut self) {
        self.commands.push(DrawCommand::EndClip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::{FontFace, FontFamily};
    use crate::layout::placed::{PlacedGroupContent, PlacedRunContent, RunSegment};
    use crate::layout::quality::PlacementQuality;

    fn make_run(text: &str) -> PlacedContent {
        PlacedContent {
            represents: None,
            extent: Extent::new(50.0, 12.0),
            location: Point::ZERO,
            quality: PlacementQuality::for_decoration(),
            kind: PlacedKind::Run(PlacedRunContent {
                segments: vec![
                    RunSegment {
                        kind: SegmentKind::Text { text: text.to_string() },
                        offset: Point::new(4.0, 0.0),
                        width: 20.0,
                        font: Font::new(FontFamily::Helvetica, FontFace::Regular, 10.0).spec(),
                    },
                    RunSegment {
                        kind: SegmentKind::Checkbox { checked: true },
                        offset: Point::new(30.0, 0.0),
                        width: 8.0,
                        font: Font::new(FontFamily::Helvetica, FontFace::Regular, 10.0).spec(),
                    },
                ],
                color: "#000000".into(),
            }),
        }
    }

    fn make_page() -> PlacedContent {
        let frame = PlacedContent::rect(Extent::new(100.0, 40.0), Some("#eeeeee".into()), 1.0, None);
        let block = PlacedGroupContent::from_items(
            vec![frame, make_run("hi").at(Point::new(5.0, 6.0))],
            PlacementQuality::for_decoration(),
            Some(Extent::new(100.0, 40.0)),
        )
        .with_clip_item(0)
        .at(Point::new(20.0, 30.0));
        PlacedGroupContent::from_items(vec![block], PlacementQuality::for_decoration(), Some(Extent::new(200.0, 200.0)))
            .at(Point::new(0.0, 0.0))
    }

    // ── coordinates ─────────────────────────────────────────────────────────

    #[test]
    fn test_coordinates_are_absolute() {
        let list = DisplayList::for_page(&make_page());
        let ascent = Font::new(FontFamily::Helvetica, FontFace::Regular, 10.0).ascent();
        let text = list
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Text { baseline, text, .. } => Some((*baseline, text.clone())),
                _ => None,
            })
            .expect("a text command");
        assert_eq!(text.1, "hi");
        // 20 + 5 + 4 across, 30 + 6 down to the line top
        assert_eq!(text.0.x, 29.0);
        assert!((text.0.y - (36.0 + ascent)).abs() < 1e-4);
    }

    #[test]
    fn test_checkbox_sits_on_the_baseline() {
        let list = DisplayList::for_page(&make_page());
        let ascent = Font::new(FontFamily::Helvetica, FontFace::Regular, 10.0).ascent();
        let bounds = list
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Checkbox { bounds, checked: true } => Some(*bounds),
                _ => None,
            })
            .expect("a checkbox command");
        assert!((bounds.bottom - (36.0 + ascent)).abs() < 1e-4);
        assert_eq!(bounds.left, 55.0);
    }

    // ── clipping ────────────────────────────────────────────────────────────

    #[test]
    fn test_clip_frame_is_drawn_first_and_wraps_the_rest() {
        let list = DisplayList::for_page(&make_page());
        assert!(matches!(&list.commands[0], DrawCommand::Rect { bounds, .. } if bounds.left == 20.0 && bounds.top == 30.0));
        assert!(matches!(&list.commands[1], DrawCommand::BeginClip { bounds } if bounds.right == 120.0));
        assert_eq!(list.commands.last(), Some(&DrawCommand::EndClip));
    }

    #[test]
    fn test_display_list_serializes_as_tagged_commands() {
        let json = serde_json::to_value(DisplayList::for_page(&make_page())).unwrap();
        assert_eq!(json[0]["op"], "rect");
        assert_eq!(json[1]["op"], "begin_clip");
    }
}
