//! Run builder — wraps one run's inline elements into lines inside a box.
//!
//! # Wrapping rules
//! - Text takes as much of the current line as fits. When it does not fit, a
//!   split is searched at a whitespace boundary (good break); when none fits on
//!   an empty line the text is cut at the last character that fits (bad break).
//! - Checkboxes, text fields and literals are atomic. An atomic token that does
//!   not fit moves to a new line (good break).
//! - Leading whitespace is dropped at the start of every line and trailing
//!   whitespace is dropped when a line closes.
//! - A text field that ends a line because of a wrap stretches to the line end.
//! - An empty line that cannot take the next token is `ExtentTooSmall`.

use crate::errors::LayoutError;
use crate::layout::font_metrics::Font;
use crate::layout::geometry::{Extent, Point, EPSILON};
use crate::layout::placed::{PlacedContent, PlacedKind, PlacedRunContent, RunSegment, SegmentKind};
use crate::layout::quality::{Breaks, PlacementQuality};
use crate::models::structure::{Element, Run};
use crate::models::style::{Style, TextAlign};

/// Nominal width of a text field without an explicit `chars`.
const DEFAULT_FIELD_CHARS: u32 = 8;

// ────────────────────────────────────────────────────────────────────────────
// Core function
// ────────────────────────────────────────────────────────────────────────────

/// Places `run` into a box of `extent.width`. The height of `extent` is not
/// checked here; the enclosing packer judges vertical overflow.
pub fn place_run(
    run: &Run,
    style: &Style,
    font: &Font,
    extent: Extent,
) -> Result<PlacedContent, LayoutError> {
    let mut builder = RunBuilder::new(font, style.text.align, extent.width, &run.name);

    for element in &run.elements {
        match element {
            Element::Text { text, face } => builder.add_text(text, font.modify(*face))?,
            Element::Literal { text } => {
                let kind = SegmentKind::Text { text: text.clone() };
                builder.add_atomic(kind, font.width(text), *font)?;
            }
            Element::Checkbox { checked } => {
                let width = font.ascent() + font.width(" ");
                builder.add_atomic(SegmentKind::Checkbox { checked: *checked }, width, *font)?;
            }
            Element::TextField { chars } => {
                let chars = chars.unwrap_or(DEFAULT_FIELD_CHARS) as f32;
                builder.add_atomic(SegmentKind::TextField, chars * font.width("n"), *font)?;
            }
        }
    }

    Ok(builder.finish(style.text.color.clone()))
}

// ────────────────────────────────────────────────────────────────────────────
// Line state
// ────────────────────────────────────────────────────────────────────────────

struct RunBuilder<'a> {
    name: &'a str,
    align: TextAlign,
    width: f32,
    line_spacing: f32,
    /// Segments of closed lines.
    segments: Vec<RunSegment>,
    /// Segments of the line being filled.
    current: Vec<RunSegment>,
    x: f32,
    lines: usize,
    widest_line: f32,
    breaks: Breaks,
}

impl<'a> RunBuilder<'a> {
    fn new(font: &Font, align: TextAlign, width: f32, name: &'a str) -> Self {
        Self {
            name,
            align,
            width,
            line_spacing: font.line_spacing(),
            segments: Vec::new(),
            current: Vec::new(),
            x: 0.0,
            lines: 0,
            widest_line: 0.0,
            breaks: Breaks::default(),
        }
    }

    fn line_is_empty(&self) -> bool {
        self.current.is_empty()
    }

    fn remaining(&self) -> f32 {
        self.width - self.x
    }

    fn too_small(&self, what: &str) -> LayoutError {
        LayoutError::extent_too_small(format!(
            "{what} in run '{}' does not fit a line of width {:.2}",
            self.name, self.width
        ))
    }

    fn add_text(&mut self, text: &str, font: Font) -> Result<(), LayoutError> {
        let mut rest = text;
        loop {
            if self.line_is_empty() {
                rest = rest.trim_start();
            }
            if rest.is_empty() {
                return Ok(());
            }

            let space = self.remaining();
            if font.width(rest.trim_end()) <= space + EPSILON {
                self.push(SegmentKind::Text { text: rest.to_string() }, font.width(rest), font);
                return Ok(());
            }

            if let Some(at) = find_split(rest, &font, space) {
                self.push_text(&rest[..at], font);
                self.breaks.good += 1;
                self.close_line(true);
                rest = &rest[at..];
            } else if !self.line_is_empty() {
                self.breaks.good += 1;
                self.close_line(true);
            } else {
                let at = find_hard_split(rest, &font, space)
                    .ok_or_else(|| self.too_small("a single character"))?;
                self.push_text(&rest[..at], font);
                self.breaks.bad += 1;
                self.close_line(true);
                rest = &rest[at..];
            }
        }
    }

    fn add_atomic(&mut self, kind: SegmentKind, width: f32, font: Font) -> Result<(), LayoutError> {
        if width > self.remaining() + EPSILON {
            if self.line_is_empty() {
                return Err(self.too_small("an inline token"));
            }
            self.breaks.good += 1;
            self.close_line(true);
            if width > self.remaining() + EPSILON {
                return Err(self.too_small("an inline token"));
            }
        }
        self.push(kind, width, font);
        Ok(())
    }

    fn push_text(&mut self, text: &str, font: Font) {
        self.push(SegmentKind::Text { text: text.to_string() }, font.width(text), font);
    }

    fn push(&mut self, kind: SegmentKind, width: f32, font: Font) {
        self.current.push(RunSegment {
            kind,
            offset: Point::new(self.x, self.lines as f32 * self.line_spacing),
            width,
            font: font.spec(),
        });
        self.x += width;
    }

    fn close_line(&mut self, wrapped: bool) {
        if let Some(last) = self.current.last_mut() {
            match &mut last.kind {
                SegmentKind::Text { text } => {
                    let trimmed_len = text.trim_end().len();
                    text.truncate(trimmed_len);
                    last.width = Font::from_spec(last.font).width(text);
                    self.x = last.offset.x + last.width;
                }
                SegmentKind::TextField if wrapped => {
                    last.width += (self.width - self.x).max(0.0);
                    self.x = last.offset.x + last.width;
                }
                _ => {}
            }
        }

        let shift = match self.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (self.width - self.x) / 2.0,
            TextAlign::Right => self.width - self.x,
        }
        .max(0.0);
        for mut segment in self.current.drain(..) {
            segment.offset.x += shift;
            self.segments.push(segment);
        }

        self.widest_line = self.widest_line.max(self.x);
        self.lines += 1;
        self.x = 0.0;
    }

    fn finish(mut self, color: String) -> PlacedContent {
        if !self.line_is_empty() || self.lines == 0 {
            self.close_line(false);
        }
        let extent = Extent::new(self.width, self.lines as f32 * self.line_spacing);
        let quality = PlacementQuality::for_wrapping(1, self.width - self.widest_line, self.breaks);
        PlacedContent {
            represents: (!self.name.is_empty()).then(|| self.name.to_string()),
            extent,
            location: Point::ZERO,
            quality,
            kind: PlacedKind::Run(PlacedRunContent {
                segments: self.segments,
                color,
            }),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Split search
// ────────────────────────────────────────────────────────────────────────────

/// Byte index of the best whitespace split of `text` within `space`, if any.
///
/// Starts from a guess proportional to `space / width(text)`, scans backward
/// for the first whitespace whose (trimmed, non-empty) prefix fits, then scans
/// forward past the guess for the last boundary that still fits. The forward
/// scan runs even when nothing before the guess fits, since narrow leading
/// characters put the guess short of the real boundary.
fn find_split(text: &str, font: &Font, space: f32) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let total = font.width(text);
    if chars.len() < 2 || total <= 0.0 || space <= 0.0 {
        return None;
    }

    let fits = |i: usize| {
        let prefix = text[..chars[i].0].trim_end();
        !prefix.is_empty() && font.width(prefix) <= space + EPSILON
    };

    let guess = ((chars.len() as f32 * space / total).floor() as usize).min(chars.len() - 1);
    let mut best = (1..=guess).rev().find(|&i| chars[i].1.is_whitespace() && fits(i));

    for i in guess + 1..chars.len() {
        if !chars[i].1.is_whitespace() {
            continue;
        }
        if !fits(i) {
            break;
        }
        best = Some(i);
    }
    best.map(|i| chars[i].0)
}

/// Byte index after the longest character prefix of `text` that fits `space`.
fn find_hard_split(text: &str, font: &Font, space: f32) -> Option<usize> {
    // Prefix of `c` chars ends at ends[c - 1]; the whole string is excluded.
    let ends: Vec<usize> = text.char_indices().skip(1).map(|(i, _)| i).collect();
    let (mut lo, mut hi) = (0usize, ends.len());
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if font.width(&text[..ends[mid - 1]]) <= space + EPSILON {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    (lo > 0).then(|| ends[lo - 1])
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
