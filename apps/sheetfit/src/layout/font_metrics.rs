//! Static font-metric tables for the standard PDF font families.
//!
//! Widths are the Adobe AFM advance widths in thousandths of an em, so the
//! measurements match what a PDF backend using the base-14 fonts draws.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

/// Leading applied on top of the font size to get the distance between baselines.
const LINE_SPACING_FACTOR: f32 = 1.2;

// ────────────────────────────────────────────────────────────────────────────
// Families and faces
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Maps a style's family name onto a standard family; `None` for unknown names.
    pub fn from_name(name: &str) -> Option<FontFamily> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" | "arial" | "sans" | "sans-serif" => Some(FontFamily::Helvetica),
            "times" | "times new roman" | "times-roman" | "serif" => Some(FontFamily::Times),
            "courier" | "courier new" | "mono" | "monospace" => Some(FontFamily::Courier),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFace {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontFace {
    pub fn is_bold(&self) -> bool {
        matches!(self, FontFace::Bold | FontFace::BoldItalic)
    }

    pub fn is_italic(&self) -> bool {
        matches!(self, FontFace::Italic | FontFace::BoldItalic)
    }

    /// Adds the modifier's weight/slant on top of `self`.
    pub fn combine(self, modifier: FontFace) -> FontFace {
        match (
            self.is_bold() || modifier.is_bold(),
            self.is_italic() || modifier.is_italic(),
        ) {
            (true, true) => FontFace::BoldItalic,
            (true, false) => FontFace::Bold,
            (false, true) => FontFace::Italic,
            (false, false) => FontFace::Regular,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for one family and weight.
///
/// `widths[i]` = advance of ASCII character `(i + 32)` in 1/1000 em.
///
/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    widths: [u16; 95],
    /// Fallback width for non-ASCII characters.
    pub average_char_width: u16,
    pub ascent: u16,
    pub descent: u16,
}

impl FontMetricTable {
    /// Measures a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        let thousandths: u32 = s
            .chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32] as u32
                } else if c.is_whitespace() {
                    self.widths[0] as u32
                } else {
                    self.average_char_width as u32
                }
            })
            .sum();
        thousandths as f32 / 1000.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0    1    2    3    4    5    6    7    8    9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        278, 278, 584, 584, 584, 556, 1015,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        278, 278, 278, 469, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
        // {    |    }    ~
        334, 260, 334, 584,
    ],
    average_char_width: 513,
    ascent: 718,
    descent: 207,
};

static HELVETICA_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0    1    2    3    4    5    6    7    8    9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        333, 333, 584, 584, 584, 611, 975,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        333, 278, 333, 584, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
        // {    |    }    ~
        389, 280, 389, 584,
    ],
    average_char_width: 553,
    ascent: 718,
    descent: 207,
};

static TIMES_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
        // 0    1    2    3    4    5    6    7    8    9
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
        // :    ;    <    =    >    ?    @
        278, 278, 564, 564, 564, 444, 921,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
        // [    \    ]    ^    _    `
        333, 278, 333, 469, 500, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
        // {    |    }    ~
        480, 200, 480, 541,
    ],
    average_char_width: 463,
    ascent: 683,
    descent: 217,
};

static TIMES_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
        // 0    1    2    3    4    5    6    7    8    9
        500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
        // :    ;    <    =    >    ?    @
        333, 333, 570, 570, 570, 500, 930,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
        // [    \    ]    ^    _    `
        333, 278, 333, 581, 500, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
        // {    |    }    ~
        394, 220, 394, 520,
    ],
    average_char_width: 489,
    ascent: 676,
    descent: 205,
};

static COURIER_TABLE: FontMetricTable = FontMetricTable {
    widths: [600; 95],
    average_char_width: 600,
    ascent: 629,
    descent: 157,
};

/// Returns the static metric table for a family and face.
///
/// Oblique and italic faces use the upright widths of the same weight; for
/// Helvetica and Courier they are identical, for Times they differ by a few percent.
pub fn get_metrics(family: FontFamily, face: FontFace) -> &'static FontMetricTable {
    match (family, face.is_bold()) {
        (FontFamily::Helvetica, false) => &HELVETICA_TABLE,
        (FontFamily::Helvetica, true) => &HELVETICA_BOLD_TABLE,
        (FontFamily::Times, false) => &TIMES_TABLE,
        (FontFamily::Times, true) => &TIMES_BOLD_TABLE,
        (FontFamily::Courier, _) => &COURIER_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sized font
// ────────────────────────────────────────────────────────────────────────────

/// Serializable identity of a sized font, carried by placed text segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: FontFamily,
    pub face: FontFace,
    pub size: f32,
}

/// A family, face and size bound to its metric table.
#[derive(Clone, Copy)]
pub struct Font {
    spec: FontSpec,
    metrics: &'static FontMetricTable,
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Font").field(&self.spec).finish()
    }
}

impl Font {
    pub fn new(family: FontFamily, face: FontFace, size: f32) -> Self {
        Self::from_spec(FontSpec { family, face, size })
    }

    pub fn from_spec(spec: FontSpec) -> Self {
        Self {
            spec,
            metrics: get_metrics(spec.family, spec.face),
        }
    }

    pub fn spec(&self) -> FontSpec {
        self.spec
    }

    pub fn size(&self) -> f32 {
        self.spec.size
    }

    /// Rendered width of `text` in points.
    pub fn width(&self, text: &str) -> f32 {
        self.metrics.measure_str(text) * self.spec.size
    }

    pub fn ascent(&self) -> f32 {
        self.metrics.ascent as f32 / 1000.0 * self.spec.size
    }

    pub fn descent(&self) -> f32 {
        self.metrics.descent as f32 / 1000.0 * self.spec.size
    }

    /// Baseline-to-baseline distance.
    pub fn line_spacing(&self) -> f32 {
        self.spec.size * LINE_SPACING_FACTOR
    }

    /// Same family and size with `face` applied on top of the current face.
    pub fn modify(&self, face: FontFace) -> Font {
        Font::new(self.spec.family, self.spec.face.combine(face), self.spec.size)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_helvetica(size: f32) -> Font {
        Font::new(FontFamily::Helvetica, FontFace::Regular, size)
    }

    #[test]
    fn test_measure_str_empty_returns_zero() {
        let metrics = get_metrics(FontFamily::Helvetica, FontFace::Regular);
        assert_eq!(metrics.measure_str(""), 0.0);
    }

    #[test]
    fn test_measure_str_ascii_characters() {
        let metrics = get_metrics(FontFamily::Helvetica, FontFace::Regular);
        // "hello" = 556 + 556 + 222 + 222 + 556
        let width = metrics.measure_str("hello");
        assert!((width - 2.112).abs() < 1e-4, "hello should be 2.112em, got {width}");
    }

    #[test]
    fn test_measure_str_non_ascii_falls_back() {
        let metrics = get_metrics(FontFamily::Helvetica, FontFace::Regular);
        let width = metrics.measure_str("é");
        assert!((width - 0.513).abs() < 1e-4, "non-ASCII should use average width");
    }

    #[test]
    fn test_width_scales_with_size() {
        let w10 = make_helvetica(10.0).width("brave new");
        let w20 = make_helvetica(20.0).width("brave new");
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
    }

    #[test]
    fn test_courier_is_monospaced() {
        let font = Font::new(FontFamily::Courier, FontFace::Regular, 10.0);
        assert_eq!(font.width("iiii"), font.width("MMMM"));
        assert!((font.width("ab") - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_bold_is_wider_than_regular() {
        let regular = make_helvetica(12.0);
        let bold = regular.modify(FontFace::Bold);
        assert_eq!(bold.spec().face, FontFace::Bold);
        assert!(bold.width("Quality") > regular.width("Quality"));
    }

    #[test]
    fn test_modify_combines_faces() {
        let italic = make_helvetica(12.0).modify(FontFace::Italic);
        assert_eq!(italic.modify(FontFace::Bold).spec().face, FontFace::BoldItalic);
    }

    #[test]
    fn test_vertical_metrics() {
        let font = make_helvetica(10.0);
        assert!((font.ascent() - 7.18).abs() < 1e-4);
        assert!((font.descent() - 2.07).abs() < 1e-4);
        assert!((font.line_spacing() - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_family_names_resolve() {
        assert_eq!(FontFamily::from_name("Arial"), Some(FontFamily::Helvetica));
        assert_eq!(FontFamily::from_name("serif"), Some(FontFamily::Times));
        assert_eq!(FontFamily::from_name(" monospace "), Some(FontFamily::Courier));
        assert_eq!(FontFamily::from_name("Comic Sans"), None);
    }
}
