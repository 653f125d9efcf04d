//! The document tree the layout engine consumes: sheet → section → block → item → run.
//!
//! The tree is deserialized from JSON, normalized once with [`Sheet::tidy`] and
//! only borrowed afterwards. Runs and items accept short forms in JSON: a run
//! may be a plain string or a list of elements, an item a plain string or a
//! list of runs.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::FontFace;
use crate::models::style::StyleSheet;

// ────────────────────────────────────────────────────────────────────────────
// Inline elements and runs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Element {
    /// Wrappable text, optionally bold and/or italic.
    Text {
        text: String,
        #[serde(default)]
        face: FontFace,
    },
    Checkbox {
        #[serde(default)]
        checked: bool,
    },
    /// A fill-in field; `chars` is its nominal width in characters.
    TextField {
        #[serde(default)]
        chars: Option<u32>,
    },
    /// Text that is never split across lines.
    Literal { text: String },
}

impl Element {
    pub fn text(text: impl Into<String>) -> Self {
        Element::Text {
            text: text.into(),
            face: FontFace::Regular,
        }
    }

    pub fn styled(text: impl Into<String>, face: FontFace) -> Self {
        Element::Text {
            text: text.into(),
            face,
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Element::Text { text, .. } | Element::Literal { text } => text.trim().is_empty(),
            Element::Checkbox { .. } | Element::TextField { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RunDef")]
pub struct Run {
    pub elements: Vec<Element>,
    /// Debug path assigned by `tidy`, e.g. `s1.b2.i3.r1`.
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RunDef {
    Plain(String),
    Elements(Vec<Element>),
    Full { elements: Vec<Element> },
}

impl From<RunDef> for Run {
    fn from(def: RunDef) -> Self {
        let elements = match def {
            RunDef::Plain(text) => vec![Element::text(text)],
            RunDef::Elements(elements) | RunDef::Full { elements } => elements,
        };
        Run::new(elements)
    }
}

impl Run {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            name: String::new(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![Element::text(text)])
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn tidy(&mut self, name: String) {
        while self.elements.last().is_some_and(Element::is_blank) {
            self.elements.pop();
        }
        self.name = name;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Items and blocks
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemOptions {
    #[serde(default)]
    pub style: Option<String>,
}

/// One table row; every run becomes one cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemDef")]
pub struct Item {
    pub runs: Vec<Run>,
    pub options: ItemOptions,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemDef {
    Plain(String),
    Runs(Vec<Run>),
    Full {
        runs: Vec<Run>,
        #[serde(default)]
        options: ItemOptions,
    },
}

impl From<ItemDef> for Item {
    fn from(def: ItemDef) -> Self {
        match def {
            ItemDef::Plain(text) => Item::new(vec![Run::plain(text)]),
            ItemDef::Runs(runs) => Item::new(runs),
            ItemDef::Full { runs, options } => Item {
                runs,
                options,
                name: String::new(),
            },
        }
    }
}

impl Item {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            options: ItemOptions::default(),
            name: String::new(),
        }
    }

    /// One cell per string.
    pub fn cells(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Run::plain(*t)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn tidy(&mut self, name: String) {
        for (i, run) in self.runs.iter_mut().enumerate() {
            run.tidy(format!("{name}.r{}", i + 1));
        }
        while self.runs.last().is_some_and(Run::is_empty) {
            self.runs.pop();
        }
        self.name = name;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMethod {
    /// Items are rows, their runs are cells.
    #[default]
    Table,
    /// The block shows the image named by `BlockOptions::image`.
    Image,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockOptions {
    pub style: Option<String>,
    pub title_style: Option<String>,
    pub method: DisplayMethod,
    /// Column count hint for table blocks.
    pub columns: Option<usize>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub title: Option<Item>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub options: BlockOptions,
    #[serde(skip_deserializing)]
    pub name: String,
}

impl Block {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(Item::new(vec![Run::plain(title)]));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.title.is_none() && self.options.method == DisplayMethod::Table
    }

    fn tidy(&mut self, name: String) {
        if let Some(title) = self.title.as_mut() {
            title.tidy(format!("{name}.title"));
        }
        if self.title.as_ref().is_some_and(Item::is_empty) {
            self.title = None;
        }
        for (i, item) in self.items.iter_mut().enumerate() {
            item.tidy(format!("{name}.i{}", i + 1));
        }
        while self.items.last().is_some_and(Item::is_empty) {
            self.items.pop();
        }
        self.name = name;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sections and the sheet
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionOptions {
    pub style: Option<String>,
    /// Fixed column count; `None` lets the engine choose.
    pub columns: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub options: SectionOptions,
    #[serde(skip_deserializing)]
    pub name: String,
}

impl Section {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn tidy(&mut self, name: String) {
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.tidy(format!("{name}.b{}", i + 1));
        }
        while self.blocks.last().is_some_and(Block::is_empty) {
            self.blocks.pop();
        }
        self.name = name;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetOptions {
    pub style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub styles: StyleSheet,
    #[serde(default)]
    pub options: SheetOptions,
    #[serde(skip)]
    tidied: bool,
}

impl Sheet {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections,
            ..Default::default()
        }
    }

    pub fn with_styles(mut self, styles: StyleSheet) -> Self {
        self.styles = styles;
        self
    }

    /// Strips trailing empty nodes at every level and assigns debug path names.
    pub fn tidy(&mut self) {
        for (i, section) in self.sections.iter_mut().enumerate() {
            section.tidy(format!("s{}", i + 1));
        }
        while self.sections.last().is_some_and(Section::is_empty) {
            self.sections.pop();
        }
        self.tidied = true;
    }

    pub fn is_tidy(&self) -> bool {
        self.tidied
    }
}
