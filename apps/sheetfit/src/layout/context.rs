//! Per-document layout context: providers, options, caches and advisories.
//!
//! One context is created for each document and dropped with it, so nothing
//! cached here can leak into another document's layout. Caches hold either a
//! placement or `None` for a placement that was too small, so a candidate that
//! failed once fails again without being recomputed.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tracing::warn;

use crate::errors::{Advisory, LayoutError};
use crate::layout::font_metrics::Font;
use crate::layout::geometry::{quantize, Extent};
use crate::layout::options::LayoutOptions;
use crate::layout::placed::PlacedContent;
use crate::layout::providers::{FontProvider, ImageDetail, ImageProvider, Resolved, StyleProvider};
use crate::layout::run_builder::place_run;
use crate::models::structure::Run;
use crate::models::style::{FontStyle, Style};

/// `(run name, quantized width, style name)`
type RunKey = (String, i64, String);
/// `(block name, quantized width)`
type BlockKey = (String, i64);
/// `(section name, first block, end block, quantized width, quantized height)`
type SectionKey = (String, usize, usize, i64, i64);

type PlacementCache<K> = RefCell<HashMap<K, Option<PlacedContent>>>;

pub struct LayoutContext<'a> {
    options: &'a LayoutOptions,
    styles: &'a dyn StyleProvider,
    fonts: &'a dyn FontProvider,
    images: &'a dyn ImageProvider,
    run_cache: RefCell<LruCache<RunKey, Option<PlacedContent>>>,
    block_cache: PlacementCache<BlockKey>,
    section_cache: PlacementCache<SectionKey>,
    advisories: RefCell<Vec<Advisory>>,
    seen: RefCell<HashSet<Advisory>>,
}

impl<'a> LayoutContext<'a> {
    pub fn new(
        options: &'a LayoutOptions,
        styles: &'a dyn StyleProvider,
        fonts: &'a dyn FontProvider,
        images: &'a dyn ImageProvider,
    ) -> Self {
        let capacity = NonZeroUsize::new(options.run_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            options,
            styles,
            fonts,
            images,
            run_cache: RefCell::new(LruCache::new(capacity)),
            block_cache: RefCell::new(HashMap::new()),
            section_cache: RefCell::new(HashMap::new()),
            advisories: RefCell::new(Vec::new()),
            seen: RefCell::new(HashSet::new()),
        }
    }

    pub fn options(&self) -> &LayoutOptions {
        self.options
    }

    // ── providers ───────────────────────────────────────────────────────────

    pub fn style(&self, name: Option<&str>, default_name: &str) -> Style {
        self.take(self.styles.style(name, default_name))
    }

    pub fn font(&self, style: &FontStyle) -> Font {
        self.take(self.fonts.get_font(style))
    }

    pub fn image(&self, reference: &str) -> Arc<ImageDetail> {
        self.take(self.images.get_image(reference))
    }

    fn take<T>(&self, resolved: Resolved<T>) -> T {
        for advisory in resolved.advisories {
            self.advise(advisory);
        }
        resolved.value
    }

    /// Records an advisory; each distinct advisory is logged once.
    pub fn advise(&self, advisory: Advisory) {
        if self.seen.borrow_mut().insert(advisory.clone()) {
            warn!(kind = advisory_kind(&advisory), "{advisory}");
            self.advisories.borrow_mut().push(advisory);
        }
    }

    pub fn into_advisories(self) -> Vec<Advisory> {
        self.advisories.into_inner()
    }

    // ── memoized placement ──────────────────────────────────────────────────

    /// Wraps `run` at `extent.width` with `style`, memoized per run, width and style.
    pub fn place_run(&self, run: &Run, style: &Style, extent: Extent) -> Result<PlacedContent, LayoutError> {
        let key = (run.name.clone(), quantize(extent.width), style.name.clone());
        if let Some(cached) = self.run_cache.borrow_mut().get(&key) {
            return cached
                .clone()
                .ok_or_else(|| too_small_again("run", &run.name, extent.width));
        }

        let font = self.font(&style.font);
        let result = place_run(run, style, &font, extent);
        remember(&mut *self.run_cache.borrow_mut(), key, &result);
        result
    }

    pub(crate) fn cached_block(
        &self,
        name: &str,
        width: f32,
        place: impl FnOnce() -> Result<PlacedContent, LayoutError>,
    ) -> Result<PlacedContent, LayoutError> {
        let key = (name.to_string(), quantize(width));
        memoize(&self.block_cache, key, || too_small_again("block", name, width), place)
    }

    pub(crate) fn cached_section(
        &self,
        name: &str,
        blocks: (usize, usize),
        extent: Extent,
        place: impl FnOnce() -> Result<PlacedContent, LayoutError>,
    ) -> Result<PlacedContent, LayoutError> {
        let key = (
            name.to_string(),
            blocks.0,
            blocks.1,
            quantize(extent.width),
            quantize(extent.height),
        );
        memoize(&self.section_cache, key, || too_small_again("section", name, extent.width), place)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

trait PlacementStore<K> {
    fn store(&mut self, key: K, value: Option<PlacedContent>);
}

impl<K: Eq + Hash> PlacementStore<K> for HashMap<K, Option<PlacedContent>> {
    fn store(&mut self, key: K, value: Option<PlacedContent>) {
        self.insert(key, value);
    }
}

impl<K: Eq + Hash> PlacementStore<K> for LruCache<K, Option<PlacedContent>> {
    fn store(&mut self, key: K, value: Option<PlacedContent>) {
        self.put(key, value);
    }
}

/// Stores successes and recoverable failures; other errors are not cached.
fn remember<K, S: PlacementStore<K>>(store: &mut S, key: K, result: &Result<PlacedContent, LayoutError>) {
    match result {
        Ok(placed) => store.store(key, Some(placed.clone())),
        Err(e) if e.is_recoverable() => store.store(key, None),
        Err(_) => {}
    }
}

fn memoize<K: Eq + Hash>(
    cache: &PlacementCache<K>,
    key: K,
    failure: impl FnOnce() -> LayoutError,
    place: impl FnOnce() -> Result<PlacedContent, LayoutError>,
) -> Result<PlacedContent, LayoutError> {
    if let Some(cached) = cache.borrow().get(&key) {
        return cached.clone().ok_or_else(failure);
    }
    // The borrow is released before placing; placement may fill other caches.
    let result = place();
    remember(&mut *cache.borrow_mut(), key, &result);
    result
}

fn too_small_again(what: &str, name: &str, width: f32) -> LayoutError {
    LayoutError::extent_too_small(format!("{what} '{name}' does not fit width {width:.2}"))
}

fn advisory_kind(advisory: &Advisory) -> &'static str {
    match advisory {
        Advisory::UnknownStyle { .. } => "unknown_style",
        Advisory::UnknownFont { .. } => "unknown_font",
        Advisory::MissingImage { .. } => "missing_image",
        Advisory::UndefinedAttribute { .. } => "undefined_attribute",
    }
}
