//! Canonical scene state: element lists, background configuration and
//! selection. Renderers and gesture controllers read this and propose
//! updates; nothing else mutates it.

use tracing::debug;

use crate::error::{StoryError, StoryResult};
use crate::model::{
    BackgroundSettings, CanvasSize, ElementId, ImageElement, ImageUpdate, TextElement, TextUpdate,
};

/// Draw order is fixed: background, then images in insertion order, then
/// texts in insertion order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SceneState {
    canvas: CanvasSize,
    background: BackgroundSettings,
    background_src: Option<String>,
    images: Vec<ImageElement>,
    texts: Vec<TextElement>,
    #[serde(default)]
    selected_image: Option<ElementId>,
    #[serde(default)]
    selected_text: Option<ElementId>,
    next_id: u64,
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new(CanvasSize::default())
    }
}

impl SceneState {
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            canvas,
            background: BackgroundSettings::default(),
            background_src: None,
            images: Vec::new(),
            texts: Vec::new(),
            selected_image: None,
            selected_text: None,
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn set_canvas(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
    }

    pub fn background(&self) -> &BackgroundSettings {
        &self.background
    }

    pub fn set_background(&mut self, settings: BackgroundSettings) {
        self.background = settings;
    }

    pub fn background_src(&self) -> Option<&str> {
        self.background_src.as_deref()
    }

    pub fn set_background_src(&mut self, src: Option<String>) {
        self.background_src = src;
    }

    pub fn images(&self) -> &[ImageElement] {
        &self.images
    }

    pub fn texts(&self) -> &[TextElement] {
        &self.texts
    }

    /// Adds a text element with default properties, selects it and returns
    /// its id.
    pub fn add_text(&mut self) -> ElementId {
        let id = self.next_id();
        self.texts.push(TextElement::new(id, self.canvas));
        self.select_text(id);
        debug!(%id, "text element added");
        id
    }

    /// Adds an image element sized from its natural dimensions, selects it
    /// and returns its id.
    pub fn add_image(&mut self, src: impl Into<String>, natural: (u32, u32)) -> ElementId {
        let id = self.next_id();
        self.images
            .push(ImageElement::new(id, src, natural, self.canvas));
        self.select_image(id);
        debug!(%id, "image element added");
        id
    }

    pub fn text(&self, id: ElementId) -> Option<&TextElement> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn image(&self, id: ElementId) -> Option<&ImageElement> {
        self.images.iter().find(|i| i.id == id)
    }

    /// Merges a partial update into a text element. The merged element must
    /// still validate, otherwise nothing is committed.
    pub fn update_text(&mut self, id: ElementId, update: &TextUpdate) -> StoryResult<()> {
        let el = self
            .texts
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoryError::validation(format!("no text element '{id}'")))?;
        let mut merged = el.clone();
        update.apply(&mut merged);
        merged.validate()?;
        *el = merged;
        Ok(())
    }

    pub fn update_image(&mut self, id: ElementId, update: &ImageUpdate) -> StoryResult<()> {
        let el = self
            .images
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoryError::validation(format!("no image element '{id}'")))?;
        let mut merged = el.clone();
        update.apply(&mut merged);
        merged.validate()?;
        *el = merged;
        Ok(())
    }

    /// Removes a text element; selection pointing at it is cleared.
    pub fn remove_text(&mut self, id: ElementId) {
        self.texts.retain(|t| t.id != id);
        if self.selected_text == Some(id) {
            self.selected_text = None;
        }
    }

    pub fn remove_image(&mut self, id: ElementId) {
        self.images.retain(|i| i.id != id);
        if self.selected_image == Some(id) {
            self.selected_image = None;
        }
    }

    /// Selecting a text element deselects any image, and vice versa.
    pub fn select_text(&mut self, id: ElementId) {
        self.selected_text = Some(id);
        self.selected_image = None;
    }

    pub fn select_image(&mut self, id: ElementId) {
        self.selected_image = Some(id);
        self.selected_text = None;
    }

    pub fn clear_selection(&mut self) {
        self.selected_text = None;
        self.selected_image = None;
    }

    pub fn selected_text(&self) -> Option<ElementId> {
        self.selected_text
    }

    pub fn selected_image(&self) -> Option<ElementId> {
        self.selected_image
    }
}
