#![forbid(unsafe_code)]

pub mod background;
pub mod blur;
pub mod compositor;
pub mod effects;
pub mod error;
pub mod export;
pub mod frame;
pub mod geometry;
pub mod gesture;
pub mod model;
pub mod render;
pub mod resources;
pub mod scene;
pub mod schedule;
pub mod text;

pub use error::{StoryError, StoryResult};
pub use export::{ExportFormat, encode_frame};
pub use frame::Frame;
pub use gesture::{GestureController, GestureTuning, HandleDir, Pointer, Viewport};
pub use model::{
    BackgroundEffects, BackgroundMode, BackgroundSettings, BlurMode, CanvasSize, Color,
    CornerStyle, ElementId,
    ImageElement, ImageUpdate, NamedFilter, TextElement, TextUpdate,
};
pub use render::SceneRenderer;
pub use resources::ResourceStore;
pub use scene::SceneState;
pub use schedule::{RedrawScheduler, RedrawTicket};
