// crates/cliptrim-ui/src/modules/mod.rs
//
// Module registry. To add a new panel:
//   1. Create modules/mypanel.rs implementing EditorModule
//   2. Add `pub mod mypanel;` below
//   3. Call it from the panel layout in app.rs

pub mod export_module;
pub mod library;
pub mod mixer;
pub mod player;
pub mod preview_popup;
pub mod video_module;

use std::collections::HashMap;

use egui::{TextureHandle, Ui};
use uuid::Uuid;

use cliptrim_core::commands::EditorCommand;
use cliptrim_core::state::AppState;

/// GPU-resident thumbnail cache: clip id → loaded texture.
pub type ThumbnailCache = HashMap<Uuid, TextureHandle>;

/// Every editor panel implements this trait.
/// Modules read state, emit commands — they never mutate state directly.
pub trait EditorModule {
    fn name(&self) -> &str;
    fn ui(
        &mut self,
        ui: &mut Ui,
        state: &AppState,
        thumb_cache: &mut ThumbnailCache,
        cmd: &mut Vec<EditorCommand>,
    );
    /// Called every frame after commands are processed.
    /// Non-rendering modules use this instead of ui().
    fn tick(&mut self, _state: &AppState, _ctx: &mut crate::context::AppContext) {}
}
