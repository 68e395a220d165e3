// crates/cliptrim-core/src/lib.rs
//
// Pure state and transition logic. No egui, no FFmpeg — everything here is
// testable without a window or a media file.

pub mod clip;
pub mod commands;
pub mod helpers;
pub mod media_types;
pub mod playback;
pub mod state;
pub mod trim;
