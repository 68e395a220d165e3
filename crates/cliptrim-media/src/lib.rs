// crates/cliptrim-media/src/lib.rs
//
// No egui dependency — communicates with cliptrim-ui via channels only.

pub mod decode;
pub mod helpers;
pub mod job;
pub mod probe;
pub mod tracks;
pub mod transcode;
pub mod worker;

// Re-export the main public API so cliptrim-ui imports are simple.
pub use job::{build, ExportRequest, TranscodeJob};
pub use worker::MediaWorker;

pub use cliptrim_core::media_types::{MediaResult, PlaybackFrame};
