// crates/cliptrim-ui/src/metadata.rs
//
// Sidecar store: one JSON file per clip under `<clips>/.cliptrim/`, keyed
// by the clip's stable id. Writes are debounced — trim-handle drags and a
// moving playhead mark the store dirty every frame, and the pending write
// lands at most twice a second. `flush` forces it out (close, exit, before
// a directory switch).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use uuid::Uuid;

use cliptrim_core::clip::ClipMetadata;

use crate::cliptrim_log;

const DEBOUNCE: Duration = Duration::from_millis(500);

struct PendingWrite {
    id: Uuid,
    meta: ClipMetadata,
    /// When the store first went dirty. Not refreshed on re-marks, so a
    /// continuous drag still persists periodically instead of never.
    since: Instant,
}

pub struct MetadataStore {
    dir: PathBuf,
    pending: Option<PendingWrite>,
}

impl MetadataStore {
    pub fn new(clips_dir: &Path) -> Self {
        Self { dir: clips_dir.join(".cliptrim"), pending: None }
    }

    /// The sidecar directory. Also used as the audio track cache dir.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn set_clips_dir(&mut self, clips_dir: &Path) {
        self.flush();
        self.dir = clips_dir.join(".cliptrim");
    }

    pub fn load(&self, id: Uuid) -> Option<ClipMetadata> {
        let bytes = std::fs::read(self.sidecar_path(id)).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(meta) => Some(meta),
            Err(e) => {
                cliptrim_log!("[meta] {id}: unreadable sidecar, starting fresh: {e}");
                None
            }
        }
    }

    /// Queue a write. Coalesces with any pending write for the same or a
    /// different clip — the latest snapshot wins.
    pub fn mark_dirty(&mut self, id: Uuid, meta: ClipMetadata) {
        match &mut self.pending {
            Some(p) if p.id == id => p.meta = meta,
            _ => {
                // Different clip queued: don't lose its last snapshot.
                self.flush();
                self.pending = Some(PendingWrite { id, meta, since: Instant::now() });
            }
        }
    }

    /// Call once per UI frame.
    pub fn tick(&mut self) {
        let due = self
            .pending
            .as_ref()
            .map(|p| p.since.elapsed() >= DEBOUNCE)
            .unwrap_or(false);
        if due {
            self.flush();
        }
    }

    pub fn flush(&mut self) {
        if let Some(p) = self.pending.take() {
            self.write(p.id, &p.meta);
        }
    }

    fn sidecar_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn write(&self, id: Uuid, meta: &ClipMetadata) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            cliptrim_log!("[meta] create {}: {e}", self.dir.display());
            return;
        }
        let json = match serde_json::to_vec_pretty(meta) {
            Ok(j) => j,
            Err(e) => {
                cliptrim_log!("[meta] {id}: serialize: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(self.sidecar_path(id), json) {
            cliptrim_log!("[meta] {id}: write: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliptrim_core::clip::TrimSpan;

    fn meta(start: f64, end: f64) -> ClipMetadata {
        ClipMetadata {
            trim: TrimSpan { start, end },
            ..Default::default()
        }
    }

    #[test]
    fn flush_persists_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::new(dir.path());
        let id = Uuid::new_v4();

        store.mark_dirty(id, meta(2.0, 9.5));
        store.flush();

        let back = store.load(id).unwrap();
        assert_eq!(back.trim.start, 2.0);
        assert_eq!(back.trim.end, 9.5);
    }

    #[test]
    fn tick_before_debounce_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::new(dir.path());
        let id = Uuid::new_v4();

        store.mark_dirty(id, meta(1.0, 4.0));
        store.tick();
        assert!(store.load(id).is_none());
    }

    #[test]
    fn later_mark_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::new(dir.path());
        let id = Uuid::new_v4();

        store.mark_dirty(id, meta(1.0, 4.0));
        store.mark_dirty(id, meta(3.0, 8.0));
        store.flush();
        assert_eq!(store.load(id).unwrap().trim.start, 3.0);
    }

    #[test]
    fn switching_clips_flushes_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetadataStore::new(dir.path());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.mark_dirty(a, meta(1.0, 4.0));
        store.mark_dirty(b, meta(2.0, 6.0));
        assert!(store.load(a).is_some());
        assert!(store.load(b).is_none());
    }

    #[test]
    fn corrupt_sidecar_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        let id = Uuid::new_v4();
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.dir().join(format!("{id}.json")), b"{not json").unwrap();
        assert!(store.load(id).is_none());
    }
}
