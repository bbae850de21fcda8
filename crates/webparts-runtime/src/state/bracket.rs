//! Load and save brackets for change-tracking parts.
//!
//! Opening a bracket calls `begin_*`; the matching `end_*` runs exactly once,
//! either through `finish` or on drop when the engine bails out early.

use webparts_core::{LoadContext, Part};

pub(crate) struct LoadBracket<'p> {
    part: &'p mut dyn Part,
    open: bool,
}

impl<'p> LoadBracket<'p> {
    pub(crate) fn open(part: &'p mut dyn Part) -> Self {
        if let Some(tracking) = part.as_tracking() {
            tracking.begin_load();
        }
        Self { part, open: true }
    }

    pub(crate) fn part(&mut self) -> &mut dyn Part {
        &mut *self.part
    }

    /// Ends the load and reports whether the part asked to be marked dirty.
    pub(crate) fn finish(mut self) -> bool {
        self.open = false;
        let mut cx = LoadContext::new();
        if let Some(tracking) = self.part.as_tracking() {
            tracking.end_load(&mut cx);
        }
        cx.dirty_requested()
    }
}

impl Drop for LoadBracket<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Some(tracking) = self.part.as_tracking() {
                tracking.end_load(&mut LoadContext::new());
            }
        }
    }
}

pub(crate) struct SaveBracket<'p> {
    part: &'p mut dyn Part,
}

impl<'p> SaveBracket<'p> {
    pub(crate) fn open(part: &'p mut dyn Part) -> Self {
        if let Some(tracking) = part.as_tracking() {
            tracking.begin_save();
        }
        Self { part }
    }

    pub(crate) fn part(&mut self) -> &mut dyn Part {
        &mut *self.part
    }
}

impl Drop for SaveBracket<'_> {
    fn drop(&mut self) {
        if let Some(tracking) = self.part.as_tracking() {
            tracking.end_save();
        }
    }
}
