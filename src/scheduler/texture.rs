/// Whatever turns the painted surface into a texture for the CRT filter.
pub trait TextureSink {
    /// Called once per completed render.
    fn mark_dirty(&mut self);
}

/// Coalescing dirty flag: any number of renders between two polls yields one upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureFlag {
    dirty: bool,
    marks: u64,
}

impl TextureFlag {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether an upload is needed and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Total renders signalled over the flag's lifetime.
    pub fn marks(&self) -> u64 {
        self.marks
    }
}

impl TextureSink for TextureFlag {
    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.marks += 1;
    }
}
