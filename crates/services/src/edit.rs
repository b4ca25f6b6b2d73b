//! Two-state edit toggles used by goal and profile editors.

/// Either showing the stored value or holding an unsaved draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode<D> {
    Viewing,
    Editing(D),
}

impl<D> Default for EditMode<D> {
    fn default() -> Self {
        Self::Viewing
    }
}

impl<D> EditMode<D> {
    #[must_use]
    pub fn is_editing(&self) -> bool {
        matches!(self, Self::Editing(_))
    }

    /// Enter editing with an initial draft, replacing any existing draft.
    pub fn begin(&mut self, draft: D) {
        *self = Self::Editing(draft);
    }

    /// Mutable access to the draft while editing.
    pub fn draft_mut(&mut self) -> Option<&mut D> {
        match self {
            Self::Editing(draft) => Some(draft),
            Self::Viewing => None,
        }
    }

    #[must_use]
    pub fn draft(&self) -> Option<&D> {
        match self {
            Self::Editing(draft) => Some(draft),
            Self::Viewing => None,
        }
    }

    /// Drop the draft and return to viewing.
    pub fn cancel(&mut self) {
        *self = Self::Viewing;
    }

    /// Leave editing and hand back the draft for saving.
    pub fn take(&mut self) -> Option<D> {
        match std::mem::replace(self, Self::Viewing) {
            Self::Editing(draft) => Some(draft),
            Self::Viewing => None,
        }
    }
}
