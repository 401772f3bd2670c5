/// Aggregated view of session progress, useful for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub current_index: usize,
    pub time_remaining: u32,
    pub is_complete: bool,
}

impl SessionProgress {
    /// 1-based position for display, e.g. "2/5".
    #[must_use]
    pub fn position(&self) -> usize {
        (self.current_index + 1).min(self.total)
    }
}
