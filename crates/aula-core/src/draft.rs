//! # Draft Module
//!
//! A working copy of a committed value.
//!
//! Edits go to the working copy only. `discard` restores the committed
//! value exactly; `commit` and `replace` move the committed value forward.

/// Committed value plus an editable working copy and a dirty flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft<T: Clone> {
    committed: T,
    working: T,
    dirty: bool,
}

impl<T: Clone> Draft<T> {
    /// Start with working == committed.
    #[must_use]
    pub fn new(committed: T) -> Self {
        Self {
            working: committed.clone(),
            committed,
            dirty: false,
        }
    }

    /// Last-synchronised value.
    pub fn committed(&self) -> &T {
        &self.committed
    }

    /// Value as currently edited.
    pub fn working(&self) -> &T {
        &self.working
    }

    /// Mutable access to the working copy. Marks the draft dirty.
    pub fn edit(&mut self) -> &mut T {
        self.dirty = true;
        &mut self.working
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Throw away every edit since the last commit.
    pub fn discard(&mut self) {
        self.working = self.committed.clone();
        self.dirty = false;
    }

    /// Make `value` the committed value and reset the working copy to it.
    pub fn replace(&mut self, value: T) {
        self.working = value.clone();
        self.committed = value;
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discard_restores_committed() {
        let mut draft = Draft::new(vec![1, 2, 3]);
        draft.edit().push(4);
        draft.edit().remove(0);
        assert!(draft.is_dirty());
        assert_eq!(draft.working(), &vec![2, 3, 4]);

        draft.discard();
        assert!(!draft.is_dirty());
        assert_eq!(draft.working(), &vec![1, 2, 3]);
        assert_eq!(draft.committed(), &vec![1, 2, 3]);
    }

    #[test]
    fn replace_moves_both_copies() {
        let mut draft = Draft::new(String::from("a"));
        draft.edit().push('b');
        draft.replace(String::from("z"));
        assert_eq!(draft.committed(), "z");
        assert_eq!(draft.working(), "z");
        assert!(!draft.is_dirty());
    }
}
