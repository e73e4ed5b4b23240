use std::collections::HashSet;

use super::board::PipelineBoard;
use super::domain::{Application, ApplicationId};

/// Applications chosen for a bulk action, independent of column membership.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: HashSet<ApplicationId>,
    select_mode: bool,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of `id`; returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: &ApplicationId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            self.select_mode = true;
            true
        }
    }

    pub fn select_all<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a ApplicationId>,
    {
        let before = self.ids.len();
        self.ids.extend(ids.into_iter().cloned());
        self.select_mode = true;
        self.ids.len() - before
    }

    /// Empties the set and leaves select mode.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.select_mode = false;
    }

    pub fn contains(&self, id: &ApplicationId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn in_select_mode(&self) -> bool {
        self.select_mode
    }

    /// Drops ids the board no longer knows; returns how many were removed.
    pub fn prune(&mut self, board: &PipelineBoard) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| board.contains(id));
        before - self.ids.len()
    }

    /// Selected records in board list order.
    pub fn resolve<'a>(&self, board: &'a PipelineBoard) -> Vec<&'a Application> {
        board
            .applications()
            .iter()
            .filter(|application| self.ids.contains(&application.id))
            .collect()
    }

    /// Selected ids in board list order.
    pub fn ordered_ids(&self, board: &PipelineBoard) -> Vec<ApplicationId> {
        self.resolve(board)
            .into_iter()
            .map(|application| application.id.clone())
            .collect()
    }
}
