use crate::problem::{Category, DifficultyId, Operation};
use crate::session::DrillMode;
use chrono::{DateTime, Local};

pub const RECENT_HISTORY_LIMIT: usize = 20;

/// One submitted answer
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub prompt: String,
    pub answer: i64,
    pub user_answer: i64,
    pub category: Category,
    pub is_correct: bool,
    pub time_taken_secs: u32,
}

/// A finished round as handed to the history store
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRecord {
    pub duration_secs: u32,
    pub time_taken_secs: u32,
    pub difficulty: DifficultyId,
    pub mode: DrillMode,
    pub operations: Vec<Operation>,
    pub correct: u32,
    pub attempted: u32,
    pub score: u32,
    pub accuracy: u32,
    pub pace: f64,
    pub attempts: Vec<AttemptRecord>,
    pub created_at: DateTime<Local>,
}

/// A round the store has accepted, with its canonical id
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRound {
    pub id: i64,
    pub record: RoundRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// shown optimistically, save in flight
    Pending,
    Confirmed(i64),
    /// never reached the store (signed out or save failed)
    LocalOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub local_id: u64,
    pub status: EntryStatus,
    pub record: RoundRecord,
}

/// Recent rounds, newest first, bounded to `limit` entries
#[derive(Debug)]
pub struct RecentHistory {
    items: Vec<HistoryItem>,
    limit: usize,
    next_local_id: u64,
    selected: Option<u64>,
}

impl Default for RecentHistory {
    fn default() -> Self {
        Self::with_limit(RECENT_HISTORY_LIMIT)
    }
}

impl RecentHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            limit: limit.max(1),
            next_local_id: 1,
            selected: None,
        }
    }

    /// Seed from store rows, which arrive newest first
    pub fn from_saved(rounds: Vec<SavedRound>, limit: usize) -> Self {
        let mut history = Self::with_limit(limit);
        for saved in rounds.into_iter().take(history.limit) {
            let local_id = history.allocate_id();
            history.items.push(HistoryItem {
                local_id,
                status: EntryStatus::Confirmed(saved.id),
                record: saved.record,
            });
        }
        history.selected = history.items.first().map(|i| i.local_id);
        history
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        id
    }

    fn prepend(&mut self, record: RoundRecord, status: EntryStatus) -> u64 {
        let local_id = self.allocate_id();
        self.items.insert(
            0,
            HistoryItem {
                local_id,
                status,
                record,
            },
        );
        self.items.truncate(self.limit);
        self.selected = Some(local_id);
        local_id
    }

    /// Optimistically show a round whose save is in flight
    pub fn push_pending(&mut self, record: RoundRecord) -> u64 {
        self.prepend(record, EntryStatus::Pending)
    }

    pub fn push_local(&mut self, record: RoundRecord) -> u64 {
        self.prepend(record, EntryStatus::LocalOnly)
    }

    /// Swap a pending entry for the store's copy. Returns false if the entry is gone.
    pub fn confirm(&mut self, local_id: u64, saved: SavedRound) -> bool {
        match self.items.iter_mut().find(|i| i.local_id == local_id) {
            Some(item) => {
                item.status = EntryStatus::Confirmed(saved.id);
                item.record = saved.record;
                true
            }
            None => false,
        }
    }

    pub fn mark_local_only(&mut self, local_id: u64) -> bool {
        match self.items.iter_mut().find(|i| i.local_id == local_id) {
            Some(item) => {
                item.status = EntryStatus::LocalOnly;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, local_id: u64) -> Option<&HistoryItem> {
        self.items.iter().find(|i| i.local_id == local_id)
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected(&self) -> Option<&HistoryItem> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
            .and_then(|id| self.items.iter().position(|i| i.local_id == id))
    }

    /// Move selection towards older rounds
    pub fn select_next(&mut self) {
        let idx = match self.selected_index() {
            Some(i) => (i + 1).min(self.items.len().saturating_sub(1)),
            None => 0,
        };
        self.selected = self.items.get(idx).map(|i| i.local_id);
    }

    pub fn select_previous(&mut self) {
        let idx = self.selected_index().map_or(0, |i| i.saturating_sub(1));
        self.selected = self.items.get(idx).map(|i| i.local_id);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_record(correct: u32, attempted: u32) -> RoundRecord {
        RoundRecord {
            duration_secs: 60,
            time_taken_secs: 60,
            difficulty: DifficultyId::Balanced,
            mode: DrillMode::Operations,
            operations: vec![Operation::Addition],
            correct,
            attempted,
            score: crate::util::score(correct, attempted),
            accuracy: crate::util::accuracy(correct, attempted),
            pace: crate::util::final_pace(correct, 60),
            attempts: Vec::new(),
            created_at: Local::now(),
        }
    }

    #[test]
    fn test_push_pending_is_newest_first_and_selected() {
        let mut history = RecentHistory::default();
        let first = history.push_pending(sample_record(1, 1));
        let second = history.push_pending(sample_record(2, 2));

        assert_eq!(history.items()[0].local_id, second);
        assert_eq!(history.items()[1].local_id, first);
        assert_eq!(history.items()[0].status, EntryStatus::Pending);
        assert_eq!(history.selected().unwrap().local_id, second);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = RecentHistory::with_limit(3);
        for n in 0..5 {
            history.push_local(sample_record(n, n));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.items()[0].record.correct, 4);
        assert_eq!(history.items()[2].record.correct, 2);
    }

    #[test]
    fn test_confirm_replaces_pending_entry() {
        let mut history = RecentHistory::default();
        let id = history.push_pending(sample_record(3, 4));
        let saved = SavedRound {
            id: 99,
            record: sample_record(3, 4),
        };

        assert!(history.confirm(id, saved));
        assert_eq!(history.get(id).unwrap().status, EntryStatus::Confirmed(99));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_confirm_after_newer_round_touches_only_its_entry() {
        let mut history = RecentHistory::default();
        let older = history.push_pending(sample_record(1, 2));
        let newer = history.push_pending(sample_record(5, 5));

        history.confirm(
            older,
            SavedRound {
                id: 7,
                record: sample_record(1, 2),
            },
        );

        assert_eq!(history.get(newer).unwrap().status, EntryStatus::Pending);
        assert_eq!(history.get(older).unwrap().status, EntryStatus::Confirmed(7));
        assert_eq!(history.items()[0].local_id, newer);
    }

    #[test]
    fn test_confirm_unknown_entry_is_ignored() {
        let mut history = RecentHistory::with_limit(1);
        let dropped = history.push_pending(sample_record(1, 1));
        history.push_pending(sample_record(2, 2));

        let saved = SavedRound {
            id: 1,
            record: sample_record(1, 1),
        };
        assert!(!history.confirm(dropped, saved));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_mark_local_only_keeps_entry() {
        let mut history = RecentHistory::default();
        let id = history.push_pending(sample_record(2, 3));
        assert!(history.mark_local_only(id));
        assert_eq!(history.get(id).unwrap().status, EntryStatus::LocalOnly);
        assert_eq!(history.get(id).unwrap().record.correct, 2);
    }

    #[test]
    fn test_from_saved_marks_confirmed() {
        let rounds = vec![
            SavedRound {
                id: 10,
                record: sample_record(8, 9),
            },
            SavedRound {
                id: 9,
                record: sample_record(4, 4),
            },
        ];
        let history = RecentHistory::from_saved(rounds, 20);
        assert_eq!(history.len(), 2);
        assert_eq!(history.items()[0].status, EntryStatus::Confirmed(10));
        assert_eq!(history.selected().unwrap().record.correct, 8);
    }

    #[test]
    fn test_selection_moves_within_bounds() {
        let mut history = RecentHistory::default();
        history.select_next();
        assert!(history.selected().is_none());

        for n in 0..3 {
            history.push_local(sample_record(n, n));
        }
        assert_eq!(history.selected_index(), Some(0));
        history.select_next();
        history.select_next();
        history.select_next();
        assert_eq!(history.selected_index(), Some(2));
        history.select_previous();
        assert_eq!(history.selected_index(), Some(1));
        history.select_previous();
        history.select_previous();
        assert_eq!(history.selected_index(), Some(0));
    }
}
