//! The user's ordered list of displayed currencies.

use serde::{Deserialize, Serialize};

use crate::CurrencyCode;

/// One row of the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub code: CurrencyCode,
    pub is_enabled: bool,
}

impl SelectionEntry {
    pub fn enabled(code: impl Into<CurrencyCode>) -> Self {
        Self {
            code: code.into(),
            is_enabled: true,
        }
    }
}

/// Ordered, de-duplicated currency selection with the base pinned first.
///
/// Every mutation keeps three invariants: the base code is present, it is
/// at index 0, and no code appears twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCurrencySelection {
    base: CurrencyCode,
    entries: Vec<SelectionEntry>,
}

impl UserCurrencySelection {
    /// Selection shown on first launch.
    pub fn default_for(base: CurrencyCode) -> Self {
        Self::from_entries(
            base.clone(),
            vec![
                SelectionEntry::enabled(base),
                SelectionEntry::enabled(CurrencyCode::usd()),
                SelectionEntry::enabled(CurrencyCode::eur()),
                SelectionEntry::enabled(CurrencyCode::gbp()),
            ],
        )
    }

    /// Build a selection from persisted entries, repairing any invariant
    /// the stored data violates.
    pub fn from_entries(base: CurrencyCode, entries: Vec<SelectionEntry>) -> Self {
        let mut normalised: Vec<SelectionEntry> = Vec::with_capacity(entries.len() + 1);
        normalised.push(SelectionEntry::enabled(base.clone()));

        for entry in entries {
            if entry.code == base || normalised.iter().any(|e| e.code == entry.code) {
                continue;
            }
            normalised.push(entry);
        }

        Self {
            base,
            entries: normalised,
        }
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    /// All codes in display order.
    pub fn codes(&self) -> Vec<CurrencyCode> {
        self.entries.iter().map(|e| e.code.clone()).collect()
    }

    /// Enabled codes in display order.
    pub fn enabled_codes(&self) -> Vec<CurrencyCode> {
        self.entries
            .iter()
            .filter(|e| e.is_enabled)
            .map(|e| e.code.clone())
            .collect()
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.entries.iter().any(|e| &e.code == code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a currency. Returns `false` if it was already selected.
    pub fn add(&mut self, code: CurrencyCode) -> bool {
        if self.contains(&code) {
            return false;
        }
        self.entries.push(SelectionEntry::enabled(code));
        true
    }

    /// Remove a currency. The base currency cannot be removed.
    pub fn remove(&mut self, code: &CurrencyCode) -> bool {
        if code == &self.base {
            return false;
        }
        let before = self.entries.len();
        self.entries.retain(|e| &e.code != code);
        self.entries.len() != before
    }

    /// Move the entry at `from` so it ends up at index `to`.
    ///
    /// The base at index 0 never moves and nothing may take its place.
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        if from == 0 || to == 0 || from >= self.entries.len() || to >= self.entries.len() {
            return false;
        }
        if from == to {
            return true;
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        true
    }

    /// Toggle visibility of a currency. The base always stays enabled.
    pub fn set_enabled(&mut self, code: &CurrencyCode, enabled: bool) -> bool {
        if code == &self.base {
            return false;
        }
        match self.entries.iter_mut().find(|e| &e.code == code) {
            Some(entry) => {
                entry.is_enabled = enabled;
                true
            }
            None => false,
        }
    }
}
