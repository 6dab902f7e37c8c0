use std::fmt;

/// Number of entries the ledger grows by whenever it runs out of capacity.
pub const GROWTH: usize = 10;

/// Append-only record of every line entered during this session.
///
/// Entries are addressed by their 1-based position and are never modified or
/// removed once appended.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
}

/// Error returned when an index does not name a recorded entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfRange {
    pub index: i64,
    pub count: usize,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "history index {} out of range (1..={})",
            self.index, self.count
        )
    }
}

impl std::error::Error for OutOfRange {}

impl History {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(GROWTH),
        }
    }

    /// Record a copy of `line` exactly as it was entered.
    pub fn append(&mut self, line: &str) {
        if self.entries.len() == self.entries.capacity() {
            self.entries.reserve_exact(GROWTH);
        }
        self.entries.push(line.to_owned());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch the entry at 1-based `index`.
    pub fn get(&self, index: i64) -> Result<&str, OutOfRange> {
        let out_of_range = OutOfRange {
            index,
            count: self.entries.len(),
        };
        let position = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .ok_or_else(|| out_of_range.clone())?;
        self.entries
            .get(position)
            .map(String::as_str)
            .ok_or(out_of_range)
    }

    /// Iterate over `(1-based index, line)` pairs.
    ///
    /// With `last = Some(n)` only the final `n` entries are yielded; asking for
    /// more than exist yields everything.
    pub fn list(&self, last: Option<usize>) -> impl Iterator<Item = (usize, &str)> {
        let start = last.map_or(0, |n| self.entries.len().saturating_sub(n));
        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, line)| (i + 1, line.as_str()))
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(lines: &[&str]) -> History {
        let mut history = History::new();
        for line in lines {
            history.append(line);
        }
        history
    }

    #[test]
    fn append_keeps_order_and_count() {
        let lines: Vec<String> = (0..25).map(|i| format!("cmd {i}")).collect();
        let mut history = History::new();
        for line in &lines {
            history.append(line);
        }
        assert_eq!(history.len(), 25);
        let stored: Vec<&str> = history.list(None).map(|(_, l)| l).collect();
        assert_eq!(stored, lines);
    }

    #[test]
    fn capacity_grows_in_fixed_steps() {
        let mut history = History::new();
        assert!(history.entries.capacity() >= GROWTH);
        for i in 0..=GROWTH {
            history.append(&i.to_string());
        }
        assert!(history.entries.capacity() >= 2 * GROWTH);
    }

    #[test]
    fn get_is_one_based_and_exact() {
        let history = filled(&["ls", "  cd  ..", ""]);
        assert_eq!(history.get(1), Ok("ls"));
        assert_eq!(history.get(2), Ok("  cd  .."));
        assert_eq!(history.get(3), Ok(""));
    }

    #[test]
    fn get_rejects_out_of_range() {
        let history = filled(&["a", "b"]);
        assert_eq!(history.get(0), Err(OutOfRange { index: 0, count: 2 }));
        assert_eq!(history.get(-4), Err(OutOfRange { index: -4, count: 2 }));
        assert_eq!(history.get(3), Err(OutOfRange { index: 3, count: 2 }));
        assert!(History::new().get(1).is_err());
    }

    #[test]
    fn list_last_n_is_clamped() {
        let history = filled(&["a", "b", "c", "d"]);
        let last_two: Vec<_> = history.list(Some(2)).collect();
        assert_eq!(last_two, vec![(3, "c"), (4, "d")]);

        let all: Vec<_> = history.list(Some(100)).collect();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], (1, "a"));

        assert_eq!(history.list(Some(0)).count(), 0);
    }
}
