use std::collections::HashMap;

use crate::sheets::Grid;

/// Column layout of a table, taken from its header row.
///
/// Names are trimmed but otherwise kept verbatim: duplicates and blank names
/// stay in place so column positions never shift. When a name repeats, the
/// last occurrence wins for lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().trim().to_string()).collect();
        let index = names.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();
        Self { names, index }
    }

    /// Header from the first row of `grid`, or `None` when that row is
    /// missing or holds no non-blank name.
    pub fn from_grid(grid: &Grid) -> Option<Self> {
        let first = grid.first()?;
        if first.iter().all(|cell| cell.trim().is_empty()) {
            return None;
        }
        Some(Self::new(first))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}
