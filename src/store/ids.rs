use chrono::Utc;
use uuid::Uuid;

use super::error::StoreError;

/// How a table mints ids for rows created without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// `{prefix}_{epoch-ms}`, e.g. `prd_1718000000000`.
    Timestamp(&'static str),
    /// `{PREFIX}-{6 upper-case hex digits}`, e.g. `SH-3FA9C1`.
    RandomHex(&'static str),
}

impl IdStrategy {
    pub fn generate(&self) -> String {
        self.generate_at(Utc::now().timestamp_millis())
    }

    pub fn generate_at(&self, now_ms: i64) -> String {
        match self {
            IdStrategy::Timestamp(prefix) => format!("{}_{}", prefix, now_ms),
            IdStrategy::RandomHex(prefix) => {
                let hex = Uuid::new_v4().simple().to_string();
                format!("{}-{}", prefix, hex[..6].to_ascii_uppercase())
            }
        }
    }

    /// Generates an id not present in `taken`.
    ///
    /// Timestamp ids advance the clock value on collision so that two
    /// creates within the same millisecond still get distinct ids.
    pub fn generate_unique<F>(&self, taken: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        let mut now_ms = Utc::now().timestamp_millis();
        loop {
            let candidate = self.generate_at(now_ms);
            if !taken(&candidate) {
                return candidate;
            }
            now_ms += 1;
        }
    }
}

/// Human-facing sequence numbers such as `ORD-001`.
///
/// The next number is one more than the largest one already present, so it
/// is only gap-free and unique while a single writer is creating rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSpec {
    pub field: &'static str,
    pub prefix: &'static str,
    pub width: usize,
}

impl SequenceSpec {
    /// Numeric part of `PREFIX-<digits>` (prefix case-insensitive) or of a bare
    /// digit string.
    pub fn parse(&self, value: &str) -> Option<u64> {
        let value = value.trim();
        let digits = match value.get(..self.prefix.len() + 1) {
            Some(head) if head.eq_ignore_ascii_case(&format!("{}-", self.prefix)) => &value[head.len()..],
            _ => value,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn format(&self, n: u64) -> String {
        format!("{}-{:0width$}", self.prefix, n, width = self.width)
    }

    /// `max(existing) + 1`, starting at 1 when nothing parses. Fails when a
    /// stored value already holds the largest representable number.
    pub fn next<'a, I>(&self, existing: I) -> Result<String, StoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max = existing.into_iter().filter_map(|v| self.parse(v)).max().unwrap_or(0);
        max.checked_add(1)
            .map(|n| self.format(n))
            .ok_or_else(|| StoreError::invalid(self.field, format!("sequence after {} is exhausted", self.format(max))))
    }
}
