//! Immutable time-indexed signal table
//!
//! A [`SignalTable`] is the read-only input to every engine component. It
//! holds one shared, strictly increasing timestamp index and a set of named
//! columns of `Option<f64>` readings aligned to that index.
//!
//! Construction is the validation boundary:
//!
//! - timestamps must be strictly increasing
//! - every column must have one entry per timestamp
//! - NaN readings are normalized to `None` (absent)
//!
//! Each column also keeps the row indices of its present values so that
//! "last known value at or before" lookups are a binary search regardless of
//! how sparse the column is.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SlicksError};
use crate::types::{Sample, SessionWindow, TimeSpan, Timestamp};

#[derive(Debug, Clone, PartialEq)]
struct Column {
    values: Vec<Option<f64>>,
    /// Row indices holding a present value, ascending
    present: Vec<usize>,
}

impl Column {
    fn new(values: Vec<Option<f64>>) -> Self {
        let values: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        let present = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|_| i))
            .collect();
        Self { values, present }
    }
}

/// Serialized form of a table (column-oriented)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTable {
    timestamps: Vec<Timestamp>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

/// Time-sorted table of named signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct SignalTable {
    timestamps: Vec<Timestamp>,
    columns: BTreeMap<String, Column>,
}

impl TryFrom<RawTable> for SignalTable {
    type Error = SlicksError;

    fn try_from(raw: RawTable) -> Result<Self> {
        SignalTable::new(raw.timestamps, raw.columns)
    }
}

impl From<SignalTable> for RawTable {
    fn from(table: SignalTable) -> Self {
        RawTable {
            timestamps: table.timestamps,
            columns: table
                .columns
                .into_iter()
                .map(|(name, col)| (name, col.values))
                .collect(),
        }
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl SignalTable {
    /// Create a validated table from an index and aligned columns
    pub fn new(
        timestamps: Vec<Timestamp>,
        columns: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self> {
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SlicksError::Table(format!(
                "timestamps must be strictly increasing (row {} at {} is not after {})",
                pos + 1,
                timestamps[pos + 1].to_rfc3339(),
                timestamps[pos].to_rfc3339()
            )));
        }

        let mut validated = BTreeMap::new();
        for (name, values) in columns {
            if values.len() != timestamps.len() {
                return Err(SlicksError::Table(format!(
                    "column '{}' has {} values for {} timestamps",
                    name,
                    values.len(),
                    timestamps.len()
                )));
            }
            validated.insert(name, Column::new(values));
        }

        Ok(Self {
            timestamps,
            columns: validated,
        })
    }

    /// A table with no rows and no signals
    pub fn empty() -> Self {
        Self {
            timestamps: Vec::new(),
            columns: BTreeMap::new(),
        }
    }

    /// Build a table from rows
    ///
    /// The column set is the union of all signal names; a signal missing from
    /// a row is absent in that row.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        let names: BTreeSet<String> = samples
            .iter()
            .flat_map(|s| s.values.keys().cloned())
            .collect();

        let mut columns: BTreeMap<String, Vec<Option<f64>>> = names
            .into_iter()
            .map(|n| (n, Vec::with_capacity(samples.len())))
            .collect();
        let mut timestamps = Vec::with_capacity(samples.len());

        for sample in samples {
            timestamps.push(sample.timestamp);
            for (name, column) in columns.iter_mut() {
                column.push(sample.values.get(name).copied().flatten());
            }
        }

        Self::new(timestamps, columns)
    }

    /// Pivot per-signal series into one table
    ///
    /// Each series is sorted by timestamp and deduplicated (the last value for
    /// a repeated timestamp wins). The index is the union of all timestamps.
    pub fn from_series(series: BTreeMap<String, Vec<(Timestamp, f64)>>) -> Result<Self> {
        let mut cleaned: BTreeMap<String, BTreeMap<Timestamp, f64>> = BTreeMap::new();
        for (name, points) in series {
            let entry = cleaned.entry(name).or_default();
            for (ts, value) in points {
                entry.insert(ts, value);
            }
        }

        let index: BTreeSet<Timestamp> = cleaned
            .values()
            .flat_map(|points| points.keys().copied())
            .collect();
        let timestamps: Vec<Timestamp> = index.into_iter().collect();

        let columns = cleaned
            .into_iter()
            .map(|(name, points)| {
                let values = timestamps.iter().map(|ts| points.get(ts).copied()).collect();
                (name, values)
            })
            .collect();

        Self::new(timestamps, columns)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The shared timestamp index
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Names of all signals, sorted
    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Whether a column exists for `signal`
    pub fn has_signal(&self, signal: &str) -> bool {
        self.columns.contains_key(signal)
    }

    /// Raw column values aligned with [`timestamps`](Self::timestamps)
    pub fn column(&self, signal: &str) -> Option<&[Option<f64>]> {
        self.columns.get(signal).map(|c| c.values.as_slice())
    }

    /// Reading for `signal` at `row`
    pub fn value(&self, signal: &str, row: usize) -> Option<f64> {
        self.columns
            .get(signal)
            .and_then(|c| c.values.get(row).copied().flatten())
    }

    /// Number of present readings for `signal`
    pub fn present_count(&self, signal: &str) -> usize {
        self.columns.get(signal).map_or(0, |c| c.present.len())
    }

    /// Iterate only the present `(timestamp, value)` pairs of a signal
    pub fn present<'a>(&'a self, signal: &str) -> impl Iterator<Item = (Timestamp, f64)> + 'a {
        self.columns.get(signal).into_iter().flat_map(move |c| {
            c.present
                .iter()
                .filter_map(move |&i| c.values[i].map(|v| (self.timestamps[i], v)))
        })
    }

    /// Row `index` as a [`Sample`]
    pub fn row(&self, index: usize) -> Option<Sample> {
        let timestamp = *self.timestamps.get(index)?;
        let values = self
            .columns
            .iter()
            .map(|(name, c)| (name.clone(), c.values[index]))
            .collect();
        Some(Sample { timestamp, values })
    }

    /// Iterate all rows as samples
    pub fn rows(&self) -> impl Iterator<Item = Sample> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }

    /// First and last timestamp, if any rows exist
    pub fn span(&self) -> Option<TimeSpan> {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => Some(TimeSpan::new(*first, *last)),
            _ => None,
        }
    }

    /// Index of the last row with timestamp `<= cursor`
    pub fn index_at_or_before(&self, cursor: Timestamp) -> Option<usize> {
        self.timestamps
            .partition_point(|ts| *ts <= cursor)
            .checked_sub(1)
    }

    /// Last present reading of `signal` at or before `cursor`
    pub fn last_at_or_before(&self, signal: &str, cursor: Timestamp) -> Option<(Timestamp, f64)> {
        let column = self.columns.get(signal)?;
        let k = column
            .present
            .partition_point(|&i| self.timestamps[i] <= cursor)
            .checked_sub(1)?;
        let row = column.present[k];
        column.values[row].map(|v| (self.timestamps[row], v))
    }

    /// First row timestamp strictly after `ts`
    pub fn next_timestamp_after(&self, ts: Timestamp) -> Option<Timestamp> {
        let idx = self.timestamps.partition_point(|t| *t <= ts);
        self.timestamps.get(idx).copied()
    }

    /// Last row timestamp strictly before `ts`
    pub fn prev_timestamp_before(&self, ts: Timestamp) -> Option<Timestamp> {
        let idx = self.timestamps.partition_point(|t| *t < ts);
        idx.checked_sub(1).map(|i| self.timestamps[i])
    }

    /// Keep rows whose timestamp satisfies `keep`
    pub fn filter_rows<F>(&self, mut keep: F) -> SignalTable
    where
        F: FnMut(Timestamp) -> bool,
    {
        let rows: Vec<usize> = (0..self.len())
            .filter(|&i| keep(self.timestamps[i]))
            .collect();

        let timestamps = rows.iter().map(|&i| self.timestamps[i]).collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, c)| {
                let values = rows.iter().map(|&i| c.values[i]).collect();
                (name.clone(), Column::new(values))
            })
            .collect();

        SignalTable {
            timestamps,
            columns,
        }
    }

    /// Rows inside the half-open `window`
    pub fn slice(&self, window: &SessionWindow) -> SignalTable {
        let lo = self.timestamps.partition_point(|ts| *ts < window.start());
        let hi = self.timestamps.partition_point(|ts| *ts < window.end());

        SignalTable {
            timestamps: self.timestamps[lo..hi].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(name, c)| (name.clone(), Column::new(c.values[lo..hi].to_vec())))
                .collect(),
        }
    }

    /// Keep only the named signals (unknown names are ignored)
    pub fn select<S: AsRef<str>>(&self, signals: &[S]) -> SignalTable {
        let columns = self
            .columns
            .iter()
            .filter(|(name, _)| signals.iter().any(|s| s.as_ref() == name.as_str()))
            .map(|(name, c)| (name.clone(), c.clone()))
            .collect();

        SignalTable {
            timestamps: self.timestamps.clone(),
            columns,
        }
    }

    /// Return a copy with `signal` added or overwritten
    pub fn with_column(
        &self,
        signal: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<SignalTable> {
        let signal = signal.into();
        if values.len() != self.len() {
            return Err(SlicksError::Table(format!(
                "column '{}' has {} values for {} timestamps",
                signal,
                values.len(),
                self.len()
            )));
        }
        let mut table = self.clone();
        table.columns.insert(signal, Column::new(values));
        Ok(table)
    }
}
