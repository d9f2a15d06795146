//! Sliding windows over the scaled residuals
//!
//! Window `i` holds rows `[i, i + L)` and its target is row `i + L`, so a
//! frame of `n` rows yields `max(n - L, 0)` windows. Windows borrow from the
//! frame instead of copying it.

use chrono::NaiveDate;

use crate::table::Frame;

/// Number of windows a frame of `rows` rows yields
pub fn window_count(rows: usize, window_len: usize) -> usize {
    rows.saturating_sub(window_len)
}

#[derive(Debug, Clone, Default)]
pub struct Windows<'a> {
    pub sequences: Vec<&'a [Vec<f64>]>,
    pub targets: Vec<&'a [f64]>,
    /// Date of each target row
    pub dates: Vec<NaiveDate>,
}

impl Windows<'_> {
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Build windows of `window_len` rows (at least 1) over `frame`
pub fn sliding_windows(frame: &Frame, window_len: usize) -> Windows<'_> {
    let len = window_len.max(1);
    let rows = frame.rows();
    let count = window_count(rows.len(), len);

    let mut windows = Windows {
        sequences: Vec::with_capacity(count),
        targets: Vec::with_capacity(count),
        dates: Vec::with_capacity(count),
    };
    for i in 0..count {
        windows.sequences.push(&rows[i..i + len]);
        windows.targets.push(rows[i + len].as_slice());
        windows.dates.push(frame.index()[i + len]);
    }
    windows
}
