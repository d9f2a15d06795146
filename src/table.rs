//! Date-indexed numeric frames
//!
//! Every table that flows through the pipeline (raw input, scaled input,
//! forecast, residuals) is a `Frame`: an ordered list of dates plus one row of
//! values per date. Joins between frames are explicit index intersections,
//! never positional coincidences.

use chrono::NaiveDate;

use crate::error::DetectError;

/// Ordered (date -> row) table with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Frame {
    /// Build a frame, checking shape and that dates are strictly increasing.
    pub fn new(
        index: Vec<NaiveDate>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, DetectError> {
        if index.len() != rows.len() {
            return Err(DetectError::schema(format!(
                "index has {} dates but {} rows",
                index.len(),
                rows.len()
            )));
        }
        if let Some((pos, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(DetectError::schema(format!(
                "row {} has {} values, expected {}",
                pos,
                row.len(),
                columns.len()
            )));
        }
        if let Some(pair) = index.windows(2).find(|w| w[0] >= w[1]) {
            return Err(DetectError::schema(format!(
                "dates must be strictly increasing ({} followed by {})",
                pair[0], pair[1]
            )));
        }

        Ok(Self {
            index,
            columns,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at row `pos` of column `name`
    pub fn value(&self, pos: usize, name: &str) -> Option<f64> {
        let col = self.column_position(name)?;
        self.rows.get(pos).map(|row| row[col])
    }

    /// Reorder columns to `order`.
    ///
    /// Fails unless `order` names exactly this frame's column set.
    pub fn select(&self, order: &[String]) -> Result<Frame, DetectError> {
        let same_set = order.len() == self.columns.len()
            && order.iter().all(|c| self.columns.contains(c))
            && self.columns.iter().all(|c| order.contains(c));
        if !same_set {
            return Err(DetectError::schema(format!(
                "column mismatch: expected {:?}, found {:?}",
                order, self.columns
            )));
        }

        let positions: Vec<usize> = order
            .iter()
            .filter_map(|c| self.column_position(c))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&p| row[p]).collect())
            .collect();

        Ok(Frame {
            index: self.index.clone(),
            columns: order.to_vec(),
            rows,
        })
    }

    /// Rows at the given (increasing) positions
    pub fn take(&self, positions: &[usize]) -> Frame {
        Frame {
            index: positions.iter().map(|&p| self.index[p]).collect(),
            columns: self.columns.clone(),
            rows: positions.iter().map(|&p| self.rows[p].clone()).collect(),
        }
    }

    /// Apply `f` to every row, keeping index and columns
    pub fn map_rows<F>(&self, mut f: F) -> Frame
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        Frame {
            index: self.index.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().map(|r| f(r)).collect(),
        }
    }

    /// Drop rows holding any NaN or infinite value. Returns the dropped count.
    pub fn drop_non_finite(&self) -> (Frame, usize) {
        let keep: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|v| v.is_finite()))
            .map(|(pos, _)| pos)
            .collect();
        let dropped = self.len() - keep.len();
        (self.take(&keep), dropped)
    }
}

/// Matching positions of two strictly increasing date indexes.
///
/// Returns `(left_pos, right_pos)` pairs in date order.
pub fn intersect_index(left: &[NaiveDate], right: &[NaiveDate]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                pairs.push((i, j));
                i += 1;
                j += 1;
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_unordered_index() {
        let result = Frame::new(
            vec![day(2), day(1)],
            cols(&["a"]),
            vec![vec![1.0], vec![2.0]],
        );
        assert!(matches!(result, Err(DetectError::Schema(_))));
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = Frame::new(vec![day(1)], cols(&["a", "b"]), vec![vec![1.0]]);
        assert!(matches!(result, Err(DetectError::Schema(_))));
    }

    #[test]
    fn test_select_reorders_columns() {
        let frame = Frame::new(
            vec![day(1), day(2)],
            cols(&["a", "b", "c"]),
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();

        let selected = frame.select(&cols(&["c", "a", "b"])).unwrap();
        assert_eq!(selected.columns(), &cols(&["c", "a", "b"])[..]);
        assert_eq!(selected.rows()[1], vec![6.0, 4.0, 5.0]);
        assert_eq!(selected.index(), frame.index());
    }

    #[test]
    fn test_select_rejects_different_column_set() {
        let frame = Frame::new(vec![day(1)], cols(&["a", "b"]), vec![vec![1.0, 2.0]]).unwrap();
        assert!(frame.select(&cols(&["a"])).is_err());
        assert!(frame.select(&cols(&["a", "z"])).is_err());
    }

    #[test]
    fn test_select_rejects_duplicated_column() {
        let frame = Frame::new(
            vec![day(1)],
            cols(&["a", "b", "c"]),
            vec![vec![1.0, 2.0, 3.0]],
        )
        .unwrap();
        // same length, but "c" would be dropped
        assert!(matches!(
            frame.select(&cols(&["a", "a", "b"])),
            Err(DetectError::Schema(_))
        ));
    }

    #[test]
    fn test_intersect_index_skips_gaps() {
        let left = vec![day(1), day(2), day(4), day(6)];
        let right = vec![day(2), day(3), day(4), day(5), day(6), day(7)];

        let pairs = intersect_index(&left, &right);
        assert_eq!(pairs, vec![(1, 0), (2, 2), (3, 4)]);
    }

    #[test]
    fn test_intersect_index_disjoint() {
        assert!(intersect_index(&[day(1), day(2)], &[day(3)]).is_empty());
        assert!(intersect_index(&[], &[day(3)]).is_empty());
    }

    #[test]
    fn test_drop_non_finite() {
        let frame = Frame::new(
            vec![day(1), day(2), day(3)],
            cols(&["a", "b"]),
            vec![vec![1.0, f64::NAN], vec![2.0, 3.0], vec![f64::INFINITY, 1.0]],
        )
        .unwrap();

        let (clean, dropped) = frame.drop_non_finite();
        assert_eq!(dropped, 2);
        assert_eq!(clean.index(), &[day(2)]);
    }

    #[test]
    fn test_value_lookup() {
        let frame = Frame::new(
            vec![day(1), day(2), day(3)],
            cols(&["a"]),
            vec![vec![1.0], vec![2.0], vec![3.0]],
        )
        .unwrap();

        assert_eq!(frame.value(1, "a"), Some(2.0));
        assert_eq!(frame.value(1, "z"), None);
        assert_eq!(frame.value(7, "a"), None);
    }
}
