//! Nearest-value lookup over an ascending sequence of keys.
//!
//! Keys are stored as `f64`. Timestamps are converted to seconds since the
//! Unix epoch (naive values are read as UTC) and strings are parsed as
//! timestamps, so numeric and temporal sequences share one search.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

use crate::data::error::SearchError;

// ---------------------------------------------------------------------------
// SearchKey – anything convertible to a comparable instant
// ---------------------------------------------------------------------------

/// A value that can be placed on the search axis.
pub trait SearchKey {
    fn search_key(&self) -> Result<f64, SearchError>;
}

macro_rules! numeric_search_key {
    ($($t:ty),*) => {
        $(impl SearchKey for $t {
            fn search_key(&self) -> Result<f64, SearchError> {
                Ok(*self as f64)
            }
        })*
    };
}

numeric_search_key!(f64, f32, i32, i64, u32, usize);

impl SearchKey for NaiveDateTime {
    fn search_key(&self) -> Result<f64, SearchError> {
        Ok(self.and_utc().timestamp_millis() as f64 / 1000.0)
    }
}

impl<Tz: TimeZone> SearchKey for DateTime<Tz> {
    fn search_key(&self) -> Result<f64, SearchError> {
        Ok(self.timestamp_millis() as f64 / 1000.0)
    }
}

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl SearchKey for str {
    /// Parse as RFC 3339, then as one of the common naive layouts, then as a
    /// bare date (midnight).
    fn search_key(&self) -> Result<f64, SearchError> {
        let s = self.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return t.search_key();
        }
        if let Some(t) = DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        {
            return t.search_key();
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| SearchError::InvalidTimestamp(s.to_string()))?
            .search_key()
    }
}

impl SearchKey for String {
    fn search_key(&self) -> Result<f64, SearchError> {
        self.as_str().search_key()
    }
}

impl<T: SearchKey + ?Sized> SearchKey for &T {
    fn search_key(&self) -> Result<f64, SearchError> {
        (**self).search_key()
    }
}

// ---------------------------------------------------------------------------
// NearestSearch
// ---------------------------------------------------------------------------

/// Keys paired with labels; answers "which label sits closest to `q`".
///
/// [`nearest_index`](Self::nearest_index) assumes the keys are ascending.
/// This is not checked: call [`sort`](Self::sort) first if the input order
/// is not known to be sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestSearch<L = usize> {
    keys: Vec<f64>,
    labels: Vec<L>,
}

impl NearestSearch<usize> {
    /// Search over `values`, labelled by position.
    pub fn new<K: SearchKey>(values: impl IntoIterator<Item = K>) -> Result<Self, SearchError> {
        let keys = values
            .into_iter()
            .map(|v| v.search_key())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_keys(keys))
    }

    pub fn from_keys(keys: Vec<f64>) -> Self {
        let labels = (0..keys.len()).collect();
        Self { keys, labels }
    }
}

impl<L> NearestSearch<L> {
    /// Search over `values` with an explicit label per value.
    pub fn with_labels<K: SearchKey>(
        values: impl IntoIterator<Item = K>,
        labels: Vec<L>,
    ) -> Result<Self, SearchError> {
        let keys = values
            .into_iter()
            .map(|v| v.search_key())
            .collect::<Result<Vec<_>, _>>()?;
        if keys.len() != labels.len() {
            return Err(SearchError::LabelLengthMismatch {
                values: keys.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { keys, labels })
    }

    /// Caller guarantees `keys.len() == labels.len()`.
    pub(crate) fn from_labelled_keys(keys: Vec<f64>, labels: Vec<L>) -> Self {
        debug_assert_eq!(keys.len(), labels.len());
        Self { keys, labels }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[f64] {
        &self.keys
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Stable ascending sort of the (key, label) pairs.
    pub fn sort(&mut self) -> &mut Self {
        let mut pairs: Vec<(f64, L)> = std::mem::take(&mut self.keys)
            .into_iter()
            .zip(std::mem::take(&mut self.labels))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (keys, labels): (Vec<f64>, Vec<L>) = pairs.into_iter().unzip();
        self.keys = keys;
        self.labels = labels;
        self
    }
}

impl<L: Clone> NearestSearch<L> {
    /// Label of the key closest to `query`.
    ///
    /// Queries outside the key range clamp to the first or last element.
    /// When `query` is equidistant from its two neighbours the upper one wins.
    pub fn nearest_index<K: SearchKey>(&self, query: K) -> Result<L, SearchError> {
        if self.keys.is_empty() {
            return Err(SearchError::Empty);
        }
        let q = query.search_key()?;
        if q.is_nan() {
            return Err(SearchError::NotComparable);
        }

        // First position whose key is >= q.
        let i = self.keys.partition_point(|&k| k < q);
        let pos = if i == 0 {
            0
        } else if i == self.keys.len() {
            i - 1
        } else if (self.keys[i - 1] - q).abs() < (self.keys[i] - q).abs() {
            i - 1
        } else {
            i
        };
        Ok(self.labels[pos].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_integers() {
        let search = NearestSearch::new([1, 2, 3, 4, 5]).unwrap();
        assert_eq!(search.nearest_index(3).unwrap(), 2);
        assert_eq!(search.nearest_index(3.4).unwrap(), 2);
    }

    #[test]
    fn test_sorted_floats() {
        let search = NearestSearch::new([1.1, 2.2, 3.3, 4.4, 5.5]).unwrap();
        assert_eq!(search.nearest_index(3.9).unwrap(), 3);
        assert_eq!(search.nearest_index(3.5).unwrap(), 2);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let search = NearestSearch::new([1, 2, 3, 4, 5]).unwrap();
        assert_eq!(search.nearest_index(-10).unwrap(), 0);
        assert_eq!(search.nearest_index(1).unwrap(), 0);
        assert_eq!(search.nearest_index(5).unwrap(), 4);
        assert_eq!(search.nearest_index(100.0).unwrap(), 4);
    }

    #[test]
    fn test_tie_goes_to_upper_neighbour() {
        let search = NearestSearch::new([1, 2, 3, 4, 5]).unwrap();
        assert_eq!(search.nearest_index(2.5).unwrap(), 2);
    }

    #[test]
    fn test_sort_then_search_reports_original_labels() {
        let mut search = NearestSearch::new([3, 2, 4, 6, 1]).unwrap();
        search.sort();
        assert_eq!(search.keys(), &[1.0, 2.0, 3.0, 4.0, 6.0]);
        assert_eq!(search.labels(), &[4, 1, 0, 2, 3]);
        assert_eq!(search.nearest_index(3).unwrap(), 0);
        assert_eq!(search.nearest_index(5.5).unwrap(), 3);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut once = NearestSearch::new([3.0, 2.0, 2.0, 6.0, 1.0]).unwrap();
        once.sort();
        let mut twice = once.clone();
        twice.sort();
        assert_eq!(once, twice);
        // Stable: equal keys keep their input order.
        assert_eq!(once.labels(), &[4, 1, 2, 0, 3]);
    }

    #[test]
    fn test_explicit_labels() {
        let search =
            NearestSearch::with_labels([10.0, 20.0, 30.0], vec!["a", "b", "c"]).unwrap();
        assert_eq!(search.nearest_index(24.0).unwrap(), "b");

        let err = NearestSearch::with_labels([1.0, 2.0], vec![0]).unwrap_err();
        assert_eq!(err, SearchError::LabelLengthMismatch { values: 2, labels: 1 });
    }

    #[test]
    fn test_datetime_strings() {
        let search = NearestSearch::new([
            "2023-09-08 10:00:00",
            "2023-09-08 11:00:00",
            "2023-09-08 12:00:00",
        ])
        .unwrap();
        assert_eq!(search.nearest_index("2023-09-08 11:20:00").unwrap(), 1);
        assert_eq!(search.nearest_index("2023-09-08T11:40:00").unwrap(), 2);
        assert_eq!(search.nearest_index("2023-09-08T11:40:00+00:00").unwrap(), 2);
        assert_eq!(search.nearest_index("2023-09-07").unwrap(), 0);
    }

    #[test]
    fn test_datetime_values() {
        let at = |h| {
            NaiveDate::from_ymd_opt(2023, 9, 8)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        let search = NearestSearch::new([at(10), at(11), at(12)]).unwrap();
        assert_eq!(search.nearest_index(at(13)).unwrap(), 2);
        assert_eq!(search.nearest_index("2023/09/08 10:10:00").unwrap(), 0);
    }

    #[test]
    fn test_invalid_queries() {
        let search = NearestSearch::new([1.0, 2.0]).unwrap();
        assert_eq!(search.nearest_index(f64::NAN), Err(SearchError::NotComparable));
        assert!(matches!(
            search.nearest_index("yesterday"),
            Err(SearchError::InvalidTimestamp(_))
        ));

        let empty = NearestSearch::from_keys(Vec::new());
        assert_eq!(empty.nearest_index(1.0), Err(SearchError::Empty));
    }
}
