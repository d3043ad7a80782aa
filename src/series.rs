use serde::{Deserialize, Serialize};

/// One-dimensional year-indexed series with a name and a labeled index.
///
/// Years are kept in ascending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: String,
    index_name: String,
    years: Vec<i64>,
    vals: Vec<f64>,
}

impl Series {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> &[i64] {
        &self.years
    }

    pub fn values(&self) -> &[f64] {
        &self.vals
    }

    pub fn first_year(&self) -> Option<i64> {
        self.years.first().copied()
    }

    pub fn last_year(&self) -> Option<i64> {
        self.years.last().copied()
    }

    /// Value stored for `year`, if the year is part of the index.
    pub fn get(&self, year: i64) -> Option<f64> {
        self.years
            .binary_search(&year)
            .ok()
            .map(|idx| self.vals[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.years.iter().copied().zip(self.vals.iter().copied())
    }
}

/// Create a [`Series`] from `(year, value)` pairs.
///
/// Pairs are sorted by year; a repeated year keeps its last value.
pub fn create_series<I>(data: I, name: &str, index_name: &str) -> Series
where
    I: IntoIterator<Item = (i64, f64)>,
{
    let mut pairs: Vec<_> = data.into_iter().collect();
    pairs.sort_by_key(|&(year, _)| year);

    let mut years: Vec<i64> = Vec::with_capacity(pairs.len());
    let mut vals: Vec<f64> = Vec::with_capacity(pairs.len());
    for (year, val) in pairs {
        if years.last() == Some(&year) {
            if let Some(last) = vals.last_mut() {
                *last = val;
            }
            continue;
        }
        years.push(year);
        vals.push(val);
    }

    Series {
        name: name.into(),
        index_name: index_name.into(),
        years,
        vals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn keeps_ascending_years_and_labels() {
        let series = create_series([(1995, 2.0), (1990, 1.0), (1992, 0.0)], "Frequency", "Year");

        assert_eq!(series.name(), "Frequency");
        assert_eq!(series.index_name(), "Year");
        assert_eq!(series.years(), [1990, 1992, 1995]);
        assert_eq!(series.values(), [1.0, 0.0, 2.0]);
        assert_eq!(series.get(1992), Some(0.0));
        assert_eq!(series.get(1991), None);
        assert_eq!((series.first_year(), series.last_year()), (Some(1990), Some(1995)));
    }

    #[test]
    fn accepts_a_year_map() {
        let map: BTreeMap<i64, f64> = (-5..-2).map(|year| (year, year as f64)).collect();
        let series = create_series(map, "Site count", "Year");

        assert_eq!(series.iter().collect::<Vec<_>>(), [(-5, -5.0), (-4, -4.0), (-3, -3.0)]);
    }

    #[test]
    fn repeated_year_keeps_last_value() {
        let series = create_series([(1, 1.0), (1, 3.0)], "s", "Year");

        assert_eq!(series.len(), 1);
        assert_eq!(series.get(1), Some(3.0));
    }
}
