use crate::error::TableResult;
use crate::table::{ColumnData, RecordTable};

/// Default name of the derived rate column.
pub const DENSITY_PER_YEAR: &str = "density_per_year";

/// Compute the density per year of every record and store it in `output`.
///
/// The rate is `quantity / (upper - lower)`. A null in any input cell gives a
/// null rate. Records with `upper == lower` get a non-finite rate which is
/// kept as is; use [`degenerate_rows`] to find them.
///
/// The column is written in place, so the table must not be shared while
/// this runs.
pub fn dens_per_year<'a>(
    table: &'a mut RecordTable,
    quantity: &str,
    lower: &str,
    upper: &str,
    output: &str,
) -> TableResult<&'a mut RecordTable> {
    let quantity_vals = table.numeric(quantity)?;
    let lower_vals = table.numeric(lower)?;
    let upper_vals = table.numeric(upper)?;

    let rates: Vec<_> = quantity_vals
        .iter()
        .zip(lower_vals)
        .zip(upper_vals)
        .map(|((&q, &l), &u)| Some(q? / (u? - l?)))
        .collect();

    let n_degenerate = rates.iter().flatten().filter(|r| !r.is_finite()).count();
    if n_degenerate > 0 {
        log::warn!("{n_degenerate} records have a non-finite {output:?} value");
    }

    table.set_column(output, ColumnData::Numeric(rates))?;
    Ok(table)
}

/// Indices of the rows whose value in `column` is present but not finite.
pub fn degenerate_rows(table: &RecordTable, column: &str) -> TableResult<Vec<usize>> {
    let vals = table.numeric(column)?;
    Ok(vals
        .iter()
        .enumerate()
        .filter_map(|(idx, val)| match val {
            Some(val) if !val.is_finite() => Some(idx),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TableError;

    fn table() -> RecordTable {
        RecordTable::new()
            .with_column(
                "type_density",
                ColumnData::Numeric(vec![Some(10.0), Some(4.0), None, Some(3.0)]),
            )
            .unwrap()
            .with_column(
                "lower_date",
                ColumnData::Numeric(vec![Some(-50.0), Some(100.0), Some(0.0), Some(1.0)]),
            )
            .unwrap()
            .with_column(
                "upper_date",
                ColumnData::Numeric(vec![Some(50.0), Some(100.0), Some(10.0), None]),
            )
            .unwrap()
    }

    #[test]
    fn appends_rates_in_row_order() {
        let mut table = table();
        dens_per_year(
            &mut table,
            "type_density",
            "lower_date",
            "upper_date",
            DENSITY_PER_YEAR,
        )
        .unwrap();

        let rates = table.numeric(DENSITY_PER_YEAR).unwrap();
        assert_eq!(table.n_rows(), 4);
        assert_eq!(rates[0], Some(0.1));
        assert_eq!(rates[2], None);
        assert_eq!(rates[3], None);
    }

    #[test]
    fn degenerate_interval_propagates_non_finite_rate() {
        let mut table = table();
        dens_per_year(&mut table, "type_density", "lower_date", "upper_date", "rate").unwrap();

        let rate = table.numeric("rate").unwrap()[1].unwrap();
        assert!(rate.is_infinite());
        assert_eq!(degenerate_rows(&table, "rate").unwrap(), [1]);
    }

    #[test]
    fn zero_quantity_on_degenerate_interval_is_nan() {
        let mut table = RecordTable::new()
            .with_column("q", ColumnData::Numeric(vec![Some(0.0)]))
            .unwrap()
            .with_column("l", ColumnData::Numeric(vec![Some(5.0)]))
            .unwrap()
            .with_column("u", ColumnData::Numeric(vec![Some(5.0)]))
            .unwrap();
        dens_per_year(&mut table, "q", "l", "u", DENSITY_PER_YEAR).unwrap();

        assert!(table.numeric(DENSITY_PER_YEAR).unwrap()[0].unwrap().is_nan());
    }

    #[test]
    fn missing_column_is_fatal() {
        let mut table = table();
        let err = dens_per_year(&mut table, "density", "lower_date", "upper_date", "rate")
            .unwrap_err();

        assert_eq!(
            err,
            TableError::MissingColumn {
                name: "density".into()
            }
        );
        assert!(table.numeric("rate").is_err());
    }
}
