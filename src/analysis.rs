use crate::binning::{
    Aggregate, year_freq_series, year_site_count_series, year_type_count_series,
};
use crate::config::{ColumnsConfig, Config};
use crate::density::dens_per_year;
use crate::series::Series;
use crate::stats::SeriesSummary;
use crate::table::RecordTable;
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

pub trait Metric {
    fn name(&self) -> &str;
    fn compute(&self, table: &RecordTable) -> Result<Aggregate>;
}

/// Density per year summed across the types existing each year.
pub struct Frequency {
    cols: ColumnsConfig,
    index_name: String,
}

impl Frequency {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cols: cfg.columns.clone(),
            index_name: cfg.metrics.index_name.clone(),
        }
    }
}

impl Metric for Frequency {
    fn name(&self) -> &str {
        "Frequency"
    }

    fn compute(&self, table: &RecordTable) -> Result<Aggregate> {
        let cols = &self.cols;
        let mut table = table.clone();
        dens_per_year(
            &mut table,
            &cols.type_density,
            &cols.lower_date,
            &cols.upper_date,
            &cols.density_per_year,
        )
        .context("failed to compute density per year")?;

        let agg = year_freq_series(
            &table,
            &cols.lower_date,
            &cols.upper_date,
            &cols.density_per_year,
            self.name(),
            &self.index_name,
        )?;
        Ok(agg)
    }
}

/// Number of distinct sites with records existing each year.
pub struct SiteCount {
    cols: ColumnsConfig,
    index_name: String,
}

impl SiteCount {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cols: cfg.columns.clone(),
            index_name: cfg.metrics.index_name.clone(),
        }
    }
}

impl Metric for SiteCount {
    fn name(&self) -> &str {
        "Site count"
    }

    fn compute(&self, table: &RecordTable) -> Result<Aggregate> {
        let cols = &self.cols;
        let agg = year_site_count_series(
            table,
            &cols.lower_date,
            &cols.upper_date,
            &cols.site_list,
            self.name(),
            &self.index_name,
        )?;
        Ok(agg)
    }
}

/// Number of records existing each year.
pub struct TypeCount {
    cols: ColumnsConfig,
    index_name: String,
}

impl TypeCount {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cols: cfg.columns.clone(),
            index_name: cfg.metrics.index_name.clone(),
        }
    }
}

impl Metric for TypeCount {
    fn name(&self) -> &str {
        "Type count"
    }

    fn compute(&self, table: &RecordTable) -> Result<Aggregate> {
        let cols = &self.cols;
        let agg = year_type_count_series(
            table,
            &cols.lower_date,
            &cols.upper_date,
            self.name(),
            &self.index_name,
        )?;
        Ok(agg)
    }
}

/// Result of one metric as stored in the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub series: Series,
    pub n_skipped: usize,
    pub summary: SeriesSummary,
}

impl From<Aggregate> for MetricReport {
    fn from(agg: Aggregate) -> Self {
        let summary = SeriesSummary::new(&agg.series);
        Self {
            series: agg.series,
            n_skipped: agg.n_skipped,
            summary,
        }
    }
}

pub struct Analyzer {
    metric_ptr_vec: Vec<Box<dyn Metric>>,
}

impl Analyzer {
    /// Create an `Analyzer` running the metrics enabled in `cfg`.
    pub fn new(cfg: &Config) -> Self {
        let mut metric_ptr_vec: Vec<Box<dyn Metric>> = Vec::new();
        if cfg.metrics.frequency {
            metric_ptr_vec.push(Box::new(Frequency::new(cfg)));
        }
        if cfg.metrics.site_count {
            metric_ptr_vec.push(Box::new(SiteCount::new(cfg)));
        }
        if cfg.metrics.type_count {
            metric_ptr_vec.push(Box::new(TypeCount::new(cfg)));
        }
        Self { metric_ptr_vec }
    }

    pub fn analyze(&self, table: &RecordTable) -> Result<Vec<MetricReport>> {
        let mut reports = Vec::with_capacity(self.metric_ptr_vec.len());
        for metric in &self.metric_ptr_vec {
            let agg = metric
                .compute(table)
                .with_context(|| format!("failed to compute {:?}", metric.name()))?;
            log::info!(
                "computed {:?} over {} years",
                metric.name(),
                agg.series.len()
            );
            reports.push(MetricReport::from(agg));
        }
        Ok(reports)
    }
}

/// Save the metric reports to a MessagePack file.
pub fn save_reports<P: AsRef<Path>>(reports: &[MetricReport], file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);

    encode::write(&mut writer, reports).context("failed to serialize reports")?;

    writer.flush().context("failed to flush writer stream")?;

    Ok(())
}

/// Load metric reports saved by [`save_reports`].
pub fn load_reports<P: AsRef<Path>>(file: P) -> Result<Vec<MetricReport>> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let reader = BufReader::new(file);

    decode::from_read(reader).context("failed to deserialize reports")
}

/// Map each report series by its name, as expected by the plot renderer.
pub fn series_map(reports: Vec<MetricReport>) -> BTreeMap<String, Series> {
    reports
        .into_iter()
        .map(|report| (report.series.name().to_string(), report.series))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnData;
    use std::env;

    fn table() -> RecordTable {
        RecordTable::new()
            .with_column(
                "lower_date",
                ColumnData::Numeric(vec![Some(-20.0), Some(0.0), None]),
            )
            .unwrap()
            .with_column(
                "upper_date",
                ColumnData::Numeric(vec![Some(20.0), Some(10.0), Some(30.0)]),
            )
            .unwrap()
            .with_column(
                "type_density",
                ColumnData::Numeric(vec![Some(8.0), Some(5.0), Some(1.0)]),
            )
            .unwrap()
            .with_column(
                "site_list",
                ColumnData::Sites(vec![
                    vec!["Ostia".into(), "Ampurias".into()],
                    vec!["Ostia".into()],
                    vec!["Marseille".into()],
                ]),
            )
            .unwrap()
    }

    #[test]
    fn runs_enabled_metrics_in_order() {
        let mut cfg = Config::default();
        cfg.metrics.site_count = false;
        let reports = Analyzer::new(&cfg).analyze(&table()).unwrap();

        let names: Vec<_> = reports.iter().map(|r| r.series.name()).collect();
        assert_eq!(names, ["Frequency", "Type count"]);

        let freq = &reports[0];
        assert_eq!(freq.n_skipped, 1);
        assert_eq!(freq.series.len(), 50);
        assert_eq!(freq.series.get(-20), Some(0.2));
        assert_eq!(freq.series.get(5), Some(0.7));
        assert_eq!(freq.series.get(25), Some(0.0));
        assert_eq!(freq.summary.peak_year, Some(0));
    }

    #[test]
    fn frequency_leaves_input_table_untouched() {
        let table = table();
        Frequency::new(&Config::default()).compute(&table).unwrap();

        assert!(table.numeric("density_per_year").is_err());
    }

    #[test]
    fn missing_column_names_the_metric() {
        let mut cfg = Config::default();
        cfg.columns.site_list = "sites".into();
        let err = Analyzer::new(&cfg).analyze(&table()).unwrap_err();

        assert!(format!("{err:#}").contains("Site count"));
        assert!(format!("{err:#}").contains("sites"));
    }

    #[test]
    fn reports_survive_save_and_load() {
        let file = env::temp_dir().join("chronobin_reports_survive_save_and_load.msgpack");
        let reports = Analyzer::new(&Config::default())
            .analyze(&table())
            .unwrap();

        save_reports(&reports, &file).unwrap();
        let loaded = load_reports(&file).unwrap();
        std::fs::remove_file(&file).ok();

        assert_eq!(loaded, reports);
        let map = series_map(loaded);
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            ["Frequency", "Site count", "Type count"]
        );
        assert_eq!(map["Site count"].get(5), Some(2.0));
    }
}
