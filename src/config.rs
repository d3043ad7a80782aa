use crate::density::DENSITY_PER_YEAR;
use crate::plot::PlotTheme;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Names of the record table columns used by the metrics.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnsConfig {
    /// Earliest possible date of each record.
    pub lower_date: String,
    /// Latest possible date of each record.
    pub upper_date: String,
    /// Find density of each record, summed across sites.
    pub type_density: String,
    /// Sites where each record was found.
    pub site_list: String,
    /// Column written with the density per year.
    pub density_per_year: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            lower_date: "lower_date".into(),
            upper_date: "upper_date".into(),
            type_density: "type_density".into(),
            site_list: "site_list".into(),
            density_per_year: DENSITY_PER_YEAR.into(),
        }
    }
}

/// Metrics to compute and how to label their series.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub frequency: bool,
    pub site_count: bool,
    pub type_count: bool,
    /// Label of the year index of every series.
    pub index_name: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            frequency: true,
            site_count: true,
            type_count: true,
            index_name: "Year".into(),
        }
    }
}

/// Analysis configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub columns: ColumnsConfig,
    pub metrics: MetricsConfig,
    pub plot: PlotTheme,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Missing sections and keys take their default values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let cols = &self.columns;
        for (key, name) in [
            ("lower_date", &cols.lower_date),
            ("upper_date", &cols.upper_date),
            ("type_density", &cols.type_density),
            ("site_list", &cols.site_list),
            ("density_per_year", &cols.density_per_year),
        ] {
            check_name(name).with_context(|| format!("invalid {key} column"))?;
        }
        if cols.lower_date == cols.upper_date {
            bail!("lower and upper date columns must differ");
        }
        let inputs = [&cols.lower_date, &cols.upper_date, &cols.type_density];
        if inputs.contains(&&cols.density_per_year) {
            bail!("density per year column must not overwrite an input column");
        }

        let metrics = &self.metrics;
        if !(metrics.frequency || metrics.site_count || metrics.type_count) {
            bail!("at least one metric must be enabled");
        }
        check_name(&metrics.index_name).context("invalid index name")?;

        let plot = &self.plot;
        check_num(plot.width, 100..10_000).context("invalid plot width")?;
        check_num(plot.height, 100..10_000).context("invalid plot height")?;
        check_num(plot.line_width, 1..20).context("invalid line width")?;
        if plot.colors.is_empty() {
            bail!("plot palette must have at least one color");
        }
        plot.palette().context("invalid plot palette")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("name must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::LineStyle;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.columns.density_per_year, "density_per_year");
        assert_eq!(config.metrics.index_name, "Year");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml(
            r##"
[columns]
lower_date = "start"
upper_date = "end"

[metrics]
site_count = false

[plot]
line_style = "dashed"
colors = ["#000000"]
"##,
        )
        .unwrap();

        assert_eq!(config.columns.lower_date, "start");
        assert_eq!(config.columns.site_list, "site_list");
        assert!(!config.metrics.site_count);
        assert!(config.metrics.frequency);
        assert_eq!(config.plot.line_style, LineStyle::Dashed);
        assert_eq!(config.plot.colors, ["#000000"]);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for contents in [
            "[columns]\nlower_date = \"date\"\nupper_date = \"date\"\n",
            "[columns]\nsite_list = \" \"\n",
            "[columns]\ndensity_per_year = \"type_density\"\n",
            "[metrics]\nfrequency = false\nsite_count = false\ntype_count = false\n",
            "[plot]\nwidth = 20\n",
            "[plot]\nline_width = 0\n",
            "[plot]\ncolors = []\n",
            "[plot]\ncolors = [\"blue\"]\n",
            "[output]\nformat = \"csv\"\n",
        ] {
            assert!(Config::from_toml(contents).is_err(), "accepted {contents:?}");
        }
    }
}
