use crate::analysis::{Analyzer, load_reports, save_reports, series_map};
use crate::config::Config;
use crate::plot::render_line_plot;
use crate::table::RecordTable;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct Manager {
    data_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();

        let cfg = Config::from_file(data_dir.join("config.toml"))
            .context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { data_dir, cfg })
    }

    pub fn run_analysis(&self) -> Result<()> {
        let record_files = self
            .record_files()
            .context("failed to collect record files")?;
        if record_files.is_empty() {
            bail!("no record files found in {:?}", self.data_dir);
        }

        let table =
            RecordTable::from_files(&record_files).context("failed to load record table")?;
        log::info!("loaded {} records", table.n_rows());

        let reports = Analyzer::new(&self.cfg)
            .analyze(&table)
            .context("failed to analyze records")?;

        let results_file = self.results_file();
        save_reports(&reports, &results_file).context("failed to save results")?;
        log::info!("saved {results_file:?}");

        Ok(())
    }

    pub fn run_plot(&self) -> Result<()> {
        let results_file = self.results_file();
        let reports = load_reports(&results_file)
            .with_context(|| format!("failed to load {results_file:?}"))?;

        render_line_plot(&series_map(reports), &self.cfg.plot, self.plot_file())
            .context("failed to render plot")?;

        Ok(())
    }

    pub fn clean(&self) -> Result<()> {
        for file in [self.results_file(), self.plot_file()] {
            if file.exists() {
                fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
                log::info!("removed {file:?}");
            }
        }

        Ok(())
    }

    fn record_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.data_dir.join("records-*.toml");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut files: Vec<_> = glob(pattern)
            .context("failed to glob record files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    fn results_file(&self) -> PathBuf {
        self.data_dir.join("results.msgpack")
    }

    fn plot_file(&self) -> PathBuf {
        self.data_dir.join("series.svg")
    }
}
