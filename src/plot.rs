//! Line plots of yearly series.

use crate::series::Series;
use anyhow::{Context, Result, anyhow, bail};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// Styling passed to [`render_line_plot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotTheme {
    pub width: u32,
    pub height: u32,
    pub caption: String,
    pub line_width: u32,
    pub line_style: LineStyle,
    /// Line colors as `#rrggbb`, reused in order when there are more series.
    pub colors: Vec<String>,
}

impl Default for PlotTheme {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 700,
            caption: String::new(),
            line_width: 2,
            line_style: LineStyle::Solid,
            colors: ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl PlotTheme {
    pub fn palette(&self) -> Result<Vec<RGBColor>> {
        self.colors
            .iter()
            .map(|color| parse_color(color).with_context(|| format!("invalid color {color:?}")))
            .collect()
    }
}

fn parse_color(color: &str) -> Result<RGBColor> {
    let hex = color
        .strip_prefix('#')
        .filter(|hex| hex.len() == 6 && hex.is_ascii())
        .context("color must be written as #rrggbb")?;
    let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16);
    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

fn draw_error<E: Display>(err: E) -> anyhow::Error {
    anyhow!("failed to draw plot: {err}")
}

/// Draw every series of `series_map` as an overlaid line and save it as SVG.
///
/// Non-finite values are left out of the lines.
pub fn render_line_plot<P: AsRef<Path>>(
    series_map: &BTreeMap<String, Series>,
    theme: &PlotTheme,
    file: P,
) -> Result<()> {
    let file = file.as_ref();
    if series_map.is_empty() {
        bail!("no series to plot");
    }
    let palette = theme.palette().context("invalid plot palette")?;
    if palette.is_empty() {
        bail!("plot palette has no colors");
    }

    let mut points: Vec<(&str, Vec<(i64, f64)>)> = Vec::with_capacity(series_map.len());
    for (name, series) in series_map {
        let finite: Vec<_> = series.iter().filter(|(_, val)| val.is_finite()).collect();
        if finite.len() < series.len() {
            log::warn!(
                "left {} non-finite values of {name:?} out of the plot",
                series.len() - finite.len()
            );
        }
        points.push((name.as_str(), finite));
    }

    let all_points = || points.iter().flat_map(|(_, pts)| pts.iter());
    let x_min = all_points().map(|&(year, _)| year).min().unwrap_or(0);
    let x_max = all_points().map(|&(year, _)| year).max().unwrap_or(0).max(x_min + 1);
    let y_min = all_points().map(|&(_, val)| val).fold(0.0, f64::min);
    let mut y_max = all_points().map(|&(_, val)| val).fold(0.0, f64::max);
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }

    let index_name = series_map
        .values()
        .next()
        .map_or("", |series| series.index_name());

    let root = SVGBackend::new(file, (theme.width, theme.height)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&theme.caption, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..(y_max * 1.1))
        .map_err(draw_error)?;

    chart
        .configure_mesh()
        .x_desc(index_name)
        .draw()
        .map_err(draw_error)?;

    for (i, (name, pts)) in points.into_iter().enumerate() {
        let style = palette[i % palette.len()].stroke_width(theme.line_width);
        let anno = match theme.line_style {
            LineStyle::Solid => chart.draw_series(LineSeries::new(pts, style)),
            LineStyle::Dashed => chart.draw_series(DashedLineSeries::new(pts, 10, 5, style)),
        }
        .map_err(draw_error)?;
        anno.label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_error)?;

    root.present().map_err(draw_error)?;
    log::info!("saved plot to {file:?}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::create_series;
    use std::{env, fs};

    #[test]
    fn parses_palette() {
        let theme = PlotTheme {
            colors: vec!["#ff8000".into(), "#0A0b0C".into()],
            ..PlotTheme::default()
        };

        let rgb: Vec<_> = theme.palette().unwrap().iter().map(|c| c.rgb()).collect();
        assert_eq!(rgb, [(255, 128, 0), (10, 11, 12)]);
    }

    #[test]
    fn rejects_bad_colors() {
        for color in ["red", "#fff", "#gg0000", "ff00000", "#ff00é"] {
            assert!(parse_color(color).is_err(), "accepted {color:?}");
        }
    }

    #[test]
    fn renders_overlaid_series() {
        let file = env::temp_dir().join("chronobin_renders_overlaid_series.svg");
        let mut series_map = BTreeMap::new();
        series_map.insert(
            "Site count".to_string(),
            create_series([(1990, 2.0), (1991, 3.0), (1992, 1.0)], "Site count", "Year"),
        );
        series_map.insert(
            "Frequency".to_string(),
            create_series([(1990, 0.5), (1991, f64::NAN), (1992, 0.2)], "Frequency", "Year"),
        );
        let theme = PlotTheme {
            caption: "Amphorae".into(),
            line_style: LineStyle::Dashed,
            ..PlotTheme::default()
        };

        render_line_plot(&series_map, &theme, &file).unwrap();

        let svg = fs::read_to_string(&file).unwrap();
        assert!(svg.contains("<svg"));
        fs::remove_file(&file).ok();
    }

    #[test]
    fn empty_map_is_an_error() {
        let file = env::temp_dir().join("chronobin_empty_map.svg");

        assert!(render_line_plot(&BTreeMap::new(), &PlotTheme::default(), file).is_err());
    }
}
