// ==============================================================================
// manhattan/mod.rs - Manhattan Plot Pipeline
// ==============================================================================
// Description: Reads association results, lays out variants, renders a PNG
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

pub mod layout;
pub mod render;

pub use layout::{ChromosomeTick, ManhattanLayout, PlacedVariant, PALETTE};
pub use render::RenderOptions;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::models::SignificanceColumn;
use crate::parsers::AssociationReader;
use crate::validator::InputValidator;

/// Renderer options; the significance column is resolved up front so a
/// config cannot hold both or neither
#[derive(Debug, Clone, PartialEq)]
pub struct ManhattanConfig {
    pub title: String,
    pub chromosome_column: String,
    pub position_column: String,
    pub significance: SignificanceColumn,
    pub point_size: f64,
    pub stroke_size: f64,
    pub figsize: (f64, f64),
    pub sig_threshold: f64,
    /// Accepted for command-line compatibility; no QQ plot is drawn
    pub qq: bool,
    pub delimiter: u8,
}

impl ManhattanConfig {
    pub fn new(significance: SignificanceColumn) -> Self {
        Self {
            title: "Example".to_string(),
            chromosome_column: "CHROM".to_string(),
            position_column: "GENPOS".to_string(),
            significance,
            point_size: 3.0,
            stroke_size: 0.7,
            figsize: (15.0, 6.0),
            sig_threshold: 5e-8,
            qq: false,
            delimiter: b' ',
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |option, reason: &str| {
            Err(ConfigError::InvalidOption {
                option,
                reason: reason.to_string(),
            })
        };

        if self.title.is_empty() || self.title.contains(['/', '\\']) {
            return invalid("--title", "must be non-empty and contain no path separators");
        }
        if !(self.point_size > 0.0 && self.point_size.is_finite()) {
            return invalid("--size", "must be a positive number");
        }
        if !(self.stroke_size >= 0.0 && self.stroke_size.is_finite()) {
            return invalid("--stroke-size", "must be zero or positive");
        }
        let (w, h) = self.figsize;
        if !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite()) {
            return invalid("--figsize", "width and height must be positive");
        }
        if !(self.sig_threshold > 0.0 && self.sig_threshold <= 1.0) {
            return invalid("--sig-threshold", "must be in (0, 1]");
        }
        Ok(())
    }

    /// `<outpath>/<title>_manhattan_plot.png`
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(format!("{}_manhattan_plot.png", self.title))
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            title: self.title.clone(),
            figsize: self.figsize,
            point_size: self.point_size,
            stroke_size: self.stroke_size,
            threshold_y: layout::threshold_y(self.sig_threshold),
        }
    }

    fn log_banner(&self, input: &Path, output_dir: &Path) {
        let (p, neglog10p) = match &self.significance {
            SignificanceColumn::PValue(c) => (c.as_str(), "-"),
            SignificanceColumn::NegLog10P(c) => ("-", c.as_str()),
        };

        info!("Input file:                 {:?}", input);
        info!("Output path:                {:?}", output_dir);
        info!("Title:                      {}", self.title);
        info!("Chromosome column:          {}", self.chromosome_column);
        info!("Position column:            {}", self.position_column);
        info!("P-value column:             {}", p);
        info!("Neglog10(p-value) column:   {}", neglog10p);
        info!("Size:                       {}", self.point_size);
        info!("Stroke size:                {}", self.stroke_size);
        info!("Figure size:                {:?}", self.figsize);
        info!("Significance threshold:     {:e}", self.sig_threshold);
        info!("Show QQ plot:               {}", self.qq);
    }
}

/// Read, lay out and render. Configuration is checked before any file is
/// touched.
pub fn run(input: &Path, output_dir: &Path, config: &ManhattanConfig) -> Result<PathBuf> {
    config.validate()?;
    config.log_banner(input, output_dir);

    if config.qq {
        warn!("QQ plot requested; only the Manhattan plot is produced");
    }

    InputValidator::new()
        .validate(input)
        .context("Association results validation failed")?;

    let reader = AssociationReader::new(
        config.chromosome_column.as_str(),
        config.position_column.as_str(),
        config.significance.clone(),
        config.delimiter,
    );
    let variants = reader
        .read(input)
        .with_context(|| format!("Failed to read association results {:?}", input))?;
    info!("Loaded {} variants", variants.len());

    let layout = ManhattanLayout::compute(&variants);
    info!(
        "Laid out {} chromosomes over {} bp",
        layout.ticks.len(),
        layout.final_offset
    );

    let path = render::render_png(&layout, &config.render_options(), &config.output_path(output_dir))?;

    info!("Manhattan plot saved to {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn p_config() -> ManhattanConfig {
        ManhattanConfig::new(SignificanceColumn::PValue("P".into()))
    }

    #[test]
    fn test_defaults() {
        let config = p_config();
        assert_eq!(config.title, "Example");
        assert_eq!(config.chromosome_column, "CHROM");
        assert_eq!(config.position_column, "GENPOS");
        assert_eq!(config.figsize, (15.0, 6.0));
        assert_eq!(config.sig_threshold, 5e-8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_path_uses_title() {
        let mut config = p_config();
        config.title = "BC".to_string();
        assert_eq!(
            config.output_path(Path::new("/plots")),
            PathBuf::from("/plots/BC_manhattan_plot.png")
        );
    }

    #[test]
    fn test_invalid_options_rejected() {
        let mut config = p_config();
        config.sig_threshold = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { option: "--sig-threshold", .. })
        ));

        let mut config = p_config();
        config.figsize = (15.0, -1.0);
        assert!(config.validate().is_err());

        let mut config = p_config();
        config.title = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("plots");

        let mut config = p_config();
        config.point_size = -3.0;

        // The input does not exist either; the config error must come first
        let err = run(&dir.path().join("missing.regenie"), &out, &config).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(!out.exists());
    }

    #[test]
    fn test_bad_chromosome_leaves_no_image() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("results.txt");
        std::fs::write(&input, "CHROM GENPOS P\n1 100 0.01\nMT 5 0.2\n").unwrap();

        let out = dir.path().join("plots");
        assert!(run(&input, &out, &p_config()).is_err());
        assert!(!p_config().output_path(&out).exists());
    }

    #[test]
    fn test_missing_p_values_keep_chromosome_extent() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("results.txt");
        std::fs::write(&input, "CHROM GENPOS P\n1 100 1e-9\n1 900 NA\n2 50 1e-10\n").unwrap();

        let variants = AssociationReader::new("CHROM", "GENPOS", SignificanceColumn::PValue("P".into()), b' ')
            .read(&input)
            .unwrap();
        let layout = ManhattanLayout::compute(&variants);

        assert_eq!(layout.ticks[0].x, 500.0);
        assert_eq!(layout.points.last().unwrap().x, 950.0);
        assert_eq!(layout.final_offset, 950.0);
    }

    #[test]
    #[ignore = "needs a system sans-serif font"]
    fn test_render_png() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("results.txt");
        let mut file = std::fs::File::create(&input).unwrap();
        writeln!(file, "CHROM GENPOS P").unwrap();
        writeln!(file, "1 100 1e-9").unwrap();
        writeln!(file, "1 500 0.5").unwrap();
        writeln!(file, "X 50 1e-10").unwrap();
        drop(file);

        let mut config = p_config();
        config.figsize = (3.0, 1.5);

        let path = run(&input, dir.path(), &config).unwrap();
        assert!(path.ends_with("Example_manhattan_plot.png"));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}
