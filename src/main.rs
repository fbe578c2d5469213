// ==============================================================================
// main.rs - gwas-prep Entry Point
// ==============================================================================
// Description: Command-line front end for the GWAS input pipelines
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gwas_prep::cohort::{CohortBuilder, CohortParams};
use gwas_prep::config::StudyConfig;
use gwas_prep::covariates::CovariateAssembler;
use gwas_prep::manhattan::{self, ManhattanConfig};
use gwas_prep::models::{Ancestry, SexFilter, SignificanceColumn};
use gwas_prep::phenotype::{PhenotypeDefinition, PhenotypeLabeler};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the QC'd cohort identifier list
    Cohort {
        #[command(flatten)]
        study: StudyArgs,

        /// Withdrawal list, one identifier per line
        #[arg(long, env = "GWAS_EXCLUSIONS")]
        exclusions: PathBuf,

        /// Ancestry group (white_british)
        #[arg(long, default_value = "white_british")]
        ancestry: Ancestry,

        /// Sex filter (male, female or all)
        #[arg(long, default_value = "all")]
        sex: SexFilter,
    },

    /// Build the covariate file for a QC'd cohort
    Covariates {
        #[command(flatten)]
        study: StudyArgs,

        /// QC'd identifier file produced by `cohort`
        #[arg(long)]
        cohort: PathBuf,
    },

    /// Build a binary case/control phenotype file
    Phenotype(PhenotypeArgs),

    /// Render a Manhattan plot from association results
    Manhattan(ManhattanArgs),
}

#[derive(Args, Debug)]
struct StudyArgs {
    /// JSON study configuration (directories, table layout)
    #[arg(long, env = "GWAS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the field tables
    #[arg(long, env = "GWAS_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Directory receiving the generated files
    #[arg(long, env = "GWAS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Date stamped into output names (YYYY-MM-DD, default today)
    #[arg(long)]
    date: Option<NaiveDate>,
}

impl StudyArgs {
    /// Config file (or defaults), then command-line overrides
    fn load(self) -> Result<StudyConfig> {
        let mut config = match &self.config {
            Some(path) => StudyConfig::from_json_file(path)?,
            None => StudyConfig::default(),
        };

        if let Some(dir) = self.input_dir {
            config.input_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(date) = self.date {
            config.run_date = date;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct PhenotypeArgs {
    /// Diagnosis table keyed by subject identifier
    #[arg(long)]
    diagnosis: PathBuf,

    #[arg(long, env = "GWAS_OUTPUT_DIR")]
    output_dir: PathBuf,

    #[arg(long, default_value = "Patient EID")]
    id_column: String,

    #[arg(long, default_value = "C50")]
    diagnosis_column: String,

    /// Diagnosis value marking a case
    #[arg(long, default_value = "1")]
    case_code: String,

    /// Phenotype column name in the output
    #[arg(long, default_value = "Breast_cancer")]
    label: String,

    #[arg(long, default_value = "BC_pheno.txt")]
    output_name: String,

    #[arg(long, default_value = " ", value_parser = parse_delimiter)]
    sep: u8,
}

#[derive(Args, Debug)]
struct ManhattanArgs {
    /// GWAS summary statistics
    #[arg(long)]
    input: PathBuf,

    /// Directory for the plot
    #[arg(long)]
    outpath: PathBuf,

    #[arg(long, default_value = " ", value_parser = parse_delimiter)]
    sep: u8,

    #[arg(long, default_value = "Example")]
    title: String,

    /// Chromosome column
    #[arg(long = "chr", default_value = "CHROM")]
    chromosome: String,

    /// Base-pair position column
    #[arg(long = "pos", default_value = "GENPOS")]
    position: String,

    /// P-value column
    #[arg(long)]
    p: Option<String>,

    /// -log10(p-value) column
    #[arg(long)]
    neglog10p: Option<String>,

    /// Inner point diameter (pt)
    #[arg(long, default_value_t = 3.0)]
    size: f64,

    /// Point border width (pt)
    #[arg(long, alias = "stroke_size", default_value_t = 0.7)]
    stroke_size: f64,

    /// Figure width and height (inches)
    #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], default_values_t = [15.0, 6.0])]
    figsize: Vec<f64>,

    /// Genome-wide significance threshold
    #[arg(long, alias = "sig_threshold", default_value_t = 5e-8)]
    sig_threshold: f64,

    /// QQ plot toggle (accepted, not rendered)
    #[arg(long)]
    qq: bool,
}

impl ManhattanArgs {
    fn into_config(self) -> Result<ManhattanConfig> {
        let significance = SignificanceColumn::from_options(self.p, self.neglog10p)?;

        let figsize = match self.figsize.as_slice() {
            [w, h] => (*w, *h),
            _ => anyhow::bail!("--figsize takes exactly two values"),
        };

        let config = ManhattanConfig {
            title: self.title,
            chromosome_column: self.chromosome,
            position_column: self.position,
            significance,
            point_size: self.size,
            stroke_size: self.stroke_size,
            figsize,
            sig_threshold: self.sig_threshold,
            qq: self.qq,
            delimiter: self.sep,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Single-byte field separator; `\t` and `tab` name a tab
fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "\\t" | "tab" => Ok(b'\t'),
        _ if value.len() == 1 && value.is_ascii() => Ok(value.as_bytes()[0]),
        _ => Err(format!("separator must be a single ASCII character, got '{}'", value)),
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gwas_prep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Command::Cohort {
            study,
            exclusions,
            ancestry,
            sex,
        } => {
            let config = study.load()?;
            let params = CohortParams {
                ancestry,
                sex,
                exclusion_file: exclusions,
            };
            CohortBuilder::new(&config, params)
                .run()
                .context("Cohort assembly failed")?
        }

        Command::Covariates { study, cohort } => {
            let config = study.load()?;
            CovariateAssembler::new(&config, cohort)
                .run()
                .context("Covariate assembly failed")?
        }

        Command::Phenotype(args) => {
            let definition = PhenotypeDefinition {
                diagnosis_file: args.diagnosis,
                id_column: args.id_column,
                diagnosis_column: args.diagnosis_column,
                case_code: args.case_code,
                label_name: args.label,
                output_name: args.output_name,
                delimiter: args.sep,
            };
            PhenotypeLabeler::new(definition)
                .run(&args.output_dir)
                .context("Phenotype labelling failed")?
        }

        Command::Manhattan(args) => {
            let input = args.input.clone();
            let outpath = args.outpath.clone();
            let config = args.into_config()?;
            manhattan::run(&input, &outpath, &config).context("Manhattan plot failed")?
        }
    };

    info!("Output written to {:?}", output);
    Ok(())
}
