// ==============================================================================
// models.rs - Shared Study Data Models
// ==============================================================================
// Description: Subject, chromosome and variant types shared by both pipelines
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// Numeric chromosome code used for the X chromosome
pub const X_CHROMOSOME: u8 = 23;

/// Subject identifier (UK Biobank `eid`), kept verbatim from the source table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Sex filter applied during cohort assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SexFilter {
    /// Keep subjects with genetic sex code 1
    Male,
    /// Keep subjects with genetic sex code 0
    Female,
    /// No sex filtering
    All,
}

impl SexFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SexFilter::Male => "male",
            SexFilter::Female => "female",
            SexFilter::All => "all",
        }
    }

    /// Genetic sex code a subject must carry to pass, `None` when unfiltered
    pub fn required_code(&self) -> Option<f64> {
        match self {
            SexFilter::Male => Some(1.0),
            SexFilter::Female => Some(0.0),
            SexFilter::All => None,
        }
    }
}

impl FromStr for SexFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(SexFilter::Male),
            "female" => Ok(SexFilter::Female),
            "all" => Ok(SexFilter::All),
            _ => Err(ConfigError::UnknownSexFilter(s.to_string())),
        }
    }
}

impl fmt::Display for SexFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ancestry group with a defined QC rule. Only White British is defined:
/// a non-missing genetic ethnic grouping (field 22006) joined with a
/// complete self-reported ethnic background (field 21000).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ancestry {
    #[default]
    WhiteBritish,
}

impl Ancestry {
    pub fn white_british() -> Self {
        Ancestry::WhiteBritish
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ancestry::WhiteBritish => "white_british",
        }
    }
}

impl FromStr for Ancestry {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "white_british" => Ok(Ancestry::WhiteBritish),
            _ => Err(ConfigError::UnsupportedAncestry(s.to_string())),
        }
    }
}

impl fmt::Display for Ancestry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chromosome normalized to a numeric code (X = 23)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Chromosome(u8);

impl Chromosome {
    pub fn new(number: u8) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// Axis label: the numeral, or "X" for chromosome 23
    pub fn label(&self) -> String {
        if self.0 == X_CHROMOSOME {
            "X".to_string()
        } else {
            self.0.to_string()
        }
    }

    /// Normalize a chromosome token: "X" maps to 23, anything else must be
    /// a non-negative integral number ("7", "7.0").
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();

        if token == "X" {
            return Some(Self(X_CHROMOSOME));
        }

        if let Ok(n) = token.parse::<u8>() {
            return Some(Self(n));
        }

        match token.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&v) => {
                Some(Self(v as u8))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Which summary-statistics column carries the significance value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignificanceColumn {
    /// Raw p-value column, transformed to -log10(p) on load
    PValue(String),
    /// Column already holding -log10(p)
    NegLog10P(String),
}

impl SignificanceColumn {
    /// Build from the two mutually exclusive CLI options
    pub fn from_options(
        p: Option<String>,
        neglog10p: Option<String>,
    ) -> Result<Self, ConfigError> {
        match (p, neglog10p) {
            (Some(p), Some(neglog10p)) => {
                Err(ConfigError::BothSignificanceColumns { p, neglog10p })
            }
            (Some(p), None) => Ok(SignificanceColumn::PValue(p)),
            (None, Some(neglog10p)) => Ok(SignificanceColumn::NegLog10P(neglog10p)),
            (None, None) => Err(ConfigError::NoSignificanceColumn),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            SignificanceColumn::PValue(c) | SignificanceColumn::NegLog10P(c) => c,
        }
    }
}

/// One tested variant, significance already on the -log10 scale. A variant
/// without a significance value still counts toward its chromosome's extent
/// but is not drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    pub chromosome: Chromosome,
    pub position: u64,
    pub neglog10_p: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sex_filter_tokens() {
        assert_eq!("male".parse::<SexFilter>().unwrap(), SexFilter::Male);
        assert_eq!("Female".parse::<SexFilter>().unwrap(), SexFilter::Female);
        assert_eq!(" all ".parse::<SexFilter>().unwrap(), SexFilter::All);
        assert!(matches!(
            "both".parse::<SexFilter>(),
            Err(ConfigError::UnknownSexFilter(_))
        ));
    }

    #[test]
    fn test_sex_filter_codes() {
        assert_eq!(SexFilter::Male.required_code(), Some(1.0));
        assert_eq!(SexFilter::Female.required_code(), Some(0.0));
        assert_eq!(SexFilter::All.required_code(), None);
    }

    #[test]
    fn test_ancestry_label() {
        assert_eq!(Ancestry::default().as_str(), "white_british");
        assert_eq!("white_british".parse::<Ancestry>().unwrap(), Ancestry::WhiteBritish);
        // No QC rule exists for other groups
        assert!(matches!(
            "south_asian".parse::<Ancestry>(),
            Err(ConfigError::UnsupportedAncestry(label)) if label == "south_asian"
        ));
        assert!("".parse::<Ancestry>().is_err());
    }

    #[test]
    fn test_chromosome_normalization() {
        assert_eq!(Chromosome::parse("X"), Some(Chromosome::new(23)));
        assert_eq!(Chromosome::parse("7"), Some(Chromosome::new(7)));
        assert_eq!(Chromosome::parse("7.0"), Some(Chromosome::new(7)));
        assert_eq!(Chromosome::parse("chr7"), None);
        assert_eq!(Chromosome::parse("7.5"), None);
        assert_eq!(Chromosome::parse("-1"), None);

        assert_eq!(Chromosome::new(23).label(), "X");
        assert_eq!(Chromosome::new(9).label(), "9");
    }

    #[test]
    fn test_significance_column_exclusivity() {
        assert_eq!(
            SignificanceColumn::from_options(Some("P".into()), None).unwrap(),
            SignificanceColumn::PValue("P".into())
        );
        assert_eq!(
            SignificanceColumn::from_options(None, Some("LOG10P".into())).unwrap(),
            SignificanceColumn::NegLog10P("LOG10P".into())
        );
        assert!(matches!(
            SignificanceColumn::from_options(Some("P".into()), Some("LOG10P".into())),
            Err(ConfigError::BothSignificanceColumns { .. })
        ));
        assert!(matches!(
            SignificanceColumn::from_options(None, None),
            Err(ConfigError::NoSignificanceColumn)
        ));
    }
}
