// ==============================================================================
// layout.rs - Genomic Coordinate Layout
// ==============================================================================
// Description: Places variants from all chromosomes on one continuous x axis
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Chromosomes are laid out in ascending numeric order. Each chromosome's
// variants sit at `position + offset`; after a chromosome is placed the offset
// advances by that chromosome's largest position.
// ==============================================================================

use std::collections::BTreeMap;
use std::ops::Range;

use crate::models::{Chromosome, VariantRecord};

/// Fill colors, picked by `chromosome % 5`
pub const PALETTE: [(u8, u8, u8); 5] = [
    (0xdb, 0x6e, 0x64),
    (0xd1, 0x6d, 0x3b),
    (0xf4, 0xdc, 0x65),
    (0x31, 0xa8, 0x68),
    (0xb0, 0x7a, 0xa1),
];

/// Margin either side of the x axis, as a fraction of the final offset
const X_MARGIN: f64 = 0.007;
/// Headroom above the tallest point or the threshold line
const Y_HEADROOM: f64 = 1.05;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedVariant {
    pub chromosome: Chromosome,
    pub x: f64,
    pub y: f64,
}

impl PlacedVariant {
    pub fn color(&self) -> (u8, u8, u8) {
        PALETTE[usize::from(self.chromosome.number()) % PALETTE.len()]
    }
}

/// Axis tick at a chromosome's midpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ChromosomeTick {
    pub chromosome: Chromosome,
    pub x: f64,
    pub label: String,
    /// Indices into `ManhattanLayout::points` for this chromosome's drawn
    /// variants (may be empty)
    pub points: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManhattanLayout {
    pub points: Vec<PlacedVariant>,
    pub ticks: Vec<ChromosomeTick>,
    /// Running offset after the last chromosome
    pub final_offset: f64,
    pub max_y: f64,
}

impl ManhattanLayout {
    pub fn compute(variants: &[VariantRecord]) -> Self {
        let mut by_chrom: BTreeMap<Chromosome, Vec<&VariantRecord>> = BTreeMap::new();
        for variant in variants {
            by_chrom.entry(variant.chromosome).or_default().push(variant);
        }

        let mut offset = 0.0_f64;
        let mut points = Vec::with_capacity(variants.len());
        let mut ticks = Vec::with_capacity(by_chrom.len());
        let mut max_y = 0.0_f64;

        for (chromosome, mut chrom_variants) in by_chrom {
            // Stable sort keeps input order for equal positions
            chrom_variants.sort_by_key(|v| v.position);

            let min_pos = chrom_variants.first().map_or(0, |v| v.position) as f64;
            let max_pos = chrom_variants.last().map_or(0, |v| v.position) as f64;

            // Variants without a value shape the extent above but are not drawn
            let start = points.len();
            for variant in &chrom_variants {
                let Some(y) = variant.neglog10_p else {
                    continue;
                };
                max_y = max_y.max(y);
                points.push(PlacedVariant {
                    chromosome,
                    x: variant.position as f64 + offset,
                    y,
                });
            }

            ticks.push(ChromosomeTick {
                chromosome,
                x: offset + (max_pos + min_pos) / 2.0,
                label: chromosome.label(),
                points: start..points.len(),
            });

            offset += max_pos;
        }

        Self {
            points,
            ticks,
            final_offset: offset,
            max_y,
        }
    }

    /// Horizontal extent with a small margin either side
    pub fn x_range(&self) -> Range<f64> {
        if self.final_offset > 0.0 {
            (-X_MARGIN * self.final_offset)..((1.0 + X_MARGIN) * self.final_offset)
        } else {
            -1.0..1.0
        }
    }

    /// Vertical extent from 0, tall enough for every point and the threshold
    pub fn y_range(&self, threshold_y: f64) -> Range<f64> {
        let top = self.max_y.max(threshold_y) * Y_HEADROOM;
        0.0..if top > 0.0 { top } else { 1.0 }
    }
}

/// Height of the significance line: -log10(threshold)
pub fn threshold_y(sig_threshold: f64) -> f64 {
    -sig_threshold.log10()
}
