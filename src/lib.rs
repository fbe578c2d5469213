// ==============================================================================
// lib.rs - GWAS Input Preparation Library
// ==============================================================================
// Description: Cohort, covariate and phenotype assembly plus Manhattan plots
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

pub mod cohort;
pub mod config;
pub mod covariates;
pub mod manhattan;
pub mod models;
pub mod output;
pub mod parsers;
pub mod phenotype;
pub mod validator;
