// ==============================================================================
// validator.rs - Input Table Validation
// ==============================================================================
// Description: Checks study input tables before loading (presence, size, type)
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024 * 1024; // 20 GB
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub size: u64,
    pub compressed: bool,
    pub hash_sha256: String,
}

pub struct InputValidator {
    max_file_size: u64,
    allow_empty: bool,
}

impl InputValidator {
    pub fn new() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            allow_empty: false,
        }
    }

    /// Accept zero-byte files (lists that may legitimately be empty)
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Validate one input table; any failure aborts the run before output
    pub fn validate(&self, path: &Path) -> Result<ValidatedInput> {
        // 1. Presence
        if !path.exists() {
            anyhow::bail!("Input file not found: {:?}", path);
        }

        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Failed to get file metadata for {:?}", path))?;

        if !metadata.is_file() {
            anyhow::bail!("Input path is not a regular file: {:?}", path);
        }

        // 2. Size
        let size = metadata.len();
        if size == 0 && !self.allow_empty {
            anyhow::bail!("Input file is empty: {:?}", path);
        }
        if size > self.max_file_size {
            anyhow::bail!(
                "Input file too large: {:?} is {} bytes (max: {} bytes)",
                path,
                size,
                self.max_file_size
            );
        }

        // 3. Gzip magic number for compressed tables
        let compressed = is_gzip_name(path);
        if compressed && size > 0 {
            let magic = self.read_magic_number(path)?;
            if magic != GZIP_MAGIC {
                anyhow::bail!("Magic number mismatch for gzip file {:?}", path);
            }
        }

        // 4. Provenance digest
        let hash = self.compute_sha256(path)?;
        debug!("Validated {:?}: {} bytes, sha256 {}", path, size, hash);

        Ok(ValidatedInput {
            path: path.to_path_buf(),
            size,
            compressed,
            hash_sha256: hash,
        })
    }

    /// Validate every path, stopping at the first failure
    pub fn validate_all<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a Path>,
    ) -> Result<Vec<ValidatedInput>> {
        paths.into_iter().map(|p| self.validate(p)).collect()
    }

    fn read_magic_number(&self, path: &Path) -> Result<[u8; 2]> {
        let mut file = File::open(path)?;
        let mut buffer = [0u8; 2];
        file.read_exact(&mut buffer)
            .with_context(|| format!("Failed to read header of {:?}", path))?;
        Ok(buffer)
    }

    fn compute_sha256(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 8192];

        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn is_gzip_name(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}
