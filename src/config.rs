/// Configuration module for lexrag.
///
/// Handles loading, validating, and providing default configuration values.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

// ── Default value functions ──────────────────────────────────────────

fn default_document_patterns() -> Vec<String> {
    vec!["./".to_string()]
}

fn default_db_path() -> String {
    "./lexrag.db".to_string()
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_candidate_limit() -> usize {
    50
}

fn default_top_k() -> usize {
    10
}

fn default_min_chunk_score() -> f64 {
    0.05
}

fn default_memory_turns() -> usize {
    5
}

fn default_memory_capacity() -> usize {
    10
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Directories (or glob-like patterns) indexed for `.md`/`.txt` files.
    #[serde(default = "default_document_patterns")]
    pub document_patterns: Vec<String>,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Segment size in words.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words carried over between consecutive segments.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    /// Rows fetched by the keyword filter before re-scoring.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Ranked chunks handed to the composer.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_min_chunk_score")]
    pub min_chunk_score: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    /// Turns formatted into the memory context.
    #[serde(default = "default_memory_turns")]
    pub turns: usize,

    /// Turns kept per thread.
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            document_patterns: default_document_patterns(),
            db_path: default_db_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            retrieval: RetrievalConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_limit: default_candidate_limit(),
            top_k: default_top_k(),
            min_chunk_score: default_min_chunk_score(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            turns: default_memory_turns(),
            capacity: default_memory_capacity(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and
    /// generates a template file for the default path.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let mut cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");

        if cfg.document_patterns.is_empty() {
            cfg.document_patterns = default_document_patterns();
        }

        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap must be smaller than chunk_size"
        );
        anyhow::ensure!(
            self.retrieval.candidate_limit > 0,
            "retrieval.candidate_limit must be positive"
        );
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.retrieval.min_chunk_score),
            "retrieval.min_chunk_score must be within [0, 1]"
        );
        anyhow::ensure!(
            self.memory.turns <= self.memory.capacity,
            "memory.turns must not exceed memory.capacity"
        );
        anyhow::ensure!(
            !self.document_patterns.is_empty(),
            "at least one document pattern must be specified"
        );
        Ok(())
    }

    /// Return the base directories derived from all patterns.
    #[must_use]
    pub fn get_base_directories(&self) -> Vec<PathBuf> {
        let mut dirs = HashSet::new();

        for pattern in &self.document_patterns {
            let base = extract_base_dir(pattern);
            if let Ok(abs) = std::path::absolute(Path::new(&base)) {
                dirs.insert(abs);
            }
        }

        let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
        dirs.sort();
        dirs
    }
}

// ── Pattern helpers ──────────────────────────────────────────────────

/// Extract the base directory from a pattern (part before first wildcard).
fn extract_base_dir(pattern: &str) -> String {
    let Some(idx) = pattern.find(['*', '?']) else {
        return pattern.to_string();
    };

    let prefix = &pattern[..idx];
    let trimmed = prefix.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return ".".to_string();
    }
    // A prefix ending with a separator is the directory itself
    if prefix.len() > trimmed.len() {
        return trimmed.to_string();
    }
    Path::new(trimmed)
        .parent()
        .map(|p| {
            let s = p.to_string_lossy().to_string();
            if s.is_empty() { ".".to_string() } else { s }
        })
        .unwrap_or_else(|| ".".to_string())
}

// ── Tests ────────────────────────────────────────────────────────────
