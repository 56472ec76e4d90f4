//! Configuration for classification, marker indexing and segmentation
//!
//! Every empirically tuned threshold is a named field so it can be
//! overridden from YAML without touching the heuristics themselves.

use serde::{Deserialize, Serialize};
use specsieve_core::{Error, Result};
use std::path::Path;

/// Configuration for the whole extraction run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Document classifier scoring
    #[serde(default)]
    pub classifier: ClassifierSettings,

    /// Marker index scanning
    #[serde(default)]
    pub markers: MarkerSettings,

    /// Segmentation strategies
    #[serde(default)]
    pub segmentation: SegmentationSettings,

    /// Hybrid re-classification after segmentation
    #[serde(default)]
    pub hybrid: HybridSettings,
}

impl ExtractionConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            Error::config(format!("failed to load {}: {}", path.display(), e))
        })
    }
}

/// Classifier scoring constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// Number of leading blocks sampled for keyword and inline-marker hits
    #[serde(default = "default_sample_blocks")]
    pub sample_blocks: usize,

    #[serde(default = "default_inline_marker_divisor")]
    pub inline_marker_divisor: f64,

    #[serde(default = "default_table_count_divisor")]
    pub table_count_divisor: f64,

    #[serde(default = "default_rs_marker_divisor")]
    pub rs_marker_divisor: f64,

    #[serde(default = "default_tps_marker_divisor")]
    pub tps_marker_divisor: f64,

    #[serde(default = "default_rs_filename_bonus")]
    pub rs_filename_bonus: f64,

    #[serde(default = "default_tps_filename_bonus")]
    pub tps_filename_bonus: f64,

    /// Dialect-A marker count required before the dominance override applies
    #[serde(default = "default_rs_dominance_min_markers")]
    pub rs_dominance_min_markers: usize,

    /// Dialect-A to Dialect-B marker ratio for the dominance override
    #[serde(default = "default_rs_dominance_ratio")]
    pub rs_dominance_ratio: f64,

    #[serde(default = "default_rs_dominance_bonus")]
    pub rs_dominance_bonus: f64,

    /// Inline marker hits in the sample that force the RS bonus
    #[serde(default = "default_inline_marker_override_threshold")]
    pub inline_marker_override_threshold: usize,

    #[serde(default = "default_inline_marker_override_bonus")]
    pub inline_marker_override_bonus: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            sample_blocks: default_sample_blocks(),
            inline_marker_divisor: default_inline_marker_divisor(),
            table_count_divisor: default_table_count_divisor(),
            rs_marker_divisor: default_rs_marker_divisor(),
            tps_marker_divisor: default_tps_marker_divisor(),
            rs_filename_bonus: default_rs_filename_bonus(),
            tps_filename_bonus: default_tps_filename_bonus(),
            rs_dominance_min_markers: default_rs_dominance_min_markers(),
            rs_dominance_ratio: default_rs_dominance_ratio(),
            rs_dominance_bonus: default_rs_dominance_bonus(),
            inline_marker_override_threshold: default_inline_marker_override_threshold(),
            inline_marker_override_bonus: default_inline_marker_override_bonus(),
        }
    }
}

/// Marker index constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSettings {
    /// Dotted identifiers with more components are discarded as noise
    #[serde(default = "default_max_hierarchical_components")]
    pub max_hierarchical_components: usize,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            max_hierarchical_components: default_max_hierarchical_components(),
        }
    }
}

/// Segmentation constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationSettings {
    /// Subject for RS and table-sourced requirements
    #[serde(default = "default_subject")]
    pub default_subject: String,

    /// Subject for plaintext and markdown fallbacks
    #[serde(default = "default_fallback_subject")]
    pub fallback_subject: String,

    #[serde(default = "default_markdown_lookahead_lines")]
    pub markdown_lookahead_lines: usize,

    #[serde(default = "default_plaintext_lookahead_lines")]
    pub plaintext_lookahead_lines: usize,

    #[serde(default = "default_id_column_min_non_empty")]
    pub id_column_min_non_empty: usize,

    #[serde(default = "default_id_column_min_matches")]
    pub id_column_min_matches: usize,

    #[serde(default = "default_id_column_min_match_rate")]
    pub id_column_min_match_rate: f64,

    /// Generic rescue runs when TPS phases produce fewer requirements than this
    #[serde(default = "default_generic_rescue_max_requirements")]
    pub generic_rescue_max_requirements: usize,

    /// ...and the index holds more Dialect-B markers than this
    #[serde(default = "default_generic_rescue_min_tps_markers")]
    pub generic_rescue_min_tps_markers: usize,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        Self {
            default_subject: default_subject(),
            fallback_subject: default_fallback_subject(),
            markdown_lookahead_lines: default_markdown_lookahead_lines(),
            plaintext_lookahead_lines: default_plaintext_lookahead_lines(),
            id_column_min_non_empty: default_id_column_min_non_empty(),
            id_column_min_matches: default_id_column_min_matches(),
            id_column_min_match_rate: default_id_column_min_match_rate(),
            generic_rescue_max_requirements: default_generic_rescue_max_requirements(),
            generic_rescue_min_tps_markers: default_generic_rescue_min_tps_markers(),
        }
    }
}

/// Hybrid correction thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridSettings {
    /// Paragraph Dialect-A markers that trigger an extra RS pass on TPS documents
    #[serde(default = "default_hybrid_paragraph_rs_markers")]
    pub paragraph_rs_markers: usize,

    /// Table Dialect-A markers that allow re-namespacing
    #[serde(default = "default_hybrid_table_rs_markers")]
    pub table_rs_markers: usize,

    /// Share of TPS requirements with short numeric ids that allows re-namespacing
    #[serde(default = "default_hybrid_short_id_ratio")]
    pub short_id_ratio: f64,
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            paragraph_rs_markers: default_hybrid_paragraph_rs_markers(),
            table_rs_markers: default_hybrid_table_rs_markers(),
            short_id_ratio: default_hybrid_short_id_ratio(),
        }
    }
}

fn default_sample_blocks() -> usize {
    80
}

fn default_inline_marker_divisor() -> f64 {
    40.0
}

fn default_table_count_divisor() -> f64 {
    50.0
}

fn default_rs_marker_divisor() -> f64 {
    60.0
}

fn default_tps_marker_divisor() -> f64 {
    120.0
}

fn default_rs_filename_bonus() -> f64 {
    2.5
}

fn default_tps_filename_bonus() -> f64 {
    2.0
}

fn default_rs_dominance_min_markers() -> usize {
    30
}

fn default_rs_dominance_ratio() -> f64 {
    2.0
}

fn default_rs_dominance_bonus() -> f64 {
    4.0
}

fn default_inline_marker_override_threshold() -> usize {
    20
}

fn default_inline_marker_override_bonus() -> f64 {
    5.0
}

fn default_max_hierarchical_components() -> usize {
    4
}

fn default_subject() -> String {
    "generator".to_string()
}

fn default_fallback_subject() -> String {
    "supplier".to_string()
}

fn default_markdown_lookahead_lines() -> usize {
    8
}

fn default_plaintext_lookahead_lines() -> usize {
    40
}

fn default_id_column_min_non_empty() -> usize {
    3
}

fn default_id_column_min_matches() -> usize {
    2
}

fn default_id_column_min_match_rate() -> f64 {
    0.6
}

fn default_generic_rescue_max_requirements() -> usize {
    10
}

fn default_generic_rescue_min_tps_markers() -> usize {
    50
}

fn default_hybrid_paragraph_rs_markers() -> usize {
    15
}

fn default_hybrid_table_rs_markers() -> usize {
    40
}

fn default_hybrid_short_id_ratio() -> f64 {
    0.4
}
