//! Engine configuration: tier profiles and TOML loading
//!
//! A tier selects a plain [`TierProfile`] preset. A TOML file may override
//! any field of the preset; everything is validated once, when the
//! [`EngineConfig`] is built.
//!
//! ```
//! use gomoku::config::{EngineConfig, Tier};
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     tier = "deep"
//!     board_size = 19
//!
//!     [profile]
//!     max_depth = 5
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.tier, Tier::Deep);
//! assert_eq!(config.profile.max_depth, 5);
//! assert!(config.profile.forced_win.is_some());
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::board::validate_dimensions;
use crate::board::{DEFAULT_BOARD_SIZE, DEFAULT_WIN_LENGTH};
use crate::error::ConfigError;
use crate::eval::WeightTable;
use crate::search::{ForcedWinConfig, SearchLimits, MAX_SEARCH_DEPTH};

/// Analysis tier. Exactly one tier applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Shallow alpha-beta only
    #[default]
    Basic,
    /// Deeper alpha-beta plus VCF/VCT
    Deep,
}

impl Tier {
    pub fn profile(self) -> TierProfile {
        match self {
            Tier::Basic => TierProfile::basic(),
            Tier::Deep => TierProfile::deep(),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" | "cheap" => Ok(Tier::Basic),
            "deep" | "pro" => Ok(Tier::Deep),
            other => Err(format!("unknown tier '{other}' (expected basic or deep)")),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Tier::Basic => "basic",
            Tier::Deep => "deep",
        })
    }
}

/// Search budget and evaluator settings of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProfile {
    pub max_depth: u8,
    /// Per-position alpha-beta time budget
    pub time_budget_ms: Option<u64>,
    /// Per-position alpha-beta node budget
    pub node_limit: Option<u64>,
    /// VCF search; `None` disables forced-win analysis
    pub forced_win: Option<ForcedWinConfig>,
    /// VCT search, tried when VCF finds nothing
    pub vct: Option<ForcedWinConfig>,
    pub tt_size_mb: usize,
    pub weights: WeightTable,
}

impl TierProfile {
    pub fn basic() -> Self {
        Self {
            max_depth: 4,
            time_budget_ms: Some(2_000),
            node_limit: Some(150_000),
            forced_win: None,
            vct: None,
            tt_size_mb: 16,
            weights: WeightTable::basic(),
        }
    }

    pub fn deep() -> Self {
        Self {
            max_depth: 6,
            time_budget_ms: Some(10_000),
            node_limit: Some(1_500_000),
            forced_win: Some(ForcedWinConfig::vcf(15)),
            vct: Some(ForcedWinConfig::vct(7)),
            tt_size_mb: 64,
            weights: WeightTable::pro(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth > MAX_SEARCH_DEPTH {
            return Err(ConfigError::Depth {
                got: self.max_depth,
                max: MAX_SEARCH_DEPTH,
            });
        }
        if let Some(fw) = &self.forced_win {
            fw.validate()?;
        }
        if let Some(vct) = &self.vct {
            vct.validate()?;
        }
        self.weights.validate()
    }

    /// Alpha-beta limits for one position.
    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            max_depth: self.max_depth,
            time_budget: self.time_budget_ms.map(Duration::from_millis),
            node_limit: self.node_limit,
        }
    }
}

impl Default for TierProfile {
    fn default() -> Self {
        Self::basic()
    }
}

/// Validated engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    pub board_size: usize,
    pub win_length: usize,
    pub tier: Tier,
    pub profile: TierProfile,
}

impl EngineConfig {
    /// Configuration with the tier's preset profile.
    pub fn new(board_size: usize, win_length: usize, tier: Tier) -> Result<Self, ConfigError> {
        Self::with_profile(board_size, win_length, tier, tier.profile())
    }

    pub fn with_profile(
        board_size: usize,
        win_length: usize,
        tier: Tier,
        profile: TierProfile,
    ) -> Result<Self, ConfigError> {
        validate_dimensions(board_size, win_length)?;
        profile.validate()?;
        Ok(Self {
            board_size,
            win_length,
            tier,
            profile,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        EngineConfigFile::from_toml_str(text)?.resolve()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        EngineConfigFile::load(path)?.resolve()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            win_length: DEFAULT_WIN_LENGTH,
            tier: Tier::Basic,
            profile: TierProfile::basic(),
        }
    }
}

/// On-disk layout; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigFile {
    #[serde(default)]
    pub board_size: Option<usize>,
    #[serde(default)]
    pub win_length: Option<usize>,
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub profile: Option<ProfileOverrides>,
}

/// Fields replacing the tier preset's values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileOverrides {
    #[serde(default)]
    pub max_depth: Option<u8>,
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
    #[serde(default)]
    pub node_limit: Option<u64>,
    #[serde(default)]
    pub forced_win: Option<ForcedWinConfig>,
    #[serde(default)]
    pub vct: Option<ForcedWinConfig>,
    /// Turn off both forced-win searches
    #[serde(default)]
    pub disable_forced_win: bool,
    #[serde(default)]
    pub tt_size_mb: Option<usize>,
    #[serde(default)]
    pub weights: Option<WeightTable>,
}

impl ProfileOverrides {
    pub fn apply(&self, mut profile: TierProfile) -> TierProfile {
        if let Some(v) = self.max_depth {
            profile.max_depth = v;
        }
        if let Some(v) = self.time_budget_ms {
            profile.time_budget_ms = Some(v);
        }
        if let Some(v) = self.node_limit {
            profile.node_limit = Some(v);
        }
        if let Some(v) = self.forced_win {
            profile.forced_win = Some(v);
        }
        if let Some(v) = self.vct {
            profile.vct = Some(v);
        }
        if self.disable_forced_win {
            profile.forced_win = None;
            profile.vct = None;
        }
        if let Some(v) = self.tt_size_mb {
            profile.tt_size_mb = v;
        }
        if let Some(v) = self.weights {
            profile.weights = v;
        }
        profile
    }
}

impl EngineConfigFile {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse a file without resolving it, so callers can still replace the
    /// tier or dimensions before the overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn resolve(&self) -> Result<EngineConfig, ConfigError> {
        let tier = self.tier.unwrap_or_default();
        let profile = match &self.profile {
            Some(overrides) => overrides.apply(tier.profile()),
            None => tier.profile(),
        };
        EngineConfig::with_profile(
            self.board_size.unwrap_or(DEFAULT_BOARD_SIZE),
            self.win_length.unwrap_or(DEFAULT_WIN_LENGTH),
            tier,
            profile,
        )
    }
}
