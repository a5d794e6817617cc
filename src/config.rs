use std::collections::{HashMap, HashSet};
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::id::HouseId;
use crate::model::WarChoice;

/// Environment variable naming the JSON config file for [`EngineConfig::from_env`].
pub const CONFIG_PATH_VAR: &str = "SIEGECRAFT_CONFIG";

/// Whether a war vote for a house already at war with the voter's house is
/// accepted at cast time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtWarVotePolicy {
    /// Accept the vote; if it wins, the tally reports the war as already
    /// existing and changes nothing.
    #[default]
    Accept,
    /// Reject the vote when it is cast.
    Reject,
}

/// A playable house. Players may refer to it by id, name, or any alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseConfig {
    pub id: HouseId,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl HouseConfig {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: HouseId::new(id),
            name: name.to_string(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// The id, the name and every alias.
    fn labels(&self) -> impl Iterator<Item = &str> {
        [self.id.as_str(), self.name.as_str()]
            .into_iter()
            .chain(self.aliases.iter().map(String::as_str))
    }

    fn matches(&self, input: &str) -> bool {
        self.id.as_str() == input
            || self.name.eq_ignore_ascii_case(input)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(input))
    }
}

/// Tunables of the conflict engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a siege collects pledges before it resolves.
    pub siege_duration_hours: u64,
    /// How long a war or truce ballot stays open after its first vote.
    pub ballot_duration_hours: u64,
    /// Money paid to the winning side per pledge record.
    pub money_pot_per_pledge: u64,
    /// Troops paid to the losing side per pledge record.
    pub troop_pot_per_pledge: u64,
    /// Lower bound (inclusive) of the losing side's loss fraction.
    pub loss_fraction_min: f64,
    /// Upper bound (exclusive) of the losing side's loss fraction.
    pub loss_fraction_max: f64,
    pub at_war_vote_policy: AtWarVotePolicy,
    /// How many times an action re-acquires locks when its writes grow.
    pub max_lock_attempts: usize,
    /// Seconds between scheduler passes when run in a loop.
    pub scheduler_interval_secs: u64,
    pub houses: Vec<HouseConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            siege_duration_hours: 6,
            ballot_duration_hours: 6,
            money_pot_per_pledge: 6000,
            troop_pot_per_pledge: 20,
            loss_fraction_min: 0.10,
            loss_fraction_max: 0.30,
            at_war_vote_policy: AtWarVotePolicy::Accept,
            max_lock_attempts: 8,
            scheduler_interval_secs: 60,
            houses: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn with_houses(houses: Vec<HouseConfig>) -> Self {
        Self {
            houses,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Load the config file named by `SIEGECRAFT_CONFIG`. There is no
    /// built-in fallback: the house roster is deployment specific.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_path_var(env::var_os(CONFIG_PATH_VAR))
    }

    fn from_path_var(value: Option<OsString>) -> Result<Self, ConfigError> {
        let path = value
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::Invalid(format!("{CONFIG_PATH_VAR} is not set")))?;
        let config = Self::from_file(&path)?;
        tracing::info!(
            path = %path.display(),
            houses = config.houses.len(),
            "engine config loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.houses.len() < 2 {
            return Err(ConfigError::Invalid(
                "at least two houses must be configured".to_string(),
            ));
        }
        let mut ids = HashSet::new();
        // Every id, name and alias must resolve to exactly one house.
        let mut labels: HashMap<String, &HouseId> = HashMap::new();
        for house in &self.houses {
            if !ids.insert(house.id.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "house {} is configured twice",
                    house.id
                )));
            }
            let mut own = HashSet::new();
            for label in house.labels() {
                let key = label.to_lowercase();
                if key == WarChoice::Peace.key() {
                    return Err(ConfigError::Invalid(format!(
                        "house {} cannot be called {label}, it is reserved for peace votes",
                        house.id
                    )));
                }
                if !own.insert(key.clone()) {
                    continue;
                }
                if let Some(other) = labels.insert(key, &house.id) {
                    return Err(ConfigError::Invalid(format!(
                        "house name {label} is ambiguous between {other} and {}",
                        house.id
                    )));
                }
            }
        }
        if !(0.0..1.0).contains(&self.loss_fraction_min)
            || self.loss_fraction_max <= self.loss_fraction_min
            || self.loss_fraction_max > 1.0
        {
            return Err(ConfigError::Invalid(format!(
                "loss fraction range [{}, {}) is not within [0, 1)",
                self.loss_fraction_min, self.loss_fraction_max
            )));
        }
        if self.siege_duration_hours == 0 || self.ballot_duration_hours == 0 {
            return Err(ConfigError::Invalid(
                "siege and ballot durations must be positive".to_string(),
            ));
        }
        if self.max_lock_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_lock_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn registry(&self) -> HouseRegistry<'_> {
        HouseRegistry {
            houses: &self.houses,
        }
    }
}

/// Lookup of configured houses by id, name, alias, or role mention.
#[derive(Debug, Clone, Copy)]
pub struct HouseRegistry<'a> {
    houses: &'a [HouseConfig],
}

impl<'a> HouseRegistry<'a> {
    pub fn resolve(&self, input: &str) -> Option<&'a HouseId> {
        let input = strip_mention(input.trim());
        self.houses
            .iter()
            .find(|h| h.matches(input))
            .map(|h| &h.id)
    }

    pub fn name_of(&self, house: &HouseId) -> Option<&'a str> {
        self.houses
            .iter()
            .find(|h| &h.id == house)
            .map(|h| h.name.as_str())
    }
}

/// `<@&123>` is how chat platforms render a role mention.
fn strip_mention(input: &str) -> &str {
    input
        .strip_prefix("<@&")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(input)
}
