use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-guild feature switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Stored as `mod_feature`.
    Moderation,
    Automod,
}

impl Feature {
    pub fn column(self) -> &'static str {
        match self {
            Feature::Moderation => "mod_feature",
            Feature::Automod => "automod",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Feature::Moderation => "Moderation",
            Feature::Automod => "Automod",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureState {
    Enable,
    #[default]
    Disable,
}

impl FeatureState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            FeatureState::Enable
        } else {
            FeatureState::Disable
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, FeatureState::Enable)
    }
}

/// Stored flag row for one guild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub mod_feature: bool,
    pub automod: bool,
}

impl FeatureFlags {
    pub fn state(&self, feature: Feature) -> FeatureState {
        match feature {
            Feature::Moderation => FeatureState::from_enabled(self.mod_feature),
            Feature::Automod => FeatureState::from_enabled(self.automod),
        }
    }

    pub fn set(&mut self, feature: Feature, state: FeatureState) {
        match feature {
            Feature::Moderation => self.mod_feature = state.is_enabled(),
            Feature::Automod => self.automod = state.is_enabled(),
        }
    }
}
