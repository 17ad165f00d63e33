use serde::{Deserialize, Serialize};

/// One boost reaction tier: reacting with `emote` pledges `value` points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostTier {
    pub emote: String,
    pub value: i64,
}

/// Immutable runtime configuration.
///
/// Built once at process start (defaults, optionally overridden from a JSON
/// file) and passed into every component constructor — operations never
/// read ambient global state, so tests can inject alternate tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BountyConfig {
    /// Ordered boost tiers, lowest value first.
    pub boost_reactions: Vec<BoostTier>,
    /// Reaction the bounty owner adds to release/award the bounty.
    pub release_reaction: String,
    /// Reaction a task completer adds to soft-claim the bounty.
    pub claim_reaction: String,
    pub daily_decay: i64,
    /// Also used as the starting balance for newly created accounts.
    pub daily_income: i64,
    pub leaders_to_show: usize,
    pub documentation_url: String,
}

impl Default for BountyConfig {
    fn default() -> Self {
        Self {
            boost_reactions: vec![
                BoostTier { emote: "coin".into(), value: 1 },
                BoostTier { emote: "dollar".into(), value: 2 },
                BoostTier { emote: "money_with_wings".into(), value: 3 },
                BoostTier { emote: "moneybag".into(), value: 4 },
                BoostTier { emote: "rotating_light".into(), value: 5 },
            ],
            release_reaction: "medal".into(),
            claim_reaction: "white_check_mark".into(),
            daily_decay: 2,
            daily_income: 1,
            leaders_to_show: 5,
            documentation_url: "https://github.com/Buzzology/slack-bounties-autocode".into(),
        }
    }
}

impl BountyConfig {
    /// Boost value for a reaction symbol, if it is a configured tier.
    pub fn boost_value(&self, reaction: &str) -> Option<i64> {
        self.boost_reactions
            .iter()
            .find(|t| t.emote == reaction)
            .map(|t| t.value)
    }

    pub fn is_boost(&self, reaction: &str) -> bool {
        self.boost_value(reaction).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers_resolve() {
        let cfg = BountyConfig::default();
        assert_eq!(cfg.boost_value("coin"), Some(1));
        assert_eq!(cfg.boost_value("rotating_light"), Some(5));
        assert_eq!(cfg.boost_value("thumbsup"), None);
        assert!(!cfg.is_boost("medal"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: BountyConfig =
            serde_json::from_str(r#"{ "daily_decay": 7, "release_reaction": "trophy" }"#).unwrap();
        assert_eq!(cfg.daily_decay, 7);
        assert_eq!(cfg.release_reaction, "trophy");
        assert_eq!(cfg.daily_income, 1);
        assert_eq!(cfg.boost_reactions.len(), 5);
    }
}
