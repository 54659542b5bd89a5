use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::{CacheError, CacheResult, Context};
use crate::config::config::Config as SuperConfig;

/// The largest number of MQ tiers.
const MAX_TIERS: usize = 255;

/// The replacement policy of a cache
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// Least recently used
    Lru,
    /// Least frequently used
    Lfu,
    /// 2Q with a recency and a frequency segment
    Simplified2Q,
    /// 2Q with an extra list of evicted keys
    Full2Q,
    /// Multi-Queue
    Mq,
}

impl PolicyKind {
    /// Every policy, in the order they are listed to users.
    pub const ALL: [Self; 5] = [
        Self::Lru,
        Self::Lfu,
        Self::Simplified2Q,
        Self::Full2Q,
        Self::Mq,
    ];

    /// The name of the policy on the command line.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lru => "lru",
            Self::Lfu => "lfu",
            Self::Simplified2Q => "2q-simple",
            Self::Full2Q => "2q-full",
            Self::Mq => "mq",
        }
    }
}

impl fmt::Display for PolicyKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = CacheError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CacheError::UnknownPolicy {
                name: s.to_owned(),
                context: vec![format!(
                    "supported policies are {}",
                    Self::ALL.map(Self::as_str).join(", ")
                )],
            })
    }
}

/// A validated cache config
/// One variant per policy, carrying exactly the parameters it needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy")]
pub enum PolicyConfig {
    /// LRU params
    #[serde(rename = "lru")]
    Lru {
        /// Total weight of the values
        capacity: u64,
    },
    /// LFU params
    #[serde(rename = "lfu")]
    Lfu {
        /// Number of entries
        capacity: usize,
    },
    /// Simplified 2Q params
    #[serde(rename = "2q-simple")]
    Simplified2Q {
        /// Size of `A1`
        a1_size: usize,
        /// Size of `Am`
        am_size: usize,
    },
    /// Full 2Q params
    #[serde(rename = "2q-full")]
    Full2Q {
        /// Size of `Am`
        am_size: usize,
        /// Size of `A1-in`
        a1_in_size: usize,
        /// Number of keys `A1-out` remembers
        a1_out_size: usize,
    },
    /// Multi-Queue params
    #[serde(rename = "mq")]
    Mq {
        /// Number of tiers
        tiers: usize,
        /// Total weight of the values
        capacity: u64,
        /// Number of keys the ghost list remembers
        ghost_size: usize,
        /// Operations an unreferenced entry stays in its tier
        life_time: u64,
    },
}

/// Reject a zero size.
fn non_zero<T: Default + PartialEq>(value: T, name: &str) -> CacheResult<()> {
    if value == T::default() {
        return Err(CacheError::invalid_argument(format!(
            "{name} must not be zero"
        )));
    }
    Ok(())
}

impl PolicyConfig {
    /// The policy this config is for.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match *self {
            Self::Lru { .. } => PolicyKind::Lru,
            Self::Lfu { .. } => PolicyKind::Lfu,
            Self::Simplified2Q { .. } => PolicyKind::Simplified2Q,
            Self::Full2Q { .. } => PolicyKind::Full2Q,
            Self::Mq { .. } => PolicyKind::Mq,
        }
    }

    /// Check the params, deserialized configs are not validated otherwise.
    #[inline]
    pub fn validate(&self) -> CacheResult<()> {
        match *self {
            Self::Lru { capacity } => non_zero(capacity, "capacity"),
            Self::Lfu { capacity } => non_zero(capacity, "capacity"),
            Self::Simplified2Q { a1_size, am_size } => {
                non_zero(a1_size, "a1 size")?;
                non_zero(am_size, "am size")
            }
            Self::Full2Q {
                am_size,
                a1_in_size,
                ..
            } => {
                non_zero(am_size, "am size")?;
                non_zero(a1_in_size, "a1-in size")
            }
            Self::Mq {
                tiers, capacity, ..
            } => {
                non_zero(capacity, "capacity")?;
                if tiers == 0 || tiers > MAX_TIERS {
                    return Err(CacheError::invalid_argument(format!(
                        "tiers {tiers} is not in 1..={MAX_TIERS}"
                    )));
                }
                Ok(())
            }
        }
    }
}

impl TryFrom<SuperConfig> for PolicyConfig {
    type Error = CacheError;

    #[inline]
    fn try_from(value: SuperConfig) -> Result<Self, Self::Error> {
        let kind = PolicyKind::from_str(value.policy.as_str())?;
        let config = match kind {
            PolicyKind::Lru => PolicyConfig::Lru {
                capacity: value.capacity,
            },
            PolicyKind::Lfu => PolicyConfig::Lfu {
                capacity: usize::try_from(value.capacity).map_err(|e| {
                    CacheError::invalid_argument(format!(
                        "capacity {} is invalid: {e}",
                        value.capacity
                    ))
                })?,
            },
            PolicyKind::Simplified2Q => PolicyConfig::Simplified2Q {
                a1_size: value.a1_size,
                am_size: value.am_size,
            },
            PolicyKind::Full2Q => PolicyConfig::Full2Q {
                am_size: value.am_size,
                a1_in_size: value.a1_size,
                a1_out_size: value.a1_out_size,
            },
            PolicyKind::Mq => PolicyConfig::Mq {
                tiers: value.mq.tiers,
                capacity: value.capacity,
                ghost_size: value.mq.ghost_size,
                life_time: value.mq.life_time,
            },
        };
        config
            .validate()
            .with_context(|| format!("invalid {kind} config"))?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::default_numeric_fallback)]
mod tests {
    use std::str::FromStr;

    use super::{PolicyConfig, PolicyKind};
    use crate::common::error::CacheError;

    #[test]
    fn test_policy_kind_names() {
        for kind in PolicyKind::ALL {
            assert_eq!(PolicyKind::from_str(&kind.to_string()).unwrap(), kind);
        }
        assert_eq!(PolicyKind::from_str("MQ").unwrap(), PolicyKind::Mq);

        let err = PolicyKind::from_str("2q").unwrap_err();
        assert!(err.to_string().contains("2q-simple, 2q-full"));
    }

    #[test]
    fn test_deserialize() {
        let json = r#"{"policy": "2q-simple", "a1_size": 16, "am_size": 48}"#;
        let config: PolicyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config,
            PolicyConfig::Simplified2Q {
                a1_size: 16,
                am_size: 48,
            }
        );
        config.validate().unwrap();

        let config = PolicyConfig::Mq {
            tiers: 8,
            capacity: 1 << 20,
            ghost_size: 64,
            life_time: 100,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["policy"], "mq");
        assert_eq!(json["tiers"], 8);
    }

    #[test]
    fn test_deserialized_config_needs_validation() {
        let config: PolicyConfig =
            serde_json::from_str(r#"{"policy": "lfu", "capacity": 0}"#).unwrap();
        match config.validate() {
            Err(CacheError::ArgumentInvalid { context }) => {
                assert_eq!(context, vec!["capacity must not be zero".to_owned()]);
            }
            _ => panic!("zero capacity should be rejected"),
        }

        let unknown = serde_json::from_str::<PolicyConfig>(r#"{"policy": "arc"}"#);
        assert!(unknown.is_err());
    }
}
