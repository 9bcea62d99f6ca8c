//! Naming rules for model asset sets.
//!
//! A loadable asset set is one topology file named exactly `model.json` plus
//! a non-empty set of weight shards named `group<G>-shard<N>of<M>.bin`.

use thiserror::Error;

/// Required name of the model topology file.
pub const TOPOLOGY_FILE_NAME: &str = "model.json";

/// Problems with a model asset set's file names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("the topology file must be named \"model.json\", got \"{name}\"")]
    TopologyName { name: String },
    #[error("no weight files selected")]
    NoWeights,
    #[error("weight file \"{name}\" does not follow the \"group<G>-shard<N>of<M>.bin\" naming scheme")]
    BadShardName { name: String },
}

/// A parsed weight-shard file name: `group<G>-shard<N>of<M>.bin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShardName {
    pub group: u32,
    pub index: u32,
    pub total: u32,
}

impl ShardName {
    /// Parse a shard file name. Returns `None` if the name does not follow
    /// the scheme. Digits-only segments are accepted as-is; range checks
    /// (index within total) are the model loader's concern.
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("group")?;
        let (group, rest) = take_number(rest)?;
        let rest = rest.strip_prefix("-shard")?;
        let (index, rest) = take_number(rest)?;
        let rest = rest.strip_prefix("of")?;
        let (total, rest) = take_number(rest)?;
        if rest != ".bin" {
            return None;
        }
        Some(Self {
            group,
            index,
            total,
        })
    }
}

impl std::fmt::Display for ShardName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "group{}-shard{}of{}.bin",
            self.group, self.index, self.total
        )
    }
}

/// Split a leading run of ASCII digits off `s` and parse it.
fn take_number(s: &str) -> Option<(u32, &str)> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Validate all file names of a candidate asset set: topology name, weight
/// set non-empty, every weight name parses as a shard name.
pub fn validate_asset_names(topology_name: &str, weight_names: &[&str]) -> Result<(), AssetError> {
    if topology_name != TOPOLOGY_FILE_NAME {
        return Err(AssetError::TopologyName {
            name: topology_name.to_string(),
        });
    }
    if weight_names.is_empty() {
        return Err(AssetError::NoWeights);
    }
    for name in weight_names {
        if ShardName::parse(name).is_none() {
            return Err(AssetError::BadShardName {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_name_parse() {
        let shard = ShardName::parse("group1-shard1of1.bin").unwrap();
        assert_eq!(
            shard,
            ShardName {
                group: 1,
                index: 1,
                total: 1
            }
        );

        let shard = ShardName::parse("group12-shard3of17.bin").unwrap();
        assert_eq!(shard.group, 12);
        assert_eq!(shard.index, 3);
        assert_eq!(shard.total, 17);
    }

    #[test]
    fn test_shard_name_rejects() {
        for name in [
            "group-shard1of1.bin",
            "group1-shard1of1.json",
            "group1-shardof1.bin",
            "group1-shard1of.bin",
            "shard1of1.bin",
            "group1-shard1of1.bin.bak",
            "Group1-shard1of1.bin",
            "group1-shard1of1",
            "",
        ] {
            assert!(ShardName::parse(name).is_none(), "expected reject: {name}");
        }
    }

    #[test]
    fn test_shard_name_display_round_trip() {
        let shard = ShardName {
            group: 2,
            index: 5,
            total: 9,
        };
        assert_eq!(ShardName::parse(&shard.to_string()), Some(shard));
    }

    #[test]
    fn test_validate_asset_names_ok() {
        let result = validate_asset_names(
            "model.json",
            &["group1-shard1of2.bin", "group1-shard2of2.bin"],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_asset_names_topology() {
        let result = validate_asset_names("model.txt", &["group1-shard1of1.bin"]);
        assert_eq!(
            result,
            Err(AssetError::TopologyName {
                name: "model.txt".into()
            })
        );
    }

    #[test]
    fn test_validate_asset_names_empty_weights() {
        assert_eq!(
            validate_asset_names("model.json", &[]),
            Err(AssetError::NoWeights)
        );
    }

    #[test]
    fn test_validate_asset_names_one_bad_shard() {
        // A single non-matching name invalidates the whole set.
        let result = validate_asset_names(
            "model.json",
            &["group1-shard1of2.bin", "extra-weights.bin"],
        );
        assert_eq!(
            result,
            Err(AssetError::BadShardName {
                name: "extra-weights.bin".into()
            })
        );
    }
}
