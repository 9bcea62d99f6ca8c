//! Model loading: turn a topology file plus weight shards into a loadable
//! model, or explain why the files are not a supported model.
//!
//! The loader never touches the network; it is the local gate the create
//! flow runs before any remote provisioning starts.

use crate::validate::ShardName;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// An in-memory file selected by the user: its name plus raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl ModelFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Read a file from disk, keeping only its file name (not the full path).
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = std::fs::read(path)?;
        Ok(Self { name, data })
    }
}

/// A successfully loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    /// Number of layers declared in the topology, if declared.
    pub layer_count: usize,
    /// Number of weight manifest groups.
    pub weight_groups: usize,
    /// Total size of all weight shards in bytes.
    pub total_weight_bytes: u64,
}

/// Why a candidate asset set is not a loadable model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unsupported model format: {detail}")]
    Incompatible { detail: String },
}

impl ModelError {
    fn incompatible(detail: impl Into<String>) -> Self {
        Self::Incompatible {
            detail: detail.into(),
        }
    }
}

/// Constructs a model from a topology file and its weight shards.
pub trait ModelLoader {
    fn load(&self, topology: &ModelFile, weights: &[ModelFile]) -> Result<ModelHandle, ModelError>;
}

/// The standard loader: parses the topology JSON and cross-checks its weight
/// manifest against the provided shard files.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopologyLoader;

impl ModelLoader for TopologyLoader {
    fn load(&self, topology: &ModelFile, weights: &[ModelFile]) -> Result<ModelHandle, ModelError> {
        let root: Value = serde_json::from_slice(&topology.data)
            .map_err(|e| ModelError::incompatible(format!("topology is not valid JSON: {e}")))?;

        let object = root
            .as_object()
            .ok_or_else(|| ModelError::incompatible("topology root must be a JSON object"))?;

        let model_topology = object
            .get("modelTopology")
            .ok_or_else(|| ModelError::incompatible("topology is missing \"modelTopology\""))?;
        if !model_topology.is_object() {
            return Err(ModelError::incompatible(
                "\"modelTopology\" must be an object",
            ));
        }

        let manifest = object
            .get("weightsManifest")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ModelError::incompatible("topology is missing a \"weightsManifest\" array")
            })?;
        if manifest.is_empty() {
            return Err(ModelError::incompatible("\"weightsManifest\" is empty"));
        }

        let manifest_paths = collect_manifest_paths(manifest)?;
        cross_check_shards(&manifest_paths, weights)?;

        let layer_count = model_topology
            .get("config")
            .and_then(|c| c.get("layers"))
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);

        Ok(ModelHandle {
            layer_count,
            weight_groups: manifest.len(),
            total_weight_bytes: weights.iter().map(|w| w.data.len() as u64).sum(),
        })
    }
}

/// Extract every `paths` entry from the manifest groups.
fn collect_manifest_paths(manifest: &[Value]) -> Result<Vec<String>, ModelError> {
    let mut paths = Vec::new();
    for (i, group) in manifest.iter().enumerate() {
        let group_paths = group
            .get("paths")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ModelError::incompatible(format!("manifest group {i} has no \"paths\" array"))
            })?;
        for p in group_paths {
            let p = p.as_str().ok_or_else(|| {
                ModelError::incompatible(format!("manifest group {i} has a non-string path"))
            })?;
            paths.push(p.to_string());
        }
    }
    Ok(paths)
}

/// The manifest and the provided shard files must agree exactly, and every
/// shard group must be complete.
fn cross_check_shards(manifest_paths: &[String], weights: &[ModelFile]) -> Result<(), ModelError> {
    let provided: HashSet<&str> = weights.iter().map(|w| w.name.as_str()).collect();
    let referenced: HashSet<&str> = manifest_paths.iter().map(String::as_str).collect();

    for path in &referenced {
        if !provided.contains(path) {
            return Err(ModelError::incompatible(format!(
                "weight file \"{path}\" is referenced by the manifest but was not provided"
            )));
        }
    }
    for name in &provided {
        if !referenced.contains(name) {
            return Err(ModelError::incompatible(format!(
                "weight file \"{name}\" is not referenced by the manifest"
            )));
        }
    }

    // Shard numbering: every index must fall within its declared total, and
    // every group must be complete.
    let mut seen: HashSet<ShardName> = HashSet::new();
    for name in &provided {
        let shard = ShardName::parse(name).ok_or_else(|| {
            ModelError::incompatible(format!("\"{name}\" is not a shard file name"))
        })?;
        if shard.total == 0 || shard.index == 0 || shard.index > shard.total {
            return Err(ModelError::incompatible(format!(
                "shard \"{name}\" has an out-of-range shard number"
            )));
        }
        seen.insert(shard);
    }
    for shard in &seen {
        for index in 1..=shard.total {
            let expected = ShardName { index, ..*shard };
            if !seen.contains(&expected) {
                return Err(ModelError::incompatible(format!(
                    "shard group {} is incomplete: missing \"{expected}\"",
                    shard.group
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(manifest_paths: &[&[&str]]) -> ModelFile {
        let groups: Vec<Value> = manifest_paths
            .iter()
            .map(|paths| serde_json::json!({ "paths": paths, "weights": [] }))
            .collect();
        let json = serde_json::json!({
            "modelTopology": { "config": { "layers": [{}, {}] } },
            "weightsManifest": groups,
        });
        ModelFile::new("model.json", serde_json::to_vec(&json).unwrap())
    }

    fn shard(name: &str) -> ModelFile {
        ModelFile::new(name, vec![0u8; 8])
    }

    #[test]
    fn test_load_single_shard() {
        let handle = TopologyLoader
            .load(
                &topology(&[&["group1-shard1of1.bin"]]),
                &[shard("group1-shard1of1.bin")],
            )
            .unwrap();
        assert_eq!(handle.layer_count, 2);
        assert_eq!(handle.weight_groups, 1);
        assert_eq!(handle.total_weight_bytes, 8);
    }

    #[test]
    fn test_load_multi_group() {
        let handle = TopologyLoader
            .load(
                &topology(&[
                    &["group1-shard1of2.bin", "group1-shard2of2.bin"],
                    &["group2-shard1of1.bin"],
                ]),
                &[
                    shard("group1-shard1of2.bin"),
                    shard("group1-shard2of2.bin"),
                    shard("group2-shard1of1.bin"),
                ],
            )
            .unwrap();
        assert_eq!(handle.weight_groups, 2);
        assert_eq!(handle.total_weight_bytes, 24);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let result = TopologyLoader.load(
            &ModelFile::new("model.json", b"not json".to_vec()),
            &[shard("group1-shard1of1.bin")],
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"), "{err}");
    }

    #[test]
    fn test_load_rejects_missing_topology_key() {
        let json = serde_json::json!({ "weightsManifest": [] });
        let result = TopologyLoader.load(
            &ModelFile::new("model.json", serde_json::to_vec(&json).unwrap()),
            &[shard("group1-shard1of1.bin")],
        );
        assert!(result.unwrap_err().to_string().contains("modelTopology"));
    }

    #[test]
    fn test_load_rejects_unreferenced_shard() {
        let result = TopologyLoader.load(
            &topology(&[&["group1-shard1of1.bin"]]),
            &[shard("group1-shard1of1.bin"), shard("group2-shard1of1.bin")],
        );
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not referenced by the manifest"));
    }

    #[test]
    fn test_load_rejects_missing_shard() {
        let result = TopologyLoader.load(
            &topology(&[&["group1-shard1of2.bin", "group1-shard2of2.bin"]]),
            &[shard("group1-shard1of2.bin")],
        );
        assert!(result.unwrap_err().to_string().contains("was not provided"));
    }

    #[test]
    fn test_load_rejects_incomplete_group() {
        // Manifest and files agree, but shard 1of2 is nowhere in the set.
        let result = TopologyLoader.load(
            &topology(&[&["group1-shard2of2.bin"]]),
            &[shard("group1-shard2of2.bin")],
        );
        assert!(result.unwrap_err().to_string().contains("incomplete"));
    }

    #[test]
    fn test_load_rejects_out_of_range_shard() {
        let result = TopologyLoader.load(
            &topology(&[&["group1-shard3of2.bin"]]),
            &[shard("group1-shard3of2.bin")],
        );
        assert!(result.unwrap_err().to_string().contains("out-of-range"));
    }

    #[test]
    fn test_model_file_from_path() {
        let dir = std::env::temp_dir().join("appdeck-model-file-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model.json");
        std::fs::write(&path, b"{}").unwrap();

        let file = ModelFile::from_path(&path).unwrap();
        assert_eq!(file.name, "model.json");
        assert_eq!(file.data, b"{}");
    }
}
