//! Validation of user input before anything reaches the network.
//!
//! Two layers:
//! - **Field validation**: identifier, title and description rules shared by
//!   the create and edit flows.
//! - **Asset validation**: naming conventions for the model topology file and
//!   its weight shards.
//!
//! Validators report the FIRST violation in a fixed order, so the surfaced
//! message is deterministic when several violations hold at once.

mod assets;
mod fields;

pub use assets::{validate_asset_names, AssetError, ShardName, TOPOLOGY_FILE_NAME};
pub use fields::{
    validate_description, validate_identifier, validate_title, FieldError, MAX_DESCRIPTION_LEN,
    MAX_IDENTIFIER_LEN, MAX_TITLE_LEN, MIN_TITLE_LEN,
};

/// First problem found with a create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestProblem {
    Field(FieldError),
    Asset(AssetError),
}

impl std::fmt::Display for RequestProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestProblem::Field(e) => write!(f, "{e}"),
            RequestProblem::Asset(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RequestProblem {}

/// Check everything a create request must satisfy before submission:
/// identifier rules, topology file name, and every weight-shard name.
///
/// Returns the first problem found, in that order.
pub fn check_create_request(
    id: &str,
    topology_name: &str,
    weight_names: &[&str],
) -> Result<(), RequestProblem> {
    validate_identifier(id).map_err(RequestProblem::Field)?;
    validate_asset_names(topology_name, weight_names).map_err(RequestProblem::Asset)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_create_request_ok() {
        let result = check_create_request("My-App_1", "model.json", &["group1-shard1of1.bin"]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_check_create_request_identifier_first() {
        // Both the id and the topology name are wrong; the id wins.
        let result = check_create_request("", "weights.json", &["group1-shard1of1.bin"]);
        assert_eq!(
            result,
            Err(RequestProblem::Field(FieldError::IdentifierEmpty))
        );
    }

    #[test]
    fn test_check_create_request_bad_topology() {
        let result = check_create_request("ok-id", "topology.json", &["group1-shard1of1.bin"]);
        assert!(matches!(
            result,
            Err(RequestProblem::Asset(AssetError::TopologyName { .. }))
        ));
    }

    #[test]
    fn test_check_create_request_bad_shard() {
        let result = check_create_request("ok-id", "model.json", &["weights.bin"]);
        assert!(matches!(
            result,
            Err(RequestProblem::Asset(AssetError::BadShardName { .. }))
        ));
    }
}
