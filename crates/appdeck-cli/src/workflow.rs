//! The create-application workflow.
//!
//! Given a validated identifier and a locally loadable model asset set,
//! provisions the application server-side as an ordered sequence of four
//! dependent remote operations, compensating with a best-effort delete of
//! the configuration record when a step after the first fails:
//!
//! 1. create the configuration record (conflict → "id already exists")
//! 2. create the storage directory and application files (failure → delete)
//! 3. upload the model files (failure → delete)
//! 4. refresh the user profile (failure → session expired; the created
//!    application is NOT rolled back)
//!
//! The workflow owns no UI state: it returns a [`CreateOutcome`] and the
//! presentation layer derives messages, navigation and logout from it. A
//! second `run` while one is in flight is rejected without touching the
//! network.

use crate::client::AppsClient;
use appdeck_core::validate;
use appdeck_core::{AppConfig, ModelFile, ModelLoader};
use appdeck_runtime::users::UserProfile;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure of a single remote step, as seen by the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The identifier already exists server-side.
    Conflict,
    /// Any other failure; the detail is logged, not surfaced.
    Other(String),
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepError::Conflict => write!(f, "identifier conflict"),
            StepError::Other(detail) => write!(f, "{detail}"),
        }
    }
}

/// The remote operations the workflow depends on, free of transport.
#[async_trait]
pub trait ProvisioningApi: Send + Sync {
    async fn create_app_config(&self, config: &AppConfig) -> Result<(), StepError>;
    async fn create_app_storage(&self, config: &AppConfig) -> Result<(), StepError>;
    async fn upload_model_files(
        &self,
        id: &str,
        topology: &ModelFile,
        weights: &[ModelFile],
    ) -> Result<(), StepError>;
    async fn refresh_user(&self) -> Result<UserProfile, StepError>;
    /// Compensation target; callers ignore the result.
    async fn delete_app_config(&self, id: &str) -> Result<(), StepError>;
}

#[async_trait]
impl ProvisioningApi for AppsClient {
    async fn create_app_config(&self, config: &AppConfig) -> Result<(), StepError> {
        match self.create_app(config).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_conflict() => Err(StepError::Conflict),
            Err(e) => Err(StepError::Other(e.to_string())),
        }
    }

    async fn create_app_storage(&self, config: &AppConfig) -> Result<(), StepError> {
        AppsClient::create_app_storage(self, config)
            .await
            .map_err(|e| StepError::Other(e.to_string()))
    }

    async fn upload_model_files(
        &self,
        id: &str,
        topology: &ModelFile,
        weights: &[ModelFile],
    ) -> Result<(), StepError> {
        AppsClient::upload_model_files(self, id, topology, weights)
            .await
            .map(|_| ())
            .map_err(|e| StepError::Other(e.to_string()))
    }

    async fn refresh_user(&self) -> Result<UserProfile, StepError> {
        self.fetch_user()
            .await
            .map_err(|e| StepError::Other(e.to_string()))
    }

    async fn delete_app_config(&self, id: &str) -> Result<(), StepError> {
        self.delete_app(id)
            .await
            .map_err(|e| StepError::Other(e.to_string()))
    }
}

/// Everything a create session collects before submission.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub config: AppConfig,
    pub topology: ModelFile,
    pub weights: Vec<ModelFile>,
}

/// One distinct user-facing message per failure class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("could not create the application: check the form fields")]
    FormInvalid,
    #[error("the selected model is not compatible with this application: {detail}")]
    IncompatibleModel { detail: String },
    #[error("could not create the application: the id already exists")]
    IdTaken,
    #[error("the server failed while creating the application, try again later")]
    Server,
    #[error("could not create the application directory, try again later")]
    Storage,
    #[error("could not upload the model files, try again later")]
    Upload,
    #[error("a create operation is already in progress")]
    AlreadyRunning,
}

/// Terminal state of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// All four steps succeeded; navigate to the editor for `id`.
    Created { id: String, user: UserProfile },
    /// Step 4 failed: the application exists but the session is invalid.
    /// The presentation layer must log out and redirect to the landing
    /// route; there is deliberately no rollback on this branch.
    SessionExpired,
    Failed(CreateError),
}

/// The workflow driver. One instance guards one create surface: re-entry
/// while a run is in flight is rejected.
pub struct CreateWorkflow<A, L> {
    api: A,
    loader: L,
    in_flight: AtomicBool,
}

impl<A: ProvisioningApi, L: ModelLoader> CreateWorkflow<A, L> {
    pub fn new(api: A, loader: L) -> Self {
        Self {
            api,
            loader,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a run is currently in flight. Must be `false` again after
    /// every terminating path.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run the workflow to a terminal outcome.
    pub async fn run(&self, request: &CreateRequest) -> CreateOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return CreateOutcome::Failed(CreateError::AlreadyRunning);
        }

        let outcome = self.drive(request).await;
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn drive(&self, request: &CreateRequest) -> CreateOutcome {
        // Preconditions: nothing reaches the network unless the identifier,
        // the file names and the model itself all check out.
        let weight_names: Vec<&str> = request.weights.iter().map(|f| f.name.as_str()).collect();
        if let Err(problem) = validate::check_create_request(
            &request.config.id,
            &request.topology.name,
            &weight_names,
        ) {
            debug!("create request rejected: {}", problem);
            return CreateOutcome::Failed(CreateError::FormInvalid);
        }

        if let Err(e) = self.loader.load(&request.topology, &request.weights) {
            return CreateOutcome::Failed(CreateError::IncompatibleModel {
                detail: e.to_string(),
            });
        }

        let id = request.config.id.as_str();

        // Step 1: configuration record. Nothing to compensate on failure.
        match self.api.create_app_config(&request.config).await {
            Ok(()) => {}
            Err(StepError::Conflict) => return CreateOutcome::Failed(CreateError::IdTaken),
            Err(StepError::Other(detail)) => {
                warn!("create config failed for {}: {}", id, detail);
                return CreateOutcome::Failed(CreateError::Server);
            }
        }

        // Step 2: storage directory. The record from step 1 must not be
        // left orphaned; delete it, ignoring the result.
        if let Err(e) = self.api.create_app_storage(&request.config).await {
            warn!("create storage failed for {}: {}", id, e);
            let _ = self.api.delete_app_config(id).await;
            return CreateOutcome::Failed(CreateError::Storage);
        }

        // Step 3: model upload. Same compensation as step 2.
        if let Err(e) = self
            .api
            .upload_model_files(id, &request.topology, &request.weights)
            .await
        {
            warn!("upload failed for {}: {}", id, e);
            let _ = self.api.delete_app_config(id).await;
            return CreateOutcome::Failed(CreateError::Upload);
        }

        // Step 4: session refresh. A failure here invalidates the session,
        // not the application — no compensation on this branch.
        match self.api.refresh_user().await {
            Ok(user) => CreateOutcome::Created {
                id: id.to_string(),
                user,
            },
            Err(e) => {
                warn!("user refresh failed after creating {}: {}", id, e);
                CreateOutcome::SessionExpired
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appdeck_core::TopologyLoader;
    use std::sync::Arc;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    // -------------------------------------------------------------------------
    // Scripted collaborator
    // -------------------------------------------------------------------------

    /// Records every call and fails the steps it is told to fail.
    #[derive(Default)]
    struct ScriptedApi {
        conflict_on_create: bool,
        fail_create: bool,
        fail_storage: bool,
        fail_upload: bool,
        fail_refresh: bool,
        /// When set, `create_app_config` parks until notified.
        hold_at_create: Option<Arc<Notify>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn delete_calls(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter(|c| c.starts_with("delete:"))
                .collect()
        }
    }

    #[async_trait]
    impl ProvisioningApi for ScriptedApi {
        async fn create_app_config(&self, config: &AppConfig) -> Result<(), StepError> {
            self.record(format!("create:{}", config.id));
            if let Some(gate) = &self.hold_at_create {
                gate.notified().await;
            }
            if self.conflict_on_create {
                return Err(StepError::Conflict);
            }
            if self.fail_create {
                return Err(StepError::Other("boom".into()));
            }
            Ok(())
        }

        async fn create_app_storage(&self, config: &AppConfig) -> Result<(), StepError> {
            self.record(format!("storage:{}", config.id));
            if self.fail_storage {
                return Err(StepError::Other("disk full".into()));
            }
            Ok(())
        }

        async fn upload_model_files(
            &self,
            id: &str,
            _topology: &ModelFile,
            weights: &[ModelFile],
        ) -> Result<(), StepError> {
            self.record(format!("upload:{}:{}", id, weights.len()));
            if self.fail_upload {
                return Err(StepError::Other("connection reset".into()));
            }
            Ok(())
        }

        async fn refresh_user(&self) -> Result<UserProfile, StepError> {
            self.record("refresh");
            if self.fail_refresh {
                return Err(StepError::Other("401".into()));
            }
            Ok(UserProfile {
                username: "tester".into(),
                apps: vec!["My-App_1".into()],
            })
        }

        async fn delete_app_config(&self, id: &str) -> Result<(), StepError> {
            self.record(format!("delete:{}", id));
            // Compensation failures must stay invisible to the caller
            Err(StepError::Other("delete also failed".into()))
        }
    }

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    fn topology_file() -> ModelFile {
        let json = serde_json::json!({
            "modelTopology": { "config": { "layers": [{}] } },
            "weightsManifest": [{ "paths": ["group1-shard1of1.bin"], "weights": [] }],
        });
        ModelFile::new("model.json", serde_json::to_vec(&json).unwrap())
    }

    fn request() -> CreateRequest {
        let mut config = AppConfig::draft();
        config.id = "My-App_1".into();
        CreateRequest {
            config,
            topology: topology_file(),
            weights: vec![ModelFile::new("group1-shard1of1.bin", vec![0u8; 4])],
        }
    }

    fn workflow(api: ScriptedApi) -> CreateWorkflow<ScriptedApi, TopologyLoader> {
        CreateWorkflow::new(api, TopologyLoader)
    }

    // -------------------------------------------------------------------------
    // Preconditions
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_invalid_identifier_never_reaches_network() {
        let wf = workflow(ScriptedApi::default());
        let mut req = request();
        req.config.id = "not allowed!".into();

        let outcome = wf.run(&req).await;
        assert_eq!(outcome, CreateOutcome::Failed(CreateError::FormInvalid));
        assert!(wf.api.calls().is_empty());
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_wrong_topology_name_never_reaches_network() {
        let wf = workflow(ScriptedApi::default());
        let mut req = request();
        req.topology.name = "topology.json".into();

        let outcome = wf.run(&req).await;
        assert_eq!(outcome, CreateOutcome::Failed(CreateError::FormInvalid));
        assert!(wf.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_bad_shard_name_never_reaches_network() {
        let wf = workflow(ScriptedApi::default());
        let mut req = request();
        req.weights.push(ModelFile::new("weights.bin", vec![1]));

        let outcome = wf.run(&req).await;
        assert_eq!(outcome, CreateOutcome::Failed(CreateError::FormInvalid));
        assert!(wf.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unloadable_model_aborts_before_network() {
        let wf = workflow(ScriptedApi::default());
        let mut req = request();
        req.topology.data = b"not json at all".to_vec();

        let outcome = wf.run(&req).await;
        match outcome {
            CreateOutcome::Failed(CreateError::IncompatibleModel { detail }) => {
                assert!(detail.contains("not valid JSON"), "detail: {detail}");
            }
            other => panic!("expected IncompatibleModel, got {other:?}"),
        }
        assert!(wf.api.calls().is_empty());
        assert!(!wf.is_in_flight());
    }

    // -------------------------------------------------------------------------
    // Remote steps and compensation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_scenario_a_full_success() {
        let wf = workflow(ScriptedApi::default());
        let outcome = wf.run(&request()).await;

        match outcome {
            CreateOutcome::Created { id, user } => {
                assert_eq!(id, "My-App_1");
                assert_eq!(user.apps, vec!["My-App_1"]);
            }
            other => panic!("expected Created, got {other:?}"),
        }
        assert_eq!(
            wf.api.calls(),
            vec![
                "create:My-App_1",
                "storage:My-App_1",
                "upload:My-App_1:1",
                "refresh"
            ]
        );
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_scenario_b_conflict_has_no_compensation() {
        let wf = workflow(ScriptedApi {
            conflict_on_create: true,
            ..Default::default()
        });

        let outcome = wf.run(&request()).await;
        assert_eq!(outcome, CreateOutcome::Failed(CreateError::IdTaken));
        assert_eq!(
            CreateError::IdTaken.to_string(),
            "could not create the application: the id already exists"
        );
        assert!(wf.api.delete_calls().is_empty());
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_server_error_on_create_has_no_compensation() {
        let wf = workflow(ScriptedApi {
            fail_create: true,
            ..Default::default()
        });

        let outcome = wf.run(&request()).await;
        assert_eq!(outcome, CreateOutcome::Failed(CreateError::Server));
        assert!(wf.api.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_compensates_once() {
        let wf = workflow(ScriptedApi {
            fail_storage: true,
            ..Default::default()
        });

        let outcome = wf.run(&request()).await;
        assert_eq!(outcome, CreateOutcome::Failed(CreateError::Storage));
        assert_eq!(wf.api.delete_calls(), vec!["delete:My-App_1"]);
        // No upload or refresh after the failed step
        assert!(!wf.api.calls().iter().any(|c| c.starts_with("upload")));
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_scenario_c_upload_failure_compensates_once() {
        let wf = workflow(ScriptedApi {
            fail_upload: true,
            ..Default::default()
        });

        let outcome = wf.run(&request()).await;
        assert_eq!(outcome, CreateOutcome::Failed(CreateError::Upload));
        assert_eq!(
            CreateError::Upload.to_string(),
            "could not upload the model files, try again later"
        );
        assert_eq!(wf.api.delete_calls(), vec!["delete:My-App_1"]);
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_refresh_failure_logs_out_without_compensation() {
        let wf = workflow(ScriptedApi {
            fail_refresh: true,
            ..Default::default()
        });

        let outcome = wf.run(&request()).await;
        assert_eq!(outcome, CreateOutcome::SessionExpired);
        // The created application stays: no delete on this branch
        assert!(wf.api.delete_calls().is_empty());
        assert!(!wf.is_in_flight());
    }

    // -------------------------------------------------------------------------
    // Re-entrancy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_second_submission_rejected_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let wf = Arc::new(workflow(ScriptedApi {
            hold_at_create: Some(gate.clone()),
            ..Default::default()
        }));

        let first = tokio::spawn({
            let wf = wf.clone();
            async move { wf.run(&request()).await }
        });

        // Wait until the first run is parked inside step 1
        while wf.api.calls().is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(wf.is_in_flight());

        let outcome = wf.run(&request()).await;
        assert_eq!(outcome, CreateOutcome::Failed(CreateError::AlreadyRunning));
        // The rejected run made no remote calls of its own
        assert_eq!(wf.api.calls().len(), 1);

        gate.notify_one();
        let first_outcome = first.await.unwrap();
        assert!(matches!(first_outcome, CreateOutcome::Created { .. }));
        assert!(!wf.is_in_flight());
    }

    #[tokio::test]
    async fn test_messages_are_distinct_per_failure_class() {
        let errors = [
            CreateError::FormInvalid,
            CreateError::IncompatibleModel {
                detail: "x".into(),
            },
            CreateError::IdTaken,
            CreateError::Server,
            CreateError::Storage,
            CreateError::Upload,
            CreateError::AlreadyRunning,
        ];
        let messages: std::collections::HashSet<String> =
            errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages.len(), errors.len());
    }
}
