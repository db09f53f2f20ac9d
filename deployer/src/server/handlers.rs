//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DeployError;
use crate::models::deployment::Deployment;
use crate::models::provider::DeploymentProvider;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Error body returned by every failing handler
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for DeployError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeployError::ValidationError(_) => StatusCode::BAD_REQUEST,
            DeployError::NotFound(_) => StatusCode::NOT_FOUND,
            DeployError::InvalidTransition { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "kebulan-deployer".to_string(),
        version: version_info().version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// A deployment with its display progress
#[derive(Debug, Serialize)]
pub struct DeploymentView {
    #[serde(flatten)]
    pub deployment: Deployment,
    pub progress: u8,
}

impl From<Deployment> for DeploymentView {
    fn from(deployment: Deployment) -> Self {
        let progress = deployment.progress_percent();
        Self {
            deployment,
            progress,
        }
    }
}

/// Deployments of a project, newest first
pub async fn list_deployments_handler(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    let deployments: Vec<DeploymentView> = state
        .store
        .get_project_deployments_by_recency(&project_id)
        .into_iter()
        .map(DeploymentView::from)
        .collect();
    Json(deployments)
}

/// Create deployment body
#[derive(Debug, Default, Deserialize)]
pub struct CreateDeploymentBody {
    #[serde(default)]
    pub name: Option<String>,
}

/// Deploy a project. The body is optional; without one a name is generated.
pub async fn create_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
    body: Option<Json<CreateDeploymentBody>>,
) -> Result<impl IntoResponse, DeployError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let deployment = state
        .store
        .deploy_project(&project_id, body.name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(DeploymentView::from(deployment))))
}

/// Refresh and return a single deployment
pub async fn get_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(deployment_id): Path<String>,
) -> Result<impl IntoResponse, DeployError> {
    state.store.refresh_deployment(&deployment_id).await;
    let deployment = state
        .store
        .get_deployment(&deployment_id)
        .ok_or_else(|| DeployError::NotFound(format!("deployment {}", deployment_id)))?;
    Ok(Json(DeploymentView::from(deployment)))
}

/// Cancel a deployment
pub async fn cancel_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(deployment_id): Path<String>,
) -> Result<impl IntoResponse, DeployError> {
    let deployment = state
        .store
        .cancel_deployment(&deployment_id)
        .await
        .ok_or_else(|| DeployError::NotFound(format!("deployment {}", deployment_id)))?;
    Ok(Json(DeploymentView::from(deployment)))
}

/// Delete a deployment
pub async fn delete_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(deployment_id): Path<String>,
) -> StatusCode {
    state.store.delete_deployment(&deployment_id).await;
    StatusCode::NO_CONTENT
}

/// Providers response
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<DeploymentProvider>,
    pub connected: usize,
}

/// List providers
pub async fn providers_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let providers = state.store.providers();
    let connected = providers.iter().filter(|p| p.is_connected).count();
    Json(ProvidersResponse {
        providers,
        connected,
    })
}

/// Connect provider body
#[derive(Debug, Default, Deserialize)]
pub struct ConnectProviderBody {
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// Connect a provider
pub async fn connect_provider_handler(
    State(state): State<Arc<ServerState>>,
    Path(provider_id): Path<String>,
    Json(body): Json<ConnectProviderBody>,
) -> Result<StatusCode, DeployError> {
    if state.store.connect_provider(&provider_id, body.config) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(DeployError::NotFound(format!("provider {}", provider_id)))
    }
}

/// Disconnect a provider
pub async fn disconnect_provider_handler(
    State(state): State<Arc<ServerState>>,
    Path(provider_id): Path<String>,
) -> Result<StatusCode, DeployError> {
    if state.store.disconnect_provider(&provider_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(DeployError::NotFound(format!("provider {}", provider_id)))
    }
}

/// Store status response
#[derive(Debug, Serialize)]
pub struct StoreStatusResponse {
    pub is_deploying: bool,
    pub error: Option<String>,
    pub active_deployments: usize,
}

/// Busy flag and last error of the store
pub async fn store_status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(StoreStatusResponse {
        is_deploying: state.store.is_deploying(),
        error: state.store.error(),
        active_deployments: state.store.active_deployment_ids().len(),
    })
}
