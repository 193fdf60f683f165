use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::{
    auth::{self, require_session, ValidationError},
    endpoints::{ComponentKind, Placeholder, Substitutions},
    jolokia::{BrokerIdentity, ComponentDetails, JolokiaClient, JolokiaEnvelope, JolokiaError},
    state::AppState,
};

pub type SharedClient = Arc<JolokiaClient>;

/// Failure taxonomy at the HTTP boundary. Validation and authentication
/// failures are 401s; configuration and transport failures are 500s;
/// protocol failures are 500s that carry the broker's own error strings.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    AuthFailed(&'static str),
    MissingToken,
    InvalidToken,
    SessionExpired,
    Jolokia(JolokiaError),
}

impl From<JolokiaError> for ApiError {
    fn from(err: JolokiaError) -> Self {
        ApiError::Jolokia(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_type: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message, error_type) = match self {
            ApiError::Validation(err) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
            ApiError::AuthFailed(msg) => (StatusCode::UNAUTHORIZED, msg.to_string(), None),
            ApiError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                format!("missing {} header", auth::SESSION_HEADER),
                None,
            ),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid or expired session token".to_string(),
                None,
            ),
            ApiError::SessionExpired => {
                (StatusCode::UNAUTHORIZED, "session expired".to_string(), None)
            }
            ApiError::Jolokia(JolokiaError::Protocol {
                status,
                error,
                error_type,
            }) => {
                debug!(jolokia_status = status, "jolokia protocol error");
                (StatusCode::INTERNAL_SERVER_ERROR, error, error_type)
            }
            ApiError::Jolokia(err) => {
                error!(error = %err, "jolokia request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None)
            }
        };
        (
            code,
            Json(ErrorBody {
                status: "failed",
                message,
                error_type,
            }),
        )
            .into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/jolokia/login", post(login))
        .route("/api-info", get(api_info))
        .route("/brokers", get(get_brokers))
        .route("/brokerComponents", get(get_broker_components))
        .route("/addresses", get(get_addresses))
        .route("/queues", get(get_queues))
        .route("/acceptors", get(get_acceptors))
        .route("/brokerDetails", get(get_broker_details))
        .route("/addressDetails", get(get_address_details))
        .route("/acceptorDetails", get(get_acceptor_details))
        .route("/queueDetails", get(get_queue_details))
        .route("/readBrokerAttributes", get(read_broker_attributes))
        .route("/readAddressAttributes", get(read_address_attributes))
        .route("/execBrokerOperation", post(exec_broker_operation))
        .with_state(state.clone());

    Router::new()
        .nest(auth::API_PREFIX, api)
        .layer(middleware::from_fn_with_state(state, require_session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub broker_name: String,
    pub user_name: String,
    pub password: String,
    pub jolokia_host: String,
    pub scheme: String,
    pub port: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(
        rename = "jolokia-session-id",
        skip_serializing_if = "Option::is_none"
    )]
    pub jolokia_session_id: Option<String>,
}

/// POST /api/v1/jolokia/login
///
/// Validates the transport parameters, probes the broker through a throwaway
/// client, and on success mints a session token and installs the validated
/// client into the store under the caller-chosen broker alias.
pub async fn login(
    State(state): State<AppState>,
    Form(payload): Form<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    auth::validate_host(&payload.jolokia_host).map_err(ApiError::Validation)?;
    auth::validate_scheme(&payload.scheme).map_err(ApiError::Validation)?;
    let port = auth::validate_port(&payload.port).map_err(ApiError::Validation)?;

    let identity = BrokerIdentity {
        host: payload.jolokia_host,
        port,
        scheme: payload.scheme,
        username: payload.user_name,
        password: payload.password,
    };
    let client = Arc::new(JolokiaClient::new(identity));

    match client.validate().await {
        Ok(true) => {
            let (token, _exp) = state.tokens.sign(&payload.broker_name);
            state.sessions.put(payload.broker_name.clone(), client);
            info!(broker = %payload.broker_name, "login succeeded");
            Ok(Json(LoginResponse {
                status: "success",
                message: "login succeeded".to_string(),
                jolokia_session_id: Some(token),
            }))
        }
        Ok(false) => {
            debug!(broker = %payload.broker_name, "login probe rejected");
            Err(ApiError::AuthFailed(
                "broker credentials rejected or broker not uniquely resolvable",
            ))
        }
        Err(err) => Err(ApiError::Jolokia(err)),
    }
}

/// GET /api/v1/api-info, reachable without a session.
pub async fn api_info() -> Json<Value> {
    Json(json!({
        "status": "successful",
        "message": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "security": { "enabled": true },
        },
    }))
}

/// Wrap a concrete component name in the literal quotes object-name syntax
/// requires; a `*` wildcard stays bare so it keeps matching.
fn quoted(name: &str) -> String {
    if name == "*" {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

fn comma_separated(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn get_brokers(
    Extension(client): Extension<SharedClient>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = client
        .search(ComponentKind::Broker, &Substitutions::new())
        .await?;
    Ok(Json(names))
}

pub async fn get_broker_components(
    Extension(client): Extension<SharedClient>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = client
        .search(ComponentKind::BrokerComponents, &Substitutions::new())
        .await?;
    Ok(Json(names))
}

pub async fn get_addresses(
    Extension(client): Extension<SharedClient>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = client
        .search(ComponentKind::Address, &Substitutions::new())
        .await?;
    Ok(Json(names))
}

pub async fn get_acceptors(
    Extension(client): Extension<SharedClient>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = client
        .search(ComponentKind::Acceptor, &Substitutions::new())
        .await?;
    Ok(Json(names))
}

fn default_wildcard() -> String {
    "*".to_string()
}

#[derive(Debug, Deserialize)]
pub struct QueuesQuery {
    #[serde(default = "default_wildcard")]
    pub address: String,
}

pub async fn get_queues(
    Extension(client): Extension<SharedClient>,
    Query(query): Query<QueuesQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut subs = Substitutions::new();
    subs.insert(Placeholder::AddressName, quoted(&query.address));
    let names = client.search(ComponentKind::Queue, &subs).await?;
    Ok(Json(names))
}

pub async fn get_broker_details(
    Extension(client): Extension<SharedClient>,
) -> Result<Json<ComponentDetails>, ApiError> {
    let details = client
        .list_details(ComponentKind::BrokerDetails, &Substitutions::new())
        .await?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

pub async fn get_address_details(
    Extension(client): Extension<SharedClient>,
    Query(query): Query<NameQuery>,
) -> Result<Json<ComponentDetails>, ApiError> {
    let mut subs = Substitutions::new();
    subs.insert(Placeholder::AddressName, quoted(&query.name));
    let details = client
        .list_details(ComponentKind::AddressDetails, &subs)
        .await?;
    Ok(Json(details))
}

pub async fn get_acceptor_details(
    Extension(client): Extension<SharedClient>,
    Query(query): Query<NameQuery>,
) -> Result<Json<ComponentDetails>, ApiError> {
    let mut subs = Substitutions::new();
    subs.insert(Placeholder::AcceptorName, quoted(&query.name));
    let details = client
        .list_details(ComponentKind::AcceptorDetails, &subs)
        .await?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDetailsQuery {
    pub name: String,
    pub address_name: String,
    pub routing_type: String,
}

pub async fn get_queue_details(
    Extension(client): Extension<SharedClient>,
    Query(query): Query<QueueDetailsQuery>,
) -> Result<Json<ComponentDetails>, ApiError> {
    let mut subs = Substitutions::new();
    subs.insert(Placeholder::QueueName, quoted(&query.name));
    subs.insert(Placeholder::AddressName, quoted(&query.address_name));
    subs.insert(Placeholder::RoutingType, quoted(&query.routing_type));
    let details = client
        .list_details(ComponentKind::QueueDetails, &subs)
        .await?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize)]
pub struct ReadBrokerQuery {
    pub names: String,
}

pub async fn read_broker_attributes(
    Extension(client): Extension<SharedClient>,
    Query(query): Query<ReadBrokerQuery>,
) -> Result<Json<Vec<JolokiaEnvelope>>, ApiError> {
    let attributes = comma_separated(&query.names);
    let envelopes = client
        .read_attributes(ComponentKind::BrokerDetails, &Substitutions::new(), &attributes)
        .await?;
    Ok(Json(envelopes))
}

#[derive(Debug, Deserialize)]
pub struct ReadAddressQuery {
    pub name: String,
    pub attrs: String,
}

pub async fn read_address_attributes(
    Extension(client): Extension<SharedClient>,
    Query(query): Query<ReadAddressQuery>,
) -> Result<Json<Vec<JolokiaEnvelope>>, ApiError> {
    let mut subs = Substitutions::new();
    subs.insert(Placeholder::AddressName, quoted(&query.name));
    let attributes = comma_separated(&query.attrs);
    let envelopes = client
        .read_attributes(ComponentKind::AddressDetails, &subs, &attributes)
        .await?;
    Ok(Json(envelopes))
}

#[derive(Debug, Deserialize)]
pub struct ExecRequest {
    pub signature: String,
    #[serde(default)]
    pub args: Vec<String>,
}

pub async fn exec_broker_operation(
    Extension(client): Extension<SharedClient>,
    Json(payload): Json<ExecRequest>,
) -> Result<Json<JolokiaEnvelope>, ApiError> {
    let envelope = client
        .exec_operation(
            ComponentKind::BrokerDetails,
            &Substitutions::new(),
            &payload.signature,
            &payload.args,
        )
        .await?;
    Ok(Json(envelope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_preserves_wildcard() {
        assert_eq!(quoted("*"), "*");
        assert_eq!(quoted("DLQ"), "\"DLQ\"");
    }

    #[test]
    fn comma_separated_drops_empty_items() {
        assert_eq!(
            comma_separated("Status, Version,"),
            vec!["Status".to_string(), "Version".to_string()]
        );
        assert!(comma_separated("").is_empty());
        assert!(comma_separated(" , ").is_empty());
    }
}
