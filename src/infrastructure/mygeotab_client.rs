// MyGeotab JSON-RPC implementation of the host data API
use crate::application::host_api::{ApiCall, GetParams, HostApi, HostApiError};
use crate::infrastructure::config::HostApiSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub database: String,
    pub user_name: String,
    pub session_id: String,
}

#[derive(Debug, Clone)]
struct Session {
    credentials: Credentials,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<RpcErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AuthenticateResult {
    credentials: Credentials,
    #[serde(default)]
    path: Option<String>,
}

pub struct MyGeotabClient {
    http: reqwest::Client,
    settings: HostApiSettings,
    session: Mutex<Option<Session>>,
}

impl MyGeotabClient {
    pub fn new(settings: HostApiSettings) -> Result<Self, HostApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| HostApiError::Transport(e.to_string()))?;

        let session = settings.session_id.clone().map(|session_id| Session {
            credentials: Credentials {
                database: settings.database.clone(),
                user_name: settings.user_name.clone(),
                session_id,
            },
            endpoint: endpoint_for(&settings.server),
        });

        Ok(Self {
            http,
            settings,
            session: Mutex::new(session),
        })
    }

    async fn session(&self) -> Result<Session, HostApiError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.authenticate().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn authenticate(&self) -> Result<Session, HostApiError> {
        let password = self.settings.password.as_deref().ok_or_else(|| {
            HostApiError::Rpc("No session id or password configured for the host API".to_string())
        })?;
        let endpoint = endpoint_for(&self.settings.server);
        let body = json!({
            "method": "Authenticate",
            "params": {
                "database": self.settings.database,
                "userName": self.settings.user_name,
                "password": password,
            }
        });

        tracing::info!(
            "Authenticating {} against database {}",
            self.settings.user_name,
            self.settings.database
        );
        let result = self.post(&endpoint, &body).await?;
        let auth: AuthenticateResult =
            serde_json::from_value(result).map_err(|e| HostApiError::Decode(e.to_string()))?;

        // The federation server redirects to the server that hosts the database.
        let endpoint = match auth.path.as_deref() {
            Some(path) if !path.is_empty() && path != "ThisServer" => endpoint_for(path),
            _ => endpoint,
        };
        Ok(Session {
            credentials: auth.credentials,
            endpoint,
        })
    }

    async fn execute(&self, method: &str, params: Value) -> Result<Value, HostApiError> {
        let session = self.session().await?;
        let body = build_request(method, params, &session.credentials);
        match self.post(&session.endpoint, &body).await {
            Err(HostApiError::Rpc(message)) if message.contains("InvalidUserException") => {
                // Expired session; the next request authenticates again.
                *self.session.lock().await = None;
                Err(HostApiError::Rpc(message))
            }
            other => other,
        }
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, HostApiError> {
        let response = self
            .http
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| HostApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(HostApiError::Transport(format!("status {}: {}", status, text)));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| HostApiError::Decode(e.to_string()))?;
        parse_response(payload)
    }
}

#[async_trait]
impl HostApi for MyGeotabClient {
    async fn call(&self, method: &str, params: GetParams) -> Result<Option<Value>, HostApiError> {
        tracing::debug!("{} {}", method, params.type_name);
        let params = serde_json::to_value(&params).map_err(|e| HostApiError::Decode(e.to_string()))?;
        let result = self.execute(method, params).await?;
        Ok(if result.is_null() { None } else { Some(result) })
    }

    async fn multi_call(&self, calls: Vec<ApiCall>) -> Result<Vec<Value>, HostApiError> {
        let expected = calls.len();
        tracing::debug!("ExecuteMultiCall with {} calls", expected);
        let calls = serde_json::to_value(&calls).map_err(|e| HostApiError::Decode(e.to_string()))?;
        let result = self.execute("ExecuteMultiCall", json!({ "calls": calls })).await?;

        match result {
            Value::Array(results) => Ok(results),
            Value::Null if expected == 0 => Ok(Vec::new()),
            other => Err(HostApiError::Decode(format!(
                "ExecuteMultiCall returned {}",
                other
            ))),
        }
    }
}

fn endpoint_for(server: &str) -> String {
    let server = server.trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        format!("{}/apiv1", server)
    } else {
        format!("https://{}/apiv1", server)
    }
}

/// JSON-RPC body with the session credentials merged into the params.
fn build_request(method: &str, params: Value, credentials: &Credentials) -> Value {
    let mut params = match params {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    params.insert(
        "credentials".to_string(),
        serde_json::to_value(credentials).unwrap_or(Value::Null),
    );
    json!({ "method": method, "params": params })
}

fn parse_response(payload: Value) -> Result<Value, HostApiError> {
    let response: RpcResponse =
        serde_json::from_value(payload).map_err(|e| HostApiError::Decode(e.to_string()))?;

    if let Some(error) = response.error {
        let detail = error
            .errors
            .iter()
            .map(|d| if d.name.is_empty() { d.message.clone() } else { format!("{}: {}", d.name, d.message) })
            .collect::<Vec<_>>()
            .join("; ");
        let message = if detail.is_empty() || error.message.contains(&detail) {
            error.message
        } else if error.message.is_empty() {
            detail
        } else {
            format!("{} ({})", error.message, detail)
        };
        tracing::warn!("Host API error: {}", message);
        return Err(HostApiError::Rpc(message));
    }

    Ok(response.result.unwrap_or(Value::Null))
}
