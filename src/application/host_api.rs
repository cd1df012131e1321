// Host platform data API - the capability every roster and the aggregator depend on
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parameters of a `Get` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParams {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<Value>,
}

impl GetParams {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            results_limit: None,
            search: None,
        }
    }

    pub fn with_results_limit(mut self, limit: usize) -> Self {
        self.results_limit = Some(limit);
        self
    }

    pub fn with_search(mut self, search: Value) -> Self {
        self.search = Some(search);
        self
    }

    /// `search.<key>.id`, e.g. the device a `LogRecord` query is scoped to.
    pub fn search_id(&self, key: &str) -> Option<&str> {
        self.search.as_ref()?.get(key)?.get("id")?.as_str()
    }

    /// A top-level string value of the search, e.g. `fromDate`.
    pub fn search_str(&self, key: &str) -> Option<&str> {
        self.search.as_ref()?.get(key)?.as_str()
    }
}

/// One entry of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiCall {
    pub method: String,
    pub params: GetParams,
}

impl ApiCall {
    pub fn get(params: GetParams) -> Self {
        Self {
            method: "Get".to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum HostApiError {
    /// Error reported by the host, message passed through verbatim.
    #[error("{0}")]
    Rpc(String),
    #[error("Request to host failed: {0}")]
    Transport(String),
    #[error("Unexpected response from host: {0}")]
    Decode(String),
    #[error("Batch returned {actual} results for {expected} calls")]
    BatchMismatch { expected: usize, actual: usize },
}

#[async_trait]
pub trait HostApi: Send + Sync {
    /// Single request. `Ok(None)` when the host answers with a null result.
    async fn call(&self, method: &str, params: GetParams) -> Result<Option<Value>, HostApiError>;

    /// Batched request. Results are positionally aligned with `calls`; any
    /// failing sub-call fails the whole batch.
    async fn multi_call(&self, calls: Vec<ApiCall>) -> Result<Vec<Value>, HostApiError>;
}

/// `Get` for a list of entities, decoded.
pub async fn get_entities<T: DeserializeOwned>(
    api: &dyn HostApi,
    params: GetParams,
) -> Result<Option<Vec<T>>, HostApiError> {
    match api.call("Get", params).await? {
        Some(value) => decode_list(value).map(Some),
        None => Ok(None),
    }
}

/// Batch of `Get`s, one decoded list per call.
pub async fn get_batch<T: DeserializeOwned>(
    api: &dyn HostApi,
    calls: Vec<ApiCall>,
) -> Result<Vec<Vec<T>>, HostApiError> {
    let expected = calls.len();
    let results = api.multi_call(calls).await?;
    if results.len() != expected {
        return Err(HostApiError::BatchMismatch {
            expected,
            actual: results.len(),
        });
    }
    results.into_iter().map(decode_list).collect()
}

fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, HostApiError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(|e| HostApiError::Decode(e.to_string()))
}

#[cfg(test)]
pub mod testing {
    //! Scripted in-memory host for tests.
    use super::*;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&GetParams) -> Result<Value, HostApiError> + Send + Sync>;

    pub struct ScriptedHostApi {
        responder: Responder,
        calls: Mutex<Vec<GetParams>>,
        batches: Mutex<Vec<Vec<GetParams>>>,
    }

    impl ScriptedHostApi {
        pub fn new(
            responder: impl Fn(&GetParams) -> Result<Value, HostApiError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                calls: Mutex::new(Vec::new()),
                batches: Mutex::new(Vec::new()),
            }
        }

        /// Host that answers every query with an empty list.
        pub fn empty() -> Self {
            Self::new(|_| Ok(Value::Array(Vec::new())))
        }

        pub fn single_calls(&self) -> Vec<GetParams> {
            self.calls.lock().unwrap().clone()
        }

        pub fn batches(&self) -> Vec<Vec<GetParams>> {
            self.batches.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.single_calls().len() + self.batches().len()
        }
    }

    #[async_trait]
    impl HostApi for ScriptedHostApi {
        async fn call(
            &self,
            _method: &str,
            params: GetParams,
        ) -> Result<Option<Value>, HostApiError> {
            self.calls.lock().unwrap().push(params.clone());
            let value = (self.responder)(&params)?;
            Ok(if value.is_null() { None } else { Some(value) })
        }

        async fn multi_call(&self, calls: Vec<ApiCall>) -> Result<Vec<Value>, HostApiError> {
            self.batches
                .lock()
                .unwrap()
                .push(calls.iter().map(|c| c.params.clone()).collect());
            calls.iter().map(|c| (self.responder)(&c.params)).collect()
        }
    }
}
