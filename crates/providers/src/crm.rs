//! CRM backends, resolved by provider name.
//!
//! - `memory`: process-local records, used offline and in tests
//! - `rest`: JSON over HTTP against a CRM gateway

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use assistline_core::backend::{
    CaseRecord, ConversationLog, CrmProvider, CustomerRecord, LogRecord, NewCase,
};
use assistline_core::error::CrmError;
use chrono::Utc;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// In-process CRM. Records live until the process exits.
#[derive(Default)]
pub struct InMemoryCrm {
    customers: RwLock<HashMap<String, CustomerRecord>>,
    cases: RwLock<Vec<CaseRecord>>,
    logs: RwLock<Vec<(LogRecord, ConversationLog)>>,
}

fn poisoned() -> CrmError {
    CrmError::Request("in-memory CRM lock poisoned".into())
}

impl InMemoryCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a customer record.
    pub fn with_customer(self, record: CustomerRecord) -> Self {
        if let Ok(mut customers) = self.customers.write() {
            customers.insert(record.customer_id.clone(), record);
        }
        self
    }

    /// Conversation logs written so far.
    pub fn logs(&self) -> Vec<ConversationLog> {
        self.logs
            .read()
            .map(|logs| logs.iter().map(|(_, log)| log.clone()).collect())
            .unwrap_or_default()
    }

    pub fn cases(&self) -> Vec<CaseRecord> {
        self.cases.read().map(|cases| cases.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CrmProvider for InMemoryCrm {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_customer(&self, customer_id: &str) -> Result<CustomerRecord, CrmError> {
        self.customers
            .read()
            .map_err(|_| poisoned())?
            .get(customer_id)
            .cloned()
            .ok_or_else(|| CrmError::CustomerNotFound(customer_id.to_string()))
    }

    async fn create_case(&self, case: NewCase) -> Result<CaseRecord, CrmError> {
        let record = CaseRecord {
            case_id: format!("CASE-{}", Uuid::new_v4().simple()),
            customer_id: case.customer_id,
            status: "open".into(),
            created_at: Utc::now(),
        };
        self.cases.write().map_err(|_| poisoned())?.push(record.clone());
        Ok(record)
    }

    async fn log_conversation(&self, log: ConversationLog) -> Result<LogRecord, CrmError> {
        let record = LogRecord {
            log_id: format!("LOG-{}", Uuid::new_v4().simple()),
            logged_at: Utc::now(),
        };
        self.logs
            .write()
            .map_err(|_| poisoned())?
            .push((record.clone(), log));
        Ok(record)
    }
}

/// CRM reached over a JSON REST gateway.
///
/// - `GET  {endpoint}/customers/{id}`
/// - `POST {endpoint}/cases`
/// - `POST {endpoint}/conversation-logs`
/// - `GET  {endpoint}/health`
pub struct RestCrm {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl RestCrm {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, CrmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| CrmError::Request(format!("HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CrmError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::Request(format!("HTTP {}", status.as_u16())));
        }
        response
            .json()
            .await
            .map_err(|e| CrmError::Request(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl CrmProvider for RestCrm {
    fn name(&self) -> &str {
        "rest"
    }

    async fn get_customer(&self, customer_id: &str) -> Result<CustomerRecord, CrmError> {
        let response = self
            .authorized(self.client.get(self.url(&format!("customers/{customer_id}"))))
            .send()
            .await
            .map_err(|e| CrmError::Request(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CrmError::CustomerNotFound(customer_id.to_string()));
        }
        Self::read_json(response).await
    }

    async fn create_case(&self, case: NewCase) -> Result<CaseRecord, CrmError> {
        let response = self
            .authorized(self.client.post(self.url("cases")))
            .json(&case)
            .send()
            .await
            .map_err(|e| CrmError::Request(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn log_conversation(&self, log: ConversationLog) -> Result<LogRecord, CrmError> {
        let response = self
            .authorized(self.client.post(self.url("conversation-logs")))
            .json(&log)
            .send()
            .await
            .map_err(|e| CrmError::Request(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn health_check(&self) -> Result<bool, CrmError> {
        let response = self
            .authorized(self.client.get(self.url("health")))
            .send()
            .await
            .map_err(|e| CrmError::Request(e.to_string()))?;
        Ok(response.status().is_success())
    }
}
