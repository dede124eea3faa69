use serde_json::{Map, Value};
use sfapi_core::crm::{CrmConnection, CrmError, RecordOutcome};
use sfapi_core::session::Credentials;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

// An in-memory CRM that records every call it receives.
// Clones share the same state, so a factory can hand out a clone per call
// and the test can still inspect what happened.
#[derive(Clone, Default)]
pub struct MockCrm {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
pub struct MockState {
    pub logins: usize,
    pub logouts: usize,
    /// Every SOQL/SOSL statement or object name an operation was called with.
    pub calls: Vec<String>,
    /// Records received by the last write.
    pub written: Vec<Map<String, Value>>,
    pub ext_id_field: Option<String>,

    pub login_error: Option<CrmError>,
    pub logout_error: Option<CrmError>,
    pub operation_error: Option<CrmError>,
    /// Result returned by reads (query, search, retrieve and describe).
    pub read_result: Value,
    /// Outcomes returned by writes. When empty every record succeeds.
    pub outcomes: Vec<RecordOutcome>,
    /// How long every operation takes before answering.
    pub delay: Option<Duration>,
}

impl MockCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn failing_login(self, err: CrmError) -> Self {
        self.state().login_error = Some(err);
        self
    }

    pub fn failing_logout(self, err: CrmError) -> Self {
        self.state().logout_error = Some(err);
        self
    }

    pub fn failing_operation(self, err: CrmError) -> Self {
        self.state().operation_error = Some(err);
        self
    }

    pub fn reading(self, result: Value) -> Self {
        self.state().read_result = result;
        self
    }

    pub fn writing(self, outcomes: Vec<RecordOutcome>) -> Self {
        self.state().outcomes = outcomes;
        self
    }

    pub fn delayed(self, delay: Duration) -> Self {
        self.state().delay = Some(delay);
        self
    }

    async fn pause(&self) {
        let delay = self.state().delay;

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn read(&self, call: String) -> Result<Value, CrmError> {
        self.pause().await;
        let mut state = self.state();
        state.calls.push(call);

        match &state.operation_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.read_result.clone()),
        }
    }

    async fn write(
        &self,
        call: String,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.pause().await;
        let mut state = self.state();
        state.calls.push(call);

        if let Some(err) = &state.operation_error {
            return Err(err.clone());
        }

        let outcomes = if state.outcomes.is_empty() {
            (0..records.len())
                .map(|i| RecordOutcome::success(format!("003{i:015}")))
                .collect()
        } else {
            state.outcomes.clone()
        };

        state.written = records;
        Ok(outcomes)
    }
}

#[tonic::async_trait]
impl CrmConnection for MockCrm {
    async fn login(&self, _credentials: &Credentials) -> Result<(), CrmError> {
        let mut state = self.state();
        state.logins += 1;

        match &state.login_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn logout(&self) -> Result<(), CrmError> {
        let mut state = self.state();
        state.logouts += 1;

        match &state.logout_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn query(&self, soql: &str) -> Result<Value, CrmError> {
        self.read(soql.to_string()).await
    }

    async fn search(&self, sosl: &str) -> Result<Value, CrmError> {
        self.read(sosl.to_string()).await
    }

    async fn describe(&self, object: &str) -> Result<Value, CrmError> {
        self.read(format!("describe {object}")).await
    }

    async fn retrieve(&self, object: &str, ids: &[String]) -> Result<Value, CrmError> {
        self.read(format!("retrieve {object} {}", ids.join(","))).await
    }

    async fn create(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.write(format!("create {object}"), records).await
    }

    async fn update(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.write(format!("update {object}"), records).await
    }

    async fn delete(&self, object: &str, ids: &[String]) -> Result<Vec<RecordOutcome>, CrmError> {
        let records = ids
            .iter()
            .map(|id| Map::from_iter([("Id".to_string(), Value::from(id.as_str()))]))
            .collect();
        self.write(format!("delete {object}"), records).await
    }

    async fn upsert(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
        ext_id_field: &str,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.state().ext_id_field = Some(ext_id_field.to_string());
        self.write(format!("upsert {object}"), records).await
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("integration@example.com", "secret")
}
