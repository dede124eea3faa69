//! # Service Facade
//!
//! [`SalesforceService`] implements the eight operations of the microservice.
//! Every operation follows the same pipeline:
//!
//! ```text
//! Received -> Validated -> Authenticated -> Executing -> Succeeded
//!                                                     | RecordsPartiallyFailed
//!                                                     | Failed
//!          -> Released
//! ```
//!
//! Each call gets its own connection from the [`ConnectionFactory`] and runs
//! on its own task, so a session never outlives the call that opened it and a
//! caller hanging up mid-flight cannot skip the logout.
use crate::{
    aggregate::{SuccessOutcome, aggregate},
    crm::{ConnectionFactory, CrmConnection, RecordOutcome},
    envelope::Envelope,
    error::ServiceError,
    request::{
        DescribeRequest, IdRequest, QueryRequest, RecordsRequest, SearchRequest, UpsertRequest,
    },
    session::{Credentials, with_session},
    validate::validate,
};
use futures_util::{FutureExt, future::BoxFuture};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Server-managed or sensitive fields that are never written back.
pub const DEFAULT_OMITTED_FIELDS: &[&str] = &[
    "LastModifiedDate",
    "IsDeleted",
    "LastViewedDate",
    "LastReferencedDate",
    "SystemModstamp",
    "CreatedById",
    "CreatedDate",
    "LastModifiedById",
    "JigsawCompanyId",
    "PhotoUrl",
    "MasterRecordId",
    "IsEmailBounced",
    "OtherAddress",
    "LastCUUpdateDate",
    "Contact_Quality__c",
    "MailingAddress",
    "LastCURequestDate",
    "LastActivityDate",
    "JigsawContactId",
    "password",
    "Account",
    "Facilitator_For__r",
    "id",
    "role",
    "RecordType",
];

/// Per-record metadata added by Salesforce to read results.
const RECORD_ATTRIBUTES_KEY: &str = "attributes";

/// Target of the audit trail of every write.
pub const AUDIT_TARGET: &str = "sfapi::audit";

pub struct SalesforceService<F> {
    inner: Arc<Inner<F>>,
}

struct Inner<F> {
    factory: F,
    credentials: Credentials,
    omitted_fields: Vec<String>,
}

impl<F> Clone for SalesforceService<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: ConnectionFactory> SalesforceService<F> {
    pub fn new(factory: F, credentials: Credentials) -> Self {
        Self::with_omitted_fields(factory, credentials, DEFAULT_OMITTED_FIELDS.iter().copied())
    }

    /// Uses a custom deny-list of fields stripped from written records.
    pub fn with_omitted_fields(
        factory: F,
        credentials: Credentials,
        omitted_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                factory,
                credentials,
                omitted_fields: omitted_fields.into_iter().map(Into::into).collect(),
            }),
        }
    }

    /// Runs a SOQL query built from the requested fields, table and clauses.
    pub async fn query(&self, request: QueryRequest) -> Result<Envelope, ServiceError> {
        let request = validate(request)?;
        let soql = request.soql();
        tracing::debug!(%soql, "executing SOQL");

        let mut result = self
            .run(move |conn| {
                async move { conn.query(&soql).await.map_err(ServiceError::from) }.boxed()
            })
            .await?;

        remove_key(&mut result, RECORD_ATTRIBUTES_KEY);
        Ok(Envelope::encode(&result)?)
    }

    pub async fn retrieve(&self, request: IdRequest) -> Result<Envelope, ServiceError> {
        let IdRequest { object, ids } = validate(request)?;

        let mut result = self
            .run(move |conn| {
                async move {
                    conn.sobject(&object)
                        .retrieve(&ids)
                        .await
                        .map_err(ServiceError::from)
                }
                .boxed()
            })
            .await?;

        remove_key(&mut result, RECORD_ATTRIBUTES_KEY);
        Ok(Envelope::encode(&result)?)
    }

    pub async fn create(&self, request: RecordsRequest) -> Result<Envelope, ServiceError> {
        let RecordsRequest { object, records } = validate(request)?;
        let records = self.writable_records(&records)?;

        let context = format!("Create {object}");
        let outcomes = self
            .run(move |conn| {
                async move {
                    audit("create", &object, &records);
                    conn.sobject(&object)
                        .create(records)
                        .await
                        .map_err(ServiceError::from)
                }
                .boxed()
            })
            .await?;

        settle(outcomes, &context)
    }

    pub async fn update(&self, request: RecordsRequest) -> Result<Envelope, ServiceError> {
        let RecordsRequest { object, records } = validate(request)?;
        let records = self.writable_records(&records)?;

        let context = format!("Update {object}");
        let outcomes = self
            .run(move |conn| {
                async move {
                    audit("update", &object, &records);
                    conn.sobject(&object)
                        .update(records)
                        .await
                        .map_err(ServiceError::from)
                }
                .boxed()
            })
            .await?;

        settle(outcomes, &context)
    }

    pub async fn delete(&self, request: IdRequest) -> Result<Envelope, ServiceError> {
        let IdRequest { object, ids } = validate(request)?;

        let context = format!("Delete {object}");
        let outcomes = self
            .run(move |conn| {
                async move {
                    audit("delete", &object, &ids);
                    conn.sobject(&object)
                        .delete(&ids)
                        .await
                        .map_err(ServiceError::from)
                }
                .boxed()
            })
            .await?;

        settle(outcomes, &context)
    }

    /// Inserts or updates records, matching existing ones on `ext_id`.
    pub async fn upsert(&self, request: UpsertRequest) -> Result<Envelope, ServiceError> {
        let UpsertRequest {
            object,
            records,
            ext_id,
        } = validate(request)?;
        let records = self.writable_records(&records)?;

        let context = format!("Upsert {object} on {ext_id}");
        let outcomes = self
            .run(move |conn| {
                async move {
                    audit("upsert", &object, &records);
                    conn.sobject(&object)
                        .upsert(records, &ext_id)
                        .await
                        .map_err(ServiceError::from)
                }
                .boxed()
            })
            .await?;

        settle(outcomes, &context)
    }

    pub async fn describe(&self, request: DescribeRequest) -> Result<Envelope, ServiceError> {
        let DescribeRequest { object } = validate(request)?;

        let result = self
            .run(move |conn| {
                async move {
                    conn.sobject(&object)
                        .describe()
                        .await
                        .map_err(ServiceError::from)
                }
                .boxed()
            })
            .await?;

        Ok(Envelope::encode(&result)?)
    }

    /// Runs a SOSL search over all fields.
    pub async fn search(&self, request: SearchRequest) -> Result<Envelope, ServiceError> {
        let request = validate(request)?;
        let sosl = request.sosl();
        tracing::debug!(%sosl, "executing SOSL");

        let mut result = self
            .run(move |conn| {
                async move { conn.search(&sosl).await.map_err(ServiceError::from) }.boxed()
            })
            .await?;

        remove_key(&mut result, RECORD_ATTRIBUTES_KEY);
        Ok(Envelope::encode(&result)?)
    }

    /// Runs `work` inside a session on a fresh connection.
    async fn run<T, W>(&self, work: W) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        W: for<'c> FnOnce(&'c F::Connection) -> BoxFuture<'c, Result<T, ServiceError>>
            + Send
            + 'static,
    {
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let conn = inner.factory.connect();
            with_session(&inner.credentials, conn, work).await
        });

        match task.await {
            Ok(outcome) => Ok(outcome?),
            Err(err) => Err(ServiceError::Aborted(err.to_string())),
        }
    }

    /// Decodes record envelopes and strips the omitted fields.
    fn writable_records(
        &self,
        records: &[Envelope],
    ) -> Result<Vec<Map<String, Value>>, ServiceError> {
        records
            .iter()
            .map(|envelope| -> Result<_, ServiceError> {
                let mut record: Map<String, Value> = envelope.require()?;
                for field in &self.inner.omitted_fields {
                    record.remove(field);
                }
                Ok(record)
            })
            .collect()
    }
}

fn settle(outcomes: Vec<RecordOutcome>, context: &str) -> Result<Envelope, ServiceError> {
    let successes: Vec<SuccessOutcome> = aggregate(outcomes, Some(context))?;
    Ok(Envelope::encode(&successes)?)
}

/// Records a write once its session is open.
fn audit<T: serde::Serialize + ?Sized>(operation: &str, object: &str, payload: &T) {
    let payload = serde_json::to_string(payload).unwrap_or_default();
    tracing::info!(target: AUDIT_TARGET, operation, object, %payload, "writing records");
}

/// Removes `key` from every object nested in `value`.
fn remove_key(value: &mut Value, key: &str) {
    match value {
        Value::Object(map) => {
            map.remove(key);
            map.values_mut().for_each(|v| remove_key(v, key));
        }
        Value::Array(items) => items.iter_mut().for_each(|v| remove_key(v, key)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attributes_are_removed_at_every_depth() {
        let mut result = json!({
            "totalSize": 1,
            "done": true,
            "records": [{
                "attributes": { "type": "Contact", "url": "/services/data/v62.0/sobjects/Contact/003A" },
                "Id": "003A",
                "Account": {
                    "attributes": { "type": "Account" },
                    "Name": "Acme",
                },
            }],
        });

        remove_key(&mut result, RECORD_ATTRIBUTES_KEY);

        assert_eq!(
            result,
            json!({
                "totalSize": 1,
                "done": true,
                "records": [{ "Id": "003A", "Account": { "Name": "Acme" } }],
            })
        );
    }
}
