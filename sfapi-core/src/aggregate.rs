//! # Record Result Aggregation
//!
//! Batch mutations report one outcome per record. A batch where some records
//! failed is a partial failure: the caller gets an [`AggregateMutateError`]
//! that tells exactly which records landed and why the others did not.
use crate::crm::{FailureDetail, RecordOutcome};
use serde::{Deserialize, Serialize};

/// A record the CRM accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessOutcome {
    pub id: String,
    pub success: bool,
}

impl SuccessOutcome {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct AggregateMutateError {
    pub message: String,
    /// Failure details of every failed record, flattened in batch order.
    pub failures: Vec<FailureDetail>,
    /// Ids of the records that were written, in batch order.
    pub success_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Partitions `outcomes`, failing when any record failed.
pub fn aggregate(
    outcomes: Vec<RecordOutcome>,
    context: Option<&str>,
) -> Result<Vec<SuccessOutcome>, AggregateMutateError> {
    let total = outcomes.len();
    let mut successes = Vec::with_capacity(total);
    let mut failures = Vec::new();
    let mut failed_records = 0;

    for outcome in outcomes {
        match outcome {
            RecordOutcome::Success { id } => successes.push(SuccessOutcome::new(id)),
            RecordOutcome::Failure { errors } => {
                failed_records += 1;
                failures.extend(errors);
            }
        }
    }

    if failed_records == 0 {
        return Ok(successes);
    }

    let mut message = format!("{failed_records} of {total} records failed");
    if let Some(context) = context {
        message = format!("{context}: {message}");
    }

    Err(AggregateMutateError {
        message,
        failures,
        success_ids: successes.into_iter().map(|s| s.id).collect(),
        context: context.map(str::to_string),
    })
}
