//! Domain requests for the eight facade operations.
//!
//! Each request converts from (and into) its generated wire message. Wire
//! messages use Protobuf defaults for missing fields, so a missing `table` is
//! indistinguishable from an empty one here; validation rejects both.
use crate::envelope::Envelope;
use sfapi_proto::pb;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRequest {
    pub fields: Vec<String>,
    pub table: String,
    pub clauses: Option<String>,
}

impl QueryRequest {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>, table: impl Into<String>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            table: table.into(),
            clauses: None,
        }
    }

    pub fn with_clauses(mut self, clauses: impl Into<String>) -> Self {
        self.clauses = Some(clauses.into());
        self
    }

    /// Builds the SOQL statement for this request.
    pub fn soql(&self) -> String {
        let mut soql = format!("SELECT {} FROM {}", self.fields.join(","), self.table);

        if let Some(clauses) = &self.clauses {
            soql.push_str(" WHERE ");
            soql.push_str(clauses);
        }

        soql
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdRequest {
    pub object: String,
    pub ids: Vec<String>,
}

impl IdRequest {
    pub fn new(object: impl Into<String>, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            object: object.into(),
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordsRequest {
    pub object: String,
    pub records: Vec<Envelope>,
}

impl RecordsRequest {
    pub fn new(object: impl Into<String>, records: Vec<Envelope>) -> Self {
        Self {
            object: object.into(),
            records,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpsertRequest {
    pub object: String,
    pub records: Vec<Envelope>,
    /// Name of the external id field used to match existing records.
    pub ext_id: String,
}

impl UpsertRequest {
    pub fn new(object: impl Into<String>, records: Vec<Envelope>, ext_id: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            records,
            ext_id: ext_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescribeRequest {
    pub object: String,
}

impl DescribeRequest {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchRequest {
    /// Free text search term.
    pub search: String,
    /// The `RETURNING` clause, e.g. `Account(Id, Name), Contact(Id, Name)`.
    pub retrieve: String,
}

impl SearchRequest {
    pub fn new(search: impl Into<String>, retrieve: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            retrieve: retrieve.into(),
        }
    }

    /// Builds the SOSL statement for this request.
    pub fn sosl(&self) -> String {
        format!(
            "FIND {} IN ALL FIELDS RETURNING {}",
            self.search, self.retrieve
        )
    }
}

impl From<pb::QueryRequest> for QueryRequest {
    fn from(req: pb::QueryRequest) -> Self {
        Self {
            fields: req.fields,
            table: req.table,
            clauses: req.clauses.filter(|c| !c.is_empty()),
        }
    }
}

impl From<QueryRequest> for pb::QueryRequest {
    fn from(req: QueryRequest) -> Self {
        Self {
            fields: req.fields,
            table: req.table,
            clauses: req.clauses,
        }
    }
}

impl From<pb::IdRequest> for IdRequest {
    fn from(req: pb::IdRequest) -> Self {
        Self {
            object: req.object,
            ids: req.ids,
        }
    }
}

impl From<IdRequest> for pb::IdRequest {
    fn from(req: IdRequest) -> Self {
        Self {
            object: req.object,
            ids: req.ids,
        }
    }
}

impl From<pb::RecordsRequest> for RecordsRequest {
    fn from(req: pb::RecordsRequest) -> Self {
        Self {
            object: req.object,
            records: req.records.into_iter().map(Envelope::from).collect(),
        }
    }
}

impl From<RecordsRequest> for pb::RecordsRequest {
    fn from(req: RecordsRequest) -> Self {
        Self {
            object: req.object,
            records: req.records.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<pb::UpsertRequest> for UpsertRequest {
    fn from(req: pb::UpsertRequest) -> Self {
        Self {
            object: req.object,
            records: req.records.into_iter().map(Envelope::from).collect(),
            ext_id: req.ext_id,
        }
    }
}

impl From<UpsertRequest> for pb::UpsertRequest {
    fn from(req: UpsertRequest) -> Self {
        Self {
            object: req.object,
            records: req.records.into_iter().map(Into::into).collect(),
            ext_id: req.ext_id,
        }
    }
}

impl From<pb::DescribeRequest> for DescribeRequest {
    fn from(req: pb::DescribeRequest) -> Self {
        Self { object: req.object }
    }
}

impl From<DescribeRequest> for pb::DescribeRequest {
    fn from(req: DescribeRequest) -> Self {
        Self { object: req.object }
    }
}

impl From<pb::SearchRequest> for SearchRequest {
    fn from(req: pb::SearchRequest) -> Self {
        Self {
            search: req.search,
            retrieve: req.retrieve,
        }
    }
}

impl From<SearchRequest> for pb::SearchRequest {
    fn from(req: SearchRequest) -> Self {
        Self {
            search: req.search,
            retrieve: req.retrieve,
        }
    }
}
