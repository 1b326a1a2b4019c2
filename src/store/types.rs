//! Wire types for the record store's REST API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row as returned by the store.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

impl Record {
    /// String value of a field, if present and a string.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// One page of a list response.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    /// Continuation cursor; absent on the last page.
    #[serde(default)]
    pub offset: Option<String>,
}

/// A pending field update for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    #[serde(rename = "id")]
    pub record_id: String,
    #[serde(rename = "fields")]
    pub field_updates: Map<String, Value>,
}

/// Body of a PATCH call.
#[derive(Debug, Serialize)]
pub(crate) struct PatchRequest<'a> {
    pub records: &'a [PatchOperation],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Query-string builder for list requests.
///
/// ```rust
/// use care_shim::store::{Query, SortDirection};
///
/// let params = Query::new()
///     .field("Citizen ID")
///     .filter(r#"{Status}="FINISHED""#)
///     .sort("Request Datetime", SortDirection::Asc)
///     .page_size(100)
///     .into_params();
/// assert_eq!(params[0], ("fields[]".to_string(), "Citizen ID".to_string()));
/// assert_eq!(params.len(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    fields: Vec<String>,
    filter: Option<String>,
    sorts: Vec<(String, SortDirection)>,
    page_size: Option<usize>,
    max_records: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    /// Empty formulas are dropped rather than sent.
    pub fn filter(mut self, formula: impl Into<String>) -> Self {
        let formula = formula.into();
        self.filter = (!formula.is_empty()).then_some(formula);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sorts.push((field.into(), direction));
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn max_records(mut self, limit: usize) -> Self {
        self.max_records = Some(limit);
        self
    }

    pub fn into_params(self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for name in self.fields {
            params.push(("fields[]".to_string(), name));
        }
        if let Some(formula) = self.filter {
            params.push(("filterByFormula".to_string(), formula));
        }
        for (i, (field, direction)) in self.sorts.into_iter().enumerate() {
            params.push((format!("sort[{}][field]", i), field));
            params.push((format!("sort[{}][direction]", i), direction.as_str().to_string()));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize".to_string(), size.to_string()));
        }
        if let Some(limit) = self.max_records {
            params.push(("maxRecords".to_string(), limit.to_string()));
        }
        params
    }
}
