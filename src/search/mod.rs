pub mod filters;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::schema::Model;
use crate::error::{FilterError, Result};
use crate::query::SelectQuery;
use filters::{Filter, FilterKind, FilterOptions, FilterValue, SearchFilter};

/// Submitted search values keyed by field name.
pub type SearchRequest = BTreeMap<String, FilterValue>;

/// The filters for one search request.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one filter per submitted field using the configured field kinds.
    /// A submitted field with no configured kind is rejected.
    pub fn from_request(
        fields: &BTreeMap<String, FilterKind>,
        request: &SearchRequest,
        options: &FilterOptions,
    ) -> Result<Self> {
        let mut set = FilterSet::new();
        for (field, value) in request {
            let kind = fields.get(field).copied().ok_or_else(|| {
                FilterError::configuration(field, "field is not searchable")
            })?;
            set.push(Filter::build(kind, field, value.clone(), options)?);
        }
        Ok(set)
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter()
    }

    /// Fields whose filters will be applied.
    pub fn active_fields(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| f.field())
            .collect()
    }

    /// Fields submitted with an empty value.
    pub fn skipped_fields(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|f| f.is_empty())
            .map(|f| f.field())
            .collect()
    }

    /// Fold every non-empty filter over the query, in order.
    pub fn apply(&self, query: SelectQuery) -> Result<SelectQuery> {
        self.filters.iter().try_fold(query, |query, filter| {
            if filter.is_empty() {
                debug!(field = filter.field(), "skipping empty filter");
                return Ok(query);
            }
            debug!(field = filter.field(), kind = filter.kind().name(), "applying filter");
            filter.apply(query)
        })
    }
}

/// An assembled search, ready to be printed or prepared.
#[derive(Debug, Clone)]
pub struct AssembledSearch {
    pub model: Model,
    pub filters: FilterSet,
    pub query: SelectQuery,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchSummary {
    pub model: Model,
    pub sql: String,
    pub params: Vec<serde_json::Value>,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl AssembledSearch {
    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            model: self.model,
            sql: self.query.to_sql(),
            params: self.query.params().iter().map(param_to_json).collect(),
            applied: self.filters.active_fields().into_iter().map(String::from).collect(),
            skipped: self.filters.skipped_fields().into_iter().map(String::from).collect(),
        }
    }
}

fn param_to_json(value: &rusqlite::types::Value) -> serde_json::Value {
    use rusqlite::types::Value;

    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => serde_json::Value::from(*f),
        Value::Text(s) => serde_json::Value::from(s.as_str()),
        Value::Blob(b) => serde_json::Value::from(b.len()),
    }
}

/// Parse `NAME=VALUE` arguments. Repeated names accumulate; list-shaped fields
/// always get a list, other fields get a single value when given once.
pub fn request_from_args(
    args: &[String],
    fields: &BTreeMap<String, FilterKind>,
) -> Result<SearchRequest> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| FilterError::configuration(arg, "expected NAME=VALUE"))?;
        grouped
            .entry(name.trim().to_string())
            .or_default()
            .push(value.to_string());
    }

    Ok(grouped
        .into_iter()
        .map(|(name, mut values)| {
            let takes_list = fields.get(&name).is_some_and(|k| k.takes_list());
            let value = if !takes_list && values.len() == 1 {
                FilterValue::Scalar(values.remove(0))
            } else {
                FilterValue::List(values)
            };
            (name, value)
        })
        .collect())
}

/// Read a request from a JSON object of field -> value.
pub fn request_from_json(json: &serde_json::Value) -> Result<SearchRequest> {
    let object = json
        .as_object()
        .ok_or_else(|| FilterError::configuration("<request>", "expected a JSON object"))?;
    object
        .iter()
        .map(|(name, value)| FilterValue::from_json(name, value).map(|v| (name.clone(), v)))
        .collect()
}

/// Build the filters for `request` and apply them to a fresh query on `model`.
pub fn assemble(
    model: Model,
    fields: &BTreeMap<String, FilterKind>,
    request: &SearchRequest,
    options: &FilterOptions,
) -> Result<AssembledSearch> {
    let filters = FilterSet::from_request(fields, request, options)?;
    let query = filters.apply(SelectQuery::new(model.schema()))?;
    Ok(AssembledSearch {
        model,
        filters,
        query,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_fields() -> BTreeMap<String, FilterKind> {
        BTreeMap::from([
            ("Status".to_string(), FilterKind::OptionSet),
            ("HasPayment".to_string(), FilterKind::Payment),
        ])
    }

    fn request(pairs: &[(&str, FilterValue)]) -> SearchRequest {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn empty_filters_are_skipped() {
        let req = request(&[
            ("HasPayment", FilterValue::Scalar(String::new())),
            ("Status", FilterValue::List(Vec::new())),
        ]);
        let search = assemble(Model::Orders, &order_fields(), &req, &FilterOptions::default())
            .unwrap();

        assert_eq!(search.query, SelectQuery::new(Model::Orders.schema()));
        assert!(search.filters.active_fields().is_empty());
        assert_eq!(search.filters.skipped_fields(), vec!["HasPayment", "Status"]);
    }

    #[test]
    fn filters_fold_in_field_order() {
        let req = request(&[
            ("Status", FilterValue::List(vec!["Paid".into()])),
            ("HasPayment", FilterValue::Scalar("2".into())),
        ]);
        let search = assemble(Model::Orders, &order_fields(), &req, &FilterOptions::default())
            .unwrap();

        assert_eq!(
            search.query.to_sql(),
            "SELECT DISTINCT orders.* FROM orders\n\
             LEFT JOIN payments AS payment ON payment.order_id = orders.id\n\
             WHERE payment.id IS NULL AND (orders.status GLOB ?1)"
        );
    }

    #[test]
    fn unconfigured_field_is_rejected() {
        let req = request(&[("Email", FilterValue::Scalar("a@b.c".into()))]);
        let err = FilterSet::from_request(&order_fields(), &req, &FilterOptions::default())
            .unwrap_err();
        assert!(matches!(err, FilterError::Configuration { ref field, .. } if field == "Email"));
    }

    #[test]
    fn configured_field_missing_from_schema_fails_at_apply() {
        let mut fields = order_fields();
        fields.insert("Colour".into(), FilterKind::OptionSet);
        let req = request(&[("Colour", FilterValue::List(vec!["Red".into()]))]);

        let set = FilterSet::from_request(&fields, &req, &FilterOptions::default()).unwrap();
        let err = set.apply(SelectQuery::new(Model::Orders.schema())).unwrap_err();
        assert!(matches!(err, FilterError::Resolution { .. }));
    }

    #[test]
    fn summary_reports_params_as_json() {
        let req = request(&[("Status", FilterValue::List(vec!["Paid".into(), "Sent".into()]))]);
        let search = assemble(Model::Orders, &order_fields(), &req, &FilterOptions::default())
            .unwrap();
        let summary = search.summary();

        assert_eq!(summary.params, vec![serde_json::json!("Paid*"), serde_json::json!("Sent*")]);
        assert_eq!(summary.applied, vec!["Status".to_string()]);
        assert!(summary.skipped.is_empty());
    }

    #[test]
    fn args_group_by_field_and_shape() {
        let args: Vec<String> = ["Status=Paid", "Status=Sent", "HasPayment=1", "Other=a=b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let req = request_from_args(&args, &order_fields()).unwrap();

        assert_eq!(
            req["Status"],
            FilterValue::List(vec!["Paid".into(), "Sent".into()])
        );
        assert_eq!(req["HasPayment"], FilterValue::Scalar("1".into()));
        assert_eq!(req["Other"], FilterValue::Scalar("a=b".into()));
    }

    #[test]
    fn single_option_is_still_a_list() {
        let req = request_from_args(&["Status=Paid".to_string()], &order_fields()).unwrap();
        assert_eq!(req["Status"], FilterValue::List(vec!["Paid".into()]));
    }

    #[test]
    fn repeated_scalar_field_fails_when_built() {
        let args = vec!["HasPayment=1".to_string(), "HasPayment=2".to_string()];
        let req = request_from_args(&args, &order_fields()).unwrap();
        let err = FilterSet::from_request(&order_fields(), &req, &FilterOptions::default())
            .unwrap_err();
        assert!(matches!(err, FilterError::Configuration { .. }));
    }

    #[test]
    fn arg_without_equals_is_rejected() {
        assert!(request_from_args(&["Status".to_string()], &order_fields()).is_err());
    }

    #[test]
    fn json_request() {
        let json = serde_json::json!({"Status": ["Paid"], "HasPayment": 1});
        let req = request_from_json(&json).unwrap();
        assert_eq!(req["Status"], FilterValue::List(vec!["Paid".into()]));
        assert_eq!(req["HasPayment"], FilterValue::Scalar("1".into()));

        assert!(request_from_json(&serde_json::json!(["Status"])).is_err());
    }
}
