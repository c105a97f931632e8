use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};
use crate::query::SelectQuery;

const PAYMENT_TABLE: &str = "payments";
const PAYMENT_ALIAS: &str = "payment";
const CATEGORY_LINK_TABLE: &str = "product_categories";
const CATEGORY_LIVE_TABLE: &str = "category_live";
const PUBLISHED: &str = "Published";

/// Which filter a search field uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    OptionSet,
    Payment,
    Category,
    PublishedStatus,
}

impl FilterKind {
    /// Whether the kind takes a list of values rather than a single one.
    pub fn takes_list(self) -> bool {
        matches!(self, FilterKind::OptionSet)
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::OptionSet => "option_set",
            FilterKind::Payment => "payment",
            FilterKind::Category => "category",
            FilterKind::PublishedStatus => "published_status",
        }
    }
}

/// A raw submitted search value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Null,
    Scalar(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Convert a JSON request value. Numbers and booleans become scalar strings.
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;

        match value {
            Json::Null => Ok(FilterValue::Null),
            Json::Array(items) => items
                .iter()
                .map(|item| {
                    json_scalar(item).ok_or_else(|| {
                        FilterError::configuration(field, "list items must be strings or numbers")
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(FilterValue::List),
            other => json_scalar(other)
                .map(FilterValue::Scalar)
                .ok_or_else(|| FilterError::configuration(field, "objects are not supported")),
        }
    }

    fn into_list(self, field: &str) -> Result<Vec<String>> {
        match self {
            FilterValue::Null => Ok(Vec::new()),
            FilterValue::List(values) => Ok(values),
            FilterValue::Scalar(_) => Err(FilterError::configuration(
                field,
                "expected a list of values, got a single value",
            )),
        }
    }

    fn into_scalar(self, field: &str) -> Result<Option<String>> {
        match self {
            FilterValue::Null => Ok(None),
            FilterValue::Scalar(value) => Ok(Some(value)),
            FilterValue::List(_) => Err(FilterError::configuration(
                field,
                "expected a single value, got a list",
            )),
        }
    }
}

fn json_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        // `1.0` is submitted as `1`
        serde_json::Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.as_i64().is_none() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        }),
        serde_json::Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Numeric selector as submitted by the admin dropdowns (`1`, `2`, ...).
/// Integral decimals such as `1.0` select the same as `1`.
fn selector(value: &Option<String>) -> Option<i64> {
    let v = value.as_deref()?.trim();
    v.parse::<i64>().ok().or_else(|| {
        v.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
            .map(|f| f as i64)
    })
}

/// Escape GLOB metacharacters so the value only matches itself.
fn glob_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' | '?' | '[' => {
                out.push('[');
                out.push(ch);
                out.push(']');
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Escape LIKE metacharacters for use with `ESCAPE '\'`.
fn like_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Switches that change filter behaviour for a whole request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Let the published-status filter actually compare the status column.
    /// Off by default: the filter is a pass-through.
    pub published_status_enabled: bool,
}

/// The capability every search filter provides.
pub trait SearchFilter {
    /// Search field this filter was built for.
    fn field(&self) -> &str;

    /// Extend the query with this filter's joins and predicates.
    ///
    /// An empty filter returns the query unchanged. Calling `apply` twice adds
    /// everything twice; nothing is deduplicated.
    fn apply(&self, query: SelectQuery) -> Result<SelectQuery>;

    /// True when the submitted value means "don't filter on this field".
    fn is_empty(&self) -> bool;
}

/// Case-sensitive prefix match against any of several option values, e.g.
/// order statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSetFilter {
    field: String,
    values: Vec<String>,
}

impl OptionSetFilter {
    pub fn new(field: impl Into<String>, values: Vec<String>) -> Self {
        OptionSetFilter {
            field: field.into(),
            values,
        }
    }
}

impl SearchFilter for OptionSetFilter {
    fn field(&self) -> &str {
        &self.field
    }

    fn apply(&self, mut query: SelectQuery) -> Result<SelectQuery> {
        if self.is_empty() {
            return Ok(query);
        }
        let column = query.apply_relation(&self.field)?;

        // Single quotes are dropped from options before matching
        let patterns: Vec<String> = self
            .values
            .iter()
            .map(|v| v.replace('\'', ""))
            .filter(|v| !v.is_empty())
            .map(|v| format!("{}*", glob_literal(&v)))
            .collect();

        if patterns.is_empty() {
            return Ok(query);
        }

        let terms: Vec<String> = patterns
            .into_iter()
            .map(|p| format!("{column} GLOB {}", query.bind(p)))
            .collect();
        query.where_clause(format!("({})", terms.join(" OR ")));

        Ok(query)
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Whether the row has a linked payment: `1` = has one, `2` = has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFilter {
    field: String,
    value: Option<String>,
}

impl PaymentFilter {
    pub fn new(field: impl Into<String>, value: Option<String>) -> Self {
        PaymentFilter {
            field: field.into(),
            value,
        }
    }
}

impl SearchFilter for PaymentFilter {
    fn field(&self) -> &str {
        &self.field
    }

    fn apply(&self, mut query: SelectQuery) -> Result<SelectQuery> {
        if self.is_empty() {
            return Ok(query);
        }
        let owner = query.apply_relation(&self.field)?;

        let condition = match selector(&self.value) {
            Some(1) => "IS NOT NULL",
            Some(2) => "IS NULL",
            _ => return Ok(query),
        };

        query
            .left_join(
                PAYMENT_TABLE,
                format!("{PAYMENT_ALIAS}.order_id = {owner}"),
                PAYMENT_ALIAS,
            )
            .where_clause(format!("{PAYMENT_ALIAS}.id {condition}"));

        Ok(query)
    }

    // `0` is not treated as empty; it just never matches a selector.
    fn is_empty(&self) -> bool {
        is_blank(&self.value)
    }
}

/// Restrict products to those in a live category whose title contains the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    field: String,
    value: Option<String>,
}

impl CategoryFilter {
    pub fn new(field: impl Into<String>, value: Option<String>) -> Self {
        CategoryFilter {
            field: field.into(),
            value,
        }
    }
}

impl SearchFilter for CategoryFilter {
    fn field(&self) -> &str {
        &self.field
    }

    fn apply(&self, mut query: SelectQuery) -> Result<SelectQuery> {
        if self.is_empty() {
            return Ok(query);
        }
        let product = query.apply_relation(&self.field)?;

        let title = self.value.as_deref().unwrap_or_default();

        query
            .inner_join(
                CATEGORY_LINK_TABLE,
                format!("{CATEGORY_LINK_TABLE}.product_id = {product}"),
            )
            .inner_join(
                CATEGORY_LIVE_TABLE,
                format!("{CATEGORY_LIVE_TABLE}.id = {CATEGORY_LINK_TABLE}.category_id"),
            );
        let p = query.bind(format!("%{}%", like_literal(title)));
        query.where_clause(format!("{CATEGORY_LIVE_TABLE}.title LIKE {p} ESCAPE '\\'"));

        Ok(query)
    }

    fn is_empty(&self) -> bool {
        is_blank(&self.value)
    }
}

/// Published / not published. A pass-through unless explicitly enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedStatusFilter {
    field: String,
    value: Option<String>,
    enabled: bool,
}

impl PublishedStatusFilter {
    pub fn new(field: impl Into<String>, value: Option<String>) -> Self {
        PublishedStatusFilter {
            field: field.into(),
            value,
            enabled: false,
        }
    }

    /// Turn on the status comparison (`1` = published, `2` = anything else).
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl SearchFilter for PublishedStatusFilter {
    fn field(&self) -> &str {
        &self.field
    }

    fn apply(&self, mut query: SelectQuery) -> Result<SelectQuery> {
        if !self.enabled || self.is_empty() {
            return Ok(query);
        }

        let column = query.apply_relation(&self.field)?;

        let op = match selector(&self.value) {
            Some(1) => "=",
            Some(2) => "!=",
            _ => return Ok(query),
        };

        let p = query.bind(PUBLISHED.to_string());
        query.where_clause(format!("{column} {op} {p}"));

        Ok(query)
    }

    fn is_empty(&self) -> bool {
        is_blank(&self.value) || selector(&self.value) == Some(0)
    }
}

/// The closed set of filters a search field can be configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    OptionSet(OptionSetFilter),
    Payment(PaymentFilter),
    Category(CategoryFilter),
    PublishedStatus(PublishedStatusFilter),
}

impl Filter {
    /// Build the filter for `field`, checking the value's shape up front.
    pub fn build(
        kind: FilterKind,
        field: &str,
        value: FilterValue,
        options: &FilterOptions,
    ) -> Result<Self> {
        let filter = match kind {
            FilterKind::OptionSet => {
                Filter::OptionSet(OptionSetFilter::new(field, value.into_list(field)?))
            }
            FilterKind::Payment => {
                Filter::Payment(PaymentFilter::new(field, value.into_scalar(field)?))
            }
            FilterKind::Category => {
                Filter::Category(CategoryFilter::new(field, value.into_scalar(field)?))
            }
            FilterKind::PublishedStatus => Filter::PublishedStatus(
                PublishedStatusFilter::new(field, value.into_scalar(field)?)
                    .enabled(options.published_status_enabled),
            ),
        };
        Ok(filter)
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::OptionSet(_) => FilterKind::OptionSet,
            Filter::Payment(_) => FilterKind::Payment,
            Filter::Category(_) => FilterKind::Category,
            Filter::PublishedStatus(_) => FilterKind::PublishedStatus,
        }
    }

    fn inner(&self) -> &dyn SearchFilter {
        match self {
            Filter::OptionSet(f) => f,
            Filter::Payment(f) => f,
            Filter::Category(f) => f,
            Filter::PublishedStatus(f) => f,
        }
    }
}

impl SearchFilter for Filter {
    fn field(&self) -> &str {
        self.inner().field()
    }

    fn apply(&self, query: SelectQuery) -> Result<SelectQuery> {
        self.inner().apply(query)
    }

    fn is_empty(&self) -> bool {
        self.inner().is_empty()
    }
}
