//! Query resolution for book listings.
//!
//! A [`QuerySpec`] captures the filter/search/order intent of a single
//! request; [`resolve`] applies it to a snapshot of records as a fixed
//! three-stage pipeline (filter, then search, then order). Resolution is a
//! pure function: it performs no I/O, never mutates its inputs, and its only
//! failure mode is an unsupported field name.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use shelf_store::BookRecord;

/// Field names accepted as exact-match filters.
pub const FILTER_FIELDS: &[&str] = &["title", "author", "publication_year"];

/// Field names accepted for ordering.
pub const ORDERING_FIELDS: &[&str] = &["title", "publication_year"];

/// Which allow-set a rejected field name was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Filter,
    Ordering,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Filter => f.write_str("filter"),
            FieldKind::Ordering => f.write_str("ordering"),
        }
    }
}

/// The resolver's only error: a field name outside the relevant allow-set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("unsupported {kind} field '{field}'")]
    InvalidField { kind: FieldKind, field: String },
}

impl QueryError {
    fn invalid(kind: FieldKind, field: &str) -> Self {
        Self::InvalidField {
            kind,
            field: field.to_string(),
        }
    }
}

/// Per-request description of what to filter, search, and order by.
///
/// Built fresh for every request and discarded afterwards. Filter keys are
/// kept raw; [`resolve`] validates them against [`FILTER_FIELDS`] so that
/// unknown fields fail loudly instead of being silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    /// Exact-match constraints, field name to required value.
    pub filters: BTreeMap<String, String>,
    /// Case-insensitive substring search over title and author. `Some("")`
    /// matches nothing; `None` skips the stage entirely.
    pub search: Option<String>,
    /// Ordering field, optionally prefixed with `-` for descending.
    /// `None` means title ascending.
    pub order_by: Option<String>,
}

impl QuerySpec {
    /// Build a spec from raw query-string pairs. `search` and `ordering`
    /// are lifted out; every other pair becomes a filter constraint.
    pub fn from_params(params: &BTreeMap<String, String>) -> Self {
        let mut spec = QuerySpec::default();
        for (key, value) in params {
            match key.as_str() {
                "search" => spec.search = Some(value.clone()),
                "ordering" => spec.order_by = Some(value.clone()),
                _ => {
                    spec.filters.insert(key.clone(), value.clone());
                }
            }
        }
        spec
    }
}

enum OrderKey {
    Title,
    PublicationYear,
}

struct Ordering {
    key: OrderKey,
    descending: bool,
}

fn parse_ordering(raw: &str) -> Result<Ordering, QueryError> {
    let (field, descending) = match raw.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    let key = match field {
        "title" => OrderKey::Title,
        "publication_year" => OrderKey::PublicationYear,
        _ => return Err(QueryError::invalid(FieldKind::Ordering, field)),
    };
    Ok(Ordering { key, descending })
}

fn matches_filter(record: &BookRecord, field: &str, value: &str) -> bool {
    match field {
        "title" => record.title == value,
        "author" => record.author == value,
        // A value that does not parse as an integer can equal no record's
        // year; callers that want a hard rejection validate before resolving.
        "publication_year" => value
            .parse::<i32>()
            .map(|year| record.publication_year == year)
            .unwrap_or(false),
        _ => unreachable!("filter keys are validated before matching"),
    }
}

fn matches_search(record: &BookRecord, term_lower: &str) -> bool {
    record.title.to_lowercase().contains(term_lower)
        || record.author.to_lowercase().contains(term_lower)
}

/// Apply `spec` to a snapshot of records: filter, then search, then a
/// stable sort. Ties keep the snapshot's relative order in both directions;
/// descending reverses the key comparison, not the resulting list.
pub fn resolve(records: &[BookRecord], spec: &QuerySpec) -> Result<Vec<BookRecord>, QueryError> {
    // Validate field names up front so an invalid spec fails the same way
    // on an empty snapshot as on a populated one.
    for field in spec.filters.keys() {
        if !FILTER_FIELDS.contains(&field.as_str()) {
            return Err(QueryError::invalid(FieldKind::Filter, field));
        }
    }
    let ordering = match spec.order_by.as_deref() {
        Some(raw) => parse_ordering(raw)?,
        None => Ordering {
            key: OrderKey::Title,
            descending: false,
        },
    };

    // Filter stage: every constraint must hold exactly.
    let mut result: Vec<BookRecord> = records
        .iter()
        .filter(|record| {
            spec.filters
                .iter()
                .all(|(field, value)| matches_filter(record, field, value))
        })
        .cloned()
        .collect();

    // Search stage. An empty term matches nothing, by contract.
    match spec.search.as_deref() {
        Some("") => result.clear(),
        Some(term) => {
            let term_lower = term.to_lowercase();
            result.retain(|record| matches_search(record, &term_lower));
        }
        None => {}
    }

    // Order stage: `sort_by` is stable, so equal keys stay in snapshot order.
    result.sort_by(|a, b| {
        let cmp = match ordering.key {
            OrderKey::Title => a.title.cmp(&b.title),
            OrderKey::PublicationYear => a.publication_year.cmp(&b.publication_year),
        };
        if ordering.descending {
            cmp.reverse()
        } else {
            cmp
        }
    });

    Ok(result)
}
