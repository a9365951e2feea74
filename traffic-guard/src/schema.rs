//! Maps heterogeneous source column names onto the semantic fields the
//! rules understand.
//!
//! Resolution happens once per table. Each [`SemanticField`] resolves to at
//! most one source column: the first alias, in priority order, that exists
//! in the source. A field with no matching column is *unavailable*, which
//! downstream consumers treat as a degraded capability rather than an error.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical fields a traffic record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    /// Address of the requesting client
    ClientIp,
    /// Size of the request payload in bytes
    RequestBytes,
    /// Country the client was geolocated to
    Country,
    /// When the request started
    Timestamp,
    /// Pre-aggregated number of requests the row stands for
    RequestCount,
}

impl SemanticField {
    /// All fields, in resolution order.
    pub const ALL: [SemanticField; 5] = [
        SemanticField::ClientIp,
        SemanticField::RequestBytes,
        SemanticField::Country,
        SemanticField::Timestamp,
        SemanticField::RequestCount,
    ];

    /// The canonical snake_case name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticField::ClientIp => "client_ip",
            SemanticField::RequestBytes => "request_bytes",
            SemanticField::Country => "country",
            SemanticField::Timestamp => "timestamp",
            SemanticField::RequestCount => "request_count",
        }
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static DEFAULT_ALIASES: Lazy<AliasTable> = Lazy::new(|| {
    AliasTable::empty()
        .with_aliases(
            SemanticField::ClientIp,
            ["ClientIP", "ip_address", "IP", "SourceIP", "RemoteIP", "client_ip"],
        )
        .with_aliases(
            SemanticField::RequestBytes,
            ["ClientRequestBytes", "request_bytes", "RequestBytes", "bytes"],
        )
        .with_aliases(SemanticField::Country, ["ClientCountry", "country", "Country"])
        .with_aliases(
            SemanticField::Timestamp,
            ["EdgeStartTimestamp", "timestamp", "Timestamp", "time"],
        )
        .with_aliases(SemanticField::RequestCount, ["request_count", "RequestCount"])
});

/// Ordered alias lists, one per semantic field.
///
/// This is configuration data: callers with their own log format replace or
/// extend the lists instead of adding code branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    aliases: BTreeMap<SemanticField, Vec<String>>,
}

impl AliasTable {
    /// A table in which no field has any alias.
    pub fn empty() -> Self {
        Self {
            aliases: BTreeMap::new(),
        }
    }

    /// Replaces the alias list of `field`.
    pub fn with_aliases<I, S>(mut self, field: SemanticField, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .insert(field, aliases.into_iter().map(Into::into).collect());
        self
    }

    /// Appends a lowest-priority alias to `field`.
    pub fn push_alias(mut self, field: SemanticField, alias: impl Into<String>) -> Self {
        self.aliases.entry(field).or_default().push(alias.into());
        self
    }

    /// Aliases of `field` in priority order.
    pub fn aliases(&self, field: SemanticField) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        DEFAULT_ALIASES.clone()
    }
}

/// Where a resolved field lives in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedColumn {
    /// Source column name as found (whitespace trimmed)
    pub name: String,
    /// Position of the column in the source
    pub index: usize,
}

/// Outcome of resolving every semantic field against one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSchema {
    fields: BTreeMap<SemanticField, Option<ResolvedColumn>>,
}

impl ResolvedSchema {
    /// The column `field` resolved to, if any.
    pub fn column(&self, field: SemanticField) -> Option<&ResolvedColumn> {
        self.fields.get(&field).and_then(Option::as_ref)
    }

    /// True when `field` resolved to a source column.
    pub fn is_available(&self, field: SemanticField) -> bool {
        self.column(field).is_some()
    }

    /// Fields that did not resolve.
    pub fn unavailable(&self) -> Vec<SemanticField> {
        SemanticField::ALL
            .into_iter()
            .filter(|field| !self.is_available(*field))
            .collect()
    }

    /// The canonical reason a consumer reports when `field` is missing.
    pub fn unavailable_reason(field: SemanticField) -> String {
        format!("{field} field unavailable")
    }
}

/// Resolves each semantic field to at most one source column.
///
/// The first alias (in priority order) present among `columns` wins. Column
/// names are compared after trimming surrounding whitespace, so a header of
/// `" ClientIP "` still matches `ClientIP`.
pub fn resolve<S: AsRef<str>>(columns: &[S], aliases: &AliasTable) -> ResolvedSchema {
    let trimmed: Vec<&str> = columns.iter().map(|c| c.as_ref().trim()).collect();

    let fields = SemanticField::ALL
        .into_iter()
        .map(|field| {
            let resolved = aliases.aliases(field).iter().find_map(|alias| {
                trimmed
                    .iter()
                    .position(|column| column == alias)
                    .map(|index| ResolvedColumn {
                        name: trimmed[index].to_string(),
                        index,
                    })
            });
            (field, resolved)
        })
        .collect();

    ResolvedSchema { fields }
}
