//! Reference entity kinds and their remote layout

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of small reference entity resolved during exports and updates
///
/// Each kind knows the remote collection path, the JSON field holding the
/// collection in query responses, and the field used for exact-match lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    CallNumberType,
    DamagedStatus,
    ItemNoteType,
    ElectronicAccessRelationship,
    ServicePoint,
    StatisticalCode,
    User,
    Location,
    MaterialType,
    HoldingsRecord,
    Instance,
    LoanType,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 12] = [
        ReferenceKind::CallNumberType,
        ReferenceKind::DamagedStatus,
        ReferenceKind::ItemNoteType,
        ReferenceKind::ElectronicAccessRelationship,
        ReferenceKind::ServicePoint,
        ReferenceKind::StatisticalCode,
        ReferenceKind::User,
        ReferenceKind::Location,
        ReferenceKind::MaterialType,
        ReferenceKind::HoldingsRecord,
        ReferenceKind::Instance,
        ReferenceKind::LoanType,
    ];

    /// Remote collection path, relative to the service base URL
    pub fn path(&self) -> &'static str {
        match self {
            ReferenceKind::CallNumberType => "call-number-types",
            ReferenceKind::DamagedStatus => "item-damaged-statuses",
            ReferenceKind::ItemNoteType => "item-note-types",
            ReferenceKind::ElectronicAccessRelationship => "electronic-access-relationships",
            ReferenceKind::ServicePoint => "service-points",
            ReferenceKind::StatisticalCode => "statistical-codes",
            ReferenceKind::User => "users",
            ReferenceKind::Location => "locations",
            ReferenceKind::MaterialType => "material-types",
            ReferenceKind::HoldingsRecord => "holdings-storage/holdings",
            ReferenceKind::Instance => "instance-storage/instances",
            ReferenceKind::LoanType => "loan-types",
        }
    }

    /// JSON field holding the result array in a query response
    pub fn collection_field(&self) -> &'static str {
        match self {
            ReferenceKind::CallNumberType => "callNumberTypes",
            ReferenceKind::DamagedStatus => "itemDamageStatuses",
            ReferenceKind::ItemNoteType => "itemNoteTypes",
            ReferenceKind::ElectronicAccessRelationship => "electronicAccessRelationships",
            ReferenceKind::ServicePoint => "servicepoints",
            ReferenceKind::StatisticalCode => "statisticalCodes",
            ReferenceKind::User => "users",
            ReferenceKind::Location => "locations",
            ReferenceKind::MaterialType => "mtypes",
            ReferenceKind::HoldingsRecord => "holdingsRecords",
            ReferenceKind::Instance => "instances",
            ReferenceKind::LoanType => "loantypes",
        }
    }

    /// Field matched by name lookups, also the entity's human-readable key
    pub fn query_field(&self) -> &'static str {
        match self {
            ReferenceKind::StatisticalCode => "code",
            ReferenceKind::User => "username",
            ReferenceKind::HoldingsRecord | ReferenceKind::Instance => "hrid",
            _ => "name",
        }
    }

    /// Name of the cache partition, also the config key for its capacity
    pub fn cache_name(&self) -> &'static str {
        match self {
            ReferenceKind::CallNumberType => "callNumberTypes",
            ReferenceKind::DamagedStatus => "damagedStatuses",
            ReferenceKind::ItemNoteType => "noteTypes",
            ReferenceKind::ElectronicAccessRelationship => "relationships",
            ReferenceKind::ServicePoint => "servicePoints",
            ReferenceKind::StatisticalCode => "statisticalCodes",
            ReferenceKind::User => "users",
            ReferenceKind::Location => "locations",
            ReferenceKind::MaterialType => "materialTypes",
            ReferenceKind::HoldingsRecord => "briefHoldings",
            ReferenceKind::Instance => "briefInstances",
            ReferenceKind::LoanType => "loanTypes",
        }
    }

    /// Exact-match query for `value` on this kind's query field
    ///
    /// The value is quoted; quotes, backslashes and the CQL wildcard
    /// characters are escaped so they match literally.
    pub fn exact_match_query(&self, value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 2);
        for c in value.chars() {
            if matches!(c, '\\' | '"' | '*' | '?' | '^') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        format!("{}==\"{}\"", self.query_field(), escaped)
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReferenceKind::CallNumberType => "Call number type",
            ReferenceKind::DamagedStatus => "Damaged status",
            ReferenceKind::ItemNoteType => "Note type",
            ReferenceKind::ElectronicAccessRelationship => "Electronic access relationship",
            ReferenceKind::ServicePoint => "Service point",
            ReferenceKind::StatisticalCode => "Statistical code",
            ReferenceKind::User => "User",
            ReferenceKind::Location => "Location",
            ReferenceKind::MaterialType => "Material type",
            ReferenceKind::HoldingsRecord => "Holdings record",
            ReferenceKind::Instance => "Instance",
            ReferenceKind::LoanType => "Loan type",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ReferenceKind {
    type Err = String;

    /// Accepts the kebab-case kind name or the cache partition name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceKind::ALL
            .into_iter()
            .find(|kind| {
                kind.cache_name().eq_ignore_ascii_case(s)
                    || serde_json::to_value(kind)
                        .ok()
                        .and_then(|v| v.as_str().map(|name| name == s))
                        .unwrap_or(false)
            })
            .ok_or_else(|| format!("Unknown reference kind: {s}"))
    }
}
