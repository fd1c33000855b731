//! Reference enrichment of exported records

use crate::config::EnrichRule;
use crate::core::job::ItemProcessor;
use crate::core::reference::ReferenceDataCache;
use crate::domain::{FerryError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Identifier of a record for error reports
pub fn record_id(record: &Value, id_field: &str) -> String {
    match record.get(id_field) {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => "<unknown>".to_string(),
    }
}

/// Resolves reference ids in a record to their human-readable names
///
/// For each rule, the id in `field` is resolved through the cache and the
/// entity's name (its query field) is written to `target`. A record with an
/// unknown reference is skipped as a partial failure.
pub struct EnrichProcessor {
    cache: Arc<ReferenceDataCache>,
    rules: Vec<EnrichRule>,
    id_field: String,
}

impl EnrichProcessor {
    pub fn new(cache: Arc<ReferenceDataCache>, rules: Vec<EnrichRule>, id_field: impl Into<String>) -> Self {
        Self {
            cache,
            rules,
            id_field: id_field.into(),
        }
    }
}

#[async_trait]
impl ItemProcessor<Value, Value> for EnrichProcessor {
    async fn process(&self, mut record: Value) -> Result<Option<Value>> {
        if self.rules.is_empty() {
            return Ok(Some(record));
        }

        let id = record_id(&record, &self.id_field);
        let Some(fields) = record.as_object_mut() else {
            return Err(FerryError::partial(id, "record is not a JSON object"));
        };

        for rule in &self.rules {
            let reference = match fields.get(&rule.field) {
                Some(Value::String(reference)) if !reference.is_empty() => reference.clone(),
                _ => continue,
            };

            let entity = match self.cache.resolve_by_id(rule.kind, &reference).await {
                Ok(entity) => entity,
                Err(e) if e.is_not_found() => return Err(FerryError::partial(id, e)),
                Err(e) => return Err(e),
            };

            let name = entity
                .get(rule.kind.query_field())
                .cloned()
                .unwrap_or(Value::Null);
            fields.insert(rule.target.clone(), name);
        }

        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::{Entity, ReferenceKind, ReferenceLookup};
    use crate::domain::RemoteError;
    use serde_json::json;

    struct StaticLookup;

    #[async_trait]
    impl ReferenceLookup for StaticLookup {
        async fn get_by_id(&self, kind: ReferenceKind, id: &str) -> Result<Entity> {
            match (kind, id) {
                (ReferenceKind::ServicePoint, "sp-1") => Ok(json!({"id": "sp-1", "name": "Circ desk"})),
                (ReferenceKind::User, "u-1") => Ok(json!({"id": "u-1", "username": "jdoe"})),
                (_, "down") => Err(RemoteError::Timeout("30s".to_string()).into()),
                _ => Err(FerryError::not_found(kind.to_string(), id)),
            }
        }

        async fn get_by_query(&self, _kind: ReferenceKind, _query: &str) -> Result<Vec<Entity>> {
            Ok(Vec::new())
        }
    }

    fn processor() -> EnrichProcessor {
        let cache = Arc::new(ReferenceDataCache::builder(Arc::new(StaticLookup)).build());
        let rules = vec![
            EnrichRule {
                field: "servicePointId".to_string(),
                kind: ReferenceKind::ServicePoint,
                target: "servicePoint".to_string(),
            },
            EnrichRule {
                field: "userId".to_string(),
                kind: ReferenceKind::User,
                target: "username".to_string(),
            },
        ];
        EnrichProcessor::new(cache, rules, "id")
    }

    #[tokio::test]
    async fn test_enriches_each_rule() {
        let record = json!({"id": "r1", "servicePointId": "sp-1", "userId": "u-1"});
        let enriched = processor().process(record).await.unwrap().unwrap();

        assert_eq!(enriched["servicePoint"], "Circ desk");
        assert_eq!(enriched["username"], "jdoe");
    }

    #[tokio::test]
    async fn test_missing_reference_field_is_left_alone() {
        let record = json!({"id": "r1"});
        let enriched = processor().process(record.clone()).await.unwrap().unwrap();
        assert_eq!(enriched, record);
    }

    #[tokio::test]
    async fn test_unknown_reference_is_partial_failure() {
        let record = json!({"id": "r1", "servicePointId": "sp-404"});
        let err = processor().process(record).await.unwrap_err();

        match err {
            FerryError::PartialFailure { record, reason } => {
                assert_eq!(record, "r1");
                assert_eq!(reason, "Service point not found: sp-404");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remote_failure_propagates() {
        let record = json!({"id": "r1", "servicePointId": "down"});
        let err = processor().process(record).await.unwrap_err();
        assert!(matches!(err, FerryError::RemoteUnavailable(_)));
    }

    #[test]
    fn test_record_id() {
        assert_eq!(record_id(&json!({"id": 42}), "id"), "42");
        assert_eq!(record_id(&json!({"uuid": "x"}), "uuid"), "x");
        assert_eq!(record_id(&json!({}), "id"), "<unknown>");
    }
}
