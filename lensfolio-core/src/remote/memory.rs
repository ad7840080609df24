//! In-process remote backend
//!
//! Behaves like the hosted service closely enough for tests and offline
//! demos, and adds the controls tests need: a pause gate that holds every
//! request until resumed, per-table holds that delay a query's answer after
//! it was read, per-operation failure injection, and a configurable seed for
//! assigned row ids.

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{Map, Value};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::{RemoteClient, RemoteError, RowFilter, RowOrder};
use crate::helper::now;
use crate::ids::{EntityId, PrincipalId};
use crate::model::{DurableRef, Principal};

const DEFAULT_BASE_URL: &str = "memory://lensfolio";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    UploadBlob,
    DeleteBlob,
    InsertRow,
    UpdateRow,
    DeleteRow,
    QueryRows,
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

pub struct MemoryRemote {
    base_url: String,
    tables: Mutex<HashMap<String, Vec<Value>>>,
    objects: Mutex<HashMap<DurableRef, StoredObject>>,
    next_id: AtomicU64,
    principal: Mutex<Principal>,
    failures: Mutex<HashMap<RemoteOp, VecDeque<RemoteError>>>,
    gate: watch::Sender<bool>,
    held: watch::Sender<HashSet<String>>,
    calls: Mutex<Vec<RemoteOp>>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        let (held, _) = watch::channel(HashSet::new());
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tables: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            principal: Mutex::new(Principal::Anonymous),
            failures: Mutex::new(HashMap::new()),
            gate,
            held,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// First id handed out by `insert_row`
    pub fn with_id_seed(self, seed: u64) -> Self {
        self.next_id.store(seed, Ordering::SeqCst);
        self
    }

    pub fn signed_in(self, principal: impl Into<String>) -> Self {
        self.set_principal(Principal::Known(PrincipalId::from_string(principal)));
        self
    }

    pub fn set_principal(&self, principal: Principal) {
        *self.principal.lock().unwrap() = principal;
    }

    /// Fail the next call of `op` with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Hold every request until `resume`
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Read queries on `table` as usual but hold back their answers until
    /// `release_queries`. Writes made meanwhile are not reflected in them.
    pub fn hold_queries(&self, table: &str) {
        self.held.send_modify(|held| {
            held.insert(table.to_string());
        });
    }

    pub fn release_queries(&self, table: &str) {
        self.held.send_modify(|held| {
            held.remove(table);
        });
    }

    /// Operations that passed the gate, in the order they ran
    pub fn calls(&self) -> Vec<RemoteOp> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: RemoteOp) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row(&self, table: &str, id: &EntityId) -> Option<Value> {
        self.rows(table)
            .into_iter()
            .find(|row| row_id(row).as_deref() == Some(id.as_str()))
    }

    pub fn has_object(&self, media: &DurableRef) -> bool {
        self.objects.lock().unwrap().contains_key(media)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn object_content_type(&self, media: &DurableRef) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(media)
            .map(|o| o.content_type.clone())
    }

    /// Insert a row directly, bypassing the gate and failure injection.
    /// Rows without an id get the next seeded id.
    pub fn seed_row(&self, table: &str, row: Value) -> Value {
        let Value::Object(mut fields) = row else {
            return row;
        };
        if !fields.contains_key("id") {
            fields.insert("id".into(), Value::from(self.next_id.fetch_add(1, Ordering::SeqCst)));
        }
        let row = Value::Object(fields);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    async fn enter(&self, op: RemoteOp) -> Result<(), RemoteError> {
        let mut open = self.gate.subscribe();
        // The sender lives in self, so this only returns once the gate opens
        let _ = open.wait_for(|open| *open).await;

        self.calls.lock().unwrap().push(op);
        let injected = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(err) => {
                debug!(?op, error = %err, "injected remote failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

fn row_id(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn compare_column(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    let as_time = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    };
    match (as_time(a), as_time(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let key = |v: Option<&Value>| v.map(|v| v.to_string()).unwrap_or_default();
            key(a).cmp(&key(b))
        }
    }
}

#[async_trait]
impl RemoteClient for MemoryRemote {
    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<DurableRef, RemoteError> {
        self.enter(RemoteOp::UploadBlob).await?;
        let media = DurableRef::new(bucket, path);
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&media) {
            return Err(RemoteError::Rejected {
                status: Some(409),
                message: format!("object {} already exists", media),
            });
        }
        objects.insert(
            media.clone(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(media)
    }

    fn public_url(&self, media: &DurableRef) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, media.bucket, media.path
        )
    }

    async fn delete_blob(&self, media: &DurableRef) -> Result<(), RemoteError> {
        self.enter(RemoteOp::DeleteBlob).await?;
        self.objects.lock().unwrap().remove(media);
        Ok(())
    }

    async fn insert_row(&self, table: &str, record: Value) -> Result<Value, RemoteError> {
        self.enter(RemoteOp::InsertRow).await?;
        let Value::Object(mut fields) = record else {
            return Err(RemoteError::rejected("record must be an object"));
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        fields.insert("id".into(), Value::from(id));
        fields
            .entry("created_at")
            .or_insert_with(|| Value::from(now().to_rfc3339()));

        let row = Value::Object(fields);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update_row(
        &self,
        table: &str,
        id: &EntityId,
        fields: Value,
    ) -> Result<(), RemoteError> {
        self.enter(RemoteOp::UpdateRow).await?;
        let Value::Object(fields) = fields else {
            return Err(RemoteError::rejected("fields must be an object"));
        };
        let mut tables = self.tables.lock().unwrap();
        let row = tables
            .get_mut(table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row_id(row).as_deref() == Some(id.as_str()))
            })
            .and_then(Value::as_object_mut)
            .ok_or_else(|| RemoteError::Rejected {
                status: Some(404),
                message: format!("no row {} in {}", id, table),
            })?;
        merge_fields(row, fields);
        Ok(())
    }

    async fn delete_row(&self, table: &str, id: &EntityId) -> Result<(), RemoteError> {
        self.enter(RemoteOp::DeleteRow).await?;
        if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
            rows.retain(|row| row_id(row).as_deref() != Some(id.as_str()));
        }
        Ok(())
    }

    async fn query_rows(
        &self,
        table: &str,
        filter: &RowFilter,
        order: &RowOrder,
    ) -> Result<Vec<Value>, RemoteError> {
        self.enter(RemoteOp::QueryRows).await?;
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect();
        rows.sort_by(|a, b| {
            let ord = compare_column(a.get(&order.column), b.get(&order.column));
            if order.descending { ord.reverse() } else { ord }
        });

        let mut held = self.held.subscribe();
        let _ = held.wait_for(|held| !held.contains(table)).await;
        Ok(rows)
    }

    async fn current_principal(&self) -> Principal {
        self.principal.lock().unwrap().clone()
    }
}

fn merge_fields(row: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        row.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_insert_assigns_seeded_ids() {
        let remote = MemoryRemote::new().with_id_seed(42);
        let row = remote
            .insert_row("photos", json!({"title": "Sunset"}))
            .await
            .unwrap();
        assert_eq!(row["id"], json!(42));
        assert!(row.get("created_at").is_some());

        let next = remote.insert_row("photos", json!({"title": "Dawn"})).await.unwrap();
        assert_eq!(next["id"], json!(43));
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let remote = MemoryRemote::new();
        remote.fail_next(RemoteOp::InsertRow, RemoteError::Network("reset".into()));

        assert!(remote.insert_row("photos", json!({})).await.is_err());
        assert!(remote.insert_row("photos", json!({})).await.is_ok());
        assert_eq!(remote.count(RemoteOp::InsertRow), 2);
    }

    #[tokio::test]
    async fn test_pause_holds_requests() {
        let remote = Arc::new(MemoryRemote::new());
        remote.pause();

        let task = {
            let remote = Arc::clone(&remote);
            tokio::spawn(async move { remote.insert_row("photos", json!({})).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());
        assert!(remote.rows("photos").is_empty());

        remote.resume();
        task.await.unwrap().unwrap();
        assert_eq!(remote.rows("photos").len(), 1);
    }

    #[tokio::test]
    async fn test_held_query_answers_with_rows_read_before_the_hold_ended() {
        let remote = Arc::new(MemoryRemote::new().with_id_seed(1));
        remote.insert_row("videos", json!({"title": "Old"})).await.unwrap();
        remote.hold_queries("videos");

        let task = {
            let remote = Arc::clone(&remote);
            tokio::spawn(async move {
                remote
                    .query_rows("videos", &RowFilter::all(), &RowOrder::newest_first())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());
        assert_eq!(remote.count(RemoteOp::QueryRows), 1);

        remote.insert_row("videos", json!({"title": "New"})).await.unwrap();
        assert!(remote.query_rows("photos", &RowFilter::all(), &RowOrder::newest_first()).await.is_ok());
        remote.release_queries("videos");
        assert_eq!(task.await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_numeric_id() {
        let remote = MemoryRemote::new().with_id_seed(7);
        remote.insert_row("photos", json!({"likes": 0})).await.unwrap();
        let id = EntityId::from_string("7");

        remote.update_row("photos", &id, json!({"likes": 1})).await.unwrap();
        assert_eq!(remote.row("photos", &id).unwrap()["likes"], json!(1));

        remote.delete_row("photos", &id).await.unwrap();
        remote.delete_row("photos", &id).await.unwrap();
        assert!(remote.row("photos", &id).is_none());

        let missing = remote.update_row("photos", &id, json!({"likes": 2})).await;
        assert!(matches!(missing, Err(RemoteError::Rejected { status: Some(404), .. })));
    }

    #[tokio::test]
    async fn test_query_orders_newest_first() {
        let remote = MemoryRemote::new();
        remote.seed_row("photos", json!({"created_at": "2024-01-01T00:00:00+00:00", "category": "urban"}));
        remote.seed_row("photos", json!({"created_at": "2024-03-01T00:00:00+00:00", "category": "urban"}));
        remote.seed_row("photos", json!({"created_at": "2024-02-01T00:00:00+00:00", "category": "aviation"}));

        let rows = remote
            .query_rows("photos", &RowFilter::all().eq("category", "urban"), &RowOrder::newest_first())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["created_at"], json!("2024-03-01T00:00:00+00:00"));
    }
}
