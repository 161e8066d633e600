//! Client seam for the external user store.
//!
//! The service only ever uses four store operations: connect, query, pull and transact.
//! They are expressed as the [StoreClient]/[StoreConnection] traits, so the actual
//! store stays external to this crate. [MemoryStore] is an in-process implementation
//! used by the demo and the tests; all connections handed out by one store share its
//! entity table.

#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub type EntityId = u64;

/// Errors raised by the store client.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum StoreError {
    #[error("Cannot connect to store at '{uri}': {reason}")]
    ConnectionFailed { uri: String, reason: String },
    #[error("Store connection is no longer live")]
    Disconnected,
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),
    #[error("Entity {entity} is missing required attribute: {attribute}")]
    MissingAttribute { entity: EntityId, attribute: String },
}

/// An attribute value stored for an entity.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

/// A single assertion handed to [StoreConnection::transact]. Facts without an entity id
/// are asserted against one fresh entity allocated for the whole transaction.
#[derive(Clone, PartialEq, Debug)]
pub struct Fact {
    pub entity: Option<EntityId>,
    pub attribute: String,
    pub value: Value,
}

impl Fact {
    /// Asserts an attribute on the entity allocated for this transaction.
    pub fn assert<T: ToString>(attribute: T, value: Value) -> Self {
        Self {
            entity: None,
            attribute: attribute.to_string(),
            value,
        }
    }

    /// Asserts an attribute on an existing entity.
    pub fn assert_on<T: ToString>(entity: EntityId, attribute: T, value: Value) -> Self {
        Self {
            entity: Some(entity),
            attribute: attribute.to_string(),
            value,
        }
    }
}

/// Result of a successful transaction.
#[derive(Clone, PartialEq, Debug)]
pub struct TransactReport {
    pub tx_id: u64,
    /// Entity ids touched by the transaction, in order of first appearance.
    pub entities: Vec<EntityId>,
}

pub type ConnectionPtr = Arc<dyn StoreConnection + Send + Sync>;
pub type StoreClientPtr = Arc<dyn StoreClient + Send + Sync>;

/// An open connection to the store.
pub trait StoreConnection {
    /// Returns the ids of all entities whose `attribute` equals `value`.
    fn query(&self, attribute: &str, value: &Value) -> Result<Vec<EntityId>, StoreError>;

    /// Returns the requested attributes of an entity; attributes the entity does not
    /// carry are simply omitted from the result.
    fn pull(
        &self,
        entity: EntityId,
        attributes: &[&str],
    ) -> Result<BTreeMap<String, Value>, StoreError>;

    /// Applies the given facts atomically.
    fn transact(&self, facts: &[Fact]) -> Result<TransactReport, StoreError>;

    /// Releases the connection; further operations return [StoreError::Disconnected].
    fn disconnect(&self) -> Result<(), StoreError>;
}

/// Entry point to the store.
#[cfg_attr(test, automock)]
pub trait StoreClient {
    fn connect(&self, uri: &str) -> Result<ConnectionPtr, StoreError>;

    /// Releases client-wide resources; further connects fail.
    fn shutdown(&self);
}

const MEMORY_SCHEME: &str = "mem://";

#[derive(Default)]
struct MemoryState {
    next_entity: EntityId,
    next_tx: u64,
    entities: BTreeMap<EntityId, BTreeMap<String, Value>>,
    shut_down: bool,
}

/// In-process store keeping entities in a shared table. Cloning the store yields a
/// handle to the same table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poison| poison.into_inner())
}

impl StoreClient for MemoryStore {
    fn connect(&self, uri: &str) -> Result<ConnectionPtr, StoreError> {
        if !uri.starts_with(MEMORY_SCHEME) {
            return Err(StoreError::ConnectionFailed {
                uri: uri.to_string(),
                reason: "unsupported uri scheme".to_string(),
            });
        }

        if lock_state(&self.state).shut_down {
            return Err(StoreError::ConnectionFailed {
                uri: uri.to_string(),
                reason: "client has been shut down".to_string(),
            });
        }

        Ok(Arc::new(MemoryConnection {
            state: self.state.clone(),
            live: AtomicBool::new(true),
        }))
    }

    fn shutdown(&self) {
        lock_state(&self.state).shut_down = true;
    }
}

struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    live: AtomicBool,
}

impl MemoryConnection {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        if !self.live.load(Ordering::Acquire) {
            return Err(StoreError::Disconnected);
        }

        Ok(lock_state(&self.state))
    }
}

impl StoreConnection for MemoryConnection {
    fn query(&self, attribute: &str, value: &Value) -> Result<Vec<EntityId>, StoreError> {
        let state = self.state()?;
        Ok(state
            .entities
            .iter()
            .filter(|(_, attributes)| attributes.get(attribute) == Some(value))
            .map(|(id, _)| *id)
            .collect())
    }

    fn pull(
        &self,
        entity: EntityId,
        attributes: &[&str],
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let state = self.state()?;
        let stored = state
            .entities
            .get(&entity)
            .ok_or(StoreError::UnknownEntity(entity))?;

        Ok(attributes
            .iter()
            .filter_map(|attribute| {
                stored
                    .get(*attribute)
                    .map(|value| (attribute.to_string(), value.clone()))
            })
            .collect())
    }

    fn transact(&self, facts: &[Fact]) -> Result<TransactReport, StoreError> {
        let mut state = self.state()?;

        // validate every referenced entity up front, so a bad fact leaves the table
        // untouched and consumes no tx id
        for fact in facts {
            if let Some(id) = fact.entity {
                if !state.entities.contains_key(&id) {
                    return Err(StoreError::UnknownEntity(id));
                }
            }
        }

        state.next_tx += 1;
        let tx_id = state.next_tx;

        let mut new_entity = None;
        let mut entities = Vec::new();
        for fact in facts {
            let id = match fact.entity {
                Some(id) => id,
                None => *new_entity.get_or_insert_with(|| {
                    state.next_entity += 1;
                    state.next_entity
                }),
            };

            state
                .entities
                .entry(id)
                .or_default()
                .insert(fact.attribute.clone(), fact.value.clone());

            if !entities.contains(&id) {
                entities.push(id);
            }
        }

        Ok(TransactReport { tx_id, entities })
    }

    fn disconnect(&self) -> Result<(), StoreError> {
        self.live.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::store::{Fact, MemoryStore, StoreClient, StoreError, Value};

    #[test]
    fn should_reject_unsupported_scheme() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.connect("datomic:mem://users").err().unwrap(),
            StoreError::ConnectionFailed { .. }
        ));
    }

    #[test]
    fn should_transact_query_and_pull() {
        let store = MemoryStore::new();
        let connection = store.connect("mem://users").unwrap();

        let report = connection
            .transact(&[
                Fact::assert("user/username", Value::Str("admin".to_string())),
                Fact::assert("user/favorite-color", Value::Str("blue".to_string())),
            ])
            .unwrap();
        assert_eq!(report.entities.len(), 1);

        let ids = connection
            .query("user/username", &Value::Str("admin".to_string()))
            .unwrap();
        assert_eq!(ids, report.entities);

        let record = connection
            .pull(ids[0], &["user/username", "user/favorite-color"])
            .unwrap();
        assert_eq!(
            record.get("user/username"),
            Some(&Value::Str("admin".to_string()))
        );
        assert_eq!(
            record.get("user/favorite-color"),
            Some(&Value::Str("blue".to_string()))
        );
    }

    #[test]
    fn should_share_entities_between_connections() {
        let store = MemoryStore::new();
        let writer = store.connect("mem://users").unwrap();
        writer
            .transact(&[Fact::assert("user/username", Value::Str("admin".to_string()))])
            .unwrap();

        let reader = store.clone().connect("mem://users").unwrap();
        assert_eq!(
            reader
                .query("user/username", &Value::Str("admin".to_string()))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn should_reject_operations_after_disconnect() {
        let store = MemoryStore::new();
        let connection = store.connect("mem://users").unwrap();
        connection.disconnect().unwrap();

        assert_eq!(
            connection
                .query("user/username", &Value::Str("admin".to_string()))
                .unwrap_err(),
            StoreError::Disconnected
        );
    }

    #[test]
    fn should_reject_connect_after_shutdown() {
        let store = MemoryStore::new();
        store.shutdown();

        assert!(matches!(
            store.connect("mem://users").err().unwrap(),
            StoreError::ConnectionFailed { .. }
        ));
    }

    #[test]
    fn should_reject_transact_on_unknown_entity() {
        let store = MemoryStore::new();
        let connection = store.connect("mem://users").unwrap();

        assert_eq!(
            connection
                .transact(&[Fact::assert_on(
                    42,
                    "user/username",
                    Value::Str("ghost".to_string())
                )])
                .unwrap_err(),
            StoreError::UnknownEntity(42)
        );
    }

    #[test]
    fn should_leave_table_untouched_on_failed_transact() {
        let store = MemoryStore::new();
        let connection = store.connect("mem://users").unwrap();

        assert_eq!(
            connection
                .transact(&[
                    Fact::assert("user/username", Value::Str("ghost".to_string())),
                    Fact::assert_on(999, "user/favorite-color", Value::Str("grey".to_string())),
                ])
                .unwrap_err(),
            StoreError::UnknownEntity(999)
        );

        // nothing from the failed transaction is visible
        assert!(connection
            .query("user/username", &Value::Str("ghost".to_string()))
            .unwrap()
            .is_empty());

        // and no tx id was consumed
        let report = connection
            .transact(&[Fact::assert("user/username", Value::Str("admin".to_string()))])
            .unwrap();
        assert_eq!(report.tx_id, 1);
    }

    #[test]
    fn should_reject_pull_of_unknown_entity() {
        let store = MemoryStore::new();
        let connection = store.connect("mem://users").unwrap();

        assert_eq!(
            connection.pull(7, &["user/username"]).unwrap_err(),
            StoreError::UnknownEntity(7)
        );
    }
}
