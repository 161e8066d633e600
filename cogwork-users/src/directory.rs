//! The user directory component and its lookup/insert operations.

use crate::database::Database;
use crate::store::{EntityId, Fact, StoreError, TransactReport, Value};
use cogwork::component::{Component, FieldMap, FieldValue, ResolvedDependencies};
use cogwork::error::ErrorPtr;
use cogwork_schema::{FieldType, Schema};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Dependency field under which the started [Database] is injected.
pub const DATABASE_FIELD: &str = "database";

/// Record kind reported for the admin field.
pub const USER_RECORD_KIND: &str = "user";

pub const USERNAME_ATTRIBUTE: &str = "user/username";
pub const FAVORITE_COLOR_ATTRIBUTE: &str = "user/favorite-color";

/// A user as stored in the user store. Passive value; no validation beyond shape.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct UserRecord {
    pub id: EntityId,
    pub username: String,
    pub favorite_color: Option<String>,
}

impl UserRecord {
    fn from_attributes(
        id: EntityId,
        attributes: &BTreeMap<String, Value>,
    ) -> Result<Self, StoreError> {
        let username = match attributes.get(USERNAME_ATTRIBUTE) {
            Some(Value::Str(username)) => username.clone(),
            _ => {
                return Err(StoreError::MissingAttribute {
                    entity: id,
                    attribute: USERNAME_ATTRIBUTE.to_string(),
                })
            }
        };

        let favorite_color = match attributes.get(FAVORITE_COLOR_ATTRIBUTE) {
            Some(Value::Str(color)) => Some(color.clone()),
            _ => None,
        };

        Ok(Self {
            id,
            username,
            favorite_color,
        })
    }
}

/// Queries the store for a user with the given username, returning the full record of
/// the first match or `None` when no such user exists.
pub fn get_user(database: &Database, username: &str) -> Result<Option<UserRecord>, StoreError> {
    let connection = database.connection()?;
    let ids = connection.query(USERNAME_ATTRIBUTE, &Value::Str(username.to_string()))?;

    match ids.first() {
        None => Ok(None),
        Some(id) => {
            let attributes =
                connection.pull(*id, &[USERNAME_ATTRIBUTE, FAVORITE_COLOR_ATTRIBUTE])?;
            UserRecord::from_attributes(*id, &attributes).map(Some)
        }
    }
}

/// Inserts a user with a favorite color. No retries or batching; a single transaction.
pub fn add_user(
    database: &Database,
    username: &str,
    favorite_color: &str,
) -> Result<TransactReport, StoreError> {
    let connection = database.connection()?;
    connection.transact(&[
        Fact::assert(USERNAME_ATTRIBUTE, Value::Str(username.to_string())),
        Fact::assert(
            FAVORITE_COLOR_ATTRIBUTE,
            Value::Str(favorite_color.to_string()),
        ),
    ])
}

/// Serves user lookups against the wired [Database]. `start` fetches the admin user
/// eagerly; a missing admin is stored as `None`, not an error.
pub struct UserDirectory {
    admin_username: String,
    admin: Option<UserRecord>,
    // reserved for a read-through cache; currently unused
    cache: FxHashMap<String, UserRecord>,
}

impl UserDirectory {
    pub fn new<T: ToString>(admin_username: T) -> Self {
        Self {
            admin_username: admin_username.to_string(),
            admin: None,
            cache: FxHashMap::default(),
        }
    }

    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    /// The admin user fetched at start time, if present in the store.
    pub fn admin(&self) -> Option<&UserRecord> {
        self.admin.as_ref()
    }
}

/// Declared shape of the user directory component.
pub fn schema() -> Schema {
    Schema::new()
        .field("admin_username", FieldType::Str)
        .field("admin", FieldType::optional(FieldType::Record(USER_RECORD_KIND)))
        .field("cache", FieldType::Map)
}

impl Component for UserDirectory {
    fn start(&mut self, deps: &ResolvedDependencies) -> Result<(), ErrorPtr> {
        let database: &Database = deps
            .get(DATABASE_FIELD)
            .map_err(|error| Arc::new(error) as ErrorPtr)?;

        self.admin = get_user(database, &self.admin_username)
            .map_err(|error| Arc::new(error) as ErrorPtr)?;

        match &self.admin {
            Some(admin) => debug!("Fetched admin user '{}' (entity {})", admin.username, admin.id),
            None => debug!("Admin user '{}' not present in store", self.admin_username),
        }

        Ok(())
    }

    fn stop(&mut self) -> Result<(), ErrorPtr> {
        self.admin = None;
        self.cache.clear();
        Ok(())
    }

    fn fields(&self) -> FieldMap {
        [
            (
                "admin_username".to_string(),
                FieldValue::Str(self.admin_username.clone()),
            ),
            (
                "admin".to_string(),
                match self.admin {
                    Some(_) => FieldValue::Record(USER_RECORD_KIND),
                    None => FieldValue::Absent,
                },
            ),
            ("cache".to_string(), FieldValue::Map(self.cache.len())),
        ]
        .into_iter()
        .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
