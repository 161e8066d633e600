//! The database component: owns the connection to the user store.

use crate::store::{ConnectionPtr, StoreClientPtr, StoreError};
use cogwork::component::{Component, FieldMap, FieldValue, ResolvedDependencies};
use cogwork::error::ErrorPtr;
use cogwork_schema::{FieldType, Schema};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info};

/// Handle kind reported for the open connection field.
pub const CONNECTION_HANDLE_KIND: &str = "store-connection";

/// Holds the store connection for the lifetime of the system. `start` opens the
/// connection, `stop` releases it and shuts the client down. Downstream components
/// receive the started instance through dependency wiring and read the live handle.
pub struct Database {
    uri: String,
    client: StoreClientPtr,
    connection: Option<ConnectionPtr>,
}

impl Database {
    pub fn new<T: ToString>(uri: T, client: StoreClientPtr) -> Self {
        Self {
            uri: uri.to_string(),
            client,
            connection: None,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns the live connection, or [StoreError::Disconnected] before start or
    /// after stop.
    pub fn connection(&self) -> Result<&ConnectionPtr, StoreError> {
        self.connection.as_ref().ok_or(StoreError::Disconnected)
    }
}

/// Declared shape of the database component. The connection is optional because it
/// only exists between start and stop.
pub fn schema() -> Schema {
    Schema::new().field("uri", FieldType::Uri).field(
        "connection",
        FieldType::optional(FieldType::Handle(CONNECTION_HANDLE_KIND)),
    )
}

impl Component for Database {
    fn start(&mut self, _deps: &ResolvedDependencies) -> Result<(), ErrorPtr> {
        if self.connection.is_some() {
            debug!("Database already connected to '{}'", self.uri);
            return Ok(());
        }

        let connection = self
            .client
            .connect(&self.uri)
            .map_err(|error| Arc::new(error) as ErrorPtr)?;

        info!("Connected to user store at '{}'", self.uri);

        self.connection = Some(connection);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ErrorPtr> {
        let released = self.connection.take().map(|connection| connection.disconnect());

        // the client shuts down even when releasing the handle fails
        self.client.shutdown();

        if let Some(result) = released {
            result.map_err(|error| Arc::new(error) as ErrorPtr)?;
            info!("Released user store connection to '{}'", self.uri);
        }

        Ok(())
    }

    fn fields(&self) -> FieldMap {
        [
            ("uri".to_string(), FieldValue::Uri(self.uri.clone())),
            (
                "connection".to_string(),
                match self.connection {
                    Some(_) => FieldValue::Handle(CONNECTION_HANDLE_KIND),
                    None => FieldValue::Absent,
                },
            ),
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
