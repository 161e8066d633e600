//! End-to-end lifecycle tests for the assembled user service.

use cogwork::error::LifecycleError;
use cogwork::system::{SystemBuilder, SystemState};
use cogwork_schema::{FieldType, Schema, SchemaHook};
use cogwork_users::assembly::{build_system, DATABASE_COMPONENT, USER_DIRECTORY_COMPONENT};
use cogwork_users::config::UserServiceConfig;
use cogwork_users::database::Database;
use cogwork_users::directory::{
    add_user, get_user, UserDirectory, DATABASE_FIELD, USERNAME_ATTRIBUTE,
};
use cogwork_users::store::{Fact, MemoryStore, StoreClient, Value};
use std::sync::Arc;

fn config() -> UserServiceConfig {
    UserServiceConfig::default()
}

fn seeded_store(admin_color: &str) -> MemoryStore {
    let store = MemoryStore::new();
    let connection = store.connect("mem://users").unwrap();
    connection
        .transact(&[
            Fact::assert(USERNAME_ATTRIBUTE, Value::Str("admin".to_string())),
            Fact::assert(
                "user/favorite-color",
                Value::Str(admin_color.to_string()),
            ),
        ])
        .unwrap();
    connection.disconnect().unwrap();
    store
}

#[test]
fn should_expose_stored_admin_after_start() {
    let store = seeded_store("green");
    let mut system = build_system(&config(), Arc::new(store)).unwrap();

    system.start().unwrap();

    let directory: &UserDirectory = system.component(USER_DIRECTORY_COMPONENT).unwrap();
    let admin = directory.admin().unwrap();
    assert_eq!(admin.username, "admin");
    assert_eq!(admin.favorite_color.as_deref(), Some("green"));
}

#[test]
fn should_start_with_absent_admin() {
    let mut system = build_system(&config(), Arc::new(MemoryStore::new())).unwrap();

    system.start().unwrap();

    let directory: &UserDirectory = system.component(USER_DIRECTORY_COMPONENT).unwrap();
    assert!(directory.admin().is_none());
}

#[test]
fn should_release_connection_on_stop() {
    let mut system = build_system(&config(), Arc::new(seeded_store("green"))).unwrap();

    system.start().unwrap();
    let database: &Database = system.component(DATABASE_COMPONENT).unwrap();
    assert!(database.is_connected());

    system.stop().unwrap();
    assert_eq!(system.state(), SystemState::Stopped);

    let database: &Database = system.component(DATABASE_COMPONENT).unwrap();
    assert!(!database.is_connected());
    let directory: &UserDirectory = system.component(USER_DIRECTORY_COMPONENT).unwrap();
    assert!(directory.admin().is_none());
}

#[test]
fn should_serve_lookups_and_inserts_while_started() {
    let mut system = build_system(&config(), Arc::new(MemoryStore::new())).unwrap();
    system.start().unwrap();

    let database: &Database = system.component(DATABASE_COMPONENT).unwrap();

    let report = add_user(database, "rich", "blue").unwrap();
    let user = get_user(database, "rich").unwrap().unwrap();
    assert_eq!(user.id, report.entities[0]);
    assert_eq!(user.favorite_color.as_deref(), Some("blue"));
}

// The same misdeclared shape must be reproducible both ways: rejected up front with a
// descriptive diff when validation is on, and a failure at first use without it.

#[test]
fn should_reject_misdeclared_shape_when_validation_enabled() {
    let misdeclared = Schema::new()
        .field("admin_user", FieldType::Str)
        .field("admin", FieldType::optional(FieldType::Record("user")))
        .field("cache", FieldType::Map);

    let mut system = SystemBuilder::new()
        .component(
            DATABASE_COMPONENT,
            Box::new(Database::new("mem://users", Arc::new(MemoryStore::new()))),
        )
        .component(USER_DIRECTORY_COMPONENT, Box::new(UserDirectory::new("admin")))
        .depends_on(USER_DIRECTORY_COMPONENT, DATABASE_FIELD, DATABASE_COMPONENT)
        .hook(Box::new(
            SchemaHook::new().schema(USER_DIRECTORY_COMPONENT, misdeclared),
        ))
        .build()
        .unwrap();

    let error = system.start().unwrap_err();
    match &error {
        LifecycleError::HookRejected { component, source, .. } => {
            assert_eq!(component, USER_DIRECTORY_COMPONENT);
            let rendered = source.to_string();
            assert!(rendered.contains("admin_user"), "diff names the missing field: {rendered}");
            assert!(rendered.contains("admin_username"), "diff names the extra field: {rendered}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn should_fail_at_first_use_without_validation() {
    // same mistake, no validation hook: the directory asks for its "database" field,
    // which was wired under a different name, and start fails at first use
    let mut system = SystemBuilder::new()
        .component(
            DATABASE_COMPONENT,
            Box::new(Database::new("mem://users", Arc::new(MemoryStore::new()))),
        )
        .component(USER_DIRECTORY_COMPONENT, Box::new(UserDirectory::new("admin")))
        .depends_on(USER_DIRECTORY_COMPONENT, "db", DATABASE_COMPONENT)
        .build()
        .unwrap();

    match system.start().unwrap_err() {
        LifecycleError::ComponentFailed { component, source, .. } => {
            assert_eq!(component, USER_DIRECTORY_COMPONENT);
            assert!(source.to_string().contains("database"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn should_inject_started_database_into_directory() {
    // an empty store still lets the directory start; its lookup runs against the live
    // handle opened by the database's own start, which only holds if the database
    // started first
    let mut system = build_system(&config(), Arc::new(MemoryStore::new())).unwrap();

    assert_eq!(
        system.start_order(),
        [DATABASE_COMPONENT, USER_DIRECTORY_COMPONENT]
    );

    system.start().unwrap();
    assert_eq!(system.state(), SystemState::Started);
}

#[test]
fn should_validate_shapes_through_full_lifecycle() {
    // default config has validation enabled; every before/after check across start and
    // stop of both components must pass
    let mut system = build_system(&config(), Arc::new(seeded_store("green"))).unwrap();

    system.start().unwrap();
    system.stop().unwrap();
}
