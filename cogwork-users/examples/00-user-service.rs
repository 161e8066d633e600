use cogwork_users::assembly::{
    build_system, install_tracing_logger, DATABASE_COMPONENT, USER_DIRECTORY_COMPONENT,
};
use cogwork_users::config::UserServiceConfig;
use cogwork_users::database::Database;
use cogwork_users::directory::{add_user, get_user, UserDirectory};
use cogwork_users::store::MemoryStore;
use std::sync::Arc;

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    install_tracing_logger();

    let config = UserServiceConfig::default();
    let mut system =
        build_system(&config, Arc::new(MemoryStore::new())).expect("error assembling system");

    // starts the database, then the directory, validating shapes around each transition
    system.start().expect("error starting system");

    let database: &Database = system
        .component(DATABASE_COMPONENT)
        .expect("missing database component");

    add_user(database, "rich", "blue").expect("error adding user");

    let user = get_user(database, "rich")
        .expect("error fetching user")
        .expect("user not found");
    println!("{} likes {}", user.username, user.favorite_color.unwrap_or_default());

    let directory: &UserDirectory = system
        .component(USER_DIRECTORY_COMPONENT)
        .expect("missing directory component");
    println!("admin present: {}", directory.admin().is_some());

    system.stop().expect("error stopping system");
}
