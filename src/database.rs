//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database that backs
//! templates, accounts, sessions and the local theme preference.

use redb::{Database, TableDefinition};
use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Config;
use crate::store::RedbTemplateStore;
use crate::theme::ThemeService;

/// Main table for storing templates
///
/// Key: Template ID (UUID) as string
/// Value: JSON-serialized Template as string
pub const TABLE_TEMPLATES: TableDefinition<&str, &str> = TableDefinition::new("template");

/// Index table for listing the templates of one owner
///
/// Key: Composite key in format "{user_id}:{template_id}"
/// Value: Template ID
///
/// Example:
/// - Key: "4f1c...:9b2e..."
/// - Value: "9b2e..."
pub const TABLE_OWNER_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("template_owner_index");

/// Registered accounts
///
/// Key: Lower-cased email
/// Value: JSON-serialized UserRecord
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("auth_users");

/// Active sessions
///
/// Key: Session token
/// Value: JSON-serialized Session
pub const TABLE_SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("auth_sessions");

/// Pending password reset requests
///
/// Key: Reset token
/// Value: JSON-serialized PasswordReset
pub const TABLE_PASSWORD_RESETS: TableDefinition<&str, &str> =
    TableDefinition::new("auth_password_resets");

/// Local key/value preferences (theme mode)
pub const TABLE_PREFERENCES: TableDefinition<&str, &str> = TableDefinition::new("preferences");

/// Application state shared across all request handlers
///
/// Services are constructed once at start-up and handed to every handler
/// through this struct; nothing lives in statics.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,

    pub auth: AuthService,

    pub theme: Arc<ThemeService>,
}

impl AppState {
    /// Builds the state and its services on top of an initialized database.
    ///
    /// Reads the stored theme preference once.
    pub fn new(db: Database, config: Config) -> Result<Self, redb::Error> {
        let db = Arc::new(db);
        let auth = AuthService::new(db.clone(), &config);
        let theme = ThemeService::load(db.clone(), &config.theme_storage_key)?;

        Ok(Self {
            db,
            auth,
            theme: Arc::new(theme),
        })
    }

    /// Template store scoped to the templates owned by `user_id`
    pub fn store_for(&self, user_id: &str) -> RedbTemplateStore {
        RedbTemplateStore::new(self.db.clone(), user_id)
    }
}

/// Initializes the embedded database and creates required tables
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Example
///
/// ```no_run
/// # use template_manager::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    // Create or open the database file
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_TEMPLATES)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_SESSIONS)?;
        write_txn.open_table(TABLE_PASSWORD_RESETS)?;
        write_txn.open_table(TABLE_PREFERENCES)?;
    }

    // Commit the transaction to persist the table structures
    write_txn.commit()?;

    Ok(db)
}
