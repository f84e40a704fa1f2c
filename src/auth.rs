//! Account, session and password-reset service
//!
//! Passwords are hashed with Argon2id (PHC string format). Sessions are
//! opaque random tokens stored alongside their expiry. Every change of
//! authentication state is broadcast to subscribers as an [`AuthEvent`].

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::database::{TABLE_PASSWORD_RESETS, TABLE_SESSIONS, TABLE_USERS};
use crate::error::AuthError;

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

const TOKEN_LENGTH: usize = 32;

/// Stored account
#[derive(Serialize, Deserialize, Debug, Clone)]
struct UserRecord {
    id: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Public view of an account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// An authenticated session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Recorded password reset request; stands in for the outgoing email
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PasswordReset {
    pub email: String,
    pub redirect_to: String,
    pub requested_at: DateTime<Utc>,
}

/// Authentication state change
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedUp(User),
    SignedIn(User),
    SignedOut(User),
    PasswordResetRequested { email: String },
}

/// Greeting shown when a session starts, e.g. "Welcome back, alice!"
pub fn welcome_message(email: &str) -> String {
    match email.split('@').next().filter(|name| !name.is_empty()) {
        Some(name) => format!("Welcome back, {name}!"),
        None => "Welcome back!".to_string(),
    }
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    let at = email.find('@');
    if !matches!(at, Some(i) if i > 0 && i + 1 < email.len()) {
        return Err(AuthError::Validation("A valid email is required".into()));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Auth service over the embedded database
#[derive(Clone)]
pub struct AuthService {
    db: Arc<Database>,
    session_ttl: Duration,
    reset_redirect_url: String,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    pub fn new(db: Arc<Database>, config: &Config) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            db,
            session_ttl: Duration::hours(config.session_ttl_hours),
            reset_redirect_url: config.reset_redirect_url.clone(),
            events,
        }
    }

    /// Subscribes to authentication state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    /// Registers a new account. The caller still has to sign in.
    pub fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);
        validate_credentials(&email, password)?;

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(TABLE_USERS)?;
            if users.get(email.as_str())?.is_some() {
                return Err(AuthError::EmailTaken);
            }
            users.insert(email.as_str(), json.as_str())?;
        }
        write_txn.commit()?;

        let user = User {
            id: record.id,
            email: record.email,
        };
        tracing::info!(user_id = %user.id, "Account created");
        self.emit(AuthEvent::SignedUp(user.clone()));
        Ok(user)
    }

    /// Verifies the password and opens a new session.
    pub fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);

        let record = {
            let read_txn = self.db.begin_read()?;
            let users = read_txn.open_table(TABLE_USERS)?;
            let row = users.get(email.as_str())?;
            match row {
                Some(guard) => serde_json::from_str::<UserRecord>(guard.value())?,
                None => {
                    tracing::warn!("Sign-in attempt for unknown account");
                    return Err(AuthError::InvalidCredentials);
                }
            }
        };

        if !verify_password(password, &record.password_hash)? {
            tracing::warn!(user_id = %record.id, "Sign-in attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let session = Session {
            token: random_token(),
            user: User {
                id: record.id,
                email: record.email,
            },
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        let json = serde_json::to_string(&session)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
            sessions.insert(session.token.as_str(), json.as_str())?;
        }
        write_txn.commit()?;

        tracing::info!(user_id = %session.user.id, "{}", welcome_message(&session.user.email));
        self.emit(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    /// Returns the live session for `token`, if any.
    ///
    /// An expired session is removed on lookup.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let stored = {
            let read_txn = self.db.begin_read()?;
            let sessions = read_txn.open_table(TABLE_SESSIONS)?;
            let row = sessions.get(token)?.map(|guard| guard.value().to_string());
            row
        };
        let Some(json) = stored else {
            return Ok(None);
        };

        let session: Session = serde_json::from_str(&json)?;
        if !session.is_expired() {
            return Ok(Some(session));
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
            sessions.remove(token)?;
        }
        write_txn.commit()?;

        tracing::debug!(user_id = %session.user.id, "Expired session removed");
        Ok(None)
    }

    /// Ends the session for `token`.
    pub fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
            let removed = sessions.remove(token)?;
            match removed {
                Some(guard) => Some(serde_json::from_str::<Session>(guard.value())?),
                None => None,
            }
        };
        write_txn.commit()?;

        match removed {
            Some(session) => {
                tracing::info!(user_id = %session.user.id, "Signed out");
                self.emit(AuthEvent::SignedOut(session.user));
                Ok(())
            }
            None => Err(AuthError::NoSession),
        }
    }

    /// Records a password reset request for `email`.
    ///
    /// Succeeds whether or not the account exists so callers cannot probe
    /// for registered addresses.
    pub fn reset_password_for_email(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);

        let known = {
            let read_txn = self.db.begin_read()?;
            let users = read_txn.open_table(TABLE_USERS)?;
            let found = users.get(email.as_str())?.is_some();
            found
        };
        if !known {
            tracing::debug!("Password reset requested for unknown account");
            return Ok(());
        }

        let reset = PasswordReset {
            email: email.clone(),
            redirect_to: self.reset_redirect_url.clone(),
            requested_at: Utc::now(),
        };
        let token = random_token();
        let json = serde_json::to_string(&reset)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut resets = write_txn.open_table(TABLE_PASSWORD_RESETS)?;
            resets.insert(token.as_str(), json.as_str())?;
        }
        write_txn.commit()?;

        tracing::info!(redirect_to = %reset.redirect_to, "Password reset email queued");
        self.emit(AuthEvent::PasswordResetRequested { email });
        Ok(())
    }

    /// Pending reset requests, oldest first
    pub fn pending_resets(&self) -> Result<Vec<PasswordReset>, AuthError> {
        let read_txn = self.db.begin_read()?;
        let resets = read_txn.open_table(TABLE_PASSWORD_RESETS)?;

        let mut pending = Vec::new();
        for entry in resets.iter()? {
            let (_, value) = entry?;
            pending.push(serde_json::from_str::<PasswordReset>(value.value())?);
        }
        pending.sort_by_key(|reset| reset.requested_at);
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::init_db;
    use tempfile::NamedTempFile;

    fn setup_auth() -> (AuthService, NamedTempFile) {
        let temp_db = NamedTempFile::new().expect("Failed to create temp file");
        let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to init db");
        (AuthService::new(Arc::new(db), &Config::default()), temp_db)
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("wrong-horse", &hash).unwrap());
    }

    #[test]
    fn welcome_message_uses_local_part() {
        assert_eq!(welcome_message("alice@example.com"), "Welcome back, alice!");
        assert_eq!(welcome_message("@example.com"), "Welcome back!");
    }

    #[test]
    fn sign_up_then_sign_in_opens_session() {
        let (auth, _temp_db) = setup_auth();

        let user = auth.sign_up("Alice@Example.com", "secret-pass").unwrap();
        assert_eq!(user.email, "alice@example.com");

        let session = auth.sign_in_with_password("alice@example.com", "secret-pass").unwrap();
        assert_eq!(session.user, user);
        assert_eq!(session.token.len(), TOKEN_LENGTH);

        let fetched = auth.get_session(&session.token).unwrap();
        assert_eq!(fetched, Some(session));
    }

    #[test]
    fn sign_up_rejects_duplicates_and_weak_input() {
        let (auth, _temp_db) = setup_auth();
        auth.sign_up("bob@example.com", "secret-pass").unwrap();

        assert!(matches!(
            auth.sign_up("bob@example.com", "another-pass"),
            Err(AuthError::EmailTaken)
        ));
        assert!(matches!(
            auth.sign_up("not-an-email", "secret-pass"),
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.sign_up("carol@example.com", "short"),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let (auth, _temp_db) = setup_auth();
        auth.sign_up("dave@example.com", "secret-pass").unwrap();

        assert!(matches!(
            auth.sign_in_with_password("dave@example.com", "nope-nope"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_in_with_password("nobody@example.com", "secret-pass"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn sign_out_ends_session_and_broadcasts() {
        let (auth, _temp_db) = setup_auth();
        let mut events = auth.subscribe();

        auth.sign_up("erin@example.com", "secret-pass").unwrap();
        let session = auth.sign_in_with_password("erin@example.com", "secret-pass").unwrap();
        auth.sign_out(&session.token).unwrap();

        assert_eq!(auth.get_session(&session.token).unwrap(), None);
        assert!(matches!(auth.sign_out(&session.token), Err(AuthError::NoSession)));

        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedUp(_))));
        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedIn(_))));
        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedOut(_))));
    }

    #[test]
    fn expired_session_is_gone_and_removed() {
        let temp_db = NamedTempFile::new().unwrap();
        let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
        let config = Config {
            session_ttl_hours: 0,
            ..Config::default()
        };
        let auth = AuthService::new(Arc::new(db), &config);

        auth.sign_up("gina@example.com", "secret-pass").unwrap();
        let session = auth.sign_in_with_password("gina@example.com", "secret-pass").unwrap();
        assert!(session.is_expired());

        assert_eq!(auth.get_session(&session.token).unwrap(), None);
        // The lookup deleted the row, so there is nothing left to sign out
        assert!(matches!(auth.sign_out(&session.token), Err(AuthError::NoSession)));
    }

    #[test]
    fn reset_is_recorded_only_for_known_accounts() {
        let (auth, _temp_db) = setup_auth();
        auth.sign_up("frank@example.com", "secret-pass").unwrap();

        auth.reset_password_for_email("ghost@example.com").unwrap();
        auth.reset_password_for_email("frank@example.com").unwrap();

        let pending = auth.pending_resets().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].email, "frank@example.com");
        assert_eq!(pending[0].redirect_to, "http://localhost:8080/reset-password");
    }
}
