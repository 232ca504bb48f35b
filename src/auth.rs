//! The identity provider and the auth context wrapped around it.
//!
//! Users sign up with an email, a password, and their profile metadata. Signing in issues an
//! opaque bearer token, stored in `sessions`, which is what every other operation authenticates
//! with.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use diesel::prelude::*;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{NewSession, NewUserRole, Profile, UserRow};
use crate::schema;

/// The role every new account is given.
pub const DEFAULT_ROLE: &str = "student";

/// The minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Branches students can belong to, with the batches each branch is split into.
pub const BRANCHES: [(&str, &[&str]); 4] = [
    ("CSE", &["A1", "A2", "A3"]),
    ("CSE-AIML", &["A4", "A5", "A6"]),
    ("IT", &["B1", "B2", "B3"]),
    ("CS-DS", &["B4"]),
];

/// The batches of a branch, if the branch exists.
pub fn batches_for(branch: &str) -> Option<&'static [&'static str]> {
    BRANCHES
        .iter()
        .find(|(name, _)| *name == branch)
        .map(|(_, batches)| *batches)
}

/// Everything collected by the sign-up form.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    pub roll_number: String,
    pub branch: String,
    pub batch: String,
}

impl SignUp {
    /// Checks the form before anything is written.
    pub fn validate(&self) -> AppResult<()> {
        let fields = [
            &self.email,
            &self.password,
            &self.name,
            &self.roll_number,
            &self.branch,
            &self.batch,
        ];
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(AppError::validation("Please fill in all fields"));
        }

        if !self.email.contains('@') {
            return Err(AppError::validation("Please enter a valid email address"));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let batches = batches_for(&self.branch)
            .ok_or_else(|| AppError::validation(format!("Unknown branch {}", self.branch)))?;
        if !batches.contains(&self.batch.as_str()) {
            return Err(AppError::validation(format!(
                "Batch {} is not part of {}",
                self.batch, self.branch
            )));
        }

        Ok(())
    }
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// A live session: the bearer token and who it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// PBKDF2 rounds for new passwords. Each user row keeps the count it was hashed with.
pub const PBKDF2_ITERATIONS: u32 = 200_000;

fn hash_password(salt: &str, password: &str, iterations: u32) -> String {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations.max(1), &mut key);
    STANDARD.encode(key)
}

/// Compares two digests without stopping at the first differing byte.
fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

fn verify_password(user: &UserRow, password: &str) -> bool {
    let iterations = u32::try_from(user.iterations).unwrap_or(1);
    digests_match(
        &hash_password(&user.salt, password, iterations),
        &user.password_hash,
    )
}

/// Creates and checks identities and sessions.
#[derive(Clone)]
pub struct IdentityProvider {
    db: Database,
}

impl IdentityProvider {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Registers a new user, creates their profile and role, and signs them in.
    pub fn sign_up(&self, form: &SignUp) -> AppResult<Session> {
        form.validate()?;

        let email = form.email.trim().to_lowercase();
        let mut conn = self.db.connection()?;

        let session = conn.transaction::<_, AppError, _>(|conn| {
            let taken = schema::users::table
                .filter(schema::users::email.eq(&email))
                .count()
                .get_result::<i64>(conn)?;
            if taken > 0 {
                return Err(AppError::EmailTaken(email.clone()));
            }

            let salt = Uuid::new_v4().simple().to_string();
            let user = UserRow {
                id: Uuid::new_v4().to_string(),
                email: email.clone(),
                password_hash: hash_password(&salt, &form.password, PBKDF2_ITERATIONS),
                salt,
                iterations: PBKDF2_ITERATIONS as i32,
                created_at: Utc::now().naive_utc(),
            };

            diesel::insert_into(schema::users::table)
                .values(&user)
                .execute(conn)?;

            let profile = Profile {
                id: user.id.clone(),
                name: form.name.trim().to_string(),
                email: email.clone(),
                branch: form.branch.clone(),
                batch: form.batch.clone(),
                roll_number: form.roll_number.trim().to_string(),
            };

            diesel::insert_into(schema::profiles::table)
                .values(&profile)
                .execute(conn)?;

            diesel::insert_into(schema::user_roles::table)
                .values(&NewUserRole {
                    userid: &user.id,
                    role: DEFAULT_ROLE,
                })
                .execute(conn)?;

            start_session(conn, &user.id, &user.email)
        })?;

        info!("Signed up {}", session.user.email);

        Ok(session)
    }

    /// Checks an email and password and issues a new session.
    pub fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::validation("Please fill in all fields"));
        }

        let email = email.trim().to_lowercase();
        let mut conn = self.db.connection()?;

        let user = schema::users::table
            .filter(schema::users::email.eq(&email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&user, password) {
            return Err(AppError::InvalidCredentials);
        }

        let session = start_session(&mut conn, &user.id, &user.email)?;
        info!("Signed in {}", session.user.email);

        Ok(session)
    }

    /// Ends a session. Unknown tokens are not an error.
    pub fn sign_out(&self, token: &str) -> AppResult<()> {
        let mut conn = self.db.connection()?;

        let removed = diesel::delete(
            schema::sessions::table.filter(schema::sessions::token.eq(token)),
        )
        .execute(&mut conn)?;

        debug!("Removed {removed} session(s)");

        Ok(())
    }

    /// Resolves a bearer token to its user.
    pub fn authenticate(&self, token: &str) -> AppResult<User> {
        let mut conn = self.db.connection()?;

        let (id, email) = schema::sessions::table
            .inner_join(schema::users::table)
            .filter(schema::sessions::token.eq(token))
            .select((schema::users::id, schema::users::email))
            .first::<(String, String)>(&mut conn)
            .optional()?
            .ok_or(AppError::Unauthenticated)?;

        Ok(User { id, email })
    }
}

fn start_session(conn: &mut SqliteConnection, user_id: &str, email: &str) -> AppResult<Session> {
    let token = Uuid::new_v4().simple().to_string();

    diesel::insert_into(schema::sessions::table)
        .values(&NewSession {
            token: &token,
            userid: user_id,
            created_at: Utc::now().naive_utc(),
        })
        .execute(conn)?;

    Ok(Session {
        token,
        user: User {
            id: user_id.to_string(),
            email: email.to_string(),
        },
    })
}

/// Who is signed in, as observed by the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn(Session),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::SignedOut => None,
            AuthState::SignedIn(session) => Some(session),
        }
    }
}

/// The current session plus everyone watching it.
///
/// Every sign-in, sign-up, sign-out, or restore publishes the new [`AuthState`] to subscribers.
pub struct AuthContext {
    provider: IdentityProvider,
    state: watch::Sender<AuthState>,
}

impl AuthContext {
    pub fn new(provider: IdentityProvider) -> Self {
        let (state, _) = watch::channel(AuthState::SignedOut);
        Self { provider, state }
    }

    pub fn provider(&self) -> &IdentityProvider {
        &self.provider
    }

    /// Receives every change of [`AuthState`] from now on.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn publish(&self, state: AuthState) {
        self.state.send_replace(state);
    }

    /// Re-attaches a previously issued token. A token that is no longer valid leaves the context
    /// signed out.
    pub fn restore(&self, token: &str) -> AppResult<AuthState> {
        let state = match self.provider.authenticate(token) {
            Ok(user) => AuthState::SignedIn(Session {
                token: token.to_string(),
                user,
            }),
            Err(AppError::Unauthenticated) => AuthState::SignedOut,
            Err(e) => return Err(e),
        };

        self.publish(state.clone());
        Ok(state)
    }

    pub fn sign_up(&self, form: &SignUp) -> AppResult<Session> {
        let session = self.provider.sign_up(form)?;
        self.publish(AuthState::SignedIn(session.clone()));
        Ok(session)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let session = self.provider.sign_in(email, password)?;
        self.publish(AuthState::SignedIn(session.clone()));
        Ok(session)
    }

    pub fn sign_out(&self) -> AppResult<()> {
        if let AuthState::SignedIn(session) = self.current() {
            self.provider.sign_out(&session.token)?;
        }
        self.publish(AuthState::SignedOut);
        Ok(())
    }

    /// The auth gate: the current session, or [`AppError::Unauthenticated`] if nobody is signed in.
    pub fn require_session(&self) -> AppResult<Session> {
        self.current()
            .session()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SignUp {
        SignUp {
            email: "asha@example.edu".to_string(),
            password: "hunter22".to_string(),
            name: "Asha Rao".to_string(),
            roll_number: "21CS001".to_string(),
            branch: "CSE".to_string(),
            batch: "A2".to_string(),
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn every_field_is_required() {
        let mut missing = form();
        missing.roll_number = " ".to_string();
        assert_eq!(
            missing.validate().unwrap_err().to_string(),
            "Please fill in all fields"
        );
    }

    #[test]
    fn batch_must_belong_to_branch() {
        let mut wrong = form();
        wrong.batch = "B1".to_string();
        assert!(wrong.validate().is_err());

        let mut unknown = form();
        unknown.branch = "MECH".to_string();
        assert!(unknown.validate().is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        let mut short = form();
        short.password = "abc".to_string();
        assert!(short.validate().is_err());
    }

    #[test]
    fn password_hash_depends_on_salt_and_rounds() {
        assert_eq!(hash_password("s1", "pw", 10), hash_password("s1", "pw", 10));
        assert_ne!(hash_password("s1", "pw", 10), hash_password("s2", "pw", 10));
        assert_ne!(hash_password("s1", "pw", 10), hash_password("s1", "pw", 11));
    }

    #[test]
    fn stored_digest_verifies_only_the_right_password() {
        let user = UserRow {
            id: "u1".to_string(),
            email: "asha@example.edu".to_string(),
            password_hash: hash_password("salt", "hunter22", 10),
            salt: "salt".to_string(),
            iterations: 10,
            created_at: Utc::now().naive_utc(),
        };

        assert!(verify_password(&user, "hunter22"));
        assert!(!verify_password(&user, "hunter23"));
        assert!(!verify_password(&user, ""));
    }

    #[test]
    fn digests_compare_by_content_and_length() {
        assert!(digests_match("abc", "abc"));
        assert!(!digests_match("abc", "abd"));
        assert!(!digests_match("abc", "abcd"));
    }

    #[test]
    fn branches_list_their_batches() {
        assert_eq!(batches_for("CS-DS"), Some(&["B4"][..]));
        assert_eq!(batches_for("nope"), None);
    }
}
