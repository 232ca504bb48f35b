mod test_support;

use attendance_tracker::AppError;
use attendance_tracker::auth::{AuthContext, AuthState, IdentityProvider};
use attendance_tracker::models::Status;
use test_support::{monday, sign_up_form, temp_db};

#[test]
fn sign_up_creates_profile_and_session() {
    let (_dir, db) = temp_db();
    let identity = IdentityProvider::new(db.clone());

    let session = identity
        .sign_up(&sign_up_form("Asha@Example.edu", "A2"))
        .unwrap();
    assert_eq!(session.user.email, "asha@example.edu");

    let user = identity.authenticate(&session.token).unwrap();
    assert_eq!(user, session.user);

    let profile = db.manager(&user.id).unwrap().profile().unwrap();
    assert_eq!(profile.batch, "A2");
    assert_eq!(profile.branch, "CSE");
    assert_eq!(profile.email, "asha@example.edu");
}

#[test]
fn sign_up_rejects_bad_forms_and_taken_emails() {
    let (_dir, db) = temp_db();
    let identity = IdentityProvider::new(db);

    let mut short = sign_up_form("asha@example.edu", "A1");
    short.password = "abc".to_string();
    assert!(matches!(
        identity.sign_up(&short),
        Err(AppError::Validation(_))
    ));

    let wrong_batch = sign_up_form("asha@example.edu", "B1");
    assert!(matches!(
        identity.sign_up(&wrong_batch),
        Err(AppError::Validation(_))
    ));

    identity
        .sign_up(&sign_up_form("asha@example.edu", "A1"))
        .unwrap();
    assert!(matches!(
        identity.sign_up(&sign_up_form("asha@example.edu", "A1")),
        Err(AppError::EmailTaken(_))
    ));
}

#[test]
fn sign_in_checks_the_password() {
    let (_dir, db) = temp_db();
    let identity = IdentityProvider::new(db);
    identity
        .sign_up(&sign_up_form("asha@example.edu", "A1"))
        .unwrap();

    assert!(matches!(
        identity.sign_in("asha@example.edu", "wrong-password"),
        Err(AppError::InvalidCredentials)
    ));
    assert!(matches!(
        identity.sign_in("nobody@example.edu", "hunter22"),
        Err(AppError::InvalidCredentials)
    ));

    let session = identity.sign_in("asha@example.edu", "hunter22").unwrap();
    assert!(identity.authenticate(&session.token).is_ok());
}

#[test]
fn sign_out_invalidates_only_that_token() {
    let (_dir, db) = temp_db();
    let identity = IdentityProvider::new(db);
    let first = identity
        .sign_up(&sign_up_form("asha@example.edu", "A1"))
        .unwrap();
    let second = identity.sign_in("asha@example.edu", "hunter22").unwrap();

    identity.sign_out(&first.token).unwrap();

    assert!(matches!(
        identity.authenticate(&first.token),
        Err(AppError::Unauthenticated)
    ));
    assert!(identity.authenticate(&second.token).is_ok());

    // Signing out twice is fine.
    identity.sign_out(&first.token).unwrap();
}

#[test]
fn auth_context_notifies_subscribers() {
    let (_dir, db) = temp_db();
    let auth = AuthContext::new(IdentityProvider::new(db));
    let mut changes = auth.subscribe();

    assert!(auth.require_session().is_err());

    let session = auth
        .sign_up(&sign_up_form("asha@example.edu", "A1"))
        .unwrap();
    assert!(changes.has_changed().unwrap());
    assert_eq!(
        *changes.borrow_and_update(),
        AuthState::SignedIn(session.clone())
    );
    assert_eq!(auth.require_session().unwrap(), session);

    auth.sign_out().unwrap();
    assert!(changes.has_changed().unwrap());
    assert_eq!(*changes.borrow_and_update(), AuthState::SignedOut);
    assert!(matches!(
        auth.require_session(),
        Err(AppError::Unauthenticated)
    ));
}

#[test]
fn restoring_a_stale_token_signs_out() {
    let (_dir, db) = temp_db();
    let identity = IdentityProvider::new(db.clone());
    let session = identity
        .sign_up(&sign_up_form("asha@example.edu", "A1"))
        .unwrap();

    let auth = AuthContext::new(identity.clone());
    assert_eq!(
        auth.restore(&session.token).unwrap(),
        AuthState::SignedIn(session.clone())
    );

    identity.sign_out(&session.token).unwrap();

    let restored = AuthContext::new(identity);
    assert_eq!(restored.restore(&session.token).unwrap(), AuthState::SignedOut);
}

#[test]
fn users_never_see_each_others_records() {
    let (_dir, db) = temp_db();
    let identity = IdentityProvider::new(db.clone());
    let asha = identity
        .sign_up(&sign_up_form("asha@example.edu", "A1"))
        .unwrap();
    let ravi = identity
        .sign_up(&sign_up_form("ravi@example.edu", "A1"))
        .unwrap();

    db.manager(&asha.user.id)
        .unwrap()
        .mark(monday(), "Physics", Status::Present, None)
        .unwrap();

    assert!(db.manager(&ravi.user.id).unwrap().records().unwrap().is_empty());
}
