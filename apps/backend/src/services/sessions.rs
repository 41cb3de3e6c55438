//! Login sessions: issuing, resolving and revoking bearer tokens

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::{Store, StoreError};
use crate::error::Result;
use crate::models::{Session, User};

/// Who is logging in, as vouched for by the identity provider or dev login.
#[derive(Debug, Clone)]
pub struct Identity {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// A freshly issued session. `token` is only ever handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn new_token(prefix: &str) -> String {
    format!("{prefix}{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn new_user_id() -> String {
    format!("user_{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Find or create the user for `identity`, then issue a session valid for `ttl`.
pub async fn login(
    store: &dyn Store,
    identity: Identity,
    ttl: Duration,
    token_prefix: &str,
) -> Result<IssuedSession> {
    let user = find_or_create_user(store, identity).await?;

    let token = new_token(token_prefix);
    let now = Utc::now();
    let session = Session {
        token_hash: hash_token(&token),
        user_id: user.user_id.clone(),
        expires_at: now + ttl,
        created_at: now,
    };
    store.insert_session(&session).await?;

    tracing::info!(user_id = %user.user_id, expires_at = %session.expires_at, "Session issued");

    Ok(IssuedSession {
        token,
        expires_at: session.expires_at,
        user,
    })
}

async fn find_or_create_user(store: &dyn Store, identity: Identity) -> Result<User> {
    if let Some(user) = store.find_user_by_email(&identity.email).await? {
        return Ok(user);
    }

    let user = User::new(new_user_id(), identity.email, identity.name, identity.picture);
    match store.insert_user(&user).await {
        Ok(()) => {
            tracing::info!(user_id = %user.user_id, email = %user.email, "User created");
            Ok(user)
        }
        // Lost a race with a concurrent first login
        Err(StoreError::Conflict(_)) => store
            .find_user_by_email(&user.email)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.email)).into()),
        Err(e) => Err(e.into()),
    }
}

/// The user behind `token`, or `None` if the session is unknown or expired.
pub async fn resolve(store: &dyn Store, token: &str) -> Result<Option<User>> {
    let Some(session) = store.get_session(&hash_token(token)).await? else {
        return Ok(None);
    };
    if session.is_expired(Utc::now()) {
        return Ok(None);
    }
    Ok(store.get_user(&session.user_id).await?)
}

/// Returns whether a session was revoked.
pub async fn logout(store: &dyn Store, token: &str) -> Result<bool> {
    let revoked = store.delete_session(&hash_token(token)).await?;
    if revoked {
        tracing::info!("Session revoked");
    }
    Ok(revoked)
}
