use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::config::Config;
use crate::database::schema::User;
use crate::error::{CoreError, ErrorKind};
use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

/// Signing key and lifetime of issued session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Result<Self, CoreError> {
        let key: Hmac<Sha256> = Hmac::new_from_slice(secret)
            .map_err(|_| ErrorKind::Storage.new("Invalid session secret"))?;

        let ttl = Duration::try_hours(ttl_hours)
            .ok_or_else(|| ErrorKind::Validation.new("Session lifetime is out of range"))?;

        Ok(Self { key, ttl })
    }

    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        Self::new(&config.session_secret, config.session_ttl_hours)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(
        id: Id,
        username: String,
        role: UserRole,
        ttl: Duration,
    ) -> Result<Self, CoreError> {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| ErrorKind::Validation.new("Session lifetime is out of range"))?
            .timestamp();

        Ok(Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), CoreError> {
        if !action.authenticate(self) {
            return Err(
                ErrorKind::Forbidden.new("You don't have permission to perform this action")
            );
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            role: value.role,
        }
    }
}

pub fn generate_jwt_session(user: &User, keys: &SessionKeys) -> Result<String, CoreError> {
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role.to_owned(),
        keys.ttl,
    )?;

    claims
        .sign_with_key(&keys.key)
        .map_err(|e| CoreError::storage(format!("Could not sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, keys: &SessionKeys) -> Result<JwtSessionData, CoreError> {
    let session: JwtSessionData = token
        .verify_with_key(&keys.key)
        .map_err(|_| ErrorKind::Forbidden.new("Invalid session; Invalid token"))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(ErrorKind::Forbidden.new("Invalid session; Token expired"));
    }
    Ok(session)
}
