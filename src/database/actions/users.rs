use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::{generate_jwt_session, SessionKeys},
    },
    error::{CoreError, ErrorKind},
    schema::{Id, NewUser, RelationKind, User, UserView},
    store::EntityStore,
    validation::validate_user,
};

pub async fn get_user_by_id(user_id: Id, store: &impl EntityStore) -> Result<User, CoreError> {
    store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No user exists with specified id"))
}

/// `is_subscribed` tells whether `viewer` follows `user`; anonymous viewers follow nobody.
pub async fn user_view(
    user: User,
    viewer: Option<Id>,
    store: &impl EntityStore,
) -> Result<UserView, CoreError> {
    let is_subscribed = match viewer {
        Some(viewer) => {
            store
                .relation_exists(RelationKind::Follow, viewer, user.id)
                .await?
        }
        None => false,
    };

    Ok(UserView::from_user(user, is_subscribed))
}

/// Creates a user; the stored password is the argon2 hash of the given one.
pub async fn register_user(user: NewUser, store: &impl EntityStore) -> Result<User, CoreError> {
    validate_user(&user)?;

    let password_hash = hash_password(&user.password)?;
    let created = store.insert_user(&user, &password_hash).await?;

    log::info!("Registered user {} ({})", created.id, created.username);
    Ok(created)
}

pub async fn login_user(
    email: &str,
    password: &str,
    keys: &SessionKeys,
    store: &impl EntityStore,
) -> Result<String, CoreError> {
    let user = match store.find_user_by_email(email).await? {
        Some(user) => user,
        None => return Err(ErrorKind::Validation.new("Invalid credentials")),
    };

    if !verify_password(password, &user.password)? {
        log::warn!("Failed login for user {}", user.id);
        return Err(ErrorKind::Validation.new("Invalid credentials"));
    }

    generate_jwt_session(&user, keys)
}
