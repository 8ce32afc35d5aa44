use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, SessionData, SessionKeys};

pub const SESSION_COOKIE: &str = "session";

pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::<String>(SESSION_COOKIE).and_then(move |session: String| {
        let keys = keys.clone();
        async move {
            match verify_jwt_session(&session, &keys) {
                Ok(data) => Ok(SessionData::from(data)),
                Err(e) => {
                    log::debug!("Rejected session cookie: {e}");
                    let rejection: Rejection = e.into();
                    Err(rejection)
                }
            }
        }
    })
}

/// Like `with_session`, but a missing or invalid cookie yields `None` instead of a rejection.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = std::convert::Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |session: Option<String>| {
        session
            .and_then(|session| verify_jwt_session(&session, &keys).ok())
            .map(SessionData::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        authentication::jwt::generate_jwt_session,
        schema::{User, UserRole},
    };

    fn token(keys: &SessionKeys) -> String {
        let user = User {
            id: 9,
            email: "cook@example.com".to_owned(),
            username: "cook".to_owned(),
            first_name: "Ann".to_owned(),
            last_name: "Cook".to_owned(),
            password: String::new(),
            role: UserRole::User,
        };
        generate_jwt_session(&user, keys).unwrap()
    }

    #[tokio::test]
    async fn session_cookie_is_extracted() {
        let keys = SessionKeys::new(b"secret", 1).unwrap();
        let session = warp::test::request()
            .header("cookie", format!("session={}", token(&keys)))
            .filter(&with_session(keys))
            .await
            .unwrap();
        assert_eq!(session.user_id, 9);
    }

    #[tokio::test]
    async fn missing_cookie_is_anonymous() {
        let keys = SessionKeys::new(b"secret", 1).unwrap();
        let session = warp::test::request()
            .filter(&with_possible_session(keys.clone()))
            .await
            .unwrap();
        assert!(session.is_none());

        assert!(warp::test::request()
            .filter(&with_session(keys))
            .await
            .is_err());
    }
}
