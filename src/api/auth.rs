//! Session establishment at the identity boundary. The third-party
//! handshake itself happens upstream; this layer receives a signed
//! assertion, materializes the user row, and opens a cookie session.

use crate::schema::users;
use crate::util::{api_util::*, auth_util};

use actix_web::{get, post, web, HttpResponse, Responder};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::models::{User, UserId};
use crate::{DbPool, Ext};

use actix_session::Session;

#[derive(Debug, Deserialize)]
struct SessionRequest {
    external_id: String,
    email: String,
    username: String,
    // Hex SHA-256, keyed by the provider secret.
    digest: String,
}

impl ApiRequest for SessionRequest {
    fn ok(&self) -> bool {
        !self.external_id.is_empty()
            && self.external_id.len() <= 100
            && self.email.contains('@')
            && self.email.len() <= 120
            && !self.username.is_empty()
            && self.username.len() <= 150
            && self.digest.len() == 64
    }
}

#[derive(Debug, Serialize)]
enum SessionResponse {
    // Returns the user id.
    Success(UserId),
    AuthError,
}

fn set_loggedin_session(
    session: &mut Session,
    id: UserId,
    is_admin: bool,
    location: &'static str,
) -> Result<(), ApiError> {
    session
        .insert(SESSION_USER_ID, id)
        .map_err(|e| log_server_error(e, location, ERROR_SESSION_INSERT))?;
    session
        .insert(SESSION_IS_ADMIN, is_admin)
        .map_err(|e| log_server_error(e, location, ERROR_SESSION_INSERT))?;
    Ok(())
}

// [[API]]
// desp: Exchange an identity-provider assertion for a cookie session,
//       creating the user on first sight.
// Method: POST
// URL: /auth/session
// Request Body: `SessionRequest`
// Response Body: `SessionResponse`
#[post("/auth/session")]
pub async fn create_session(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    form: web::Json<SessionRequest>,
    mut session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "create_session";
    form.sanity()?;

    if config.auth_enabled
        && !auth_util::verify_assertion(
            &form.external_id,
            &form.email,
            &form.username,
            &form.digest,
            &config.provider_secret,
        )
    {
        return Ok(HttpResponse::Ok().json(SessionResponse::AuthError));
    }

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let external_id = form.external_id.clone();
    let email = form.email.clone();
    let username = form.username.clone();

    let user = conn
        .transaction::<User, ApiError, _>(|conn| {
            Box::pin(async move {
                // Known external identity?
                if let Some(user) = users::table
                    .filter(users::external_id.eq(&external_id))
                    .first::<User>(conn)
                    .await
                    .optional()?
                {
                    return Ok(user);
                }

                // A pre-provisioned row may exist for the email only;
                // attach the external identity to it.
                if let Some(user) = users::table
                    .filter(users::email.eq(&email))
                    .first::<User>(conn)
                    .await
                    .optional()?
                {
                    let user = diesel::update(users::table.filter(users::id.eq(user.id)))
                        .set(users::external_id.eq(Some(&external_id)))
                        .get_result::<User>(conn)
                        .await?;
                    return Ok(user);
                }

                let user = diesel::insert_into(users::table)
                    .values((
                        users::username.eq(&username),
                        users::email.eq(&email),
                        users::external_id.eq(Some(&external_id)),
                    ))
                    .returning(User::as_returning())
                    .get_result(conn)
                    .await?;

                Ok(user)
            })
        })
        .await
        .map_err(|e| e.set_location(location).tap(ApiError::log))?;

    session.clear();
    set_loggedin_session(&mut session, user.id, user.is_admin, location)?;

    Ok(HttpResponse::Ok().json(SessionResponse::Success(user.id)))
}

#[derive(Debug, Serialize)]
enum LogoutResponse {
    Success,
}

// [[API]]
// desp: Drop the current session.
// Method: POST
// URL: /auth/logout
// Request Body: N/A
// Response Body: `LogoutResponse`
#[post("/auth/logout")]
pub async fn logout(session: Session) -> impl Responder {
    session.clear();
    HttpResponse::Ok().json(LogoutResponse::Success)
}

// For debug only!
#[get("/auth/user")]
pub async fn get_user(session: Session) -> impl Responder {
    if let (Ok(Some(user_id)), Ok(Some(is_admin))) = (
        session.get::<UserId>(SESSION_USER_ID),
        session.get::<bool>(SESSION_IS_ADMIN),
    ) {
        HttpResponse::Ok().body(format!("Admin {}, User id {}", is_admin, user_id))
    } else {
        HttpResponse::Unauthorized().body("No user logged in")
    }
}
