use std::ops::DerefMut;

use actix_session::Session;
use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use diesel::result::Error;

use derive_more::derive::Display;
use diesel::prelude::*;

use crate::models::{CtfTask, RequestId, TaskId, Team, TeamId, TeamRequest, User, UserId};
use log::error;

use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl;

/// Shared sanity check for request payloads. Field presence is enforced by
/// serde; `ok` covers value-level constraints.
pub trait ApiRequest: Sized {
    fn ok(&self) -> bool;
    fn sanity(&self) -> Result<(), ApiError> {
        if self.ok() {
            Ok(())
        } else {
            Err(ApiError::InvalidFormData)
        }
    }
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ApiError {
    #[display("Invalid form data")]
    InvalidFormData,

    #[display("Not found")]
    NotFound,

    #[display("Invalid session")]
    InvalidSession,

    #[display("Not logged in")]
    NotLogin,

    #[display("Forbidden")]
    Forbidden,

    #[display("Server error at {location}, ref[{refnum}]: {msg}")]
    ServerError {
        location: &'static str,
        msg: &'static str,
        refnum: uuid::Uuid,
    },
}

impl ApiError {
    pub fn set_location(self, location: &'static str) -> Self {
        match self {
            ApiError::ServerError {
                location: _,
                msg,
                refnum,
            } => ApiError::ServerError {
                location,
                msg,
                refnum,
            },
            _ => self,
        }
    }

    pub fn log(&self) {
        if let ApiError::ServerError {
            location,
            msg,
            refnum,
        } = self
        {
            error!("Server error at {location}, ref[{refnum}]: {msg}");
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound => ApiError::NotFound,
            e => new_unlocated_server_error(e, "Transaction"),
        }
    }
}

impl error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::html())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidFormData => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::NotLogin | ApiError::InvalidSession => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::ServerError {
                location: _,
                msg: _,
                refnum: _,
            } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Identity boundary: the session carries the authenticated user id and
/// admin flag established by `/auth/session`. Core operations trust it.
pub fn require_user(session: &Session) -> Result<(UserId, bool), ApiError> {
    if let (Ok(Some(user_id)), Ok(Some(is_admin))) = (
        session.get::<UserId>(SESSION_USER_ID),
        session.get::<bool>(SESSION_IS_ADMIN),
    ) {
        Ok((user_id, is_admin))
    } else {
        Err(ApiError::NotLogin)
    }
}

pub fn require_admin(session: &Session) -> Result<UserId, ApiError> {
    let (user_id, is_admin) = require_user(session)?;
    if is_admin {
        Ok(user_id)
    } else {
        Err(ApiError::Forbidden)
    }
}

pub async fn fetch_user_from_id<C>(user_id: UserId, conn: &mut C) -> Result<Option<User>, ApiError>
where
    C: DerefMut<Target = AsyncPgConnection> + Send,
{
    use crate::schema::users::dsl::*;

    match users.filter(id.eq(user_id)).first::<User>(conn).await {
        Ok(user) => Ok(Some(user)),
        Err(Error::NotFound) => Ok(None),
        Err(e) => Err(new_unlocated_server_error(e, ERROR_DB_UNKNOWN)),
    }
}

pub async fn fetch_team_from_id<C>(team_id: TeamId, conn: &mut C) -> Result<Option<Team>, ApiError>
where
    C: DerefMut<Target = AsyncPgConnection> + Send,
{
    use crate::schema::team::dsl::*;

    match team.filter(id.eq(team_id)).first::<Team>(conn).await {
        Ok(t) => Ok(Some(t)),
        Err(Error::NotFound) => Ok(None),
        Err(e) => Err(new_unlocated_server_error(e, ERROR_DB_UNKNOWN)),
    }
}

pub async fn fetch_task_from_id<C>(
    task_id: TaskId,
    conn: &mut C,
) -> Result<Option<CtfTask>, ApiError>
where
    C: DerefMut<Target = AsyncPgConnection> + Send,
{
    use crate::schema::ctf_task::dsl::*;

    match ctf_task.filter(id.eq(task_id)).first::<CtfTask>(conn).await {
        Ok(t) => Ok(Some(t)),
        Err(Error::NotFound) => Ok(None),
        Err(e) => Err(new_unlocated_server_error(e, ERROR_DB_UNKNOWN)),
    }
}

pub async fn fetch_request_from_id<C>(
    request_id: RequestId,
    conn: &mut C,
) -> Result<Option<TeamRequest>, ApiError>
where
    C: DerefMut<Target = AsyncPgConnection> + Send,
{
    use crate::schema::team_request::dsl::*;

    match team_request
        .filter(id.eq(request_id))
        .first::<TeamRequest>(conn)
        .await
    {
        Ok(r) => Ok(Some(r)),
        Err(Error::NotFound) => Ok(None),
        Err(e) => Err(new_unlocated_server_error(e, ERROR_DB_UNKNOWN)),
    }
}

/// Authoritative "has this user solved this task" fact, backed by the
/// unique (user_id, task_id) constraint.
pub async fn solve_exists<C>(
    user_id_value: UserId,
    task_id_value: TaskId,
    conn: &mut C,
) -> Result<bool, ApiError>
where
    C: DerefMut<Target = AsyncPgConnection> + Send,
{
    use crate::schema::task_solve::dsl::*;

    diesel::select(diesel::dsl::exists(
        task_solve.filter(user_id.eq(user_id_value).and(task_id.eq(task_id_value))),
    ))
    .get_result::<bool>(conn)
    .await
    .map_err(|e| new_unlocated_server_error(e, ERROR_DB_UNKNOWN))
}

pub async fn member_exists<C>(
    team_id_value: TeamId,
    user_id_value: UserId,
    conn: &mut C,
) -> Result<bool, ApiError>
where
    C: DerefMut<Target = AsyncPgConnection> + Send,
{
    use crate::schema::team_member::dsl::*;

    diesel::select(diesel::dsl::exists(
        team_member.filter(team_id.eq(team_id_value).and(user_id.eq(user_id_value))),
    ))
    .get_result::<bool>(conn)
    .await
    .map_err(|e| new_unlocated_server_error(e, ERROR_DB_UNKNOWN))
}

pub fn log_server_error<E>(error: E, location: &'static str, msg: &'static str) -> ApiError
where
    E: derive_more::Display,
{
    use crate::Ext;
    new_unlocated_server_error(error, msg)
        .set_location(location)
        .tap(ApiError::log)
}

pub fn new_unlocated_server_error<E>(error: E, msg: &'static str) -> ApiError
where
    E: derive_more::Display,
{
    let refnum = uuid::Uuid::new_v4();
    error!("Error [{refnum}]: {error}");
    ApiError::ServerError {
        location: LOCATION_UNKNOWN,
        msg,
        refnum,
    }
}

pub fn kill_session(session: &mut Session) -> impl FnMut(&ApiError) + '_ {
    |result| {
        if result == &ApiError::InvalidSession {
            session.clear()
        };
    }
}

pub static SESSION_USER_ID: &str = "user_id";
pub static SESSION_IS_ADMIN: &str = "is_admin";

pub static ERROR_DB_CONNECTION: &str = "db_connection_failed";
pub static ERROR_SESSION_INSERT: &str = "session_setting_failed";
pub static ERROR_DB_UNKNOWN: &str = "database_unknown";
pub static ERROR_INVITE_CODE: &str = "invite_code_exhausted";

pub static LOCATION_UNKNOWN: &str = "[unknown]";

pub static REQUEST_PENDING: &str = "pending";
pub static REQUEST_REJECTED: &str = "rejected";

pub static ROLE_MEMBER: &str = "member";

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        valid: bool,
    }

    impl ApiRequest for Probe {
        fn ok(&self) -> bool {
            self.valid
        }
    }

    #[test]
    fn sanity_rejects_bad_payloads() {
        assert_eq!(Probe { valid: true }.sanity(), Ok(()));
        assert_eq!(
            Probe { valid: false }.sanity(),
            Err(ApiError::InvalidFormData)
        );
    }

    #[test]
    fn not_found_maps_from_diesel() {
        assert_eq!(ApiError::from(Error::NotFound), ApiError::NotFound);
    }

    #[test]
    fn set_location_only_touches_server_errors() {
        assert_eq!(
            ApiError::Forbidden.set_location("somewhere"),
            ApiError::Forbidden
        );

        let refnum = uuid::Uuid::new_v4();
        let err = ApiError::ServerError {
            location: LOCATION_UNKNOWN,
            msg: ERROR_DB_UNKNOWN,
            refnum,
        };
        assert_eq!(
            err.set_location("submit_flag"),
            ApiError::ServerError {
                location: "submit_flag",
                msg: ERROR_DB_UNKNOWN,
                refnum,
            }
        );
    }
}
