//! Team formation workflow: invite-code creation, the join-request state
//! machine (none -> pending -> approved/rejected), and administrative
//! removal. Membership for a (team, user) pair is backed by a unique
//! constraint, so approval can never double-join.

use crate::schema::{team, team_member, team_request, users};
use crate::util::activity::{log_activity, ACTIVITY_TEAM_JOIN};
use crate::util::api_util::*;
use crate::util::invite::{generate_invite_code, INVITE_CODE_LEN, MAX_INVITE_CODE_ATTEMPTS};

use actix_web::{get, post, web, HttpResponse, Responder};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::models::{RequestId, Team, TeamId, TeamRequest, UserId};
use crate::{DbPool, Ext};

use actix_session::Session;

#[derive(Debug, Deserialize)]
struct CreateTeamRequest {
    name: String,
}

impl ApiRequest for CreateTeamRequest {
    fn ok(&self) -> bool {
        !self.name.trim().is_empty() && self.name.len() <= 150
    }
}

#[derive(Debug, Serialize)]
struct CreateTeamResponse {
    id: TeamId,
    name: String,
    invite_code: String,
}

// [[API]]
// desp: Create a team with a fresh invite code; the creator becomes
//       captain and auto-joins.
// Method: POST
// URL: /api/team/create
// Request Body: `CreateTeamRequest`
// Response Body: `CreateTeamResponse`
#[post("/api/team/create")]
pub async fn create_team(
    pool: web::Data<DbPool>,
    form: web::Json<CreateTeamRequest>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "create_team";
    form.sanity()?;
    let (user_id, _) = require_user(&session)?;

    let team_name = form.name.trim().to_owned();

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let result = conn
        .transaction::<CreateTeamResponse, ApiError, _>(|conn| {
            Box::pin(async move {
                let mut created: Option<Team> = None;

                for _ in 0..MAX_INVITE_CODE_ATTEMPTS {
                    let code = generate_invite_code();
                    let name = team_name.clone();

                    // Savepoint per attempt: a unique-violation on the
                    // invite code aborts only this inner scope, so the
                    // code can be regenerated and the insert retried.
                    let attempt = conn
                        .transaction::<Team, DieselError, _>(|conn| {
                            Box::pin(async move {
                                use crate::schema::team::dsl;
                                diesel::insert_into(dsl::team)
                                    .values((
                                        dsl::name.eq(name),
                                        dsl::invite_code.eq(code),
                                        dsl::captain_id.eq(user_id),
                                    ))
                                    .get_result::<Team>(conn)
                                    .await
                            })
                        })
                        .await;

                    match attempt {
                        Ok(t) => {
                            created = Some(t);
                            break;
                        }
                        Err(DieselError::DatabaseError(
                            DatabaseErrorKind::UniqueViolation,
                            _,
                        )) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }

                let new_team = created.ok_or_else(|| {
                    log_server_error("invite code space exhausted", location, ERROR_INVITE_CODE)
                })?;

                diesel::insert_into(team_member::table)
                    .values((
                        team_member::team_id.eq(new_team.id),
                        team_member::user_id.eq(user_id),
                        team_member::role.eq(ROLE_MEMBER),
                    ))
                    .execute(conn)
                    .await?;

                log_activity(
                    user_id,
                    &format!("Created team \"{}\"", new_team.name),
                    ACTIVITY_TEAM_JOIN,
                    conn,
                )
                .await?;

                Ok(CreateTeamResponse {
                    id: new_team.id,
                    name: new_team.name,
                    invite_code: new_team.invite_code,
                })
            })
        })
        .await
        .map_err(|e| e.set_location(location).tap(ApiError::log))?;

    Ok(HttpResponse::Ok().json(result))
}

#[derive(Debug, Deserialize)]
struct JoinTeamRequest {
    invite_code: String,
}

impl ApiRequest for JoinTeamRequest {
    fn ok(&self) -> bool {
        self.invite_code.len() == INVITE_CODE_LEN
    }
}

#[derive(Debug, Serialize)]
enum JoinTeamResponse {
    RequestCreated { team_id: TeamId },
    AlreadyMember { team_id: TeamId },
    AlreadyPending { team_id: TeamId },
    InvalidCode,
}

#[derive(Debug, PartialEq, Eq)]
enum JoinAction {
    AlreadyMember,
    AlreadyPending,
    ReplaceRejected,
    CreateRequest,
}

/// Decision table for `requestJoin`. Membership wins over any request
/// state; a rejected request is re-enterable, a pending one is not.
fn join_action(is_member: bool, existing_status: Option<&str>) -> JoinAction {
    if is_member {
        return JoinAction::AlreadyMember;
    }
    match existing_status {
        Some(status) if status == REQUEST_REJECTED => JoinAction::ReplaceRejected,
        Some(_) => JoinAction::AlreadyPending,
        None => JoinAction::CreateRequest,
    }
}

// [[API]]
// desp: Ask to join the team behind an invite code. Idempotent while a
//       pending request exists; re-enterable after rejection.
// Method: POST
// URL: /api/team/join
// Request Body: `JoinTeamRequest`
// Response Body: `JoinTeamResponse`
#[post("/api/team/join")]
pub async fn join_team(
    pool: web::Data<DbPool>,
    form: web::Json<JoinTeamRequest>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "join_team";
    form.sanity()?;
    let (user_id, _) = require_user(&session)?;

    let code = form.invite_code.clone();

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let result = conn
        .transaction::<JoinTeamResponse, ApiError, _>(|conn| {
            Box::pin(async move {
                let target = team::table
                    .filter(team::invite_code.eq(&code))
                    .first::<Team>(conn)
                    .await
                    .optional()?;

                let Some(target) = target else {
                    return Ok(JoinTeamResponse::InvalidCode);
                };

                let is_member = member_exists(target.id, user_id, conn).await?;

                let existing = team_request::table
                    .filter(
                        team_request::team_id
                            .eq(target.id)
                            .and(team_request::user_id.eq(user_id)),
                    )
                    .first::<TeamRequest>(conn)
                    .await
                    .optional()?;

                match join_action(is_member, existing.as_ref().map(|r| r.status.as_str())) {
                    JoinAction::AlreadyMember => Ok(JoinTeamResponse::AlreadyMember {
                        team_id: target.id,
                    }),
                    JoinAction::AlreadyPending => Ok(JoinTeamResponse::AlreadyPending {
                        team_id: target.id,
                    }),
                    JoinAction::ReplaceRejected => {
                        let old = existing.as_ref().map(|r| r.id).unwrap_or_default();
                        diesel::delete(team_request::table.filter(team_request::id.eq(old)))
                            .execute(conn)
                            .await?;
                        insert_pending_request(target.id, user_id, conn).await?;
                        Ok(JoinTeamResponse::RequestCreated {
                            team_id: target.id,
                        })
                    }
                    JoinAction::CreateRequest => {
                        insert_pending_request(target.id, user_id, conn).await?;
                        Ok(JoinTeamResponse::RequestCreated {
                            team_id: target.id,
                        })
                    }
                }
            })
        })
        .await
        .map_err(|e| e.set_location(location).tap(ApiError::log))?;

    Ok(HttpResponse::Ok().json(result))
}

async fn insert_pending_request<C>(
    team_id: TeamId,
    user_id: UserId,
    conn: &mut C,
) -> Result<(), DieselError>
where
    C: std::ops::DerefMut<Target = diesel_async::AsyncPgConnection> + Send,
{
    diesel::insert_into(team_request::table)
        .values((
            team_request::team_id.eq(team_id),
            team_request::user_id.eq(user_id),
            team_request::status.eq(REQUEST_PENDING),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
enum ReviewRequestResponse {
    Approved { team_id: TeamId, user_id: UserId },
    Rejected { team_id: TeamId, user_id: UserId },
}

// [[API]]
// desp: Captain approves a pending request: the requester becomes a
//       member and the request row is consumed.
// Method: POST
// URL: /api/team/request/{request_id}/approve
// Request Body: N/A
// Response Body: `ReviewRequestResponse`
#[post("/api/team/request/{request_id}/approve")]
pub async fn approve_request(
    pool: web::Data<DbPool>,
    path: web::Path<RequestId>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "approve_request";
    let (user_id, _) = require_user(&session)?;
    let request_id = path.into_inner();

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let result = conn
        .transaction::<ReviewRequestResponse, ApiError, _>(|conn| {
            Box::pin(async move {
                let request = fetch_request_from_id(request_id, conn)
                    .await?
                    .ok_or(ApiError::NotFound)?;
                let target = fetch_team_from_id(request.team_id, conn)
                    .await?
                    .ok_or(ApiError::NotFound)?;

                if target.captain_id != user_id {
                    return Err(ApiError::Forbidden);
                }

                // The unique (team_id, user_id) pair makes a stray second
                // approval of the same user a no-op instead of a dup row.
                diesel::insert_into(team_member::table)
                    .values((
                        team_member::team_id.eq(request.team_id),
                        team_member::user_id.eq(request.user_id),
                        team_member::role.eq(ROLE_MEMBER),
                    ))
                    .on_conflict((team_member::team_id, team_member::user_id))
                    .do_nothing()
                    .execute(conn)
                    .await?;

                diesel::delete(team_request::table.filter(team_request::id.eq(request.id)))
                    .execute(conn)
                    .await?;

                log_activity(
                    request.user_id,
                    &format!("Joined team \"{}\"", target.name),
                    ACTIVITY_TEAM_JOIN,
                    conn,
                )
                .await?;

                Ok(ReviewRequestResponse::Approved {
                    team_id: request.team_id,
                    user_id: request.user_id,
                })
            })
        })
        .await
        .map_err(|e| e.set_location(location).tap(ApiError::log))?;

    Ok(HttpResponse::Ok().json(result))
}

// [[API]]
// desp: Captain rejects a pending request; the row is removed with no
//       other side effects.
// Method: POST
// URL: /api/team/request/{request_id}/reject
// Request Body: N/A
// Response Body: `ReviewRequestResponse`
#[post("/api/team/request/{request_id}/reject")]
pub async fn reject_request(
    pool: web::Data<DbPool>,
    path: web::Path<RequestId>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "reject_request";
    let (user_id, _) = require_user(&session)?;
    let request_id = path.into_inner();

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let result = conn
        .transaction::<ReviewRequestResponse, ApiError, _>(|conn| {
            Box::pin(async move {
                let request = fetch_request_from_id(request_id, conn)
                    .await?
                    .ok_or(ApiError::NotFound)?;
                let target = fetch_team_from_id(request.team_id, conn)
                    .await?
                    .ok_or(ApiError::NotFound)?;

                if target.captain_id != user_id {
                    return Err(ApiError::Forbidden);
                }

                diesel::delete(team_request::table.filter(team_request::id.eq(request.id)))
                    .execute(conn)
                    .await?;

                Ok(ReviewRequestResponse::Rejected {
                    team_id: request.team_id,
                    user_id: request.user_id,
                })
            })
        })
        .await
        .map_err(|e| e.set_location(location).tap(ApiError::log))?;

    Ok(HttpResponse::Ok().json(result))
}

#[derive(Debug, Serialize)]
enum DeleteTeamResponse {
    Deleted { team_id: TeamId },
}

// [[API]]
// desp: Administrative removal of a team with its memberships and
//       requests, as one unit.
// Method: POST
// URL: /api/team/{team_id}/delete
// Request Body: N/A
// Response Body: `DeleteTeamResponse`
#[post("/api/team/{team_id}/delete")]
pub async fn delete_team(
    pool: web::Data<DbPool>,
    path: web::Path<TeamId>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "delete_team";
    require_admin(&session)?;
    let team_id = path.into_inner();

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let result = conn
        .transaction::<DeleteTeamResponse, ApiError, _>(|conn| {
            Box::pin(async move {
                diesel::delete(team_member::table.filter(team_member::team_id.eq(team_id)))
                    .execute(conn)
                    .await?;
                diesel::delete(team_request::table.filter(team_request::team_id.eq(team_id)))
                    .execute(conn)
                    .await?;

                let deleted = diesel::delete(team::table.filter(team::id.eq(team_id)))
                    .execute(conn)
                    .await?;

                if deleted == 0 {
                    return Err(ApiError::NotFound);
                }

                Ok(DeleteTeamResponse::Deleted { team_id })
            })
        })
        .await
        .map_err(|e| e.set_location(location).tap(ApiError::log))?;

    Ok(HttpResponse::Ok().json(result))
}

#[derive(Debug, Serialize)]
struct TeamSummary {
    id: TeamId,
    name: String,
    invite_code: String,
    is_captain: bool,
}

#[derive(Debug, Serialize)]
struct PendingRequestSummary {
    request_id: RequestId,
    team_id: TeamId,
    team_name: String,
    user_id: UserId,
    username: String,
}

#[derive(Debug, Serialize)]
struct TeamsResponse {
    my_teams: Vec<TeamSummary>,
    pending_requests: Vec<PendingRequestSummary>,
}

// [[API]]
// desp: The caller's teams plus pending requests on teams they captain.
// Method: GET
// URL: /api/teams
// Request Body: N/A
// Response Body: `TeamsResponse`
#[get("/api/teams")]
pub async fn my_teams(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "my_teams";
    let (user_id, _) = require_user(&session)?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let joined: Vec<Team> = team::table
        .inner_join(team_member::table)
        .filter(team_member::user_id.eq(user_id))
        .select(Team::as_select())
        .load(&mut conn)
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?;

    let pending: Vec<(RequestId, TeamId, String, UserId, String)> = team_request::table
        .inner_join(team::table)
        .inner_join(users::table)
        .filter(team::captain_id.eq(user_id))
        .filter(team_request::status.eq(REQUEST_PENDING))
        .select((
            team_request::id,
            team::id,
            team::name,
            users::id,
            users::username,
        ))
        .load(&mut conn)
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?;

    Ok(HttpResponse::Ok().json(TeamsResponse {
        my_teams: joined
            .into_iter()
            .map(|t| TeamSummary {
                is_captain: t.captain_id == user_id,
                id: t.id,
                name: t.name,
                invite_code: t.invite_code,
            })
            .collect(),
        pending_requests: pending
            .into_iter()
            .map(
                |(request_id, team_id, team_name, requester, username)| PendingRequestSummary {
                    request_id,
                    team_id,
                    team_name,
                    user_id: requester,
                    username,
                },
            )
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_short_circuits_everything() {
        assert_eq!(join_action(true, None), JoinAction::AlreadyMember);
        assert_eq!(
            join_action(true, Some(REQUEST_PENDING)),
            JoinAction::AlreadyMember
        );
        assert_eq!(
            join_action(true, Some(REQUEST_REJECTED)),
            JoinAction::AlreadyMember
        );
    }

    #[test]
    fn pending_request_is_idempotent() {
        assert_eq!(
            join_action(false, Some(REQUEST_PENDING)),
            JoinAction::AlreadyPending
        );
    }

    #[test]
    fn rejection_is_re_enterable() {
        assert_eq!(
            join_action(false, Some(REQUEST_REJECTED)),
            JoinAction::ReplaceRejected
        );
    }

    #[test]
    fn fresh_pair_creates_request() {
        assert_eq!(join_action(false, None), JoinAction::CreateRequest);
    }

    #[test]
    fn join_request_code_length() {
        assert!(JoinTeamRequest {
            invite_code: "CTF-A1B2".into()
        }
        .ok());
        assert!(!JoinTeamRequest {
            invite_code: "CTF-A1B".into()
        }
        .ok());
        assert!(!JoinTeamRequest {
            invite_code: String::new()
        }
        .ok());
    }

    #[test]
    fn team_name_limits() {
        assert!(CreateTeamRequest {
            name: "Alpha".into()
        }
        .ok());
        assert!(!CreateTeamRequest {
            name: "   ".into()
        }
        .ok());
        assert!(!CreateTeamRequest {
            name: "x".repeat(151)
        }
        .ok());
    }
}
