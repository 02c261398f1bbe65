//! Challenge browsing and the scoring ledger: every flag attempt is
//! appended to the submission log, and first-solve credit (solve row,
//! solved-count, XP, timeline entry) is arbitrated by the unique
//! (user_id, task_id) constraint on task_solve.

use std::collections::HashSet;

use crate::util::activity::{activity_exists, log_activity, ACTIVITY_SOLVE, ACTIVITY_START};
use crate::util::api_util::*;

use actix_web::{get, post, web, HttpResponse, Responder};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::{CtfTask, TaskId};
use crate::{DbPool, Ext};

use actix_session::Session;

pub static MSG_SOLVED: &str = "Correct flag, task solved";
pub static MSG_ALREADY_SOLVED: &str = "You already solved this task";
pub static MSG_WRONG_FLAG: &str = "Wrong flag, try again";

/// Exact string equality, no normalization of the stored flag. The
/// candidate is trimmed once by the handler before this check.
pub fn flag_matches(stored: &str, candidate: &str) -> bool {
    stored == candidate
}

#[derive(Debug, Serialize)]
struct ChallengeSummary {
    id: TaskId,
    title: String,
    category: String,
    points: i32,
    level: String,
    solved_count: i32,
    submissions_count: i32,
    is_completed: bool,
}

// [[API]]
// desp: All tasks, with the caller's solve status.
// Method: GET
// URL: /api/challenges
// Request Body: N/A
// Response Body: `Vec<ChallengeSummary>`
#[get("/api/challenges")]
pub async fn list_challenges(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "list_challenges";
    let (user_id, _) = require_user(&session)?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let tasks = crate::schema::ctf_task::dsl::ctf_task
        .load::<CtfTask>(&mut conn)
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?;

    let solved: HashSet<TaskId> = {
        use crate::schema::task_solve::dsl;
        dsl::task_solve
            .filter(dsl::user_id.eq(user_id))
            .select(dsl::task_id)
            .load::<TaskId>(&mut conn)
            .await
            .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?
            .into_iter()
            .collect()
    };

    let summaries: Vec<ChallengeSummary> = tasks
        .into_iter()
        .map(|task| ChallengeSummary {
            is_completed: solved.contains(&task.id),
            id: task.id,
            title: task.title,
            category: task.category,
            points: task.points,
            level: task.level,
            solved_count: task.solved_count,
            submissions_count: task.submissions_count,
        })
        .collect();

    Ok(HttpResponse::Ok().json(summaries))
}

#[derive(Debug, Serialize)]
struct TaskViewResponse {
    id: TaskId,
    title: String,
    description: String,
    category: String,
    points: i32,
    level: String,
    hint: String,
    solved_count: i32,
    submissions_count: i32,
    already_solved: bool,
    like_count: i64,
    dislike_count: i64,
}

// [[API]]
// desp: Task detail view. First view before any solve appends a
//       best-effort "start" timeline entry.
// Method: GET
// URL: /api/task/{task_id}
// Request Body: N/A
// Response Body: `TaskViewResponse`
#[get("/api/task/{task_id}")]
pub async fn task_view(
    pool: web::Data<DbPool>,
    path: web::Path<TaskId>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "task_view";
    let (user_id, _) = require_user(&session)?;
    let task_id = path.into_inner();

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let task = fetch_task_from_id(task_id, &mut conn)
        .await?
        .ok_or(ApiError::NotFound)?;

    let already_solved = solve_exists(user_id, task_id, &mut conn).await?;

    let (like_count, dislike_count) = {
        use crate::schema::task_like::dsl;
        let counts: Vec<(bool, i64)> = dsl::task_like
            .filter(dsl::task_id.eq(task_id))
            .group_by(dsl::is_like)
            .select((dsl::is_like, diesel::dsl::count_star()))
            .load(&mut conn)
            .await
            .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?;
        let likes = counts.iter().find(|(l, _)| *l).map_or(0, |(_, n)| *n);
        let dislikes = counts.iter().find(|(l, _)| !*l).map_or(0, |(_, n)| *n);
        (likes, dislikes)
    };

    // Lower-stakes side effect: must never fail the view, and a race only
    // risks a duplicate timeline row.
    if !already_solved {
        let action = format!("Started challenge \"{}\"", task.title);
        let logged = async {
            if !activity_exists(user_id, &action, ACTIVITY_START, &mut conn).await? {
                log_activity(user_id, &action, ACTIVITY_START, &mut conn).await?;
            }
            Ok::<(), ApiError>(())
        }
        .await;
        if let Err(e) = logged {
            warn!("start activity for user {user_id} task {task_id} dropped: {e}");
        }
    }

    Ok(HttpResponse::Ok().json(TaskViewResponse {
        id: task.id,
        title: task.title,
        description: task.description,
        category: task.category,
        points: task.points,
        level: task.level,
        hint: task.hint,
        solved_count: task.solved_count,
        submissions_count: task.submissions_count,
        already_solved,
        like_count,
        dislike_count,
    }))
}

#[derive(Debug, Deserialize)]
struct SubmitFlagRequest {
    task_id: TaskId,
    flag: String,
}

impl ApiRequest for SubmitFlagRequest {
    fn ok(&self) -> bool {
        self.task_id >= 0 && self.flag.len() <= 255
    }
}

#[derive(Debug, Serialize)]
struct SubmitFlagResponse {
    success: bool,
    message: &'static str,
    already_solved: bool,
}

// [[API]]
// desp: Submit a flag. Appends to the submission log unconditionally;
//       credits XP and the solve exactly once per (user, task).
// Method: POST
// URL: /api/task/submit
// Request Body: `SubmitFlagRequest`
// Response Body: `SubmitFlagResponse`
#[post("/api/task/submit")]
pub async fn submit_flag(
    pool: web::Data<DbPool>,
    form: web::Json<SubmitFlagRequest>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "submit_flag";
    form.sanity()?;
    let (user_id, _) = require_user(&session)?;

    let task_id = form.task_id;
    let candidate = form.flag.trim().to_owned();

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let result = conn
        .transaction::<SubmitFlagResponse, ApiError, _>(|conn| {
            Box::pin(async move {
                let task = fetch_task_from_id(task_id, conn)
                    .await?
                    .ok_or(ApiError::NotFound)?;

                // Computed before any mutation.
                let already_solved = solve_exists(user_id, task_id, conn).await?;
                let correct = flag_matches(&task.flag, &candidate);

                {
                    use crate::schema::ctf_task::dsl;
                    diesel::update(dsl::ctf_task.filter(dsl::id.eq(task_id)))
                        .set(dsl::submissions_count.eq(dsl::submissions_count + 1))
                        .execute(conn)
                        .await?;
                }

                {
                    use crate::schema::task_submission::dsl;
                    diesel::insert_into(dsl::task_submission)
                        .values((
                            dsl::user_id.eq(user_id),
                            dsl::task_id.eq(task_id),
                            dsl::submitted_flag.eq(&candidate),
                            dsl::is_correct.eq(correct),
                        ))
                        .execute(conn)
                        .await?;
                }

                if !correct {
                    return Ok(SubmitFlagResponse {
                        success: false,
                        message: MSG_WRONG_FLAG,
                        already_solved,
                    });
                }

                if already_solved {
                    return Ok(SubmitFlagResponse {
                        success: true,
                        message: MSG_ALREADY_SOLVED,
                        already_solved: true,
                    });
                }

                // The unique constraint decides the race: of two concurrent
                // first-correct submissions exactly one inserts a row here,
                // the other observes 0 and falls back to "already solved".
                let solve_inserted = {
                    use crate::schema::task_solve::dsl;
                    diesel::insert_into(dsl::task_solve)
                        .values((dsl::user_id.eq(user_id), dsl::task_id.eq(task_id)))
                        .on_conflict((dsl::user_id, dsl::task_id))
                        .do_nothing()
                        .execute(conn)
                        .await?
                };

                if solve_inserted == 0 {
                    return Ok(SubmitFlagResponse {
                        success: true,
                        message: MSG_ALREADY_SOLVED,
                        already_solved: true,
                    });
                }

                {
                    use crate::schema::ctf_task::dsl;
                    diesel::update(dsl::ctf_task.filter(dsl::id.eq(task_id)))
                        .set(dsl::solved_count.eq(dsl::solved_count + 1))
                        .execute(conn)
                        .await?;
                }

                {
                    use crate::schema::users::dsl;
                    diesel::update(dsl::users.filter(dsl::id.eq(user_id)))
                        .set(dsl::xp.eq(dsl::xp + task.points))
                        .execute(conn)
                        .await?;
                }

                log_activity(
                    user_id,
                    &format!("Solved challenge \"{}\"", task.title),
                    ACTIVITY_SOLVE,
                    conn,
                )
                .await?;

                Ok(SubmitFlagResponse {
                    success: true,
                    message: MSG_SOLVED,
                    already_solved: false,
                })
            })
        })
        .await
        .map_err(|e| e.set_location(location).tap(ApiError::log))?;

    Ok(HttpResponse::Ok().json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_comparison_is_exact() {
        assert!(flag_matches("flag{abc}", "flag{abc}"));
        assert!(!flag_matches("flag{abc}", "FLAG{ABC}"));
        assert!(!flag_matches("flag{abc}", "flag{abc} "));
        // The stored side is never trimmed.
        assert!(!flag_matches(" flag{abc}", "flag{abc}"));
    }

    #[test]
    fn submit_request_limits() {
        let ok = SubmitFlagRequest {
            task_id: 1,
            flag: "flag{x}".into(),
        };
        assert!(ok.ok());

        let negative = SubmitFlagRequest {
            task_id: -1,
            flag: "flag{x}".into(),
        };
        assert!(!negative.ok());

        let oversized = SubmitFlagRequest {
            task_id: 1,
            flag: "x".repeat(256),
        };
        assert!(!oversized.ok());
    }

    #[test]
    fn response_shape() {
        let json = serde_json::to_value(SubmitFlagResponse {
            success: true,
            message: MSG_SOLVED,
            already_solved: false,
        })
        .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["already_solved"], false);
        assert_eq!(json["message"], MSG_SOLVED);
    }
}
