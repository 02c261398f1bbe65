use crate::util::activity::time_ago;
use crate::util::api_util::*;
use crate::util::progression::{progress_percent, rank_info};

use actix_web::{get, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::models::UserId;
use crate::{DbPool, Ext};

use actix_session::Session;

const ACTIVITY_FEED_LIMIT: i64 = 15;

#[derive(Debug, Serialize)]
struct DashboardStatsResponse {
    username: String,
    player_id: UserId,
    solved_count: i64,
    teams_count: i64,
    rank: &'static str,
    xp: i32,
    next_xp_threshold: i32,
    progress_percent: f64,
}

// [[API]]
// desp: Per-user dashboard counters and rank-tier progression.
// Method: GET
// URL: /api/dashboard/stats
// Request Body: N/A
// Response Body: `DashboardStatsResponse`
#[get("/api/dashboard/stats")]
pub async fn dashboard_stats(
    pool: web::Data<DbPool>,
    mut session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "dashboard_stats";
    let (user_id, _) = require_user(&session)?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let user = fetch_user_from_id(user_id, &mut conn)
        .await?
        .ok_or(ApiError::InvalidSession)
        .inspect_err(kill_session(&mut session))
        .map_err(|e| e.set_location(location).tap(ApiError::log))?;

    let solved_count: i64 = {
        use crate::schema::task_solve::dsl;
        dsl::task_solve
            .filter(dsl::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?
    };

    let teams_count: i64 = {
        use crate::schema::team_member::dsl;
        dsl::team_member
            .filter(dsl::user_id.eq(user_id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?
    };

    let info = rank_info(user.xp);

    Ok(HttpResponse::Ok().json(DashboardStatsResponse {
        username: user.username,
        player_id: user.id,
        solved_count,
        teams_count,
        rank: info.rank,
        xp: user.xp,
        next_xp_threshold: info.next_xp_threshold,
        progress_percent: progress_percent(user.xp, info.next_xp_threshold),
    }))
}

#[derive(Debug, Serialize)]
struct ActivityEntry {
    action: String,
    kind: String,
    time_ago: String,
}

#[derive(Debug, Serialize)]
struct ActivityFeedResponse {
    activities: Vec<ActivityEntry>,
}

// [[API]]
// desp: The caller's most recent timeline entries.
// Method: GET
// URL: /api/dashboard/activity
// Request Body: N/A
// Response Body: `ActivityFeedResponse`
#[get("/api/dashboard/activity")]
pub async fn dashboard_activity(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "dashboard_activity";
    let (user_id, _) = require_user(&session)?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let rows: Vec<(String, String, DateTime<Utc>)> = {
        use crate::schema::activity::dsl;
        dsl::activity
            .filter(dsl::user_id.eq(user_id))
            .order(dsl::created_at.desc())
            .limit(ACTIVITY_FEED_LIMIT)
            .select((dsl::action, dsl::kind, dsl::created_at))
            .load(&mut conn)
            .await
            .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?
    };

    let now = Utc::now();
    let activities = rows
        .into_iter()
        .map(|(action, kind, created_at)| ActivityEntry {
            action,
            kind,
            time_ago: time_ago(created_at, now),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ActivityFeedResponse { activities }))
}
