//! Deterministic leaderboard: XP descending, user id ascending as the
//! total tie-break. Recomputed from a fresh read on every call.

use crate::util::api_util::*;

use actix_web::{get, web, HttpResponse, Responder};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::models::UserId;
use crate::DbPool;

use actix_session::Session;

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ScoreboardQuery {
    #[serde(default = "default_page")]
    page: i64,
    #[serde(default = "default_per_page")]
    per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

impl ApiRequest for ScoreboardQuery {
    fn ok(&self) -> bool {
        self.page >= 1 && (1..=MAX_PER_PAGE).contains(&self.per_page)
    }
}

#[derive(QueryableByName)]
struct ScoreboardRow {
    #[diesel(sql_type = Integer)]
    user_id: i32,
    #[diesel(sql_type = Text)]
    username: String,
    #[diesel(sql_type = Integer)]
    xp: i32,
    #[diesel(sql_type = BigInt)]
    challenges_solved: i64,
}

#[derive(Debug, Serialize)]
struct ScoreboardEntry {
    rank: i64,
    user_id: UserId,
    username: String,
    xp: i32,
    challenges_solved: i64,
    is_current_user: bool,
}

#[derive(Debug, Serialize)]
struct ScoreboardResponse {
    users: Vec<ScoreboardEntry>,
    page: i64,
    per_page: i64,
    total_users: i64,
    total_pages: i64,
}

pub fn total_pages(total_users: i64, per_page: i64) -> i64 {
    (total_users + per_page - 1) / per_page
}

// [[API]]
// desp: Paginated global ranking, zero-solve users included. Rank numbers
//       are absolute positions in the full ordering.
// Method: GET
// URL: /api/scoreboard
// Request Body: `ScoreboardQuery` (query string)
// Response Body: `ScoreboardResponse`
#[get("/api/scoreboard")]
pub async fn scoreboard(
    pool: web::Data<DbPool>,
    query: web::Query<ScoreboardQuery>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "scoreboard";
    query.sanity()?;
    let (current_user_id, _) = require_user(&session)?;

    let page = query.page;
    let per_page = query.per_page;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let total_users: i64 = crate::schema::users::dsl::users
        .count()
        .get_result(&mut conn)
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?;

    let rows: Vec<ScoreboardRow> = diesel::sql_query(
        r#"
        SELECT
            u.id AS user_id,
            u.username AS username,
            u.xp AS xp,
            COUNT(ts.id) AS challenges_solved
        FROM users AS u
        LEFT JOIN task_solve AS ts
            ON ts.user_id = u.id
        GROUP BY u.id
        ORDER BY u.xp DESC, u.id ASC
        LIMIT $1 OFFSET $2
    "#,
    )
    .bind::<BigInt, _>(per_page)
    .bind::<BigInt, _>((page - 1) * per_page)
    .load(&mut conn)
    .await
    .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?;

    let base_rank = (page - 1) * per_page + 1;
    let users = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| ScoreboardEntry {
            rank: base_rank + idx as i64,
            is_current_user: row.user_id == current_user_id,
            user_id: row.user_id,
            username: row.username,
            xp: row.xp,
            challenges_solved: row.challenges_solved,
        })
        .collect();

    Ok(HttpResponse::Ok().json(ScoreboardResponse {
        users,
        page,
        per_page,
        total_users,
        total_pages: total_pages(total_users, per_page),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_is_ceiling_division() {
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(1, 50), 1);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(51, 50), 2);
        assert_eq!(total_pages(120, 50), 3);
    }

    #[test]
    fn absolute_rank_is_page_independent() {
        // Rank of the first row of page 2 at 50 per page is 51.
        let page = 2i64;
        let per_page = 50i64;
        assert_eq!((page - 1) * per_page + 1, 51);
        // The same position expressed with 25 per page: page 3, first row.
        assert_eq!((3 - 1) * 25 + 1, 51);
    }

    #[test]
    fn query_limits() {
        let ok = ScoreboardQuery {
            page: 1,
            per_page: 50,
        };
        assert!(ok.ok());
        assert!(!ScoreboardQuery {
            page: 0,
            per_page: 50
        }
        .ok());
        assert!(!ScoreboardQuery {
            page: 1,
            per_page: 0
        }
        .ok());
        assert!(!ScoreboardQuery {
            page: 1,
            per_page: MAX_PER_PAGE + 1
        }
        .ok());
    }
}
