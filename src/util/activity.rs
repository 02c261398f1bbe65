//! Append-only user timeline. Rows are written as side effects of solves,
//! first task views, and team membership changes, and read back by the
//! dashboard feed.

use std::ops::DerefMut;

use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::UserId;
use crate::util::api_util::{new_unlocated_server_error, ApiError, ERROR_DB_UNKNOWN};

pub static ACTIVITY_SOLVE: &str = "solve";
pub static ACTIVITY_START: &str = "start";
pub static ACTIVITY_TEAM_JOIN: &str = "team_join";

pub async fn log_activity<C>(
    user: UserId,
    action_text: &str,
    kind_tag: &'static str,
    conn: &mut C,
) -> Result<(), ApiError>
where
    C: DerefMut<Target = AsyncPgConnection> + Send,
{
    use crate::schema::activity::dsl::*;

    diesel::insert_into(activity)
        .values((
            user_id.eq(user),
            action.eq(action_text),
            kind.eq(kind_tag),
        ))
        .execute(conn)
        .await
        .map_err(|e| new_unlocated_server_error(e, ERROR_DB_UNKNOWN))?;

    Ok(())
}

/// Dedup check for the best-effort "start" entry: application-level only,
/// a lost race merely duplicates a timeline row.
pub async fn activity_exists<C>(
    user: UserId,
    action_text: &str,
    kind_tag: &'static str,
    conn: &mut C,
) -> Result<bool, ApiError>
where
    C: DerefMut<Target = AsyncPgConnection> + Send,
{
    use crate::schema::activity::dsl::*;

    diesel::select(diesel::dsl::exists(activity.filter(
        user_id.eq(user).and(action.eq(action_text)).and(kind.eq(kind_tag)),
    )))
    .get_result::<bool>(conn)
    .await
    .map_err(|e| new_unlocated_server_error(e, ERROR_DB_UNKNOWN))
}

pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - then).max(TimeDelta::zero());
    let days = delta.num_days();
    let hours = delta.num_hours();
    let mins = delta.num_minutes();

    if days > 0 {
        format!("{} day{} ago", days, if days > 1 { "s" } else { "" })
    } else if hours > 0 {
        format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" })
    } else if mins > 0 {
        format!("{} min{} ago", mins, if mins > 1 { "s" } else { "" })
    } else {
        "just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn buckets() {
        let now = at(1_000_000);
        assert_eq!(time_ago(at(1_000_000), now), "just now");
        assert_eq!(time_ago(at(1_000_000 - 59), now), "just now");
        assert_eq!(time_ago(at(1_000_000 - 60), now), "1 min ago");
        assert_eq!(time_ago(at(1_000_000 - 600), now), "10 mins ago");
        assert_eq!(time_ago(at(1_000_000 - 3600), now), "1 hour ago");
        assert_eq!(time_ago(at(1_000_000 - 7200), now), "2 hours ago");
        assert_eq!(time_ago(at(1_000_000 - 86400), now), "1 day ago");
        assert_eq!(time_ago(at(1_000_000 - 3 * 86400), now), "3 days ago");
    }

    #[test]
    fn future_timestamps_clamp_to_now() {
        let now = at(100);
        assert_eq!(time_ago(at(200), now), "just now");
    }
}
