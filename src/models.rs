use chrono::{DateTime, Utc};
use diesel::prelude::*;

pub type UserId = i32;
pub type TeamId = i32;
pub type TaskId = i32;
pub type EventId = i32;
pub type RequestId = i32;

#[derive(Queryable, Selectable, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub external_id: Option<String>,
    pub is_admin: bool,
    pub xp: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Clone)]
#[diesel(table_name = crate::schema::team)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub invite_code: String,
    pub captain_id: UserId,
    pub max_members: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Clone)]
#[diesel(table_name = crate::schema::team_request)]
pub struct TeamRequest {
    pub id: RequestId,
    pub team_id: TeamId,
    pub user_id: UserId,
    pub status: String,
}

#[derive(Queryable, Selectable, Clone)]
#[diesel(table_name = crate::schema::ctf_task)]
pub struct CtfTask {
    pub id: TaskId,
    pub event_id: Option<EventId>,
    pub title: String,
    pub category: String,
    pub description: String,
    pub flag: String,
    pub points: i32,
    pub level: String,
    pub hint: String,
    pub solved_count: i32,
    pub submissions_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Clone)]
#[diesel(table_name = crate::schema::event)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub level: String,
    pub description: String,
    pub date: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
