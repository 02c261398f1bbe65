//! Competition events: a browsable listing and idempotent registration.
//! The unique (user_id, event_id) pair absorbs double-clicks and replays.

use std::collections::HashSet;

use crate::schema::{event, event_registration};
use crate::util::api_util::*;

use actix_web::{get, post, web, HttpResponse, Responder};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Serialize;

use crate::models::{Event, EventId};
use crate::{DbPool, Ext};

use actix_session::Session;

#[derive(Debug, Serialize)]
struct EventSummary {
    id: EventId,
    name: String,
    level: String,
    description: String,
    date: String,
    status: String,
    registered: bool,
}

// [[API]]
// desp: All events, flagged with the caller's registration status.
// Method: GET
// URL: /api/events
// Request Body: N/A
// Response Body: `Vec<EventSummary>`
#[get("/api/events")]
pub async fn list_events(
    pool: web::Data<DbPool>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "list_events";
    let (user_id, _) = require_user(&session)?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let events = event::table
        .order(event::id.asc())
        .load::<Event>(&mut conn)
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?;

    let registered: HashSet<EventId> = event_registration::table
        .filter(event_registration::user_id.eq(user_id))
        .select(event_registration::event_id)
        .load::<EventId>(&mut conn)
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_UNKNOWN))?
        .into_iter()
        .collect();

    let summaries: Vec<EventSummary> = events
        .into_iter()
        .map(|ev| EventSummary {
            registered: registered.contains(&ev.id),
            id: ev.id,
            name: ev.name,
            level: ev.level,
            description: ev.description,
            date: ev.date,
            status: ev.status,
        })
        .collect();

    Ok(HttpResponse::Ok().json(summaries))
}

#[derive(Debug, Serialize)]
enum RegisterEventResponse {
    Registered { event_id: EventId },
    AlreadyRegistered { event_id: EventId },
}

// [[API]]
// desp: Register the caller for an event. Repeat calls report
//       AlreadyRegistered instead of erroring.
// Method: POST
// URL: /api/event/{event_id}/register
// Request Body: N/A
// Response Body: `RegisterEventResponse`
#[post("/api/event/{event_id}/register")]
pub async fn register_event(
    pool: web::Data<DbPool>,
    path: web::Path<EventId>,
    session: Session,
) -> Result<impl Responder, ApiError> {
    let location = "register_event";
    let (user_id, _) = require_user(&session)?;
    let event_id = path.into_inner();

    let mut conn = pool
        .get()
        .await
        .map_err(|e| log_server_error(e, location, ERROR_DB_CONNECTION))?;

    let result = conn
        .transaction::<RegisterEventResponse, ApiError, _>(|conn| {
            Box::pin(async move {
                event::table
                    .filter(event::id.eq(event_id))
                    .first::<Event>(conn)
                    .await
                    .optional()?
                    .ok_or(ApiError::NotFound)?;

                let inserted = diesel::insert_into(event_registration::table)
                    .values((
                        event_registration::user_id.eq(user_id),
                        event_registration::event_id.eq(event_id),
                    ))
                    .on_conflict((
                        event_registration::user_id,
                        event_registration::event_id,
                    ))
                    .do_nothing()
                    .execute(conn)
                    .await?;

                if inserted == 0 {
                    Ok(RegisterEventResponse::AlreadyRegistered { event_id })
                } else {
                    Ok(RegisterEventResponse::Registered { event_id })
                }
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
    fn registration_response_shape() {
        let json = serde_json::to_value(RegisterEventResponse::AlreadyRegistered { event_id: 7 })
            .unwrap();
        assert_eq!(json["AlreadyRegistered"]["event_id"], 7);
    }
}
