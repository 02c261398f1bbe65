pub mod activity;
pub mod api_util;
pub mod auth_util;
pub mod invite;
pub mod progression;
