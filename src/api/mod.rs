pub mod auth;
pub mod dashboard;
pub mod event;
pub mod scoreboard;
pub mod task;
pub mod team;
