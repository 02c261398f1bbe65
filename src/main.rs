extern crate diesel;
extern crate dotenv;

use actix_cors::Cors;
use actix_web::dev::RequestHead;
use actix_web::http::header::HeaderValue;
use actix_web::{web, App, HttpServer};

use diesel_async::pooled_connection::{bb8::Pool, AsyncDieselConnectionManager};
use diesel_async::AsyncPgConnection;

use ctf_server::api::{auth, dashboard, event, scoreboard, task, team};
use ctf_server::config::AppConfig;
use ctf_server::util::auth_util;
use ctf_server::DbPool;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};

fn cors_check(origins: &[String]) -> impl Fn(&HeaderValue, &RequestHead) -> bool {
    let origins = origins.to_vec();
    move |head, _| {
        head.to_str()
            .map(|origin| origins.iter().any(|allowed| allowed == origin))
            .unwrap_or(false)
    }
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let cookie_token = std::env::var("COOKIE_TOKEN").expect("COOKIE_TOKEN must be set");

    let config = AppConfig::from_env();

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool: DbPool = Pool::builder()
        .build(manager)
        .await
        .expect("Failed to link to db");

    let secret_key = auth_util::gen_cookie_key(&cookie_token);
    let bind_addr = config.bind_addr.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .wrap(
                Cors::default()
                    .allowed_origin_fn(cors_check(&config.cors_origins))
                    .allow_any_header()
                    .allow_any_method()
                    .supports_credentials(),
            )
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_secure(config.cookie_secure)
                    .cookie_same_site(actix_web::cookie::SameSite::None)
                    .build(),
            )
            .service(auth::create_session)
            .service(auth::logout)
            .service(auth::get_user)
            .service(task::list_challenges)
            .service(task::task_view)
            .service(task::submit_flag)
            .service(scoreboard::scoreboard)
            .service(dashboard::dashboard_stats)
            .service(dashboard::dashboard_activity)
            .service(team::create_team)
            .service(team::join_team)
            .service(team::approve_request)
            .service(team::reject_request)
            .service(team::delete_team)
            .service(team::my_teams)
            .service(event::list_events)
            .service(event::register_event)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
