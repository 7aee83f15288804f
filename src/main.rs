use std::{fs::OpenOptions, sync::Arc};

use actix_web::{web, App, HttpServer};
use sea_orm::Database;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::{auth::Authority, calendar::{CalendarSync, GoogleCalendar}, payroll::PayrollGenerator};

mod config;
mod consts;
mod utils;

mod entity;
mod error;
mod auth;

mod ledger;
mod payroll;
mod scheduling;
mod activity;
mod calendar;

mod pages;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();

    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("trace.log")?;

    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_line_number(true)
                .with_filter(EnvFilter::from_default_env())
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_filter(filter::LevelFilter::from_level(Level::TRACE))
        );

    tracing::subscriber::set_global_default(subscriber).expect("Unable to set global tracing subscriber");

    let config::Config {
        host_address,
        database_opt,
        jwt_key,
        calendar,
    } = config::load();

    let database = web::Data::new(Database::connect(database_opt).await.expect("Unable to connect to database"));
    let authority = web::Data::new(Authority::new(jwt_key.as_bytes()));
    let generator = web::Data::new(PayrollGenerator::new());
    let calendar = calendar.map(|config| {
        let calendar: Arc<dyn CalendarSync> = Arc::new(GoogleCalendar::new(config));
        web::Data::from(calendar)
    });

    info!(calendar_sync = calendar.is_some(), "starting server on {host_address}");

    let server = HttpServer::new(move || {
        let mut app = App::new()
            .app_data(database.clone())
            .app_data(authority.clone())
            .app_data(generator.clone());

        if let Some(calendar) = &calendar {
            app = app.app_data(calendar.clone());
        }

        app
            .wrap(TracingLogger::default())
            .configure(pages::config)
    });

    server
        .bind(host_address)?
        .run().await
}
