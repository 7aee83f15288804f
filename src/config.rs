use std::{env, net::{SocketAddr, ToSocketAddrs as _}};

use sea_orm::ConnectOptions;
use tracing::info;

pub struct Config {
    pub host_address: SocketAddr,

    pub database_opt: ConnectOptions,

    pub jwt_key: String,

    pub calendar: Option<CalendarConfig>,
}

pub struct CalendarConfig {
    pub access_token: String,
    pub calendar_id: String,
    pub time_zone: String,
}

pub fn load() -> Config {
    Config {
        host_address: load_host_address(),
        database_opt: load_database_opt().into(),
        jwt_key: load_jwt_key(),
        calendar: load_calendar(),
    }
}

fn load_host_address() -> SocketAddr {
    info!("Loading environment `HOST_ADDRESS`");

    let var = env::var("HOST_ADDRESS").unwrap_or_else(|_| "127.0.0.1:0".to_string());

    var.to_socket_addrs()
        .expect("`HOST_ADDRESS` is not in a valid format").nth(0)
        .expect("unable to resolve host from `HOST_ADDRESS`")
}

fn load_database_opt() -> impl Into<ConnectOptions> {
    info!("Loading environment `DATABASE_URL`");

    env::var("DATABASE_URL").expect("Environment `DATABASE_URL` is required to be set")
}

fn load_jwt_key() -> String {
    info!("Loading environment `JWT_SECRET`");

    env::var("JWT_SECRET").expect("Environment `JWT_SECRET` is required to be set")
}

/// Calendar sync stays off unless an access token was granted out of band
fn load_calendar() -> Option<CalendarConfig> {
    info!("Loading environment `GOOGLE_CALENDAR_TOKEN`");

    let Ok(access_token) = env::var("GOOGLE_CALENDAR_TOKEN") else {
        info!("`GOOGLE_CALENDAR_TOKEN` is not set, calendar sync is disabled");
        return None;
    };

    Some(CalendarConfig {
        access_token,
        calendar_id: env::var("GOOGLE_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string()),
        time_zone: env::var("CALENDAR_TIME_ZONE").unwrap_or_else(|_| "UTC".to_string()),
    })
}
