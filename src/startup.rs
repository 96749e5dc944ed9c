use actix_web::dev::Server;
use actix_web::error::JsonPayloadError;
use actix_web::web;
use actix_web::App;
use actix_web::HttpRequest;
use actix_web::HttpServer;
use actix_web_lab::middleware::from_fn;
use anyhow::Context;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::authentication::reject_anonymous_users;
use crate::configuration::DatabaseSettings;
use crate::configuration::Settings;
use crate::domain::FieldErrors;
use crate::routes::patients::{create_patient, list_patients};
use crate::routes::prescriptions::{
    create_prescription, list_prescriptions, prescription_detail,
};
use crate::routes::{health_check, login, register_user, ApiError};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = get_connection_pool(&configuration.database);

        migrate(&configuration, &connection_pool)
            .await
            .context("Failed to migrate database")?;

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();
        tracing::info!("app started at: {}:{}", configuration.application.host, port);
        let server = run(listener, connection_pool)?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    // A more expressive name that makes it clear that
    // this function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(configuration.with_db())
}

async fn migrate(
    configuration: &Settings,
    connection_pool: &PgPool,
) -> Result<(), MigrateError> {
    if configuration.database.migrate {
        tracing::info!("migrating postgres");
        sqlx::migrate!("./migrations").run(connection_pool).await
    } else {
        Ok(())
    }
}

/// Malformed JSON bodies are reported like any other validation failure.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::ValidationError(FieldErrors::single(
        "non_field_errors",
        err.to_string(),
    ))
    .into()
}

pub fn run(
    listener: TcpListener,
    connection_pool: PgPool,
) -> Result<Server, std::io::Error> {
    let connection_pool = web::Data::new(connection_pool);
    let server = HttpServer::new(move || {
        App::new()
            // Middlewares are added using the `wrap` method on `App`
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/user-registration/", web::post().to(register_user))
            .route("/login/", web::post().to(login))
            .service(
                web::scope("/patients")
                    .wrap(from_fn(reject_anonymous_users))
                    .route("/create/", web::post().to(create_patient))
                    .route("/list/", web::get().to(list_patients)),
            )
            .service(
                web::scope("/patient/prescriptions")
                    .wrap(from_fn(reject_anonymous_users))
                    .route("/create/", web::post().to(create_prescription))
                    .route("/list/", web::get().to(list_prescriptions))
                    .route(
                        "/{prescription_id}/",
                        web::get().to(prescription_detail),
                    ),
            )
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(connection_pool.clone())
    })
    .listen(listener)?
    .run();
    // No .await here
    Ok(server)
}
