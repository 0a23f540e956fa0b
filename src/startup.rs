use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::Key;
use actix_web::dev::Server;
use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use actix_web_flash_messages::storage::CookieMessageStore;
use actix_web_flash_messages::FlashMessagesFramework;
use anyhow::Context;
use secrecy::{ExposeSecret, Secret};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::auth::{ensure_admin_account, reject_anonymous_users};
use crate::config::{DatabaseSettings, Settings};
use crate::models::account::NewAccount;
use crate::routes::{
    book_appointment, booking_form, dashboard, doctor_appointments, doctor_form, get_appointments,
    get_doctors, health_check, home, log_out, login, login_form, patient_appointments,
    patient_form, post_appointment, register_index, sign_up_doctor, sign_up_patient,
};
use crate::session::SessionTtl;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let connection = get_connection_pool(&config.database);
        sqlx::migrate!("./migrations")
            .run(&connection)
            .await
            .context("Failed to migrate the database")?;

        if let Some(admin) = config.admin {
            ensure_admin_account(
                NewAccount {
                    username: admin.username,
                    password: admin.password,
                },
                &connection,
            )
            .await?;
        }

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            connection,
            config.application.hmac_secret,
            SessionSettings {
                ttl: chrono::Duration::minutes(config.application.session_ttl_minutes),
                cookie_ttl: CookieDuration::minutes(config.application.cookie_ttl_minutes),
                secure_cookies: config.application.secure_cookies,
            },
        )?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(config: &DatabaseSettings) -> SqlitePool {
    SqlitePoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.with_db())
}

pub struct SessionSettings {
    pub ttl: chrono::Duration,
    pub cookie_ttl: CookieDuration,
    pub secure_cookies: bool,
}

pub fn run(
    listener: TcpListener,
    db_pool: SqlitePool,
    hmac_secret: Secret<String>,
    session: SessionSettings,
) -> Result<Server, anyhow::Error> {
    // `Key::from` panics below 64 bytes.
    if hmac_secret.expose_secret().len() < 64 {
        anyhow::bail!("The HMAC secret must be at least 64 bytes long");
    }
    let connection: web::Data<SqlitePool> = web::Data::new(db_pool);
    let secret_key = Key::from(hmac_secret.expose_secret().as_bytes());
    let message_store = CookieMessageStore::builder(secret_key.clone()).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();
    let session_ttl = web::Data::new(SessionTtl(session.ttl));
    let cookie_ttl = session.cookie_ttl;
    let secure_cookies = session.secure_cookies;

    let server: Server = HttpServer::new(move || {
        App::new()
            .wrap(message_framework.clone())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                    .cookie_secure(secure_cookies)
                    .session_lifecycle(PersistentSession::default().session_ttl(cookie_ttl))
                    .build(),
            )
            .wrap(TracingLogger::default())
            .route("/", web::get().to(home))
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::get().to(login_form))
            .route("/login", web::post().to(login))
            .route("/register", web::get().to(register_index))
            .route("/register/patient", web::get().to(patient_form))
            .route("/register/patient", web::post().to(sign_up_patient))
            .route("/register/doctor", web::get().to(doctor_form))
            .route("/register/doctor", web::post().to(sign_up_doctor))
            .service(
                web::scope("/dashboard")
                    .wrap(from_fn(reject_anonymous_users))
                    .route("", web::get().to(dashboard))
                    .route("/logout", web::post().to(log_out)),
            )
            .service(
                web::scope("/patients")
                    .wrap(from_fn(reject_anonymous_users))
                    .route("/appointments", web::get().to(patient_appointments))
                    .route("/appointments", web::post().to(book_appointment))
                    .route("/appointments/new", web::get().to(booking_form)),
            )
            .service(
                web::scope("/doctors")
                    .wrap(from_fn(reject_anonymous_users))
                    .route("/appointments", web::get().to(doctor_appointments)),
            )
            .service(
                web::scope("/api")
                    .route("/doctors", web::get().to(get_doctors))
                    .route("/appointments", web::get().to(get_appointments))
                    .route("/appointments", web::post().to(post_appointment)),
            )
            .app_data(connection.clone())
            .app_data(session_ttl.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
