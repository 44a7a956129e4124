use std::env;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use portal_gtr::attendance::{AttendanceApi, AttendanceError, DiaAsistencia};
use portal_gtr::auth::jwt::JwtService;
use portal_gtr::auth::password;
use portal_gtr::config::AppConfig;
use portal_gtr::db::{self, PgPool};
use portal_gtr::domain::UserRole;
use portal_gtr::models::NewAnalista;
use portal_gtr::routes;
use portal_gtr::state::AppState;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// In-memory stand-in for the GeoVictoria client.
#[derive(Default)]
pub struct FakeAttendance {
    dias: Mutex<Vec<DiaAsistencia>>,
    unavailable: Mutex<bool>,
}

impl FakeAttendance {
    #[allow(dead_code)]
    pub async fn set_dias(&self, dias: Vec<DiaAsistencia>) {
        *self.dias.lock().await = dias;
    }

    #[allow(dead_code)]
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().await = unavailable;
    }
}

#[async_trait]
impl AttendanceApi for FakeAttendance {
    async fn fetch_period(
        &self,
        _rut: &str,
        _desde: NaiveDate,
        _hasta: NaiveDate,
    ) -> Result<Vec<DiaAsistencia>, AttendanceError> {
        if *self.unavailable.lock().await {
            return Err(AttendanceError::Unavailable(
                "fake attendance service down".to_string(),
            ));
        }
        Ok(self.dias.lock().await.clone())
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    attendance: Arc<FakeAttendance>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_expiry_minutes: 30,
            cors_allowed_origin: None,
            geovictoria_base_url: "http://localhost:1".to_string(),
            geovictoria_user: None,
            geovictoria_password: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let attendance = Arc::new(FakeAttendance::default());
        let attendance_for_state: Arc<dyn AttendanceApi> = attendance.clone();
        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool.clone(), config, jwt, attendance_for_state);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            attendance,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub fn attendance(&self) -> Arc<FakeAttendance> {
        self.attendance.clone()
    }

    pub async fn insert_analista(
        &self,
        nombre: &str,
        email: &str,
        bms_id: i32,
        role: UserRole,
        password_plain: &str,
    ) -> Result<i32> {
        let nombre = nombre.to_string();
        let email = email.to_string();
        let password_plain = password_plain.to_string();
        self.with_conn(move |conn| {
            let hashed_password = password::hash_password(&password_plain)?;
            let nuevo = NewAnalista {
                nombre,
                apellido: "Test".to_string(),
                email,
                bms_id,
                hashed_password,
                role,
                esta_activo: true,
            };
            let id = diesel::insert_into(portal_gtr::schema::analistas::table)
                .values(&nuevo)
                .returning(portal_gtr::schema::analistas::id)
                .get_result(conn)
                .context("failed to insert analista")?;
            Ok(id)
        })
        .await
    }

    pub async fn login_token(&self, email: &str, password_plain: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            username: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/token",
                &LoginPayload {
                    username: email,
                    password: password_plain,
                },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    pub async fn request_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.request_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.request_json(Method::PUT, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.request_json(Method::PATCH, path, payload, token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let builder = Request::builder().method(Method::DELETE).uri(path);
        let builder = if let Some(token) = token {
            builder.header("authorization", format!("Bearer {token}"))
        } else {
            builder
        };
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE actualizaciones_incidencia, incidencias, validaciones_hhee, \
         bitacora_comentarios_generales, bitacora_entradas, historial_estados_tarea, \
         tareas_generadas, acuses_recibo_avisos, avisos, comentarios_campana, \
         checklist_items, tareas, analistas_campanas, campanas, analistas \
         RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
