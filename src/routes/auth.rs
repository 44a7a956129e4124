use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{password, CurrentAnalista},
    domain::UserRole,
    error::{AppError, AppResult},
    models::{Analista, NewAnalista},
    schema::analistas,
    state::AppState,
};

// bms_id is a 4-to-8 digit payroll code.
pub(crate) const BMS_ID_MIN: i32 = 1_000;
pub(crate) const BMS_ID_MAX: i32 = 99_999_999;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub bms_id: i32,
    pub role: UserRole,
    pub password: String,
}

#[derive(Serialize)]
pub struct AnalistaInfo {
    pub id: i32,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub bms_id: i32,
    pub role: UserRole,
    pub esta_activo: bool,
    pub fecha_creacion: DateTime<Utc>,
}

impl From<Analista> for AnalistaInfo {
    fn from(analista: Analista) -> Self {
        Self {
            id: analista.id,
            nombre: analista.nombre,
            apellido: analista.apellido,
            email: analista.email,
            bms_id: analista.bms_id,
            role: analista.role,
            esta_activo: analista.esta_activo,
            fecha_creacion: analista.fecha_creacion,
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let mut conn = state.db()?;

    let analista = analistas::table
        .filter(analistas::email.eq(&payload.username))
        .first::<Analista>(&mut conn)
        .optional()?
        .ok_or_else(AppError::unauthorized)?;

    let valid = password::verify_password(&payload.password, &analista.hashed_password)
        .map_err(|_| AppError::unauthorized())?;
    if !valid {
        return Err(AppError::unauthorized());
    }

    if !analista.esta_activo {
        return Err(AppError::bad_request(
            "usuario inactivo, contacte al administrador",
        ));
    }

    let access_token = state
        .jwt
        .generate_token(&analista.email, analista.role)
        .map_err(AppError::from)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AnalistaInfo>)> {
    let mut conn = state.db()?;
    let analista = insert_analista(&mut conn, payload)?;
    Ok((StatusCode::CREATED, Json(analista.into())))
}

pub async fn me(CurrentAnalista(actor): CurrentAnalista) -> Json<AnalistaInfo> {
    Json(actor.into())
}

pub(crate) fn insert_analista(
    conn: &mut PgConnection,
    payload: RegisterRequest,
) -> AppResult<Analista> {
    if !(BMS_ID_MIN..=BMS_ID_MAX).contains(&payload.bms_id) {
        return Err(AppError::bad_request("el BMS ID debe tener entre 4 y 8 digitos"));
    }

    let email_taken = analistas::table
        .filter(analistas::email.eq(&payload.email))
        .first::<Analista>(conn)
        .optional()?
        .is_some();
    if email_taken {
        return Err(AppError::bad_request("el email ya esta registrado"));
    }

    let bms_taken = analistas::table
        .filter(analistas::bms_id.eq(payload.bms_id))
        .first::<Analista>(conn)
        .optional()?
        .is_some();
    if bms_taken {
        return Err(AppError::bad_request("el BMS ID ya existe"));
    }

    let hashed_password = password::hash_password(&payload.password)?;
    let new_analista = NewAnalista {
        nombre: payload.nombre,
        apellido: payload.apellido,
        email: payload.email,
        bms_id: payload.bms_id,
        hashed_password,
        role: payload.role,
        esta_activo: true,
    };

    let analista = diesel::insert_into(analistas::table)
        .values(&new_analista)
        .get_result(conn)?;
    Ok(analista)
}
