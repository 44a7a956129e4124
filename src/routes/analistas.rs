use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::{prelude::*, PgConnection};
use serde::Deserialize;

use crate::{
    auth::{require_role, CurrentAnalista},
    domain::UserRole,
    error::{AppError, AppResult},
    models::{Analista, Campana, NewAnalistaCampana},
    schema::{analistas, analistas_campanas, campanas},
    state::AppState,
};

use super::auth::{AnalistaInfo, RegisterRequest};

const GESTORES: &[UserRole] = &[UserRole::Supervisor, UserRole::Responsable];

#[derive(Deserialize)]
pub struct UpdateAnalistaRequest {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub esta_activo: Option<bool>,
}

pub(crate) fn load_analista(conn: &mut PgConnection, analista_id: i32) -> AppResult<Analista> {
    analistas::table
        .find(analista_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("analista no encontrado"))
}

pub(crate) fn load_campana(conn: &mut PgConnection, campana_id: i32) -> AppResult<Campana> {
    campanas::table
        .find(campana_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("campaña no encontrada"))
}

pub(crate) fn campanas_asignadas_ids(
    conn: &mut PgConnection,
    analista_id: i32,
) -> QueryResult<Vec<i32>> {
    analistas_campanas::table
        .filter(analistas_campanas::analista_id.eq(analista_id))
        .select(analistas_campanas::campana_id)
        .load(conn)
}

pub(crate) fn esta_asignado(
    conn: &mut PgConnection,
    analista_id: i32,
    campana_id: i32,
) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        analistas_campanas::table
            .filter(analistas_campanas::analista_id.eq(analista_id))
            .filter(analistas_campanas::campana_id.eq(campana_id)),
    ))
    .get_result(conn)
}

pub async fn list_analistas(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
) -> AppResult<Json<Vec<AnalistaInfo>>> {
    require_role(&actor, GESTORES)?;
    let mut conn = state.db()?;

    let rows: Vec<Analista> = analistas::table
        .order(analistas::apellido.asc())
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(AnalistaInfo::from).collect()))
}

pub async fn create_analista(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AnalistaInfo>)> {
    require_role(&actor, GESTORES)?;
    let mut conn = state.db()?;
    let analista = super::auth::insert_analista(&mut conn, payload)?;
    Ok((StatusCode::CREATED, Json(analista.into())))
}

pub async fn get_analista(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(analista_id): Path<i32>,
) -> AppResult<Json<AnalistaInfo>> {
    // Self-service: an analyst can always read their own record.
    if actor.id != analista_id {
        require_role(&actor, GESTORES)?;
    }

    let mut conn = state.db()?;
    let analista = load_analista(&mut conn, analista_id)?;
    Ok(Json(analista.into()))
}

pub async fn update_analista(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(analista_id): Path<i32>,
    Json(payload): Json<UpdateAnalistaRequest>,
) -> AppResult<Json<AnalistaInfo>> {
    let es_gestor = actor.role.es_gestor();
    if actor.id != analista_id && !es_gestor {
        return Err(AppError::forbidden());
    }
    // Role and activation changes stay with supervisors, even on own record.
    if !es_gestor && (payload.role.is_some() || payload.esta_activo.is_some()) {
        return Err(AppError::forbidden());
    }

    let mut conn = state.db()?;
    let existing = load_analista(&mut conn, analista_id)?;

    if let Some(email) = payload.email.as_deref() {
        let duplicate = analistas::table
            .filter(analistas::email.eq(email))
            .filter(analistas::id.ne(analista_id))
            .first::<Analista>(&mut conn)
            .optional()?;
        if duplicate.is_some() {
            return Err(AppError::bad_request("el email ya esta registrado"));
        }
    }

    diesel::update(analistas::table.find(analista_id))
        .set((
            analistas::nombre.eq(payload.nombre.unwrap_or(existing.nombre)),
            analistas::apellido.eq(payload.apellido.unwrap_or(existing.apellido)),
            analistas::email.eq(payload.email.unwrap_or(existing.email)),
            analistas::role.eq(payload.role.unwrap_or(existing.role)),
            analistas::esta_activo.eq(payload.esta_activo.unwrap_or(existing.esta_activo)),
        ))
        .execute(&mut conn)?;

    let updated: Analista = analistas::table.find(analista_id).first(&mut conn)?;
    Ok(Json(updated.into()))
}

/// Analysts are never hard-deleted; DELETE deactivates the account.
pub async fn deactivate_analista(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(analista_id): Path<i32>,
) -> AppResult<Json<AnalistaInfo>> {
    require_role(&actor, GESTORES)?;
    if actor.id == analista_id {
        return Err(AppError::bad_request(
            "no puedes desactivar tu propia cuenta",
        ));
    }

    let mut conn = state.db()?;
    load_analista(&mut conn, analista_id)?;

    diesel::update(analistas::table.find(analista_id))
        .set(analistas::esta_activo.eq(false))
        .execute(&mut conn)?;

    let updated: Analista = analistas::table.find(analista_id).first(&mut conn)?;
    Ok(Json(updated.into()))
}

pub async fn assign_campana(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path((analista_id, campana_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    require_role(&actor, GESTORES)?;
    let mut conn = state.db()?;

    load_analista(&mut conn, analista_id)?;
    load_campana(&mut conn, campana_id)?;

    if esta_asignado(&mut conn, analista_id, campana_id)? {
        return Err(AppError::conflict(
            "el analista ya esta asignado a esta campaña",
        ));
    }

    diesel::insert_into(analistas_campanas::table)
        .values(&NewAnalistaCampana {
            analista_id,
            campana_id,
        })
        .execute(&mut conn)?;

    Ok(StatusCode::CREATED)
}

pub async fn unassign_campana(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path((analista_id, campana_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    require_role(&actor, GESTORES)?;
    let mut conn = state.db()?;

    let deleted = diesel::delete(
        analistas_campanas::table
            .filter(analistas_campanas::analista_id.eq(analista_id))
            .filter(analistas_campanas::campana_id.eq(campana_id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::not_found_msg("asignacion no encontrada"));
    }

    Ok(StatusCode::NO_CONTENT)
}
