use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use serde::Deserialize;

use crate::{
    auth::{require_role, CurrentAnalista},
    domain::UserRole,
    error::{AppError, AppResult},
    models::{
        BitacoraComentarioGeneral, BitacoraEntrada, NewBitacoraComentarioGeneral,
        NewBitacoraEntrada,
    },
    schema::{bitacora_comentarios_generales, bitacora_entradas},
    state::AppState,
};

use super::analistas::{esta_asignado, load_campana};

const GESTORES: &[UserRole] = &[UserRole::Supervisor, UserRole::Responsable];

#[derive(Deserialize)]
pub struct CreateEntradaRequest {
    pub fecha: NaiveDate,
    pub hora: String,
    pub comentario: Option<String>,
    #[serde(default)]
    pub es_incidencia: bool,
    pub tipo_incidencia: Option<String>,
    pub comentario_incidencia: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateEntradaRequest {
    pub comentario: Option<String>,
    pub es_incidencia: Option<bool>,
    pub tipo_incidencia: Option<String>,
    pub comentario_incidencia: Option<String>,
}

#[derive(Deserialize)]
pub struct BitacoraQuery {
    pub fecha: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ComentarioGeneralRequest {
    pub comentario: Option<String>,
}

fn hora_valida(hora: &str) -> bool {
    let mut parts = hora.split(':');
    let hh = parts.next().and_then(|p| p.parse::<u8>().ok());
    let mm = parts.next().and_then(|p| p.parse::<u8>().ok());
    matches!((hh, mm, parts.next()), (Some(h), Some(m), None) if h < 24 && m < 60)
}

fn verificar_acceso_campana(
    conn: &mut diesel::PgConnection,
    actor_role: UserRole,
    actor_id: i32,
    campana_id: i32,
) -> AppResult<()> {
    if actor_role.es_gestor() {
        return Ok(());
    }
    if esta_asignado(conn, actor_id, campana_id)? {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

pub async fn list_entradas(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(campana_id): Path<i32>,
    Query(filtros): Query<BitacoraQuery>,
) -> AppResult<Json<Vec<BitacoraEntrada>>> {
    let mut conn = state.db()?;
    load_campana(&mut conn, campana_id)?;
    verificar_acceso_campana(&mut conn, actor.role, actor.id, campana_id)?;

    let mut query = bitacora_entradas::table
        .filter(bitacora_entradas::campana_id.eq(campana_id))
        .order((bitacora_entradas::fecha.asc(), bitacora_entradas::hora.asc()))
        .into_boxed();
    if let Some(fecha) = filtros.fecha {
        query = query.filter(bitacora_entradas::fecha.eq(fecha));
    }

    let entradas: Vec<BitacoraEntrada> = query.load(&mut conn)?;
    Ok(Json(entradas))
}

pub async fn create_entrada(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(campana_id): Path<i32>,
    Json(payload): Json<CreateEntradaRequest>,
) -> AppResult<(StatusCode, Json<BitacoraEntrada>)> {
    if !hora_valida(&payload.hora) {
        return Err(AppError::bad_request("la hora debe tener formato HH:MM"));
    }

    let mut conn = state.db()?;
    load_campana(&mut conn, campana_id)?;
    verificar_acceso_campana(&mut conn, actor.role, actor.id, campana_id)?;

    let ocupado = bitacora_entradas::table
        .filter(bitacora_entradas::campana_id.eq(campana_id))
        .filter(bitacora_entradas::fecha.eq(payload.fecha))
        .filter(bitacora_entradas::hora.eq(&payload.hora))
        .first::<BitacoraEntrada>(&mut conn)
        .optional()?;
    if ocupado.is_some() {
        return Err(AppError::conflict(
            "ya existe una entrada de bitacora para esa campaña, fecha y hora",
        ));
    }

    let entrada: BitacoraEntrada = diesel::insert_into(bitacora_entradas::table)
        .values(&NewBitacoraEntrada {
            campana_id,
            fecha: payload.fecha,
            hora: payload.hora,
            comentario: payload.comentario,
            es_incidencia: payload.es_incidencia,
            tipo_incidencia: payload.tipo_incidencia,
            comentario_incidencia: payload.comentario_incidencia,
        })
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(entrada)))
}

pub async fn update_entrada(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(entrada_id): Path<i32>,
    Json(payload): Json<UpdateEntradaRequest>,
) -> AppResult<Json<BitacoraEntrada>> {
    let mut conn = state.db()?;

    let existing: BitacoraEntrada = bitacora_entradas::table
        .find(entrada_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("entrada de bitacora no encontrada"))?;
    verificar_acceso_campana(&mut conn, actor.role, actor.id, existing.campana_id)?;

    diesel::update(bitacora_entradas::table.find(entrada_id))
        .set((
            bitacora_entradas::comentario.eq(payload.comentario.or(existing.comentario)),
            bitacora_entradas::es_incidencia
                .eq(payload.es_incidencia.unwrap_or(existing.es_incidencia)),
            bitacora_entradas::tipo_incidencia
                .eq(payload.tipo_incidencia.or(existing.tipo_incidencia)),
            bitacora_entradas::comentario_incidencia
                .eq(payload.comentario_incidencia.or(existing.comentario_incidencia)),
            bitacora_entradas::fecha_ultima_actualizacion.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    let updated: BitacoraEntrada = bitacora_entradas::table.find(entrada_id).first(&mut conn)?;
    Ok(Json(updated))
}

pub async fn get_comentario_general(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(campana_id): Path<i32>,
) -> AppResult<Json<BitacoraComentarioGeneral>> {
    let mut conn = state.db()?;
    load_campana(&mut conn, campana_id)?;
    verificar_acceso_campana(&mut conn, actor.role, actor.id, campana_id)?;

    let comentario: BitacoraComentarioGeneral = bitacora_comentarios_generales::table
        .filter(bitacora_comentarios_generales::campana_id.eq(campana_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("la campaña no tiene comentario general"))?;

    Ok(Json(comentario))
}

/// Creates the campaign's single general comment or replaces its text.
pub async fn upsert_comentario_general(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(campana_id): Path<i32>,
    Json(payload): Json<ComentarioGeneralRequest>,
) -> AppResult<Json<BitacoraComentarioGeneral>> {
    require_role(&actor, GESTORES)?;
    let mut conn = state.db()?;
    load_campana(&mut conn, campana_id)?;

    let comentario: BitacoraComentarioGeneral =
        diesel::insert_into(bitacora_comentarios_generales::table)
            .values(&NewBitacoraComentarioGeneral {
                campana_id,
                comentario: payload.comentario.clone(),
            })
            .on_conflict(bitacora_comentarios_generales::campana_id)
            .do_update()
            .set((
                bitacora_comentarios_generales::comentario.eq(payload.comentario),
                bitacora_comentarios_generales::fecha_ultima_actualizacion.eq(Utc::now()),
            ))
            .get_result(&mut conn)?;

    Ok(Json(comentario))
}
