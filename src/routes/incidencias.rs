use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentAnalista,
    domain::{EstadoIncidencia, TipoIncidencia},
    error::{AppError, AppResult},
    models::{Analista, ActualizacionIncidencia, Incidencia, NewActualizacionIncidencia, NewIncidencia},
    schema::{actualizaciones_incidencia, incidencias},
    state::AppState,
};

use super::analistas::{campanas_asignadas_ids, esta_asignado, load_campana};

#[derive(Deserialize)]
pub struct CreateIncidenciaRequest {
    pub titulo: String,
    pub descripcion: String,
    pub herramienta_afectada: Option<String>,
    pub indicador_afectado: Option<String>,
    pub tipo: TipoIncidencia,
    pub campana_id: i32,
}

#[derive(Deserialize)]
pub struct IncidenciasQuery {
    pub campana_id: Option<i32>,
    pub estado: Option<EstadoIncidencia>,
}

#[derive(Deserialize)]
pub struct CambioEstadoRequest {
    pub estado: EstadoIncidencia,
}

#[derive(Deserialize)]
pub struct ActualizacionRequest {
    pub contenido: String,
}

#[derive(Serialize)]
pub struct IncidenciaDetalle {
    #[serde(flatten)]
    pub incidencia: Incidencia,
    pub actualizaciones: Vec<ActualizacionIncidencia>,
}

fn load_incidencia(conn: &mut PgConnection, id: i32) -> AppResult<Incidencia> {
    incidencias::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("incidencia no encontrada"))
}

fn verificar_acceso(
    conn: &mut PgConnection,
    actor: &Analista,
    campana_id: i32,
) -> AppResult<()> {
    if actor.role.es_gestor() || esta_asignado(conn, actor.id, campana_id)? {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

pub async fn create_incidencia(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Json(payload): Json<CreateIncidenciaRequest>,
) -> AppResult<(StatusCode, Json<Incidencia>)> {
    let mut conn = state.db()?;
    load_campana(&mut conn, payload.campana_id)?;
    verificar_acceso(&mut conn, &actor, payload.campana_id)?;

    let incidencia: Incidencia = diesel::insert_into(incidencias::table)
        .values(&NewIncidencia {
            titulo: payload.titulo,
            descripcion: payload.descripcion,
            herramienta_afectada: payload.herramienta_afectada,
            indicador_afectado: payload.indicador_afectado,
            tipo: payload.tipo,
            estado: EstadoIncidencia::Abierta,
            creador_id: actor.id,
            campana_id: payload.campana_id,
        })
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(incidencia)))
}

pub async fn list_incidencias(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Query(filtros): Query<IncidenciasQuery>,
) -> AppResult<Json<Vec<Incidencia>>> {
    let mut conn = state.db()?;

    let mut query = incidencias::table
        .order(incidencias::fecha_apertura.desc())
        .into_boxed();
    if let Some(campana_id) = filtros.campana_id {
        query = query.filter(incidencias::campana_id.eq(campana_id));
    }
    if let Some(estado) = filtros.estado {
        query = query.filter(incidencias::estado.eq(estado));
    }
    if !actor.role.es_gestor() {
        let mis_campanas = campanas_asignadas_ids(&mut conn, actor.id)?;
        query = query.filter(incidencias::campana_id.eq_any(mis_campanas));
    }

    let rows: Vec<Incidencia> = query.load(&mut conn)?;
    Ok(Json(rows))
}

pub async fn get_incidencia(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(id): Path<i32>,
) -> AppResult<Json<IncidenciaDetalle>> {
    let mut conn = state.db()?;
    let incidencia = load_incidencia(&mut conn, id)?;
    verificar_acceso(&mut conn, &actor, incidencia.campana_id)?;

    let actualizaciones: Vec<ActualizacionIncidencia> = actualizaciones_incidencia::table
        .filter(actualizaciones_incidencia::incidencia_id.eq(id))
        .order(actualizaciones_incidencia::fecha_creacion.asc())
        .load(&mut conn)?;

    Ok(Json(IncidenciaDetalle {
        incidencia,
        actualizaciones,
    }))
}

/// Moves the incident through ABIERTA / EN_PROGRESO / CERRADA. Closing stamps
/// the closing timestamp; any other target clears it.
pub async fn cambiar_estado(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(id): Path<i32>,
    Json(payload): Json<CambioEstadoRequest>,
) -> AppResult<Json<Incidencia>> {
    let mut conn = state.db()?;
    let existing = load_incidencia(&mut conn, id)?;
    verificar_acceso(&mut conn, &actor, existing.campana_id)?;

    let fecha_cierre: Option<DateTime<Utc>> = if payload.estado == EstadoIncidencia::Cerrada {
        Some(Utc::now())
    } else {
        None
    };

    diesel::update(incidencias::table.find(id))
        .set((
            incidencias::estado.eq(payload.estado),
            incidencias::fecha_cierre.eq(fecha_cierre),
        ))
        .execute(&mut conn)?;

    let updated: Incidencia = incidencias::table.find(id).first(&mut conn)?;
    Ok(Json(updated))
}

pub async fn agregar_actualizacion(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(id): Path<i32>,
    Json(payload): Json<ActualizacionRequest>,
) -> AppResult<(StatusCode, Json<ActualizacionIncidencia>)> {
    if payload.contenido.trim().is_empty() {
        return Err(AppError::bad_request("el contenido no puede estar vacio"));
    }

    let mut conn = state.db()?;
    let incidencia = load_incidencia(&mut conn, id)?;
    verificar_acceso(&mut conn, &actor, incidencia.campana_id)?;

    let actualizacion: ActualizacionIncidencia =
        diesel::insert_into(actualizaciones_incidencia::table)
            .values(&NewActualizacionIncidencia {
                incidencia_id: id,
                autor_id: actor.id,
                contenido: payload.contenido,
            })
            .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(actualizacion)))
}
