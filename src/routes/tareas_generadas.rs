use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::Deserialize;

use crate::{
    auth::{require_role, CurrentAnalista},
    domain::{ProgresoTarea, TareaRef, UserRole},
    error::{AppError, AppResult},
    historial::{self, fecha_finalizacion_tras},
    models::TareaGenerada,
    schema::tareas_generadas,
    state::AppState,
};

use super::tareas::{historial_con_autores, HistorialEstadoInfo};

#[derive(Deserialize)]
pub struct UpdateTareaGeneradaRequest {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub progreso: Option<ProgresoTarea>,
}

#[derive(Deserialize)]
pub struct TareasGeneradasQuery {
    pub analista_id: Option<i32>,
    pub aviso_id: Option<i32>,
}

fn load_tarea_generada(conn: &mut PgConnection, id: i32) -> AppResult<TareaGenerada> {
    tareas_generadas::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("tarea generada no encontrada"))
}

pub async fn list_tareas_generadas(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Query(filtros): Query<TareasGeneradasQuery>,
) -> AppResult<Json<Vec<TareaGenerada>>> {
    let mut conn = state.db()?;

    let rows: Vec<TareaGenerada> = if actor.role.es_gestor() {
        let mut query = tareas_generadas::table
            .order(tareas_generadas::fecha_creacion.desc())
            .into_boxed();
        if let Some(analista_id) = filtros.analista_id {
            query = query.filter(tareas_generadas::analista_id.eq(analista_id));
        }
        if let Some(aviso_id) = filtros.aviso_id {
            query = query.filter(tareas_generadas::aviso_id.eq(aviso_id));
        }
        query.load(&mut conn)?
    } else {
        tareas_generadas::table
            .filter(tareas_generadas::analista_id.eq(actor.id))
            .order(tareas_generadas::fecha_creacion.desc())
            .load(&mut conn)?
    };

    Ok(Json(rows))
}

pub async fn get_tarea_generada(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(id): Path<i32>,
) -> AppResult<Json<TareaGenerada>> {
    let mut conn = state.db()?;
    let tarea = load_tarea_generada(&mut conn, id)?;

    if !actor.role.es_gestor() && tarea.analista_id != actor.id {
        return Err(AppError::forbidden());
    }

    Ok(Json(tarea))
}

pub async fn update_tarea_generada(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTareaGeneradaRequest>,
) -> AppResult<Json<TareaGenerada>> {
    let mut conn = state.db()?;
    let existing = load_tarea_generada(&mut conn, id)?;

    if actor.role == UserRole::Analista {
        if existing.analista_id != actor.id {
            return Err(AppError::forbidden());
        }
        // On generated tasks an analyst can only move the progress.
        if payload.titulo.is_some()
            || payload.descripcion.is_some()
            || payload.fecha_vencimiento.is_some()
        {
            return Err(AppError::forbidden());
        }
    }

    let actor_id = actor.id;
    let updated = conn.transaction::<TareaGenerada, AppError, _>(|conn| {
        let mut fecha_finalizacion = existing.fecha_finalizacion;

        if let Some(nuevo) = payload.progreso {
            if nuevo != existing.progreso {
                historial::registrar_cambio(
                    conn,
                    TareaRef::Generada(existing.id),
                    Some(existing.progreso),
                    nuevo,
                    actor_id,
                )?;
                fecha_finalizacion = fecha_finalizacion_tras(nuevo, Utc::now());
            }
        }

        diesel::update(tareas_generadas::table.find(existing.id))
            .set((
                tareas_generadas::titulo.eq(payload.titulo.unwrap_or(existing.titulo)),
                tareas_generadas::descripcion.eq(payload.descripcion.or(existing.descripcion)),
                tareas_generadas::fecha_vencimiento
                    .eq(payload.fecha_vencimiento.or(existing.fecha_vencimiento)),
                tareas_generadas::progreso.eq(payload.progreso.unwrap_or(existing.progreso)),
                tareas_generadas::fecha_finalizacion.eq(fecha_finalizacion),
            ))
            .execute(conn)?;

        Ok(tareas_generadas::table.find(existing.id).first(conn)?)
    })?;

    Ok(Json(updated))
}

pub async fn delete_tarea_generada(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    require_role(&actor, &[UserRole::Supervisor])?;
    let mut conn = state.db()?;

    let deleted =
        diesel::delete(tareas_generadas::table.find(id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found_msg("tarea generada no encontrada"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn historial_estados(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<HistorialEstadoInfo>>> {
    let mut conn = state.db()?;
    let tarea = load_tarea_generada(&mut conn, id)?;

    if !actor.role.es_gestor() && tarea.analista_id != actor.id {
        return Err(AppError::forbidden());
    }

    let historial = historial_con_autores(&mut conn, TareaRef::Generada(id))?;
    Ok(Json(historial))
}
