use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};

use crate::{
    auth::{require_role, CurrentAnalista},
    domain::{ProgresoTarea, TareaRef, UserRole},
    error::{AppError, AppResult},
    historial::{self, fecha_finalizacion_tras},
    models::{Analista, Campana, ChecklistItem, HistorialEstadoTarea, NewTarea, Tarea},
    schema::{analistas, campanas, checklist_items, tareas},
    state::AppState,
};

use super::analistas::{campanas_asignadas_ids, esta_asignado, load_analista, load_campana};
use super::auth::AnalistaInfo;

#[derive(Deserialize)]
pub struct CreateTareaRequest {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha_vencimiento: DateTime<Utc>,
    pub analista_id: Option<i32>,
    pub campana_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateTareaRequest {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub progreso: Option<ProgresoTarea>,
    pub analista_id: Option<i32>,
    pub campana_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct TareasQuery {
    pub analista_id: Option<i32>,
    pub campana_id: Option<i32>,
}

#[derive(Serialize)]
pub struct TareaDetalle {
    #[serde(flatten)]
    pub tarea: Tarea,
    pub analista: Option<AnalistaInfo>,
    pub campana: Option<Campana>,
    pub checklist_items: Vec<ChecklistItem>,
}

#[derive(Serialize)]
pub struct HistorialEstadoInfo {
    pub id: i32,
    pub old_progreso: Option<ProgresoTarea>,
    pub new_progreso: ProgresoTarea,
    pub timestamp: DateTime<Utc>,
    pub changed_by_analista: AnalistaInfo,
}

pub(crate) fn load_tarea(conn: &mut PgConnection, tarea_id: i32) -> AppResult<Tarea> {
    tareas::table
        .find(tarea_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("tarea no encontrada"))
}

fn puede_ver_tarea(conn: &mut PgConnection, actor: &Analista, tarea: &Tarea) -> AppResult<bool> {
    if actor.role.es_gestor() || tarea.analista_id == Some(actor.id) {
        return Ok(true);
    }
    // Pool tasks are visible to the campaign roster so they can be claimed.
    if tarea.analista_id.is_none() {
        if let Some(campana_id) = tarea.campana_id {
            return Ok(esta_asignado(conn, actor.id, campana_id)?);
        }
    }
    Ok(false)
}

pub(crate) fn tarea_detalle(conn: &mut PgConnection, tarea: Tarea) -> AppResult<TareaDetalle> {
    let analista = match tarea.analista_id {
        Some(id) => analistas::table
            .find(id)
            .first::<Analista>(conn)
            .optional()?
            .map(AnalistaInfo::from),
        None => None,
    };
    let campana = match tarea.campana_id {
        Some(id) => campanas::table.find(id).first::<Campana>(conn).optional()?,
        None => None,
    };
    let items: Vec<ChecklistItem> = checklist_items::table
        .filter(checklist_items::tarea_id.eq(tarea.id))
        .order(checklist_items::fecha_creacion.asc())
        .load(conn)?;

    Ok(TareaDetalle {
        tarea,
        analista,
        campana,
        checklist_items: items,
    })
}

pub(crate) fn historial_con_autores(
    conn: &mut PgConnection,
    parent: TareaRef,
) -> AppResult<Vec<HistorialEstadoInfo>> {
    let rows: Vec<HistorialEstadoTarea> = historial::historial_de(conn, parent)?;

    let autor_ids: Vec<i32> = rows.iter().map(|r| r.analista_id).collect();
    let autores: Vec<Analista> = analistas::table
        .filter(analistas::id.eq_any(&autor_ids))
        .load(conn)?;

    rows.into_iter()
        .map(|row| {
            let autor = autores
                .iter()
                .find(|a| a.id == row.analista_id)
                .cloned()
                .ok_or_else(|| AppError::internal("autor del historial no encontrado"))?;
            Ok(HistorialEstadoInfo {
                id: row.id,
                old_progreso: row.progreso_anterior,
                new_progreso: row.progreso_nuevo,
                timestamp: row.fecha_cambio,
                changed_by_analista: autor.into(),
            })
        })
        .collect()
}

pub async fn create_tarea(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Json(payload): Json<CreateTareaRequest>,
) -> AppResult<(StatusCode, Json<TareaDetalle>)> {
    let mut conn = state.db()?;

    if actor.role == UserRole::Analista {
        // Analysts only create tasks for themselves, inside their campaigns.
        if payload.analista_id != Some(actor.id) {
            return Err(AppError::forbidden());
        }
        if let Some(campana_id) = payload.campana_id {
            if !esta_asignado(&mut conn, actor.id, campana_id)? {
                return Err(AppError::forbidden());
            }
        }
    } else if payload.analista_id.is_none() && payload.campana_id.is_none() {
        return Err(AppError::bad_request(
            "una tarea sin analista necesita una campaña como grupo de destino",
        ));
    }

    if let Some(analista_id) = payload.analista_id {
        load_analista(&mut conn, analista_id)?;
    }
    if let Some(campana_id) = payload.campana_id {
        load_campana(&mut conn, campana_id)?;
    }

    let tarea = conn.transaction::<Tarea, AppError, _>(|conn| {
        let tarea: Tarea = diesel::insert_into(tareas::table)
            .values(&NewTarea {
                titulo: payload.titulo,
                descripcion: payload.descripcion,
                fecha_vencimiento: payload.fecha_vencimiento,
                progreso: ProgresoTarea::Pendiente,
                analista_id: payload.analista_id,
                campana_id: payload.campana_id,
            })
            .get_result(conn)?;

        historial::registrar_cambio(
            conn,
            TareaRef::Tarea(tarea.id),
            None,
            ProgresoTarea::Pendiente,
            actor.id,
        )?;

        Ok(tarea)
    })?;

    let detalle = tarea_detalle(&mut conn, tarea)?;
    Ok((StatusCode::CREATED, Json(detalle)))
}

pub async fn list_tareas(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Query(filtros): Query<TareasQuery>,
) -> AppResult<Json<Vec<TareaDetalle>>> {
    let mut conn = state.db()?;

    let rows: Vec<Tarea> = if actor.role.es_gestor() {
        let mut query = tareas::table.order(tareas::fecha_vencimiento.asc()).into_boxed();
        if let Some(analista_id) = filtros.analista_id {
            query = query.filter(tareas::analista_id.eq(analista_id));
        }
        if let Some(campana_id) = filtros.campana_id {
            query = query.filter(tareas::campana_id.eq(campana_id));
        }
        query.load(&mut conn)?
    } else {
        let mis_campanas = campanas_asignadas_ids(&mut conn, actor.id)?;
        tareas::table
            .filter(
                tareas::analista_id.eq(actor.id).or(tareas::analista_id
                    .is_null()
                    .and(tareas::campana_id.eq_any(mis_campanas))),
            )
            .order(tareas::fecha_vencimiento.asc())
            .load(&mut conn)?
    };

    rows.into_iter()
        .map(|tarea| tarea_detalle(&mut conn, tarea))
        .collect::<AppResult<Vec<_>>>()
        .map(Json)
}

pub async fn get_tarea(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(tarea_id): Path<i32>,
) -> AppResult<Json<TareaDetalle>> {
    let mut conn = state.db()?;
    let tarea = load_tarea(&mut conn, tarea_id)?;
    if !puede_ver_tarea(&mut conn, &actor, &tarea)? {
        return Err(AppError::forbidden());
    }
    Ok(Json(tarea_detalle(&mut conn, tarea)?))
}

pub async fn update_tarea(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(tarea_id): Path<i32>,
    Json(payload): Json<UpdateTareaRequest>,
) -> AppResult<Json<TareaDetalle>> {
    let mut conn = state.db()?;
    let existing = load_tarea(&mut conn, tarea_id)?;

    if actor.role == UserRole::Analista {
        if existing.analista_id != Some(actor.id) {
            return Err(AppError::forbidden());
        }
        // Analysts may only touch the description and the progress.
        if payload.titulo.is_some()
            || payload.fecha_vencimiento.is_some()
            || payload.analista_id.is_some()
            || payload.campana_id.is_some()
        {
            return Err(AppError::forbidden());
        }
    }

    if let Some(analista_id) = payload.analista_id {
        load_analista(&mut conn, analista_id)?;
    }
    if let Some(campana_id) = payload.campana_id {
        load_campana(&mut conn, campana_id)?;
    }

    let actor_id = actor.id;
    let updated = conn.transaction::<Tarea, AppError, _>(|conn| {
        let mut fecha_finalizacion = existing.fecha_finalizacion;

        if let Some(nuevo) = payload.progreso {
            if nuevo != existing.progreso {
                historial::registrar_cambio(
                    conn,
                    TareaRef::Tarea(existing.id),
                    Some(existing.progreso),
                    nuevo,
                    actor_id,
                )?;
                fecha_finalizacion = fecha_finalizacion_tras(nuevo, Utc::now());
            }
        }

        diesel::update(tareas::table.find(existing.id))
            .set((
                tareas::titulo.eq(payload.titulo.unwrap_or(existing.titulo)),
                tareas::descripcion.eq(payload.descripcion.or(existing.descripcion)),
                tareas::fecha_vencimiento
                    .eq(payload.fecha_vencimiento.unwrap_or(existing.fecha_vencimiento)),
                tareas::progreso.eq(payload.progreso.unwrap_or(existing.progreso)),
                tareas::analista_id.eq(payload.analista_id.or(existing.analista_id)),
                tareas::campana_id.eq(payload.campana_id.or(existing.campana_id)),
                tareas::fecha_finalizacion.eq(fecha_finalizacion),
            ))
            .execute(conn)?;

        Ok(tareas::table.find(existing.id).first(conn)?)
    })?;

    Ok(Json(tarea_detalle(&mut conn, updated)?))
}

/// Takes an unowned pool task for the acting analyst. A PENDIENTE task moves
/// straight to EN_PROGRESO.
pub async fn claim_tarea(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(tarea_id): Path<i32>,
) -> AppResult<Json<TareaDetalle>> {
    let mut conn = state.db()?;
    let existing = load_tarea(&mut conn, tarea_id)?;

    if existing.analista_id.is_some() {
        return Err(AppError::conflict("la tarea ya tiene analista asignado"));
    }
    if actor.role == UserRole::Analista {
        let campana_id = existing
            .campana_id
            .ok_or_else(|| AppError::forbidden())?;
        if !esta_asignado(&mut conn, actor.id, campana_id)? {
            return Err(AppError::forbidden());
        }
    }

    let actor_id = actor.id;
    let updated = conn.transaction::<Tarea, AppError, _>(|conn| {
        let nuevo_progreso = if existing.progreso == ProgresoTarea::Pendiente {
            ProgresoTarea::EnProgreso
        } else {
            existing.progreso
        };

        if nuevo_progreso != existing.progreso {
            historial::registrar_cambio(
                conn,
                TareaRef::Tarea(existing.id),
                Some(existing.progreso),
                nuevo_progreso,
                actor_id,
            )?;
        }

        diesel::update(tareas::table.find(existing.id))
            .set((
                tareas::analista_id.eq(Some(actor_id)),
                tareas::progreso.eq(nuevo_progreso),
            ))
            .execute(conn)?;

        Ok(tareas::table.find(existing.id).first(conn)?)
    })?;

    Ok(Json(tarea_detalle(&mut conn, updated)?))
}

/// Returns a task to the pool; only the current owner may release it.
pub async fn release_tarea(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(tarea_id): Path<i32>,
) -> AppResult<Json<TareaDetalle>> {
    let mut conn = state.db()?;
    let existing = load_tarea(&mut conn, tarea_id)?;

    if existing.analista_id != Some(actor.id) {
        return Err(AppError::forbidden());
    }

    let actor_id = actor.id;
    let updated = conn.transaction::<Tarea, AppError, _>(|conn| {
        if existing.progreso != ProgresoTarea::Pendiente {
            historial::registrar_cambio(
                conn,
                TareaRef::Tarea(existing.id),
                Some(existing.progreso),
                ProgresoTarea::Pendiente,
                actor_id,
            )?;
        }

        diesel::update(tareas::table.find(existing.id))
            .set((
                tareas::analista_id.eq(None::<i32>),
                tareas::progreso.eq(ProgresoTarea::Pendiente),
                tareas::fecha_finalizacion.eq(None::<DateTime<Utc>>),
            ))
            .execute(conn)?;

        Ok(tareas::table.find(existing.id).first(conn)?)
    })?;

    Ok(Json(tarea_detalle(&mut conn, updated)?))
}

pub async fn delete_tarea(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(tarea_id): Path<i32>,
) -> AppResult<StatusCode> {
    require_role(&actor, &[UserRole::Supervisor])?;
    let mut conn = state.db()?;

    // Checklist items and history rows go with the task (ON DELETE CASCADE).
    let deleted = diesel::delete(tareas::table.find(tarea_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found_msg("tarea no encontrada"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn historial_estados(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(tarea_id): Path<i32>,
) -> AppResult<Json<Vec<HistorialEstadoInfo>>> {
    let mut conn = state.db()?;
    let tarea = load_tarea(&mut conn, tarea_id)?;
    if !puede_ver_tarea(&mut conn, &actor, &tarea)? {
        return Err(AppError::forbidden());
    }

    let historial = historial_con_autores(&mut conn, TareaRef::Tarea(tarea_id))?;
    Ok(Json(historial))
}
