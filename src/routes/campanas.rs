use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{require_role, CurrentAnalista},
    domain::{ProgresoTarea, UserRole},
    error::{AppError, AppResult},
    models::{Analista, Aviso, Campana, ComentarioCampana, NewCampana, Tarea},
    schema::{analistas, analistas_campanas, avisos, campanas, comentarios_campana, tareas},
    state::AppState,
};

use super::analistas::load_campana;
use super::auth::AnalistaInfo;

const GESTORES: &[UserRole] = &[UserRole::Supervisor, UserRole::Responsable];

#[derive(Deserialize)]
pub struct CampanaRequest {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub fecha_inicio: Option<DateTime<Utc>>,
    pub fecha_fin: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct TareaResumen {
    pub id: i32,
    pub titulo: String,
    pub progreso: ProgresoTarea,
    pub fecha_vencimiento: DateTime<Utc>,
    pub analista_id: Option<i32>,
}

impl From<Tarea> for TareaResumen {
    fn from(tarea: Tarea) -> Self {
        Self {
            id: tarea.id,
            titulo: tarea.titulo,
            progreso: tarea.progreso,
            fecha_vencimiento: tarea.fecha_vencimiento,
            analista_id: tarea.analista_id,
        }
    }
}

#[derive(Serialize)]
pub struct CampanaDetalle {
    #[serde(flatten)]
    pub campana: Campana,
    pub analistas_asignados: Vec<AnalistaInfo>,
    pub tareas: Vec<TareaResumen>,
    pub comentarios: Vec<ComentarioCampana>,
    pub avisos: Vec<Aviso>,
}

pub async fn create_campana(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Json(payload): Json<CampanaRequest>,
) -> AppResult<(StatusCode, Json<Campana>)> {
    require_role(&actor, GESTORES)?;
    if payload.nombre.trim().is_empty() {
        return Err(AppError::bad_request("el nombre no puede estar vacio"));
    }

    let mut conn = state.db()?;
    let campana: Campana = diesel::insert_into(campanas::table)
        .values(&NewCampana {
            nombre: payload.nombre.trim().to_string(),
            descripcion: payload.descripcion,
            fecha_inicio: payload.fecha_inicio,
            fecha_fin: payload.fecha_fin,
        })
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(campana)))
}

pub async fn list_campanas(
    State(state): State<AppState>,
    CurrentAnalista(_actor): CurrentAnalista,
) -> AppResult<Json<Vec<Campana>>> {
    let mut conn = state.db()?;
    let rows: Vec<Campana> = campanas::table.order(campanas::nombre.asc()).load(&mut conn)?;
    Ok(Json(rows))
}

pub async fn get_campana(
    State(state): State<AppState>,
    CurrentAnalista(_actor): CurrentAnalista,
    Path(campana_id): Path<i32>,
) -> AppResult<Json<CampanaDetalle>> {
    let mut conn = state.db()?;
    let campana = load_campana(&mut conn, campana_id)?;

    let asignados: Vec<Analista> = analistas_campanas::table
        .inner_join(analistas::table)
        .filter(analistas_campanas::campana_id.eq(campana_id))
        .select(analistas::all_columns)
        .load(&mut conn)?;

    let tareas_de_campana: Vec<Tarea> = tareas::table
        .filter(tareas::campana_id.eq(campana_id))
        .order(tareas::fecha_vencimiento.asc())
        .load(&mut conn)?;

    let comentarios: Vec<ComentarioCampana> = comentarios_campana::table
        .filter(comentarios_campana::campana_id.eq(campana_id))
        .order(comentarios_campana::fecha_creacion.desc())
        .load(&mut conn)?;

    let avisos_de_campana: Vec<Aviso> = avisos::table
        .filter(avisos::campana_id.eq(campana_id))
        .order(avisos::fecha_creacion.desc())
        .load(&mut conn)?;

    Ok(Json(CampanaDetalle {
        campana,
        analistas_asignados: asignados.into_iter().map(AnalistaInfo::from).collect(),
        tareas: tareas_de_campana.into_iter().map(TareaResumen::from).collect(),
        comentarios,
        avisos: avisos_de_campana,
    }))
}

pub async fn update_campana(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(campana_id): Path<i32>,
    Json(payload): Json<CampanaRequest>,
) -> AppResult<Json<Campana>> {
    require_role(&actor, GESTORES)?;
    let mut conn = state.db()?;
    load_campana(&mut conn, campana_id)?;

    diesel::update(campanas::table.find(campana_id))
        .set((
            campanas::nombre.eq(payload.nombre),
            campanas::descripcion.eq(payload.descripcion),
            campanas::fecha_inicio.eq(payload.fecha_inicio),
            campanas::fecha_fin.eq(payload.fecha_fin),
        ))
        .execute(&mut conn)?;

    let updated: Campana = campanas::table.find(campana_id).first(&mut conn)?;
    Ok(Json(updated))
}

pub async fn delete_campana(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(campana_id): Path<i32>,
) -> AppResult<StatusCode> {
    require_role(&actor, GESTORES)?;
    let mut conn = state.db()?;

    let deleted = diesel::delete(campanas::table.find(campana_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found_msg("campaña no encontrada"));
    }

    Ok(StatusCode::NO_CONTENT)
}
