use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;

use crate::{
    auth::CurrentAnalista,
    domain::UserRole,
    error::{AppError, AppResult},
    models::{ComentarioCampana, NewComentarioCampana},
    schema::comentarios_campana,
    state::AppState,
};

use super::analistas::{load_analista, load_campana};

#[derive(Deserialize)]
pub struct CreateComentarioRequest {
    pub campana_id: i32,
    pub analista_id: i32,
    pub contenido: String,
}

#[derive(Deserialize)]
pub struct ComentariosQuery {
    pub campana_id: Option<i32>,
    pub analista_id: Option<i32>,
}

pub async fn create_comentario(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Json(payload): Json<CreateComentarioRequest>,
) -> AppResult<(StatusCode, Json<ComentarioCampana>)> {
    if actor.role == UserRole::Analista && payload.analista_id != actor.id {
        return Err(AppError::forbidden());
    }

    let mut conn = state.db()?;
    load_analista(&mut conn, payload.analista_id)?;
    load_campana(&mut conn, payload.campana_id)?;

    let comentario: ComentarioCampana = diesel::insert_into(comentarios_campana::table)
        .values(&NewComentarioCampana {
            contenido: payload.contenido,
            analista_id: payload.analista_id,
            campana_id: payload.campana_id,
        })
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(comentario)))
}

pub async fn list_comentarios(
    State(state): State<AppState>,
    CurrentAnalista(_actor): CurrentAnalista,
    Query(filtros): Query<ComentariosQuery>,
) -> AppResult<Json<Vec<ComentarioCampana>>> {
    let mut conn = state.db()?;

    let mut query = comentarios_campana::table
        .order(comentarios_campana::fecha_creacion.desc())
        .into_boxed();
    if let Some(campana_id) = filtros.campana_id {
        query = query.filter(comentarios_campana::campana_id.eq(campana_id));
    }
    if let Some(analista_id) = filtros.analista_id {
        query = query.filter(comentarios_campana::analista_id.eq(analista_id));
    }

    let comentarios: Vec<ComentarioCampana> = query.load(&mut conn)?;
    Ok(Json(comentarios))
}

pub async fn delete_comentario(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(comentario_id): Path<i32>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;

    let existing: ComentarioCampana = comentarios_campana::table
        .find(comentario_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("comentario de campaña no encontrado"))?;

    if !actor.role.es_gestor() && existing.analista_id != actor.id {
        return Err(AppError::forbidden());
    }

    diesel::delete(comentarios_campana::table.find(comentario_id)).execute(&mut conn)?;
    Ok(StatusCode::NO_CONTENT)
}
