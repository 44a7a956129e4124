use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::{prelude::*, PgConnection};
use serde::Deserialize;

use crate::{
    auth::CurrentAnalista,
    error::{AppError, AppResult},
    models::{Analista, ChecklistItem, NewChecklistItem, Tarea},
    schema::checklist_items,
    state::AppState,
};

use super::tareas::load_tarea;

#[derive(Deserialize)]
pub struct CreateChecklistItemRequest {
    pub tarea_id: i32,
    pub descripcion: String,
    #[serde(default)]
    pub completado: bool,
}

#[derive(Deserialize)]
pub struct UpdateChecklistItemRequest {
    pub descripcion: Option<String>,
    pub completado: Option<bool>,
}

#[derive(Deserialize)]
pub struct ChecklistQuery {
    pub tarea_id: Option<i32>,
}

fn puede_editar_checklist(actor: &Analista, tarea: &Tarea) -> Result<(), AppError> {
    if actor.role.es_gestor() || tarea.analista_id == Some(actor.id) {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

fn load_item(conn: &mut PgConnection, item_id: i32) -> AppResult<ChecklistItem> {
    checklist_items::table
        .find(item_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("checklist item no encontrado"))
}

pub async fn create_item(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Json(payload): Json<CreateChecklistItemRequest>,
) -> AppResult<(StatusCode, Json<ChecklistItem>)> {
    let mut conn = state.db()?;
    let tarea = load_tarea(&mut conn, payload.tarea_id)?;
    puede_editar_checklist(&actor, &tarea)?;

    if payload.descripcion.trim().is_empty() {
        return Err(AppError::bad_request("la descripcion no puede estar vacia"));
    }

    let item: ChecklistItem = diesel::insert_into(checklist_items::table)
        .values(&NewChecklistItem {
            descripcion: payload.descripcion,
            completado: payload.completado,
            tarea_id: payload.tarea_id,
        })
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list_items(
    State(state): State<AppState>,
    CurrentAnalista(_actor): CurrentAnalista,
    Query(filtros): Query<ChecklistQuery>,
) -> AppResult<Json<Vec<ChecklistItem>>> {
    let mut conn = state.db()?;

    let mut query = checklist_items::table
        .order(checklist_items::fecha_creacion.asc())
        .into_boxed();
    if let Some(tarea_id) = filtros.tarea_id {
        query = query.filter(checklist_items::tarea_id.eq(tarea_id));
    }

    let items: Vec<ChecklistItem> = query.load(&mut conn)?;
    Ok(Json(items))
}

pub async fn update_item(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(item_id): Path<i32>,
    Json(payload): Json<UpdateChecklistItemRequest>,
) -> AppResult<Json<ChecklistItem>> {
    let mut conn = state.db()?;
    let existing = load_item(&mut conn, item_id)?;
    let tarea = load_tarea(&mut conn, existing.tarea_id)?;
    puede_editar_checklist(&actor, &tarea)?;

    diesel::update(checklist_items::table.find(item_id))
        .set((
            checklist_items::descripcion.eq(payload.descripcion.unwrap_or(existing.descripcion)),
            checklist_items::completado.eq(payload.completado.unwrap_or(existing.completado)),
        ))
        .execute(&mut conn)?;

    let updated: ChecklistItem = checklist_items::table.find(item_id).first(&mut conn)?;
    Ok(Json(updated))
}

pub async fn delete_item(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(item_id): Path<i32>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let existing = load_item(&mut conn, item_id)?;
    let tarea = load_tarea(&mut conn, existing.tarea_id)?;
    puede_editar_checklist(&actor, &tarea)?;

    diesel::delete(checklist_items::table.find(item_id)).execute(&mut conn)?;
    Ok(StatusCode::NO_CONTENT)
}
