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
    domain::{ProgresoTarea, TareaRef, UserRole},
    error::{AppError, AppResult},
    historial,
    models::{
        AcuseReciboAviso, Aviso, NewAcuseReciboAviso, NewAviso, NewTareaGenerada, TareaGenerada,
    },
    schema::{acuses_recibo_avisos, avisos, tareas_generadas},
    state::AppState,
};

use super::analistas::{campanas_asignadas_ids, load_analista, load_campana};

#[derive(Deserialize)]
pub struct CreateAvisoRequest {
    pub titulo: String,
    pub contenido: String,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub campana_id: Option<i32>,
    #[serde(default)]
    pub requiere_tarea: bool,
    pub fecha_vencimiento_tarea: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateAvisoRequest {
    pub titulo: Option<String>,
    pub contenido: Option<String>,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub campana_id: Option<i32>,
    pub requiere_tarea: Option<bool>,
    pub fecha_vencimiento_tarea: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct AvisosQuery {
    pub creador_id: Option<i32>,
    pub campana_id: Option<i32>,
}

#[derive(Deserialize, Default)]
pub struct AcuseReciboRequest {
    pub analista_id: Option<i32>,
}

#[derive(Serialize)]
pub struct AvisoDetalle {
    #[serde(flatten)]
    pub aviso: Aviso,
    pub acuses_recibo: Vec<AcuseReciboAviso>,
}

#[derive(Serialize)]
pub struct AcuseReciboResponse {
    #[serde(flatten)]
    pub acuse: AcuseReciboAviso,
    pub tarea_generada: Option<TareaGenerada>,
}

pub(crate) fn load_aviso(conn: &mut PgConnection, aviso_id: i32) -> AppResult<Aviso> {
    avisos::table
        .find(aviso_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_msg("aviso no encontrado"))
}

fn validar_requiere_tarea(requiere_tarea: bool, vencimiento: Option<DateTime<Utc>>) -> AppResult<()> {
    if requiere_tarea && vencimiento.is_none() {
        return Err(AppError::bad_request(
            "un aviso que requiere tarea necesita fecha de vencimiento para la tarea",
        ));
    }
    Ok(())
}

pub async fn create_aviso(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Json(payload): Json<CreateAvisoRequest>,
) -> AppResult<(StatusCode, Json<Aviso>)> {
    validar_requiere_tarea(payload.requiere_tarea, payload.fecha_vencimiento_tarea)?;

    let mut conn = state.db()?;
    if let Some(campana_id) = payload.campana_id {
        load_campana(&mut conn, campana_id)?;
    }

    let aviso: Aviso = diesel::insert_into(avisos::table)
        .values(&NewAviso {
            titulo: payload.titulo,
            contenido: payload.contenido,
            fecha_vencimiento: payload.fecha_vencimiento,
            creador_id: actor.id,
            campana_id: payload.campana_id,
            requiere_tarea: payload.requiere_tarea,
            fecha_vencimiento_tarea: payload.fecha_vencimiento_tarea,
        })
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(aviso)))
}

pub async fn list_avisos(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Query(filtros): Query<AvisosQuery>,
) -> AppResult<Json<Vec<Aviso>>> {
    let mut conn = state.db()?;

    let rows: Vec<Aviso> = if actor.role.es_gestor() {
        let mut query = avisos::table.order(avisos::fecha_creacion.desc()).into_boxed();
        if let Some(creador_id) = filtros.creador_id {
            query = query.filter(avisos::creador_id.eq(creador_id));
        }
        if let Some(campana_id) = filtros.campana_id {
            query = query.filter(avisos::campana_id.eq(campana_id));
        }
        query.load(&mut conn)?
    } else {
        // Own notices, general notices, and notices of assigned campaigns.
        let mis_campanas = campanas_asignadas_ids(&mut conn, actor.id)?;
        avisos::table
            .filter(
                avisos::creador_id
                    .eq(actor.id)
                    .or(avisos::campana_id.is_null())
                    .or(avisos::campana_id.eq_any(mis_campanas)),
            )
            .order(avisos::fecha_creacion.desc())
            .load(&mut conn)?
    };

    Ok(Json(rows))
}

pub async fn get_aviso(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(aviso_id): Path<i32>,
) -> AppResult<Json<AvisoDetalle>> {
    let mut conn = state.db()?;
    let aviso = load_aviso(&mut conn, aviso_id)?;

    if !actor.role.es_gestor() && aviso.creador_id != actor.id {
        if let Some(campana_id) = aviso.campana_id {
            if !super::analistas::esta_asignado(&mut conn, actor.id, campana_id)? {
                return Err(AppError::forbidden());
            }
        }
    }

    let acuses: Vec<AcuseReciboAviso> = acuses_recibo_avisos::table
        .filter(acuses_recibo_avisos::aviso_id.eq(aviso_id))
        .order(acuses_recibo_avisos::fecha_acuse.asc())
        .load(&mut conn)?;

    Ok(Json(AvisoDetalle {
        aviso,
        acuses_recibo: acuses,
    }))
}

pub async fn update_aviso(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(aviso_id): Path<i32>,
    Json(payload): Json<UpdateAvisoRequest>,
) -> AppResult<Json<Aviso>> {
    let mut conn = state.db()?;
    let existing = load_aviso(&mut conn, aviso_id)?;

    if !actor.role.es_gestor() && existing.creador_id != actor.id {
        return Err(AppError::forbidden());
    }

    if let Some(campana_id) = payload.campana_id {
        load_campana(&mut conn, campana_id)?;
    }

    let requiere_tarea = payload.requiere_tarea.unwrap_or(existing.requiere_tarea);
    let vencimiento_tarea = payload
        .fecha_vencimiento_tarea
        .or(existing.fecha_vencimiento_tarea);
    validar_requiere_tarea(requiere_tarea, vencimiento_tarea)?;

    diesel::update(avisos::table.find(aviso_id))
        .set((
            avisos::titulo.eq(payload.titulo.unwrap_or(existing.titulo)),
            avisos::contenido.eq(payload.contenido.unwrap_or(existing.contenido)),
            avisos::fecha_vencimiento
                .eq(payload.fecha_vencimiento.or(existing.fecha_vencimiento)),
            avisos::campana_id.eq(payload.campana_id.or(existing.campana_id)),
            avisos::requiere_tarea.eq(requiere_tarea),
            avisos::fecha_vencimiento_tarea.eq(vencimiento_tarea),
        ))
        .execute(&mut conn)?;

    let updated: Aviso = avisos::table.find(aviso_id).first(&mut conn)?;
    Ok(Json(updated))
}

pub async fn delete_aviso(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(aviso_id): Path<i32>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let existing = load_aviso(&mut conn, aviso_id)?;

    if !actor.role.es_gestor() && existing.creador_id != actor.id {
        return Err(AppError::forbidden());
    }

    diesel::delete(avisos::table.find(aviso_id)).execute(&mut conn)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Registers an acknowledgment. When the notice requires a follow-up task, one
/// is generated at most once per (notice, analyst) pair; the duplicate-acuse
/// check runs first, so re-acknowledging never reaches the generation step.
pub async fn acusar_recibo(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Path(aviso_id): Path<i32>,
    payload: Option<Json<AcuseReciboRequest>>,
) -> AppResult<(StatusCode, Json<AcuseReciboResponse>)> {
    let analista_id = payload
        .and_then(|Json(p)| p.analista_id)
        .unwrap_or(actor.id);

    if actor.role == UserRole::Analista && analista_id != actor.id {
        return Err(AppError::forbidden());
    }

    let mut conn = state.db()?;
    let aviso = load_aviso(&mut conn, aviso_id)?;
    load_analista(&mut conn, analista_id)?;

    let duplicado = acuses_recibo_avisos::table
        .filter(acuses_recibo_avisos::aviso_id.eq(aviso_id))
        .filter(acuses_recibo_avisos::analista_id.eq(analista_id))
        .first::<AcuseReciboAviso>(&mut conn)
        .optional()?;
    if duplicado.is_some() {
        return Err(AppError::conflict(
            "el analista ya acuso recibo de este aviso",
        ));
    }

    let response = conn.transaction::<AcuseReciboResponse, AppError, _>(|conn| {
        let acuse: AcuseReciboAviso = diesel::insert_into(acuses_recibo_avisos::table)
            .values(&NewAcuseReciboAviso {
                aviso_id,
                analista_id,
            })
            .get_result(conn)?;

        let tarea_generada = if aviso.requiere_tarea {
            generar_tarea_si_falta(conn, &aviso, analista_id)?
        } else {
            None
        };

        Ok(AcuseReciboResponse {
            acuse,
            tarea_generada,
        })
    })?;

    Ok((StatusCode::CREATED, Json(response)))
}

fn generar_tarea_si_falta(
    conn: &mut PgConnection,
    aviso: &Aviso,
    analista_id: i32,
) -> Result<Option<TareaGenerada>, AppError> {
    let existente = tareas_generadas::table
        .filter(tareas_generadas::aviso_id.eq(aviso.id))
        .filter(tareas_generadas::analista_id.eq(analista_id))
        .first::<TareaGenerada>(conn)
        .optional()?;
    if existente.is_some() {
        return Ok(None);
    }

    let tarea: TareaGenerada = diesel::insert_into(tareas_generadas::table)
        .values(&NewTareaGenerada {
            titulo: format!("Tarea derivada del aviso: {}", aviso.titulo),
            descripcion: Some(aviso.contenido.clone()),
            fecha_vencimiento: aviso.fecha_vencimiento_tarea,
            progreso: ProgresoTarea::Pendiente,
            analista_id,
            aviso_id: Some(aviso.id),
        })
        .get_result(conn)?;

    historial::registrar_cambio(
        conn,
        TareaRef::Generada(tarea.id),
        None,
        ProgresoTarea::Pendiente,
        analista_id,
    )?;

    Ok(Some(tarea))
}
