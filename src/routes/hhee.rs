use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, Json};
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    attendance::{normalizar_rut, DiaAsistencia},
    auth::{require_role, CurrentAnalista},
    domain::{EstadoValidacion, UserRole},
    error::{AppError, AppResult},
    models::{NewValidacionHHEE, ValidacionHHEE},
    schema::validaciones_hhee,
    state::AppState,
};

const GESTORES: &[UserRole] = &[UserRole::Supervisor, UserRole::Responsable];

#[derive(Deserialize)]
pub struct ConsultaHHEE {
    pub rut: String,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
}

#[derive(Serialize)]
pub struct DiaConEstado {
    #[serde(flatten)]
    pub dia: DiaAsistencia,
    pub estado_final: EstadoValidacion,
    pub cantidad_hhee_aprobadas: Option<f64>,
    pub notas: Option<String>,
}

#[derive(Serialize)]
pub struct ConsultaResponse {
    pub nombre_agente: String,
    pub datos_periodo: Vec<DiaConEstado>,
}

#[derive(Deserialize)]
pub struct CargaHHEERequest {
    pub validaciones: Vec<CargaValidacionDia>,
}

#[derive(Deserialize)]
pub struct CargaValidacionDia {
    pub rut: String,
    pub nombre_apellido: String,
    pub campana: Option<String>,
    pub fecha: NaiveDate,
    #[serde(default)]
    pub turno_es_incorrecto: bool,
    #[serde(default)]
    pub hhee_aprobadas_inicio: f64,
    #[serde(default)]
    pub hhee_aprobadas_fin: f64,
    #[serde(default)]
    pub hhee_aprobadas_descanso: f64,
    pub nota: Option<String>,
}

#[derive(Serialize)]
pub struct CargaHHEEResponse {
    pub guardados: usize,
}

/// Daily rollup over the stored validations: a pending correction wins over a
/// validated record, which wins over nothing saved.
fn rollup_estado(estados: &[EstadoValidacion]) -> EstadoValidacion {
    if estados
        .iter()
        .any(|e| *e == EstadoValidacion::PendientePorCorreccion)
    {
        EstadoValidacion::PendientePorCorreccion
    } else if estados.iter().any(|e| *e == EstadoValidacion::Validado) {
        EstadoValidacion::Validado
    } else {
        EstadoValidacion::NoGuardado
    }
}

pub async fn consultar_empleado(
    State(state): State<AppState>,
    CurrentAnalista(_actor): CurrentAnalista,
    Json(consulta): Json<ConsultaHHEE>,
) -> AppResult<Json<ConsultaResponse>> {
    if consulta.fecha_inicio > consulta.fecha_fin {
        return Err(AppError::bad_request(
            "la fecha de inicio no puede ser posterior a la fecha de fin",
        ));
    }

    let rut = normalizar_rut(&consulta.rut);
    let dias = state
        .attendance
        .fetch_period(&rut, consulta.fecha_inicio, consulta.fecha_fin)
        .await
        .map_err(|err| AppError::service_unavailable(err.to_string()))?;

    if dias.is_empty() {
        return Err(AppError::not_found_msg(
            "no se encontraron datos de asistencia para el RUT y periodo seleccionados",
        ));
    }

    let mut conn = state.db()?;
    let guardadas: Vec<ValidacionHHEE> = validaciones_hhee::table
        .filter(validaciones_hhee::rut.eq(&rut))
        .filter(validaciones_hhee::fecha_hhee.between(consulta.fecha_inicio, consulta.fecha_fin))
        .load(&mut conn)?;

    let mut por_fecha: HashMap<NaiveDate, Vec<&ValidacionHHEE>> = HashMap::new();
    for validacion in &guardadas {
        por_fecha.entry(validacion.fecha_hhee).or_default().push(validacion);
    }

    let nombre_agente = dias
        .first()
        .map(|d| d.nombre_apellido.clone())
        .unwrap_or_default();

    let datos_periodo = dias
        .into_iter()
        .map(|dia| {
            let registros = por_fecha.get(&dia.fecha);
            let estados: Vec<EstadoValidacion> = registros
                .map(|rs| rs.iter().map(|r| r.estado).collect())
                .unwrap_or_default();
            let estado_final = rollup_estado(&estados);

            let cantidad_hhee_aprobadas = registros.map(|rs| {
                rs.iter()
                    .filter(|r| r.estado == EstadoValidacion::Validado)
                    .map(|r| r.horas_aprobadas)
                    .sum()
            });
            let notas = registros.and_then(|rs| rs.iter().find_map(|r| r.notas.clone()));

            DiaConEstado {
                dia,
                estado_final,
                cantidad_hhee_aprobadas,
                notas,
            }
        })
        .collect();

    Ok(Json(ConsultaResponse {
        nombre_agente,
        datos_periodo,
    }))
}

pub async fn cargar_hhee(
    State(state): State<AppState>,
    CurrentAnalista(actor): CurrentAnalista,
    Json(payload): Json<CargaHHEERequest>,
) -> AppResult<(StatusCode, Json<CargaHHEEResponse>)> {
    require_role(&actor, GESTORES)?;
    if payload.validaciones.is_empty() {
        return Err(AppError::bad_request("no hay validaciones para guardar"));
    }

    let correo_supervisor = actor.email.clone();
    let mut conn = state.db()?;

    let guardados = conn.transaction::<usize, AppError, _>(|conn| {
        let mut guardados = 0;
        for dia in payload.validaciones {
            let (estado, horas_aprobadas) = if dia.turno_es_incorrecto {
                (EstadoValidacion::PendientePorCorreccion, 0.0)
            } else {
                (
                    EstadoValidacion::Validado,
                    dia.hhee_aprobadas_inicio
                        + dia.hhee_aprobadas_fin
                        + dia.hhee_aprobadas_descanso,
                )
            };

            let row = NewValidacionHHEE {
                rut: normalizar_rut(&dia.rut),
                nombre_apellido: dia.nombre_apellido,
                campana: dia.campana,
                fecha_hhee: dia.fecha,
                correo_supervisor: correo_supervisor.clone(),
                horas_aprobadas,
                estado,
                notas: dia.nota,
            };

            diesel::insert_into(validaciones_hhee::table)
                .values(&row)
                .on_conflict((validaciones_hhee::rut, validaciones_hhee::fecha_hhee))
                .do_update()
                .set((
                    validaciones_hhee::nombre_apellido.eq(&row.nombre_apellido),
                    validaciones_hhee::campana.eq(&row.campana),
                    validaciones_hhee::correo_supervisor.eq(&row.correo_supervisor),
                    validaciones_hhee::horas_aprobadas.eq(row.horas_aprobadas),
                    validaciones_hhee::estado.eq(row.estado),
                    validaciones_hhee::notas.eq(&row.notas),
                    validaciones_hhee::fecha_ultima_actualizacion.eq(Utc::now()),
                ))
                .execute(conn)?;
            guardados += 1;
        }
        Ok(guardados)
    })?;

    Ok((StatusCode::CREATED, Json(CargaHHEEResponse { guardados })))
}
