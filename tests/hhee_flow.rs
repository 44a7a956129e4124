mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{acquire_db_lock, body_to_vec, TestApp};
use diesel::prelude::*;
use portal_gtr::attendance::DiaAsistencia;
use portal_gtr::domain::{EstadoValidacion, UserRole};
use portal_gtr::models::ValidacionHHEE;
use portal_gtr::schema::validaciones_hhee;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct ConsultaResponse {
    nombre_agente: String,
    datos_periodo: Vec<DiaConEstado>,
}

#[derive(Deserialize)]
struct DiaConEstado {
    fecha: NaiveDate,
    estado_final: EstadoValidacion,
    cantidad_hhee_aprobadas: Option<f64>,
    notas: Option<String>,
}

fn dia(fecha: &str) -> DiaAsistencia {
    DiaAsistencia {
        fecha: fecha.parse().expect("valid date"),
        nombre_apellido: "Ana Perez".to_string(),
        campana: Some("Mesa Ayuda".to_string()),
        inicio_turno_teorico: Some("09:00".to_string()),
        fin_turno_teorico: Some("18:00".to_string()),
        marca_real_inicio: Some("08:45".to_string()),
        marca_real_fin: Some("19:10".to_string()),
        hhee_autorizadas_antes_gv: 0.0,
        hhee_autorizadas_despues_gv: 1.0,
    }
}

async fn cargar_validaciones(app: &TestApp, token: &str) -> Result<()> {
    let response = app
        .post_json(
            "/hhee/cargar-hhee",
            &json!({
                "validaciones": [
                    {
                        "rut": "12.345.678-9",
                        "nombre_apellido": "Ana Perez",
                        "campana": "Mesa Ayuda",
                        "fecha": "2026-03-02",
                        "hhee_aprobadas_inicio": 0.25,
                        "hhee_aprobadas_fin": 1.0,
                        "hhee_aprobadas_descanso": 0.0
                    },
                    {
                        "rut": "12.345.678-9",
                        "nombre_apellido": "Ana Perez",
                        "campana": "Mesa Ayuda",
                        "fecha": "2026-03-03",
                        "turno_es_incorrecto": true,
                        "nota": "Pendiente de cambio de turno"
                    }
                ]
            }),
            Some(token),
        )
        .await?;
    anyhow::ensure!(
        response.status() == StatusCode::CREATED,
        "cargar-hhee failed with {}",
        response.status()
    );
    Ok(())
}

#[tokio::test]
async fn consultar_merges_stored_validations_into_rollup() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_analista("Sofia", "super@x.com", 10001, UserRole::Supervisor, "pw")
        .await?;
    let token = app.login_token("super@x.com", "pw").await?;

    app.attendance()
        .set_dias(vec![dia("2026-03-01"), dia("2026-03-02"), dia("2026-03-03")])
        .await;

    cargar_validaciones(&app, &token).await?;

    let response = app
        .post_json(
            "/hhee/consultar-empleado",
            &json!({
                "rut": "12.345.678-9",
                "fecha_inicio": "2026-03-01",
                "fecha_fin": "2026-03-03"
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let consulta: ConsultaResponse = serde_json::from_slice(&body)?;

    assert_eq!(consulta.nombre_agente, "Ana Perez");
    assert_eq!(consulta.datos_periodo.len(), 3);

    let primero = &consulta.datos_periodo[0];
    assert_eq!(primero.estado_final, EstadoValidacion::NoGuardado);
    assert_eq!(primero.cantidad_hhee_aprobadas, None);

    let segundo = &consulta.datos_periodo[1];
    assert_eq!(segundo.fecha, "2026-03-02".parse::<NaiveDate>()?);
    assert_eq!(segundo.estado_final, EstadoValidacion::Validado);
    assert_eq!(segundo.cantidad_hhee_aprobadas, Some(1.25));

    let tercero = &consulta.datos_periodo[2];
    assert_eq!(
        tercero.estado_final,
        EstadoValidacion::PendientePorCorreccion
    );
    assert_eq!(tercero.notas.as_deref(), Some("Pendiente de cambio de turno"));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn consultar_maps_provider_failures() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_analista("Sofia", "super@x.com", 10001, UserRole::Supervisor, "pw")
        .await?;
    let token = app.login_token("super@x.com", "pw").await?;

    let consulta = json!({
        "rut": "12.345.678-9",
        "fecha_inicio": "2026-03-01",
        "fecha_fin": "2026-03-03"
    });

    // Provider down: fail closed with 503.
    app.attendance().set_unavailable(true).await;
    let response = app
        .post_json("/hhee/consultar-empleado", &consulta, Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Provider reachable but without data for the range: 404.
    app.attendance().set_unavailable(false).await;
    app.attendance().set_dias(vec![]).await;
    let response = app
        .post_json("/hhee/consultar-empleado", &consulta, Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Inverted range never reaches the provider.
    let response = app
        .post_json(
            "/hhee/consultar-empleado",
            &json!({
                "rut": "12.345.678-9",
                "fecha_inicio": "2026-03-03",
                "fecha_fin": "2026-03-01"
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn cargar_upserts_by_rut_and_date() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_analista("Sofia", "super@x.com", 10001, UserRole::Supervisor, "pw")
        .await?;
    app.insert_analista("Ana", "ana@x.com", 10002, UserRole::Analista, "pw")
        .await?;
    let supervisor_token = app.login_token("super@x.com", "pw").await?;
    let analista_token = app.login_token("ana@x.com", "pw").await?;

    // Loading validations is supervisor work.
    let response = app
        .post_json(
            "/hhee/cargar-hhee",
            &json!({ "validaciones": [] }),
            Some(&analista_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    cargar_validaciones(&app, &supervisor_token).await?;

    let rows = app
        .with_conn(|conn| {
            validaciones_hhee::table
                .order(validaciones_hhee::fecha_hhee.asc())
                .load::<ValidacionHHEE>(conn)
                .context("failed to load validaciones")
        })
        .await?;
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].rut, "123456789");
    assert_eq!(rows[0].estado, EstadoValidacion::Validado);
    assert_eq!(rows[0].horas_aprobadas, 1.25);
    assert_eq!(rows[0].correo_supervisor, "super@x.com");

    assert_eq!(rows[1].estado, EstadoValidacion::PendientePorCorreccion);
    assert_eq!(rows[1].horas_aprobadas, 0.0);
    assert_eq!(rows[1].notas.as_deref(), Some("Pendiente de cambio de turno"));

    // Re-validating the pending day replaces the row instead of duplicating it.
    let response = app
        .post_json(
            "/hhee/cargar-hhee",
            &json!({
                "validaciones": [{
                    "rut": "12.345.678-9",
                    "nombre_apellido": "Ana Perez",
                    "fecha": "2026-03-03",
                    "hhee_aprobadas_inicio": 0.5,
                    "hhee_aprobadas_fin": 0.5,
                    "hhee_aprobadas_descanso": 0.0
                }]
            }),
            Some(&supervisor_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let rows = app
        .with_conn(|conn| {
            validaciones_hhee::table
                .filter(validaciones_hhee::fecha_hhee.eq("2026-03-03".parse::<NaiveDate>()?))
                .load::<ValidacionHHEE>(conn)
                .context("failed to load validaciones")
        })
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].estado, EstadoValidacion::Validado);
    assert_eq!(rows[0].horas_aprobadas, 1.0);

    app.cleanup().await?;
    Ok(())
}
