mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use portal_gtr::domain::{ProgresoTarea, UserRole};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct AvisoInfo {
    id: i32,
    titulo: String,
}

#[derive(Deserialize)]
struct TareaGeneradaInfo {
    id: i32,
    progreso: ProgresoTarea,
    fecha_vencimiento: Option<String>,
    analista_id: i32,
}

#[derive(Deserialize)]
struct AcuseResponse {
    id: i32,
    tarea_generada: Option<TareaGeneradaInfo>,
}

#[derive(Deserialize)]
struct CampanaInfo {
    id: i32,
}

#[tokio::test]
async fn acknowledgment_conflicts_and_generates_one_task() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_analista("Sofia", "super@x.com", 10001, UserRole::Supervisor, "pw")
        .await?;
    app.insert_analista("Ana", "ana@x.com", 10002, UserRole::Analista, "pw")
        .await?;

    let supervisor_token = app.login_token("super@x.com", "pw").await?;
    let analista_token = app.login_token("ana@x.com", "pw").await?;

    let vencimiento_tarea = "2026-09-15T18:00:00Z";
    let response = app
        .post_json(
            "/avisos",
            &json!({
                "titulo": "Nuevo protocolo",
                "contenido": "Leer y aplicar el protocolo actualizado.",
                "requiere_tarea": true,
                "fecha_vencimiento_tarea": vencimiento_tarea
            }),
            Some(&supervisor_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let aviso: AvisoInfo = serde_json::from_slice(&body)?;

    let response = app
        .post_json(
            &format!("/avisos/{}/acuse_recibo", aviso.id),
            &json!({}),
            Some(&analista_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let acuse: AcuseResponse = serde_json::from_slice(&body)?;
    assert!(acuse.id > 0);

    let generada = acuse.tarea_generada.expect("generated task");
    assert_eq!(generada.progreso, ProgresoTarea::Pendiente);
    assert_eq!(
        generada.fecha_vencimiento.as_deref(),
        Some(vencimiento_tarea)
    );

    // Second acknowledgment conflicts and no second task appears.
    let response = app
        .post_json(
            &format!("/avisos/{}/acuse_recibo", aviso.id),
            &json!({}),
            Some(&analista_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.get("/tareas_generadas", Some(&analista_token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let generadas: Vec<TareaGeneradaInfo> = serde_json::from_slice(&body)?;
    assert_eq!(generadas.len(), 1);
    assert_eq!(generadas[0].id, generada.id);

    // The generated task carries its initial history row.
    #[derive(Deserialize)]
    struct HistorialEntry {
        old_progreso: Option<ProgresoTarea>,
        new_progreso: ProgresoTarea,
    }
    let response = app
        .get(
            &format!("/tareas_generadas/{}/historial_estados", generada.id),
            Some(&analista_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let historial: Vec<HistorialEntry> = serde_json::from_slice(&body)?;
    assert_eq!(historial.len(), 1);
    assert_eq!(historial[0].old_progreso, None);
    assert_eq!(historial[0].new_progreso, ProgresoTarea::Pendiente);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn notice_requiring_task_needs_due_date() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_analista("Sofia", "super@x.com", 10001, UserRole::Supervisor, "pw")
        .await?;
    let token = app.login_token("super@x.com", "pw").await?;

    let response = app
        .post_json(
            "/avisos",
            &json!({
                "titulo": "Sin vencimiento",
                "contenido": "Contenido",
                "requiere_tarea": true
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn analyst_visibility_over_notices() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_analista("Sofia", "super@x.com", 10001, UserRole::Supervisor, "pw")
        .await?;
    let ana_id = app
        .insert_analista("Ana", "ana@x.com", 10002, UserRole::Analista, "pw")
        .await?;

    let supervisor_token = app.login_token("super@x.com", "pw").await?;
    let analista_token = app.login_token("ana@x.com", "pw").await?;

    let response = app
        .post_json("/campanas", &json!({ "nombre": "Asignada" }), Some(&supervisor_token))
        .await?;
    let body = body_to_vec(response.into_body()).await?;
    let asignada: CampanaInfo = serde_json::from_slice(&body)?;

    let response = app
        .post_json("/campanas", &json!({ "nombre": "Ajena" }), Some(&supervisor_token))
        .await?;
    let body = body_to_vec(response.into_body()).await?;
    let ajena: CampanaInfo = serde_json::from_slice(&body)?;

    let response = app
        .post_json(
            &format!("/analistas/{ana_id}/campanas/{}", asignada.id),
            &json!({}),
            Some(&supervisor_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    for (titulo, campana_id) in [
        ("General", None),
        ("De mi campaña", Some(asignada.id)),
        ("De otra campaña", Some(ajena.id)),
    ] {
        let response = app
            .post_json(
                "/avisos",
                &json!({
                    "titulo": titulo,
                    "contenido": "Contenido",
                    "campana_id": campana_id
                }),
                Some(&supervisor_token),
            )
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.get("/avisos", Some(&analista_token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let visibles: Vec<AvisoInfo> = serde_json::from_slice(&body)?;
    let titulos: Vec<&str> = visibles.iter().map(|a| a.titulo.as_str()).collect();

    assert!(titulos.contains(&"General"));
    assert!(titulos.contains(&"De mi campaña"));
    assert!(!titulos.contains(&"De otra campaña"));

    // The supervisor sees everything.
    let response = app.get("/avisos", Some(&supervisor_token)).await?;
    let body = body_to_vec(response.into_body()).await?;
    let todos: Vec<AvisoInfo> = serde_json::from_slice(&body)?;
    assert_eq!(todos.len(), 3);

    app.cleanup().await?;
    Ok(())
}
