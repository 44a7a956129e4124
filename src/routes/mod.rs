use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod analistas;
pub mod auth;
pub mod avisos;
pub mod bitacora;
pub mod campanas;
pub mod checklist;
pub mod comentarios;
pub mod health;
pub mod hhee;
pub mod incidencias;
pub mod tareas;
pub mod tareas_generadas;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let analistas_routes = Router::new()
        .route(
            "/",
            get(analistas::list_analistas).post(analistas::create_analista),
        )
        .route(
            "/:id",
            get(analistas::get_analista)
                .put(analistas::update_analista)
                .delete(analistas::deactivate_analista),
        )
        .route(
            "/:id/campanas/:campana_id",
            post(analistas::assign_campana).delete(analistas::unassign_campana),
        );

    let campanas_routes = Router::new()
        .route(
            "/",
            get(campanas::list_campanas).post(campanas::create_campana),
        )
        .route(
            "/:id",
            get(campanas::get_campana)
                .put(campanas::update_campana)
                .delete(campanas::delete_campana),
        )
        .route(
            "/:id/bitacora",
            get(bitacora::list_entradas).post(bitacora::create_entrada),
        )
        .route(
            "/:id/bitacora_general_comment",
            get(bitacora::get_comentario_general).put(bitacora::upsert_comentario_general),
        );

    let tareas_routes = Router::new()
        .route("/", get(tareas::list_tareas).post(tareas::create_tarea))
        .route(
            "/:id",
            get(tareas::get_tarea)
                .put(tareas::update_tarea)
                .delete(tareas::delete_tarea),
        )
        .route("/:id/asignar", post(tareas::claim_tarea))
        .route("/:id/liberar", post(tareas::release_tarea))
        .route("/:id/historial_estados", get(tareas::historial_estados));

    let tareas_generadas_routes = Router::new()
        .route("/", get(tareas_generadas::list_tareas_generadas))
        .route(
            "/:id",
            get(tareas_generadas::get_tarea_generada)
                .put(tareas_generadas::update_tarea_generada)
                .delete(tareas_generadas::delete_tarea_generada),
        )
        .route(
            "/:id/historial_estados",
            get(tareas_generadas::historial_estados),
        );

    let checklist_routes = Router::new()
        .route(
            "/",
            get(checklist::list_items).post(checklist::create_item),
        )
        .route(
            "/:id",
            put(checklist::update_item).delete(checklist::delete_item),
        );

    let comentarios_routes = Router::new()
        .route(
            "/",
            get(comentarios::list_comentarios).post(comentarios::create_comentario),
        )
        .route("/:id", delete(comentarios::delete_comentario));

    let avisos_routes = Router::new()
        .route("/", get(avisos::list_avisos).post(avisos::create_aviso))
        .route(
            "/:id",
            get(avisos::get_aviso)
                .put(avisos::update_aviso)
                .delete(avisos::delete_aviso),
        )
        .route("/:id/acuse_recibo", post(avisos::acusar_recibo));

    let incidencias_routes = Router::new()
        .route(
            "/",
            get(incidencias::list_incidencias).post(incidencias::create_incidencia),
        )
        .route("/:id", get(incidencias::get_incidencia))
        .route("/:id/estado", patch(incidencias::cambiar_estado))
        .route(
            "/:id/actualizaciones",
            post(incidencias::agregar_actualizacion),
        );

    let hhee_routes = Router::new()
        .route("/consultar-empleado", post(hhee::consultar_empleado))
        .route("/cargar-hhee", post(hhee::cargar_hhee));

    Router::new()
        .route("/token", post(auth::login))
        .route("/register", post(auth::register))
        .route("/users/me", get(auth::me))
        .route("/health", get(health::health_check))
        .nest("/analistas", analistas_routes)
        .nest("/campanas", campanas_routes)
        .nest("/tareas", tareas_routes)
        .nest("/tareas_generadas", tareas_generadas_routes)
        .nest("/checklist_items", checklist_routes)
        .nest("/comentarios_campana", comentarios_routes)
        .nest("/avisos", avisos_routes)
        .nest("/incidencias", incidencias_routes)
        .nest("/hhee", hhee_routes)
        .route("/bitacora_entradas/:id", put(bitacora::update_entrada))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
