use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::domain::{ProgresoTarea, TareaRef};
use crate::models::{HistorialEstadoTarea, NewHistorialEstadoTarea};
use crate::schema::historial_estados_tarea;

/// Appends one history row for a progress change. `anterior` is `None` only
/// for the row written when the task is created.
pub fn registrar_cambio(
    conn: &mut PgConnection,
    parent: TareaRef,
    anterior: Option<ProgresoTarea>,
    nuevo: ProgresoTarea,
    analista_id: i32,
) -> QueryResult<()> {
    let row = NewHistorialEstadoTarea {
        tarea_id: parent.tarea_id(),
        tarea_generada_id: parent.tarea_generada_id(),
        progreso_anterior: anterior,
        progreso_nuevo: nuevo,
        analista_id,
    };

    diesel::insert_into(historial_estados_tarea::table)
        .values(&row)
        .execute(conn)?;
    Ok(())
}

pub fn historial_de(
    conn: &mut PgConnection,
    parent: TareaRef,
) -> QueryResult<Vec<HistorialEstadoTarea>> {
    // Two rows written in the same transaction share now(), so break ties by id.
    let query = historial_estados_tarea::table
        .order((
            historial_estados_tarea::fecha_cambio.asc(),
            historial_estados_tarea::id.asc(),
        ))
        .into_boxed();

    let query = match parent {
        TareaRef::Tarea(id) => query.filter(historial_estados_tarea::tarea_id.eq(id)),
        TareaRef::Generada(id) => {
            query.filter(historial_estados_tarea::tarea_generada_id.eq(id))
        }
    };

    query.load(conn)
}

/// Completion timestamp after a transition: stamped when the task enters a
/// closed state, cleared when it leaves one.
pub fn fecha_finalizacion_tras(
    nuevo: ProgresoTarea,
    ahora: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if nuevo.es_cierre() {
        Some(ahora)
    } else {
        None
    }
}
