use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::domain::{
    EstadoIncidencia, EstadoValidacion, ProgresoTarea, TipoIncidencia, UserRole,
};
use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = analistas)]
pub struct Analista {
    pub id: i32,
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub bms_id: i32,
    pub hashed_password: String,
    pub role: UserRole,
    pub esta_activo: bool,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = analistas)]
pub struct NewAnalista {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub bms_id: i32,
    pub hashed_password: String,
    pub role: UserRole,
    pub esta_activo: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = campanas)]
pub struct Campana {
    pub id: i32,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub fecha_inicio: Option<DateTime<Utc>>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = campanas)]
pub struct NewCampana {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub fecha_inicio: Option<DateTime<Utc>>,
    pub fecha_fin: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Associations)]
#[diesel(table_name = analistas_campanas)]
#[diesel(belongs_to(Analista))]
#[diesel(belongs_to(Campana))]
#[diesel(primary_key(analista_id, campana_id))]
pub struct AnalistaCampana {
    pub analista_id: i32,
    pub campana_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = analistas_campanas)]
pub struct NewAnalistaCampana {
    pub analista_id: i32,
    pub campana_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = tareas)]
#[diesel(belongs_to(Analista, foreign_key = analista_id))]
#[diesel(belongs_to(Campana, foreign_key = campana_id))]
pub struct Tarea {
    pub id: i32,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha_vencimiento: DateTime<Utc>,
    pub progreso: ProgresoTarea,
    pub analista_id: Option<i32>,
    pub campana_id: Option<i32>,
    pub fecha_finalizacion: Option<DateTime<Utc>>,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tareas)]
pub struct NewTarea {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha_vencimiento: DateTime<Utc>,
    pub progreso: ProgresoTarea,
    pub analista_id: Option<i32>,
    pub campana_id: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = checklist_items)]
#[diesel(belongs_to(Tarea, foreign_key = tarea_id))]
pub struct ChecklistItem {
    pub id: i32,
    pub descripcion: String,
    pub completado: bool,
    pub tarea_id: i32,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = checklist_items)]
pub struct NewChecklistItem {
    pub descripcion: String,
    pub completado: bool,
    pub tarea_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = comentarios_campana)]
pub struct ComentarioCampana {
    pub id: i32,
    pub contenido: String,
    pub analista_id: i32,
    pub campana_id: i32,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comentarios_campana)]
pub struct NewComentarioCampana {
    pub contenido: String,
    pub analista_id: i32,
    pub campana_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = avisos)]
pub struct Aviso {
    pub id: i32,
    pub titulo: String,
    pub contenido: String,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub creador_id: i32,
    pub campana_id: Option<i32>,
    pub requiere_tarea: bool,
    pub fecha_vencimiento_tarea: Option<DateTime<Utc>>,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = avisos)]
pub struct NewAviso {
    pub titulo: String,
    pub contenido: String,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub creador_id: i32,
    pub campana_id: Option<i32>,
    pub requiere_tarea: bool,
    pub fecha_vencimiento_tarea: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = acuses_recibo_avisos)]
#[diesel(belongs_to(Aviso, foreign_key = aviso_id))]
#[diesel(belongs_to(Analista, foreign_key = analista_id))]
pub struct AcuseReciboAviso {
    pub id: i32,
    pub aviso_id: i32,
    pub analista_id: i32,
    pub fecha_acuse: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = acuses_recibo_avisos)]
pub struct NewAcuseReciboAviso {
    pub aviso_id: i32,
    pub analista_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = tareas_generadas)]
#[diesel(belongs_to(Aviso, foreign_key = aviso_id))]
#[diesel(belongs_to(Analista, foreign_key = analista_id))]
pub struct TareaGenerada {
    pub id: i32,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub progreso: ProgresoTarea,
    pub analista_id: i32,
    pub aviso_id: Option<i32>,
    pub fecha_finalizacion: Option<DateTime<Utc>>,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tareas_generadas)]
pub struct NewTareaGenerada {
    pub titulo: String,
    pub descripcion: Option<String>,
    pub fecha_vencimiento: Option<DateTime<Utc>>,
    pub progreso: ProgresoTarea,
    pub analista_id: i32,
    pub aviso_id: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = historial_estados_tarea)]
pub struct HistorialEstadoTarea {
    pub id: i32,
    pub tarea_id: Option<i32>,
    pub tarea_generada_id: Option<i32>,
    pub progreso_anterior: Option<ProgresoTarea>,
    pub progreso_nuevo: ProgresoTarea,
    pub analista_id: i32,
    pub fecha_cambio: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = historial_estados_tarea)]
pub struct NewHistorialEstadoTarea {
    pub tarea_id: Option<i32>,
    pub tarea_generada_id: Option<i32>,
    pub progreso_anterior: Option<ProgresoTarea>,
    pub progreso_nuevo: ProgresoTarea,
    pub analista_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = bitacora_entradas)]
#[diesel(belongs_to(Campana, foreign_key = campana_id))]
pub struct BitacoraEntrada {
    pub id: i32,
    pub campana_id: i32,
    pub fecha: NaiveDate,
    pub hora: String,
    pub comentario: Option<String>,
    pub es_incidencia: bool,
    pub tipo_incidencia: Option<String>,
    pub comentario_incidencia: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_ultima_actualizacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = bitacora_entradas)]
pub struct NewBitacoraEntrada {
    pub campana_id: i32,
    pub fecha: NaiveDate,
    pub hora: String,
    pub comentario: Option<String>,
    pub es_incidencia: bool,
    pub tipo_incidencia: Option<String>,
    pub comentario_incidencia: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = bitacora_comentarios_generales)]
pub struct BitacoraComentarioGeneral {
    pub id: i32,
    pub campana_id: i32,
    pub comentario: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_ultima_actualizacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = bitacora_comentarios_generales)]
pub struct NewBitacoraComentarioGeneral {
    pub campana_id: i32,
    pub comentario: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = incidencias)]
pub struct Incidencia {
    pub id: i32,
    pub titulo: String,
    pub descripcion: String,
    pub herramienta_afectada: Option<String>,
    pub indicador_afectado: Option<String>,
    pub tipo: TipoIncidencia,
    pub estado: EstadoIncidencia,
    pub fecha_apertura: DateTime<Utc>,
    pub fecha_cierre: Option<DateTime<Utc>>,
    pub creador_id: i32,
    pub campana_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = incidencias)]
pub struct NewIncidencia {
    pub titulo: String,
    pub descripcion: String,
    pub herramienta_afectada: Option<String>,
    pub indicador_afectado: Option<String>,
    pub tipo: TipoIncidencia,
    pub estado: EstadoIncidencia,
    pub creador_id: i32,
    pub campana_id: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = actualizaciones_incidencia)]
#[diesel(belongs_to(Incidencia, foreign_key = incidencia_id))]
pub struct ActualizacionIncidencia {
    pub id: i32,
    pub incidencia_id: i32,
    pub autor_id: i32,
    pub contenido: String,
    pub fecha_creacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = actualizaciones_incidencia)]
pub struct NewActualizacionIncidencia {
    pub incidencia_id: i32,
    pub autor_id: i32,
    pub contenido: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = validaciones_hhee)]
pub struct ValidacionHHEE {
    pub id: i32,
    pub rut: String,
    pub nombre_apellido: String,
    pub campana: Option<String>,
    pub fecha_hhee: NaiveDate,
    pub correo_supervisor: String,
    pub horas_aprobadas: f64,
    pub estado: EstadoValidacion,
    pub notas: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_ultima_actualizacion: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = validaciones_hhee)]
pub struct NewValidacionHHEE {
    pub rut: String,
    pub nombre_apellido: String,
    pub campana: Option<String>,
    pub fecha_hhee: NaiveDate,
    pub correo_supervisor: String,
    pub horas_aprobadas: f64,
    pub estado: EstadoValidacion,
    pub notas: Option<String>,
}
