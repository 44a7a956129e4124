diesel::table! {
    analistas (id) {
        id -> Int4,
        nombre -> Varchar,
        apellido -> Varchar,
        #[max_length = 255]
        email -> Varchar,
        bms_id -> Int4,
        hashed_password -> Varchar,
        #[max_length = 16]
        role -> Varchar,
        esta_activo -> Bool,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    campanas (id) {
        id -> Int4,
        #[max_length = 255]
        nombre -> Varchar,
        descripcion -> Nullable<Text>,
        fecha_inicio -> Nullable<Timestamptz>,
        fecha_fin -> Nullable<Timestamptz>,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    analistas_campanas (analista_id, campana_id) {
        analista_id -> Int4,
        campana_id -> Int4,
    }
}

diesel::table! {
    tareas (id) {
        id -> Int4,
        #[max_length = 255]
        titulo -> Varchar,
        descripcion -> Nullable<Text>,
        fecha_vencimiento -> Timestamptz,
        #[max_length = 16]
        progreso -> Varchar,
        analista_id -> Nullable<Int4>,
        campana_id -> Nullable<Int4>,
        fecha_finalizacion -> Nullable<Timestamptz>,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    checklist_items (id) {
        id -> Int4,
        descripcion -> Varchar,
        completado -> Bool,
        tarea_id -> Int4,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    comentarios_campana (id) {
        id -> Int4,
        contenido -> Text,
        analista_id -> Int4,
        campana_id -> Int4,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    avisos (id) {
        id -> Int4,
        #[max_length = 255]
        titulo -> Varchar,
        contenido -> Text,
        fecha_vencimiento -> Nullable<Timestamptz>,
        creador_id -> Int4,
        campana_id -> Nullable<Int4>,
        requiere_tarea -> Bool,
        fecha_vencimiento_tarea -> Nullable<Timestamptz>,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    acuses_recibo_avisos (id) {
        id -> Int4,
        aviso_id -> Int4,
        analista_id -> Int4,
        fecha_acuse -> Timestamptz,
    }
}

diesel::table! {
    tareas_generadas (id) {
        id -> Int4,
        #[max_length = 255]
        titulo -> Varchar,
        descripcion -> Nullable<Text>,
        fecha_vencimiento -> Nullable<Timestamptz>,
        #[max_length = 16]
        progreso -> Varchar,
        analista_id -> Int4,
        aviso_id -> Nullable<Int4>,
        fecha_finalizacion -> Nullable<Timestamptz>,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    historial_estados_tarea (id) {
        id -> Int4,
        tarea_id -> Nullable<Int4>,
        tarea_generada_id -> Nullable<Int4>,
        #[max_length = 16]
        progreso_anterior -> Nullable<Varchar>,
        #[max_length = 16]
        progreso_nuevo -> Varchar,
        analista_id -> Int4,
        fecha_cambio -> Timestamptz,
    }
}

diesel::table! {
    bitacora_entradas (id) {
        id -> Int4,
        campana_id -> Int4,
        fecha -> Date,
        #[max_length = 5]
        hora -> Varchar,
        comentario -> Nullable<Text>,
        es_incidencia -> Bool,
        tipo_incidencia -> Nullable<Varchar>,
        comentario_incidencia -> Nullable<Text>,
        fecha_creacion -> Timestamptz,
        fecha_ultima_actualizacion -> Timestamptz,
    }
}

diesel::table! {
    bitacora_comentarios_generales (id) {
        id -> Int4,
        campana_id -> Int4,
        comentario -> Nullable<Text>,
        fecha_creacion -> Timestamptz,
        fecha_ultima_actualizacion -> Timestamptz,
    }
}

diesel::table! {
    incidencias (id) {
        id -> Int4,
        #[max_length = 255]
        titulo -> Varchar,
        descripcion -> Text,
        herramienta_afectada -> Nullable<Varchar>,
        indicador_afectado -> Nullable<Varchar>,
        #[max_length = 16]
        tipo -> Varchar,
        #[max_length = 16]
        estado -> Varchar,
        fecha_apertura -> Timestamptz,
        fecha_cierre -> Nullable<Timestamptz>,
        creador_id -> Int4,
        campana_id -> Int4,
    }
}

diesel::table! {
    actualizaciones_incidencia (id) {
        id -> Int4,
        incidencia_id -> Int4,
        autor_id -> Int4,
        contenido -> Text,
        fecha_creacion -> Timestamptz,
    }
}

diesel::table! {
    validaciones_hhee (id) {
        id -> Int4,
        #[max_length = 16]
        rut -> Varchar,
        nombre_apellido -> Varchar,
        campana -> Nullable<Varchar>,
        fecha_hhee -> Date,
        correo_supervisor -> Varchar,
        horas_aprobadas -> Float8,
        #[max_length = 32]
        estado -> Varchar,
        notas -> Nullable<Text>,
        fecha_creacion -> Timestamptz,
        fecha_ultima_actualizacion -> Timestamptz,
    }
}

diesel::joinable!(analistas_campanas -> analistas (analista_id));
diesel::joinable!(analistas_campanas -> campanas (campana_id));
diesel::joinable!(tareas -> analistas (analista_id));
diesel::joinable!(tareas -> campanas (campana_id));
diesel::joinable!(checklist_items -> tareas (tarea_id));
diesel::joinable!(comentarios_campana -> analistas (analista_id));
diesel::joinable!(comentarios_campana -> campanas (campana_id));
diesel::joinable!(avisos -> analistas (creador_id));
diesel::joinable!(avisos -> campanas (campana_id));
diesel::joinable!(acuses_recibo_avisos -> avisos (aviso_id));
diesel::joinable!(acuses_recibo_avisos -> analistas (analista_id));
diesel::joinable!(tareas_generadas -> avisos (aviso_id));
diesel::joinable!(tareas_generadas -> analistas (analista_id));
diesel::joinable!(historial_estados_tarea -> tareas (tarea_id));
diesel::joinable!(historial_estados_tarea -> tareas_generadas (tarea_generada_id));
diesel::joinable!(historial_estados_tarea -> analistas (analista_id));
diesel::joinable!(bitacora_entradas -> campanas (campana_id));
diesel::joinable!(bitacora_comentarios_generales -> campanas (campana_id));
diesel::joinable!(incidencias -> analistas (creador_id));
diesel::joinable!(incidencias -> campanas (campana_id));
diesel::joinable!(actualizaciones_incidencia -> incidencias (incidencia_id));
diesel::joinable!(actualizaciones_incidencia -> analistas (autor_id));

diesel::allow_tables_to_appear_in_same_query!(
    analistas,
    campanas,
    analistas_campanas,
    tareas,
    checklist_items,
    comentarios_campana,
    avisos,
    acuses_recibo_avisos,
    tareas_generadas,
    historial_estados_tarea,
    bitacora_entradas,
    bitacora_comentarios_generales,
    incidencias,
    actualizaciones_incidencia,
    validaciones_hhee,
);
