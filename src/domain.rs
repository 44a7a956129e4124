use std::io::Write;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};

/// Implements the diesel `Text` plumbing for an enum whose `as_str`/`FromStr`
/// pair defines the stored representation.
macro_rules! text_enum_sql {
    ($name:ident) => {
        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
                let raw = std::str::from_utf8(value.as_bytes())?;
                raw.parse()
                    .map_err(|_| format!("valor desconocido para {}: {raw}", stringify!($name)).into())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Analista,
    Supervisor,
    Responsable,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Analista => "ANALISTA",
            UserRole::Supervisor => "SUPERVISOR",
            UserRole::Responsable => "RESPONSABLE",
        }
    }

    /// Supervisors and responsables share the elevated permission tier.
    pub fn es_gestor(&self) -> bool {
        matches!(self, UserRole::Supervisor | UserRole::Responsable)
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ANALISTA" => Ok(UserRole::Analista),
            "SUPERVISOR" => Ok(UserRole::Supervisor),
            "RESPONSABLE" => Ok(UserRole::Responsable),
            _ => Err(()),
        }
    }
}

text_enum_sql!(UserRole);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgresoTarea {
    Pendiente,
    EnProgreso,
    Completada,
    Cancelada,
}

impl ProgresoTarea {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgresoTarea::Pendiente => "PENDIENTE",
            ProgresoTarea::EnProgreso => "EN_PROGRESO",
            ProgresoTarea::Completada => "COMPLETADA",
            ProgresoTarea::Cancelada => "CANCELADA",
        }
    }

    /// COMPLETADA and CANCELADA close a task; both can still be reverted.
    pub fn es_cierre(&self) -> bool {
        matches!(self, ProgresoTarea::Completada | ProgresoTarea::Cancelada)
    }
}

impl FromStr for ProgresoTarea {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDIENTE" => Ok(ProgresoTarea::Pendiente),
            "EN_PROGRESO" => Ok(ProgresoTarea::EnProgreso),
            "COMPLETADA" => Ok(ProgresoTarea::Completada),
            "CANCELADA" => Ok(ProgresoTarea::Cancelada),
            _ => Err(()),
        }
    }
}

text_enum_sql!(ProgresoTarea);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoIncidencia {
    Error,
    Consulta,
    Mejora,
    Otro,
}

impl TipoIncidencia {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoIncidencia::Error => "ERROR",
            TipoIncidencia::Consulta => "CONSULTA",
            TipoIncidencia::Mejora => "MEJORA",
            TipoIncidencia::Otro => "OTRO",
        }
    }
}

impl FromStr for TipoIncidencia {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ERROR" => Ok(TipoIncidencia::Error),
            "CONSULTA" => Ok(TipoIncidencia::Consulta),
            "MEJORA" => Ok(TipoIncidencia::Mejora),
            "OTRO" => Ok(TipoIncidencia::Otro),
            _ => Err(()),
        }
    }
}

text_enum_sql!(TipoIncidencia);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EstadoIncidencia {
    Abierta,
    EnProgreso,
    Cerrada,
}

impl EstadoIncidencia {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoIncidencia::Abierta => "ABIERTA",
            EstadoIncidencia::EnProgreso => "EN_PROGRESO",
            EstadoIncidencia::Cerrada => "CERRADA",
        }
    }
}

impl FromStr for EstadoIncidencia {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ABIERTA" => Ok(EstadoIncidencia::Abierta),
            "EN_PROGRESO" => Ok(EstadoIncidencia::EnProgreso),
            "CERRADA" => Ok(EstadoIncidencia::Cerrada),
            _ => Err(()),
        }
    }
}

text_enum_sql!(EstadoIncidencia);

/// Estado de una validación HHEE tal como lo muestra el portal; los valores
/// almacenados usan las etiquetas originales con espacios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum EstadoValidacion {
    #[serde(rename = "No Guardado")]
    NoGuardado,
    #[serde(rename = "Validado")]
    Validado,
    #[serde(rename = "Pendiente por Corrección")]
    PendientePorCorreccion,
}

impl EstadoValidacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoValidacion::NoGuardado => "No Guardado",
            EstadoValidacion::Validado => "Validado",
            EstadoValidacion::PendientePorCorreccion => "Pendiente por Corrección",
        }
    }
}

impl FromStr for EstadoValidacion {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "No Guardado" => Ok(EstadoValidacion::NoGuardado),
            "Validado" => Ok(EstadoValidacion::Validado),
            "Pendiente por Corrección" => Ok(EstadoValidacion::PendientePorCorreccion),
            _ => Err(()),
        }
    }
}

text_enum_sql!(EstadoValidacion);

/// Parent of a state-history row. The two foreign keys on the table are
/// mutually exclusive; constructing rows through this enum guarantees that
/// exactly one of them is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TareaRef {
    Tarea(i32),
    Generada(i32),
}

impl TareaRef {
    pub fn tarea_id(&self) -> Option<i32> {
        match self {
            TareaRef::Tarea(id) => Some(*id),
            TareaRef::Generada(_) => None,
        }
    }

    pub fn tarea_generada_id(&self) -> Option<i32> {
        match self {
            TareaRef::Tarea(_) => None,
            TareaRef::Generada(id) => Some(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progreso_roundtrips_through_storage_repr() {
        for progreso in [
            ProgresoTarea::Pendiente,
            ProgresoTarea::EnProgreso,
            ProgresoTarea::Completada,
            ProgresoTarea::Cancelada,
        ] {
            assert_eq!(progreso.as_str().parse::<ProgresoTarea>(), Ok(progreso));
        }
    }

    #[test]
    fn solo_estados_de_cierre() {
        assert!(ProgresoTarea::Completada.es_cierre());
        assert!(ProgresoTarea::Cancelada.es_cierre());
        assert!(!ProgresoTarea::Pendiente.es_cierre());
        assert!(!ProgresoTarea::EnProgreso.es_cierre());
    }

    #[test]
    fn estado_validacion_conserva_etiquetas_con_espacios() {
        assert_eq!(
            "Pendiente por Corrección".parse::<EstadoValidacion>(),
            Ok(EstadoValidacion::PendientePorCorreccion)
        );
        assert_eq!(EstadoValidacion::NoGuardado.as_str(), "No Guardado");
    }

    #[test]
    fn tarea_ref_establece_exactamente_un_padre() {
        let tarea = TareaRef::Tarea(7);
        assert_eq!(tarea.tarea_id(), Some(7));
        assert_eq!(tarea.tarea_generada_id(), None);

        let generada = TareaRef::Generada(9);
        assert_eq!(generada.tarea_id(), None);
        assert_eq!(generada.tarea_generada_id(), Some(9));
    }
}
