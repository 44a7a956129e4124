use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::AppConfig;

const LOGIN_PATH: &str = "/api/v1/Login";
const ATTENDANCE_PATH: &str = "/api/v1/AttendanceBook";
const GV_DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("servicio externo no disponible: {0}")]
    Unavailable(String),
    #[error("respuesta externa invalida: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AttendanceError {
    fn from(value: reqwest::Error) -> Self {
        AttendanceError::Unavailable(value.to_string())
    }
}

/// One day of attendance for an employee, already normalized from the raw
/// provider payload. Days without a planned interval keep their empty fields.
#[derive(Debug, Clone, Serialize)]
pub struct DiaAsistencia {
    pub fecha: NaiveDate,
    pub nombre_apellido: String,
    pub campana: Option<String>,
    pub inicio_turno_teorico: Option<String>,
    pub fin_turno_teorico: Option<String>,
    pub marca_real_inicio: Option<String>,
    pub marca_real_fin: Option<String>,
    pub hhee_autorizadas_antes_gv: f64,
    pub hhee_autorizadas_despues_gv: f64,
}

#[async_trait]
pub trait AttendanceApi: Send + Sync + 'static {
    /// Fetches the full period in a single call; an empty vec means the
    /// provider has no records for the employee in that range.
    async fn fetch_period(
        &self,
        rut: &str,
        desde: NaiveDate,
        hasta: NaiveDate,
    ) -> Result<Vec<DiaAsistencia>, AttendanceError>;
}

pub struct GeoVictoriaClient {
    http: reqwest::Client,
    base_url: String,
    user: Option<String>,
    password: Option<String>,
}

impl GeoVictoriaClient {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.geovictoria_base_url.trim_end_matches('/').to_string(),
            user: config.geovictoria_user.clone(),
            password: config.geovictoria_password.clone(),
        }
    }

    async fn login(&self) -> Result<String, AttendanceError> {
        let (user, password) = match (&self.user, &self.password) {
            (Some(user), Some(password)) => (user, password),
            _ => {
                return Err(AttendanceError::Unavailable(
                    "faltan credenciales de GeoVictoria".to_string(),
                ))
            }
        };

        let response = self
            .http
            .post(format!("{}{LOGIN_PATH}", self.base_url))
            .json(&json!({ "User": user, "Password": password }))
            .send()
            .await?
            .error_for_status()?;

        let body: LoginResponse = response.json().await?;
        body.token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AttendanceError::Unavailable("login sin token".to_string()))
    }
}

#[async_trait]
impl AttendanceApi for GeoVictoriaClient {
    async fn fetch_period(
        &self,
        rut: &str,
        desde: NaiveDate,
        hasta: NaiveDate,
    ) -> Result<Vec<DiaAsistencia>, AttendanceError> {
        let token = self.login().await?;

        let payload = json!({
            "StartDate": format!("{}000000", desde.format("%Y%m%d")),
            "EndDate": format!("{}235959", hasta.format("%Y%m%d")),
            "UserIds": rut,
        });

        let response = self
            .http
            .post(format!("{}{ATTENDANCE_PATH}", self.base_url))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let body: AttendanceBookResponse = response
            .json()
            .await
            .map_err(|err| AttendanceError::InvalidResponse(err.to_string()))?;

        let Some(user) = body.users.first() else {
            return Ok(Vec::new());
        };

        Ok(dias_del_periodo(user, desde, hasta))
    }
}

pub fn normalizar_rut(rut: &str) -> String {
    rut.chars()
        .filter(|c| *c != '.' && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

/// "HH:MM" to decimal hours; malformed input counts as zero, matching how the
/// provider reports absent authorizations.
pub fn hhmm_a_decimal(raw: &str) -> f64 {
    let mut parts = raw.split(':');
    let horas = parts.next().and_then(|p| p.parse::<i64>().ok());
    let minutos = parts.next().and_then(|p| p.parse::<i64>().ok());
    match (horas, minutos) {
        (Some(h), Some(m)) => h as f64 + m as f64 / 60.0,
        _ => 0.0,
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "token")]
    token: Option<String>,
}

#[derive(Deserialize)]
struct AttendanceBookResponse {
    #[serde(rename = "Users", default)]
    users: Vec<GvUser>,
}

#[derive(Deserialize, Default)]
struct GvUser {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "LastName", default)]
    last_name: String,
    #[serde(rename = "GroupDescription")]
    group_description: Option<String>,
    #[serde(rename = "PlannedInterval", default)]
    planned_interval: Vec<GvInterval>,
}

#[derive(Deserialize, Default)]
struct GvInterval {
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Punches", default)]
    punches: Vec<GvPunch>,
    #[serde(rename = "Shifts", default)]
    shifts: Vec<GvShift>,
    #[serde(rename = "AuthorizedOvertimeBefore")]
    authorized_overtime_before: Option<String>,
    #[serde(rename = "AuthorizedOvertimeAfter")]
    authorized_overtime_after: Option<String>,
}

#[derive(Deserialize)]
struct GvPunch {
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "ShiftPunchType")]
    punch_type: Option<String>,
}

#[derive(Deserialize, Default)]
struct GvShift {
    #[serde(rename = "StartTime")]
    start_time: Option<String>,
    #[serde(rename = "ExitTime")]
    exit_time: Option<String>,
}

fn parse_gv_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, GV_DATETIME_FORMAT).ok()
}

fn dias_del_periodo(user: &GvUser, desde: NaiveDate, hasta: NaiveDate) -> Vec<DiaAsistencia> {
    let nombre_apellido = format!("{} {}", user.name, user.last_name)
        .trim()
        .to_string();

    let mut dias = Vec::new();
    let mut fecha = desde;
    while fecha <= hasta {
        let intervalo = user
            .planned_interval
            .iter()
            .find(|i| parse_gv_datetime(&i.date).map(|dt| dt.date()) == Some(fecha));

        let mut dia = DiaAsistencia {
            fecha,
            nombre_apellido: nombre_apellido.clone(),
            campana: user.group_description.clone(),
            inicio_turno_teorico: None,
            fin_turno_teorico: None,
            marca_real_inicio: None,
            marca_real_fin: None,
            hhee_autorizadas_antes_gv: 0.0,
            hhee_autorizadas_despues_gv: 0.0,
        };

        if let Some(intervalo) = intervalo {
            let entradas: Vec<NaiveDateTime> = intervalo
                .punches
                .iter()
                .filter(|p| p.punch_type.as_deref() == Some("Entrada"))
                .filter_map(|p| parse_gv_datetime(&p.date))
                .collect();
            let salidas: Vec<NaiveDateTime> = intervalo
                .punches
                .iter()
                .filter(|p| p.punch_type.as_deref() == Some("Salida"))
                .filter_map(|p| parse_gv_datetime(&p.date))
                .collect();

            let turno = intervalo.shifts.first();
            dia.inicio_turno_teorico = turno.and_then(|t| t.start_time.clone());
            dia.fin_turno_teorico = turno.and_then(|t| t.exit_time.clone());
            dia.marca_real_inicio = entradas
                .iter()
                .min()
                .map(|dt| dt.format("%H:%M").to_string());
            dia.marca_real_fin = salidas.iter().max().map(|dt| dt.format("%H:%M").to_string());
            dia.hhee_autorizadas_antes_gv = intervalo
                .authorized_overtime_before
                .as_deref()
                .map(hhmm_a_decimal)
                .unwrap_or(0.0);
            dia.hhee_autorizadas_despues_gv = intervalo
                .authorized_overtime_after
                .as_deref()
                .map(hhmm_a_decimal)
                .unwrap_or(0.0);
        }

        dias.push(dia);
        fecha += Duration::days(1);
    }

    dias
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normaliza_rut_quitando_separadores() {
        assert_eq!(normalizar_rut("12.345.678-k"), "12345678K");
        assert_eq!(normalizar_rut("9876543-2"), "98765432");
    }

    #[test]
    fn convierte_hhmm_a_decimal() {
        assert_eq!(hhmm_a_decimal("01:30"), 1.5);
        assert_eq!(hhmm_a_decimal("00:00"), 0.0);
        assert_eq!(hhmm_a_decimal("no-es-hora"), 0.0);
        assert_eq!(hhmm_a_decimal(""), 0.0);
    }

    #[test]
    fn arma_dias_con_marcas_min_y_max() {
        let user = GvUser {
            name: "Ana".to_string(),
            last_name: "Perez".to_string(),
            group_description: Some("Mesa Ayuda".to_string()),
            planned_interval: vec![GvInterval {
                date: "20260302000000".to_string(),
                punches: vec![
                    GvPunch {
                        date: "20260302090500".to_string(),
                        punch_type: Some("Entrada".to_string()),
                    },
                    GvPunch {
                        date: "20260302083000".to_string(),
                        punch_type: Some("Entrada".to_string()),
                    },
                    GvPunch {
                        date: "20260302180200".to_string(),
                        punch_type: Some("Salida".to_string()),
                    },
                ],
                shifts: vec![GvShift {
                    start_time: Some("09:00".to_string()),
                    exit_time: Some("18:00".to_string()),
                }],
                authorized_overtime_before: Some("00:30".to_string()),
                authorized_overtime_after: None,
            }],
        };

        let desde = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let hasta = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let dias = dias_del_periodo(&user, desde, hasta);

        assert_eq!(dias.len(), 2);

        // 2026-03-01 has no planned interval: empty fields, zero overtime.
        assert_eq!(dias[0].inicio_turno_teorico, None);
        assert_eq!(dias[0].marca_real_inicio, None);
        assert_eq!(dias[0].hhee_autorizadas_antes_gv, 0.0);

        assert_eq!(dias[1].nombre_apellido, "Ana Perez");
        assert_eq!(dias[1].campana.as_deref(), Some("Mesa Ayuda"));
        assert_eq!(dias[1].inicio_turno_teorico.as_deref(), Some("09:00"));
        assert_eq!(dias[1].marca_real_inicio.as_deref(), Some("08:30"));
        assert_eq!(dias[1].marca_real_fin.as_deref(), Some("18:02"));
        assert_eq!(dias[1].hhee_autorizadas_antes_gv, 0.5);
    }
}
