// --- File: crates/studio_gcal/src/mapper.rs ---
//! Translation between appointments and calendar events.
//!
//! The description carries the client metadata twice: the labeled lines people
//! read in the calendar UI, and a `[booking:v1]` block that is parsed back on
//! pull. Events written before the block existed are decoded from the labeled
//! lines.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use studio_common::{config_error, Appointment, NewAppointment, ServiceType, StudioError};
use studio_config::GcalConfig;
use thiserror::Error;
use tracing::warn;

use crate::service::{Attendee, EventDateTime, EventPayload, RemoteEvent};

const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const BLOCK_VERSION: &str = "1";
const NOT_AVAILABLE: &str = "N/A";

/// Every booking is a fixed one-hour session.
pub fn session_length() -> Duration {
    Duration::hours(1)
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unsupported booking block version v{0}")]
    UnsupportedVersion(String),
    #[error("malformed booking block: {0}")]
    MalformedBlock(String),
    #[error("unknown service type '{0}'")]
    UnknownService(String),
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("invalid event start: {0}")]
    InvalidStart(String),
}

/// Event conventions shared by encode and decode.
#[derive(Debug, Clone)]
pub struct MapperSettings {
    pub summary_prefix: String,
    pub time_zone: Tz,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            summary_prefix: "Captação".to_string(),
            time_zone: chrono_tz::America::Sao_Paulo,
        }
    }
}

impl MapperSettings {
    pub fn from_config(config: &GcalConfig) -> Result<Self, StudioError> {
        let time_zone: Tz = config
            .time_zone
            .parse()
            .map_err(|e| config_error(format!("invalid gcal.time_zone '{}': {}", config.time_zone, e)))?;
        Ok(Self {
            summary_prefix: config.summary_prefix.clone(),
            time_zone,
        })
    }

    /// Written as `"<prefix> - <name>"`; any summary starting `"<prefix> -"` is ours.
    fn summary_marker(&self) -> String {
        format!("{} -", self.summary_prefix)
    }

    /// Start of the appointment as an instant, `None` for local times the zone skips.
    pub fn appointment_start(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
        self.time_zone
            .from_local_datetime(&date.and_time(time))
            .earliest()
    }
}

// --- Encode ---

fn or_not_available(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_AVAILABLE,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn unescape_value(value: &str) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            other => {
                return Err(DecodeError::MalformedBlock(format!(
                    "bad escape sequence '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

/// Renders the event description: labeled lines, optional notes, then the versioned block.
pub fn encode_description(appointment: &Appointment) -> String {
    let mut lines = vec![
        format!("Empresa: {}", or_not_available(appointment.client_company.as_deref())),
        format!("Email: {}", appointment.client_email),
        format!("Telefone: {}", or_not_available(appointment.client_phone.as_deref())),
        format!("Serviço: {}", appointment.service_type.label()),
    ];
    if let Some(notes) = non_empty(appointment.notes.as_deref()) {
        lines.push(String::new());
        lines.push(format!("Notas: {}", notes));
    }

    lines.push(String::new());
    lines.push(format!("[booking:v{}]", BLOCK_VERSION));
    if let Some(company) = non_empty(appointment.client_company.as_deref()) {
        lines.push(format!("company={}", escape_value(company)));
    }
    lines.push(format!("email={}", escape_value(&appointment.client_email)));
    if let Some(phone) = non_empty(appointment.client_phone.as_deref()) {
        lines.push(format!("phone={}", escape_value(phone)));
    }
    lines.push(format!("service={}", appointment.service_type.as_code()));
    if let Some(notes) = non_empty(appointment.notes.as_deref()) {
        lines.push(format!("notes={}", escape_value(notes)));
    }
    lines.push("[/booking]".to_string());

    lines.join("\n")
}

/// Maps an appointment to the insert body. The session is a fixed hour in the
/// configured zone.
pub fn encode_event(appointment: &Appointment, settings: &MapperSettings) -> EventPayload {
    let start = appointment.appointment_date.and_time(appointment.appointment_time);
    let end = start + session_length();
    let zone = settings.time_zone.name().to_string();

    let attendees = if appointment.client_email.trim().is_empty() {
        Vec::new()
    } else {
        vec![Attendee {
            email: appointment.client_email.trim().to_string(),
            display_name: Some(appointment.client_name.clone()),
        }]
    };

    EventPayload {
        summary: format!("{} {}", settings.summary_marker(), appointment.client_name),
        description: encode_description(appointment),
        start: EventDateTime {
            date_time: Some(start.format(LOCAL_DATETIME_FORMAT).to_string()),
            date: None,
            time_zone: Some(zone.clone()),
        },
        end: EventDateTime {
            date_time: Some(end.format(LOCAL_DATETIME_FORMAT).to_string()),
            date: None,
            time_zone: Some(zone),
        },
        attendees,
    }
}

// --- Decode ---

static OPEN_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[booking:v([^\]\s]*)\]$").expect("valid block regex"));
const CLOSE_TAG: &str = "[/booking]";

fn legacy_line(label: &str) -> Regex {
    Regex::new(&format!(r"(?m)^{}:[ \t]*(.*?)[ \t\r]*$", regex::escape(label)))
        .expect("valid label regex")
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| legacy_line("Email"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| legacy_line("Telefone"));
static COMPANY_RE: Lazy<Regex> = Lazy::new(|| legacy_line("Empresa"));
static SERVICE_RE: Lazy<Regex> = Lazy::new(|| legacy_line("Serviço"));
static NOTES_RE: Lazy<Regex> = Lazy::new(|| legacy_line("Notas"));

#[derive(Debug, Default, PartialEq)]
struct ClientFields {
    email: String,
    phone: Option<String>,
    company: Option<String>,
    notes: Option<String>,
    service_type: Option<ServiceType>,
}

/// True when the summary carries our `"<prefix> -"` marker.
pub fn is_ours(event: &RemoteEvent, settings: &MapperSettings) -> bool {
    event
        .summary
        .as_deref()
        .is_some_and(|s| s.starts_with(&settings.summary_marker()))
}

/// Finds the last tag pair that sits on lines of its own.
///
/// Free text mentioning the tags inline (notes, company) never matches, and
/// the block we write always comes after the labeled lines.
fn find_block(description: &str) -> Option<Result<(&str, Vec<&str>), DecodeError>> {
    let lines: Vec<&str> = description.lines().map(str::trim).collect();
    let (open, version) = lines.iter().enumerate().rev().find_map(|(i, &line)| {
        OPEN_TAG_RE
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| (i, m.as_str()))
    })?;

    let body = &lines[open + 1..];
    Some(match body.iter().position(|line| *line == CLOSE_TAG) {
        Some(close) => Ok((version, body[..close].to_vec())),
        None => Err(DecodeError::MalformedBlock(
            "opening tag without [/booking]".to_string(),
        )),
    })
}

fn decode_block(version: &str, body: &[&str]) -> Result<ClientFields, DecodeError> {
    if version != BLOCK_VERSION {
        return Err(DecodeError::UnsupportedVersion(version.to_string()));
    }

    let mut fields = ClientFields::default();
    let mut service = None;
    for line in body.iter().filter(|l| !l.is_empty()) {
        let (key, raw) = line
            .split_once('=')
            .ok_or_else(|| DecodeError::MalformedBlock(format!("line without '=': {}", line)))?;
        let value = unescape_value(raw)?;
        match key {
            "company" => fields.company = Some(value),
            "email" => fields.email = value,
            "phone" => fields.phone = Some(value),
            "notes" => fields.notes = Some(value),
            "service" => service = Some(value),
            // Newer writers may add keys within the same version
            _ => {}
        }
    }

    let service = service.ok_or(DecodeError::MissingField("service"))?;
    fields.service_type =
        Some(ServiceType::from_code(&service).ok_or(DecodeError::UnknownService(service))?);
    Ok(fields)
}

fn legacy_value(re: &Regex, description: &str) -> Option<String> {
    re.captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty() && v != NOT_AVAILABLE)
}

fn decode_legacy(description: &str, event_id: &str) -> ClientFields {
    let service_type = match legacy_value(&SERVICE_RE, description) {
        Some(text) => match ServiceType::from_label(&text).or_else(|| ServiceType::from_code(&text)) {
            Some(service) => service,
            None => {
                warn!(
                    "Event {} has unknown service '{}', importing as video",
                    event_id, text
                );
                ServiceType::Video
            }
        },
        None => {
            warn!("Event {} has no service line, importing as video", event_id);
            ServiceType::Video
        }
    };

    ClientFields {
        email: legacy_value(&EMAIL_RE, description).unwrap_or_default(),
        phone: legacy_value(&PHONE_RE, description),
        company: legacy_value(&COMPANY_RE, description),
        notes: legacy_value(&NOTES_RE, description),
        service_type: Some(service_type),
    }
}

/// Local date and minute-granular time of the event start in the configured zone.
fn decode_start(
    start: Option<&EventDateTime>,
    settings: &MapperSettings,
) -> Result<(NaiveDate, NaiveTime), DecodeError> {
    let start = start.ok_or(DecodeError::MissingField("start"))?;

    if let Some(date_time) = start.date_time.as_deref() {
        let local = match DateTime::parse_from_rfc3339(date_time) {
            Ok(instant) => instant.with_timezone(&settings.time_zone).naive_local(),
            Err(_) => {
                // No offset: the wall time is in the event's own zone
                let naive = NaiveDateTime::parse_from_str(date_time, LOCAL_DATETIME_FORMAT)
                    .map_err(|e| DecodeError::InvalidStart(format!("{}: {}", date_time, e)))?;
                let event_zone = start
                    .time_zone
                    .as_deref()
                    .and_then(|z| z.parse::<Tz>().ok())
                    .unwrap_or(settings.time_zone);
                event_zone
                    .from_local_datetime(&naive)
                    .earliest()
                    .map(|dt| dt.with_timezone(&settings.time_zone).naive_local())
                    .ok_or_else(|| DecodeError::InvalidStart(date_time.to_string()))?
            }
        };
        let time = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)
            .ok_or_else(|| DecodeError::InvalidStart(date_time.to_string()))?;
        return Ok((local.date(), time));
    }

    if let Some(date) = start.date.as_deref() {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| DecodeError::InvalidStart(format!("{}: {}", date, e)))?;
        let midnight = NaiveTime::from_hms_opt(0, 0, 0)
            .ok_or_else(|| DecodeError::InvalidStart(date.to_string()))?;
        return Ok((date, midnight));
    }

    Err(DecodeError::MissingField("start"))
}

/// Decodes one of our events into a new appointment.
///
/// Returns `Ok(None)` for events that do not carry our summary prefix.
pub fn decode_event(
    event: &RemoteEvent,
    settings: &MapperSettings,
) -> Result<Option<NewAppointment>, DecodeError> {
    let Some(client_name) = event
        .summary
        .as_deref()
        .and_then(|s| s.strip_prefix(settings.summary_marker().as_str()))
    else {
        return Ok(None);
    };

    let description = event.description.as_deref().unwrap_or_default();
    let fields = match find_block(description) {
        Some(block) => {
            let (version, body) = block?;
            decode_block(version, &body)?
        }
        None => decode_legacy(description, &event.id),
    };

    let (appointment_date, appointment_time) = decode_start(event.start.as_ref(), settings)?;

    Ok(Some(NewAppointment {
        appointment_date,
        appointment_time,
        service_type: fields.service_type.unwrap_or(ServiceType::Video),
        client_name: client_name.trim().to_string(),
        client_email: fields.email,
        client_phone: fields.phone,
        client_company: fields.company,
        notes: fields.notes,
    }))
}
