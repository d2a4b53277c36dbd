//! Column normalizer
//!
//! Maps the header labels of a hand-edited sheet onto canonical field names
//! and coerces cell values into typed `FieldValue`s. Headers are matched
//! after stripping the required-field marker, trimming, lowercasing,
//! folding Spanish accents and dropping spaces, underscores, hyphens and
//! dots, so `Fecha de Inicio*`, `fecha_inicio` and `startDate` all land on
//! `startDate`. Columns the table does not know pass through unchanged.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::config::Settings;
use crate::error::AcademyError;
use crate::models::entity::fold_accents;
use crate::models::{CellValue, EntityKind, FieldValue, Money, NormalizedPayload, PriceUnit, RawRow};

/// How a canonical field's values are coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stable record identifier
    Id,
    /// Display name; also written to `title` for title-keyed entities
    Name,
    /// Course price or payment amount; written to both `price` and `amount`
    Price,
    Text,
    /// Uppercased code such as a status or level
    Enum,
    PriceUnit,
    Reference,
    Number,
    Integer,
    Bool,
    Date,
}

/// Target of a recognized header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: &'static str,
    pub kind: FieldKind,
}

const fn rule(field: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule { field, kind }
}

/// Header aliases (already in normalized form) and the field they map to
const SYNONYMS: &[(&[&str], FieldRule)] = &[
    (&["id", "identificador"], rule("id", FieldKind::Id)),
    (
        &["name", "nombre", "nombrecompleto", "fullname", "title", "titulo"],
        rule("name", FieldKind::Name),
    ),
    (
        &["price", "precio", "amount", "monto", "importe"],
        rule("price", FieldKind::Price),
    ),
    (&["description", "descripcion"], rule("description", FieldKind::Text)),
    (&["email", "correo", "correoelectronico", "mail"], rule("email", FieldKind::Text)),
    (&["phone", "telefono", "tel"], rule("phone", FieldKind::Text)),
    (&["mobile", "movil", "celular"], rule("mobile", FieldKind::Text)),
    (&["address", "direccion"], rule("address", FieldKind::Text)),
    (&["dni", "identificacion", "documento", "nif", "nie"], rule("dni", FieldKind::Text)),
    (&["specialty", "especialidad"], rule("specialty", FieldKind::Text)),
    (&["code", "codigo"], rule("code", FieldKind::Text)),
    (&["notes", "notas", "observaciones"], rule("notes", FieldKind::Text)),
    (&["classroom", "aula"], rule("classroom", FieldKind::Text)),
    (&["starttime", "horainicio"], rule("startTime", FieldKind::Text)),
    (&["endtime", "horafin"], rule("endTime", FieldKind::Text)),
    (&["level", "nivel"], rule("level", FieldKind::Enum)),
    (&["status", "estado"], rule("status", FieldKind::Enum)),
    (&["role", "rol"], rule("role", FieldKind::Enum)),
    (&["type", "tipo"], rule("type", FieldKind::Enum)),
    (&["category", "categoria"], rule("category", FieldKind::Enum)),
    (&["contracttype", "tipocontrato", "contrato"], rule("contractType", FieldKind::Enum)),
    (&["currency", "moneda", "divisa"], rule("currency", FieldKind::Enum)),
    (&["dayofweek", "dia", "diasemana", "diadelasemana"], rule("dayOfWeek", FieldKind::Enum)),
    (
        &["paymentmethod", "metodopago", "metododepago", "formapago", "formadepago"],
        rule("paymentMethod", FieldKind::Enum),
    ),
    (
        &["paymentfrequency", "frecuenciapago", "frecuenciadepago"],
        rule("paymentFrequency", FieldKind::Enum),
    ),
    (
        &["priceunit", "unidadprecio", "unidaddeprecio", "periodicidad"],
        rule("priceUnit", FieldKind::PriceUnit),
    ),
    (&["duration", "duracion"], rule("duration", FieldKind::Number)),
    (&["hourlyrate", "tarifahora", "preciohora"], rule("hourlyRate", FieldKind::Number)),
    (&["unitprice", "preciounitario"], rule("unitPrice", FieldKind::Number)),
    (&["progress", "progreso"], rule("progress", FieldKind::Number)),
    (&["grade", "nota", "calificacion"], rule("grade", FieldKind::Number)),
    (&["quantity", "cantidad", "stock"], rule("quantity", FieldKind::Integer)),
    (&["maxstudents", "maxalumnos", "plazas", "cupo"], rule("maxStudents", FieldKind::Integer)),
    (&["maxusers", "maxusuarios"], rule("maxUsers", FieldKind::Integer)),
    (&["currentusers", "usuariosactuales"], rule("currentUsers", FieldKind::Integer)),
    (
        &["teacherid", "profesorid", "docenteid", "idprofesor", "iddocente"],
        rule("teacherId", FieldKind::Reference),
    ),
    (
        &["studentid", "alumnoid", "estudianteid", "idalumno", "idestudiante"],
        rule("studentId", FieldKind::Reference),
    ),
    (&["courseid", "cursoid", "idcurso"], rule("courseId", FieldKind::Reference)),
    (
        &["providerid", "proveedorid", "supplierid", "idproveedor"],
        rule("providerId", FieldKind::Reference),
    ),
    (&["userid", "usuarioid", "idusuario"], rule("userId", FieldKind::Reference)),
    (&["startdate", "fechainicio", "fechadeinicio"], rule("startDate", FieldKind::Date)),
    (&["enddate", "fechafin", "fechadefin"], rule("endDate", FieldKind::Date)),
    (
        &["enrollmentdate", "fechamatricula", "fechadematricula", "fechainscripcion"],
        rule("enrollmentDate", FieldKind::Date),
    ),
    (&["paymentdate", "fechapago", "fechadepago"], rule("paymentDate", FieldKind::Date)),
    (
        &["birthdate", "fechanacimiento", "fechadenacimiento"],
        rule("birthDate", FieldKind::Date),
    ),
    (&["duedate", "fechavencimiento", "vencimiento"], rule("dueDate", FieldKind::Date)),
    (&["paiddate", "fechapagado", "fechacobro"], rule("paidDate", FieldKind::Date)),
    (
        &["expirydate", "fechaexpiracion", "caducidad", "fechacaducidad"],
        rule("expiryDate", FieldKind::Date),
    ),
    (&["createdat", "fechacreacion", "creado"], rule("createdAt", FieldKind::Date)),
    (&["isactive", "activo", "activa"], rule("isActive", FieldKind::Bool)),
    (&["isaffiliated", "afiliado", "afiliada"], rule("isAffiliated", FieldKind::Bool)),
    (&["isavailable", "disponible"], rule("isAvailable", FieldKind::Bool)),
    (&["isrecurring", "recurrente"], rule("isRecurring", FieldKind::Bool)),
    (&["isprimary", "principal"], rule("isPrimary", FieldKind::Bool)),
    (&["hascertificate", "tienecertificado"], rule("hasCertificate", FieldKind::Bool)),
    (&["hasmaterials", "incluyemateriales"], rule("hasMaterials", FieldKind::Bool)),
];

fn synonym_table() -> &'static HashMap<&'static str, FieldRule> {
    static TABLE: OnceLock<HashMap<&'static str, FieldRule>> = OnceLock::new();
    TABLE.get_or_init(|| {
        SYNONYMS
            .iter()
            .flat_map(|(aliases, rule)| aliases.iter().map(move |alias| (*alias, *rule)))
            .collect()
    })
}

/// Coercion kind of a canonical field name such as `createdAt`
pub fn canonical_kind(field: &str) -> Option<FieldKind> {
    synonym_table()
        .get(header_key(field).as_str())
        .filter(|rule| rule.field == field)
        .map(|rule| rule.kind)
}

/// A cell that could not be coerced to its field's type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column '{column}': {message}")]
pub struct RowError {
    pub column: String,
    pub message: String,
}

impl RowError {
    fn new(column: &str, message: impl Into<String>) -> Self {
        Self {
            column: column.to_string(),
            message: message.into(),
        }
    }
}

impl From<RowError> for AcademyError {
    fn from(err: RowError) -> Self {
        AcademyError::Validation(err.to_string())
    }
}

/// Header and value normalizer for the rows of one entity type
#[derive(Debug, Clone)]
pub struct Normalizer {
    kind: EntityKind,
    marker: char,
}

impl Normalizer {
    pub fn new(kind: EntityKind, settings: &Settings) -> Self {
        Self::with_marker(kind, settings.required_marker)
    }

    pub fn with_marker(kind: EntityKind, marker: char) -> Self {
        Self { kind, marker }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Header with the required marker removed and surrounding space trimmed
    pub fn clean_header<'h>(&self, header: &'h str) -> std::borrow::Cow<'h, str> {
        let trimmed = header.trim();
        if trimmed.contains(self.marker) {
            std::borrow::Cow::Owned(trimmed.replace(self.marker, "").trim().to_string())
        } else {
            std::borrow::Cow::Borrowed(trimmed)
        }
    }

    /// Canonical rule for a header label, if it is a known synonym
    pub fn resolve(&self, header: &str) -> Option<FieldRule> {
        synonym_table().get(header_key(&self.clean_header(header)).as_str()).copied()
    }

    /// Headers that will pass through without a canonical mapping
    pub fn unknown_headers<'h>(&self, headers: &'h [String]) -> Vec<&'h str> {
        headers
            .iter()
            .filter(|h| !self.clean_header(h).is_empty() && self.resolve(h).is_none())
            .map(String::as_str)
            .collect()
    }

    /// Map one row onto canonical fields
    ///
    /// Empty cells produce no field. A value that cannot be coerced to its
    /// field's type fails the whole row.
    pub fn normalize(&self, row: &RawRow) -> Result<NormalizedPayload, RowError> {
        let mut payload = NormalizedPayload::new();

        for (header, cell) in &row.cells {
            if cell.is_empty() {
                continue;
            }
            let label = self.clean_header(header);
            if label.is_empty() {
                continue;
            }

            let Some(rule) = self.resolve(header) else {
                payload.set(label.into_owned(), passthrough(cell));
                continue;
            };

            match rule.kind {
                FieldKind::Name => {
                    let value = FieldValue::Text(cell.as_text());
                    if self.kind.descriptor().title_keyed {
                        payload.set("title", value.clone());
                    }
                    payload.set("name", value);
                }
                FieldKind::Price => {
                    let value = FieldValue::Number(to_amount(cell, &label)?);
                    payload.set("price", value.clone());
                    payload.set("amount", value);
                }
                kind => payload.set(rule.field, coerce(kind, cell, &label)?),
            }
        }

        Ok(payload)
    }
}

/// Normalized form of a header used for synonym lookup
pub fn header_key(label: &str) -> String {
    fold_accents(label)
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '.' | '\t'))
        .collect()
}

fn coerce(kind: FieldKind, cell: &CellValue, column: &str) -> Result<FieldValue, RowError> {
    let value = match kind {
        FieldKind::Id => FieldValue::Text(to_identifier(cell)),
        FieldKind::Reference => FieldValue::Reference(to_identifier(cell)),
        FieldKind::Text | FieldKind::Name => FieldValue::Text(cell.as_text()),
        FieldKind::Enum => FieldValue::Text(to_enum(&cell.as_text())),
        FieldKind::PriceUnit => {
            let text = cell.as_text();
            let label = PriceUnit::parse_label(&text)
                .map(|unit| unit.as_str().to_string())
                .unwrap_or_else(|| to_enum(&text));
            FieldValue::Text(label)
        }
        FieldKind::Number => FieldValue::Number(to_number(cell, column)?),
        FieldKind::Price => FieldValue::Number(to_amount(cell, column)?),
        FieldKind::Integer => {
            let n = to_number(cell, column)?;
            if n.fract() != 0.0 || n.abs() > i64::MAX as f64 {
                return Err(RowError::new(
                    column,
                    format!("expected a whole number, got '{}'", cell),
                ));
            }
            FieldValue::Integer(n as i64)
        }
        FieldKind::Bool => FieldValue::Bool(to_bool(cell).ok_or_else(|| {
            RowError::new(column, format!("expected SI/NO, got '{}'", cell))
        })?),
        FieldKind::Date => FieldValue::Date(to_date(cell).ok_or_else(|| {
            RowError::new(column, format!("could not parse date '{}'", cell))
        })?),
    };
    Ok(value)
}

/// Value of a column outside the synonym table
///
/// Yes/no words become booleans so exported flags survive a round trip.
fn passthrough(cell: &CellValue) -> FieldValue {
    match cell {
        CellValue::Number(n) => FieldValue::Number(*n),
        CellValue::Bool(b) => FieldValue::Bool(*b),
        other => {
            let text = other.as_text();
            match parse_bool_word(&text) {
                Some(b) => FieldValue::Bool(b),
                None => FieldValue::Text(text),
            }
        }
    }
}

/// Identifier text; spreadsheet floats such as `1001.0` lose their fraction
fn to_identifier(cell: &CellValue) -> String {
    let text = cell.as_text();
    if let Some((int, frac)) = text.split_once('.') {
        if !int.is_empty()
            && int.chars().all(|c| c.is_ascii_digit())
            && !frac.is_empty()
            && frac.chars().all(|c| c == '0')
        {
            return int.to_string();
        }
    }
    text
}

fn to_enum(text: &str) -> String {
    fold_accents(text.trim())
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn to_number(cell: &CellValue, column: &str) -> Result<f64, RowError> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Ok(*n),
        CellValue::Text(s) => parse_number(s)
            .ok_or_else(|| RowError::new(column, format!("expected a number, got '{}'", s.trim()))),
        other => Err(RowError::new(
            column,
            format!("expected a number, got '{}'", other),
        )),
    }
}

/// A price or payment amount, bounded so billing sums stay in range
fn to_amount(cell: &CellValue, column: &str) -> Result<f64, RowError> {
    let n = to_number(cell, column)?;
    if !Money::is_representable(n) {
        return Err(RowError::new(
            column,
            format!("amount '{}' is out of range", cell),
        ));
    }
    Ok(n)
}

fn to_bool(cell: &CellValue) -> Option<bool> {
    match cell {
        CellValue::Bool(b) => Some(*b),
        CellValue::Number(n) if *n == 1.0 => Some(true),
        CellValue::Number(n) if *n == 0.0 => Some(false),
        CellValue::Text(s) => parse_bool(s),
        _ => None,
    }
}

fn to_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Text(s) => parse_date(s),
        CellValue::Number(n) => from_serial_date(*n),
        _ => None,
    }
}

/// Parse a yes/no cell, accepting spreadsheet shorthands (`1`, `0`, `X`)
pub fn parse_bool(s: &str) -> Option<bool> {
    match fold_accents(s.trim()).to_uppercase().as_str() {
        "1" | "X" => Some(true),
        "0" => Some(false),
        _ => parse_bool_word(s),
    }
}

/// Parse only spelled-out yes/no words
fn parse_bool_word(s: &str) -> Option<bool> {
    match fold_accents(s.trim()).to_uppercase().as_str() {
        "SI" | "YES" | "TRUE" | "VERDADERO" => Some(true),
        "NO" | "FALSE" | "FALSO" => Some(false),
        _ => None,
    }
}

/// Parse a number written by a person
///
/// Currency symbols and spaces are ignored, `(12)` is negative. When both
/// `.` and `,` appear the later one is the decimal separator; a lone comma
/// followed by one or two digits is a decimal comma, otherwise commas group
/// thousands.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let (negative, body) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if body.chars().any(char::is_alphabetic) {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let canonical = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = cleaned.len() - comma - 1;
            if cleaned.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(_), None) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    let value: f64 = canonical.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Parse a date in ISO or day-first formats; a time suffix is ignored
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    const FORMATS: [&str; 7] = [
        "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%y", "%d-%m-%y",
    ];

    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    // ISO timestamps such as 2024-01-15T00:00:00.000Z
    let day = s.get(..10)?;
    if s.len() > 10 {
        return NaiveDate::parse_from_str(day, "%Y-%m-%d").ok();
    }
    None
}

/// Spreadsheet serial day number (days since 1899-12-30)
fn from_serial_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}
