//! Import template generator
//!
//! Produces a bundle users can fill in by hand: one sheet per entity with
//! required headers flagged, one example row per sheet, and instructions in
//! the manifest notes. Importing an untouched template imports nothing,
//! since every example row starts with the example marker.

use chrono::Utc;

use crate::bundle::{Bundle, Manifest, Sheet, TEMPLATE_FORMAT};
use crate::config::Settings;
use crate::models::{in_dependency_order, CellValue, EntityKind};

/// Template columns of one entity with the example row's values
struct TemplateSheet {
    kind: EntityKind,
    columns: &'static [(&'static str, &'static str)],
}

const TEMPLATE_SHEETS: &[TemplateSheet] = &[
    TemplateSheet {
        kind: EntityKind::Users,
        columns: &[
            ("id", "USR001"),
            ("email", "admin@ejemplo.com"),
            ("name", "Administrador Principal"),
            ("role", "ADMIN"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Teachers,
        columns: &[
            ("id", "PROF001"),
            ("name", "Ana Martínez López"),
            ("email", "ana.martinez@ejemplo.com"),
            ("phone", "+34 600 789 012"),
            ("specialty", "Programación Web"),
            ("contractType", "PART_TIME"),
            ("hourlyRate", "35.50"),
            ("status", "ACTIVE"),
            ("userId", ""),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Students,
        columns: &[
            ("id", "EST001"),
            ("name", "Juan Pérez García"),
            ("email", "juan.perez@ejemplo.com"),
            ("phone", "+34 600 123 456"),
            ("dni", "12345678A"),
            ("birthDate", "1990-05-15"),
            ("isAffiliated", "SI"),
            ("status", "ACTIVE"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Providers,
        columns: &[
            ("id", "PROV001"),
            ("name", "TechBooks S.L."),
            ("email", "info@techbooks.es"),
            ("phone", "+34 912 345 678"),
            ("taxId", "B12345678"),
            ("category", "MATERIALS"),
            ("status", "ACTIVE"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Courses,
        columns: &[
            ("id", "CURSO001"),
            ("title", "Desarrollo Web con React"),
            ("code", "DWR-2024-01"),
            ("level", "INTERMEDIATE"),
            ("price", "450.00"),
            ("priceUnit", "MONTH"),
            ("isActive", "SI"),
            ("startDate", "2024-02-01"),
            ("endDate", "2024-06-30"),
            ("teacherId", "PROF001"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Materials,
        columns: &[
            ("id", "MATL001"),
            ("name", "Libro JavaScript Avanzado"),
            ("type", "BOOK"),
            ("quantity", "25"),
            ("unitPrice", "45.00"),
            ("providerId", "PROV001"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Enrollments,
        columns: &[
            ("id", "ENROLL001"),
            ("studentId", "EST001"),
            ("courseId", "CURSO001"),
            ("enrollmentDate", "2024-01-15"),
            ("status", "IN_PROGRESS"),
            ("progress", "45.5"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Payments,
        columns: &[
            ("id", "PAY001"),
            ("studentId", "EST001"),
            ("courseId", "CURSO001"),
            ("amount", "450.00"),
            ("currency", "EUR"),
            ("paymentDate", "2024-01-15"),
            ("paymentMethod", "BANK_TRANSFER"),
            ("status", "PAID"),
            ("invoiceNumber", "INV-2024-001"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Schedules,
        columns: &[
            ("id", "SCH001"),
            ("courseId", "CURSO001"),
            ("teacherId", "PROF001"),
            ("dayOfWeek", "MONDAY"),
            ("startTime", "09:00"),
            ("endTime", "11:00"),
            ("classroom", "Aula 101"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Contacts,
        columns: &[
            ("id", "CONT001"),
            ("name", "María Pérez (Madre)"),
            ("email", "maria.perez@ejemplo.com"),
            ("phone", "+34 600 111 222"),
            ("category", "EMERGENCY"),
            ("isPrimary", "SI"),
            ("studentId", "EST001"),
        ],
    },
    TemplateSheet {
        kind: EntityKind::Software,
        columns: &[
            ("id", "SOFT001"),
            ("name", "Zoom Education"),
            ("version", "5.14.0"),
            ("type", "VIDEO_CONFERENCE"),
            ("licenseKey", "ZOOM-EDU-2024-XXXXX"),
            ("expiryDate", "2024-12-31"),
            ("isActive", "SI"),
            ("maxUsers", "100"),
        ],
    },
];

const INSTRUCTIONS: &[&str] = &[
    "Each sheet holds one entity type; keep the header row as it is.",
    "Columns whose header ends with the required marker must be filled in.",
    "The first data row of every sheet is an example and is skipped on import; delete or overwrite it.",
    "Dates use YYYY-MM-DD (DD/MM/YYYY is also accepted).",
    "Yes/no columns accept SI/NO, YES/NO, TRUE/FALSE or 1/0.",
    "Referenced ids (studentId, courseId, teacherId, providerId, userId) must exist in their own sheet or already be stored.",
    "Sheets are imported in dependency order whatever their order in the file.",
];

/// Build the fill-in template bundle
pub fn build_template(settings: &Settings) -> Bundle {
    let marker = settings
        .example_markers
        .first()
        .map(|m| m.to_uppercase())
        .unwrap_or_else(|| "EXAMPLE".to_string());

    let sheets = in_dependency_order()
        .into_iter()
        .filter_map(|descriptor| TEMPLATE_SHEETS.iter().find(|t| t.kind == descriptor.kind))
        .map(|template| template_sheet(template, settings.required_marker, &marker))
        .collect();

    let mut notes: Vec<String> = INSTRUCTIONS.iter().map(|s| s.to_string()).collect();
    notes.push(format!("Required marker: {}", settings.required_marker));
    notes.push(format!("Example marker: {}", marker));

    let manifest = Manifest {
        format: TEMPLATE_FORMAT.to_string(),
        generated_at: Utc::now(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        counts: Vec::new(),
        notes,
    };
    Bundle::new(Some(manifest), sheets)
}

fn template_sheet(template: &TemplateSheet, required_marker: char, example_marker: &str) -> Sheet {
    let descriptor = template.kind.descriptor();
    let headers = template
        .columns
        .iter()
        .map(|(field, _)| {
            if descriptor.required_fields.contains(field) {
                format!("{}{}", field, required_marker)
            } else {
                field.to_string()
            }
        })
        .collect();

    let mut sheet = Sheet::new(descriptor.sheet_id, headers);
    let example = template
        .columns
        .iter()
        .enumerate()
        .map(|(i, (_, value))| {
            if i == 0 {
                CellValue::Text(format!("{}_{}", example_marker, value))
            } else {
                CellValue::from_text(value)
            }
        })
        .collect();
    sheet.push_row(example);
    sheet
}
