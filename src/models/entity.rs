//! Canonical entity catalog
//!
//! The eleven entity types that travel through a snapshot, each with the
//! sheet it occupies, the endpoint it is written to and its dependency rank.
//! Lower ranks are imported before higher ranks that reference them. Within
//! a rank, catalog order decides, so an entity may reference a same-rank
//! entity that precedes it in the catalog (teachers point at users).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eleven importable/exportable record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Users,
    Teachers,
    Students,
    Providers,
    Courses,
    Materials,
    Enrollments,
    Payments,
    Schedules,
    Contacts,
    Software,
}

/// A relation field and the entity it points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub target: EntityKind,
}

/// Static description of an entity type
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub kind: EntityKind,
    /// Stable identifier, also the store table name
    pub key: &'static str,
    /// Display name
    pub label: &'static str,
    /// Slot of the entity in a snapshot bundle
    pub sheet_id: &'static str,
    /// Write target in the entity store
    pub endpoint: &'static str,
    pub dependency_rank: u8,
    /// Alternative sheet names accepted on import (localized templates)
    pub sheet_aliases: &'static [&'static str],
    /// Fields the store refuses to create a record without
    pub required_fields: &'static [&'static str],
    pub references: &'static [Reference],
    /// Whether records are keyed on `title` rather than `name`
    pub title_keyed: bool,
}

const fn reference(field: &'static str, target: EntityKind) -> Reference {
    Reference { field, target }
}

/// The catalog, in snapshot sheet order
pub static CATALOG: [EntityDescriptor; 11] = [
    EntityDescriptor {
        kind: EntityKind::Users,
        key: "users",
        label: "Users",
        sheet_id: "Users",
        endpoint: "/api/users",
        dependency_rank: 0,
        sheet_aliases: &["usuarios", "user"],
        required_fields: &["email"],
        references: &[],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Teachers,
        key: "teachers",
        label: "Teachers",
        sheet_id: "Teachers",
        endpoint: "/api/teachers",
        dependency_rank: 0,
        sheet_aliases: &["docentes", "profesores", "teacher"],
        required_fields: &["name"],
        references: &[reference("userId", EntityKind::Users)],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Students,
        key: "students",
        label: "Students",
        sheet_id: "Students",
        endpoint: "/api/students",
        dependency_rank: 0,
        sheet_aliases: &["alumnos", "estudiantes", "student"],
        required_fields: &["name"],
        references: &[],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Providers,
        key: "providers",
        label: "Providers",
        sheet_id: "Providers",
        endpoint: "/api/suppliers",
        dependency_rank: 0,
        sheet_aliases: &["proveedores", "suppliers", "provider"],
        required_fields: &["name"],
        references: &[],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Courses,
        key: "courses",
        label: "Courses",
        sheet_id: "Courses",
        endpoint: "/api/courses",
        dependency_rank: 1,
        sheet_aliases: &["cursos", "course"],
        required_fields: &["title"],
        references: &[reference("teacherId", EntityKind::Teachers)],
        title_keyed: true,
    },
    EntityDescriptor {
        kind: EntityKind::Materials,
        key: "materials",
        label: "Materials",
        sheet_id: "Materials",
        endpoint: "/api/materials",
        dependency_rank: 1,
        sheet_aliases: &["materiales", "material"],
        required_fields: &["name"],
        references: &[reference("providerId", EntityKind::Providers)],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Enrollments,
        key: "enrollments",
        label: "Enrollments",
        sheet_id: "Enrollments",
        endpoint: "/api/enrollments",
        dependency_rank: 2,
        sheet_aliases: &["matriculas", "inscripciones", "enrollment"],
        required_fields: &["studentId", "courseId"],
        references: &[
            reference("studentId", EntityKind::Students),
            reference("courseId", EntityKind::Courses),
        ],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Payments,
        key: "payments",
        label: "Payments",
        sheet_id: "Payments",
        endpoint: "/api/payments",
        dependency_rank: 3,
        sheet_aliases: &["pagos", "payment"],
        required_fields: &["amount"],
        references: &[
            reference("studentId", EntityKind::Students),
            reference("courseId", EntityKind::Courses),
        ],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Schedules,
        key: "schedules",
        label: "Schedules",
        sheet_id: "Schedules",
        endpoint: "/api/schedules",
        dependency_rank: 2,
        sheet_aliases: &["horarios", "schedule"],
        required_fields: &["courseId"],
        references: &[
            reference("courseId", EntityKind::Courses),
            reference("teacherId", EntityKind::Teachers),
        ],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Contacts,
        key: "contacts",
        label: "Contacts",
        sheet_id: "Contacts",
        endpoint: "/api/contacts",
        dependency_rank: 3,
        sheet_aliases: &["contactos", "contact"],
        required_fields: &["name"],
        references: &[
            reference("studentId", EntityKind::Students),
            reference("teacherId", EntityKind::Teachers),
            reference("providerId", EntityKind::Providers),
            reference("userId", EntityKind::Users),
        ],
        title_keyed: false,
    },
    EntityDescriptor {
        kind: EntityKind::Software,
        key: "software",
        label: "Software",
        sheet_id: "Software",
        endpoint: "/api/software",
        dependency_rank: 3,
        sheet_aliases: &["programas", "licencias"],
        required_fields: &["name"],
        references: &[],
        title_keyed: false,
    },
];

impl EntityKind {
    /// All kinds in catalog order
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Users,
        EntityKind::Teachers,
        EntityKind::Students,
        EntityKind::Providers,
        EntityKind::Courses,
        EntityKind::Materials,
        EntityKind::Enrollments,
        EntityKind::Payments,
        EntityKind::Schedules,
        EntityKind::Contacts,
        EntityKind::Software,
    ];

    /// Catalog entry for this kind
    pub fn descriptor(self) -> &'static EntityDescriptor {
        CATALOG
            .iter()
            .find(|d| d.kind == self)
            .unwrap_or(&CATALOG[0])
    }

    /// Display name
    pub fn label(self) -> &'static str {
        self.descriptor().label
    }

    /// Resolve a sheet name from a bundle to an entity kind
    ///
    /// Decorations (emoji prefixes, spaces, a `.csv` suffix), case and
    /// Spanish accents are ignored; localized aliases are accepted.
    pub fn from_sheet_name(name: &str) -> Option<EntityKind> {
        let name = name.trim();
        let name = name
            .strip_suffix(".csv")
            .or_else(|| name.strip_suffix(".CSV"))
            .unwrap_or(name);
        let wanted: String = fold_accents(name)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if wanted.is_empty() {
            return None;
        }

        CATALOG
            .iter()
            .find(|d| {
                d.sheet_id.eq_ignore_ascii_case(&wanted)
                    || d.key == wanted
                    || d.sheet_aliases.iter().any(|alias| *alias == wanted)
            })
            .map(|d| d.kind)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Catalog entries sorted by dependency rank (catalog order breaks ties)
pub fn in_dependency_order() -> Vec<&'static EntityDescriptor> {
    let mut ordered: Vec<_> = CATALOG.iter().collect();
    ordered.sort_by_key(|d| d.dependency_rank);
    ordered
}

/// Replace Spanish accented letters with their plain ASCII counterpart
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'Á' | 'À' | 'Ä' | 'Â' => 'A',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'É' | 'È' | 'Ë' | 'Ê' => 'E',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}
