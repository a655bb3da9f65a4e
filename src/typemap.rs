//! Classification of backend column types.
//!
//! Each connection carries a map of the backend's types keyed by their numeric
//! id (the catalog oid for Postgres, fixed ids for the embedded backend).
//! Result-set getters consult it to validate access and to drive the generic
//! string getter. Types the classifier does not recognize stay out of the map,
//! so touching them fails loudly instead of decoding garbage.

use std::collections::HashMap;

use crate::error::VidmetaDbError;

/// Semantic category of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    String,
    Int,
    Float,
    Numeric,
    Boolean,
    Blob,
    Timestamp,
    Json,
    Point,
    Box,
    /// Geometric type other than point/box; stored but not decoded.
    Geometry,
    Array,
    SeqType,
    InOutType,
    ProcessStatus,
    State,
    Event,
    Matrix,
    /// Reference to another database type.
    RefType,
    /// Reference to a table.
    RefClass,
}

impl TypeCategory {
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, TypeCategory::Int | TypeCategory::Float | TypeCategory::Numeric)
    }

    #[must_use]
    pub fn is_geometric(self) -> bool {
        matches!(self, TypeCategory::Point | TypeCategory::Box | TypeCategory::Geometry)
    }

    #[must_use]
    pub fn is_reference(self) -> bool {
        matches!(self, TypeCategory::RefType | TypeCategory::RefClass)
    }
}

/// One classified backend type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub category: TypeCategory,
    /// Fixed storage size in bytes, -1 when variable.
    pub length: i16,
    pub user_defined: bool,
    /// Element category and length; always concrete for array entries.
    pub elem: Option<(TypeCategory, i16)>,
}

impl TypeDefinition {
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.category == TypeCategory::Array
    }
}

/// One row of the backend type catalog, before classification.
#[derive(Debug, Clone)]
pub struct CatalogRow {
    pub oid: u32,
    pub name: String,
    /// Catalog category tag (`pg_type.typcategory`).
    pub category: u8,
    pub length: i16,
    /// Element type oid; nonzero only for array types.
    pub elem_oid: u32,
}

/// Map of a connection's classified types, keyed by type id.
#[derive(Debug, Clone, Default)]
pub struct DatabaseTypes {
    by_oid: HashMap<u32, TypeDefinition>,
}

impl DatabaseTypes {
    /// Classify catalog rows. Scalars are classified first; array rows then
    /// resolve their element type, and arrays whose element stayed
    /// unclassified are dropped.
    #[must_use]
    pub fn from_catalog(rows: Vec<CatalogRow>) -> Self {
        let mut types = Self::default();
        for row in &rows {
            if row.category == b'A' {
                continue;
            }
            if let Some((category, user_defined)) = classify(&row.name, row.category) {
                types.insert(
                    row.oid,
                    TypeDefinition {
                        name: row.name.clone(),
                        category,
                        length: row.length,
                        user_defined,
                        elem: None,
                    },
                );
            }
        }
        for row in &rows {
            if row.category != b'A' {
                continue;
            }
            let Some((elem_category, elem_length, user_defined)) = types
                .by_oid
                .get(&row.elem_oid)
                .map(|elem| (elem.category, elem.length, elem.user_defined))
            else {
                continue;
            };
            types.insert(
                row.oid,
                TypeDefinition {
                    name: row.name.clone(),
                    category: TypeCategory::Array,
                    length: row.length,
                    user_defined,
                    elem: Some((elem_category, elem_length)),
                },
            );
        }
        types
    }

    /// Fixed table for the embedded backend, which has no catalog to
    /// introspect. Ids are private to this crate; lookups go through
    /// [`DatabaseTypes::find_by_name`].
    #[must_use]
    pub fn sqlite_builtin() -> Self {
        let scalar = |name: &str, category, length| TypeDefinition {
            name: name.to_string(),
            category,
            length,
            user_defined: matches!(
                category,
                TypeCategory::SeqType
                    | TypeCategory::InOutType
                    | TypeCategory::ProcessStatus
                    | TypeCategory::State
                    | TypeCategory::Event
                    | TypeCategory::Matrix
            ),
            elem: None,
        };
        let defs = [
            scalar("integer", TypeCategory::Int, 4),
            scalar("bigint", TypeCategory::Int, 8),
            scalar("real", TypeCategory::Float, 4),
            scalar("double", TypeCategory::Float, 8),
            scalar("text", TypeCategory::String, -1),
            scalar("blob", TypeCategory::Blob, -1),
            scalar("boolean", TypeCategory::Boolean, 1),
            scalar("timestamp", TypeCategory::Timestamp, 8),
            scalar("json", TypeCategory::Json, -1),
            scalar("point", TypeCategory::Point, 16),
            scalar("box", TypeCategory::Box, 32),
            scalar("seqtype", TypeCategory::SeqType, -1),
            scalar("inouttype", TypeCategory::InOutType, -1),
            scalar("pstatus", TypeCategory::ProcessStatus, -1),
            scalar("pstate", TypeCategory::State, -1),
            scalar("vtevent", TypeCategory::Event, -1),
            scalar("cvmat", TypeCategory::Matrix, -1),
        ];
        let mut types = Self::default();
        let mut oid = 1u32;
        let mut elems = Vec::new();
        for def in defs {
            elems.push((oid, def.clone()));
            types.insert(oid, def);
            oid += 1;
        }
        // Array companions for the element types the text encoding supports.
        for (elem_oid, elem) in &elems {
            if matches!(
                elem.category,
                TypeCategory::Int
                    | TypeCategory::Float
                    | TypeCategory::String
                    | TypeCategory::Point
            ) {
                types.insert(
                    100 + elem_oid,
                    TypeDefinition {
                        name: format!("{}[]", elem.name),
                        category: TypeCategory::Array,
                        length: -1,
                        user_defined: false,
                        elem: Some((elem.category, elem.length)),
                    },
                );
            }
        }
        types
    }

    /// Register one classified definition under its type id, replacing any
    /// earlier entry.
    pub(crate) fn insert(&mut self, oid: u32, def: TypeDefinition) {
        self.by_oid.insert(oid, def);
    }

    /// Look up a type id, failing loudly for ids the classifier skipped.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::UnknownType` for unmapped ids.
    pub fn get(&self, oid: u32) -> Result<&TypeDefinition, VidmetaDbError> {
        self.by_oid
            .get(&oid)
            .ok_or_else(|| VidmetaDbError::UnknownType(format!("oid {oid}")))
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&TypeDefinition> {
        let wanted = normalize_decl(name);
        self.by_oid.values().find(|def| def.name == wanted)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_oid.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_oid.is_empty()
    }

    /// Iterate over all classified definitions.
    pub fn iter(&self) -> impl Iterator<Item = (&u32, &TypeDefinition)> {
        self.by_oid.iter()
    }
}

fn classify(name: &str, category: u8) -> Option<(TypeCategory, bool)> {
    match category {
        b'B' if name == "bool" => Some((TypeCategory::Boolean, false)),
        b'C' => match name {
            "vtevent" => Some((TypeCategory::Event, true)),
            "pstate" => Some((TypeCategory::State, true)),
            "cvmat" => Some((TypeCategory::Matrix, true)),
            _ => None,
        },
        b'D' if name == "timestamp" || name == "timestamptz" => {
            Some((TypeCategory::Timestamp, false))
        }
        b'E' => match name {
            "seqtype" => Some((TypeCategory::SeqType, true)),
            "inouttype" => Some((TypeCategory::InOutType, true)),
            "pstatus" => Some((TypeCategory::ProcessStatus, true)),
            _ => None,
        },
        b'G' => match name {
            "point" => Some((TypeCategory::Point, false)),
            "box" => Some((TypeCategory::Box, false)),
            "lseg" | "path" | "polygon" | "line" | "circle" => {
                Some((TypeCategory::Geometry, false))
            }
            _ => None,
        },
        b'N' => {
            if name.starts_with("int") {
                Some((TypeCategory::Int, false))
            } else if name.starts_with("float") {
                Some((TypeCategory::Float, false))
            } else if name == "numeric" {
                Some((TypeCategory::Numeric, false))
            } else if name == "regtype" {
                Some((TypeCategory::RefType, false))
            } else if name == "regclass" {
                Some((TypeCategory::RefClass, false))
            } else {
                None
            }
        }
        b'S' => match name {
            "char" | "bpchar" | "varchar" | "text" | "name" => {
                Some((TypeCategory::String, false))
            }
            _ => None,
        },
        b'U' => match name {
            "bytea" => Some((TypeCategory::Blob, false)),
            "json" | "jsonb" => Some((TypeCategory::Json, false)),
            "geometry" => Some((TypeCategory::Geometry, false)),
            _ => None,
        },
        _ => None,
    }
}

/// Normalize a declared column type to the builtin table's spelling.
fn normalize_decl(decl: &str) -> String {
    let lowered = decl.trim().to_ascii_lowercase();
    // Strip length suffixes like varchar(255).
    let base = lowered.split('(').next().unwrap_or("").trim().to_string();
    match base.as_str() {
        "int" | "smallint" | "tinyint" | "mediumint" => "integer".to_string(),
        "varchar" | "char" | "character" | "clob" => "text".to_string(),
        "float" => "real".to_string(),
        "double precision" => "double".to_string(),
        "datetime" => "timestamp".to_string(),
        _ => base,
    }
}
