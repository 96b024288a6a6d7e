//! Warehouse schema descriptors.
//!
//! Exactly two hand-maintained variants exist. The variant is picked once, when
//! a form's table is created, by [`select_schema`]; tables are never altered
//! afterwards.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Column holding the session identity; one row per value.
pub const IDENTITY_COLUMN: &str = "id";

/// Substring marking checkbox-style attribute columns.
pub const CHECKBOX_MARKER: &str = "attributes_checkbox";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    String,
    Boolean,
    Integer,
}

impl ColumnType {
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::String => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Integer => "BIGINT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub nullable: bool,
}

const fn col(name: &'static str, column_type: ColumnType) -> ColumnSpec {
    ColumnSpec { name, column_type, nullable: true }
}

const fn key(name: &'static str) -> ColumnSpec {
    ColumnSpec { name, column_type: ColumnType::String, nullable: false }
}

use ColumnType::{Boolean, Integer, String as Text};

const BASE_COLUMNS: &[ColumnSpec] = &[
    col("attributes_Operating_System", Text),
    col("attributes_Visitor_Type", Text),
    col("attributes_autofillTriggered", Boolean),
    col("attributes_browserFamily", Text),
    col("attributes_deviceType", Text),
    col("attributes_trafficMedium", Text),
    col("completed", Boolean),
    col("completed_at", Text),
    col("duration", Integer),
    col("events_count", Integer),
    col("events_json", Text),
    col("fields_count", Integer),
    col("fields_json", Text),
    col("form_uuid", Text),
    key(IDENTITY_COLUMN),
    col("last_touched_field_html_id", Text),
    col("last_touched_field_html_name", Text),
    col("last_touched_field_html_tag_name", Text),
    col("last_touched_field_html_type", Text),
    col("last_touched_field_label", Text),
    col("started", Boolean),
    col("started_at", Text),
    col("time", Text),
    col("total_field_returns", Integer),
    col("viewed", Boolean),
    col("viewed_at", Text),
    col("visitor_id", Text),
];

const CHECKBOX_COLUMNS: &[ColumnSpec] = &[
    col("attributes_Operating_System", Text),
    col("attributes_Visitor_Type", Text),
    col("attributes_autofillTriggered", Boolean),
    col("attributes_browserFamily", Text),
    col("attributes_checkbox_editorial_crossbooks", Text),
    col("attributes_checkbox_editorial_ediciones_martinez_roca", Text),
    col("attributes_checkbox_editorial_editorial_alienta", Text),
    col("attributes_checkbox_editorial_editorial_ariel", Text),
    col("attributes_checkbox_editorial_editorial_austral", Text),
    col("attributes_checkbox_editorial_editorial_booket", Text),
    col("attributes_checkbox_editorial_editorial_critica", Text),
    col("attributes_checkbox_editorial_editorial_destino", Text),
    col("attributes_checkbox_editorial_editorial_deusto", Text),
    col("attributes_checkbox_editorial_editorial_espasa", Text),
    col("attributes_checkbox_editorial_editorial_minotauro", Text),
    col("attributes_checkbox_editorial_editorial_peninsula", Text),
    col("attributes_checkbox_editorial_editorial_planeta", Text),
    col("attributes_checkbox_editorial_editorial_planeta_comic", Text),
    col("attributes_checkbox_editorial_editorial_seix_barral", Text),
    col("attributes_checkbox_editorial_editorial_tusquets", Text),
    col("attributes_checkbox_editorial_esencia", Text),
    col("attributes_checkbox_editorial_temas_de_hoy", Text),
    col("attributes_checkbox_tematica_actualidad", Text),
    col("attributes_checkbox_tematica_arte", Text),
    col("attributes_checkbox_tematica_autoayuda", Text),
    col("attributes_checkbox_tematica_bebes", Text),
    col("attributes_checkbox_tematica_ciencia", Text),
    col("attributes_checkbox_tematica_ciencia_ficcion", Text),
    col("attributes_checkbox_tematica_ciencias_humanas_y_sociales", Text),
    col("attributes_checkbox_tematica_cocina", Text),
    col("attributes_checkbox_tematica_comic_y_manga", Text),
    col("attributes_checkbox_tematica_economia", Text),
    col("attributes_checkbox_tematica_empresa", Text),
    col("attributes_checkbox_tematica_esoterismo", Text),
    col("attributes_checkbox_tematica_estilo_de_vida", Text),
    col("attributes_checkbox_tematica_fantasia", Text),
    col("attributes_checkbox_tematica_filosofia", Text),
    col("attributes_checkbox_tematica_historia", Text),
    col("attributes_checkbox_tematica_humor", Text),
    col("attributes_checkbox_tematica_infantil", Text),
    col("attributes_checkbox_tematica_juvenil", Text),
    col("attributes_checkbox_tematica_novela_contemporanea", Text),
    col("attributes_checkbox_tematica_novela_erotica", Text),
    col("attributes_checkbox_tematica_novela_historica", Text),
    col("attributes_checkbox_tematica_novela_literaria", Text),
    col("attributes_checkbox_tematica_novela_negra", Text),
    col("attributes_checkbox_tematica_novela_romantica", Text),
    col("attributes_checkbox_tematica_ocio_y_entretenimiento", Text),
    col("attributes_checkbox_tematica_para_padres", Text),
    col("attributes_checkbox_tematica_poesia", Text),
    col("attributes_checkbox_tematica_psicologia", Text),
    col("attributes_checkbox_tematica_religion", Text),
    col("attributes_checkbox_tematica_salud", Text),
    col("attributes_checkbox_tematica_teatro", Text),
    col("attributes_checkbox_tematica_terror", Text),
    col("attributes_checkbox_tematica_viajes", Text),
    col("attributes_checkbox_todas_tematicas", Text),
    col("attributes_deviceType", Text),
    col("attributes_trafficMedium", Text),
    col("completed", Boolean),
    col("completed_at", Text),
    col("duration", Integer),
    col("events_count", Integer),
    col("events_json", Text),
    col("fields_count", Integer),
    col("fields_json", Text),
    col("form_uuid", Text),
    key(IDENTITY_COLUMN),
    col("last_touched_field_html_id", Text),
    col("last_touched_field_html_name", Text),
    col("last_touched_field_html_tag_name", Text),
    col("last_touched_field_html_type", Text),
    col("started", Boolean),
    col("started_at", Text),
    col("time", Text),
    col("total_field_returns", Integer),
    col("viewed", Boolean),
    col("viewed_at", Text),
    col("visitor_id", Text),
];

/// The two fixed table layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    Base,
    CheckboxExtended,
}

impl SchemaVariant {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::CheckboxExtended => "checkbox",
        }
    }

    /// Descriptor version; bump when a column list changes.
    #[must_use]
    pub const fn version(self) -> u32 {
        1
    }

    #[must_use]
    pub const fn columns(self) -> &'static [ColumnSpec] {
        match self {
            Self::Base => BASE_COLUMNS,
            Self::CheckboxExtended => CHECKBOX_COLUMNS,
        }
    }

    #[must_use]
    pub fn schema(self) -> TableSchema {
        TableSchema { variant: self, version: self.version(), columns: self.columns() }
    }
}

impl Display for SchemaVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Self::Base),
            "checkbox" | "checkbox_extended" => Ok(Self::CheckboxExtended),
            _ => Err(format!("unknown schema variant: {s}")),
        }
    }
}

/// A versioned, ordered column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub variant: SchemaVariant,
    pub version: u32,
    pub columns: &'static [ColumnSpec],
}

impl TableSchema {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Pick the layout for a new table from the exported header.
#[must_use]
pub fn select_schema<S: AsRef<str>>(columns: &[S]) -> SchemaVariant {
    if columns.iter().any(|c| c.as_ref().contains(CHECKBOX_MARKER)) {
        SchemaVariant::CheckboxExtended
    } else {
        SchemaVariant::Base
    }
}
