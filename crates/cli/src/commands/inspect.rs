//! Read-only commands: registry and schema descriptors.

use std::path::PathBuf;

use formsync_core::constants::DEFAULT_FORMS_FILE;
use formsync_core::env_config::non_blank;
use formsync_core::{FormRegistry, SchemaVariant};

pub(crate) fn print_forms(file: Option<PathBuf>) -> anyhow::Result<()> {
    let path = file.unwrap_or_else(|| {
        non_blank(std::env::var("FORMSYNC_FORMS_FILE").ok())
            .map_or_else(|| PathBuf::from(DEFAULT_FORMS_FILE), PathBuf::from)
    });
    let registry = FormRegistry::load(&path)?;
    println!("{}", serde_json::to_string_pretty(&registry)?);
    Ok(())
}

pub(crate) fn print_schema(variant: SchemaVariant) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&variant.schema())?);
    Ok(())
}
