//! Render synthesized tables as a readable SQL artifact listing.
//!
//! This is a diagnostic surface for the `dump-sql` command, not a full
//! DDL emitter; templates remain the canonical way to produce DDL.

use crate::error::ConfigError;
use crate::model::{Schema, SchemaSet};

use super::model::{Column, Table, TriggerEvent};

/// Produce the artifact listing for every concrete table in the set.
///
/// The set must be verified and synthesized first; tables are emitted in
/// declaration order so the output is stable across runs.
pub fn script(set: &SchemaSet) -> Result<String, ConfigError> {
    let mut out = String::new();
    for schema in set.schemas() {
        out.push_str(&schema_script(set, schema)?);
    }
    Ok(out)
}

/// Produce the artifact listing for one schema.
pub fn schema_script(set: &SchemaSet, schema: &Schema) -> Result<String, ConfigError> {
    let mut out = String::new();
    for object_type in schema.object_types() {
        if !object_type.concrete() {
            continue;
        }
        let table = Table::of(object_type);
        out.push_str(&format!("-- object type {}\n", object_type.path()));
        out.push_str(&format!("CREATE TABLE {} (\n", table.qualified_table_name(set)));
        let columns: Vec<String> = object_type
            .attributes(set)
            .into_iter()
            .filter(|a| a.is_persistent())
            .map(|attribute| {
                let column = Column::of(attribute);
                Ok(format!(
                    "  {} {}{}{}",
                    column.column_name(set)?,
                    column.sql_type(set)?,
                    if column.identity(set) { " IDENTITY" } else { "" },
                    if attribute.is_nullable() { " NULL" } else { " NOT NULL" }
                ))
            })
            .collect::<Result<_, ConfigError>>()?;
        out.push_str(&columns.join(",\n"));
        out.push_str("\n)\n");

        for index in table.indexes() {
            let index = index.value;
            let kind = if index.cluster {
                "CLUSTERED INDEX"
            } else if index.unique {
                "UNIQUE INDEX"
            } else {
                "INDEX"
            };
            out.push_str(&format!(
                "{} {} ({})\n",
                kind,
                index.name(),
                index.attribute_names.join(", ")
            ));
        }
        for constraint in table.constraints() {
            out.push_str(&format!(
                "CONSTRAINT {} CHECK ({})\n",
                constraint.value.constraint_name(),
                constraint.value.sql
            ));
        }
        for constraint in table.function_constraints() {
            out.push_str(&format!(
                "FUNCTION CONSTRAINT {} ({})\n{}\n",
                constraint.value.constraint_name(),
                constraint.value.parameters.join(", "),
                constraint.value.positive_sql
            ));
        }
        for foreign_key in table.foreign_keys() {
            let foreign_key = foreign_key.value;
            let target = set.object_type(&foreign_key.referenced_object_type)?;
            out.push_str(&format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}\n",
                foreign_key.foreign_key_name(),
                foreign_key.attribute_names.join(", "),
                Table::of(target).qualified_table_name(set),
                foreign_key.referenced_attribute_names.join(", "),
                foreign_key.on_update.as_sql(),
                foreign_key.on_delete.as_sql()
            ));
        }
        for trigger in table.triggers() {
            let trigger = trigger.value;
            let events: Vec<&str> = trigger.after.iter().map(TriggerEvent::as_sql).collect();
            out.push_str(&format!(
                "TRIGGER {} AFTER {}\n{}\n",
                trigger.trigger_name(),
                events.join(", "),
                trigger.sql
            ));
        }
        out.push('\n');
    }
    Ok(out)
}
