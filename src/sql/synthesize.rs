//! Constraint synthesis: derive relational artifacts from declarations.
//!
//! Runs once per object type after the schema set is verified, in a
//! fixed stage order. Each stage derives artifacts with deterministic
//! names and skips any name an owned artifact already occupies, so the
//! whole pass is idempotent and safe to invoke more than once. A subtype
//! table first receives every artifact of its parent's table tagged as
//! inherited; stages then override inherited artifacts with freshly
//! derived ones.

use crate::error::ConfigError;
use crate::model::{Attribute, CycleConstraint, ObjectType, SchemaSet};

use super::model::{
    CheckConstraint, Column, ForeignKey, FunctionConstraint, Index, Table, Trigger, TriggerEvent,
    Validation,
};

/// Run constraint synthesis over every object type in the set.
///
/// The set must have been verified; invoking synthesis on an unverified
/// set is a defect in calling code.
pub fn post_verify(set: &SchemaSet) -> Result<(), ConfigError> {
    assert!(
        set.is_verified(),
        "sql synthesis invoked before SchemaSet::verify"
    );
    for schema in set.schemas() {
        for object_type in schema.object_types() {
            synthesize_table(set, object_type)?;
        }
    }
    Ok(())
}

fn synthesize_table(set: &SchemaSet, object_type: &ObjectType) -> Result<(), ConfigError> {
    let table = Table::of(object_type);
    let type_name = object_type.name().to_string();

    if let Some(parent) = object_type.supertype(set) {
        table.inherit_from(&Table::of(parent), &parent.path());
    }

    // 1. A partitioned table needs a clustering index to partition on.
    if table.partition_scheme().is_some() && table.cluster_index_count() == 0 {
        return Err(ConfigError::MissingClusterIndex {
            table: table.qualified_table_name(set),
        });
    }

    // 2. Unique indexes.
    for constraint in &object_type.unique_constraints {
        table.derive_index(Index::new(&type_name, constraint.attribute_names.clone()).unique())?;
    }

    // 3. Codependent groups: all null or all non-null.
    for constraint in &object_type.codependent_constraints {
        let columns = column_names(set, object_type, &constraint.attribute_names)?;
        let all_set = join_predicates(&columns, "IS NOT NULL", " AND ");
        let all_null = join_predicates(&columns, "IS NULL", " AND ");
        let sql = format!("( {} ) OR ( {} )", all_set, all_null);
        let name = format!("{}_{}_CoDep", type_name, constraint.name);
        table.derive_constraint(CheckConstraint::new(&type_name, name, sql))?;
    }

    // 4. Dependency: a set dependent requires its prerequisites.
    for constraint in &object_type.dependency_constraints {
        let column = column_name(set, object_type, &constraint.attribute_name)?;
        let required = column_names(set, object_type, &constraint.dependent_attribute_names)?;
        let sql = format!(
            "{} IS NULL OR ( {} )",
            column,
            join_predicates(&required, "IS NOT NULL", " AND ")
        );
        let name = format!("{}_{}_Dep", type_name, constraint.name);
        table.derive_constraint(CheckConstraint::new(&type_name, name, sql))?;
    }

    // 5. Incompatible groups: at most one member non-null.
    for constraint in &object_type.incompatible_constraints {
        let columns = column_names(set, object_type, &constraint.attribute_names)?;
        let mut disjuncts = Vec::new();
        for candidate in 0..=columns.len() {
            let clause: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(index, column)| {
                    let op = if index == candidate { "IS NOT NULL" } else { "IS NULL" };
                    format!("{} {}", column, op)
                })
                .collect();
            disjuncts.push(format!("({})", clause.join(" AND ")));
        }
        let name = format!("{}_{}_Incompat", type_name, constraint.name);
        table.derive_constraint(CheckConstraint::new(&type_name, name, disjuncts.join(" OR ")))?;
    }

    // 6/7. Enumeration domain checks: exact set membership.
    for attribute in object_type.declared_attributes() {
        if !attribute.is_enumeration() || !attribute.is_persistent() {
            continue;
        }
        let enumeration = attribute.referenced_enumeration(set)?;
        let column = Column::of(attribute).column_name(set)?;
        let members = if enumeration.numeric_values() {
            enumeration
                .sorted_numeric_values()
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            enumeration
                .textual_value_list()
                .iter()
                .map(|value| format!("'{}'", value))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = format!("{} IN ({})", column, members);
        let name = format!("{}_Enum", attribute.name());
        table.derive_constraint(CheckConstraint::new(&type_name, name, sql))?;
    }

    // 8. Non-blank checks for bounded strings and textual enumerations.
    for attribute in object_type.declared_attributes() {
        if !attribute.is_persistent() || attribute.allows_blank() {
            continue;
        }
        let applies = (attribute.is_text() && attribute.declared_length().is_some())
            || (attribute.is_enumeration()
                && attribute.referenced_enumeration(set)?.textual_values());
        if !applies {
            continue;
        }
        let column = Column::of(attribute).column_name(set)?;
        let name = format!("{}_NotEmpty", attribute.name());
        let sql = format!("LEN( {} ) > 0", column);
        table.derive_constraint(CheckConstraint::new(&type_name, name, sql))?;
    }

    // 9. Write-once attributes roll back any update of a set value.
    for attribute in object_type.declared_attributes() {
        if !attribute.is_set_once() || !attribute.is_persistent() {
            continue;
        }
        let pk = Column::of(object_type.primary_key(set)?).column_name(set)?;
        let column = Column::of(attribute).column_name(set)?;
        let negative_sql = format!(
            "SELECT I.{pk}\n\
             FROM\n\
             inserted I\n\
             JOIN deleted D ON D.{pk} = I.{pk}\n\
             WHERE\n  \
             D.{column} IS NOT NULL AND\n  \
             (\n    \
             I.{column} IS NULL OR\n    \
             D.{column} != I.{column}\n  \
             )",
            pk = pk,
            column = column
        );
        let name = format!("{}_SetOnce", attribute.name());
        table.derive_validation(
            Validation::new(name, negative_sql).after(vec![TriggerEvent::Update]),
        )?;
    }

    // 10. Cycle constraints become path-walking function constraints.
    for constraint in &object_type.cycle_constraints {
        synthesize_cycle_scope(set, object_type, &table, constraint)?;
    }

    // 11. One combined Immuter guards every immutable column.
    let immutable: Vec<&Attribute> = object_type
        .attributes(set)
        .into_iter()
        .filter(|a| a.is_persistent() && a.is_immutable())
        .collect();
    if !immutable.is_empty() {
        let pk = Column::of(object_type.primary_key(set)?).column_name(set)?;
        let mut guards = Vec::new();
        let mut comparisons = Vec::new();
        for attribute in &immutable {
            let column = Column::of(attribute).column_name(set)?;
            guards.push(format!("UPDATE({})", column));
            comparisons.push(format!("    (I.{column} != D.{column})", column = column));
        }
        let negative_sql = format!(
            "SELECT I.{pk}\n\
             FROM inserted I, deleted D\n\
             WHERE\n  \
             I.{pk} = D.{pk} AND\n  \
             (\n\
             {comparisons}\n  \
             )",
            pk = pk,
            comparisons = comparisons.join(" OR\n")
        );
        table.derive_validation(
            Validation::new("Immuter", negative_sql)
                .guard(guards.join(" OR "))
                .after(vec![TriggerEvent::Update]),
        )?;
    }

    // 12. References to abstract types: polymorphic referential integrity.
    for attribute in object_type.attributes(set) {
        if attribute.is_reference() && attribute.references_abstract(set)? {
            synthesize_polymorphic_check(set, object_type, &table, attribute)?;
        }
    }

    // 13. Wrap every validation into a rollback trigger.
    for validation in table.validations() {
        let validation = validation.value;
        let trigger_name = format!("{}Validation", validation.name);
        let cte = validation.common_table_expression.clone().unwrap_or_default();
        let (guard_open, guard_close) = match &validation.guard {
            Some(guard) => (format!("IF {}\nBEGIN\n", guard), "END\n".to_string()),
            None => (String::new(), String::new()),
        };
        let sql = format!(
            "{guard_open}  \
             DECLARE @FailedValidation BIT;\n\
             {cte} SELECT @FailedValidation = 1 WHERE EXISTS ({negative_sql})\n  \
             IF (@@ERROR = 0 AND @FailedValidation = 0) GOTO done\n  \
             ROLLBACK\n  \
             RAISERROR ('Failed to pass validation check {name}', 16, 1) WITH SETERROR\n\
             done:\n\
             {guard_close}",
            guard_open = guard_open,
            cte = cte,
            negative_sql = validation.negative_sql,
            name = validation.name,
            guard_close = guard_close
        );
        let after = validation
            .after
            .clone()
            .unwrap_or_else(|| vec![TriggerEvent::Insert, TriggerEvent::Update]);
        table.derive_trigger(Trigger::new(&type_name, trigger_name, sql).after(after))?;
    }

    // 14. Physical foreign keys for plain persistent references.
    for attribute in object_type.declared_attributes() {
        if !attribute.is_persistent() || !attribute.is_reference() {
            continue;
        }
        let info = attribute.reference_info().expect("reference attribute");
        if info.polymorphic {
            continue;
        }
        let target = attribute.referenced_object_type(set)?;
        if target.is_abstract() {
            continue;
        }
        let foreign_key = ForeignKey::new(
            &type_name,
            vec![attribute.name().to_string()],
            target.path(),
            vec![target.primary_key(set)?.name().to_string()],
        )
        .on_update(info.on_update)
        .on_delete(info.on_delete);
        table.derive_foreign_key(foreign_key)?;
    }

    // 15. A table clusters on at most one index.
    if table.cluster_index_count() > 1 {
        return Err(ConfigError::MultipleClusterIndexes {
            table: table.qualified_table_name(set),
        });
    }

    Ok(())
}

/// Derive the function constraint implementing a cycle scope check.
///
/// The positive SQL walks the declared attribute path through left joins
/// keyed on primary key equality, and holds when the scoping attribute
/// on the direct target equals the value at the end of the path, or the
/// origin reference is null.
fn synthesize_cycle_scope(
    set: &SchemaSet,
    object_type: &ObjectType,
    table: &Table,
    constraint: &CycleConstraint,
) -> Result<(), ConfigError> {
    let origin_attr = object_type.attribute_required(set, &constraint.attribute_name)?;
    let target_object_type = origin_attr.referenced_object_type(set)?;
    let scoping_attribute =
        target_object_type.attribute_required(set, &constraint.scoping_attribute)?;
    let origin_column = Column::of(origin_attr).column_name(set)?;

    // The type owning each path element; element 0 lives on the origin row.
    let mut object_path: Vec<&ObjectType> = Vec::new();
    let mut current = object_type;
    for hop in &constraint.attribute_name_path {
        object_path.push(current);
        current = current
            .attribute_required(set, hop)?
            .referenced_object_type(set)?;
    }

    let mut joins: Vec<String> = Vec::new();
    let mut next_id = format!("@{}", origin_column);
    let mut last_name = "@".to_string();
    for (index, hop) in constraint.attribute_name_path.iter().enumerate() {
        let owner = object_path[index];
        if index != 0 {
            let alias = format!("C{}", index);
            let previous_owner = object_path[index - 1];
            let previous_attr = previous_owner
                .attribute_required(set, &constraint.attribute_name_path[index - 1])?;
            let previous_column = Column::of(previous_attr).column_name(set)?;
            let pk_column = Column::of(owner.primary_key(set)?).column_name(set)?;
            joins.push(format!(
                "LEFT JOIN {} {} ON {}{} = {}.{}",
                Table::of(owner).table_name(),
                alias,
                last_name,
                previous_column,
                alias,
                pk_column
            ));
            last_name = format!("{}.", alias);
        }
        let hop_attr = owner.attribute_required(set, hop)?;
        next_id = format!("{}{}", last_name, Column::of(hop_attr).column_name(set)?);
    }

    let comparison_id = format!("C0.{}", Column::of(scoping_attribute).column_name(set)?);
    let target_pk = Column::of(target_object_type.primary_key(set)?).column_name(set)?;
    let join_block = if joins.is_empty() {
        String::new()
    } else {
        format!("{}\n", joins.join("\n"))
    };
    let positive_sql = format!(
        "SELECT 1 AS Result\n\
         FROM\n  \
         (SELECT '1' AS IgnoreMe) I\n\
         LEFT JOIN {target_table} C0 ON C0.{target_pk} = @{origin_column}\n\
         {join_block}\
         WHERE @{origin_column} IS NULL OR {comparison_id} = {next_id}",
        target_table = Table::of(target_object_type).table_name(),
        target_pk = target_pk,
        origin_column = origin_column,
        join_block = join_block,
        comparison_id = comparison_id,
        next_id = next_id
    );

    let mut parameters = vec![origin_column];
    if let Some(first_hop) = constraint.attribute_name_path.first() {
        let first_attr = object_type.attribute_required(set, first_hop)?;
        parameters.push(Column::of(first_attr).column_name(set)?);
    }
    let name = format!("{}_Scope", constraint.name);
    table.derive_function_constraint(FunctionConstraint::new(
        object_type.name(),
        name,
        parameters,
        positive_sql,
    ))?;
    Ok(())
}

/// Derive the validation enforcing referential integrity for a reference
/// to an abstract type: exactly one concrete subtype table must contain
/// a matching row, or the reference is null.
fn synthesize_polymorphic_check(
    set: &SchemaSet,
    object_type: &ObjectType,
    table: &Table,
    attribute: &Attribute,
) -> Result<(), ConfigError> {
    let target = attribute.referenced_object_type(set)?;
    let subtypes = target.concrete_descendants(set);
    let link_column = attribute.referencing_link_name(set)?;
    let pk = Column::of(object_type.primary_key(set)?).column_name(set)?;

    let mut aliased: Vec<(String, String, &ObjectType)> = Vec::new();
    for (index, subtype) in subtypes.iter().enumerate() {
        let alias = format!("C{}", index);
        let subtype_pk = Column::of(subtype.primary_key(set)?).column_name(set)?;
        aliased.push((alias, subtype_pk, *subtype));
    }

    let mut sql = format!("SELECT I.{}\nFROM\n  inserted I\n", pk);
    for (alias, subtype_pk, subtype) in &aliased {
        sql.push_str(&format!(
            "  LEFT JOIN {} {} ON {}.{} = I.{}\n",
            Table::of(subtype).qualified_table_name(set),
            alias,
            alias,
            subtype_pk,
            link_column
        ));
    }

    let all_null: Vec<String> = aliased
        .iter()
        .map(|(alias, subtype_pk, _)| format!("{}.{} IS NULL", alias, subtype_pk))
        .collect();
    let mut clauses = vec![format!("({})", all_null.join(" AND "))];
    for index in 0..aliased.len().saturating_sub(1) {
        let (alias, subtype_pk, _) = &aliased[index];
        let rest: Vec<String> = aliased[index + 1..]
            .iter()
            .map(|(other, other_pk, _)| format!("{}.{} IS NOT NULL", other, other_pk))
            .collect();
        clauses.push(format!(
            "({}.{} IS NOT NULL AND ({}))",
            alias,
            subtype_pk,
            rest.join(" OR ")
        ));
    }
    sql.push_str(&format!(
        "WHERE I.{} IS NOT NULL AND (\n  {}\n)",
        link_column,
        clauses.join(" OR\n  ")
    ));

    let name = format!("{}ForeignKey", attribute.name());
    let guard = format!("UPDATE({})", link_column);
    table.derive_validation(Validation::new(name, sql).guard(guard))?;
    Ok(())
}

fn column_name(
    set: &SchemaSet,
    object_type: &ObjectType,
    attribute_name: &str,
) -> Result<String, ConfigError> {
    Column::of(object_type.attribute_required(set, attribute_name)?).column_name(set)
}

fn column_names(
    set: &SchemaSet,
    object_type: &ObjectType,
    attribute_names: &[String],
) -> Result<Vec<String>, ConfigError> {
    attribute_names
        .iter()
        .map(|name| column_name(set, object_type, name))
        .collect()
}

fn join_predicates(columns: &[String], op: &str, separator: &str) -> String {
    columns
        .iter()
        .map(|column| format!("{} {}", column, op))
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Enumeration, SchemaSet};
    use crate::sql::model::Origin;
    use indexmap::IndexMap;

    fn new_set() -> SchemaSet {
        crate::init();
        SchemaSet::new()
    }

    fn pk() -> Attribute {
        Attribute::integer("ID").primary_key(true).generated_value(true)
    }

    #[test]
    fn test_codependent_constraint_sql() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut row = ObjectType::new("AttributeRow");
        row.declare_attribute(pk()).unwrap();
        row.declare_attribute(Attribute::string("Value", 50).nullable(true)).unwrap();
        row.declare_attribute(Attribute::string("ValueDesc", 50).nullable(true)).unwrap();
        row.codependent_constraint("value", vec!["Value".to_string(), "ValueDesc".to_string()]);
        schema.add_object_type(row).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.AttributeRow").unwrap());
        let constraint = table.constraint_by_name("AttributeRow_value_CoDep").unwrap();
        assert_eq!(constraint.origin, Origin::Owned);
        assert_eq!(
            constraint.value.sql,
            "( Value IS NOT NULL AND ValueDesc IS NOT NULL ) OR ( Value IS NULL AND ValueDesc IS NULL )"
        );
        assert_eq!(
            constraint.value.constraint_name(),
            "CK_AttributeRow_AttributeRow_value_CoDep"
        );
    }

    #[test]
    fn test_dependency_constraint_sql() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut row = ObjectType::new("Grant");
        row.declare_attribute(pk()).unwrap();
        row.declare_attribute(Attribute::string("Amount", 20).nullable(true)).unwrap();
        row.declare_attribute(Attribute::string("Approver", 50).nullable(true)).unwrap();
        row.declare_attribute(Attribute::date("ApprovedOn").nullable(true)).unwrap();
        row.dependency_constraint(
            "approval",
            "Amount",
            vec!["Approver".to_string(), "ApprovedOn".to_string()],
        );
        schema.add_object_type(row).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.Grant").unwrap());
        let constraint = table.constraint_by_name("Grant_approval_Dep").unwrap();
        assert_eq!(
            constraint.value.sql,
            "Amount IS NULL OR ( Approver IS NOT NULL AND ApprovedOn IS NOT NULL )"
        );
    }

    #[test]
    fn test_incompatible_constraint_sql() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut row = ObjectType::new("AttributeRow");
        row.declare_attribute(pk()).unwrap();
        row.declare_attribute(Attribute::string("Value", 50).nullable(true)).unwrap();
        row.declare_attribute(Attribute::string("CodeSet", 50).nullable(true)).unwrap();
        row.incompatible_constraint("value", vec!["Value".to_string(), "CodeSet".to_string()]);
        schema.add_object_type(row).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.AttributeRow").unwrap());
        let constraint = table.constraint_by_name("AttributeRow_value_Incompat").unwrap();
        assert_eq!(
            constraint.value.sql,
            "(Value IS NOT NULL AND CodeSet IS NULL) OR \
             (Value IS NULL AND CodeSet IS NOT NULL) OR \
             (Value IS NULL AND CodeSet IS NULL)"
        );
    }

    #[test]
    fn test_enumeration_domain_constraints() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut numeric = IndexMap::new();
        numeric.insert("STRING".to_string(), 1);
        numeric.insert("URL".to_string(), 8);
        numeric.insert("DATE".to_string(), 4);
        schema.add_enumeration(Enumeration::numeric("DataType", numeric)).unwrap();
        schema
            .add_enumeration(Enumeration::textual(
                "State",
                vec!["OPEN".to_string(), "CLOSED".to_string()],
            ))
            .unwrap();
        let mut row = ObjectType::new("AttributeType");
        row.declare_attribute(pk()).unwrap();
        row.declare_attribute(Attribute::enumeration("DataType", "DataType")).unwrap();
        row.declare_attribute(Attribute::enumeration("State", "State")).unwrap();
        schema.add_object_type(row).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.AttributeType").unwrap());
        assert_eq!(
            table.constraint_by_name("DataType_Enum").unwrap().value.sql,
            "DataType IN (1, 4, 8)"
        );
        assert_eq!(
            table.constraint_by_name("State_Enum").unwrap().value.sql,
            "State IN ('OPEN', 'CLOSED')"
        );
        // Textual enumerations also refuse blank values.
        assert_eq!(
            table.constraint_by_name("State_NotEmpty").unwrap().value.sql,
            "LEN( State ) > 0"
        );
    }

    #[test]
    fn test_not_empty_applies_to_bounded_strings_only() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut row = ObjectType::new("Location");
        row.declare_attribute(pk()).unwrap();
        row.declare_attribute(Attribute::string("Town", 100)).unwrap();
        row.declare_attribute(Attribute::text("Notes").nullable(true)).unwrap();
        row.declare_attribute(Attribute::string("Salt", 40).allow_blank(true)).unwrap();
        schema.add_object_type(row).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.Location").unwrap());
        assert!(table.constraint_by_name("Town_NotEmpty").is_some());
        assert!(table.constraint_by_name("Notes_NotEmpty").is_none());
        assert!(table.constraint_by_name("Salt_NotEmpty").is_none());
    }

    #[test]
    fn test_set_once_validation_and_trigger() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut image = ObjectType::new("Image");
        image.declare_attribute(pk()).unwrap();
        image
            .declare_attribute(Attribute::string("Thumbnail", 100).nullable(true).set_once(true))
            .unwrap();
        schema.add_object_type(image).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.Image").unwrap());
        let validation = table.validation_by_name("Thumbnail_SetOnce").unwrap();
        assert_eq!(validation.value.after, Some(vec![TriggerEvent::Update]));
        assert!(validation.value.negative_sql.contains("D.Thumbnail IS NOT NULL"));
        assert!(validation.value.negative_sql.contains("D.Thumbnail != I.Thumbnail"));

        let trigger = table.trigger_by_name("Thumbnail_SetOnceValidation").unwrap();
        assert_eq!(trigger.value.after, vec![TriggerEvent::Update]);
        assert!(trigger.value.sql.contains("ROLLBACK"));
        assert!(trigger
            .value
            .sql
            .contains("Failed to pass validation check Thumbnail_SetOnce"));
        assert_eq!(
            trigger.value.trigger_name(),
            "trgImageThumbnail_SetOnceValidation"
        );
    }

    #[test]
    fn test_immuter_guard_and_body() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut user = ObjectType::new("User");
        user.declare_attribute(pk()).unwrap();
        schema.add_object_type(user).unwrap();
        let mut submission = ObjectType::new("Submission");
        submission.declare_attribute(pk()).unwrap();
        submission
            .declare_attribute(Attribute::reference("User").immutable(true))
            .unwrap();
        submission
            .declare_attribute(Attribute::string("ABN", 255).immutable(true).nullable(true))
            .unwrap();
        submission
            .declare_attribute(Attribute::string("Name", 255).nullable(true))
            .unwrap();
        schema.add_object_type(submission).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.Submission").unwrap());
        let immuter = table.validation_by_name("Immuter").unwrap();
        assert_eq!(
            immuter.value.guard.as_deref(),
            Some("UPDATE(UserID) OR UPDATE(ABN)")
        );
        assert!(immuter.value.negative_sql.contains("(I.UserID != D.UserID) OR"));
        assert!(immuter.value.negative_sql.contains("(I.ABN != D.ABN)"));
        assert!(!immuter.value.negative_sql.contains("I.Name"));
        assert!(table.trigger_by_name("ImmuterValidation").is_some());
    }

    #[test]
    fn test_unique_constraint_becomes_unique_index() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut user = ObjectType::new("User");
        user.declare_attribute(pk()).unwrap();
        user.declare_attribute(Attribute::string("Email", 255)).unwrap();
        user.unique(vec!["Email".to_string()]);
        schema.add_object_type(user).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.User").unwrap());
        let index = table.index_by_name("UQ_User_Email").unwrap();
        assert!(index.value.unique);
        assert!(!index.value.cluster);
    }

    #[test]
    fn test_foreign_key_for_plain_reference() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut user = ObjectType::new("User");
        user.declare_attribute(pk()).unwrap();
        schema.add_object_type(user).unwrap();
        let mut submission = ObjectType::new("Submission");
        submission.declare_attribute(pk()).unwrap();
        submission
            .declare_attribute(
                Attribute::reference("User").on_delete(crate::model::RefAction::Cascade),
            )
            .unwrap();
        schema.add_object_type(submission).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.Submission").unwrap());
        let foreign_key = table.foreign_key_by_name("User").unwrap();
        assert_eq!(foreign_key.value.foreign_key_name(), "FK_Submission_User");
        assert_eq!(foreign_key.value.referenced_object_type, "core.User");
        assert_eq!(foreign_key.value.referenced_attribute_names, ["ID"]);
        assert_eq!(foreign_key.value.on_delete, crate::model::RefAction::Cascade);
    }

    #[test]
    fn test_polymorphic_reference_validation() {
        let mut set = new_set();
        let schema = set.define_schema("iris").unwrap();
        let mut unit_type = ObjectType::new("DeployableUnitType").abstract_type();
        unit_type.declare_attribute(pk()).unwrap();
        schema.add_object_type(unit_type).unwrap();
        schema
            .add_object_type(ObjectType::new("CrewType").extends("DeployableUnitType"))
            .unwrap();
        schema
            .add_object_type(ObjectType::new("PhysicalUnitType").extends("DeployableUnitType"))
            .unwrap();
        let mut unit = ObjectType::new("DeployableUnit");
        unit.declare_attribute(pk()).unwrap();
        unit.declare_attribute(
            Attribute::reference("DeployableUnitType")
                .with_name("IsOfType")
                .immutable(true),
        )
        .unwrap();
        schema.add_object_type(unit).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("iris.DeployableUnit").unwrap());
        let validation = table.validation_by_name("IsOfTypeForeignKey").unwrap();
        assert_eq!(validation.value.guard.as_deref(), Some("UPDATE(IsOfTypeID)"));
        let sql = &validation.value.negative_sql;
        assert!(sql.contains("LEFT JOIN iris.tblCrewType C0 ON C0.ID = I.IsOfTypeID"));
        assert!(sql.contains("LEFT JOIN iris.tblPhysicalUnitType C1 ON C1.ID = I.IsOfTypeID"));
        assert!(sql.contains("WHERE I.IsOfTypeID IS NOT NULL AND ("));
        assert!(sql.contains("(C0.ID IS NULL AND C1.ID IS NULL)"));
        assert!(sql.contains("(C0.ID IS NOT NULL AND (C1.ID IS NOT NULL))"));
        // No physical foreign key can point at an abstract table.
        assert!(table.foreign_key_by_name("IsOfType").is_none());
        assert!(table.trigger_by_name("IsOfTypeForeignKeyValidation").is_some());
    }

    #[test]
    fn test_cycle_constraint_function() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut scope = ObjectType::new("Scope");
        scope.declare_attribute(pk()).unwrap();
        schema.add_object_type(scope).unwrap();
        let mut y = ObjectType::new("Y");
        y.declare_attribute(pk()).unwrap();
        y.declare_attribute(Attribute::reference("Scope").with_name("C").nullable(true))
            .unwrap();
        schema.add_object_type(y).unwrap();
        let mut x = ObjectType::new("X");
        x.declare_attribute(pk()).unwrap();
        x.declare_attribute(Attribute::reference("Scope").nullable(true)).unwrap();
        x.declare_attribute(Attribute::reference("Y").with_name("B").nullable(true))
            .unwrap();
        x.cycle_constraint(
            "ScopeCheck",
            "Scope",
            vec!["B".to_string(), "C".to_string()],
            "ID",
        );
        schema.add_object_type(x).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.X").unwrap());
        let constraint = table.function_constraint_by_name("ScopeCheck_Scope").unwrap();
        assert_eq!(constraint.value.parameters, ["ScopeID", "BID"]);
        let sql = &constraint.value.positive_sql;
        assert!(sql.contains("LEFT JOIN tblScope C0 ON C0.ID = @ScopeID"));
        assert!(sql.contains("LEFT JOIN tblY C1 ON @BID = C1.ID"));
        assert!(sql.contains("WHERE @ScopeID IS NULL OR C0.ID = C1.CID"));
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut user = ObjectType::new("User");
        user.declare_attribute(pk()).unwrap();
        user.declare_attribute(Attribute::string("Email", 255).immutable(true)).unwrap();
        user.unique(vec!["Email".to_string()]);
        schema.add_object_type(user).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let table = Table::of(set.object_type("core.User").unwrap());
        let names_first: Vec<String> = table
            .constraints()
            .iter()
            .map(|c| c.value.name.clone())
            .chain(table.validations().iter().map(|v| v.value.name.clone()))
            .chain(table.triggers().iter().map(|t| t.value.name.clone()))
            .collect();
        let index_count = table.indexes().len();

        post_verify(&set).unwrap();
        let names_second: Vec<String> = table
            .constraints()
            .iter()
            .map(|c| c.value.name.clone())
            .chain(table.validations().iter().map(|v| v.value.name.clone()))
            .chain(table.triggers().iter().map(|t| t.value.name.clone()))
            .collect();
        assert_eq!(names_first, names_second);
        assert_eq!(table.indexes().len(), index_count);
    }

    #[test]
    fn test_multiple_cluster_indexes_rejected() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut row = ObjectType::new("CodeSetValue");
        row.declare_attribute(pk()).unwrap();
        row.declare_attribute(Attribute::string("AttributeName", 255)).unwrap();
        row.declare_attribute(Attribute::string("Value", 255)).unwrap();
        schema.add_object_type(row).unwrap();
        set.verify().unwrap();
        let table = Table::of(set.object_type("core.CodeSetValue").unwrap());
        table.cluster(vec!["AttributeName".to_string()]).unwrap();
        table.cluster(vec!["Value".to_string()]).unwrap();

        let err = post_verify(&set).unwrap_err();
        assert!(matches!(err, ConfigError::MultipleClusterIndexes { .. }));
    }

    #[test]
    fn test_partition_scheme_requires_cluster_index() {
        let mut set = new_set();
        let schema = set.define_schema("core").unwrap();
        let mut row = ObjectType::new("Ledger");
        row.declare_attribute(pk()).unwrap();
        schema.add_object_type(row).unwrap();
        set.verify().unwrap();
        Table::of(set.object_type("core.Ledger").unwrap()).set_partition_scheme("ByYear");

        let err = post_verify(&set).unwrap_err();
        assert!(matches!(err, ConfigError::MissingClusterIndex { .. }));
    }

    #[test]
    fn test_subtype_inherits_and_overrides() {
        let mut set = new_set();
        let schema = set.define_schema("iris").unwrap();
        let mut task = ObjectType::new("Task").abstract_type();
        task.declare_attribute(pk()).unwrap();
        task.declare_attribute(Attribute::string("Name", 50).immutable(true)).unwrap();
        schema.add_object_type(task).unwrap();
        let mut specific = ObjectType::new("SpecificTask").extends("Task");
        specific.declare_attribute(Attribute::string("STName", 50)).unwrap();
        schema.add_object_type(specific).unwrap();
        set.verify().unwrap();
        post_verify(&set).unwrap();

        let child = Table::of(set.object_type("iris.SpecificTask").unwrap());
        // The parent's NotEmpty check arrives by inheritance.
        let inherited = child.constraint_by_name("Name_NotEmpty").unwrap();
        assert_eq!(
            inherited.origin,
            Origin::Inherited { from: "iris.Task".to_string() }
        );
        // The child derives its own NotEmpty for its own attribute.
        let owned = child.constraint_by_name("STName_NotEmpty").unwrap();
        assert_eq!(owned.origin, Origin::Owned);
        // The child re-derives Immuter over all immutable columns, so the
        // inherited copy is overridden rather than kept.
        let immuter = child.validation_by_name("Immuter").unwrap();
        assert_eq!(immuter.origin, Origin::Owned);
        assert_eq!(immuter.value.guard.as_deref(), Some("UPDATE(Name)"));
    }
}

