//! Turns a [`SchemaDefinition`] into the table graph.

use super::association::{Association, Dependent};
use super::attribute::{AttributeDefinition, ID, PARENT_ID, PARENT_TYPE, TYPE};
use super::definition::{AssociationSpec, AttributeSpec, Collection, SchemaDefinition, TableSpec};
use super::table::{Strategy, TableDefinition, TableId};
use super::SchemaError;
use crate::types::{Restriction, TypeDefinition, TypeRegistry};
use crate::value::Value;
use heck::ToSnakeCase;
use std::collections::HashMap;

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// `PrintedDocument` → `printed_document`, `HTTPServer` → `http_server`.
pub(crate) fn underscore(name: &str) -> String {
    name.to_snake_case()
}

/// Appends a plain `s` when the pluralizer leaves the word unchanged.
pub(crate) fn pluralize(word: &str) -> String {
    let plural = pluralizer::pluralize(word, 2, false);
    if plural == word {
        format!("{word}s")
    } else {
        plural
    }
}

struct Names {
    by_name: HashMap<String, TableId>,
    by_underscore: HashMap<String, TableId>,
}

impl Names {
    fn lookup(&self, name: &str) -> Result<TableId, SchemaError> {
        self.by_name
            .get(name)
            .or_else(|| self.by_underscore.get(name))
            .copied()
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }
}

pub(crate) fn compile(definition: SchemaDefinition, registry: &TypeRegistry) -> Result<Vec<TableDefinition>, SchemaError> {
    let specs = definition.tables;
    let names = index_names(&specs)?;
    let underscores: Vec<String> = specs.iter().map(|s| underscore(&s.name)).collect();

    let supers = specs
        .iter()
        .map(|s| s.super_name.as_deref().map(|n| names.lookup(n)).transpose())
        .collect::<Result<Vec<_>, _>>()?;
    let order = parents_first(&specs, &supers)?;

    let mut own_children = vec![Vec::new(); specs.len()];
    for (i, parent) in supers.iter().enumerate() {
        if let Some(parent) = parent {
            own_children[parent.0].push(TableId(i));
        }
    }

    let object_id = registry.get("objectId").ok_or_else(|| SchemaError::UnknownType {
        table: String::new(),
        attribute: ID.to_string(),
        type_name: "objectId".to_string(),
    })?;

    let mut merged: Vec<Vec<AttributeDefinition>> = vec![Vec::new(); specs.len()];
    for &i in &order {
        let inherited = match supers[i] {
            Some(parent) => merged[parent.0].clone(),
            None => vec![AttributeDefinition::primary_key(object_id.clone())],
        };
        merged[i] = merge_attributes(&specs[i], inherited, registry)?;
    }

    let strategies: Vec<Strategy> = (0..specs.len())
        .map(|i| {
            if merged[i].iter().any(|a| a.name == TYPE) {
                Strategy::SingleTable
            } else if own_children[i].is_empty() {
                Strategy::Leaf
            } else {
                Strategy::ClassTable
            }
        })
        .collect();

    let collections = collection_names(&specs, &supers, &strategies, &underscores, &order)?;

    let mut children = vec![Vec::new(); specs.len()];
    for (i, slot) in children.iter_mut().enumerate() {
        collect_descendants(&own_children, TableId(i), slot);
    }

    let mut associations = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| resolve_associations(spec, i, &names, &underscores, &collections, &merged))
        .collect::<Result<Vec<_>, _>>()?;

    let mut tables = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        tables.push(TableDefinition {
            id: TableId(i),
            name: spec.name.clone(),
            underscore_name: underscores[i].clone(),
            collection_name: collections[i].clone(),
            own_attributes: spec.attributes.iter().map(|a| a.name.clone()).collect(),
            attributes: std::mem::take(&mut merged[i]),
            super_table: supers[i],
            own_children: own_children[i].clone(),
            children: std::mem::take(&mut children[i]),
            associations: std::mem::take(&mut associations[i]),
            strategy: strategies[i],
        });
    }
    Ok(tables)
}

fn index_names(specs: &[TableSpec]) -> Result<Names, SchemaError> {
    let mut names = Names {
        by_name: HashMap::new(),
        by_underscore: HashMap::new(),
    };
    for (i, spec) in specs.iter().enumerate() {
        validate_identifier(&spec.name)?;
        if names.by_name.insert(spec.name.clone(), TableId(i)).is_some()
            || names.by_underscore.insert(underscore(&spec.name), TableId(i)).is_some()
        {
            return Err(SchemaError::DuplicateTable(spec.name.clone()));
        }
    }
    Ok(names)
}

/// Orders table indices so every super table precedes its children.
fn parents_first(specs: &[TableSpec], supers: &[Option<TableId>]) -> Result<Vec<usize>, SchemaError> {
    let mut depths = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        let mut depth = 0usize;
        let mut cursor = supers[i];
        while let Some(parent) = cursor {
            depth += 1;
            if depth > specs.len() {
                return Err(SchemaError::InheritanceCycle(spec.name.clone()));
            }
            cursor = supers[parent.0];
        }
        depths.push(depth);
    }
    let mut order: Vec<usize> = (0..specs.len()).collect();
    order.sort_by_key(|&i| depths[i]);
    Ok(order)
}

fn collect_descendants(own_children: &[Vec<TableId>], id: TableId, out: &mut Vec<TableId>) {
    for &child in &own_children[id.0] {
        out.push(child);
        collect_descendants(own_children, child, out);
    }
}

fn merge_attributes(
    spec: &TableSpec,
    mut attributes: Vec<AttributeDefinition>,
    registry: &TypeRegistry,
) -> Result<Vec<AttributeDefinition>, SchemaError> {
    let mut seen: Vec<&str> = Vec::new();
    for attr in &spec.attributes {
        validate_identifier(&attr.name)?;
        if attr.name == ID {
            return Err(SchemaError::ReservedAttribute {
                table: spec.name.clone(),
                attribute: attr.name.clone(),
            });
        }
        if seen.contains(&attr.name.as_str()) {
            return Err(SchemaError::DuplicateAttribute {
                table: spec.name.clone(),
                attribute: attr.name.clone(),
            });
        }
        seen.push(&attr.name);

        let type_def = registry.get(&attr.type_name).ok_or_else(|| SchemaError::UnknownType {
            table: spec.name.clone(),
            attribute: attr.name.clone(),
            type_name: attr.type_name.clone(),
        })?;
        let restrictions = build_restrictions(&spec.name, attr, type_def.as_ref())?;

        let position = attributes.iter().position(|a| a.name == attr.name);
        let merged = match position {
            Some(index) => {
                let existing = &mut attributes[index];
                if existing.type_name() != type_def.name() || existing.collection != attr.collection {
                    return Err(SchemaError::TypeMismatch {
                        table: spec.name.clone(),
                        attribute: attr.name.clone(),
                        expected: describe(existing.type_name(), existing.collection),
                        found: describe(type_def.name(), attr.collection),
                    });
                }
                existing.restrictions.extend(restrictions);
                if let Some(required) = attr.required {
                    existing.is_required = required;
                }
                if let Some(readonly) = attr.readonly {
                    existing.is_read_only = readonly;
                }
                if let Some(unique) = attr.unique {
                    existing.is_unique = unique;
                }
                existing
            }
            None => {
                attributes.push(AttributeDefinition {
                    name: attr.name.clone(),
                    type_def,
                    collection: attr.collection,
                    is_required: attr.required.unwrap_or(false),
                    is_read_only: attr.readonly.unwrap_or(false),
                    is_unique: attr.unique.unwrap_or(false),
                    restrictions,
                    default_value: None,
                    is_serial: false,
                    is_primary_key: false,
                });
                let last = attributes.len() - 1;
                &mut attributes[last]
            }
        };
        if let Some(default) = &attr.default {
            merged.default_value = Some(merged.convert(&Value::from(default))?);
        }
        if merged.name == TYPE && (merged.type_name() != "string" || merged.is_collection()) {
            return Err(SchemaError::InvalidDefinition {
                table: spec.name.clone(),
                reason: "the type discriminator must be a scalar string".to_string(),
            });
        }
    }
    Ok(attributes)
}

fn describe(type_name: &str, collection: Collection) -> String {
    match collection {
        Collection::Scalar => type_name.to_string(),
        Collection::Array => format!("array of {type_name}"),
        Collection::Set => format!("set of {type_name}"),
    }
}

fn build_restrictions(
    table: &str,
    attr: &AttributeSpec,
    type_def: &dyn TypeDefinition,
) -> Result<Vec<Restriction>, SchemaError> {
    let wrap = |source| SchemaError::Restriction {
        table: table.to_string(),
        attribute: attr.name.clone(),
        source,
    };
    let mut restrictions = Vec::new();
    if attr.minimum.is_some() || attr.maximum.is_some() {
        restrictions.push(
            type_def
                .range(attr.minimum.as_ref(), attr.maximum.as_ref())
                .map_err(wrap)?,
        );
    }
    if attr.min_length.is_some() || attr.max_length.is_some() {
        restrictions.push(type_def.length(attr.min_length, attr.max_length).map_err(wrap)?);
    }
    if let Some(pattern) = &attr.pattern {
        restrictions.push(type_def.pattern(pattern).map_err(wrap)?);
    }
    if let Some(values) = &attr.enumeration {
        restrictions.push(type_def.enumeration(values).map_err(wrap)?);
    }
    Ok(restrictions)
}

fn collection_names(
    specs: &[TableSpec],
    supers: &[Option<TableId>],
    strategies: &[Strategy],
    underscores: &[String],
    order: &[usize],
) -> Result<Vec<String>, SchemaError> {
    let mut collections = vec![String::new(); specs.len()];
    let mut owners: HashMap<String, usize> = HashMap::new();
    for &i in order {
        let family = match supers[i] {
            Some(parent) if strategies[i] == Strategy::SingleTable && strategies[parent.0] == Strategy::SingleTable => {
                Some(collections[parent.0].clone())
            }
            _ => None,
        };
        collections[i] = match (family, &specs[i].table) {
            (Some(family), Some(explicit)) if *explicit != family => {
                return Err(SchemaError::InvalidDefinition {
                    table: specs[i].name.clone(),
                    reason: format!("single-table descendant cannot use table '{explicit}', family table is '{family}'"),
                });
            }
            (Some(family), _) => family,
            (None, explicit) => {
                let name = explicit.clone().unwrap_or_else(|| pluralize(&underscores[i]));
                validate_identifier(&name)?;
                if let Some(other) = owners.insert(name.clone(), i) {
                    return Err(SchemaError::InvalidDefinition {
                        table: specs[i].name.clone(),
                        reason: format!("table '{name}' is already used by '{}'", specs[other].name),
                    });
                }
                name
            }
        };
    }
    Ok(collections)
}

fn resolve_associations(
    spec: &TableSpec,
    owner: usize,
    names: &Names,
    underscores: &[String],
    collections: &[String],
    attributes: &[Vec<AttributeDefinition>],
) -> Result<Vec<Association>, SchemaError> {
    let key = |explicit: &Option<String>, default: String| -> Result<String, SchemaError> {
        let key = explicit.clone().unwrap_or(default);
        validate_identifier(&key)?;
        Ok(key)
    };
    let mut associations = Vec::new();

    for assoc in &spec.belongs_to {
        let target = names.lookup(&assoc.target)?;
        associations.push(Association::BelongsTo {
            target,
            foreign_key: key(&assoc.foreign_key, format!("{}_id", underscores[target.0]))?,
        });
    }

    let dependent = |assoc: &AssociationSpec| -> Result<Dependent, SchemaError> {
        let target = names.lookup(&assoc.target)?;
        if assoc.polymorphic {
            let has = |column: &str| attributes[target.0].iter().any(|a| a.name == column);
            if !has(PARENT_TYPE) || !has(PARENT_ID) {
                return Err(SchemaError::InvalidDefinition {
                    table: spec.name.clone(),
                    reason: format!(
                        "polymorphic target '{}' needs {PARENT_TYPE} and {PARENT_ID} attributes",
                        assoc.target
                    ),
                });
            }
            return Ok(Dependent {
                target,
                foreign_key: key(&assoc.foreign_key, PARENT_ID.to_string())?,
                polymorphic: true,
            });
        }
        Ok(Dependent {
            target,
            foreign_key: key(&assoc.foreign_key, format!("{}_id", underscores[owner]))?,
            polymorphic: false,
        })
    };
    for assoc in &spec.has_one {
        associations.push(Association::HasOne(dependent(assoc)?));
    }
    for assoc in &spec.has_many {
        associations.push(Association::HasMany(dependent(assoc)?));
    }

    for assoc in &spec.has_and_belongs_to_many {
        let target = names.lookup(&assoc.target)?;
        let mut pair = [collections[owner].as_str(), collections[target.0].as_str()];
        pair.sort_unstable();
        let through = key(&assoc.through, pair.join("_"))?;
        let foreign_key = key(&assoc.foreign_key, format!("{}_id", underscores[owner]))?;
        let association_key = key(&assoc.association_key, format!("{}_id", underscores[target.0]))?;
        if foreign_key == association_key {
            return Err(SchemaError::InvalidDefinition {
                table: spec.name.clone(),
                reason: format!("join table '{through}' needs distinct key columns, both are '{foreign_key}'"),
            });
        }
        associations.push(Association::HasAndBelongsToMany {
            target,
            through,
            foreign_key,
            association_key,
        });
    }
    Ok(associations)
}

#[cfg(test)]
mod tests {
    use super::super::Schema;
    use super::*;
    use serde_json::json;

    fn compile_json(value: serde_json::Value) -> Result<Schema, SchemaError> {
        Schema::from_json(&value.to_string(), &TypeRegistry::standard())
    }

    #[test]
    fn test_underscore() {
        assert_eq!(underscore("PrintedDocument"), "printed_document");
        assert_eq!(underscore("HTTPServer"), "http_server");
        assert_eq!(underscore("helpFile2"), "help_file2");
        assert_eq!(underscore("already_snake"), "already_snake");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("book"), "books");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("wish"), "wishes");
    }

    #[test]
    fn test_pluralize_vowel_before_y() {
        assert_eq!(pluralize("gateway"), "gateways");
        assert_eq!(pluralize("key"), "keys");
        assert_eq!(pluralize("day"), "days");
    }

    #[test]
    fn test_merge_keeps_ancestor_first_and_accumulates_restrictions() {
        let schema = compile_json(json!({"tables": [
            {"name": "device", "attributes": [
                {"name": "name", "type": "string", "maxLength": 20, "required": true},
                {"name": "port", "type": "integer", "default": 80}]},
            {"name": "router", "super": "device", "attributes": [
                {"name": "name", "type": "string", "pattern": "[a-z]+"},
                {"name": "port", "type": "integer", "required": true},
                {"name": "lanes", "type": "integer"}]}
        ]}))
        .unwrap();
        let router = schema.find("router").unwrap();
        let names: Vec<_> = router.attributes().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["id", "name", "port", "lanes"]);

        let name = router.attribute("name").unwrap();
        assert_eq!(name.restrictions().len(), 2);
        assert_eq!(name.restrictions()[0].kind(), "length");
        assert_eq!(name.restrictions()[1].kind(), "pattern");
        assert!(name.is_required());

        let port = router.attribute("port").unwrap();
        assert!(port.is_required());
        assert_eq!(port.default_value(), Some(&Value::Int(80)));

        let device = schema.find("device").unwrap();
        assert_eq!(device.attribute("name").unwrap().restrictions().len(), 1);
        assert!(!device.attribute("port").unwrap().is_required());
        assert_eq!(router.own_attributes(), &["name", "port", "lanes"]);
    }

    #[test]
    fn test_merged_attributes_are_superset() {
        let schema = compile_json(json!({"tables": [
            {"name": "a", "attributes": [{"name": "x", "type": "integer"}]},
            {"name": "b", "super": "a", "attributes": [{"name": "y", "type": "string"}]},
            {"name": "c", "super": "b", "attributes": [{"name": "z", "type": "boolean"}]}
        ]}))
        .unwrap();
        for table in schema.all() {
            if let Some(parent) = table.super_table() {
                for attr in schema.table(parent).attributes() {
                    let mine = table.attribute(attr.name()).unwrap();
                    assert_eq!(mine.type_name(), attr.type_name());
                }
            }
        }
    }

    #[test]
    fn test_redeclared_type_mismatch() {
        let err = compile_json(json!({"tables": [
            {"name": "a", "attributes": [{"name": "x", "type": "integer"}]},
            {"name": "b", "super": "a", "attributes": [{"name": "x", "type": "string"}]}
        ]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn test_declaration_order_independent() {
        let schema = compile_json(json!({"tables": [
            {"name": "b", "super": "a"},
            {"name": "a", "attributes": [{"name": "x", "type": "integer"}]}
        ]}))
        .unwrap();
        assert!(schema.find("b").unwrap().has_attribute("x"));
        assert_eq!(schema.find("a").unwrap().strategy(), Strategy::ClassTable);
        assert_eq!(schema.find("b").unwrap().strategy(), Strategy::Leaf);
    }

    #[test]
    fn test_load_errors() {
        let cases = [
            json!({"tables": [{"name": "a"}, {"name": "a"}]}),
            json!({"tables": [{"name": "a", "super": "ghost"}]}),
            json!({"tables": [{"name": "a", "super": "b"}, {"name": "b", "super": "a"}]}),
            json!({"tables": [{"name": "a", "attributes": [{"name": "x", "type": "uuid"}]}]}),
            json!({"tables": [{"name": "a", "attributes": [{"name": "id", "type": "integer"}]}]}),
            json!({"tables": [{"name": "a b"}]}),
            json!({"tables": [{"name": "a", "attributes": [{"name": "x", "type": "boolean", "maxLength": 3}]}]}),
            json!({"tables": [{"name": "a", "attributes": [{"name": "type", "type": "integer"}]}]}),
            json!({"tables": [{"name": "a", "hasMany": [{"target": "b", "polymorphic": true}]}, {"name": "b"}]}),
            json!({"tables": [{"name": "a", "table": "things"}, {"name": "b", "table": "things"}]}),
        ];
        for case in cases {
            assert!(compile_json(case.clone()).is_err(), "accepted {case}");
        }
    }

    #[test]
    fn test_sti_family_shares_highest_sti_table() {
        let schema = compile_json(json!({"tables": [
            {"name": "asset"},
            {"name": "document", "super": "asset", "attributes": [{"name": "type", "type": "string"}]},
            {"name": "book", "super": "document"},
            {"name": "novel", "super": "book"}
        ]}))
        .unwrap();
        assert_eq!(schema.find("asset").unwrap().strategy(), Strategy::ClassTable);
        assert_eq!(schema.find("asset").unwrap().collection_name(), "assets");
        for name in ["document", "book", "novel"] {
            let table = schema.find(name).unwrap();
            assert_eq!(table.strategy(), Strategy::SingleTable, "{name}");
            assert_eq!(table.collection_name(), "documents", "{name}");
        }
        let document = schema.find("document").unwrap();
        assert_eq!(document.children().len(), 2);
    }

    #[test]
    fn test_association_defaults() {
        let schema = compile_json(json!({"tables": [
            {"name": "user",
             "belongsTo": [{"target": "company"}],
             "hasMany": [{"target": "post"}, {"target": "comment", "polymorphic": true}],
             "hasOne": [{"target": "profile", "foreignKey": "owner_id"}],
             "hasAndBelongsToMany": [{"target": "group"}]},
            {"name": "company"},
            {"name": "post"},
            {"name": "profile"},
            {"name": "group"},
            {"name": "comment", "attributes": [
                {"name": "parent_type", "type": "string"},
                {"name": "parent_id", "type": "objectId"}]}
        ]}))
        .unwrap();
        let company = schema.find("company").unwrap().table_id();
        let post = schema.find("post").unwrap().table_id();
        let comment = schema.find("comment").unwrap().table_id();
        let profile = schema.find("profile").unwrap().table_id();
        let group = schema.find("group").unwrap().table_id();
        let user = schema.find("user").unwrap();
        assert_eq!(
            user.associations(),
            &[
                Association::BelongsTo {
                    target: company,
                    foreign_key: "company_id".to_string()
                },
                Association::HasOne(Dependent {
                    target: profile,
                    foreign_key: "owner_id".to_string(),
                    polymorphic: false
                }),
                Association::HasMany(Dependent {
                    target: post,
                    foreign_key: "user_id".to_string(),
                    polymorphic: false
                }),
                Association::HasMany(Dependent {
                    target: comment,
                    foreign_key: "parent_id".to_string(),
                    polymorphic: true
                }),
                Association::HasAndBelongsToMany {
                    target: group,
                    through: "groups_users".to_string(),
                    foreign_key: "user_id".to_string(),
                    association_key: "group_id".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_default_is_converted_and_checked() {
        let err = compile_json(json!({"tables": [
            {"name": "a", "attributes": [{"name": "n", "type": "integer", "minimum": 5, "default": 1}]}
        ]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAttribute { .. }), "{err}");
    }
}
