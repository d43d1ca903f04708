use apollo_compiler::ExecutableDocument;
use apollo_compiler::executable::Selection;
use indexmap::IndexSet;
use pretty_assertions::assert_eq;
use rcsb_data_query::ArgumentValue;
use rcsb_data_query::DataApiSchema;
use rcsb_data_query::InputIds;
use rcsb_data_query::QueryError;
use rstest::rstest;
use serde_json::Value;

use crate::schema;

/// Field names along the first selection of every nested selection set.
fn first_selection_chain(schema: &DataApiSchema, query: &str) -> Vec<String> {
    let document =
        ExecutableDocument::parse_and_validate(schema.client_schema(), query, "query.graphql")
            .unwrap();
    let operation = document.operations.anonymous.as_ref().unwrap();
    let mut names = Vec::new();
    let mut selection_set = &operation.selection_set;
    while let Some(Selection::Field(field)) = selection_set.selections.first() {
        names.push(field.name.to_string());
        selection_set = &field.selection_set;
    }
    names
}

#[rstest]
#[case("entries", &["4HHB"], "method")]
#[case("entries", &["4HHB"], "citation.year")]
#[case("polymer_entity_instances", &["4HHB.A"], "pdbx_description")]
#[case("assembly", &["4HHB-1"], "oligomeric_count")]
#[case("polymer_entity", &["4HHB_1"], "rcsb_entry_info.molecular_weight")]
fn printed_documents_follow_the_resolved_route(
    #[case] input_type: &str,
    #[case] ids: &[&str],
    #[case] field: &str,
) {
    let schema = schema();
    let resolved = schema.resolve_paths(input_type, &[field]).unwrap();
    let query = schema
        .construct_query(&InputIds::ids(ids.iter().copied()), input_type, &[field])
        .unwrap();
    assert_eq!(
        first_selection_chain(&schema, &query),
        schema.field_names(&resolved[0]).unwrap()
    );
    assert_eq!(
        schema
            .construct_query(&InputIds::ids(ids.iter().copied()), input_type, &[field])
            .unwrap(),
        query
    );
}

#[test]
fn merges_shared_prefixes_in_request_order() {
    let query = schema()
        .construct_query(
            &InputIds::ids(["4HHB", "1STP"]),
            "entries",
            &["exptl.method", "struct.title", "entries.rcsb_id", "struct.pdbx_descriptor"],
        )
        .unwrap();
    insta::assert_snapshot!(query, @r###"
    {
      entries(entry_ids: ["4HHB", "1STP"]) {
        exptl {
          method
        }
        struct {
          title
          pdbx_descriptor
        }
        rcsb_id
      }
    }
    "###);
}

#[test]
fn requests_for_one_composite_field_select_its_leaves() {
    let query = schema()
        .construct_query(&InputIds::ids(["4HHB"]), "entries", &["exptl"])
        .unwrap();
    insta::assert_snapshot!(query, @r###"
    {
      entries(entry_ids: ["4HHB"]) {
        exptl {
          method
          crystals_number
        }
      }
    }
    "###);
}

#[test]
fn composite_fields_expand_to_their_leaves() {
    let query = schema()
        .construct_query(&InputIds::ids(["4HHB"]), "entries", &["entries.polymer_entities"])
        .unwrap();
    // `entry` and `polymer_entity` point back to types already on the route.
    insta::assert_snapshot!(query, @r###"
    {
      entries(entry_ids: ["4HHB"]) {
        polymer_entities {
          rcsb_id
          rcsb_polymer_entity {
            pdbx_description
            formula_weight
          }
          polymer_entity_instances {
            rcsb_id
            rcsb_polymer_instance_annotation {
              name
              type
            }
          }
        }
      }
    }
    "###);
}

#[test]
fn fields_typed_like_an_ancestor_are_expanded() {
    let schema = schema();
    let query = schema
        .construct_query(&InputIds::ids(["4HHB_1"]), "polymer_entity", &["entry.polymer_entities"])
        .unwrap();
    insta::assert_snapshot!(query, @r###"
    {
      polymer_entity(entry_id: "4HHB", entity_id: "1") {
        entry {
          polymer_entities {
            rcsb_id
            rcsb_polymer_entity {
              pdbx_description
              formula_weight
            }
            polymer_entity_instances {
              rcsb_id
              rcsb_polymer_instance_annotation {
                name
                type
              }
            }
          }
        }
      }
    }
    "###);
    assert!(
        schema
            .construct_query(
                &InputIds::ids(["4HHB_1", "1STP_1"]),
                "polymer_entities",
                &["entry.polymer_entities"]
            )
            .is_ok()
    );
}

#[test]
fn singular_identifiers_are_split_into_arguments() {
    let query = schema()
        .construct_query(&InputIds::ids(["4HHB-1"]), "assembly", &["pdbx_struct_assembly"])
        .unwrap();
    insta::assert_snapshot!(query, @r###"
    {
      assembly(entry_id: "4HHB", assembly_id: "1") {
        pdbx_struct_assembly {
          oligomeric_count
          details
        }
      }
    }
    "###);
}

#[test]
fn argument_maps_are_passed_through() {
    let input = InputIds::arguments([
        ("entity_id", ArgumentValue::String("1".to_owned())),
        ("entry_id", ArgumentValue::String("4HHB".to_owned())),
    ]);
    let query = schema()
        .construct_query(&input, "polymer_entity", &["rcsb_polymer_entity.formula_weight"])
        .unwrap();
    insta::assert_snapshot!(query, @r###"
    {
      polymer_entity(entry_id: "4HHB", entity_id: "1") {
        rcsb_polymer_entity {
          formula_weight
        }
      }
    }
    "###);
}

#[test]
fn instance_identifiers_bind_to_the_list_argument() {
    let query = schema()
        .construct_query(
            &InputIds::ids(["4HHB.A", "4HHB.B"]),
            "polymer_entity_instances",
            &["rcsb_polymer_instance_annotation.type", "polymer_entity_instances.rcsb_id"],
        )
        .unwrap();
    insta::assert_snapshot!(query, @r###"
    {
      polymer_entity_instances(instance_ids: ["4HHB.A", "4HHB.B"]) {
        rcsb_polymer_instance_annotation {
          type
        }
        rcsb_id
      }
    }
    "###);
}

#[test]
fn several_identifiers_need_a_plural_root() {
    let error = schema()
        .construct_query(&InputIds::ids(["4HHB", "1STP"]), "entry", &["exptl"])
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "Invalid input for \"entry\": 2 identifiers given, but \"entry\" is not a plural type. \
         Try making \"entry\" plural"
    );
}

#[test]
fn identifier_lists_are_capped() {
    let schema = schema();
    let ids = (0..=300).map(|index| format!("{index:04}")).collect::<Vec<_>>();
    let error = schema
        .construct_query(&InputIds::ids(ids.clone()), "entries", &["exptl"])
        .unwrap_err();
    assert!(matches!(error, QueryError::InvalidInput { .. }));
    assert!(
        schema
            .construct_query(&InputIds::ids(&ids[..300]), "entries", &["exptl"])
            .is_ok()
    );
}

#[test]
fn list_arguments_are_capped() {
    let schema = schema();
    let ids = (0..=300).map(|index| format!("{index:04}")).collect::<Vec<_>>();
    let input = InputIds::arguments([("entry_ids", ArgumentValue::List(ids))]);
    assert_eq!(
        schema
            .construct_query(&input, "entries", &["exptl"])
            .unwrap_err(),
        QueryError::InvalidInput {
            input_type: "entries".to_owned(),
            message: "301 identifiers given, at most 300 are accepted per query".to_owned(),
        }
    );
}

#[test]
fn malformed_identifiers_are_rejected() {
    assert_eq!(
        schema()
            .construct_query(&InputIds::ids(["4HHB_1"]), "assemblies", &["details"])
            .unwrap_err(),
        QueryError::InvalidInput {
            input_type: "assemblies".to_owned(),
            message: "invalid assembly identifier \"4HHB_1\"".to_owned(),
        }
    );
}

#[test]
fn empty_requests_are_rejected() {
    let schema = schema();
    assert!(matches!(
        schema.construct_query(&InputIds::ids(["4HHB"]), "entries", &[] as &[&str]),
        Err(QueryError::InvalidInput { .. })
    ));
    assert!(matches!(
        schema.construct_query(&InputIds::ids(Vec::<String>::new()), "entries", &["exptl"]),
        Err(QueryError::InvalidInput { .. })
    ));
}

#[test]
fn resolution_errors_come_before_argument_errors() {
    let error = schema()
        .construct_query(&InputIds::ids(["not an id"]), "entries", &["journal_abbrev"])
        .unwrap_err();
    assert!(matches!(error, QueryError::AmbiguousField { .. }));
}

/// Identifiers accepted by each root field of the fixture.
fn ids_for(input_type: &str) -> InputIds {
    match input_type {
        "entry" | "entries" => InputIds::ids(["4HHB"]),
        "polymer_entity" | "polymer_entities" => InputIds::ids(["4HHB_1"]),
        "polymer_entity_instances" => InputIds::ids(["4HHB.A"]),
        "assembly" | "assemblies" => InputIds::ids(["4HHB-1"]),
        other => panic!("no identifiers for {other}"),
    }
}

#[test]
fn every_field_name_resolves_or_is_reported() {
    let schema = schema();
    let document: Value = serde_json::from_str(crate::SCHEMA_JSON).unwrap();
    let field_names = document["data"]["__schema"]["types"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|ty| !ty["name"].as_str().unwrap().starts_with("__"))
        .flat_map(|ty| ty["fields"].as_array().cloned().unwrap_or_default())
        .map(|field| field["name"].as_str().unwrap().to_owned())
        .collect::<IndexSet<_>>();
    let roots = schema
        .roots()
        .map(|root| root.name.clone())
        .collect::<Vec<_>>();

    for input_type in &roots {
        for name in &field_names {
            let qualified = schema.get_unique_fields(name).unwrap();
            let resolved = schema.resolve_paths(input_type, &[name]);
            if !qualified.is_empty() {
                let mut alternatives = qualified;
                alternatives.sort();
                assert_eq!(
                    resolved.unwrap_err(),
                    QueryError::AmbiguousField {
                        field: name.clone(),
                        alternatives,
                    },
                    "{input_type} / {name}"
                );
                continue;
            }
            match resolved {
                Ok(resolved) => {
                    let query = schema
                        .construct_query(&ids_for(input_type), input_type, &[name])
                        .unwrap_or_else(|err| panic!("{input_type} / {name}: {err}"));
                    let route = schema.field_names(&resolved[0]).unwrap();
                    assert!(
                        first_selection_chain(&schema, &query).starts_with(&route),
                        "{input_type} / {name}"
                    );
                }
                Err(QueryError::AmbiguousField { alternatives, .. }) => {
                    assert!(alternatives.len() > 1, "{input_type} / {name}");
                }
                Err(QueryError::UnreachableField { .. }) => {}
                Err(other) => panic!("{input_type} / {name}: {other}"),
            }
        }
    }
}
