//! Rebuilds an [`apollo_compiler::Schema`] from an introspection response so synthesized documents
//! can be validated locally.
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast::EnumValueDefinition;
use apollo_compiler::ast::FieldDefinition;
use apollo_compiler::ast::Type;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::EnumType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InputObjectType;
use apollo_compiler::schema::InputValueDefinition;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::Name;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::ScalarType;
use apollo_compiler::schema::UnionType;
use apollo_compiler::validation::Valid;

use crate::error::QueryError;
use crate::introspection::Field;
use crate::introspection::FullType;
use crate::introspection::InputValue;
use crate::introspection::IntrospectionSchema;
use crate::introspection::TypeKind;
use crate::introspection::TypeRef;
use crate::introspection::UnwrappedType;
use crate::introspection::Wrapper;
use crate::introspection::field_name;

/// Builds and validates the schema described by `introspection`.
///
/// Built-in scalars and introspection types already exist in a fresh [`Schema`] and are skipped.
pub(crate) fn build_client_schema(
    introspection: &IntrospectionSchema,
) -> Result<Valid<Schema>, QueryError> {
    let mut schema = Schema::new();
    schema.schema_definition.make_mut().query =
        Some(ComponentName::from(name(&introspection.query_type.name)?));

    for full_type in &introspection.types {
        if full_type.is_introspection_type() {
            continue;
        }
        let type_name = name(&full_type.name)?;
        if schema.types.contains_key(&type_name) {
            continue;
        }
        let extended = match full_type.kind {
            TypeKind::Scalar => ExtendedType::Scalar(Node::new(ScalarType {
                description: description(&full_type.description),
                name: type_name.clone(),
                directives: Default::default(),
            })),
            TypeKind::Object => ExtendedType::Object(Node::new(ObjectType {
                description: description(&full_type.description),
                name: type_name.clone(),
                implements_interfaces: interfaces(full_type)?,
                directives: Default::default(),
                fields: fields(full_type)?,
            })),
            TypeKind::Interface => ExtendedType::Interface(Node::new(InterfaceType {
                description: description(&full_type.description),
                name: type_name.clone(),
                implements_interfaces: interfaces(full_type)?,
                directives: Default::default(),
                fields: fields(full_type)?,
            })),
            TypeKind::Union => {
                let mut members = IndexSet::default();
                for member in full_type.possible_types.iter().flatten() {
                    members.insert(ComponentName::from(named(member, &full_type.name)?));
                }
                ExtendedType::Union(Node::new(UnionType {
                    description: description(&full_type.description),
                    name: type_name.clone(),
                    directives: Default::default(),
                    members,
                }))
            }
            TypeKind::Enum => {
                let mut values = IndexMap::default();
                for enum_value in full_type.enum_values.iter().flatten() {
                    let value = name(&enum_value.name)?;
                    values.insert(
                        value.clone(),
                        Component::new(EnumValueDefinition {
                            description: description(&enum_value.description),
                            value,
                            directives: Default::default(),
                        }),
                    );
                }
                ExtendedType::Enum(Node::new(EnumType {
                    description: description(&full_type.description),
                    name: type_name.clone(),
                    directives: Default::default(),
                    values,
                }))
            }
            TypeKind::InputObject => {
                let mut input_fields = IndexMap::default();
                for input_field in full_type.input_fields.iter().flatten() {
                    let definition = input_value(input_field, &full_type.name)?;
                    input_fields.insert(definition.name.clone(), Component::new(definition));
                }
                ExtendedType::InputObject(Node::new(InputObjectType {
                    description: description(&full_type.description),
                    name: type_name.clone(),
                    directives: Default::default(),
                    fields: input_fields,
                }))
            }
            TypeKind::List | TypeKind::NonNull => {
                return Err(QueryError::schema_ingestion(format!(
                    "type \"{}\" has wrapper kind {}",
                    full_type.name, full_type.kind
                )));
            }
        };
        schema.types.insert(type_name, extended);
    }

    schema.validate().map_err(|with_errors| {
        QueryError::schema_ingestion(format!(
            "introspected schema is invalid:\n{}",
            with_errors.errors
        ))
    })
}

fn name(value: &str) -> Result<Name, QueryError> {
    Name::new(value)
        .map_err(|err| QueryError::schema_ingestion(format!("invalid name \"{value}\": {err}")))
}

fn description(value: &Option<String>) -> Option<Node<str>> {
    value.as_deref().map(Into::into)
}

fn named(type_ref: &TypeRef, owner: &str) -> Result<Name, QueryError> {
    let unwrapped = type_ref.unwrap_type(&format!("type \"{owner}\""))?;
    name(&unwrapped.name)
}

fn interfaces(full_type: &FullType) -> Result<IndexSet<ComponentName>, QueryError> {
    let mut implements = IndexSet::default();
    for interface in full_type.interfaces.iter().flatten() {
        implements.insert(ComponentName::from(named(interface, &full_type.name)?));
    }
    Ok(implements)
}

fn fields(full_type: &FullType) -> Result<IndexMap<Name, Component<FieldDefinition>>, QueryError> {
    let mut fields = IndexMap::default();
    for field in full_type.fields() {
        let definition = field_definition(field, &full_type.name)?;
        fields.insert(definition.name.clone(), Component::new(definition));
    }
    Ok(fields)
}

fn field_definition(field: &Field, owner: &str) -> Result<FieldDefinition, QueryError> {
    let field_name = field_name(field, owner)?;
    let context = format!("field \"{owner}.{field_name}\"");
    let ty = field
        .ty
        .as_ref()
        .ok_or_else(|| QueryError::schema_ingestion(format!("missing type of {context}")))?
        .unwrap_type(&context)?;
    Ok(FieldDefinition {
        description: description(&field.description),
        name: name(field_name)?,
        arguments: field
            .args
            .iter()
            .map(|arg| input_value(arg, &context).map(Node::new))
            .collect::<Result<_, _>>()?,
        ty: ast_type(&ty)?,
        directives: Default::default(),
    })
}

fn input_value(value: &InputValue, owner: &str) -> Result<InputValueDefinition, QueryError> {
    let value_name = value.name.as_deref().ok_or_else(|| {
        QueryError::schema_ingestion(format!("missing \"name\" in an input value of {owner}"))
    })?;
    let context = format!("input value \"{value_name}\" of {owner}");
    let ty = value
        .ty
        .as_ref()
        .ok_or_else(|| QueryError::schema_ingestion(format!("missing type of {context}")))?
        .unwrap_type(&context)?;
    Ok(InputValueDefinition {
        description: description(&value.description),
        name: name(value_name)?,
        ty: Node::new(ast_type(&ty)?),
        // Defaults only matter for execution, which happens server-side.
        default_value: None,
        directives: Default::default(),
    })
}

/// Rebuilds the wrapped type from the innermost named type outwards.
fn ast_type(unwrapped: &UnwrappedType) -> Result<Type, QueryError> {
    let mut ty = Type::Named(name(&unwrapped.name)?);
    for wrapper in unwrapped.wrappers.iter().rev() {
        ty = match wrapper {
            Wrapper::NonNull => non_null(ty),
            Wrapper::List => Type::List(Box::new(ty)),
        };
    }
    Ok(ty)
}

fn non_null(ty: Type) -> Type {
    match ty {
        Type::Named(name) => Type::NonNullNamed(name),
        Type::List(inner) => Type::NonNullList(inner),
        already_non_null => already_non_null,
    }
}
