//! Typed model of a GraphQL introspection response.
//!
//! Only the parts of `__schema` needed to build the schema graph and the client schema are
//! modelled. Keys that the graph depends on (`name`, `kind`, `ofType`) are optional at the serde
//! level so that a missing key can be reported against the type and field that lacks it.
use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::QueryError;

/// The kinds a `__Type` can have.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

impl TypeKind {
    /// Whether a field of this (innermost) kind ends a selection.
    pub fn is_leaf(self) -> bool {
        matches!(self, TypeKind::Scalar | TypeKind::Enum)
    }

    /// Whether a field of this (innermost) kind needs a selection set.
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            TypeKind::Object | TypeKind::Interface | TypeKind::Union
        )
    }
}

/// One `LIST` or `NON_NULL` layer around a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Wrapper {
    List,
    NonNull,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    #[serde(default)]
    pub kind: Option<TypeKind>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub of_type: Option<Box<TypeRef>>,
}

/// A type reference with its wrapper chain made explicit, outermost wrapper first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UnwrappedType {
    pub wrappers: Vec<Wrapper>,
    pub kind: TypeKind,
    pub name: String,
}

impl UnwrappedType {
    /// The kind of the reference as declared: the outermost wrapper if there is one, otherwise the
    /// named type's kind.
    pub fn outer_kind(&self) -> TypeKind {
        match self.wrappers.first() {
            Some(Wrapper::List) => TypeKind::List,
            Some(Wrapper::NonNull) => TypeKind::NonNull,
            None => self.kind,
        }
    }

    /// Whether the first wrapper that isn't `NON_NULL` is a `LIST`.
    pub fn is_list(&self) -> bool {
        self.wrappers
            .iter()
            .find(|wrapper| **wrapper != Wrapper::NonNull)
            .is_some_and(|wrapper| *wrapper == Wrapper::List)
    }

    pub fn is_required(&self) -> bool {
        self.wrappers.first() == Some(&Wrapper::NonNull)
    }
}

impl fmt::Display for UnwrappedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_from(
            f: &mut fmt::Formatter<'_>,
            wrappers: &[Wrapper],
            name: &str,
        ) -> fmt::Result {
            match wrappers.split_first() {
                None => write!(f, "{name}"),
                Some((Wrapper::NonNull, rest)) => {
                    write_from(f, rest, name)?;
                    write!(f, "!")
                }
                Some((Wrapper::List, rest)) => {
                    write!(f, "[")?;
                    write_from(f, rest, name)?;
                    write!(f, "]")
                }
            }
        }
        write_from(f, &self.wrappers, &self.name)
    }
}

impl TypeRef {
    /// Walks the `ofType` chain down to the named type.
    ///
    /// `owner` describes where the reference was found and is only used in error messages.
    pub fn unwrap_type(&self, owner: &str) -> Result<UnwrappedType, QueryError> {
        let mut wrappers = Vec::new();
        let mut current = self;
        loop {
            let kind = current.kind.ok_or_else(|| {
                QueryError::schema_ingestion(format!("missing \"kind\" in type of {owner}"))
            })?;
            let wrapper = match kind {
                TypeKind::List => Wrapper::List,
                TypeKind::NonNull => Wrapper::NonNull,
                _ => {
                    let name = current.name.clone().ok_or_else(|| {
                        QueryError::schema_ingestion(format!(
                            "missing \"name\" in {kind} type of {owner}"
                        ))
                    })?;
                    return Ok(UnwrappedType {
                        wrappers,
                        kind,
                        name,
                    });
                }
            };
            wrappers.push(wrapper);
            current = current.of_type.as_deref().ok_or_else(|| {
                QueryError::schema_ingestion(format!(
                    "missing \"ofType\" in {kind} wrapper of {owner}"
                ))
            })?;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub args: Vec<InputValue>,
    #[serde(rename = "type", default)]
    pub ty: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnumValue {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullType {
    pub kind: TypeKind,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
    #[serde(default)]
    pub input_fields: Option<Vec<InputValue>>,
    #[serde(default)]
    pub interfaces: Option<Vec<TypeRef>>,
    #[serde(default)]
    pub enum_values: Option<Vec<EnumValue>>,
    #[serde(default)]
    pub possible_types: Option<Vec<TypeRef>>,
}

impl FullType {
    pub fn fields(&self) -> &[Field] {
        self.fields.as_deref().unwrap_or_default()
    }

    pub fn is_introspection_type(&self) -> bool {
        self.name.starts_with("__")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamedType {
    pub name: String,
}

/// The `__schema` object of an introspection response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionSchema {
    pub query_type: NamedType,
    pub types: Vec<FullType>,
}

impl IntrospectionSchema {
    /// Parses either a full introspection response (`{"data": {"__schema": ...}}`), the `data`
    /// object, or the bare `__schema` object.
    pub fn parse(json: &str) -> Result<Self, QueryError> {
        let value: Value = serde_json::from_str(json).map_err(|err| {
            QueryError::schema_ingestion(format!("introspection is not valid JSON: {err}"))
        })?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self, QueryError> {
        if let Some(data) = value.get_mut("data") {
            value = data.take();
        }
        if let Some(schema) = value.get_mut("__schema") {
            value = schema.take();
        }
        serde_json::from_value(value).map_err(|err| QueryError::schema_ingestion(err.to_string()))
    }

    pub fn get_type(&self, name: &str) -> Option<&FullType> {
        self.types.iter().find(|ty| ty.name == name)
    }

    pub fn query_type(&self) -> Result<&FullType, QueryError> {
        self.get_type(&self.query_type.name).ok_or_else(|| {
            QueryError::schema_ingestion(format!(
                "query type \"{}\" is not in the type list",
                self.query_type.name
            ))
        })
    }

    /// Number of object and interface types declaring each field name.
    pub(crate) fn field_name_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for ty in self.types.iter().filter(|ty| {
            !ty.is_introspection_type()
                && matches!(ty.kind, TypeKind::Object | TypeKind::Interface)
        }) {
            for field in ty.fields() {
                if let Some(name) = field.name.as_deref() {
                    *counts.entry(name).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// One entry per field of the query type, with its arguments in declaration order.
    pub fn root_entries(&self) -> Result<Vec<RootEntry>, QueryError> {
        let query_type = self.query_type()?;
        query_type
            .fields()
            .iter()
            .map(|field| {
                let name = field_name(field, &query_type.name)?;
                let owner = format!("field \"{}.{name}\"", query_type.name);
                let ty = field
                    .ty
                    .as_ref()
                    .ok_or_else(|| QueryError::schema_ingestion(format!("missing type of {owner}")))?
                    .unwrap_type(&owner)?;
                let arguments = field
                    .args
                    .iter()
                    .map(|arg| {
                        let arg_name = arg.name.clone().ok_or_else(|| {
                            QueryError::schema_ingestion(format!(
                                "missing \"name\" in argument of {owner}"
                            ))
                        })?;
                        let arg_owner = format!("argument \"{arg_name}\" of {owner}");
                        let arg_ty = arg
                            .ty
                            .as_ref()
                            .ok_or_else(|| {
                                QueryError::schema_ingestion(format!("missing type of {arg_owner}"))
                            })?
                            .unwrap_type(&arg_owner)?;
                        Ok(RootArgument {
                            kind: if arg_ty.is_list() {
                                ArgumentKind::List
                            } else {
                                ArgumentKind::Scalar
                            },
                            required: arg_ty.is_required(),
                            target_type: arg_ty.name,
                            description: arg.description.clone(),
                            name: arg_name,
                        })
                    })
                    .collect::<Result<Vec<_>, QueryError>>()?;
                Ok(RootEntry {
                    name: name.to_owned(),
                    description: field.description.clone(),
                    plural: ty.is_list(),
                    target_type: ty.name,
                    arguments,
                })
            })
            .collect()
    }
}

pub(crate) fn field_name<'a>(field: &'a Field, owner: &str) -> Result<&'a str, QueryError> {
    field.name.as_deref().ok_or_else(|| {
        QueryError::schema_ingestion(format!("missing \"name\" in a field of type \"{owner}\""))
    })
}

/// Whether a root argument takes one value or a list of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ArgumentKind {
    Scalar,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootArgument {
    pub name: String,
    pub kind: ArgumentKind,
    pub target_type: String,
    pub description: Option<String>,
    pub required: bool,
}

/// A top-level query field and the arguments it takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootEntry {
    pub name: String,
    pub description: Option<String>,
    pub target_type: String,
    /// Whether the field returns a list.
    pub plural: bool,
    pub arguments: Vec<RootArgument>,
}

impl RootEntry {
    pub fn argument(&self, name: &str) -> Option<&RootArgument> {
        self.arguments.iter().find(|arg| arg.name == name)
    }

    /// The argument a plain identifier list is bound to.
    pub fn list_argument(&self) -> Option<&RootArgument> {
        self.arguments
            .iter()
            .find(|arg| arg.kind == ArgumentKind::List)
    }
}
