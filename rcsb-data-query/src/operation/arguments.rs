//! Binding caller-supplied identifiers to the arguments of a root field.
use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::error::QueryError;
use crate::introspection::ArgumentKind;
use crate::introspection::RootEntry;

/// An `MA_`/`AF_` computed-model prefix or a four character PDB code.
const ENTRY_CODE: &str = r"(?:(?:MA|AF)_[A-Za-z0-9]*|[A-Z0-9]{4})";

static ENTRY_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<entry_id>{ENTRY_CODE})$")).expect("Invalid regex pattern")
});
static ENTITY_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<entry_id>{ENTRY_CODE})_(?P<entity_id>[0-9]+)$"))
        .expect("Invalid regex pattern")
});
static INSTANCE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<entry_id>{ENTRY_CODE})\.(?P<asym_id>[A-Z]+)$"))
        .expect("Invalid regex pattern")
});
static ASSEMBLY_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<entry_id>{ENTRY_CODE})-(?P<assembly_id>[0-9]+)$"))
        .expect("Invalid regex pattern")
});
static INTERFACE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<entry_id>{ENTRY_CODE})-(?P<assembly_id>[0-9]+)\.(?P<interface_id>[0-9]+)$"
    ))
    .expect("Invalid regex pattern")
});

/// What a root field is looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IdFamily {
    Entry,
    Entity,
    Instance,
    Assembly,
    Interface,
}

impl IdFamily {
    /// The family of the root fields this crate knows the identifier grammar of.
    pub fn of(input_type: &str) -> Option<Self> {
        match input_type {
            "entry" | "entries" => Some(Self::Entry),
            "polymer_entity" | "polymer_entities" | "branched_entity" | "branched_entities"
            | "nonpolymer_entity" | "nonpolymer_entities" => Some(Self::Entity),
            "polymer_entity_instance"
            | "polymer_entity_instances"
            | "branched_entity_instance"
            | "branched_entity_instances"
            | "nonpolymer_entity_instance"
            | "nonpolymer_entity_instances" => Some(Self::Instance),
            "assembly" | "assemblies" => Some(Self::Assembly),
            "interface" | "interfaces" => Some(Self::Interface),
            _ => None,
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Entry => &*ENTRY_ID,
            Self::Entity => &*ENTITY_ID,
            Self::Instance => &*INSTANCE_ID,
            Self::Assembly => &*ASSEMBLY_ID,
            Self::Interface => &*INTERFACE_ID,
        }
    }

    pub fn is_match(self, id: &str) -> bool {
        self.pattern().is_match(id)
    }

    /// Splits an identifier into its named components, e.g. `4HHB-1` into `entry_id` and
    /// `assembly_id`.
    pub fn split(self, id: &str) -> Option<IndexMap<String, String>> {
        let pattern = self.pattern();
        let captures = pattern.captures(id)?;
        Some(
            pattern
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|value| (name.to_owned(), value.as_str().to_owned()))
                })
                .collect(),
        )
    }
}

/// A single argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    String(String),
    List(Vec<String>),
}

impl ArgumentValue {
    fn kind(&self) -> ArgumentKind {
        match self {
            ArgumentValue::String(_) => ArgumentKind::Scalar,
            ArgumentValue::List(_) => ArgumentKind::List,
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
            // JSON string escaping is valid GraphQL string escaping.
            let quoted = serde_json::to_string(value).map_err(|_| fmt::Error)?;
            f.write_str(&quoted)
        }
        match self {
            ArgumentValue::String(value) => quoted(f, value),
            ArgumentValue::List(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    quoted(f, value)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// The identifiers a query is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputIds {
    /// Identifiers bound to the root field's arguments by their grammar.
    Ids(Vec<String>),
    /// Explicit argument values.
    Arguments(IndexMap<String, ArgumentValue>),
}

impl InputIds {
    pub fn ids<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Self::Ids(ids.into_iter().map(Into::into).collect())
    }

    pub fn arguments<K: Into<String>>(
        arguments: impl IntoIterator<Item = (K, ArgumentValue)>,
    ) -> Self {
        Self::Arguments(
            arguments
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

impl<S: Into<String>> From<Vec<S>> for InputIds {
    fn from(ids: Vec<S>) -> Self {
        Self::ids(ids)
    }
}

/// Arguments bound to a root field, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundArguments(pub(crate) Vec<(String, ArgumentValue)>);

impl fmt::Display for BoundArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// Binds `input_ids` to the arguments of `root`.
///
/// An identifier list larger than `max_input_ids` is rejected.
pub(crate) fn bind_arguments(
    root: &RootEntry,
    input_ids: &InputIds,
    max_input_ids: usize,
) -> Result<BoundArguments, QueryError> {
    let input_type = root.name.as_str();
    let mut values: IndexMap<String, ArgumentValue> = match input_ids {
        InputIds::Arguments(arguments) => {
            for (name, value) in arguments {
                let argument = root.argument(name).ok_or_else(|| {
                    QueryError::invalid_input(input_type, format!("unknown argument \"{name}\""))
                })?;
                if argument.kind != value.kind() {
                    return Err(QueryError::invalid_input(
                        input_type,
                        format!(
                            "argument \"{name}\" takes a {} value",
                            argument.kind.to_string().to_lowercase()
                        ),
                    ));
                }
                if let ArgumentValue::List(ids) = value {
                    check_id_count(input_type, ids.len(), max_input_ids)?;
                }
            }
            arguments.clone()
        }
        InputIds::Ids(ids) => bind_ids(root, ids, max_input_ids)?,
    };

    let mut bound = Vec::with_capacity(values.len());
    for argument in &root.arguments {
        match values.shift_remove(&argument.name) {
            Some(value) => bound.push((argument.name.clone(), value)),
            None if argument.required => {
                return Err(QueryError::invalid_input(
                    input_type,
                    format!("missing required argument \"{}\"", argument.name),
                ));
            }
            None => {}
        }
    }
    Ok(BoundArguments(bound))
}

fn bind_ids(
    root: &RootEntry,
    ids: &[String],
    max_input_ids: usize,
) -> Result<IndexMap<String, ArgumentValue>, QueryError> {
    let input_type = root.name.as_str();
    check_id_count(input_type, ids.len(), max_input_ids)?;
    let family = IdFamily::of(input_type);
    if let Some(family) = family {
        if let Some(invalid) = ids.iter().find(|id| !family.is_match(id)) {
            return Err(QueryError::invalid_input(
                input_type,
                format!("invalid {family} identifier \"{invalid}\""),
            ));
        }
    }

    if root.plural {
        let argument = root.list_argument().ok_or_else(|| {
            QueryError::invalid_input(input_type, "root field has no list argument")
        })?;
        return Ok(IndexMap::from([(
            argument.name.clone(),
            ArgumentValue::List(ids.to_vec()),
        )]));
    }

    let [id] = ids else {
        return Err(QueryError::invalid_input(
            input_type,
            format!(
                "{} identifiers given, but \"{input_type}\" is not a plural type. Try making \"{input_type}\" plural",
                ids.len()
            ),
        ));
    };
    if let Some(parts) = family.and_then(|family| family.split(id)) {
        return Ok(parts
            .into_iter()
            .filter(|(name, _)| root.argument(name).is_some())
            .map(|(name, value)| (name, ArgumentValue::String(value)))
            .collect());
    }
    match root.arguments.as_slice() {
        [argument] => Ok(IndexMap::from([(
            argument.name.clone(),
            ArgumentValue::String(id.clone()),
        )])),
        _ => Err(QueryError::invalid_input(
            input_type,
            "identifier can't be split into this root field's arguments, pass an argument map",
        )),
    }
}

fn check_id_count(input_type: &str, count: usize, max_input_ids: usize) -> Result<(), QueryError> {
    if count == 0 {
        return Err(QueryError::invalid_input(input_type, "no identifiers given"));
    }
    if count > max_input_ids {
        return Err(QueryError::invalid_input(
            input_type,
            format!("{count} identifiers given, at most {max_input_ids} are accepted per query"),
        ));
    }
    Ok(())
}
