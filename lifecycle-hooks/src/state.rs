//! Attribute snapshots and field-level diffs.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::debug;

use crate::model::{FieldKind, LifecycleModel};

/// Separator between a relation and a field on the related entity.
pub const PATH_SEPARATOR: char = '.';

/// Captured attribute state of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Fields whose value differs between two snapshots, as `(prior, current)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    changes: BTreeMap<String, (Value, Value)>,
}

impl Diff {
    /// Compare `current` against `initial`.
    ///
    /// Only keys recorded in `initial` are considered; keys that appear only in
    /// `current` are not changes.
    pub fn between(initial: &Snapshot, current: &Snapshot) -> Self {
        let changes = initial
            .iter()
            .filter_map(|(field, prior)| {
                current
                    .get(field)
                    .filter(|now| *now != prior)
                    .map(|now| (field.clone(), (prior.clone(), now.clone())))
            })
            .collect();
        Self { changes }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&(Value, Value)> {
        self.changes.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Map a foreign-key field named by its logical name to its stored attribute.
pub fn sanitize_field_name<M: LifecycleModel>(field: &str) -> Cow<'_, str> {
    match M::field_kind(field) {
        FieldKind::ForeignKey { attname } if attname != field => Cow::Owned(attname),
        _ => Cow::Borrowed(field),
    }
}

/// Read `relation.field` through one related entity.
///
/// An unset relation, a relation that cannot be read, or a field missing on the
/// related entity all resolve to `null`.
pub fn resolve_path<M: LifecycleModel>(model: &M, path: &str) -> Value {
    let Some((relation, field)) = path.split_once(PATH_SEPARATOR) else {
        return model.attributes().remove(path).unwrap_or(Value::Null);
    };

    match model.related(relation) {
        Ok(Some(related)) => match related.get(field) {
            Some(value) => value.clone(),
            None => {
                debug!(
                    model = M::model_name(),
                    relation, field, "related entity has no such field; resolving to null"
                );
                Value::Null
            }
        },
        Ok(None) => Value::Null,
        Err(err) => {
            debug!(
                model = M::model_name(),
                relation,
                error = %err,
                "relation could not be read; resolving to null"
            );
            Value::Null
        }
    }
}

/// The live value of a field or `relation.field` path.
pub fn current_value<M: LifecycleModel>(model: &M, field: &str) -> Value {
    if field.contains(PATH_SEPARATOR) {
        resolve_path(model, field)
    } else {
        let field = sanitize_field_name::<M>(field);
        model.attributes().remove(field.as_ref()).unwrap_or(Value::Null)
    }
}

/// Capture the attribute state plus every watched `relation.field` path.
pub fn snapshot<M: LifecycleModel>(model: &M, watched: &[String]) -> Snapshot {
    let mut values: BTreeMap<String, Value> = model.attributes().into_iter().collect();

    for path in watched {
        values.insert(path.clone(), resolve_path(model, path));
    }

    Snapshot { values }
}

/// Prior value, current value and change flag of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub initial: Value,
    pub current: Value,
    pub changed: bool,
}

impl FieldState {
    /// Read the state of `field` on `model` against its last snapshot.
    pub fn read<M: LifecycleModel>(model: &M, field: &str) -> Self {
        let key = sanitize_field_name::<M>(field);
        let recorded = model
            .lifecycle_state()
            .initial()
            .and_then(|snapshot| snapshot.get(key.as_ref()));

        let (current, present) = if key.contains(PATH_SEPARATOR) {
            (resolve_path(model, &key), true)
        } else {
            match model.attributes().remove(key.as_ref()) {
                Some(value) => (value, true),
                None => (Value::Null, false),
            }
        };

        let changed = present && recorded.is_some_and(|prior| *prior != current);

        Self {
            initial: recorded.cloned().unwrap_or(Value::Null),
            current,
            changed,
        }
    }
}
