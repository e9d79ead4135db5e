use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shape of the JSON document a mapping was decoded from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MappingShape {
    #[default]
    Flat,
    Nested,
}

/// Ordered key -> text mapping for one locale.
///
/// Nested documents are flattened to dotted paths (`a.b.c`); array items get
/// an index suffix (`items[0]`). Order is the order of the source document.
///
/// A decoded mapping remembers the document it came from and the exact
/// segment path of every string leaf. Encoding starts from that document, so
/// numbers, booleans, nulls, empty containers and keys that themselves
/// contain a `.` come back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleMapping {
    entries: IndexMap<String, String>,
    shape: MappingShape,
    paths: HashMap<String, Vec<Segment>>,
    document: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Segment {
    Key(String),
    Index(usize),
}

impl LocaleMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shape(shape: MappingShape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    /// Same shape, layout and non-text content as `self`, with no entries.
    pub fn empty_like(&self) -> Self {
        Self {
            entries: IndexMap::new(),
            shape: self.shape,
            paths: self.paths.clone(),
            document: self.document.clone(),
        }
    }

    pub fn shape(&self) -> MappingShape {
        self.shape
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets `key`, keeping its original position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Copies `key` from `other` together with where it sits in `other`'s
    /// document.
    pub fn insert_from(&mut self, other: &LocaleMapping, key: &str) -> bool {
        let Some(value) = other.get(key) else {
            return false;
        };
        self.insert(key, value);
        self.paths.insert(key.to_string(), other.path(key));
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes a JSON document. Returns `None` if the root is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let root = value.as_object()?;

        let nested = root.values().any(|v| v.is_object() || v.is_array());
        let mut mapping = Self::with_shape(if nested {
            MappingShape::Nested
        } else {
            MappingShape::Flat
        });

        for (k, v) in root {
            let mut path = vec![Segment::Key(k.clone())];
            mapping.flatten_into(k.clone(), &mut path, v);
        }
        mapping.document = Some(value.clone());

        Some(mapping)
    }

    /// Encodes back to JSON in this mapping's shape.
    ///
    /// Text leaves of the remembered document are replaced by this mapping's
    /// values; leaves with no entry are dropped, except inside arrays where
    /// removing an item would shift its siblings. Entries the document has
    /// no slot for are appended.
    pub fn to_value(&self) -> Value {
        let mut pending: IndexMap<Vec<Segment>, (&str, &str)> = self
            .entries
            .iter()
            .map(|(k, v)| (self.path(k), (k.as_str(), v.as_str())))
            .collect();

        let mut root = match &self.document {
            Some(doc) => {
                let mut root = doc.clone();
                fill(&mut root, &mut Vec::new(), &mut pending);
                root
            }
            None => Value::Object(Map::new()),
        };

        for (path, (key, text)) in pending {
            if !set_path(&mut root, &path, Value::String(text.to_string())) {
                tracing::warn!(key = %key, "key collides with an existing value, skipped");
            }
        }
        root
    }

    /// True when both mappings encode to the same document, key order included.
    pub fn encodes_same(&self, other: &LocaleMapping) -> bool {
        match (
            serde_json::to_string(&self.to_value()),
            serde_json::to_string(&other.to_value()),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    fn path(&self, key: &str) -> Vec<Segment> {
        match self.paths.get(key) {
            Some(path) => path.clone(),
            None => match self.shape {
                MappingShape::Flat => vec![Segment::Key(key.to_string())],
                MappingShape::Nested => parse_key(key),
            },
        }
    }

    fn flatten_into(&mut self, key: String, path: &mut Vec<Segment>, value: &Value) {
        match value {
            Value::String(s) => {
                self.paths.insert(key.clone(), path.clone());
                self.entries.insert(key, s.clone());
            }
            Value::Object(map) => {
                for (k, v) in map {
                    path.push(Segment::Key(k.clone()));
                    self.flatten_into(format!("{key}.{k}"), path, v);
                    path.pop();
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    path.push(Segment::Index(i));
                    self.flatten_into(format!("{key}[{i}]"), path, v);
                    path.pop();
                }
            }
            other => {
                tracing::trace!(key = %key, value = %other, "non-text leaf kept as is");
            }
        }
    }
}

impl FromIterator<(String, String)> for LocaleMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// Writes pending texts into the text leaves of `node`. Returns false when
/// `node` is a text leaf nobody supplied a value for.
fn fill(
    node: &mut Value,
    path: &mut Vec<Segment>,
    pending: &mut IndexMap<Vec<Segment>, (&str, &str)>,
) -> bool {
    match node {
        Value::String(s) => match pending.shift_remove(path.as_slice()) {
            Some((_, text)) => {
                *s = text.to_string();
                true
            }
            None => false,
        },
        Value::Object(map) => {
            map.retain(|k, v| {
                path.push(Segment::Key(k.clone()));
                let keep = fill(v, path, pending);
                path.pop();
                keep
            });
            true
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                path.push(Segment::Index(i));
                fill(item, path, pending);
                path.pop();
            }
            true
        }
        _ => true,
    }
}

fn parse_key(key: &str) -> Vec<Segment> {
    let mut segments = Vec::new();

    for part in key.split('.') {
        let (name, indices) = split_indices(part);
        segments.push(Segment::Key(name.to_string()));
        segments.extend(indices.into_iter().map(Segment::Index));
    }

    segments
}

/// `items[0][2]` -> (`items`, [0, 2]). Anything that is not a clean index
/// suffix stays part of the name.
fn split_indices(part: &str) -> (&str, Vec<usize>) {
    let mut name = part;
    let mut indices = Vec::new();

    while name.ends_with(']') {
        let Some(open) = name.rfind('[') else { break };
        let Ok(idx) = name[open + 1..name.len() - 1].parse::<usize>() else {
            break;
        };
        if open == 0 {
            break;
        }
        indices.push(idx);
        name = &name[..open];
    }

    indices.reverse();
    (name, indices)
}

fn set_path(node: &mut Value, path: &[Segment], leaf: Value) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return false;
    };

    let next_is_index = matches!(rest.first(), Some(Segment::Index(_)));
    let empty_child = || {
        if next_is_index {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        }
    };

    let slot = match (head, node) {
        (Segment::Key(k), Value::Object(map)) => {
            if rest.is_empty() {
                if map.get(k).is_some_and(|v| !v.is_string()) {
                    return false;
                }
                map.insert(k.clone(), leaf);
                return true;
            }
            map.entry(k.clone()).or_insert_with(empty_child)
        }
        (Segment::Index(i), Value::Array(items)) => {
            while items.len() <= *i {
                items.push(Value::Null);
            }
            if rest.is_empty() {
                items[*i] = leaf;
                return true;
            }
            if items[*i].is_null() {
                items[*i] = empty_child();
            }
            &mut items[*i]
        }
        _ => return false,
    };

    set_path(slot, rest, leaf)
}
