//! The structural encoder: project a typed asset value into files.
//!
//! The encoder walks an asset's field layout and flattens it into a
//! `path → bytes` map, which the disk persister then writes under the
//! working directory. It is purely data-directed and never re-invokes an
//! asset's own serialisation.
//!
//! Rust has no field reflection, so an encodable value describes its layout
//! as a [`Node`] tree via the [`Layout`] trait. The node kinds mirror the
//! encoding rules:
//!
//! - [`Node::Record`]: named fields carrying per-field directives;
//!   embedded, untagged record fields are flattened into their parent
//!   following the classic dominance rules (shallowest depth wins, ties
//!   broken by an explicit directive, equal ties drop the name).
//! - [`Node::Map`]: string-keyed entries, each encoded at `path/key`.
//! - [`Node::Seq`]: ordered items, each encoded at `path/<elem>-<index>`.
//! - [`Node::Bytes`]: emitted verbatim as a single file.
//! - [`Node::Scalar`]: marshalled by the effective marshaller. An explicit
//!   directive wins, otherwise the path extension decides (`.yaml`/`.yml`
//!   mean YAML, everything else JSON).
//! - [`Node::Files`]: the [`Persister`] short circuit. The value supplies
//!   its own file map and the structural walk is skipped for that subtree.
//! - [`Node::Nothing`]: an absent optional; emits nothing.
//!
//! The encoder is a pure function of the tree. Distinct paths are the
//! caller's responsibility: duplicates overwrite silently.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::asset::DynError;
use crate::file::{self, FileError};

/// Capability by which a value bypasses the structural walk and emits its
/// own `path → bytes` map.
pub trait Persister {
  fn files_map(&self) -> Result<BTreeMap<String, Vec<u8>>, DynError>;
}

/// A value that can describe its field layout to the encoder.
pub trait Layout {
  fn layout(&self) -> Result<Node, EncodeError>;
}

#[derive(Debug, Error)]
pub enum EncodeError {
  #[error("empty filename while encoding a {kind} value")]
  EmptyFilename { kind: &'static str },

  #[error("failed to convert value into an encodable form: {0}")]
  ToValue(#[source] serde_json::Error),

  #[error("failed to marshal {path} as JSON: {source}")]
  Json {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to marshal {path} as YAML: {source}")]
  Yaml {
    path: String,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("persister failed: {0}")]
  Persister(#[source] DynError),
}

/// Errors from encoding a layout and writing it to disk.
#[derive(Debug, Error)]
pub enum PersistError {
  #[error(transparent)]
  Encode(#[from] EncodeError),

  #[error(transparent)]
  File(#[from] FileError),
}

/// How a leaf value is serialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marshaller {
  Json,
  Yaml,
}

/// Per-field serialisation directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
  /// Use the field's declared name as the path; infer the marshaller.
  Default,
  /// Skip the field entirely.
  Skip,
  /// Emit at the given path, optionally forcing a marshaller.
  Path {
    path: String,
    marshaller: Option<Marshaller>,
  },
}

impl Directive {
  pub fn path(path: impl Into<String>) -> Self {
    Directive::Path {
      path: path.into(),
      marshaller: None,
    }
  }

  pub fn path_with(path: impl Into<String>, marshaller: Marshaller) -> Self {
    Directive::Path {
      path: path.into(),
      marshaller: Some(marshaller),
    }
  }
}

/// One field of a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  pub name: &'static str,
  pub directive: Directive,
  pub embedded: bool,
  pub node: Node,
}

/// A record value: named fields with directives.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
  pub type_name: &'static str,
  pub fields: Vec<Field>,
}

impl Record {
  pub fn new(type_name: &'static str) -> Self {
    Self {
      type_name,
      fields: Vec::new(),
    }
  }

  /// Add a regular field.
  pub fn field(mut self, name: &'static str, directive: Directive, node: Node) -> Self {
    self.fields.push(Field {
      name,
      directive,
      embedded: false,
      node,
    });
    self
  }

  /// Add an embedded (anonymous) field, flattened into this record.
  pub fn embedded(mut self, name: &'static str, node: Node) -> Self {
    self.fields.push(Field {
      name,
      directive: Directive::Default,
      embedded: true,
      node,
    });
    self
  }
}

/// A node of an encodable value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
  Record(Record),
  Map(BTreeMap<String, Node>),
  Seq { elem: &'static str, items: Vec<Node> },
  Bytes(Vec<u8>),
  Scalar(serde_json::Value),
  Files(BTreeMap<String, Vec<u8>>),
  Nothing,
}

impl Node {
  /// A leaf marshalled by the effective marshaller.
  pub fn scalar<T: Serialize>(value: &T) -> Result<Node, EncodeError> {
    serde_json::to_value(value).map(Node::Scalar).map_err(EncodeError::ToValue)
  }

  /// The [`Persister`] short circuit for one subtree.
  pub fn persister(value: &dyn Persister) -> Result<Node, EncodeError> {
    value.files_map().map(Node::Files).map_err(EncodeError::Persister)
  }

  /// An optional wrapper: absent values emit nothing.
  pub fn optional(inner: Option<Node>) -> Node {
    inner.unwrap_or(Node::Nothing)
  }

  pub fn seq(elem: &'static str, items: Vec<Node>) -> Node {
    Node::Seq { elem, items }
  }
}

/// Encode a layout tree into a flat `path → bytes` map.
pub fn encode(node: &Node) -> Result<BTreeMap<String, Vec<u8>>, EncodeError> {
  let mut out = BTreeMap::new();
  walk(node, "", None, &mut out)?;
  Ok(out)
}

/// Encode a value's layout.
pub fn encode_layout(value: &impl Layout) -> Result<BTreeMap<String, Vec<u8>>, EncodeError> {
  encode(&value.layout()?)
}

/// Encode a value's layout and write the result under `directory`.
pub fn persist(directory: &Path, value: &impl Layout) -> Result<(), PersistError> {
  let files = encode_layout(value)?;
  let files: Vec<file::File> = files
    .into_iter()
    .map(|(filename, data)| file::File::new(filename, data))
    .collect();
  file::write_files(directory, &files)?;
  Ok(())
}

fn walk(
  node: &Node,
  path: &str,
  marshaller: Option<Marshaller>,
  out: &mut BTreeMap<String, Vec<u8>>,
) -> Result<(), EncodeError> {
  match node {
    Node::Nothing => Ok(()),

    Node::Files(files) => {
      for (filename, data) in files {
        out.insert(filename.clone(), data.clone());
      }
      Ok(())
    }

    Node::Record(record) => {
      for flat in flatten(record) {
        let child = join(path, &flat.path);
        walk(flat.node, &child, flat.marshaller, out)?;
      }
      Ok(())
    }

    Node::Map(entries) => {
      for (key, value) in entries {
        walk(value, &join(path, key), marshaller, out)?;
      }
      Ok(())
    }

    Node::Seq { elem, items } => {
      for (index, item) in items.iter().enumerate() {
        walk(item, &join(path, &format!("{elem}-{index}")), marshaller, out)?;
      }
      Ok(())
    }

    Node::Bytes(data) => {
      if path.is_empty() {
        return Err(EncodeError::EmptyFilename { kind: "byte" });
      }
      out.insert(path.to_string(), data.clone());
      Ok(())
    }

    Node::Scalar(value) => {
      if path.is_empty() {
        return Err(EncodeError::EmptyFilename { kind: "scalar" });
      }
      let effective = marshaller.unwrap_or_else(|| infer_marshaller(path));
      let bytes = match effective {
        Marshaller::Json => serde_json::to_vec(value).map_err(|source| EncodeError::Json {
          path: path.to_string(),
          source,
        })?,
        Marshaller::Yaml => serde_yaml::to_string(value)
          .map(String::into_bytes)
          .map_err(|source| EncodeError::Yaml {
            path: path.to_string(),
            source,
          })?,
      };
      out.insert(path.to_string(), bytes);
      Ok(())
    }
  }
}

// A surviving candidate field after flattening.
#[derive(Debug, Clone)]
struct FlatField<'a> {
  path: String,
  tagged: bool,
  depth: usize,
  marshaller: Option<Marshaller>,
  node: &'a Node,
}

// Flatten a record through its embedded fields, resolving name collisions
// with the classic dominance rules:
//
// 1. enumerate candidates breadth-first through embedded record fields;
// 2. group candidates by effective name;
// 3. within a group the shallowest field dominates, ties broken by the
//    presence of an explicit directive; an equal-depth equal-tag tie drops
//    the name entirely.
fn flatten(record: &Record) -> Vec<FlatField<'_>> {
  let mut candidates: Vec<FlatField<'_>> = Vec::new();

  let mut level: Vec<&Record> = vec![record];
  let mut depth = 0;
  while !level.is_empty() {
    let mut next: Vec<&Record> = Vec::new();
    for rec in &level {
      for field in &rec.fields {
        match &field.directive {
          Directive::Skip => {}
          Directive::Path { path, marshaller } => {
            candidates.push(FlatField {
              path: path.clone(),
              tagged: true,
              depth,
              marshaller: *marshaller,
              node: &field.node,
            });
          }
          Directive::Default => {
            if field.embedded
              && let Node::Record(inner) = &field.node
            {
              next.push(inner);
              continue;
            }
            candidates.push(FlatField {
              path: field.name.to_string(),
              tagged: false,
              depth,
              marshaller: None,
              node: &field.node,
            });
          }
        }
      }
    }
    level = next;
    depth += 1;
  }

  // Sort so the dominant candidate of each name comes first: by name, then
  // depth, then tagged before untagged.
  candidates.sort_by(|a, b| {
    a.path
      .cmp(&b.path)
      .then(a.depth.cmp(&b.depth))
      .then(b.tagged.cmp(&a.tagged))
  });

  let mut out = Vec::new();
  let mut i = 0;
  while i < candidates.len() {
    let mut j = i + 1;
    while j < candidates.len() && candidates[j].path == candidates[i].path {
      j += 1;
    }

    if j - i == 1 {
      out.push(candidates[i].clone());
    } else {
      let first = &candidates[i];
      let second = &candidates[i + 1];
      let unresolvable = first.depth == second.depth && first.tagged == second.tagged;
      if !unresolvable {
        out.push(first.clone());
      }
      // Otherwise the whole name is dropped.
    }
    i = j;
  }
  out
}

fn infer_marshaller(path: &str) -> Marshaller {
  match Path::new(path).extension().and_then(|ext| ext.to_str()) {
    Some("yaml") | Some("yml") => Marshaller::Yaml,
    _ => Marshaller::Json,
  }
}

fn join(base: &str, segment: &str) -> String {
  if base.is_empty() {
    segment.to_string()
  } else {
    format!("{base}/{segment}")
  }
}
