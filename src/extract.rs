//! Locate reusable-workflow calls in a workflow document.
//!
//! The document is loaded through the YAML event stream so every node keeps
//! the 1-based line it started on. Structural decoding alone would lose that
//! position, and the reference index needs it to point at the calling line.
//!
//! # Line contract
//!
//! For a `uses:` scalar reported on line `N`, [`source_line`] with `N` returns
//! the verbatim text of that line (leading whitespace included). Both sides
//! count lines the way YAML does: `\r\n`, `\n` and a lone `\r` each end a
//! line, and the break is not part of the line text. A block scalar
//! (`uses: >-`) is reported on the line holding its `|` or `>` indicator.
use crate::error::{NodeKind, ResolveError};
use crate::model::Reference;
use regex::Regex;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

const CORE_TAG_HANDLE: &str = "tag:yaml.org,2002:";
const MERGE_KEY: &str = "<<";
/// Upper bound on merge sources visited while expanding one mapping.
const MAX_MERGE_SOURCES: usize = 256;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\r|\n").expect("valid line break pattern"));
static BLOCK_INDICATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)[|>](?:[1-9][+-]?|[+-][1-9]?)?$").expect("valid block indicator pattern")
});

static INT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-+]?[0-9]+|0o[0-7]+|0x[0-9a-fA-F]+)$").expect("valid int pattern")
});
static FLOAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$",
    )
    .expect("valid float pattern")
});

/// A `uses:` call found in a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtractedReference {
    /// The invocation string exactly as written.
    pub(crate) invocation: String,
    /// Identifier of the job declaring the call.
    pub(crate) job: String,
    pub(crate) reference: Reference,
}

/// The `uses` field of one job, classified once at the parse boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UsesField {
    /// Missing or null.
    Absent,
    /// A plain string value.
    Invocation { value: String, line: usize },
    /// Anything else; always rejected by [`extract_references`].
    Other { kind: NodeKind, line: usize },
}

/// A job identifier and its classified `uses` field, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobUses {
    pub(crate) job: String,
    pub(crate) uses: UsesField,
}

/// Extract every job's reusable-workflow call from `yaml`.
///
/// Jobs are reported in document order. A job whose `uses` is not a string
/// fails the whole extraction with [`ResolveError::UnexpectedNodeType`].
pub(crate) fn extract_references(
    yaml: &str,
    filename: &str,
) -> Result<Vec<ExtractedReference>, ResolveError> {
    let mut extracted = Vec::new();
    for job in parse_jobs(yaml, filename)? {
        match job.uses {
            UsesField::Absent => {}
            UsesField::Other { kind, line } => {
                return Err(ResolveError::UnexpectedNodeType {
                    filename: filename.to_string(),
                    job: job.job,
                    line,
                    kind,
                })
            }
            UsesField::Invocation { value, line } => {
                let text = source_line(yaml, line).ok_or_else(|| ResolveError::InvalidDocument {
                    filename: filename.to_string(),
                    line: Some(line),
                    message: "reported line is outside the document".to_string(),
                })?;
                extracted.push(ExtractedReference {
                    invocation: value,
                    job: job.job,
                    reference: Reference {
                        source_filename: filename.to_string(),
                        source_line: text.to_string(),
                        source_line_number: line,
                    },
                });
            }
        }
    }
    Ok(extracted)
}

/// Verbatim text of the 1-based line `number` of `yaml`.
pub(crate) fn source_line(yaml: &str, number: usize) -> Option<&str> {
    let index = number.checked_sub(1)?;
    document_lines(yaml).nth(index)
}

/// Lines of `yaml` split on every YAML line break, breaks removed.
///
/// A trailing break yields a final empty line.
pub(crate) fn document_lines(yaml: &str) -> impl Iterator<Item = &str> {
    LINE_BREAK.split(yaml)
}

/// Whether `line` ends in a block scalar header such as `|`, `>-` or `|2+`.
fn has_block_indicator(line: &str) -> bool {
    let code = line.split(" #").next().unwrap_or(line).trim_end();
    BLOCK_INDICATOR.is_match(code)
}

/// Decode the `jobs` mapping of a workflow into per-job `uses` fields.
pub(crate) fn parse_jobs(yaml: &str, filename: &str) -> Result<Vec<JobUses>, ResolveError> {
    let invalid = |line: Option<usize>, message: String| ResolveError::InvalidDocument {
        filename: filename.to_string(),
        line,
        message,
    };

    let Some(root) = load_document(yaml).map_err(|(line, message)| invalid(line, message))?
    else {
        return Ok(Vec::new());
    };
    let root = root.resolved();
    if root.is_null() {
        return Ok(Vec::new());
    }
    let Node::Mapping { entries, line } = root else {
        return Err(invalid(
            Some(root.line()),
            format!("expected a mapping at the top level, found {}", root.describe()),
        ));
    };
    let Some(jobs) = lookup(entries, "jobs", *line).map_err(|(l, m)| invalid(Some(l), m))? else {
        return Ok(Vec::new());
    };

    let jobs = jobs.resolved();
    if jobs.is_null() {
        return Ok(Vec::new());
    }
    let Node::Mapping { entries, .. } = jobs else {
        return Err(invalid(
            Some(jobs.line()),
            format!("jobs must be a mapping, found {}", jobs.describe()),
        ));
    };

    let entries = merged_entries(entries).map_err(|(l, m)| invalid(Some(l), m))?;
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut parsed = Vec::with_capacity(entries.len());
    for (key, definition) in entries {
        let Some(job) = key.scalar_value() else {
            return Err(invalid(
                Some(key.line()),
                format!("job identifier must be a string, found {}", key.describe()),
            ));
        };
        if let Some(first) = seen.insert(job, key.line()) {
            return Err(invalid(
                Some(key.line()),
                format!("job {job:?} already defined at line {first}"),
            ));
        }

        let definition = definition.resolved();
        let uses = match definition {
            node if node.is_null() => UsesField::Absent,
            Node::Mapping { entries, line } => {
                let uses = lookup(entries, "uses", *line).map_err(|(l, m)| invalid(Some(l), m))?;
                classify_uses(uses)
            }
            other => {
                return Err(invalid(
                    Some(other.line()),
                    format!("job {job:?} must be a mapping, found {}", other.describe()),
                ))
            }
        };
        parsed.push(JobUses {
            job: job.to_string(),
            uses,
        });
    }
    Ok(parsed)
}

fn classify_uses(node: Option<&Node>) -> UsesField {
    let Some(node) = node else {
        return UsesField::Absent;
    };
    match node {
        Node::Scalar(scalar) => match scalar.resolve_tag() {
            ScalarTag::Null => UsesField::Absent,
            ScalarTag::Str => UsesField::Invocation {
                value: scalar.value.clone(),
                line: scalar.line,
            },
            ScalarTag::Other(tag) => UsesField::Other {
                kind: NodeKind::Scalar(tag),
                line: scalar.line,
            },
        },
        Node::Mapping { line, .. } => UsesField::Other {
            kind: NodeKind::Mapping,
            line: *line,
        },
        Node::Sequence { line, .. } => UsesField::Other {
            kind: NodeKind::Sequence,
            line: *line,
        },
        Node::Alias { line, .. } => UsesField::Other {
            kind: NodeKind::Alias,
            line: *line,
        },
    }
}

/// Find the value for a plain `key`; duplicate keys are an error.
fn lookup<'a>(
    entries: &'a [(Node, Node)],
    key: &str,
    mapping_line: usize,
) -> Result<Option<&'a Node>, (usize, String)> {
    let mut found: Option<(&Node, &Node)> = None;
    for (k, v) in merged_entries(entries)? {
        if k.scalar_value() != Some(key) {
            continue;
        }
        if let Some((first, _)) = found {
            return Err((
                k.line(),
                format!(
                    "mapping key {key:?} already defined at line {} (mapping at line {mapping_line})",
                    first.line()
                ),
            ));
        }
        found = Some((k, v));
    }
    Ok(found.map(|(_, v)| v))
}

/// Entries of a mapping with `<<` merge keys applied.
///
/// Explicit keys come first in document order, followed by merged keys that
/// are not already present. Earlier merge sources win over later ones.
fn merged_entries(entries: &[(Node, Node)]) -> Result<Vec<(&Node, &Node)>, (usize, String)> {
    let mut merged = Vec::with_capacity(entries.len());
    let mut budget = MAX_MERGE_SOURCES;
    collect_entries(entries, false, &mut merged, &mut budget)?;
    Ok(merged)
}

fn collect_entries<'a>(
    entries: &'a [(Node, Node)],
    merging: bool,
    merged: &mut Vec<(&'a Node, &'a Node)>,
    budget: &mut usize,
) -> Result<(), (usize, String)> {
    let mut sources = Vec::new();
    for (key, value) in entries {
        if key.is_merge_key() {
            sources.push((key.line(), value.resolved()));
        } else if !merging || !merged.iter().any(|(k, _)| same_key(k, key)) {
            merged.push((key, value));
        }
    }

    for (line, source) in sources {
        let mappings: Vec<&'a [(Node, Node)]> = match source {
            Node::Mapping { entries, .. } => vec![entries.as_slice()],
            Node::Sequence { items, .. } => items
                .iter()
                .map(|item| match item.resolved() {
                    Node::Mapping { entries, .. } => Ok(entries.as_slice()),
                    other => Err((
                        item.line(),
                        format!("merge sources must be mappings, found {}", other.describe()),
                    )),
                })
                .collect::<Result<_, _>>()?,
            other => {
                return Err((
                    line,
                    format!(
                        "merge key value must be a mapping or a sequence of mappings, found {}",
                        other.describe()
                    ),
                ))
            }
        };
        for mapping in mappings {
            *budget = budget
                .checked_sub(1)
                .ok_or_else(|| (line, "too many merge key expansions".to_string()))?;
            collect_entries(mapping, true, merged, budget)?;
        }
    }
    Ok(())
}

fn same_key(a: &Node, b: &Node) -> bool {
    matches!((a.scalar_value(), b.scalar_value()), (Some(x), Some(y)) if x == y)
}

#[derive(Debug, Clone)]
enum Node {
    Scalar(ScalarNode),
    Mapping {
        entries: Vec<(Node, Node)>,
        line: usize,
    },
    Sequence {
        items: Vec<Node>,
        line: usize,
    },
    Alias {
        line: usize,
        target: Option<Rc<Node>>,
    },
}

#[derive(Debug, Clone)]
struct ScalarNode {
    value: String,
    plain: bool,
    /// Explicit tag, `!!name` for core-schema tags.
    tag: Option<String>,
    line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScalarTag {
    Null,
    Str,
    Other(String),
}

impl ScalarNode {
    fn resolve_tag(&self) -> ScalarTag {
        if let Some(tag) = &self.tag {
            return match tag.as_str() {
                "!!str" => ScalarTag::Str,
                "!!null" => ScalarTag::Null,
                other => ScalarTag::Other(other.to_string()),
            };
        }
        if !self.plain {
            return ScalarTag::Str;
        }
        let value = self.value.as_str();
        if matches!(value, "" | "~" | "null" | "Null" | "NULL") {
            ScalarTag::Null
        } else if matches!(value, "true" | "True" | "TRUE" | "false" | "False" | "FALSE") {
            ScalarTag::Other("!!bool".to_string())
        } else if INT_PATTERN.is_match(value) {
            ScalarTag::Other("!!int".to_string())
        } else if FLOAT_PATTERN.is_match(value) {
            ScalarTag::Other("!!float".to_string())
        } else {
            ScalarTag::Str
        }
    }
}

impl Node {
    fn line(&self) -> usize {
        match self {
            Node::Scalar(scalar) => scalar.line,
            Node::Mapping { line, .. } | Node::Sequence { line, .. } | Node::Alias { line, .. } => {
                *line
            }
        }
    }

    /// Follow an alias to its anchored node.
    fn resolved(&self) -> &Node {
        match self {
            Node::Alias {
                target: Some(target),
                ..
            } => target.resolved(),
            node => node,
        }
    }

    fn is_merge_key(&self) -> bool {
        match self {
            Node::Scalar(scalar) => match &scalar.tag {
                Some(tag) => tag == "!!merge",
                None => scalar.plain && scalar.value == MERGE_KEY,
            },
            _ => false,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(scalar) if scalar.resolve_tag() == ScalarTag::Null)
    }

    /// String value of a scalar key.
    fn scalar_value(&self) -> Option<&str> {
        match self.resolved() {
            Node::Scalar(scalar) => Some(scalar.value.as_str()),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Node::Scalar(scalar) => match scalar.resolve_tag() {
                ScalarTag::Null => "null".to_string(),
                ScalarTag::Str => "a string".to_string(),
                ScalarTag::Other(tag) => format!("a {tag} scalar"),
            },
            Node::Mapping { .. } => "a mapping".to_string(),
            Node::Sequence { items, .. } => format!("a sequence of {} items", items.len()),
            Node::Alias { .. } => "an unknown alias".to_string(),
        }
    }
}

/// Builds a positioned node tree from parser events.
///
/// Anchored nodes are shared through `Rc`, so an alias costs one pointer no
/// matter how large or deeply nested its target is.
struct Loader<'a> {
    lines: Vec<&'a str>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Rc<Node>>,
    root: Option<Node>,
}

enum Frame {
    Mapping {
        anchor: usize,
        line: usize,
        entries: Vec<(Node, Node)>,
        pending_key: Option<Node>,
    },
    Sequence {
        anchor: usize,
        line: usize,
        items: Vec<Node>,
    },
}

impl MarkedEventReceiver for Loader<'_> {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        let line = mark.line();
        match ev {
            Event::MappingStart(anchor, _) => self.stack.push(Frame::Mapping {
                anchor,
                line,
                entries: Vec::new(),
                pending_key: None,
            }),
            Event::SequenceStart(anchor, _) => self.stack.push(Frame::Sequence {
                anchor,
                line,
                items: Vec::new(),
            }),
            Event::MappingEnd | Event::SequenceEnd => {
                if let Some(frame) = self.stack.pop() {
                    let (anchor, node) = match frame {
                        Frame::Mapping {
                            anchor,
                            line,
                            entries,
                            ..
                        } => (anchor, Node::Mapping { entries, line }),
                        Frame::Sequence {
                            anchor,
                            line,
                            items,
                        } => (anchor, Node::Sequence { items, line }),
                    };
                    self.insert(anchor, node);
                }
            }
            Event::Scalar(value, style, anchor, tag) => {
                let line = match style {
                    TScalarStyle::Literal | TScalarStyle::Folded => {
                        self.block_indicator_line(line)
                    }
                    _ => line,
                };
                let tag = tag.map(|tag| {
                    if tag.handle == CORE_TAG_HANDLE || tag.handle == "!!" {
                        format!("!!{}", tag.suffix)
                    } else {
                        format!("{}{}", tag.handle, tag.suffix)
                    }
                });
                let node = Node::Scalar(ScalarNode {
                    value,
                    plain: matches!(style, TScalarStyle::Plain),
                    tag,
                    line,
                });
                self.insert(anchor, node);
            }
            Event::Alias(id) => {
                let target = self.anchors.get(&id).cloned();
                self.insert(0, Node::Alias { line, target });
            }
            _ => {}
        }
    }
}

impl<'a> Loader<'a> {
    fn new(yaml: &'a str) -> Self {
        Self {
            lines: document_lines(yaml).collect(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
        }
    }

    /// Line of the `|` or `>` header of a block scalar whose event was marked
    /// at `mark_line`.
    ///
    /// A mapping value's header sits between its key and the content, so the
    /// search runs forward from the key; elsewhere it runs back from the mark.
    fn block_indicator_line(&self, mark_line: usize) -> usize {
        let has_indicator = |number: &usize| {
            number
                .checked_sub(1)
                .and_then(|index| self.lines.get(index))
                .is_some_and(|line| has_block_indicator(line))
        };
        let found = match self.pending_key_line() {
            Some(key_line) if key_line <= mark_line => {
                (key_line..=mark_line).find(&has_indicator)
            }
            _ => (1..=mark_line).rev().find(&has_indicator),
        };
        found.unwrap_or(mark_line)
    }

    fn pending_key_line(&self) -> Option<usize> {
        match self.stack.last() {
            Some(Frame::Mapping {
                pending_key: Some(key),
                ..
            }) => Some(key.line()),
            _ => None,
        }
    }

    fn insert(&mut self, anchor: usize, node: Node) {
        if anchor > 0 {
            self.anchors.insert(anchor, Rc::new(node.clone()));
        }
        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => entries.push((key, node)),
                None => *pending_key = Some(node),
            },
        }
    }
}

/// Load the first document of `yaml`; `None` for an empty stream.
fn load_document(yaml: &str) -> Result<Option<Node>, (Option<usize>, String)> {
    let mut loader = Loader::new(yaml);
    let mut parser = Parser::new_from_str(yaml);
    parser
        .load(&mut loader, false)
        .map_err(|err| (Some(err.marker().line()), err.info().to_string()))?;
    Ok(loader.root)
}
