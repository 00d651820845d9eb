//! Parser for the keyword = value label text printed by the metadata query.
//!
//! The grammar is line oriented:
//!
//! ```text
//! Object = IsisCube
//!   Group = BandBin
//!     FilterName = (BLU, RED,
//!                   NIR, PAN)
//!     Center     = (494.8, 650.2, 836.2, 675.0) <nanometers>
//!   End_Group
//! End_Object
//! End
//! ```
//!
//! `Object`/`Group` open a block that must be closed by the matching
//! `End_Object`/`End_Group`. Parenthesized lists may continue over several
//! lines. A trailing `<unit>` is dropped from scalar values.

use crate::util::{MisregError, MisregResult};

/// Value of a single keyword.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A single word, number or quoted string.
    Scalar(String),
    /// A parenthesized, comma-separated list.
    List(Vec<String>),
}

impl Value {
    /// Returns the scalar text, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) => None,
        }
    }

    /// Returns the value as a list; a scalar becomes a one-element list.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Value::Scalar(s) => vec![s.clone()],
            Value::List(items) => items.clone(),
        }
    }
}

/// One keyword entry together with the block it was found in.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// Name of the innermost enclosing `Group`/`Object`, if any.
    pub block: Option<String>,
    pub key: String,
    pub value: Value,
    /// 1-based line of the keyword.
    pub line: usize,
}

/// Parsed label, entries kept in document order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Label {
    entries: Vec<Entry>,
}

impl Label {
    /// All entries in document order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// First entry named `key` anywhere in the label.
    pub fn first(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key.eq_ignore_ascii_case(key))
    }

    /// First entry named `key` inside the block named `block`.
    pub fn find(&self, block: &str, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| {
            e.key.eq_ignore_ascii_case(key)
                && e.block
                    .as_deref()
                    .is_some_and(|b| b.eq_ignore_ascii_case(block))
        })
    }
}

#[derive(Debug, PartialEq)]
enum BlockKind {
    Object,
    Group,
}

/// Parses label text into a [`Label`].
pub fn parse_label(text: &str) -> MisregResult<Label> {
    let mut entries = Vec::new();
    let mut stack: Vec<(BlockKind, String, usize)> = Vec::new();
    let mut lines = text.lines().enumerate().map(|(idx, l)| (idx + 1, l));

    while let Some((line_no, raw)) = lines.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("/*") {
            continue;
        }
        if line.eq_ignore_ascii_case("end") {
            break;
        }
        if line.eq_ignore_ascii_case("end_group") || line.eq_ignore_ascii_case("endgroup") {
            close_block(&mut stack, BlockKind::Group, line_no)?;
            continue;
        }
        if line.eq_ignore_ascii_case("end_object") || line.eq_ignore_ascii_case("endobject") {
            close_block(&mut stack, BlockKind::Object, line_no)?;
            continue;
        }

        let (key, rest) = line.split_once('=').ok_or_else(|| MisregError::MetadataParse {
            line: line_no,
            reason: format!("expected `key = value`, found `{line}`"),
        })?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(MisregError::MetadataParse {
                line: line_no,
                reason: format!("invalid keyword `{key}`"),
            });
        }
        let mut value_text = rest.trim().to_string();

        if value_text.starts_with('"') {
            while value_text.matches('"').count() % 2 == 1 {
                let (_, next) = lines.next().ok_or_else(|| MisregError::MetadataParse {
                    line: line_no,
                    reason: format!("unterminated string for `{key}`"),
                })?;
                value_text.push(' ');
                value_text.push_str(next.trim());
            }
        } else if value_text.starts_with('(') {
            while depth(&value_text) > 0 {
                let (_, next) = lines.next().ok_or_else(|| MisregError::MetadataParse {
                    line: line_no,
                    reason: format!("unterminated list for `{key}`"),
                })?;
                value_text.push(' ');
                value_text.push_str(next.trim());
            }
        }

        if key.eq_ignore_ascii_case("object") || key.eq_ignore_ascii_case("group") {
            let kind = if key.eq_ignore_ascii_case("object") {
                BlockKind::Object
            } else {
                BlockKind::Group
            };
            stack.push((kind, unquote(&value_text).to_string(), line_no));
            continue;
        }

        let value = parse_value(&value_text, line_no)?;
        entries.push(Entry {
            block: stack.last().map(|(_, name, _)| name.clone()),
            key: key.to_string(),
            value,
            line: line_no,
        });
    }

    if let Some((_, name, line)) = stack.last() {
        return Err(MisregError::MetadataParse {
            line: *line,
            reason: format!("block `{name}` is never closed"),
        });
    }
    Ok(Label { entries })
}

/// Extracts the ordered band names from a label (`FilterName` keyword).
pub fn parse_band_names(text: &str) -> MisregResult<Vec<String>> {
    let label = parse_label(text)?;
    let entry = label
        .find("BandBin", "FilterName")
        .or_else(|| label.first("FilterName"))
        .ok_or_else(|| MisregError::MissingMetadata {
            key: "FilterName".to_string(),
        })?;
    Ok(entry.value.to_list())
}

/// Extracts `(samples, lines)` from a label, preferring the `Dimensions` group.
pub fn parse_raster_size(text: &str) -> MisregResult<(usize, usize)> {
    let label = parse_label(text)?;
    let samples = dimension(&label, "Samples")?;
    let lines = dimension(&label, "Lines")?;
    Ok((samples, lines))
}

fn dimension(label: &Label, key: &str) -> MisregResult<usize> {
    let entry = label
        .find("Dimensions", key)
        .or_else(|| label.first(key))
        .ok_or_else(|| MisregError::MissingMetadata {
            key: key.to_string(),
        })?;
    let text = entry.value.as_scalar().ok_or_else(|| MisregError::MetadataParse {
        line: entry.line,
        reason: format!("`{key}` must be a single integer"),
    })?;
    text.parse::<usize>().map_err(|_| MisregError::MetadataParse {
        line: entry.line,
        reason: format!("`{key}` is not an integer: `{text}`"),
    })
}

fn close_block(
    stack: &mut Vec<(BlockKind, String, usize)>,
    kind: BlockKind,
    line: usize,
) -> MisregResult<()> {
    match stack.pop() {
        Some((open, _, _)) if open == kind => Ok(()),
        Some((_, name, _)) => Err(MisregError::MetadataParse {
            line,
            reason: format!("block `{name}` closed with the wrong terminator"),
        }),
        None => Err(MisregError::MetadataParse {
            line,
            reason: "block terminator without an open block".to_string(),
        }),
    }
}

fn depth(text: &str) -> i32 {
    let mut depth = 0;
    let mut in_quotes = false;
    for c in text.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn parse_value(text: &str, line: usize) -> MisregResult<Value> {
    let text = strip_unit(text);
    if let Some(inner) = text.strip_prefix('(') {
        let inner = inner.strip_suffix(')').ok_or_else(|| MisregError::MetadataParse {
            line,
            reason: format!("list is not closed: `{text}`"),
        })?;
        let items = split_list(inner)
            .into_iter()
            .map(|item| unquote(strip_unit(item)).to_string())
            .collect();
        return Ok(Value::List(items));
    }
    Ok(Value::Scalar(unquote(text).to_string()))
}

fn split_list(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (idx, c) in inner.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                items.push(inner[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    items.push(inner[start..].trim());
    items
}

fn strip_unit(text: &str) -> &str {
    let text = text.trim();
    if text.ends_with('>') && !text.starts_with('"') {
        if let Some(pos) = text.rfind('<') {
            return text[..pos].trim_end();
        }
    }
    text
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_LABEL: &str = "Object = IsisCube
  Object = Core
    StartByte   = 65537
    Format      = Tile

    Group = Dimensions
      Samples = 2048
      Lines   = 1024
      Bands   = 4
    End_Group
  End_Object

  Group = BandBin
    FilterName = (BLU, RED,
                  NIR, PAN)
    Center     = (494.8, 650.2, 836.2, 675.0) <nanometers>
  End_Group
End_Object
End
";

    #[test]
    fn band_names_follow_label_order_across_continuation_lines() {
        let names = parse_band_names(CUBE_LABEL).unwrap();
        assert_eq!(names, vec!["BLU", "RED", "NIR", "PAN"]);
    }

    #[test]
    fn raster_size_reads_dimensions_group() {
        assert_eq!(parse_raster_size(CUBE_LABEL).unwrap(), (2048, 1024));
    }

    #[test]
    fn units_are_dropped_from_list_values() {
        let label = parse_label(CUBE_LABEL).unwrap();
        let center = label.find("BandBin", "Center").unwrap();
        assert_eq!(
            center.value,
            Value::List(vec![
                "494.8".into(),
                "650.2".into(),
                "836.2".into(),
                "675.0".into()
            ])
        );
        assert_eq!(center.block.as_deref(), Some("BandBin"));
    }

    #[test]
    fn entries_keep_document_order_and_blocks() {
        let label = parse_label(CUBE_LABEL).unwrap();
        let keys: Vec<_> = label.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["StartByte", "Format", "Samples", "Lines", "Bands", "FilterName", "Center"]
        );
        assert_eq!(label.entries()[0].block.as_deref(), Some("Core"));
        assert_eq!(label.entries()[2].line, 7);
    }

    #[test]
    fn quoted_names_keep_embedded_whitespace() {
        let text = "Group = BandBin\n  FilterName = (\"Broad Red\", NIR)\nEnd_Group\n";
        let names = parse_band_names(text).unwrap();
        assert_eq!(names, vec!["Broad Red", "NIR"]);
    }

    #[test]
    fn missing_band_list_is_reported() {
        let text = "Group = Dimensions\n  Samples = 4\n  Lines = 4\nEnd_Group\n";
        let err = parse_band_names(text).unwrap_err();
        assert_eq!(
            err,
            MisregError::MissingMetadata {
                key: "FilterName".to_string()
            }
        );
    }

    #[test]
    fn garbage_line_reports_its_line_number() {
        let text = "Group = Dimensions\n  Samples = 4\n  this is not a label\nEnd_Group\n";
        let err = parse_label(text).unwrap_err();
        assert!(matches!(err, MisregError::MetadataParse { line: 3, .. }));
    }

    #[test]
    fn unterminated_list_is_an_error() {
        let text = "FilterName = (RED, NIR,\n  PAN\n";
        let err = parse_label(text).unwrap_err();
        assert!(matches!(err, MisregError::MetadataParse { line: 1, .. }));
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let text = "Object = IsisCube\n  Group = BandBin\n  End_Group\n";
        let err = parse_label(text).unwrap_err();
        assert!(matches!(err, MisregError::MetadataParse { line: 1, .. }));
    }

    #[test]
    fn non_integer_dimension_is_an_error() {
        let text = "Group = Dimensions\n  Samples = wide\n  Lines = 4\nEnd_Group\n";
        let err = parse_raster_size(text).unwrap_err();
        assert!(matches!(err, MisregError::MetadataParse { line: 2, .. }));
    }
}
