use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::{Document, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    UnknownReference,
    Script,
}

/// Failure to load one content item. The item is skipped, loading goes on.
#[derive(Debug, Clone)]
pub struct ContentLoadError {
    pub code: ContentErrorCode,
    pub message: String,
    pub pack: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (pack={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.pack,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (pack={}, file={})",
                self.code,
                self.message,
                self.pack,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentLoadError {}

impl ContentLoadError {
    pub(crate) fn new(code: ContentErrorCode, message: String, pack: &str, path: &Path) -> Self {
        Self {
            code,
            message,
            pack: pack.to_string(),
            file_path: path.to_path_buf(),
            location: None,
        }
    }
}

pub(crate) fn read_text(pack: &str, path: &Path) -> Result<String, ContentLoadError> {
    fs::read_to_string(path).map_err(|source| {
        ContentLoadError::new(
            ContentErrorCode::ReadFile,
            format!("failed to read file: {source}"),
            pack,
            path,
        )
    })
}

pub(crate) fn parse_xml<'input>(
    pack: &str,
    path: &Path,
    raw: &'input str,
) -> Result<Document<'input>, ContentLoadError> {
    Document::parse(raw).map_err(|error| ContentLoadError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        pack: pack.to_string(),
        file_path: path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

/// Error-reporting context for one parsed XML file.
pub(crate) struct XmlSource<'a, 'input> {
    pub pack: &'a str,
    pub path: &'a Path,
    pub doc: &'a Document<'input>,
}

impl<'a, 'input> XmlSource<'a, 'input> {
    pub(crate) fn location_of(&self, node: Node<'_, '_>) -> SourceLocation {
        let pos = self.doc.text_pos_at(node.range().start);
        SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }
    }

    pub(crate) fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentLoadError {
        ContentLoadError {
            code,
            message,
            pack: self.pack.to_string(),
            file_path: self.path.to_path_buf(),
            location: Some(self.location_of(node)),
        }
    }

    pub(crate) fn expect_root(&self, name: &str) -> Result<Node<'a, 'input>, ContentLoadError> {
        let root = self.doc.root_element();
        if root.tag_name().name() == name {
            Ok(root)
        } else {
            Err(self.error_at(
                ContentErrorCode::InvalidRoot,
                format!("root element must be <{name}>"),
                root,
            ))
        }
    }

    /// Element children of `node`, rejecting repeated field names.
    pub(crate) fn unique_fields<'n>(
        &self,
        node: Node<'n, 'input>,
    ) -> Result<Vec<Node<'n, 'input>>, ContentLoadError> {
        let mut seen = HashSet::<&str>::new();
        let mut fields = Vec::new();
        for field in node.children().filter(|child| child.is_element()) {
            let name = field.tag_name().name();
            if !seen.insert(name) {
                return Err(self.error_at(
                    ContentErrorCode::DuplicateField,
                    format!(
                        "duplicate field <{}> in <{}>",
                        name,
                        node.tag_name().name()
                    ),
                    field,
                ));
            }
            fields.push(field);
        }
        Ok(fields)
    }

    pub(crate) fn unknown_field(&self, field: Node<'_, '_>) -> ContentLoadError {
        let parent = field
            .parent_element()
            .map(|parent| parent.tag_name().name().to_string())
            .unwrap_or_default();
        self.error_at(
            ContentErrorCode::UnknownField,
            format!("unknown field <{}> in <{}>", field.tag_name().name(), parent),
            field,
        )
    }

    pub(crate) fn text(&self, node: Node<'_, '_>) -> String {
        node.text().map(str::trim).unwrap_or_default().to_string()
    }

    pub(crate) fn required_text(&self, node: Node<'_, '_>) -> Result<String, ContentLoadError> {
        let value = self.text(node);
        if value.is_empty() {
            return Err(self.error_at(
                ContentErrorCode::MissingField,
                format!("field <{}> must not be empty", node.tag_name().name()),
                node,
            ));
        }
        Ok(value)
    }

    pub(crate) fn parse_field<T: FromStr>(&self, node: Node<'_, '_>) -> Result<T, ContentLoadError> {
        let value = self.required_text(node)?;
        value.parse::<T>().map_err(|_| {
            self.error_at(
                ContentErrorCode::InvalidValue,
                format!(
                    "<{}> value '{}' is not valid",
                    node.tag_name().name(),
                    value
                ),
                node,
            )
        })
    }

    pub(crate) fn parse_f32(&self, node: Node<'_, '_>) -> Result<f32, ContentLoadError> {
        let value = self.parse_field::<f32>(node)?;
        if !value.is_finite() {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("<{}> must be finite", node.tag_name().name()),
                node,
            ));
        }
        Ok(value)
    }

    pub(crate) fn parse_non_negative(&self, node: Node<'_, '_>) -> Result<f32, ContentLoadError> {
        let value = self.parse_f32(node)?;
        if value < 0.0 {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("<{}> must be >= 0", node.tag_name().name()),
                node,
            ));
        }
        Ok(value)
    }

    pub(crate) fn parse_bool(&self, node: Node<'_, '_>) -> Result<bool, ContentLoadError> {
        self.parse_field::<bool>(node)
    }

    pub(crate) fn attr_f32(
        &self,
        node: Node<'_, '_>,
        name: &str,
        default: f32,
    ) -> Result<f32, ContentLoadError> {
        match node.attribute(name) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    self.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("attribute {name}='{raw}' is not a valid number"),
                        node,
                    )
                }),
        }
    }

    pub(crate) fn attr_bool(
        &self,
        node: Node<'_, '_>,
        name: &str,
        default: bool,
    ) -> Result<bool, ContentLoadError> {
        match node.attribute(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| {
                self.error_at(
                    ContentErrorCode::InvalidValue,
                    format!("attribute {name}='{raw}' must be true or false"),
                    node,
                )
            }),
        }
    }

    pub(crate) fn required_attr(
        &self,
        node: Node<'_, '_>,
        name: &str,
    ) -> Result<String, ContentLoadError> {
        match node.attribute(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(self.error_at(
                ContentErrorCode::MissingField,
                format!(
                    "<{}> requires attribute '{}'",
                    node.tag_name().name(),
                    name
                ),
                node,
            )),
        }
    }

    /// `<list><item>a</item><item>b</item></list>` style text lists.
    pub(crate) fn text_list(
        &self,
        node: Node<'_, '_>,
        item: &str,
    ) -> Result<Vec<String>, ContentLoadError> {
        let mut values = Vec::new();
        for child in node.children().filter(|child| child.is_element()) {
            if child.tag_name().name() != item {
                return Err(self.unknown_field(child));
            }
            values.push(self.required_text(child)?);
        }
        Ok(values)
    }
}
