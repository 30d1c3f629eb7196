use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::database::{LevelDescriptor, LevelDescriptorDatabase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateLevel,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

/// Compiles one `<Defs>` document. `file_path` only labels errors.
pub fn compile_level_descriptors(
    file_path: &Path,
    raw: &str,
) -> Result<LevelDescriptorDatabase, ContentCompileError> {
    let mut merged = BTreeMap::<u32, LevelDescriptor>::new();
    merge_document(&mut merged, file_path, raw)?;
    Ok(LevelDescriptorDatabase::from_descriptors(merged.into_values()))
}

fn merge_document(
    merged: &mut BTreeMap<u32, LevelDescriptor>,
    file_path: &Path,
    raw: &str,
) -> Result<(), ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "LevelDescriptorDef" {
            return Err(error_at_node(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; expected <LevelDescriptorDef>",
                    child.tag_name().name()
                ),
                file_path,
                &doc,
                child,
            ));
        }
        let descriptor = parse_level_descriptor(file_path, &doc, child)?;
        if merged.contains_key(&descriptor.level) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateLevel,
                format!("level {} is described more than once", descriptor.level),
                file_path,
                &doc,
                child,
            ));
        }
        merged.insert(descriptor.level, descriptor);
    }
    Ok(())
}

fn parse_level_descriptor(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<LevelDescriptor, ContentCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut level: Option<u32> = None;
    let mut descriptor = LevelDescriptor::default();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <LevelDescriptorDef>", field_name),
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "level" => {
                let value = required_text(file_path, doc, field, "level")?;
                let parsed = value.parse::<u32>().map_err(|_| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("level '{}' is not a positive integer", value),
                        file_path,
                        doc,
                        field,
                    )
                })?;
                if parsed == 0 {
                    return Err(error_at_node(
                        ContentErrorCode::InvalidValue,
                        "level numbers start at 1".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                level = Some(parsed);
            }
            "gates" => descriptor.gates = id_list(file_path, doc, field)?,
            "chests" => descriptor.chests = id_list(file_path, doc, field)?,
            "breakables" => descriptor.breakables = id_list(file_path, doc, field)?,
            "uniqueActors" => descriptor.unique_actors = id_list(file_path, doc, field)?,
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <LevelDescriptorDef>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let Some(level) = level else {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            "missing required field <level> in <LevelDescriptorDef>".to_string(),
            file_path,
            doc,
            node,
        ));
    };
    descriptor.level = level;
    Ok(descriptor)
}

/// `<li>` children of a list field, sorted and deduplicated.
fn id_list(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<Vec<String>, ContentCompileError> {
    let mut ids = Vec::new();
    for item in node.children().filter(|child| child.is_element()) {
        if item.tag_name().name() != "li" {
            return Err(error_at_node(
                ContentErrorCode::UnknownField,
                format!(
                    "list <{}> may only contain <li>, found <{}>",
                    node.tag_name().name(),
                    item.tag_name().name()
                ),
                file_path,
                doc,
                item,
            ));
        }
        ids.push(required_text(file_path, doc, item, "li")?);
    }
    ids.sort();
    ids.dedup();
    Ok(ids)
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    let pos = doc.text_pos_at(node.range().start);
    ContentCompileError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(raw: &str) -> Result<LevelDescriptorDatabase, ContentCompileError> {
        compile_level_descriptors(Path::new("levels.xml"), raw)
    }

    #[test]
    fn valid_descriptor_compiles_with_sorted_ids() {
        let db = compile(
            r#"<Defs>
                <LevelDescriptorDef>
                    <level>1</level>
                    <gates><li>castle_gate</li></gates>
                    <chests><li>chest_l1_weapon</li><li>chest_a</li><li>chest_a</li></chests>
                    <uniqueActors><li>enemy:gorg</li></uniqueActors>
                </LevelDescriptorDef>
            </Defs>"#,
        )
        .expect("compile");
        let level = db.descriptor(1).expect("level 1");
        assert_eq!(level.gates, vec!["castle_gate".to_string()]);
        assert_eq!(
            level.chests,
            vec!["chest_a".to_string(), "chest_l1_weapon".to_string()]
        );
        assert!(level.breakables.is_empty());
        assert!(db.is_unique_actor(1, "enemy:gorg"));
        assert!(!db.is_unique_actor(2, "enemy:gorg"));
    }

    #[test]
    fn missing_level_reports_location() {
        let err = compile(
            r#"<Defs><LevelDescriptorDef><gates><li>g</li></gates></LevelDescriptorDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert!(err.location.is_some());
        assert!(err.to_string().contains("levels.xml"));
    }

    #[test]
    fn unknown_field_errors() {
        let err = compile(
            r#"<Defs><LevelDescriptorDef><level>1</level><doors/></LevelDescriptorDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn list_items_must_be_li() {
        let err = compile(
            r#"<Defs><LevelDescriptorDef><level>1</level><gates><id>g</id></gates></LevelDescriptorDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn zero_level_is_invalid() {
        let err = compile(r#"<Defs><LevelDescriptorDef><level>0</level></LevelDescriptorDef></Defs>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn wrong_root_and_def_type_are_rejected() {
        let err = compile(r#"<Levels/>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidRoot);
        let err = compile(r#"<Defs><EntityDef/></Defs>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownDefType);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = compile(r#"<Defs><LevelDescriptorDef><level>1</level></Defs>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn duplicate_field_errors() {
        let err = compile(
            r#"<Defs><LevelDescriptorDef><level>1</level><level>2</level></LevelDescriptorDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateField);
    }

    #[test]
    fn duplicate_level_errors() {
        let err = compile(
            r#"<Defs>
                <LevelDescriptorDef><level>1</level></LevelDescriptorDef>
                <LevelDescriptorDef><level>1</level><gates><li>g</li></gates></LevelDescriptorDef>
            </Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateLevel);
        assert_eq!(err.location.map(|loc| loc.line), Some(3));
    }

    #[test]
    fn multiple_levels_merge_in_order() {
        let db = compile(
            r#"<Defs>
                <LevelDescriptorDef><level>2</level><breakables><li>barrel_3_4</li></breakables></LevelDescriptorDef>
                <LevelDescriptorDef><level>1</level></LevelDescriptorDef>
            </Defs>"#,
        )
        .expect("compile");
        assert_eq!(db.levels().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            db.descriptor(2).map(|level| level.breakables.clone()),
            Some(vec!["barrel_3_4".to_string()])
        );
    }
}
