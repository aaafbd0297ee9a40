use crate::error::{ExtractorError, Result};
use std::path::Path;
use tree_sitter::{Node, Parser};

const PYTHON_EXTENSIONS: &[&str] = &["py", "pyw", "pyi"];

/// Tree-sitter grammar for the indexed language
pub fn python_language() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}

/// Create a parser bound to the Python grammar
pub fn new_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&python_language())
        .map_err(|e| ExtractorError::tree_sitter(format!("Failed to set language: {e}")))?;
    Ok(parser)
}

/// 1-based (line, column) of the first ERROR or MISSING node under `node`
pub(crate) fn first_error_position(node: Node) -> Option<(usize, usize)> {
    if node.is_error() || node.is_missing() {
        let pos = node.start_position();
        return Some((pos.row + 1, pos.column + 1));
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error_position)
}

/// Check whether a path looks like a Python source file
pub fn is_python_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PYTHON_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// Module name used in `from <module> import <name>` lines (the file stem)
pub fn module_name_for_path(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("unknown")
        .to_string()
}
