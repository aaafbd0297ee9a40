use crate::error::{ExtractorError, Result};
use crate::language::{first_error_position, new_parser};
use serde::{Deserialize, Serialize};
use std::fmt;
use tree_sitter::{Node, Parser};

/// Syntactic shape of the expression being called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalleeShape {
    /// `f(...)`
    Name,
    /// `obj.f(...)`; resolved by the final attribute
    Attribute,
    /// Subscripts, call results, lambdas, Python 2 statements
    Other,
}

/// One `call` node found in a piece of source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCall {
    /// Name used for resolution: the identifier, or the final attribute of `a.b.f`
    pub name: String,
    /// Full callee text as written (`bird.jump`, `make()()`)
    pub callee: String,
    pub shape: CalleeShape,
    /// Number of positional arguments
    pub positional: usize,
    /// Keyword argument names in call order
    pub keywords: Vec<String>,
    /// Call contains `*xs` or `**kw`
    pub has_splat: bool,
    /// 1-based line of the call
    pub line: usize,
}

impl ExtractedCall {
    /// Total number of explicit arguments
    pub fn argument_count(&self) -> usize {
        self.positional + self.keywords.len()
    }

    /// Callee can be looked up by name at all
    pub fn is_resolvable(&self) -> bool {
        self.shape != CalleeShape::Other
    }
}

impl fmt::Display for ExtractedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (line {})", self.callee, self.argument_count(), self.line)
    }
}

/// How a name gets bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingKind {
    /// `from <module> import <name>` with no alias
    FromImport { module: String },
    /// Every other import form: `import m`, aliases, `*`, relative modules
    Import,
    /// Assignment, loop, `with`/`except`/`match` capture, walrus or parameter
    Target,
    /// `def` / `class` name
    Definition,
    /// `global` / `nonlocal`
    Declaration,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromImport { module } => write!(f, "imported from {module}"),
            Self::Import => f.write_str("import"),
            Self::Target => f.write_str("assigned"),
            Self::Definition => f.write_str("defined"),
            Self::Declaration => f.write_str("declared global"),
        }
    }
}

/// A site where source text binds a name.
///
/// Attribute targets (`obj.name = ...`) are reported under the attribute name,
/// and a wildcard import binds `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameBinding {
    pub name: String,
    pub kind: BindingKind,
    /// 1-based line of the binding
    pub line: usize,
}

impl NameBinding {
    /// Binding applies to `name` (wildcards apply to every name)
    pub fn binds(&self, name: &str) -> bool {
        self.name == name || self.name == "*"
    }
}

impl fmt::Display for NameBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, line {})", self.name, self.kind, self.line)
    }
}

/// Calls and name bindings found in one piece of source text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSurvey {
    pub calls: Vec<ExtractedCall>,
    pub bindings: Vec<NameBinding>,
}

/// Grammar-aware extractor of call expressions and binding sites
pub struct CallExtractor {
    parser: Parser,
}

impl CallExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: new_parser()?,
        })
    }

    /// Extract every call expression from `source`
    pub fn extract(&mut self, source: &str) -> Result<Vec<ExtractedCall>> {
        Ok(self.survey(source)?.calls)
    }

    /// Extract calls together with every name binding.
    ///
    /// Text that does not parse cleanly is an error: calls hidden behind a syntax
    /// error cannot be enumerated reliably. Decorators count as calls with one
    /// positional argument.
    pub fn survey(&mut self, source: &str) -> Result<SourceSurvey> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ExtractorError::parse("<generated>", "parser returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error_position(root).unwrap_or((1, 1));
            return Err(ExtractorError::Syntax {
                path: "<generated>".to_string(),
                line,
                column,
            });
        }

        let mut survey = SourceSurvey::default();
        visit(root, source, &mut survey);
        Ok(survey)
    }
}

fn text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

fn visit(node: Node, source: &str, survey: &mut SourceSurvey) {
    match node.kind() {
        "call" => {
            if let Some(call) = describe_call(node, source) {
                survey.calls.push(call);
            }
        }
        "decorator" => {
            if let Some(expr) = node.named_child(0) {
                survey.calls.push(implicit_call(expr, source, 1));
            }
        }
        "exec_statement" | "print_statement" => {
            let keyword = if node.kind() == "exec_statement" {
                "exec"
            } else {
                "print"
            };
            survey.calls.push(ExtractedCall {
                name: keyword.to_string(),
                callee: keyword.to_string(),
                shape: CalleeShape::Other,
                positional: 1,
                keywords: Vec::new(),
                has_splat: false,
                line: line_of(node),
            });
        }
        "import_statement" => collect_import(node, source, None, survey),
        "import_from_statement" => {
            let module = node
                .child_by_field_name("module_name")
                .filter(|m| m.kind() == "dotted_name")
                .map(|m| text(m, source).to_string());
            collect_import(node, source, module, survey);
        }
        "future_import_statement" => collect_import(node, source, None, survey),
        "assignment" | "augmented_assignment" | "for_statement" | "for_in_clause" => {
            if let Some(left) = node.child_by_field_name("left") {
                collect_targets(left, source, BindingKind::Target, survey);
            }
        }
        "type_alias_statement" => {
            if let Some(left) = node.child_by_field_name("left") {
                let mut cursor = left.walk();
                for name in left.named_children(&mut cursor) {
                    collect_targets(name, source, BindingKind::Definition, survey);
                }
            }
        }
        "named_expression" => {
            if let Some(name) = node.child_by_field_name("name") {
                collect_targets(name, source, BindingKind::Target, survey);
            }
        }
        "as_pattern" | "except_clause" => {
            if let Some(alias) = node.child_by_field_name("alias") {
                collect_targets(alias, source, BindingKind::Target, survey);
            }
        }
        "case_pattern" => collect_identifiers(node, source, survey),
        "function_definition" | "class_definition" => {
            if let Some(name) = node.child_by_field_name("name") {
                collect_targets(name, source, BindingKind::Definition, survey);
            }
        }
        "parameters" | "lambda_parameters" => {
            let mut cursor = node.walk();
            for param in node.named_children(&mut cursor) {
                collect_targets(param, source, BindingKind::Target, survey);
            }
        }
        "global_statement" | "nonlocal_statement" => {
            let mut cursor = node.walk();
            for name in node.named_children(&mut cursor) {
                collect_targets(name, source, BindingKind::Declaration, survey);
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit(child, source, survey);
    }
}

fn collect_import(node: Node, source: &str, module: Option<String>, survey: &mut SourceSurvey) {
    let line = line_of(node);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if node.child_by_field_name("module_name") == Some(child) {
            continue;
        }
        let (name, kind) = match child.kind() {
            "wildcard_import" => ("*".to_string(), BindingKind::Import),
            "aliased_import" => match child.child_by_field_name("alias") {
                Some(alias) => (text(alias, source).to_string(), BindingKind::Import),
                None => continue,
            },
            "dotted_name" => match &module {
                Some(module) => (
                    text(child, source).to_string(),
                    BindingKind::FromImport {
                        module: module.clone(),
                    },
                ),
                // `import a.b` binds `a`
                None => {
                    let full = text(child, source);
                    let head = full.split('.').next().unwrap_or(full);
                    (head.trim().to_string(), BindingKind::Import)
                }
            },
            _ => continue,
        };
        survey.bindings.push(NameBinding { name, kind, line });
    }
}

/// Names bound by an assignment-like target or a parameter
fn collect_targets(node: Node, source: &str, kind: BindingKind, survey: &mut SourceSurvey) {
    match node.kind() {
        "identifier" => survey.bindings.push(NameBinding {
            name: text(node, source).to_string(),
            kind,
            line: line_of(node),
        }),
        "attribute" => {
            if let Some(attr) = node.child_by_field_name("attribute") {
                collect_targets(attr, source, kind, survey);
            }
        }
        // Subscript targets and annotations bind no name.
        "subscript" | "type" => {}
        "default_parameter" | "typed_default_parameter" => {
            if let Some(name) = node.child_by_field_name("name") {
                collect_targets(name, source, kind, survey);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_targets(child, source, kind.clone(), survey);
            }
        }
    }
}

/// Every identifier in a `match` pattern counts as a capture
fn collect_identifiers(node: Node, source: &str, survey: &mut SourceSurvey) {
    if node.kind() == "identifier" {
        survey.bindings.push(NameBinding {
            name: text(node, source).to_string(),
            kind: BindingKind::Target,
            line: line_of(node),
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_identifiers(child, source, survey);
    }
}

fn callee_name(function: Node, source: &str) -> (String, CalleeShape) {
    let callee = text(function, source).to_string();
    match function.kind() {
        "identifier" => (callee, CalleeShape::Name),
        "attribute" => match function.child_by_field_name("attribute") {
            Some(attr) => (text(attr, source).to_string(), CalleeShape::Attribute),
            None => (callee, CalleeShape::Other),
        },
        _ => (callee, CalleeShape::Other),
    }
}

fn implicit_call(function: Node, source: &str, positional: usize) -> ExtractedCall {
    let (name, shape) = callee_name(function, source);
    ExtractedCall {
        name,
        callee: text(function, source).to_string(),
        shape,
        positional,
        keywords: Vec::new(),
        has_splat: false,
        line: line_of(function),
    }
}

fn describe_call(node: Node, source: &str) -> Option<ExtractedCall> {
    let function = node.child_by_field_name("function")?;
    let (name, shape) = callee_name(function, source);

    let mut positional = 0;
    let mut keywords = Vec::new();
    let mut has_splat = false;

    if let Some(arguments) = node.child_by_field_name("arguments") {
        match arguments.kind() {
            // `f(x for x in xs)`
            "generator_expression" => positional = 1,
            _ => {
                let mut cursor = arguments.walk();
                for arg in arguments.named_children(&mut cursor) {
                    match arg.kind() {
                        "keyword_argument" => {
                            if let Some(key) = arg.child_by_field_name("name") {
                                keywords.push(text(key, source).to_string());
                            }
                        }
                        "list_splat" | "dictionary_splat" => has_splat = true,
                        "comment" => {}
                        _ => positional += 1,
                    }
                }
            }
        }
    }

    Some(ExtractedCall {
        name,
        callee: text(function, source).to_string(),
        shape,
        positional,
        keywords,
        has_splat,
        line: line_of(node),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn calls(code: &str) -> Vec<ExtractedCall> {
        CallExtractor::new().unwrap().extract(code).unwrap()
    }

    fn bindings(code: &str) -> Vec<String> {
        CallExtractor::new()
            .unwrap()
            .survey(code)
            .unwrap()
            .bindings
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_simple_call() {
        let found = calls("from rockets import rocket_add\nresult = rocket_add(100, 50)\n");
        assert_eq!(
            found,
            vec![ExtractedCall {
                name: "rocket_add".to_string(),
                callee: "rocket_add".to_string(),
                shape: CalleeShape::Name,
                positional: 2,
                keywords: vec![],
                has_splat: false,
                line: 2,
            }]
        );
    }

    #[test]
    fn test_attribute_and_keywords() {
        let found = calls("bird = Bird(50, y=300)\nbird.jump()\n");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Bird");
        assert_eq!(found[0].shape, CalleeShape::Name);
        assert_eq!(found[0].positional, 1);
        assert_eq!(found[0].keywords, vec!["y".to_string()]);
        assert_eq!(found[1].name, "jump");
        assert_eq!(found[1].callee, "bird.jump");
        assert_eq!(found[1].shape, CalleeShape::Attribute);
    }

    #[test]
    fn test_nested_calls_are_all_found() {
        let found = calls("print(add(1, mul(2, 3)))\n");
        let names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["print", "add", "mul"]);
    }

    #[test]
    fn test_unresolvable_callee_shapes() {
        let found = calls("handlers[0](1)\nmake()()\n");
        let unresolvable: Vec<_> = found.iter().filter(|c| !c.is_resolvable()).collect();
        assert_eq!(unresolvable.len(), 2);
        assert_eq!(unresolvable[0].callee, "handlers[0]");
    }

    #[test]
    fn test_splats_and_generators() {
        let found = calls("f(*xs, **kw)\ng(x for x in xs)\n");
        assert!(found[0].has_splat);
        assert_eq!(found[0].positional, 0);
        assert_eq!(found[1].name, "g");
        assert_eq!(found[1].positional, 1);
    }

    #[test]
    fn test_strings_and_comments_hide_nothing() {
        let found = calls("# evil()\ntext = \"also_evil(1)\"\n");
        assert!(found.is_empty());
    }

    #[test]
    fn test_decorators_are_calls() {
        let found = calls("@exec\ndef rocket_add(a, b):\n    pass\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "exec");
        assert_eq!(found[0].positional, 1);
    }

    #[test]
    fn test_syntax_error_is_rejected() {
        let mut extractor = CallExtractor::new().unwrap();
        assert!(matches!(
            extractor.extract("result = rocket_add(1,\n"),
            Err(ExtractorError::Syntax { .. })
        ));
    }

    #[test]
    fn test_import_bindings() {
        assert_eq!(
            bindings(
                "from game_lib import rocket_add, Bird\n\
                 from os import system as launch\n\
                 import subprocess.run\n\
                 from . import helpers\n\
                 from tools import *\n"
            ),
            vec![
                "rocket_add (imported from game_lib, line 1)",
                "Bird (imported from game_lib, line 1)",
                "launch (import, line 2)",
                "subprocess (import, line 3)",
                "helpers (import, line 4)",
                "* (import, line 5)",
            ]
        );
    }

    #[test]
    fn test_assignment_and_definition_bindings() {
        assert_eq!(
            bindings(
                "rocket_add = exec\n\
                 a, (b, *rest) = 1, (2, 3)\n\
                 bird.jump = print\n\
                 table[0] = 1\n\
                 total: int = 0\n\
                 def draw(screen, color='white', *args, **kw):\n    global launch\n\
                 class Bird:\n    pass\n"
            ),
            vec![
                "rocket_add (assigned, line 1)",
                "a (assigned, line 2)",
                "b (assigned, line 2)",
                "rest (assigned, line 2)",
                "jump (assigned, line 3)",
                "total (assigned, line 5)",
                "draw (defined, line 6)",
                "screen (assigned, line 6)",
                "color (assigned, line 6)",
                "args (assigned, line 6)",
                "kw (assigned, line 6)",
                "launch (declared global, line 7)",
                "Bird (defined, line 8)",
            ]
        );
    }

    #[test]
    fn test_scoped_capture_bindings() {
        let found = bindings(
            "for rocket_add in handlers:\n    pass\n\
             with open('f') as draw:\n    pass\n\
             try:\n    pass\nexcept Exception as launch:\n    pass\n\
             if (jump := exec):\n    pass\n\
             squares = [x for x in range(3)]\n\
             match exec:\n    case spawn:\n        pass\n",
        );
        for name in ["rocket_add", "draw", "launch", "jump", "x", "spawn"] {
            assert!(
                found.iter().any(|b| b.starts_with(&format!("{name} "))),
                "{name} not bound in {found:?}"
            );
        }
    }
}
