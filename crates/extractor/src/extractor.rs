use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, Result};
use crate::language::{first_error_position, module_name_for_path, new_parser};
use crate::types::{
    FunctionSignature, ParamKind, Parameter, SignatureKind, SourceLocation, TypeHint,
};
use tree_sitter::{Node, Parser, Tree};

/// Syntactic context a declaration appears in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Module,
    ClassBody,
    FunctionBody,
}

/// AST-based extractor turning one Python file into function signatures
pub struct SignatureExtractor {
    config: ExtractorConfig,
    parser: Parser,
}

/// Per-file walk state
struct FileWalk<'a> {
    source: &'a str,
    file_path: &'a str,
    module: String,
    scope: Vec<String>,
    out: Vec<FunctionSignature>,
}

impl SignatureExtractor {
    /// Create new extractor bound to the Python grammar
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        Ok(Self {
            config,
            parser: new_parser()?,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Parse one file and extract every declared signature.
    ///
    /// A file whose tree contains syntax errors yields `ExtractorError::Syntax` and no
    /// signatures: a half-parsed file cannot vouch for what it declares.
    pub fn extract(&mut self, file_path: &str, source: &str) -> Result<Vec<FunctionSignature>> {
        let tree = self.parse(file_path, source)?;

        let mut walk = FileWalk {
            source,
            file_path,
            module: module_name_for_path(file_path),
            scope: Vec::new(),
            out: Vec::new(),
        };
        self.visit_children(&mut walk, tree.root_node(), Context::Module);

        log::debug!("Extracted {} signatures from {file_path}", walk.out.len());
        Ok(walk.out)
    }

    fn parse(&mut self, file_path: &str, source: &str) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ExtractorError::parse(file_path, "parser returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error_position(root).unwrap_or((1, 1));
            return Err(ExtractorError::Syntax {
                path: file_path.to_string(),
                line,
                column,
            });
        }
        Ok(tree)
    }

    fn visit_children(&self, walk: &mut FileWalk<'_>, node: Node, context: Context) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(walk, child, context, &[]);
        }
    }

    fn visit(&self, walk: &mut FileWalk<'_>, node: Node, context: Context, decorators: &[String]) {
        match node.kind() {
            "decorated_definition" => {
                let decorators = collect_decorators(walk.source, node);
                if let Some(definition) = node.child_by_field_name("definition") {
                    self.visit(walk, definition, context, &decorators);
                }
            }
            "function_definition" => self.visit_function(walk, node, context, decorators),
            "class_definition" => self.visit_class(walk, node, decorators),
            // Lambdas and comprehensions never declare named functions.
            "lambda" | "comment" | "string" => {}
            _ => {
                // Conditional / guarded definitions (`if TYPE_CHECKING:`, `try:`) keep
                // the enclosing context.
                self.visit_children(walk, node, context);
            }
        }
    }

    fn visit_function(
        &self,
        walk: &mut FileWalk<'_>,
        node: Node,
        context: Context,
        decorators: &[String],
    ) {
        let Some(name) = field_text(walk.source, node, "name") else {
            return;
        };

        let kind = match context {
            Context::Module => SignatureKind::Function,
            Context::ClassBody => SignatureKind::Method,
            Context::FunctionBody => SignatureKind::Nested,
        };

        let wanted = match kind {
            SignatureKind::Method => self.config.include_methods,
            SignatureKind::Nested => self.config.include_nested,
            _ => true,
        };

        if wanted && self.config.accepts_name(&name) {
            let mut parameters = extract_parameters(walk.source, node);
            if kind == SignatureKind::Method && !is_static(decorators) {
                drop_receiver(&mut parameters);
            }

            walk.out.push(FunctionSignature {
                name: name.clone(),
                parameters,
                return_type: TypeHint::from_annotation(
                    field_text(walk.source, node, "return_type").as_deref(),
                ),
                location: location(walk.file_path, node),
                kind,
                scope: walk.scope.clone(),
                module: walk.module.clone(),
            });
        }

        if let Some(body) = node.child_by_field_name("body") {
            walk.scope.push(name);
            self.visit_children(walk, body, Context::FunctionBody);
            walk.scope.pop();
        }
    }

    fn visit_class(&self, walk: &mut FileWalk<'_>, node: Node, decorators: &[String]) {
        let Some(name) = field_text(walk.source, node, "name") else {
            return;
        };
        let body = node.child_by_field_name("body");

        if self.config.include_constructors && self.config.accepts_name(&name) {
            let parameters = body
                .map(|body| constructor_parameters(walk.source, node, body, decorators))
                .unwrap_or_default();

            walk.out.push(FunctionSignature {
                name: name.clone(),
                parameters,
                return_type: TypeHint::Declared(name.clone()),
                location: location(walk.file_path, node),
                kind: SignatureKind::Constructor,
                scope: walk.scope.clone(),
                module: walk.module.clone(),
            });
        }

        if let Some(body) = body {
            walk.scope.push(name);
            self.visit_children(walk, body, Context::ClassBody);
            walk.scope.pop();
        }
    }
}

fn location(file_path: &str, node: Node) -> SourceLocation {
    SourceLocation {
        file_path: file_path.to_string(),
        line: node.start_position().row + 1,
    }
}

fn node_text<'s>(source: &'s str, node: Node) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

fn field_text(source: &str, node: Node, field: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_text(source, child).to_string())
}

fn collect_decorators(source: &str, node: Node) -> Vec<String> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() == "decorator")
        .map(|child| {
            node_text(source, child)
                .trim_start_matches('@')
                .trim()
                .to_string()
        })
        .collect()
}

/// Strip `self` / `cls`
fn drop_receiver(parameters: &mut Vec<Parameter>) {
    if parameters
        .first()
        .is_some_and(|p| p.kind == ParamKind::Positional)
    {
        parameters.remove(0);
    }
}

fn decorator_matches(decorators: &[String], wanted: &str) -> bool {
    decorators.iter().any(|d| {
        let head = d.split('(').next().unwrap_or(d);
        head == wanted || head.ends_with(&format!(".{wanted}"))
    })
}

fn is_static(decorators: &[String]) -> bool {
    decorator_matches(decorators, "staticmethod")
}

/// Walk a `parameters` node into ordered parameter records
fn extract_parameters(source: &str, function: Node) -> Vec<Parameter> {
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut keyword_only = false;
    let mut cursor = params.walk();
    let children: Vec<_> = params.named_children(&mut cursor).collect();

    for child in children {
        let slot_kind = if keyword_only {
            ParamKind::KeywordOnly
        } else {
            ParamKind::Positional
        };

        match child.kind() {
            "identifier" => {
                out.push(
                    Parameter::positional(node_text(source, child), TypeHint::Unknown)
                        .with_kind(slot_kind),
                );
            }
            "typed_parameter" => {
                let type_hint = TypeHint::from_annotation(
                    field_text(source, child, "type").as_deref(),
                );
                // The name is the first named child: identifier or a splat pattern.
                let mut inner = child.walk();
                let first = child.named_children(&mut inner).next();
                match first.map(|n| (n.kind(), n)) {
                    Some(("list_splat_pattern", n)) => {
                        keyword_only = true;
                        out.push(splat_parameter(source, n, type_hint, ParamKind::VarArgs));
                    }
                    Some(("dictionary_splat_pattern", n)) => {
                        out.push(splat_parameter(source, n, type_hint, ParamKind::KwArgs));
                    }
                    Some((_, n)) => {
                        out.push(
                            Parameter::positional(node_text(source, n), type_hint)
                                .with_kind(slot_kind),
                        );
                    }
                    None => {}
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                let Some(name) = field_text(source, child, "name") else {
                    continue;
                };
                let type_hint =
                    TypeHint::from_annotation(field_text(source, child, "type").as_deref());
                out.push(
                    Parameter::positional(name, type_hint)
                        .with_kind(slot_kind)
                        .with_default(),
                );
            }
            "list_splat_pattern" => {
                keyword_only = true;
                out.push(splat_parameter(source, child, TypeHint::Unknown, ParamKind::VarArgs));
            }
            "dictionary_splat_pattern" => {
                out.push(splat_parameter(source, child, TypeHint::Unknown, ParamKind::KwArgs));
            }
            // Bare `*` separator
            "keyword_separator" => keyword_only = true,
            // `/` separator and comments carry no parameter
            _ => {}
        }
    }

    out
}

fn splat_parameter(source: &str, node: Node, type_hint: TypeHint, kind: ParamKind) -> Parameter {
    let name = node_text(source, node)
        .trim_start_matches('*')
        .trim()
        .to_string();
    Parameter::positional(name, type_hint).with_kind(kind)
}

/// Parameters a class accepts when called.
///
/// Order of precedence: an explicit `__init__`, then `@dataclass` fields, then a
/// variadic placeholder for classes that inherit a constructor we cannot see.
fn constructor_parameters(
    source: &str,
    class: Node,
    body: Node,
    decorators: &[String],
) -> Vec<Parameter> {
    let mut cursor = body.walk();
    let members: Vec<_> = body.named_children(&mut cursor).collect();

    for member in &members {
        let function = match member.kind() {
            "function_definition" => Some(*member),
            "decorated_definition" => member
                .child_by_field_name("definition")
                .filter(|d| d.kind() == "function_definition"),
            _ => None,
        };
        let Some(function) = function else { continue };
        if field_text(source, function, "name").as_deref() == Some("__init__") {
            let mut params = extract_parameters(source, function);
            drop_receiver(&mut params);
            return params;
        }
    }

    if decorator_matches(decorators, "dataclass") {
        return dataclass_fields(source, &members);
    }

    let has_bases = class
        .child_by_field_name("superclasses")
        .is_some_and(|bases| {
            let mut cursor = bases.walk();
            let found = bases
                .named_children(&mut cursor)
                .any(|b| b.kind() != "keyword_argument" && b.kind() != "comment");
            found
        });

    if has_bases {
        vec![
            Parameter::positional("args", TypeHint::Unknown).with_kind(ParamKind::VarArgs),
            Parameter::positional("kwargs", TypeHint::Unknown).with_kind(ParamKind::KwArgs),
        ]
    } else {
        Vec::new()
    }
}

/// `name: T` and `name: T = default` statements in a dataclass body
fn dataclass_fields(source: &str, members: &[Node]) -> Vec<Parameter> {
    let mut out = Vec::new();
    for member in members {
        if member.kind() != "expression_statement" {
            continue;
        }
        let Some(assignment) = member.named_child(0).filter(|n| n.kind() == "assignment") else {
            continue;
        };
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        let Some(annotation) = field_text(source, assignment, "type") else {
            // Un-annotated class attributes are not dataclass fields.
            continue;
        };
        if left.kind() != "identifier" || annotation.trim_start().starts_with("ClassVar") {
            continue;
        }
        let mut param = Parameter::positional(
            node_text(source, left),
            TypeHint::from_annotation(Some(&annotation)),
        );
        if assignment.child_by_field_name("right").is_some() {
            param = param.with_default();
        }
        out.push(param);
    }
    out
}
