use std::collections::HashMap;

use crate::annotation::PathMapping;
use crate::ast::{parse, Block, Statement};
use crate::error::{CompileError, Diagnostic};
use crate::loader::{map_path, ResourceLoader};
use crate::span::Span;
use crate::token::tokenize;

const DEFAULT_PARTIAL_DEPTH_LIMIT: usize = 32;

/// A fully loaded template: every partial, parent and block reference it
/// contained has already been inlined into `tree`, so nothing downstream of
/// this stage ever needs to resolve a name against the loader again.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub charset: String,
    pub tree: Statement,
}

/// Drives the tokenizer and parser over a named template, then recursively
/// inlines partials (`{{>name}}`) and parent/block inheritance
/// (`{{<parent}}...{{/parent}}`) until the tree is self-contained. Only the
/// root name and whatever it actually references gets resolved, rather than
/// an entire directory up front.
pub struct TemplateLoader<'a> {
    loader: &'a dyn ResourceLoader,
    path_mapping: &'a [PathMapping],
    partials: &'a HashMap<String, String>,
    depth_limit: usize,
}

impl<'a> TemplateLoader<'a> {
    pub fn new(
        loader: &'a dyn ResourceLoader,
        path_mapping: &'a [PathMapping],
        partials: &'a HashMap<String, String>,
    ) -> Self {
        TemplateLoader {
            loader,
            path_mapping,
            partials,
            depth_limit: DEFAULT_PARTIAL_DEPTH_LIMIT,
        }
    }

    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    pub fn load(&self, name: &str, charset: &str) -> Result<(Template, Vec<Diagnostic>), CompileError> {
        let mut warnings = Vec::new();
        let tree = self.load_tree(name, 0, &Span::new(name.to_string(), 1, 1), &mut warnings)?;
        Ok((
            Template {
                name: name.to_string(),
                charset: charset.to_string(),
                tree,
            },
            warnings,
        ))
    }

    fn load_tree(
        &self,
        name: &str,
        depth: usize,
        span: &Span,
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<Statement, CompileError> {
        if depth > self.depth_limit {
            return Err(CompileError::PartialDepthExceeded {
                name: name.to_string(),
                limit: self.depth_limit,
                span: span.clone(),
            });
        }
        let target = self.partials.get(name).map(String::as_str).unwrap_or(name);
        let mapped = map_path(target, self.path_mapping);
        let source = self.loader.load(&mapped)?;
        let tokens = tokenize(&source, mapped.clone())?;
        let (tree, mut parse_warnings) = parse(&tokens)?;
        warnings.append(&mut parse_warnings);
        self.inline(tree, depth, warnings)
    }

    fn inline(&self, statement: Statement, depth: usize, warnings: &mut Vec<Diagnostic>) -> Result<Statement, CompileError> {
        match statement {
            Statement::Program(block) => Ok(Statement::Program(self.inline_block(block, depth, warnings)?)),
            Statement::Section(path, block, span) => {
                Ok(Statement::Section(path, self.inline_block(block, depth, warnings)?, span))
            }
            Statement::Inverted(path, block, span) => {
                Ok(Statement::Inverted(path, self.inline_block(block, depth, warnings)?, span))
            }
            Statement::Block(name, block, span) => {
                Ok(Statement::Block(name, self.inline_block(block, depth, warnings)?, span))
            }
            Statement::Partial { name, indent, span } => {
                let resolved = self.load_tree(&name, depth + 1, &span, warnings)?;
                Ok(apply_indent(resolved, &indent))
            }
            Statement::Parent { name, blocks, span } => {
                let base = self.load_tree(&name, depth + 1, &span, warnings)?;
                let mut inlined_blocks = Vec::with_capacity(blocks.len());
                for (block_name, body) in blocks {
                    inlined_blocks.push((block_name, self.inline_block(body, depth, warnings)?));
                }
                Ok(override_blocks(base, &inlined_blocks))
            }
            other @ (Statement::Variable(..) | Statement::Html(..) | Statement::Content(_) | Statement::Comment) => {
                Ok(other)
            }
        }
    }

    fn inline_block(&self, block: Block, depth: usize, warnings: &mut Vec<Diagnostic>) -> Result<Block, CompileError> {
        let mut statements = Vec::with_capacity(block.statements.len());
        for statement in block.statements {
            let spliced = matches!(statement, Statement::Partial { .. } | Statement::Parent { .. });
            let inlined = self.inline(statement, depth, warnings)?;
            // A partial or parent reference resolves to another template's
            // own Program root; splice its statements in directly rather
            // than nesting a Program inside this block, which codegen has
            // no case for.
            match (spliced, inlined) {
                (true, Statement::Program(inner)) => statements.extend(inner.statements),
                (_, other) => statements.push(other),
            }
        }
        Ok(Block { statements })
    }
}

/// Replaces each `Statement::Block` in `tree` whose name matches an entry in
/// `overrides` with that override's body, leaving every other block at its
/// own default content: an override always wins, an absent override falls
/// through to the default.
fn override_blocks(statement: Statement, overrides: &[(String, Block)]) -> Statement {
    match statement {
        Statement::Program(block) => Statement::Program(override_in_block(block, overrides)),
        Statement::Section(path, block, span) => Statement::Section(path, override_in_block(block, overrides), span),
        Statement::Inverted(path, block, span) => {
            Statement::Inverted(path, override_in_block(block, overrides), span)
        }
        Statement::Block(name, default_body, span) => match overrides.iter().find(|(n, _)| n == &name) {
            Some((_, override_body)) => Statement::Block(name, override_body.clone(), span),
            None => Statement::Block(name, override_in_block(default_body, overrides), span),
        },
        Statement::Parent { name, blocks, span } => Statement::Parent {
            name,
            blocks: blocks
                .into_iter()
                .map(|(n, b)| (n, override_in_block(b, overrides)))
                .collect(),
            span,
        },
        other => other,
    }
}

fn override_in_block(block: Block, overrides: &[(String, Block)]) -> Block {
    Block {
        statements: block
            .statements
            .into_iter()
            .map(|s| override_blocks(s, overrides))
            .collect(),
    }
}

/// Prefixes every line of `statement`'s text content with `indent`, except
/// the blank line implied by a trailing newline, per the indentation
/// propagation rule for partial inclusion.
fn apply_indent(statement: Statement, indent: &str) -> Statement {
    if indent.is_empty() {
        return statement;
    }
    match statement {
        Statement::Program(block) => Statement::Program(indent_block(block, indent)),
        Statement::Section(path, block, span) => Statement::Section(path, indent_block(block, indent), span),
        Statement::Inverted(path, block, span) => Statement::Inverted(path, indent_block(block, indent), span),
        Statement::Block(name, block, span) => Statement::Block(name, indent_block(block, indent), span),
        Statement::Parent { name, blocks, span } => Statement::Parent {
            name,
            blocks: blocks.into_iter().map(|(n, b)| (n, indent_block(b, indent))).collect(),
            span,
        },
        Statement::Content(text) => Statement::Content(indent_content(&text, indent)),
        other => other,
    }
}

fn indent_block(block: Block, indent: &str) -> Block {
    Block {
        statements: block.statements.into_iter().map(|s| apply_indent(s, indent)).collect(),
    }
}

fn indent_content(text: &str, indent: &str) -> String {
    let prefixed = format!("\n{indent}");
    if let Some(body) = text.strip_suffix('\n') {
        format!("{}\n", body.replace('\n', &prefixed))
    } else {
        text.replace('\n', &prefixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::InlineLoader;

    #[test]
    fn inlines_a_partial() {
        let loader = InlineLoader::new()
            .with("main", "before {{>header}} after")
            .with("header", "HEADER");
        let mapping: Vec<PathMapping> = Vec::new();
        let partials = HashMap::new();
        let (template, _) = TemplateLoader::new(&loader, &mapping, &partials).load("main", "UTF-8").unwrap();
        match template.tree {
            Statement::Program(block) => {
                let rendered_partial = block
                    .statements
                    .iter()
                    .any(|s| matches!(s, Statement::Content(c) if c.contains("HEADER")));
                assert!(rendered_partial);
            }
            other => panic!("expected a program, got {:?}", other),
        }
    }

    #[test]
    fn applies_captured_indentation_to_partial_lines() {
        let loader = InlineLoader::new()
            .with("main", "  {{>rows}}\n")
            .with("rows", "a\nb\n");
        let mapping: Vec<PathMapping> = Vec::new();
        let partials = HashMap::new();
        let (template, _) = TemplateLoader::new(&loader, &mapping, &partials).load("main", "UTF-8").unwrap();
        let rendered = render_content(&template.tree);
        assert!(rendered.contains("a\n  b\n"));
    }

    #[test]
    fn parent_override_replaces_default_block() {
        let loader = InlineLoader::new()
            .with("main", "{{<layout}}{{$title}}custom{{/title}}{{/layout}}")
            .with("layout", "[{{$title}}default{{/title}}]");
        let mapping: Vec<PathMapping> = Vec::new();
        let partials = HashMap::new();
        let (template, _) = TemplateLoader::new(&loader, &mapping, &partials).load("main", "UTF-8").unwrap();
        let rendered = render_content(&template.tree);
        assert!(rendered.contains("custom"));
        assert!(!rendered.contains("default"));
    }

    #[test]
    fn parent_override_body_inlines_its_own_partial() {
        let loader = InlineLoader::new()
            .with("main", "{{<layout}}{{$title}}{{>label}}{{/title}}{{/layout}}")
            .with("label", "custom label")
            .with("layout", "[{{$title}}default{{/title}}]");
        let mapping: Vec<PathMapping> = Vec::new();
        let partials = HashMap::new();
        let (template, _) = TemplateLoader::new(&loader, &mapping, &partials).load("main", "UTF-8").unwrap();
        let rendered = render_content(&template.tree);
        assert!(rendered.contains("custom label"));
    }

    #[test]
    fn detects_partial_recursion_depth() {
        let loader = InlineLoader::new().with("loop", "{{>loop}}");
        let mapping: Vec<PathMapping> = Vec::new();
        let partials = HashMap::new();
        let result = TemplateLoader::new(&loader, &mapping, &partials)
            .with_depth_limit(4)
            .load("loop", "UTF-8");
        assert!(matches!(result, Err(CompileError::PartialDepthExceeded { .. })));
    }

    #[test]
    fn partials_table_redirects_a_referenced_name() {
        let loader = InlineLoader::new()
            .with("main", "{{>header}}")
            .with("header", "default header")
            .with("alt/header", "alternate header");
        let mapping: Vec<PathMapping> = Vec::new();
        let mut partials = HashMap::new();
        partials.insert("header".to_string(), "alt/header".to_string());
        let (template, _) = TemplateLoader::new(&loader, &mapping, &partials).load("main", "UTF-8").unwrap();
        let rendered = render_content(&template.tree);
        assert!(rendered.contains("alternate header"));
        assert!(!rendered.contains("default header"));
    }

    fn render_content(statement: &Statement) -> String {
        let mut out = String::new();
        collect(statement, &mut out);
        out
    }

    fn collect(statement: &Statement, out: &mut String) {
        match statement {
            Statement::Program(block) => block.statements.iter().for_each(|s| collect(s, out)),
            Statement::Section(_, block, _) | Statement::Inverted(_, block, _) | Statement::Block(_, block, _) => {
                block.statements.iter().for_each(|s| collect(s, out))
            }
            Statement::Content(text) => out.push_str(text),
            _ => {}
        }
    }
}
