use crate::error::{CompileError, Diagnostic};
use crate::path::Path;
use crate::span::{Span, Spanned};
use crate::token::Token;

/// A sequence of statements. Adjacent `Content` statements are merged as
/// they're appended, mirroring how the tokenizer's `Text` tokens accumulate
/// runs of literal characters.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    fn new() -> Self {
        Block {
            statements: Vec::new(),
        }
    }

    fn append(&mut self, statement: Statement) {
        let trailer = match self.statements.pop() {
            Some(mut last) => {
                if last.merge(&statement) {
                    last
                } else {
                    self.statements.push(last);
                    statement
                }
            }
            None => statement,
        };
        self.statements.push(trailer);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Program(Block),
    Section(Path, Block, Span),
    Inverted(Path, Block, Span),
    /// An escaped interpolation, `{{name}}`.
    Variable(Path, Span),
    /// An unescaped interpolation, `{{{name}}}` or `{{&name}}`.
    Html(Path, Span),
    Partial {
        name: String,
        indent: String,
        span: Span,
    },
    /// `{{<name}} ... {{/name}}` — a parent template inclusion with any
    /// `{{$block}}` overrides collected from its direct body.
    Parent {
        name: String,
        blocks: Vec<(String, Block)>,
        span: Span,
    },
    /// `{{$name}} ... {{/name}}` — either a default block definition (at
    /// program scope or inside a partial) or an override (inside a parent).
    Block(String, Block, Span),
    Content(String),
    Comment,
}

impl Statement {
    fn merge(&mut self, statement: &Statement) -> bool {
        match (self, statement) {
            (Statement::Content(left), Statement::Content(right)) => {
                left.push_str(right);
                true
            }
            _ => false,
        }
    }

    /// Visits the tree collecting the names of partials referenced anywhere
    /// within it, so the loader knows what else it must resolve.
    pub fn partials(&self) -> Vec<&str> {
        match self {
            Statement::Program(block) => block.statements.iter().flat_map(Statement::partials).collect(),
            Statement::Section(_, block, _) | Statement::Inverted(_, block, _) => {
                block.statements.iter().flat_map(Statement::partials).collect()
            }
            Statement::Block(_, block, _) => block.statements.iter().flat_map(Statement::partials).collect(),
            Statement::Parent { name, blocks, .. } => {
                let mut names = vec![name.as_str()];
                for (_, block) in blocks {
                    names.extend(block.statements.iter().flat_map(Statement::partials));
                }
                names
            }
            Statement::Partial { name, .. } => vec![name.as_str()],
            _ => Vec::new(),
        }
    }
}

enum Frame {
    Program,
    Section(Path, Span),
    Inverted(Path, Span),
    Parent(String, Span),
    Block(String, Span),
}

/// Parses a token stream into a `Statement::Program` tree, using a stack of
/// open frames rather than a PEG grammar's recursive rules.
///
/// Returns any non-fatal diagnostics alongside the tree (currently just the
/// delimiter-change warning); structural problems are fatal and returned as
/// an `Err`.
pub fn parse(tokens: &[Spanned<Token>]) -> Result<(Statement, Vec<Diagnostic>), CompileError> {
    let mut stack: Vec<(Frame, Block)> = vec![(Frame::Program, Block::new())];
    let mut warnings = Vec::new();

    for spanned in tokens {
        let span = spanned.span.clone();
        match &spanned.node {
            Token::Text(text) => {
                top(&mut stack).1.append(Statement::Content(text.clone()));
            }
            Token::Interpolation { path, escaped } => {
                let statement = if *escaped {
                    Statement::Variable(path.clone(), span)
                } else {
                    Statement::Html(path.clone(), span)
                };
                top(&mut stack).1.append(statement);
            }
            Token::Comment => {
                top(&mut stack).1.append(Statement::Comment);
            }
            Token::SectionOpen(path) => {
                stack.push((Frame::Section(path.clone(), span), Block::new()));
            }
            Token::InvertedOpen(path) => {
                stack.push((Frame::Inverted(path.clone(), span), Block::new()));
            }
            Token::ParentOpen(name) => {
                stack.push((Frame::Parent(name.clone(), span), Block::new()));
            }
            Token::BlockOpen(name) => {
                if let Some((Frame::Section(..), _)) | Some((Frame::Inverted(..), _)) = stack.last() {
                    return Err(CompileError::BlockOutsideParent(name.clone(), span));
                }
                stack.push((Frame::Block(name.clone(), span), Block::new()));
            }
            Token::PartialInclude { name, indent } => {
                top(&mut stack).1.append(Statement::Partial {
                    name: name.clone(),
                    indent: indent.clone(),
                    span,
                });
            }
            Token::SectionClose(close_path) => {
                let (frame, block) = stack.pop().ok_or_else(|| CompileError::MismatchedSection {
                    open: close_path.clone(),
                    open_span: span.clone(),
                    close: close_path.clone(),
                    close_span: span.clone(),
                })?;
                let statement = close_frame(frame, block, close_path, &span)?;
                top(&mut stack).1.append(statement);
            }
            Token::DelimiterChange(..) => {
                warnings.push(Diagnostic::warning(
                    "custom tag delimiters are not supported; the template continues to use {{ and }}",
                    vec![span],
                ));
            }
            Token::Eof => {
                if stack.len() != 1 {
                    let (frame, _) = stack.last().unwrap();
                    let frame_span = match frame {
                        Frame::Program => span.clone(),
                        Frame::Section(_, s) | Frame::Inverted(_, s) | Frame::Parent(_, s) | Frame::Block(_, s) => {
                            s.clone()
                        }
                    };
                    return Err(CompileError::UnclosedTag { span: frame_span });
                }
            }
        }
    }

    let (_, root) = stack.pop().expect("program frame always present");
    Ok((Statement::Program(root), warnings))
}

fn top(stack: &mut [(Frame, Block)]) -> &mut (Frame, Block) {
    stack.last_mut().expect("program frame always present")
}

fn close_frame(frame: Frame, block: Block, close_path: &Path, close_span: &Span) -> Result<Statement, CompileError> {
    match frame {
        Frame::Program => unreachable!("the program frame is never popped by a close tag"),
        Frame::Section(open_path, open_span) => {
            if &open_path != close_path {
                return Err(CompileError::MismatchedSection {
                    open: open_path,
                    open_span,
                    close: close_path.clone(),
                    close_span: close_span.clone(),
                });
            }
            Ok(Statement::Section(open_path, block, open_span))
        }
        Frame::Inverted(open_path, open_span) => {
            if &open_path != close_path {
                return Err(CompileError::MismatchedSection {
                    open: open_path,
                    open_span,
                    close: close_path.clone(),
                    close_span: close_span.clone(),
                });
            }
            Ok(Statement::Inverted(open_path, block, open_span))
        }
        Frame::Parent(name, open_span) => {
            if close_path.to_string() != name {
                return Err(CompileError::MismatchedSection {
                    open: Path::keys(vec![name]),
                    open_span,
                    close: close_path.clone(),
                    close_span: close_span.clone(),
                });
            }
            let mut blocks: Vec<(String, Block)> = Vec::new();
            for statement in block.statements {
                if let Statement::Block(block_name, body, span) = statement {
                    if blocks.iter().any(|(n, _)| n == &block_name) {
                        return Err(CompileError::DuplicateBlock {
                            name: block_name,
                            span,
                        });
                    }
                    blocks.push((block_name, body));
                }
            }
            Ok(Statement::Parent {
                name,
                blocks,
                span: open_span,
            })
        }
        Frame::Block(name, open_span) => {
            if close_path.to_string() != name {
                return Err(CompileError::MismatchedSection {
                    open: Path::keys(vec![name]),
                    open_span,
                    close: close_path.clone(),
                    close_span: close_span.clone(),
                });
            }
            Ok(Statement::Block(name, block, open_span))
        }
    }
}
