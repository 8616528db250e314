//! Path expressions over node trees.
//!
//! An expression is a `/`-separated chain of iterators, each mapping the node set produced by
//! the previous one to a new set, starting from the data source:
//!
//! | Iterator        | Selects                                                        |
//! |-----------------|----------------------------------------------------------------|
//! | `name`, `"..."` | children with that name                                        |
//! | `*` / `**`      | children / all descendants                                     |
//! | `.` / `..`      | parent / root                                                  |
//! | `..name`        | nearest ancestor with that name                                |
//! | `@name`         | nearest preceding node (document order) with that name         |
//! | `#`             | nodes referenced by the value (node, node list or expression)  |
//! | `<` / `>`       | previous / next node in document order                         |
//! | `++` / `--`     | previous / next sibling                                        |
//! | `+n` / `-n`     | sibling at a relative offset                                   |
//! | `n`             | child at position `n`                                          |
//! | `[a,b]`         | children at positions `a` (inclusive) to `b` (exclusive)       |
//! | `%n`            | every `n`th node of the current set                            |
//! | `=$` / `$`      | first node of each distinct value / name                       |
//! | `=text`         | nodes whose value renders as `text`                            |
//! | `=:type:text`   | nodes whose value equals `text` converted to `type`            |
//! | `=:regex:re`    | nodes whose value matches `re`                                 |
//! | `:regex:re`     | children whose name matches `re`                               |
//!
//! `(` and `)` group a sub-chain. Inside a group, `|`, `&`, `^` and `!` combine the chain so
//! far with the chain that follows (union, intersection, symmetric difference, difference),
//! both evaluated from the group's input. A final `?name`, `?value`, `?node` or `?count`
//! selects the result facet, optionally followed by `.type` to convert values. A leading `@`
//! makes `?value` results that hold expressions evaluate in place.
//!
//! ```
//! use nodal_core::{Expression, Loader, Node, Value};
//!
//! let ctx = Loader::new().create_context(None).unwrap();
//! let root = Node::new("root")
//!     .with_child(Node::with_value("a", 1))
//!     .with_child(Node::with_value("b", 2));
//!
//! let names = Expression::compile("*?name").unwrap().evaluate(&ctx, &root, None).unwrap();
//! assert_eq!(names.names(), ["a", "b"]);
//!
//! let b = Expression::compile("/b?value").unwrap().evaluate(&ctx, &root, None).unwrap();
//! assert_eq!(b.values(), [Value::Int(2)]);
//! ```

mod compiler;
mod evaluator;
mod iterators;
mod matches;
mod placeholder;
mod tokenizer;

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::dispatch::Context;
use crate::error::{Error, Result};
use crate::node::Node;

pub use matches::{Match, MatchEntity, ResultType};

/// A compiled expression.
#[derive(Clone, Debug)]
pub struct Expression {
    source: String,
    program: compiler::Program,
    formatted: bool,
}

impl Expression {
    pub fn compile(source: &str) -> Result<Self> {
        let program = compiler::compile(source)?;
        Ok(Self { source: source.to_owned(), program, formatted: placeholder::has_placeholders(source) })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn result_type(&self) -> ResultType {
        self.program.result_type
    }

    /// Alias given after the result type (`?value.int`), if any.
    pub fn convert_type(&self) -> Option<&str> {
        self.program.convert.as_deref()
    }

    pub fn is_reference(&self) -> bool {
        self.program.reference
    }

    /// True if the source contains `{n}` placeholders.
    pub fn is_formatted(&self) -> bool {
        self.formatted
    }

    /// Evaluates the expression against `data_source`.
    ///
    /// `holder` is the node the expression was taken from; its empty-named children fill the
    /// `{n}` placeholders. Paths that lead nowhere produce an empty match.
    pub fn evaluate(&self, ctx: &Context, data_source: &Node, holder: Option<&Node>) -> Result<Match> {
        if !self.formatted {
            return evaluator::run(ctx, &self.program, data_source);
        }
        let text = placeholder::substitute(ctx, &self.source, data_source, holder)?;
        trace!(expression = %self.source, formatted = %text, "placeholders substituted");
        let program = compiler::compile(&text)?;
        evaluator::run(ctx, &program, data_source)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Expression {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        Expression::compile(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Loader;
    use crate::value::Value;
    use rstest::{fixture, rstest};

    #[fixture]
    fn ctx() -> Context {
        Loader::new().create_context(None).unwrap()
    }

    #[fixture]
    fn tree() -> Node {
        Node::new("root")
            .with_child(Node::with_value("a", 1))
            .with_child(Node::with_value("b", 2))
            .with_child(Node::with_value("c", 3))
    }

    fn eval(ctx: &Context, source: &str, node: &Node) -> Match {
        Expression::compile(source).unwrap().evaluate(ctx, node, None).unwrap()
    }

    #[rstest]
    fn accessors() {
        let expression = Expression::compile("@/x?value.int").unwrap();
        assert!(expression.is_reference());
        assert_eq!(expression.result_type(), ResultType::Value);
        assert_eq!(expression.convert_type(), Some("int"));
        assert_eq!(expression.to_string(), "@/x?value.int");
        assert!(!expression.is_formatted());
    }

    #[rstest]
    fn empty_expression_matches_the_data_source(ctx: Context, tree: Node) {
        assert_eq!(eval(&ctx, "", &tree).nodes(), vec![tree]);
    }

    #[rstest]
    fn missing_paths_are_empty(ctx: Context, tree: Node) {
        assert!(eval(&ctx, "/nope/deeper", &tree).is_empty());
        assert!(eval(&ctx, "/[5,9]", &tree).is_empty());
        assert!(eval(&ctx, "/7", &tree).is_empty());
    }

    #[rstest]
    fn placeholders_are_substituted_per_evaluation(ctx: Context, tree: Node) {
        let expression = Expression::compile("/{0}?value").unwrap();
        let holder = Node::new("holder").with_child(Node::with_value("", "c"));
        let matched = expression.evaluate(&ctx, &tree, Some(&holder)).unwrap();
        assert_eq!(matched.values(), [Value::Int(3)]);
        assert!(expression.evaluate(&ctx, &tree, None).is_err());
    }
}
