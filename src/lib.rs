//! XPath 1.0 expression engine over pluggable tree models.
//!
//! The engine never touches a concrete document representation: it is generic
//! over the [`TreeNode`] traversal contract, so one compiled expression can
//! run over unrelated tree implementations. A reference in-memory model lives
//! in [`simple_node`].
//!
//! ```
//! use treepath::simple_node::{doc, elem, text};
//! use treepath::{ContextBuilder, compile};
//!
//! let document = doc()
//!     .child(elem("library").child(elem("book").child(text("Dune"))))
//!     .build();
//!
//! let xpath = compile("/library/book").unwrap();
//! let ctx = ContextBuilder::new().with_node(document).build();
//! let books = xpath.select_nodes(&ctx).unwrap();
//! assert_eq!(books.len(), 1);
//! assert_eq!(xpath.string_value_of(&ctx).unwrap(), "Dune");
//! ```

pub mod evaluator;
pub mod functions;
pub mod model;
pub mod nodeset;
pub mod parser;
pub mod runtime;
pub mod simple_node;
pub mod value;

pub use evaluator::{XPath, compile, evaluate};
pub use model::{Axis, ExpandedName, NodeKind, QName, TreeNode};
pub use parser::parse;
pub use runtime::{ContextBuilder, Error, EvalContext, FunctionRegistry};
pub use simple_node::{SimpleNode, SimpleNodeBuilder};
pub use value::{Numeric, Value};
