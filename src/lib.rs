pub mod span;
pub mod types;
pub mod unify;
pub mod ast;
pub mod visitor;
pub mod type_checker;
pub mod diagnostic;
pub mod report;


pub use span::Span;
pub use types::*;
pub use unify::*;
pub use ast::*;
pub use visitor::*;
pub use type_checker::*;
pub use report::*;
