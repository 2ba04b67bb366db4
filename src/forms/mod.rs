//! Form routing and completion engine.
//!
//! `model` holds the entities, `page_order` and `conditions` the two halves of
//! a form's page graph, `page` the field rules for saving a page, and `status`
//! the per-section task list that gates make-live. `repository` persists all
//! of it in SQLite.

pub mod conditions;
pub mod graph;
pub mod markdown;
pub mod model;
pub mod page;
pub mod page_order;
pub mod repository;
pub mod status;
pub mod view;


pub use conditions::{ConditionGraph, RoutingError, RoutingErrorKind};
pub use graph::FormGraph;
pub use markdown::{GuidanceMarkdown, MarkdownValidator};
pub use model::{AnswerType, Condition, Form, Page, RouteTarget};
pub use page::PageFields;
pub use page_order::PageOrder;
pub use repository::{FormPatch, FormsRepository};
pub use status::{CompletionStatus, MissingSection, Section, TaskStatus, TaskStatuses};
pub use view::{FormView, PageView};
