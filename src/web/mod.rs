//! Handler registration and the request adapter.
//!
//! Handlers are plain async functions `(state, CallArgs) -> Result<Reply, HandlerError>`
//! declared together with their route and [`ParameterPlan`]. The
//! [`RouteRegistry`] mounts them on an axum router; every call goes through
//! the adapter, which binds path, query and body data according to the plan,
//! runs the handler and coerces its [`Reply`] into a response.

pub mod adapter;
pub mod args;
pub mod error;
pub mod handler;
pub mod logger;
pub mod page;
pub mod plan;
pub mod registry;
pub mod reply;
pub mod template;

pub use adapter::BindError;
pub use args::{CallArgs, REQUEST_KEY, RequestContext};
pub use error::{ApiError, ConfigurationError, HandlerError};
pub use handler::{HandlerDef, HandlerResult, HandlerSource};
pub use logger::log_request;
pub use page::{DEFAULT_PAGE_SIZE, Page, get_page_index};
pub use plan::ParameterPlan;
pub use registry::{RouteRegistry, WebState};
pub use reply::{REDIRECT_PREFIX, Reply, TEMPLATE_KEY, TemplateGlobals};
pub use template::{FileTemplates, MemoryTemplates, TemplateError, TemplateRenderer};
