use super::args::CallArgs;
use super::error::HandlerError;
use super::plan::ParameterPlan;
use super::reply::Reply;
use axum::http::Method;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub type HandlerResult = Result<Reply, HandlerError>;

type BoxedHandler<S> = Arc<dyn Fn(S, CallArgs) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A handler function plus the route metadata attached to it.
///
/// Method and path are optional so that a source can hand out helpers that
/// are not routes; [`RouteRegistry::register`](super::RouteRegistry::register)
/// rejects those.
pub struct HandlerDef<S> {
    name: &'static str,
    method: Option<Method>,
    path: Option<String>,
    plan: ParameterPlan,
    handler: BoxedHandler<S>,
}

impl<S> Clone for HandlerDef<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            method: self.method.clone(),
            path: self.path.clone(),
            plan: self.plan.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<S: Send + 'static> HandlerDef<S> {
    pub fn new<F, Fut>(name: &'static str, handler: F) -> Self
    where
        F: Fn(S, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name,
            method: None,
            path: None,
            plan: ParameterPlan::new(),
            handler: Arc::new(move |state: S, args: CallArgs| handler(state, args).boxed()),
        }
    }

    pub fn get<F, Fut>(path: &str, name: &'static str, handler: F) -> Self
    where
        F: Fn(S, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(name, handler).method(Method::GET).path(path)
    }

    pub fn post<F, Fut>(path: &str, name: &'static str, handler: F) -> Self
    where
        F: Fn(S, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(name, handler).method(Method::POST).path(path)
    }
}

impl<S> HandlerDef<S> {
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn plan(mut self, plan: ParameterPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn http_method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn path_pattern(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn parameter_plan(&self) -> &ParameterPlan {
        &self.plan
    }

    pub(crate) fn call(&self, state: S, args: CallArgs) -> BoxFuture<'static, HandlerResult> {
        (self.handler)(state, args)
    }
}

impl<S> fmt::Debug for HandlerDef<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDef")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("plan", &self.plan)
            .finish()
    }
}

/// A module-like group of handlers, registered together.
pub trait HandlerSource<S> {
    fn handlers(&self) -> Vec<HandlerDef<S>>;
}
