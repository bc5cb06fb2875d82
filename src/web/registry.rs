use super::adapter;
use super::error::ConfigurationError;
use super::handler::{HandlerDef, HandlerSource};
use super::template::TemplateRenderer;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::routing::{MethodFilter, MethodRouter};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Application state the adapter needs from the router.
pub trait WebState: Clone + Send + Sync + 'static {
    fn templates(&self) -> &dyn TemplateRenderer;
}

struct Route<S> {
    method: Method,
    filter: MethodFilter,
    path: String,
    def: Arc<HandlerDef<S>>,
}

/// Handlers keyed by (method, path), turned into an axum router at the end.
pub struct RouteRegistry<S> {
    routes: Vec<Route<S>>,
    seen: HashSet<(Method, String)>,
}

impl<S> Default for RouteRegistry<S> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<S: WebState> RouteRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: HandlerDef<S>) -> Result<(), ConfigurationError> {
        let method = def
            .http_method()
            .cloned()
            .ok_or_else(|| ConfigurationError::MissingMethod(def.name().to_string()))?;
        let path = def
            .path_pattern()
            .map(str::to_string)
            .ok_or_else(|| ConfigurationError::MissingPath(def.name().to_string()))?;
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| ConfigurationError::UnsupportedMethod {
                handler: def.name().to_string(),
                method: method.to_string(),
            })?;

        if !self.seen.insert((method.clone(), path.clone())) {
            return Err(ConfigurationError::DuplicateRoute {
                method: method.to_string(),
                path,
            });
        }

        info!(
            "add route {} {} => {}({})",
            method,
            path,
            def.name(),
            def.parameter_plan()
        );
        self.routes.push(Route {
            method,
            filter,
            path,
            def: Arc::new(def),
        });
        Ok(())
    }

    /// Register every handler of `source` that carries both a method and a path.
    pub fn register_all(&mut self, source: &impl HandlerSource<S>) -> Result<usize, ConfigurationError> {
        let mut count = 0;
        for def in source.handlers() {
            if def.http_method().is_none() || def.path_pattern().is_none() {
                debug!(handler = def.name(), "skipping handler without route metadata");
                continue;
            }
            self.register(def)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes as `(method, path, handler name)`.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str, &'static str)> {
        self.routes
            .iter()
            .map(|route| (&route.method, route.path.as_str(), route.def.name()))
    }

    pub fn into_router(self) -> Router<S> {
        let mut by_path: BTreeMap<String, MethodRouter<S>> = BTreeMap::new();
        for route in self.routes {
            let def = route.def;
            let handler = move |State(state): State<S>, request: Request| {
                let def = Arc::clone(&def);
                async move { adapter::dispatch(def, state, request).await }
            };
            let method_router = by_path.remove(&route.path).unwrap_or_else(MethodRouter::new);
            by_path.insert(route.path, method_router.on(route.filter, handler));
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            })
    }
}
