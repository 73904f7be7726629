//! A small method dispatch table on top of [`path_tree`].
//!
//! Every registered path owns a table of per-method handlers, so a request for
//! a known path with an unregistered method is answered with `405` rather than
//! `404`.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::Extensions;
use hyper::{Method, Request, Response, StatusCode, header};

use super::Body;
use super::error::{ApiError, Result};
use crate::global::Global;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

type Handler = Box<dyn Fn(Request<Bytes>) -> BoxFuture<Result<Response<Body>>> + Send + Sync>;

type DataProvider = Box<dyn Fn(&mut Extensions) + Send + Sync>;

/// Path parameters captured while matching the route.
#[derive(Debug, Clone, Default)]
pub struct RouteParams(pub Vec<(String, String)>);

pub trait RequestExt {
    fn param(&self, key: &str) -> Option<&str>;

    fn data<T: Send + Sync + 'static>(&self) -> Option<&T>;

    fn global(&self) -> Result<Arc<Global>> {
        self.data::<Arc<Global>>()
            .cloned()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("global state not set")))
    }
}

impl<B> RequestExt for Request<B> {
    fn param(&self, key: &str) -> Option<&str> {
        self.extensions()
            .get::<RouteParams>()?
            .0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn data<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions().get::<T>()
    }
}

#[derive(Default)]
struct MethodTable {
    handlers: Vec<(Method, Handler)>,
}

impl MethodTable {
    fn get(&self, method: &Method) -> Option<&Handler> {
        let lookup = |m: &Method| self.handlers.iter().find(|(k, _)| k == m).map(|(_, h)| h);

        // HEAD is served by the GET handler unless registered explicitly
        lookup(method).or_else(|| if *method == Method::HEAD { lookup(&Method::GET) } else { None })
    }

    fn allowed(&self) -> Vec<Method> {
        self.handlers.iter().map(|(m, _)| m.clone()).collect()
    }
}

pub struct Router {
    tree: path_tree::PathTree<usize>,
    tables: Vec<MethodTable>,
    data: Vec<DataProvider>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    pub async fn handle(&self, mut req: Request<Bytes>) -> Result<Response<Body>> {
        let path = req.uri().path().to_owned();

        let Some((idx, matched)) = self.tree.find(&path) else {
            return self.fallback(&req);
        };

        let table = &self.tables[*idx];
        let Some(handler) = table.get(req.method()) else {
            return Err(ApiError::MethodNotAllowed {
                method: req.method().clone(),
                allow: table.allowed(),
            });
        };

        let params = RouteParams(
            matched
                .params_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        );
        req.extensions_mut().insert(params);

        for provide in &self.data {
            provide(req.extensions_mut());
        }

        handler(req).await
    }

    /// Redirects safe requests missing a trailing slash to the slash-terminated route.
    fn fallback(&self, req: &Request<Bytes>) -> Result<Response<Body>> {
        let path = req.uri().path();
        let safe = matches!(*req.method(), Method::GET | Method::HEAD);

        if !safe || path.ends_with('/') {
            return Err(ApiError::NotFound);
        }

        let target = format!("{path}/");
        if self.tree.find(&target).is_none() {
            return Err(ApiError::NotFound);
        }

        let location = match req.uri().query() {
            Some(query) => format!("{target}?{query}"),
            None => target,
        };

        tracing::debug!(from = path, to = %location, "appending trailing slash");

        Response::builder()
            .status(StatusCode::MOVED_PERMANENTLY)
            .header(header::LOCATION, location)
            .body(Body::new(Bytes::new()))
            .map_err(|err| ApiError::Internal(err.into()))
    }
}

impl Debug for Router {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("routes", &self.tables.len()).finish()
    }
}

#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<(String, Method, Handler)>,
    data: Vec<DataProvider>,
}

impl RouterBuilder {
    /// Makes `data` available to every handler through [`RequestExt::data`].
    pub fn data<T: Clone + Send + Sync + 'static>(mut self, data: T) -> Self {
        self.data.push(Box::new(move |ext| {
            ext.insert(data.clone());
        }));
        self
    }

    pub fn get<F: Future<Output = Result<Response<Body>>> + Send + 'static>(
        self,
        path: &str,
        handler: impl Fn(Request<Bytes>) -> F + Send + Sync + 'static,
    ) -> Self {
        self.add_route(Method::GET, path, handler)
    }

    pub fn post<F: Future<Output = Result<Response<Body>>> + Send + 'static>(
        self,
        path: &str,
        handler: impl Fn(Request<Bytes>) -> F + Send + Sync + 'static,
    ) -> Self {
        self.add_route(Method::POST, path, handler)
    }

    pub fn patch<F: Future<Output = Result<Response<Body>>> + Send + 'static>(
        self,
        path: &str,
        handler: impl Fn(Request<Bytes>) -> F + Send + Sync + 'static,
    ) -> Self {
        self.add_route(Method::PATCH, path, handler)
    }

    pub fn delete<F: Future<Output = Result<Response<Body>>> + Send + 'static>(
        self,
        path: &str,
        handler: impl Fn(Request<Bytes>) -> F + Send + Sync + 'static,
    ) -> Self {
        self.add_route(Method::DELETE, path, handler)
    }

    pub fn add_route<F: Future<Output = Result<Response<Body>>> + Send + 'static>(
        mut self,
        method: Method,
        path: &str,
        handler: impl Fn(Request<Bytes>) -> F + Send + Sync + 'static,
    ) -> Self {
        let handler: Handler = Box::new(move |req| -> BoxFuture<Result<Response<Body>>> { Box::pin(handler(req)) });
        self.routes.push((path.to_owned(), method, handler));
        self
    }

    /// Mounts the routes of `router` under `prefix`. Data providers of `router` are dropped.
    pub fn scope(mut self, prefix: &str, router: RouterBuilder) -> Self {
        let prefix = prefix.trim_end_matches('/');
        for (path, method, handler) in router.routes {
            self.routes.push((format!("{prefix}{path}"), method, handler));
        }
        self
    }

    pub fn build(self) -> Router {
        let mut tree = path_tree::PathTree::new();
        let mut tables: Vec<MethodTable> = Vec::new();
        let mut by_path: HashMap<String, usize> = HashMap::new();

        for (path, method, handler) in self.routes {
            let idx = *by_path.entry(path.clone()).or_insert_with(|| {
                tables.push(MethodTable::default());
                let idx = tables.len() - 1;
                let _ = tree.insert(&path, idx);
                idx
            });

            tracing::debug!(%method, %path, "adding route");

            tables[idx].handlers.push((method, handler));
        }

        Router {
            tree,
            tables,
            data: self.data,
        }
    }
}
