use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::select;

use self::error::ApiError;
use self::router::Router;
use crate::global::Global;

macro_rules! make_response {
    ($status:expr, $body:expr) => {
        hyper::Response::builder()
            .status($status)
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .body($crate::api::Body::from($body.to_string()))
            .expect("failed to build response")
    };
}

pub(crate) use make_response;

pub mod error;
pub mod router;
mod serializer;
mod todos;
pub mod validation;

pub type Body = Full<Bytes>;

pub fn routes(global: &Arc<Global>) -> Router {
    Router::builder()
        .data(global.clone())
        .scope("/todos", todos::routes())
        .build()
}

/// Dispatches a request whose body has already been read, rendering any error.
pub async fn handle(router: &Router, req: Request<Bytes>) -> Response<Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let res = match router.handle(req).await {
        Ok(res) => res,
        Err(err) => error::error_handler(&method, &path, err),
    };

    tracing::debug!(%method, %path, status = res.status().as_u16(), "handled request");

    res
}

async fn serve(router: &Router, req: Request<Incoming>) -> Response<Body> {
    let (parts, body) = req.into_parts();

    match body.collect().await {
        Ok(body) => handle(router, Request::from_parts(parts, body.to_bytes())).await,
        Err(err) => error::error_handler(&parts.method, parts.uri.path(), ApiError::ReadBody(err)),
    }
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn run(global: Arc<Global>, listener: TcpListener, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
    tracing::info!("Listening on {}", listener.local_addr()?);

    let router = Arc::new(routes(&global));
    let service = service_fn(move |req| {
        let router = router.clone();
        async move { Ok::<_, Infallible>(serve(&router, req).await) }
    });

    tokio::pin!(shutdown);

    loop {
        select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                return Ok(());
            },
            r = listener.accept() => {
                let (socket, addr) = r?;
                let service = service.clone();

                tracing::debug!("Accepted connection from {}", addr);

                tokio::spawn(async move {
                    if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(socket), service).await {
                        tracing::debug!(error = %err, "connection closed with error");
                    }
                });
            },
        }
    }
}
