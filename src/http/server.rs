//! HTTP listener
//!
//! One task per connection, hyper http1 over `TokioIo`.

use std::future::Future;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use super::router::handle_request;
use crate::error::Result;
use crate::pks::PksHandler;

/// Accept and serve connections until `shutdown` resolves
///
/// Connections already accepted keep running on their own tasks.
pub async fn serve<F>(listener: TcpListener, handler: Arc<PksHandler>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tracing::info!("Key server listening on {}", listener.local_addr()?);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let handler = Arc::clone(&handler);
                            async move {
                                Ok::<_, std::convert::Infallible>(handle_request(handler, req).await)
                            }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::debug!("Error serving connection from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Error accepting connection: {}", e);
                }
            },
            () = &mut shutdown => {
                tracing::info!("Key server shutting down");
                return Ok(());
            }
        }
    }
}
