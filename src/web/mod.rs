pub mod http;
pub mod pages;
pub mod routes;

use anyhow::Result;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

pub use routes::AppState;

use http::{ReadError, Response};

pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("listening on http://{}", listener.local_addr()?);

    loop {
        let (socket, addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, addr, &state).await {
                debug!(%addr, "connection error: {e}");
            }
        });
    }
}

async fn handle_connection(mut socket: TcpStream, addr: SocketAddr, state: &AppState) -> std::io::Result<()> {
    let resp = match http::read_request(&mut socket).await {
        Ok(req) => {
            let resp = routes::handle(&req, state).await;
            info!(%addr, method = %req.method, path = %req.path, status = resp.status, "request");
            resp
        }
        Err(ReadError::Closed) => return Ok(()),
        Err(ReadError::Io(e)) => {
            debug!(%addr, "read failed: {e}");
            return Ok(());
        }
        Err(ReadError::TooLarge) => {
            warn!(%addr, "request too large");
            Response::html(413, pages::error(413, "request too large"))
        }
        Err(ReadError::Malformed) => Response::html(400, pages::error(400, "bad request")),
    };

    socket.write_all(&resp.to_bytes()).await?;
    socket.shutdown().await
}
