//! Server listener and connection handling
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use super::Server;
use crate::connection::Connection;
use crate::error::ServerError;

/// Start TCP listener for X11 connections
///
/// Binds `port_base + display` and serves each client on its own thread.
/// Returns only if the listener itself fails.
pub fn serve(server: Arc<Server>) -> Result<(), ServerError> {
    let addr = server.config().bind_address()?;
    let listener = TcpListener::bind(&addr)?;
    log::info!("Listening on {}", addr);
    accept_loop(listener, server)
}

/// Accept connections from an already bound listener
pub fn accept_loop(listener: TcpListener, server: Arc<Server>) -> Result<(), ServerError> {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let server = Arc::clone(&server);
                thread::Builder::new()
                    .name("x11-client".to_string())
                    .spawn(move || {
                        if let Err(e) = handle_client(stream, server) {
                            log::error!("Client error: {}", e);
                        }
                    })?;
            }
            Err(e) => {
                log::error!("Connection failed: {}", e);
            }
        }
    }

    Ok(())
}

fn handle_client(stream: TcpStream, server: Arc<Server>) -> Result<(), ServerError> {
    log::info!("New client connection from {:?}", stream.peer_addr());
    stream.set_nodelay(true)?;
    Connection::accept(stream, server)?.run()
}
