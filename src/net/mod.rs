//! Network layer subsystem.
//!
//! TLS is optional; when cert/key paths are configured the HTTP server is
//! served through axum-server's rustls acceptor instead of plain TCP.

pub mod tls;
