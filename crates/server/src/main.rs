//! Okey server binary.
//!
//! Runs the HTTP server hosting live okey rooms over WebSocket.

#[tokio::main]
async fn main() {
    okey_core::log();
    okey_core::halt_on_interrupt();
    okey_server::run().await.unwrap();
}
