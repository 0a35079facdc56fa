//! Watch-together chat server with leader-driven playback sync.
//!
//! Clients join rooms over WebSocket, exchange chat messages and follow the
//! room leader's video playback.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin server
//! cargo run --bin server -- --host 0.0.0.0 --port 3000 --grace-secs 10
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kotatsu::{
    common::{logger::setup_logger, time::SystemClock},
    domain::{MessagePusher, RoomCoordinator, RoomStore},
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomStore},
    ui::{AppState, Server},
    usecase::{
        DisconnectUseCase, JoinRoomUseCase, PlaybackSyncUseCase, SendMessageUseCase, TypingUseCase,
        UpdateStatusUseCase,
    },
};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Watch-together chat server with playback sync", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Grace window in seconds before a disconnect becomes a departure
    #[arg(long, default_value = "5")]
    grace_secs: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Coordinator, store, pusher, clock
    // 2. UseCases
    // 3. AppState
    // 4. Server

    let coordinator = Arc::new(RoomCoordinator::new());
    let store: Arc<dyn RoomStore> = Arc::new(InMemoryRoomStore::new());
    let pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
    let clock = Arc::new(SystemClock);

    let join_room_usecase = Arc::new(JoinRoomUseCase::new(
        coordinator.clone(),
        store.clone(),
        pusher.clone(),
        clock.clone(),
    ));
    let disconnect_usecase = Arc::new(DisconnectUseCase::new(
        coordinator.clone(),
        store.clone(),
        pusher.clone(),
        clock.clone(),
        Duration::from_secs(args.grace_secs),
    ));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        coordinator.clone(),
        store.clone(),
        pusher.clone(),
    ));
    let update_status_usecase = Arc::new(UpdateStatusUseCase::new(
        coordinator.clone(),
        pusher.clone(),
    ));
    let typing_usecase = Arc::new(TypingUseCase::new(coordinator.clone(), pusher.clone()));
    let playback_usecase = Arc::new(PlaybackSyncUseCase::new(
        coordinator.clone(),
        pusher.clone(),
    ));

    let state = Arc::new(AppState {
        join_room_usecase,
        disconnect_usecase,
        send_message_usecase,
        update_status_usecase,
        typing_usecase,
        playback_usecase,
        coordinator,
        store,
        pusher,
    });

    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
