use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use notify_debouncer_full::{
    new_debouncer, DebouncedEvent,
    notify::{Error as NotifyError, RecursiveMode, Watcher},
};
use tracing::{debug, error, info};

use crate::content_loader::{is_temp_file, reload_content};
use crate::error::Result;
use crate::state::{AppState, RefreshBroadcaster};

const DEBOUNCE: Duration = Duration::from_millis(200);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(tx): State<RefreshBroadcaster>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, tx))
}

async fn handle_socket(socket: WebSocket, tx: RefreshBroadcaster) {
    let mut rx = tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    tokio::select! {
        signal = rx.recv() => {
            if signal.is_ok() && sender.send(Message::Text("reload".into())).await.is_err() {
                debug!("Client disconnected before reload message could be sent");
            }
        }
        // Drain client frames until it goes away so the task doesn't linger.
        _ = async { while let Some(Ok(_)) = receiver.next().await {} } => {
            debug!("Hot-reload client closed the socket");
        }
    }
}

/// Whether a batch of debounced events should trigger a reload.
fn is_relevant(events: &[DebouncedEvent]) -> bool {
    events.iter().any(|event| {
        let is_relevant_kind = event.kind.is_modify()
            || event.kind.is_create()
            || event.kind.is_remove();

        is_relevant_kind && !event.event.paths.iter().any(|path| is_temp_file(path))
    })
}

pub fn start_content_watcher(tx: RefreshBroadcaster, app_state: Arc<AppState>) -> Result<()> {
    let content_dir = app_state.config.content_dir.clone();
    info!(dir = %content_dir.display(), "Starting content watcher for hot-reload...");

    let (watcher_tx, mut watcher_rx) = tokio::sync::mpsc::channel(1);

    let on_events = move |res: std::result::Result<Vec<DebouncedEvent>, Vec<NotifyError>>| {
        match res {
            Ok(events) if is_relevant(&events) => {
                let paths: Vec<_> = events
                    .iter()
                    .flat_map(|e| &e.event.paths)
                    .map(|p| p.display())
                    .collect();
                debug!("Relevant file change detected: {:?}", paths);
                // A full channel already has a reload queued.
                if let Err(e) = watcher_tx.try_send(()) {
                    debug!("Reload already pending: {}", e);
                }
            }
            Ok(_) => {}
            Err(errors) => {
                for e in errors {
                    error!("Watcher error: {}", e);
                }
            }
        }
    };
    let mut debouncer = new_debouncer(DEBOUNCE, None, on_events)?;

    debouncer
        .watcher()
        .watch(Path::new(&content_dir), RecursiveMode::Recursive)?;

    tokio::spawn(async move {
        // Keep the debouncer alive for as long as the task runs.
        let _debouncer = debouncer;

        while watcher_rx.recv().await.is_some() {
            info!("Content change detected, reloading content and sending signal...");

            reload_content(&app_state).await;

            // Send reload signal to all connected WebSocket clients
            if let Err(e) = tx.send(()) {
                debug!("No hot-reload clients to notify: {}", e);
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, time::Instant};

    use notify_debouncer_full::notify::{
        event::{AccessKind, CreateKind, ModifyKind},
        Event, EventKind,
    };

    use super::*;

    fn event(kind: EventKind, path: &str) -> DebouncedEvent {
        DebouncedEvent {
            event: Event::new(kind).add_path(PathBuf::from(path)),
            time: Instant::now(),
        }
    }

    #[test]
    fn content_edits_are_relevant() {
        let events = vec![event(EventKind::Modify(ModifyKind::Any), "content/posts/a.md")];
        assert!(is_relevant(&events));
        let events = vec![event(EventKind::Create(CreateKind::File), "content/pages/b.md")];
        assert!(is_relevant(&events));
    }

    #[test]
    fn access_and_editor_temp_files_are_ignored() {
        let events = vec![
            event(EventKind::Access(AccessKind::Any), "content/posts/a.md"),
            event(EventKind::Modify(ModifyKind::Any), "content/posts/.#a.md"),
            event(EventKind::Create(CreateKind::File), "content/posts/a.md~"),
        ];
        assert!(!is_relevant(&events));
    }
}
