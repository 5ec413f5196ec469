//! Feed runner that pushes websocket frames through the dispatcher.
//!
//! The runner:
//! - Receives `WsMessage` from the transport session
//! - Hands every text frame, in arrival order, to the `Dispatcher`
//! - Logs frame-scoped failures and keeps going

use crate::{ConnectionControl, Dispatcher, WsMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Log WebSocket connection lifecycle events.
///
/// Returns `true` if the message was a connection event (caller should continue to next message).
/// Returns `false` if the message is data that should be processed.
pub fn handle_connection_event(msg: &WsMessage) -> bool {
    match msg {
        WsMessage::Connected => {
            info!("Feed session connected");
            true
        }
        WsMessage::Disconnected => {
            warn!("Feed session disconnected, waiting for heartbeat timeout");
            true
        }
        WsMessage::Error(e) => {
            error!("Feed session error: {}", e);
            true
        }
        WsMessage::Text(_) => false,
    }
}

/// Run the Bitfinex feed processor until the transport side is dropped.
pub async fn run_bitfinex<C: ConnectionControl>(
    mut rx: mpsc::Receiver<WsMessage>,
    dispatcher: Dispatcher<C>,
) {
    debug!("Starting Bitfinex feed runner");

    while let Some(msg) = rx.recv().await {
        if handle_connection_event(&msg) {
            continue;
        }

        if let WsMessage::Text(text) = msg {
            if let Err(e) = dispatcher.dispatch(&text) {
                if e.is_frame_scoped() {
                    warn!("Skipping frame: {}", e);
                } else {
                    error!("Frame handling failed: {}", e);
                }
            }
        }
    }

    debug!("Bitfinex feed runner stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Deliver;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CountingControl {
        heartbeats: Arc<Mutex<usize>>,
    }

    impl ConnectionControl for CountingControl {
        fn heartbeat(&self) {
            *self.heartbeats.lock().unwrap() += 1;
        }
        fn reconnect(&self) {}
        fn pause(&self) {}
        fn unpause(&self) {}
    }

    #[test]
    fn test_handle_connection_event() {
        assert!(handle_connection_event(&WsMessage::Connected));
        assert!(handle_connection_event(&WsMessage::Disconnected));
        assert!(handle_connection_event(&WsMessage::Error("x".into())));
        assert!(!handle_connection_event(&WsMessage::Text("[]".into())));
    }

    #[tokio::test]
    async fn test_runner_dispatches_in_order_and_survives_bad_frames() {
        let control = CountingControl::default();
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        let deliver: Deliver = Arc::new(move |tag: &str, _text: &str| {
            sink.lock().unwrap().push(tag.to_string());
        });
        let dispatcher = Dispatcher::new(control.clone(), deliver);

        let (tx, rx) = mpsc::channel(16);
        for msg in [
            WsMessage::Connected,
            WsMessage::Text(r#"{"event":"info","version":2}"#.into()),
            WsMessage::Text(r#"[0,"bu",[10,9]]"#.into()),
            WsMessage::Text("{broken".into()),
            WsMessage::Text(r#"{"event":"info","code":99999}"#.into()),
            WsMessage::Text(r#"[0,"hb"]"#.into()),
            WsMessage::Text(r#"[0,"wu",["exchange","USD",1.5,0,null]]"#.into()),
            WsMessage::Disconnected,
        ] {
            tx.send(msg).await.unwrap();
        }
        drop(tx);

        run_bitfinex(rx, dispatcher).await;

        assert_eq!(*delivered.lock().unwrap(), vec!["bu".to_string(), "wu".to_string()]);
        assert_eq!(*control.heartbeats.lock().unwrap(), 1);
    }
}
