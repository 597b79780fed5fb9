//! Client frame loop: prediction for the local body, interpolation for the
//! remote one, handed to a render collaborator every frame

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::physics::{ArenaParams, Direction, Vec2};
use crate::net::broadcast::OutboundLine;
use crate::util::time::monotonic_secs;

use super::interpolation::RenderState;
use super::prediction::{Correction, LocalPredictor, ReconcileSettings};
use super::snapshot_buffer::SnapshotBuffer;

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub local_slot: usize,
    pub local_position: Vec2,
    pub remote: RenderState,
}

/// Render collaborator
pub trait FrameSink {
    fn present(&mut self, frame: &Frame);
}

/// Headless sink: logs the frame at most once per `interval` seconds
pub struct TracingSink {
    interval: f64,
    last_logged: Option<f64>,
}

impl TracingSink {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last_logged: None,
        }
    }
}

impl FrameSink for TracingSink {
    fn present(&mut self, frame: &Frame) {
        let now = monotonic_secs();
        if self.last_logged.is_some_and(|last| now - last < self.interval) {
            return;
        }
        self.last_logged = Some(now);
        info!(
            tick = frame.remote.tick,
            local_x = frame.local_position.x,
            local_y = frame.local_position.y,
            remote_x = frame.remote.remote_position.x,
            remote_y = frame.remote.remote_position.y,
            pickup_active = frame.remote.pickup.active,
            pickup_x = frame.remote.pickup.position.x,
            pickup_y = frame.remote.pickup.position.y,
            scores = ?frame.remote.scores,
            "Frame"
        );
    }
}

/// Parse a direction command: `w`/`a`/`s`/`d`/`x` or `<dx> <dy>`
pub fn parse_intent(line: &str) -> Option<Direction> {
    let line = line.trim();
    match line {
        "w" | "up" => return Some(Direction { dx: 0, dy: -1 }),
        "s" | "down" => return Some(Direction { dx: 0, dy: 1 }),
        "a" | "left" => return Some(Direction { dx: -1, dy: 0 }),
        "d" | "right" => return Some(Direction { dx: 1, dy: 0 }),
        "x" | "stop" => return Some(Direction::NONE),
        _ => {}
    }

    let mut tokens = line.split_ascii_whitespace();
    let dx = tokens.next()?.parse().ok()?;
    let dy = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Direction::new(dx, dy)
}

/// Main-thread side of the client. Owns the predictor and the outbound input path.
pub struct ClientRuntime<S: FrameSink> {
    slot: usize,
    buffer: Arc<SnapshotBuffer>,
    predictor: LocalPredictor,
    outbound: mpsc::Sender<OutboundLine>,
    sink: S,
    last_frame: Option<f64>,
}

impl<S: FrameSink> ClientRuntime<S> {
    pub fn new(
        slot: usize,
        buffer: Arc<SnapshotBuffer>,
        reconcile: ReconcileSettings,
        outbound: mpsc::Sender<OutboundLine>,
        sink: S,
    ) -> Self {
        Self {
            slot,
            buffer,
            predictor: LocalPredictor::new(ArenaParams::default(), reconcile),
            outbound,
            sink,
            last_frame: None,
        }
    }

    /// Produce and present the frame for local time `now`.
    ///
    /// Returns `None` until the first snapshot has arrived.
    pub fn frame(&mut self, now: f64) -> Option<Frame> {
        let elapsed = self.last_frame.map_or(0.0, |last| now - last);
        self.last_frame = Some(now);

        if let Some(latest) = self.buffer.latest() {
            if let Correction::Snapped { error } = self.predictor.observe(&latest, self.slot) {
                debug!(error, tick = latest.tick, "Prediction snapped to server");
            }
        }
        self.predictor.advance(elapsed as f32);

        let remote = self.buffer.compute_render_state(now, self.slot)?;
        let frame = Frame {
            local_slot: self.slot,
            local_position: self.predictor.state().position,
            remote,
        };
        self.sink.present(&frame);
        Some(frame)
    }

    /// Queue the INPUT for a key change, then apply it locally.
    ///
    /// If the INPUT cannot be queued the intent stays as it was, so the same
    /// key change is sent again next time it is reported.
    pub fn on_intent(&mut self, direction: Direction) -> bool {
        let Some(msg) = self.predictor.pending_input(direction) else {
            return false;
        };
        if let Err(e) = self.outbound.try_send(msg.encode().into()) {
            warn!(error = %e, "Failed to queue INPUT");
            return false;
        }
        self.predictor.commit_intent(direction);
        true
    }

    /// Run the frame loop until shutdown or until the server connection drops
    pub async fn run(
        mut self,
        mut intents: mpsc::Receiver<Direction>,
        frame_rate: u32,
        connected: Arc<AtomicBool>,
        running: Arc<AtomicBool>,
    ) {
        let mut ticker = interval(Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1))));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut intents_open = true;

        while running.load(Ordering::Acquire) {
            if !connected.load(Ordering::Acquire) {
                info!("Disconnected from server");
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.frame(monotonic_secs());
                }
                intent = intents.recv(), if intents_open => match intent {
                    Some(direction) => {
                        self.on_intent(direction);
                    }
                    None => {
                        // keep rendering with the last intent
                        info!("Input source closed");
                        intents_open = false;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::snapshot::{ParticipantSnapshot, WorldSnapshot};
    use crate::game::state::Pickup;

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<Frame>,
    }

    impl FrameSink for RecordingSink {
        fn present(&mut self, frame: &Frame) {
            self.frames.push(frame.clone());
        }
    }

    fn snapshot(tick: u64, own_x: f32, remote_x: f32) -> WorldSnapshot {
        WorldSnapshot {
            tick,
            server_time: tick as f64,
            participants: [
                ParticipantSnapshot {
                    position: Vec2::new(own_x, 300.0),
                    score: 0,
                },
                ParticipantSnapshot {
                    position: Vec2::new(remote_x, 300.0),
                    score: 0,
                },
            ],
            pickup: Pickup {
                position: Vec2::new(400.0, 100.0),
                active: true,
            },
        }
    }

    fn runtime(
        buffer: Arc<SnapshotBuffer>,
    ) -> (ClientRuntime<RecordingSink>, mpsc::Receiver<OutboundLine>) {
        let (tx, rx) = mpsc::channel(8);
        let rt = ClientRuntime::new(0, buffer, ReconcileSettings::default(), tx, RecordingSink::default());
        (rt, rx)
    }

    #[test]
    fn no_frame_before_first_snapshot() {
        let (mut rt, _rx) = runtime(Arc::new(SnapshotBuffer::new(0.1)));
        assert!(rt.frame(1.0).is_none());
        assert!(rt.sink.frames.is_empty());
    }

    #[test]
    fn local_is_predicted_and_remote_interpolated() {
        let buffer = Arc::new(SnapshotBuffer::new(0.1));
        buffer.on_snapshot_received(snapshot(0, 200.0, 100.0), 0.0);
        buffer.on_snapshot_received(snapshot(1, 200.0, 120.0), 0.1);
        let (mut rt, mut rx) = runtime(buffer.clone());

        rt.frame(0.1);
        assert!(rt.on_intent(Direction { dx: 1, dy: 0 }));
        assert_eq!(rx.try_recv().unwrap().as_ref(), "INPUT 1 1 0");

        let frame = rt.frame(0.15).unwrap();
        assert!((frame.local_position.x - 210.0).abs() < 1e-3);
        assert!((frame.remote.remote_position.x - 110.0).abs() < 1e-3);

        // later authoritative positions do not pull the local body back
        buffer.on_snapshot_received(snapshot(2, 200.0, 120.0), 0.2);
        let frame = rt.frame(0.2).unwrap();
        assert!((frame.local_position.x - 220.0).abs() < 1e-3);
        assert_eq!(rt.sink.frames.len(), 3);
    }

    #[test]
    fn repeated_intent_sends_nothing() {
        let (mut rt, mut rx) = runtime(Arc::new(SnapshotBuffer::new(0.1)));
        assert!(rt.on_intent(Direction { dx: 0, dy: 1 }));
        assert!(!rt.on_intent(Direction { dx: 0, dy: 1 }));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsent_intent_is_not_applied_and_can_be_retried() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut rt = ClientRuntime::new(
            0,
            Arc::new(SnapshotBuffer::new(0.1)),
            ReconcileSettings::default(),
            tx.clone(),
            RecordingSink::default(),
        );
        tx.try_send(OutboundLine::from("JOIN filler")).unwrap();

        assert!(!rt.on_intent(Direction { dx: 1, dy: 0 }));
        assert_eq!(rt.predictor.state().velocity, Vec2::ZERO);

        rx.try_recv().unwrap();
        assert!(rt.on_intent(Direction { dx: 1, dy: 0 }));
        assert_eq!(rx.try_recv().unwrap().as_ref(), "INPUT 1 1 0");
        assert_eq!(rt.predictor.state().velocity, Vec2::new(200.0, 0.0));
    }

    #[test]
    fn intent_commands() {
        assert_eq!(parse_intent("d"), Some(Direction { dx: 1, dy: 0 }));
        assert_eq!(parse_intent(" w \n"), Some(Direction { dx: 0, dy: -1 }));
        assert_eq!(parse_intent("-1 1"), Some(Direction { dx: -1, dy: 1 }));
        assert_eq!(parse_intent("stop"), Some(Direction::NONE));
        assert_eq!(parse_intent("2 0"), None);
        assert_eq!(parse_intent("jump"), None);
        assert_eq!(parse_intent("1 1 1"), None);
    }

    #[tokio::test]
    async fn run_outlives_intent_source_until_shutdown() {
        let (rt, mut rx) = runtime(Arc::new(SnapshotBuffer::new(0.1)));
        let (intent_tx, intent_rx) = mpsc::channel(1);
        let connected = Arc::new(AtomicBool::new(true));
        let running = Arc::new(AtomicBool::new(true));

        intent_tx.send(Direction { dx: -1, dy: 0 }).await.unwrap();
        drop(intent_tx);

        let flag = running.clone();
        let handle = tokio::spawn(rt.run(intent_rx, 120, connected, running));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        flag.store(false, Ordering::Release);
        handle.await.unwrap();
        assert_eq!(rx.recv().await.unwrap().as_ref(), "INPUT 1 -1 0");
    }

    #[tokio::test]
    async fn run_stops_when_disconnected() {
        let (rt, _rx) = runtime(Arc::new(SnapshotBuffer::new(0.1)));
        let (_intent_tx, intent_rx) = mpsc::channel(1);
        let connected = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        rt.run(intent_rx, 60, connected, running).await;
    }
}
