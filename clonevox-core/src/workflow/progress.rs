//! The playback progress poller, the one recurring background task in the
//! system.

use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::media::gateway::MediaGateway;
use crate::workflow::events::{EventSender, WorkflowEvent};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Poller-to-actor notification, so the actor can mark the session as no
/// longer playing without polling its own task.
#[derive(Debug)]
pub enum PlaybackNote {
    Finished,
}

/// Poll the gateway at a fixed cadence and publish the playback fraction.
///
/// Exits on its own when the fraction reaches 1.0; in every other case the
/// actor owns the returned handle and must abort it exactly once when the
/// session is paused, superseded, or shut down.
pub fn spawn_poller(
    gateway: Rc<dyn MediaGateway>,
    events: EventSender,
    notify: mpsc::UnboundedSender<PlaybackNote>,
) -> JoinHandle<()> {
    tokio::task::spawn_local(async move {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let duration = gateway.duration_ms();
            let fraction = if duration == 0 {
                0.0
            } else {
                (gateway.position_ms() as f32 / duration as f32).clamp(0.0, 1.0)
            };

            events.send(WorkflowEvent::PlaybackProgress { fraction });

            if fraction >= 1.0 {
                events.send(WorkflowEvent::PlaybackFinished);
                let _ = notify.send(PlaybackNote::Finished);
                break;
            }
        }
    })
}
