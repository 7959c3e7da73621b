//! Drives a [`BoardState`] from user input, store responses, peer messages
//! and animation timers, executing the reducer's effects as they come out.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use sweep_core::animation::AnimationTarget;
use sweep_core::animation::Cue;
use sweep_core::animation::Particle;
use sweep_core::protocol::ChannelMessage;
use sweep_core::reduce;
use sweep_core::scheduler::TimerQueue;
use sweep_core::BoardAction;
use sweep_core::BoardEffect;
use sweep_core::BoardState;
use sweep_core::PreferenceStore;
use sweep_core::RemoteAction;
use sweep_core::UserAction;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::channel::ChannelHandle;
use crate::remote;
use crate::remote::RemoteStore;

const CHANNEL_CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Rendering side effects the front end plays out; never fed back in.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    Cue(Cue),
    Shake {
        target: AnimationTarget,
        duration: Duration,
    },
    Burst {
        target: AnimationTarget,
        particles: Vec<Particle>,
    },
}

pub struct Controller {
    state: BoardState,
    store: Arc<dyn RemoteStore>,
    channel: ChannelHandle,
    preferences: PreferenceStore,
    timers: TimerQueue,
    started: Instant,
    rng: StdRng,
    actions_rx: mpsc::UnboundedReceiver<BoardAction>,
    results_tx: mpsc::UnboundedSender<RemoteAction>,
    results_rx: mpsc::UnboundedReceiver<RemoteAction>,
    inbound_rx: mpsc::UnboundedReceiver<ChannelMessage>,
    snapshot: watch::Sender<BoardState>,
    presentation: mpsc::UnboundedSender<Presentation>,
}

#[derive(Clone)]
pub struct ControllerHandle {
    actions: mpsc::UnboundedSender<BoardAction>,
    state: watch::Receiver<BoardState>,
}

impl ControllerHandle {
    pub fn dispatch(&self, action: UserAction) -> bool {
        self.send(BoardAction::User(action))
    }

    pub fn send(&self, action: BoardAction) -> bool {
        self.actions.send(action).is_ok()
    }

    pub fn state(&self) -> BoardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state.clone()
    }
}

impl Controller {
    pub fn new(
        state: BoardState,
        store: Arc<dyn RemoteStore>,
        channel: ChannelHandle,
        inbound_rx: mpsc::UnboundedReceiver<ChannelMessage>,
        preferences: PreferenceStore,
    ) -> (Self, ControllerHandle, mpsc::UnboundedReceiver<Presentation>) {
        let (actions, actions_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (presentation, presentation_rx) = mpsc::unbounded_channel();
        let (snapshot, state_rx) = watch::channel(state.clone());
        let controller = Self {
            state,
            store,
            channel,
            preferences,
            timers: TimerQueue::new(),
            started: Instant::now(),
            rng: StdRng::from_entropy(),
            actions_rx,
            results_tx,
            results_rx,
            inbound_rx,
            snapshot,
            presentation,
        };
        let handle = ControllerHandle {
            actions,
            state: state_rx,
        };
        (controller, handle, presentation_rx)
    }

    /// Runs until every [`ControllerHandle`] has been dropped.
    pub async fn run(mut self) {
        let mut status = self.channel.subscribe();
        let mut status_live = true;
        let initial = *status.borrow_and_update();
        self.dispatch(BoardAction::Remote(RemoteAction::ChannelChanged(initial)));
        self.dispatch(BoardAction::User(UserAction::Refresh));

        loop {
            let deadline = self
                .timers
                .next_deadline()
                .map(|offset| self.started + offset);
            tokio::select! {
                action = self.actions_rx.recv() => match action {
                    Some(action) => self.dispatch(action),
                    None => break,
                },
                Some(result) = self.results_rx.recv() => {
                    self.dispatch(BoardAction::Remote(result));
                }
                Some(message) = self.inbound_rx.recv() => {
                    self.dispatch(BoardAction::Inbound(message));
                }
                changed = status.changed(), if status_live => match changed {
                    Ok(()) => {
                        let current = *status.borrow_and_update();
                        self.dispatch(BoardAction::Remote(RemoteAction::ChannelChanged(current)));
                    }
                    Err(_) => status_live = false,
                },
                () = sleep_until(deadline) => self.fire_due_timers(),
            }
        }
        self.channel.close(CHANNEL_CLOSE_GRACE).await;
        debug!("controller stopped");
    }

    fn fire_due_timers(&mut self) {
        let now = self.started.elapsed();
        while let Some((_, timer)) = self.timers.pop_due(now) {
            self.dispatch(BoardAction::Timer(timer));
        }
    }

    fn dispatch(&mut self, action: BoardAction) {
        for effect in reduce(&mut self.state, action) {
            self.apply(effect);
        }
        self.snapshot.send_replace(self.state.clone());
    }

    fn apply(&mut self, effect: BoardEffect) {
        match effect {
            BoardEffect::Remote(call) => {
                let store = Arc::clone(&self.store);
                let results = self.results_tx.clone();
                tokio::spawn(async move {
                    let outcome = remote::execute(store.as_ref(), call).await;
                    let _ = results.send(outcome);
                });
            }
            BoardEffect::Broadcast(message) => {
                self.channel.send(message);
            }
            BoardEffect::Schedule { delay, timer } => {
                self.timers.schedule(self.started.elapsed() + delay, timer);
            }
            BoardEffect::PlayCue(cue) => self.present(Presentation::Cue(cue)),
            BoardEffect::Shake { target, duration } => {
                self.present(Presentation::Shake { target, duration });
            }
            BoardEffect::Burst { target, spec } => {
                let particles = spec.scatter(&mut self.rng);
                self.present(Presentation::Burst { target, particles });
            }
            BoardEffect::SavePreferences => {
                if let Err(err) = self.state.preferences.save(&mut self.preferences) {
                    warn!(error = %err, "failed to save preferences");
                }
            }
            BoardEffect::RequestFrame => {}
        }
    }

    fn present(&self, presentation: Presentation) {
        let _ = self.presentation.send(presentation);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
