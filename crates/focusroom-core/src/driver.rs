//! Async driver for [`TimerEngine`].
//!
//! Owns the engine behind a mutex and runs at most one 1 Hz ticker task.
//! Commands and ticks are serialized through the mutex, so a completion is
//! fully applied before anything else observes the engine. Events are
//! published on a broadcast channel before the lock is released, so each
//! command's events reach subscribers contiguously and in engine order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::TransitionError;
use crate::events::Event;
use crate::notify::NotificationDispatcher;
use crate::timer::{SessionType, Technique, TimerEngine, TimerState};

/// One tick per second; missed ticks are dropped, not replayed.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct TimerController {
    engine: Arc<Mutex<TimerEngine>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    events: broadcast::Sender<Event>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl TimerController {
    pub fn new(engine: TimerEngine, dispatcher: NotificationDispatcher) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            ticker: Arc::new(Mutex::new(None)),
            events,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> TimerState {
        self.engine.lock().await.snapshot()
    }

    pub async fn toggle_running(&self) -> Result<TimerState, TransitionError> {
        let mut engine = self.engine.lock().await;
        let event = engine.toggle_running()?;
        if engine.is_running() {
            self.spawn_ticker().await;
        } else {
            self.cancel_ticker().await;
        }
        publish(&self.events, &self.dispatcher, vec![event]);
        Ok(engine.snapshot())
    }

    /// Start the countdown unless it is already running.
    pub async fn start(&self) -> Result<TimerState, TransitionError> {
        let mut engine = self.engine.lock().await;
        if let Some(event) = engine.start()? {
            self.spawn_ticker().await;
            publish(&self.events, &self.dispatcher, vec![event]);
        }
        Ok(engine.snapshot())
    }

    /// Pause the countdown unless it is already paused.
    pub async fn pause(&self) -> TimerState {
        let mut engine = self.engine.lock().await;
        if let Some(event) = engine.pause() {
            self.cancel_ticker().await;
            publish(&self.events, &self.dispatcher, vec![event]);
        }
        engine.snapshot()
    }

    pub async fn reset(&self) -> TimerState {
        self.apply(|engine| engine.reset()).await
    }

    pub async fn switch_session_type(&self, session_type: SessionType) -> TimerState {
        self.apply(|engine| engine.switch_session_type(session_type))
            .await
    }

    pub async fn switch_technique(&self, technique: Technique) -> TimerState {
        self.apply(|engine| engine.switch_technique(technique)).await
    }

    pub async fn resolve_flow_choice(
        &self,
        continue_in_flow: bool,
    ) -> Result<TimerState, TransitionError> {
        let mut engine = self.engine.lock().await;
        let event = engine.resolve_flow_choice(continue_in_flow)?;
        publish(&self.events, &self.dispatcher, vec![event]);
        Ok(engine.snapshot())
    }

    /// Stop ticking without touching the engine. Used on shutdown.
    pub async fn shutdown(&self) {
        self.cancel_ticker().await;
    }

    /// Run a command that always pauses the clock.
    async fn apply<F>(&self, command: F) -> TimerState
    where
        F: FnOnce(&mut TimerEngine) -> Vec<Event>,
    {
        let mut engine = self.engine.lock().await;
        let events = command(&mut engine);
        self.cancel_ticker().await;
        publish(&self.events, &self.dispatcher, events);
        engine.snapshot()
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let engine = self.engine.clone();
        let events = self.events.clone();
        let dispatcher = self.dispatcher.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;

                let mut guard = engine.lock().await;
                let produced = match guard.tick() {
                    Ok(produced) => produced,
                    // Paused between the timer firing and taking the lock.
                    Err(TransitionError::NotRunning) => break,
                    Err(e) => {
                        warn!(error = %e, "unexpected tick rejection");
                        break;
                    }
                };

                let finished = !produced.is_empty();
                publish(&events, &dispatcher, produced);
                drop(guard);
                if finished {
                    debug!("countdown finished, ticker exiting");
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

fn publish(
    events: &broadcast::Sender<Event>,
    dispatcher: &NotificationDispatcher,
    produced: Vec<Event>,
) {
    for event in produced {
        if let Some(completed) = event.as_completion() {
            dispatcher.dispatch(completed);
        }
        // No subscribers is fine; hosts may only poll snapshots.
        let _ = events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SessionCompleted;
    use crate::error::NotifyError;
    use crate::notify::Notifier;
    use crate::timer::Catalog;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    impl Notifier for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn notify(&self, _: &SessionCompleted) -> Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn controller(technique: Technique) -> (TimerController, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = NotificationDispatcher::new();
        dispatcher.register(Box::new(Counting(count.clone())));
        let engine = TimerEngine::with_technique(Catalog::builtin(), technique);
        (TimerController::new(engine, dispatcher), count)
    }

    async fn next_matching<F>(rx: &mut broadcast::Receiver<Event>, pred: F) -> Event
    where
        F: Fn(&Event) -> bool,
    {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_down_once_per_second() {
        let (controller, _) = controller(Technique::Classic);
        controller.toggle_running().await.unwrap();

        time::sleep(Duration::from_millis(10_500)).await;
        let state = controller.snapshot().await;
        assert_eq!(state.remaining_seconds, 25 * 60 - 10);
        assert!(state.running);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_the_ticker() {
        let (controller, _) = controller(Technique::Classic);
        controller.toggle_running().await.unwrap();
        time::sleep(Duration::from_millis(3_500)).await;
        controller.toggle_running().await.unwrap();

        time::sleep(Duration::from_secs(60)).await;
        let state = controller.snapshot().await;
        assert_eq!(state.remaining_seconds, 25 * 60 - 3);
        assert!(!state.running);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_notifies_and_loads_break() {
        let (controller, count) = controller(Technique::Classic);
        let mut rx = controller.subscribe();
        controller.toggle_running().await.unwrap();

        let event = next_matching(&mut rx, |e| e.as_completion().is_some()).await;
        assert_eq!(event.as_completion().unwrap().session_type, SessionType::Work);
        let advanced = rx.recv().await.unwrap();
        assert!(matches!(advanced, Event::SessionAdvanced { to: SessionType::ShortBreak, .. }));

        let state = controller.snapshot().await;
        assert_eq!(state.total_sessions, 1);
        assert_eq!(state.streak, 1);
        assert_eq!(state.session_type, SessionType::ShortBreak);
        assert_eq!(state.remaining_seconds, 300);
        assert!(!state.running);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flow_wait_holds_until_answered() {
        let (controller, _) = controller(Technique::Flow);
        let mut rx = controller.subscribe();
        controller.toggle_running().await.unwrap();

        next_matching(&mut rx, |e| matches!(e, Event::FlowDecisionRequested { .. })).await;
        time::sleep(Duration::from_secs(3600)).await;

        let state = controller.snapshot().await;
        assert!(state.awaiting_flow_decision);
        assert_eq!(state.remaining_seconds, 0);
        assert_eq!(
            controller.toggle_running().await,
            Err(TransitionError::AwaitingFlowDecision)
        );

        let state = controller.resolve_flow_choice(true).await.unwrap();
        assert_eq!(state.session_type, SessionType::Work);
        assert_eq!(state.flow_skipped_breaks, 1);
        assert_eq!(state.remaining_seconds, 25 * 60);
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_pause_do_not_flip_state() {
        let (controller, _) = controller(Technique::Classic);
        let mut rx = controller.subscribe();

        assert!(!controller.pause().await.running);
        assert!(controller.start().await.unwrap().running);
        assert!(controller.start().await.unwrap().running);
        time::sleep(Duration::from_millis(2_500)).await;
        assert!(!controller.pause().await.running);
        assert!(!controller.pause().await.running);

        assert!(matches!(rx.try_recv(), Ok(Event::TimerStarted { .. })));
        assert!(matches!(rx.try_recv(), Ok(Event::TimerPaused { .. })));
        assert!(rx.try_recv().is_err());
        assert_eq!(controller.snapshot().await.remaining_seconds, 25 * 60 - 2);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_after_completion_keeps_break_paused() {
        let (controller, _) = controller(Technique::Classic);
        let mut rx = controller.subscribe();
        controller.start().await.unwrap();
        next_matching(&mut rx, |e| matches!(e, Event::SessionAdvanced { .. })).await;

        let state = controller.pause().await;
        assert!(!state.running);
        assert_eq!(state.session_type, SessionType::ShortBreak);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(controller.snapshot().await.remaining_seconds, 300);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn completion_events_are_not_interleaved_with_commands() {
        let mut engine = TimerEngine::new(Catalog::builtin());
        engine.set_remaining_secs(1);
        let controller = TimerController::new(engine, NotificationDispatcher::new());
        let mut rx = controller.subscribe();
        controller.start().await.unwrap();

        // Keep trying to start the next session while the ticker completes.
        let racer = controller.clone();
        let hammer = tokio::spawn(async move {
            loop {
                let state = racer.start().await.unwrap();
                if state.session_type == SessionType::ShortBreak && state.running {
                    break;
                }
                tokio::task::yield_now().await;
            }
        });

        next_matching(&mut rx, |e| e.as_completion().is_some()).await;
        let next = rx.recv().await.unwrap();
        assert!(matches!(next, Event::SessionAdvanced { to: SessionType::ShortBreak, .. }));
        let started = rx.recv().await.unwrap();
        assert!(matches!(
            started,
            Event::TimerStarted { session_type: SessionType::ShortBreak, .. }
        ));

        hammer.await.unwrap();
        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn technique_switch_cancels_running_countdown() {
        let (controller, _) = controller(Technique::Classic);
        controller.toggle_running().await.unwrap();
        time::sleep(Duration::from_millis(5_500)).await;

        let state = controller.switch_technique(Technique::FiftyTwoSeventeen).await;
        assert!(!state.running);
        assert_eq!(state.remaining_seconds, 52 * 60);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(controller.snapshot().await.remaining_seconds, 52 * 60);
    }
}
