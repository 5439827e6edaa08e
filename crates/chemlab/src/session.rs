//! Reaction-session controller.
//!
//! Owns the flask, the heating loop, the debounced analysis scheduler and the
//! current analysis result. All state lives behind one mutex; timer and
//! request tasks hold only a `Weak` reference and re-check their token or
//! request id under the lock before touching anything. The lock is never held
//! across an await.
//!
//! Actions spawn Tokio tasks and must be called from within a runtime.

use crate::heating::HeatingLoop;
use crate::scheduler::{AnalysisScheduler, Settlement};
use chemlab_common::{
    classify, interpret, AnalysisClient, AnalysisError, AnalysisRequest, AnalysisResult,
    ConfigError, Flask, FlaskSnapshot, HeatOutcome, LabError, Reagent, ReagentCatalog, RequestId,
    RiskStyleBucket, SessionConfig,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Mixture color before any analysis has suggested one
pub const DEFAULT_MIX_COLOR: &str = "bg-white";

/// Everything the presentation layer needs, as one consistent snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub flask: FlaskSnapshot,
    pub analysis: Option<AnalysisResult>,
    pub is_analyzing: bool,
    pub risk: RiskStyleBucket,
    /// Absent while the flask is empty
    pub mix_color: Option<String>,
    pub fill_percent: u32,
    pub notice: Option<String>,
}

struct SessionState {
    flask: Flask,
    analysis: Option<AnalysisResult>,
    mix_color: String,
    notice: Option<String>,
    scheduler: AnalysisScheduler,
    heating: HeatingLoop,
    closed: bool,
}

struct Shared {
    id: Uuid,
    catalog: ReagentCatalog,
    client: Arc<dyn AnalysisClient>,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionView>,
}

/// One lab session. Dropping it tears everything down.
pub struct LabSession {
    shared: Arc<Shared>,
}

impl LabSession {
    /// Fails on a zero period or an inverted heat step range
    pub fn new(
        catalog: ReagentCatalog,
        client: Arc<dyn AnalysisClient>,
        config: &SessionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let id = Uuid::new_v4();
        let state = SessionState {
            flask: Flask::new(),
            analysis: None,
            mix_color: DEFAULT_MIX_COLOR.to_string(),
            notice: None,
            scheduler: AnalysisScheduler::new(config.debounce()),
            heating: HeatingLoop::new(config),
            closed: false,
        };
        let (updates, _) = watch::channel(build_view(id, &state));

        info!(
            "Session {} started (debounce {:?}, heat tick {:?})",
            id,
            config.debounce(),
            config.heat_tick()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                catalog,
                client,
                state: Mutex::new(state),
                updates,
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn catalog(&self) -> &ReagentCatalog {
        &self.shared.catalog
    }

    /// Add a catalog reagent by id
    pub fn add_reagent(&self, id: &str) -> Result<(), LabError> {
        let reagent = self.shared.catalog.get(id).cloned();
        self.shared.add(id, reagent)
    }

    /// Empty the flask, reset temperature, drop the result, cancel everything pending
    pub fn clear(&self) {
        self.shared.clear();
    }

    pub fn set_heating(&self, active: bool) {
        self.shared.set_heating(active);
    }

    /// Reset temperature to ambient and stop heating; reagents stay
    pub fn cool_down(&self) {
        self.shared.cool_down();
    }

    pub fn flask(&self) -> FlaskSnapshot {
        self.shared.lock().flask.snapshot()
    }

    pub fn analysis(&self) -> Option<AnalysisResult> {
        self.shared.lock().analysis.clone()
    }

    pub fn is_analyzing(&self) -> bool {
        self.shared.lock().scheduler.is_analyzing()
    }

    pub fn is_heating(&self) -> bool {
        self.shared.lock().flask.is_heating()
    }

    pub fn risk(&self) -> RiskStyleBucket {
        displayed_risk(&self.shared.lock())
    }

    pub fn notice(&self) -> Option<String> {
        self.shared.lock().notice.clone()
    }

    pub fn view(&self) -> SessionView {
        build_view(self.shared.id, &self.shared.lock())
    }

    /// Receive a fresh `SessionView` after every committed change
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.updates.subscribe()
    }

    /// Stop all timers and in-flight calls. Later actions are ignored.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}

impl Drop for LabSession {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(build_view(self.id, state));
    }

    fn add(self: &Arc<Self>, id: &str, reagent: Option<Reagent>) -> Result<(), LabError> {
        let mut state = self.lock();
        if state.closed {
            return Err(LabError::SessionClosed);
        }

        let result = match reagent {
            Some(reagent) => state.flask.add(reagent),
            None => Err(LabError::UnknownReagent(id.to_string())),
        };

        match &result {
            Ok(()) => {
                debug!("Added {} ({} in flask)", id, state.flask.len());
                state.notice = None;
                self.schedule_analysis(&mut state);
            }
            Err(e) => {
                info!("Rejected {}: {}", id, e);
                state.notice = Some(e.to_string());
            }
        }

        self.publish(&state);
        result
    }

    fn clear(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }

        state.heating.stop();
        state.scheduler.cancel();
        state.flask.clear();
        state.analysis = None;
        state.mix_color = DEFAULT_MIX_COLOR.to_string();
        state.notice = None;
        debug!("Flask cleared");

        self.publish(&state);
    }

    fn set_heating(self: &Arc<Self>, active: bool) {
        let mut state = self.lock();
        if state.closed || !state.flask.set_heating(active) {
            return;
        }

        if state.flask.is_heating() {
            let weak = Arc::downgrade(self);
            state
                .heating
                .start(|token, period| tokio::spawn(run_heating(weak, token, period)));
            debug!("Heating started at {}°C", state.flask.temperature());
        } else {
            state.heating.stop();
            debug!("Heating stopped at {}°C", state.flask.temperature());
        }

        self.schedule_analysis(&mut state);
        self.publish(&state);
    }

    fn cool_down(self: &Arc<Self>) {
        let mut state = self.lock();
        if state.closed {
            return;
        }

        let before = state.flask.snapshot();
        state.heating.stop();
        state.flask.cool_down();
        if state.flask.snapshot() == before {
            return;
        }

        debug!("Cooled from {}°C", before.temperature);
        self.schedule_analysis(&mut state);
        self.publish(&state);
    }

    /// One heating tick. Returns false when the tick task should exit.
    fn heat_tick(self: &Arc<Self>, token: u64) -> bool {
        let mut state = self.lock();
        if state.closed || !state.heating.is_current(token) {
            return false;
        }

        let increment = state.heating.next_increment();
        let keep_going = match state.flask.heat_tick(increment) {
            HeatOutcome::Raised { .. } => true,
            HeatOutcome::Capped => {
                info!("Flask reached {}°C, heating off", state.flask.temperature());
                false
            }
            HeatOutcome::Idle => {
                state.heating.finish(token);
                return false;
            }
        };

        if !keep_going {
            state.heating.finish(token);
        }

        self.schedule_analysis(&mut state);
        self.publish(&state);
        keep_going
    }

    /// Observe a committed change: (re)start the debounce timer
    fn schedule_analysis(self: &Arc<Self>, state: &mut SessionState) {
        let weak = Arc::downgrade(self);
        state.scheduler.arm(|token, window| {
            tokio::spawn(async move {
                tokio::time::sleep(window).await;
                if let Some(shared) = weak.upgrade() {
                    shared.fire(token);
                }
            })
        });
    }

    /// Debounce window elapsed with no newer change
    fn fire(self: &Arc<Self>, token: u64) {
        let mut state = self.lock();
        if state.closed || !state.scheduler.take_if_current(token) {
            return;
        }

        if state.flask.is_empty() {
            debug!("Debounce fired on empty flask, no analysis");
            state.analysis = None;
            self.publish(&state);
            return;
        }

        let id = state.scheduler.issue();
        let request = AnalysisRequest::from_snapshot(id, &state.flask.snapshot());
        info!(
            "Analysis {} issued: [{}] at {}°C",
            id,
            request.reagent_ids().join(", "),
            request.temperature
        );

        let client = Arc::clone(&self.client);
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let outcome = client.analyze(&request).await.and_then(interpret);
            if let Some(shared) = weak.upgrade() {
                shared.settle(request.id, outcome);
            }
        });
        state.scheduler.track(handle);

        self.publish(&state);
    }

    fn settle(&self, id: RequestId, outcome: Result<AnalysisResult, AnalysisError>) {
        let mut state = self.lock();
        if state.closed {
            return;
        }

        if state.scheduler.settle(id) == Settlement::Stale {
            debug!(
                "Discarding stale analysis {} (latest {})",
                id,
                state.scheduler.latest_request_id()
            );
            return;
        }

        match outcome {
            Ok(result) => {
                info!(
                    "Analysis {} applied: risk {} ({} warnings)",
                    id,
                    result.risk_score,
                    result.warnings.len()
                );
                if let Some(color) = &result.new_color {
                    state.mix_color = color.clone();
                }
                state.analysis = Some(result);
            }
            Err(e) => {
                // Keep the last good result; the next change retries
                warn!("Analysis {} failed: {}", id, e);
            }
        }

        self.publish(&state);
    }

    fn shutdown(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.heating.stop();
        state.scheduler.shutdown();
        info!("Session {} shut down", self.id);
    }
}

async fn run_heating(weak: Weak<Shared>, token: u64, period: Duration) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;
        let Some(shared) = weak.upgrade() else {
            break;
        };
        if !shared.heat_tick(token) {
            break;
        }
    }
}

/// Authoritative score only when nothing newer is on its way
fn displayed_risk(state: &SessionState) -> RiskStyleBucket {
    let shown = if state.scheduler.is_pending() {
        None
    } else {
        state.analysis.as_ref()
    };
    classify(state.flask.reagents(), state.flask.temperature(), shown)
}

fn build_view(id: Uuid, state: &SessionState) -> SessionView {
    let flask = state.flask.snapshot();
    let mix_color = if flask.is_empty() {
        None
    } else {
        Some(state.mix_color.clone())
    };

    SessionView {
        session_id: id,
        fill_percent: flask.fill_percent(),
        risk: displayed_risk(state),
        analysis: state.analysis.clone(),
        is_analyzing: state.scheduler.is_analyzing(),
        mix_color,
        notice: state.notice.clone(),
        flask,
    }
}
