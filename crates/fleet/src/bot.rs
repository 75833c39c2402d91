//! One account's lifecycle: login → GC attach → serve → recover.
//!
//! All mutable bot state lives in a single driver task; the [`Bot`]
//! handle talks to it over a command channel and reads a few shared
//! atomics for cheap readiness checks. Session pushes, caller commands,
//! and every timer (login retry, GC reattach, play toggle, request TTL,
//! post-reply cooldown, scheduled refresh, health) are multiplexed
//! through one `select!` loop, so handlers run to completion and events
//! are processed in arrival order.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wearcheck_protocol::{CSGO_APP_ID, InspectLink, ItemInfo, RawItemInfo};
use wearcheck_proxy_select::ProxySelector;
use wearcheck_session::{LogOnDetails, SessionClient, SessionError, SessionEvent};

use crate::config::{
    FleetSettings, GC_INACTIVITY_MAX, GC_PLAY_TOGGLE_DELAY, HEALTH_CHECK_PERIOD, REFRESH_BUSY_RETRY,
    REFRESH_JITTER, REFRESH_PERIOD, backoff_delay,
};
use crate::error::InspectError;
use crate::types::{AccountCredentials, BotEvent, BotState, BotStatus, TotpFn};

/// Cancellable one-shot timer slot.
type Timer = Pin<Box<tokio::time::Sleep>>;

fn arm(duration: Duration) -> Timer {
    Box::pin(tokio::time::sleep(duration))
}

/// Awaits an armed timer slot; an empty slot never fires.
async fn armed(slot: &mut Option<Timer>) {
    match slot.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending::<()>().await,
    }
}

fn jittered_refresh_period() -> Duration {
    let jitter_ms = rand::thread_rng().gen_range(0..REFRESH_JITTER.as_millis() as u64);
    REFRESH_PERIOD + Duration::from_millis(jitter_ms)
}

/// Flags the controller reads without messaging the driver. Only the
/// driver task writes them (the `busy` reservation CAS in
/// [`Bot::send_inspect`] being the one admission-control exception).
struct BotShared {
    index: usize,
    username: String,
    ready: AtomicBool,
    busy: AtomicBool,
    login_attempt: AtomicU32,
    gc_attempt: AtomicU32,
}

enum Command {
    Login,
    Inspect {
        link: InspectLink,
        reply: oneshot::Sender<Result<ItemInfo, InspectError>>,
    },
}

/// Handle to one bot. The controller owns it; dropping it without
/// [`destroy`](Self::destroy) stops the driver on its next wakeup.
pub struct Bot {
    shared: Arc<BotShared>,
    cmd_tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Bot {
    /// Spawns the driver task for one account.
    pub fn spawn(
        index: usize,
        credentials: AccountCredentials,
        mut session: Box<dyn SessionClient>,
        selector: Arc<ProxySelector>,
        settings: Arc<FleetSettings>,
        totp: TotpFn,
        events_tx: mpsc::Sender<BotEvent>,
    ) -> Self {
        let shared = Arc::new(BotShared {
            index,
            username: credentials.username.clone(),
            ready: AtomicBool::new(false),
            busy: AtomicBool::new(false),
            login_attempt: AtomicU32::new(0),
            gc_attempt: AtomicU32::new(0),
        });

        let session_events = session.take_events().unwrap_or_else(|| {
            warn!(bot = %credentials.username, "session events already taken, bot will be deaf");
            mpsc::channel(1).1
        });

        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let driver = Driver {
            settings,
            credentials,
            totp,
            session,
            session_events,
            selector,
            shared: shared.clone(),
            events_tx,
            cmd_rx,
            cancel: cancel.clone(),
            state: BotState::Init,
            logged_on: false,
            relogin: false,
            announced_ready: false,
            login_reported: false,
            login_attempt: 0,
            gc_attempt: 0,
            last_gc_activity: Instant::now(),
            pending: None,
            retry_timer: None,
            gc_timer: None,
            gc_play_timer: None,
            ttl_timer: None,
            cooldown_timer: None,
            refresh_timer: arm(jittered_refresh_period()),
            health: tokio::time::interval(HEALTH_CHECK_PERIOD),
        };

        let task = tokio::spawn(driver.run());

        Self {
            shared,
            cmd_tx,
            cancel,
            task: std::sync::Mutex::new(Some(task)),
        }
    }

    pub fn index(&self) -> usize {
        self.shared.index
    }

    pub fn username(&self) -> &str {
        &self.shared.username
    }

    /// Starts (or restarts) the login sequence.
    pub async fn login(&self) {
        let _ = self.cmd_tx.send(Command::Login).await;
    }

    /// Logged on with a GC session attached.
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Relaxed)
    }

    /// Serving a request or inside the post-reply cooldown.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> BotStatus {
        BotStatus {
            username: self.shared.username.clone(),
            ready: self.is_ready(),
            busy: self.is_busy(),
            login_attempt: self.shared.login_attempt.load(Ordering::Relaxed),
            gc_attempt: self.shared.gc_attempt.load(Ordering::Relaxed),
        }
    }

    /// Sends one inspect query and awaits the normalized reply.
    ///
    /// Fails fast with [`InspectError::NotReady`] when the bot is not
    /// ready or already reserved; the reservation itself is a CAS on the
    /// busy flag, so racing dispatchers cannot seat two requests.
    pub async fn send_inspect(&self, link: InspectLink) -> Result<ItemInfo, InspectError> {
        if !self.is_ready() {
            return Err(InspectError::NotReady);
        }
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(InspectError::NotReady);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(Command::Inspect {
                link,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            self.shared.busy.store(false, Ordering::SeqCst);
            return Err(InspectError::NotReady);
        }

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(InspectError::Destroyed),
        }
    }

    /// Stops the driver, releasing every timer and logging the session
    /// off. Idempotent.
    pub async fn destroy(&self) {
        self.cancel.cancel();
        let task = self.task.lock().ok().and_then(|mut slot| slot.take());
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    #[cfg(test)]
    pub(crate) fn stub(index: usize, username: &str, ready: bool, busy: bool) -> Self {
        let shared = Arc::new(BotShared {
            index,
            username: username.to_string(),
            ready: AtomicBool::new(ready),
            busy: AtomicBool::new(busy),
            login_attempt: AtomicU32::new(0),
            gc_attempt: AtomicU32::new(0),
        });
        // Receiver dropped on purpose: command sends fail fast.
        let (cmd_tx, _) = mpsc::channel(1);
        Self {
            shared,
            cmd_tx,
            cancel: CancellationToken::new(),
            task: std::sync::Mutex::new(None),
        }
    }
}

/// The request currently owned by a bot. Present exactly while the bot
/// is busy: from dispatch until TTL expiry, teardown, or the end of the
/// post-reply cooldown (the reply slot is consumed at delivery, the
/// record stays for the cooldown).
struct PendingRequest {
    link: InspectLink,
    issued_at: Instant,
    reply: Option<oneshot::Sender<Result<ItemInfo, InspectError>>>,
}

enum Wake {
    Command(Option<Command>),
    Session(Option<SessionEvent>),
    RetryLogin,
    GcReconnect,
    GcPlay,
    Ttl,
    CooldownOver,
    Refresh,
    Health,
}

struct Driver {
    settings: Arc<FleetSettings>,
    credentials: AccountCredentials,
    totp: TotpFn,
    session: Box<dyn SessionClient>,
    session_events: mpsc::Receiver<SessionEvent>,
    selector: Arc<ProxySelector>,
    shared: Arc<BotShared>,
    events_tx: mpsc::Sender<BotEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,

    state: BotState,
    logged_on: bool,
    /// Scheduled-refresh relog in progress; skips the ownership
    /// bootstrap on the next logon.
    relogin: bool,
    announced_ready: bool,
    login_reported: bool,
    login_attempt: u32,
    gc_attempt: u32,
    last_gc_activity: Instant,
    pending: Option<PendingRequest>,

    retry_timer: Option<Timer>,
    gc_timer: Option<Timer>,
    gc_play_timer: Option<Timer>,
    ttl_timer: Option<Timer>,
    cooldown_timer: Option<Timer>,
    refresh_timer: Timer,
    health: tokio::time::Interval,
}

impl Driver {
    async fn run(mut self) {
        // Consume the interval's immediate first tick.
        self.health.tick().await;

        loop {
            let wake = tokio::select! {
                _ = self.cancel.cancelled() => break,
                cmd = self.cmd_rx.recv() => Wake::Command(cmd),
                ev = self.session_events.recv() => Wake::Session(ev),
                _ = armed(&mut self.retry_timer) => Wake::RetryLogin,
                _ = armed(&mut self.gc_timer) => Wake::GcReconnect,
                _ = armed(&mut self.gc_play_timer) => Wake::GcPlay,
                _ = armed(&mut self.ttl_timer) => Wake::Ttl,
                _ = armed(&mut self.cooldown_timer) => Wake::CooldownOver,
                _ = self.refresh_timer.as_mut() => Wake::Refresh,
                _ = self.health.tick() => Wake::Health,
            };

            match wake {
                Wake::Command(None) => break,
                Wake::Command(Some(Command::Login)) => self.begin_login().await,
                Wake::Command(Some(Command::Inspect { link, reply })) => {
                    self.handle_inspect(link, reply).await;
                }
                Wake::Session(None) => {
                    warn!(bot = %self.shared.username, "session event stream closed");
                    break;
                }
                Wake::Session(Some(event)) => self.handle_session_event(event).await,
                Wake::RetryLogin => {
                    self.retry_timer = None;
                    self.begin_login().await;
                }
                Wake::GcReconnect => self.on_gc_reconnect_due().await,
                Wake::GcPlay => self.on_gc_play_due().await,
                Wake::Ttl => self.on_ttl_expired().await,
                Wake::CooldownOver => self.on_cooldown_over(),
                Wake::Refresh => self.on_refresh_due().await,
                Wake::Health => self.on_health_tick().await,
            }
        }

        self.teardown().await;
    }

    async fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Error(err) => self.on_session_error(err).await,
            SessionEvent::Disconnected { eresult, msg } => {
                info!(
                    bot = %self.shared.username,
                    eresult,
                    msg = msg.as_deref().unwrap_or(""),
                    "steam session disconnected"
                );
                self.logged_on = false;
                self.set_ready(false).await;
                if self.state != BotState::Dead {
                    // The session stack auto-reconnects; the health
                    // monitor recovers if it never does.
                    self.state = BotState::Init;
                }
            }
            SessionEvent::LoggedOn(outcome) => {
                debug!(bot = %self.shared.username, steam_id = ?outcome.steam_id, "logged on");
                self.on_logged_on().await;
            }
            SessionEvent::OwnershipCached => self.on_ownership_cached().await,
            SessionEvent::ConnectedToGc => self.on_gc_connected().await,
            SessionEvent::DisconnectedFromGc { reason } => {
                warn!(bot = %self.shared.username, reason = %reason, "GC session lost");
                self.on_gc_lost().await;
            }
            SessionEvent::ConnectionStatus(status) => {
                debug!(bot = %self.shared.username, status = ?status, "connection status");
            }
            SessionEvent::InspectItemInfo(raw) => self.on_item_info(raw).await,
        }
    }

    // ---- login ----------------------------------------------------------

    async fn begin_login(&mut self) {
        if self.state == BotState::Dead {
            return;
        }

        self.retry_timer = None;
        self.gc_timer = None;
        self.gc_play_timer = None;
        self.set_ready(false).await;
        self.state = BotState::LoggingIn;

        // Idempotent: tear down any in-flight session first.
        if self.logged_on {
            self.session.log_off().await;
            self.logged_on = false;
        }

        let binding = self
            .selector
            .pick_for_bot(self.shared.index, &self.shared.username)
            .await;
        match &binding {
            Some(b) => info!(bot = %self.shared.username, proxy = %b.name, "egress bound"),
            None => debug!(bot = %self.shared.username, "no proxy available, connecting direct"),
        }
        self.session.set_proxy(binding);

        let (auth_code, two_factor_code) = self.credentials.guard_codes(&self.totp);
        let details = LogOnDetails {
            account_name: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
            remember_password: true,
            auth_code,
            two_factor_code,
        };

        info!(
            bot = %self.shared.username,
            attempt = self.login_attempt,
            "logging on"
        );
        let result = self.session.log_on(details).await;
        self.report_login_attempted().await;

        if let Err(err) = result {
            self.on_login_error(err).await;
        }
    }

    async fn on_session_error(&mut self, err: SessionError) {
        if self.state == BotState::Dead {
            return;
        }
        if self.state == BotState::LoggingIn {
            self.on_login_error(err).await;
            return;
        }
        // Post-logon fatal error: the connection is gone. Leave recovery
        // to the stack's auto-reconnect or the health monitor.
        warn!(bot = %self.shared.username, error = %err, "session error");
        self.logged_on = false;
        self.set_ready(false).await;
        self.state = BotState::Init;
    }

    async fn on_login_error(&mut self, err: SessionError) {
        let retryable = self.settings.login_classifier.is_retryable(&err);

        if retryable && self.login_attempt < self.settings.max_login_retries {
            self.login_attempt += 1;
            self.shared
                .login_attempt
                .store(self.login_attempt, Ordering::Relaxed);
            let delay = backoff_delay(self.settings.login_retry_delay(), self.login_attempt);
            warn!(
                bot = %self.shared.username,
                error = %err,
                attempt = self.login_attempt,
                delay_ms = delay.as_millis() as u64,
                "logon failed, retry scheduled"
            );
            self.retry_timer = Some(arm(delay));
            return;
        }

        error!(bot = %self.shared.username, error = %err, "logon failed permanently");
        self.set_ready(false).await;
        self.state = BotState::Dead;
        self.fail_pending(InspectError::Destroyed);
        self.retry_timer = None;
        self.gc_timer = None;
        self.gc_play_timer = None;
        let _ = self
            .events_tx
            .send(BotEvent::LoginFailed {
                bot: self.shared.index,
                error: err,
            })
            .await;
    }

    async fn on_logged_on(&mut self) {
        self.logged_on = true;
        self.login_attempt = 0;
        self.shared.login_attempt.store(0, Ordering::Relaxed);
        self.retry_timer = None;
        info!(bot = %self.shared.username, "steam session established");

        if self.relogin {
            // Scheduled relog: ownership is already cached upstream, go
            // straight to the play toggle.
            self.state = BotState::GcConnecting;
            if let Err(e) = self.session.set_played_games(&[], true).await {
                warn!(bot = %self.shared.username, error = %e, "failed to clear played games");
            }
            self.gc_play_timer = Some(arm(GC_PLAY_TOGGLE_DELAY));
            self.relogin = false;
            return;
        }

        self.state = BotState::LoggedOn;
        if let Err(e) = self.session.set_played_games(&[], true).await {
            warn!(bot = %self.shared.username, error = %e, "failed to clear played games");
        }
        // GC attach continues once ownership is cached.
    }

    async fn on_ownership_cached(&mut self) {
        if self.state != BotState::LoggedOn {
            return;
        }

        if !self.session.owns_app(CSGO_APP_ID).await {
            info!(bot = %self.shared.username, "account lacks the game, requesting free license");
            if let Err(e) = self.session.request_free_license(&[CSGO_APP_ID]).await {
                // No GC attach without a license; the health monitor
                // retries on its next cycle.
                warn!(bot = %self.shared.username, error = %e, "free license grant failed");
                return;
            }
        }

        self.state = BotState::GcConnecting;
        if let Err(e) = self.session.set_played_games(&[CSGO_APP_ID], true).await {
            warn!(bot = %self.shared.username, error = %e, "failed to play the game");
        }
    }

    async fn report_login_attempted(&mut self) {
        if self.login_reported {
            return;
        }
        self.login_reported = true;
        let _ = self
            .events_tx
            .send(BotEvent::LoginAttempted {
                bot: self.shared.index,
            })
            .await;
    }

    // ---- GC session -----------------------------------------------------

    async fn on_gc_connected(&mut self) {
        self.gc_attempt = 0;
        self.shared.gc_attempt.store(0, Ordering::Relaxed);
        self.gc_timer = None;
        self.gc_play_timer = None;
        self.last_gc_activity = Instant::now();
        self.state = BotState::Ready;
        info!(bot = %self.shared.username, "GC session attached");
        self.set_ready(true).await;
    }

    async fn on_gc_lost(&mut self) {
        if self.state == BotState::Dead {
            return;
        }
        self.set_ready(false).await;
        self.state = BotState::GcLost;
        self.schedule_gc_reconnect().await;
    }

    async fn schedule_gc_reconnect(&mut self) {
        if self.gc_timer.is_some() || self.gc_play_timer.is_some() {
            return;
        }
        if self.gc_attempt >= self.settings.max_gc_reconnect_attempts {
            warn!(bot = %self.shared.username, "GC reattach attempts exhausted");
            let _ = self
                .events_tx
                .send(BotEvent::GcReconnectFailed {
                    bot: self.shared.index,
                })
                .await;
            return;
        }

        self.gc_attempt += 1;
        self.shared.gc_attempt.store(self.gc_attempt, Ordering::Relaxed);
        let delay = backoff_delay(self.settings.gc_reconnect_delay(), self.gc_attempt);
        info!(
            bot = %self.shared.username,
            attempt = self.gc_attempt,
            delay_ms = delay.as_millis() as u64,
            "GC reattach scheduled"
        );
        self.gc_timer = Some(arm(delay));
    }

    async fn on_gc_reconnect_due(&mut self) {
        self.gc_timer = None;
        if self.state == BotState::Dead || !self.logged_on {
            return;
        }
        // Toggle played games to force a fresh GC handshake.
        self.state = BotState::GcConnecting;
        if let Err(e) = self.session.set_played_games(&[], true).await {
            warn!(bot = %self.shared.username, error = %e, "failed to clear played games");
        }
        self.gc_play_timer = Some(arm(GC_PLAY_TOGGLE_DELAY));
    }

    async fn on_gc_play_due(&mut self) {
        self.gc_play_timer = None;
        if self.state == BotState::Dead || !self.logged_on {
            return;
        }
        if let Err(e) = self.session.set_played_games(&[CSGO_APP_ID], true).await {
            warn!(bot = %self.shared.username, error = %e, "failed to play the game");
        }
    }

    // ---- inspect requests ----------------------------------------------

    async fn handle_inspect(
        &mut self,
        link: InspectLink,
        reply: oneshot::Sender<Result<ItemInfo, InspectError>>,
    ) {
        // The handle reserved the busy flag before queueing the command.
        if self.state != BotState::Ready {
            self.shared.busy.store(false, Ordering::SeqCst);
            let _ = reply.send(Err(InspectError::NotReady));
            return;
        }

        debug!(bot = %self.shared.username, asset = %link.a(), "inspect dispatched");
        let owner = link.owner_id().to_string();
        let result = self
            .session
            .inspect_item(&owner, link.a(), link.d())
            .await;

        match result {
            Ok(()) => {
                self.pending = Some(PendingRequest {
                    link,
                    issued_at: Instant::now(),
                    reply: Some(reply),
                });
                self.ttl_timer = Some(arm(self.settings.request_ttl()));
            }
            Err(e) => {
                warn!(bot = %self.shared.username, error = %e, "inspect RPC failed");
                self.shared.busy.store(false, Ordering::SeqCst);
                let _ = reply.send(Err(InspectError::Session(e)));
            }
        }
    }

    async fn on_item_info(&mut self, raw: RawItemInfo) {
        let Some(pending) = self.pending.as_mut() else {
            debug!(bot = %self.shared.username, item = raw.itemid, "unsolicited item info");
            return;
        };
        // Stale or cross-talk replies never touch bot state.
        if pending.reply.is_none() || raw.itemid.to_string() != pending.link.a() {
            debug!(
                bot = %self.shared.username,
                item = raw.itemid,
                expected = %pending.link.a(),
                "ignoring mismatched item info"
            );
            return;
        }

        self.ttl_timer = None;
        self.last_gc_activity = Instant::now();

        let elapsed = pending.issued_at.elapsed();
        let delay = self.settings.request_delay().saturating_sub(elapsed);
        let info = ItemInfo::from_raw(raw, &pending.link, delay.as_millis() as u64);

        if let Some(tx) = pending.reply.take() {
            let _ = tx.send(Ok(info));
        }

        if delay.is_zero() {
            self.on_cooldown_over();
        } else {
            // Stay busy through the cooldown; the pending record is kept
            // so busy and pending clear together.
            self.cooldown_timer = Some(arm(delay));
        }
    }

    async fn on_ttl_expired(&mut self) {
        self.ttl_timer = None;
        let Some(mut pending) = self.pending.take() else {
            return;
        };
        warn!(
            bot = %self.shared.username,
            asset = %pending.link.a(),
            "no GC reply within TTL"
        );
        if let Some(tx) = pending.reply.take() {
            let _ = tx.send(Err(InspectError::TtlExceeded));
        }
        self.shared.busy.store(false, Ordering::SeqCst);
    }

    fn on_cooldown_over(&mut self) {
        self.cooldown_timer = None;
        self.pending = None;
        self.shared.busy.store(false, Ordering::SeqCst);
    }

    // ---- periodic maintenance ------------------------------------------

    async fn on_refresh_due(&mut self) {
        self.refresh_timer = arm(jittered_refresh_period());

        // Only a held GC session is worth refreshing.
        if self.state != BotState::Ready {
            return;
        }
        if self.shared.busy.load(Ordering::SeqCst) {
            // Don't yank the session out from under an in-flight
            // inspect; try again shortly.
            self.refresh_timer = arm(REFRESH_BUSY_RETRY);
            return;
        }

        info!(bot = %self.shared.username, "scheduled session refresh");
        self.relogin = true;
        self.set_ready(false).await;
        self.state = BotState::LoggingIn;
        self.logged_on = false;
        if let Err(e) = self.session.relog().await {
            self.on_login_error(e).await;
        }
    }

    async fn on_health_tick(&mut self) {
        if self.state == BotState::Dead {
            return;
        }

        if !self.logged_on {
            if self.state != BotState::LoggingIn {
                info!(bot = %self.shared.username, "health: not logged on, starting login");
                self.begin_login().await;
            }
            return;
        }

        if self.state == BotState::Ready && self.last_gc_activity.elapsed() > GC_INACTIVITY_MAX {
            warn!(bot = %self.shared.username, "health: GC silent too long, reattaching");
            self.set_ready(false).await;
            self.state = BotState::GcLost;
            self.schedule_gc_reconnect().await;
            return;
        }

        if self.state != BotState::Ready
            && self.state != BotState::LoggingIn
            && self.gc_timer.is_none()
            && self.gc_play_timer.is_none()
        {
            info!(bot = %self.shared.username, "health: logged on but no GC session, reattaching");
            self.schedule_gc_reconnect().await;
        }
    }

    // ---- shared helpers -------------------------------------------------

    async fn set_ready(&mut self, ready: bool) {
        self.shared.ready.store(ready, Ordering::Relaxed);
        if ready == self.announced_ready {
            return;
        }
        self.announced_ready = ready;
        let event = if ready {
            BotEvent::Ready {
                bot: self.shared.index,
            }
        } else {
            BotEvent::Unready {
                bot: self.shared.index,
            }
        };
        let _ = self.events_tx.send(event).await;
    }

    fn fail_pending(&mut self, error: InspectError) {
        if let Some(mut pending) = self.pending.take()
            && let Some(tx) = pending.reply.take()
        {
            let _ = tx.send(Err(error));
        }
        self.shared.busy.store(false, Ordering::SeqCst);
    }

    async fn teardown(&mut self) {
        self.fail_pending(InspectError::Destroyed);
        self.set_ready(false).await;
        self.session.log_off().await;
        debug!(bot = %self.shared.username, "bot driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_period_stays_within_jitter_window() {
        for _ in 0..100 {
            let period = jittered_refresh_period();
            assert!(period >= REFRESH_PERIOD);
            assert!(period < REFRESH_PERIOD + REFRESH_JITTER);
        }
    }

    #[tokio::test]
    async fn send_inspect_fails_fast_when_not_ready() {
        let bot = Bot::stub(0, "acc00", false, false);
        let link = InspectLink::from_parts(Some("1"), None, "2", "3").unwrap();
        assert_eq!(bot.send_inspect(link).await, Err(InspectError::NotReady));
        assert!(!bot.is_busy());
    }

    #[tokio::test]
    async fn send_inspect_fails_fast_when_reserved() {
        let bot = Bot::stub(0, "acc00", true, true);
        let link = InspectLink::from_parts(Some("1"), None, "2", "3").unwrap();
        assert_eq!(bot.send_inspect(link).await, Err(InspectError::NotReady));
        // The reservation belongs to the earlier request.
        assert!(bot.is_busy());
    }

    #[tokio::test]
    async fn send_inspect_releases_reservation_when_driver_gone() {
        // Stub has no driver task; the command channel is closed.
        let bot = Bot::stub(0, "acc00", true, false);
        let link = InspectLink::from_parts(Some("1"), None, "2", "3").unwrap();
        assert_eq!(bot.send_inspect(link).await, Err(InspectError::NotReady));
        assert!(!bot.is_busy());
    }

    #[test]
    fn status_snapshot_reflects_flags() {
        let bot = Bot::stub(2, "acc02", true, false);
        let status = bot.status();
        assert_eq!(status.username, "acc02");
        assert!(status.ready);
        assert!(!status.busy);
        assert_eq!(status.login_attempt, 0);
        assert_eq!(status.gc_attempt, 0);
    }
}
