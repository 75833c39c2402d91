//! The pool that owns the bots.
//!
//! Distributes inbound inspect requests across free ready bots, folds
//! per-bot readiness into one edge-triggered service signal, and gates
//! startup on the first usable bot (or every bot having tried).

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wearcheck_protocol::{InspectLink, ItemInfo};
use wearcheck_proxy_select::ProxySelector;
use wearcheck_session::SessionClient;

use crate::bot::Bot;
use crate::config::{FleetSettings, STARTUP_TIMEOUT};
use crate::error::InspectError;
use crate::types::{AccountCredentials, BotEvent, BotStatus, ControllerEvent, TotpFn};

/// Edge detector over "any bot is ready". Emits exactly one event per
/// transition, however many per-bot updates arrive in between.
#[derive(Debug, Default)]
struct ReadyLatch {
    ready: bool,
}

impl ReadyLatch {
    fn observe(&mut self, any_ready: bool) -> Option<ControllerEvent> {
        if any_ready == self.ready {
            return None;
        }
        self.ready = any_ready;
        Some(if any_ready {
            ControllerEvent::Ready
        } else {
            ControllerEvent::Unready
        })
    }
}

/// Owner and dispatcher of the bot pool.
pub struct BotController {
    settings: Arc<FleetSettings>,
    selector: Arc<ProxySelector>,
    totp: TotpFn,
    bots: Arc<RwLock<Vec<Arc<Bot>>>>,
    bot_events_tx: mpsc::Sender<BotEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<ControllerEvent>>>,
    init_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
    event_loop: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BotController {
    /// Creates an empty pool. `totp` derives two-factor codes for
    /// accounts configured with a TOTP seed.
    pub fn new(settings: FleetSettings, totp: TotpFn) -> Self {
        let selector = Arc::new(settings.build_selector());
        let settings = Arc::new(settings);
        let bots: Arc<RwLock<Vec<Arc<Bot>>>> = Arc::new(RwLock::new(Vec::new()));

        let (bot_events_tx, bot_events_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(64);
        let (init_tx, init_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        let event_loop = tokio::spawn(event_loop(
            bot_events_rx,
            bots.clone(),
            events_tx,
            init_tx,
            cancel.clone(),
        ));

        Self {
            settings,
            selector,
            totp,
            bots,
            bot_events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            init_rx,
            cancel,
            event_loop: std::sync::Mutex::new(Some(event_loop)),
        }
    }

    /// Takes the controller event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<ControllerEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Adds one account to the pool and kicks off its login. Login
    /// initiation problems surface as events, never as errors here.
    pub async fn add_bot(&self, credentials: AccountCredentials, session: Box<dyn SessionClient>) {
        let bot = {
            let Ok(mut bots) = self.bots.write() else {
                warn!("bot list poisoned, dropping account");
                return;
            };
            let index = bots.len();
            info!(bot = %credentials.username, index, "adding bot");
            let bot = Arc::new(Bot::spawn(
                index,
                credentials,
                session,
                self.selector.clone(),
                self.settings.clone(),
                self.totp.clone(),
                self.bot_events_tx.clone(),
            ));
            bots.push(bot.clone());
            bot
        };
        bot.login().await;
    }

    /// Resolves when startup is complete: at least one bot is ready,
    /// every bot has attempted login, or the timeout elapsed. Never
    /// fails.
    pub async fn wait_for_initialization(&self) {
        self.wait_for_initialization_within(STARTUP_TIMEOUT).await;
    }

    pub async fn wait_for_initialization_within(&self, timeout: Duration) {
        let mut init_rx = self.init_rx.clone();
        let _ = tokio::time::timeout(timeout, async move {
            while !*init_rx.borrow_and_update() {
                if init_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;
    }

    /// Serves one inspect query through a free ready bot, fail-fast when
    /// none is available.
    pub async fn lookup_inspect(&self, link: InspectLink) -> Result<ItemInfo, InspectError> {
        let order = {
            let Ok(bots) = self.bots.read() else {
                return Err(InspectError::NoBotsAvailable);
            };
            dispatch_order(&bots, &mut rand::thread_rng())
        };

        for bot in order {
            if !bot.is_ready() || bot.is_busy() {
                continue;
            }
            match bot.send_inspect(link.clone()).await {
                // Lost the reservation race; keep scanning.
                Err(InspectError::NotReady) => continue,
                outcome => return outcome,
            }
        }

        debug!(asset = %link.a(), "no free ready bot for inspect");
        Err(InspectError::NoBotsAvailable)
    }

    /// Number of ready bots (busy or not).
    pub fn ready_count(&self) -> usize {
        self.bots
            .read()
            .map(|bots| bots.iter().filter(|b| b.is_ready()).count())
            .unwrap_or(0)
    }

    /// Per-bot snapshots, in index order.
    pub fn status(&self) -> Vec<BotStatus> {
        self.bots
            .read()
            .map(|bots| bots.iter().map(|b| b.status()).collect())
            .unwrap_or_default()
    }

    /// Tears down every bot and the event loop.
    pub async fn destroy(&self) {
        self.cancel.cancel();

        let bots: Vec<Arc<Bot>> = self
            .bots
            .write()
            .map(|mut bots| bots.drain(..).collect())
            .unwrap_or_default();
        for bot in bots {
            bot.destroy().await;
        }

        let task = self.event_loop.lock().ok().and_then(|mut slot| slot.take());
        if let Some(task) = task {
            let _ = task.await;
        }
        info!("bot controller destroyed");
    }
}

/// Fisher–Yates shuffled copy of the pool. Shuffling prevents
/// head-of-line pinning and spreads load across accounts.
fn dispatch_order(bots: &[Arc<Bot>], rng: &mut impl rand::Rng) -> Vec<Arc<Bot>> {
    let mut order = bots.to_vec();
    order.shuffle(rng);
    order
}

/// Folds per-bot events into pool state and service-level events.
async fn event_loop(
    mut bot_events: mpsc::Receiver<BotEvent>,
    bots: Arc<RwLock<Vec<Arc<Bot>>>>,
    events_tx: mpsc::Sender<ControllerEvent>,
    init_tx: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    let mut ready: HashSet<usize> = HashSet::new();
    let mut attempted: HashSet<usize> = HashSet::new();
    let mut latch = ReadyLatch::default();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            ev = bot_events.recv() => match ev {
                Some(ev) => ev,
                None => break,
            },
        };

        match event {
            BotEvent::Ready { bot } => {
                ready.insert(bot);
            }
            BotEvent::Unready { bot } => {
                ready.remove(&bot);
            }
            BotEvent::LoginAttempted { bot } => {
                attempted.insert(bot);
            }
            BotEvent::LoginFailed { bot, error } => {
                attempted.insert(bot);
                emit(&events_tx, ControllerEvent::LoginFailed {
                    bot,
                    username: username_of(&bots, bot),
                    error,
                });
            }
            BotEvent::GcReconnectFailed { bot } => {
                emit(&events_tx, ControllerEvent::GcReconnectFailed {
                    bot,
                    username: username_of(&bots, bot),
                });
            }
        }

        if let Some(edge) = latch.observe(!ready.is_empty()) {
            info!(
                ready_bots = ready.len(),
                up = matches!(edge, ControllerEvent::Ready),
                "service readiness changed"
            );
            emit(&events_tx, edge);
        }

        let total = bots.read().map(|b| b.len()).unwrap_or(0);
        let complete = !ready.is_empty() || (total > 0 && attempted.len() >= total);
        if complete && !*init_tx.borrow() {
            let _ = init_tx.send(true);
            emit(&events_tx, ControllerEvent::InitializationComplete);
        }
    }
}

/// Best-effort delivery: a subscriber that stops draining must not
/// stall readiness tracking.
fn emit(events_tx: &mpsc::Sender<ControllerEvent>, event: ControllerEvent) {
    if events_tx.try_send(event).is_err() {
        warn!("controller event dropped (subscriber not draining)");
    }
}

fn username_of(bots: &RwLock<Vec<Arc<Bot>>>, index: usize) -> String {
    bots.read()
        .ok()
        .and_then(|bots| bots.get(index).map(|b| b.username().to_string()))
        .unwrap_or_default()
}
