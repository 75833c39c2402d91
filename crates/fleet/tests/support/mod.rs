//! Scripted in-memory session for driving bots without a Steam stack.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use wearcheck_fleet::{AccountCredentials, FleetSettings, TotpFn};
use wearcheck_protocol::{CSGO_APP_ID, InspectLink, ProxyBinding, RawItemInfo, RawSticker};
use wearcheck_session::{
    LogOnDetails, LogOnOutcome, SessionClient, SessionError, SessionEvent,
};

#[derive(Default)]
pub struct FakeState {
    /// Outcome of each `log_on` call, front first. Empty means success.
    pub logon_script: VecDeque<Result<(), SessionError>>,
    /// Whether the account owns the game.
    pub owns_game: bool,
    /// Emit `ConnectedToGc` whenever the game lands in the played list.
    pub auto_gc: bool,
    pub license_result: Option<SessionError>,

    pub logon_calls: Vec<(Instant, LogOnDetails)>,
    pub played: Vec<(Instant, Vec<u32>)>,
    pub inspects: Vec<(Instant, String, String, String)>,
    pub ownership_queries: u32,
    pub license_requests: u32,
    pub relogs: u32,
    pub logoffs: u32,
    pub proxies: Vec<Option<ProxyBinding>>,
}

/// Test-side control over a [`FakeSession`].
#[derive(Clone)]
pub struct FakeHandle {
    state: Arc<Mutex<FakeState>>,
    events_tx: mpsc::Sender<SessionEvent>,
}

impl FakeHandle {
    pub async fn emit(&self, event: SessionEvent) {
        self.events_tx.send(event).await.expect("bot gone");
    }

    pub async fn emit_item(&self, itemid: u64) {
        self.emit(SessionEvent::InspectItemInfo(raw_reply(itemid))).await;
    }

    pub fn script_logon(&self, outcomes: impl IntoIterator<Item = Result<(), SessionError>>) {
        self.state.lock().unwrap().logon_script = outcomes.into_iter().collect();
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn logon_times(&self) -> Vec<Instant> {
        self.with_state(|s| s.logon_calls.iter().map(|(t, _)| *t).collect())
    }

    pub fn played_after(&self, from: Instant) -> Vec<(Instant, Vec<u32>)> {
        self.with_state(|s| {
            s.played
                .iter()
                .filter(|(t, _)| *t >= from)
                .cloned()
                .collect()
        })
    }

    pub fn inspect_count(&self) -> usize {
        self.with_state(|s| s.inspects.len())
    }
}

/// In-memory [`SessionClient`] whose behavior a test scripts up front.
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: Option<mpsc::Receiver<SessionEvent>>,
}

impl FakeSession {
    /// A session that logs on first try, owns the game, and attaches the
    /// GC as soon as the game is played.
    pub fn new() -> (Self, FakeHandle) {
        Self::with_state(FakeState {
            owns_game: true,
            auto_gc: true,
            ..FakeState::default()
        })
    }

    pub fn with_state(state: FakeState) -> (Self, FakeHandle) {
        let state = Arc::new(Mutex::new(state));
        let (events_tx, events_rx) = mpsc::channel(32);
        let handle = FakeHandle {
            state: state.clone(),
            events_tx: events_tx.clone(),
        };
        (
            Self {
                state,
                events_tx,
                events_rx: Some(events_rx),
            },
            handle,
        )
    }

    async fn push(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event).await;
    }
}

#[async_trait]
impl SessionClient for FakeSession {
    async fn log_on(&mut self, details: LogOnDetails) -> Result<(), SessionError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.logon_calls.push((Instant::now(), details));
            state.logon_script.pop_front().unwrap_or(Ok(()))
        };
        outcome?;
        self.push(SessionEvent::LoggedOn(LogOnOutcome::default())).await;
        self.push(SessionEvent::OwnershipCached).await;
        Ok(())
    }

    async fn log_off(&mut self) {
        self.state.lock().unwrap().logoffs += 1;
    }

    async fn relog(&mut self) -> Result<(), SessionError> {
        self.state.lock().unwrap().relogs += 1;
        self.push(SessionEvent::LoggedOn(LogOnOutcome {
            steam_id: None,
            resumed: true,
        }))
        .await;
        Ok(())
    }

    async fn set_played_games(&mut self, app_ids: &[u32], _persist: bool) -> Result<(), SessionError> {
        let auto_gc = {
            let mut state = self.state.lock().unwrap();
            state.played.push((Instant::now(), app_ids.to_vec()));
            state.auto_gc
        };
        if auto_gc && app_ids.contains(&CSGO_APP_ID) {
            self.push(SessionEvent::ConnectedToGc).await;
        }
        Ok(())
    }

    async fn request_free_license(&mut self, _app_ids: &[u32]) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        state.license_requests += 1;
        match state.license_result.take() {
            Some(err) => Err(err),
            None => {
                state.owns_game = true;
                Ok(())
            }
        }
    }

    async fn owns_app(&self, _app_id: u32) -> bool {
        let mut state = self.state.lock().unwrap();
        state.ownership_queries += 1;
        state.owns_game
    }

    async fn inspect_item(
        &mut self,
        owner_id: &str,
        asset_id: &str,
        proof_token: &str,
    ) -> Result<(), SessionError> {
        self.state.lock().unwrap().inspects.push((
            Instant::now(),
            owner_id.to_string(),
            asset_id.to_string(),
            proof_token.to_string(),
        ));
        Ok(())
    }

    fn set_proxy(&mut self, binding: Option<ProxyBinding>) {
        self.state.lock().unwrap().proxies.push(binding);
    }

    fn take_events(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events_rx.take()
    }
}

pub fn fixed_totp() -> TotpFn {
    Arc::new(|_seed: &str| "123456".to_string())
}

pub fn creds(username: &str) -> AccountCredentials {
    AccountCredentials {
        username: username.to_string(),
        password: "hunter2".to_string(),
        auth_secret: Some("JBSWY3DPEHPK3PXP".to_string()),
    }
}

pub fn settings() -> FleetSettings {
    FleetSettings::default()
}

pub fn test_link() -> InspectLink {
    InspectLink::from_parts(
        Some("76561198084749846"),
        None,
        "6768147729",
        "12557175561287951743",
    )
    .unwrap()
}

pub fn raw_reply(itemid: u64) -> RawItemInfo {
    RawItemInfo {
        itemid,
        defindex: 7,
        paintindex: 282,
        rarity: 5,
        quality: 4,
        paintwear: 0.062_418,
        paintseed: Some(412),
        killeatervalue: None,
        customname: None,
        origin: 8,
        stickers: vec![RawSticker {
            sticker_id: 4894,
            slot: 2,
            wear: Some(0.12),
            scale: None,
            rotation: None,
        }],
    }
}

/// Runs other tasks without advancing the paused clock until `cond`
/// holds. Use when the condition only needs event processing.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never held");
}

/// Polls `cond` while letting the paused clock auto-advance through
/// pending timers. Use when the condition waits on scheduled work.
pub async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition never held");
}
