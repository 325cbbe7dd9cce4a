//! Gossip daemon - consumer, spreader, and expiry sweeper tasks.
//!
//! # Architecture
//!
//! - **Consumer**: drains the unbounded inbound queue, validates, stores,
//!   and dispatches new rumors to the router in canonical order.
//! - **Spreader**: every `interval`, runs one pull-then-push round against
//!   `fanout` uniformly chosen peers. A failing peer aborts only its own
//!   round.
//! - **Sweeper**: enforces the active/seen retentions.
//!
//! All three loops swallow and log iteration-local errors; only
//! construction/startup errors escape. Shutdown is a watch-channel flip.

use crate::domain::{
    hashes_missing_from, select_gossip_peers, sort_canonical, GossipConfig, GossipError,
    GossipResult, GossipStatus, RumorStorage, RumorValidator,
};
use crate::events::{
    EndGossipRoundRequest, EndGossipRoundResponse, StartGossipRoundRequest,
    StartGossipRoundResponse,
};
use crate::metrics;
use crate::ports::{GossipApi, GossipTransport, PeerProvider, RumorRouter};
use async_trait::async_trait;
use futures::future::join_all;
use shared_types::{content_hash, Hash, PeerId, RumorBatch, SignedRumor};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, warn};

/// Monotonic daemon counters backing [`GossipStatus`].
#[derive(Default)]
struct GossipCounters {
    rumors_dispatched: AtomicU64,
    rounds_completed: AtomicU64,
    rounds_failed: AtomicU64,
}

/// Dependencies for [`GossipService`].
pub struct GossipDependencies<T, P, R> {
    pub transport: Arc<T>,
    pub peers: Arc<P>,
    pub router: Arc<R>,
    pub config: GossipConfig,
    pub self_id: PeerId,
}

/// Gossip daemon service.
pub struct GossipService<T, P, R>
where
    T: GossipTransport + 'static,
    P: PeerProvider + 'static,
    R: RumorRouter + 'static,
{
    config: GossipConfig,
    self_id: PeerId,
    storage: Arc<RumorStorage>,
    validator: RumorValidator,
    transport: Arc<T>,
    peers: Arc<P>,
    router: Arc<R>,
    inbound_tx: mpsc::UnboundedSender<RumorBatch>,
    inbound_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<RumorBatch>>>,
    shutdown_tx: watch::Sender<bool>,
    counters: Arc<GossipCounters>,
}

impl<T, P, R> GossipService<T, P, R>
where
    T: GossipTransport + 'static,
    P: PeerProvider + 'static,
    R: RumorRouter + 'static,
{
    /// Create a new gossip service. Fails on invalid configuration.
    pub fn new(deps: GossipDependencies<T, P, R>) -> GossipResult<Self> {
        deps.config.validate()?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        let storage = Arc::new(RumorStorage::new(
            deps.config.active_retention,
            deps.config.seen_retention,
        ));
        let validator = RumorValidator::new(deps.config.whitelist.clone());
        Ok(Self {
            config: deps.config,
            self_id: deps.self_id,
            storage,
            validator,
            transport: deps.transport,
            peers: deps.peers,
            router: deps.router,
            inbound_tx,
            inbound_rx: parking_lot::Mutex::new(Some(inbound_rx)),
            shutdown_tx,
            counters: Arc::new(GossipCounters::default()),
        })
    }

    /// Spawn the consumer, spreader, and sweeper tasks.
    pub fn start(&self) -> GossipResult<()> {
        let inbound_rx = self
            .inbound_rx
            .lock()
            .take()
            .ok_or(GossipError::AlreadyStarted)?;

        tokio::spawn(consumer_loop(
            self.self_id,
            Arc::clone(&self.storage),
            self.validator.clone(),
            Arc::clone(&self.router),
            Arc::new(Semaphore::new(self.config.max_concurrent_handlers)),
            Arc::clone(&self.counters),
            inbound_rx,
            self.shutdown_tx.subscribe(),
        ));

        tokio::spawn(spreader_loop(
            self.config.clone(),
            self.self_id,
            Arc::clone(&self.storage),
            Arc::clone(&self.transport),
            Arc::clone(&self.peers),
            self.inbound_tx.clone(),
            Arc::clone(&self.counters),
            self.shutdown_tx.subscribe(),
        ));

        tokio::spawn(sweeper_loop(
            self.config.sweep_interval,
            Arc::clone(&self.storage),
            self.shutdown_tx.subscribe(),
        ));

        Ok(())
    }

    /// Trigger graceful shutdown of all daemon tasks.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Point-in-time status snapshot.
    pub fn status(&self) -> GossipStatus {
        GossipStatus {
            active_rumors: self.storage.len_active(),
            seen_rumors: self.storage.len_seen(),
            rumors_dispatched: self.counters.rumors_dispatched.load(Ordering::Relaxed),
            rounds_completed: self.counters.rounds_completed.load(Ordering::Relaxed),
            rounds_failed: self.counters.rounds_failed.load(Ordering::Relaxed),
        }
    }

    /// The rumor store backing this daemon.
    pub fn storage(&self) -> Arc<RumorStorage> {
        Arc::clone(&self.storage)
    }
}

#[async_trait]
impl<T, P, R> GossipApi for GossipService<T, P, R>
where
    T: GossipTransport + 'static,
    P: PeerProvider + 'static,
    R: RumorRouter + 'static,
{
    async fn handle_round_start(
        &self,
        peer: PeerId,
        request: StartGossipRoundRequest,
    ) -> StartGossipRoundResponse {
        debug!(%peer, offered = request.offer.len(), "gossip round start");
        let seen: HashSet<Hash> = self.storage.get_seen_hashes().into_iter().collect();
        StartGossipRoundResponse {
            offer: self.storage.get_active_hashes(),
            inquiry: hashes_missing_from(&request.offer, &seen),
        }
    }

    async fn handle_round_end(
        &self,
        peer: PeerId,
        request: EndGossipRoundRequest,
    ) -> GossipResult<EndGossipRoundResponse> {
        debug!(
            %peer,
            pushed = request.answer.len(),
            wanted = request.inquiry.len(),
            "gossip round end"
        );
        if !request.answer.is_empty() {
            self.inbound_tx
                .send(request.answer)
                .map_err(|_| GossipError::QueueClosed)?;
        }
        Ok(EndGossipRoundResponse {
            answer: self.storage.get_rumors(&request.inquiry),
        })
    }

    async fn submit_rumors(&self, batch: RumorBatch) -> GossipResult<()> {
        self.inbound_tx
            .send(batch)
            .map_err(|_| GossipError::QueueClosed)
    }

    async fn submit_signed(&self, rumor: SignedRumor) -> GossipResult<Hash> {
        let hash = content_hash(&rumor.value)?;
        self.submit_rumors(vec![(hash, rumor)]).await?;
        Ok(hash)
    }
}

////////////////////////////////////////////////////////////////////////////
// Background tasks
////////////////////////////////////////////////////////////////////////////

#[allow(clippy::too_many_arguments)]
async fn consumer_loop<R: RumorRouter + 'static>(
    self_id: PeerId,
    storage: Arc<RumorStorage>,
    validator: RumorValidator,
    router: Arc<R>,
    limiter: Arc<Semaphore>,
    counters: Arc<GossipCounters>,
    mut inbound_rx: mpsc::UnboundedReceiver<RumorBatch>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("gossip consumer shutting down");
                    break;
                }
            }
            batch = inbound_rx.recv() => {
                let Some(batch) = batch else {
                    warn!("inbound rumor queue closed");
                    break;
                };
                consume_batch(
                    self_id,
                    &storage,
                    &validator,
                    &router,
                    &limiter,
                    &counters,
                    batch,
                )
                .await;
            }
        }
    }
}

async fn consume_batch<R: RumorRouter + 'static>(
    self_id: PeerId,
    storage: &Arc<RumorStorage>,
    validator: &RumorValidator,
    router: &Arc<R>,
    limiter: &Arc<Semaphore>,
    counters: &Arc<GossipCounters>,
    batch: RumorBatch,
) {
    // Hash integrity pass.
    let mut hashed = Vec::with_capacity(batch.len());
    for (hash, rumor) in batch {
        match validator.check_hash(&hash, &rumor) {
            None => hashed.push((hash, rumor)),
            Some(fault) => {
                warn!(hash = %hex::encode(&hash[..8]), %fault, "dropping rumor: hash check failed");
                metrics::record_rumor_rejected("hash");
            }
        }
    }

    // Signature pass.
    let mut valid = Vec::with_capacity(hashed.len());
    for (hash, rumor) in hashed {
        let faults = validator.check_signatures(&rumor);
        if faults.is_empty() {
            metrics::record_rumor_validated();
            valid.push((hash, rumor));
        } else {
            warn!(
                hash = %hex::encode(&hash[..8]),
                ?faults,
                "dropping rumor: signature check failed"
            );
            metrics::record_rumor_rejected("signature");
        }
    }

    // Store, then dispatch only what was actually new, in canonical order.
    let mut fresh = storage.add_rumors(valid);
    sort_canonical(&mut fresh);
    for (hash, rumor) in fresh {
        if rumor.value.origin() == Some(&self_id) {
            continue;
        }
        let Ok(permit) = Arc::clone(limiter).acquire_owned().await else {
            return;
        };
        let router = Arc::clone(router);
        let counters = Arc::clone(counters);
        tokio::spawn(async move {
            let tag = rumor.value.tag().to_string();
            if router.route(hash, rumor).await.is_none() {
                warn!(%tag, hash = %hex::encode(&hash[..8]), "no subsystem handled rumor");
            }
            counters.rumors_dispatched.fetch_add(1, Ordering::Relaxed);
            drop(permit);
        });
    }
}

#[allow(clippy::too_many_arguments)]
async fn spreader_loop<T: GossipTransport + 'static, P: PeerProvider + 'static>(
    config: GossipConfig,
    self_id: PeerId,
    storage: Arc<RumorStorage>,
    transport: Arc<T>,
    peers: Arc<P>,
    inbound_tx: mpsc::UnboundedSender<RumorBatch>,
    counters: Arc<GossipCounters>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("gossip spreader shutting down");
                    break;
                }
            }
            _ = ticker.tick() => {
                spread_once(
                    &config,
                    self_id,
                    &storage,
                    &transport,
                    &peers,
                    &inbound_tx,
                    &counters,
                )
                .await;
            }
        }
    }
}

async fn spread_once<T: GossipTransport, P: PeerProvider>(
    config: &GossipConfig,
    self_id: PeerId,
    storage: &Arc<RumorStorage>,
    transport: &Arc<T>,
    peers: &Arc<P>,
    inbound_tx: &mpsc::UnboundedSender<RumorBatch>,
    counters: &Arc<GossipCounters>,
) {
    let offer = storage.get_active_hashes();
    if offer.is_empty() {
        return;
    }
    let candidates: Vec<PeerId> = peers
        .current_peers()
        .into_iter()
        .filter(|p| *p != self_id)
        .collect();
    if candidates.is_empty() {
        return;
    }
    let selected = select_gossip_peers(&candidates, config.fanout, &mut rand::thread_rng());
    let seen: HashSet<Hash> = storage.get_seen_hashes().into_iter().collect();

    let rounds = selected.into_iter().map(|peer| {
        let offer = offer.clone();
        let seen = seen.clone();
        let storage = Arc::clone(storage);
        let transport = Arc::clone(transport);
        let inbound_tx = inbound_tx.clone();
        async move {
            let result = run_peer_round(peer, offer, seen, storage, transport, inbound_tx).await;
            (peer, result)
        }
    });

    for (peer, result) in join_all(rounds).await {
        match result {
            Ok(()) => {
                counters.rounds_completed.fetch_add(1, Ordering::Relaxed);
                metrics::record_round("completed");
            }
            Err(e) => {
                warn!(%peer, error = %e, "gossip round failed");
                counters.rounds_failed.fetch_add(1, Ordering::Relaxed);
                metrics::record_round("failed");
            }
        }
    }
}

async fn run_peer_round<T: GossipTransport>(
    peer: PeerId,
    offer: Vec<Hash>,
    seen: HashSet<Hash>,
    storage: Arc<RumorStorage>,
    transport: Arc<T>,
    inbound_tx: mpsc::UnboundedSender<RumorBatch>,
) -> GossipResult<()> {
    let start = transport
        .start_round(&peer, StartGossipRoundRequest { offer })
        .await?;

    // What we need from them, and what they asked of us.
    let inquiry = hashes_missing_from(&start.offer, &seen);
    let answer = storage.get_rumors(&start.inquiry);

    let end = transport
        .end_round(&peer, EndGossipRoundRequest { answer, inquiry })
        .await?;

    if !end.answer.is_empty() {
        inbound_tx
            .send(end.answer)
            .map_err(|_| GossipError::QueueClosed)?;
    }
    Ok(())
}

async fn sweeper_loop(
    interval: std::time::Duration,
    storage: Arc<RumorStorage>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("gossip sweeper shutting down");
                    break;
                }
            }
            _ = ticker.tick() => {
                let stats = storage.sweep_expired();
                if stats.demoted > 0 || stats.evicted > 0 {
                    debug!(demoted = stats.demoted, evicted = stats.evicted, "storage sweep");
                }
            }
        }
    }
}
