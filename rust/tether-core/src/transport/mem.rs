//! In-process transport.
//!
//! Services are rendezvoused by name inside one [`MemTransport`] (clones
//! share state). Each published message gets its own 8-byte aligned heap
//! slot, reference counted across the subscribers it was delivered to, so
//! a received payload address stays valid until every sample referring to
//! it is dropped.
//!
//! Every listener registers its own pending queue on each channel it covers,
//! and a notification is queued for every listener registered at that
//! moment. Notifications fired while nobody listens are held on the channel
//! and adopted by the next listener. All listeners of a transport share one
//! doorbell.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::ServiceConfig;
use crate::names::ChannelName;

use super::{
    EventId, EventService, FiredEvent, ListenPort, NotifyPort, Payload, PayloadMut, PubSubService,
    PublishPort, SubscribePort, Transport, TransportError, Wakeup,
};

mod fault;
mod stats;

pub use fault::{FaultInjector, FaultOp};
pub use stats::{MemStats, MemStatsSnapshot};

/// Largest payload alignment this backend can honor.
pub const MAX_PAYLOAD_ALIGNMENT: usize = std::mem::align_of::<u64>();

#[derive(Clone)]
pub struct MemTransport {
    inner: Arc<MemInner>,
}

struct MemInner {
    topics: Mutex<HashMap<ChannelName, Arc<Topic>>>,
    events: Mutex<HashMap<ChannelName, Arc<EventChannel>>>,
    shared: Arc<Shared>,
}

/// State reachable from every port.
struct Shared {
    faults: FaultInjector,
    stats: MemStats,
    doorbell: Doorbell,
}

impl std::fmt::Debug for MemTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTransport")
            .field("topics", &self.inner.topics.lock().len())
            .field("events", &self.inner.events.lock().len())
            .finish_non_exhaustive()
    }
}

impl Default for MemTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemInner {
                topics: Mutex::new(HashMap::new()),
                events: Mutex::new(HashMap::new()),
                shared: Arc::new(Shared {
                    faults: FaultInjector::new(),
                    stats: MemStats::default(),
                    doorbell: Doorbell::default(),
                }),
            }),
        }
    }

    /// Fault injection controls for this transport.
    pub fn faults(&self) -> &FaultInjector {
        &self.inner.shared.faults
    }

    pub fn stats(&self) -> MemStatsSnapshot {
        self.inner.shared.stats.snapshot()
    }

    fn event_channel(&self, name: &ChannelName) -> Arc<EventChannel> {
        let mut events = self.inner.events.lock();
        Arc::clone(events.entry(name.clone()).or_insert_with(|| {
            tracing::trace!(channel = %name, "creating event channel");
            Arc::new(EventChannel {
                name: name.clone(),
                state: Mutex::new(ChannelState::default()),
            })
        }))
    }
}

impl Transport for MemTransport {
    type Service = MemService;
    type Event = MemEvent;
    type Listener = MemListener;

    fn open_pubsub(
        &self,
        name: &ChannelName,
        config: &ServiceConfig,
    ) -> Result<MemService, TransportError> {
        let shared = &self.inner.shared;
        shared.faults.check(FaultOp::OpenService)?;

        let align = config.payload_alignment;
        if !align.is_power_of_two() || align > MAX_PAYLOAD_ALIGNMENT {
            return Err(TransportError::new(
                "open pubsub",
                format!("unsupported payload alignment {}", align),
            ));
        }

        let mut topics = self.inner.topics.lock();
        let topic = match topics.get(name) {
            Some(topic) => {
                if topic.config.payload_alignment != align {
                    return Err(TransportError::new(
                        "open pubsub",
                        format!(
                            "service '{}' exists with payload alignment {}, requested {}",
                            name, topic.config.payload_alignment, align
                        ),
                    ));
                }
                Arc::clone(topic)
            }
            None => {
                tracing::debug!(service = %name, "creating publish-subscribe service");
                let topic = Arc::new(Topic {
                    config: config.clone(),
                    publishers: AtomicUsize::new(0),
                    inboxes: Mutex::new(Vec::new()),
                    shared: Arc::clone(shared),
                });
                topics.insert(name.clone(), Arc::clone(&topic));
                topic
            }
        };

        Ok(MemService {
            topic,
            buffer_size: config.subscriber_buffer_size.max(1),
        })
    }

    fn open_event(&self, name: &ChannelName) -> Result<MemEvent, TransportError> {
        self.inner.shared.faults.check(FaultOp::OpenService)?;
        Ok(MemEvent {
            channel: self.event_channel(name),
            shared: Arc::clone(&self.inner.shared),
        })
    }

    fn listen(&self, channels: &[ChannelName]) -> Result<MemListener, TransportError> {
        self.inner.shared.faults.check(FaultOp::Listen)?;

        let mut names: Vec<ChannelName> = channels.to_vec();
        names.sort();
        names.dedup();
        let queues = names
            .iter()
            .map(|n| {
                let channel = self.event_channel(n);
                let queue = channel.register();
                (channel, queue)
            })
            .collect();

        Ok(MemListener {
            queues,
            names,
            shared: Arc::clone(&self.inner.shared),
        })
    }
}

// =============================================================================
// Publish-subscribe
// =============================================================================

struct Topic {
    config: ServiceConfig,
    publishers: AtomicUsize,
    inboxes: Mutex<Vec<Weak<Inbox>>>,
    shared: Arc<Shared>,
}

impl Topic {
    fn deliver(&self, slot: Slot) {
        let slot = Arc::new(slot);
        let stats = &self.shared.stats;
        let mut inboxes = self.inboxes.lock();
        inboxes.retain(|w| w.strong_count() > 0);
        for inbox in inboxes.iter().filter_map(Weak::upgrade) {
            let mut queue = inbox.queue.lock();
            queue.push_back(Arc::clone(&slot));
            if queue.len() > inbox.capacity {
                queue.pop_front();
                stats.samples_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        stats.samples_sent.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct MemService {
    topic: Arc<Topic>,
    buffer_size: usize,
}

impl PubSubService for MemService {
    type Publisher = MemPublisher;
    type Subscriber = MemSubscriber;

    fn publisher(&self) -> Result<MemPublisher, TransportError> {
        self.topic.shared.faults.check(FaultOp::CreatePort)?;

        let max = self.topic.config.max_publishers;
        let registered = self
            .topic
            .publishers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            });
        if registered.is_err() {
            return Err(TransportError::new(
                "create publisher",
                format!("service already has {} publishers", max),
            ));
        }

        Ok(MemPublisher {
            topic: Arc::clone(&self.topic),
        })
    }

    fn subscriber(&self) -> Result<MemSubscriber, TransportError> {
        self.topic.shared.faults.check(FaultOp::CreatePort)?;

        let max = self.topic.config.max_subscribers;
        let mut inboxes = self.topic.inboxes.lock();
        inboxes.retain(|w| w.strong_count() > 0);
        if inboxes.len() >= max {
            return Err(TransportError::new(
                "create subscriber",
                format!("service already has {} subscribers", max),
            ));
        }

        let inbox = Arc::new(Inbox {
            queue: Mutex::new(VecDeque::new()),
            capacity: self.buffer_size,
        });
        inboxes.push(Arc::downgrade(&inbox));

        Ok(MemSubscriber {
            inbox,
            shared: Arc::clone(&self.topic.shared),
        })
    }
}

pub struct MemPublisher {
    topic: Arc<Topic>,
}

impl Drop for MemPublisher {
    fn drop(&mut self) {
        self.topic.publishers.fetch_sub(1, Ordering::AcqRel);
    }
}

impl PublishPort for MemPublisher {
    type Loan = MemLoan;

    fn send_copy(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.topic.shared.faults.check(FaultOp::Send)?;
        let mut slot = Slot::zeroed(payload.len());
        slot.as_bytes_mut().copy_from_slice(payload);
        self.topic.deliver(slot);
        Ok(())
    }

    fn loan(&self, len: usize) -> Result<MemLoan, TransportError> {
        self.topic.shared.faults.check(FaultOp::Loan)?;
        Ok(MemLoan {
            slot: Slot::zeroed(len),
        })
    }

    fn send(&self, loan: MemLoan) -> Result<(), TransportError> {
        self.topic.shared.faults.check(FaultOp::Send)?;
        self.topic.deliver(loan.slot);
        Ok(())
    }
}

struct Inbox {
    queue: Mutex<VecDeque<Arc<Slot>>>,
    capacity: usize,
}

pub struct MemSubscriber {
    inbox: Arc<Inbox>,
    shared: Arc<Shared>,
}

impl SubscribePort for MemSubscriber {
    type Sample = MemSample;

    fn has_pending(&self) -> bool {
        !self.inbox.queue.lock().is_empty()
    }

    fn receive(&self) -> Result<Option<MemSample>, TransportError> {
        self.shared.faults.check(FaultOp::Receive)?;
        let slot = self.inbox.queue.lock().pop_front();
        Ok(slot.map(|slot| {
            self.shared
                .stats
                .samples_received
                .fetch_add(1, Ordering::Relaxed);
            MemSample {
                slot,
                shared: Arc::clone(&self.shared),
            }
        }))
    }
}

/// A received message. Dropping it releases the reference to its slot.
pub struct MemSample {
    slot: Arc<Slot>,
    shared: Arc<Shared>,
}

impl Payload for MemSample {
    fn payload(&self) -> &[u8] {
        self.slot.as_bytes()
    }
}

impl Drop for MemSample {
    fn drop(&mut self) {
        self.shared
            .stats
            .samples_released
            .fetch_add(1, Ordering::Relaxed);
    }
}

/// A writable slot borrowed from a publisher.
pub struct MemLoan {
    slot: Slot,
}

impl Payload for MemLoan {
    fn payload(&self) -> &[u8] {
        self.slot.as_bytes()
    }
}

impl PayloadMut for MemLoan {
    fn payload_mut(&mut self) -> &mut [u8] {
        self.slot.as_bytes_mut()
    }
}

/// Heap slot backing one message. Always at least one word, so every slot
/// has its own address even for empty payloads.
struct Slot {
    words: Box<[u64]>,
    len: usize,
}

impl Slot {
    fn zeroed(len: usize) -> Self {
        let words = len.div_ceil(std::mem::size_of::<u64>()).max(1);
        Self {
            words: vec![0u64; words].into_boxed_slice(),
            len,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        // SAFETY: `words` spans at least `len` initialized bytes and u8 has
        // no alignment requirement.
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.len) }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), self.len) }
    }
}

// =============================================================================
// Events
// =============================================================================

struct EventChannel {
    name: ChannelName,
    state: Mutex<ChannelState>,
}

#[derive(Default)]
struct ChannelState {
    listeners: Vec<Weak<Pending>>,
    /// Fired while no listener was registered, or left undrained by a
    /// listener that went away.
    unclaimed: Vec<EventId>,
}

impl EventChannel {
    fn fire(&self, id: EventId) {
        let mut state = self.state.lock();
        state.listeners.retain(|w| w.strong_count() > 0);
        if state.listeners.is_empty() {
            push_unique(&mut state.unclaimed, id);
            return;
        }
        for queue in state.listeners.iter().filter_map(Weak::upgrade) {
            queue.push(id);
        }
    }

    /// New pending queue for a listener, seeded with the unclaimed ids.
    fn register(&self) -> Arc<Pending> {
        let mut state = self.state.lock();
        state.listeners.retain(|w| w.strong_count() > 0);
        let queue = Arc::new(Pending(Mutex::new(std::mem::take(&mut state.unclaimed))));
        state.listeners.push(Arc::downgrade(&queue));
        queue
    }

    fn unregister(&self, queue: &Arc<Pending>) {
        let mut state = self.state.lock();
        state
            .listeners
            .retain(|w| w.strong_count() > 0 && !std::ptr::eq(w.as_ptr(), Arc::as_ptr(queue)));
        for id in queue.take() {
            push_unique(&mut state.unclaimed, id);
        }
    }
}

/// Ids fired since the owning listener last drained. Repeated ids coalesce.
struct Pending(Mutex<Vec<EventId>>);

impl Pending {
    fn push(&self, id: EventId) {
        push_unique(&mut self.0.lock(), id);
    }

    fn take(&self) -> Vec<EventId> {
        std::mem::take(&mut *self.0.lock())
    }
}

fn push_unique(ids: &mut Vec<EventId>, id: EventId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

pub struct MemEvent {
    channel: Arc<EventChannel>,
    shared: Arc<Shared>,
}

impl EventService for MemEvent {
    type Notifier = MemNotifier;

    fn notifier(&self) -> Result<MemNotifier, TransportError> {
        self.shared.faults.check(FaultOp::CreatePort)?;
        Ok(MemNotifier {
            channel: Arc::clone(&self.channel),
            shared: Arc::clone(&self.shared),
        })
    }
}

pub struct MemNotifier {
    channel: Arc<EventChannel>,
    shared: Arc<Shared>,
}

impl NotifyPort for MemNotifier {
    fn notify(&self, id: EventId) -> Result<(), TransportError> {
        self.shared.faults.check(FaultOp::Notify)?;
        self.channel.fire(id);
        self.shared
            .stats
            .notifications
            .fetch_add(1, Ordering::Relaxed);
        self.shared.doorbell.ring();
        Ok(())
    }
}

pub struct MemListener {
    queues: Vec<(Arc<EventChannel>, Arc<Pending>)>,
    names: Vec<ChannelName>,
    shared: Arc<Shared>,
}

impl MemListener {
    fn drain(&self) -> Vec<FiredEvent> {
        let mut fired = Vec::new();
        for (channel, queue) in &self.queues {
            fired.extend(queue.take().into_iter().map(|id| FiredEvent {
                channel: channel.name.clone(),
                id,
            }));
        }
        fired
    }
}

impl Drop for MemListener {
    fn drop(&mut self) {
        for (channel, queue) in &self.queues {
            channel.unregister(queue);
        }
    }
}

impl ListenPort for MemListener {
    fn channels(&self) -> &[ChannelName] {
        &self.names
    }

    fn block(&self, timeout: Option<Duration>) -> Result<Wakeup, TransportError> {
        self.shared.faults.check(FaultOp::Wait)?;

        // An unrepresentable deadline is as good as none.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let doorbell = &self.shared.doorbell;

        loop {
            // Sample the ring count before draining so a notification that
            // lands in between still wakes the wait below.
            let seen = doorbell.rings();
            let fired = self.drain();
            if !fired.is_empty() {
                return Ok(Wakeup::Triggered(fired));
            }
            if !doorbell.wait_past(seen, deadline) {
                let fired = self.drain();
                if fired.is_empty() {
                    return Ok(Wakeup::TimedOut);
                }
                return Ok(Wakeup::Triggered(fired));
            }
        }
    }
}

/// Wakes every blocked listener whenever any notification is fired.
#[derive(Default)]
struct Doorbell {
    rings: Mutex<u64>,
    cv: Condvar,
}

impl Doorbell {
    fn ring(&self) {
        let mut rings = self.rings.lock();
        *rings = rings.wrapping_add(1);
        self.cv.notify_all();
    }

    fn rings(&self) -> u64 {
        *self.rings.lock()
    }

    /// Wait until the ring count moves past `seen`. Returns false on timeout.
    fn wait_past(&self, seen: u64, deadline: Option<Instant>) -> bool {
        let mut rings = self.rings.lock();
        while *rings == seen {
            match deadline {
                Some(deadline) => {
                    if self.cv.wait_until(&mut rings, deadline).timed_out() {
                        return *rings != seen;
                    }
                }
                None => self.cv.wait(&mut rings),
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ChannelName {
        ChannelName::new(s).unwrap()
    }

    #[test]
    fn slots_have_distinct_aligned_addresses() {
        let a = Slot::zeroed(0);
        let b = Slot::zeroed(0);
        let c = Slot::zeroed(13);
        assert_ne!(a.as_bytes().as_ptr(), b.as_bytes().as_ptr());
        assert_eq!(c.as_bytes().as_ptr() as usize % MAX_PAYLOAD_ALIGNMENT, 0);
        assert_eq!(c.as_bytes().len(), 13);
        assert!(c.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn publish_reaches_every_subscriber() {
        let transport = MemTransport::new();
        let service = transport
            .open_pubsub(&name("t"), &ServiceConfig::default())
            .unwrap();
        let publisher = service.publisher().unwrap();
        let s1 = service.subscriber().unwrap();
        let s2 = service.subscriber().unwrap();

        publisher.send_copy(b"hello").unwrap();

        let a = s1.receive().unwrap().unwrap();
        let b = s2.receive().unwrap().unwrap();
        assert_eq!(a.payload(), b"hello");
        // One slot, shared by reference.
        assert_eq!(a.payload().as_ptr(), b.payload().as_ptr());
        assert!(s1.receive().unwrap().is_none());

        drop(a);
        drop(b);
        let stats = transport.stats();
        assert_eq!(stats.samples_sent, 1);
        assert_eq!(stats.samples_received, 2);
        assert_eq!(stats.samples_released, 2);
    }

    #[test]
    fn overflow_drops_oldest() {
        let transport = MemTransport::new();
        let config = ServiceConfig {
            subscriber_buffer_size: 2,
            ..ServiceConfig::default()
        };
        let service = transport.open_pubsub(&name("t"), &config).unwrap();
        let publisher = service.publisher().unwrap();
        let subscriber = service.subscriber().unwrap();

        for i in 0..3u8 {
            publisher.send_copy(&[i]).unwrap();
        }

        assert_eq!(subscriber.receive().unwrap().unwrap().payload(), &[1]);
        assert_eq!(subscriber.receive().unwrap().unwrap().payload(), &[2]);
        assert_eq!(transport.stats().samples_dropped, 1);
    }

    #[test]
    fn port_limits() {
        let transport = MemTransport::new();
        let config = ServiceConfig {
            max_publishers: 1,
            max_subscribers: 1,
            ..ServiceConfig::default()
        };
        let service = transport.open_pubsub(&name("t"), &config).unwrap();

        let p = service.publisher().unwrap();
        assert!(service.publisher().is_err());
        drop(p);
        assert!(service.publisher().is_ok());

        let s = service.subscriber().unwrap();
        assert!(service.subscriber().is_err());
        drop(s);
        assert!(service.subscriber().is_ok());
    }

    #[test]
    fn alignment_is_checked() {
        let transport = MemTransport::new();
        let bad = ServiceConfig {
            payload_alignment: 16,
            ..ServiceConfig::default()
        };
        assert!(transport.open_pubsub(&name("t"), &bad).is_err());

        transport
            .open_pubsub(&name("t"), &ServiceConfig::default())
            .unwrap();
        let other = ServiceConfig {
            payload_alignment: 4,
            ..ServiceConfig::default()
        };
        assert!(transport.open_pubsub(&name("t"), &other).is_err());
    }

    #[test]
    fn pending_notification_survives_until_listened() {
        let transport = MemTransport::new();
        let event = transport.open_event(&name("e")).unwrap();
        let notifier = event.notifier().unwrap();

        notifier.notify(EventId(4)).unwrap();
        notifier.notify(EventId(4)).unwrap();

        let listener = transport.listen(&[name("e")]).unwrap();
        match listener.block(Some(Duration::ZERO)).unwrap() {
            Wakeup::Triggered(fired) => {
                assert_eq!(
                    fired,
                    vec![FiredEvent {
                        channel: name("e"),
                        id: EventId(4)
                    }]
                );
            }
            Wakeup::TimedOut => panic!("pending notification was lost"),
        }
        assert_eq!(
            listener.block(Some(Duration::ZERO)).unwrap(),
            Wakeup::TimedOut
        );
    }

    #[test]
    fn every_listener_sees_each_notification() {
        let transport = MemTransport::new();
        let notifier = transport
            .open_event(&name("e"))
            .unwrap()
            .notifier()
            .unwrap();
        let first = transport.listen(&[name("e")]).unwrap();
        let second = transport.listen(&[name("e")]).unwrap();

        notifier.notify(EventId(2)).unwrap();

        for listener in [&first, &second] {
            assert!(matches!(
                listener.block(Some(Duration::ZERO)).unwrap(),
                Wakeup::Triggered(ref f) if f.len() == 1 && f[0].id == EventId(2)
            ));
        }
        assert_eq!(first.block(Some(Duration::ZERO)).unwrap(), Wakeup::TimedOut);
    }

    #[test]
    fn undrained_ids_pass_to_the_next_listener() {
        let transport = MemTransport::new();
        let notifier = transport
            .open_event(&name("e"))
            .unwrap()
            .notifier()
            .unwrap();

        let listener = transport.listen(&[name("e")]).unwrap();
        notifier.notify(EventId(5)).unwrap();
        drop(listener);

        let listener = transport.listen(&[name("e")]).unwrap();
        assert!(matches!(
            listener.block(Some(Duration::ZERO)).unwrap(),
            Wakeup::Triggered(ref f) if f[0].id == EventId(5)
        ));
    }

    #[test]
    fn has_pending_tracks_the_inbox() {
        let transport = MemTransport::new();
        let service = transport
            .open_pubsub(&name("t"), &ServiceConfig::default())
            .unwrap();
        let publisher = service.publisher().unwrap();
        let subscriber = service.subscriber().unwrap();

        assert!(!subscriber.has_pending());
        publisher.send_copy(b"x").unwrap();
        assert!(subscriber.has_pending());
        drop(subscriber.receive().unwrap());
        assert!(!subscriber.has_pending());
    }

    #[test]
    fn listener_ignores_other_channels() {
        let transport = MemTransport::new();
        let other = transport.open_event(&name("other")).unwrap();
        let listener = transport.listen(&[name("mine")]).unwrap();

        other.notifier().unwrap().notify(EventId(1)).unwrap();
        assert_eq!(
            listener.block(Some(Duration::from_millis(20))).unwrap(),
            Wakeup::TimedOut
        );
    }

    #[test]
    fn notify_wakes_blocked_listener() {
        let transport = MemTransport::new();
        let notifier = transport
            .open_event(&name("e"))
            .unwrap()
            .notifier()
            .unwrap();
        let listener = transport.listen(&[name("e")]).unwrap();

        std::thread::scope(|s| {
            let waiter = s.spawn(|| listener.block(Some(Duration::from_secs(10))));
            std::thread::sleep(Duration::from_millis(20));
            notifier.notify(EventId(9)).unwrap();
            let wakeup = waiter.join().unwrap().unwrap();
            assert!(matches!(wakeup, Wakeup::Triggered(ref f) if f[0].id == EventId(9)));
        });
    }
}
