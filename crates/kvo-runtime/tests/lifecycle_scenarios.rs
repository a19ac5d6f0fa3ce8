//! End-to-end lifecycle scenarios for attached controllers.
//!
//! A spy controller wraps the real [`KvoController`] and records every
//! teardown into a per-thread log, so each test can check exactly when and
//! how often observations were removed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kvo_core::{Change, KvoError, ObservingOptions, Value};
use kvo_runtime::{
    AttachableController, ControllerSlots, KvoController, KvoHost, KvoHostExt, KvoObject,
    Observed, Retention, existing_controller, get_or_create_controller, set_controller,
};

// ── Spy collaborator ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Created(Retention),
    TeardownAll { retention: Retention, removed: usize },
    HostReclaimed,
}

thread_local! {
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
}

fn events() -> Vec<Event> {
    EVENTS.with(|e| e.borrow().clone())
}

fn teardowns() -> Vec<Event> {
    events()
        .into_iter()
        .filter(|e| matches!(e, Event::TeardownAll { .. }))
        .collect()
}

struct SpyInner {
    ctrl: KvoController,
}

impl Drop for SpyInner {
    fn drop(&mut self) {
        let removed = self.ctrl.teardown_all();
        EVENTS.with(|e| {
            e.borrow_mut().push(Event::TeardownAll {
                retention: self.ctrl.retention(),
                removed,
            });
        });
    }
}

#[derive(Clone)]
struct SpyController(Rc<SpyInner>);

impl SpyController {
    fn observe<T: Observed>(
        &self,
        target: &Rc<T>,
        key_path: &str,
        handler: impl Fn(&dyn Observed, &Change) + 'static,
    ) -> Result<(), KvoError> {
        self.0.ctrl.observe(target, key_path, ObservingOptions::NEW, handler)
    }

    fn observation_count(&self) -> usize {
        self.0.ctrl.observation_count()
    }
}

impl AttachableController for SpyController {
    fn with_retention(retention: Retention) -> Self {
        EVENTS.with(|e| e.borrow_mut().push(Event::Created(retention)));
        SpyController(Rc::new(SpyInner {
            ctrl: KvoController::new(retention),
        }))
    }

    fn retention(&self) -> Retention {
        self.0.ctrl.retention()
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

type SpyHost = KvoObject<SpyController>;

/// New spy host; also clears the event log, which outlives a test when the
/// harness runs tests on one thread.
fn spy_host() -> Rc<SpyHost> {
    EVENTS.with(|e| e.borrow_mut().clear());
    Rc::new(SpyHost::default())
}

/// Host whose last field records [`Event::HostReclaimed`]. Fields drop in
/// declaration order, so the marker fires after the controller slots are gone
/// and just before the allocation is freed.
struct MarkedHost {
    object: SpyHost,
    _marker: ReclaimMarker,
}

struct ReclaimMarker;

impl Drop for ReclaimMarker {
    fn drop(&mut self) {
        EVENTS.with(|e| e.borrow_mut().push(Event::HostReclaimed));
    }
}

impl KvoHost for MarkedHost {
    type Controller = SpyController;

    fn controller_slots(&self) -> &ControllerSlots<SpyController> {
        self.object.controller_slots()
    }
}

fn marked_host() -> Rc<MarkedHost> {
    EVENTS.with(|e| e.borrow_mut().clear());
    Rc::new(MarkedHost {
        object: SpyHost::default(),
        _marker: ReclaimMarker,
    })
}

fn counting_handler() -> (Rc<Cell<u32>>, impl Fn(&dyn Observed, &Change) + 'static) {
    let hits = Rc::new(Cell::new(0u32));
    let clone = Rc::clone(&hits);
    (hits, move |_: &dyn Observed, _: &Change| clone.set(clone.get() + 1))
}

// ── Uniqueness and independence ───────────────────────────────────────────

#[test]
fn repeated_lookup_returns_same_instance() {
    let host = spy_host();
    let first = host.kvo_controller();
    for _ in 0..5 {
        assert!(host.kvo_controller().ptr_eq(&first));
    }
    let created = events()
        .into_iter()
        .filter(|e| matches!(e, Event::Created(_)))
        .count();
    assert_eq!(created, 1);
}

#[test]
fn free_functions_and_accessors_agree() {
    let host = KvoObject::new();
    let via_fn = get_or_create_controller(&host, Retention::NonRetaining);
    assert!(via_fn.ptr_eq(&host.kvo_controller_non_retaining()));
    assert!(existing_controller(&host, Retention::Retaining).is_none());
}

#[test]
fn retaining_and_non_retaining_are_distinct() {
    let host = spy_host();
    let r = host.kvo_controller();
    let n = host.kvo_controller_non_retaining();
    assert!(!r.ptr_eq(&n));
    assert_eq!(r.retention(), Retention::Retaining);
    assert_eq!(n.retention(), Retention::NonRetaining);
}

// ── Lifecycle coupling ────────────────────────────────────────────────────

#[test]
fn host_drop_tears_down_retaining_controller_once() {
    let a = marked_host();
    let b = Rc::new(KvoObject::new());
    let (hits, handler) = counting_handler();
    a.kvo_controller().observe(&b, "value", handler).unwrap();

    b.set("value", 1);
    assert_eq!(hits.get(), 1);
    assert!(teardowns().is_empty());

    drop(a);

    assert_eq!(
        teardowns(),
        vec![Event::TeardownAll {
            retention: Retention::Retaining,
            removed: 1
        }]
    );
    // Teardown completes before the host's memory is reclaimed.
    let log = events();
    let teardown_at = log
        .iter()
        .position(|e| matches!(e, Event::TeardownAll { .. }));
    let reclaimed_at = log.iter().position(|e| *e == Event::HostReclaimed);
    assert!(teardown_at.is_some());
    assert!(teardown_at < reclaimed_at, "events out of order: {log:?}");

    // B is unaffected apart from losing its observer.
    assert_eq!(b.observation_info().registered_count(), 0);
    b.set("value", 2);
    assert_eq!(hits.get(), 1);
    assert_eq!(b.get("value"), Value::from(2));
}

#[test]
fn retained_target_outlives_other_owners_until_host_drops() {
    let a = spy_host();
    let b = Rc::new(KvoObject::new());
    let weak_b = Rc::downgrade(&b);
    let (_, handler) = counting_handler();
    a.kvo_controller().observe(&b, "value", handler).unwrap();

    drop(b);
    assert!(weak_b.upgrade().is_some());

    drop(a);
    assert!(weak_b.upgrade().is_none());
}

#[test]
fn non_retaining_does_not_extend_target_lifetime() {
    let host = Rc::new(KvoObject::new());
    let target = Rc::new(KvoObject::new());
    let weak = Rc::downgrade(&target);
    let (_, handler) = counting_handler();
    let ctrl = host.kvo_controller_non_retaining();
    ctrl.observe(&target, "value", ObservingOptions::NEW, handler)
        .unwrap();

    drop(target);
    assert!(weak.upgrade().is_none());

    // The stale entry is pruned, and the host still tears down cleanly.
    assert_eq!(ctrl.prune_dead_targets(), 1);
    drop(ctrl);
    drop(host);
}

#[test]
fn non_retaining_self_observation_drops_cleanly() {
    let a = spy_host();
    let weak_a = Rc::downgrade(&a);
    let (hits, handler) = counting_handler();
    let ctrl = a.kvo_controller_non_retaining();
    ctrl.observe(&a, "value", handler).unwrap();
    drop(ctrl);

    a.set("value", 1);
    assert_eq!(hits.get(), 1);

    drop(a);

    assert!(weak_a.upgrade().is_none());
    assert_eq!(
        teardowns(),
        vec![Event::TeardownAll {
            retention: Retention::NonRetaining,
            removed: 1
        }]
    );
}

#[test]
fn non_retaining_mutual_observation_frees_both() {
    let a = Rc::new(KvoObject::new());
    let b = Rc::new(KvoObject::new());
    let (_, h) = counting_handler();
    a.kvo_controller_non_retaining()
        .observe(&b, "x", ObservingOptions::NEW, h)
        .unwrap();
    let (_, h) = counting_handler();
    b.kvo_controller_non_retaining()
        .observe(&a, "x", ObservingOptions::NEW, h)
        .unwrap();

    let (wa, wb) = (Rc::downgrade(&a), Rc::downgrade(&b));
    drop(a);
    drop(b);
    assert!(wa.upgrade().is_none());
    assert!(wb.upgrade().is_none());
}

#[test]
fn retaining_self_observation_is_a_cycle_until_removed() {
    let a = Rc::new(KvoObject::new());
    let weak = Rc::downgrade(&a);
    let (_, h) = counting_handler();
    a.kvo_controller()
        .observe(&a, "x", ObservingOptions::NEW, h)
        .unwrap();

    drop(a);
    // The controller owned by A keeps A alive.
    let a = weak.upgrade().expect("retaining self-observation keeps host alive");

    a.kvo_controller().unobserve_all();
    drop(a);
    assert!(weak.upgrade().is_none());
}

// ── Replacement ───────────────────────────────────────────────────────────

#[test]
fn replacement_tears_down_previous_first() {
    let host = spy_host();
    let target = Rc::new(KvoObject::new());
    let (old_hits, h) = counting_handler();
    host.kvo_controller().observe(&target, "value", h).unwrap();

    let injected = SpyController::with_retention(Retention::Retaining);
    let (new_hits, h) = counting_handler();
    injected.observe(&target, "value", h).unwrap();

    host.set_kvo_controller(injected.clone());
    assert_eq!(
        teardowns(),
        vec![Event::TeardownAll {
            retention: Retention::Retaining,
            removed: 1
        }]
    );
    assert!(host.kvo_controller().ptr_eq(&injected));

    target.set("value", 1);
    assert_eq!(old_hits.get(), 0);
    assert_eq!(new_hits.get(), 1);
}

#[test]
fn replacing_one_mode_leaves_the_other() {
    let host = spy_host();
    let target = Rc::new(KvoObject::new());
    let (_, h) = counting_handler();
    let non = host.kvo_controller_non_retaining();
    non.observe(&target, "value", h).unwrap();

    set_controller(
        &*host,
        Retention::Retaining,
        SpyController::with_retention(Retention::Retaining),
    );
    assert!(host.kvo_controller_non_retaining().ptr_eq(&non));
    assert_eq!(non.observation_count(), 1);
    assert!(teardowns().is_empty());
}

#[test]
fn unbound_slot_created_after_explicit_set_uses_injected() {
    let host = spy_host();
    let injected = SpyController::with_retention(Retention::NonRetaining);
    host.set_kvo_controller_non_retaining(injected.clone());
    assert!(host.kvo_controller_non_retaining().ptr_eq(&injected));
    assert!(!host.kvo_controller().ptr_eq(&injected));
}
