#![forbid(unsafe_code)]

//! Runtime: observation registry, controllers, and lazy attachment.
//!
//! This crate lets any object observe property changes on other objects
//! without managing observer bookkeeping by hand:
//!
//! - [`KvoController`]: registers observations on targets and removes all of
//!   them when it is dropped.
//! - [`Retention`]: whether a controller keeps its targets alive.
//! - [`KvoHostExt`]: per-host, lazily created controllers, one per
//!   retention, torn down together with the host.
//! - [`Observed`] / [`ObservationInfo`]: the per-target side of the contract.
//! - [`KvoObject`]: a property bag implementing both sides.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use kvo_core::ObservingOptions;
//! use kvo_runtime::{KvoHostExt, KvoObject, Observed};
//!
//! let view = Rc::new(KvoObject::new());
//! let model = Rc::new(KvoObject::new());
//!
//! view.kvo_controller()
//!     .observe(&model, "title", ObservingOptions::NEW, |_, change| {
//!         println!("title is now {:?}", change.new);
//!     })
//!     .unwrap();
//!
//! model.set("title", "hello");
//! drop(view); // removes the observation on `model`
//! assert_eq!(model.observation_info().observer_count(), 0);
//! ```
//!
//! # Architecture
//!
//! Everything is `Rc`/`RefCell` based and single-threaded. Targets hold only
//! `Weak` references to observation records, controllers own the records,
//! and hosts own their controllers. Dropping a host therefore drops its
//! controllers, which unregister every record before they are freed.

pub mod attach;
pub mod controller;
pub mod object;
pub mod observed;
pub mod retention;

pub use attach::{
    AttachableController, ControllerSlots, KvoHost, KvoHostExt, existing_controller,
    get_or_create_controller, set_controller,
};
pub use controller::KvoController;
pub use object::KvoObject;
pub use observed::{Handler, ObservationInfo, ObservationRecord, Observed};
pub use retention::Retention;
