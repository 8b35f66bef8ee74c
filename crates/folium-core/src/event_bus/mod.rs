//! # Event Bus Module
//!
//! Typed publish/subscribe channel between the components of one editing
//! session.
//!
//! ## Usage
//!
//! ```rust
//! use folium_core::event_bus::{Alert, AppEvent, EventBus, EventCategory, EventFilter};
//!
//! let bus = EventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Alert]),
//!     |event| {
//!         if let AppEvent::Alert(alert) = event {
//!             println!("{}", alert.message);
//!         }
//!     },
//! );
//!
//! bus.publish(AppEvent::Alert(Alert::info("Segmentation of part 3 finished")));
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
