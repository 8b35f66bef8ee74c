//! Type aliases for shared single-threaded state.
//!
//! The editor runs on a single UI event loop, so components that need to see
//! the same value (the session's viewport, panels) share it through
//! `Rc<RefCell<T>>` rather than through locks.

use std::cell::RefCell;
use std::rc::Rc;

/// A reference-counted, interior-mutable wrapper for single-threaded sharing.
///
/// # Example
/// ```rust
/// use folium_core::types::{shared, Shared};
///
/// let counter: Shared<u32> = shared(0);
/// *counter.borrow_mut() += 1;
/// assert_eq!(*counter.borrow(), 1);
/// ```
pub type Shared<T> = Rc<RefCell<T>>;

/// A shared vector for single-threaded collection management.
pub type SharedVec<T> = Rc<RefCell<Vec<T>>>;

/// Wraps a value into a [`Shared`] cell.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}
