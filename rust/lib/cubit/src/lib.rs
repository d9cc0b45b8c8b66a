//! Cubit — a minimal observable state container.
//!
//! A `Cubit<S>` always holds one current state, commits new states through
//! `emit`, and broadcasts each committed state to its subscribers. A
//! [`TransitionHook`] observes every `(previous, next)` pair before the new
//! state becomes visible, which is where logging, auditing or validation
//! plug in without touching emit call sites.
//!
//! # Primitives
//!
//! - `state()` — read the current state, always defined
//! - `emit(state)` — run the hook, commit, notify subscribers in order
//! - `subscribe(handler)` — observe states committed from now on
//! - `stream()` — the same, as an async sequence ending on close
//! - `close()` — terminal; later emits fail with [`CubitError::Closed`]
//!
//! # Example
//!
//! ```ignore
//! use cubit::{Cubit, TracingHook};
//!
//! let counter = Cubit::builder(0i64)
//!     .name("counter")
//!     .hook(TracingHook::new("counter"))
//!     .build();
//!
//! let sub = counter.subscribe(|n| println!("count = {n}"));
//! counter.emit(counter.state() + 1)?;
//! sub.cancel();
//! counter.close();
//! ```

pub mod cubit;
pub mod error;
pub mod holder;
pub mod hook;
pub mod listener;
pub mod observable;
pub mod stream;
pub mod subscription;
pub mod transition;

// Re-export primary types at crate root.
pub use cubit::{Cubit, CubitBuilder};
pub use error::{CubitError, HookError};
pub use holder::{StateHandler, StateHolder};
pub use hook::{Chain, FnHook, NoopHook, TracingHook, TransitionHook, from_fn};
pub use listener::Listener;
pub use observable::Observable;
pub use stream::StateStream;
pub use subscription::{Subscription, SubscriptionId};
pub use transition::Transition;
