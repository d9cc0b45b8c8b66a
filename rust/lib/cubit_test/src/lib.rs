//! Test helpers for cubits.
//!
//! - [`CubitTest`] — build a cubit, optionally seed it, act on it, and check
//!   the states it emitted (and the errors `act` returned).
//! - [`StateRecorder`] — record every state a cubit delivers.
//!
//! ```ignore
//! CubitTest::new(|| Cubit::new(0u32))
//!     .act(|c| {
//!         c.emit(1)?;
//!         c.emit(2)
//!     })
//!     .expect(vec![1, 2])
//!     .run()
//!     .unwrap();
//! ```

pub mod error;
pub mod recorder;
pub mod scenario;

pub use error::CubitTestError;
pub use recorder::StateRecorder;
pub use scenario::CubitTest;
