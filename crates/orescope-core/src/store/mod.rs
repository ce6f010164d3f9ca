// ── Screening state store ──
//
// Filter, sort and pagination state with synchronous setters, plus the
// derived view computed from it.

mod screen_store;
mod state;
pub mod view;

pub use screen_store::ScreenStore;
pub use state::{FetchKey, ScreenState};
pub use view::ScreenView;
