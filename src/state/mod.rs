// Run context and report states

pub mod app_state;
pub mod summary_state;

pub use app_state::{SummaryContext, WrittenPlots};
pub use summary_state::SummaryState;
