pub mod color;
pub mod events;
pub mod ingest;
pub mod layout;
pub mod loader;
pub mod tree;
mod view;

pub use events::{EventLog, FlameEvents};
pub use ingest::{StackRow, ingest_rows, ingest_text, parse_folded_line, tree_from_text};
pub use layout::{Direction, FrameLayout, RenderedFrame};
pub use loader::{TreeLoader, TreeUpdate};
pub use tree::{Frame, FrameId, FrameTree};
pub use view::{DOUBLE_CLICK_WINDOW, FlameGraphView};
