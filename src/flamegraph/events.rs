//! Notifications a flame graph sends to its host.

/// The main flame graph page
pub const PAGE_FLAMEGRAPH: &str = "flamegraph";
/// Drill-in view of one selected stack
pub const PAGE_STACK_DETAIL: &str = "stack_detail";
/// Table of recorded queries
pub const PAGE_QUERIES: &str = "queries";
/// Leave the tool
pub const PAGE_EXIT: &str = "exit";

/// Handlers the host provides to a flame graph view
pub trait FlameEvents {
    /// A frame was activated. `stack` runs from the root (exclusive) down to
    /// the frame, `count` is the frame's aggregate count.
    fn on_select(&mut self, stack: &[String], count: u64);

    /// The view asks the host to show another page
    fn on_switch_page(&mut self, target: &str);
}

/// Page to return to when the user backs out of a view opened from `source_page`
pub fn back_target(source_page: &str) -> &'static str {
    match source_page {
        PAGE_STACK_DETAIL => PAGE_FLAMEGRAPH,
        PAGE_QUERIES => PAGE_QUERIES,
        _ => PAGE_EXIT,
    }
}

/// Collects events for the host to apply after the view call returns
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventLog {
    pub selections: Vec<(Vec<String>, u64)>,
    pub page_switches: Vec<String>,
}

impl FlameEvents for EventLog {
    fn on_select(&mut self, stack: &[String], count: u64) {
        self.selections.push((stack.to_vec(), count));
    }

    fn on_switch_page(&mut self, target: &str) {
        self.page_switches.push(target.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_target() {
        assert_eq!(back_target(PAGE_STACK_DETAIL), PAGE_FLAMEGRAPH);
        assert_eq!(back_target(PAGE_QUERIES), PAGE_QUERIES);
        assert_eq!(back_target("command-line"), PAGE_EXIT);
        assert_eq!(back_target(""), PAGE_EXIT);
    }
}
