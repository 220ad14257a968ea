//! Integration test entry point

mod helpers;
mod test_bump;
mod test_changed;
mod test_checks;
mod test_graph;
mod test_release;
