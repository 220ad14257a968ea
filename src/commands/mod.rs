//! Command implementations, one module per subcommand family

mod bump;
mod changed;
mod check;
mod list;
mod release;

pub use bump::{run_bump, run_bump_deps};
pub use changed::run_changed;
pub use check::{run_check_layers, run_check_policy, run_check_ranges};
pub use list::{build_criteria, run_list, run_list_groups, run_list_installed};
pub use release::run_release;
