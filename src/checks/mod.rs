//! Static checks: dependency ranges, layer verification, repository policy

pub mod layers;
pub mod policy;
pub mod ranges;
