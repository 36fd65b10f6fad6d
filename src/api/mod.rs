// Crowd-management API — the external system that owns alert persistence.
//
// The console never mutates alerts locally. Everything it knows comes from
// snapshots fetched through `client::AlertApi`, and every operator decision
// is submitted back through the same trait.

pub mod client;
pub mod models;
