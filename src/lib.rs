// Crowdwatch: SOS alert console for crowd-management events
//
// This is the library root. Each module corresponds to one part of the
// notification and response loop.

pub mod api;
pub mod audio;
pub mod config;
pub mod console;
pub mod output;
pub mod sos;
