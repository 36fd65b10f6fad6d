// SOS notification & response — detection, presentation, and dispatch.
//
// Data flow: poller (new SOS detected) -> audio engine + overlay ->
// operator -> dispatcher -> poller refresh -> overlay hides.

pub mod dispatcher;
pub mod overlay;
pub mod poller;
pub mod session;
