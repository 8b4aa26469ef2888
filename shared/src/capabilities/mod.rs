// Outbound HTTP goes through crux_http; the shell performs the request and
// resolves it with a `crux_http::protocol::HttpResponse`.
pub use crux_http::Http;

// We use Crux's built-in Render capability directly because it provides
// all necessary functionality for triggering view updates.
pub use crux_core::render::Render;

use crate::Event;

/// Outcome of a chat completion call, as delivered back to the app.
pub type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

#[derive(crux_core::macros::Effect)]
#[effect(app = "crate::app::App")]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}
