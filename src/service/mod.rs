//! # QR Service
//!
//! The HTTP layer around the rate limiter.
//!
//! ```text
//!     service/
//!     ├── mod.rs          (Module organization)
//!     ├── settings.rs     (Environment settings)
//!     ├── identity.rs     (Client identity from headers / peer)
//!     ├── query.rs        (Query argument validation)
//!     ├── render.rs       (QR encoding and PNG output)
//!     └── handler.rs      (Router and request handler)
//! ```

mod handler;
mod identity;
mod query;
mod render;
mod settings;

pub use handler::{router, AppState};
pub use identity::ClientIdentity;
pub use query::{ArgumentError, QrOptions};
pub use render::{data_url, render_png, render_png_blocking, RenderError, MAX_IMAGE_SIDE};
pub use settings::{Settings, SettingsError};
