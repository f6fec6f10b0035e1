//! # Courier
//!
//! A declarative update dispatch framework for chat bots.
//!
//! ## Overview
//!
//! Applications declare controllers: named groups of handler functions, each
//! with routes (a message pattern, a callback-data pattern or the fallback),
//! role requirements and parameter descriptors. Courier binds them to bot
//! identities at startup, routes every incoming update to at most one
//! handler and sends the handler's return value back as a reply.
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌──────────────────────────┐
//! │   Runtime    │────▶│ Dispatcher │────▶│ Handler (by priority,    │
//! │ (one runner  │     │ (per bot)  │     │ pattern and roles)       │
//! │  per bot)    │     └─────┬──────┘     └────────────┬─────────────┘
//! └──────▲───────┘           │ hooks                   │ return value
//!        │                   ▼                         ▼
//!   UpdateSource        UpdateHooks                 Sender
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! fn greeter() -> Controller {
//!     Controller::new("greeter").function(
//!         HandlerFunction::new("hello", |args: Arguments| async move {
//!             args.required_text(0).map(|name| format!("Hello, {name}!"))
//!         })
//!         .param(Param::string("name").group_index(1))
//!         .on_message(OnMessage::new(r"/hello (\w+)")),
//!     )
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = CourierRuntime::new();
//!     runtime.register_controller(greeter()).await;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//! - `http-client`: the Bot API long-polling transport

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::{CourierRuntime, CourierConfig, LoggingBuilder, SenderRegistry};

    // Declaring controllers and handlers
    pub use courier_framework::prelude::*;
    pub use courier_framework::{DispatchResult, IntoReply};

    // Payloads and identities
    pub use courier_core::{
        Button, Keyboard, OutgoingMessage, Principal, RoleSet, SimplePrincipal, Update, UserId,
    };
}
