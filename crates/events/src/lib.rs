//! Synchronous signal bus connecting session components.
//!
//! Storage backends, identifier exchangers and sessions publish side-channel
//! signals (`setCookie`, `setHeader`, `destroy`) under their own
//! [`TargetId`].  Forward rules re-publish a signal under another target, so
//! a request hook can listen on a single session and still observe what the
//! layers beneath it raised.
//!
//! ```text
//! storage ──forward──┐
//!                    ├──▶ session target ──▶ scoped listeners (one request)
//! exchanger ─forward─┘
//! ```

pub mod bus;
pub mod federation;
pub mod listener;
pub mod scoped;
pub mod signal;
pub mod subscriptions;
pub mod target;

pub use bus::{Dispatcher, EventBus};
pub use federation::BusFederation;
pub use listener::{ListenerSpec, Runner, RunnerId};
pub use scoped::run_scoped;
pub use signal::{topics, CookieSignal, DestroySignal, HeaderSignal, Signal};
pub use subscriptions::SubscriptionSet;
pub use target::TargetId;
