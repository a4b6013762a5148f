//! Server-side session state for web request handlers.
//!
//! A [`SessionHook`] resolves the session identifier for a request, loads the
//! state from a pluggable [`SessionStorage`] backend, hands the handler a
//! [`SessionHandle`], and after the handler finishes saves the state and
//! applies any cookies or headers the layers beneath it asked for.  Storage
//! and exchanger never touch HTTP directly; they publish signals on the
//! `sk-events` bus and the hook collects them.

pub mod cookie;
pub mod exchanger;
pub mod handle;
pub mod hook;
pub mod manager;
pub mod serializer;
pub mod session;
pub mod storage;
pub mod surface;

pub use exchanger::{generate_token, HttpExchanger, IdentifierExchanger, TokenGenerator};
pub use handle::SessionHandle;
pub use hook::{OpenSession, SessionHook};
pub use manager::{SessionManager, SessionOptions};
pub use serializer::{JsonSerializer, SessionData, SessionSerializer};
pub use session::Session;
pub use storage::{
    CookieStorage, Expirable, FileStorage, MemoryStorage, RedisStorage, SessionStorage,
};
pub use surface::{RequestSurface, RequestView, ResponseSurface, ResponseView};
