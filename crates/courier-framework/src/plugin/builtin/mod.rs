//! Built-in administrative plugins.
//!
//! Enabled by the `builtin` feature.
//!
//! | Plugin | Commands | Purpose |
//! |--------|----------|---------|
//! | [`ManagerPlugin`] | `/enable`, `/disable`, `/enable_chat`, `/disable_chat`, `/plugins` | Switch plugins on and off |
//! | [`AllowPlugin`] | `/allow`, `/deny` | Maintain the allow-list |
//!
//! Both plugins only answer administrators.
//!
//! ```rust,ignore
//! let store = Arc::new(EnablementStore::new(persistence));
//! let engine = Engine::builder()
//!     .enablement(Arc::clone(&store))
//!     .with_plugin(ManagerPlugin::new(store))?
//!     .with_plugin(AllowPlugin::new(allow_list))?
//!     .build(identity)?;
//! ```

pub mod allow;
pub mod manager;

pub use allow::AllowPlugin;
pub use manager::ManagerPlugin;
