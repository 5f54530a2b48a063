//! `robonui-middleware` – The Nervous System
//!
//! Routes values from producers to consumers without caring about their
//! meaning.
//!
//! # Modules
//!
//! - [`bus`] – the publish/subscribe primitives: [`Consumer`],
//!   [`Provider`], the [`Publisher`] wiring interface and the
//!   [`ProviderConsumer`] combinator for pipeline stages that both receive
//!   and re-publish.

pub mod bus;

pub use bus::{Consumer, Provider, ProviderConsumer, Publisher};
