//! Model backends for the routing fabric.
//!
//! Every backend implements [`Provider`]; the fabric builds them through a
//! [`ProviderFactory`], normally the statically assembled [`ProviderRegistry`].
//! Clients are blocking because fabric calls are synchronous.

pub mod claude;
pub mod google;
mod http;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod registry;
pub mod types;

pub use provider::Provider;
pub use registry::{ProviderConstructor, ProviderFactory, ProviderRegistry};
pub use types::{ChatMessage, GenerateResult};
