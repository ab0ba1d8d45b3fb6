use tether_core::names::ContextId;
use tether_core::{Config, Context};

use crate::Backend;
use crate::handle::{Handle, HandleData};
use crate::logging;
use crate::ret::{RetResult, fail};

impl HandleData for Context<Backend> {
    const KIND: &'static str = "context";
}

/// Options for [`init_context`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub context_id: ContextId,
    pub config: Config,
    /// Contexts sharing a transport can talk to each other.
    pub transport: Backend,
    /// Install the global log subscriber if none is set yet.
    pub install_logging: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            context_id: 0,
            config: Config::default(),
            transport: Backend::default(),
            install_logging: true,
        }
    }
}

pub fn init_context(options: &InitOptions) -> RetResult<Handle> {
    if options.install_logging {
        logging::init();
    }
    let context = Context::new(
        options.context_id,
        options.transport.clone(),
        options.config.clone(),
    );
    tracing::info!(context_id = options.context_id, "context initialized");
    Ok(Handle::new(context))
}

/// Tear down a context. Entities created from it stay usable until they
/// are destroyed themselves.
pub fn shutdown_context(context: &mut Option<Handle>) -> RetResult {
    Handle::take::<Context<Backend>>(context).map_err(fail("shutdown_context"))?;
    Ok(())
}
