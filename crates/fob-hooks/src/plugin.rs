//! Compiler plugins.

use crate::compiler::Compiler;
use crate::error::Result;

/// A plugin taps into compiler hooks when applied.
///
/// Plugins are applied in the order they are handed to
/// [`Compiler::apply_plugins`]; a plugin that needs to observe another
/// plugin's taps must come after it.
pub trait Plugin: Send + Sync {
    /// Name used for the plugin's taps.
    fn name(&self) -> &'static str;

    fn apply(&self, compiler: &Compiler) -> Result<()>;
}
