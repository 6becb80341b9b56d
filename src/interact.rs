//! User interaction and host-context collaborators.

use dialoguer::Input;
use tracing::info;

/// Prompt and message surface.
///
/// A dismissed prompt returns `None`, and only the flow that issued the
/// prompt observes that cancellation; nothing else is interrupted.
pub trait UserInteraction: Send + Sync {
    /// Asks for one line of input. `placeholder` is a hint appended to the
    /// prompt, `initial` pre-fills the answer.
    fn input(&self, prompt: &str, placeholder: Option<&str>, initial: Option<&str>)
        -> Option<String>;

    /// Shows an informational (non-error) message.
    fn info(&self, message: &str);
}

/// Terminal prompts via dialoguer.
pub struct DialoguerInteraction;

impl UserInteraction for DialoguerInteraction {
    fn input(
        &self,
        prompt: &str,
        placeholder: Option<&str>,
        initial: Option<&str>,
    ) -> Option<String> {
        let prompt = match placeholder {
            Some(placeholder) => format!("{prompt} {placeholder}"),
            None => prompt.to_string(),
        };
        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(initial) = initial {
            input = input.with_initial_text(initial);
        }
        input.interact_text().ok()
    }

    fn info(&self, message: &str) {
        println!("{message}");
    }
}

/// Host flags backing menu-visibility conditionals.
pub trait HostContext: Send + Sync {
    fn set_flag(&self, key: &str, value: bool);
}

/// Default host: records the flag in the log only.
pub struct LoggingHostContext;

impl HostContext for LoggingHostContext {
    fn set_flag(&self, key: &str, value: bool) {
        info!(key, value, "host context flag");
    }
}
