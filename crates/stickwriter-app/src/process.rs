//! Message processing
//!
//! Runs a message and its follow-ups through the TEA update function,
//! dispatching every resulting action.

use stickwriter_backend::Backend;
use stickwriter_core::prelude::*;

use crate::actions::{handle_action, ActionContext};
use crate::handler;
use crate::message::Message;
use crate::state::AppState;

/// Process a message through the TEA update function
pub fn process_message<B>(state: &mut AppState, message: Message, ctx: &ActionContext<B>)
where
    B: Backend + Sync + 'static,
{
    let mut msg = Some(message);
    while let Some(m) = msg {
        let result = handler::update(state, m);

        if let Some(action) = result.action {
            trace!("Dispatching {:?}", action);
            handle_action(action, ctx);
        }

        // Continue with follow-up message
        msg = result.message;
    }
}
