use super::*;
use log::debug;

use crate::intents::Owner;

pub(super) async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> Result<()> {
    let user = match msg.from() {
        Some(user) => user.clone(),
        None => return Ok(()),
    };

    let text = match msg.text() {
        Some(text) => text.to_string(),
        None => return Ok(()),
    };

    let owner = owner_id(&user);
    debug!("message from {owner}: {text:?}");

    let replies = {
        let mut conversation = state.conversations.lock(owner).await;
        if let Some(cmd) = parse_command(&text) {
            let sender = Owner {
                id: owner,
                handle: user.username.as_deref(),
                display_name: &user.first_name,
            };
            let is_admin = state.config.is_admin(owner);
            intents::handle_command(&state.store, &mut conversation, &sender, cmd, is_admin).await?
        } else {
            intents::handle_text(&state.store, &mut conversation, owner, &text).await?
        }
    };

    deliver(&bot, msg.chat.id, None, replies).await
}
