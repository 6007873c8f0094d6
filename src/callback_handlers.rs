use super::*;
use log::debug;

pub(super) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> Result<()> {
    // Acknowledge first so the client stops its spinner even if we fail below.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.message.clone() else {
        return Ok(());
    };
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let owner = owner_id(&q.from);
    debug!("callback from {owner}: {data}");

    let replies = {
        let mut conversation = state.conversations.lock(owner).await;
        intents::handle_callback(&state.store, &mut conversation, owner, data).await?
    };

    deliver(&bot, message.chat.id, Some(message.id), replies).await
}
