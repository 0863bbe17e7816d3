use std::time::Duration;

use poise::serenity_prelude as serenity;

pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Ask the invoking user to confirm a bulk operation.
///
/// Returns the confirming interaction, already acknowledged with
/// `processing_text`, or `None` after a decline or timeout; in both of those
/// cases the prompt is edited to say so and its buttons are removed.
pub async fn confirm_bulk_action<U, E>(
    ctx: poise::Context<'_, U, E>,
    prompt: serenity::CreateEmbed,
    processing_text: &str,
) -> Result<Option<serenity::ComponentInteraction>, serenity::Error>
where
    U: Send + Sync,
    E: Send + Sync,
{
    let ctx_id = ctx.id();
    let confirm_id = format!("{ctx_id}_confirm");
    let decline_id = format!("{ctx_id}_decline");

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(prompt)
                .components(vec![serenity::CreateActionRow::Buttons(vec![
                    serenity::CreateButton::new(&confirm_id)
                        .label("Confirm")
                        .style(serenity::ButtonStyle::Primary),
                    serenity::CreateButton::new(&decline_id)
                        .label("Cancel")
                        .style(serenity::ButtonStyle::Secondary),
                ])]),
        )
        .await?;

    let message = reply.message().await?.into_owned();
    let Some(interaction) = message
        .await_component_interaction(ctx)
        .author_id(ctx.author().id)
        .timeout(CONFIRMATION_TIMEOUT)
        .await
    else {
        message
            .channel_id
            .edit_message(
                ctx.http(),
                message.id,
                serenity::EditMessage::new()
                    .content("Timed out, nothing was changed.")
                    .embeds(vec![])
                    .components(vec![]),
            )
            .await?;
        return Ok(None);
    };

    let confirmed = interaction.data.custom_id == confirm_id;
    let content = if confirmed {
        processing_text
    } else {
        "Cancelled, nothing was changed."
    };

    interaction
        .create_response(
            ctx.http(),
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .embeds(vec![])
                    .components(vec![]),
            ),
        )
        .await?;

    Ok(confirmed.then_some(interaction))
}
