use poise::serenity_prelude as serenity;
use tracing::error;

use mooncrest_commands::interactions::handle_component;
use mooncrest_core::Data;

/// Route persistent buttons and select menus to their command module.
pub async fn handle_interaction(
    ctx: &serenity::Context,
    data: &Data,
    interaction: &serenity::Interaction,
) {
    let serenity::Interaction::Component(component) = interaction else {
        return;
    };

    if let Err(source) = handle_component(ctx, data, component).await {
        error!(
            ?source,
            custom_id = %component.data.custom_id,
            "component interaction failed"
        );

        let _ = component
            .create_response(
                &ctx.http,
                serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .ephemeral(true)
                        .content("Something went wrong while handling that."),
                ),
            )
            .await;
    }
}
