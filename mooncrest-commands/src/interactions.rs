//! Routing for persistent message components. Buttons and menus owned by a
//! running collector (help pages, confirmations) are not routed here.

use poise::serenity_prelude as serenity;
use tracing::debug;

use mooncrest_core::Data;

use crate::profile::leaderboard::{self, parse_button_id, render_leaderboard};
use crate::rewards::{self, handle_reward_select};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ComponentRoute {
    Leaderboard,
    Reward,
}

fn route(custom_id: &str) -> Option<ComponentRoute> {
    let (prefix, _) = custom_id.split_once(':')?;
    if prefix == leaderboard::BUTTON_PREFIX {
        Some(ComponentRoute::Leaderboard)
    } else if prefix == rewards::SELECT_PREFIX {
        Some(ComponentRoute::Reward)
    } else {
        None
    }
}

/// Returns `false` when the component belongs to someone else.
pub async fn handle_component(
    ctx: &serenity::Context,
    data: &Data,
    interaction: &serenity::ComponentInteraction,
) -> anyhow::Result<bool> {
    let Some(target) = route(&interaction.data.custom_id) else {
        return Ok(false);
    };

    debug!(
        custom_id = %interaction.data.custom_id,
        user_id = interaction.user.id.get(),
        "routing component interaction"
    );

    match target {
        ComponentRoute::Leaderboard => handle_leaderboard_button(ctx, data, interaction).await?,
        ComponentRoute::Reward => handle_reward_select(ctx, data, interaction).await?,
    }

    Ok(true)
}

async fn handle_leaderboard_button(
    ctx: &serenity::Context,
    data: &Data,
    interaction: &serenity::ComponentInteraction,
) -> anyhow::Result<()> {
    let Some((nav, kind, page)) = parse_button_id(&interaction.data.custom_id) else {
        return Ok(());
    };

    let (kind, page) = nav.destination(kind, page);
    let view = render_leaderboard(data, kind, page).await?;

    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .embed(view.embed)
                    .components(view.components),
            ),
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ComponentRoute, route};

    #[test]
    fn routes_by_prefix() {
        assert_eq!(route("lb:next:points:1"), Some(ComponentRoute::Leaderboard));
        assert_eq!(route("reward:add:42"), Some(ComponentRoute::Reward));
        assert_eq!(route("1234_confirm"), None);
        assert_eq!(route("lbx:next"), None);
    }
}
