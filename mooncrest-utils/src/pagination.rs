use std::time::Duration;

use poise::serenity_prelude as serenity;

pub const PAGINATION_TIMEOUT_SECS: u64 = 60 * 3;

/// Session-scoped paginator state. Component ids are prefixed with the
/// invocation id so concurrent paginators never steal each other's presses.
struct PageView<'a> {
    title: &'a str,
    color: u32,
    pages: &'a [String],
    prefix: String,
    prev_id: String,
    jump_id: String,
    next_id: String,
}

impl<'a> PageView<'a> {
    fn new(ctx_id: u64, title: &'a str, color: u32, pages: &'a [String]) -> Self {
        let prefix = ctx_id.to_string();
        Self {
            title,
            color,
            pages,
            prev_id: format!("{prefix}_prev"),
            jump_id: format!("{prefix}_jump"),
            next_id: format!("{prefix}_next"),
            prefix,
        }
    }

    fn total(&self) -> usize {
        self.pages.len()
    }

    fn embed(&self, current: usize) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::new()
            .title(self.title.to_owned())
            .color(self.color)
            .description(self.pages[current].clone());

        if self.total() > 1 {
            embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
                "Page {}/{}",
                current + 1,
                self.total()
            )));
        }

        embed
    }

    fn components(&self, current: usize) -> Vec<serenity::CreateActionRow> {
        vec![serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new(&self.prev_id)
                .label("Prev")
                .disabled(current == 0)
                .style(serenity::ButtonStyle::Secondary),
            serenity::CreateButton::new(&self.jump_id)
                .label("Jump")
                .style(serenity::ButtonStyle::Secondary),
            serenity::CreateButton::new(&self.next_id)
                .label("Next")
                .disabled(current + 1 >= self.total())
                .style(serenity::ButtonStyle::Secondary),
        ])]
    }

    fn update(&self, current: usize) -> serenity::CreateInteractionResponse {
        serenity::CreateInteractionResponse::UpdateMessage(
            serenity::CreateInteractionResponseMessage::new()
                .embed(self.embed(current))
                .components(self.components(current)),
        )
    }
}

/// Send `pages` as one embed with Prev/Jump/Next buttons owned by the
/// invoking user. Buttons are dropped after [`PAGINATION_TIMEOUT_SECS`].
pub async fn paginate_embed_pages<U, E>(
    ctx: poise::Context<'_, U, E>,
    title: &str,
    color: u32,
    pages: &[String],
    start_page: usize,
) -> Result<(), serenity::Error>
where
    U: Send + Sync,
    E: Send + Sync,
{
    if pages.is_empty() {
        return Ok(());
    }

    let view = PageView::new(ctx.id(), title, color, pages);
    let mut current = start_page.clamp(1, view.total()) - 1;

    if view.total() == 1 {
        ctx.send(poise::CreateReply::default().embed(view.embed(current)))
            .await?;
        return Ok(());
    }

    let reply = ctx
        .send(
            poise::CreateReply::default()
                .embed(view.embed(current))
                .components(view.components(current)),
        )
        .await?;

    let message = reply.message().await?;
    let message_id = message.id;
    let channel_id = message.channel_id;
    let jump_modal_id = format!("{}_jump_modal", view.prefix);
    let jump_input_id = format!("{}_jump_input", view.prefix);

    while let Some(press) = serenity::collector::ComponentInteractionCollector::new(ctx)
        .filter({
            let prefix = view.prefix.clone();
            let author_id = ctx.author().id;
            move |interaction| {
                interaction.data.custom_id.starts_with(&prefix)
                    && interaction.user.id == author_id
                    && interaction.message.id == message_id
            }
        })
        .timeout(Duration::from_secs(PAGINATION_TIMEOUT_SECS))
        .await
    {
        let custom_id = press.data.custom_id.as_str();

        if custom_id == view.next_id || custom_id == view.prev_id {
            current = if custom_id == view.next_id {
                (current + 1).min(view.total() - 1)
            } else {
                current.saturating_sub(1)
            };

            press.create_response(ctx.http(), view.update(current)).await?;
            continue;
        }

        if custom_id != view.jump_id {
            continue;
        }

        press
            .create_response(
                ctx.http(),
                serenity::CreateInteractionResponse::Modal(
                    serenity::CreateModal::new(&jump_modal_id, "Jump to Page").components(vec![
                        serenity::CreateActionRow::InputText(
                            serenity::CreateInputText::new(
                                serenity::InputTextStyle::Short,
                                "Page Number",
                                &jump_input_id,
                            )
                            .placeholder(format!("1-{}", view.total()))
                            .required(true),
                        ),
                    ]),
                ),
            )
            .await?;

        let Some(modal) = serenity::collector::ModalInteractionCollector::new(ctx)
            .author_id(ctx.author().id)
            .channel_id(ctx.channel_id())
            .custom_ids(vec![jump_modal_id.clone()])
            .timeout(Duration::from_secs(PAGINATION_TIMEOUT_SECS))
            .await
        else {
            continue;
        };

        modal
            .create_response(ctx.http(), serenity::CreateInteractionResponse::Acknowledge)
            .await?;

        let submitted = modal
            .data
            .components
            .iter()
            .flat_map(|row| row.components.iter())
            .find_map(|component| match component {
                serenity::ActionRowComponent::InputText(input)
                    if input.custom_id == jump_input_id =>
                {
                    input.value.clone()
                }
                _ => None,
            });

        if let Some(target) = submitted.as_deref().and_then(|raw| parse_page_input(raw, view.total())) {
            current = target - 1;
            channel_id
                .edit_message(
                    ctx.http(),
                    message_id,
                    serenity::EditMessage::new()
                        .embed(view.embed(current))
                        .components(view.components(current)),
                )
                .await?;
        }
    }

    let _ = channel_id
        .edit_message(
            ctx.http(),
            message_id,
            serenity::EditMessage::new()
                .embed(view.embed(current))
                .components(vec![]),
        )
        .await;

    Ok(())
}

/// One-based page number from the jump modal, if it names an existing page.
fn parse_page_input(raw: &str, total: usize) -> Option<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|page| (1..=total).contains(page))
}

#[cfg(test)]
mod tests {
    use super::parse_page_input;

    #[test]
    fn jump_input_must_name_an_existing_page() {
        assert_eq!(parse_page_input(" 2 ", 3), Some(2));
        assert_eq!(parse_page_input("0", 3), None);
        assert_eq!(parse_page_input("4", 3), None);
        assert_eq!(parse_page_input("two", 3), None);
    }
}
