use poise::serenity_prelude as serenity;

/// Embed color used when the community config does not set one.
pub const DEFAULT_EMBED_COLOR: u32 = 0x5B_6E_E1;

/// Color for failure replies.
pub const ERROR_EMBED_COLOR: u32 = 0xED_42_45;

pub fn error_embed(title: &str, description: impl Into<String>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title.to_owned())
        .description(description)
        .color(ERROR_EMBED_COLOR)
}

/// Build a paginated embed with an optional footer suffix.
pub fn build_paginated_embed(
    title: &str,
    description: impl Into<String>,
    color: u32,
    page: u64,
    total_pages: u64,
    footer_note: Option<&str>,
) -> serenity::CreateEmbed {
    let footer_text = paginated_footer(page, total_pages, footer_note);

    let builder = serenity::CreateEmbed::new()
        .title(title.to_owned())
        .color(color)
        .description(description);

    if footer_text.is_empty() {
        builder
    } else {
        builder.footer(serenity::CreateEmbedFooter::new(footer_text))
    }
}

fn paginated_footer(page: u64, total_pages: u64, footer_note: Option<&str>) -> String {
    let page = page.max(1);
    let total_pages = total_pages.max(1);
    let note = footer_note.filter(|note| !note.is_empty());

    match (total_pages > 1, note) {
        (true, Some(note)) => format!("Page {page}/{total_pages} • {note}"),
        (true, None) => format!("Page {page}/{total_pages}"),
        (false, Some(note)) => note.to_owned(),
        (false, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::paginated_footer;

    #[test]
    fn footer_only_shows_pages_when_there_is_more_than_one() {
        assert_eq!(paginated_footer(2, 3, Some("Points")), "Page 2/3 • Points");
        assert_eq!(paginated_footer(1, 1, Some("Points")), "Points");
        assert_eq!(paginated_footer(0, 0, None), "");
        assert_eq!(paginated_footer(1, 4, Some("")), "Page 1/4");
    }
}
