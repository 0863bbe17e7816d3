use poise::serenity_prelude as serenity;

use mooncrest_core::{Context, Data, Error};
use mooncrest_database::impls::users::leaderboard_page;
use mooncrest_leveling::{LeaderboardEntry, LeaderboardKind, PagePlan};
use mooncrest_utils::embed::build_paginated_embed;

use crate::CommandMeta;
use crate::points::POINTS_NAME;
use crate::replies::{escape_markdown, usage_message};

pub const META: CommandMeta = CommandMeta {
    name: "leaderboard",
    desc: "Show the Lunar Points or expeditions leaderboard.",
    category: "profile",
    usage: "!leaderboard [points|expeditions] [page]",
};

pub const LEADERBOARD_PAGE_SIZE: u64 = 10;

/// Custom id prefix of the persistent leaderboard buttons.
pub const BUTTON_PREFIX: &str = "lb";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaderboardNav {
    Prev,
    Next,
    Switch,
}

impl LeaderboardNav {
    fn as_str(self) -> &'static str {
        match self {
            LeaderboardNav::Prev => "prev",
            LeaderboardNav::Next => "next",
            LeaderboardNav::Switch => "switch",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "prev" => Some(LeaderboardNav::Prev),
            "next" => Some(LeaderboardNav::Next),
            "switch" => Some(LeaderboardNav::Switch),
            _ => None,
        }
    }

    /// Board shown after pressing this button on `page` of `kind`.
    pub fn destination(self, kind: LeaderboardKind, page: i64) -> (LeaderboardKind, i64) {
        match self {
            LeaderboardNav::Prev => (kind, page.saturating_sub(1).max(1)),
            LeaderboardNav::Next => (kind, page.saturating_add(1)),
            LeaderboardNav::Switch => (kind.other(), 1),
        }
    }
}

/// `lb:<action>:<kind>:<page>`, where `page` is the page the button sits on.
pub fn button_id(nav: LeaderboardNav, kind: LeaderboardKind, page: u64) -> String {
    format!("{BUTTON_PREFIX}:{}:{}:{page}", nav.as_str(), kind.as_str())
}

pub fn parse_button_id(custom_id: &str) -> Option<(LeaderboardNav, LeaderboardKind, i64)> {
    let mut parts = custom_id.split(':');
    if parts.next()? != BUTTON_PREFIX {
        return None;
    }
    let nav = LeaderboardNav::parse(parts.next()?)?;
    let kind = parts.next()?.parse::<LeaderboardKind>().ok()?;
    let page = parts.next()?.parse::<i64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((nav, kind, page))
}

fn unit(kind: LeaderboardKind) -> &'static str {
    match kind {
        LeaderboardKind::Points => POINTS_NAME,
        LeaderboardKind::Expeditions => "Expeditions",
    }
}

/// `**#rank** - **name** → value Unit`
pub fn entry_line(rank: u64, entry: &LeaderboardEntry, kind: LeaderboardKind) -> String {
    format!(
        "**#{rank}** - **{}** → {} {}",
        escape_markdown(&entry.display_name),
        entry.sort_value,
        unit(kind)
    )
}

fn page_description(entries: &[LeaderboardEntry], plan: &PagePlan, kind: LeaderboardKind) -> String {
    if entries.is_empty() {
        return "No climbers on the leaderboard yet.".to_owned();
    }

    entries
        .iter()
        .zip(plan.first_rank()..)
        .map(|(entry, rank)| entry_line(rank, entry, kind))
        .collect::<Vec<_>>()
        .join("\n")
}

fn nav_buttons(kind: LeaderboardKind, plan: &PagePlan) -> serenity::CreateActionRow {
    let page = plan.page_number;
    serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(button_id(LeaderboardNav::Prev, kind, page))
            .label("Prev")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(plan.is_first()),
        serenity::CreateButton::new(button_id(LeaderboardNav::Next, kind, page))
            .label("Next")
            .style(serenity::ButtonStyle::Secondary)
            .disabled(plan.is_last()),
        serenity::CreateButton::new(button_id(LeaderboardNav::Switch, kind, page))
            .label(format!("Show {}", kind.other().title()))
            .style(serenity::ButtonStyle::Primary),
    ])
}

pub struct LeaderboardView {
    pub embed: serenity::CreateEmbed,
    pub components: Vec<serenity::CreateActionRow>,
}

/// Render one page, clamping `page` into range.
pub async fn render_leaderboard(
    data: &Data,
    kind: LeaderboardKind,
    page: i64,
) -> anyhow::Result<LeaderboardView> {
    let page = leaderboard_page(&data.db, kind, page, LEADERBOARD_PAGE_SIZE).await?;

    let embed = build_paginated_embed(
        &format!("🏆 {} Leaderboard", kind.title()),
        page_description(&page.entries, &page.plan, kind),
        data.config.embed_color,
        page.plan.page_number,
        page.plan.total_pages,
        None,
    );

    Ok(LeaderboardView {
        embed,
        components: vec![nav_buttons(kind, &page.plan)],
    })
}

#[poise::command(prefix_command, slash_command, category = "Profile")]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "points or expeditions"] kind: Option<String>,
    #[description = "Page number"] page: Option<i64>,
) -> Result<(), Error> {
    let kind = match kind.as_deref() {
        None => LeaderboardKind::Points,
        Some(raw) => match raw.parse::<LeaderboardKind>() {
            Ok(kind) => kind,
            Err(_) => {
                ctx.say(usage_message(META.usage)).await?;
                return Ok(());
            }
        },
    };

    ctx.defer().await?;

    let view = render_leaderboard(ctx.data(), kind, page.unwrap_or(1)).await?;
    ctx.send(
        poise::CreateReply::default()
            .embed(view.embed)
            .components(view.components),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_leveling::{LeaderboardEntry, LeaderboardKind, PagePlan};

    use super::{LeaderboardNav, button_id, entry_line, page_description, parse_button_id};

    fn entry(name: &str, value: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            display_name: name.to_owned(),
            sort_value: value,
        }
    }

    #[test]
    fn button_ids_parse_back() {
        let id = button_id(LeaderboardNav::Next, LeaderboardKind::Expeditions, 3);
        assert_eq!(id, "lb:next:expeditions:3");
        assert_eq!(
            parse_button_id(&id),
            Some((LeaderboardNav::Next, LeaderboardKind::Expeditions, 3))
        );
    }

    #[test]
    fn foreign_ids_are_ignored() {
        assert_eq!(parse_button_id("reward:add:1"), None);
        assert_eq!(parse_button_id("lb:jump:points:1"), None);
        assert_eq!(parse_button_id("lb:next:points:1:extra"), None);
        assert_eq!(parse_button_id("lb:next:points"), None);
    }

    #[test]
    fn navigation_moves_and_switches() {
        assert_eq!(
            LeaderboardNav::Prev.destination(LeaderboardKind::Points, 1),
            (LeaderboardKind::Points, 1)
        );
        assert_eq!(
            LeaderboardNav::Next.destination(LeaderboardKind::Points, 2),
            (LeaderboardKind::Points, 3)
        );
        assert_eq!(
            LeaderboardNav::Switch.destination(LeaderboardKind::Points, 7),
            (LeaderboardKind::Expeditions, 1)
        );
    }

    #[test]
    fn lines_are_ranked_from_the_page_offset() {
        let plan = PagePlan::new(2, 2, 5).unwrap();
        let text = page_description(
            &[entry("luna", 90), entry("sol", 80)],
            &plan,
            LeaderboardKind::Points,
        );

        assert_eq!(
            text,
            "**#3** - **luna** → 90 Lunar Points\n**#4** - **sol** → 80 Lunar Points"
        );
    }

    #[test]
    fn names_are_escaped() {
        assert_eq!(
            entry_line(1, &entry("moon_walker", 4), LeaderboardKind::Expeditions),
            "**#1** - **moon\\_walker** → 4 Expeditions"
        );
    }
}
