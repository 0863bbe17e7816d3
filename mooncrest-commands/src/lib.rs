pub mod access;
pub mod admin;
pub mod interactions;
pub mod linking;
pub mod points;
pub mod profile;
pub mod ranks;
pub mod replies;
pub mod rewards;
pub mod utility;

use mooncrest_core::{Data, Error};

pub struct CommandMeta {
    pub name: &'static str,
    pub desc: &'static str,
    pub category: &'static str,
    pub usage: &'static str,
}

pub const COMMANDS: &[CommandMeta] = &[
    utility::ping::META,
    utility::help::META,
    utility::usage::META,
    points::xp::META,
    points::xpd::META,
    points::batch::META,
    points::expo::META,
    points::expo::MEMBER_META,
    points::summit::META,
    points::summit::MEMBER_META,
    points::department::GUIDE_META,
    points::department::SAR_META,
    profile::rank::META,
    profile::deptrank::META,
    profile::leaderboard::META,
    profile::stats::META,
    profile::halloffame::META,
    rewards::reward::META,
    rewards::listreward::META,
    linking::verify::META,
    linking::unverify::META,
    linking::getrole::META,
    linking::link::META,
    admin::sync::META,
    admin::aitoggle::META,
];

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        utility::ping::ping(),
        utility::help::help(),
        utility::usage::usage(),
        points::xp::xp(),
        points::xpd::xpd(),
        points::batch::batch(),
        points::expo::expo(),
        points::expo::expod(),
        points::summit::summit(),
        points::summit::summitd(),
        points::department::guide(),
        points::department::sar(),
        profile::rank::rank(),
        profile::deptrank::deptrank(),
        profile::leaderboard::leaderboard(),
        profile::stats::stats(),
        profile::halloffame::halloffame(),
        rewards::reward::reward(),
        rewards::listreward::listreward(),
        linking::verify::verify(),
        linking::unverify::unverify(),
        linking::getrole::getrole(),
        linking::link::link(),
        admin::sync::sync(),
        admin::aitoggle::aitoggle(),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{COMMANDS, commands};

    #[test]
    fn every_command_has_unique_meta() {
        let names: BTreeSet<&str> = COMMANDS.iter().map(|meta| meta.name).collect();
        assert_eq!(names.len(), COMMANDS.len());

        for meta in COMMANDS {
            assert!(meta.usage.starts_with(&format!("!{}", meta.name)), "{}", meta.name);
        }
    }

    #[test]
    fn registered_commands_match_meta() {
        let registered: BTreeSet<String> = commands().into_iter().map(|cmd| cmd.name).collect();
        let listed: BTreeSet<String> = COMMANDS.iter().map(|meta| meta.name.to_owned()).collect();
        assert_eq!(registered, listed);
    }
}
