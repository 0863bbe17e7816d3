use crate::CommandMeta;

pub fn unknown_category_message(wanted_category: &str, valid_categories: &[&str]) -> String {
    let valid = valid_categories
        .iter()
        .map(|category| display_category(category))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Unknown category: {}\nValid categories: {}",
        display_category(wanted_category),
        valid
    )
}

pub fn page_out_of_range_message(requested_page: usize, total_pages: usize) -> String {
    format!("Page {requested_page} does not exist. Available pages: 1-{total_pages}.")
}

/// Commands grouped under bold category headings, in the order given.
pub fn grouped_help_description(commands: &[&CommandMeta]) -> String {
    let mut out = String::new();
    let mut current_category: Option<&str> = None;

    for command in commands {
        if current_category != Some(command.category) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("**{}**\n", display_category(command.category)));
            current_category = Some(command.category);
        }

        out.push_str(&format!("`{}`: {}\n", command.name, command.desc));
    }

    if out.is_empty() {
        out.push_str("No commands available.");
    }

    out.trim_end().to_owned()
}

pub fn display_category(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{display_category, grouped_help_description};
    use crate::CommandMeta;

    const A: CommandMeta = CommandMeta {
        name: "rank",
        desc: "Show a profile.",
        category: "profile",
        usage: "!rank",
    };
    const B: CommandMeta = CommandMeta {
        name: "xp",
        desc: "Edit points.",
        category: "points",
        usage: "!xp",
    };

    #[test]
    fn groups_under_headings() {
        let text = grouped_help_description(&[&B, &A]);
        assert_eq!(
            text,
            "**Points**\n`xp`: Edit points.\n\n**Profile**\n`rank`: Show a profile."
        );
    }

    #[test]
    fn empty_list_says_so() {
        assert_eq!(grouped_help_description(&[]), "No commands available.");
        assert_eq!(display_category(""), "");
    }
}
