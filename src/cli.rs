use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Yatube blogging site")]
pub struct Cli {
    #[arg(global = true, short, long, help = "Show debug messages")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(about = "Run the web server (default)")]
    Serve,
    #[command(about = "Create a group posts can be filed under")]
    CreateGroup {
        #[arg(long, help = "Human readable name, at most 200 characters", value_parser = parse_title)]
        title: String,

        #[arg(long, help = "URL identifier: letters, digits, hyphens and underscores", value_parser = parse_slug)]
        slug: String,

        #[arg(long, default_value = "", help = "Text shown on the group page")]
        description: String,
    },
}

fn parse_title(raw: &str) -> Result<String, String> {
    let title = raw.trim();
    if title.is_empty() {
        Err("title must not be empty".to_owned())
    } else if title.chars().count() > 200 {
        Err("title must be at most 200 characters".to_owned())
    } else {
        Ok(title.to_owned())
    }
}

fn parse_slug(raw: &str) -> Result<String, String> {
    let valid = !raw.is_empty()
        && raw.len() <= 50
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(raw.to_owned())
    } else {
        Err(format!(
            "{raw:?} is not a valid slug (letters, digits, hyphens or underscores, at most 50)"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::parse_from(["yatube"]);
        assert_eq!(cli.command, None);
        assert!(!cli.verbose);
    }

    #[test]
    fn create_group_arguments() {
        let cli = Cli::parse_from([
            "yatube",
            "create-group",
            "--title",
            "Cats",
            "--slug",
            "cats",
        ]);
        assert_eq!(
            cli.command,
            Some(Command::CreateGroup {
                title: "Cats".to_owned(),
                slug: "cats".to_owned(),
                description: String::new(),
            })
        );
    }

    #[test]
    fn slugs_are_checked() {
        assert!(parse_slug("test-slug_2").is_ok());
        assert!(parse_slug("").is_err());
        assert!(parse_slug("with space").is_err());
        assert!(parse_slug("slash/slug").is_err());
        assert!(parse_slug(&"s".repeat(51)).is_err());
        assert!(parse_title("  ").is_err());
    }
}
