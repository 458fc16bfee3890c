use crate::config::Config;
use anyhow::{Context, Result};

pub mod args;
pub mod progress;
pub mod prompt;
pub mod submit;

pub use args::{Cli, CliCommand, ConfigCliArgs, ConfigCommand, SubmitCliArgs};
pub use submit::handle_submit_command;

pub fn handle_config_command(args: ConfigCliArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", Config::config_path()?.display());
        }
        ConfigCommand::Show => {
            let mut config = Config::load()?;
            config.channel.api_key = config.channel.api_key.as_deref().map(mask_secret);
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
    }
    Ok(())
}

fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 2..].iter().collect();
        format!("{prefix}****{suffix}")
    } else {
        "*".repeat(chars.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcd.efgh:ijklmnop"), "abcd****op");
        assert_eq!(mask_secret("short"), "*****");
        assert_eq!(mask_secret(""), "");
    }
}
