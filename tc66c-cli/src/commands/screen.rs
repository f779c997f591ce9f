//! Screen control command implementation.

use anyhow::Result;
use console::style;

use crate::config::Config;
use crate::{Cli, ScreenAction, get_port};

/// Screen command implementation.
pub(crate) fn cmd_screen(cli: &Cli, config: &mut Config, action: ScreenAction) -> Result<()> {
    let port = get_port(cli, config)?;
    let mut meter = super::connect_meter(cli, &port)?;

    let result = match action {
        ScreenAction::Prev => meter.previous_page(),
        ScreenAction::Next => meter.next_page(),
        ScreenAction::Rotate => meter.rotate_screen(),
    };
    let _ = meter.close();
    result?;

    if !cli.quiet {
        eprintln!("{} {}", style("✓").green(), action_message(action));
    }

    Ok(())
}

fn action_message(action: ScreenAction) -> &'static str {
    match action {
        ScreenAction::Prev => "switched to previous page",
        ScreenAction::Next => "switched to next page",
        ScreenAction::Rotate => "rotated display",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_messages() {
        assert_eq!(action_message(ScreenAction::Prev), "switched to previous page");
        assert_eq!(action_message(ScreenAction::Next), "switched to next page");
        assert_eq!(action_message(ScreenAction::Rotate), "rotated display");
    }
}
