// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::{Args, ValueEnum};
use std::process::Command;
use tracing::warn;

use super::output::acurast_color;
use crate::config::{NetworkConfig, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Website {
    Console,
    Docs,
    Faucet,
    Explorer,
    TelegramBot,
    TelegramGroup,
    Discord,
}

impl Website {
    pub const ALL: [Website; 7] = [
        Website::Console,
        Website::Docs,
        Website::Faucet,
        Website::Explorer,
        Website::TelegramBot,
        Website::TelegramGroup,
        Website::Discord,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Website::Console => "Web Console",
            Website::Docs => "Acurast Documentation",
            Website::Faucet => "Get some cACU to get started",
            Website::Explorer => "Acurast Network Explorer",
            Website::TelegramBot => "Telegram Bot to get notified about processor and job changes",
            Website::TelegramGroup => "Telegram Group for the latest updates and community",
            Website::Discord => "Discord Group for the latest updates and community",
        }
    }

    pub fn url(&self, network: &NetworkConfig) -> String {
        let links = &network.links;
        match self {
            Website::Console => links.console.clone(),
            Website::Docs => links.docs.clone(),
            Website::Faucet => links.faucet.clone(),
            Website::Explorer => links.explorer.clone(),
            Website::TelegramBot => links.telegram_bot.clone(),
            Website::TelegramGroup => links.telegram_group.clone(),
            Website::Discord => links.discord.clone(),
        }
    }

    fn name(&self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default()
    }
}

/// Arguments for the open command
#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Website to open; lists all websites when omitted
    #[arg(value_enum)]
    pub target: Option<Website>,
}

pub fn run(settings: &Settings, args: OpenArgs) -> Result<()> {
    let Some(target) = args.target else {
        println!("Which website do you want to open?");
        for website in Website::ALL {
            println!(
                "  {:<15} {} ({})",
                acurast_color(&website.name()),
                website.description(),
                website.url(&settings.network)
            );
        }
        println!();
        println!("Run \"acurast open <website>\" to open it in your browser.");
        return Ok(());
    };

    let url = target.url(&settings.network);
    println!("Opening {} in browser...", url);
    if let Err(e) = open_browser(&url) {
        warn!("Failed to open browser: {}", e);
        println!("Could not open a browser, visit {} manually.", url);
    }
    Ok(())
}

fn open_browser(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };
    command.arg(url).spawn().map(|_| ())
}
