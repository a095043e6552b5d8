// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use warden_app::{AccountAction, Intent, PayoutAction, SortOrder, UserId, ViewKind};

pub const HELP_TEXT: &str = "\
commands:
  overview | users | online [minutes]   switch view
  search [term] [--order recent|balance|usage|name]
  next | prev                           page through users
  select <uid>                          load user detail
  refresh                               reload the active view
  add <uid> <delta>                     adjust balance
  set <uid> <amount>                    set balance
  reset-balance <uid> | reset-usage <uid>
  payout preview <uid> | payout create <uid> <amount> | payout confirm <uid>
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Blank,
    Help,
    Intents(Vec<Intent>),
}

impl Command {
    fn one(intent: Intent) -> Self {
        Self::Intents(vec![intent])
    }
}

pub fn parse_command(line: &str) -> Result<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, rest)) = words.split_first() else {
        return Ok(Command::Blank);
    };

    let command = match head {
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::one(Intent::Quit),
        "refresh" | "r" => Command::one(Intent::Refresh),
        "next" | "n" => Command::one(Intent::NextPage),
        "prev" | "p" => Command::one(Intent::PrevPage),
        "overview" => Command::one(Intent::ShowView(ViewKind::Overview)),
        "users" => Command::one(Intent::ShowView(ViewKind::Users)),
        "online" => match rest {
            [] => Command::one(Intent::ShowView(ViewKind::Online)),
            [minutes] => {
                let minutes: u32 = minutes
                    .parse()
                    .with_context(|| format!("online window must be whole minutes, got {minutes:?}"))?;
                if minutes == 0 {
                    bail!("online window must be at least one minute");
                }
                Command::Intents(vec![
                    Intent::SetOnlineWindow(minutes),
                    Intent::ShowView(ViewKind::Online),
                ])
            }
            _ => bail!("usage: online [minutes]"),
        },
        "search" | "s" => parse_search(rest)?,
        "select" => Command::one(Intent::Select(single_uid(head, rest)?)),
        "add" => {
            let (uid, delta) = uid_and_amount(head, rest)?;
            Command::one(Intent::Account(AccountAction::AdjustBalance { uid, delta }))
        }
        "set" => {
            let (uid, balance) = uid_and_amount(head, rest)?;
            Command::one(Intent::Account(AccountAction::SetBalance { uid, balance }))
        }
        "reset-balance" => Command::one(Intent::Account(AccountAction::ResetBalance(
            single_uid(head, rest)?,
        ))),
        "reset-usage" => Command::one(Intent::Account(AccountAction::ResetUsage(single_uid(
            head, rest,
        )?))),
        "payout" => Command::one(Intent::Payout(parse_payout(rest)?)),
        other => bail!("unknown command {other:?}; type `help` for the list"),
    };
    Ok(command)
}

fn parse_search(rest: &[&str]) -> Result<Command> {
    let mut terms = Vec::new();
    let mut order = None;
    let mut words = rest.iter();
    while let Some(word) = words.next() {
        if *word == "--order" {
            let Some(value) = words.next() else {
                bail!("--order requires a value");
            };
            let Some(parsed) = SortOrder::parse(value) else {
                bail!("unknown order {value:?}; use recent, balance, usage, or name");
            };
            order = Some(parsed);
        } else {
            terms.push(*word);
        }
    }
    Ok(Command::one(Intent::Search {
        term: terms.join(" "),
        order,
    }))
}

fn parse_payout(rest: &[&str]) -> Result<PayoutAction> {
    match rest {
        ["preview", uid] => Ok(PayoutAction::Preview(UserId::new(*uid))),
        ["create", uid, amount] => Ok(PayoutAction::Create {
            uid: UserId::new(*uid),
            amount: parse_amount(amount)?,
        }),
        ["confirm", uid] => Ok(PayoutAction::Confirm(UserId::new(*uid))),
        _ => bail!("usage: payout preview <uid> | payout create <uid> <amount> | payout confirm <uid>"),
    }
}

fn single_uid(command: &str, rest: &[&str]) -> Result<UserId> {
    match rest {
        [uid] => Ok(UserId::new(*uid)),
        _ => bail!("usage: {command} <uid>"),
    }
}

fn uid_and_amount(command: &str, rest: &[&str]) -> Result<(UserId, f64)> {
    match rest {
        [uid, amount] => Ok((UserId::new(*uid), parse_amount(amount)?)),
        _ => bail!("usage: {command} <uid> <amount>"),
    }
}

fn parse_amount(raw: &str) -> Result<f64> {
    let amount: f64 = raw
        .parse()
        .with_context(|| format!("amount must be a number, got {raw:?}"))?;
    if !amount.is_finite() {
        bail!("amount must be finite, got {raw:?}");
    }
    Ok(amount)
}

/// Reads an answer to a confirmation prompt.
pub fn is_affirmative(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
