use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use allin_core::{ClientMessage, PlayerAction, ServerMessage, format_cards};

const DEFAULT_URL: &str = "ws://127.0.0.1:25917/ws";

const HELP: &str = "\
commands:
  list                                   - list public tables
  create <name> [seats sb bb buy-in] [private]
  join <code> <name> [buy-in]            - join a table by code
  seat <n> [buy-in]                      - take or move to seat n
  stand                                  - leave the seat, keep watching
  leave                                  - leave the table
  sitin                                  - play from the next hand
  start                                  - deal (host only)
  fold | check | call | allin
  raise <total>                          - raise the street bet to <total>
  reveal <0|1> | hide <0|1>              - flip one hole card
  show                                   - show both cards after the hand
  help | exit";

enum Command {
    Send(ClientMessage),
    Help,
    Exit,
}

fn parse_num<T: std::str::FromStr>(arg: Option<&&str>, what: &str) -> Result<T, String> {
    let arg = arg.ok_or_else(|| format!("missing {}", what))?;
    arg.parse().map_err(|_| format!("invalid {}: {}", what, arg))
}

fn parse_opt_num<T: std::str::FromStr>(arg: Option<&&str>, what: &str) -> Result<Option<T>, String> {
    match arg {
        Some(_) => parse_num(arg, what).map(Some),
        None => Ok(None),
    }
}

/// Turns one input line into a command.
fn parse_command(line: &str) -> Result<Command, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&command) = parts.first() else {
        return Err("empty command".to_string());
    };

    let msg = match command {
        "list" => ClientMessage::ListTables,
        "create" => {
            let name = parts.get(1).unwrap_or(&"Player").to_string();
            let is_private = parts.last().is_some_and(|p| *p == "private");
            let numbers: Vec<&str> = parts.iter().skip(2).filter(|p| **p != "private").copied().collect();
            let num = |i: usize, what: &str| -> Result<u32, String> {
                match numbers.get(i) {
                    Some(_) => parse_num(numbers.get(i), what),
                    None => Ok(0),
                }
            };
            ClientMessage::CreateTable {
                name,
                max_seats: num(0, "seat count")? as usize,
                small_blind: num(1, "small blind")?,
                big_blind: num(2, "big blind")?,
                buy_in: num(3, "buy-in")?,
                is_private,
            }
        }
        "join" => {
            let code = parts.get(1).ok_or("usage: join <code> <name> [buy-in]")?.to_string();
            let name = parts.get(2).ok_or("usage: join <code> <name> [buy-in]")?.to_string();
            ClientMessage::JoinTable { code, name, buy_in: parse_opt_num(parts.get(3), "buy-in")? }
        }
        "seat" => ClientMessage::TakeSeat {
            seat: parse_num(parts.get(1), "seat")?,
            buy_in: parse_opt_num(parts.get(2), "buy-in")?,
            name: None,
        },
        "stand" => ClientMessage::LeaveSeat,
        "leave" => ClientMessage::LeaveTable,
        "sitin" => ClientMessage::SitIn,
        "start" => ClientMessage::StartGame,
        "fold" => PlayerAction::Fold.into(),
        "check" => PlayerAction::Check.into(),
        "call" => PlayerAction::Call.into(),
        "allin" => PlayerAction::AllIn.into(),
        "raise" => PlayerAction::Raise(parse_num(parts.get(1), "amount")?).into(),
        "reveal" | "hide" => ClientMessage::RevealCard {
            card_index: parse_num(parts.get(1), "card index")?,
            revealed: command == "reveal",
        },
        "show" => ClientMessage::ShowCards,
        "help" => return Ok(Command::Help),
        "exit" | "quit" => return Ok(Command::Exit),
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(Command::Send(msg))
}

/// One-line rendering for the common events; everything else is dumped.
fn render(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::TableList(tables) if tables.is_empty() => "no public tables".to_string(),
        ServerMessage::TableList(tables) => tables
            .iter()
            .map(|t| {
                format!(
                    "{}  host {}  {}/{} seated  blinds {}/{}  buy-in {}{}",
                    t.code,
                    t.host_name,
                    t.player_count,
                    t.max_seats,
                    t.small_blind,
                    t.big_blind,
                    t.buy_in,
                    if t.in_progress { "  (playing)" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ServerMessage::TableCreated { code, seat, .. } => format!("created table {} (seat {})", code, seat),
        ServerMessage::JoinedTable { code, seat, sitting_out, .. } => {
            format!("joined {} at seat {}{}", code, seat, if *sitting_out { ", sitting out" } else { "" })
        }
        ServerMessage::TableUpdate(view) => {
            let mut lines = Vec::new();
            if let Some(hand) = &view.hand {
                lines.push(format!(
                    "hand #{} {:?}  board [{}]  pot {}",
                    hand.number,
                    hand.phase,
                    format_cards(&hand.community),
                    hand.pot
                ));
            }
            for seat in view.seats.iter().flatten() {
                let cards: Vec<String> =
                    seat.cards.iter().map(|c| c.map_or("??".to_string(), |c| c.to_string())).collect();
                lines.push(format!(
                    "  {}{} {:<12} {:>6}  bet {:<5} {}{}{}",
                    if Some(seat.seat) == view.your_seat { '*' } else { ' ' },
                    seat.seat,
                    seat.name,
                    seat.stack,
                    seat.bet,
                    cards.join(" "),
                    if seat.folded { " folded" } else if seat.all_in { " all-in" } else { "" },
                    seat.hand_name.as_deref().map(|h| format!(" ({})", h)).unwrap_or_default()
                ));
            }
            if !view.legal_actions.is_empty() {
                lines.push(format!("  your options: {:?}", view.legal_actions));
            }
            lines.join("\n")
        }
        ServerMessage::NextToAct { seat, name, .. } => format!("{} (seat {}) to act", name, seat),
        ServerMessage::ActionMade { name, action, pot, .. } => format!("{} {:?}, pot {}", name, action, pot),
        ServerMessage::PhaseChange { phase, community } => format!("{:?}: [{}]", phase, format_cards(community)),
        ServerMessage::HandComplete(summary) => summary
            .winners
            .iter()
            .map(|w| format!("{} wins {}", w.name, w.amount))
            .collect::<Vec<_>>()
            .join(", "),
        ServerMessage::GameOver { winner } => {
            format!("game over, winner: {}", winner.as_deref().unwrap_or("nobody"))
        }
        ServerMessage::Error { message, .. } => format!("error: {}", message),
        other => format!("{:?}", other),
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(&std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string()))?;

    println!("connecting to {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("connected");

    let (mut write, mut read) = ws_stream.split();

    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        println!("\n{}", render(&server_msg));
                        prompt();
                    }
                    Err(e) => eprintln!("unreadable server message: {}", e),
                },
                Ok(Message::Close(_)) => {
                    println!("\nserver closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("connection error: {}", e);
                    break;
                }
            }
        }
    });

    println!("{}", HELP);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let Some(line) = stdin.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Send(msg)) => {
                let payload = serde_json::to_string(&msg)?;
                write.send(Message::Text(payload.into())).await?;
            }
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Exit) => break,
            Err(e) => println!("{}", e),
        }
    }

    println!("disconnecting");
    write.send(Message::Close(None)).await.ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(line: &str) -> ClientMessage {
        match parse_command(line) {
            Ok(Command::Send(msg)) => msg,
            Ok(_) => panic!("{} is not a table command", line),
            Err(e) => panic!("{}: {}", line, e),
        }
    }

    #[test]
    fn test_create_defaults_and_settings() {
        assert_eq!(
            sent("create ann"),
            ClientMessage::CreateTable {
                name: "ann".into(),
                max_seats: 0,
                small_blind: 0,
                big_blind: 0,
                buy_in: 0,
                is_private: false
            }
        );
        assert_eq!(
            sent("create ann 9 25 50 2000 private"),
            ClientMessage::CreateTable {
                name: "ann".into(),
                max_seats: 9,
                small_blind: 25,
                big_blind: 50,
                buy_in: 2000,
                is_private: true
            }
        );
    }

    #[test]
    fn test_actions() {
        assert_eq!(sent("raise 120"), ClientMessage::Action(PlayerAction::Raise(120)));
        assert_eq!(sent("  allin "), ClientMessage::Action(PlayerAction::AllIn));
        assert_eq!(sent("hide 1"), ClientMessage::RevealCard { card_index: 1, revealed: false });
        assert_eq!(sent("seat 4"), ClientMessage::TakeSeat { seat: 4, buy_in: None, name: None });
    }

    #[test]
    fn test_bad_input() {
        assert!(parse_command("raise lots").is_err());
        assert!(parse_command("raise").is_err());
        assert!(parse_command("join ABC234").is_err());
        assert!(parse_command("dance").is_err());
        assert!(matches!(parse_command("quit"), Ok(Command::Exit)));
    }
}
