use crate::SharedState;
use crate::registry::Room;
use allin_core::*;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 20;

/// Per-connection state.
struct Session {
    player_id: PlayerId,
    name: String,
    tx: mpsc::Sender<ServerMessage>,
    table: Option<TableCode>,
}

impl Session {
    async fn send(&self, msg: ServerMessage) {
        if self.tx.send(msg).await.is_err() {
            debug!(player = %self.player_id, "reply dropped, connection closing");
        }
    }

    fn ensure_not_at_table(&self) -> Result<(), ServerMessage> {
        match &self.table {
            Some(code) => Err(ServerMessage::error("already_at_table", format!("already at table {}", code))),
            None => Ok(()),
        }
    }

    /// The room this session is attached to.
    fn room(&self, state: &SharedState) -> Result<Arc<Room>, ServerMessage> {
        let code = self
            .table
            .as_deref()
            .ok_or_else(|| ServerMessage::error("not_at_table", "join a table first"))?;
        state.registry.get(code).ok_or_else(table_not_found)
    }
}

fn table_not_found() -> ServerMessage {
    ServerMessage::error("table_not_found", "no table with that code")
}

fn not_seated() -> ServerMessage {
    ServerMessage::error("not_seated", "you are not seated")
}

/// Trims a display name and caps its length. Blank names become "Player".
fn clean_name(name: &str) -> String {
    let name: String = name.trim().chars().take(MAX_NAME_LEN).collect();
    if name.is_empty() { "Player".to_string() } else { name }
}

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.channel_capacity);

    // writer: channel -> socket
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "failed to encode server message");
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session {
        player_id: Uuid::new_v4(),
        name: String::new(),
        tx: tx.clone(),
        table: None,
    };
    state.lobby.insert(session.player_id, tx);
    info!(player = %session.player_id, "client connected");
    session.send(ServerMessage::TableList(state.registry.list())).await;

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    debug!(player = %session.player_id, ?client_msg, "client message");
                    if let Err(reply) = handle_client_message(&state, &mut session, client_msg).await {
                        session.send(reply).await;
                    }
                }
                Err(e) => {
                    warn!(player = %session.player_id, error = %e, "unparseable client message");
                    session.send(ServerMessage::error("bad_message", e.to_string())).await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    leave_table(&state, &mut session).await;
    state.lobby.remove(&session.player_id);
    writer.abort();
    info!(player = %session.player_id, "client disconnected");
}

async fn handle_client_message(
    state: &SharedState,
    session: &mut Session,
    msg: ClientMessage,
) -> Result<(), ServerMessage> {
    match msg {
        ClientMessage::ListTables => {
            session.send(ServerMessage::TableList(state.registry.list())).await;
        }

        ClientMessage::CreateTable { name, max_seats, small_blind, big_blind, buy_in, is_private } => {
            session.ensure_not_at_table()?;
            let defaults = &state.config.table_defaults;
            let or_default = |value: u32, default: u32| if value == 0 { default } else { value };
            let config = TableConfig {
                max_seats: if max_seats == 0 { defaults.max_seats } else { max_seats },
                small_blind: or_default(small_blind, defaults.small_blind),
                big_blind: or_default(big_blind, defaults.big_blind),
                buy_in: or_default(buy_in, defaults.buy_in),
                is_private,
            };
            let stack = config.buy_in;
            let name = clean_name(&name);

            let room = state.registry.create(session.player_id, &name, config)?;
            let code = {
                let mut table = room.table.lock();
                table.seat_player(0, Player::new(session.player_id, name.clone(), stack))?;
                table.code().to_string()
            };
            room.add_connection(session.player_id, name.clone(), session.tx.clone()).await;
            session.name = name;
            session.table = Some(code.clone());
            info!(table = %code, host = %session.name, "host seated");

            session
                .send(ServerMessage::TableCreated { code, your_id: session.player_id, seat: 0, is_private })
                .await;
            room.send_updates().await;
            broadcast_table_list(state).await;
        }

        ClientMessage::JoinTable { code, name, buy_in } => {
            session.ensure_not_at_table()?;
            let room = state.registry.get(&code).ok_or_else(table_not_found)?;
            let name = clean_name(&name);
            let (code, seat, sitting_out, is_private) = {
                let mut table = room.table.lock();
                let stack = buy_in.filter(|&b| b > 0).unwrap_or(table.config().buy_in);
                let seat = table.join(Player::new(session.player_id, name.clone(), stack))?;
                let sitting_out = table.player(seat).is_some_and(|p| p.sitting_out);
                (table.code().to_string(), seat, sitting_out, table.config().is_private)
            };
            room.add_connection(session.player_id, name.clone(), session.tx.clone()).await;
            session.name = name;
            session.table = Some(code.clone());

            session
                .send(ServerMessage::JoinedTable { code, your_id: session.player_id, seat, sitting_out, is_private })
                .await;
            room.broadcast(&ServerMessage::PlayerJoined { name: session.name.clone(), seat }, Some(session.player_id))
                .await;
            room.send_updates().await;
            auto_start(state, &room).await;
            broadcast_table_list(state).await;
        }

        ClientMessage::TakeSeat { seat, buy_in, name } => {
            let room = session.room(state)?;
            if let Some(name) = name {
                session.name = clean_name(&name);
            }
            let event = {
                let mut table = room.table.lock();
                match table.seat_of(session.player_id) {
                    Some(from) => {
                        table.move_player(from, seat)?;
                        ServerMessage::PlayerMoved { name: session.name.clone(), from, to: seat }
                    }
                    None => {
                        let stack = buy_in.filter(|&b| b > 0).unwrap_or(table.config().buy_in);
                        table.seat_player(seat, Player::new(session.player_id, session.name.clone(), stack))?;
                        ServerMessage::PlayerJoined { name: session.name.clone(), seat }
                    }
                }
            };
            room.add_connection(session.player_id, session.name.clone(), session.tx.clone()).await;

            session.send(ServerMessage::SeatTaken { seat }).await;
            room.broadcast(&event, Some(session.player_id)).await;
            room.send_updates().await;
            auto_start(state, &room).await;
            broadcast_table_list(state).await;
        }

        ClientMessage::LeaveSeat => {
            let room = session.room(state)?;
            let (seat, vacated) = {
                let mut table = room.table.lock();
                let seat = table.seat_of(session.player_id).ok_or_else(not_seated)?;
                (seat, table.vacate_seat(seat)?)
            };

            session.send(ServerMessage::LeftSeat).await;
            room.broadcast(&ServerMessage::PlayerLeft { name: vacated.player.name, seat }, Some(session.player_id))
                .await;
            match vacated.outcome {
                Some(outcome) => announce_round(state, &room, outcome).await,
                None => room.send_updates().await,
            }
            broadcast_table_list(state).await;
        }

        ClientMessage::LeaveTable => {
            session.room(state)?;
            leave_table(state, session).await;
        }

        ClientMessage::SitIn => {
            let room = session.room(state)?;
            let (seat, start) = {
                let mut table = room.table.lock();
                let seat = table.seat_of(session.player_id).ok_or_else(not_seated)?;
                (seat, table.sit_in(seat)?)
            };
            room.broadcast(&ServerMessage::PlayerSatIn { name: session.name.clone(), seat }, None).await;
            match start {
                Some(start) => announce_hand_start(state.clone(), room, start).await,
                None => room.send_updates().await,
            }
        }

        ClientMessage::StartGame => {
            let room = session.room(state)?;
            let start = {
                let mut table = room.table.lock();
                if table.host_id() != session.player_id {
                    return Err(ServerMessage::error("not_host", "only the host can start the game"));
                }
                table.start_hand()?
            };
            room.cancel_next_hand();
            announce_hand_start(state.clone(), room, start).await;
        }

        ClientMessage::Action(action) => {
            let room = session.room(state)?;
            let outcome = {
                let mut table = room.table.lock();
                let seat = table.seat_of(session.player_id).ok_or_else(not_seated)?;
                table.submit_action(seat, action)?
            };
            room.broadcast(
                &ServerMessage::ActionMade {
                    seat: outcome.seat,
                    name: session.name.clone(),
                    action: outcome.action,
                    street_bet: outcome.street_bet,
                    stack: outcome.stack,
                    pot: outcome.pot,
                },
                None,
            )
            .await;
            announce_round(state, &room, outcome.round).await;
        }

        ClientMessage::RevealCard { card_index, revealed } => {
            let room = session.room(state)?;
            let (seat, card) = {
                let mut table = room.table.lock();
                let seat = table.seat_of(session.player_id).ok_or_else(not_seated)?;
                (seat, table.reveal_card(seat, card_index, revealed)?)
            };
            if revealed {
                room.broadcast(
                    &ServerMessage::CardRevealed { name: session.name.clone(), seat, card_index, card },
                    None,
                )
                .await;
            }
            room.send_updates().await;
        }

        ClientMessage::ShowCards => {
            let room = session.room(state)?;
            let (seat, cards) = {
                let mut table = room.table.lock();
                let seat = table.seat_of(session.player_id).ok_or_else(not_seated)?;
                (seat, table.show_cards(seat)?)
            };
            room.broadcast(&ServerMessage::PlayerShowedCards { name: session.name.clone(), seat, cards }, None)
                .await;
            room.send_updates().await;
        }
    }
    Ok(())
}

/// Detaches the session from its table: frees the seat, hands the host role
/// on, and closes the table once nobody is left.
async fn leave_table(state: &SharedState, session: &mut Session) {
    let Some(code) = session.table.take() else {
        return;
    };
    let Some(room) = state.registry.get(&code) else {
        return;
    };
    let id = session.player_id;

    let vacated = {
        let mut table = room.table.lock();
        match table.seat_of(id) {
            Some(seat) => table.vacate_seat(seat).ok().map(|v| (seat, v)),
            None => None,
        }
    };
    room.remove_connection(id).await;

    let (empty, new_host) = {
        let conns = room.connections.read().await;
        let mut table = room.table.lock();
        let new_host = if table.host_id() == id {
            let next = table
                .seats()
                .iter()
                .flatten()
                .map(|p| (p.id, p.name.clone()))
                .next()
                .or_else(|| conns.iter().map(|(id, c)| (*id, c.name.clone())).next());
            if let Some((host_id, host_name)) = &next {
                table.set_host(*host_id, host_name.clone());
            }
            next
        } else {
            None
        };
        (table.is_empty() && conns.is_empty(), new_host)
    };

    if empty {
        state.registry.remove(&code);
        broadcast_table_list(state).await;
        return;
    }

    if let Some((_, name)) = new_host {
        info!(table = %code, host = %name, "host transferred");
    }
    match vacated {
        Some((seat, vacated)) => {
            room.broadcast(&ServerMessage::PlayerLeft { name: vacated.player.name, seat }, None).await;
            match vacated.outcome {
                Some(outcome) => announce_round(state, &room, outcome).await,
                None => room.send_updates().await,
            }
        }
        None => room.send_updates().await,
    }
    broadcast_table_list(state).await;
}

async fn auto_start(state: &SharedState, room: &Arc<Room>) {
    let start = room.table.lock().try_auto_start();
    if let Some(start) = start {
        announce_hand_start(state.clone(), room.clone(), start).await;
    }
}

/// Tells the room a hand has been dealt, then follows whatever the deal led to.
fn announce_hand_start(state: SharedState, room: Arc<Room>, start: HandStart) -> BoxFuture<'static, ()> {
    async move {
        room.broadcast(
            &ServerMessage::HandStarted {
                hand_number: start.hand_number,
                dealer: start.dealer,
                small_blind: start.small_blind,
                big_blind: start.big_blind,
            },
            None,
        )
        .await;
        match start.outcome {
            Some(outcome) => announce_round(&state, &room, outcome).await,
            None => {
                room.send_updates().await;
                announce_next_to_act(&room).await;
            }
        }
        broadcast_table_list(&state).await;
    }
    .boxed()
}

async fn announce_round(state: &SharedState, room: &Arc<Room>, outcome: RoundOutcome) {
    match outcome {
        RoundOutcome::Continue => {
            room.send_updates().await;
            announce_next_to_act(room).await;
        }
        RoundOutcome::StreetDealt { phase, community } => {
            room.broadcast(&ServerMessage::PhaseChange { phase, community }, None).await;
            room.send_updates().await;
            announce_next_to_act(room).await;
        }
        RoundOutcome::HandComplete { summary, next } => {
            room.broadcast(&ServerMessage::HandComplete(summary), None).await;
            room.send_updates().await;
            match next {
                AfterHand::NextHand(ticket) => schedule_next_hand(state, room, ticket),
                AfterHand::GameOver { winner } => {
                    room.broadcast(&ServerMessage::GameOver { winner }, None).await;
                    broadcast_table_list(state).await;
                }
            }
        }
    }
}

fn schedule_next_hand(state: &SharedState, room: &Arc<Room>, ticket: NextHandTicket) {
    debug!(table = %ticket.table_code, after_hand = ticket.after_hand, "next hand scheduled");
    let on_start_state = state.clone();
    room.schedule_next_hand(
        state.registry.clone(),
        ticket,
        state.config.next_hand_delay,
        move |room, start| announce_scheduled(on_start_state, room, start),
    );
}

fn announce_scheduled(state: SharedState, room: Arc<Room>, start: ScheduledStart) -> BoxFuture<'static, ()> {
    async move {
        match start {
            ScheduledStart::Started(start) => announce_hand_start(state, room, start).await,
            ScheduledStart::GameOver { winner } => {
                room.broadcast(&ServerMessage::GameOver { winner }, None).await;
                room.send_updates().await;
                broadcast_table_list(&state).await;
            }
        }
    }
    .boxed()
}

async fn announce_next_to_act(room: &Room) {
    let next = {
        let table = room.table.lock();
        table
            .hand()
            .filter(|h| !h.settled)
            .and_then(|h| h.current_idx)
            .and_then(|seat| table.player(seat).map(|p| (seat, p.name.clone(), table.legal_actions(seat))))
    };
    if let Some((seat, name, options)) = next {
        room.broadcast(&ServerMessage::NextToAct { seat, name, options }, None).await;
    }
}

/// Pushes the public table list to every connected socket.
async fn broadcast_table_list(state: &SharedState) {
    let msg = ServerMessage::TableList(state.registry.list());
    let senders: Vec<_> = state.lobby.iter().map(|entry| entry.value().clone()).collect();
    for sender in senders {
        if sender.send(msg.clone()).await.is_err() {
            warn!("dropped a table list for a closed connection");
        }
    }
}
