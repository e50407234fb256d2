use allin_core::{
    NextHandTicket, PlayerId, PokerResult, ScheduledStart, ServerMessage, Table, TableCode, TableConfig,
    TableSummary,
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::BoxFuture;
use parking_lot::Mutex as P_Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Characters a table code is drawn from. No 0/O or 1/I.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// A socket attached to a table, seated or watching.
#[derive(Debug, Clone)]
pub struct Connection {
    pub name: String,
    pub sender: mpsc::Sender<ServerMessage>,
}

/// One live table plus everyone connected to it.
///
/// Lock order is `connections` before `table`. The table lock is synchronous
/// and is never held across an `.await`.
pub struct Room {
    pub table: P_Mutex<Table>,
    pub connections: RwLock<HashMap<PlayerId, Connection>>,
    next_hand: P_Mutex<Option<JoinHandle<()>>>,
}

impl Room {
    pub fn new(table: Table) -> Room {
        Room {
            table: P_Mutex::new(table),
            connections: RwLock::new(HashMap::new()),
            next_hand: P_Mutex::new(None),
        }
    }

    pub async fn add_connection(&self, id: PlayerId, name: impl Into<String>, sender: mpsc::Sender<ServerMessage>) {
        self.connections.write().await.insert(id, Connection { name: name.into(), sender });
    }

    pub async fn remove_connection(&self, id: PlayerId) -> Option<Connection> {
        self.connections.write().await.remove(&id)
    }

    /// Sends `msg` to every connection except `exclude`.
    pub async fn broadcast(&self, msg: &ServerMessage, exclude: Option<PlayerId>) {
        let senders: Vec<_> = {
            let conns = self.connections.read().await;
            conns
                .iter()
                .filter(|(id, _)| Some(**id) != exclude)
                .map(|(_, c)| c.sender.clone())
                .collect()
        };
        for sender in senders {
            if sender.send(msg.clone()).await.is_err() {
                warn!("dropped a message for a closed connection");
            }
        }
    }

    /// Sends every connection its own view of the table.
    pub async fn send_updates(&self) {
        let views: Vec<_> = {
            let conns = self.connections.read().await;
            let table = self.table.lock();
            conns
                .iter()
                .map(|(id, c)| (c.sender.clone(), table.public_view(Some(*id))))
                .collect()
        };
        for (sender, view) in views {
            if sender.send(ServerMessage::TableUpdate(view)).await.is_err() {
                warn!("dropped a table update for a closed connection");
            }
        }
    }

    /// Starts the hand named by `ticket` once `delay` has passed.
    ///
    /// The timer holds only a weak reference. It does nothing if the room has
    /// been dropped, is no longer the one registered under its code, or the
    /// table has moved past the ticket. Scheduling replaces any earlier timer.
    pub fn schedule_next_hand<F>(
        self: &Arc<Self>,
        registry: Arc<TableRegistry>,
        ticket: NextHandTicket,
        delay: Duration,
        on_start: F,
    ) where
        F: FnOnce(Arc<Room>, ScheduledStart) -> BoxFuture<'static, ()> + Send + 'static,
    {
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(room) = weak.upgrade() else {
                return;
            };
            if !registry.is_current(&ticket.table_code, &room) {
                debug!(table = %ticket.table_code, "next-hand timer fired for a removed table");
                return;
            }
            // detach so a timer scheduled from `on_start` does not abort this task
            room.next_hand.lock().take();
            let start = room.table.lock().start_scheduled_hand(&ticket);
            if let Some(start) = start {
                on_start(room, start).await;
            }
        });
        if let Some(previous) = self.next_hand.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn cancel_next_hand(&self) {
        if let Some(task) = self.next_hand.lock().take() {
            task.abort();
        }
    }
}

/// Every live table, keyed by its upper-case code.
#[derive(Default)]
pub struct TableRegistry {
    tables: DashMap<TableCode, Arc<Room>>,
}

impl TableRegistry {
    pub fn new() -> TableRegistry {
        TableRegistry::default()
    }

    /// Opens a table under a fresh code.
    pub fn create(&self, host_id: PlayerId, host_name: &str, config: TableConfig) -> PokerResult<Arc<Room>> {
        config.validate()?;
        loop {
            let code = generate_code();
            if let Entry::Vacant(slot) = self.tables.entry(code.clone()) {
                let table = Table::new(code.clone(), host_id, host_name, config)?;
                let room = Arc::new(Room::new(table));
                slot.insert(room.clone());
                info!(table = %code, host = %host_name, "table registered");
                return Ok(room);
            }
            warn!(table = %code, "table code collision, drawing another");
        }
    }

    /// Looks a table up by code, ignoring case and surrounding space.
    pub fn get(&self, code: &str) -> Option<Arc<Room>> {
        let code = normalize_code(code);
        self.tables.get(&code).map(|r| r.value().clone())
    }

    /// Removes the table and stops its next-hand timer.
    pub fn remove(&self, code: &str) -> Option<Arc<Room>> {
        let (code, room) = self.tables.remove(&normalize_code(code))?;
        room.cancel_next_hand();
        info!(table = %code, "table removed");
        Some(room)
    }

    /// Whether `room` is still the table registered under `code`.
    pub fn is_current(&self, code: &str, room: &Arc<Room>) -> bool {
        self.tables.get(code).is_some_and(|r| Arc::ptr_eq(r.value(), room))
    }

    /// Lobby listing. Private tables are left out.
    pub fn list(&self) -> Vec<TableSummary> {
        let rooms: Vec<Arc<Room>> = self.tables.iter().map(|r| r.value().clone()).collect();
        let mut summaries: Vec<TableSummary> = rooms
            .iter()
            .map(|room| room.table.lock().summary())
            .filter(|s| !s.is_private)
            .collect();
        summaries.sort_by(|a, b| a.code.cmp(&b.code));
        summaries
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}

fn normalize_code(code: &str) -> TableCode {
    code.trim().to_uppercase()
}

fn generate_code() -> TableCode {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use allin_core::{Player, PlayerAction, RoundOutcome, AfterHand};
    use futures_util::FutureExt;
    use uuid::Uuid;

    /// A room registered in `registry` with one finished hand and its ticket.
    fn room_after_one_hand(registry: &TableRegistry) -> (Arc<Room>, NextHandTicket) {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let room = registry.create(a, "ann", TableConfig::default()).unwrap();
        let ticket = {
            let mut table = room.table.lock();
            table.seat_player(0, Player::new(a, "ann", 1000)).unwrap();
            table.seat_player(1, Player::new(b, "bob", 1000)).unwrap();
            table.start_hand().unwrap();
            let current = table.hand().unwrap().current_idx.unwrap();
            match table.submit_action(current, PlayerAction::Fold).unwrap().round {
                RoundOutcome::HandComplete { next: AfterHand::NextHand(ticket), .. } => ticket,
                other => panic!("expected a settled hand, got {:?}", other),
            }
        };
        (room, ticket)
    }

    fn notify(tx: mpsc::Sender<()>) -> impl FnOnce(Arc<Room>, ScheduledStart) -> BoxFuture<'static, ()> + Send {
        move |_, _| {
            async move {
                let _ = tx.send(()).await;
            }
            .boxed()
        }
    }

    #[test]
    fn test_codes_use_the_alphabet() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|c| CODE_ALPHABET.contains(&c)));
        }
    }

    #[test]
    fn test_lookup_ignores_case() {
        let registry = TableRegistry::new();
        let room = registry.create(Uuid::new_v4(), "ann", TableConfig::default()).unwrap();
        let code = room.table.lock().code().to_string();
        assert!(registry.get(&code.to_lowercase()).is_some());
        assert!(registry.get(&format!("  {}  ", code)).is_some());
        assert!(registry.get("ZZZZZ").is_none());
    }

    #[test]
    fn test_list_hides_private_tables() {
        let registry = TableRegistry::new();
        registry.create(Uuid::new_v4(), "ann", TableConfig::default()).unwrap();
        let private = TableConfig { is_private: true, ..TableConfig::default() };
        registry.create(Uuid::new_v4(), "bob", private).unwrap();
        assert_eq!(registry.len(), 2);
        let list = registry.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].host_name, "ann");
    }

    #[test]
    fn test_invalid_config_creates_nothing() {
        let registry = TableRegistry::new();
        let config = TableConfig { max_seats: 1, ..TableConfig::default() };
        assert!(registry.create(Uuid::new_v4(), "ann", config).is_err());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_timer_starts_next_hand() {
        let registry = Arc::new(TableRegistry::new());
        let (room, ticket) = room_after_one_hand(&registry);
        let (tx, mut rx) = mpsc::channel(1);
        room.schedule_next_hand(registry.clone(), ticket, Duration::from_millis(10), notify(tx));

        tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        let table = room.table.lock();
        assert_eq!(table.hands_played(), 2);
        assert!(table.pending_next_hand().is_none());
    }

    #[tokio::test]
    async fn test_timer_is_dropped_with_the_table() {
        let registry = Arc::new(TableRegistry::new());
        let (room, ticket) = room_after_one_hand(&registry);
        let (tx, mut rx) = mpsc::channel(1);
        room.schedule_next_hand(registry.clone(), ticket, Duration::from_millis(20), notify(tx));

        let code = room.table.lock().code().to_string();
        registry.remove(&code).unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(room.table.lock().hands_played(), 1);
    }

    #[tokio::test]
    async fn test_timer_ignores_unregistered_room() {
        let registry = Arc::new(TableRegistry::new());
        let (room, ticket) = room_after_one_hand(&registry);
        // a stand-in that was never registered under the code
        let stray = {
            let table = room.table.lock().clone();
            Arc::new(Room::new(table))
        };
        let (tx, mut rx) = mpsc::channel(1);
        stray.schedule_next_hand(registry.clone(), ticket, Duration::from_millis(10), notify(tx));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(stray.table.lock().hands_played(), 1);
    }

    #[tokio::test]
    async fn test_stale_ticket_does_nothing() {
        let registry = Arc::new(TableRegistry::new());
        let (room, ticket) = room_after_one_hand(&registry);
        // the host starts the next hand by hand before the timer fires
        room.table.lock().start_hand().unwrap();
        let (tx, mut rx) = mpsc::channel(1);
        room.schedule_next_hand(registry.clone(), ticket, Duration::from_millis(10), notify(tx));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(room.table.lock().hands_played(), 2);
    }
}
