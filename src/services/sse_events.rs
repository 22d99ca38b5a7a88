use futures::Stream;
use serde::Serialize;
use tracing::warn;

use crate::dto::{
    game::LeaderboardView,
    lobby::LobbyView,
    sse::{GameStartedEvent, RoomClosedEvent, ServerEvent},
};
use crate::dao::models::RoomStatus;

const EVENT_LOBBY_SNAPSHOT: &str = "lobby.snapshot";
const EVENT_GAME_STARTED: &str = "game.started";
const EVENT_ROOM_CLOSED: &str = "room.closed";
const EVENT_SCORES_SNAPSHOT: &str = "scores.snapshot";

/// Turn a lobby view stream into named SSE events.
///
/// Every view becomes a `lobby.snapshot`; the waiting→active edge
/// additionally emits `game.started` and a closed room emits `room.closed`
/// as the final event (the toast triggers of the lobby screen).
pub fn lobby_event_stream(
    views: impl Stream<Item = LobbyView> + Send + 'static,
) -> impl Stream<Item = ServerEvent> + Send + 'static {
    async_stream::stream! {
        let mut game_started = false;

        for await view in views {
            let status = view.room.status;
            let room_id = view.room.id;
            let started_now = view.game_started && !game_started;
            game_started = view.game_started;

            if let Some(event) = event_json(EVENT_LOBBY_SNAPSHOT, &view) {
                yield event;
            }
            if started_now {
                if let Some(event) = event_json(EVENT_GAME_STARTED, &GameStartedEvent { room_id }) {
                    yield event;
                }
            }
            if status == RoomStatus::Closed {
                if let Some(event) = event_json(EVENT_ROOM_CLOSED, &RoomClosedEvent { room_id }) {
                    yield event;
                }
            }
        }
    }
}

/// Turn a leaderboard stream into `scores.snapshot` SSE events.
pub fn scoreboard_event_stream(
    views: impl Stream<Item = LeaderboardView> + Send + 'static,
) -> impl Stream<Item = ServerEvent> + Send + 'static {
    async_stream::stream! {
        for await view in views {
            if let Some(event) = event_json(EVENT_SCORES_SNAPSHOT, &view) {
                yield event;
            }
        }
    }
}

fn event_json(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}
