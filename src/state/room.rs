use thiserror::Error;

use crate::dao::models::{RoomStatus, SessionStatus};

/// Events that advance a room's persisted lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    /// The creator starts the game from the lobby.
    StartGame,
    /// The last participant finished the bound session.
    CompleteGame,
    /// The creator leaves, ending the room for everyone.
    CloseRoom,
}

/// Events that advance a session's persisted lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The last participant finished the session.
    Complete,
}

/// Outcome of applying an event to a persisted status.
///
/// `AlreadyThere` marks the idempotent re-application of a terminal event:
/// two finishers racing to promote a session both succeed, the second one as
/// a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// The status moves to a new value that must be written back.
    Advanced(S),
    /// The status already holds the target value; nothing to write.
    AlreadyThere,
}

/// Error returned when attempting to apply an invalid room transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidRoomTransition {
    /// The status the room held when the invalid event was received.
    pub from: RoomStatus,
    /// The event that cannot be applied from this status.
    pub event: RoomEvent,
}

/// Compute the room status transition for an event if the transition is valid.
///
/// The machine is `waiting → active → completed` with the orthogonal terminal
/// `closed` reachable from both non-terminal states.
pub fn room_transition(
    from: RoomStatus,
    event: RoomEvent,
) -> Result<Transition<RoomStatus>, InvalidRoomTransition> {
    let next = match (from, event) {
        (RoomStatus::Waiting, RoomEvent::StartGame) => RoomStatus::Active,
        (RoomStatus::Active, RoomEvent::CompleteGame) => RoomStatus::Completed,
        (RoomStatus::Completed, RoomEvent::CompleteGame) => return Ok(Transition::AlreadyThere),
        (RoomStatus::Waiting | RoomStatus::Active, RoomEvent::CloseRoom) => RoomStatus::Closed,
        (RoomStatus::Closed, RoomEvent::CloseRoom) => return Ok(Transition::AlreadyThere),
        (from, event) => return Err(InvalidRoomTransition { from, event }),
    };

    Ok(Transition::Advanced(next))
}

/// Compute the session status transition for an event.
///
/// Sessions only ever advance towards `completed`, so no event is invalid.
pub fn session_transition(from: SessionStatus, event: SessionEvent) -> Transition<SessionStatus> {
    match (from, event) {
        (SessionStatus::Active, SessionEvent::Complete) => {
            Transition::Advanced(SessionStatus::Completed)
        }
        (SessionStatus::Completed, SessionEvent::Complete) => Transition::AlreadyThere,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_happy_path_through_room_lifecycle() {
        assert_eq!(
            room_transition(RoomStatus::Waiting, RoomEvent::StartGame),
            Ok(Transition::Advanced(RoomStatus::Active))
        );
        assert_eq!(
            room_transition(RoomStatus::Active, RoomEvent::CompleteGame),
            Ok(Transition::Advanced(RoomStatus::Completed))
        );
    }

    #[test]
    fn close_is_reachable_from_waiting_and_active() {
        assert_eq!(
            room_transition(RoomStatus::Waiting, RoomEvent::CloseRoom),
            Ok(Transition::Advanced(RoomStatus::Closed))
        );
        assert_eq!(
            room_transition(RoomStatus::Active, RoomEvent::CloseRoom),
            Ok(Transition::Advanced(RoomStatus::Closed))
        );
    }

    #[test]
    fn completion_is_idempotent() {
        assert_eq!(
            room_transition(RoomStatus::Completed, RoomEvent::CompleteGame),
            Ok(Transition::AlreadyThere)
        );
        assert_eq!(
            session_transition(SessionStatus::Completed, SessionEvent::Complete),
            Transition::AlreadyThere
        );
    }

    #[test]
    fn invalid_transitions_return_the_offending_pair() {
        let err = room_transition(RoomStatus::Waiting, RoomEvent::CompleteGame).unwrap_err();
        assert_eq!(err.from, RoomStatus::Waiting);
        assert_eq!(err.event, RoomEvent::CompleteGame);

        let err = room_transition(RoomStatus::Closed, RoomEvent::StartGame).unwrap_err();
        assert_eq!(err.from, RoomStatus::Closed);

        assert!(room_transition(RoomStatus::Completed, RoomEvent::CloseRoom).is_err());
        assert!(room_transition(RoomStatus::Active, RoomEvent::StartGame).is_err());
    }

    #[test]
    fn session_completes_from_active() {
        assert_eq!(
            session_transition(SessionStatus::Active, SessionEvent::Complete),
            Transition::Advanced(SessionStatus::Completed)
        );
    }
}
