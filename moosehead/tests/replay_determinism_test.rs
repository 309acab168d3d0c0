//! Property tests: replay is deterministic and seats respect capacity.

#![allow(clippy::unwrap_used)]

use moosehead::mocks::RecordingEmailSender;
use moosehead::projection::ProjectionState;
use moosehead::{
    AuthorKind, CommandError, Email, EmailSaga, SettingsHandle, WorkshopCommand, WorkshopData, WorkshopEvent,
    WorkshopSystem,
};
use moosehead_core::event::RecordedEvent;
use moosehead_core::revision::Revision;
use moosehead_core::subscription::EventSubscriber;
use moosehead_testing::{InMemoryEventLog, test_clock, test_time};
use proptest::prelude::*;
use std::sync::Arc;

const EMAILS: [&str; 4] = ["a@x", "b@x", "c@x", "d@x"];
const WORKSHOPS: [&str; 2] = ["w1", "w2"];

#[derive(Clone, Debug)]
enum Op {
    AddWorkshop { workshop: usize, seats: u32 },
    Reserve { email: usize, workshop: usize, seats: u32, admin: bool },
    Confirm { email: usize },
    Cancel { email: usize, workshop: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..WORKSHOPS.len(), 0..5_u32).prop_map(|(workshop, seats)| Op::AddWorkshop { workshop, seats }),
        (0..EMAILS.len(), 0..WORKSHOPS.len(), 0..7_u32, any::<bool>()).prop_map(
            |(email, workshop, seats, admin)| Op::Reserve {
                email,
                workshop,
                seats,
                admin,
            }
        ),
        (0..EMAILS.len()).prop_map(|email| Op::Confirm { email }),
        (0..EMAILS.len(), 0..WORKSHOPS.len()).prop_map(|(email, workshop)| Op::Cancel { email, workshop }),
    ]
}

fn system_over(log: &InMemoryEventLog) -> WorkshopSystem {
    WorkshopSystem::new(
        Arc::new(log.clone()),
        SettingsHandle::default(),
        Arc::new(RecordingEmailSender::new()),
        Arc::new(test_clock()),
    )
}

async fn run(system: &WorkshopSystem, op: Op) -> Result<(), CommandError> {
    let outcome = match op {
        Op::AddWorkshop { workshop, seats } => {
            let data = WorkshopData::new(WORKSHOPS[workshop], "Workshop", "", seats);
            system
                .execute(WorkshopCommand::add_workshop(data, AuthorKind::Admin)?)
                .await
                .map(|_| ())
        }
        Op::Reserve {
            email,
            workshop,
            seats,
            admin,
        } => {
            let author = if admin { AuthorKind::Admin } else { AuthorKind::User };
            let command =
                WorkshopCommand::add_reservation(WORKSHOPS[workshop], EMAILS[email], "Name", author, seats)?;
            system.execute(command).await.map(|_| ())
        }
        Op::Confirm { email } => {
            let Some(participant) = system
                .projection()
                .find_all_reservations(&Email::from(EMAILS[email]))
                .into_iter()
                .next()
            else {
                return Ok(());
            };
            system
                .confirm_email(participant.reservation_token)
                .await
                .map(|_| ())
        }
        Op::Cancel { email, workshop } => {
            let command = WorkshopCommand::cancel_reservation(WORKSHOPS[workshop], EMAILS[email], AuthorKind::User)?;
            system.execute(command).await.map(|_| ())
        }
    };
    match outcome {
        Err(error) if error.is_fatal() => Err(error),
        _ => Ok(()),
    }
}

fn assert_seats_within_capacity(system: &WorkshopSystem) {
    let saga = system.saga().snapshot();
    for workshop in system.projection().workshops() {
        let id = &workshop.data.id;
        let held = saga.seated_seats(id);
        assert!(held <= workshop.capacity, "{id} holds more seats than it has");

        let next = saga.waiting(id).into_iter().find(|b| b.seats <= workshop.capacity);
        if let Some(next) = next {
            assert!(
                held + next.seats > workshop.capacity,
                "{} waits on {id} with {} of {} seats held",
                next.email,
                held,
                workshop.capacity
            );
        }
    }
}

fn fold_saga(prefix: &[RecordedEvent<WorkshopEvent>], sentinel: bool) -> EmailSaga {
    let saga = EmailSaga::new(Arc::new(RecordingEmailSender::new()), SettingsHandle::default());
    if sentinel {
        saga.on_event(&RecordedEvent::new(Revision::new(0), test_time(), WorkshopEvent::BootstrapDone));
    }
    for recorded in prefix {
        saga.on_event(recorded);
    }
    saga
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replay_reproduces_live_state(ops in prop::collection::vec(op(), 0..40)) {
        tokio_test::block_on(async {
            let log = InMemoryEventLog::new();
            let live = system_over(&log);
            live.bootstrap().await.unwrap();
            for op in ops {
                run(&live, op).await.unwrap();
                assert_seats_within_capacity(&live);
            }

            let replayed = system_over(&log);
            replayed.bootstrap().await.unwrap();

            assert_eq!(replayed.projection().snapshot(), live.projection().snapshot());
            assert_eq!(replayed.saga().snapshot(), live.saga().snapshot());
            assert_eq!(replayed.head().await, live.head().await);
        });
    }

    #[test]
    fn folding_a_prefix_twice_gives_equal_states(ops in prop::collection::vec(op(), 0..30), cut in 0..30_usize) {
        tokio_test::block_on(async {
            let log = InMemoryEventLog::new();
            let live = system_over(&log);
            live.bootstrap().await.unwrap();
            for op in ops {
                run(&live, op).await.unwrap();
            }

            let history = live.history().await.unwrap();
            let prefix = &history[..cut.min(history.len())];
            let fold = || {
                let mut state = ProjectionState::default();
                for recorded in prefix {
                    state.apply(recorded);
                }
                state
            };

            assert_eq!(fold(), fold());
            for sentinel in [false, true] {
                assert_eq!(
                    fold_saga(prefix, sentinel).snapshot(),
                    fold_saga(prefix, sentinel).snapshot()
                );
            }
        });
    }
}

