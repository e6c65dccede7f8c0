//! End-to-end round orchestration tests against the in-memory store.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};

use doppler_back::{
    config::AppConfig,
    dao::{
        catalog::{SetDocument, SkinDocument, file::FileCatalog},
        lobby_store::{LobbyStore, memory::MemoryLobbyStore},
        models::{GameMode, LobbyDocument, LobbyStatus, MetadataPatch, PlayerEntry, QuizMetadata},
        question::{AnswerOption, Question},
        storage::{StorageError, StorageResult},
    },
    dto::{
        lobby::CreateLobbyRequest,
        play::{JoinRequest, SkinRequest},
        quiz::AnswerRequest,
    },
    error::ServiceError,
    services::{identity::CurrentUser, lobby_service, quiz_service, roster_service},
    state::{AppState, SharedState},
};

const TWO_ROUND_SET: &str = "capitals";
const ONE_ROUND_SET: &str = "lightning";

fn four_options(correct_index: usize) -> Question {
    let mut answers = [0, 1, 2, 3].map(|index| AnswerOption {
        answer: format!("option {index}"),
        is_correct: false,
    });
    answers[correct_index].is_correct = true;
    Question::FourOptions {
        question: "pick the right one".into(),
        answers,
    }
}

fn catalog() -> FileCatalog {
    let mut sets = HashMap::new();
    sets.insert(
        TWO_ROUND_SET.to_string(),
        SetDocument {
            title: "Capitals".into(),
            description: String::new(),
            questions: vec![
                four_options(0),
                Question::TrueFalse {
                    question: "is this the last round".into(),
                    correct_answer: true,
                },
            ],
        },
    );
    sets.insert(
        ONE_ROUND_SET.to_string(),
        SetDocument {
            title: "Lightning".into(),
            description: String::new(),
            questions: vec![four_options(2)],
        },
    );

    let mut skins = HashMap::new();
    skins.insert(
        "skeleton".to_string(),
        SkinDocument {
            name: "Skeleton".into(),
            image: "/skins/clashRoyale/skeleton.png".into(),
        },
    );

    FileCatalog::from_maps(sets, skins)
}

/// Shared state with the given round windows over the fixed test catalog.
fn setup_with_windows(
    answer_window: Duration,
    reveal_window: Duration,
) -> (SharedState, MemoryLobbyStore) {
    let config = AppConfig {
        answer_window,
        reveal_window,
        ..AppConfig::default()
    };
    let catalog = catalog();
    let state = AppState::new(config, Arc::new(catalog.clone()), Arc::new(catalog));
    let store = MemoryLobbyStore::new();
    (state, store)
}

/// Shared state with long round windows so only explicit calls drive the
/// round transitions under test.
fn setup() -> (SharedState, MemoryLobbyStore) {
    setup_with_windows(Duration::from_secs(60), Duration::from_secs(60))
}

async fn install(state: &SharedState, store: &MemoryLobbyStore) {
    state.install_lobby_store(Arc::new(store.clone())).await;
}

fn user(id: &str) -> CurrentUser {
    CurrentUser { id: id.to_string() }
}

fn join(nick: &str) -> JoinRequest {
    JoinRequest {
        nick: nick.to_string(),
        skin_id: "skeleton".to_string(),
    }
}

async fn create(state: &SharedState, host: &CurrentUser, set_id: &str) -> String {
    lobby_service::create_lobby(
        state,
        host,
        CreateLobbyRequest {
            set_id: set_id.to_string(),
            mode: GameMode::Quiz,
        },
    )
    .await
    .expect("create lobby")
    .game_id
}

/// Seed round state and flip the status without spawning the background
/// round loop, keeping transitions fully test-driven.
async fn start_without_scheduler(store: &MemoryLobbyStore, game_id: &str) {
    let lobby = store
        .find_lobby(game_id)
        .await
        .expect("read lobby")
        .expect("lobby exists");
    let metadata = QuizMetadata::for_roster(lobby.players.keys().map(String::as_str));
    store
        .init_metadata(game_id, metadata)
        .await
        .expect("init metadata");
    store
        .patch_status(game_id, LobbyStatus::InProgress)
        .await
        .expect("patch status");
}

/// Store wrapper that fails the next metadata patch with a storage outage
/// and then behaves like the wrapped store again.
struct FlakyStore {
    inner: MemoryLobbyStore,
    fail_next_patch: AtomicBool,
}

impl FlakyStore {
    fn wrapping(inner: MemoryLobbyStore) -> Self {
        Self {
            inner,
            fail_next_patch: AtomicBool::new(false),
        }
    }

    fn fail_next_patch(&self) {
        self.fail_next_patch.store(true, Ordering::SeqCst);
    }
}

impl LobbyStore for FlakyStore {
    fn create_lobby(
        &self,
        game_id: &str,
        lobby: LobbyDocument,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.create_lobby(game_id, lobby)
    }

    fn find_lobby(
        &self,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<LobbyDocument>>> {
        self.inner.find_lobby(game_id)
    }

    fn patch_status(
        &self,
        game_id: &str,
        status: LobbyStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.patch_status(game_id, status)
    }

    fn init_metadata(
        &self,
        game_id: &str,
        metadata: QuizMetadata,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.init_metadata(game_id, metadata)
    }

    fn patch_metadata(
        &self,
        game_id: &str,
        patch: MetadataPatch,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if self.fail_next_patch.swap(false, Ordering::SeqCst) {
            return Box::pin(async {
                Err(StorageError::unavailable(
                    "storage outage".into(),
                    std::io::Error::other("connection reset"),
                ))
            });
        }
        self.inner.patch_metadata(game_id, patch)
    }

    fn merge_answer(
        &self,
        game_id: &str,
        player_id: &str,
        answer_index: u8,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.merge_answer(game_id, player_id, answer_index)
    }

    fn upsert_player(
        &self,
        game_id: &str,
        player_id: &str,
        entry: PlayerEntry,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.upsert_player(game_id, player_id, entry)
    }

    fn patch_player_skin(
        &self,
        game_id: &str,
        player_id: &str,
        skin_id: &str,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.patch_player_skin(game_id, player_id, skin_id)
    }

    fn subscribe_lobby(
        &self,
        game_id: &str,
    ) -> BoxFuture<'static, StorageResult<BoxStream<'static, LobbyDocument>>> {
        self.inner.subscribe_lobby(game_id)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

#[tokio::test]
async fn joining_twice_keeps_the_first_values() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;

    let first = roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("first join");
    assert_eq!(first.nick, "Ada");

    let second = roster_service::join_lobby(
        &state,
        &user("p1"),
        &game_id,
        JoinRequest {
            nick: "Someone Else".into(),
            skin_id: "ghost".into(),
        },
    )
    .await
    .expect("second join");

    assert_eq!(second.nick, "Ada");
    assert_eq!(second.skin_id, "skeleton");

    let lobby = store.find_lobby(&game_id).await.unwrap().unwrap();
    assert_eq!(lobby.players.len(), 1);
    assert_eq!(lobby.players.get("p1").unwrap().nick, "Ada");
}

#[tokio::test]
async fn join_eligibility_is_fail_closed() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;

    // The host cannot join their own game.
    let denied = roster_service::join_lobby(&state, &host, &game_id, join("Host"))
        .await
        .unwrap_err();
    assert!(matches!(denied, ServiceError::Unauthorized(_)));

    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("player joins while queued");

    start_without_scheduler(&store, &game_id).await;

    let late = roster_service::join_lobby(&state, &user("p2"), &game_id, join("Late"))
        .await
        .unwrap_err();
    assert!(matches!(late, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn concurrent_answers_merge_instead_of_overwriting() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;
    for (id, nick) in [("p1", "Ada"), ("p2", "Grace")] {
        roster_service::join_lobby(&state, &user(id), &game_id, join(nick))
            .await
            .expect("join");
    }
    start_without_scheduler(&store, &game_id).await;

    let p1 = user("p1");
    let p2 = user("p2");
    let (a, b) = tokio::join!(
        quiz_service::submit_answer(&state, &p1, &game_id, AnswerRequest { answer_index: 0 }),
        quiz_service::submit_answer(&state, &p2, &game_id, AnswerRequest { answer_index: 1 }),
    );
    a.expect("p1 answer");
    b.expect("p2 answer");

    let metadata = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    assert_eq!(metadata.answers.get("p1"), Some(&0));
    assert_eq!(metadata.answers.get("p2"), Some(&1));
}

#[tokio::test]
async fn reveal_is_applied_exactly_once() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;
    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("join");
    start_without_scheduler(&store, &game_id).await;

    quiz_service::submit_answer(&state, &user("p1"), &game_id, AnswerRequest { answer_index: 0 })
        .await
        .expect("answer");

    let first = quiz_service::evaluate_and_reveal(&state, &store, &game_id, 1)
        .await
        .expect("first reveal");
    let second = quiz_service::evaluate_and_reveal(&state, &store, &game_id, 1)
        .await
        .expect("second reveal");
    assert!(first);
    assert!(!second);

    let metadata = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    assert_eq!(metadata.points.get("p1"), Some(&1));
    assert_eq!(metadata.stats.total_correct, 1);
    assert_eq!(metadata.stats.total_answers, 1);
    assert!(metadata.show_results);
    assert_eq!(metadata.correct_answer_indices, Some(vec![0]));
    assert!(metadata.results_shown_at.is_some());
}

#[tokio::test]
async fn answers_are_rejected_during_the_reveal() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;
    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("join");
    start_without_scheduler(&store, &game_id).await;

    quiz_service::evaluate_and_reveal(&state, &store, &game_id, 1)
        .await
        .expect("reveal");

    let err = quiz_service::submit_answer(
        &state,
        &user("p1"),
        &game_id,
        AnswerRequest { answer_index: 0 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn full_two_round_game_scores_and_completes() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;
    for (id, nick) in [("p1", "Ada"), ("p2", "Grace")] {
        roster_service::join_lobby(&state, &user(id), &game_id, join(nick))
            .await
            .expect("join");
    }
    start_without_scheduler(&store, &game_id).await;

    // Round 1: p1 correct, p2 wrong.
    quiz_service::submit_answer(&state, &user("p1"), &game_id, AnswerRequest { answer_index: 0 })
        .await
        .expect("p1 round 1");
    quiz_service::submit_answer(&state, &user("p2"), &game_id, AnswerRequest { answer_index: 3 })
        .await
        .expect("p2 round 1");
    assert!(
        quiz_service::evaluate_and_reveal(&state, &store, &game_id, 1)
            .await
            .expect("reveal 1")
    );
    let after_round_one = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap()
        .points
        .clone();
    assert_eq!(after_round_one.get("p1"), Some(&1));
    assert_eq!(after_round_one.get("p2"), Some(&0));

    assert!(
        quiz_service::advance_round(&state, &store, &game_id, 1)
            .await
            .expect("advance 1")
    );
    let metadata = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    assert_eq!(metadata.current_round, 2);
    assert!(metadata.answers.is_empty());
    assert!(!metadata.show_results);
    assert_eq!(metadata.correct_answer_indices, None);
    assert_eq!(metadata.results_shown_at, None);

    // Round 2 is true/false with answer "true": index 0 is correct.
    quiz_service::submit_answer(&state, &user("p1"), &game_id, AnswerRequest { answer_index: 0 })
        .await
        .expect("p1 round 2");
    quiz_service::submit_answer(&state, &user("p2"), &game_id, AnswerRequest { answer_index: 0 })
        .await
        .expect("p2 round 2");
    assert!(
        quiz_service::evaluate_and_reveal(&state, &store, &game_id, 2)
            .await
            .expect("reveal 2")
    );

    let metadata = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    // Scores never went down between rounds.
    for (player, earlier) in &after_round_one {
        assert!(metadata.points.get(player).unwrap() >= earlier);
    }
    assert_eq!(metadata.points.get("p1"), Some(&2));
    assert_eq!(metadata.points.get("p2"), Some(&1));

    // Advancing past the last round completes the game without moving the
    // round counter past the set.
    assert!(
        quiz_service::advance_round(&state, &store, &game_id, 2)
            .await
            .expect("final advance")
    );
    let lobby = store.find_lobby(&game_id).await.unwrap().unwrap();
    assert_eq!(lobby.status, LobbyStatus::Completed);
    assert_eq!(lobby.metadata.as_ref().unwrap().current_round, 2);

    let results = lobby_service::final_results(&state, &game_id)
        .await
        .expect("final results");
    assert_eq!(results.standings[0].player_id, "p1");
    assert_eq!(results.standings[0].rank, 1);
    assert_eq!(results.standings[1].player_id, "p2");
    assert_eq!(results.standings[1].rank, 2);
    assert!((results.standings[0].accuracy - 1.0).abs() < f64::EPSILON);
    assert!((results.standings[1].accuracy - 0.5).abs() < f64::EPSILON);
    assert_eq!(results.stats.total_answers, 4);
    assert_eq!(results.stats.total_correct, 3);
    assert_eq!(results.stats.total_incorrect, 1);
}

#[tokio::test]
async fn completion_boundary_on_a_single_round_set() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, ONE_ROUND_SET).await;
    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("join");
    start_without_scheduler(&store, &game_id).await;

    quiz_service::evaluate_and_reveal(&state, &store, &game_id, 1)
        .await
        .expect("reveal");
    quiz_service::advance_round(&state, &store, &game_id, 1)
        .await
        .expect("advance");

    let lobby = store.find_lobby(&game_id).await.unwrap().unwrap();
    assert_eq!(lobby.status, LobbyStatus::Completed);
    // Completion sweeps the round-scoped fields: no in-flight answers and no
    // dangling reveal state on a finished document.
    let metadata = lobby.metadata.unwrap();
    assert_eq!(metadata.current_round, 1);
    assert!(metadata.answers.is_empty());
    assert!(!metadata.show_results);
    assert_eq!(metadata.correct_answer_indices, None);
    assert_eq!(metadata.results_shown_at, None);
}

#[tokio::test]
async fn start_game_is_host_only_and_single_shot() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;

    // Empty roster cannot start.
    let empty = lobby_service::start_game(&state, &host, &game_id)
        .await
        .unwrap_err();
    assert!(matches!(empty, ServiceError::InvalidState(_)));

    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("join");

    let denied = lobby_service::start_game(&state, &user("p1"), &game_id)
        .await
        .unwrap_err();
    assert!(matches!(denied, ServiceError::Unauthorized(_)));

    let view = lobby_service::start_game(&state, &host, &game_id)
        .await
        .expect("host starts");
    assert_eq!(view.status, LobbyStatus::InProgress);

    let lobby = store.find_lobby(&game_id).await.unwrap().unwrap();
    let metadata = lobby.metadata.unwrap();
    assert_eq!(metadata.current_round, 1);
    assert_eq!(metadata.points.get("p1"), Some(&0));

    let twice = lobby_service::start_game(&state, &host, &game_id)
        .await
        .unwrap_err();
    assert!(matches!(twice, ServiceError::InvalidState(_)));

    state.release_lobby(&game_id);
}

#[tokio::test]
async fn skins_lock_once_the_game_starts() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;
    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("join");

    let view = roster_service::update_skin(
        &state,
        &user("p1"),
        &game_id,
        SkinRequest {
            skin_id: "unknown-skin".into(),
        },
    )
    .await
    .expect("skin change while queued");
    // Unknown skins fall back to the placeholder image.
    assert_eq!(view.skin_image, AppConfig::default().placeholder_skin_image);

    start_without_scheduler(&store, &game_id).await;

    let locked = roster_service::update_skin(
        &state,
        &user("p1"),
        &game_id,
        SkinRequest {
            skin_id: "skeleton".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(locked, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn host_advance_races_through_the_same_latch() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;
    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("join");
    start_without_scheduler(&store, &game_id).await;

    // Manual advance before the reveal is rejected.
    let early = quiz_service::host_advance(&state, &host, &game_id)
        .await
        .unwrap_err();
    assert!(matches!(early, ServiceError::InvalidState(_)));

    quiz_service::evaluate_and_reveal(&state, &store, &game_id, 1)
        .await
        .expect("reveal");

    let denied = quiz_service::host_advance(&state, &user("p1"), &game_id)
        .await
        .unwrap_err();
    assert!(matches!(denied, ServiceError::Unauthorized(_)));

    quiz_service::host_advance(&state, &host, &game_id)
        .await
        .expect("host advances");
    // The timer path for the same round is now a no-op.
    let repeat = quiz_service::advance_round(&state, &store, &game_id, 1)
        .await
        .expect("stale advance");
    assert!(!repeat);

    let metadata = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    assert_eq!(metadata.current_round, 2);
}

#[tokio::test]
async fn a_failed_reveal_write_does_not_wedge_the_round() {
    let (state, store) = setup();
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, TWO_ROUND_SET).await;
    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("join");
    start_without_scheduler(&store, &game_id).await;

    quiz_service::submit_answer(&state, &user("p1"), &game_id, AnswerRequest { answer_index: 0 })
        .await
        .expect("answer");

    let flaky = FlakyStore::wrapping(store.clone());
    flaky.fail_next_patch();
    let err = quiz_service::evaluate_and_reveal(&state, &flaky, &game_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));

    // The failed attempt released its claim, so the next trigger lands the
    // reveal instead of going down as a duplicate.
    let applied = quiz_service::evaluate_and_reveal(&state, &flaky, &game_id, 1)
        .await
        .expect("retry after outage");
    assert!(applied);

    let metadata = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    assert!(metadata.show_results);
    assert_eq!(metadata.points.get("p1"), Some(&1));

    // Same for the advance boundary.
    flaky.fail_next_patch();
    let err = quiz_service::advance_round(&state, &flaky, &game_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));
    assert!(
        quiz_service::advance_round(&state, &flaky, &game_id, 1)
            .await
            .expect("advance retry")
    );

    let metadata = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    assert_eq!(metadata.current_round, 2);
}

#[tokio::test]
async fn round_windows_drive_reveal_and_completion() {
    let (state, store) =
        setup_with_windows(Duration::from_millis(150), Duration::from_millis(150));
    install(&state, &store).await;
    let host = user("h1");
    let game_id = create(&state, &host, ONE_ROUND_SET).await;
    roster_service::join_lobby(&state, &user("p1"), &game_id, join("Ada"))
        .await
        .expect("join");

    let mut snapshots = store
        .subscribe_lobby(&game_id)
        .await
        .expect("subscribe");
    lobby_service::start_game(&state, &host, &game_id)
        .await
        .expect("start");

    // Nobody answers: the answer window must reveal on its own, then the
    // reveal window must complete the single-round game, with no manual
    // reveal or advance calls.
    let mut saw_reveal = false;
    loop {
        let snapshot = tokio::time::timeout(Duration::from_secs(5), snapshots.next())
            .await
            .expect("game completes before the deadline")
            .expect("stream stays open");
        if snapshot
            .metadata
            .as_ref()
            .is_some_and(|metadata| metadata.show_results)
        {
            saw_reveal = true;
        }
        if snapshot.status == LobbyStatus::Completed {
            break;
        }
    }
    assert!(saw_reveal);

    let metadata = store
        .find_lobby(&game_id)
        .await
        .unwrap()
        .unwrap()
        .metadata
        .unwrap();
    assert_eq!(metadata.points.get("p1"), Some(&0));
    assert_eq!(metadata.stats.total_answers, 0);
}
